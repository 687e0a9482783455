pub mod toast;
pub mod window;
