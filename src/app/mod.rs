mod controller;
mod event_handler;
mod model;
mod pipeline;
mod state;

pub use controller::{Controller, Notifier, Phase};
pub use event_handler::handle_backend_event;
pub use model::{ensure_tessdata, shutdown_engine};
pub use state::{AppState, BackendEvent};
