mod app;
mod clipboard;
mod config;
mod download;
mod engine;
mod ui;

use std::cell::RefCell;
use std::rc::Rc;

use gtk4::prelude::*;

use app::{AppState, BackendEvent};

fn main() {
    env_logger::init();
    log::info!("paper text OCR starting");

    let application = libadwaita::Application::builder()
        .application_id("com.github.tr4m0ryp.paper-ocr")
        .build();

    application.connect_activate(on_activate);
    application.run();
}

fn on_activate(app: &libadwaita::Application) {
    if let Some(window) = app.active_window() {
        window.present();
        return;
    }

    // Create async channel for backend → UI communication
    let (backend_tx, backend_rx) = async_channel::unbounded::<BackendEvent>();

    // Build app state
    let window_tx = backend_tx.clone();
    let state = Rc::new(RefCell::new(AppState::new(backend_tx)));

    // Build UI
    let window = ui::window::build_main_window(
        app,
        window_tx,
        &state.borrow().config.download_file_name,
    );
    let toasts = ui::toast::ToastNotifier::new(
        window.toast_overlay.clone(),
        state.borrow().config.toast_timeout_secs(),
    );
    window.window.present();

    // Store UI handles in state
    {
        let mut s = state.borrow_mut();
        s.window = Some(window);
        s.toasts = Some(toasts);
    }

    // Attach backend event handler
    {
        let state_clone = state.clone();
        gtk4::glib::spawn_future_local(async move {
            while let Ok(event) = backend_rx.recv().await {
                app::handle_backend_event(&state_clone, event);
            }
        });
    }

    // Release the engine before the process exits
    {
        let state_clone = state.clone();
        app.connect_shutdown(move |_| {
            app::shutdown_engine(&state_clone);
        });
    }

    // Fetch the language model if needed, then start the engine
    app::ensure_tessdata(&state);
}
