use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::app::Notifier;

/// Ids of the toasts currently on screen.
#[derive(Debug, Default)]
struct ActiveToasts {
    ids: HashSet<&'static str>,
}

impl ActiveToasts {
    /// Returns false when a toast with this id is already visible.
    fn claim(&mut self, id: &'static str) -> bool {
        self.ids.insert(id)
    }

    fn release(&mut self, id: &'static str) {
        self.ids.remove(id);
    }
}

/// Toasts shown over the main window. A toast id that is still on screen is
/// not shown a second time.
pub struct ToastNotifier {
    overlay: libadwaita::ToastOverlay,
    timeout_secs: u32,
    active: Rc<RefCell<ActiveToasts>>,
}

impl ToastNotifier {
    pub fn new(overlay: libadwaita::ToastOverlay, timeout_secs: u32) -> Self {
        Self {
            overlay,
            timeout_secs,
            active: Rc::new(RefCell::new(ActiveToasts::default())),
        }
    }
}

impl Notifier for ToastNotifier {
    fn notify(&self, id: &'static str, message: &str) {
        if !self.active.borrow_mut().claim(id) {
            log::debug!("Toast '{id}' already visible");
            return;
        }

        let toast = libadwaita::Toast::new(message);
        toast.set_timeout(self.timeout_secs);

        let active = self.active.clone();
        toast.connect_dismissed(move |_| {
            active.borrow_mut().release(id);
        });

        self.overlay.add_toast(toast);
    }
}
