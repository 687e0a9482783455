use gtk4::prelude::*;
use gtk4::{gdk, gio};
use libadwaita::prelude::*;

use crate::app::{BackendEvent, Controller, Phase};

/// Handles returned from building the main window.
pub struct MainWindowWidgets {
    pub window: libadwaita::ApplicationWindow,
    pub toast_overlay: libadwaita::ToastOverlay,
    pub preview_stack: gtk4::Stack,
    pub picture: gtk4::Picture,
    pub result_stack: gtk4::Stack,
    pub spinner: gtk4::Spinner,
    pub result_label: gtk4::Label,
    pub upload_button: gtk4::Button,
    pub download_button: gtk4::Button,
    pub copy_button: gtk4::Button,
    pub status_label: gtk4::Label,
    pub progress_bar: gtk4::ProgressBar,
}

/// Update widgets to reflect the controller.
pub fn render(widgets: &MainWindowWidgets, controller: &Controller) {
    match controller.image() {
        Some(image) => {
            let shown = widgets.picture.file().and_then(|f| f.path());
            if shown.as_deref() != Some(image.path.as_path()) {
                widgets
                    .picture
                    .set_file(Some(&gio::File::for_path(&image.path)));
            }
            widgets.picture.set_alternative_text(Some(&image.name));
            widgets.preview_stack.set_visible_child_name("image");
        }
        None => {
            widgets.picture.set_file(None::<&gio::File>);
            widgets.preview_stack.set_visible_child_name("placeholder");
        }
    }

    let result = controller.result();
    if controller.phase() == Phase::Recognizing {
        widgets.spinner.start();
        widgets.result_stack.set_visible_child_name("loading");
    } else {
        widgets.spinner.stop();
        widgets.result_label.set_text(result);
        let page = if result.is_empty() { "empty" } else { "text" };
        widgets.result_stack.set_visible_child_name(page);
    }

    widgets
        .copy_button
        .set_sensitive(!controller.is_loading() && !result.is_empty());
    widgets
        .download_button
        .set_sensitive(!controller.is_loading());
}

/// Build the main window.
pub fn build_main_window(
    app: &libadwaita::Application,
    backend_sender: async_channel::Sender<BackendEvent>,
    download_file_name: &str,
) -> MainWindowWidgets {
    let window = libadwaita::ApplicationWindow::builder()
        .application(app)
        .title("paper text OCR")
        .default_width(860)
        .default_height(560)
        .build();

    load_css();

    let toolbar_view = libadwaita::ToolbarView::new();
    let header = libadwaita::HeaderBar::new();
    header.set_title_widget(Some(&libadwaita::WindowTitle::new(
        "paper text OCR",
        "Extract text from images",
    )));
    toolbar_view.add_top_bar(&header);

    let content = gtk4::Box::new(gtk4::Orientation::Vertical, 12);
    content.set_margin_start(16);
    content.set_margin_end(16);
    content.set_margin_top(12);
    content.set_margin_bottom(12);

    // --- Image / result panels ---
    let panels = gtk4::Box::new(gtk4::Orientation::Horizontal, 16);
    panels.set_homogeneous(true);
    panels.set_vexpand(true);

    let placeholder = gtk4::Image::from_icon_name("folder-pictures-symbolic");
    placeholder.set_pixel_size(96);
    placeholder.add_css_class("dim-label");

    let picture = gtk4::Picture::new();
    picture.set_content_fit(gtk4::ContentFit::Contain);

    let preview_stack = gtk4::Stack::new();
    preview_stack.add_css_class("card");
    preview_stack.add_css_class("ocr-panel");
    preview_stack.add_named(&placeholder, Some("placeholder"));
    preview_stack.add_named(&picture, Some("image"));
    preview_stack.set_visible_child_name("placeholder");
    panels.append(&preview_stack);

    let spinner = gtk4::Spinner::new();
    spinner.set_size_request(48, 48);
    spinner.set_halign(gtk4::Align::Center);
    spinner.set_valign(gtk4::Align::Center);

    let result_label = gtk4::Label::new(None);
    result_label.set_wrap(true);
    result_label.set_selectable(true);
    result_label.set_xalign(0.0);
    result_label.set_yalign(0.0);
    result_label.add_css_class("ocr-text");
    let result_scroll = gtk4::ScrolledWindow::builder()
        .hscrollbar_policy(gtk4::PolicyType::Never)
        .child(&result_label)
        .build();

    let empty_label = gtk4::Label::new(Some("Upload an image to extract its text"));
    empty_label.add_css_class("dim-label");

    let result_stack = gtk4::Stack::new();
    result_stack.add_css_class("card");
    result_stack.add_css_class("ocr-panel");
    result_stack.add_named(&empty_label, Some("empty"));
    result_stack.add_named(&spinner, Some("loading"));
    result_stack.add_named(&result_scroll, Some("text"));
    result_stack.set_visible_child_name("empty");
    result_stack.set_tooltip_text(Some("Click to copy"));
    panels.append(&result_stack);

    // Clicking the result copies it
    let click = gtk4::GestureClick::new();
    click.set_propagation_phase(gtk4::PropagationPhase::Capture);
    let sender_for_click = backend_sender.clone();
    click.connect_released(move |_, _, _, _| {
        let _ = sender_for_click.try_send(BackendEvent::CopyRequested);
    });
    result_stack.add_controller(click);

    content.append(&panels);

    // --- Buttons ---
    let buttons = gtk4::Box::new(gtk4::Orientation::Horizontal, 8);

    let upload_button = icon_button("document-open-symbolic", "Upload Img");
    upload_button.add_css_class("suggested-action");
    upload_button.set_sensitive(false);
    buttons.append(&upload_button);

    let spacer = gtk4::Box::new(gtk4::Orientation::Horizontal, 0);
    spacer.set_hexpand(true);
    buttons.append(&spacer);

    let download_button = icon_button("document-save-symbolic", "download txt");
    buttons.append(&download_button);

    let copy_button = icon_button("edit-copy-symbolic", "copy");
    copy_button.set_sensitive(false);
    buttons.append(&copy_button);

    content.append(&buttons);

    // --- Status + language model download progress ---
    let status_label = gtk4::Label::new(Some("Starting..."));
    status_label.add_css_class("dim-label");
    status_label.set_xalign(0.0);
    content.append(&status_label);

    let progress_bar = gtk4::ProgressBar::new();
    progress_bar.set_visible(false);
    progress_bar.set_show_text(true);
    progress_bar.set_text(Some("Downloading language model..."));
    content.append(&progress_bar);

    // Assemble
    toolbar_view.set_content(Some(&content));
    let toast_overlay = libadwaita::ToastOverlay::new();
    toast_overlay.set_child(Some(&toolbar_view));
    window.set_content(Some(&toast_overlay));

    // Wire buttons
    {
        let parent = window.clone();
        let sender = backend_sender.clone();
        upload_button.connect_clicked(move |_| {
            choose_image(&parent, sender.clone());
        });
    }
    {
        let parent = window.clone();
        let sender = backend_sender.clone();
        let file_name = crate::download::suggested_name(download_file_name).to_string();
        download_button.connect_clicked(move |_| {
            choose_save_target(&parent, sender.clone(), &file_name);
        });
    }
    {
        let sender = backend_sender.clone();
        copy_button.connect_clicked(move |_| {
            let _ = sender.try_send(BackendEvent::CopyRequested);
        });
    }

    // Dropping an image file onto the window selects it
    let drop_target = gtk4::DropTarget::new(gio::File::static_type(), gdk::DragAction::COPY);
    let upload_for_drop = upload_button.clone();
    drop_target.connect_drop(move |_, value, _, _| {
        if !upload_for_drop.is_sensitive() {
            return false;
        }
        let Ok(file) = value.get::<gio::File>() else {
            return false;
        };
        if !is_image_file(&file) {
            log::info!("Ignoring dropped file that is not an image: {}", file.uri());
            return false;
        }
        match file.path() {
            Some(path) => backend_sender
                .try_send(BackendEvent::FileChosen(Some(path)))
                .is_ok(),
            None => false,
        }
    });
    window.add_controller(drop_target);

    MainWindowWidgets {
        window,
        toast_overlay,
        preview_stack,
        picture,
        result_stack,
        spinner,
        result_label,
        upload_button,
        download_button,
        copy_button,
        status_label,
        progress_bar,
    }
}

/// Same acceptance rule as the picker's `image/*` filter.
fn is_image_file(file: &gio::File) -> bool {
    let info = match file.query_info(
        gio::FILE_ATTRIBUTE_STANDARD_CONTENT_TYPE,
        gio::FileQueryInfoFlags::NONE,
        gio::Cancellable::NONE,
    ) {
        Ok(info) => info,
        Err(e) => {
            log::warn!("Failed to query dropped file: {e}");
            return false;
        }
    };
    info.content_type()
        .and_then(|content_type| gio::content_type_get_mime_type(&content_type))
        .is_some_and(|mime| is_image_mime(&mime))
}

fn is_image_mime(mime: &str) -> bool {
    mime.strip_prefix("image/")
        .is_some_and(|subtype| !subtype.is_empty())
}

fn icon_button(icon_name: &str, label: &str) -> gtk4::Button {
    let content = libadwaita::ButtonContent::builder()
        .icon_name(icon_name)
        .label(label)
        .build();
    gtk4::Button::builder().child(&content).build()
}

fn load_css() {
    let css_provider = gtk4::CssProvider::new();
    css_provider.load_from_string(
        r#"
        .ocr-panel {
            padding: 16px;
            min-height: 320px;
        }
        .ocr-text {
            font-size: 15px;
        }
        "#,
    );
    if let Some(display) = gdk::Display::default() {
        gtk4::style_context_add_provider_for_display(
            &display,
            &css_provider,
            gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    }
}

/// Open the image picker. Dismissing it counts as selecting no file.
fn choose_image(
    parent: &libadwaita::ApplicationWindow,
    sender: async_channel::Sender<BackendEvent>,
) {
    let filter = gtk4::FileFilter::new();
    filter.set_name(Some("Images"));
    filter.add_mime_type("image/*");
    let filters = gio::ListStore::new::<gtk4::FileFilter>();
    filters.append(&filter);

    let dialog = gtk4::FileDialog::builder()
        .title("Upload Img")
        .modal(true)
        .filters(&filters)
        .default_filter(&filter)
        .build();

    dialog.open(Some(parent), gio::Cancellable::NONE, move |result| {
        let path = match result {
            Ok(file) => file.path(),
            Err(e) if e.matches(gtk4::DialogError::Dismissed) => None,
            Err(e) => {
                log::warn!("Image picker failed: {e}");
                return;
            }
        };
        let _ = sender.try_send(BackendEvent::FileChosen(path));
    });
}

fn choose_save_target(
    parent: &libadwaita::ApplicationWindow,
    sender: async_channel::Sender<BackendEvent>,
    file_name: &str,
) {
    let dialog = gtk4::FileDialog::builder()
        .title("download txt")
        .modal(true)
        .initial_name(file_name)
        .build();

    dialog.save(Some(parent), gio::Cancellable::NONE, move |result| match result {
        Ok(file) => match file.path() {
            Some(path) => {
                let _ = sender.try_send(BackendEvent::SaveChosen(path));
            }
            None => log::warn!("Save target is not a local file"),
        },
        Err(e) if e.matches(gtk4::DialogError::Dismissed) => {}
        Err(e) => log::warn!("Save dialog failed: {e}"),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_image_mime_types_are_accepted() {
        for mime in ["image/png", "image/jpeg", "image/svg+xml", "image/tiff"] {
            assert!(is_image_mime(mime), "{mime}");
        }
        for mime in ["text/plain", "application/pdf", "application/octet-stream", "image/", "video/png"] {
            assert!(!is_image_mime(mime), "{mime}");
        }
    }
}
