use std::io::Write;
use std::process::{Command, ExitStatus, Stdio};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("failed to spawn {cmd}: {source}")]
    Spawn {
        cmd: &'static str,
        source: std::io::Error,
    },

    #[error("failed to write to {cmd}: {source}")]
    Write {
        cmd: &'static str,
        source: std::io::Error,
    },

    #[error("{cmd} exited with status {status}")]
    Exit { cmd: &'static str, status: ExitStatus },
}

/// Destination for copied text.
pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// The platform clipboard.
/// Uses pbcopy on macOS, wl-copy on Wayland, xclip on X11, clip on Windows.
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let (cmd, args) = clipboard_command();

        let mut child = Command::new(cmd)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ClipboardError::Spawn { cmd, source })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .map_err(|source| ClipboardError::Write { cmd, source })?;
            // stdin is dropped here so the tool sees EOF
        }

        let status = child
            .wait()
            .map_err(|source| ClipboardError::Write { cmd, source })?;
        if !status.success() {
            return Err(ClipboardError::Exit { cmd, status });
        }

        log::debug!("Copied {} bytes via {cmd}", text.len());
        Ok(())
    }
}

fn clipboard_command() -> (&'static str, Vec<&'static str>) {
    #[cfg(target_os = "macos")]
    return ("pbcopy", vec![]);

    #[cfg(target_os = "windows")]
    return ("clip", vec![]);

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        let session_type = std::env::var("XDG_SESSION_TYPE").unwrap_or_default();
        if session_type == "wayland" {
            ("wl-copy", vec![])
        } else {
            ("xclip", vec!["-selection", "clipboard"])
        }
    }
}
