//! System clipboard wiring for the editor's `Clipboard` seam.

use core_model::Clipboard;
use tracing::debug;

pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    /// `None` when no system clipboard is reachable (headless session);
    /// callers fall back to the in-process clipboard.
    pub fn new() -> Option<Self> {
        match arboard::Clipboard::new() {
            Ok(inner) => Some(SystemClipboard { inner }),
            Err(e) => {
                debug!(target: "runtime", ?e, "system clipboard unavailable");
                None
            }
        }
    }
}

impl Clipboard for SystemClipboard {
    fn get(&mut self) -> Option<String> {
        self.inner.get_text().ok()
    }

    fn set(&mut self, text: String) {
        if let Err(e) = self.inner.set_text(text) {
            debug!(target: "runtime", ?e, "clipboard write failed");
        }
    }
}
