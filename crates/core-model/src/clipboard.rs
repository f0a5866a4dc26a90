//! Clipboard seam. The system clipboard is an external collaborator; the
//! model only sees this trait. The binary installs a real implementation,
//! tests and headless runs use the in-process fallback.

pub trait Clipboard {
    fn get(&mut self) -> Option<String>;
    fn set(&mut self, text: String);
}

/// Process-local clipboard used when no system clipboard is available.
#[derive(Default)]
pub struct LocalClipboard {
    text: Option<String>,
}

impl Clipboard for LocalClipboard {
    fn get(&mut self) -> Option<String> {
        self.text.clone()
    }

    fn set(&mut self, text: String) {
        self.text = Some(text);
    }
}
