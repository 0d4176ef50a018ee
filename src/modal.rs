//! Open/closed state for a single dialog, owned by whoever renders it.

/// Holds the content of at most one open dialog.
///
/// Each owner keeps its own context; there is no process-wide instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalContext<T> {
    content: Option<T>,
}

impl<T> Default for ModalContext<T> {
    fn default() -> Self {
        Self { content: None }
    }
}

impl<T> ModalContext<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the dialog with `content`, replacing whatever was open
    pub fn open(&mut self, content: T) {
        self.content = Some(content);
    }

    pub fn content(&self) -> Option<&T> {
        self.content.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.content.is_some()
    }

    /// Closes the dialog and hands back its content
    pub fn dismiss(&mut self) -> Option<T> {
        self.content.take()
    }
}
