/// System clipboard access for copy/cut/paste in text fields.
///
/// Opening the clipboard can fail (headless sessions, missing display server);
/// the layer then keeps working without clipboard support.
pub struct Clipboard {
    inner: Option<arboard::Clipboard>,
}

impl Clipboard {
    pub fn new() -> Self {
        match arboard::Clipboard::new() {
            Ok(cb) => Self { inner: Some(cb) },
            Err(e) => {
                log::warn!("clipboard unavailable: {e}");
                Self::detached()
            }
        }
    }

    /// Clipboard that never yields or stores anything.
    pub fn detached() -> Self {
        Self { inner: None }
    }

    pub fn get(&mut self) -> Option<String> {
        let cb = self.inner.as_mut()?;
        match cb.get_text() {
            Ok(text) => Some(text),
            Err(e) => {
                log::debug!("clipboard read failed: {e}");
                None
            }
        }
    }

    pub fn set(&mut self, text: String) {
        let Some(cb) = self.inner.as_mut() else { return };
        if let Err(e) = cb.set_text(text) {
            log::debug!("clipboard write failed: {e}");
        }
    }
}

impl Default for Clipboard {
    fn default() -> Self {
        Self::new()
    }
}
