//! Clipboard access and the save/paste/restore sequence
//!
//! Pasting goes through the system clipboard, which belongs to the user.
//! [`ClipboardGuard`] snapshots it on acquire. [`ClipboardGuard::restore`]
//! puts the snapshot back and reports failure; if the guard is dropped
//! without it (early return, unwinding) the drop does the same and logs.

use std::borrow::Cow;

use super::InjectError;

/// RGBA image data taken off the clipboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardImage {
    pub width: usize,
    pub height: usize,
    pub bytes: Vec<u8>,
}

/// What the clipboard held before a paste
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardContent {
    /// Nothing that text or image reads can see
    Empty,
    Text(String),
    Image(ClipboardImage),
}

impl ClipboardContent {
    pub fn kind(&self) -> &'static str {
        match self {
            ClipboardContent::Empty => "empty",
            ClipboardContent::Text(_) => "text",
            ClipboardContent::Image(_) => "image",
        }
    }
}

/// Minimal clipboard interface used by the paste path
pub trait ClipboardAccess {
    /// Current text content, `None` if the clipboard holds no text
    fn get_text(&mut self) -> Result<Option<String>, InjectError>;

    fn set_text(&mut self, text: &str) -> Result<(), InjectError>;

    /// Capture the current content. Fails rather than reporting content it
    /// could not read as empty.
    fn snapshot(&mut self) -> Result<ClipboardContent, InjectError>;

    /// Replace the clipboard with `content`. [`ClipboardContent::Empty`] clears it.
    fn restore(&mut self, content: ClipboardContent) -> Result<(), InjectError>;
}

fn clipboard_error(e: arboard::Error) -> InjectError {
    InjectError::Clipboard(e.to_string())
}

/// The host's clipboard, via `arboard`.
///
/// On X11 and Wayland the content we set is served by this handle, so it
/// has to stay alive after a paste for the restored content to survive.
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    pub fn open() -> Result<Self, InjectError> {
        let inner = arboard::Clipboard::new().map_err(clipboard_error)?;
        Ok(Self { inner })
    }
}

impl ClipboardAccess for SystemClipboard {
    fn get_text(&mut self) -> Result<Option<String>, InjectError> {
        match self.inner.get_text() {
            Ok(text) => Ok(Some(text)),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(clipboard_error(e)),
        }
    }

    fn set_text(&mut self, text: &str) -> Result<(), InjectError> {
        self.inner.set_text(text).map_err(clipboard_error)
    }

    fn snapshot(&mut self) -> Result<ClipboardContent, InjectError> {
        if let Some(text) = self.get_text()? {
            return Ok(ClipboardContent::Text(text));
        }

        match self.inner.get_image() {
            Ok(image) => Ok(ClipboardContent::Image(ClipboardImage {
                width: image.width,
                height: image.height,
                bytes: image.bytes.into_owned(),
            })),
            // Neither text nor an image: formats arboard cannot read look the same
            Err(arboard::Error::ContentNotAvailable) => Ok(ClipboardContent::Empty),
            Err(e) => Err(clipboard_error(e)),
        }
    }

    fn restore(&mut self, content: ClipboardContent) -> Result<(), InjectError> {
        match content {
            ClipboardContent::Empty => self.inner.clear(),
            ClipboardContent::Text(text) => self.inner.set_text(text),
            ClipboardContent::Image(image) => self.inner.set_image(arboard::ImageData {
                width: image.width,
                height: image.height,
                bytes: Cow::Owned(image.bytes),
            }),
        }
        .map_err(clipboard_error)
    }
}

/// In-process clipboard used by [`super::MemoryInjector`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryClipboard {
    content: ClipboardContent,
    writes: usize,
    fail_next_restore: bool,
}

impl Default for MemoryClipboard {
    fn default() -> Self {
        Self::holding(ClipboardContent::Empty)
    }
}

impl MemoryClipboard {
    pub fn holding(content: ClipboardContent) -> Self {
        Self {
            content,
            writes: 0,
            fail_next_restore: false,
        }
    }

    pub fn with_text(text: &str) -> Self {
        Self::holding(ClipboardContent::Text(text.to_owned()))
    }

    pub fn content(&self) -> &ClipboardContent {
        &self.content
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            ClipboardContent::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Number of `set_text` and `restore` calls so far
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Make the next `restore` fail and leave the content as it is
    pub fn fail_next_restore(&mut self) {
        self.fail_next_restore = true;
    }
}

impl ClipboardAccess for MemoryClipboard {
    fn get_text(&mut self) -> Result<Option<String>, InjectError> {
        Ok(self.text().map(str::to_owned))
    }

    fn set_text(&mut self, text: &str) -> Result<(), InjectError> {
        self.content = ClipboardContent::Text(text.to_owned());
        self.writes += 1;
        Ok(())
    }

    fn snapshot(&mut self) -> Result<ClipboardContent, InjectError> {
        Ok(self.content.clone())
    }

    fn restore(&mut self, content: ClipboardContent) -> Result<(), InjectError> {
        if std::mem::take(&mut self.fail_next_restore) {
            return Err(InjectError::Clipboard("simulated restore failure".to_string()));
        }
        self.content = content;
        self.writes += 1;
        Ok(())
    }
}

/// Scoped clipboard borrow that puts the original content back
pub struct ClipboardGuard<'a, C: ClipboardAccess> {
    clipboard: &'a mut C,
    original: Option<ClipboardContent>,
}

impl<'a, C: ClipboardAccess> ClipboardGuard<'a, C> {
    /// Snapshot the clipboard. Nothing is modified yet, so a failed snapshot
    /// leaves the user's content alone.
    pub fn acquire(clipboard: &'a mut C) -> Result<Self, InjectError> {
        let original = clipboard.snapshot()?;
        Ok(Self {
            clipboard,
            original: Some(original),
        })
    }

    pub fn set_text(&mut self, text: &str) -> Result<(), InjectError> {
        self.clipboard.set_text(text)
    }

    /// Content that will be restored
    pub fn original(&self) -> Option<&ClipboardContent> {
        self.original.as_ref()
    }

    pub fn clipboard_mut(&mut self) -> &mut C {
        &mut *self.clipboard
    }

    /// Put the original content back now
    pub fn restore(mut self) -> Result<(), InjectError> {
        match self.original.take() {
            Some(original) => self.clipboard.restore(original),
            None => Ok(()),
        }
    }
}

impl<C: ClipboardAccess> Drop for ClipboardGuard<'_, C> {
    fn drop(&mut self) {
        if let Some(original) = self.original.take() {
            let kind = original.kind();
            if let Err(e) = self.clipboard.restore(original) {
                tracing::warn!("Failed to restore {} clipboard content: {}", kind, e);
            }
        }
    }
}

/// Put `text` on the clipboard, run `trigger` (the paste keystroke), then
/// restore the previous clipboard content regardless of the outcome.
///
/// `trigger` gets the clipboard as it stands mid-paste. A trigger error wins
/// over a restore error. If only the restore fails the error is
/// [`InjectError::ClipboardNotRestored`], since the text did go out.
pub fn paste_via_clipboard<C, F>(
    clipboard: &mut C,
    text: &str,
    trigger: F,
) -> Result<(), InjectError>
where
    C: ClipboardAccess,
    F: FnOnce(&mut C) -> Result<(), InjectError>,
{
    let mut guard = ClipboardGuard::acquire(clipboard)?;
    guard.set_text(text)?;
    let triggered = trigger(guard.clipboard_mut());

    let restored = guard.restore().map_err(|e| match e {
        InjectError::Clipboard(reason) => InjectError::ClipboardNotRestored(reason),
        other => other,
    });
    match (triggered, restored) {
        (Err(e), Err(restore_error)) => {
            tracing::warn!("Failed to restore clipboard: {}", restore_error);
            Err(e)
        }
        (triggered, restored) => triggered.and(restored),
    }
}
