//! Real input injection via `enigo` (keyboard) and `arboard` (clipboard)

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

use enigo::{Enigo, Key, Keyboard, Settings};

use super::clipboard::{paste_via_clipboard, SystemClipboard};
use super::shortcut::{Modifier, PasteShortcut};
use super::{Direction, InjectError, InputInjector};

type Job<C> = Box<dyn FnOnce(Result<&mut C, InjectError>) + Send>;
type ClipboardJob = Job<SystemClipboard>;

/// Queue of the thread that owns the process's clipboard handle
static CLIPBOARD_JOBS: OnceLock<Sender<ClipboardJob>> = OnceLock::new();

/// Injects into whatever application has keyboard focus on this machine.
///
/// The keyboard connection is opened per call, so no virtual keyboard stays
/// active between requests. The clipboard is different: one handle lives on
/// a dedicated thread for the life of the process, and every paste runs
/// there, one at a time.
#[derive(Debug, Clone)]
pub struct HostInjector {
    shortcut: PasteShortcut,
    settle: Duration,
}

impl HostInjector {
    /// `settle` is how long to wait after the paste chord before restoring
    /// the clipboard, giving the target application time to read it.
    pub fn new(shortcut: PasteShortcut, settle: Duration) -> Self {
        Self { shortcut, settle }
    }

    pub fn shortcut(&self) -> &PasteShortcut {
        &self.shortcut
    }
}

impl Default for HostInjector {
    fn default() -> Self {
        Self::new(PasteShortcut::default(), Duration::from_millis(40))
    }
}

/// Serve jobs with one long-lived clipboard, opening it on first use.
///
/// A failed open is retried on the next job.
fn clipboard_owner<C, F>(jobs: Receiver<Job<C>>, mut open: F)
where
    F: FnMut() -> Result<C, InjectError>,
{
    let mut clipboard = None;
    for job in jobs {
        if clipboard.is_none() {
            match open() {
                Ok(opened) => clipboard = Some(opened),
                Err(e) => {
                    job(Err(e));
                    continue;
                }
            }
        }
        match clipboard.as_mut() {
            Some(clipboard) => job(Ok(clipboard)),
            None => job(Err(InjectError::Clipboard("not open".to_string()))),
        }
    }
    tracing::debug!("Clipboard thread stopped");
}

fn clipboard_jobs() -> Result<&'static Sender<ClipboardJob>, InjectError> {
    if let Some(jobs) = CLIPBOARD_JOBS.get() {
        return Ok(jobs);
    }

    let (tx, rx) = mpsc::channel::<ClipboardJob>();
    thread::Builder::new()
        .name("keyrelay-clipboard".to_string())
        .spawn(move || clipboard_owner(rx, SystemClipboard::open))
        .map_err(|e| InjectError::Clipboard(format!("failed to start clipboard thread: {e}")))?;

    // A racing caller may have won; its sender is used and ours is dropped,
    // which stops the thread we just started.
    Ok(CLIPBOARD_JOBS.get_or_init(|| tx))
}

/// Run `job` on the clipboard thread and wait for its result
fn with_clipboard<T, F>(job: F) -> Result<T, InjectError>
where
    T: Send + 'static,
    F: FnOnce(&mut SystemClipboard) -> Result<T, InjectError> + Send + 'static,
{
    let stopped = || InjectError::Clipboard("clipboard thread stopped".to_string());
    let (tx, rx) = mpsc::channel();
    let job: ClipboardJob = Box::new(move |clipboard| {
        let _ = tx.send(clipboard.and_then(job));
    });

    clipboard_jobs()?.send(job).map_err(|_| stopped())?;
    rx.recv().map_err(|_| stopped())?
}

fn keyboard() -> Result<Enigo, InjectError> {
    Enigo::new(&Settings::default()).map_err(|e| InjectError::Init(e.to_string()))
}

fn key_error(action: &'static str) -> impl FnOnce(enigo::InputError) -> InjectError {
    move |e| InjectError::Keyboard {
        action,
        reason: e.to_string(),
    }
}

fn modifier_key(modifier: Modifier) -> Key {
    match modifier {
        Modifier::Ctrl => Key::Control,
        Modifier::Shift => Key::Shift,
        Modifier::Alt => Key::Alt,
        Modifier::Meta => Key::Meta,
    }
}

fn arrow_key(direction: Direction) -> Key {
    match direction {
        Direction::Up => Key::UpArrow,
        Direction::Down => Key::DownArrow,
        Direction::Left => Key::LeftArrow,
        Direction::Right => Key::RightArrow,
    }
}

/// Press the chord, always releasing whatever modifiers were pressed
fn press_chord(enigo: &mut Enigo, shortcut: &PasteShortcut) -> Result<(), InjectError> {
    let mut held = Vec::with_capacity(shortcut.modifiers().len());
    let mut result = Ok(());

    for &modifier in shortcut.modifiers() {
        if let Err(e) = enigo.key(modifier_key(modifier), enigo::Direction::Press) {
            result = Err(key_error("paste shortcut")(e));
            break;
        }
        held.push(modifier);
    }

    if result.is_ok() {
        result = enigo
            .key(Key::Unicode(shortcut.key()), enigo::Direction::Click)
            .map_err(key_error("paste shortcut"));
    }

    for &modifier in held.iter().rev() {
        if let Err(e) = enigo.key(modifier_key(modifier), enigo::Direction::Release) {
            tracing::warn!("Failed to release {}: {}", modifier.as_str(), e);
        }
    }

    result
}

/// Call `press` `count` times, stopping at the first failure.
///
/// A failure after some presses reports how many went through.
fn press_backspaces<F>(count: usize, mut press: F) -> Result<(), InjectError>
where
    F: FnMut(usize) -> Result<(), String>,
{
    for deleted in 0..count {
        if let Err(reason) = press(deleted) {
            return Err(match deleted {
                0 => InjectError::Keyboard {
                    action: "backspace",
                    reason,
                },
                _ => InjectError::PartialDelete {
                    deleted,
                    requested: count,
                    reason,
                },
            });
        }
    }
    Ok(())
}

impl InputInjector for HostInjector {
    fn paste(&mut self, text: &str) -> Result<(), InjectError> {
        let shortcut = self.shortcut.clone();
        let settle = self.settle;
        let owned = text.to_owned();

        with_clipboard(move |clipboard| {
            // Open the keyboard first so a failure here leaves the clipboard untouched
            let mut enigo = keyboard()?;
            paste_via_clipboard(clipboard, &owned, |_| {
                press_chord(&mut enigo, &shortcut)?;
                thread::sleep(settle);
                Ok(())
            })
        })?;

        tracing::debug!("Pasted {} chars via {}", text.chars().count(), self.shortcut);
        Ok(())
    }

    fn press_enter(&mut self) -> Result<(), InjectError> {
        keyboard()?
            .key(Key::Return, enigo::Direction::Click)
            .map_err(key_error("enter"))
    }

    fn press_arrow(&mut self, direction: Direction) -> Result<(), InjectError> {
        keyboard()?
            .key(arrow_key(direction), enigo::Direction::Click)
            .map_err(key_error("arrow key"))
    }

    fn delete_backward(&mut self, count: usize) -> Result<(), InjectError> {
        if count == 0 {
            return Ok(());
        }

        let mut enigo = keyboard()?;
        press_backspaces(count, |_| {
            enigo
                .key(Key::Backspace, enigo::Direction::Click)
                .map_err(|e| e.to_string())
        })?;
        tracing::debug!("Pressed backspace {} time(s)", count);
        Ok(())
    }
}
