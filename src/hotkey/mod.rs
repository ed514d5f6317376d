//! Global hotkey listener for hold-to-talk, backed by `rdev`.
//!
//! # Design
//!
//! `rdev::listen()` is a blocking OS-level call that never returns while the
//! process is alive. It must run on a **dedicated OS thread** — it cannot be
//! used inside a tokio task.
//!
//! [`HotkeyListener::start`] spawns that dedicated thread and returns a
//! [`HotkeyListener`] handle. Dropping the handle sets a stop flag so the
//! callback silently discards further events. The underlying thread will
//! continue to exist until the process exits (rdev has no graceful shutdown
//! API), but it will consume no meaningful CPU while blocked waiting for
//! keyboard events.
//!
//! Two keys are watched: the **primary** key (hold to record, release to
//! transcribe) and the **secondary** key (held together with the primary for
//! translate mode). OS key auto-repeat is suppressed inside the callback so
//! downstream consumers only ever see clean press/release edges.

pub mod listener;

pub use listener::HotkeyListener;

// ---------------------------------------------------------------------------
// HotkeyEvent
// ---------------------------------------------------------------------------

/// Edge events emitted by the hotkey listener thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    /// The primary (record) key went down.
    PrimaryPressed,
    /// The primary (record) key came up.
    PrimaryReleased,
    /// The secondary (translate modifier) key went down.
    SecondaryPressed,
    /// The secondary (translate modifier) key came up.
    SecondaryReleased,
}

// ---------------------------------------------------------------------------
// parse_key
// ---------------------------------------------------------------------------

/// Parse a hotkey name from a config string into an [`rdev::Key`].
///
/// Supports F1–F12, common named keys, and single ASCII letters (case
/// insensitive). Returns `None` for unrecognised names so callers can fall
/// back to a default or report a configuration error.
///
/// # Examples
///
/// ```
/// use voicepaste::hotkey::parse_key;
///
/// assert_eq!(parse_key("F8"),     Some(rdev::Key::F8));
/// assert_eq!(parse_key("Escape"), Some(rdev::Key::Escape));
/// assert_eq!(parse_key("a"),      Some(rdev::Key::KeyA));
/// assert_eq!(parse_key("xyz"),    None);
/// ```
pub fn parse_key(key_str: &str) -> Option<rdev::Key> {
    use rdev::Key;

    if let Some(k) = function_key(key_str) {
        return Some(k);
    }

    let named = match key_str {
        "Escape" | "Esc" => Some(Key::Escape),
        "Space" => Some(Key::Space),
        "Return" | "Enter" => Some(Key::Return),
        "Tab" => Some(Key::Tab),
        "Backspace" => Some(Key::Backspace),
        "Delete" | "Del" => Some(Key::Delete),
        "Home" => Some(Key::Home),
        "End" => Some(Key::End),
        "CapsLock" => Some(Key::CapsLock),
        "ShiftLeft" | "Shift" => Some(Key::ShiftLeft),
        "ShiftRight" => Some(Key::ShiftRight),
        "ControlLeft" | "Control" | "Ctrl" => Some(Key::ControlLeft),
        "ControlRight" => Some(Key::ControlRight),
        "Alt" | "Option" => Some(Key::Alt),
        "AltGr" => Some(Key::AltGr),
        "Meta" | "Cmd" | "Command" => Some(Key::MetaLeft),
        _ => None,
    };
    if named.is_some() {
        return named;
    }

    let mut chars = key_str.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => letter_key(c),
        _ => None,
    }
}

fn function_key(name: &str) -> Option<rdev::Key> {
    use rdev::Key::*;
    Some(match name {
        "F1" => F1,
        "F2" => F2,
        "F3" => F3,
        "F4" => F4,
        "F5" => F5,
        "F6" => F6,
        "F7" => F7,
        "F8" => F8,
        "F9" => F9,
        "F10" => F10,
        "F11" => F11,
        "F12" => F12,
        _ => return None,
    })
}

fn letter_key(c: char) -> Option<rdev::Key> {
    use rdev::Key::*;
    Some(match c.to_ascii_lowercase() {
        'a' => KeyA,
        'b' => KeyB,
        'c' => KeyC,
        'd' => KeyD,
        'e' => KeyE,
        'f' => KeyF,
        'g' => KeyG,
        'h' => KeyH,
        'i' => KeyI,
        'j' => KeyJ,
        'k' => KeyK,
        'l' => KeyL,
        'm' => KeyM,
        'n' => KeyN,
        'o' => KeyO,
        'p' => KeyP,
        'q' => KeyQ,
        'r' => KeyR,
        's' => KeyS,
        't' => KeyT,
        'u' => KeyU,
        'v' => KeyV,
        'w' => KeyW,
        'x' => KeyX,
        'y' => KeyY,
        'z' => KeyZ,
        _ => return None,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_function_keys() {
        assert_eq!(parse_key("F8"), Some(rdev::Key::F8));
        assert_eq!(parse_key("F1"), Some(rdev::Key::F1));
        assert_eq!(parse_key("F12"), Some(rdev::Key::F12));
    }

    #[test]
    fn parse_named_keys() {
        assert_eq!(parse_key("Escape"), Some(rdev::Key::Escape));
        assert_eq!(parse_key("Esc"), Some(rdev::Key::Escape));
        assert_eq!(parse_key("Option"), Some(rdev::Key::Alt));
        assert_eq!(parse_key("Shift"), Some(rdev::Key::ShiftLeft));
        assert_eq!(parse_key("Cmd"), Some(rdev::Key::MetaLeft));
    }

    #[test]
    fn parse_letter_keys_case_insensitive() {
        assert_eq!(parse_key("A"), Some(rdev::Key::KeyA));
        assert_eq!(parse_key("a"), Some(rdev::Key::KeyA));
        assert_eq!(parse_key("Z"), Some(rdev::Key::KeyZ));
        assert_eq!(parse_key("z"), Some(rdev::Key::KeyZ));
    }

    #[test]
    fn parse_unknown_key_returns_none() {
        assert_eq!(parse_key("xyz"), None);
        assert_eq!(parse_key(""), None);
        assert_eq!(parse_key("Ctrl+V"), None);
        assert_eq!(parse_key("F13"), None);
    }
}
