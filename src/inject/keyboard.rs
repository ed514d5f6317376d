//! Keyboard simulation helpers backed by the `enigo` crate.
//!
//! [`simulate_paste`] sends the configured platform's paste chord to the
//! focused window; [`press_backspace`] erases previously injected feedback
//! one character at a time.
//!
//! | Platform | Paste chord |
//! |----------|-------------|
//! | macOS    | ⌘V (Meta + V) |
//! | Windows  | Ctrl+V |
//! | Linux    | Ctrl+V |

use enigo::{Direction, Enigo, Key, Keyboard, Settings};

use crate::config::Platform;

use super::InjectError;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Simulate the paste chord for `platform` in the currently focused window.
///
/// A new [`Enigo`] instance is created for each call because `Enigo` is not
/// `Send` and the handle is cheap to construct.
///
/// # Errors
///
/// Returns [`InjectError::KeySimulation`] if the enigo backend cannot be
/// initialised or if any key event fails to be delivered.
pub fn simulate_paste(platform: Platform) -> Result<(), InjectError> {
    let mut enigo = new_enigo()?;

    let modifier = match platform {
        Platform::Mac => Key::Meta,
        Platform::Windows | Platform::Linux => Key::Control,
    };

    enigo
        .key(modifier, Direction::Press)
        .map_err(|e| InjectError::KeySimulation(e.to_string()))?;
    enigo
        .key(Key::Unicode('v'), Direction::Click)
        .map_err(|e| InjectError::KeySimulation(e.to_string()))?;
    enigo
        .key(modifier, Direction::Release)
        .map_err(|e| InjectError::KeySimulation(e.to_string()))?;

    Ok(())
}

/// Send `n` backspace presses to the focused window.
///
/// A short pause between presses keeps slow applications from coalescing or
/// dropping deletions.
pub fn press_backspace(n: usize) -> Result<(), InjectError> {
    if n == 0 {
        return Ok(());
    }

    let mut enigo = new_enigo()?;
    for _ in 0..n {
        enigo
            .key(Key::Backspace, Direction::Click)
            .map_err(|e| InjectError::KeySimulation(e.to_string()))?;
        std::thread::sleep(std::time::Duration::from_millis(10));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn new_enigo() -> Result<Enigo, InjectError> {
    Enigo::new(&Settings::default()).map_err(|e| InjectError::KeySimulation(e.to_string()))
}
