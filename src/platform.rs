//! Platform-specific key bindings

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Platform-appropriate modifier for wizard shortcuts
/// - macOS: SUPER (Cmd key), Ctrl also accepted
/// - Linux/Windows: CONTROL (Ctrl key)
#[cfg(target_os = "macos")]
pub const SHORTCUT_MODIFIER: KeyModifiers = KeyModifiers::SUPER;

#[cfg(not(target_os = "macos"))]
pub const SHORTCUT_MODIFIER: KeyModifiers = KeyModifiers::CONTROL;

#[cfg(target_os = "macos")]
pub const SAVE_SHORTCUT: &str = "Cmd+S";
#[cfg(not(target_os = "macos"))]
pub const SAVE_SHORTCUT: &str = "Ctrl+S";

#[cfg(target_os = "macos")]
pub const SEND_OTP_SHORTCUT: &str = "Cmd+O";
#[cfg(not(target_os = "macos"))]
pub const SEND_OTP_SHORTCUT: &str = "Ctrl+O";

#[cfg(target_os = "macos")]
pub const VERIFY_OTP_SHORTCUT: &str = "Cmd+V";
#[cfg(not(target_os = "macos"))]
pub const VERIFY_OTP_SHORTCUT: &str = "Ctrl+V";

#[cfg(target_os = "macos")]
pub const GSTIN_SHORTCUT: &str = "Cmd+G";
#[cfg(not(target_os = "macos"))]
pub const GSTIN_SHORTCUT: &str = "Ctrl+G";

/// Whether `key` is the shortcut for `c`
pub fn is_shortcut(key: &KeyEvent, c: char) -> bool {
    key.code == KeyCode::Char(c)
        && (key.modifiers.contains(SHORTCUT_MODIFIER)
            || key.modifiers.contains(KeyModifiers::CONTROL))
}
