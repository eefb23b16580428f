//! Global hotkey handling for the manual cycle trigger

use anyhow::{anyhow, Result};
use global_hotkey::{
    hotkey::{Code, HotKey, Modifiers},
    GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState,
};
use tracing::info;

/// Parses a hotkey string like "F9", "Ctrl+Shift+O", "Alt+F1" into a HotKey
pub fn parse_hotkey(hotkey_str: &str) -> Result<HotKey> {
    let parts: Vec<&str> = hotkey_str.split('+').map(|s| s.trim()).collect();

    let mut modifiers = Modifiers::empty();
    let mut key_code: Option<Code> = None;

    for part in parts {
        let upper = part.to_uppercase();
        match upper.as_str() {
            "CTRL" | "CONTROL" => modifiers |= Modifiers::CONTROL,
            "SHIFT" => modifiers |= Modifiers::SHIFT,
            "ALT" => modifiers |= Modifiers::ALT,
            "WIN" | "SUPER" | "META" => modifiers |= Modifiers::SUPER,
            _ => {
                key_code = Some(parse_key_code(&upper)?);
            }
        }
    }

    let code = key_code.ok_or_else(|| anyhow!("No key code found in hotkey string"))?;
    Ok(HotKey::new(Some(modifiers), code))
}

/// Parse a key code string into a Code enum
fn parse_key_code(key: &str) -> Result<Code> {
    let code = match key {
        // Function keys
        "F1" => Code::F1,
        "F2" => Code::F2,
        "F3" => Code::F3,
        "F4" => Code::F4,
        "F5" => Code::F5,
        "F6" => Code::F6,
        "F7" => Code::F7,
        "F8" => Code::F8,
        "F9" => Code::F9,
        "F10" => Code::F10,
        "F11" => Code::F11,
        "F12" => Code::F12,

        // Letters
        "A" => Code::KeyA,
        "B" => Code::KeyB,
        "C" => Code::KeyC,
        "D" => Code::KeyD,
        "E" => Code::KeyE,
        "F" => Code::KeyF,
        "G" => Code::KeyG,
        "H" => Code::KeyH,
        "I" => Code::KeyI,
        "J" => Code::KeyJ,
        "K" => Code::KeyK,
        "L" => Code::KeyL,
        "M" => Code::KeyM,
        "N" => Code::KeyN,
        "O" => Code::KeyO,
        "P" => Code::KeyP,
        "Q" => Code::KeyQ,
        "R" => Code::KeyR,
        "S" => Code::KeyS,
        "T" => Code::KeyT,
        "U" => Code::KeyU,
        "V" => Code::KeyV,
        "W" => Code::KeyW,
        "X" => Code::KeyX,
        "Y" => Code::KeyY,
        "Z" => Code::KeyZ,

        // Numbers
        "0" => Code::Digit0,
        "1" => Code::Digit1,
        "2" => Code::Digit2,
        "3" => Code::Digit3,
        "4" => Code::Digit4,
        "5" => Code::Digit5,
        "6" => Code::Digit6,
        "7" => Code::Digit7,
        "8" => Code::Digit8,
        "9" => Code::Digit9,

        // Special keys
        "SPACE" => Code::Space,
        "ENTER" | "RETURN" => Code::Enter,
        "ESCAPE" | "ESC" => Code::Escape,

        _ => return Err(anyhow!("Unknown key code: {}", key)),
    };

    Ok(code)
}

/// Register `hotkey_str` and call `on_press` every time it fires. Blocks
/// forever; one cycle runs to completion before the next press is handled,
/// so cycles never overlap.
pub fn run_trigger_loop(hotkey_str: &str, mut on_press: impl FnMut()) -> Result<()> {
    let manager = GlobalHotKeyManager::new()
        .map_err(|e| anyhow!("Failed to create hotkey manager: {e:?}"))?;
    let hotkey = parse_hotkey(hotkey_str)?;
    manager
        .register(hotkey)
        .map_err(|e| anyhow!("Failed to register hotkey: {e:?}"))?;

    info!("registered trigger hotkey: {hotkey_str}");
    let receiver = GlobalHotKeyEvent::receiver();
    loop {
        let event = receiver.recv()?;
        if event.id == hotkey.id() && event.state == HotKeyState::Pressed {
            on_press();
        }
    }
}
