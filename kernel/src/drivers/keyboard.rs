//! Polled PS/2 keyboard decoder.
//!
//! The kernel runs with interrupts disabled, so scancodes are pulled
//! straight off the controller whenever the status port reports data.
//! Decoding (scancode set 1, shift state, 0xE0 extended sequences,
//! press/release edges) is driven by the `pc_keyboard` state machine;
//! only complete press-edge keys surface as [`KeyEvent`]s, everything
//! else is silently dropped and recovery is automatic on the next
//! scancode.

use crate::arch;
use pc_keyboard::{layouts, DecodedKey, HandleControl, KeyCode, ScancodeSet1};

// PS/2 controller ports (Intel 8042)
const KBD_DATA_PORT: u16 = 0x60;
const KBD_STATUS_PORT: u16 = 0x64;

// Status register bits
const STATUS_OUTPUT_FULL: u8 = 0x01;

/// A complete, press-edge key the shell cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    /// Printable ASCII in `[0x20, 0x7E]`.
    Char(u8),
    Enter,
    Backspace,
    Left,
    Right,
    Delete,
}

pub struct Keyboard {
    decoder: pc_keyboard::Keyboard<layouts::Us104Key, ScancodeSet1>,
}

impl Keyboard {
    pub fn new() -> Self {
        Keyboard {
            decoder: pc_keyboard::Keyboard::new(HandleControl::Ignore),
        }
    }

    /// Non-blocking poll: `None` unless the controller has a byte
    /// that completes a mapped press-edge key.
    pub fn try_poll(&mut self) -> Option<KeyEvent> {
        if arch::inb(KBD_STATUS_PORT) & STATUS_OUTPUT_FULL == 0 {
            return None;
        }
        let scancode = arch::inb(KBD_DATA_PORT);
        self.feed(scancode)
    }

    /// Advance the decoder by one scancode. Partial sequences,
    /// releases, modifiers and unmapped keys yield `None`.
    pub fn feed(&mut self, scancode: u8) -> Option<KeyEvent> {
        let event = self.decoder.add_byte(scancode).ok().flatten()?;
        let key = self.decoder.process_keyevent(event)?;
        match key {
            DecodedKey::Unicode(c) => match c {
                '\n' | '\r' => Some(KeyEvent::Enter),
                '\u{8}' => Some(KeyEvent::Backspace),
                '\u{7f}' => Some(KeyEvent::Delete),
                c if (' '..='~').contains(&c) => Some(KeyEvent::Char(c as u8)),
                _ => None,
            },
            DecodedKey::RawKey(code) => match code {
                KeyCode::ArrowLeft => Some(KeyEvent::Left),
                KeyCode::ArrowRight => Some(KeyEvent::Right),
                KeyCode::Delete => Some(KeyEvent::Delete),
                _ => None,
            },
        }
    }
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LSHIFT_DOWN: u8 = 0x2A;
    const LSHIFT_UP: u8 = 0xAA;
    const EXTENDED: u8 = 0xE0;

    #[test]
    fn plain_letter_press_maps_to_char() {
        let mut kbd = Keyboard::new();
        assert_eq!(kbd.feed(0x23), Some(KeyEvent::Char(b'h')));
        // Release edge produces nothing.
        assert_eq!(kbd.feed(0x23 | 0x80), None);
    }

    #[test]
    fn shift_changes_mapping_until_released() {
        let mut kbd = Keyboard::new();
        assert_eq!(kbd.feed(LSHIFT_DOWN), None);
        assert_eq!(kbd.feed(0x02), Some(KeyEvent::Char(b'!')));
        assert_eq!(kbd.feed(LSHIFT_UP), None);
        assert_eq!(kbd.feed(0x02), Some(KeyEvent::Char(b'1')));
    }

    #[test]
    fn enter_and_backspace_are_distinct_events() {
        let mut kbd = Keyboard::new();
        assert_eq!(kbd.feed(0x1C), Some(KeyEvent::Enter));
        assert_eq!(kbd.feed(0x1C | 0x80), None);
        assert_eq!(kbd.feed(0x0E), Some(KeyEvent::Backspace));
    }

    #[test]
    fn extended_prefix_then_code_yields_exactly_one_event() {
        let mut kbd = Keyboard::new();
        assert_eq!(kbd.feed(EXTENDED), None);
        assert_eq!(kbd.feed(0x4B), Some(KeyEvent::Left));
        assert_eq!(kbd.feed(EXTENDED), None);
        assert_eq!(kbd.feed(0x4D), Some(KeyEvent::Right));
        assert_eq!(kbd.feed(EXTENDED), None);
        assert_eq!(kbd.feed(0x53), Some(KeyEvent::Delete));
    }

    #[test]
    fn extended_release_produces_no_event() {
        let mut kbd = Keyboard::new();
        assert_eq!(kbd.feed(EXTENDED), None);
        assert_eq!(kbd.feed(0x4B | 0x80), None);
        // The pending-extended state was consumed: a fresh sequence
        // still decodes normally.
        assert_eq!(kbd.feed(EXTENDED), None);
        assert_eq!(kbd.feed(0x4B), Some(KeyEvent::Left));
    }

    #[test]
    fn space_and_symbols_are_printable_chars() {
        let mut kbd = Keyboard::new();
        assert_eq!(kbd.feed(0x39), Some(KeyEvent::Char(b' ')));
        assert_eq!(kbd.feed(0x0C), Some(KeyEvent::Char(b'-')));
    }
}
