//! Cursor-aware line editing over a caller-provided byte buffer.
//!
//! [`LineEdit`] is the pure state machine; `shell::read_line` drives
//! it from keyboard events and mirrors the buffer onto the display.
//! Invariants after every step: `cursor <= len < capacity` and
//! `buf[len] == 0`.

use crate::drivers::keyboard::KeyEvent;

pub struct LineEdit<'a> {
    buf: &'a mut [u8],
    len: usize,
    cursor: usize,
}

impl<'a> LineEdit<'a> {
    /// Start an empty edit over `buf`. `buf.len()` is the capacity;
    /// at most `capacity - 1` bytes of text fit, the rest is the NUL.
    pub fn new(buf: &'a mut [u8]) -> LineEdit<'a> {
        if let Some(first) = buf.first_mut() {
            *first = 0;
        }
        LineEdit { buf, len: 0, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// The edited text, without the terminating NUL.
    pub fn text(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Apply one key event. Returns `true` when the edit is finished
    /// (ENTER); the buffer is NUL-terminated either way.
    pub fn apply(&mut self, event: KeyEvent) -> bool {
        match event {
            KeyEvent::Left => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyEvent::Right => {
                if self.cursor < self.len {
                    self.cursor += 1;
                }
            }
            KeyEvent::Backspace => {
                if self.cursor > 0 {
                    self.buf.copy_within(self.cursor..self.len, self.cursor - 1);
                    self.cursor -= 1;
                    self.len -= 1;
                    self.buf[self.len] = 0;
                }
            }
            KeyEvent::Delete => {
                if self.cursor < self.len {
                    self.buf.copy_within(self.cursor + 1..self.len, self.cursor);
                    self.len -= 1;
                    self.buf[self.len] = 0;
                }
            }
            KeyEvent::Char(c) => {
                if self.len + 1 < self.buf.len() {
                    self.buf.copy_within(self.cursor..self.len, self.cursor + 1);
                    self.buf[self.cursor] = c;
                    self.cursor += 1;
                    self.len += 1;
                    self.buf[self.len] = 0;
                }
            }
            KeyEvent::Enter => {
                self.buf[self.len] = 0;
                return true;
            }
        }
        false
    }
}
