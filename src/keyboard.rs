//! Ring buffer, modifier state, ALT-keypad composition, and the
//! redirected stream path.
//!
//! The ring holds up to 15 pending keystrokes; storage is a fixed-size
//! array addressed mod `RING_LENGTH + 1` (capacity + 1, to represent one
//! past the end), rather than a growable buffer with a separate length
//! check.

use std::collections::VecDeque;

pub const RING_LENGTH: usize = 15;

pub const LSHIFT: u8 = 0x1;
pub const RSHIFT: u8 = 0x2;
pub const CTRL: u8 = 0x4;
pub const ALT: u8 = 0x8;
pub const SCROLLLOCK: u8 = 0x10;
pub const NUMLOCK: u8 = 0x20;
pub const CAPSLOCK: u8 = 0x40;
pub const INSERT: u8 = 0x80;

const NONSTICKY_MASK: u8 = LSHIFT | RSHIFT | CTRL | ALT;

/// One slot in the ring: the eascii/codepage byte plus the scancode and
/// modifier mask it arrived with (absent for pre-seeded/synthetic entries).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Keystroke {
    pub ch: u8,
    pub scancode: Option<u8>,
    pub modifiers: Option<u8>,
}

/// Function-key eascii codes that trigger macro expansion (F1..F12, 0-based).
fn function_key_index(ch: u8) -> Option<usize> {
    match ch {
        0x3b..=0x44 => Some((ch - 0x3b) as usize), // F1..F10 scancodes reused as eascii, nominal
        _ => None,
    }
}

const DEFAULT_MACROS: [&[u8]; 12] = [
    b"LIST ", b"RUN\r", b"LOAD\"", b"SAVE\"", b"CONT\r", b",\"LPT1:\"\r",
    b"TRON\r", b"TROFF\r", b"KEY ", b"SCREEN 0,0,0\r", b"", b"",
];

/// Fixed-capacity 15-slot ring, an expansion vessel for macro bytes, and
/// bell-on-overflow.
pub struct KeyboardBuffer {
    slots: [Keystroke; RING_LENGTH + 1],
    occupied: usize,
    start: usize,
    expansion_vessel: Vec<u8>,
    key_replace: [Vec<u8>; 12],
    /// Set when `append` drops a keystroke because the ring is full; the
    /// caller (an external audio collaborator) reads and clears this to
    /// emit the bell tone.
    pub bell_pending: bool,
}

impl Default for KeyboardBuffer {
    fn default() -> Self {
        KeyboardBuffer {
            slots: [Keystroke::default(); RING_LENGTH + 1],
            occupied: 0,
            start: 0,
            expansion_vessel: Vec::new(),
            key_replace: DEFAULT_MACROS.map(|m| m.to_vec()),
            bell_pending: false,
        }
    }
}

impl KeyboardBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn ring_index(&self, index: usize) -> usize {
        (index + (RING_LENGTH + 1) - self.start % (RING_LENGTH + 1)) % (RING_LENGTH + 1)
    }

    pub fn length(&self) -> usize {
        self.occupied.min(RING_LENGTH)
    }

    pub fn is_empty(&self) -> bool {
        self.occupied == 0 && self.expansion_vessel.is_empty()
    }

    /// Append a keystroke; silently dropped (setting `bell_pending`) if
    /// the ring is already at capacity.
    pub fn append(&mut self, ch: u8, scancode: Option<u8>, modifiers: Option<u8>, check_full: bool) {
        if check_full && self.occupied >= RING_LENGTH {
            self.bell_pending = true;
            return;
        }
        let slot = (self.start + self.occupied) % (RING_LENGTH + 1);
        self.slots[slot] = Keystroke { ch, scancode, modifiers };
        self.occupied += 1;
    }

    fn pop_front(&mut self) -> Option<Keystroke> {
        if self.occupied == 0 {
            return None;
        }
        let k = self.slots[self.start];
        self.start = (self.start + 1) % (RING_LENGTH + 1);
        self.occupied -= 1;
        Some(k)
    }

    /// Drain the expansion vessel first; else pop the ring head. If the
    /// popped byte is a function key and expansion is enabled, refill the
    /// vessel from the macro table (possibly empty: the raw fn-key code is
    /// then returned so INKEY$ still observes it).
    pub fn getc(&mut self, expand: bool) -> u8 {
        if let Some(&first) = self.expansion_vessel.first() {
            self.expansion_vessel.remove(0);
            return first;
        }
        let ch = self.pop_front().map(|k| k.ch).unwrap_or(0);
        if ch == 0 || !expand {
            return ch;
        }
        match function_key_index(ch) {
            Some(idx) => {
                self.expansion_vessel = self.key_replace[idx].clone();
                if self.expansion_vessel.is_empty() {
                    ch
                } else {
                    self.expansion_vessel.remove(0)
                }
            }
            None => ch,
        }
    }

    pub fn peek(&self) -> u8 {
        if self.occupied == 0 {
            0
        } else {
            self.slots[self.start].ch
        }
    }

    pub fn set_macro(&mut self, num: usize, macro_bytes: &[u8]) {
        if num >= 1 && num <= self.key_replace.len() {
            let terminated: Vec<u8> = macro_bytes.iter().take_while(|&&b| b != 0).copied().collect();
            self.key_replace[num - 1] = terminated;
        }
    }

    pub fn get_macro(&self, num: usize) -> &[u8] {
        self.key_replace.get(num.wrapping_sub(1)).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn stop(&self) -> usize {
        (self.start + self.length()) % (RING_LENGTH + 1)
    }

    pub fn ring_read(&self, index: usize) -> (u8, u8) {
        let i = self.ring_index(index);
        if i == RING_LENGTH {
            (b'\r', 0)
        } else if i < self.occupied {
            let k = self.slots[(self.start + i) % (RING_LENGTH + 1)];
            (k.ch, k.scancode.unwrap_or(0))
        } else {
            (0, 0)
        }
    }

    pub fn ring_write(&mut self, index: usize, ch: u8, scancode: u8) {
        let i = self.ring_index(index);
        if i < RING_LENGTH {
            self.slots[(self.start + i) % (RING_LENGTH + 1)] = Keystroke { ch, scancode: Some(scancode), modifiers: None };
        }
    }

    /// Rotate storage so logical `start..stop` maps to `0..length`.
    pub fn set_boundaries(&mut self, start: usize, stop: usize) {
        let length = (stop + RING_LENGTH + 1 - start) % (RING_LENGTH + 1);
        let mut rotated = [Keystroke::default(); RING_LENGTH + 1];
        for i in 0..length.min(RING_LENGTH) {
            rotated[i] = self.slots[(start + i) % (RING_LENGTH + 1)];
        }
        self.slots = rotated;
        self.start = 0;
        self.occupied = length.min(RING_LENGTH);
    }
}

/// Full keyboard state: ring buffer, modifier mask, ALT-keypad
/// composition register, and the redirected/pasted stream of bytes.
pub struct Keyboard {
    pub buf: KeyboardBuffer,
    pub last_scancode: u8,
    pub modifiers: u8,
    keypad_ascii: String,
    ignore_caps: bool,
    stream: VecDeque<u8>,
    stream_closed: bool,
}

impl Default for Keyboard {
    fn default() -> Self {
        Keyboard {
            buf: KeyboardBuffer::new(),
            last_scancode: 0,
            modifiers: 0,
            keypad_ascii: String::new(),
            ignore_caps: false,
            stream: VecDeque::new(),
            stream_closed: false,
        }
    }
}

fn keypad_digit(scancode: u8) -> Option<u8> {
    match scancode {
        0x52..=0x5b => Some(b'0' + (scancode - 0x52)), // nominal KP0..KP9 scancode range
        _ => None,
    }
}

fn toggle_bit(scancode: u8) -> Option<u8> {
    match scancode {
        0x3a => Some(CAPSLOCK),
        0x45 => Some(NUMLOCK),
        0x46 => Some(SCROLLLOCK),
        0x52 => Some(INSERT),
        _ => None,
    }
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A key-down event: records the scancode, updates modifier state,
    /// and pushes the resulting character onto the ring (or expands it if
    /// it names a function-key macro).
    pub fn key_down(&mut self, ch: u8, scan: Option<u8>, mods: &[u8], check_full: bool) {
        if let Some(s) = scan {
            self.last_scancode = s;
        }
        self.modifiers &= !NONSTICKY_MASK;
        for &m in mods {
            self.modifiers |= m;
        }
        if let Some(s) = scan {
            if let Some(bit) = toggle_bit(s) {
                self.modifiers ^= bit;
            }
        }
        if mods.contains(&ALT) {
            if let Some(s) = scan {
                if let Some(digit) = keypad_digit(s) {
                    self.keypad_ascii.push(digit as char);
                    return;
                }
            }
        }
        let mut ch = ch;
        if self.modifiers & CAPSLOCK != 0 && !self.ignore_caps {
            ch = swap_case_byte(ch);
        }
        self.buf.append(ch, scan, Some(self.modifiers), check_full);
    }

    /// KEYB_UP(scan): clears nonsticky bits, and on ALT release flushes
    /// the keypad composition register as a single `chr(value mod 256)`.
    pub fn key_up(&mut self, scan: u8) {
        self.last_scancode = 0x80u8.wrapping_add(scan);
        if scan == 0x38 {
            // ALT release (nominal scancode)
            if !self.keypad_ascii.is_empty() {
                let value: u32 = self.keypad_ascii.parse().unwrap_or(0);
                let ch = (value % 256) as u8;
                self.buf.append(ch, None, None, true);
                self.keypad_ascii.clear();
            }
            self.modifiers &= !ALT;
        } else {
            self.modifiers &= !scancode_modifier_bit(scan);
        }
    }

    pub fn stream_chars(&mut self, text: &[u8]) {
        self.stream.extend(text.iter().copied());
    }

    pub fn close_input(&mut self) {
        self.stream_closed = true;
    }

    pub fn is_stream_closed(&self) -> bool {
        self.stream_closed
    }

    /// INKEY$: read one byte from keyboard or stream, nonblocking.
    pub fn inkey(&mut self) -> u8 {
        let c = self.buf.getc(true);
        if c != 0 {
            c
        } else {
            self.stream.pop_front().unwrap_or(0)
        }
    }

    /// One full (possibly double-byte) character, nonblocking.
    pub fn get_fullchar(&mut self, expand: bool, is_lead: impl Fn(u8) -> bool, is_trail: impl Fn(u8) -> bool) -> Vec<u8> {
        let c = self.buf.getc(expand);
        if c == 0 {
            if let Some(s) = self.stream.pop_front() {
                let mut out = vec![s];
                if is_lead(s) {
                    if let Some(&t) = self.stream.front() {
                        if is_trail(t) {
                            out.push(self.stream.pop_front().unwrap());
                        }
                    }
                }
                return out;
            }
            return Vec::new();
        }
        let mut out = vec![c];
        if is_lead(c) && is_trail(self.buf.peek()) {
            out.push(self.buf.getc(expand));
        }
        out
    }

    pub fn wait_char_ready(&self, keyboard_only: bool) -> bool {
        !self.buf.is_empty() || (!keyboard_only && self.stream_closed)
    }
}

fn scancode_modifier_bit(scan: u8) -> u8 {
    match scan {
        0x1d => CTRL,
        0x38 => ALT,
        0x2a => LSHIFT,
        0x36 => RSHIFT,
        _ => 0,
    }
}

fn swap_case_byte(ch: u8) -> u8 {
    if ch.is_ascii_lowercase() {
        ch.to_ascii_uppercase()
    } else if ch.is_ascii_uppercase() {
        ch.to_ascii_lowercase()
    } else {
        ch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_caps_at_capacity() {
        let mut buf = KeyboardBuffer::new();
        for i in 0..20u8 {
            buf.append(b'a' + (i % 26), None, None, true);
        }
        assert_eq!(buf.length(), RING_LENGTH);
        assert!(buf.bell_pending);
    }

    #[test]
    fn getc_drains_in_fifo_order() {
        let mut buf = KeyboardBuffer::new();
        buf.append(b'x', None, None, true);
        buf.append(b'y', None, None, true);
        assert_eq!(buf.getc(false), b'x');
        assert_eq!(buf.getc(false), b'y');
        assert_eq!(buf.getc(false), 0);
    }

    #[test]
    fn modifier_clears_nonsticky_each_keydown() {
        let mut kb = Keyboard::new();
        kb.key_down(b'a', Some(0x1e), &[CTRL], true);
        assert_eq!(kb.modifiers & CTRL, CTRL);
        kb.key_down(b'b', Some(0x30), &[], true);
        assert_eq!(kb.modifiers & CTRL, 0);
    }

    #[test]
    fn capslock_toggles_on_keydown() {
        let mut kb = Keyboard::new();
        kb.key_down(0, Some(0x3a), &[], true);
        assert_eq!(kb.modifiers & CAPSLOCK, CAPSLOCK);
        kb.key_down(0, Some(0x3a), &[], true);
        assert_eq!(kb.modifiers & CAPSLOCK, 0);
    }

    #[test]
    fn inkey_reads_stream_when_ring_empty() {
        let mut kb = Keyboard::new();
        kb.stream_chars(b"hi");
        assert_eq!(kb.inkey(), b'h');
        assert_eq!(kb.inkey(), b'i');
    }
}
