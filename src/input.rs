//! Translates keyboard and mouse events into VT byte sequences.
//!
//! Mirrors `contour`'s `InputGenerator`: state for cursor-keys mode, numpad
//! mode, bracketed paste, focus events, and the active mouse protocol/
//! transport lives on [`InputGenerator`] itself rather than on [`Terminal`],
//! since none of it is VT-stream-visible state — it only shapes what bytes
//! get generated for host-delivered key/mouse events.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const NONE  = 0b0000;
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
        const SUPER = 0b1000;
    }
}

impl Modifiers {
    /// xterm's `;modifier` CSI parameter: `1 + (Shift | Alt<<1 | Control<<2 | Super<<3)`.
    pub fn csi_param(self) -> u16 {
        1 + self.bits() as u16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Char(char),
    Enter,
    Escape,
    Backspace,
    Tab,
    BackTab,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    F(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(code: KeyCode, modifiers: Modifiers) -> Self {
        Self { code, modifiers }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseEventKind {
    Down(MouseButton),
    Up(MouseButton),
    Drag(MouseButton),
    Moved,
    ScrollUp,
    ScrollDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub col: u16,
    pub row: u16,
    pub modifiers: Modifiers,
}

/// Outcome of feeding an event: whether the generator produced bytes, and
/// whether the event should additionally be handed to the UI layer (used
/// for passive mouse tracking, where the terminal app gets bytes but the
/// embedding UI may still want the raw event).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOutcome {
    pub handled: bool,
}

pub struct InputGenerator {
    buffer: Vec<u8>,
    consumed: usize,
    pub application_cursor_keys: bool,
    pub application_keypad: bool,
    pub bracketed_paste: bool,
    pub focus_events: bool,
    pub mouse_protocol: Option<crate::modes::MouseProtocol>,
    pub mouse_transport: crate::modes::MouseTransport,
    pub mouse_wheel_mode: crate::modes::MouseWheelMode,
    pub passive_mouse_tracking: bool,
    pressed_buttons: Vec<MouseButton>,
    last_reported: Option<(u16, u16)>,
}

impl InputGenerator {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            consumed: 0,
            application_cursor_keys: false,
            application_keypad: false,
            bracketed_paste: false,
            focus_events: false,
            mouse_protocol: None,
            mouse_transport: crate::modes::MouseTransport::Default,
            mouse_wheel_mode: crate::modes::MouseWheelMode::Mouse,
            passive_mouse_tracking: false,
            pressed_buttons: Vec::new(),
            last_reported: None,
        }
    }

    /// Sync generator-visible mode state from the live `Modes`. Called by
    /// the host after each `Terminal::feed` in case DECSET/DECRST changed
    /// cursor-keys mode, mouse protocol, bracketed paste, or focus events.
    pub fn sync_modes(&mut self, modes: &crate::modes::Modes) {
        self.application_cursor_keys = modes.application_cursor_keys();
        self.application_keypad = modes.application_keypad();
        self.bracketed_paste = modes.bracketed_paste();
        self.focus_events = modes.focus_events();
        self.mouse_protocol = modes.mouse_protocol();
        self.mouse_transport = modes.mouse_transport();
    }

    fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Peek at the bytes generated so far but not yet consumed.
    pub fn pending(&self) -> &[u8] {
        &self.buffer[self.consumed..]
    }

    /// Mark `n` pending bytes as written to the PTY, reclaiming buffer
    /// space once everything has been consumed.
    pub fn consume(&mut self, n: usize) {
        self.consumed = (self.consumed + n).min(self.buffer.len());
        if self.consumed == self.buffer.len() {
            self.buffer.clear();
            self.consumed = 0;
        }
    }

    pub fn generate_paste(&mut self, text: &str) {
        if self.bracketed_paste {
            self.push(b"\x1b[200~");
            self.push(text.as_bytes());
            self.push(b"\x1b[201~");
        } else {
            self.push(text.as_bytes());
        }
    }

    pub fn generate_focus_in(&mut self) {
        if self.focus_events {
            self.push(b"\x1b[I");
        }
    }

    pub fn generate_focus_out(&mut self) {
        if self.focus_events {
            self.push(b"\x1b[O");
        }
    }

    pub fn generate_key(&mut self, key: KeyEvent) -> GenerateOutcome {
        match key.code {
            KeyCode::Char(ch) if key.modifiers.is_empty() => {
                let mut buf = [0u8; 4];
                self.push(ch.encode_utf8(&mut buf).as_bytes());
            }
            KeyCode::Char(ch) if key.modifiers == Modifiers::CTRL && ch.is_ascii_alphabetic() => {
                self.push(&[(ch.to_ascii_uppercase() as u8) & 0x1f]);
            }
            KeyCode::Char(ch) => {
                self.push(format!("\x1b[27;{};{}~", key.modifiers.csi_param(), ch as u32).as_bytes());
            }
            KeyCode::Enter => self.push(b"\r"),
            KeyCode::Escape => self.push(b"\x1b"),
            KeyCode::Backspace => self.push(b"\x7f"),
            KeyCode::Tab if key.modifiers == Modifiers::SHIFT => self.push(b"\x1b[Z"),
            KeyCode::Tab => self.push(b"\t"),
            KeyCode::BackTab => self.push(b"\x1b[Z"),
            KeyCode::Up => self.named_key(b'A', key.modifiers),
            KeyCode::Down => self.named_key(b'B', key.modifiers),
            KeyCode::Right => self.named_key(b'C', key.modifiers),
            KeyCode::Left => self.named_key(b'D', key.modifiers),
            KeyCode::Home => self.named_key(b'H', key.modifiers),
            KeyCode::End => self.named_key(b'F', key.modifiers),
            KeyCode::Insert => self.tilde_key(2, key.modifiers),
            KeyCode::Delete => self.tilde_key(3, key.modifiers),
            KeyCode::PageUp => self.tilde_key(5, key.modifiers),
            KeyCode::PageDown => self.tilde_key(6, key.modifiers),
            KeyCode::F(n) => self.function_key(n, key.modifiers),
        }
        GenerateOutcome { handled: true }
    }

    /// Cursor-key family (arrows, Home, End): `ESC O x` in application mode
    /// with no modifiers, `ESC [ x` / `ESC [ 1 ; mod x` otherwise.
    fn named_key(&mut self, letter: u8, modifiers: Modifiers) {
        if modifiers.is_empty() {
            if self.application_cursor_keys {
                self.push(&[0x1b, b'O', letter]);
            } else {
                self.push(&[0x1b, b'[', letter]);
            }
        } else {
            self.push(format!("\x1b[1;{}{}", modifiers.csi_param(), letter as char).as_bytes());
        }
    }

    fn tilde_key(&mut self, code: u16, modifiers: Modifiers) {
        if modifiers.is_empty() {
            self.push(format!("\x1b[{}~", code).as_bytes());
        } else {
            self.push(format!("\x1b[{};{}~", code, modifiers.csi_param()).as_bytes());
        }
    }

    fn function_key(&mut self, n: u8, modifiers: Modifiers) {
        let code = match n {
            1..=4 => {
                let letter = (b'P' + (n - 1)) as char;
                if modifiers.is_empty() {
                    self.push(format!("\x1bO{letter}").as_bytes());
                } else {
                    self.push(format!("\x1b[1;{}{letter}", modifiers.csi_param()).as_bytes());
                }
                return;
            }
            5 => 15,
            6 => 17,
            7 => 18,
            8 => 19,
            9 => 20,
            10 => 21,
            11 => 23,
            12 => 24,
            _ => return,
        };
        self.tilde_key(code, modifiers);
    }

    pub fn generate_mouse(&mut self, event: MouseEvent) -> GenerateOutcome {
        let Some(protocol) = self.mouse_protocol else {
            if self.passive_mouse_tracking {
                return GenerateOutcome { handled: false };
            }
            return GenerateOutcome { handled: true };
        };
        if !self.protocol_reports(protocol, event.kind) {
            return GenerateOutcome { handled: true };
        }
        self.track_buttons(event.kind);
        self.encode_mouse(event);
        self.last_reported = Some((event.col, event.row));
        GenerateOutcome { handled: true }
    }

    fn track_buttons(&mut self, kind: MouseEventKind) {
        match kind {
            MouseEventKind::Down(b) => {
                if !self.pressed_buttons.contains(&b) {
                    self.pressed_buttons.push(b);
                }
            }
            MouseEventKind::Up(b) => self.pressed_buttons.retain(|&x| x != b),
            _ => {}
        }
    }

    fn protocol_reports(&self, protocol: crate::modes::MouseProtocol, kind: MouseEventKind) -> bool {
        use crate::modes::MouseProtocol::*;
        match protocol {
            X10 => matches!(kind, MouseEventKind::Down(_)),
            Normal | Highlight => matches!(kind, MouseEventKind::Down(_) | MouseEventKind::Up(_)),
            ButtonEvent => matches!(
                kind,
                MouseEventKind::Down(_) | MouseEventKind::Up(_) | MouseEventKind::Drag(_)
            ) || self.is_wheel(kind),
            AnyEvent => true,
        }
    }

    fn is_wheel(&self, kind: MouseEventKind) -> bool {
        matches!(kind, MouseEventKind::ScrollUp | MouseEventKind::ScrollDown)
    }

    /// Wheel events bypass mouse encoding entirely when `mouse_wheel_mode`
    /// remaps them to cursor-key sequences instead.
    pub fn generate_wheel(&mut self, kind: MouseEventKind, modifiers: Modifiers) -> GenerateOutcome {
        use crate::modes::MouseWheelMode::*;
        match self.mouse_wheel_mode {
            Mouse => self.generate_mouse(MouseEvent {
                kind,
                col: self.last_reported.map_or(0, |(c, _)| c),
                row: self.last_reported.map_or(0, |(_, r)| r),
                modifiers,
            }),
            NormalCursorKeys | ApplicationCursorKeys => {
                let was_app = self.application_cursor_keys;
                self.application_cursor_keys = matches!(self.mouse_wheel_mode, ApplicationCursorKeys);
                match kind {
                    MouseEventKind::ScrollUp => self.named_key(b'A', modifiers),
                    MouseEventKind::ScrollDown => self.named_key(b'B', modifiers),
                    _ => {}
                }
                self.application_cursor_keys = was_app;
                GenerateOutcome { handled: true }
            }
        }
    }

    fn button_code(kind: MouseEventKind) -> u8 {
        match kind {
            MouseEventKind::Down(MouseButton::Left) | MouseEventKind::Drag(MouseButton::Left) => 0,
            MouseEventKind::Down(MouseButton::Middle) | MouseEventKind::Drag(MouseButton::Middle) => 1,
            MouseEventKind::Down(MouseButton::Right) | MouseEventKind::Drag(MouseButton::Right) => 2,
            MouseEventKind::Up(_) => 3,
            MouseEventKind::Moved => 35,
            MouseEventKind::ScrollUp => 64,
            MouseEventKind::ScrollDown => 65,
        }
    }

    fn encode_mouse(&mut self, event: MouseEvent) {
        let mut cb = Self::button_code(event.kind);
        if event.modifiers.contains(Modifiers::SHIFT) {
            cb |= 4;
        }
        if event.modifiers.contains(Modifiers::ALT) {
            cb |= 8;
        }
        if event.modifiers.contains(Modifiers::CTRL) {
            cb |= 16;
        }
        if matches!(event.kind, MouseEventKind::Drag(_)) {
            cb |= 32;
        }
        use crate::modes::MouseTransport::*;
        match self.mouse_transport {
            Sgr | SgrPixels => {
                let suffix = if matches!(event.kind, MouseEventKind::Up(_)) { 'm' } else { 'M' };
                self.push(format!("\x1b[<{};{};{}{}", cb, event.col + 1, event.row + 1, suffix).as_bytes());
            }
            Urxvt => {
                self.push(format!("\x1b[{};{};{}M", cb + 32, event.col + 1, event.row + 1).as_bytes());
            }
            Extended => {
                let mut s = Vec::from(b"\x1b[M".as_slice());
                s.push(cb + 0x20);
                push_utf8_coord(&mut s, event.col + 1 + 0x20);
                push_utf8_coord(&mut s, event.row + 1 + 0x20);
                self.push(&s);
            }
            Default => {
                let cx = (event.col + 1).min(223) as u8;
                let cy = (event.row + 1).min(223) as u8;
                self.push(&[0x1b, b'[', b'M', cb + 0x20, cx + 0x20, cy + 0x20]);
            }
        }
    }
}

fn push_utf8_coord(out: &mut Vec<u8>, value: u16) {
    if let Some(ch) = char::from_u32(value as u32) {
        let mut buf = [0u8; 4];
        out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
    }
}

impl Default for InputGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_char_emits_raw_byte() {
        let mut gen = InputGenerator::new();
        gen.generate_key(KeyEvent::new(KeyCode::Char('a'), Modifiers::NONE));
        assert_eq!(gen.pending(), b"a");
    }

    #[test]
    fn ctrl_letter_emits_control_byte() {
        let mut gen = InputGenerator::new();
        gen.generate_key(KeyEvent::new(KeyCode::Char('c'), Modifiers::CTRL));
        assert_eq!(gen.pending(), [0x03]);
    }

    #[test]
    fn arrow_key_respects_application_cursor_keys() {
        let mut gen = InputGenerator::new();
        gen.generate_key(KeyEvent::new(KeyCode::Up, Modifiers::NONE));
        assert_eq!(gen.pending(), b"\x1b[A");
        gen.consume(gen.pending().len());
        gen.application_cursor_keys = true;
        gen.generate_key(KeyEvent::new(KeyCode::Up, Modifiers::NONE));
        assert_eq!(gen.pending(), b"\x1bOA");
    }

    #[test]
    fn bracketed_paste_wraps_text() {
        let mut gen = InputGenerator::new();
        gen.bracketed_paste = true;
        gen.generate_paste("hi");
        assert_eq!(gen.pending(), b"\x1b[200~hi\x1b[201~");
    }

    #[test]
    fn consume_clears_buffer_once_fully_consumed() {
        let mut gen = InputGenerator::new();
        gen.generate_key(KeyEvent::new(KeyCode::Char('x'), Modifiers::NONE));
        gen.consume(1);
        assert!(gen.pending().is_empty());
    }

    #[test]
    fn sgr_mouse_press_encodes_button_and_one_indexed_coords() {
        let mut gen = InputGenerator::new();
        gen.mouse_protocol = Some(crate::modes::MouseProtocol::Normal);
        gen.mouse_transport = crate::modes::MouseTransport::Sgr;
        gen.generate_mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            col: 4,
            row: 2,
            modifiers: Modifiers::NONE,
        });
        assert_eq!(gen.pending(), b"\x1b[<0;5;3M");
    }

    #[test]
    fn x10_protocol_ignores_release_events() {
        let mut gen = InputGenerator::new();
        gen.mouse_protocol = Some(crate::modes::MouseProtocol::X10);
        gen.mouse_transport = crate::modes::MouseTransport::Sgr;
        gen.generate_mouse(MouseEvent {
            kind: MouseEventKind::Up(MouseButton::Left),
            col: 0,
            row: 0,
            modifiers: Modifiers::NONE,
        });
        assert!(gen.pending().is_empty());
    }

    #[test]
    fn no_protocol_with_passive_tracking_reports_unhandled() {
        let mut gen = InputGenerator::new();
        gen.passive_mouse_tracking = true;
        let outcome = gen.generate_mouse(MouseEvent {
            kind: MouseEventKind::Moved,
            col: 0,
            row: 0,
            modifiers: Modifiers::NONE,
        });
        assert!(!outcome.handled);
    }

    #[test]
    fn wheel_remapped_to_cursor_keys_when_configured() {
        let mut gen = InputGenerator::new();
        gen.mouse_wheel_mode = crate::modes::MouseWheelMode::NormalCursorKeys;
        gen.generate_wheel(MouseEventKind::ScrollUp, Modifiers::NONE);
        assert_eq!(gen.pending(), b"\x1b[A");
    }
}
