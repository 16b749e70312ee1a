//! ANSI and DEC private mode state (SM/RM/DECSET/DECRST/DECRQM), plus the
//! per-mode save/restore stacks used by `CSI ? Pm s` / `CSI ? Pm r`.

use bitflags::bitflags;
use std::collections::HashMap;

bitflags! {
    /// ANSI modes (set/reset via `CSI Pm h`/`CSI Pm l`, no `?` leader).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AnsiModes: u8 {
        /// KAM (2): Keyboard Action Mode.
        const KEYBOARD_ACTION = 1 << 0;
        /// IRM (4): Insert/Replace Mode.
        const INSERT          = 1 << 1;
        /// SRM (12): Send/Receive (local echo) Mode.
        const SEND_RECEIVE    = 1 << 2;
        /// LNM (20): Linefeed/Newline Mode.
        const LINEFEED_NEWLINE = 1 << 3;
    }
}

fn ansi_bit(param: u16) -> Option<AnsiModes> {
    match param {
        2 => Some(AnsiModes::KEYBOARD_ACTION),
        4 => Some(AnsiModes::INSERT),
        12 => Some(AnsiModes::SEND_RECEIVE),
        20 => Some(AnsiModes::LINEFEED_NEWLINE),
        _ => None,
    }
}

/// Well-known DEC private mode numbers (`CSI ? Pm h`/`l`).
///
/// Not exhaustive as a type — `Modes::set_dec_mode` accepts any `u16` and
/// stores it sparsely — but these constants name the ones this crate's
/// screen/terminal layer actually interprets.
pub mod dec {
    pub const APPLICATION_CURSOR_KEYS: u16 = 1;
    pub const DECANM: u16 = 2;
    pub const DECCOLM: u16 = 3;
    pub const DECSCNM: u16 = 5;
    pub const DECOM: u16 = 6;
    pub const DECAWM: u16 = 7;
    pub const MOUSE_X10: u16 = 9;
    pub const APPLICATION_KEYPAD: u16 = 66;
    pub const SIXEL_SCROLLING: u16 = 80;
    pub const MOUSE_NORMAL: u16 = 1000;
    pub const MOUSE_HIGHLIGHT: u16 = 1001;
    pub const MOUSE_BUTTON_EVENT: u16 = 1002;
    pub const MOUSE_ANY_EVENT: u16 = 1003;
    pub const FOCUS_EVENTS: u16 = 1004;
    pub const MOUSE_UTF8: u16 = 1005;
    pub const MOUSE_SGR: u16 = 1006;
    pub const ALTERNATE_SCROLL: u16 = 1007;
    pub const MOUSE_URXVT: u16 = 1015;
    pub const MOUSE_SGR_PIXELS: u16 = 1016;
    pub const ALT_SCREEN: u16 = 47;
    pub const DECTCEM: u16 = 25;
    pub const ALT_SCREEN_SAVE_CURSOR_CLEAR: u16 = 1047;
    pub const ALT_SCREEN_SAVE_CURSOR: u16 = 1049;
    pub const LEFT_RIGHT_MARGIN: u16 = 69;
    pub const BRACKETED_PASTE: u16 = 2004;
    pub const SIXEL_PRIVATE_COLOR_REGISTERS: u16 = 1070;
    pub const BATCHED_RENDERING: u16 = 2026;
    pub const TEXT_REFLOW: u16 = 2027;
    pub const SIXEL_CURSOR_NEXT_TO_GRAPHIC: u16 = 8452;
    pub const ALLOW_COLUMNS_80_TO_132: u16 = 40;
    pub const SMOOTH_SCROLL: u16 = 4;
}

/// Combined ANSI + DEC mode state, with per-DEC-mode save/restore stacks.
#[derive(Debug, Clone)]
pub struct Modes {
    pub ansi: AnsiModes,
    dec: HashMap<u16, bool>,
    dec_stack: HashMap<u16, Vec<bool>>,
    /// DECSCL conformance level (`Ps1`: 61-65 for VT100-VT500), recorded but
    /// not consulted by the parser/sequencer — this crate targets a
    /// pragmatic xterm superset rather than level-gated VT525 fidelity.
    conformance_level: u16,
    /// DECSCL `Ps2`: 8-bit controls acceptance (0/2 = allowed, 1 = 7-bit only).
    conformance_8bit_controls: bool,
}

impl Default for Modes {
    fn default() -> Self {
        let mut dec = HashMap::new();
        // Power-on defaults per DEC STD 070 / xterm: DECAWM on, DECTCEM on.
        dec.insert(dec::DECAWM, true);
        dec.insert(dec::DECTCEM, true);
        Self {
            ansi: AnsiModes::empty(),
            dec,
            dec_stack: HashMap::new(),
            conformance_level: 65,
            conformance_8bit_controls: true,
        }
    }
}

impl Modes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to power-on defaults (RIS).
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Soft reset (DECSTR): same mode defaults as RIS in this implementation,
    /// but the save/restore stacks are left intact.
    pub fn soft_reset(&mut self) {
        let stack = std::mem::take(&mut self.dec_stack);
        *self = Self::default();
        self.dec_stack = stack;
    }

    pub fn set_ansi_mode(&mut self, param: u16, enable: bool) {
        if let Some(bit) = ansi_bit(param) {
            self.ansi.set(bit, enable);
        }
    }

    pub fn ansi_mode(&self, param: u16) -> bool {
        ansi_bit(param).is_some_and(|bit| self.ansi.contains(bit))
    }

    pub fn set_dec_mode(&mut self, param: u16, enable: bool) {
        self.dec.insert(param, enable);
    }

    pub fn dec_mode(&self, param: u16) -> bool {
        self.dec.get(&param).copied().unwrap_or(false)
    }

    /// DECRQM reply code: 0 = not recognized, 1 = set, 2 = reset,
    /// 3 = permanently set, 4 = permanently reset. This implementation
    /// never reports permanent states.
    pub fn query_dec_mode(&self, param: u16) -> u8 {
        match self.dec.get(&param) {
            Some(true) => 1,
            Some(false) => 2,
            None => 0,
        }
    }

    pub fn query_ansi_mode(&self, param: u16) -> u8 {
        match ansi_bit(param) {
            Some(bit) => {
                if self.ansi.contains(bit) {
                    1
                } else {
                    2
                }
            }
            None => 0,
        }
    }

    /// Push the current value of a DEC mode onto its private save stack
    /// (`CSI ? Pm s`).
    pub fn push_dec_mode(&mut self, param: u16) {
        let value = self.dec_mode(param);
        self.dec_stack.entry(param).or_default().push(value);
    }

    /// Pop and restore a DEC mode from its private save stack
    /// (`CSI ? Pm r`). A pop with nothing saved is a no-op.
    pub fn pop_dec_mode(&mut self, param: u16) {
        if let Some(stack) = self.dec_stack.get_mut(&param)
            && let Some(value) = stack.pop()
        {
            self.dec.insert(param, value);
        }
    }

    pub fn origin_mode(&self) -> bool {
        self.dec_mode(dec::DECOM)
    }

    pub fn autowrap(&self) -> bool {
        self.dec_mode(dec::DECAWM)
    }

    pub fn insert_mode(&self) -> bool {
        self.ansi.contains(AnsiModes::INSERT)
    }

    pub fn cursor_visible(&self) -> bool {
        self.dec_mode(dec::DECTCEM)
    }

    pub fn application_cursor_keys(&self) -> bool {
        self.dec_mode(dec::APPLICATION_CURSOR_KEYS)
    }

    pub fn application_keypad(&self) -> bool {
        self.dec_mode(dec::APPLICATION_KEYPAD)
    }

    pub fn bracketed_paste(&self) -> bool {
        self.dec_mode(dec::BRACKETED_PASTE)
    }

    pub fn focus_events(&self) -> bool {
        self.dec_mode(dec::FOCUS_EVENTS)
    }

    pub fn reverse_video(&self) -> bool {
        self.dec_mode(dec::DECSCNM)
    }

    pub fn batched_rendering(&self) -> bool {
        self.dec_mode(dec::BATCHED_RENDERING)
    }

    /// DECSCL: record the conformance level (`Ps1`, e.g. 61 = VT100,
    /// 65 = VT500) and whether 8-bit controls are accepted (`Ps2`: 0 or 2
    /// means yes, 1 means 7-bit only). Values outside the known range are
    /// clamped to the nearest recognized level rather than rejected.
    pub fn set_conformance_level(&mut self, ps1: u16, ps2: u16) {
        self.conformance_level = match ps1 {
            61..=65 => ps1,
            _ => 65,
        };
        self.conformance_8bit_controls = ps2 != 1;
    }

    pub fn conformance_level(&self) -> u16 {
        self.conformance_level
    }

    pub fn conformance_8bit_controls(&self) -> bool {
        self.conformance_8bit_controls
    }

    pub fn reflow_enabled(&self) -> bool {
        !self.dec.contains_key(&dec::TEXT_REFLOW) || self.dec_mode(dec::TEXT_REFLOW)
    }

    pub fn alt_screen_active(&self) -> bool {
        self.dec_mode(dec::ALT_SCREEN)
            || self.dec_mode(dec::ALT_SCREEN_SAVE_CURSOR_CLEAR)
            || self.dec_mode(dec::ALT_SCREEN_SAVE_CURSOR)
    }

    /// Mouse tracking protocol currently enabled, in priority order
    /// (only one is meaningfully active at a time in real usage, but xterm
    /// lets multiple bits be set; any-event wins, then button, then normal,
    /// then X10).
    pub fn mouse_protocol(&self) -> Option<MouseProtocol> {
        if self.dec_mode(dec::MOUSE_ANY_EVENT) {
            Some(MouseProtocol::AnyEvent)
        } else if self.dec_mode(dec::MOUSE_BUTTON_EVENT) {
            Some(MouseProtocol::ButtonEvent)
        } else if self.dec_mode(dec::MOUSE_HIGHLIGHT) {
            Some(MouseProtocol::Highlight)
        } else if self.dec_mode(dec::MOUSE_NORMAL) {
            Some(MouseProtocol::Normal)
        } else if self.dec_mode(dec::MOUSE_X10) {
            Some(MouseProtocol::X10)
        } else {
            None
        }
    }

    pub fn mouse_transport(&self) -> MouseTransport {
        if self.dec_mode(dec::MOUSE_SGR_PIXELS) {
            MouseTransport::SgrPixels
        } else if self.dec_mode(dec::MOUSE_SGR) {
            MouseTransport::Sgr
        } else if self.dec_mode(dec::MOUSE_URXVT) {
            MouseTransport::Urxvt
        } else if self.dec_mode(dec::MOUSE_UTF8) {
            MouseTransport::Extended
        } else {
            MouseTransport::Default
        }
    }
}

/// Mouse event tracking protocol (which events are reported).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseProtocol {
    X10,
    Normal,
    Highlight,
    ButtonEvent,
    AnyEvent,
}

/// Mouse coordinate/button transport encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseTransport {
    Default,
    Extended,
    Sgr,
    SgrPixels,
    Urxvt,
}

/// How scroll-wheel events are encoded when no mouse protocol consumes
/// them directly — either as mouse-wheel button events, or remapped to
/// cursor-key sequences (the "alternate scroll" behavior xterm offers to
/// full-screen apps that don't track the mouse).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseWheelMode {
    #[default]
    Mouse,
    NormalCursorKeys,
    ApplicationCursorKeys,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ansi_linefeed_newline_roundtrip() {
        let mut modes = Modes::new();
        assert!(!modes.ansi.contains(AnsiModes::LINEFEED_NEWLINE));
        modes.set_ansi_mode(20, true);
        assert!(modes.ansi.contains(AnsiModes::LINEFEED_NEWLINE));
        modes.set_ansi_mode(20, false);
        assert!(!modes.ansi.contains(AnsiModes::LINEFEED_NEWLINE));
    }

    #[test]
    fn dec_mode_defaults() {
        let modes = Modes::new();
        assert!(modes.autowrap());
        assert!(!modes.origin_mode());
        assert!(modes.cursor_visible());
    }

    #[test]
    fn dec_mode_save_restore_stack() {
        let mut modes = Modes::new();
        modes.set_dec_mode(dec::DECOM, false);
        modes.push_dec_mode(dec::DECOM); // save `false`
        modes.set_dec_mode(dec::DECOM, true);
        modes.push_dec_mode(dec::DECOM); // save `true`
        modes.set_dec_mode(dec::DECOM, false);

        modes.pop_dec_mode(dec::DECOM);
        assert!(modes.dec_mode(dec::DECOM));
        modes.pop_dec_mode(dec::DECOM);
        assert!(!modes.dec_mode(dec::DECOM));
        // Pop beyond empty stack is a no-op.
        modes.pop_dec_mode(dec::DECOM);
        assert!(!modes.dec_mode(dec::DECOM));
    }

    #[test]
    fn decrqm_reports_unset_as_zero() {
        let modes = Modes::new();
        assert_eq!(modes.query_dec_mode(9999), 0);
        assert_eq!(modes.query_dec_mode(dec::DECAWM), 1);
    }

    #[test]
    fn mouse_protocol_priority() {
        let mut modes = Modes::new();
        modes.set_dec_mode(dec::MOUSE_NORMAL, true);
        assert_eq!(modes.mouse_protocol(), Some(MouseProtocol::Normal));
        modes.set_dec_mode(dec::MOUSE_ANY_EVENT, true);
        assert_eq!(modes.mouse_protocol(), Some(MouseProtocol::AnyEvent));
    }
}
