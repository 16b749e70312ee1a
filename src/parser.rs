//! VT/ANSI parser: the classical xterm/DEC state machine, augmented for
//! UTF-8 text and for OSC/DCS/APC/PM termination by both ST (`ESC \`) and
//! BEL (`0x07`).
//!
//! The 16-state table (`Ground` through `IgnoreUntilST`) assembles bytes
//! into fully-formed dispatch events rather than emitting one listener call
//! per byte: parameter/intermediate accumulation lives in `Parser`'s own
//! fields and is flushed as a single `Action::DispatchCsi`/`DispatchEsc`/etc.
//! at the final byte. This keeps the event vocabulary the `Sequencer`
//! actually needs (assembled params, not digits) without losing any
//! information a byte-level listener would have captured.

use std::collections::VecDeque;

use crate::cell::display_width;
use crate::error::ParserDiagnostic;

/// Maximum parameters per sequence; surplus parameters are accepted into
/// the stream but dropped once this many groups have been collected.
const MAX_PARAMS: usize = 16;
/// Maximum sub-parameters per parameter group (the `:`-separated form).
const MAX_SUBPARAMS: usize = 8;
/// Bound on the buffered parser diagnostics ring.
const MAX_DIAGNOSTICS: usize = 64;

/// Default cap (in display columns) on a single bulk `Print` action. Large
/// enough that ordinary terminal widths never split a line, small enough
/// that a few-hundred-megabyte paste doesn't build one giant `String`.
const DEFAULT_BULK_BUDGET: u16 = 4096;

/// Parser output actions, already assembled with their accumulated
/// parameters/intermediates rather than delivered byte-by-byte.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A run of printable text plus its total column width (the bulk-text
    /// fast path collapses a whole printable run into one of these).
    Print(String, u16),
    /// A C0/C1 control character executed in Ground state (BEL, BS, HT,
    /// LF, CR, etc).
    Execute(u8),
    /// `ESC <intermediates> <final>` (not `[`/`]`/`P`/`_`/`^`, which divert
    /// to CSI/OSC/DCS/APC/PM).
    DispatchEsc {
        intermediates: Vec<u8>,
        final_byte: u8,
    },
    /// A complete CSI sequence: `CSI <leader?> <params> <intermediates> <final>`.
    DispatchCsi {
        leader: Option<u8>,
        params: Vec<Vec<u16>>,
        intermediates: Vec<u8>,
        final_byte: u8,
    },
    /// A complete OSC sequence's raw payload (the numeric id prefix is not
    /// pre-split; the Sequencer owns that per spec §6).
    DispatchOsc(Vec<u8>),
    /// Entered a DCS sequence: header params/intermediates/final, to be
    /// followed by zero or more `Put` bytes and a terminating `Unhook`.
    Hook {
        params: Vec<Vec<u16>>,
        intermediates: Vec<u8>,
        final_byte: u8,
    },
    /// One byte of DCS payload data.
    Put(u8),
    /// DCS sequence terminated (by ST or BEL).
    Unhook,
    /// A complete APC sequence's raw payload.
    DispatchApc(Vec<u8>),
    /// A complete PM sequence's raw payload.
    DispatchPm(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    Escape,
    EscapeIntermediate,
    CsiEntry,
    CsiParam,
    CsiIntermediate,
    CsiIgnore,
    DcsEntry,
    DcsParam,
    DcsIntermediate,
    DcsPassthrough,
    DcsIgnore,
    OscString,
    ApcString,
    PmString,
    IgnoreUntilSt,
}

/// Which string-type state `IgnoreUntilSt`/termination bookkeeping is
/// currently tracking, so the right dispatch action fires on `ST`/`BEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringKind {
    Osc,
    Apc,
    Pm,
    Dcs,
}

/// VT/ANSI byte-stream parser.
#[derive(Debug, Clone)]
pub struct Parser {
    state: State,
    string_kind: Option<StringKind>,
    leader: Option<u8>,
    intermediates: Vec<u8>,
    params: Vec<Vec<u16>>,
    current_group: Vec<u16>,
    has_param_digit: bool,
    string_buf: Vec<u8>,
    /// `true` once we've seen an ESC while inside a string state, meaning
    /// the next byte decides between ST (`\`) and a false alarm.
    saw_esc_in_string: bool,
    utf8_buf: [u8; 4],
    utf8_len: u8,
    utf8_need: u8,
    diagnostics: VecDeque<ParserDiagnostic>,
    bulk_budget: u16,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Ground,
            string_kind: None,
            leader: None,
            intermediates: Vec::new(),
            params: Vec::new(),
            current_group: Vec::new(),
            has_param_digit: false,
            string_buf: Vec::new(),
            saw_esc_in_string: false,
            utf8_buf: [0; 4],
            utf8_len: 0,
            utf8_need: 0,
            diagnostics: VecDeque::new(),
            bulk_budget: DEFAULT_BULK_BUDGET,
        }
    }

    /// Override the bulk-text fast-path column budget (the "listener
    /// advertises `maxBulkTextSequenceWidth()`" contract from spec §4.1;
    /// here it is a constructor parameter rather than a trait method since
    /// this parser has no separate listener object).
    #[must_use]
    pub fn with_bulk_budget(mut self, budget: u16) -> Self {
        self.bulk_budget = budget.max(1);
        self
    }

    /// Diagnostics recorded since the last call to [`take_diagnostics`].
    #[must_use]
    pub fn diagnostics(&self) -> &VecDeque<ParserDiagnostic> {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> VecDeque<ParserDiagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    fn record_error(&mut self, message: impl Into<String>, byte: Option<u8>) {
        if self.diagnostics.len() >= MAX_DIAGNOSTICS {
            self.diagnostics.pop_front();
        }
        self.diagnostics.push_back(ParserDiagnostic {
            message: message.into(),
            byte,
        });
    }

    /// Feed a chunk of bytes, returning every action produced. Safe to call
    /// repeatedly with arbitrarily chopped chunks — state (including a
    /// pending multi-byte UTF-8 sequence) carries across calls.
    #[must_use]
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Action> {
        let mut out = Vec::new();
        let mut text = String::new();
        let mut text_width: u16 = 0;
        let mut i = 0;
        while i < bytes.len() {
            let b = bytes[i];
            i += 1;

            if self.state == State::Ground {
                // Anywhere transitions still apply to C0 controls/ESC.
                if b == 0x1b || b < 0x20 || b == 0x7f {
                    flush_text(&mut out, &mut text, &mut text_width);
                }
                if b >= 0x20 && b != 0x7f {
                    for ch in self.push_utf8_byte(b) {
                        let w = display_width(ch);
                        if text_width.saturating_add(w as u16) > self.bulk_budget
                            && !text.is_empty()
                        {
                            flush_text(&mut out, &mut text, &mut text_width);
                        }
                        text.push(ch);
                        text_width += w as u16;
                    }
                    continue;
                }
            }

            for action in self.step(b) {
                out.push(action);
            }
        }
        flush_text(&mut out, &mut text, &mut text_width);
        out
    }

    fn push_utf8_byte(&mut self, b: u8) -> Vec<char> {
        let mut out = Vec::new();
        if self.utf8_need == 0 {
            if b < 0x80 {
                out.push(b as char);
            } else if b & 0xE0 == 0xC0 {
                self.utf8_buf[0] = b;
                self.utf8_len = 1;
                self.utf8_need = 2;
            } else if b & 0xF0 == 0xE0 {
                self.utf8_buf[0] = b;
                self.utf8_len = 1;
                self.utf8_need = 3;
            } else if b & 0xF8 == 0xF0 {
                self.utf8_buf[0] = b;
                self.utf8_len = 1;
                self.utf8_need = 4;
            } else {
                out.push(char::REPLACEMENT_CHARACTER);
            }
        } else if b & 0xC0 == 0x80 {
            self.utf8_buf[self.utf8_len as usize] = b;
            self.utf8_len += 1;
            if self.utf8_len == self.utf8_need {
                let slice = &self.utf8_buf[..self.utf8_len as usize];
                out.push(
                    std::str::from_utf8(slice)
                        .ok()
                        .and_then(|s| s.chars().next())
                        .unwrap_or(char::REPLACEMENT_CHARACTER),
                );
                self.utf8_len = 0;
                self.utf8_need = 0;
            }
        } else {
            out.push(char::REPLACEMENT_CHARACTER);
            self.utf8_len = 0;
            self.utf8_need = 0;
            out.extend(self.push_utf8_byte(b));
        }
        out
    }

    /// Advance by exactly one non-printable/control-stream byte.
    fn step(&mut self, b: u8) -> Vec<Action> {
        // Anywhere transitions.
        if b == 0x18 || b == 0x1a {
            self.clear();
            self.state = State::Ground;
            return vec![Action::Execute(b)];
        }
        if b == 0x1b && self.state != State::OscString {
            // ESC always restarts a new sequence, except inside an OSC
            // string where it might be the start of an ST terminator.
        }

        match self.state {
            State::Ground => self.ground(b),
            State::Escape => self.escape(b),
            State::EscapeIntermediate => self.escape_intermediate(b),
            State::CsiEntry => self.csi_entry(b),
            State::CsiParam => self.csi_param(b),
            State::CsiIntermediate => self.csi_intermediate(b),
            State::CsiIgnore => self.csi_ignore(b),
            State::DcsEntry => self.dcs_entry(b),
            State::DcsParam => self.dcs_param(b),
            State::DcsIntermediate => self.dcs_intermediate(b),
            State::DcsPassthrough => self.dcs_passthrough(b),
            State::DcsIgnore => self.dcs_ignore(b),
            State::OscString => self.string_byte(b, StringKind::Osc),
            State::ApcString => self.string_byte(b, StringKind::Apc),
            State::PmString => self.string_byte(b, StringKind::Pm),
            State::IgnoreUntilSt => self.ignore_until_st(b),
        }
    }

    fn clear(&mut self) {
        self.leader = None;
        self.intermediates.clear();
        self.params.clear();
        self.current_group.clear();
        self.has_param_digit = false;
        self.string_buf.clear();
        self.string_kind = None;
        self.saw_esc_in_string = false;
    }

    fn ground(&mut self, b: u8) -> Vec<Action> {
        match b {
            0x1b => {
                self.clear();
                self.state = State::Escape;
                vec![]
            }
            0x00..=0x1f | 0x7f => vec![Action::Execute(b)],
            _ => vec![],
        }
    }

    fn escape(&mut self, b: u8) -> Vec<Action> {
        match b {
            0x5b => {
                self.state = State::CsiEntry;
                vec![]
            }
            0x5d => {
                self.state = State::OscString;
                self.string_kind = Some(StringKind::Osc);
                vec![]
            }
            0x50 => {
                self.state = State::DcsEntry;
                vec![]
            }
            0x5f => {
                self.state = State::ApcString;
                self.string_kind = Some(StringKind::Apc);
                vec![]
            }
            0x5e => {
                self.state = State::PmString;
                self.string_kind = Some(StringKind::Pm);
                vec![]
            }
            0x20..=0x2f => {
                self.intermediates.push(b);
                self.state = State::EscapeIntermediate;
                vec![]
            }
            0x30..=0x7e => {
                self.state = State::Ground;
                let intermediates = std::mem::take(&mut self.intermediates);
                vec![Action::DispatchEsc {
                    intermediates,
                    final_byte: b,
                }]
            }
            0x00..=0x1f => vec![Action::Execute(b)],
            _ => {
                self.record_error("unexpected byte in Escape", Some(b));
                self.state = State::Ground;
                vec![]
            }
        }
    }

    fn escape_intermediate(&mut self, b: u8) -> Vec<Action> {
        match b {
            0x20..=0x2f => {
                self.intermediates.push(b);
                vec![]
            }
            0x30..=0x7e => {
                self.state = State::Ground;
                let intermediates = std::mem::take(&mut self.intermediates);
                vec![Action::DispatchEsc {
                    intermediates,
                    final_byte: b,
                }]
            }
            0x00..=0x1f => vec![Action::Execute(b)],
            _ => {
                self.record_error("unexpected byte in EscapeIntermediate", Some(b));
                self.state = State::Ground;
                vec![]
            }
        }
    }

    fn push_param_byte(&mut self, b: u8) {
        match b {
            b'0'..=b'9' => {
                let digit = (b - b'0') as u16;
                let last = self.current_group.last_mut();
                self.has_param_digit = true;
                match last {
                    Some(v) => *v = v.saturating_mul(10).saturating_add(digit),
                    None => self.current_group.push(digit),
                }
            }
            b':' => {
                if self.current_group.len() < MAX_SUBPARAMS {
                    self.current_group.push(0);
                }
            }
            b';' => {
                if self.params.len() < MAX_PARAMS {
                    self.params.push(std::mem::take(&mut self.current_group));
                } else {
                    self.current_group.clear();
                }
                self.has_param_digit = false;
            }
            _ => {}
        }
    }

    fn finish_params(&mut self) {
        if self.has_param_digit || !self.current_group.is_empty() || self.params.is_empty() {
            if self.params.len() < MAX_PARAMS {
                self.params.push(std::mem::take(&mut self.current_group));
            }
        }
    }

    fn csi_entry(&mut self, b: u8) -> Vec<Action> {
        match b {
            b'<' | b'=' | b'>' | b'?' => {
                self.leader = Some(b);
                self.state = State::CsiParam;
                vec![]
            }
            b'0'..=b'9' | b':' | b';' => {
                self.push_param_byte(b);
                self.state = State::CsiParam;
                vec![]
            }
            0x20..=0x2f => {
                self.intermediates.push(b);
                self.state = State::CsiIntermediate;
                vec![]
            }
            0x40..=0x7e => self.finish_csi(b),
            0x00..=0x1f => vec![Action::Execute(b)],
            _ => {
                self.state = State::CsiIgnore;
                vec![]
            }
        }
    }

    fn csi_param(&mut self, b: u8) -> Vec<Action> {
        match b {
            b'0'..=b'9' | b':' | b';' => {
                self.push_param_byte(b);
                vec![]
            }
            0x20..=0x2f => {
                self.intermediates.push(b);
                self.state = State::CsiIntermediate;
                vec![]
            }
            0x40..=0x7e => self.finish_csi(b),
            0x00..=0x1f => vec![Action::Execute(b)],
            b'<' | b'=' | b'>' | b'?' => {
                self.state = State::CsiIgnore;
                vec![]
            }
            _ => {
                self.state = State::CsiIgnore;
                vec![]
            }
        }
    }

    fn csi_intermediate(&mut self, b: u8) -> Vec<Action> {
        match b {
            0x20..=0x2f => {
                self.intermediates.push(b);
                vec![]
            }
            0x40..=0x7e => self.finish_csi(b),
            0x00..=0x1f => vec![Action::Execute(b)],
            _ => {
                self.state = State::CsiIgnore;
                vec![]
            }
        }
    }

    fn csi_ignore(&mut self, b: u8) -> Vec<Action> {
        match b {
            0x40..=0x7e => {
                self.record_error("ignored malformed CSI sequence", Some(b));
                self.clear();
                self.state = State::Ground;
                vec![]
            }
            0x00..=0x1f => vec![Action::Execute(b)],
            _ => vec![],
        }
    }

    fn finish_csi(&mut self, final_byte: u8) -> Vec<Action> {
        self.finish_params();
        self.state = State::Ground;
        let leader = self.leader.take();
        let intermediates = std::mem::take(&mut self.intermediates);
        let params = std::mem::take(&mut self.params);
        self.current_group.clear();
        self.has_param_digit = false;
        vec![Action::DispatchCsi {
            leader,
            params,
            intermediates,
            final_byte,
        }]
    }

    fn dcs_entry(&mut self, b: u8) -> Vec<Action> {
        match b {
            b'<' | b'=' | b'>' | b'?' => {
                self.leader = Some(b);
                self.state = State::DcsParam;
                vec![]
            }
            b'0'..=b'9' | b':' | b';' => {
                self.push_param_byte(b);
                self.state = State::DcsParam;
                vec![]
            }
            0x20..=0x2f => {
                self.intermediates.push(b);
                self.state = State::DcsIntermediate;
                vec![]
            }
            0x40..=0x7e => self.finish_hook(b),
            _ => {
                self.state = State::DcsIgnore;
                vec![]
            }
        }
    }

    fn dcs_param(&mut self, b: u8) -> Vec<Action> {
        match b {
            b'0'..=b'9' | b':' | b';' => {
                self.push_param_byte(b);
                vec![]
            }
            0x20..=0x2f => {
                self.intermediates.push(b);
                self.state = State::DcsIntermediate;
                vec![]
            }
            0x40..=0x7e => self.finish_hook(b),
            _ => {
                self.state = State::DcsIgnore;
                vec![]
            }
        }
    }

    fn dcs_intermediate(&mut self, b: u8) -> Vec<Action> {
        match b {
            0x20..=0x2f => {
                self.intermediates.push(b);
                vec![]
            }
            0x40..=0x7e => self.finish_hook(b),
            _ => {
                self.state = State::DcsIgnore;
                vec![]
            }
        }
    }

    fn finish_hook(&mut self, final_byte: u8) -> Vec<Action> {
        self.finish_params();
        self.state = State::DcsPassthrough;
        let intermediates = std::mem::take(&mut self.intermediates);
        let params = std::mem::take(&mut self.params);
        self.current_group.clear();
        self.has_param_digit = false;
        self.leader = None;
        vec![Action::Hook {
            params,
            intermediates,
            final_byte,
        }]
    }

    fn dcs_passthrough(&mut self, b: u8) -> Vec<Action> {
        match b {
            0x1b => {
                self.saw_esc_in_string = true;
                vec![]
            }
            0x5c if self.saw_esc_in_string => {
                self.saw_esc_in_string = false;
                self.state = State::Ground;
                vec![Action::Unhook]
            }
            _ => {
                if self.saw_esc_in_string {
                    // False alarm: re-inject the swallowed ESC as data.
                    self.saw_esc_in_string = false;
                    vec![Action::Put(0x1b), Action::Put(b)]
                } else {
                    vec![Action::Put(b)]
                }
            }
        }
    }

    fn dcs_ignore(&mut self, b: u8) -> Vec<Action> {
        match b {
            0x1b => {
                self.saw_esc_in_string = true;
                vec![]
            }
            0x5c if self.saw_esc_in_string => {
                self.saw_esc_in_string = false;
                self.clear();
                self.state = State::Ground;
                vec![]
            }
            _ => {
                self.saw_esc_in_string = false;
                vec![]
            }
        }
    }

    fn string_byte(&mut self, b: u8, kind: StringKind) -> Vec<Action> {
        match b {
            0x07 => self.finish_string(kind),
            0x1b => {
                self.saw_esc_in_string = true;
                self.state = State::IgnoreUntilSt;
                vec![]
            }
            0x00..=0x1f => vec![],
            _ => {
                self.string_buf.push(b);
                vec![]
            }
        }
    }

    fn ignore_until_st(&mut self, b: u8) -> Vec<Action> {
        match b {
            0x5c => {
                self.saw_esc_in_string = false;
                let kind = self.string_kind.unwrap_or(StringKind::Osc);
                self.finish_string(kind)
            }
            0x1b => vec![],
            _ => {
                // False alarm: the ESC wasn't the start of ST. Resume the
                // string state and treat this byte as data, but the ESC
                // itself is dropped per the classic table (a bare ESC
                // inside a string that isn't followed by `\` is discarded).
                self.state = match self.string_kind {
                    Some(StringKind::Osc) => State::OscString,
                    Some(StringKind::Apc) => State::ApcString,
                    Some(StringKind::Pm) => State::PmString,
                    Some(StringKind::Dcs) | None => State::OscString,
                };
                self.string_byte(b, self.string_kind.unwrap_or(StringKind::Osc))
            }
        }
    }

    fn finish_string(&mut self, kind: StringKind) -> Vec<Action> {
        self.state = State::Ground;
        let data = std::mem::take(&mut self.string_buf);
        self.string_kind = None;
        match kind {
            StringKind::Osc => vec![Action::DispatchOsc(data)],
            StringKind::Apc => vec![Action::DispatchApc(data)],
            StringKind::Pm => vec![Action::DispatchPm(data)],
            StringKind::Dcs => vec![Action::Unhook],
        }
    }
}

fn flush_text(out: &mut Vec<Action>, text: &mut String, width: &mut u16) {
    if !text.is_empty() {
        out.push(Action::Print(std::mem::take(text), *width));
        *width = 0;
    }
}
