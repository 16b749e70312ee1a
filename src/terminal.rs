//! The facade owning both screens, modes, palette, hyperlinks, images, and
//! the reply/output byte buffer. `sequencer::dispatch_action` mutates a
//! `Terminal`; `RenderBufferBuilder` reads one.

use crate::cell::{Color, HyperlinkId, HyperlinkRegistry, SgrAttrs};
use crate::cursor::{CursorDisplay, CursorShape};
use crate::image::{DiscardQueue, ImagePool};
use crate::modes::Modes;
use crate::palette::{ColorPalette, PaletteStack};
use crate::parser::Parser;
use crate::screen::Screen;
use crate::selection::SelectionTracker;

/// Depth cap for `XTPUSHSGR`/`XTPOPSGR`, matching xterm's fixed-size SGR
/// attribute stack.
const MAX_SGR_STACK_DEPTH: usize = 10;

/// A DCS sequence header plus the payload bytes accumulated so far, kept on
/// `Terminal` because the Sequencer's dispatch is a stateless free function
/// called once per parser `Action` — there is nowhere else to park it
/// between `Hook` and the matching `Unhook`.
#[derive(Debug, Clone, Default)]
pub struct DcsInProgress {
    pub params: Vec<Vec<u16>>,
    pub intermediates: Vec<u8>,
    pub final_byte: u8,
    pub payload: Vec<u8>,
}

/// Which of the two screens is currently visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenKind {
    Primary,
    Alternate,
}

/// Terminal-wide status display selector set by DECSSDT/reset by RIS; the
/// source's own status-line feature is out of scope, but RIS's effect on
/// this value is an explicit end-to-end scenario, so the type exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusDisplayType {
    #[default]
    None,
    Indicator,
    HostWritable,
}

pub struct Terminal {
    pub primary: Screen,
    pub alternate: Screen,
    pub active: ScreenKind,
    pub modes: Modes,
    pub hyperlinks: HyperlinkRegistry,
    pub current_hyperlink: HyperlinkId,
    pub images: ImagePool,
    pub discard_queue: DiscardQueue,
    pub palette: ColorPalette,
    pub palette_stack: PaletteStack,
    /// Saved cursor SGR attributes for `XTPUSHSGR`/`XTPOPSGR`.
    pub sgr_stack: Vec<SgrAttrs>,
    pub selection: SelectionTracker,
    pub parser: Parser,
    pub title: String,
    pub title_stack: Vec<String>,
    pub status_display: StatusDisplayType,
    /// Bytes queued to be written back to the PTY (device replies, paste
    /// echo acknowledgements); drained by the host adapter.
    pub reply_buffer: Vec<u8>,
    pub max_history_lines: usize,
    pub dirty: bool,
    pub dcs_in_progress: Option<DcsInProgress>,
    /// `DECSCUSR`'s blink period; a host constructing from `TerminalConfig`
    /// should call [`Terminal::set_cursor_blinking_interval_ms`] after `new`.
    pub cursor_blinking_interval_ms: u32,
    /// Clock value of the last `tick`, in the host's own time unit (e.g.
    /// milliseconds since some epoch the host chooses).
    pub current_time_ms: u64,
    /// Set by [`Terminal::note_key_event`]; the cursor reads as visible
    /// through this timestamp regardless of blink phase.
    pub blink_forced_until_ms: Option<u64>,
    /// Sub-cell scroll offset for smooth-scrolling renderers; this crate
    /// only stores it, it has no effect on grid/scrollback content.
    pub smooth_scroll_pixel_offset: i32,
}

impl Terminal {
    pub fn new(cols: u16, rows: u16, max_history_lines: usize) -> Self {
        Self {
            primary: Screen::new(cols, rows, max_history_lines),
            alternate: Screen::new(cols, rows, 0),
            active: ScreenKind::Primary,
            modes: Modes::new(),
            hyperlinks: HyperlinkRegistry::new(),
            current_hyperlink: 0,
            images: ImagePool::new(256),
            discard_queue: DiscardQueue::new(),
            palette: ColorPalette::xterm_default(),
            palette_stack: PaletteStack::new(),
            sgr_stack: Vec::new(),
            selection: SelectionTracker::new(),
            parser: Parser::new(),
            title: String::new(),
            title_stack: Vec::new(),
            status_display: StatusDisplayType::None,
            reply_buffer: Vec::new(),
            max_history_lines,
            dirty: true,
            dcs_in_progress: None,
            cursor_blinking_interval_ms: 530,
            current_time_ms: 0,
            blink_forced_until_ms: None,
            smooth_scroll_pixel_offset: 0,
        }
    }

    pub fn set_cursor_blinking_interval_ms(&mut self, ms: u32) {
        self.cursor_blinking_interval_ms = ms.max(1);
    }

    fn blink_phase(&self, now_ms: u64) -> bool {
        (now_ms / self.cursor_blinking_interval_ms as u64) % 2 == 0
    }

    /// Advance the clock used for blink-phase and forced-visibility
    /// tracking. Marks the terminal dirty if this tick crosses a blink
    /// boundary, so `ensure_fresh_render_buffer` picks up the toggle even
    /// when nothing else changed.
    pub fn tick(&mut self, now_ms: u64) {
        if self.blink_phase(now_ms) != self.blink_phase(self.current_time_ms) {
            self.dirty = true;
        }
        self.current_time_ms = now_ms;
    }

    /// Record a key event at `now_ms`: forces the cursor visible for one
    /// blink interval, per the "forced true for T after any key event"
    /// property.
    pub fn note_key_event(&mut self, now_ms: u64) {
        self.blink_forced_until_ms = Some(now_ms + self.cursor_blinking_interval_ms as u64);
        self.dirty = true;
    }

    /// Whether the cursor should currently be drawn: false when DECTCEM
    /// hides it, true when blink is off (steady) or a forced-visible
    /// window from a recent key event is still active, otherwise toggling
    /// with `cursor_blinking_interval_ms`.
    pub fn cursor_currently_visible(&self) -> bool {
        let screen = self.screen();
        if screen.cursor_display == CursorDisplay::Hidden {
            return false;
        }
        if !screen.cursor_blink {
            return true;
        }
        if let Some(until) = self.blink_forced_until_ms {
            if self.current_time_ms <= until {
                return true;
            }
        }
        self.blink_phase(self.current_time_ms)
    }

    /// Lazily decide whether a new render snapshot should be built: never
    /// while batched rendering (DEC 2026) is enabled, otherwise only if
    /// something changed (a write, or `tick` crossing a blink boundary)
    /// since the last call. Returns whether the caller should rebuild.
    pub fn ensure_fresh_render_buffer(&mut self) -> bool {
        if self.modes.batched_rendering() {
            return false;
        }
        if self.dirty {
            self.dirty = false;
            true
        } else {
            false
        }
    }

    /// Unconditional rebuild signal, bypassing the dirty check (but not
    /// the batched-rendering gate) — for hosts that need to force a
    /// redraw, e.g. after a resize.
    pub fn refresh_render_buffer(&mut self) -> bool {
        if self.modes.batched_rendering() {
            return false;
        }
        self.dirty = false;
        true
    }

    pub fn screen(&self) -> &Screen {
        match self.active {
            ScreenKind::Primary => &self.primary,
            ScreenKind::Alternate => &self.alternate,
        }
    }

    pub fn screen_mut(&mut self) -> &mut Screen {
        match self.active {
            ScreenKind::Primary => &mut self.primary,
            ScreenKind::Alternate => &mut self.alternate,
        }
    }

    pub fn bg_color(&self) -> Color {
        self.screen().cursor.attrs.bg
    }

    pub fn take_replies(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.reply_buffer)
    }

    /// Mode 47/1047/1049: switch to the alternate screen. `save_cursor`
    /// additionally saves/restores the cursor (1049); `clear` clears the
    /// alternate screen on switch (1047/1049 both clear, 47 does neither).
    pub fn enter_alt_screen(&mut self, save_cursor: bool, clear: bool) {
        if self.active == ScreenKind::Alternate {
            return;
        }
        if save_cursor {
            self.primary.save_cursor(self.modes.origin_mode());
        }
        if clear {
            self.alternate.clear_screen(self.bg_color());
            self.alternate.cursor = self.primary.cursor.clone();
            self.alternate.cursor.row = 0;
            self.alternate.cursor.col = 0;
        }
        self.active = ScreenKind::Alternate;
        self.dirty = true;
    }

    pub fn leave_alt_screen(&mut self, restore_cursor: bool, clear: bool) {
        if self.active == ScreenKind::Primary {
            return;
        }
        if clear {
            self.alternate.clear_screen(self.bg_color());
        }
        self.active = ScreenKind::Primary;
        if restore_cursor {
            self.primary.restore_cursor();
        }
        self.dirty = true;
    }

    pub fn reset_to_initial_state(&mut self) {
        let cols = self.primary.cols();
        let rows = self.primary.rows();
        self.primary = Screen::new(cols, rows, self.max_history_lines);
        self.alternate = Screen::new(cols, rows, 0);
        self.active = ScreenKind::Primary;
        self.modes = Modes::new();
        self.hyperlinks.clear();
        self.current_hyperlink = 0;
        self.palette = ColorPalette::xterm_default();
        self.palette_stack = PaletteStack::new();
        self.sgr_stack.clear();
        self.title.clear();
        self.title_stack.clear();
        self.status_display = StatusDisplayType::None;
        self.blink_forced_until_ms = None;
        self.smooth_scroll_pixel_offset = 0;
        self.dirty = true;
    }

    pub fn soft_reset(&mut self) {
        self.modes.soft_reset();
        self.screen_mut().reset_top_bottom_margins();
        self.screen_mut().reset_left_right_margins();
        self.screen_mut().cursor.attrs = Default::default();
        self.screen_mut()
            .set_cursor_style(CursorDisplay::Shown, CursorShape::Block, true);
        self.dirty = true;
    }

    pub fn push_title(&mut self, title: String) {
        self.title_stack.push(std::mem::replace(&mut self.title, title));
    }

    pub fn pop_title(&mut self) {
        if let Some(t) = self.title_stack.pop() {
            self.title = t;
        }
    }

    pub fn push_palette(&mut self, slot: Option<usize>) {
        match slot {
            Some(s) => self.palette_stack.push_to_slot(s, self.palette.clone()),
            None => self.palette_stack.push(self.palette.clone()),
        }
    }

    pub fn pop_palette(&mut self, slot: Option<usize>) {
        let popped = match slot {
            Some(s) => self.palette_stack.pop_slot(s),
            None => self.palette_stack.pop(),
        };
        if let Some(p) = popped {
            self.palette = p;
            self.dirty = true;
        }
    }

    /// `XTPUSHSGR`: save the cursor's current SGR attributes. No-op once
    /// the stack is at capacity.
    pub fn push_sgr(&mut self) {
        if self.sgr_stack.len() < MAX_SGR_STACK_DEPTH {
            self.sgr_stack.push(self.screen().cursor.attrs);
        }
    }

    /// `XTPOPSGR`: restore the most recently saved SGR attributes onto the
    /// cursor. No-op if the stack is empty.
    pub fn pop_sgr(&mut self) {
        if let Some(attrs) = self.sgr_stack.pop() {
            self.screen_mut().cursor.attrs = attrs;
            self.dirty = true;
        }
    }

    /// Feed raw PTY bytes through the parser and dispatch every resulting
    /// action. Convenience wrapper tying `Parser` + `crate::sequencer`
    /// together the way a reader task would.
    pub fn feed(&mut self, bytes: &[u8]) {
        let actions = self.parser.feed(bytes);
        for action in actions {
            crate::sequencer::dispatch_action(self, action);
        }
    }

    pub fn in_flight_dcs(&self) -> Option<&DcsInProgress> {
        self.dcs_in_progress.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_terminal_starts_on_primary_screen() {
        let term = Terminal::new(80, 24, 1000);
        assert_eq!(term.active, ScreenKind::Primary);
        assert_eq!(term.screen().cols(), 80);
    }

    #[test]
    fn feeding_plain_text_writes_into_the_grid() {
        let mut term = Terminal::new(10, 3, 100);
        term.feed(b"hi");
        assert_eq!(term.screen().grid.cell(0, 0).unwrap().content(), 'h');
        assert_eq!(term.screen().grid.cell(0, 1).unwrap().content(), 'i');
    }

    #[test]
    fn alt_screen_switch_and_restore_round_trips_cursor() {
        let mut term = Terminal::new(10, 5, 100);
        term.screen_mut().cursor.row = 2;
        term.screen_mut().cursor.col = 3;
        term.enter_alt_screen(true, true);
        assert_eq!(term.active, ScreenKind::Alternate);
        term.leave_alt_screen(true, false);
        assert_eq!(term.active, ScreenKind::Primary);
        assert_eq!((term.screen().cursor.row, term.screen().cursor.col), (2, 3));
    }

    #[test]
    fn ris_resets_status_display() {
        let mut term = Terminal::new(10, 5, 100);
        term.status_display = StatusDisplayType::Indicator;
        term.feed(b"\x1bc");
        assert_eq!(term.status_display, StatusDisplayType::None);
    }

    #[test]
    fn blinking_cursor_toggles_at_interval_boundary() {
        let mut term = Terminal::new(10, 5, 100);
        term.set_cursor_blinking_interval_ms(500);
        term.tick(499);
        assert!(term.cursor_currently_visible());
        term.tick(501);
        assert!(!term.cursor_currently_visible());
    }

    #[test]
    fn key_event_forces_cursor_visible_for_one_interval() {
        let mut term = Terminal::new(10, 5, 100);
        term.set_cursor_blinking_interval_ms(500);
        term.tick(501);
        assert!(!term.cursor_currently_visible());
        term.note_key_event(501);
        assert!(term.cursor_currently_visible());
        term.tick(1001);
        assert!(!term.cursor_currently_visible());
    }

    #[test]
    fn steady_cursor_is_always_visible_regardless_of_phase() {
        let mut term = Terminal::new(10, 5, 100);
        term.feed(b"\x1b[2 q"); // DECSCUSR Ps=2: steady block
        term.set_cursor_blinking_interval_ms(500);
        term.tick(501);
        assert!(term.cursor_currently_visible());
    }

    #[test]
    fn hidden_cursor_stays_invisible_even_when_blink_phase_is_on() {
        let mut term = Terminal::new(10, 5, 100);
        term.feed(b"\x1b[?25l");
        assert!(!term.cursor_currently_visible());
    }

    #[test]
    fn batched_rendering_suppresses_render_buffer_refresh() {
        let mut term = Terminal::new(20, 1, 100);
        term.feed(b"\x1b[?2026h");
        term.feed(b"Hello ");
        term.tick(0);
        assert!(!term.ensure_fresh_render_buffer());

        term.feed(b" World");
        term.tick(0);
        assert!(!term.ensure_fresh_render_buffer());

        term.feed(b"\x1b[?2026l");
        term.tick(0);
        assert!(term.ensure_fresh_render_buffer());
        assert_eq!(term.screen().grid.cell(0, 0).unwrap().content(), 'H');
    }
}
