//! Cursor position, pending-wrap state, and the DECSC/DECRC save unit.

use crate::cell::SgrAttrs;
use crate::charset::{Charset, CharsetState};

/// Default tab stop spacing used when a fresh tab-stop vector is built.
const DEFAULT_TAB_WIDTH: u16 = 8;

/// Cursor rendering shape (DECSCUSR), independent of blink state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorShape {
    #[default]
    Block,
    Bar,
    Underscore,
    Rectangle,
}

/// Whether the cursor is currently shown at all vs. hidden by DECTCEM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorDisplay {
    #[default]
    Shown,
    Hidden,
}

/// Cursor state: position, wrap-pending latch, SGR, and charset state.
///
/// Position is relative to the *screen* (not the scroll region) — origin
/// mode only affects how `CUP`/`CNL`/margin-relative movement compute new
/// positions; the stored `row`/`col` are always absolute screen coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    pub row: u16,
    pub col: u16,
    /// Latched after writing into the last column with autowrap enabled;
    /// the *next* printable character triggers the wrap instead of the one
    /// that set this cell.
    pub pending_wrap: bool,
    pub attrs: SgrAttrs,
    pub charset: CharsetState,
    scroll_top: u16,
    scroll_bottom: u16,
    tab_stops: Vec<bool>,
}

impl Cursor {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            row: 0,
            col: 0,
            pending_wrap: false,
            attrs: SgrAttrs::default(),
            charset: CharsetState::new(),
            scroll_top: 0,
            scroll_bottom: rows.saturating_sub(1),
            tab_stops: default_tab_stops(cols),
        }
    }

    pub fn carriage_return(&mut self) {
        self.col = 0;
        self.pending_wrap = false;
    }

    pub fn move_left(&mut self, n: u16) {
        self.col = self.col.saturating_sub(n.max(1));
        self.pending_wrap = false;
    }

    pub fn move_right(&mut self, n: u16, cols: u16) {
        let max_col = cols.saturating_sub(1);
        self.col = (self.col + n.max(1)).min(max_col);
        self.pending_wrap = false;
    }

    pub fn move_up(&mut self, n: u16) {
        self.row = self.row.saturating_sub(n.max(1));
        self.pending_wrap = false;
    }

    pub fn move_down(&mut self, n: u16, rows: u16) {
        let max_row = rows.saturating_sub(1);
        self.row = (self.row + n.max(1)).min(max_row);
        self.pending_wrap = false;
    }

    /// Absolute cursor move (`CUP`/`HVP`), clamped to the page.
    pub fn move_to(&mut self, row: u16, col: u16, rows: u16, cols: u16) {
        self.row = row.min(rows.saturating_sub(1));
        self.col = col.min(cols.saturating_sub(1));
        self.pending_wrap = false;
    }

    pub fn scroll_top(&self) -> u16 {
        self.scroll_top
    }

    pub fn scroll_bottom(&self) -> u16 {
        self.scroll_bottom
    }

    /// DECSTBM: set the vertical scroll margin, clamped to the page and
    /// requiring `top < bottom`; out-of-range requests reset to the full
    /// page (per ECMA-48 / xterm behavior for invalid margins).
    pub fn set_scroll_region(&mut self, top: u16, bottom: u16, rows: u16) {
        let max_row = rows.saturating_sub(1);
        let top = top.min(max_row);
        let bottom = bottom.min(max_row);
        if top < bottom {
            self.scroll_top = top;
            self.scroll_bottom = bottom;
        } else {
            self.scroll_top = 0;
            self.scroll_bottom = max_row;
        }
    }

    pub fn reset_scroll_region(&mut self, rows: u16) {
        self.scroll_top = 0;
        self.scroll_bottom = rows.saturating_sub(1);
    }

    pub fn set_tab_stop(&mut self) {
        if let Some(slot) = self.tab_stops.get_mut(self.col as usize) {
            *slot = true;
        }
    }

    pub fn clear_tab_stop(&mut self) {
        if let Some(slot) = self.tab_stops.get_mut(self.col as usize) {
            *slot = false;
        }
    }

    pub fn clear_all_tab_stops(&mut self) {
        self.tab_stops.iter_mut().for_each(|stop| *stop = false);
    }

    pub fn next_tab_stop(&self, cols: u16) -> u16 {
        let max_col = cols.saturating_sub(1);
        for col in (self.col + 1)..cols {
            if self.tab_stops.get(col as usize).copied().unwrap_or(false) {
                return col;
            }
        }
        max_col
    }

    pub fn prev_tab_stop(&self) -> u16 {
        for col in (0..self.col).rev() {
            if self.tab_stops.get(col as usize).copied().unwrap_or(false) {
                return col;
            }
        }
        0
    }

    /// Grow or shrink the tab-stop vector to match a new column count.
    /// Existing stops are preserved; newly added columns beyond the old
    /// width get the default every-8th-column stop.
    pub fn resize_tab_stops(&mut self, cols: u16) {
        let old_len = self.tab_stops.len() as u16;
        self.tab_stops.resize(cols as usize, false);
        for col in old_len..cols {
            if col != 0 && col % DEFAULT_TAB_WIDTH == 0 {
                self.tab_stops[col as usize] = true;
            }
        }
    }

    pub fn designate_charset(&mut self, slot: u8, charset: Charset) {
        self.charset.designate(slot, charset);
    }

    pub fn effective_charset(&self) -> Charset {
        self.charset.effective_charset()
    }

    pub fn consume_single_shift(&mut self) -> Option<Charset> {
        self.charset.consume_single_shift()
    }

    pub fn reset_charset(&mut self) {
        self.charset.reset();
    }
}

fn default_tab_stops(cols: u16) -> Vec<bool> {
    (0..cols)
        .map(|col| col != 0 && col % DEFAULT_TAB_WIDTH == 0)
        .collect()
}

/// The DECSC/DECRC save unit: position, autowrap/origin mode flags (needed
/// to reconstruct wrap-pending semantics on restore), SGR, and charset.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedCursor {
    pub row: u16,
    pub col: u16,
    pub origin_mode: bool,
    pub attrs: SgrAttrs,
    pub charset: CharsetState,
}

impl Default for SavedCursor {
    fn default() -> Self {
        Self {
            row: 0,
            col: 0,
            origin_mode: false,
            attrs: SgrAttrs::default(),
            charset: CharsetState::new(),
        }
    }
}

impl SavedCursor {
    pub fn save(cursor: &Cursor, origin_mode: bool) -> Self {
        Self {
            row: cursor.row,
            col: cursor.col,
            origin_mode,
            attrs: cursor.attrs,
            charset: cursor.charset,
        }
    }

    /// Restore position/SGR/charset into `cursor`; returns the saved
    /// `origin_mode` so the caller (which owns `Modes`) can restore it too.
    pub fn restore(&self, cursor: &mut Cursor) -> bool {
        cursor.row = self.row;
        cursor.col = self.col;
        cursor.attrs = self.attrs;
        cursor.charset = self.charset;
        cursor.pending_wrap = false;
        self.origin_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_right_clamps_to_last_column() {
        let mut cursor = Cursor::new(10, 5);
        cursor.move_right(100, 10);
        assert_eq!(cursor.col, 9);
    }

    #[test]
    fn tab_stops_default_every_eight() {
        let cursor = Cursor::new(40, 5);
        assert_eq!(cursor.next_tab_stop(40), 8);
    }

    #[test]
    fn set_and_clear_tab_stop() {
        let mut cursor = Cursor::new(40, 5);
        cursor.move_to(0, 3, 5, 40);
        cursor.set_tab_stop();
        cursor.move_to(0, 0, 5, 40);
        assert_eq!(cursor.next_tab_stop(40), 3);
        cursor.move_to(0, 3, 5, 40);
        cursor.clear_tab_stop();
        cursor.move_to(0, 0, 5, 40);
        assert_eq!(cursor.next_tab_stop(40), 8);
    }

    #[test]
    fn scroll_region_rejects_invalid_range() {
        let mut cursor = Cursor::new(80, 24);
        cursor.set_scroll_region(10, 5, 24);
        assert_eq!(cursor.scroll_top(), 0);
        assert_eq!(cursor.scroll_bottom(), 23);
        cursor.set_scroll_region(2, 10, 24);
        assert_eq!((cursor.scroll_top(), cursor.scroll_bottom()), (2, 10));
    }

    #[test]
    fn save_restore_roundtrip() {
        let mut cursor = Cursor::new(80, 24);
        cursor.move_to(5, 5, 24, 80);
        cursor.attrs.flags = crate::cell::SgrFlags::BOLD;
        let saved = SavedCursor::save(&cursor, true);
        cursor.move_to(0, 0, 24, 80);
        cursor.attrs.reset();
        let origin = saved.restore(&mut cursor);
        assert!(origin);
        assert_eq!((cursor.row, cursor.col), (5, 5));
        assert_eq!(cursor.attrs.flags, crate::cell::SgrFlags::BOLD);
    }
}
