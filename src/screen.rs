//! Executes function-level commands (cursor motion, editing, SGR, modes)
//! against one grid. `Terminal` owns two `Screen`s (primary, alternate) and
//! decides which one the Sequencer's dispatch targets.

use crate::cell::{Cell, Color};
use crate::charset::Charset;
use crate::cursor::{Cursor, CursorDisplay, CursorShape, SavedCursor};
use crate::grid::Grid;
use crate::scrollback::Scrollback;

/// Horizontal margins (DECSLRM). Absent `LeftRightMargin` mode, left/right
/// always span the whole page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HorizontalMargins {
    pub left: u16,
    pub right: u16,
}

/// One of the two screens a `Terminal` owns.
#[derive(Debug, Clone)]
pub struct Screen {
    pub grid: Grid,
    pub scrollback: Scrollback,
    pub cursor: Cursor,
    pub saved_cursor: Option<SavedCursor>,
    pub sco_saved_cursor: Option<(u16, u16)>,
    pub h_margins: HorizontalMargins,
    pub cursor_shape: CursorShape,
    pub cursor_display: CursorDisplay,
    /// DECSCUSR blink flag (odd `Ps` values), independent of `cursor_shape`.
    pub cursor_blink: bool,
}

impl Screen {
    /// `max_history_lines` is 0 for a history-less screen (the alt screen).
    pub fn new(cols: u16, rows: u16, max_history_lines: usize) -> Self {
        Self {
            grid: Grid::new(cols, rows),
            scrollback: Scrollback::new(max_history_lines),
            cursor: Cursor::new(cols, rows),
            saved_cursor: None,
            sco_saved_cursor: None,
            h_margins: HorizontalMargins {
                left: 0,
                right: cols.saturating_sub(1),
            },
            cursor_shape: CursorShape::Block,
            cursor_display: CursorDisplay::Shown,
            cursor_blink: true,
        }
    }

    pub fn cols(&self) -> u16 {
        self.grid.cols()
    }

    pub fn rows(&self) -> u16 {
        self.grid.rows()
    }

    fn left_margin(&self, left_right_margin_mode: bool) -> u16 {
        if left_right_margin_mode {
            self.h_margins.left
        } else {
            0
        }
    }

    fn right_margin(&self, left_right_margin_mode: bool) -> u16 {
        if left_right_margin_mode {
            self.h_margins.right
        } else {
            self.cols().saturating_sub(1)
        }
    }

    // ---- Cursor motion ----

    pub fn move_cursor_up(&mut self, n: u16, origin_mode: bool) {
        let floor = if origin_mode {
            self.cursor.scroll_top()
        } else {
            0
        };
        let target = self.cursor.row.saturating_sub(n).max(floor);
        self.cursor.row = target;
        self.cursor.pending_wrap = false;
    }

    pub fn move_cursor_down(&mut self, n: u16, origin_mode: bool) {
        let ceil = if origin_mode {
            self.cursor.scroll_bottom()
        } else {
            self.rows().saturating_sub(1)
        };
        let target = (self.cursor.row.saturating_add(n)).min(ceil);
        self.cursor.row = target;
        self.cursor.pending_wrap = false;
    }

    pub fn move_cursor_forward(&mut self, n: u16, left_right_margin_mode: bool) {
        let ceil = self.right_margin(left_right_margin_mode);
        self.cursor.col = (self.cursor.col.saturating_add(n)).min(ceil);
        self.cursor.pending_wrap = false;
    }

    pub fn move_cursor_backward(&mut self, n: u16, left_right_margin_mode: bool) {
        let floor = self.left_margin(left_right_margin_mode);
        self.cursor.col = self.cursor.col.saturating_sub(n).max(floor);
        self.cursor.pending_wrap = false;
    }

    pub fn move_cursor_next_line(&mut self, n: u16, origin_mode: bool) {
        self.move_cursor_down(n, origin_mode);
        self.cursor.col = self.left_margin(false);
        self.cursor.pending_wrap = false;
    }

    pub fn move_cursor_prev_line(&mut self, n: u16, origin_mode: bool) {
        self.move_cursor_up(n, origin_mode);
        self.cursor.col = self.left_margin(false);
        self.cursor.pending_wrap = false;
    }

    pub fn move_cursor_to_column(&mut self, col: u16) {
        self.cursor.col = col.min(self.cols().saturating_sub(1));
        self.cursor.pending_wrap = false;
    }

    pub fn move_cursor_to_line(&mut self, row: u16, origin_mode: bool) {
        let (floor, ceil) = if origin_mode {
            (self.cursor.scroll_top(), self.cursor.scroll_bottom())
        } else {
            (0, self.rows().saturating_sub(1))
        };
        self.cursor.row = row.clamp(floor, ceil);
        self.cursor.pending_wrap = false;
    }

    pub fn move_cursor_to(&mut self, row: u16, col: u16, origin_mode: bool) {
        let row_offset = if origin_mode { self.cursor.scroll_top() } else { 0 };
        let col_offset = if origin_mode {
            self.h_margins.left
        } else {
            0
        };
        let max_row = if origin_mode {
            self.cursor.scroll_bottom()
        } else {
            self.rows().saturating_sub(1)
        };
        let max_col = if origin_mode {
            self.h_margins.right
        } else {
            self.cols().saturating_sub(1)
        };
        self.cursor.row = (row_offset.saturating_add(row)).min(max_row);
        self.cursor.col = (col_offset.saturating_add(col)).min(max_col);
        self.cursor.pending_wrap = false;
    }

    pub fn move_cursor_to_begin_of_line(&mut self) {
        self.cursor.col = 0;
        self.cursor.pending_wrap = false;
    }

    pub fn cursor_next_tab(&mut self, n: u16) {
        for _ in 0..n.max(1) {
            self.cursor.col = self.cursor.next_tab_stop(self.cols());
        }
        self.cursor.pending_wrap = false;
    }

    pub fn cursor_prev_tab(&mut self, n: u16) {
        for _ in 0..n.max(1) {
            self.cursor.col = self.cursor.prev_tab_stop();
        }
        self.cursor.pending_wrap = false;
    }

    pub fn set_cursor_style(&mut self, display: CursorDisplay, shape: CursorShape, blink: bool) {
        self.cursor_display = display;
        self.cursor_shape = shape;
        self.cursor_blink = blink;
    }

    pub fn save_cursor(&mut self, origin_mode: bool) {
        self.saved_cursor = Some(SavedCursor::save(&self.cursor, origin_mode));
    }

    pub fn restore_cursor(&mut self) -> bool {
        match &self.saved_cursor {
            Some(saved) => saved.restore(&mut self.cursor),
            None => false,
        }
    }

    pub fn sco_save_cursor(&mut self) {
        self.sco_saved_cursor = Some((self.cursor.row, self.cursor.col));
    }

    pub fn sco_restore_cursor(&mut self) {
        if let Some((row, col)) = self.sco_saved_cursor {
            self.cursor.row = row.min(self.rows().saturating_sub(1));
            self.cursor.col = col.min(self.cols().saturating_sub(1));
            self.cursor.pending_wrap = false;
        }
    }

    // ---- Margins ----

    pub fn set_top_bottom_margins(&mut self, top: u16, bottom: u16) {
        self.cursor.set_scroll_region(top, bottom, self.rows());
        self.cursor.row = self.cursor.scroll_top();
        self.cursor.col = 0;
        self.cursor.pending_wrap = false;
    }

    pub fn reset_top_bottom_margins(&mut self) {
        self.cursor.reset_scroll_region(self.rows());
    }

    pub fn set_left_right_margins(&mut self, left: u16, right: u16) {
        let cols = self.cols();
        if left < right && right < cols {
            self.h_margins = HorizontalMargins { left, right };
        } else {
            self.h_margins = HorizontalMargins {
                left: 0,
                right: cols.saturating_sub(1),
            };
        }
        self.cursor.row = self.cursor.scroll_top();
        self.cursor.col = self.h_margins.left;
        self.cursor.pending_wrap = false;
    }

    pub fn reset_left_right_margins(&mut self) {
        self.h_margins = HorizontalMargins {
            left: 0,
            right: self.cols().saturating_sub(1),
        };
    }

    // ---- Editing ----

    pub fn insert_chars(&mut self, n: u16, bg: Color) {
        self.grid
            .insert_chars(self.cursor.row, self.cursor.col, n, bg);
    }

    pub fn delete_chars(&mut self, n: u16, bg: Color) {
        self.grid
            .delete_chars(self.cursor.row, self.cursor.col, n, bg);
    }

    pub fn insert_lines(&mut self, n: u16, bg: Color) {
        self.grid.insert_lines(
            self.cursor.row,
            n,
            self.cursor.scroll_top(),
            self.cursor.scroll_bottom(),
            bg,
        );
    }

    pub fn delete_lines(&mut self, n: u16, bg: Color) {
        self.grid.delete_lines(
            self.cursor.row,
            n,
            self.cursor.scroll_top(),
            self.cursor.scroll_bottom(),
            bg,
        );
    }

    pub fn erase_chars(&mut self, n: u16, bg: Color) {
        self.grid.erase_chars(self.cursor.row, self.cursor.col, n, bg);
    }

    pub fn clear_line(&mut self, bg: Color) {
        self.grid.erase_line(self.cursor.row, bg);
    }

    pub fn clear_to_begin_of_line(&mut self, bg: Color) {
        self.grid
            .erase_line_left(self.cursor.row, self.cursor.col, bg);
    }

    pub fn clear_to_end_of_line(&mut self, bg: Color) {
        self.grid
            .erase_line_right(self.cursor.row, self.cursor.col, bg);
    }

    pub fn clear_screen(&mut self, bg: Color) {
        self.grid.erase_all(bg);
    }

    pub fn clear_to_begin_of_screen(&mut self, bg: Color) {
        self.grid.erase_above(self.cursor.row, self.cursor.col, bg);
    }

    pub fn clear_to_end_of_screen(&mut self, bg: Color) {
        self.grid.erase_below(self.cursor.row, self.cursor.col, bg);
    }

    /// Scroll the margin region up by `n`, returning how many lines were
    /// actually evicted into scrollback (only nonzero when the margins span
    /// the whole page, matching a bare newline at the bottom).
    pub fn scroll_up(&mut self, n: u16, bg: Color) -> u16 {
        let top = self.cursor.scroll_top();
        let bottom = self.cursor.scroll_bottom() + 1;
        let full_page = top == 0 && bottom == self.rows();
        if full_page {
            let before = self.scrollback.len();
            self.grid
                .scroll_up_into(top, bottom, n, &mut self.scrollback, bg);
            (self.scrollback.len() - before) as u16
        } else {
            self.grid.scroll_up(top, bottom, n, bg);
            0
        }
    }

    pub fn scroll_down(&mut self, n: u16, bg: Color) {
        let top = self.cursor.scroll_top();
        let bottom = self.cursor.scroll_bottom() + 1;
        let full_page = top == 0 && bottom == self.rows();
        if full_page && !self.scrollback.is_empty() {
            self.grid
                .scroll_down_from(top, bottom, n, &mut self.scrollback, bg);
        } else {
            self.grid.scroll_down(top, bottom, n, bg);
        }
    }

    pub fn index(&mut self, bg: Color) -> u16 {
        if self.cursor.row == self.cursor.scroll_bottom() {
            self.scroll_up(1, bg)
        } else {
            self.cursor.row = (self.cursor.row + 1).min(self.rows().saturating_sub(1));
            0
        }
    }

    pub fn clear_history(&mut self) {
        self.scrollback.clear();
    }

    pub fn history_line_count(&self) -> usize {
        self.scrollback.len()
    }

    pub fn reverse_index(&mut self, bg: Color) {
        if self.cursor.row == self.cursor.scroll_top() {
            self.scroll_down(1, bg);
        } else {
            self.cursor.row = self.cursor.row.saturating_sub(1);
        }
    }

    pub fn next_line(&mut self, bg: Color) {
        self.index(bg);
        self.cursor.col = self.left_margin(false);
        self.cursor.pending_wrap = false;
    }

    // ---- Writing text ----

    /// Write one grapheme cluster at the cursor, honoring autowrap,
    /// combining marks, wide characters, and the active charset
    /// translation. `width` is the caller-computed display width (0, 1, 2).
    pub fn write_grapheme(&mut self, ch: char, width: u8, autowrap: bool) {
        let translated = crate::charset::translate_charset(ch, self.cursor.charset.effective_charset());

        if width == 0 {
            self.append_combining_mark(translated);
            return;
        }
        self.cursor.charset.consume_single_shift();

        if self.cursor.pending_wrap && autowrap {
            self.cursor.col = self.left_margin(false);
            self.index(self.cursor.attrs.bg);
            self.cursor.pending_wrap = false;
        }

        let right_edge = self.right_margin(false);
        if width == 2 && self.cursor.col + 1 > right_edge {
            if autowrap {
                self.grid.set_wrapped(self.cursor.row, true);
                self.cursor.col = self.left_margin(false);
                self.index(self.cursor.attrs.bg);
            } else {
                self.cursor.col = right_edge;
            }
        }

        self.grid
            .write_wide_char(self.cursor.row, self.cursor.col, translated, self.cursor.attrs);

        let advance = width.max(1) as u16;
        if self.cursor.col + advance > right_edge {
            self.cursor.col = right_edge;
            self.cursor.pending_wrap = autowrap;
        } else {
            self.cursor.col += advance;
        }
    }

    fn append_combining_mark(&mut self, mark: char) {
        let (row, col) = if self.cursor.col > 0 {
            (self.cursor.row, self.cursor.col - 1)
        } else if self.cursor.row > 0 {
            (self.cursor.row - 1, self.cols().saturating_sub(1))
        } else {
            return;
        };
        if let Some(cell) = self.grid.cell_mut(row, col) {
            let mut combined = String::new();
            combined.push(cell.content());
            combined.push(mark);
            if let Some(base) = combined.chars().next() {
                cell.set_content(base, cell.width());
            }
        }
    }

    pub fn resize(&mut self, cols: u16, rows: u16, reflow: bool) {
        if reflow {
            let new_row = self
                .grid
                .resize_with_scrollback(cols, rows, self.cursor.row, &mut self.scrollback);
            self.cursor.row = new_row;
        } else {
            self.grid.resize(cols, rows);
        }
        self.cursor.resize_tab_stops(cols);
        self.cursor.reset_scroll_region(rows);
        self.cursor.row = self.cursor.row.min(rows.saturating_sub(1));
        self.cursor.col = self.cursor.col.min(cols.saturating_sub(1));
        self.h_margins = HorizontalMargins {
            left: 0,
            right: cols.saturating_sub(1),
        };
    }

    // ---- Rectangular operations (DECCARA/DECRA/DECFRA/DECERA) ----

    /// Apply a flag-only SGR change (DECCARA) across a rectangle, clamped to
    /// the page (and to margins when `origin_mode` is set). Text content is
    /// untouched.
    pub fn change_attributes_in_rectangle(
        &mut self,
        top: u16,
        left: u16,
        bottom: u16,
        right: u16,
        params: &[Vec<u16>],
        origin_mode: bool,
    ) {
        let (row_lo, row_hi) = clamp_rect(top, bottom, self.rows(), origin_mode, &self.cursor);
        let (col_lo, col_hi) = clamp_rect(left, right, self.cols(), origin_mode, &self.cursor);
        for row in row_lo..=row_hi {
            for col in col_lo..=col_hi {
                if let Some(cell) = self.grid.cell_mut(row, col) {
                    cell.attrs.apply_sgr_params(params);
                }
            }
        }
    }

    pub fn fill_rectangle(&mut self, ch: char, top: u16, left: u16, bottom: u16, right: u16) {
        for row in top..=bottom.min(self.rows().saturating_sub(1)) {
            for col in left..=right.min(self.cols().saturating_sub(1)) {
                if let Some(cell) = self.grid.cell_mut(row, col) {
                    cell.set_content(ch, 1);
                }
            }
        }
    }

    pub fn erase_rectangle(&mut self, top: u16, left: u16, bottom: u16, right: u16, bg: Color) {
        for row in top..=bottom.min(self.rows().saturating_sub(1)) {
            for col in left..=right.min(self.cols().saturating_sub(1)) {
                if let Some(cell) = self.grid.cell_mut(row, col) {
                    cell.erase(bg);
                }
            }
        }
    }

    pub fn copy_rectangle(
        &mut self,
        src_top: u16,
        src_left: u16,
        src_bottom: u16,
        src_right: u16,
        dst_top: u16,
        dst_left: u16,
    ) {
        let mut buf: Vec<Cell> = Vec::new();
        let width = src_right.saturating_sub(src_left) + 1;
        for row in src_top..=src_bottom {
            for col in src_left..=src_right {
                buf.push(self.grid.cell(row, col).copied().unwrap_or_default());
            }
        }
        for (i, cell) in buf.into_iter().enumerate() {
            let dr = dst_top + (i as u16 / width);
            let dc = dst_left + (i as u16 % width);
            if let Some(dest) = self.grid.cell_mut(dr, dc) {
                *dest = cell;
            }
        }
    }

    pub fn designate_charset(&mut self, slot: u8, charset: Charset) {
        self.cursor.charset.designate(slot, charset);
    }

    pub fn tab_set(&mut self) {
        self.cursor.set_tab_stop();
    }

    pub fn tab_clear(&mut self, param: u16) {
        match param {
            0 => self.cursor.clear_tab_stop(),
            3 => self.cursor.clear_all_tab_stops(),
            _ => {}
        }
    }
}

fn clamp_rect(lo: u16, hi: u16, bound: u16, origin_mode: bool, cursor: &Cursor) -> (u16, u16) {
    let floor = if origin_mode { cursor.scroll_top() } else { 0 };
    let ceil = if origin_mode {
        cursor.scroll_bottom()
    } else {
        bound.saturating_sub(1)
    };
    let lo = lo.max(floor).min(ceil);
    let hi = hi.min(ceil).max(lo);
    (lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_moves_are_clamped_to_page() {
        let mut s = Screen::new(10, 5, 0);
        s.move_cursor_to(100, 100, false);
        assert_eq!(s.cursor.row, 4);
        assert_eq!(s.cursor.col, 9);
    }

    #[test]
    fn origin_mode_confines_cup_to_margins() {
        let mut s = Screen::new(10, 10, 0);
        s.set_top_bottom_margins(2, 6);
        s.move_cursor_to(0, 0, true);
        assert_eq!(s.cursor.row, 2);
    }

    #[test]
    fn write_grapheme_wraps_at_right_edge() {
        let mut s = Screen::new(4, 3, 0);
        for ch in "abcd".chars() {
            s.write_grapheme(ch, 1, true);
        }
        assert!(s.cursor.pending_wrap);
        s.write_grapheme('e', 1, true);
        assert_eq!(s.cursor.row, 1);
        assert_eq!(s.cursor.col, 1);
        assert_eq!(s.grid.cell(1, 0).unwrap().content(), 'e');
    }

    #[test]
    fn index_at_bottom_margin_scrolls() {
        let mut s = Screen::new(5, 3, 0);
        s.cursor.row = 2;
        s.index(Color::Default);
        assert_eq!(s.cursor.row, 2);
    }

    #[test]
    fn save_restore_cursor_round_trips_position() {
        let mut s = Screen::new(10, 10, 0);
        s.move_cursor_to(3, 4, false);
        s.save_cursor(false);
        s.move_cursor_to(0, 0, false);
        assert!(s.restore_cursor());
        assert_eq!((s.cursor.row, s.cursor.col), (3, 4));
    }

    #[test]
    fn deccara_changes_flags_without_touching_text() {
        let mut s = Screen::new(5, 5, 0);
        for r in 0..5u16 {
            for c in 0..5u16 {
                s.grid.cell_mut(r, c).unwrap().set_content('x', 1);
            }
        }
        s.change_attributes_in_rectangle(2, 3, 4, 5, &[vec![1]], false);
        assert!(s
            .grid
            .cell(2, 3)
            .unwrap()
            .attrs
            .flags
            .contains(crate::cell::SgrFlags::BOLD));
        assert_eq!(s.grid.cell(2, 3).unwrap().content(), 'x');
    }
}
