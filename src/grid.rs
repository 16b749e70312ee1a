//! Terminal grid: 2D cell matrix representing the visible viewport.
//!
//! The grid is the primary data model for the terminal. It owns a flat vector
//! of cells indexed by `(row, col)` and provides methods for the operations
//! that the VT parser dispatches (print, erase, scroll, resize).

use crate::cell::{Cell, Color, HyperlinkRegistry, SgrAttrs};
use crate::line::{Line, LogicalLine, rewrap_text};
use crate::scrollback::Scrollback;

/// 2D terminal cell grid.
///
/// Cells are stored in row-major order in a flat `Vec<Cell>`.
/// The grid does not own scrollback — see [`Scrollback`](crate::Scrollback).
#[derive(Debug, Clone)]
pub struct Grid {
    cells: Vec<Cell>,
    cols: u16,
    rows: u16,
    /// Per-row `Wrapped` flag: `wrapped[r]` means row `r` is a soft-wrap
    /// continuation of row `r - 1` (the two form one logical line together
    /// with whatever scrollback lines precede them for the same reason).
    wrapped: Vec<bool>,
}

impl Grid {
    /// Create a new grid filled with default (blank) cells.
    pub fn new(cols: u16, rows: u16) -> Self {
        let len = (cols as usize) * (rows as usize);
        Self {
            cells: vec![Cell::default(); len],
            cols,
            rows,
            wrapped: vec![false; rows as usize],
        }
    }

    /// Mark (or unmark) row `row` as a soft-wrap continuation of the row
    /// above it. Set by the screen's print path when a line wraps due to
    /// autowrap rather than an explicit newline.
    pub fn set_wrapped(&mut self, row: u16, wrapped: bool) {
        if let Some(slot) = self.wrapped.get_mut(row as usize) {
            *slot = wrapped;
        }
    }

    pub fn is_wrapped(&self, row: u16) -> bool {
        self.wrapped.get(row as usize).copied().unwrap_or(false)
    }

    /// Number of columns.
    pub fn cols(&self) -> u16 {
        self.cols
    }

    /// Number of rows.
    pub fn rows(&self) -> u16 {
        self.rows
    }

    /// Get a reference to the cell at `(row, col)`.
    ///
    /// Returns `None` if out of bounds.
    pub fn cell(&self, row: u16, col: u16) -> Option<&Cell> {
        if row < self.rows && col < self.cols {
            Some(&self.cells[self.index(row, col)])
        } else {
            None
        }
    }

    /// Get a mutable reference to the cell at `(row, col)`.
    ///
    /// Returns `None` if out of bounds.
    pub fn cell_mut(&mut self, row: u16, col: u16) -> Option<&mut Cell> {
        if row < self.rows && col < self.cols {
            let idx = self.index(row, col);
            Some(&mut self.cells[idx])
        } else {
            None
        }
    }

    /// Map a grid position to a hyperlink URI via the registry (OSC 8).
    ///
    /// This is intended for click/hover hit-testing in host renderers.
    pub fn hyperlink_uri_at<'a>(
        &self,
        row: u16,
        col: u16,
        registry: &'a HyperlinkRegistry,
    ) -> Option<&'a str> {
        let id = self.cell(row, col)?.hyperlink;
        registry.get(id)
    }

    /// Get a slice of cells for the given row.
    ///
    /// Returns `None` if `row` is out of bounds.
    pub fn row_cells(&self, row: u16) -> Option<&[Cell]> {
        if row < self.rows {
            let start = (row as usize) * (self.cols as usize);
            let end = start + (self.cols as usize);
            Some(&self.cells[start..end])
        } else {
            None
        }
    }

    /// Get a mutable slice of cells for the given row.
    pub fn row_cells_mut(&mut self, row: u16) -> Option<&mut [Cell]> {
        if row < self.rows {
            let start = (row as usize) * (self.cols as usize);
            let end = start + (self.cols as usize);
            Some(&mut self.cells[start..end])
        } else {
            None
        }
    }

    // ── Erase operations ────────────────────────────────────────────

    /// ED 0: Erase from cursor to end of display.
    pub fn erase_below(&mut self, row: u16, col: u16, bg: Color) {
        if row >= self.rows {
            return;
        }
        // Erase from cursor to end of current row.
        self.erase_range(row, col, row, self.cols, bg);
        // Erase all rows below.
        self.erase_range(row + 1, 0, self.rows, 0, bg);
    }

    /// ED 1: Erase from start of display to cursor (inclusive).
    pub fn erase_above(&mut self, row: u16, col: u16, bg: Color) {
        if row >= self.rows {
            return;
        }
        // Erase all rows above.
        if row > 0 {
            self.erase_range(0, 0, row, 0, bg);
        }
        // Erase from start of current row through cursor (inclusive).
        let ec = (col + 1).min(self.cols);
        self.erase_range(row, 0, row, ec, bg);
    }

    /// ED 2: Erase entire display.
    pub fn erase_all(&mut self, bg: Color) {
        for cell in &mut self.cells {
            cell.erase(bg);
        }
    }

    /// EL 0: Erase from cursor to end of line.
    pub fn erase_line_right(&mut self, row: u16, col: u16, bg: Color) {
        self.erase_range(row, col, row, self.cols, bg);
    }

    /// EL 1: Erase from start of line to cursor (inclusive).
    pub fn erase_line_left(&mut self, row: u16, col: u16, bg: Color) {
        let ec = (col + 1).min(self.cols);
        self.erase_range(row, 0, row, ec, bg);
    }

    /// EL 2: Erase entire line.
    pub fn erase_line(&mut self, row: u16, bg: Color) {
        self.erase_range(row, 0, row, self.cols, bg);
    }

    /// ECH: Erase `count` characters starting at `(row, col)`.
    pub fn erase_chars(&mut self, row: u16, col: u16, count: u16, bg: Color) {
        if row >= self.rows || col >= self.cols {
            return;
        }
        let end = (col + count).min(self.cols);
        self.erase_range(row, col, row, end, bg);
    }

    /// Erase a rectangular region. Single row if `end_row == start_row`,
    /// or full rows if `end_col == 0` for row > start_row.
    fn erase_range(
        &mut self,
        start_row: u16,
        start_col: u16,
        end_row: u16,
        end_col: u16,
        bg: Color,
    ) {
        let sr = start_row.min(self.rows);
        let er = end_row.min(self.rows);

        // Both bounds clamped to self.rows means nothing to erase.
        if sr >= self.rows {
            return;
        }

        if sr == er {
            // Single row partial erase.
            let sc = start_col.min(self.cols);
            let ec = end_col.min(self.cols);

            // Wide-char fixup (left): if erasing starts at a continuation
            // cell, its head is outside the range and becomes orphaned.
            if sc > 0 && sc < self.cols {
                let idx = self.index(sr, sc);
                if self.cells[idx].is_wide_continuation() {
                    let head_idx = self.index(sr, sc - 1);
                    self.cells[head_idx].erase(bg);
                }
            }
            // Wide-char fixup (right): if the cell just past the erased
            // range is a continuation, its head is being erased.
            if ec < self.cols {
                let idx = self.index(sr, ec);
                if self.cells[idx].is_wide_continuation() {
                    self.cells[idx].erase(bg);
                }
            }

            for c in sc..ec {
                let idx = self.index(sr, c);
                self.cells[idx].erase(bg);
            }
        } else {
            // First row partial.
            let sc = start_col.min(self.cols);

            // Wide-char fixup (left) for first row.
            if sc > 0 && sc < self.cols {
                let idx = self.index(sr, sc);
                if self.cells[idx].is_wide_continuation() {
                    let head_idx = self.index(sr, sc - 1);
                    self.cells[head_idx].erase(bg);
                }
            }

            for c in sc..self.cols {
                let idx = self.index(sr, c);
                self.cells[idx].erase(bg);
            }
            // Full rows in between.
            for r in (sr + 1)..er {
                for c in 0..self.cols {
                    let idx = self.index(r, c);
                    self.cells[idx].erase(bg);
                }
            }
            // Last row partial (if end_col > 0).
            if end_col > 0 && er < self.rows {
                let ec = end_col.min(self.cols);

                // Wide-char fixup (right) for last row.
                if ec < self.cols {
                    let idx = self.index(er, ec);
                    if self.cells[idx].is_wide_continuation() {
                        self.cells[idx].erase(bg);
                    }
                }

                for c in 0..ec {
                    let idx = self.index(er, c);
                    self.cells[idx].erase(bg);
                }
            }
        }
    }

    // ── Fill / clear ────────────────────────────────────────────────

    /// Fill a region of cells with defaults (erase with default bg).
    ///
    /// Coordinates are clamped to grid bounds.
    pub fn clear_region(&mut self, start_row: u16, start_col: u16, end_row: u16, end_col: u16) {
        let sr = start_row.min(self.rows);
        let er = end_row.min(self.rows);
        let sc = start_col.min(self.cols);
        let ec = end_col.min(self.cols);

        for r in sr..er {
            for c in sc..ec {
                let idx = self.index(r, c);
                self.cells[idx] = Cell::default();
            }
        }
    }

    /// Clear the entire grid.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            *cell = Cell::default();
        }
    }

    /// Fill every cell with the given character and default attributes.
    ///
    /// Used by DECALN (Screen Alignment Test) which fills the screen with 'E'.
    pub fn fill_all(&mut self, ch: char) {
        for cell in &mut self.cells {
            *cell = Cell::default();
            cell.set_content(ch, 1);
        }
    }

    // ── Insert / delete characters ──────────────────────────────────

    /// ICH: Insert `count` blank cells at `(row, col)`, shifting existing
    /// cells to the right. Cells that shift past the right margin are lost.
    pub fn insert_chars(&mut self, row: u16, col: u16, count: u16, bg: Color) {
        if row >= self.rows || col >= self.cols || count == 0 {
            return;
        }
        let cols = self.cols as usize;
        let c = col as usize;
        let n = (count as usize).min(cols - c);
        let start = self.index(row, 0);
        let row_slice = &mut self.cells[start..start + cols];

        // Wide-char fixup: if inserting at a continuation cell, the head
        // at col-1 loses its pair and must be erased.
        let was_continuation = row_slice[c].is_wide_continuation();
        if was_continuation && c > 0 {
            row_slice[c - 1].erase(bg);
        }

        // Shift right: copy from right to left to avoid overlap issues.
        for i in (c + n..cols).rev() {
            row_slice[i] = row_slice[i - n];
        }
        // Blank the inserted positions.
        for cell in &mut row_slice[c..c + n] {
            cell.erase(bg);
        }

        // Wide-char fixup: the continuation that was at col shifted to
        // col+n; since its head was erased, clean it up.
        if was_continuation && c + n < cols && row_slice[c + n].is_wide_continuation() {
            row_slice[c + n].erase(bg);
        }

        // Wide-char fixup: if a wide head shifted to the last column,
        // its continuation fell off the right margin.
        if row_slice[cols - 1].is_wide() {
            row_slice[cols - 1].erase(bg);
        }
    }

    /// DCH: Delete `count` cells at `(row, col)`, shifting remaining cells
    /// left. Blank cells are inserted at the right margin.
    pub fn delete_chars(&mut self, row: u16, col: u16, count: u16, bg: Color) {
        if row >= self.rows || col >= self.cols || count == 0 {
            return;
        }
        let cols = self.cols as usize;
        let c = col as usize;
        let n = (count as usize).min(cols - c);
        let start = self.index(row, 0);
        let row_slice = &mut self.cells[start..start + cols];

        // Wide-char fixup: if deleting at a continuation cell, the head
        // at col-1 loses its pair and must be erased.
        if row_slice[c].is_wide_continuation() && c > 0 {
            row_slice[c - 1].erase(bg);
        }

        // Shift left.
        for i in c..cols - n {
            row_slice[i] = row_slice[i + n];
        }
        // Blank the vacated positions at the right.
        for cell in &mut row_slice[cols - n..] {
            cell.erase(bg);
        }

        // Wide-char fixup: after shift, if cell at col is an orphaned
        // continuation (its head was deleted), clean it up.
        if c < cols && row_slice[c].is_wide_continuation() {
            row_slice[c].erase(bg);
        }
    }

    // ── Scroll operations ───────────────────────────────────────────

    /// Scroll lines up: remove `count` rows starting at `top`, shift everything
    /// above `bottom` up, and fill the gap at the bottom with blanks.
    ///
    /// `top` and `bottom` define the scroll region (0-indexed, exclusive bottom).
    pub fn scroll_up(&mut self, top: u16, bottom: u16, count: u16, bg: Color) {
        let top = top.min(self.rows);
        let bottom = bottom.min(self.rows);
        if top >= bottom || count == 0 {
            return;
        }
        let count = count.min(bottom - top);
        let cols = self.cols as usize;

        // Shift rows up.
        let src_start = (top + count) as usize * cols;
        let dst_start = top as usize * cols;
        let move_len = (bottom - top - count) as usize * cols;
        self.cells
            .copy_within(src_start..src_start + move_len, dst_start);

        // Blank the vacated rows at the bottom (BCE: inherit cursor bg).
        let blank_start = (bottom - count) as usize * cols;
        let blank_end = bottom as usize * cols;
        for cell in &mut self.cells[blank_start..blank_end] {
            cell.erase(bg);
        }
    }

    /// Scroll lines down: insert `count` blank rows at `top`, shifting
    /// everything down and discarding rows that fall past `bottom`.
    pub fn scroll_down(&mut self, top: u16, bottom: u16, count: u16, bg: Color) {
        let top = top.min(self.rows);
        let bottom = bottom.min(self.rows);
        if top >= bottom || count == 0 {
            return;
        }
        let count = count.min(bottom - top);
        let cols = self.cols as usize;

        // Shift rows down.
        let src_start = top as usize * cols;
        let src_len = (bottom - top - count) as usize * cols;
        let dst_start = (top + count) as usize * cols;
        self.cells
            .copy_within(src_start..src_start + src_len, dst_start);

        // Blank the vacated rows at the top (BCE: inherit cursor bg).
        let blank_end = (top + count) as usize * cols;
        for cell in &mut self.cells[top as usize * cols..blank_end] {
            cell.erase(bg);
        }
    }

    /// Scroll up, pushing the evicted top rows into a scrollback buffer.
    ///
    /// This is the normal "content scrolls up" operation triggered by a newline
    /// at the bottom of the scroll region. The topmost `count` rows within
    /// `[top, bottom)` are pushed to `scrollback` before being discarded.
    pub fn scroll_up_into(
        &mut self,
        top: u16,
        bottom: u16,
        count: u16,
        scrollback: &mut Scrollback,
        bg: Color,
    ) {
        let top = top.min(self.rows);
        let bottom = bottom.min(self.rows);
        if top >= bottom || count == 0 {
            return;
        }
        let count = count.min(bottom - top);

        // Push evicted rows to scrollback.
        for r in top..top + count {
            if let Some(row) = self.row_cells(r) {
                let _ = scrollback.push_row(row, false);
            }
        }

        // Now do the normal scroll-up.
        self.scroll_up(top, bottom, count, bg);
    }

    /// Scroll down, pulling lines from scrollback into the vacated rows at top.
    ///
    /// This is the reverse of `scroll_up_into`: content shifts down and
    /// scrollback lines are restored at the top of the scroll region.
    pub fn scroll_down_from(
        &mut self,
        top: u16,
        bottom: u16,
        count: u16,
        scrollback: &mut Scrollback,
        bg: Color,
    ) {
        let top = top.min(self.rows);
        let bottom = bottom.min(self.rows);
        if top >= bottom || count == 0 {
            return;
        }
        let count = count.min(bottom - top);

        // Normal scroll-down first (creates blank rows at top).
        self.scroll_down(top, bottom, count, bg);

        // Fill the vacated top rows from scrollback (newest first).
        for r in (top..top + count).rev() {
            if let Some(line) = scrollback.pop_newest() {
                let row_start = self.index(r, 0);
                let cols = self.cols as usize;
                let copy_len = line.cells.len().min(cols);
                self.cells[row_start..row_start + copy_len]
                    .copy_from_slice(&line.cells[..copy_len]);
                // If the scrollback line is shorter than cols, the rest stays blank.
            }
        }
    }

    /// IL: Insert `count` blank lines at `row` within the scroll region
    /// `[top, bottom)`. Lines that fall past `bottom` are discarded.
    pub fn insert_lines(&mut self, row: u16, count: u16, top: u16, bottom: u16, bg: Color) {
        if row < top || row >= bottom {
            return;
        }
        self.scroll_down(row, bottom, count, bg);
    }

    /// DL: Delete `count` lines at `row` within the scroll region
    /// `[top, bottom)`. Blank lines appear at `bottom - count`.
    pub fn delete_lines(&mut self, row: u16, count: u16, top: u16, bottom: u16, bg: Color) {
        if row < top || row >= bottom {
            return;
        }
        self.scroll_up(row, bottom, count, bg);
    }

    // ── Wide character handling ──────────────────────────────────────

    /// Write a wide (2-column) character at `(row, col)`.
    ///
    /// Sets the leading cell at `col` and the continuation cell at `col+1`.
    /// If `col+1` is past the right margin, no write occurs.
    /// Also clears any existing wide char that this write would partially
    /// overwrite (the "wide char fixup").
    pub fn write_wide_char(&mut self, row: u16, col: u16, ch: char, attrs: SgrAttrs) {
        if row >= self.rows || col + 1 >= self.cols {
            return;
        }
        // Fixup: if we're overwriting the continuation of a wide char at col,
        // clear the leading cell at col-1.
        if col > 0 {
            let prev_idx = self.index(row, col - 1);
            if self.cells[prev_idx].is_wide() {
                self.cells[prev_idx].clear();
            }
        }
        // Fixup: if we're overwriting the leading cell of a wide char at col+1,
        // clear the continuation at col+2.
        let next_idx = self.index(row, col + 1);
        if self.cells[next_idx].is_wide() && col + 2 < self.cols {
            let cont_idx = self.index(row, col + 2);
            self.cells[cont_idx].clear();
        }

        let (lead, cont) = Cell::wide(ch, attrs);
        let lead_idx = self.index(row, col);
        self.cells[lead_idx] = lead;
        self.cells[next_idx] = cont;
    }

    /// Write one printable Unicode scalar with terminal-width semantics.
    ///
    /// Returns the written display width:
    /// - `0` for non-spacing marks/format controls (fallback: ignored)
    /// - `1` for narrow cells
    /// - `2` for wide cells
    ///
    /// If a wide character does not fit at `col` (i.e. `col+1 >= cols`), this
    /// method returns `0` and leaves the grid unchanged. Callers are responsible
    /// for wrap policy decisions.
    pub fn write_printable(&mut self, row: u16, col: u16, ch: char, attrs: SgrAttrs) -> u8 {
        if row >= self.rows || col >= self.cols {
            return 0;
        }

        let width = Cell::display_width(ch);
        match width {
            0 => 0,
            1 => {
                // If we overwrite the continuation of a wide char, clear its head.
                if col > 0 {
                    let prev_idx = self.index(row, col - 1);
                    if self.cells[prev_idx].is_wide() {
                        self.cells[prev_idx].clear();
                    }
                }

                // If the current cell is a wide head, clear its continuation.
                let idx = self.index(row, col);
                if self.cells[idx].is_wide() && col + 1 < self.cols {
                    let cont_idx = self.index(row, col + 1);
                    self.cells[cont_idx].clear();
                }

                if let Some(cell) = self.cell_mut(row, col) {
                    cell.set_content(ch, 1);
                    cell.attrs = attrs;
                }
                1
            }
            _ => {
                if col + 1 >= self.cols {
                    return 0;
                }
                self.write_wide_char(row, col, ch, attrs);
                2
            }
        }
    }

    // ── Resize ──────────────────────────────────────────────────────

    /// Resize the grid to new dimensions.
    ///
    /// Content is preserved where possible: rows/columns that fit in the
    /// new dimensions are kept, extras are truncated, new space is blanked.
    pub fn resize(&mut self, new_cols: u16, new_rows: u16) {
        if new_cols == self.cols && new_rows == self.rows {
            return;
        }
        let mut new_cells = vec![Cell::default(); new_cols as usize * new_rows as usize];
        let copy_rows = self.rows.min(new_rows);
        let copy_cols = self.cols.min(new_cols);

        for r in 0..copy_rows {
            let old_start = (r as usize) * (self.cols as usize);
            let new_start = (r as usize) * (new_cols as usize);
            new_cells[new_start..new_start + copy_cols as usize]
                .copy_from_slice(&self.cells[old_start..old_start + copy_cols as usize]);
        }

        let mut new_wrapped = vec![false; new_rows as usize];
        for (r, slot) in new_wrapped.iter_mut().enumerate().take(copy_rows as usize) {
            *slot = self.is_wrapped(r as u16);
        }

        self.cells = new_cells;
        self.cols = new_cols;
        self.rows = new_rows;
        self.wrapped = new_wrapped;
    }

    /// Resize with scrollback integration.
    ///
    /// # Reflow policy: truncate/extend (no soft-wrap reflow)
    ///
    /// - **Width decrease**: cells past the new width are discarded.
    /// - **Width increase**: new columns are filled with blanks.
    /// - **Height decrease**: excess rows at the top are pushed to scrollback,
    ///   keeping the cursor anchored at its current absolute position.
    /// - **Height increase**: rows are pulled back from scrollback to fill the
    ///   new space at the top.
    ///
    /// Returns the new cursor row after adjustment.
    pub fn resize_with_scrollback(
        &mut self,
        new_cols: u16,
        new_rows: u16,
        cursor_row: u16,
        scrollback: &mut Scrollback,
    ) -> u16 {
        if new_cols == self.cols && new_rows == self.rows {
            return cursor_row;
        }

        let old_rows = self.rows;
        let mut new_cursor_row = cursor_row;

        // ── Handle height decrease: push excess top rows to scrollback ──
        if new_rows < old_rows {
            // We want to keep the content around the cursor visible.
            // Push rows from the top that won't fit.
            let excess = old_rows - new_rows;
            // The cursor should remain in the viewport. Calculate how many
            // rows above the cursor we can afford to keep.
            let rows_above_cursor = cursor_row;
            let rows_to_push = excess.min(rows_above_cursor);

            for r in 0..rows_to_push {
                if let Some(row) = self.row_cells(r) {
                    let _ = scrollback.push_row(row, false);
                }
            }

            if rows_to_push > 0 {
                // Shift remaining content up.
                let cols = self.cols as usize;
                let src = rows_to_push as usize * cols;
                let len = (old_rows - rows_to_push) as usize * cols;
                self.cells.copy_within(src..src + len, 0);
                new_cursor_row = cursor_row - rows_to_push;
            }
        }

        // ── Handle height increase: pull rows from scrollback ──
        let mut pulled_from_scrollback: u16 = 0;
        if new_rows > old_rows {
            let extra = new_rows - old_rows;
            // Pull up to `extra` lines from scrollback.
            let available = scrollback.len().min(extra as usize) as u16;
            pulled_from_scrollback = available;
        }

        // ── Build new cell buffer ──
        let new_total = new_cols as usize * new_rows as usize;
        let mut new_cells = vec![Cell::default(); new_total];

        // If we pulled lines from scrollback, place them at the top.
        let mut dest_row: u16 = 0;
        if pulled_from_scrollback > 0 {
            // Collect lines from scrollback (newest = bottom of the pulled region).
            let mut pulled_lines = Vec::with_capacity(pulled_from_scrollback as usize);
            for _ in 0..pulled_from_scrollback {
                if let Some(line) = scrollback.pop_newest() {
                    pulled_lines.push(line);
                }
            }
            // Reverse so oldest is at top.
            pulled_lines.reverse();

            for line in &pulled_lines {
                let new_start = dest_row as usize * new_cols as usize;
                let copy_len = line.cells.len().min(new_cols as usize);
                new_cells[new_start..new_start + copy_len].copy_from_slice(&line.cells[..copy_len]);
                dest_row += 1;
            }
            new_cursor_row = cursor_row + pulled_from_scrollback;
        }

        // Copy existing rows (after any top-push) into the new buffer.
        let copy_cols = self.cols.min(new_cols) as usize;
        let src_row_start = if new_rows < old_rows {
            // We already shifted content up, so start from row 0 of the
            // (now-compacted) old buffer.
            0u16
        } else {
            0u16
        };
        let src_rows_available = if new_rows < old_rows {
            (old_rows - (cursor_row.saturating_sub(new_cursor_row))).min(new_rows)
        } else {
            old_rows
        };
        let dest_rows_remaining = new_rows - dest_row;
        let copy_rows = src_rows_available.min(dest_rows_remaining);

        for r in 0..copy_rows {
            let old_start = (src_row_start + r) as usize * self.cols as usize;
            let new_start = (dest_row + r) as usize * new_cols as usize;
            if old_start + copy_cols <= self.cells.len() && new_start + copy_cols <= new_cells.len()
            {
                new_cells[new_start..new_start + copy_cols]
                    .copy_from_slice(&self.cells[old_start..old_start + copy_cols]);
            }
        }

        self.cells = new_cells;
        self.cols = new_cols;
        self.rows = new_rows;
        // This path only changes row/column counts without re-wrapping
        // text (see `reflow` for that), so there's no new wrap structure
        // to compute; rows pulled back from scrollback restore their own
        // `wrapped` flag there, but are otherwise indistinguishable here.
        self.wrapped = vec![false; new_rows as usize];

        // Clamp cursor row to new bounds.
        new_cursor_row.min(new_rows.saturating_sub(1))
    }

    // ── Logical lines ───────────────────────────────────────────────

    /// Maximal runs of rows joined by the `Wrapped` flag, oldest first.
    /// Row indices are local to this grid (`top`/`bottom` are grid rows,
    /// not scrollback-relative).
    pub fn logical_lines(&self) -> Vec<LogicalLine> {
        let mut lines = Vec::new();
        if self.rows == 0 {
            return lines;
        }
        let mut top = 0u16;
        for row in 1..self.rows {
            if !self.is_wrapped(row) {
                lines.push(LogicalLine {
                    top: top as usize,
                    bottom: row as usize,
                });
                top = row;
            }
        }
        lines.push(LogicalLine {
            top: top as usize,
            bottom: self.rows as usize,
        });
        lines
    }

    /// [`logical_lines`](Self::logical_lines), newest first.
    pub fn logical_lines_reverse(&self) -> Vec<LogicalLine> {
        let mut lines = self.logical_lines();
        lines.reverse();
        lines
    }

    // ── Reflow ──────────────────────────────────────────────────────

    /// Resize to `new_cols` x `new_rows`, re-wrapping soft-wrapped text to
    /// the new width instead of truncating/padding each row independently.
    ///
    /// Walks logical lines across `scrollback` followed by this grid's own
    /// rows, concatenates each logical line's text and per-character SGR,
    /// and re-wraps at `new_cols` via [`rewrap_text`]. The result is
    /// redistributed: the last `new_rows` produced rows become the new
    /// visible grid, everything above them is pushed back into
    /// `scrollback` (oldest first). Returns the relocated cursor
    /// position, clamped into the visible grid if it scrolled into
    /// history.
    ///
    /// If `new_cols == self.cols()`, this degrades to
    /// [`resize_with_scrollback`](Self::resize_with_scrollback), which
    /// needs no re-wrap.
    pub fn reflow(
        &mut self,
        new_cols: u16,
        new_rows: u16,
        cursor_row: u16,
        cursor_col: u16,
        scrollback: &mut Scrollback,
    ) -> (u16, u16) {
        if new_cols == self.cols || new_cols == 0 {
            let row = self.resize_with_scrollback(new_cols.max(1), new_rows, cursor_row, scrollback);
            return (row, cursor_col.min(new_cols.saturating_sub(1)));
        }

        let fill = SgrAttrs::default();

        // Combined (scrollback ++ grid) rows, oldest first.
        let mut combined: Vec<(Vec<Cell>, bool)> =
            Vec::with_capacity(scrollback.len() + self.rows as usize);
        for line in scrollback.iter() {
            combined.push((line.cells.clone(), line.wrapped));
        }
        let scrollback_rows = combined.len();
        for r in 0..self.rows {
            let cells = self.row_cells(r).unwrap_or(&[]).to_vec();
            combined.push((cells, self.is_wrapped(r)));
        }
        let cursor_abs = scrollback_rows + cursor_row as usize;

        // Group into logical-line [start, end) ranges joined by `wrapped`.
        let mut ranges: Vec<(usize, usize)> = Vec::new();
        if !combined.is_empty() {
            let mut start = 0usize;
            for i in 1..combined.len() {
                if !combined[i].1 {
                    ranges.push((start, i));
                    start = i;
                }
            }
            ranges.push((start, combined.len()));
        }

        // Re-wrap each logical line; track the new (row, col) of the
        // cursor's absolute character offset along the way.
        let mut rebuilt: Vec<(Line, bool)> = Vec::new();
        let mut cursor_new_row: Option<usize> = None;
        let mut cursor_new_col: u16 = 0;

        for (lstart, lend) in ranges {
            let mut text = String::new();
            let mut attrs: Vec<SgrAttrs> = Vec::new();
            let mut cursor_offset: Option<usize> = None;

            for row_idx in lstart..lend {
                let (cells, _) = &combined[row_idx];
                let mut col = 0u16;
                for cell in cells.iter() {
                    if cell.is_wide_continuation() {
                        col += 1;
                        continue;
                    }
                    if row_idx == cursor_abs && col == cursor_col {
                        cursor_offset = Some(text.chars().count());
                    }
                    text.push(cell.content());
                    attrs.push(cell.attrs);
                    col += cell.width().max(1) as u16;
                }
            }
            // Trim uniform trailing blanks so padding doesn't manufacture
            // an extra wrapped row of pure fill.
            while attrs.last().is_some_and(|a| *a == fill) && text.ends_with(' ') {
                text.pop();
                attrs.pop();
            }

            let row_base = rebuilt.len();
            let rewrapped = rewrap_text(&text, new_cols, fill, |i| {
                attrs.get(i).copied().unwrap_or(fill)
            });
            if let Some(offset) = cursor_offset {
                let mut remaining = offset;
                for (ri, row) in rewrapped.iter().enumerate() {
                    let row_len = row.to_text().trim_end().chars().count();
                    if remaining <= row_len {
                        cursor_new_row = Some(row_base + ri);
                        cursor_new_col = remaining as u16;
                        break;
                    }
                    remaining = remaining.saturating_sub(row_len.max(1));
                }
            }
            let n = rewrapped.len();
            rebuilt.extend(
                rewrapped
                    .into_iter()
                    .enumerate()
                    .map(|(i, line)| (line, i > 0 && n > 1)),
            );
        }

        let total = rebuilt.len();
        let visible_start = total.saturating_sub(new_rows as usize);

        scrollback.clear();
        for (i, (line, wrapped)) in rebuilt.iter().enumerate().take(visible_start) {
            let _ = scrollback.push_row(&line.to_cells(), *wrapped && i > 0);
        }

        let mut new_cells = vec![Cell::default(); new_cols as usize * new_rows as usize];
        let mut new_wrapped = vec![false; new_rows as usize];
        for (dest_row, (line, wrapped)) in rebuilt[visible_start..].iter().enumerate() {
            let cells = line.to_cells();
            let start = dest_row * new_cols as usize;
            let len = cells.len().min(new_cols as usize);
            new_cells[start..start + len].copy_from_slice(&cells[..len]);
            new_wrapped[dest_row] = *wrapped;
        }

        self.cells = new_cells;
        self.cols = new_cols;
        self.rows = new_rows;
        self.wrapped = new_wrapped;

        let new_row = match cursor_new_row {
            Some(abs) if abs >= visible_start => (abs - visible_start) as u16,
            Some(_) => 0,
            None => 0,
        }
        .min(new_rows.saturating_sub(1));
        (new_row, cursor_new_col.min(new_cols.saturating_sub(1)))
    }

    /// Convert (row, col) to flat index.
    #[inline]
    fn index(&self, row: u16, col: u16) -> usize {
        (row as usize) * (self.cols as usize) + (col as usize)
    }
}
