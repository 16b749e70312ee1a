//! A single row of the grid, in one of two representations.
//!
//! Most of a terminal's visible content is large uniform runs: blank lines,
//! a shell prompt printed with one SGR state, a `cat`'d file with no color
//! codes. A [`Trivial`](Line::Trivial) line represents such a row as a
//! shared attribute set plus a flat string, at `O(1)` cost regardless of
//! width. Any write that cannot be expressed that way (a per-cell SGR
//! change, a combining mark, an image fragment, a wide character) inflates
//! the line into a `Vec<Cell>` first. Every read goes through a uniform
//! `cell`/`cell_mut` interface so callers never need to know which
//! representation backs a given row.

use bitflags::bitflags;

use crate::cell::{Cell, Color, HyperlinkId, SgrAttrs, display_width};

bitflags! {
    /// Per-line flags orthogonal to cell content.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LineFlags: u8 {
        /// This line participates in reflow: it may be joined to its
        /// successor/predecessor when rewrapping.
        const WRAPPABLE = 1 << 0;
        /// This line is the continuation of a logical line that wrapped
        /// from the line above (set on the *successor*, not the line that
        /// produced the wrap).
        const WRAPPED   = 1 << 1;
        /// User-visible mark (e.g. `:` line-mark in vi mode).
        const MARKED    = 1 << 2;
    }
}

/// A uniformly-styled line stored as flat text rather than per-cell data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrivialLine {
    cols: u16,
    used_columns: u16,
    text: Vec<char>,
    text_attrs: SgrAttrs,
    fill_attrs: SgrAttrs,
    hyperlink: HyperlinkId,
}

impl TrivialLine {
    fn blank(cols: u16, fill_attrs: SgrAttrs) -> Self {
        Self {
            cols,
            used_columns: 0,
            text: Vec::new(),
            text_attrs: SgrAttrs::default(),
            fill_attrs,
            hyperlink: 0,
        }
    }

    fn cell(&self, col: u16) -> Cell {
        if col < self.used_columns {
            let ch = self.text.get(col as usize).copied().unwrap_or(' ');
            Cell::with_attrs(ch, 1, self.text_attrs).with_hyperlink(self.hyperlink)
        } else {
            let mut cell = Cell::default();
            cell.attrs.bg = self.fill_attrs.bg;
            cell
        }
    }

    fn into_cells(self) -> Vec<Cell> {
        (0..self.cols).map(|col| self.cell(col)).collect()
    }

    fn to_text(&self) -> String {
        self.text.iter().collect()
    }
}

/// A single row of the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Trivial(TrivialLine),
    Inflated(Vec<Cell>),
}

impl Line {
    /// A blank line of `cols` columns, filled with `fill_attrs`'s background.
    pub fn blank(cols: u16, fill_attrs: SgrAttrs) -> Self {
        Line::Trivial(TrivialLine::blank(cols, fill_attrs))
    }

    /// Set this line to uniform text with uniform attributes
    /// (`Grid::set_line_text`). Always produces a `Trivial` representation.
    pub fn set_text(&mut self, cols: u16, text: &str, attrs: SgrAttrs, hyperlink: HyperlinkId) {
        let mut chars: Vec<char> = text.chars().take(cols as usize).collect();
        chars.truncate(cols as usize);
        let used = chars.len() as u16;
        *self = Line::Trivial(TrivialLine {
            cols,
            used_columns: used,
            text: chars,
            text_attrs: attrs,
            fill_attrs: SgrAttrs {
                bg: attrs.bg,
                ..SgrAttrs::default()
            },
            hyperlink,
        });
    }

    pub fn is_trivial(&self) -> bool {
        matches!(self, Line::Trivial(_))
    }

    pub fn cols(&self) -> u16 {
        match self {
            Line::Trivial(t) => t.cols,
            Line::Inflated(cells) => cells.len() as u16,
        }
    }

    /// Read a cell without forcing inflation.
    pub fn cell(&self, col: u16) -> Cell {
        match self {
            Line::Trivial(t) => t.cell(col),
            Line::Inflated(cells) => cells.get(col as usize).copied().unwrap_or_default(),
        }
    }

    /// Inflate (if needed) and return a mutable reference to the cell at
    /// `col`. Any mutation through this path must be assumed to break
    /// triviality, so the line is inflated unconditionally here.
    pub fn cell_mut(&mut self, col: u16) -> Option<&mut Cell> {
        self.inflate();
        match self {
            Line::Inflated(cells) => cells.get_mut(col as usize),
            Line::Trivial(_) => unreachable!("inflate() always produces Inflated"),
        }
    }

    /// Force this line into its `Inflated` representation.
    pub fn inflate(&mut self) {
        if let Line::Trivial(t) = self {
            let cols = t.cols;
            let cells = std::mem::replace(t, TrivialLine::blank(cols, SgrAttrs::default())).into_cells();
            *self = Line::Inflated(cells);
        }
    }

    /// Borrow (inflating first) the full cell row.
    pub fn cells_mut(&mut self) -> &mut [Cell] {
        self.inflate();
        match self {
            Line::Inflated(cells) => cells.as_mut_slice(),
            Line::Trivial(_) => unreachable!(),
        }
    }

    /// Snapshot the row as an owned cell vector without mutating `self`.
    pub fn to_cells(&self) -> Vec<Cell> {
        match self {
            Line::Trivial(t) => (0..t.cols).map(|c| t.cell(c)).collect(),
            Line::Inflated(cells) => cells.clone(),
        }
    }

    /// Resize this line to a new column count, padding with `fill` or
    /// truncating. Does not reflow; used by non-reflow resize and by
    /// reflow's own re-wrap step to produce fixed-width rows.
    pub fn resize(&mut self, new_cols: u16, fill: SgrAttrs) {
        match self {
            Line::Trivial(t) => {
                t.cols = new_cols;
                t.used_columns = t.used_columns.min(new_cols);
                t.text.truncate(t.used_columns as usize);
                t.fill_attrs.bg = fill.bg;
            }
            Line::Inflated(cells) => {
                let old_len = cells.len();
                cells.resize_with(new_cols as usize, Cell::default);
                for cell in cells.iter_mut().skip(old_len) {
                    cell.erase(fill.bg);
                }
            }
        }
    }

    /// Plain-text projection of the row (trailing blanks included up to
    /// the row's column count; callers trim as needed).
    pub fn to_text(&self) -> String {
        match self {
            Line::Trivial(t) => {
                let mut s = t.to_text();
                let pad = t.cols.saturating_sub(t.used_columns);
                s.extend(std::iter::repeat_n(' ', pad as usize));
                s
            }
            Line::Inflated(cells) => cells
                .iter()
                .filter(|c| !c.is_wide_continuation())
                .map(|c| c.content())
                .collect(),
        }
    }

    /// Search for `pattern` starting at `start_col`, case-sensitivity as
    /// given. Returns the column of the first match, if any.
    pub fn search(&self, pattern: &str, start_col: u16, case_sensitive: bool) -> Option<u16> {
        if pattern.is_empty() {
            return None;
        }
        let text = self.to_text();
        let haystack: Vec<char> = text.chars().collect();
        let needle: Vec<char> = pattern.chars().collect();
        if needle.len() > haystack.len() {
            return None;
        }
        let start = start_col as usize;
        for base in start..=haystack.len().saturating_sub(needle.len()) {
            if matches_at(&haystack, base, &needle, case_sensitive) {
                return Some(base as u16);
            }
        }
        None
    }

    /// Search backward from `start_col` (inclusive), returning the highest
    /// matching column.
    pub fn search_reverse(&self, pattern: &str, start_col: u16, case_sensitive: bool) -> Option<u16> {
        if pattern.is_empty() {
            return None;
        }
        let text = self.to_text();
        let haystack: Vec<char> = text.chars().collect();
        let needle: Vec<char> = pattern.chars().collect();
        if needle.len() > haystack.len() {
            return None;
        }
        let max_base = (start_col as usize).min(haystack.len().saturating_sub(needle.len()));
        for base in (0..=max_base).rev() {
            if matches_at(&haystack, base, &needle, case_sensitive) {
                return Some(base as u16);
            }
        }
        None
    }

    /// Exact match test at a fixed column.
    pub fn match_text_at(&self, text: &str, col: u16, case_sensitive: bool) -> bool {
        let haystack: Vec<char> = self.to_text().chars().collect();
        let needle: Vec<char> = text.chars().collect();
        matches_at(&haystack, col as usize, &needle, case_sensitive)
    }
}

fn matches_at(haystack: &[char], base: usize, needle: &[char], case_sensitive: bool) -> bool {
    if base + needle.len() > haystack.len() {
        return false;
    }
    haystack[base..base + needle.len()]
        .iter()
        .zip(needle.iter())
        .all(|(&a, &b)| {
            if case_sensitive {
                a == b
            } else {
                a.to_lowercase().eq(b.to_lowercase())
            }
        })
}

impl Cell {
    /// Builder-style hyperlink setter, used by [`TrivialLine::cell`].
    pub(crate) fn with_hyperlink(mut self, id: HyperlinkId) -> Self {
        self.hyperlink = id;
        self
    }
}

/// A maximal chain of lines joined by the `Wrapped` flag: the unit of text
/// reflow. `top`/`bottom` are row indices into whatever sequence the caller
/// is iterating (grid viewport, or viewport + scrollback).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    pub top: usize,
    pub bottom: usize,
}

/// Re-wrap the plain-text content of a logical line (already concatenated
/// across its physical lines) into rows of `new_cols` width, producing
/// fresh `Line`s with wide-character-aware placement.
///
/// `attrs_at(i)` supplies the SGR to use for the `i`th character of
/// `text`; this lets callers reflow styled content without this function
/// needing to know the source representation.
pub fn rewrap_text(
    text: &str,
    new_cols: u16,
    fill: SgrAttrs,
    mut attrs_at: impl FnMut(usize) -> SgrAttrs,
) -> Vec<Line> {
    if new_cols == 0 {
        return vec![Line::blank(0, fill)];
    }
    let mut rows = Vec::new();
    let mut cells: Vec<Cell> = Vec::with_capacity(new_cols as usize);
    let mut col = 0u16;

    for (i, ch) in text.chars().enumerate() {
        let width = display_width(ch);
        let attrs = attrs_at(i);
        if width == 0 {
            continue;
        }
        if col + width as u16 > new_cols {
            while cells.len() < new_cols as usize {
                cells.push(Cell::with_attrs(' ', 1, fill));
            }
            rows.push(Line::Inflated(std::mem::take(&mut cells)));
            col = 0;
        }
        if width == 2 {
            let (lead, cont) = Cell::wide(ch, attrs);
            cells.push(lead);
            cells.push(cont);
        } else {
            cells.push(Cell::with_attrs(ch, 1, attrs));
        }
        col += width as u16;
    }
    while cells.len() < new_cols as usize {
        cells.push(Cell::with_attrs(' ', 1, fill));
    }
    rows.push(Line::Inflated(cells));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trivial_line_reads_as_blank() {
        let line = Line::blank(5, SgrAttrs::default());
        assert!(line.is_trivial());
        assert_eq!(line.cell(0).content(), ' ');
        assert_eq!(line.to_text(), "     ");
    }

    #[test]
    fn cell_mut_inflates() {
        let mut line = Line::blank(5, SgrAttrs::default());
        line.cell_mut(2).unwrap().set_content('X', 1);
        assert!(!line.is_trivial());
        assert_eq!(line.cell(2).content(), 'X');
    }

    #[test]
    fn set_text_is_trivial() {
        let mut line = Line::blank(5, SgrAttrs::default());
        line.set_text(5, "ab", SgrAttrs::default(), 0);
        assert!(line.is_trivial());
        assert_eq!(line.to_text(), "ab   ");
    }

    #[test]
    fn search_finds_substring() {
        let mut line = Line::blank(10, SgrAttrs::default());
        line.set_text(10, "hello world", SgrAttrs::default(), 0);
        assert_eq!(line.search("world", 0, true), Some(6));
        assert_eq!(line.search("WORLD", 0, false), Some(6));
        assert_eq!(line.search("missing", 0, true), None);
    }

    #[test]
    fn rewrap_splits_on_width() {
        let rows = rewrap_text("abcdef", 3, SgrAttrs::default(), |_| SgrAttrs::default());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].to_text(), "abc");
        assert_eq!(rows[1].to_text(), "def");
    }

    #[test]
    fn rewrap_handles_wide_chars_at_boundary() {
        let rows = rewrap_text("a中b", 2, SgrAttrs::default(), |_| SgrAttrs::default());
        // '中' doesn't fit after 'a' in a 2-wide row -> wraps.
        assert_eq!(rows[0].to_text().trim_end(), "a");
        assert!(rows[1].to_text().starts_with('中'));
    }
}
