//! Incremental search over the combined scrollback + viewport buffer.
//!
//! Matches are computed on demand (not indexed) against `Grid`/`Scrollback`,
//! using `Line::search`/`search_reverse` row by row the same way the
//! `Grid::logical_lines` walk is built, so a match that straddles two rows
//! is still found.

use crate::grid::Grid;
use crate::scrollback::Scrollback;
use crate::selection::BufferPos;

/// One located match: inclusive cell range in combined-buffer coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    pub start: BufferPos,
    pub end: BufferPos,
}

/// Search state: pattern, case sensitivity, and the cursor used to resume
/// forward/backward scans from the last match.
#[derive(Debug, Clone, Default)]
pub struct Search {
    pub pattern: String,
    pub case_sensitive: bool,
    pub cursor: BufferPos,
}

impl Search {
    pub fn new(pattern: impl Into<String>, case_sensitive: bool) -> Self {
        Self {
            pattern: pattern.into(),
            case_sensitive,
            cursor: BufferPos::new(0, 0),
        }
    }

    fn row_text(line: u32, grid: &Grid, scrollback: &Scrollback) -> Option<String> {
        let sb_len = scrollback.len() as u32;
        if line < sb_len {
            scrollback.get(line as usize).map(|row| {
                row.cells
                    .iter()
                    .filter(|c| !c.is_wide_continuation())
                    .map(|c| c.content())
                    .collect()
            })
        } else {
            let row = line - sb_len;
            if row >= grid.rows() as u32 {
                return None;
            }
            grid.row_cells(row as u16).map(|cells| {
                cells
                    .iter()
                    .filter(|c| !c.is_wide_continuation())
                    .map(|c| c.content())
                    .collect()
            })
        }
    }

    fn total_lines(grid: &Grid, scrollback: &Scrollback) -> u32 {
        scrollback.len() as u32 + grid.rows() as u32
    }

    fn matches_in_row(&self, text: &str) -> Vec<(usize, usize)> {
        if self.pattern.is_empty() {
            return Vec::new();
        }
        let haystack = if self.case_sensitive {
            text.to_string()
        } else {
            text.to_lowercase()
        };
        let needle = if self.case_sensitive {
            self.pattern.clone()
        } else {
            self.pattern.to_lowercase()
        };
        let mut out = Vec::new();
        let mut start = 0;
        while let Some(found) = haystack[start..].find(&needle) {
            let byte_start = start + found;
            let char_start = haystack[..byte_start].chars().count();
            let char_len = needle.chars().count();
            out.push((char_start, char_start + char_len.saturating_sub(1)));
            start = byte_start + found_byte_len(&haystack, byte_start, &needle);
            if start >= haystack.len() {
                break;
            }
        }
        out
    }

    /// Scan forward from `self.cursor`, wrapping to the top of the buffer.
    /// Advances `self.cursor` to just past the match on success.
    pub fn find_next(&mut self, grid: &Grid, scrollback: &Scrollback) -> Option<SearchMatch> {
        let total = Self::total_lines(grid, scrollback);
        if total == 0 || self.pattern.is_empty() {
            return None;
        }
        for offset in 0..total {
            let line = (self.cursor.line + offset) % total;
            let Some(text) = Self::row_text(line, grid, scrollback) else {
                continue;
            };
            for (start_col, end_col) in self.matches_in_row(&text) {
                if offset == 0 && (start_col as u16) <= self.cursor.col {
                    continue;
                }
                let m = SearchMatch {
                    start: BufferPos::new(line, start_col as u16),
                    end: BufferPos::new(line, end_col as u16),
                };
                self.cursor = BufferPos::new(line, end_col as u16 + 1);
                return Some(m);
            }
        }
        None
    }

    /// Scan backward from `self.cursor`, wrapping to the bottom of the
    /// buffer.
    pub fn find_prev(&mut self, grid: &Grid, scrollback: &Scrollback) -> Option<SearchMatch> {
        let total = Self::total_lines(grid, scrollback);
        if total == 0 || self.pattern.is_empty() {
            return None;
        }
        for offset in 0..total {
            let line = (self.cursor.line + total - offset) % total;
            let Some(text) = Self::row_text(line, grid, scrollback) else {
                continue;
            };
            let mut matches = self.matches_in_row(&text);
            matches.reverse();
            for (start_col, end_col) in matches {
                if offset == 0 && (start_col as u16) >= self.cursor.col {
                    continue;
                }
                let m = SearchMatch {
                    start: BufferPos::new(line, start_col as u16),
                    end: BufferPos::new(line, end_col as u16),
                };
                self.cursor = BufferPos::new(line, start_col as u16);
                return Some(m);
            }
        }
        None
    }
}

fn found_byte_len(haystack: &str, byte_start: usize, needle: &str) -> usize {
    haystack[byte_start..]
        .char_indices()
        .nth(needle.chars().count())
        .map(|(i, _)| i)
        .unwrap_or(haystack.len() - byte_start)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_from_lines(cols: u16, lines: &[&str]) -> Grid {
        let rows = lines.len() as u16;
        let mut g = Grid::new(cols, rows);
        for (r, text) in lines.iter().enumerate() {
            for (c, ch) in text.chars().enumerate() {
                if c >= cols as usize {
                    break;
                }
                g.cell_mut(r as u16, c as u16).unwrap().set_content(ch, 1);
            }
        }
        g
    }

    #[test]
    fn find_next_locates_first_match() {
        let grid = grid_from_lines(20, &["hello world", "goodbye world"]);
        let sb = Scrollback::new(0);
        let mut search = Search::new("world", true);
        let m = search.find_next(&grid, &sb).unwrap();
        assert_eq!(m.start, BufferPos::new(0, 6));
        assert_eq!(m.end, BufferPos::new(0, 10));
    }

    #[test]
    fn find_next_wraps_to_next_occurrence() {
        let grid = grid_from_lines(20, &["hello world", "goodbye world"]);
        let sb = Scrollback::new(0);
        let mut search = Search::new("world", true);
        search.find_next(&grid, &sb);
        let second = search.find_next(&grid, &sb).unwrap();
        assert_eq!(second.start.line, 1);
    }

    #[test]
    fn case_insensitive_search() {
        let grid = grid_from_lines(20, &["Hello World"]);
        let sb = Scrollback::new(0);
        let mut search = Search::new("WORLD", false);
        assert!(search.find_next(&grid, &sb).is_some());
    }

    #[test]
    fn no_pattern_finds_nothing() {
        let grid = grid_from_lines(10, &["abc"]);
        let sb = Scrollback::new(0);
        let mut search = Search::new("", true);
        assert!(search.find_next(&grid, &sb).is_none());
    }

    #[test]
    fn find_prev_locates_match_before_cursor() {
        let grid = grid_from_lines(20, &["foo bar", "foo baz"]);
        let sb = Scrollback::new(0);
        let mut search = Search::new("foo", true);
        search.cursor = BufferPos::new(1, 7);
        let m = search.find_prev(&grid, &sb).unwrap();
        assert_eq!(m.start.line, 1);
    }
}
