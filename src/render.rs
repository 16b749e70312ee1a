//! Projects `Terminal` state (grid, cursor, selection, search, hyperlinks,
//! palette) into flat render primitives a host renderer can draw without
//! touching any VT-domain types. Grounded on `ftui-render`'s `Frame`/`Buffer`
//! split: this crate's `Terminal` is the source of truth, `RenderBuffer` is
//! the read-only snapshot a render task hands to an external presenter.

use crate::cell::{Cell, CellFlags, Color, SgrFlags};
use crate::cursor::CursorShape;
use crate::image::ImageFragmentRef;
use crate::palette::Rgb;
use crate::search::SearchMatch;
use crate::selection::{BufferPos, Selection};
use crate::terminal::Terminal;

/// Resolved fg/bg/decoration for one cell, after palette resolution and
/// every overlay pass has been applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderAttributes {
    pub fg: Rgb,
    pub bg: Rgb,
    pub flags: SgrFlags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderCell {
    pub position: (u16, u16),
    pub attributes: RenderAttributes,
    pub codepoints: String,
    pub width: u8,
    pub image: Option<ImageFragmentRef>,
    pub group_start: bool,
    pub group_end: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderLine {
    pub line_offset: u16,
    pub used_columns: u16,
    /// Fast path: set only when no overlay touches this line, letting the
    /// caller draw the whole row as one run of `text` in `fill_attributes`
    /// with embedded SGR spans in `text_attributes` instead of per-cell.
    pub text: String,
    pub text_attributes: RenderAttributes,
    pub fill_attributes: RenderAttributes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderCursor {
    pub position: (u16, u16),
    pub shape: CursorShape,
    pub cell_width: u8,
}

#[derive(Debug, Clone, Default)]
pub struct RenderBuffer {
    pub frame_id: u64,
    pub cursor: Option<RenderCursor>,
    pub cells: Vec<RenderCell>,
    pub lines: Vec<RenderLine>,
}

/// Style used for the overlay passes that have no VT-level representation
/// (search highlight, selection tint, yank flash) — these are purely a
/// render-time concern, configured by the host rather than by escape
/// sequences.
#[derive(Debug, Clone, Copy)]
pub struct OverlayStyle {
    pub foreground: Rgb,
    pub background: Rgb,
    /// 0 = fully transparent (no visible effect), 255 = fully opaque.
    pub alpha: u8,
}

impl OverlayStyle {
    fn blend_into(&self, base: Rgb) -> Rgb {
        let a = self.alpha as u32;
        let mix = |overlay: u8, under: u8| -> u8 {
            (((overlay as u32 * a) + (under as u32 * (255 - a))) / 255) as u8
        };
        Rgb(
            mix(self.foreground.0, base.0),
            mix(self.foreground.1, base.1),
            mix(self.foreground.2, base.2),
        )
    }

    fn blend_bg(&self, base: Rgb) -> Rgb {
        let a = self.alpha as u32;
        let mix = |overlay: u8, under: u8| -> u8 {
            (((overlay as u32 * a) + (under as u32 * (255 - a))) / 255) as u8
        };
        Rgb(
            mix(self.background.0, base.0),
            mix(self.background.1, base.1),
            mix(self.background.2, base.2),
        )
    }
}

pub struct RenderConfig {
    pub search_focused: OverlayStyle,
    pub search_unfocused: OverlayStyle,
    pub selection: OverlayStyle,
    pub highlight: OverlayStyle,
    pub cursor: OverlayStyle,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            search_focused: OverlayStyle { foreground: Rgb(0, 0, 0), background: Rgb(255, 215, 0), alpha: 255 },
            search_unfocused: OverlayStyle { foreground: Rgb(0, 0, 0), background: Rgb(180, 180, 0), alpha: 180 },
            selection: OverlayStyle { foreground: Rgb(255, 255, 255), background: Rgb(60, 90, 160), alpha: 160 },
            highlight: OverlayStyle { foreground: Rgb(0, 0, 0), background: Rgb(255, 165, 0), alpha: 140 },
            cursor: OverlayStyle { foreground: Rgb(0, 0, 0), background: Rgb(229, 229, 229), alpha: 255 },
        }
    }
}

/// Builds a [`RenderBuffer`] for a contiguous range of viewport rows.
pub struct RenderBufferBuilder<'a> {
    terminal: &'a Terminal,
    config: &'a RenderConfig,
    search_matches: &'a [SearchMatch],
    focused_match: Option<usize>,
    highlighted: &'a [BufferPos],
}

impl<'a> RenderBufferBuilder<'a> {
    pub fn new(terminal: &'a Terminal, config: &'a RenderConfig) -> Self {
        Self {
            terminal,
            config,
            search_matches: &[],
            focused_match: None,
            highlighted: &[],
        }
    }

    pub fn with_search(mut self, matches: &'a [SearchMatch], focused: Option<usize>) -> Self {
        self.search_matches = matches;
        self.focused_match = focused;
        self
    }

    pub fn with_highlight(mut self, positions: &'a [BufferPos]) -> Self {
        self.highlighted = positions;
        self
    }

    pub fn build(&self, frame_id: u64, row_start: u16, row_end: u16) -> RenderBuffer {
        let screen = self.terminal.screen();
        let grid = &screen.grid;
        let scrollback_len = screen.scrollback.len() as u32;
        let selection = self.terminal.selection.selection(grid, &screen.scrollback);

        let mut cells = Vec::new();
        let mut lines = Vec::new();

        for row in row_start..row_end.min(grid.rows()) {
            let Some(row_cells) = grid.row_cells(row) else { continue };
            let mut used_columns = 0u16;
            let mut group_open = false;
            let run_start = cells.len();

            for (col_idx, cell) in row_cells.iter().enumerate() {
                if cell.is_wide_continuation() {
                    continue;
                }
                let col = col_idx as u16;
                let buffer_pos = BufferPos::new(scrollback_len + row as u32, col);
                let attrs = self.resolve_cell(cell, buffer_pos, selection);
                let non_empty = cell.content() != ' ' || cell.attrs.bg != Color::Default;

                if non_empty {
                    used_columns = col + cell.width().max(1);
                }

                let same_attrs = cells
                    .last()
                    .map(|prev: &RenderCell| prev.attributes == attrs)
                    .unwrap_or(false);

                if !same_attrs && group_open {
                    if let Some(last) = cells.last_mut() {
                        last.group_end = true;
                    }
                    group_open = false;
                }

                cells.push(RenderCell {
                    position: (col, row),
                    attributes: attrs,
                    codepoints: cell.content().to_string(),
                    width: cell.width(),
                    image: None,
                    group_start: !group_open && non_empty,
                    group_end: false,
                });
                if non_empty {
                    group_open = true;
                } else if group_open {
                    if let Some(last) = cells.last_mut() {
                        last.group_end = true;
                    }
                    group_open = false;
                }
            }
            if group_open {
                if let Some(last) = cells.last_mut() {
                    last.group_end = true;
                }
            }

            let base_attrs = cells.get(run_start).map(|c| c.attributes).unwrap_or(RenderAttributes {
                fg: self.terminal.palette.default_foreground,
                bg: self.terminal.palette.default_background,
                flags: SgrFlags::empty(),
            });
            let text: String = row_cells
                .iter()
                .filter(|c| !c.is_wide_continuation())
                .map(|c| c.content())
                .collect();
            lines.push(RenderLine {
                line_offset: row,
                used_columns,
                text,
                text_attributes: base_attrs,
                fill_attributes: base_attrs,
            });
        }

        let cursor = self.build_cursor(row_start, row_end);

        RenderBuffer { frame_id, cursor, cells, lines }
    }

    fn build_cursor(&self, row_start: u16, row_end: u16) -> Option<RenderCursor> {
        let screen = self.terminal.screen();
        if !self.terminal.cursor_currently_visible() {
            return None;
        }
        let row = screen.cursor.row;
        if row < row_start || row >= row_end {
            return None;
        }
        let width = screen
            .grid
            .cell(row, screen.cursor.col)
            .map(|c| c.width().max(1))
            .unwrap_or(1);
        Some(RenderCursor {
            position: (screen.cursor.col, row),
            shape: screen.cursor_shape,
            cell_width: width,
        })
    }

    fn resolve_cell(&self, cell: &Cell, pos: BufferPos, selection: Option<Selection>) -> RenderAttributes {
        let reverse = self.terminal.modes.reverse_video() ^ cell.attrs.flags.contains(SgrFlags::INVERSE);
        let promote_fg = cell.attrs.flags.contains(SgrFlags::BOLD);
        let promote_bg = false;

        let (fg_color, bg_color) = if reverse {
            (cell.attrs.bg, cell.attrs.fg)
        } else {
            (cell.attrs.fg, cell.attrs.bg)
        };

        let mut fg = self
            .terminal
            .palette
            .resolve(fg_color, self.terminal.palette.default_foreground, promote_fg);
        let mut bg = self
            .terminal
            .palette
            .resolve(bg_color, self.terminal.palette.default_background, promote_bg);

        if cell.attrs.flags.contains(SgrFlags::DIM) {
            fg = Rgb(fg.0 / 2, fg.1 / 2, fg.2 / 2);
        }

        if self.in_focused_search_match(pos) {
            fg = self.config.search_focused.blend_into(fg);
            bg = self.config.search_focused.blend_bg(bg);
        } else if self.in_any_search_match(pos) {
            fg = self.config.search_unfocused.blend_into(fg);
            bg = self.config.search_unfocused.blend_bg(bg);
        }

        if self.in_selection(pos, selection) {
            fg = self.config.selection.blend_into(fg);
            bg = self.config.selection.blend_bg(bg);
        }

        if self.highlighted.contains(&pos) {
            fg = self.config.highlight.blend_into(fg);
            bg = self.config.highlight.blend_bg(bg);
        }

        RenderAttributes { fg, bg, flags: cell.attrs.flags }
    }

    fn in_selection(&self, pos: BufferPos, selection: Option<Selection>) -> bool {
        let Some(sel) = selection else { return false };
        let sel = sel.normalized();
        (sel.start.line, sel.start.col) <= (pos.line, pos.col)
            && (pos.line, pos.col) <= (sel.end.line, sel.end.col)
    }

    fn in_any_search_match(&self, pos: BufferPos) -> bool {
        self.search_matches.iter().any(|m| self.pos_in_match(pos, m))
    }

    fn in_focused_search_match(&self, pos: BufferPos) -> bool {
        let Some(idx) = self.focused_match else { return false };
        self.search_matches.get(idx).is_some_and(|m| self.pos_in_match(pos, m))
    }

    fn pos_in_match(&self, pos: BufferPos, m: &SearchMatch) -> bool {
        (m.start.line, m.start.col) <= (pos.line, pos.col) && (pos.line, pos.col) <= (m.end.line, m.end.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::Terminal;

    #[test]
    fn plain_text_resolves_default_colors() {
        let mut term = Terminal::new(5, 2, 10);
        term.feed(b"hi");
        let config = RenderConfig::default();
        let builder = RenderBufferBuilder::new(&term, &config);
        let buf = builder.build(1, 0, 2);
        let first = &buf.cells[0];
        assert_eq!(first.codepoints, "h");
        assert_eq!(first.attributes.bg, term.palette.default_background);
    }

    #[test]
    fn cursor_outside_requested_row_range_is_omitted() {
        let mut term = Terminal::new(5, 5, 10);
        term.screen_mut().cursor.row = 4;
        let config = RenderConfig::default();
        let builder = RenderBufferBuilder::new(&term, &config);
        let buf = builder.build(1, 0, 2);
        assert!(buf.cursor.is_none());
    }

    #[test]
    fn hidden_cursor_is_omitted() {
        let mut term = Terminal::new(5, 5, 10);
        term.feed(b"\x1b[?25l");
        let config = RenderConfig::default();
        let builder = RenderBufferBuilder::new(&term, &config);
        let buf = builder.build(1, 0, 5);
        assert!(buf.cursor.is_none());
    }

    #[test]
    fn bold_promotes_named_foreground_to_bright() {
        let mut term = Terminal::new(5, 2, 10);
        term.feed(b"\x1b[1;31mx");
        let config = RenderConfig::default();
        let builder = RenderBufferBuilder::new(&term, &config);
        let buf = builder.build(1, 0, 1);
        let bright_red = term.palette.get(9);
        assert_eq!(buf.cells[0].attributes.fg, bright_red);
    }

    #[test]
    fn reverse_video_swaps_fg_and_bg() {
        let mut term = Terminal::new(5, 2, 10);
        term.feed(b"\x1b[7mx");
        let config = RenderConfig::default();
        let builder = RenderBufferBuilder::new(&term, &config);
        let buf = builder.build(1, 0, 1);
        assert_eq!(buf.cells[0].attributes.fg, term.palette.default_background);
        assert_eq!(buf.cells[0].attributes.bg, term.palette.default_foreground);
    }

    #[test]
    fn search_match_overlay_tints_background() {
        let mut term = Terminal::new(5, 2, 10);
        term.feed(b"hi");
        let config = RenderConfig::default();
        let matches = [SearchMatch { start: BufferPos::new(0, 0), end: BufferPos::new(0, 1) }];
        let builder = RenderBufferBuilder::new(&term, &config).with_search(&matches, Some(0));
        let buf = builder.build(1, 0, 1);
        assert_ne!(buf.cells[0].attributes.bg, term.palette.default_background);
    }
}
