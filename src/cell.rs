//! Terminal cell: the fundamental unit of the grid.
//!
//! Each cell stores a character (or grapheme cluster) and its SGR attributes.
//! This is intentionally simpler than `ftui-render::Cell` — it models the
//! terminal's internal state rather than the rendering pipeline.

use bitflags::bitflags;
use std::collections::HashMap;

bitflags! {
    /// SGR text attribute flags.
    ///
    /// Maps directly to the ECMA-48 / VT100 SGR parameter values, extended
    /// with the xterm decoration variants (curly/dotted/dashed underline,
    /// overline) and the DECSCA protection bit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SgrFlags: u32 {
        const BOLD             = 1 << 0;
        const DIM              = 1 << 1;
        const ITALIC           = 1 << 2;
        const UNDERLINE        = 1 << 3;
        const BLINK            = 1 << 4;
        const INVERSE          = 1 << 5;
        const HIDDEN           = 1 << 6;
        const STRIKETHROUGH    = 1 << 7;
        const DOUBLE_UNDERLINE = 1 << 8;
        const CURLY_UNDERLINE  = 1 << 9;
        const OVERLINE         = 1 << 10;
        const RAPID_BLINK      = 1 << 11;
        const DOTTED_UNDERLINE = 1 << 12;
        const DASHED_UNDERLINE = 1 << 13;
        const FRAMED           = 1 << 14;
        const ENCIRCLED        = 1 << 15;
        /// DECSCA: cell is protected from ED/EL/DECERA when a selective
        /// erase variant is requested.
        const PROTECTED        = 1 << 16;
    }
}

bitflags! {
    /// Cell-level flags that are orthogonal to SGR attributes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CellFlags: u8 {
        /// This cell is the leading (left) cell of a wide (2-column) character.
        const WIDE_CHAR = 1 << 0;
        /// This cell is the trailing (right) continuation of a wide character.
        /// Its content is meaningless; rendering uses the leading cell.
        const WIDE_CONTINUATION = 1 << 1;
    }
}

/// Color representation for terminal cells.
///
/// Supports the standard terminal color model hierarchy:
/// default → 16 named → 256 indexed → 24-bit RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// Terminal default (SGR 39 / SGR 49).
    #[default]
    Default,
    /// Named color index (0-15): standard 8 + bright 8.
    Named(u8),
    /// 256-color palette index (0-255).
    Indexed(u8),
    /// 24-bit true color.
    Rgb(u8, u8, u8),
}

/// SGR attributes for a cell: flags + foreground/background colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SgrAttrs {
    pub flags: SgrFlags,
    pub fg: Color,
    pub bg: Color,
    /// Underline color (SGR 58). `None` means use foreground.
    pub underline_color: Option<Color>,
}

impl SgrAttrs {
    /// Reset all attributes to default (SGR 0).
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Apply a stream of SGR parameters (the `Ps` list of a CSI `m` sequence).
    ///
    /// `params` is a list of parameter groups; within a group the first
    /// element is the SGR code and any following elements are ECMA-48
    /// sub-parameters (the `:`-separated form used by true-color SGR, e.g.
    /// `38:2::171:178:191`). The semicolon-separated legacy form
    /// (`38;2;171;178;191`, spread across several single-element groups) is
    /// also accepted.
    pub fn apply_sgr_params(&mut self, params: &[Vec<u16>]) {
        if params.is_empty() {
            self.reset();
            return;
        }
        let mut i = 0;
        while i < params.len() {
            let group = &params[i];
            let code = group.first().copied().unwrap_or(0);
            match code {
                0 => self.reset(),
                1 => self.flags.insert(SgrFlags::BOLD),
                2 => self.flags.insert(SgrFlags::DIM),
                3 => self.flags.insert(SgrFlags::ITALIC),
                4 => {
                    self.flags.remove(
                        SgrFlags::UNDERLINE
                            | SgrFlags::DOUBLE_UNDERLINE
                            | SgrFlags::CURLY_UNDERLINE
                            | SgrFlags::DOTTED_UNDERLINE
                            | SgrFlags::DASHED_UNDERLINE,
                    );
                    match group.get(1).copied() {
                        Some(2) => self.flags.insert(SgrFlags::DOUBLE_UNDERLINE),
                        Some(3) => self.flags.insert(SgrFlags::CURLY_UNDERLINE),
                        Some(4) => self.flags.insert(SgrFlags::DOTTED_UNDERLINE),
                        Some(5) => self.flags.insert(SgrFlags::DASHED_UNDERLINE),
                        Some(0) => {}
                        _ => self.flags.insert(SgrFlags::UNDERLINE),
                    }
                }
                5 => self.flags.insert(SgrFlags::BLINK),
                6 => self.flags.insert(SgrFlags::RAPID_BLINK),
                7 => self.flags.insert(SgrFlags::INVERSE),
                8 => self.flags.insert(SgrFlags::HIDDEN),
                9 => self.flags.insert(SgrFlags::STRIKETHROUGH),
                21 => self.flags.insert(SgrFlags::DOUBLE_UNDERLINE),
                22 => self.flags.remove(SgrFlags::BOLD | SgrFlags::DIM),
                23 => self.flags.remove(SgrFlags::ITALIC),
                24 => self.flags.remove(
                    SgrFlags::UNDERLINE
                        | SgrFlags::DOUBLE_UNDERLINE
                        | SgrFlags::CURLY_UNDERLINE
                        | SgrFlags::DOTTED_UNDERLINE
                        | SgrFlags::DASHED_UNDERLINE,
                ),
                25 => self.flags.remove(SgrFlags::BLINK | SgrFlags::RAPID_BLINK),
                27 => self.flags.remove(SgrFlags::INVERSE),
                28 => self.flags.remove(SgrFlags::HIDDEN),
                29 => self.flags.remove(SgrFlags::STRIKETHROUGH),
                30..=37 => self.fg = Color::Named(code as u8 - 30),
                38 => {
                    let (color, consumed) = parse_extended_color(&params[i..]);
                    if let Some(c) = color {
                        self.fg = c;
                    }
                    i += consumed - 1;
                }
                39 => self.fg = Color::Default,
                40..=47 => self.bg = Color::Named(code as u8 - 40),
                48 => {
                    let (color, consumed) = parse_extended_color(&params[i..]);
                    if let Some(c) = color {
                        self.bg = c;
                    }
                    i += consumed - 1;
                }
                49 => self.bg = Color::Default,
                51 => self.flags.insert(SgrFlags::FRAMED),
                52 => self.flags.insert(SgrFlags::ENCIRCLED),
                53 => self.flags.insert(SgrFlags::OVERLINE),
                54 => self.flags.remove(SgrFlags::FRAMED | SgrFlags::ENCIRCLED),
                55 => self.flags.remove(SgrFlags::OVERLINE),
                58 => {
                    let (color, consumed) = parse_extended_color(&params[i..]);
                    self.underline_color = color;
                    i += consumed - 1;
                }
                59 => self.underline_color = None,
                90..=97 => self.fg = Color::Named(code as u8 - 90 + 8),
                100..=107 => self.bg = Color::Named(code as u8 - 100 + 8),
                _ => {}
            }
            i += 1;
        }
    }
}

/// Parse the extended-color form of an SGR code (`38`, `48`, or `58`).
///
/// Accepts both the colon sub-parameter form (`38:5:n`, `38:2::r:g:b`, all
/// packed into one parameter group) and the legacy semicolon form (`38;5;n`,
/// `38;2;r;g;b`, spread across consecutive single-element groups). Returns
/// the resolved color (if any) and the number of top-level parameter groups
/// consumed, including the leading `38`/`48`/`58` group itself.
fn parse_extended_color(rest: &[Vec<u16>]) -> (Option<Color>, usize) {
    let head = &rest[0];
    if head.len() >= 2 {
        match head[1] {
            5 if head.len() >= 3 => return (Some(Color::Indexed(head[2] as u8)), 1),
            2 if head.len() >= 4 => {
                let tail = &head[2..];
                let (r, g, b) = if tail.len() >= 4 {
                    (tail[1], tail[2], tail[3])
                } else {
                    (tail[0], tail[1], tail[2])
                };
                return (Some(Color::Rgb(r as u8, g as u8, b as u8)), 1);
            }
            _ => {}
        }
    }
    if rest.len() >= 2 {
        let mode = rest[1].first().copied().unwrap_or(0);
        match mode {
            5 if rest.len() >= 3 => {
                let n = rest[2].first().copied().unwrap_or(0) as u8;
                return (Some(Color::Indexed(n)), 3);
            }
            2 if rest.len() >= 5 => {
                let r = rest[2].first().copied().unwrap_or(0) as u8;
                let g = rest[3].first().copied().unwrap_or(0) as u8;
                let b = rest[4].first().copied().unwrap_or(0) as u8;
                return (Some(Color::Rgb(r, g, b)), 5);
            }
            _ => {}
        }
    }
    (None, 1)
}

/// Compute the terminal column width of a character (0, 1, or 2).
///
/// Combining marks and most control characters report 0; East-Asian wide
/// and fullwidth characters report 2.
pub fn display_width(ch: char) -> u8 {
    use unicode_width::UnicodeWidthChar;
    ch.width().unwrap_or(0).min(2) as u8
}

/// Hyperlink identifier for OSC 8 links.
///
/// Zero means "no link". Non-zero values index into an external link registry
/// that maps IDs to URIs.
pub type HyperlinkId = u16;

/// Registry for OSC 8 hyperlink URIs.
///
/// Cells store compact `HyperlinkId`s instead of full URI strings. This
/// registry provides ID allocation, deduplication, and reference-counted
/// release so hosts can clear unused hyperlinks when content is dropped
/// (e.g., scrollback eviction).
#[derive(Debug, Clone)]
pub struct HyperlinkRegistry {
    /// Slots indexed by ID (0 reserved for "no link").
    slots: Vec<Option<HyperlinkSlot>>,
    /// URI -> ID lookup for deduplication.
    lookup: HashMap<String, HyperlinkId>,
    /// Reusable IDs from released hyperlinks.
    free_list: Vec<HyperlinkId>,
}

#[derive(Debug, Clone)]
struct HyperlinkSlot {
    uri: String,
    ref_count: u32,
}

impl HyperlinkRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            slots: vec![None],
            lookup: HashMap::new(),
            free_list: Vec::new(),
        }
    }

    /// Intern a URI and return its hyperlink ID without changing refcounts.
    ///
    /// Empty URIs return 0 (interpreted as "no link").
    pub fn intern(&mut self, uri: &str) -> HyperlinkId {
        if uri.is_empty() {
            return 0;
        }
        if let Some(&id) = self.lookup.get(uri) {
            return id;
        }

        let id = if let Some(id) = self.free_list.pop() {
            id
        } else {
            let next = self.slots.len();
            if next > HyperlinkId::MAX as usize {
                return 0;
            }
            let id = next as HyperlinkId;
            self.slots.push(None);
            id
        };

        if id == 0 {
            return 0;
        }
        let idx = id as usize;
        if idx >= self.slots.len() {
            return 0;
        }

        self.slots[idx] = Some(HyperlinkSlot {
            uri: uri.to_string(),
            ref_count: 0,
        });
        self.lookup.insert(uri.to_string(), id);
        id
    }

    /// Convenience: intern a URI and increment its refcount once.
    pub fn acquire(&mut self, uri: &str) -> HyperlinkId {
        let id = self.intern(uri);
        self.acquire_id(id);
        id
    }

    /// Increment the refcount for an existing hyperlink ID.
    ///
    /// Invalid IDs and 0 are ignored.
    pub fn acquire_id(&mut self, id: HyperlinkId) {
        if id == 0 {
            return;
        }
        let Some(slot) = self.slots.get_mut(id as usize) else {
            return;
        };
        let Some(slot) = slot.as_mut() else {
            return;
        };
        slot.ref_count = slot.ref_count.saturating_add(1);
    }

    /// Decrement the refcount for an ID and release it when it reaches zero.
    ///
    /// Invalid IDs and 0 are ignored. Releasing an ID with refcount 0 is a no-op.
    pub fn release_id(&mut self, id: HyperlinkId) {
        if id == 0 {
            return;
        }
        let Some(entry) = self.slots.get_mut(id as usize) else {
            return;
        };

        let should_remove = match entry.as_mut() {
            Some(slot) if slot.ref_count > 0 => {
                slot.ref_count -= 1;
                slot.ref_count == 0
            }
            _ => false,
        };

        if should_remove && let Some(removed) = entry.take() {
            self.lookup.remove(&removed.uri);
            self.free_list.push(id);
        }
    }

    /// Release hyperlink references for all cells in the slice.
    ///
    /// Intended for use when dropping content (e.g., evicted scrollback lines).
    pub fn release_cells(&mut self, cells: &[Cell]) {
        for cell in cells {
            self.release_id(cell.hyperlink);
        }
    }

    /// Look up the URI for a hyperlink ID.
    pub fn get(&self, id: HyperlinkId) -> Option<&str> {
        self.slots
            .get(id as usize)
            .and_then(|slot| slot.as_ref())
            .map(|slot| slot.uri.as_str())
    }

    /// Clear all hyperlinks, resetting the registry to empty.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.slots.push(None);
        self.lookup.clear();
        self.free_list.clear();
    }

    /// Number of currently registered hyperlinks.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Whether the registry has no hyperlinks.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the registry contains the given ID.
    pub fn contains(&self, id: HyperlinkId) -> bool {
        self.get(id).is_some()
    }
}

impl Default for HyperlinkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A single cell in the terminal grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// The character content. A space for empty/erased cells.
    content: char,
    /// Display width of the content in terminal columns (1 or 2 for wide chars).
    width: u8,
    /// Cell-level flags (wide char, continuation, etc.).
    pub flags: CellFlags,
    /// SGR text attributes.
    pub attrs: SgrAttrs,
    /// Hyperlink ID (0 = no link).
    pub hyperlink: HyperlinkId,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            content: ' ',
            width: 1,
            flags: CellFlags::empty(),
            attrs: SgrAttrs::default(),
            hyperlink: 0,
        }
    }
}

impl Cell {
    /// Create a new cell with the given character and default attributes.
    pub fn new(ch: char) -> Self {
        Self {
            content: ch,
            width: 1,
            flags: CellFlags::empty(),
            attrs: SgrAttrs::default(),
            hyperlink: 0,
        }
    }

    /// Create a new cell with the given character, width, and attributes.
    pub fn with_attrs(ch: char, width: u8, attrs: SgrAttrs) -> Self {
        Self {
            content: ch,
            width,
            flags: CellFlags::empty(),
            attrs,
            hyperlink: 0,
        }
    }

    /// Create a wide (2-column) character cell.
    ///
    /// Returns `(leading, continuation)` pair. The leading cell holds the
    /// character; the continuation cell is a placeholder.
    pub fn wide(ch: char, attrs: SgrAttrs) -> (Self, Self) {
        let leading = Self {
            content: ch,
            width: 2,
            flags: CellFlags::WIDE_CHAR,
            attrs,
            hyperlink: 0,
        };
        let continuation = Self {
            content: ' ',
            width: 0,
            flags: CellFlags::WIDE_CONTINUATION,
            attrs,
            hyperlink: 0,
        };
        (leading, continuation)
    }

    /// The character content of this cell.
    pub fn content(&self) -> char {
        self.content
    }

    /// The display width in terminal columns.
    pub fn width(&self) -> u8 {
        self.width
    }

    /// Whether this cell is the leading half of a wide character.
    pub fn is_wide(&self) -> bool {
        self.flags.contains(CellFlags::WIDE_CHAR)
    }

    /// Whether this cell is a continuation (trailing half) of a wide character.
    pub fn is_wide_continuation(&self) -> bool {
        self.flags.contains(CellFlags::WIDE_CONTINUATION)
    }

    /// DECSCA: whether this cell was written while character protection
    /// was armed. ED/EL/ECH/DECERA skip protected cells rather than erase
    /// them.
    pub fn is_protected(&self) -> bool {
        self.attrs.flags.contains(SgrFlags::PROTECTED)
    }

    /// Set the character content and display width.
    pub fn set_content(&mut self, ch: char, width: u8) {
        self.content = ch;
        self.width = width;
        // Clear wide flags when replacing content.
        self.flags
            .remove(CellFlags::WIDE_CHAR | CellFlags::WIDE_CONTINUATION);
    }

    /// Reset this cell to a blank space with the given background attributes.
    ///
    /// Used by erase operations (ED, EL, ECH, DECERA) which fill with the
    /// current background color but reset all other attributes. A cell
    /// marked protected by DECSCA is left untouched.
    pub fn erase(&mut self, bg: Color) {
        if self.is_protected() {
            return;
        }
        self.content = ' ';
        self.width = 1;
        self.flags = CellFlags::empty();
        self.attrs = SgrAttrs {
            bg,
            ..SgrAttrs::default()
        };
        self.hyperlink = 0;
    }

    /// Reset this cell to a blank space with default attributes.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Compute the terminal column width of a character. See [`display_width`].
    pub fn display_width(ch: char) -> u8 {
        display_width(ch)
    }
}
