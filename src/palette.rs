//! Color palette: the 256-entry indexed table plus dynamic colors (OSC
//! 10..19, 104..119) and the XTPUSHCOLORS/XTPOPCOLORS save stack.

use crate::cell::Color;

/// Maximum depth of the saved-palette stack (`XTPUSHCOLORS`/`XTPOPCOLORS`).
pub const MAX_PALETTE_STACK_DEPTH: usize = 10;

/// RGB triple used for resolved/dynamic colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// The 256-entry indexed color table plus named dynamic colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorPalette {
    indexed: [Rgb; 256],
    pub default_foreground: Rgb,
    pub default_background: Rgb,
    pub cursor_color: Option<Rgb>,
}

impl ColorPalette {
    /// The conventional xterm default 256-color table: 16 named ANSI
    /// colors, a 6x6x6 color cube, and a 24-step grayscale ramp.
    pub fn xterm_default() -> Self {
        let mut indexed = [Rgb::default(); 256];
        const NAMED: [(u8, u8, u8); 16] = [
            (0, 0, 0),
            (205, 0, 0),
            (0, 205, 0),
            (205, 205, 0),
            (0, 0, 238),
            (205, 0, 205),
            (0, 205, 205),
            (229, 229, 229),
            (127, 127, 127),
            (255, 0, 0),
            (0, 255, 0),
            (255, 255, 0),
            (92, 92, 255),
            (255, 0, 255),
            (0, 255, 255),
            (255, 255, 255),
        ];
        for (i, (r, g, b)) in NAMED.iter().enumerate() {
            indexed[i] = Rgb(*r, *g, *b);
        }
        let ramp: [u8; 6] = [0, 95, 135, 175, 215, 255];
        for r in 0..6u16 {
            for g in 0..6u16 {
                for b in 0..6u16 {
                    let idx = 16 + 36 * r + 6 * g + b;
                    indexed[idx as usize] =
                        Rgb(ramp[r as usize], ramp[g as usize], ramp[b as usize]);
                }
            }
        }
        for step in 0..24u16 {
            let v = 8 + step * 10;
            indexed[(232 + step) as usize] = Rgb(v as u8, v as u8, v as u8);
        }
        Self {
            indexed,
            default_foreground: Rgb(229, 229, 229),
            default_background: Rgb(0, 0, 0),
            cursor_color: None,
        }
    }

    pub fn get(&self, index: u8) -> Rgb {
        self.indexed[index as usize]
    }

    pub fn set(&mut self, index: u8, rgb: Rgb) {
        self.indexed[index as usize] = rgb;
    }

    /// Resolve a cell `Color` against this palette, applying the
    /// bold-to-bright promotion rule (indices 0..=7 -> 8..=15) when
    /// `promote_bright` is set.
    pub fn resolve(&self, color: Color, default: Rgb, promote_bright: bool) -> Rgb {
        match color {
            Color::Default => default,
            Color::Named(n) => {
                let idx = if promote_bright && n < 8 { n + 8 } else { n };
                self.get(idx)
            }
            Color::Indexed(n) => self.get(n),
            Color::Rgb(r, g, b) => Rgb(r, g, b),
        }
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::xterm_default()
    }
}

/// Saved-palette stack for `XTPUSHCOLORS`/`XTPOPCOLORS`/`XTREPORTCOLORS`.
///
/// Capacity is fixed at [`MAX_PALETTE_STACK_DEPTH`]; pushes beyond capacity
/// and pops from empty are both no-ops, per spec.
#[derive(Debug, Clone, Default)]
pub struct PaletteStack {
    slots: Vec<ColorPalette>,
}

impl PaletteStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    /// Push `palette` onto the stack. No-op if already at capacity.
    pub fn push(&mut self, palette: ColorPalette) {
        if self.slots.len() < MAX_PALETTE_STACK_DEPTH {
            self.slots.push(palette);
        }
    }

    /// Push a copy of `palette` into a specific 1-based slot, growing the
    /// stack up to that slot if needed (xterm's slot-addressed push form).
    /// A slot beyond capacity is a no-op.
    pub fn push_to_slot(&mut self, slot: usize, palette: ColorPalette) {
        if slot == 0 || slot > MAX_PALETTE_STACK_DEPTH {
            return;
        }
        while self.slots.len() < slot {
            self.slots.push(palette.clone());
        }
        self.slots[slot - 1] = palette;
    }

    /// Pop the top of the stack, returning it. No-op (returns `None`) if
    /// the stack is empty.
    pub fn pop(&mut self) -> Option<ColorPalette> {
        self.slots.pop()
    }

    /// Pop a specific 1-based slot (and everything above it), returning
    /// the popped palette. No-op if the slot doesn't exist.
    pub fn pop_slot(&mut self, slot: usize) -> Option<ColorPalette> {
        if slot == 0 || slot > self.slots.len() {
            return None;
        }
        self.slots.drain(slot - 1..).next()
    }

    pub fn peek(&self) -> Option<&ColorPalette> {
        self.slots.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xterm_default_named_colors() {
        let palette = ColorPalette::xterm_default();
        assert_eq!(palette.get(1), Rgb(205, 0, 0));
        assert_eq!(palette.get(9), Rgb(255, 0, 0));
    }

    #[test]
    fn promote_bright_shifts_named_index() {
        let palette = ColorPalette::xterm_default();
        let dim_red = palette.resolve(Color::Named(1), Rgb::default(), false);
        let bright_red = palette.resolve(Color::Named(1), Rgb::default(), true);
        assert_ne!(dim_red, bright_red);
        assert_eq!(bright_red, palette.get(9));
    }

    #[test]
    fn push_pop_stack_respects_capacity() {
        let mut stack = PaletteStack::new();
        for _ in 0..MAX_PALETTE_STACK_DEPTH + 5 {
            stack.push(ColorPalette::xterm_default());
        }
        assert_eq!(stack.depth(), MAX_PALETTE_STACK_DEPTH);
        for _ in 0..MAX_PALETTE_STACK_DEPTH + 5 {
            stack.pop();
        }
        assert_eq!(stack.depth(), 0);
        assert!(stack.pop().is_none());
    }

    #[test]
    fn slot_addressed_push_reports_depth() {
        let mut stack = PaletteStack::new();
        stack.push_to_slot(1, ColorPalette::xterm_default());
        stack.push_to_slot(2, ColorPalette::xterm_default());
        assert_eq!(stack.depth(), 2);
        stack.push_to_slot(20, ColorPalette::xterm_default());
        assert_eq!(stack.depth(), 2);
    }
}
