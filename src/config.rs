//! Host-supplied configuration surface.
//!
//! This crate does no file/env loading (out of scope, same as PTY/clipboard
//! plumbing) — `TerminalConfig` just reifies the shape a host must fill in
//! before constructing a `Terminal`.

use crate::cursor::CursorShape;
use crate::modes::MouseWheelMode;
use crate::palette::ColorPalette;

/// Pixel dimensions, used for `max_image_size` and similar limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

/// Page size in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSize {
    pub lines: u16,
    pub columns: u16,
}

impl Default for PageSize {
    fn default() -> Self {
        Self {
            lines: 24,
            columns: 80,
        }
    }
}

/// Configuration consumed when constructing a `Terminal`.
#[derive(Debug, Clone)]
pub struct TerminalConfig {
    pub page_size: PageSize,
    pub max_history_lines: usize,
    pub reflow_on_resize: bool,
    pub max_image_size: PixelSize,
    pub max_image_color_registers: usize,
    pub sixel_cursor_conformance: bool,
    pub default_palette: ColorPalette,
    pub cursor_blinking_interval_ms: u32,
    pub cursor_shape: CursorShape,
    pub mouse_wheel_mode: MouseWheelMode,
    pub passive_mouse_tracking: bool,
    pub bracketed_paste_enabled_by_default: bool,
    pub focus_events_enabled_by_default: bool,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            page_size: PageSize::default(),
            max_history_lines: 10_000,
            reflow_on_resize: true,
            max_image_size: PixelSize {
                width: 4096,
                height: 4096,
            },
            max_image_color_registers: 1024,
            sixel_cursor_conformance: false,
            default_palette: ColorPalette::xterm_default(),
            cursor_blinking_interval_ms: 530,
            cursor_shape: CursorShape::Block,
            mouse_wheel_mode: MouseWheelMode::Mouse,
            passive_mouse_tracking: false,
            bracketed_paste_enabled_by_default: false,
            focus_events_enabled_by_default: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_common_terminal_defaults() {
        let cfg = TerminalConfig::default();
        assert_eq!(cfg.page_size, PageSize { lines: 24, columns: 80 });
        assert!(cfg.reflow_on_resize);
        assert!(!cfg.bracketed_paste_enabled_by_default);
    }
}
