#![forbid(unsafe_code)]

//! Host-agnostic VT/ANSI terminal engine.
//!
//! `vterm-core` is the platform-independent terminal model at the heart of
//! FrankenTerm. It owns grid state, VT/ANSI parsing, cursor positioning, and
//! scrollback -- all without any host I/O dependencies.
//!
//! # Primary responsibilities
//!
//! - **Grid**: 2D cell matrix representing the visible terminal viewport.
//! - **Cell**: character content + SGR attributes (colors, bold, italic, etc.).
//! - **Parser**: VT/ANSI state machine (Paul Flo Williams model, 12 states).
//! - **Cursor**: position, visibility, and origin/autowrap mode tracking.
//! - **Modes**: DEC private modes and ANSI standard modes.
//! - **Scrollback**: ring buffer for lines scrolled off the top of the viewport.
//!
//! # Design principles
//!
//! - **No I/O**: all types are pure data + logic; the host adapter supplies bytes.
//! - **Deterministic**: identical byte sequences always produce identical state.
//! - **`#![forbid(unsafe_code)]`**: safety enforced at compile time.

pub mod cell;
pub mod charset;
pub mod config;
pub mod cursor;
pub mod diag;
pub mod error;
pub mod function_table;
pub mod grid;
pub mod image;
pub mod input;
pub mod line;
pub mod modes;
pub mod palette;
pub mod parser;
pub mod render;
pub mod screen;
pub mod scrollback;
pub mod search;
pub mod selection;
pub mod sequence;
pub mod sequencer;
pub mod terminal;
pub mod vi_input;

pub use cell::{Cell, CellFlags, Color, HyperlinkId, HyperlinkRegistry, SgrAttrs, SgrFlags};
pub use charset::{translate_charset, Charset, CharsetState};
pub use config::{PageSize, PixelSize, TerminalConfig};
pub use cursor::{Cursor, CursorDisplay, CursorShape, SavedCursor};
pub use error::{DispatchOutcome, ParserDiagnostic, ResourceError, TerminalError};
pub use function_table::{lookup as lookup_function, ConformanceLevel, FunctionId, FunctionSpec, FUNCTION_TABLE};
pub use grid::Grid;
pub use image::{
    DiscardQueue, Image, ImageAlignment, ImageFormat, ImageFragmentRef, ImageId, ImagePool,
    ImageResizePolicy, ImageSize, RasterizedImage,
};
pub use input::{
    GenerateOutcome, InputGenerator, KeyCode, KeyEvent, Modifiers as InputModifiers, MouseButton,
    MouseEvent, MouseEventKind,
};
pub use line::{Line, LineFlags, LogicalLine, TrivialLine};
pub use modes::{AnsiModes, Modes, MouseProtocol, MouseTransport, MouseWheelMode};
pub use palette::{ColorPalette, PaletteStack, Rgb, MAX_PALETTE_STACK_DEPTH};
pub use parser::{Action, Parser};
pub use render::{
    OverlayStyle, RenderAttributes, RenderBuffer, RenderBufferBuilder, RenderCell, RenderConfig,
    RenderCursor, RenderLine,
};
pub use screen::{HorizontalMargins, Screen};
pub use scrollback::{Scrollback, ScrollbackLine};
pub use search::{Search, SearchMatch};
pub use selection::{BufferPos, Selection, SelectionPhase, SelectionPolicy, SelectionTracker};
pub use sequence::{Category, FunctionSelector, Sequence};
pub use sequencer::dispatch_action;
pub use terminal::{DcsInProgress, ScreenKind, StatusDisplayType, Terminal};
pub use vi_input::{Executor as ViExecutor, TextObject, TextObjectScope, ViInputHandler, ViMode, ViMotion, ViOperator};
