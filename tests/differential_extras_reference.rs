//! Differential test: symmetric push/pop and save/restore operation pairs
//! must leave the terminal in the same observable state it started in,
//! compared against a snapshot taken before the pair ran.

use vterm_core::{Cell, Color, SgrFlags, Terminal};

fn content_snapshot(term: &Terminal) -> Vec<char> {
    let screen = term.screen();
    let cols = screen.grid.cols();
    let rows = screen.grid.rows();
    (0..rows)
        .flat_map(|row| (0..cols).map(move |col| (row, col)))
        .map(|(row, col)| screen.grid.cell(row, col).map(Cell::content).unwrap_or(' '))
        .collect()
}

#[test]
fn decsc_decrc_round_trips_cursor_and_attributes() {
    let mut term = Terminal::new(10, 5, 100);
    term.feed(b"\x1b[3;4m\x1b[2;3H");
    let before = (term.screen().cursor.row, term.screen().cursor.col);

    term.feed(b"\x1b7"); // DECSC
    term.feed(b"\x1b[5;5H\x1b[0m"); // move elsewhere, reset attrs
    term.feed(b"\x1b8"); // DECRC

    assert_eq!((term.screen().cursor.row, term.screen().cursor.col), before);
    assert!(term.screen().cursor.attrs.flags.contains(SgrFlags::ITALIC));
}

#[test]
fn alt_screen_enter_and_leave_round_trips_primary_content() {
    let mut term = Terminal::new(10, 3, 100);
    term.feed(b"unchanged");
    let before = content_snapshot(&term);

    term.feed(b"\x1b[?1049h");
    term.feed(b"scratch work on the alt screen");
    term.feed(b"\x1b[?1049l");

    assert_eq!(content_snapshot(&term), before);
}

#[test]
fn palette_push_pop_round_trips_a_modified_slot() {
    let mut term = Terminal::new(10, 3, 100);
    let before = term.palette.get(1);

    term.push_palette(None);
    term.palette.set(1, vterm_core::Rgb(1, 2, 3));
    assert_ne!(term.palette.get(1), before);
    term.pop_palette(None);

    assert_eq!(term.palette.get(1), before);
}

#[test]
fn title_push_pop_round_trips() {
    let mut term = Terminal::new(10, 3, 100);
    term.title = "first".to_string();

    term.push_title("second".to_string());
    assert_eq!(term.title, "second");
    term.pop_title();

    assert_eq!(term.title, "first");
}

#[test]
fn sgr_bg_color_is_independent_of_fg_color() {
    let mut term = Terminal::new(10, 1, 100);
    term.feed(b"\x1b[31;44mx");
    let cell = term.screen().grid.cell(0, 0).unwrap();
    assert_eq!(cell.attrs.fg, Color::Named(1));
    assert_eq!(cell.attrs.bg, Color::Named(4));
}
