//! Conformance replay tests: feed canonical VT/ANSI byte sequences through
//! `Terminal` and assert the resulting grid/cursor state. Each case pins down
//! one escape sequence's observable effect rather than round-tripping an
//! external fixture corpus.

use vterm_core::{Cell, SgrFlags, Terminal};

fn row_text(term: &Terminal, row: u16) -> String {
    let cols = term.screen().grid.cols();
    (0..cols)
        .map(|col| {
            term.screen()
                .grid
                .cell(row, col)
                .map(Cell::content)
                .unwrap_or(' ')
        })
        .collect::<String>()
        .trim_end()
        .to_string()
}

#[test]
fn plain_text_lands_left_to_right() {
    let mut term = Terminal::new(10, 3, 100);
    term.feed(b"hello");
    assert_eq!(row_text(&term, 0), "hello");
    assert_eq!(term.screen().cursor.col, 5);
}

#[test]
fn wrap_at_right_margin_moves_to_next_row() {
    let mut term = Terminal::new(5, 3, 100);
    term.feed(b"abcdefgh");
    assert_eq!(row_text(&term, 0), "abcde");
    assert_eq!(row_text(&term, 1), "fgh");
    assert_eq!(term.screen().cursor.row, 1);
    assert_eq!(term.screen().cursor.col, 3);
}

#[test]
fn carriage_return_and_linefeed_move_independently() {
    let mut term = Terminal::new(10, 3, 100);
    term.feed(b"abc\rdef\n");
    assert_eq!(row_text(&term, 0), "def");
    assert_eq!(term.screen().cursor.row, 1);
    assert_eq!(term.screen().cursor.col, 0);
}

#[test]
fn cup_moves_cursor_to_one_based_row_col() {
    let mut term = Terminal::new(10, 5, 100);
    term.feed(b"\x1b[3;5H");
    assert_eq!((term.screen().cursor.row, term.screen().cursor.col), (2, 4));
}

#[test]
fn ed_2_clears_the_whole_screen() {
    let mut term = Terminal::new(10, 3, 100);
    term.feed(b"abcdefghij\x1b[2J");
    for row in 0..3 {
        assert_eq!(row_text(&term, row), "");
    }
}

#[test]
fn el_0_clears_from_cursor_to_end_of_line() {
    let mut term = Terminal::new(10, 1, 100);
    term.feed(b"abcdefghij\x1b[1;4H\x1b[0K");
    assert_eq!(row_text(&term, 0), "abc");
}

#[test]
fn sgr_bold_and_reset_round_trip_through_attrs() {
    let mut term = Terminal::new(10, 1, 100);
    term.feed(b"\x1b[1mx\x1b[0my");
    let bold = term.screen().grid.cell(0, 0).unwrap();
    assert!(bold.attrs.flags.contains(SgrFlags::BOLD));
    let plain = term.screen().grid.cell(0, 1).unwrap();
    assert!(!plain.attrs.flags.contains(SgrFlags::BOLD));
}

#[test]
fn decstbm_sets_the_scroll_region() {
    let mut term = Terminal::new(5, 5, 100);
    term.feed(b"\x1b[2;4r");
    assert_eq!(term.screen().cursor.scroll_top(), 1);
    assert_eq!(term.screen().cursor.scroll_bottom(), 3);
}

#[test]
fn ris_restores_initial_geometry_and_clears_the_grid() {
    let mut term = Terminal::new(10, 3, 100);
    term.feed(b"hello\x1b[1;1H\x1b[1m");
    term.feed(b"\x1bc");
    assert_eq!(row_text(&term, 0), "");
    assert_eq!(term.screen().cols(), 10);
    assert_eq!(term.screen().rows(), 3);
}

#[test]
fn alt_screen_entry_and_exit_preserves_primary_content() {
    let mut term = Terminal::new(10, 3, 100);
    term.feed(b"primary");
    term.feed(b"\x1b[?1049h");
    term.feed(b"alt text");
    term.feed(b"\x1b[?1049l");
    assert_eq!(row_text(&term, 0), "primary");
}

#[test]
fn capture_buffer_dcs_reports_the_tail_of_the_combined_buffer() {
    let mut term = Terminal::new(5, 5, 20);
    for i in 1..=10 {
        term.feed(format!("\r\n{i}").as_bytes());
    }
    term.feed(b"\x1b[>0;7t");
    assert_eq!(
        term.take_replies(),
        b"\x1bP314;4\n5\n6\n7\n8\n9\n10\n\x1b\\\x1bP314;\x1b\\".to_vec()
    );
}
