//! Exhaustive small-state model checker for terminal invariants.
//!
//! Enumerates all short operation sequences (from a small byte-sequence
//! alphabet) on tiny grids through the real `Terminal::feed` and proves that
//! a handful of structural invariants hold in every reachable state.

use std::collections::{HashSet, VecDeque};
use std::hash::{Hash, Hasher};

use vterm_core::{Cell, Terminal};

#[derive(Clone, Eq, PartialEq)]
struct StateSnapshot {
    cells: Vec<char>,
    cursor_row: u16,
    cursor_col: u16,
    pending_wrap: bool,
}

impl Hash for StateSnapshot {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cells.hash(state);
        self.cursor_row.hash(state);
        self.cursor_col.hash(state);
        self.pending_wrap.hash(state);
    }
}

fn snapshot(term: &Terminal) -> StateSnapshot {
    let screen = term.screen();
    let cols = screen.grid.cols();
    let rows = screen.grid.rows();
    let mut cells = Vec::with_capacity((cols as usize) * (rows as usize));
    for r in 0..rows {
        for c in 0..cols {
            cells.push(screen.grid.cell(r, c).map_or('\0', Cell::content));
        }
    }
    StateSnapshot {
        cells,
        cursor_row: screen.cursor.row,
        cursor_col: screen.cursor.col,
        pending_wrap: screen.cursor.pending_wrap,
    }
}

fn assert_invariants(term: &Terminal, cols: u16, rows: u16) {
    let screen = term.screen();
    assert_eq!(screen.grid.cols(), cols, "grid width must never drift");
    assert_eq!(screen.grid.rows(), rows, "grid height must never drift");
    assert!(screen.cursor.row < rows, "cursor row out of bounds");
    assert!(screen.cursor.col < cols, "cursor col out of bounds");
    assert!(
        screen.cursor.scroll_top() <= screen.cursor.scroll_bottom(),
        "scroll region must stay ordered"
    );
    assert!(
        screen.cursor.scroll_bottom() < rows,
        "scroll bottom must stay inside the grid"
    );
}

/// Small alphabet of single-step byte sequences exercised by the model
/// checker: printable text, control characters, and a few CSI sequences
/// that mutate cursor/grid state in different ways.
fn alphabet() -> Vec<&'static [u8]> {
    vec![
        b"X",
        b"\r",
        b"\n",
        b"\x08",
        b"\t",
        b"\x1b[A",
        b"\x1b[B",
        b"\x1b[C",
        b"\x1b[D",
        b"\x1b[2J",
        b"\x1b[K",
        b"\x1b[1;1H",
    ]
}

fn model_check(cols: u16, rows: u16, depth: usize) -> usize {
    let ops = alphabet();
    let mut seen: HashSet<StateSnapshot> = HashSet::new();
    let mut queue: VecDeque<(Terminal, usize)> = VecDeque::new();

    let initial = Terminal::new(cols, rows, 16);
    assert_invariants(&initial, cols, rows);
    seen.insert(snapshot(&initial));
    queue.push_back((initial, 0));

    let mut explored = 0usize;
    while let Some((term, d)) = queue.pop_front() {
        explored += 1;
        if d >= depth {
            continue;
        }
        for op in &ops {
            let mut next = Terminal::new(cols, rows, 16);
            next.primary.grid = term.primary.grid.clone();
            next.primary.cursor = term.primary.cursor.clone();
            next.feed(op);
            assert_invariants(&next, cols, rows);
            let snap = snapshot(&next);
            if seen.insert(snap) {
                queue.push_back((next, d + 1));
            }
        }
    }
    explored
}

#[test]
fn model_check_2x2_depth4() {
    let explored = model_check(2, 2, 4);
    assert!(explored > 1, "expected to explore more than the initial state");
}

#[test]
fn model_check_3x3_depth3() {
    let explored = model_check(3, 3, 3);
    assert!(explored > 1);
}

#[test]
fn model_check_4x3_depth3() {
    let explored = model_check(4, 3, 3);
    assert!(explored > 1);
}

#[test]
fn model_check_2x2_deep_exploration() {
    let explored = model_check(2, 2, 6);
    assert!(explored > 1);
}
