//! Modal vi-style keybinding engine, grounded on `contour`'s
//! `ViInputHandler`. This is a UI-facing collaborator, not VT-stream state:
//! while the handler is not in [`ViMode::Insert`], the host must route keys
//! here instead of through [`crate::input::InputGenerator`].

use crate::input::{KeyCode, KeyEvent, Modifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViMode {
    #[default]
    Insert,
    Normal,
    Visual,
    VisualLine,
    VisualBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViMotion {
    CharLeft,
    CharRight,
    LineUp,
    LineDown,
    LineBegin,
    LineTextBegin,
    LineEnd,
    WordForward,
    WordBackward,
    WordEndForward,
    BigWordForward,
    BigWordBackward,
    BigWordEndForward,
    FileBegin,
    FileEnd,
    PageUp,
    PageDown,
    PageTop,
    PageBottom,
    LinesCenter,
    ParagraphForward,
    ParagraphBackward,
    SearchResultForward,
    SearchResultBackward,
    ToCharRight,
    ToCharLeft,
    TillBeforeCharRight,
    TillAfterCharLeft,
    RepeatCharMove,
    RepeatCharMoveReverse,
    FullLine,
    Selection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViOperator {
    Yank,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextObjectScope {
    Inner,
    A,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextObject {
    Word,
    BigWord,
    Paragraph,
    DoubleQuotes,
    SingleQuotes,
    BackQuotes,
    RoundBrackets,
    SquareBrackets,
    CurlyBrackets,
    AngleBrackets,
    LineMark,
}

/// Terminal-side hooks the handler invokes; implemented by [`crate::terminal::Terminal`]
/// or a host wrapper around it.
pub trait Executor {
    fn move_cursor(&mut self, motion: ViMotion, count: u32, last_char: Option<char>);
    fn execute(&mut self, op: ViOperator, motion: ViMotion, count: u32, last_char: Option<char>);
    fn yank(&mut self, scope: TextObjectScope, object: TextObject);
    fn select(&mut self, scope: TextObjectScope, object: TextObject);
    fn open(&mut self, scope: TextObjectScope, object: TextObject);
    fn paste(&mut self, count: u32, stripped: bool);
    fn toggle_line_mark(&mut self);
    fn search_start(&mut self);
    fn search_done(&mut self);
    fn search_cancel(&mut self);
    fn reverse_search_current_word(&mut self);
    fn search_current_word(&mut self);
    fn mode_changed(&mut self, mode: ViMode);
    fn scroll_viewport(&mut self, offset: i32);
    fn update_prompt_text(&mut self, text: String);
    fn prompt_cancel(&mut self);
    fn prompt_done(&mut self);
    fn update_search_term(&mut self, text: String);
}

/// A registered command's effect, resolved once `_pendingInput` exactly
/// matches a table entry (possibly via the `.` wildcard).
#[derive(Debug, Clone, Copy)]
enum Command {
    Move(ViMotion),
    SetMode(ViMode),
    ToggleMode(ViMode),
    Operate(ViOperator, ViMotion),
    YankObject(TextObjectScope, TextObject),
    OpenObject(TextObjectScope, TextObject),
    SelectObject(TextObjectScope, TextObject),
    Paste { strip: bool },
    ToggleLineMark,
    StartSearch,
    ReverseSearchWord,
    SearchWord,
    ScrollAndMove { offset: i32, motion: ViMotion },
}

const MOTION_TABLE: &[(&str, ViMotion)] = &[
    ("$", ViMotion::LineEnd),
    ("0", ViMotion::LineBegin),
    ("^", ViMotion::LineTextBegin),
    ("<BS>", ViMotion::CharLeft),
    ("<Down>", ViMotion::LineDown),
    ("<Up>", ViMotion::LineUp),
    ("<Left>", ViMotion::CharLeft),
    ("<Right>", ViMotion::CharRight),
    ("<Home>", ViMotion::LineBegin),
    ("<End>", ViMotion::LineEnd),
    ("<PageUp>", ViMotion::PageUp),
    ("<PageDown>", ViMotion::PageDown),
    ("h", ViMotion::CharLeft),
    ("l", ViMotion::CharRight),
    ("j", ViMotion::LineDown),
    ("k", ViMotion::LineUp),
    ("w", ViMotion::WordForward),
    ("b", ViMotion::WordBackward),
    ("e", ViMotion::WordEndForward),
    ("W", ViMotion::BigWordForward),
    ("B", ViMotion::BigWordBackward),
    ("E", ViMotion::BigWordEndForward),
    ("gg", ViMotion::FileBegin),
    ("G", ViMotion::FileEnd),
    ("H", ViMotion::PageTop),
    ("L", ViMotion::PageBottom),
    ("M", ViMotion::LinesCenter),
    ("{", ViMotion::ParagraphBackward),
    ("}", ViMotion::ParagraphForward),
    ("n", ViMotion::SearchResultForward),
    ("N", ViMotion::SearchResultBackward),
    ("f.", ViMotion::ToCharRight),
    ("F.", ViMotion::ToCharLeft),
    ("t.", ViMotion::TillBeforeCharRight),
    ("T.", ViMotion::TillAfterCharLeft),
    (";", ViMotion::RepeatCharMove),
    (",", ViMotion::RepeatCharMoveReverse),
];

const TEXT_OBJECTS: &[(char, TextObject)] = &[
    ('w', TextObject::Word),
    ('W', TextObject::BigWord),
    ('p', TextObject::Paragraph),
    ('"', TextObject::DoubleQuotes),
    ('\'', TextObject::SingleQuotes),
    ('`', TextObject::BackQuotes),
    ('(', TextObject::RoundBrackets),
    (')', TextObject::RoundBrackets),
    ('[', TextObject::SquareBrackets),
    (']', TextObject::SquareBrackets),
    ('{', TextObject::CurlyBrackets),
    ('}', TextObject::CurlyBrackets),
    ('<', TextObject::AngleBrackets),
    ('>', TextObject::AngleBrackets),
    ('m', TextObject::LineMark),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum PromptMode {
    #[default]
    Disabled,
    Enabled,
    ExternallyEnabled,
}

pub struct ViInputHandler {
    mode: ViMode,
    pending_input: String,
    count: u32,
    last_char: Option<char>,
    search_edit: PromptMode,
    prompt_edit: PromptMode,
    search_term: String,
    prompt_text: String,
}

impl ViInputHandler {
    pub fn new(initial_mode: ViMode) -> Self {
        Self {
            mode: initial_mode,
            pending_input: String::new(),
            count: 0,
            last_char: None,
            search_edit: PromptMode::Disabled,
            prompt_edit: PromptMode::Disabled,
            search_term: String::new(),
            prompt_text: String::new(),
        }
    }

    pub fn mode(&self) -> ViMode {
        self.mode
    }

    fn is_visual(&self) -> bool {
        matches!(self.mode, ViMode::Visual | ViMode::VisualLine | ViMode::VisualBlock)
    }

    fn count(&self) -> u32 {
        self.count.max(1)
    }

    fn set_mode(&mut self, mode: ViMode, executor: &mut dyn Executor) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        self.clear_pending();
        executor.mode_changed(mode);
        if mode == ViMode::Insert {
            self.search_term.clear();
        }
    }

    fn toggle_mode(&mut self, mode: ViMode, executor: &mut dyn Executor) {
        if self.mode == mode {
            self.set_mode(ViMode::Normal, executor);
        } else {
            self.set_mode(mode, executor);
        }
    }

    fn clear_pending(&mut self) {
        self.count = 0;
        self.pending_input.clear();
    }

    /// Feed one key event while not in `Insert` mode. Returns `true` if the
    /// handler consumed it (it always does, outside Insert mode).
    pub fn handle_key(&mut self, key: KeyEvent, executor: &mut dyn Executor) -> bool {
        if self.prompt_edit != PromptMode::Disabled || self.search_edit != PromptMode::Disabled {
            return self.handle_prompt_key(key, executor);
        }

        if self.mode == ViMode::Insert {
            return false;
        }

        if self.is_visual() && key.code == KeyCode::Escape && key.modifiers.is_empty() {
            self.clear_pending();
            self.set_mode(ViMode::Normal, executor);
            return true;
        }

        if let KeyCode::Char(ch) = key.code {
            if ch.is_ascii_digit() && !(ch == '0' && self.pending_input.is_empty()) {
                self.count = self.count * 10 + ch.to_digit(10).unwrap();
                return true;
            }
        }

        self.append_key_token(key);
        if self.pending_input.is_empty() {
            return true;
        }
        self.resolve_pending(executor);
        true
    }

    fn append_key_token(&mut self, key: KeyEvent) {
        if key.modifiers.contains(Modifiers::SUPER) {
            self.pending_input.push_str("M-");
        }
        if key.modifiers.contains(Modifiers::ALT) {
            self.pending_input.push_str("A-");
        }
        if key.modifiers.contains(Modifiers::SHIFT) {
            self.pending_input.push_str("S-");
        }
        if key.modifiers.contains(Modifiers::CTRL) {
            self.pending_input.push_str("C-");
        }
        match key.code {
            KeyCode::Char(ch) => self.pending_input.push(ch),
            KeyCode::Down => self.pending_input.push_str("<Down>"),
            KeyCode::Up => self.pending_input.push_str("<Up>"),
            KeyCode::Left => self.pending_input.push_str("<Left>"),
            KeyCode::Right => self.pending_input.push_str("<Right>"),
            KeyCode::Home => self.pending_input.push_str("<Home>"),
            KeyCode::End => self.pending_input.push_str("<End>"),
            KeyCode::PageUp => self.pending_input.push_str("<PageUp>"),
            KeyCode::PageDown => self.pending_input.push_str("<PageDown>"),
            KeyCode::Insert => self.pending_input.push_str("<Insert>"),
            KeyCode::Delete => self.pending_input.push_str("<Delete>"),
            KeyCode::Backspace => self.pending_input.push_str("<BS>"),
            KeyCode::Enter => self.pending_input.push_str("<NL>"),
            KeyCode::Escape => self.pending_input.push_str("<Escape>"),
            KeyCode::Tab | KeyCode::BackTab | KeyCode::F(_) => {}
        }
    }

    fn resolve_pending(&mut self, executor: &mut dyn Executor) {
        match lookup_command(&self.pending_input, self.is_visual()) {
            LookupOutcome::Exact(cmd) => {
                self.last_char = self.pending_input.chars().last();
                self.dispatch(cmd, executor);
                self.clear_pending();
            }
            LookupOutcome::Partial => {}
            LookupOutcome::None => self.clear_pending(),
        }
    }

    fn dispatch(&mut self, cmd: Command, executor: &mut dyn Executor) {
        let count = self.count();
        match cmd {
            Command::Move(motion) => executor.move_cursor(motion, count, self.last_char),
            Command::SetMode(mode) => self.set_mode(mode, executor),
            Command::ToggleMode(mode) => self.toggle_mode(mode, executor),
            Command::Operate(op, motion) => executor.execute(op, motion, count, self.last_char),
            Command::YankObject(scope, object) => executor.yank(scope, object),
            Command::OpenObject(scope, object) => executor.open(scope, object),
            Command::SelectObject(scope, object) => executor.select(scope, object),
            Command::Paste { strip } => executor.paste(count, strip),
            Command::ToggleLineMark => executor.toggle_line_mark(),
            Command::StartSearch => {
                self.search_term.clear();
                executor.search_start();
                self.search_edit = PromptMode::Enabled;
            }
            Command::ReverseSearchWord => executor.reverse_search_current_word(),
            Command::SearchWord => executor.search_current_word(),
            Command::ScrollAndMove { offset, motion } => {
                executor.scroll_viewport(offset);
                executor.move_cursor(motion, 1, None);
            }
        }
    }

    fn handle_prompt_key(&mut self, key: KeyEvent, executor: &mut dyn Executor) -> bool {
        let searching = self.search_edit != PromptMode::Disabled;
        let text = if searching { &mut self.search_term } else { &mut self.prompt_text };
        match key.code {
            KeyCode::Backspace => {
                text.pop();
            }
            KeyCode::Enter => {
                if searching {
                    executor.update_search_term(std::mem::take(text));
                    executor.search_done();
                    self.search_edit = PromptMode::Disabled;
                } else {
                    executor.prompt_done();
                    self.prompt_edit = PromptMode::Disabled;
                }
                return true;
            }
            KeyCode::Escape => {
                text.clear();
                if searching {
                    executor.search_cancel();
                    self.search_edit = PromptMode::Disabled;
                } else {
                    executor.prompt_cancel();
                    self.prompt_edit = PromptMode::Disabled;
                }
                return true;
            }
            KeyCode::Char(ch) => text.push(ch),
            _ => {}
        }
        if searching {
            executor.update_search_term(text.clone());
        } else {
            executor.update_prompt_text(text.clone());
        }
        true
    }
}

enum LookupOutcome {
    Exact(Command),
    Partial,
    None,
}

fn lookup_command(pending: &str, visual: bool) -> LookupOutcome {
    if let Some(cmd) = lookup_exact(pending, visual) {
        return LookupOutcome::Exact(cmd);
    }
    if has_partial_match(pending, visual) {
        LookupOutcome::Partial
    } else {
        LookupOutcome::None
    }
}

fn wildcard_matches(pattern: &str, input: &str) -> bool {
    if pattern.len() != input.chars().count() {
        return false;
    }
    pattern.chars().zip(input.chars()).all(|(p, i)| p == '.' || p == i)
}

fn lookup_exact(pending: &str, visual: bool) -> Option<Command> {
    if !visual {
        if let Some(cmd) = lookup_normal_only(pending) {
            return Some(cmd);
        }
    }
    for &(pat, motion) in MOTION_TABLE {
        if pat == pending || (pat.contains('.') && wildcard_matches(pat, pending)) {
            return Some(Command::Move(motion));
        }
    }
    match pending {
        "J" => return Some(Command::ScrollAndMove { offset: -1, motion: ViMotion::LineDown }),
        "K" => return Some(Command::ScrollAndMove { offset: 1, motion: ViMotion::LineUp }),
        "C-E" => return Some(Command::ScrollAndMove { offset: -1, motion: ViMotion::LineDown }),
        "C-Y" => return Some(Command::ScrollAndMove { offset: 1, motion: ViMotion::LineUp }),
        "v" => return Some(Command::ToggleMode(ViMode::Visual)),
        "V" => return Some(Command::ToggleMode(ViMode::VisualLine)),
        "C-V" => return Some(Command::ToggleMode(ViMode::VisualBlock)),
        "/" => return Some(Command::StartSearch),
        "<Escape>" => return Some(Command::SetMode(ViMode::Normal)),
        _ => {}
    }
    if let Some(rest) = pending.strip_prefix('y') {
        if !rest.is_empty() {
            if let Some(cmd) = operator_command(ViOperator::Yank, rest) {
                return Some(cmd);
            }
        }
    }
    if let Some(rest) = pending.strip_prefix('o') {
        if !rest.is_empty() {
            if let Some(cmd) = operator_command(ViOperator::Open, rest) {
                return Some(cmd);
            }
        }
    }
    if visual {
        if pending == "y" {
            return Some(Command::Operate(ViOperator::Yank, ViMotion::Selection));
        }
        if pending == "o" {
            return Some(Command::Operate(ViOperator::Open, ViMotion::Selection));
        }
        if let Some((scope, object)) = scope_object(pending) {
            return Some(Command::SelectObject(scope, object));
        }
    }
    None
}

fn lookup_normal_only(pending: &str) -> Option<Command> {
    match pending {
        "A" | "I" | "a" | "i" | "<Insert>" | "<Escape>" => Some(Command::SetMode(ViMode::Insert)),
        "#" => Some(Command::ReverseSearchWord),
        "*" => Some(Command::SearchWord),
        "mm" => Some(Command::ToggleLineMark),
        "p" => Some(Command::Paste { strip: false }),
        "P" => Some(Command::Paste { strip: true }),
        _ => {
            if let Some(prefix) = pending.strip_prefix('y').filter(|r| r.len() == 2) {
                if let Some((scope, obj)) = scope_object_chars(prefix) {
                    return Some(Command::YankObject(scope, obj));
                }
            }
            if let Some(prefix) = pending.strip_prefix('o').filter(|r| r.len() == 2) {
                if let Some((scope, obj)) = scope_object_chars(prefix) {
                    return Some(Command::OpenObject(scope, obj));
                }
            }
            None
        }
    }
}

fn operator_command(op: ViOperator, rest: &str) -> Option<Command> {
    if rest.chars().count() == 1 && rest.chars().next() == op_char(op) {
        return Some(Command::Operate(op, ViMotion::FullLine));
    }
    for &(pat, motion) in MOTION_TABLE {
        if pat == rest || (pat.contains('.') && wildcard_matches(pat, rest)) {
            return Some(Command::Operate(op, motion));
        }
    }
    None
}

fn op_char(op: ViOperator) -> Option<char> {
    match op {
        ViOperator::Yank => Some('y'),
        ViOperator::Open => Some('o'),
    }
}

fn scope_object_chars(two_chars: &str) -> Option<(TextObjectScope, TextObject)> {
    scope_object(two_chars)
}

fn scope_object(s: &str) -> Option<(TextObjectScope, TextObject)> {
    let mut chars = s.chars();
    let scope_char = chars.next()?;
    let obj_char = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    let scope = match scope_char {
        'i' => TextObjectScope::Inner,
        'a' => TextObjectScope::A,
        _ => return None,
    };
    let object = TEXT_OBJECTS.iter().find(|(c, _)| *c == obj_char)?.1;
    Some((scope, object))
}

fn has_partial_match(pending: &str, visual: bool) -> bool {
    let is_prefix_of = |pat: &str| -> bool {
        let pat_chars: Vec<char> = pat.chars().collect();
        let pending_chars: Vec<char> = pending.chars().collect();
        if pending_chars.len() >= pat_chars.len() {
            return false;
        }
        pat_chars
            .iter()
            .zip(pending_chars.iter())
            .all(|(p, i)| *p == '.' || p == i)
    };
    if MOTION_TABLE.iter().any(|(pat, _)| is_prefix_of(pat)) {
        return true;
    }
    if !visual && (pending == "y" || pending == "o" || pending == "m") {
        return true;
    }
    if pending.len() == 1
        && matches!(pending.chars().next(), Some('y') | Some('o'))
        && !visual
    {
        return true;
    }
    if pending.chars().count() == 2 {
        let first = pending.chars().next().unwrap();
        if matches!(first, 'y' | 'o') || (visual && matches!(first, 'i' | 'a')) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingExecutor {
        moves: Vec<(ViMotion, u32)>,
        mode_changes: Vec<ViMode>,
    }

    impl RecordingExecutor {
        fn new() -> Self {
            Self { moves: Vec::new(), mode_changes: Vec::new() }
        }
    }

    impl Executor for RecordingExecutor {
        fn move_cursor(&mut self, motion: ViMotion, count: u32, _last_char: Option<char>) {
            self.moves.push((motion, count));
        }
        fn execute(&mut self, _op: ViOperator, _motion: ViMotion, _count: u32, _last_char: Option<char>) {}
        fn yank(&mut self, _scope: TextObjectScope, _object: TextObject) {}
        fn select(&mut self, _scope: TextObjectScope, _object: TextObject) {}
        fn open(&mut self, _scope: TextObjectScope, _object: TextObject) {}
        fn paste(&mut self, _count: u32, _stripped: bool) {}
        fn toggle_line_mark(&mut self) {}
        fn search_start(&mut self) {}
        fn search_done(&mut self) {}
        fn search_cancel(&mut self) {}
        fn reverse_search_current_word(&mut self) {}
        fn search_current_word(&mut self) {}
        fn mode_changed(&mut self, mode: ViMode) {
            self.mode_changes.push(mode);
        }
        fn scroll_viewport(&mut self, _offset: i32) {}
        fn update_prompt_text(&mut self, _text: String) {}
        fn prompt_cancel(&mut self) {}
        fn prompt_done(&mut self) {}
        fn update_search_term(&mut self, _text: String) {}
    }

    #[test]
    fn single_motion_key_dispatches_immediately() {
        let mut handler = ViInputHandler::new(ViMode::Normal);
        let mut exec = RecordingExecutor::new();
        handler.handle_key(KeyEvent::new(KeyCode::Char('j'), Modifiers::NONE), &mut exec);
        assert_eq!(exec.moves, vec![(ViMotion::LineDown, 1)]);
    }

    #[test]
    fn count_prefix_is_applied_to_motion() {
        let mut handler = ViInputHandler::new(ViMode::Normal);
        let mut exec = RecordingExecutor::new();
        handler.handle_key(KeyEvent::new(KeyCode::Char('3'), Modifiers::NONE), &mut exec);
        handler.handle_key(KeyEvent::new(KeyCode::Char('j'), Modifiers::NONE), &mut exec);
        assert_eq!(exec.moves, vec![(ViMotion::LineDown, 3)]);
    }

    #[test]
    fn gg_requires_two_keys() {
        let mut handler = ViInputHandler::new(ViMode::Normal);
        let mut exec = RecordingExecutor::new();
        handler.handle_key(KeyEvent::new(KeyCode::Char('g'), Modifiers::NONE), &mut exec);
        assert!(exec.moves.is_empty());
        handler.handle_key(KeyEvent::new(KeyCode::Char('g'), Modifiers::NONE), &mut exec);
        assert_eq!(exec.moves, vec![(ViMotion::FileBegin, 1)]);
    }

    #[test]
    fn zero_alone_is_line_begin_not_count() {
        let mut handler = ViInputHandler::new(ViMode::Normal);
        let mut exec = RecordingExecutor::new();
        handler.handle_key(KeyEvent::new(KeyCode::Char('0'), Modifiers::NONE), &mut exec);
        assert_eq!(exec.moves, vec![(ViMotion::LineBegin, 1)]);
    }

    #[test]
    fn wildcard_find_char_motion_matches_any_char() {
        let mut handler = ViInputHandler::new(ViMode::Normal);
        let mut exec = RecordingExecutor::new();
        handler.handle_key(KeyEvent::new(KeyCode::Char('f'), Modifiers::NONE), &mut exec);
        handler.handle_key(KeyEvent::new(KeyCode::Char('x'), Modifiers::NONE), &mut exec);
        assert_eq!(exec.moves, vec![(ViMotion::ToCharRight, 1)]);
    }

    #[test]
    fn i_enters_insert_mode() {
        let mut handler = ViInputHandler::new(ViMode::Normal);
        let mut exec = RecordingExecutor::new();
        handler.handle_key(KeyEvent::new(KeyCode::Char('i'), Modifiers::NONE), &mut exec);
        assert_eq!(handler.mode(), ViMode::Insert);
        assert_eq!(exec.mode_changes, vec![ViMode::Insert]);
    }

    #[test]
    fn v_toggles_visual_mode_on_and_off() {
        let mut handler = ViInputHandler::new(ViMode::Normal);
        let mut exec = RecordingExecutor::new();
        handler.handle_key(KeyEvent::new(KeyCode::Char('v'), Modifiers::NONE), &mut exec);
        assert_eq!(handler.mode(), ViMode::Visual);
        handler.handle_key(KeyEvent::new(KeyCode::Char('v'), Modifiers::NONE), &mut exec);
        assert_eq!(handler.mode(), ViMode::Normal);
    }

    #[test]
    fn insert_mode_does_not_consume_keys() {
        let mut handler = ViInputHandler::new(ViMode::Insert);
        let mut exec = RecordingExecutor::new();
        let handled = handler.handle_key(KeyEvent::new(KeyCode::Char('j'), Modifiers::NONE), &mut exec);
        assert!(!handled);
        assert!(exec.moves.is_empty());
    }
}
