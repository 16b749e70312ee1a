//! Resolves `Parser::Action`s into `Sequence`s, looks up their
//! `FunctionSelector` in the function table, and dispatches the named
//! operation against a `Terminal`.
//!
//! DCS sequences are assembled across `Hook`/`Put`/`Unhook` into the
//! `DcsInProgress` buffer on `Terminal` (since `dispatch_action` is a
//! stateless free function, `Terminal` is the only place to park it
//! between the two actions) and resolved here once `Unhook` arrives.

use crate::cell::{Color, SgrFlags};
use crate::charset::Charset;
use crate::cursor::{CursorDisplay, CursorShape};
use crate::error::DispatchOutcome;
use crate::function_table::{self, FunctionId};
use crate::parser::Action;
use crate::sequence::Sequence;
use crate::terminal::{DcsInProgress, Terminal};

/// Feeds a single parser `Action` into `terminal`, returning the outcome of
/// whatever dispatch happened (an `Execute`/`Print`/`Put`/`Unhook` that
/// never reaches the function table always reports `Ok`).
pub fn dispatch_action(terminal: &mut Terminal, action: Action) -> DispatchOutcome {
    match action {
        Action::Print(text, _width) => {
            let autowrap = terminal.modes.autowrap();
            for ch in text.chars() {
                let width = crate::cell::display_width(ch);
                terminal.screen_mut().write_grapheme(ch, width, autowrap);
            }
            terminal.dirty = true;
            DispatchOutcome::Ok
        }
        Action::Execute(byte) => execute_control(terminal, byte),
        Action::DispatchEsc {
            intermediates,
            final_byte,
        } => {
            let seq = Sequence::esc(intermediates, final_byte);
            dispatch_sequence(terminal, &seq)
        }
        Action::DispatchCsi {
            leader,
            params,
            intermediates,
            final_byte,
        } => {
            let seq = Sequence::csi(leader, params, intermediates, final_byte);
            dispatch_sequence(terminal, &seq)
        }
        Action::DispatchOsc(data) => {
            let seq = Sequence::osc(data);
            dispatch_sequence(terminal, &seq)
        }
        Action::Hook {
            params,
            intermediates,
            final_byte,
        } => {
            terminal.dcs_in_progress = Some(DcsInProgress {
                params,
                intermediates,
                final_byte,
                payload: Vec::new(),
            });
            DispatchOutcome::Ok
        }
        Action::Put(byte) => {
            if let Some(dcs) = terminal.dcs_in_progress.as_mut() {
                dcs.payload.push(byte);
            }
            DispatchOutcome::Ok
        }
        Action::Unhook => match terminal.dcs_in_progress.take() {
            Some(dcs) => finish_dcs(terminal, dcs),
            None => DispatchOutcome::Ok,
        },
        Action::DispatchApc(_) | Action::DispatchPm(_) => DispatchOutcome::Ok,
    }
}

fn execute_control(terminal: &mut Terminal, byte: u8) -> DispatchOutcome {
    let bg = terminal.bg_color();
    let screen = terminal.screen_mut();
    match byte {
        0x07 => {} // BEL: no audible bell to model here.
        0x08 => screen.move_cursor_backward(1, false),
        0x09 => screen.cursor_next_tab(1),
        0x0A | 0x0B | 0x0C => screen.index(bg),
        0x0D => screen.cursor.carriage_return(),
        0x0E => screen.cursor.charset.lock_shift_left(1),
        0x0F => screen.cursor.charset.lock_shift_left(0),
        0x18 | 0x1A => {} // CAN/SUB: parser already reset mid-sequence state.
        _ => {}
    }
    terminal.dirty = true;
    DispatchOutcome::Ok
}

fn dispatch_sequence(terminal: &mut Terminal, seq: &Sequence) -> DispatchOutcome {
    let selector = seq.selector();
    let Some(spec) = function_table::lookup(&selector) else {
        return DispatchOutcome::Unsupported;
    };
    terminal.dirty = true;
    match spec.id {
        FunctionId::DecSc => {
            let origin_mode = terminal.modes.origin_mode();
            terminal.screen_mut().save_cursor(origin_mode);
            DispatchOutcome::Ok
        }
        FunctionId::DecRc => {
            terminal.screen_mut().restore_cursor();
            DispatchOutcome::Ok
        }
        FunctionId::Ind => {
            let bg = terminal.bg_color();
            terminal.screen_mut().index(bg);
            DispatchOutcome::Ok
        }
        FunctionId::Nel => {
            let bg = terminal.bg_color();
            terminal.screen_mut().next_line(bg);
            DispatchOutcome::Ok
        }
        FunctionId::Hts => {
            terminal.screen_mut().tab_set();
            DispatchOutcome::Ok
        }
        FunctionId::Ri => {
            let bg = terminal.bg_color();
            terminal.screen_mut().reverse_index(bg);
            DispatchOutcome::Ok
        }
        FunctionId::Ss2 => {
            terminal.screen_mut().cursor.charset.single_shift(2);
            DispatchOutcome::Ok
        }
        FunctionId::Ss3 => {
            terminal.screen_mut().cursor.charset.single_shift(3);
            DispatchOutcome::Ok
        }
        FunctionId::Ls2 => {
            terminal.screen_mut().cursor.charset.lock_shift_left(2);
            DispatchOutcome::Ok
        }
        FunctionId::Ls3 => {
            terminal.screen_mut().cursor.charset.lock_shift_left(3);
            DispatchOutcome::Ok
        }
        FunctionId::Ls1r => {
            terminal.screen_mut().cursor.charset.lock_shift_right(1);
            DispatchOutcome::Ok
        }
        FunctionId::Ls2r => {
            terminal.screen_mut().cursor.charset.lock_shift_right(2);
            DispatchOutcome::Ok
        }
        FunctionId::Ls3r => {
            terminal.screen_mut().cursor.charset.lock_shift_right(3);
            DispatchOutcome::Ok
        }
        FunctionId::Ris => {
            terminal.reset_to_initial_state();
            DispatchOutcome::Ok
        }
        FunctionId::DecAln => {
            let (cols, rows) = (terminal.screen().cols(), terminal.screen().rows());
            terminal
                .screen_mut()
                .fill_rectangle('E', 0, 0, rows.saturating_sub(1), cols.saturating_sub(1));
            DispatchOutcome::Ok
        }
        FunctionId::ScsG0 | FunctionId::ScsG1 | FunctionId::ScsG2 | FunctionId::ScsG3 => {
            let slot = match spec.id {
                FunctionId::ScsG0 => 0,
                FunctionId::ScsG1 => 1,
                FunctionId::ScsG2 => 2,
                _ => 3,
            };
            let charset = Charset::from_designator(spec.final_byte);
            terminal.screen_mut().designate_charset(slot, charset);
            DispatchOutcome::Ok
        }
        FunctionId::Ich => {
            let n = seq.param(0, 1);
            let bg = terminal.bg_color();
            terminal.screen_mut().insert_chars(n, bg);
            DispatchOutcome::Ok
        }
        FunctionId::Cuu => {
            let origin_mode = terminal.modes.origin_mode();
            terminal.screen_mut().move_cursor_up(seq.param(0, 1), origin_mode);
            DispatchOutcome::Ok
        }
        FunctionId::Cud => {
            let origin_mode = terminal.modes.origin_mode();
            terminal.screen_mut().move_cursor_down(seq.param(0, 1), origin_mode);
            DispatchOutcome::Ok
        }
        FunctionId::Cuf | FunctionId::Hpr => {
            let lr = terminal.modes.dec_mode(69);
            terminal.screen_mut().move_cursor_forward(seq.param(0, 1), lr);
            DispatchOutcome::Ok
        }
        FunctionId::Cub => {
            let lr = terminal.modes.dec_mode(69);
            terminal.screen_mut().move_cursor_backward(seq.param(0, 1), lr);
            DispatchOutcome::Ok
        }
        FunctionId::Hpa => {
            terminal.screen_mut().move_cursor_to_column(seq.param(0, 1).saturating_sub(1));
            DispatchOutcome::Ok
        }
        FunctionId::Cnl => {
            let origin_mode = terminal.modes.origin_mode();
            terminal.screen_mut().move_cursor_next_line(seq.param(0, 1), origin_mode);
            DispatchOutcome::Ok
        }
        FunctionId::Cpl => {
            let origin_mode = terminal.modes.origin_mode();
            terminal.screen_mut().move_cursor_prev_line(seq.param(0, 1), origin_mode);
            DispatchOutcome::Ok
        }
        FunctionId::Cha => {
            terminal.screen_mut().move_cursor_to_column(seq.param(0, 1).saturating_sub(1));
            DispatchOutcome::Ok
        }
        FunctionId::Cup | FunctionId::Hvp => {
            let origin_mode = terminal.modes.origin_mode();
            let row = seq.param(0, 1).saturating_sub(1);
            let col = seq.param(1, 1).saturating_sub(1);
            terminal.screen_mut().move_cursor_to(row, col, origin_mode);
            DispatchOutcome::Ok
        }
        FunctionId::Cht => {
            terminal.screen_mut().cursor_next_tab(seq.param(0, 1));
            DispatchOutcome::Ok
        }
        FunctionId::Ed => {
            let bg = terminal.bg_color();
            let screen = terminal.screen_mut();
            match seq.param(0, 0) {
                0 => screen.clear_to_end_of_screen(bg),
                1 => screen.clear_to_begin_of_screen(bg),
                2 | 3 => screen.clear_screen(bg),
                _ => return DispatchOutcome::Invalid,
            }
            DispatchOutcome::Ok
        }
        FunctionId::El => {
            let bg = terminal.bg_color();
            let screen = terminal.screen_mut();
            match seq.param(0, 0) {
                0 => screen.clear_to_end_of_line(bg),
                1 => screen.clear_to_begin_of_line(bg),
                2 => screen.clear_line(bg),
                _ => return DispatchOutcome::Invalid,
            }
            DispatchOutcome::Ok
        }
        FunctionId::Il => {
            let bg = terminal.bg_color();
            terminal.screen_mut().insert_lines(seq.param(0, 1), bg);
            DispatchOutcome::Ok
        }
        FunctionId::Dl => {
            let bg = terminal.bg_color();
            terminal.screen_mut().delete_lines(seq.param(0, 1), bg);
            DispatchOutcome::Ok
        }
        FunctionId::Dch => {
            let bg = terminal.bg_color();
            terminal.screen_mut().delete_chars(seq.param(0, 1), bg);
            DispatchOutcome::Ok
        }
        FunctionId::Su => {
            let bg = terminal.bg_color();
            terminal.screen_mut().scroll_up(seq.param(0, 1), bg);
            DispatchOutcome::Ok
        }
        FunctionId::Sd => {
            let bg = terminal.bg_color();
            terminal.screen_mut().scroll_down(seq.param(0, 1), bg);
            DispatchOutcome::Ok
        }
        FunctionId::Ech => {
            let bg = terminal.bg_color();
            terminal.screen_mut().erase_chars(seq.param(0, 1), bg);
            DispatchOutcome::Ok
        }
        FunctionId::Cbt => {
            terminal.screen_mut().cursor_prev_tab(seq.param(0, 1));
            DispatchOutcome::Ok
        }
        FunctionId::Vpa => {
            let origin_mode = terminal.modes.origin_mode();
            terminal
                .screen_mut()
                .move_cursor_to_line(seq.param(0, 1).saturating_sub(1), origin_mode);
            DispatchOutcome::Ok
        }
        FunctionId::Vpr => {
            let origin_mode = terminal.modes.origin_mode();
            terminal.screen_mut().move_cursor_down(seq.param(0, 1), origin_mode);
            DispatchOutcome::Ok
        }
        FunctionId::Tbc => {
            terminal.screen_mut().tab_clear(seq.param(0, 0));
            DispatchOutcome::Ok
        }
        FunctionId::Sm => {
            for group in &seq.parameters {
                if let Some(&p) = group.first() {
                    terminal.modes.set_ansi_mode(p, true);
                }
            }
            DispatchOutcome::Ok
        }
        FunctionId::Rm => {
            for group in &seq.parameters {
                if let Some(&p) = group.first() {
                    terminal.modes.set_ansi_mode(p, false);
                }
            }
            DispatchOutcome::Ok
        }
        FunctionId::Sgr => {
            terminal.screen_mut().cursor.attrs.apply_sgr_params(&seq.parameters);
            DispatchOutcome::Ok
        }
        FunctionId::Dsr => {
            let reply = match seq.param(0, 0) {
                5 => b"\x1b[0n".to_vec(),
                6 => {
                    let s = terminal.screen();
                    format!("\x1b[{};{}R", s.cursor.row + 1, s.cursor.col + 1).into_bytes()
                }
                _ => Vec::new(),
            };
            if !reply.is_empty() {
                terminal.reply_buffer.extend_from_slice(&reply);
            }
            DispatchOutcome::Ok
        }
        FunctionId::DecStbm => {
            let top = seq.raw_param(0).unwrap_or(1).saturating_sub(1);
            let bottom = seq
                .raw_param(1)
                .unwrap_or(terminal.screen().rows())
                .saturating_sub(1);
            terminal.screen_mut().set_top_bottom_margins(top, bottom);
            DispatchOutcome::Ok
        }
        FunctionId::DecSlrm => {
            if terminal.modes.dec_mode(69) {
                let left = seq.raw_param(0).unwrap_or(1).saturating_sub(1);
                let right = seq
                    .raw_param(1)
                    .unwrap_or(terminal.screen().cols())
                    .saturating_sub(1);
                terminal.screen_mut().set_left_right_margins(left, right);
            } else {
                terminal.screen_mut().sco_save_cursor();
            }
            DispatchOutcome::Ok
        }
        FunctionId::XtWinOps => DispatchOutcome::Unsupported,
        FunctionId::ScoRc => {
            terminal.screen_mut().sco_restore_cursor();
            DispatchOutcome::Ok
        }
        FunctionId::DecScusr => {
            let ps = seq.param(0, 1);
            let shape = match ps {
                3 | 4 => CursorShape::Underscore,
                5 | 6 => CursorShape::Bar,
                _ => CursorShape::Block,
            };
            let blink = ps == 0 || ps % 2 != 0;
            terminal
                .screen_mut()
                .set_cursor_style(CursorDisplay::Shown, shape, blink);
            DispatchOutcome::Ok
        }
        FunctionId::DecStr => {
            terminal.soft_reset();
            DispatchOutcome::Ok
        }
        FunctionId::DecScl => {
            let ps1 = seq.param(0, 65);
            let ps2 = seq.param(1, 0);
            terminal.modes.set_conformance_level(ps1, ps2);
            DispatchOutcome::Ok
        }
        FunctionId::DecSca => {
            let protected = matches!(seq.param(0, 0), 1);
            terminal
                .screen_mut()
                .cursor
                .attrs
                .flags
                .set(SgrFlags::PROTECTED, protected);
            DispatchOutcome::Ok
        }
        FunctionId::XtPushColors => {
            terminal.push_palette(seq.raw_param(0).map(|p| p as usize));
            DispatchOutcome::Ok
        }
        FunctionId::XtPopColors => {
            terminal.pop_palette(seq.raw_param(0).map(|p| p as usize));
            DispatchOutcome::Ok
        }
        FunctionId::XtPushSgr => {
            terminal.push_sgr();
            DispatchOutcome::Ok
        }
        FunctionId::XtPopSgr => {
            terminal.pop_sgr();
            DispatchOutcome::Ok
        }
        FunctionId::XtReportColors => {
            let depth = terminal.palette_stack.depth();
            let reply = format!("\x1b[{depth};{depth}#Q");
            terminal.reply_buffer.extend_from_slice(reply.as_bytes());
            DispatchOutcome::Ok
        }
        FunctionId::DecRqmAnsi | FunctionId::DecRqm => {
            let mode = seq.raw_param(0).unwrap_or(0);
            let value = if spec.id == FunctionId::DecRqm {
                terminal.modes.query_dec_mode(mode)
            } else {
                terminal.modes.query_ansi_mode(mode)
            };
            let leader = if spec.id == FunctionId::DecRqm { "?" } else { "" };
            let reply = format!("\x1bP1$r{leader}{mode};{value}$q\x1b\\");
            terminal.reply_buffer.extend_from_slice(reply.as_bytes());
            DispatchOutcome::Ok
        }
        FunctionId::DecCara => {
            let origin_mode = terminal.modes.origin_mode();
            let top = seq.raw_param(0).unwrap_or(1).saturating_sub(1);
            let left = seq.raw_param(1).unwrap_or(1).saturating_sub(1);
            let bottom = seq.raw_param(2).unwrap_or(1).saturating_sub(1);
            let right = seq.raw_param(3).unwrap_or(1).saturating_sub(1);
            let sgr_params = &seq.parameters[4.min(seq.parameters.len())..];
            terminal
                .screen_mut()
                .change_attributes_in_rectangle(top, left, bottom, right, sgr_params, origin_mode);
            DispatchOutcome::Ok
        }
        FunctionId::DecRa => {
            let src_top = seq.raw_param(0).unwrap_or(1).saturating_sub(1);
            let src_left = seq.raw_param(1).unwrap_or(1).saturating_sub(1);
            let src_bottom = seq.raw_param(2).unwrap_or(1).saturating_sub(1);
            let src_right = seq.raw_param(3).unwrap_or(1).saturating_sub(1);
            let dst_top = seq.raw_param(4).unwrap_or(1).saturating_sub(1);
            let dst_left = seq.raw_param(5).unwrap_or(1).saturating_sub(1);
            terminal
                .screen_mut()
                .copy_rectangle(src_top, src_left, src_bottom, src_right, dst_top, dst_left);
            DispatchOutcome::Ok
        }
        FunctionId::DecFra => {
            let ch = char::from_u32(seq.raw_param(0).unwrap_or(32) as u32).unwrap_or(' ');
            let top = seq.raw_param(1).unwrap_or(1).saturating_sub(1);
            let left = seq.raw_param(2).unwrap_or(1).saturating_sub(1);
            let bottom = seq.raw_param(3).unwrap_or(1).saturating_sub(1);
            let right = seq.raw_param(4).unwrap_or(1).saturating_sub(1);
            terminal.screen_mut().fill_rectangle(ch, top, left, bottom, right);
            DispatchOutcome::Ok
        }
        FunctionId::DecEra => {
            let bg = terminal.bg_color();
            let top = seq.raw_param(0).unwrap_or(1).saturating_sub(1);
            let left = seq.raw_param(1).unwrap_or(1).saturating_sub(1);
            let bottom = seq.raw_param(2).unwrap_or(1).saturating_sub(1);
            let right = seq.raw_param(3).unwrap_or(1).saturating_sub(1);
            terminal.screen_mut().erase_rectangle(top, left, bottom, right, bg);
            DispatchOutcome::Ok
        }
        FunctionId::Da1 => {
            terminal.reply_buffer.extend_from_slice(b"\x1b[?62;4c");
            DispatchOutcome::Ok
        }
        FunctionId::Da2 => {
            terminal.reply_buffer.extend_from_slice(b"\x1b[>1;10;0c");
            DispatchOutcome::Ok
        }
        FunctionId::Da3 => {
            terminal.reply_buffer.extend_from_slice(b"\x1bP!|00000000\x1b\\");
            DispatchOutcome::Ok
        }
        FunctionId::XtCaptureBuffer => {
            let requested = seq.param(1, 0) as usize;
            let reply = build_capture_reply(terminal, requested);
            terminal.reply_buffer.extend_from_slice(&reply);
            DispatchOutcome::Ok
        }
        FunctionId::XtSmGraphics => DispatchOutcome::Unsupported,
        FunctionId::DecSm => {
            for group in &seq.parameters {
                if let Some(&p) = group.first() {
                    apply_dec_mode(terminal, p, true);
                }
            }
            DispatchOutcome::Ok
        }
        FunctionId::DecRm => {
            for group in &seq.parameters {
                if let Some(&p) = group.first() {
                    apply_dec_mode(terminal, p, false);
                }
            }
            DispatchOutcome::Ok
        }
        FunctionId::DecXcpr => {
            let s = terminal.screen();
            let reply = format!("\x1b[?{};{}R", s.cursor.row + 1, s.cursor.col + 1);
            terminal.reply_buffer.extend_from_slice(reply.as_bytes());
            DispatchOutcome::Ok
        }
        FunctionId::OscIconTitle | FunctionId::OscTitle => {
            let title = seq
                .osc_fields()
                .first()
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .unwrap_or_default();
            terminal.title = title;
            DispatchOutcome::Ok
        }
        FunctionId::OscSetPaletteColor => {
            let fields = seq.osc_fields();
            for pair in fields.chunks_exact(2) {
                if let (Ok(idx), Some(rgb)) = (
                    std::str::from_utf8(pair[0]).unwrap_or("").parse::<u8>(),
                    parse_xparsecolor(pair[1]),
                ) {
                    terminal.palette.set(idx, rgb);
                }
            }
            DispatchOutcome::Ok
        }
        FunctionId::OscHyperlink => {
            let fields = seq.osc_fields();
            let uri = fields.last().map(|f| String::from_utf8_lossy(f)).unwrap_or_default();
            if uri.is_empty() {
                terminal.current_hyperlink = 0;
            } else {
                terminal.current_hyperlink = terminal.hyperlinks.acquire(&uri);
            }
            DispatchOutcome::Ok
        }
        FunctionId::OscDynamicColor => DispatchOutcome::Unsupported,
        FunctionId::OscClipboard => DispatchOutcome::Unsupported,
        FunctionId::OscResetPaletteColor => {
            terminal.palette = crate::palette::ColorPalette::xterm_default();
            DispatchOutcome::Ok
        }
        FunctionId::OscNotify => DispatchOutcome::Unsupported,
        FunctionId::DecSixel | FunctionId::DecRqss => DispatchOutcome::Unsupported,
    }
}

fn apply_dec_mode(terminal: &mut Terminal, param: u16, enable: bool) {
    match param {
        47 => {
            if enable {
                terminal.enter_alt_screen(false, false);
            } else {
                terminal.leave_alt_screen(false, false);
            }
        }
        1047 => {
            if enable {
                terminal.enter_alt_screen(false, true);
            } else {
                terminal.leave_alt_screen(false, true);
            }
        }
        1049 => {
            if enable {
                terminal.enter_alt_screen(true, true);
            } else {
                terminal.leave_alt_screen(true, true);
            }
        }
        _ => terminal.modes.set_dec_mode(param, enable),
    }
}

/// Parses an `rgb:RRRR/GGGG/BBBB`-style `XParseColor` string (the form OSC
/// 4/10/11/... use), taking the high byte of each 16-bit channel.
fn parse_xparsecolor(field: &[u8]) -> Option<crate::palette::Rgb> {
    let s = std::str::from_utf8(field).ok()?;
    let rest = s.strip_prefix("rgb:")?;
    let mut channels = rest.split('/');
    let mut next_channel = || -> Option<u8> {
        let chan = channels.next()?;
        let hi = &chan[..chan.len().min(2)];
        u8::from_str_radix(hi, 16).ok()
    };
    let r = next_channel()?;
    let g = next_channel()?;
    let b = next_channel()?;
    Some(crate::palette::Rgb(r, g, b))
}

/// Resolve a completed DCS sequence. Recognizes DECRQSS (`$q`) and accepts
/// DECSIXEL (`q`) payloads without decoding them -- image decode is the host
/// adapter's job, this build has no mutable pixel buffer to hand it.
fn finish_dcs(terminal: &mut Terminal, dcs: DcsInProgress) -> DispatchOutcome {
    match (dcs.intermediates.as_slice(), dcs.final_byte) {
        (b"$", b'q') => {
            let reply = decrqss_reply(terminal, &dcs.payload);
            terminal.reply_buffer.extend_from_slice(&reply);
            DispatchOutcome::Ok
        }
        ([], b'q') => DispatchOutcome::Ok,
        _ => DispatchOutcome::Unsupported,
    }
}

/// `DCS 1 $ r <Pt> ST` for a recognized request, `DCS 0 $ r ST` otherwise.
fn decrqss_reply(terminal: &Terminal, payload: &[u8]) -> Vec<u8> {
    let body = match payload {
        b"m" => Some(build_sgr_reply(terminal)),
        b"r" => Some(build_decstbm_reply(terminal)),
        b" q" => Some(build_decscusr_reply(terminal)),
        _ => None,
    };
    let mut out = Vec::new();
    out.extend_from_slice(b"\x1bP");
    match body {
        Some(pt) => {
            out.extend_from_slice(b"1$r");
            out.extend_from_slice(&pt);
        }
        None => out.extend_from_slice(b"0$r"),
    }
    out.extend_from_slice(b"\x1b\\");
    out
}

fn build_sgr_reply(terminal: &Terminal) -> Vec<u8> {
    let attrs = terminal.screen().cursor.attrs;
    let mut codes = vec!["0".to_string()];
    let flags = attrs.flags;
    if flags.contains(SgrFlags::BOLD) {
        codes.push("1".into());
    }
    if flags.contains(SgrFlags::DIM) {
        codes.push("2".into());
    }
    if flags.contains(SgrFlags::ITALIC) {
        codes.push("3".into());
    }
    if flags.contains(SgrFlags::UNDERLINE) {
        codes.push("4".into());
    }
    if flags.contains(SgrFlags::BLINK) {
        codes.push("5".into());
    }
    if flags.contains(SgrFlags::INVERSE) {
        codes.push("7".into());
    }
    if flags.contains(SgrFlags::HIDDEN) {
        codes.push("8".into());
    }
    if flags.contains(SgrFlags::STRIKETHROUGH) {
        codes.push("9".into());
    }
    push_color_code(&mut codes, attrs.fg, false);
    push_color_code(&mut codes, attrs.bg, true);
    let mut out = codes.join(";").into_bytes();
    out.push(b'm');
    out
}

fn push_color_code(codes: &mut Vec<String>, color: Color, background: bool) {
    match color {
        Color::Default => {}
        Color::Named(n) if n < 8 => codes.push((if background { 40 } else { 30 } + n as u16).to_string()),
        Color::Named(n) => codes.push((if background { 100 } else { 90 } + (n - 8) as u16).to_string()),
        Color::Indexed(i) => codes.push(format!("{};5;{}", if background { 48 } else { 38 }, i)),
        Color::Rgb(r, g, b) => codes.push(format!("{};2;{};{};{}", if background { 48 } else { 38 }, r, g, b)),
    }
}

fn build_decstbm_reply(terminal: &Terminal) -> Vec<u8> {
    let cursor = &terminal.screen().cursor;
    format!("{};{}r", cursor.scroll_top() + 1, cursor.scroll_bottom() + 1).into_bytes()
}

fn build_decscusr_reply(terminal: &Terminal) -> Vec<u8> {
    let ps = match terminal.screen().cursor_shape {
        CursorShape::Block => 1,
        CursorShape::Underscore => 3,
        CursorShape::Bar => 5,
        CursorShape::Rectangle => 1,
    };
    format!("{ps} q").into_bytes()
}

/// Captures the last `count` lines of the combined scrollback+viewport
/// buffer, oldest first, trimmed of trailing blanks -- mirroring
/// `Screen::captureBuffer`'s line-oriented, oldest-first ordering.
fn build_capture_reply(terminal: &Terminal, count: usize) -> Vec<u8> {
    let screen = terminal.screen();
    let sb_len = screen.scrollback.len();
    let total = sb_len + screen.grid.rows() as usize;
    let count = count.min(total);
    let start = total - count;
    let mut body = String::new();
    for line in start..total {
        let text: String = if line < sb_len {
            screen
                .scrollback
                .get(line)
                .map(|row| {
                    row.cells
                        .iter()
                        .filter(|c| !c.is_wide_continuation())
                        .map(|c| c.content())
                        .collect()
                })
                .unwrap_or_default()
        } else {
            screen
                .grid
                .row_cells((line - sb_len) as u16)
                .map(|cells| {
                    cells
                        .iter()
                        .filter(|c| !c.is_wide_continuation())
                        .map(|c| c.content())
                        .collect()
                })
                .unwrap_or_default()
        };
        body.push_str(text.trim_end());
        body.push('\n');
    }
    let mut out = Vec::new();
    out.extend_from_slice(b"\x1bP314;");
    out.extend_from_slice(body.as_bytes());
    out.extend_from_slice(b"\x1b\\");
    out.extend_from_slice(b"\x1bP314;\x1b\\");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::Terminal;

    #[test]
    fn cup_moves_cursor_to_one_indexed_position() {
        let mut term = Terminal::new(80, 24, 100);
        term.feed(b"\x1b[5;10H");
        assert_eq!((term.screen().cursor.row, term.screen().cursor.col), (4, 9));
    }

    #[test]
    fn sgr_bold_sets_flag_and_persists_across_writes() {
        let mut term = Terminal::new(80, 24, 100);
        term.feed(b"\x1b[1mX");
        let cell = term.screen().grid.cell(0, 0).unwrap();
        assert!(cell.attrs.flags.contains(crate::cell::SgrFlags::BOLD));
    }

    #[test]
    fn dsr_cursor_position_report_is_one_indexed() {
        let mut term = Terminal::new(80, 24, 100);
        term.feed(b"\x1b[3;4H\x1b[6n");
        assert_eq!(term.take_replies(), b"\x1b[3;4R");
    }

    #[test]
    fn mode_1049_switches_screen_and_clears_alt() {
        let mut term = Terminal::new(10, 5, 100);
        term.feed(b"hello\x1b[?1049h");
        assert_eq!(term.active, crate::terminal::ScreenKind::Alternate);
        assert_eq!(term.screen().grid.cell(0, 0).unwrap().content(), ' ');
        term.feed(b"\x1b[?1049l");
        assert_eq!(term.active, crate::terminal::ScreenKind::Primary);
        assert_eq!(term.screen().grid.cell(0, 0).unwrap().content(), 'h');
    }

    #[test]
    fn deccara_with_no_sgr_params_resets_rectangle_attributes() {
        let mut term = Terminal::new(10, 5, 100);
        term.feed(b"\x1b[1mXX\x1b[0m");
        term.feed(b"\x1b[2;2;3;4$r");
        assert!(!term
            .screen()
            .grid
            .cell(0, 0)
            .unwrap()
            .attrs
            .flags
            .contains(crate::cell::SgrFlags::BOLD));
    }

    #[test]
    fn deccara_applies_rgb_bold_underline_to_rectangle_only() {
        let mut term = Terminal::new(5, 5, 100);
        term.feed(b"12345\r\n67890\r\nABCDE\r\nabcde\r\nfghij");
        term.feed(b"\x1b[2;3;4;5;1;38:2::171:178:191;4$r");

        for row in 1..4 {
            for col in 2..5 {
                let cell = term.screen().grid.cell(row, col).unwrap();
                assert_eq!(cell.attrs.fg, crate::cell::Color::Rgb(171, 178, 191));
                assert!(cell.attrs.flags.contains(crate::cell::SgrFlags::BOLD));
                assert!(cell.attrs.flags.contains(crate::cell::SgrFlags::UNDERLINE));
            }
        }
        // Outside the rectangle, untouched.
        let outside = term.screen().grid.cell(0, 0).unwrap();
        assert_eq!(outside.attrs.fg, crate::cell::Color::Default);
        assert!(!outside.attrs.flags.contains(crate::cell::SgrFlags::BOLD));
    }

    #[test]
    fn xtreportcolors_replies_with_palette_stack_depth() {
        let mut term = Terminal::new(10, 5, 100);
        term.feed(b"\x1b[2#P"); // XTPUSHCOLORS into slot 2: depth becomes 2
        term.feed(b"\x1b[#R"); // XTREPORTCOLORS
        assert_eq!(term.take_replies(), b"\x1b[2;2#Q");
    }

    #[test]
    fn xtpushsgr_xtpopsgr_round_trip_cursor_attributes() {
        let mut term = Terminal::new(10, 5, 100);
        term.feed(b"\x1b[1m"); // bold
        term.feed(b"\x1b[#{"); // XTPUSHSGR
        term.feed(b"\x1b[0m"); // reset cursor SGR
        assert!(!term
            .screen()
            .cursor
            .attrs
            .flags
            .contains(crate::cell::SgrFlags::BOLD));
        term.feed(b"\x1b[#}"); // XTPOPSGR
        assert!(term
            .screen()
            .cursor
            .attrs
            .flags
            .contains(crate::cell::SgrFlags::BOLD));
    }

    #[test]
    fn unknown_csi_final_byte_reports_unsupported() {
        let mut term = Terminal::new(10, 5, 100);
        let actions = term.parser.feed(b"\x1b[!z");
        let mut last = DispatchOutcome::Ok;
        for action in actions {
            last = dispatch_action(&mut term, action);
        }
        assert_eq!(last, DispatchOutcome::Unsupported);
    }

    #[test]
    fn capture_buffer_reports_last_n_lines_of_combined_buffer() {
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

    #[test]
    fn decrqss_sgr_round_trips_active_attributes() {
        let mut term = Terminal::new(10, 5, 100);
        term.feed(b"\x1b[1;4m");
        term.feed(b"\x1bP$qm\x1b\\");
        assert_eq!(term.take_replies(), b"\x1bP1$r0;1;4m\x1b\\".to_vec());
    }

    #[test]
    fn decrqss_unrecognized_request_replies_with_zero() {
        let mut term = Terminal::new(10, 5, 100);
        term.feed(b"\x1bP$qZZ\x1b\\");
        assert_eq!(term.take_replies(), b"\x1bP0$r\x1b\\".to_vec());
    }

    #[test]
    fn decsixel_payload_is_accepted_without_reply() {
        let mut term = Terminal::new(10, 5, 100);
        term.feed(b"\x1bPq#0;2;0;0;0#0~~\x1b\\");
        assert!(term.take_replies().is_empty());
    }
}
