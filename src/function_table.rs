//! Static registry of ESC/CSI/OSC/DCS functions.
//!
//! `FUNCTION_TABLE` is a compile-time array ordered by the same key the
//! Sequencer builds a `FunctionSelector` from: `(category, leader, argc,
//! intermediate, final)`. Lookup is `binary_search_by_key` over that tuple.
//! APC/PM sequences carry no function-table entries: the Sequencer forwards
//! their raw payload straight to the Screen rather than resolving a
//! selector, since nothing in this coverage uses them as anything but an
//! opaque passthrough channel.

use crate::sequence::{Category, FunctionSelector};

/// Conformance tier a function is associated with, mirroring `DECSCL`'s
/// levels loosely (exact values matter less than the ordering: something
/// VT100-level should never be reported as requiring VT400+).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConformanceLevel {
    Vt100,
    Vt200,
    Vt400,
    Xterm,
}

/// Which concrete operation a `FunctionSpec` names. The Sequencer matches
/// on this to dispatch into `Screen`/`Terminal` rather than re-parsing the
/// mnemonic string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::enum_variant_names)]
pub enum FunctionId {
    // ESC
    DecSc,
    DecRc,
    Ind,
    Nel,
    Hts,
    Ri,
    Ss2,
    Ss3,
    Ls2,
    Ls3,
    Ls1r,
    Ls2r,
    Ls3r,
    Ris,
    DecAln,
    ScsG0,
    ScsG1,
    ScsG2,
    ScsG3,
    // CSI, no leader, no intermediate
    Ich,
    Cuu,
    Cud,
    Cuf,
    Cub,
    Cnl,
    Cpl,
    Cha,
    Cup,
    Cht,
    Ed,
    El,
    Il,
    Dl,
    Dch,
    Su,
    Sd,
    Ech,
    Cbt,
    Hpa,
    Hpr,
    Da1,
    Vpa,
    Vpr,
    Hvp,
    Tbc,
    Sm,
    Rm,
    Sgr,
    Dsr,
    DecStbm,
    DecSlrm,
    XtWinOps,
    ScoRc,
    // CSI, no leader, with intermediate
    DecScusr,
    DecStr,
    DecScl,
    DecSca,
    XtPushColors,
    XtPopColors,
    XtReportColors,
    XtPushSgr,
    XtPopSgr,
    DecRqmAnsi,
    DecCara,
    DecRa,
    DecFra,
    DecEra,
    // CSI leader '=' / '>'
    Da3,
    Da2,
    XtCaptureBuffer,
    // CSI leader '?'
    XtSmGraphics,
    DecSm,
    DecRm,
    DecXcpr,
    DecRqm,
    // OSC
    OscIconTitle,
    OscTitle,
    OscSetPaletteColor,
    OscHyperlink,
    OscDynamicColor,
    OscClipboard,
    OscResetPaletteColor,
    OscNotify,
    // DCS
    DecSixel,
    DecRqss,
}

#[derive(Debug, Clone, Copy)]
pub struct FunctionSpec {
    pub category: Category,
    pub leader: Option<u8>,
    pub argc: i32,
    pub intermediate: Option<u8>,
    pub final_byte: u8,
    pub min_params: u8,
    pub max_params: u8,
    pub conformance_level: ConformanceLevel,
    pub mnemonic: &'static str,
    pub description: &'static str,
    pub id: FunctionId,
}

impl FunctionSpec {
    const fn key(&self) -> (u8, i32, i32, i32, u8) {
        let leader = match self.leader {
            None => -1,
            Some(b) => b as i32,
        };
        let intermediate = match self.intermediate {
            None => -1,
            Some(b) => b as i32,
        };
        (self.category as u8, leader, self.argc, intermediate, self.final_byte)
    }

    pub fn selector(&self) -> FunctionSelector {
        FunctionSelector {
            category: self.category,
            leader: self.leader,
            argc: self.argc,
            intermediate: self.intermediate,
            final_byte: self.final_byte,
        }
    }
}

macro_rules! spec {
    ($cat:expr, $leader:expr, $argc:expr, $inter:expr, $final:expr, $min:expr, $max:expr, $conf:expr, $mnem:expr, $desc:expr, $id:expr) => {
        FunctionSpec {
            category: $cat,
            leader: $leader,
            argc: $argc,
            intermediate: $inter,
            final_byte: $final,
            min_params: $min,
            max_params: $max,
            conformance_level: $conf,
            mnemonic: $mnem,
            description: $desc,
            id: $id,
        }
    };
}

use Category::{Csi, Dcs, Esc, Osc};
use ConformanceLevel::{Vt100, Vt200, Vt400, Xterm};
use FunctionId::*;

/// Entries are declared in `FunctionSpec::key()` order; `tests::table_is_sorted`
/// is the guard against a misordered insertion.
pub static FUNCTION_TABLE: &[FunctionSpec] = &[
    // ---- ESC ----
    spec!(Esc, None, -1, None, b'7', 0, 0, Vt100, "DECSC", "save cursor", DecSc),
    spec!(Esc, None, -1, None, b'8', 0, 0, Vt100, "DECRC", "restore cursor", DecRc),
    spec!(Esc, None, -1, None, b'D', 0, 0, Vt100, "IND", "index", Ind),
    spec!(Esc, None, -1, None, b'E', 0, 0, Vt100, "NEL", "next line", Nel),
    spec!(Esc, None, -1, None, b'H', 0, 0, Vt100, "HTS", "horizontal tab set", Hts),
    spec!(Esc, None, -1, None, b'M', 0, 0, Vt100, "RI", "reverse index", Ri),
    spec!(Esc, None, -1, None, b'N', 0, 0, Vt100, "SS2", "single shift 2", Ss2),
    spec!(Esc, None, -1, None, b'O', 0, 0, Vt100, "SS3", "single shift 3", Ss3),
    spec!(Esc, None, -1, None, b'c', 0, 0, Vt100, "RIS", "reset to initial state", Ris),
    spec!(Esc, None, -1, None, b'n', 0, 0, Vt200, "LS2", "locking shift 2", Ls2),
    spec!(Esc, None, -1, None, b'o', 0, 0, Vt200, "LS3", "locking shift 3", Ls3),
    spec!(Esc, None, -1, None, b'|', 0, 0, Vt200, "LS3R", "locking shift 3 right", Ls3r),
    spec!(Esc, None, -1, None, b'}', 0, 0, Vt200, "LS2R", "locking shift 2 right", Ls2r),
    spec!(Esc, None, -1, None, b'~', 0, 0, Vt200, "LS1R", "locking shift 1 right", Ls1r),
    spec!(Esc, None, -1, Some(b'#'), b'8', 0, 0, Vt100, "DECALN", "screen alignment test", DecAln),
    spec!(Esc, None, -1, Some(b'('), b'0', 0, 0, Vt100, "SCS G0 special", "designate G0 charset", ScsG0),
    spec!(Esc, None, -1, Some(b'('), b'B', 0, 0, Vt100, "SCS G0 ascii", "designate G0 charset", ScsG0),
    spec!(Esc, None, -1, Some(b')'), b'0', 0, 0, Vt100, "SCS G1 special", "designate G1 charset", ScsG1),
    spec!(Esc, None, -1, Some(b')'), b'B', 0, 0, Vt100, "SCS G1 ascii", "designate G1 charset", ScsG1),
    spec!(Esc, None, -1, Some(b'*'), b'0', 0, 0, Vt200, "SCS G2 special", "designate G2 charset", ScsG2),
    spec!(Esc, None, -1, Some(b'*'), b'B', 0, 0, Vt200, "SCS G2 ascii", "designate G2 charset", ScsG2),
    spec!(Esc, None, -1, Some(b'+'), b'0', 0, 0, Vt200, "SCS G3 special", "designate G3 charset", ScsG3),
    spec!(Esc, None, -1, Some(b'+'), b'B', 0, 0, Vt200, "SCS G3 ascii", "designate G3 charset", ScsG3),
    // ---- CSI, no leader, no intermediate ----
    spec!(Csi, None, -1, None, b'@', 0, 1, Vt100, "ICH", "insert character", Ich),
    spec!(Csi, None, -1, None, b'A', 0, 1, Vt100, "CUU", "cursor up", Cuu),
    spec!(Csi, None, -1, None, b'B', 0, 1, Vt100, "CUD", "cursor down", Cud),
    spec!(Csi, None, -1, None, b'C', 0, 1, Vt100, "CUF", "cursor forward", Cuf),
    spec!(Csi, None, -1, None, b'D', 0, 1, Vt100, "CUB", "cursor backward", Cub),
    spec!(Csi, None, -1, None, b'E', 0, 1, Vt200, "CNL", "cursor next line", Cnl),
    spec!(Csi, None, -1, None, b'F', 0, 1, Vt200, "CPL", "cursor previous line", Cpl),
    spec!(Csi, None, -1, None, b'G', 0, 1, Vt100, "CHA", "cursor horizontal absolute", Cha),
    spec!(Csi, None, -1, None, b'H', 0, 2, Vt100, "CUP", "cursor position", Cup),
    spec!(Csi, None, -1, None, b'I', 0, 1, Vt200, "CHT", "cursor horizontal tab", Cht),
    spec!(Csi, None, -1, None, b'J', 0, 1, Vt100, "ED", "erase in display", Ed),
    spec!(Csi, None, -1, None, b'K', 0, 1, Vt100, "EL", "erase in line", El),
    spec!(Csi, None, -1, None, b'L', 0, 1, Vt100, "IL", "insert line", Il),
    spec!(Csi, None, -1, None, b'M', 0, 1, Vt100, "DL", "delete line", Dl),
    spec!(Csi, None, -1, None, b'P', 0, 1, Vt100, "DCH", "delete character", Dch),
    spec!(Csi, None, -1, None, b'S', 0, 1, Vt100, "SU", "scroll up", Su),
    spec!(Csi, None, -1, None, b'T', 0, 1, Vt100, "SD", "scroll down", Sd),
    spec!(Csi, None, -1, None, b'X', 0, 1, Vt200, "ECH", "erase character", Ech),
    spec!(Csi, None, -1, None, b'Z', 0, 1, Vt200, "CBT", "cursor backward tab", Cbt),
    spec!(Csi, None, -1, None, b'`', 0, 1, Vt200, "HPA", "horizontal position absolute", Hpa),
    spec!(Csi, None, -1, None, b'a', 0, 1, Vt200, "HPR", "horizontal position relative", Hpr),
    spec!(Csi, None, -1, None, b'c', 0, 1, Vt100, "DA1", "primary device attributes", Da1),
    spec!(Csi, None, -1, None, b'd', 0, 1, Vt200, "VPA", "vertical position absolute", Vpa),
    spec!(Csi, None, -1, None, b'e', 0, 1, Vt200, "VPR", "vertical position relative", Vpr),
    spec!(Csi, None, -1, None, b'f', 0, 2, Vt100, "HVP", "horizontal/vertical position", Hvp),
    spec!(Csi, None, -1, None, b'g', 0, 1, Vt100, "TBC", "tab clear", Tbc),
    spec!(Csi, None, -1, None, b'h', 1, 16, Vt100, "SM", "set mode", Sm),
    spec!(Csi, None, -1, None, b'l', 1, 16, Vt100, "RM", "reset mode", Rm),
    spec!(Csi, None, -1, None, b'm', 0, 16, Vt100, "SGR", "select graphic rendition", Sgr),
    spec!(Csi, None, -1, None, b'n', 1, 1, Vt100, "DSR", "device status report", Dsr),
    spec!(Csi, None, -1, None, b'r', 0, 2, Vt100, "DECSTBM", "set top/bottom margins", DecStbm),
    spec!(Csi, None, -1, None, b's', 0, 2, Vt400, "DECSLRM", "set left/right margins", DecSlrm),
    spec!(Csi, None, -1, None, b't', 1, 3, Xterm, "XTWINOPS", "window manipulation", XtWinOps),
    spec!(Csi, None, -1, None, b'u', 0, 0, Xterm, "SCORC", "restore cursor (SCO)", ScoRc),
    // ---- CSI, no leader, with intermediate ----
    spec!(Csi, None, -1, Some(b' '), b'q', 0, 1, Xterm, "DECSCUSR", "set cursor style", DecScusr),
    spec!(Csi, None, -1, Some(b'!'), b'p', 0, 0, Vt400, "DECSTR", "soft terminal reset", DecStr),
    spec!(Csi, None, -1, Some(b'"'), b'p', 0, 2, Vt200, "DECSCL", "select conformance level", DecScl),
    spec!(Csi, None, -1, Some(b'"'), b'q', 0, 1, Vt200, "DECSCA", "select character protection", DecSca),
    spec!(Csi, None, -1, Some(b'#'), b'P', 0, 1, Xterm, "XTPUSHCOLORS", "push palette", XtPushColors),
    spec!(Csi, None, -1, Some(b'#'), b'Q', 0, 1, Xterm, "XTPOPCOLORS", "pop palette", XtPopColors),
    spec!(Csi, None, -1, Some(b'#'), b'R', 0, 0, Xterm, "XTREPORTCOLORS", "report palette stack", XtReportColors),
    spec!(Csi, None, -1, Some(b'#'), b'{', 0, 0, Xterm, "XTPUSHSGR", "push SGR", XtPushSgr),
    spec!(Csi, None, -1, Some(b'#'), b'}', 0, 0, Xterm, "XTPOPSGR", "pop SGR", XtPopSgr),
    spec!(Csi, None, -1, Some(b'$'), b'p', 1, 1, Vt400, "DECRQM", "request mode (ANSI)", DecRqmAnsi),
    spec!(Csi, None, -1, Some(b'$'), b'r', 5, 6, Vt400, "DECCARA", "change attributes in rectangle", DecCara),
    spec!(Csi, None, -1, Some(b'$'), b'v', 6, 6, Vt400, "DECRA", "copy rectangular area", DecRa),
    spec!(Csi, None, -1, Some(b'$'), b'x', 5, 6, Vt400, "DECFRA", "fill rectangular area", DecFra),
    spec!(Csi, None, -1, Some(b'$'), b'z', 4, 5, Vt400, "DECERA", "erase rectangular area", DecEra),
    // ---- CSI, leader '=' / '>' ----
    spec!(Csi, Some(b'='), -1, None, b'c', 0, 1, Vt200, "DA3", "tertiary device attributes", Da3),
    spec!(Csi, Some(b'>'), -1, None, b'c', 0, 1, Vt200, "DA2", "secondary device attributes", Da2),
    spec!(Csi, Some(b'>'), -1, None, b't', 0, 2, Xterm, "XTCAPTURE", "capture screen/scrollback buffer", XtCaptureBuffer),
    // ---- CSI, leader '?' ----
    spec!(Csi, Some(b'?'), -1, None, b'S', 1, 3, Xterm, "XTSMGRAPHICS", "graphics attributes", XtSmGraphics),
    spec!(Csi, Some(b'?'), -1, None, b'h', 1, 16, Vt200, "DECSM", "DEC private set mode", DecSm),
    spec!(Csi, Some(b'?'), -1, None, b'l', 1, 16, Vt200, "DECRM", "DEC private reset mode", DecRm),
    spec!(Csi, Some(b'?'), -1, None, b'n', 1, 1, Vt200, "DECXCPR", "extended cursor position report", DecXcpr),
    spec!(Csi, Some(b'?'), -1, Some(b'$'), b'p', 1, 1, Vt400, "DECRQM", "request mode (DEC)", DecRqm),
    // ---- OSC ----
    spec!(Osc, None, 0, None, 0, 0, 2, Xterm, "OSC 0", "set icon name + window title", OscIconTitle),
    spec!(Osc, None, 2, None, 0, 0, 1, Xterm, "OSC 2", "set window title", OscTitle),
    spec!(Osc, None, 4, None, 0, 0, 2, Xterm, "OSC 4", "set palette color", OscSetPaletteColor),
    spec!(Osc, None, 8, None, 0, 0, 2, Xterm, "OSC 8", "hyperlink", OscHyperlink),
    spec!(Osc, None, 10, None, 0, 0, 1, Xterm, "OSC 10", "set/query foreground color", OscDynamicColor),
    spec!(Osc, None, 11, None, 0, 0, 1, Xterm, "OSC 11", "set/query background color", OscDynamicColor),
    spec!(Osc, None, 12, None, 0, 0, 1, Xterm, "OSC 12", "set/query cursor color", OscDynamicColor),
    spec!(Osc, None, 17, None, 0, 0, 1, Xterm, "OSC 17", "set/query highlight bg color", OscDynamicColor),
    spec!(Osc, None, 19, None, 0, 0, 1, Xterm, "OSC 19", "set/query highlight fg color", OscDynamicColor),
    spec!(Osc, None, 52, None, 0, 0, 2, Xterm, "OSC 52", "clipboard access", OscClipboard),
    spec!(Osc, None, 104, None, 0, 0, 1, Xterm, "OSC 104", "reset palette color", OscResetPaletteColor),
    spec!(Osc, None, 110, None, 0, 0, 0, Xterm, "OSC 110", "reset foreground color", OscResetPaletteColor),
    spec!(Osc, None, 111, None, 0, 0, 0, Xterm, "OSC 111", "reset background color", OscResetPaletteColor),
    spec!(Osc, None, 112, None, 0, 0, 0, Xterm, "OSC 112", "reset cursor color", OscResetPaletteColor),
    spec!(Osc, None, 117, None, 0, 0, 0, Xterm, "OSC 117", "reset highlight bg color", OscResetPaletteColor),
    spec!(Osc, None, 119, None, 0, 0, 0, Xterm, "OSC 119", "reset highlight fg color", OscResetPaletteColor),
    spec!(Osc, None, 777, None, 0, 0, 2, Xterm, "OSC 777", "desktop notification", OscNotify),
    // ---- DCS ----
    spec!(Dcs, None, -1, None, b'q', 0, 6, Vt400, "DECSIXEL", "sixel graphics", DecSixel),
    spec!(Dcs, None, -1, Some(b'$'), b'q', 0, 0, Vt400, "DECRQSS", "request status string", DecRqss),
];

/// Binary search over `FUNCTION_TABLE` by `FunctionSelector`.
pub fn lookup(selector: &FunctionSelector) -> Option<&'static FunctionSpec> {
    let needle = (
        selector.category as u8,
        match selector.leader {
            None => -1,
            Some(b) => b as i32,
        },
        selector.argc,
        match selector.intermediate {
            None => -1,
            Some(b) => b as i32,
        },
        selector.final_byte,
    );
    FUNCTION_TABLE
        .binary_search_by_key(&needle, FunctionSpec::key)
        .ok()
        .map(|i| &FUNCTION_TABLE[i])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_by_key() {
        for w in FUNCTION_TABLE.windows(2) {
            assert!(
                w[0].key() < w[1].key(),
                "table out of order at {:?} -> {:?}",
                w[0].mnemonic,
                w[1].mnemonic
            );
        }
    }

    #[test]
    fn lookup_finds_cup() {
        let sel = FunctionSelector {
            category: Category::Csi,
            leader: None,
            argc: -1,
            intermediate: None,
            final_byte: b'H',
        };
        let spec = lookup(&sel).expect("CUP should resolve");
        assert_eq!(spec.mnemonic, "CUP");
        assert!(matches!(spec.id, FunctionId::Cup));
    }

    #[test]
    fn lookup_finds_dec_private_mode_set() {
        let sel = FunctionSelector {
            category: Category::Csi,
            leader: Some(b'?'),
            argc: -1,
            intermediate: None,
            final_byte: b'h',
        };
        let spec = lookup(&sel).expect("DECSM should resolve");
        assert_eq!(spec.mnemonic, "DECSM");
    }

    #[test]
    fn lookup_finds_osc_hyperlink_by_argc() {
        let sel = FunctionSelector {
            category: Category::Osc,
            leader: None,
            argc: 8,
            intermediate: None,
            final_byte: 0,
        };
        let spec = lookup(&sel).expect("OSC 8 should resolve");
        assert!(matches!(spec.id, FunctionId::OscHyperlink));
    }

    #[test]
    fn lookup_misses_unknown_final_byte() {
        let sel = FunctionSelector {
            category: Category::Csi,
            leader: None,
            argc: -1,
            intermediate: None,
            final_byte: b'!',
        };
        assert!(lookup(&sel).is_none());
    }

    #[test]
    fn unused_conformance_ordering_is_monotonic() {
        assert!(Vt100 < Vt200);
        assert!(Vt200 < Vt400);
        assert!(Vt400 < Xterm);
    }
}
