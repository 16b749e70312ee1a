//! The in-flight `Sequence` the Sequencer assembles from `Parser` actions,
//! and the `FunctionSelector` used to look it up in the function table.

/// Which of the five VT sequence families (plus plain ESC) a sequence
/// belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Esc,
    Csi,
    Osc,
    Dcs,
    Apc,
    Pm,
}

/// A fully assembled sequence, ready to be resolved against the function
/// table and dispatched to the Screen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sequence {
    pub category: Option<Category>,
    pub leader: Option<u8>,
    pub parameters: Vec<Vec<u16>>,
    pub intermediates: Vec<u8>,
    pub final_byte: u8,
    /// Raw payload for OSC/DCS/APC/PM; empty for ESC/CSI.
    pub data_string: Vec<u8>,
}

impl Sequence {
    pub fn esc(intermediates: Vec<u8>, final_byte: u8) -> Self {
        Self {
            category: Some(Category::Esc),
            intermediates,
            final_byte,
            ..Default::default()
        }
    }

    pub fn csi(
        leader: Option<u8>,
        parameters: Vec<Vec<u16>>,
        intermediates: Vec<u8>,
        final_byte: u8,
    ) -> Self {
        Self {
            category: Some(Category::Csi),
            leader,
            parameters,
            intermediates,
            final_byte,
            ..Default::default()
        }
    }

    pub fn osc(data_string: Vec<u8>) -> Self {
        Self {
            category: Some(Category::Osc),
            data_string,
            ..Default::default()
        }
    }

    pub fn dcs(
        parameters: Vec<Vec<u16>>,
        intermediates: Vec<u8>,
        final_byte: u8,
        data_string: Vec<u8>,
    ) -> Self {
        Self {
            category: Some(Category::Dcs),
            parameters,
            intermediates,
            final_byte,
            data_string,
        }
    }

    pub fn apc(data_string: Vec<u8>) -> Self {
        Self {
            category: Some(Category::Apc),
            data_string,
            ..Default::default()
        }
    }

    pub fn pm(data_string: Vec<u8>) -> Self {
        Self {
            category: Some(Category::Pm),
            data_string,
            ..Default::default()
        }
    }

    /// First numeric parameter, or `default` if absent/empty/zero-valued
    /// per VT convention (an explicit `0` and an omitted parameter are the
    /// same "use the default" signal for most functions).
    pub fn param(&self, index: usize, default: u16) -> u16 {
        match self.parameters.get(index).and_then(|g| g.first()) {
            Some(0) | None => default,
            Some(v) => *v,
        }
    }

    /// Raw parameter value without the zero-means-default substitution
    /// (needed by functions like `DECSTBM` where `0` and omission differ
    /// from, say, an explicit `1`).
    pub fn raw_param(&self, index: usize) -> Option<u16> {
        self.parameters.get(index).and_then(|g| g.first()).copied()
    }

    pub fn sub_param(&self, index: usize, sub_index: usize, default: u16) -> u16 {
        self.parameters
            .get(index)
            .and_then(|g| g.get(sub_index))
            .copied()
            .unwrap_or(default)
    }

    /// The OSC numeric id: the first `;`-delimited field of the payload,
    /// parsed as a decimal integer.
    pub fn osc_id(&self) -> Option<u32> {
        let end = self
            .data_string
            .iter()
            .position(|&b| b == b';')
            .unwrap_or(self.data_string.len());
        std::str::from_utf8(&self.data_string[..end])
            .ok()?
            .parse()
            .ok()
    }

    /// OSC payload fields after the numeric id, split on `;`.
    pub fn osc_fields(&self) -> Vec<&[u8]> {
        let mut parts = self.data_string.split(|&b| b == b';');
        parts.next();
        parts.collect()
    }

    pub fn selector(&self) -> FunctionSelector {
        let category = self.category.unwrap_or(Category::Esc);
        let argc = if category == Category::Osc {
            self.osc_id().unwrap_or(0) as i32
        } else {
            -1
        };
        FunctionSelector {
            category,
            leader: self.leader,
            argc,
            intermediate: self.intermediates.first().copied(),
            final_byte: self.final_byte,
        }
    }
}

/// Lookup key into the static function table. `argc` is only meaningful for
/// `Category::Osc`, where it carries the numeric OSC id; for every other
/// category it is `-1` and ignored by the ordering/lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FunctionSelector {
    pub category: Category,
    pub leader: Option<u8>,
    pub argc: i32,
    pub intermediate: Option<u8>,
    pub final_byte: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_defaults_on_omission_and_explicit_zero() {
        let seq = Sequence::csi(None, vec![vec![0]], vec![], b'A');
        assert_eq!(seq.param(0, 1), 1);
        let seq = Sequence::csi(None, vec![], vec![], b'A');
        assert_eq!(seq.param(0, 1), 1);
    }

    #[test]
    fn param_returns_explicit_nonzero_value() {
        let seq = Sequence::csi(None, vec![vec![5]], vec![], b'A');
        assert_eq!(seq.param(0, 1), 5);
    }

    #[test]
    fn osc_id_and_fields_split_on_semicolon() {
        let seq = Sequence::osc(b"8;id=1;http://example".to_vec());
        assert_eq!(seq.osc_id(), Some(8));
        assert_eq!(seq.osc_fields(), vec![b"id=1".as_slice(), b"http://example"]);
    }

    #[test]
    fn selector_uses_osc_id_as_argc() {
        let seq = Sequence::osc(b"52;c;Zm9v".to_vec());
        let sel = seq.selector();
        assert_eq!(sel.category, Category::Osc);
        assert_eq!(sel.argc, 52);
    }

    #[test]
    fn selector_for_csi_ignores_argc() {
        let seq = Sequence::csi(Some(b'?'), vec![vec![25]], vec![], b'h');
        let sel = seq.selector();
        assert_eq!(sel.argc, -1);
        assert_eq!(sel.leader, Some(b'?'));
        assert_eq!(sel.final_byte, b'h');
    }
}
