/// Replace source bytes `[start..end)` with `replacement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    /// Byte offset, inclusive.
    pub start: usize,
    /// Byte offset, exclusive.
    pub end: usize,
    pub replacement: String,
    pub cop_name: &'static str,
    /// Registry index of the cop; the lower index wins a tie.
    pub cop_index: usize,
}

/// Non-overlapping corrections sorted by start offset.
///
/// When two corrections overlap the one that starts first is kept and the
/// other is dropped; it gets another chance on the next autocorrect pass.
#[derive(Debug)]
pub struct CorrectionSet {
    corrections: Vec<Correction>,
}

impl CorrectionSet {
    pub fn from_vec(mut raw: Vec<Correction>) -> Self {
        raw.sort_by(|a, b| a.start.cmp(&b.start).then(a.cop_index.cmp(&b.cop_index)));

        let mut accepted: Vec<Correction> = Vec::with_capacity(raw.len());
        for c in raw {
            if accepted.last().is_some_and(|last| c.start < last.end) {
                continue;
            }
            accepted.push(c);
        }
        Self {
            corrections: accepted,
        }
    }

    /// Splice every correction into `source` in one linear pass.
    pub fn apply(&self, source: &[u8]) -> Vec<u8> {
        let mut result = Vec::with_capacity(source.len());
        let mut cursor = 0;
        for c in &self.corrections {
            result.extend_from_slice(&source[cursor..c.start]);
            result.extend_from_slice(c.replacement.as_bytes());
            cursor = c.end;
        }
        result.extend_from_slice(&source[cursor..]);
        result
    }

    pub fn is_empty(&self) -> bool {
        self.corrections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.corrections.len()
    }
}
