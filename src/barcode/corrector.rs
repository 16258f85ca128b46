use super::whitelist::Whitelist;

/// Label given to reads whose barcode could not be matched
pub const UNMATCHED_LABEL: &str = "Cell_unmatched";

///////////////////////////////
/// Outcome of correcting one raw barcode. Unmatched is a normal outcome
/// meaning "no confident whitelist match", not an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CorrectionResult {
    Matched(String),
    Unmatched,
}

impl CorrectionResult {
    /// The matched label, or the unmatched sentinel
    pub fn label(&self) -> &str {
        match self {
            CorrectionResult::Matched(label) => label,
            CorrectionResult::Unmatched => UNMATCHED_LABEL,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, CorrectionResult::Matched(_))
    }
}

///////////////////////////////
/// Something that can resolve a raw barcode to a whitelist label.
///
/// The brute-force matcher below is O(whitelist size * barcode length) per
/// unmatched read, fine for whitelists in the thousands since exact matches
/// dominate. An indexed matcher (BK-tree, banded edit distance) can slot in
/// behind this trait without touching any caller.
pub trait BarcodeMatcher {
    fn correct(&self, raw: &str) -> CorrectionResult;
}

///////////////////////////////
/// Exact lookup first, then a single-substitution scan over the whole
/// whitelist.
///
/// When several whitelist sequences are exactly one substitution away, the
/// last one wins, and "last" means last in whitelist file order. Reordering
/// the whitelist file (sorting it by sequence, say) can therefore change
/// which label a tied barcode corrects to.
pub struct HammingMatcher<'a> {
    whitelist: &'a Whitelist,
}

impl<'a> HammingMatcher<'a> {
    pub fn new(whitelist: &'a Whitelist) -> HammingMatcher<'a> {
        HammingMatcher { whitelist }
    }
}

impl BarcodeMatcher for HammingMatcher<'_> {
    fn correct(&self, raw: &str) -> CorrectionResult {
        //Fast path: most barcodes match exactly
        if let Some(label) = self.whitelist.lookup(raw) {
            return CorrectionResult::Matched(label.to_string());
        }

        //Scan every whitelist sequence for one exactly a single substitution
        //away. Distances of 2+ never qualify. Among several distance-1
        //candidates the last one in whitelist file order wins, so the
        //resolution of a tie depends on how the whitelist file is sorted.
        let mut best: Option<&str> = None;
        for entry in self.whitelist.iter() {
            if hamming_distance(raw, &entry.seq) == Some(1) {
                best = Some(&entry.label);
            }
        }

        match best {
            Some(label) => CorrectionResult::Matched(label.to_string()),
            None => CorrectionResult::Unmatched,
        }
    }
}

///////////////////////////////
/// Hamming distance between two sequences. Only defined for sequences of
/// equal length; pairs of differing length return None and take no part in
/// the distance-1 search.
pub fn hamming_distance(a: &str, b: &str) -> Option<u32> {
    if a.len() != b.len() {
        return None;
    }
    let dist = a.bytes().zip(b.bytes()).filter(|(x, y)| x != y).count();
    Some(dist as u32)
}
