pub mod corrector;
pub mod whitelist;

pub use corrector::hamming_distance;
pub use corrector::BarcodeMatcher;
pub use corrector::CorrectionResult;
pub use corrector::HammingMatcher;
pub use corrector::UNMATCHED_LABEL;

pub use whitelist::Whitelist;
pub use whitelist::WhitelistEntry;
