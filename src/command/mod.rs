pub mod count_barcodes;
pub mod demultiplex;
pub mod hamming_hist;
pub mod molecule_info;
pub mod molecule_position;
pub mod tag;

pub use count_barcodes::{CountBarcodes, CountBarcodesCMD};
pub use demultiplex::{Demultiplex, DemultiplexCMD};
pub use hamming_hist::{HammingHist, HammingHistCMD};
pub use molecule_info::{MoleculeInfo, MoleculeInfoCMD};
pub use molecule_position::{MoleculePosition, MoleculePositionCMD};
pub use tag::{TagBam, TagCMD};

///////////////////////////////
/// Totals from one pass over a record stream. Skipped records are part of
/// the total; they are recoverable per-record issues, reported once as a
/// summary rather than one line per occurrence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub num_reads: u64,
    pub num_skipped: u64,
}
