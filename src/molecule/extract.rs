use rust_htslib::bam::record::Aux;
use rust_htslib::bam::record::Record as BamRecord;
use thiserror::Error;

/// Separator inside composite molecule keys. Must not occur in cell labels,
/// barcode ordinals or gene names; this is a constraint on the input tags
/// and is not checked at runtime.
pub const KEY_SEPARATOR: &str = "::";

/// Corrected cell label
pub const TAG_CELL: &str = "CN";
/// Barcode ordinal / UMI token
pub const TAG_BARCODE_ORDINAL: &str = "BO";
/// Gene or equivalence class
pub const TAG_GENE: &str = "XT";

///////////////////////////////
/// A record that cannot yield a molecule key. Recoverable; the caller
/// decides whether to skip the record or abort the run. Must never be
/// treated as an empty key.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("record is missing required tag {0}")]
    MissingTag(&'static str),
    #[error("tag {0} does not hold a string value")]
    BadTagType(&'static str),
}

/// Identity of one molecule observation in count mode
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoleculeKey {
    pub cell: String,
    pub umi_key: String,
}

/// Positional variant: the chromosome becomes part of the umi key and the
/// 0-based alignment position is carried alongside
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PosMoleculeKey {
    pub cell: String,
    pub umi_key: String,
    pub pos: i64,
}

///////////////////////////////
/// Read one required string tag from a record
pub fn aux_string(record: &BamRecord, tag: &'static str) -> Result<String, ExtractError> {
    match record.aux(tag.as_bytes()) {
        Ok(Aux::String(value)) => Ok(value.to_string()),
        Ok(_) => Err(ExtractError::BadTagType(tag)),
        Err(_) => Err(ExtractError::MissingTag(tag)),
    }
}

///////////////////////////////
/// Count-mode key: cell from CN, umi key BO::gene
pub fn molecule_key(record: &BamRecord) -> Result<MoleculeKey, ExtractError> {
    let cell = aux_string(record, TAG_CELL)?;
    let ordinal = aux_string(record, TAG_BARCODE_ORDINAL)?;
    let gene = aux_string(record, TAG_GENE)?;

    Ok(MoleculeKey {
        cell,
        umi_key: format!("{}{}{}", ordinal, KEY_SEPARATOR, gene),
    })
}

///////////////////////////////
/// Positional key: umi key BO::chrom::gene plus the alignment position.
/// The caller resolves the chromosome name from the header.
pub fn positional_key(record: &BamRecord, chrom: &str) -> Result<PosMoleculeKey, ExtractError> {
    let cell = aux_string(record, TAG_CELL)?;
    let ordinal = aux_string(record, TAG_BARCODE_ORDINAL)?;
    let gene = aux_string(record, TAG_GENE)?;

    Ok(PosMoleculeKey {
        cell,
        umi_key: format!(
            "{}{}{}{}{}",
            ordinal, KEY_SEPARATOR, chrom, KEY_SEPARATOR, gene
        ),
        pos: record.pos(),
    })
}
