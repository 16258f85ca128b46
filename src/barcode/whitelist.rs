use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::Context;

///////////////////////////////
/// One whitelist entry: barcode sequence and the cell/sample label it maps to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WhitelistEntry {
    pub seq: String,
    pub label: String,
}

///////////////////////////////
/// Whitelist of valid cell barcodes, loaded from a TSV of label<TAB>sequence.
///
/// Entries are kept in file order so that the distance-1 fallback scan is
/// deterministic; a map on the side serves the exact-match fast path.
pub struct Whitelist {
    entries: Vec<WhitelistEntry>,
    seq_to_index: HashMap<String, usize>,
}

///////////////////////////////
/// For serialization: one row in a whitelist TSV file
#[derive(Debug, serde::Deserialize)]
struct WhitelistFileRow {
    label: String,
    seq: String,
}

impl Whitelist {
    pub fn new() -> Whitelist {
        Whitelist {
            entries: vec![],
            seq_to_index: HashMap::new(),
        }
    }

    ///////////////////////////////
    /// Load a whitelist from a file. Any malformed line aborts the load;
    /// a partially built whitelist would silently change correction results,
    /// so skipping bad lines is not an option.
    pub fn from_path(path: &Path) -> anyhow::Result<Whitelist> {
        let file = File::open(path)
            .with_context(|| format!("could not open whitelist file {}", path.display()))?;
        Whitelist::from_reader(file)
    }

    pub fn from_reader(src: impl Read) -> anyhow::Result<Whitelist> {
        let mut whitelist = Whitelist::new();

        //Plain tab-separated fields, no header, no quoting or escaping
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .quoting(false)
            .from_reader(src);
        for (line_num, result) in reader.deserialize().enumerate() {
            let row: WhitelistFileRow = result
                .with_context(|| format!("malformed whitelist line {}", line_num + 1))?;
            whitelist.insert(row.seq, row.label);
        }

        if whitelist.is_empty() {
            log::warn!("whitelist is empty");
        }
        Ok(whitelist)
    }

    ///////////////////////////////
    /// Barcode sequences are unique keys. A duplicate sequence keeps its
    /// original position in the scan order but takes the new label
    /// (last write wins).
    pub fn insert(&mut self, seq: String, label: String) {
        if let Some(&index) = self.seq_to_index.get(&seq) {
            self.entries[index].label = label;
        } else {
            self.seq_to_index.insert(seq.clone(), self.entries.len());
            self.entries.push(WhitelistEntry { seq, label });
        }
    }

    /// Exact lookup of a barcode sequence
    pub fn lookup(&self, seq: &str) -> Option<&str> {
        self.seq_to_index
            .get(seq)
            .map(|&index| self.entries[index].label.as_str())
    }

    /// All entries, in insertion (file) order
    pub fn iter(&self) -> impl Iterator<Item = &WhitelistEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Length of the first barcode. Whitelist barcodes are fixed-length,
    /// so this is the length of all of them.
    pub fn barcode_len(&self) -> Option<usize> {
        self.entries.first().map(|entry| entry.seq.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_from_tsv() {
        let wl = Whitelist::from_reader("Cell_1\tAAAA\nCell_2\tCCCC\n".as_bytes()).unwrap();
        assert_eq!(wl.len(), 2);
        assert_eq!(wl.lookup("AAAA"), Some("Cell_1"));
        assert_eq!(wl.lookup("CCCC"), Some("Cell_2"));
        assert_eq!(wl.lookup("GGGG"), None);
        assert_eq!(wl.barcode_len(), Some(4));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Cell_1\tACGT").unwrap();
        writeln!(file, "Cell_2\tTGCA").unwrap();

        let wl = Whitelist::from_path(file.path()).unwrap();
        assert_eq!(wl.lookup("TGCA"), Some("Cell_2"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Whitelist::from_path(Path::new("/no/such/whitelist.tsv")).is_err());
    }

    #[test]
    fn malformed_line_aborts_the_load() {
        let result = Whitelist::from_reader("Cell_1\tAAAA\njust_one_field\n".as_bytes());
        assert!(result.is_err());
    }

    #[test]
    fn duplicate_barcode_last_write_wins() {
        let wl =
            Whitelist::from_reader("Cell_1\tAAAA\nCell_2\tCCCC\nCell_3\tAAAA\n".as_bytes()).unwrap();
        assert_eq!(wl.len(), 2);
        assert_eq!(wl.lookup("AAAA"), Some("Cell_3"));
    }

    #[test]
    fn iteration_preserves_file_order() {
        let wl = Whitelist::from_reader("c\tAAAA\na\tCCCC\nb\tGGGG\n".as_bytes()).unwrap();
        let labels: Vec<&str> = wl.iter().map(|entry| entry.label.as_str()).collect();
        assert_eq!(labels, vec!["c", "a", "b"]);
    }

    #[test]
    fn empty_input_gives_empty_whitelist() {
        let wl = Whitelist::from_reader("".as_bytes()).unwrap();
        assert!(wl.is_empty());
        assert_eq!(wl.barcode_len(), None);
    }
}
