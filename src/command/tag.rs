use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use rust_htslib::bam::record::{Aux, Record as BamRecord};
use rust_htslib::bam::{Format, Header, Read, Reader, Writer};

use crate::barcode::{BarcodeMatcher, HammingMatcher, Whitelist};
use crate::command::RunCounts;

#[derive(Args)]
pub struct TagCMD {
    /// Input BAM; the read sequence must be the last :-separated field of the read name
    #[arg(short = 'i', value_parser)]
    pub path_in: PathBuf,

    /// Barcode whitelist TSV, label<TAB>sequence, no header
    #[arg(short = 'b', value_parser)]
    pub path_whitelist: PathBuf,

    /// Output BAM with CN/BX/CB tags added
    #[arg(short = 'o', value_parser)]
    pub path_out: PathBuf,

    /// First base of the cell barcode within the read sequence (1-based, inclusive)
    #[arg(long = "cbc-start", value_parser)]
    pub cbc_start: usize,

    /// Last base of the cell barcode (1-based, inclusive)
    #[arg(long = "cbc-end", value_parser)]
    pub cbc_end: usize,

    /// First base of the UMI (1-based, inclusive)
    #[arg(long = "umi-start", value_parser)]
    pub umi_start: usize,

    /// Last base of the UMI (1-based, inclusive)
    #[arg(long = "umi-end", value_parser)]
    pub umi_end: usize,
}
impl TagCMD {
    /// Run the commandline option
    pub fn try_execute(&mut self) -> Result<()> {
        if self.cbc_start == 0 || self.umi_start == 0 {
            bail!("barcode and UMI coordinates are 1-based; 0 is not a valid start");
        }
        if self.cbc_end < self.cbc_start || self.umi_end < self.umi_start {
            bail!("barcode/UMI end position must not be before the start position");
        }

        TagBam::run(&TagBam {
            path_in: self.path_in.clone(),
            path_whitelist: self.path_whitelist.clone(),
            path_out: self.path_out.clone(),
            cbc_start: self.cbc_start,
            cbc_end: self.cbc_end,
            umi_start: self.umi_start,
            umi_end: self.umi_end,
        })?;

        log::info!("Tag has finished succesfully");
        Ok(())
    }
}

pub struct TagBam {
    pub path_in: PathBuf,
    pub path_whitelist: PathBuf,
    pub path_out: PathBuf,
    pub cbc_start: usize,
    pub cbc_end: usize,
    pub umi_start: usize,
    pub umi_end: usize,
}
impl TagBam {
    ///////////////////////////////
    /// Slice barcode and UMI out of each read name, correct the barcode
    /// against the whitelist and write the record back out with CN
    /// (corrected label), BX (UMI) and CB (raw barcode) tags. A table of
    /// raw barcode occurrences goes to stdout at the end.
    ///
    /// Reads whose name holds no sequence long enough for the requested
    /// slices are written through untagged and counted.
    pub fn run(params: &TagBam) -> Result<RunCounts> {
        let whitelist = Whitelist::from_path(&params.path_whitelist)?;
        let matcher = HammingMatcher::new(&whitelist);
        log::info!("Loaded whitelist with {} barcodes", whitelist.len());

        let mut bam = Reader::from_path(&params.path_in)?;
        let header = Header::from_template(bam.header());
        let mut out = Writer::from_path(&params.path_out, &header, Format::Bam)?;

        let cbc_from = params.cbc_start - 1;
        let umi_from = params.umi_start - 1;
        let need_len = params.cbc_end.max(params.umi_end);

        //Occurrences of each raw barcode, reported at the end
        let mut seen_bcs: BTreeMap<String, u64> = BTreeMap::new();

        let mut num_reads: u64 = 0;
        let mut num_skipped: u64 = 0;

        let mut record = BamRecord::new();
        while let Some(r) = bam.read(&mut record) {
            r?;

            //Keep track of where we are
            num_reads += 1;
            if num_reads % 1000000 == 0 {
                log::info!("Processed {} reads", num_reads);
            }

            //The read sequence travels as the last :-separated field of the read name
            let qname = record.qname().to_vec();
            let read_seq = qname.rsplit(|b| *b == b':').next().unwrap_or(b"");
            if read_seq.len() < need_len {
                num_skipped += 1;
                out.write(&record)?;
                continue;
            }

            let cbc = String::from_utf8_lossy(&read_seq[cbc_from..params.cbc_end]).into_owned();
            let umi = String::from_utf8_lossy(&read_seq[umi_from..params.umi_end]).into_owned();

            *seen_bcs.entry(cbc.clone()).or_insert(0) += 1;

            let corrected = matcher.correct(&cbc);
            record.push_aux(b"CN", Aux::String(corrected.label()))?;
            record.push_aux(b"BX", Aux::String(&umi))?;
            record.push_aux(b"CB", Aux::String(&cbc))?;
            out.write(&record)?;
        }

        //Raw barcode occurrence table, sorted by barcode
        for (bc, count) in &seen_bcs {
            println!("{}\t{}", bc, count);
        }

        if num_skipped > 0 {
            log::warn!(
                "{} reads had no read sequence in their name and were written untagged",
                num_skipped
            );
        }
        Ok(RunCounts {
            num_reads,
            num_skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::molecule::aux_string;
    use rust_htslib::bam::header::HeaderRecord;

    fn write_test_bam(path: &std::path::Path, qnames: &[&[u8]]) {
        let mut header = Header::new();
        let mut sq = HeaderRecord::new(b"SQ");
        sq.push_tag(b"SN", "chr1");
        sq.push_tag(b"LN", 10000);
        header.push_record(&sq);

        let mut writer = Writer::from_path(path, &header, Format::Bam).unwrap();
        for qname in qnames {
            let mut record = BamRecord::new();
            record.set(qname, None, b"ACGT", &[30, 30, 30, 30]);
            writer.write(&record).unwrap();
        }
    }

    fn params(dir: &tempfile::TempDir) -> TagBam {
        TagBam {
            path_in: dir.path().join("in.bam"),
            path_whitelist: dir.path().join("whitelist.tsv"),
            path_out: dir.path().join("out.bam"),
            cbc_start: 1,
            cbc_end: 4,
            umi_start: 5,
            umi_end: 6,
        }
    }

    #[test]
    fn short_read_names_pass_through_untagged_and_are_counted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("whitelist.tsv"), "Cell_1\tAAAA\n").unwrap();
        write_test_bam(
            &dir.path().join("in.bam"),
            &[b"r1:AAAACC", b"r2", b"r3:AAATGG"],
        );

        let params = params(&dir);
        let counts = TagBam::run(&params).unwrap();

        assert_eq!(counts.num_reads, 3);
        assert_eq!(counts.num_skipped, 1);

        let mut bam = Reader::from_path(&params.path_out).unwrap();
        let records: Vec<BamRecord> = bam.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 3);

        //Exact whitelist hit
        assert_eq!(aux_string(&records[0], "CN").unwrap(), "Cell_1");
        assert_eq!(aux_string(&records[0], "CB").unwrap(), "AAAA");
        assert_eq!(aux_string(&records[0], "BX").unwrap(), "CC");

        //Too short to slice, written through with no tags at all
        assert!(aux_string(&records[1], "CN").is_err());
        assert!(aux_string(&records[1], "CB").is_err());

        //One substitution away still corrects
        assert_eq!(aux_string(&records[2], "CN").unwrap(), "Cell_1");
        assert_eq!(aux_string(&records[2], "CB").unwrap(), "AAAT");
    }
}
