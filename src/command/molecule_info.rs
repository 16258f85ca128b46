use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use rust_htslib::bam::record::Record as BamRecord;
use rust_htslib::bam::{Read, Reader};

use crate::command::RunCounts;
use crate::fileformat::open_output;
use crate::molecule::{molecule_key, CellGroup, GroupAggregator, ReadCount};

#[derive(Args)]
pub struct MoleculeInfoCMD {
    /// Input BAM sorted (or partitioned) by cell label, tagged with CN, BO and XT
    #[arg(short = 'i', value_parser)]
    pub path_in: PathBuf,

    /// Output TSV; stdout when not given
    #[arg(short = 'o', value_parser)]
    pub path_out: Option<PathBuf>,
}
impl MoleculeInfoCMD {
    /// Run the commandline option
    pub fn try_execute(&mut self) -> Result<()> {
        MoleculeInfo::run(&MoleculeInfo {
            path_in: self.path_in.clone(),
            path_out: self.path_out.clone(),
        })?;

        log::info!("MoleculeInfo has finished succesfully");
        Ok(())
    }
}

pub struct MoleculeInfo {
    pub path_in: PathBuf,
    pub path_out: Option<PathBuf>,
}
impl MoleculeInfo {
    ///////////////////////////////
    /// Stream the BAM once, grouping contiguous runs of the same cell and
    /// counting reads per umi key. One table line per cell and umi key,
    /// umi keys in lexicographic order. Records missing a required tag are
    /// skipped and reported once at the end.
    ///
    /// Reads of one cell must be contiguous in the input; only one cell
    /// group is ever held in memory.
    pub fn run(params: &MoleculeInfo) -> Result<RunCounts> {
        let mut bam = Reader::from_path(&params.path_in)?;
        let mut out = open_output(&params.path_out)?;

        let mut agg: GroupAggregator<ReadCount> = GroupAggregator::new();

        let mut num_reads: u64 = 0;
        let mut num_skipped: u64 = 0;

        let mut record = BamRecord::new();
        while let Some(r) = bam.read(&mut record) {
            r?;

            match molecule_key(&record) {
                Ok(key) => {
                    if let Some(group) = agg.observe(&key.cell, &key.umi_key, ()) {
                        write_group(&mut out, &group)?;
                    }
                }
                Err(e) => {
                    log::debug!("skipping read: {}", e);
                    num_skipped += 1;
                }
            }

            num_reads += 1;
            if num_reads % 1000000 == 0 {
                log::info!("Processed {} reads", num_reads);
            }
        }

        //The stream ending is the final group boundary
        if let Some(group) = agg.finish() {
            write_group(&mut out, &group)?;
        }
        out.flush()?;

        if num_skipped > 0 {
            log::warn!("Skipped {} reads with missing tags", num_skipped);
        }
        Ok(RunCounts {
            num_reads,
            num_skipped,
        })
    }
}

fn write_group<W: Write>(out: &mut W, group: &CellGroup<ReadCount>) -> Result<()> {
    for (umi_key, count) in &group.keys {
        writeln!(out, "{}\t{}\t{}", group.cell, umi_key, count.0)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_htslib::bam::header::{Header, HeaderRecord};
    use rust_htslib::bam::record::Aux;
    use rust_htslib::bam::{Format, Writer};

    fn write_test_bam(path: &std::path::Path, records: &[&[(&[u8; 2], &str)]]) {
        let mut header = Header::new();
        let mut sq = HeaderRecord::new(b"SQ");
        sq.push_tag(b"SN", "chr1");
        sq.push_tag(b"LN", 10000);
        header.push_record(&sq);

        let mut writer = Writer::from_path(path, &header, Format::Bam).unwrap();
        for tags in records {
            let mut record = BamRecord::new();
            record.set(b"read1", None, b"ACGT", &[30, 30, 30, 30]);
            for &(tag, value) in *tags {
                record.push_aux(tag, Aux::String(value)).unwrap();
            }
            writer.write(&record).unwrap();
        }
    }

    #[test]
    fn untagged_records_are_skipped_and_counted() {
        let dir = tempfile::tempdir().unwrap();
        let path_in = dir.path().join("in.bam");
        let path_out = dir.path().join("out.tsv");

        write_test_bam(
            &path_in,
            &[
                &[(b"CN", "cellA"), (b"BO", "1"), (b"XT", "geneX")],
                &[(b"CN", "cellA"), (b"BO", "1"), (b"XT", "geneX")],
                &[(b"CN", "cellA"), (b"BO", "1")],
                &[(b"CN", "cellB"), (b"BO", "2"), (b"XT", "geneY")],
            ],
        );

        let counts = MoleculeInfo::run(&MoleculeInfo {
            path_in,
            path_out: Some(path_out.clone()),
        })
        .unwrap();

        assert_eq!(counts.num_reads, 4);
        assert_eq!(counts.num_skipped, 1);

        //The record without a gene tag must not disturb the aggregation
        let table = std::fs::read_to_string(&path_out).unwrap();
        assert_eq!(table, "cellA\t1::geneX\t2\ncellB\t2::geneY\t1\n");
    }

    #[test]
    fn fully_tagged_input_skips_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path_in = dir.path().join("in.bam");
        let path_out = dir.path().join("out.tsv");

        write_test_bam(&path_in, &[&[(b"CN", "cellA"), (b"BO", "1"), (b"XT", "geneX")]]);

        let counts = MoleculeInfo::run(&MoleculeInfo {
            path_in,
            path_out: Some(path_out),
        })
        .unwrap();

        assert_eq!(counts.num_reads, 1);
        assert_eq!(counts.num_skipped, 0);
    }
}
