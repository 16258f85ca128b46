use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use rust_htslib::bam::record::Record as BamRecord;
use rust_htslib::bam::{Read, Reader};

use crate::command::RunCounts;
use crate::fileformat::open_output;
use crate::molecule::{positional_key, Accumulator, CellGroup, GroupAggregator, PositionSet};

#[derive(Args)]
pub struct MoleculePositionCMD {
    /// Input BAM sorted (or partitioned) by cell label, tagged with CN, BO and XT
    #[arg(short = 'i', value_parser)]
    pub path_in: PathBuf,

    /// Output TSV; stdout when not given
    #[arg(short = 'o', value_parser)]
    pub path_out: Option<PathBuf>,
}
impl MoleculePositionCMD {
    /// Run the commandline option
    pub fn try_execute(&mut self) -> Result<()> {
        MoleculePosition::run(&MoleculePosition {
            path_in: self.path_in.clone(),
            path_out: self.path_out.clone(),
        })?;

        log::info!("MoleculePosition has finished succesfully");
        Ok(())
    }
}

pub struct MoleculePosition {
    pub path_in: PathBuf,
    pub path_out: Option<PathBuf>,
}
impl MoleculePosition {
    ///////////////////////////////
    /// Stream the BAM once, grouping contiguous runs of the same cell and
    /// collecting the set of distinct alignment positions per umi key
    /// (which here includes the chromosome). Value column is the ascending,
    /// comma-terminated position list. Unmapped records and records missing
    /// a required tag are skipped and reported once at the end.
    pub fn run(params: &MoleculePosition) -> Result<RunCounts> {
        let mut bam = Reader::from_path(&params.path_in)?;
        let mut out = open_output(&params.path_out)?;

        let mut agg: GroupAggregator<PositionSet> = GroupAggregator::new();

        let mut num_reads: u64 = 0;
        let mut num_skipped: u64 = 0;

        let mut record = BamRecord::new();
        while let Some(r) = bam.read(&mut record) {
            r?;

            //The chromosome is part of the umi key; a record without a
            //reference sequence cannot form one
            let tid = record.tid();
            if tid < 0 {
                num_skipped += 1;
                num_reads += 1;
                continue;
            }
            let chrom = String::from_utf8_lossy(bam.header().tid2name(tid as u32)).into_owned();

            match positional_key(&record, &chrom) {
                Ok(key) => {
                    if let Some(group) = agg.observe(&key.cell, &key.umi_key, key.pos) {
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
            log::warn!("Skipped {} unmapped or untagged reads", num_skipped);
        }
        Ok(RunCounts {
            num_reads,
            num_skipped,
        })
    }
}

fn write_group<W: Write>(out: &mut W, group: &CellGroup<PositionSet>) -> Result<()> {
    for (umi_key, positions) in &group.keys {
        //An empty set is a diagnostic curiosity, not an error
        if positions.0.is_empty() {
            log::debug!("empty position set for {} {}", group.cell, umi_key);
        }
        writeln!(out, "{}\t{}\t{}", group.cell, umi_key, positions.render())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_htslib::bam::header::{Header, HeaderRecord};
    use rust_htslib::bam::record::Aux;
    use rust_htslib::bam::{Format, Writer};

    fn test_record(tid: i32, pos: i64, tags: &[(&[u8; 2], &str)]) -> BamRecord {
        let mut record = BamRecord::new();
        record.set(b"read1", None, b"ACGT", &[30, 30, 30, 30]);
        record.set_tid(tid);
        record.set_pos(pos);
        for &(tag, value) in tags {
            record.push_aux(tag, Aux::String(value)).unwrap();
        }
        record
    }

    fn write_test_bam(path: &std::path::Path, records: &[BamRecord]) {
        let mut header = Header::new();
        let mut sq = HeaderRecord::new(b"SQ");
        sq.push_tag(b"SN", "chr1");
        sq.push_tag(b"LN", 10000);
        header.push_record(&sq);

        let mut writer = Writer::from_path(path, &header, Format::Bam).unwrap();
        for record in records {
            writer.write(record).unwrap();
        }
    }

    #[test]
    fn unmapped_and_untagged_records_are_skipped_and_counted() {
        let dir = tempfile::tempdir().unwrap();
        let path_in = dir.path().join("in.bam");
        let path_out = dir.path().join("out.tsv");

        let full: &[(&[u8; 2], &str)] = &[(b"CN", "cellA"), (b"BO", "1"), (b"XT", "geneX")];
        let no_gene: &[(&[u8; 2], &str)] = &[(b"CN", "cellA"), (b"BO", "1")];
        write_test_bam(
            &path_in,
            &[
                test_record(0, 10, full),
                test_record(0, 10, full),
                test_record(0, 20, full),
                test_record(-1, -1, full),
                test_record(0, 30, no_gene),
            ],
        );

        let counts = MoleculePosition::run(&MoleculePosition {
            path_in,
            path_out: Some(path_out.clone()),
        })
        .unwrap();

        assert_eq!(counts.num_reads, 5);
        assert_eq!(counts.num_skipped, 2);

        //Duplicate positions collapse; skipped records leave no trace
        let table = std::fs::read_to_string(&path_out).unwrap();
        assert_eq!(table, "cellA\t1::chr1::geneX\t10,20,\n");
    }
}
