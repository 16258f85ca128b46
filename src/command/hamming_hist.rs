use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use itertools::Itertools;
use seq_io::fastq::Record as FastqRecord;

use crate::barcode::Whitelist;
use crate::fileformat::{open_fastq, open_output};

#[derive(Args)]
pub struct HammingHistCMD {
    /// Barcode whitelist TSV, label<TAB>sequence, no header
    #[arg(short = 'b', value_parser)]
    pub path_whitelist: PathBuf,

    /// FASTQ to take barcodes from, optionally gzipped
    #[arg(short = 'f', value_parser)]
    pub path_fastq: PathBuf,

    /// Output TSV; stdout when not given
    #[arg(short = 'o', value_parser)]
    pub path_out: Option<PathBuf>,
}
impl HammingHistCMD {
    /// Run the commandline option
    pub fn try_execute(&mut self) -> Result<()> {
        HammingHist::run(&HammingHist {
            path_whitelist: self.path_whitelist.clone(),
            path_fastq: self.path_fastq.clone(),
            path_out: self.path_out.clone(),
        })?;

        log::info!("HammingHist has finished succesfully");
        Ok(())
    }
}

pub struct HammingHist {
    pub path_whitelist: PathBuf,
    pub path_fastq: PathBuf,
    pub path_out: Option<PathBuf>,
}
impl HammingHist {
    ///////////////////////////////
    /// QC histogram: for every read, the minimum number of mismatches
    /// between its barcode prefix and any whitelist sequence. A whitelist
    /// where most reads sit at distance 0 or 1 is usable; a flat histogram
    /// means the barcode coordinates or the whitelist are wrong.
    pub fn run(params: &HammingHist) -> Result<()> {
        let whitelist = Whitelist::from_path(&params.path_whitelist)?;
        let bc_len = whitelist.barcode_len().context("whitelist is empty")?;

        let mut reader = open_fastq(&params.path_fastq)?;
        let mut out = open_output(&params.path_out)?;

        let mut histogram: HashMap<u32, u64> = HashMap::new();

        while let Some(record) = reader.next() {
            let record = record?;
            let prefix = &record.seq()[..bc_len.min(record.seq().len())];

            let min_dist = whitelist
                .iter()
                .map(|entry| mismatches(prefix, entry.seq.as_bytes()))
                .min()
                .expect("whitelist is not empty");

            *histogram.entry(min_dist).or_insert(0) += 1;
        }

        //Most frequent distance first; ties by ascending distance
        writeln!(out, "hamming_dist\tcounts")?;
        for (dist, count) in histogram
            .iter()
            .sorted_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)))
        {
            writeln!(out, "{}\t{}", dist, count)?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Mismatch count over the overlapping prefix. Unlike the strict Hamming
/// distance used for correction, a read shorter than the barcode is
/// compared over the bases that are there.
fn mismatches(a: &[u8], b: &[u8]) -> u32 {
    a.iter().zip(b.iter()).filter(|(x, y)| x != y).count() as u32
}
