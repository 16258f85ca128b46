use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use rust_htslib::bam::record::Record as BamRecord;
use rust_htslib::bam::{Read, Reader};

use crate::command::RunCounts;
use crate::fileformat::open_output;
use crate::molecule::{aux_string, KEY_SEPARATOR};

#[derive(Args)]
pub struct CountBarcodesCMD {
    /// Input BAM tagged with CN and CB
    #[arg(short = 'i', value_parser)]
    pub path_in: PathBuf,

    /// Output TSV; stdout when not given
    #[arg(short = 'o', value_parser)]
    pub path_out: Option<PathBuf>,
}
impl CountBarcodesCMD {
    /// Run the commandline option
    pub fn try_execute(&mut self) -> Result<()> {
        CountBarcodes::run(&CountBarcodes {
            path_in: self.path_in.clone(),
            path_out: self.path_out.clone(),
        })?;

        log::info!("CountBarcodes has finished succesfully");
        Ok(())
    }
}

pub struct CountBarcodes {
    pub path_in: PathBuf,
    pub path_out: Option<PathBuf>,
}
impl CountBarcodes {
    ///////////////////////////////
    /// Count each distinct corrected-label::raw-barcode combination and
    /// write a sorted table. Records without both tags are skipped and
    /// counted.
    pub fn run(params: &CountBarcodes) -> Result<RunCounts> {
        let mut bam = Reader::from_path(&params.path_in)?;
        let mut out = open_output(&params.path_out)?;

        let mut counts: BTreeMap<String, u64> = BTreeMap::new();

        let mut num_reads: u64 = 0;
        let mut num_skipped: u64 = 0;

        let mut record = BamRecord::new();
        while let Some(r) = bam.read(&mut record) {
            r?;

            let cn = aux_string(&record, "CN");
            let cb = aux_string(&record, "CB");
            match (cn, cb) {
                (Ok(cn), Ok(cb)) => {
                    let combo = format!("{}{}{}", cn, KEY_SEPARATOR, cb);
                    *counts.entry(combo).or_insert(0) += 1;
                }
                _ => {
                    num_skipped += 1;
                }
            }

            num_reads += 1;
            if num_reads % 1000000 == 0 {
                log::info!("Processed {} reads", num_reads);
            }
        }

        for (combo, count) in &counts {
            writeln!(out, "{}\t{}", combo, count)?;
        }
        out.flush()?;

        if num_skipped > 0 {
            log::warn!("Skipped {} reads without CN/CB tags", num_skipped);
        }
        Ok(RunCounts {
            num_reads,
            num_skipped,
        })
    }
}
