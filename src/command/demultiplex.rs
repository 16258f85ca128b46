use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use seq_io::fastq::Record as FastqRecord;

use crate::fileformat::{open_fastq, write_fastq_read};

#[derive(Args)]
pub struct DemultiplexCMD {
    /// R1 FASTQ, optionally gzipped
    #[arg(short = '1', long = "r1", value_parser)]
    pub path_r1: PathBuf,

    /// R2 FASTQ, optionally gzipped
    #[arg(short = '2', long = "r2", value_parser)]
    pub path_r2: PathBuf,

    /// Barcode list, one barcode per line
    #[arg(short = 'b', value_parser)]
    pub path_barcodes: PathBuf,

    /// Prefix for the per-barcode output files
    #[arg(short = 'p', long = "prefix", value_parser, default_value = "")]
    pub prefix: String,
}
impl DemultiplexCMD {
    /// Run the commandline option
    pub fn try_execute(&mut self) -> Result<()> {
        Demultiplex::run(&Demultiplex {
            path_r1: self.path_r1.clone(),
            path_r2: self.path_r2.clone(),
            path_barcodes: self.path_barcodes.clone(),
            prefix: self.prefix.clone(),
        })?;

        log::info!("Demultiplex has finished succesfully");
        Ok(())
    }
}

/// Output files for one barcode
struct PairedSink {
    r1: BufWriter<File>,
    r2: BufWriter<File>,
}

pub struct Demultiplex {
    pub path_r1: PathBuf,
    pub path_r2: PathBuf,
    pub path_barcodes: PathBuf,
    pub prefix: String,
}
impl Demultiplex {
    ///////////////////////////////
    /// Split a FASTQ pair into per-barcode files. The barcode is the second
    /// _-separated field of the read name; reads carrying a barcode not in
    /// the list are skipped and counted. All sinks are opened up front so a
    /// create failure aborts before any read is consumed.
    pub fn run(params: &Demultiplex) -> Result<()> {
        let mut sinks = open_sinks(&params.path_barcodes, &params.prefix)?;
        log::info!("Opened output files for {} barcodes", sinks.len());

        let mut reader1 = open_fastq(&params.path_r1)?;
        let mut reader2 = open_fastq(&params.path_r2)?;

        let mut num_written: u64 = 0;
        let mut num_unmatched: u64 = 0;

        loop {
            let rec1 = match reader1.next() {
                Some(r) => r?,
                None => break,
            };
            let rec2 = match reader2.next() {
                Some(r) => r?,
                None => bail!("read 2 file ended before read 1 file"),
            };

            let id1 = rec1.id()?;
            let id2 = rec2.id()?;
            if id1 != id2 {
                log::warn!("name mismatch between read 1 {} and read 2 {}", id1, id2);
            }

            //Barcode is the second _-separated field of the name
            let sink = id1
                .split('_')
                .nth(1)
                .and_then(|bc| sinks.get_mut(bc));
            let sink = match sink {
                Some(s) => s,
                None => {
                    num_unmatched += 1;
                    continue;
                }
            };

            write_fastq_read(&mut sink.r1, rec1.head(), rec1.seq(), rec1.qual())?;
            write_fastq_read(&mut sink.r2, rec2.head(), rec2.seq(), rec2.qual())?;
            num_written += 1;
        }

        //Both files must run out together. A broken trailing record in read 2
        //is a format error, not a desync, and must surface as such.
        match reader2.next() {
            Some(Err(e)) => return Err(e.into()),
            Some(Ok(_)) => bail!("read 1 file ended before read 2 file"),
            None => {}
        }

        for sink in sinks.values_mut() {
            sink.r1.flush()?;
            sink.r2.flush()?;
        }

        log::info!(
            "Wrote {} read pairs; {} pairs had no listed barcode",
            num_written,
            num_unmatched
        );
        Ok(())
    }
}

///////////////////////////////
/// One output file pair per listed barcode, created before any read is seen
fn open_sinks(path: &PathBuf, prefix: &str) -> Result<BTreeMap<String, PairedSink>> {
    let file = File::open(path)
        .with_context(|| format!("could not open barcode list {}", path.display()))?;

    let mut sinks = BTreeMap::new();
    for line in BufReader::new(file).lines() {
        let bc = line?.trim().to_string();
        if bc.is_empty() {
            continue;
        }

        let fn_r1 = format!("{}{}_R1.fastq", prefix, bc);
        let fn_r2 = format!("{}{}_R2.fastq", prefix, bc);
        let r1 = File::create(&fn_r1).with_context(|| format!("could not create {}", fn_r1))?;
        let r2 = File::create(&fn_r2).with_context(|| format!("could not create {}", fn_r2))?;

        sinks.insert(
            bc,
            PairedSink {
                r1: BufWriter::new(r1),
                r2: BufWriter::new(r2),
            },
        );
    }
    Ok(sinks)
}
