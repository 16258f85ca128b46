use std::process::ExitCode;

use clap::{Parser, Subcommand};

use cellmol::command;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Correct barcodes from read names and tag a BAM with CN/BX/CB
    Tag(command::TagCMD),
    /// Count corrected-label::raw-barcode combinations in a tagged BAM
    CountBarcodes(command::CountBarcodesCMD),
    /// Reads per cell, umi key from a cell-sorted tagged BAM
    MoleculeInfo(command::MoleculeInfoCMD),
    /// Alignment positions per cell, umi key from a cell-sorted tagged BAM
    MoleculePosition(command::MoleculePositionCMD),
    /// Split a FASTQ pair into per-barcode files
    Demultiplex(command::DemultiplexCMD),
    /// Histogram of minimum whitelist distance per read
    HammingHist(command::HammingHistCMD),
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Tag(mut cmd) => cmd.try_execute(),
        Commands::CountBarcodes(mut cmd) => cmd.try_execute(),
        Commands::MoleculeInfo(mut cmd) => cmd.try_execute(),
        Commands::MoleculePosition(mut cmd) => cmd.try_execute(),
        Commands::Demultiplex(mut cmd) => cmd.try_execute(),
        Commands::HammingHist(mut cmd) => cmd.try_execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }
    return ExitCode::SUCCESS;
}
