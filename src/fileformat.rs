use std::fs::File;
use std::io::{stdout, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use seq_io::fastq::Reader as FastqReader;

///////////////////////////////
/// Open a FASTQ file for reading, transparently decompressing if needed
pub fn open_fastq(path: &PathBuf) -> anyhow::Result<FastqReader<Box<dyn std::io::Read>>> {
    let handle =
        File::open(path).with_context(|| format!("could not open fastq file {}", path.display()))?;
    let (reader, _compression) = niffler::get_reader(Box::new(handle))
        .with_context(|| format!("could not read fastq file {}", path.display()))?;
    Ok(FastqReader::new(reader))
}

////////// Write one FASTQ read
pub fn write_fastq_read<W: Write>(
    writer: &mut W,
    head: &[u8],
    seq: &[u8],
    qual: &[u8],
) -> std::io::Result<()> {
    writer.write_all(b"@")?;
    writer.write_all(head)?;
    writer.write_all(b"\n")?;
    writer.write_all(seq)?;
    writer.write_all(b"\n+\n")?;
    writer.write_all(qual)?;
    writer.write_all(b"\n")?;
    Ok(())
}

///////////////////////////////
/// Table output sink: the given file, or stdout when no path is given
pub fn open_output(path: &Option<PathBuf>) -> anyhow::Result<Box<dyn Write>> {
    match path {
        Some(p) => {
            let file = File::create(p)
                .with_context(|| format!("could not create output file {}", p.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(stdout()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seq_io::fastq::Record as FastqRecord;

    #[test]
    fn fastq_read_roundtrip() {
        let mut buffer: Vec<u8> = Vec::new();
        write_fastq_read(&mut buffer, b"read1 extra", b"ACGT", b"FFFF").unwrap();
        assert_eq!(buffer, b"@read1 extra\nACGT\n+\nFFFF\n");

        let mut reader = FastqReader::new(buffer.as_slice());
        let record = reader.next().unwrap().unwrap();
        assert_eq!(record.id().unwrap(), "read1");
        assert_eq!(record.seq(), b"ACGT");
        assert_eq!(record.qual(), b"FFFF");
    }
}
