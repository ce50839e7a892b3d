use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::logic::dataset::record::CombinedRecord;
use crate::logic::error::PipelineResult;

/// JSONL writer for the combined dataset (one record per line)
pub struct DatasetWriter {
    file: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl DatasetWriter {
    /// Create (truncate) the dataset file
    pub fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(path)?;
        Ok(Self {
            file: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append record to the dataset
    pub fn append(&self, record: &CombinedRecord) -> io::Result<()> {
        let mut file = self.file.lock();
        let json = serde_json::to_string(record)?;
        writeln!(file, "{}", json)
    }

    pub fn flush(&self) -> io::Result<()> {
        self.file.lock().flush()
    }
}

/// Write all records, returning how many were written
pub fn write_dataset(path: &Path, records: &[CombinedRecord]) -> io::Result<usize> {
    let writer = DatasetWriter::create(path)?;
    for record in records {
        writer.append(record)?;
    }
    writer.flush()?;
    log::info!("Saved {} records to {}", records.len(), path.display());
    Ok(records.len())
}

/// Read a JSONL dataset. Blank lines are skipped; a malformed line fails.
pub fn read_dataset(path: &Path) -> PipelineResult<Vec<CombinedRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }

    log::info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}
