//! JSONL hand-off between the corpus build and the index build: one
//! [`ChunkRecord`] per line, every field present even when null.

use crate::error::CorpusError;
use crate::models::ChunkRecord;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

pub fn to_jsonl_string(records: &[ChunkRecord]) -> Result<String, CorpusError> {
    let mut output = String::new();
    for (index, record) in records.iter().enumerate() {
        let line = serde_json::to_string(record).map_err(|source| CorpusError::Export {
            line: index + 1,
            source,
        })?;
        output.push_str(&line);
        output.push('\n');
    }
    Ok(output)
}

pub fn write_jsonl(path: &Path, records: &[ChunkRecord]) -> Result<(), CorpusError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(to_jsonl_string(records)?.as_bytes())?;
    writer.flush()?;
    Ok(())
}

pub fn read_jsonl(path: &Path) -> Result<Vec<ChunkRecord>, CorpusError> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let record = serde_json::from_str(&line).map_err(|source| CorpusError::Export {
            line: index + 1,
            source,
        })?;
        records.push(record);
    }

    Ok(records)
}
