//! Zip container boundary: read all entries, write all entries.
//!
//! The pipeline works on a flat `name → bytes` collection held entirely in
//! memory; this module is the only place the zip format appears. Room
//! exports are tens to a few hundred megabytes, so read-everything is the
//! right trade against streaming complexity.
//!
//! Entries live in a `BTreeMap`, which fixes the output entry order
//! (sorted by name) regardless of the input archive's layout — one less
//! source of nondeterminism between runs.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Flat entry collection for one conversion run.
pub type Entries = BTreeMap<String, Vec<u8>>;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Read every file entry of a zip blob into memory.
///
/// Directory entries are dropped; they carry no data and the writer does
/// not recreate them.
pub fn read_entries(data: &[u8]) -> Result<Entries, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;
    let mut entries = Entries::new();
    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        if file.is_dir() {
            continue;
        }
        let mut bytes = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut bytes)?;
        entries.insert(file.name().to_string(), bytes);
    }
    Ok(entries)
}

/// Pack the collection into a zip blob, each entry stored once, deflated.
pub fn write_entries(entries: &Entries) -> Result<Vec<u8>, ArchiveError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in entries {
        writer.start_file(name.as_str(), options)?;
        writer.write_all(bytes)?;
    }
    Ok(writer.finish()?.into_inner())
}
