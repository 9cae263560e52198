use std::fs;
use std::io::{BufReader, Read, Seek};

use camino::Utf8Path;
use flate2::read::MultiGzDecoder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConvertError;
use crate::geo::GeoRecord;

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Either a JSON array of records or a single record.
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordInput {
    Many(Vec<GeoRecord>),
    One(Box<GeoRecord>),
}

/// Reads submission records from a JSON file. Gzip input is detected by its magic bytes,
/// not the extension.
pub fn read_records(path: &Utf8Path) -> Result<Vec<GeoRecord>, ConvertError> {
    let mut file = fs::File::open(path.as_std_path())
        .map_err(|err| ConvertError::Filesystem(format!("open {path}: {err}")))?;
    let mut magic = [0u8; 2];
    let read = file
        .read(&mut magic)
        .map_err(|err| ConvertError::Filesystem(format!("read {path}: {err}")))?;
    file.rewind()
        .map_err(|err| ConvertError::Filesystem(format!("rewind {path}: {err}")))?;

    let input: RecordInput = if read == GZIP_MAGIC.len() && magic == GZIP_MAGIC {
        debug!(%path, "reading gzip input");
        serde_json::from_reader(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        serde_json::from_reader(BufReader::new(file))
    }
    .map_err(|err| ConvertError::InputParse(format!("{path}: {err}")))?;

    Ok(match input {
        RecordInput::Many(records) => records,
        RecordInput::One(record) => vec![*record],
    })
}

/// Serializes `value` as pretty JSON and replaces `path` atomically.
pub fn write_json_atomic<T: Serialize>(path: &Utf8Path, value: &T) -> Result<(), ConvertError> {
    let content = serde_json::to_vec_pretty(value)
        .map_err(|err| ConvertError::Filesystem(format!("serialize output: {err}")))?;
    write_bytes_atomic(path, &content)
}

pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), ConvertError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| ConvertError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix("geo-convert-output")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| ConvertError::Filesystem(err.to_string()))?;
    std::io::Write::write_all(&mut temp, content)
        .map_err(|err| ConvertError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| ConvertError::Filesystem(err.to_string()))?;
    Ok(())
}
