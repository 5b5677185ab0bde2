//! Tabular Source - A byte stream plus the format declared by its file name

use crate::error::{IngestionError, IngestionResult};
use serde::Serialize;
use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;

/// Formats the pipeline can parse, derived from the file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceFormat {
    DelimitedText,
    Json,
}

impl SourceFormat {
    /// Maps a file name to its format (`.csv` or `.json`, case-insensitive).
    pub fn from_file_name(name: &str) -> IngestionResult<Self> {
        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(SourceFormat::DelimitedText),
            Some("json") => Ok(SourceFormat::Json),
            Some(other) => Err(IngestionError::UnsupportedFormat(format!(
                "'{}' has extension '.{}'; expected .csv or .json",
                name, other
            ))),
            None => Err(IngestionError::UnsupportedFormat(format!(
                "'{}' has no file extension; expected .csv or .json",
                name
            ))),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SourceFormat::DelimitedText => "CSV",
            SourceFormat::Json => "JSON",
        }
    }
}

/// An uploaded or referenced byte stream with its declared format.
///
/// `inspect` and `preview` read through `&mut` and put the stream position
/// back where they found it; `ingest` takes the source by value.
pub struct TabularSource<R> {
    name: String,
    format: SourceFormat,
    reader: R,
}

impl TabularSource<File> {
    /// Opens a file on disk, taking the format from its extension.
    pub fn open(path: impl AsRef<Path>) -> IngestionResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        let format = SourceFormat::from_file_name(&name)?;
        let file = File::open(path).map_err(|e| {
            IngestionError::IngestionFailed(format!("cannot open {}: {}", path.display(), e))
        })?;

        Ok(Self {
            name,
            format,
            reader: file,
        })
    }
}

impl TabularSource<Cursor<Vec<u8>>> {
    /// Wraps bytes already held in memory, e.g. an uploaded file body.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> IngestionResult<Self> {
        let name = name.into();
        let format = SourceFormat::from_file_name(&name)?;
        Ok(Self {
            name,
            format,
            reader: Cursor::new(bytes),
        })
    }
}

impl<R: Read + Seek> TabularSource<R> {
    pub fn new(name: impl Into<String>, format: SourceFormat, reader: R) -> Self {
        Self {
            name: name.into(),
            format,
            reader,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    /// Total stream length in bytes. Leaves the position unchanged.
    pub fn size_in_bytes(&mut self) -> IngestionResult<u64> {
        let position = self.reader.stream_position()?;
        let size = self.reader.seek(SeekFrom::End(0))?;
        self.reader.seek(SeekFrom::Start(position))?;
        Ok(size)
    }

    /// Reads the whole stream from the start and restores the position.
    pub(crate) fn read_restoring(&mut self) -> IngestionResult<Vec<u8>> {
        let position = self.reader.stream_position()?;
        self.reader.seek(SeekFrom::Start(0))?;

        let mut buf = Vec::new();
        let read = self.reader.read_to_end(&mut buf);
        // Restore before surfacing a read error so the source stays usable.
        self.reader.seek(SeekFrom::Start(position))?;
        read?;

        Ok(buf)
    }

    /// Reads the whole stream from the start, consuming the source.
    pub(crate) fn into_bytes(mut self) -> IngestionResult<Vec<u8>> {
        self.reader.seek(SeekFrom::Start(0))?;
        let mut buf = Vec::new();
        self.reader.read_to_end(&mut buf)?;
        Ok(buf)
    }

    #[cfg(test)]
    pub(crate) fn position(&mut self) -> u64 {
        self.reader.stream_position().unwrap()
    }

    #[cfg(test)]
    pub(crate) fn seek_to(&mut self, offset: u64) {
        self.reader.seek(SeekFrom::Start(offset)).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SourceFormat::from_file_name("data.csv").unwrap(), SourceFormat::DelimitedText);
        assert_eq!(SourceFormat::from_file_name("DATA.JSON").unwrap(), SourceFormat::Json);
        assert!(matches!(
            SourceFormat::from_file_name("data.xlsx"),
            Err(IngestionError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            SourceFormat::from_file_name("data"),
            Err(IngestionError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_read_restores_position() {
        let mut source = TabularSource::from_bytes("a.csv", b"x,y\n1,2\n".to_vec()).unwrap();
        source.seek_to(3);
        let bytes = source.read_restoring().unwrap();
        assert_eq!(bytes, b"x,y\n1,2\n");
        assert_eq!(source.position(), 3);
        assert_eq!(source.size_in_bytes().unwrap(), 8);
        assert_eq!(source.position(), 3);
    }
}
