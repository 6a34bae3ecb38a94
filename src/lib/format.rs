//! On-disk record format and memory-mapped file access.
//!
//! A record is an 8-byte little-endian key, a 4-byte little-endian payload
//! length (>= 8), and `len` opaque payload bytes. Records are concatenated
//! with no separators or padding and the file carries no trailer; the record
//! count is supplied out-of-band by the caller.
//!
//! Both the unsorted input and the sorted output are accessed through
//! whole-file memory maps: the input read-only for the lifetime of the sort,
//! the output created at its exact pre-computed size and mapped writable.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapMut, MmapOptions};

use crate::errors::{RecsortError, Result};

/// Width of the record key on disk.
pub const KEY_BYTES: usize = 8;
/// Width of the payload-length field on disk.
pub const LEN_BYTES: usize = 4;
/// Total record header width.
pub const HEADER_BYTES: usize = KEY_BYTES + LEN_BYTES;
/// Smallest payload a well-formed record may declare.
pub const MIN_PAYLOAD: u32 = 8;

/// Total on-disk size of a record with the given payload length.
#[must_use]
pub fn record_span(len: u32) -> usize {
    HEADER_BYTES + len as usize
}

/// Name of the unsorted input file for a `(records, payload_max)` pair.
#[must_use]
pub fn unsorted_file_name(records: u64, payload_max: u32) -> String {
    format!("unsorted_{records}_{payload_max}.bin")
}

/// Name of the sorted output file for a `(records, payload_max)` pair.
#[must_use]
pub fn sorted_file_name(records: u64, payload_max: u32) -> String {
    format!("sorted_{records}_{payload_max}.bin")
}

/// Read one record header at `pos`, or `None` if fewer than
/// [`HEADER_BYTES`] remain.
#[must_use]
pub fn read_header(data: &[u8], pos: usize) -> Option<(u64, u32)> {
    let end = pos.checked_add(HEADER_BYTES)?;
    if end > data.len() {
        return None;
    }
    let key = u64::from_le_bytes(data[pos..pos + KEY_BYTES].try_into().ok()?);
    let len = u32::from_le_bytes(data[pos + KEY_BYTES..end].try_into().ok()?);
    Some((key, len))
}

/// Write one record header into `buf` (which must hold [`HEADER_BYTES`]).
pub fn write_header(buf: &mut [u8], key: u64, len: u32) {
    buf[..KEY_BYTES].copy_from_slice(&key.to_le_bytes());
    buf[KEY_BYTES..HEADER_BYTES].copy_from_slice(&len.to_le_bytes());
}

/// The unsorted input, mapped read-only for the whole sort.
#[derive(Debug)]
pub struct InputFile {
    path: PathBuf,
    // None only for a zero-length file, which cannot be mapped.
    map: Option<Mmap>,
}

impl InputFile {
    /// Open and map the file at `path`.
    ///
    /// The file length comes from the file itself; mapping failures are
    /// fatal to the caller.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| RecsortError::io("open", path, e))?;
        let len = file.metadata().map_err(|e| RecsortError::io("stat", path, e))?.len();

        let map = if len == 0 {
            None
        } else {
            let map = unsafe { MmapOptions::new().map(&file) }
                .map_err(|e| RecsortError::io("mmap", path, e))?;
            Some(map)
        };

        Ok(Self { path: path.to_path_buf(), map })
    }

    /// The mapped bytes (empty for a zero-length file).
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        self.map.as_deref().unwrap_or(&[])
    }

    /// File length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    /// Whether the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Path this file was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// The sorted output, created at its exact size and mapped writable.
pub struct OutputFile {
    path: PathBuf,
    file: File,
    // None only for a zero-length output.
    map: Option<MmapMut>,
}

impl OutputFile {
    /// Create (or truncate) `path` at exactly `size` bytes and map it.
    pub fn create(path: impl AsRef<Path>, size: u64) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| RecsortError::io("create", path, e))?;
        file.set_len(size).map_err(|e| RecsortError::io("truncate", path, e))?;

        let map = if size == 0 {
            None
        } else {
            let map = unsafe { MmapOptions::new().map_mut(&file) }
                .map_err(|e| RecsortError::io("mmap", path, e))?;
            Some(map)
        };

        Ok(Self { path: path.to_path_buf(), file, map })
    }

    /// The writable mapped bytes (empty for a zero-length output).
    #[must_use]
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        self.map.as_deref_mut().unwrap_or(&mut [])
    }

    /// Flush the mapping (and for an empty file, the file handle) to disk.
    pub fn flush(&self) -> Result<()> {
        match &self.map {
            Some(map) => map.flush().map_err(|e| RecsortError::io("flush", &self.path, e)),
            None => self.file.sync_all().map_err(|e| RecsortError::io("flush", &self.path, e)),
        }
    }

    /// Path this file was created at.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_file_names() {
        assert_eq!(unsorted_file_name(1_000_000, 256), "unsorted_1000000_256.bin");
        assert_eq!(sorted_file_name(42, 8), "sorted_42_8.bin");
    }

    #[test]
    fn test_header_round_trip() {
        let mut buf = [0u8; HEADER_BYTES];
        write_header(&mut buf, 0xdead_beef_cafe_f00d, 57);
        assert_eq!(read_header(&buf, 0), Some((0xdead_beef_cafe_f00d, 57)));
    }

    #[test]
    fn test_read_header_truncated() {
        let buf = [0u8; HEADER_BYTES];
        assert_eq!(read_header(&buf[..HEADER_BYTES - 1], 0), None);
        assert_eq!(read_header(&buf, 1), None);
        assert_eq!(read_header(&buf, usize::MAX), None);
    }

    #[test]
    fn test_input_file_maps_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("input.bin");
        let mut f = File::create(&path).unwrap();
        f.write_all(b"0123456789abcdef").unwrap();
        drop(f);

        let input = InputFile::open(&path).unwrap();
        assert_eq!(input.len(), 16);
        assert_eq!(&input.bytes()[..4], b"0123");
    }

    #[test]
    fn test_input_file_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.bin");
        File::create(&path).unwrap();

        let input = InputFile::open(&path).unwrap();
        assert!(input.is_empty());
        assert_eq!(input.bytes(), &[] as &[u8]);
    }

    #[test]
    fn test_input_file_missing_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = InputFile::open(dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, RecsortError::Io { op: "open", .. }));
    }

    #[test]
    fn test_output_file_exact_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.bin");

        let mut out = OutputFile::create(&path, 64).unwrap();
        out.bytes_mut()[..4].copy_from_slice(b"sort");
        out.flush().unwrap();
        drop(out);

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 64);
        assert_eq!(&std::fs::read(&path).unwrap()[..4], b"sort");
    }

    #[test]
    fn test_output_file_zero_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.bin");

        let mut out = OutputFile::create(&path, 0).unwrap();
        assert!(out.bytes_mut().is_empty());
        out.flush().unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_output_file_truncates_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.bin");
        std::fs::write(&path, vec![0xffu8; 128]).unwrap();

        let out = OutputFile::create(&path, 16).unwrap();
        out.flush().unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 16);
    }
}
