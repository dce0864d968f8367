//! Binary storage for index generations.
//!
//! File format: vectors.bin
//!
//! Header (59 bytes):
//! - version: u8 (1)
//! - model_id: [u8; 32] (SHA256 hash of model name)
//! - dimensions: u16 (little-endian)
//! - entry_count: u64 (little-endian)
//! - source_count: u64 (little-endian, catalog size at build time)
//! - payload_checksum: u32 (CRC32 of everything after the header)
//! - header_checksum: u32 (CRC32 of header fields before it)
//!
//! Payload:
//! - entries (repeated entry_count times):
//!   - movie_id: u64 (little-endian)
//!   - embedding: [f32; dimensions] (little-endian)
//! - metadata_len: u64 (little-endian)
//! - metadata: JSON array of `MovieMeta`, one per entry in row order

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::semantic::index::{Generation, IndexError, MovieMeta};
use crate::storage::StorageManager;

/// Current file format version
const FORMAT_VERSION: u8 = 1;

/// Header size in bytes
const HEADER_SIZE: usize = 59;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum VectorStorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Version mismatch: file version {0}, supported version {1}")]
    VersionMismatch(u8, u8),

    #[error("Model mismatch: file uses different model")]
    ModelMismatch,

    #[error("Checksum mismatch: file may be corrupted")]
    ChecksumMismatch,

    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),
}

/// SHA256 of the model name; identifies which encoder produced a blob.
pub fn model_id_hash(model_name: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(model_name.as_bytes());
    hasher.finalize().into()
}

/// File header structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub model_id: [u8; 32],
    pub dimensions: u16,
    pub entry_count: u64,
    pub source_count: u64,
    pub payload_checksum: u32,
}

/// Storage manager for the persisted generation.
pub struct VectorStorage {
    store: Arc<dyn StorageManager>,
    ident: String,
}

impl VectorStorage {
    pub fn new(store: Arc<dyn StorageManager>, ident: &str) -> Self {
        Self {
            store,
            ident: ident.to_string(),
        }
    }

    /// Check if the storage file exists.
    pub fn exists(&self) -> bool {
        self.store.exists(&self.ident)
    }

    /// Load a generation written by the model identified by `expected_model_id`.
    pub fn load(&self, expected_model_id: &[u8; 32]) -> Result<Generation, VectorStorageError> {
        let bytes = self.store.read(&self.ident)?;
        decode(&bytes, expected_model_id)
    }

    /// Read and verify only the header.
    pub fn load_header(&self) -> Result<Header, VectorStorageError> {
        let bytes = self.store.read(&self.ident)?;
        read_header(&bytes)
    }

    /// Save a generation. The underlying store writes temp -> fsync -> rename.
    pub fn save(&self, generation: &Generation, model_id: &[u8; 32]) -> Result<(), VectorStorageError> {
        let bytes = encode(generation, model_id)?;
        self.store.write(&self.ident, &bytes)?;
        Ok(())
    }

    /// Delete the storage file if it exists.
    pub fn delete(&self) -> Result<(), VectorStorageError> {
        if self.exists() {
            self.store.delete(&self.ident)?;
        }
        Ok(())
    }
}

pub fn encode(generation: &Generation, model_id: &[u8; 32]) -> Result<Vec<u8>, VectorStorageError> {
    let dimensions = u16::try_from(generation.dimensions()).map_err(|_| {
        VectorStorageError::InvalidFormat(format!(
            "{} dimensions do not fit the header",
            generation.dimensions()
        ))
    })?;

    let mut payload = Vec::with_capacity(generation.len() * (8 + 4 * generation.dimensions()));
    for (row, id) in generation.ids().iter().enumerate() {
        payload.extend_from_slice(&id.to_le_bytes());
        for value in generation.row(row) {
            payload.extend_from_slice(&value.to_le_bytes());
        }
    }

    let metadata = serde_json::to_vec(generation.metadata())?;
    payload.extend_from_slice(&(metadata.len() as u64).to_le_bytes());
    payload.extend_from_slice(&metadata);

    let header = Header {
        model_id: *model_id,
        dimensions,
        entry_count: generation.len() as u64,
        source_count: generation.source_count() as u64,
        payload_checksum: crc32fast::hash(&payload),
    };

    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
    bytes.extend_from_slice(&write_header(&header));
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

pub fn decode(bytes: &[u8], expected_model_id: &[u8; 32]) -> Result<Generation, VectorStorageError> {
    let header = read_header(bytes)?;
    if header.model_id != *expected_model_id {
        return Err(VectorStorageError::ModelMismatch);
    }

    let payload = &bytes[HEADER_SIZE..];
    if crc32fast::hash(payload) != header.payload_checksum {
        return Err(VectorStorageError::ChecksumMismatch);
    }

    let dimensions = header.dimensions as usize;
    let entry_count = usize::try_from(header.entry_count)
        .map_err(|_| VectorStorageError::InvalidFormat("entry count overflows usize".to_string()))?;
    let entry_size = 8 + 4 * dimensions;
    let entries_len = entry_count
        .checked_mul(entry_size)
        .ok_or_else(|| VectorStorageError::InvalidFormat("entry section overflows".to_string()))?;

    let mut cursor = Cursor::new(payload);
    let entries = cursor.take(entries_len)?;

    let mut ids = Vec::with_capacity(entry_count);
    let mut matrix = Vec::with_capacity(entry_count * dimensions);
    for entry in entries.chunks_exact(entry_size) {
        ids.push(u64::from_le_bytes(le_array(&entry[..8])));
        matrix.extend(
            entry[8..]
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes(le_array(b))),
        );
    }

    let metadata_len = u64::from_le_bytes(le_array(cursor.take(8)?));
    let metadata_len = usize::try_from(metadata_len)
        .map_err(|_| VectorStorageError::InvalidFormat("metadata length overflows usize".to_string()))?;
    let metadata: Vec<MovieMeta> = serde_json::from_slice(cursor.take(metadata_len)?)?;

    if !cursor.is_empty() {
        return Err(VectorStorageError::InvalidFormat(
            "trailing bytes after metadata".to_string(),
        ));
    }

    Ok(Generation::from_matrix(
        dimensions,
        matrix,
        ids,
        metadata,
        header.source_count as usize,
    )?)
}

fn write_header(header: &Header) -> [u8; HEADER_SIZE] {
    let mut header_bytes = [0u8; HEADER_SIZE];

    header_bytes[0] = FORMAT_VERSION;
    header_bytes[1..33].copy_from_slice(&header.model_id);
    header_bytes[33..35].copy_from_slice(&header.dimensions.to_le_bytes());
    header_bytes[35..43].copy_from_slice(&header.entry_count.to_le_bytes());
    header_bytes[43..51].copy_from_slice(&header.source_count.to_le_bytes());
    header_bytes[51..55].copy_from_slice(&header.payload_checksum.to_le_bytes());

    let checksum = crc32fast::hash(&header_bytes[0..55]);
    header_bytes[55..59].copy_from_slice(&checksum.to_le_bytes());

    header_bytes
}

fn read_header(bytes: &[u8]) -> Result<Header, VectorStorageError> {
    if bytes.len() < HEADER_SIZE {
        return Err(VectorStorageError::InvalidFormat(format!(
            "file is {} bytes, header needs {}",
            bytes.len(),
            HEADER_SIZE
        )));
    }

    let version = bytes[0];
    if version != FORMAT_VERSION {
        return Err(VectorStorageError::VersionMismatch(version, FORMAT_VERSION));
    }

    let stored_checksum = u32::from_le_bytes(le_array(&bytes[55..59]));
    if crc32fast::hash(&bytes[0..55]) != stored_checksum {
        return Err(VectorStorageError::ChecksumMismatch);
    }

    Ok(Header {
        model_id: le_array(&bytes[1..33]),
        dimensions: u16::from_le_bytes(le_array(&bytes[33..35])),
        entry_count: u64::from_le_bytes(le_array(&bytes[35..43])),
        source_count: u64::from_le_bytes(le_array(&bytes[43..51])),
        payload_checksum: u32::from_le_bytes(le_array(&bytes[51..55])),
    })
}

/// Copy a slice of known length into a fixed-size array.
fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

struct Cursor<'a> {
    bytes: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], VectorStorageError> {
        if self.bytes.len() < len {
            return Err(VectorStorageError::InvalidFormat(format!(
                "truncated payload: wanted {} bytes, {} left",
                len,
                self.bytes.len()
            )));
        }
        let (head, tail) = self.bytes.split_at(len);
        self.bytes = tail;
        Ok(head)
    }

    fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
