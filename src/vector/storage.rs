//! Memory-mapped vector storage for high-performance vector access.
//!
//! Embedding vectors for one index generation live in a single binary
//! file, read through a memory map so lookups avoid deserialization and
//! ride the OS page cache.
//!
//! # Storage Format
//!
//! - Header (16 bytes): magic, version, dimension, vector count
//! - Rows: vector ID (u32 LE) followed by the f32 LE payload
//!
//! Vector IDs are assigned densely starting at 1 in insertion order, so
//! the row for an ID sits at a computable offset. The stored ID is still
//! verified on read to catch corruption.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapOptions};
use thiserror::Error;

use crate::vector::types::{VectorDimension, VectorError, VectorId};

/// Current storage format version.
const STORAGE_VERSION: u32 = 1;

/// Size of the storage header in bytes.
const HEADER_SIZE: usize = 16;

/// Magic bytes to identify vector storage files.
const MAGIC_BYTES: &[u8; 4] = b"NVEC";

/// Number of bytes per f32 value.
const BYTES_PER_F32: usize = 4;

/// Number of bytes per vector ID (u32).
const BYTES_PER_ID: usize = 4;

/// Errors specific to vector storage operations.
#[derive(Error, Debug)]
pub enum VectorStorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid storage format: {0}")]
    InvalidFormat(String),

    #[error("Vector error: {0}")]
    Vector(#[from] VectorError),
}

/// Memory-mapped vector storage for one index generation.
#[derive(Debug)]
pub struct MmapVectorStorage {
    /// Path to the storage file.
    path: PathBuf,

    /// Memory-mapped file for reading.
    mmap: Option<Mmap>,

    /// Vector dimension (all vectors must have same dimension).
    dimension: VectorDimension,

    /// Number of vectors currently stored.
    vector_count: usize,
}

impl MmapVectorStorage {
    /// Creates new, empty vector storage at the given file path.
    pub fn create(
        path: impl AsRef<Path>,
        dimension: VectorDimension,
    ) -> Result<Self, VectorStorageError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut storage = Self {
            path,
            mmap: None,
            dimension,
            vector_count: 0,
        };

        let mut file = File::create(&storage.path)?;
        storage.write_header(&mut file)?;
        file.flush()?;

        Ok(storage)
    }

    /// Opens existing vector storage from disk.
    ///
    /// Returns an error if the file doesn't exist or has invalid format.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VectorStorageError> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(VectorStorageError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Vector storage file not found: {path:?}"),
            )));
        }

        let file = File::open(&path)?;
        let mmap = unsafe { MmapOptions::new().map(&file)? };

        let (version, dimension, vector_count) = Self::read_header(&mmap)?;

        if version != STORAGE_VERSION {
            return Err(VectorError::VersionMismatch {
                expected: STORAGE_VERSION,
                actual: version,
            }
            .into());
        }

        Ok(Self {
            path,
            mmap: Some(mmap),
            dimension,
            vector_count,
        })
    }

    /// Appends a batch of vectors to storage.
    ///
    /// IDs must continue the dense sequence (the first vector of the
    /// batch carries ID `vector_count + 1`). Writing batches minimizes
    /// file operations compared to writing vectors one by one.
    pub fn write_batch(
        &mut self,
        vectors: &[(VectorId, &[f32])],
    ) -> Result<(), VectorStorageError> {
        for (i, (id, vector)) in vectors.iter().enumerate() {
            self.dimension.validate_vector(vector)?;

            let expected = (self.vector_count + i + 1) as u32;
            if id.get() != expected {
                return Err(VectorStorageError::InvalidFormat(format!(
                    "Non-contiguous vector ID: expected {expected}, got {}",
                    id.get()
                )));
            }
        }

        self.append_vectors(vectors)?;
        self.vector_count += vectors.len();
        self.update_header_count()?;

        // Drop the map so the next read sees the appended rows
        self.mmap = None;
        Ok(())
    }

    fn append_vectors(&self, vectors: &[(VectorId, &[f32])]) -> Result<(), VectorStorageError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if file.metadata()?.len() == 0 {
            self.write_header(&mut file)?;
        }

        for (id, vector) in vectors {
            file.write_all(&id.to_bytes())?;
            for &value in *vector {
                file.write_all(&value.to_le_bytes())?;
            }
        }

        file.flush()?;
        Ok(())
    }

    /// Reads a vector by its ID.
    ///
    /// Dense IDs make this a direct offset computation rather than a
    /// scan. Returns `None` if the ID is out of range.
    #[must_use]
    pub fn read_vector(&mut self, id: VectorId) -> Option<Vec<f32>> {
        self.ensure_mapped().ok()?;
        let mmap = self.mmap.as_ref()?;

        let ordinal = id.get() as usize;
        if ordinal > self.vector_count {
            return None;
        }

        let dimension = self.dimension.get();
        let row_size = BYTES_PER_ID + dimension * BYTES_PER_F32;
        let offset = HEADER_SIZE + (ordinal - 1) * row_size;

        if offset + row_size > mmap.len() {
            return None;
        }

        let stored_id = u32::from_le_bytes([
            mmap[offset],
            mmap[offset + 1],
            mmap[offset + 2],
            mmap[offset + 3],
        ]);
        if stored_id != id.get() {
            return None;
        }

        Some(Self::read_payload(mmap, offset + BYTES_PER_ID, dimension))
    }

    /// Reads all vectors from storage in ID order.
    ///
    /// Used by clustering, which needs the full vector set in memory.
    pub fn read_all_vectors(&mut self) -> Result<Vec<(VectorId, Vec<f32>)>, VectorStorageError> {
        self.ensure_mapped()?;
        let mmap = self
            .mmap
            .as_ref()
            .ok_or_else(|| VectorStorageError::InvalidFormat("Storage not mapped".to_string()))?;

        let dimension = self.dimension.get();
        let row_size = BYTES_PER_ID + dimension * BYTES_PER_F32;
        let mut vectors = Vec::with_capacity(self.vector_count);

        let mut offset = HEADER_SIZE;
        while offset + row_size <= mmap.len() {
            let id_bytes = [
                mmap[offset],
                mmap[offset + 1],
                mmap[offset + 2],
                mmap[offset + 3],
            ];
            let id = VectorId::from_bytes(id_bytes).ok_or_else(|| {
                VectorStorageError::InvalidFormat("Invalid vector ID".to_string())
            })?;

            let vector = Self::read_payload(mmap, offset + BYTES_PER_ID, dimension);
            vectors.push((id, vector));
            offset += row_size;
        }

        Ok(vectors)
    }

    /// Returns the number of vectors stored.
    #[must_use]
    pub fn vector_count(&self) -> usize {
        self.vector_count
    }

    /// Returns the vector dimension.
    #[must_use]
    pub fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    /// Returns the size of the storage file in bytes.
    pub fn file_size(&self) -> Result<u64, io::Error> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    // Private helper methods

    fn read_payload(mmap: &Mmap, data_offset: usize, dimension: usize) -> Vec<f32> {
        let mut vector = Vec::with_capacity(dimension);
        for i in 0..dimension {
            let bytes_offset = data_offset + i * BYTES_PER_F32;
            let value = f32::from_le_bytes([
                mmap[bytes_offset],
                mmap[bytes_offset + 1],
                mmap[bytes_offset + 2],
                mmap[bytes_offset + 3],
            ]);
            vector.push(value);
        }
        vector
    }

    fn write_header(&self, file: &mut File) -> Result<(), io::Error> {
        file.write_all(MAGIC_BYTES)?;
        file.write_all(&STORAGE_VERSION.to_le_bytes())?;
        file.write_all(&(self.dimension.get() as u32).to_le_bytes())?;
        file.write_all(&0u32.to_le_bytes())?;
        Ok(())
    }

    fn read_header(mmap: &Mmap) -> Result<(u32, VectorDimension, usize), VectorStorageError> {
        if mmap.len() < HEADER_SIZE {
            return Err(VectorStorageError::InvalidFormat(
                "File too small to contain header".to_string(),
            ));
        }

        if &mmap[0..4] != MAGIC_BYTES {
            return Err(VectorStorageError::InvalidFormat(
                "Invalid magic bytes".to_string(),
            ));
        }

        let version = u32::from_le_bytes([mmap[4], mmap[5], mmap[6], mmap[7]]);

        let dim_value = u32::from_le_bytes([mmap[8], mmap[9], mmap[10], mmap[11]]);
        let dimension = VectorDimension::new(dim_value as usize)?;

        let vector_count = u32::from_le_bytes([mmap[12], mmap[13], mmap[14], mmap[15]]) as usize;

        Ok((version, dimension, vector_count))
    }

    fn ensure_mapped(&mut self) -> Result<(), VectorStorageError> {
        if self.mmap.is_none() {
            let file = File::open(&self.path)?;
            let mmap = unsafe { MmapOptions::new().map(&file)? };

            let (_, _, count) = Self::read_header(&mmap)?;
            self.vector_count = count;
            self.mmap = Some(mmap);
        }
        Ok(())
    }

    fn update_header_count(&self) -> Result<(), VectorStorageError> {
        use std::io::{Seek, SeekFrom};

        let mut file = OpenOptions::new().write(true).open(&self.path)?;

        // Vector count lives at byte 12 of the header
        file.seek(SeekFrom::Start(12))?;
        file.write_all(&(self.vector_count as u32).to_le_bytes())?;
        file.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_vector(dim: usize, seed: f32) -> Vec<f32> {
        (0..dim).map(|i| seed + i as f32 * 0.01).collect()
    }

    #[test]
    fn test_write_and_read_batch() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("vectors.vec");
        let dim = VectorDimension::new(8).unwrap();

        let mut storage = MmapVectorStorage::create(&path, dim).unwrap();

        let v1 = make_vector(8, 1.0);
        let v2 = make_vector(8, 2.0);
        let batch: Vec<(VectorId, &[f32])> = vec![
            (VectorId::new_unchecked(1), v1.as_slice()),
            (VectorId::new_unchecked(2), v2.as_slice()),
        ];
        storage.write_batch(&batch).unwrap();

        assert_eq!(storage.vector_count(), 2);
        assert_eq!(
            storage.read_vector(VectorId::new_unchecked(1)).unwrap(),
            v1
        );
        assert_eq!(
            storage.read_vector(VectorId::new_unchecked(2)).unwrap(),
            v2
        );
        assert!(storage.read_vector(VectorId::new_unchecked(3)).is_none());
    }

    #[test]
    fn test_reopen_preserves_vectors() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("vectors.vec");
        let dim = VectorDimension::new(4).unwrap();

        let v1 = make_vector(4, 0.5);
        {
            let mut storage = MmapVectorStorage::create(&path, dim).unwrap();
            let batch: Vec<(VectorId, &[f32])> =
                vec![(VectorId::new_unchecked(1), v1.as_slice())];
            storage.write_batch(&batch).unwrap();
        }

        let mut reopened = MmapVectorStorage::open(&path).unwrap();
        assert_eq!(reopened.vector_count(), 1);
        assert_eq!(reopened.dimension().get(), 4);
        assert_eq!(
            reopened.read_vector(VectorId::new_unchecked(1)).unwrap(),
            v1
        );
    }

    #[test]
    fn test_multiple_batches_accumulate() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("vectors.vec");
        let dim = VectorDimension::new(4).unwrap();

        let mut storage = MmapVectorStorage::create(&path, dim).unwrap();

        let v1 = make_vector(4, 1.0);
        let v2 = make_vector(4, 2.0);
        let b1: Vec<(VectorId, &[f32])> = vec![(VectorId::new_unchecked(1), v1.as_slice())];
        let b2: Vec<(VectorId, &[f32])> = vec![(VectorId::new_unchecked(2), v2.as_slice())];
        storage.write_batch(&b1).unwrap();
        storage.write_batch(&b2).unwrap();

        let all = storage.read_all_vectors().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].0.get(), 1);
        assert_eq!(all[1].0.get(), 2);
        assert_eq!(all[1].1, v2);
    }

    #[test]
    fn test_non_contiguous_ids_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("vectors.vec");
        let dim = VectorDimension::new(4).unwrap();

        let mut storage = MmapVectorStorage::create(&path, dim).unwrap();
        let v = make_vector(4, 1.0);
        let batch: Vec<(VectorId, &[f32])> = vec![(VectorId::new_unchecked(5), v.as_slice())];
        assert!(storage.write_batch(&batch).is_err());
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("vectors.vec");
        let dim = VectorDimension::new(4).unwrap();

        let mut storage = MmapVectorStorage::create(&path, dim).unwrap();
        let wrong = make_vector(8, 1.0);
        let batch: Vec<(VectorId, &[f32])> = vec![(VectorId::new_unchecked(1), wrong.as_slice())];
        assert!(storage.write_batch(&batch).is_err());
    }

    #[test]
    fn test_open_missing_file() {
        let temp = TempDir::new().unwrap();
        assert!(MmapVectorStorage::open(temp.path().join("nope.vec")).is_err());
    }

    #[test]
    fn test_open_rejects_bad_magic() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("vectors.vec");
        std::fs::write(&path, b"XXXX0000000000000000").unwrap();
        assert!(MmapVectorStorage::open(&path).is_err());
    }
}
