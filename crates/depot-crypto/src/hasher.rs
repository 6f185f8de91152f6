use std::collections::BTreeMap;
use std::io::{self, Read};

use depot_types::ChecksumType;
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Buffer size for streaming reads (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Incremental hasher computing every supported digest in one pass.
///
/// Feed content with [`update`](Self::update) as it streams through and call
/// [`finish`](Self::finish) once the last chunk has been seen.
#[derive(Clone, Default)]
pub struct MultiHasher {
    md5: Md5,
    sha1: Sha1,
    sha256: Sha256,
    bytes: u64,
}

impl MultiHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk of content.
    pub fn update(&mut self, chunk: &[u8]) {
        self.md5.update(chunk);
        self.sha1.update(chunk);
        self.sha256.update(chunk);
        self.bytes += chunk.len() as u64;
    }

    /// Number of bytes hashed so far.
    pub fn bytes_hashed(&self) -> u64 {
        self.bytes
    }

    /// Lower-case hex digests keyed by algorithm.
    pub fn finish(self) -> BTreeMap<ChecksumType, String> {
        BTreeMap::from([
            (ChecksumType::Md5, hex::encode(self.md5.finalize())),
            (ChecksumType::Sha1, hex::encode(self.sha1.finalize())),
            (ChecksumType::Sha256, hex::encode(self.sha256.finalize())),
        ])
    }
}

/// One-shot checksum helpers.
pub struct ChecksumCalculator;

impl ChecksumCalculator {
    /// Digest an in-memory buffer with every supported algorithm.
    pub fn compute(data: &[u8]) -> BTreeMap<ChecksumType, String> {
        let mut hasher = MultiHasher::new();
        hasher.update(data);
        hasher.finish()
    }

    /// Digest a reader to exhaustion with every supported algorithm.
    pub fn compute_reader<R: Read>(mut reader: R) -> io::Result<BTreeMap<ChecksumType, String>> {
        let mut hasher = MultiHasher::new();
        let mut buffer = vec![0u8; BUFFER_SIZE];
        loop {
            let read = reader.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }
        Ok(hasher.finish())
    }

    /// Digest a buffer with a single algorithm.
    pub fn compute_one(checksum_type: ChecksumType, data: &[u8]) -> String {
        match checksum_type {
            ChecksumType::Md5 => hex::encode(Md5::digest(data)),
            ChecksumType::Sha1 => hex::encode(Sha1::digest(data)),
            ChecksumType::Sha256 => hex::encode(Sha256::digest(data)),
        }
    }
}
