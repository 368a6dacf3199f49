use std::fs::File;
use std::hash::Hasher as _;
use std::io::{self, Read};
use std::path::Path;
use twox_hash::XxHash64;

pub const PARTIAL_BLOCK_LENGTH: usize = 1024; // 1KB

/// Full-content digest used to declare two files byte-identical. The action
/// engine deletes and relinks based on digest equality, so the digest must be
/// cryptographic; the partial hash below is only ever used to prune.
pub trait ContentDigester: Send + Sync {
    fn digest_file(&self, path: &Path) -> io::Result<String>;
}

/// Streaming BLAKE3 digest, hex-encoded. Reads the file through the hasher
/// rather than loading it into memory.
pub struct Blake3Digester;

impl ContentDigester for Blake3Digester {
    fn digest_file(&self, path: &Path) -> io::Result<String> {
        let mut file = File::open(path)?;
        let mut hasher = blake3::Hasher::new();
        io::copy(&mut file, &mut hasher)?;
        Ok(hasher.finalize().to_hex().to_string())
    }
}

/// Cheap first-tier hash over the leading block of a file. Two files whose
/// partial hashes differ cannot be identical; matching partial hashes prove
/// nothing and must be confirmed by a full digest.
pub fn partial_hash(path: &Path) -> io::Result<u64> {
    let mut f = File::open(path)?;
    let mut buffer = vec![0u8; PARTIAL_BLOCK_LENGTH];
    let bytes_read = f.read(&mut buffer)?;
    buffer.truncate(bytes_read);
    Ok(hash_block(&buffer))
}

pub fn hash_block(data: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(data);
    hasher.finish()
}
