use crate::error::Result;
use blake3::Hash as Blake3Hash;

use std::{fs::File, io::Read, path::Path};

/// Compute the BLAKE3 hash of a file's contents
pub fn compute_cryptographic<P: AsRef<Path>>(path: P) -> Result<Blake3Hash> {
    let mut file = File::open(&path)?;
    let mut hasher = blake3::Hasher::new();

    let mut buffer = [0; 8192];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize())
}
