// src/checksum.rs
use std::{fs::File, io::Read, path::Path};

use anyhow::{Context, Result};

/// Streaming BLAKE3 of a file, hex encoded.
pub fn compute_blake3(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("cannot open `{}` for BLAKE3", path.display()))?;

    let mut hasher = blake3::Hasher::new();
    let mut buf = [0u8; 8192];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_one_shot_hash() {
        let dir = std::env::temp_dir();
        let path = dir.join("poemstudio_checksum_test.bin");
        let data = b"spring night happy rain".repeat(1000);
        std::fs::write(&path, &data).unwrap();

        let streamed = compute_blake3(&path).unwrap();
        assert_eq!(streamed, blake3::hash(&data).to_hex().to_string());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(compute_blake3(Path::new("/nonexistent/nope.bin")).is_err());
    }
}
