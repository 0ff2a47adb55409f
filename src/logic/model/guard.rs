//! Model Guard - artifact pinning
//!
//! Scores are only comparable for one artifact version, so the running model
//! can be pinned by SHA-256 (`MODEL_SHA256`).

use std::fs::File;
use std::io::{BufReader, Read};

use sha2::{Digest, Sha256};

use crate::logic::error::InitError;

/// Hex SHA-256 of a file
pub fn file_sha256(path: &str) -> Result<String, InitError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Hash the artifact and compare with the pinned digest, if any
pub fn verify_model_checksum(path: &str, expected: Option<&str>) -> Result<String, InitError> {
    let actual = file_sha256(path)?;

    match expected {
        Some(expected) if !expected.eq_ignore_ascii_case(&actual) => {
            log::error!("Model checksum mismatch for {}", path);
            Err(InitError::ChecksumMismatch {
                expected: expected.to_string(),
                actual,
            })
        }
        Some(_) => {
            log::info!("Model checksum verified");
            Ok(actual)
        }
        None => {
            log::debug!("No model checksum pinned, running {}", actual);
            Ok(actual)
        }
    }
}
