//! Identifier generation and type normalization

use crate::error::{Result, StoreError};
use rand::RngCore;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

fn type_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_]+$").unwrap())
}

/// Validate a type string (`[a-zA-Z0-9_]+`) and normalize it to lowercase
pub fn normalize_type(raw: &str) -> Result<String> {
    if !type_pattern().is_match(raw) {
        return Err(StoreError::Validation(format!(
            "invalid type {:?}: expected [a-zA-Z0-9_]+",
            raw
        )));
    }
    Ok(raw.to_lowercase())
}

/// Generate a composite item identifier of the form `"{type}:{hex}"`
///
/// The token is a SHA-256 over the current timestamp, 16 random bytes and
/// the type, hex-encoded. The type must already be normalized.
pub fn generate_item_id(item_type: &str) -> String {
    let mut random = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut random);

    let mut hasher = Sha256::new();
    hasher.update(chrono::Utc::now().timestamp_millis().to_be_bytes());
    hasher.update(random);
    hasher.update(item_type.as_bytes());

    format!("{}:{}", item_type, hex::encode(hasher.finalize()))
}

/// Compose the uniqueness token for a data record
pub fn sub_id(item_hash: &str, data_type: &str) -> String {
    format!("{}/{}", item_hash, data_type)
}
