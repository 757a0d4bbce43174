//! Hash-based task ID generation.
//!
//! IDs have the form `{prefix}-{hash}` (e.g. "tw-a3f8k2") where the hash is
//! the base36 encoding of a SHA-256 digest over the tenant, sequence number,
//! title, creation time and a retry nonce. Collisions with known IDs are
//! retried with the next nonce.

use crate::domain::{TaskId, TenantId};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

const BASE36_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const MAX_NONCE: u32 = 100;

/// Length of the hash part of an ID.
pub const HASH_LENGTH: usize = 6;

/// Errors that can occur during ID generation
#[derive(Debug, Error)]
pub enum IdGenerationError {
    /// Unable to generate a unique ID after exhausting all nonces
    #[error("Unable to generate unique ID after {attempts} attempts")]
    CollisionExhausted {
        /// Number of nonces tried
        attempts: u32,
    },
}

/// Generate a task ID not contained in `existing`.
///
/// # Errors
///
/// Returns `IdGenerationError::CollisionExhausted` if every nonce collides.
pub fn generate_task_id(
    prefix: &str,
    tenant: &TenantId,
    number: u32,
    title: &str,
    existing: &HashSet<&TaskId>,
) -> Result<TaskId, IdGenerationError> {
    let timestamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();

    for nonce in 0..MAX_NONCE {
        let content = format!("{tenant}|{number}|{title}|{timestamp}|{nonce}");
        let digest = Sha256::digest(content.as_bytes());
        let id = TaskId::new(format!("{prefix}-{}", encode_base36(&digest[..8], HASH_LENGTH)));

        if !existing.contains(&id) {
            if nonce > 0 {
                debug!(nonce, "Generated unique ID after collision retries");
            }
            return Ok(id);
        }
    }

    Err(IdGenerationError::CollisionExhausted {
        attempts: MAX_NONCE,
    })
}

/// Encode up to 8 bytes as a fixed-length base36 string.
fn encode_base36(bytes: &[u8], length: usize) -> String {
    let mut n = bytes
        .iter()
        .fold(0u64, |acc, &byte| acc.wrapping_shl(8).wrapping_add(u64::from(byte)));

    let mut result = Vec::with_capacity(length);
    while result.len() < length {
        // n % 36 < 36, always a valid index
        result.push(char::from(BASE36_CHARS[(n % 36) as usize]));
        n /= 36;
    }
    result.iter().rev().collect()
}
