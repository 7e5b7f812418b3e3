//! Proof-of-work engine.
//!
//! # Responsibilities
//! - Generate random challenges of controllable cost
//! - Verify claimed solutions in O(1) hash evaluations
//! - Brute-force solving for the requesting side
//!
//! # Design Decisions
//! - Difficulty is the number of trailing zero bits required of
//!   `SHA-256(challenge ++ solution)`; expected solver cost doubles per bit
//! - Pure functions, no internal state; cancellation is an external flag
//!   checked once per batch so the hot loop stays branch-light

use std::sync::atomic::{AtomicBool, Ordering};

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

const BYTE_BITS: usize = 8;

/// Attempts before challenge generation gives up.
const MAX_GEN_ATTEMPTS: usize = 100;

/// Solver iterations between cancellation checks.
const RESOLVE_BATCH: u64 = 1000;

/// Errors local to the proof-of-work engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PowError {
    /// Requested bit count exceeds the digest's bit length (caller bug).
    #[error("bit count exceeds digest size")]
    InvalidBitCheck,

    /// Challenge generation exhausted its attempts or the request was
    /// degenerate (zero length, zero bits, or more bits than bytes hold).
    #[error("unable to generate appropriate challenge")]
    UnableToGenerate,

    /// Solution search was cancelled before completing.
    #[error("resolution interrupted")]
    Interrupted,
}

/// SHA-256 digest of `data`.
pub fn hash(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// True iff the least-significant `n` bits of `data` are all zero.
///
/// Fails with [`PowError::InvalidBitCheck`] when `n` exceeds the bit length
/// of `data`.
pub fn check_lower_bits_zero(data: &[u8], n: u32) -> Result<bool, PowError> {
    let n = n as usize;
    if n > data.len() * BYTE_BITS {
        return Err(PowError::InvalidBitCheck);
    }

    let full_bytes = n / BYTE_BITS;
    let rem_bits = n % BYTE_BITS;

    for i in 1..=full_bytes {
        if data[data.len() - i] != 0 {
            return Ok(false);
        }
    }

    if rem_bits > 0 {
        let last = data[data.len() - full_bytes - 1];
        let mask = (1u8 << rem_bits) - 1;

        if last & mask != 0 {
            return Ok(false);
        }
    }

    Ok(true)
}

/// Generate `byte_len` cryptographically random bytes whose hash does *not*
/// already satisfy the `zero_bits` check, so an empty solution never wins.
///
/// Fails with [`PowError::UnableToGenerate`] on a degenerate request
/// (`byte_len < 1`, `zero_bits == 0`, or more bits than the challenge holds)
/// or when [`MAX_GEN_ATTEMPTS`] random draws all collide with the target.
pub fn gen_challenge(byte_len: usize, zero_bits: u32) -> Result<Vec<u8>, PowError> {
    if byte_len < 1 || zero_bits == 0 || byte_len * BYTE_BITS < zero_bits as usize {
        return Err(PowError::UnableToGenerate);
    }

    let mut challenge = vec![0u8; byte_len];

    for _ in 0..MAX_GEN_ATTEMPTS {
        OsRng.fill_bytes(&mut challenge);

        if !check_lower_bits_zero(&hash(&challenge), zero_bits)? {
            return Ok(challenge);
        }
    }

    Err(PowError::UnableToGenerate)
}

/// Verify a claimed solution: one hash of `challenge ++ solution`, then the
/// bit check. Never searches.
pub fn check_solution(challenge: &[u8], solution: &[u8], zero_bits: u32) -> Result<bool, PowError> {
    let mut hasher = Sha256::new();
    hasher.update(challenge);
    hasher.update(solution);

    check_lower_bits_zero(&hasher.finalize(), zero_bits)
}

/// Brute-force a solution for `challenge` by counting up from zero.
///
/// Candidate solutions are the minimal big-endian encoding of the counter
/// (zero encodes as the empty byte string). The `cancel` flag is checked once
/// per [`RESOLVE_BATCH`] attempts; a set flag fails the search with
/// [`PowError::Interrupted`]. Expected attempts ≈ `2^zero_bits`, so callers
/// should run this off the async runtime for non-trivial difficulties.
pub fn resolve(challenge: &[u8], zero_bits: u32, cancel: &AtomicBool) -> Result<Vec<u8>, PowError> {
    let mut counter: u64 = 0;

    loop {
        if cancel.load(Ordering::Relaxed) {
            return Err(PowError::Interrupted);
        }

        for _ in 0..RESOLVE_BATCH {
            let candidate = counter_bytes(counter);

            if check_solution(challenge, &candidate, zero_bits)? {
                return Ok(candidate);
            }

            counter = counter.checked_add(1).ok_or(PowError::UnableToGenerate)?;
        }
    }
}

/// Minimal big-endian byte encoding of `n`; zero is the empty string.
fn counter_bytes(n: u64) -> Vec<u8> {
    let bytes = n.to_be_bytes();
    let zeros = bytes.iter().take_while(|b| **b == 0).count();

    bytes[zeros..].to_vec()
}
