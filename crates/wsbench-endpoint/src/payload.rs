use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Deterministic pseudo-random payload of `len` bytes.
///
/// Always seeded with zero, so every run and every peer sends the same bytes.
pub fn random_payload(len: usize) -> Vec<u8> {
    let mut payload = vec![0u8; len];
    StdRng::seed_from_u64(0).fill_bytes(&mut payload);
    payload
}
