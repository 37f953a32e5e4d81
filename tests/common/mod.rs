#![allow(dead_code)]

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

/// The size of test data buffers.
pub const BUFFER_SIZE: usize = 8 * 1024;

/// Return a buffer of random bytes.
pub fn random_buffer() -> Vec<u8> {
    let mut buffer = vec![0u8; BUFFER_SIZE];
    SmallRng::from_entropy().fill_bytes(&mut buffer);
    buffer
}

/// Parse a key from its string form, panicking on invalid input.
pub fn key(value: &str) -> stowage::Key {
    value.parse().expect("invalid test key")
}
