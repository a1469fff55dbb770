//! Commitment salt generation.

use rand::rngs::OsRng;
use rand::RngCore;
use votekiosk_types::Salt;

/// Number of random bytes in a freshly generated salt.
pub const SALT_BYTES: usize = Salt::MIN_BYTES;

/// Generate a new salt from the operating system's secure random source.
pub fn generate_salt() -> Salt {
    let mut bytes = [0u8; SALT_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let salt = Salt::from_bytes(&bytes);
    bytes.fill(0);
    match salt {
        Ok(salt) => salt,
        Err(e) => unreachable!("SALT_BYTES is Salt::MIN_BYTES: {e}"),
    }
}
