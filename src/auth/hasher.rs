use anyhow::{Context, Result};

/// Cost passed to bcrypt when hashing new passwords.
pub const BCRYPT_WORK_FACTOR: u32 = 10;

/// One-way password hashing.
///
/// Both calls are CPU bound; async callers should run them on the blocking pool.
pub trait PasswordHasher: Send + Sync {
    /// Hash `plaintext` with the given work factor.
    ///
    /// # Errors
    /// Returns an error if the work factor is rejected or hashing fails.
    fn hash(&self, plaintext: &str, work_factor: u32) -> Result<String>;

    /// Check `plaintext` against a hash previously produced by [`Self::hash`].
    ///
    /// # Errors
    /// Returns an error if `hash` is malformed.
    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BcryptHasher;

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plaintext: &str, work_factor: u32) -> Result<String> {
        bcrypt::hash(plaintext, work_factor).context("Failed to hash password")
    }

    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool> {
        bcrypt::verify(plaintext, hash).context("Failed to verify password hash")
    }
}
