// Credential hashing
//
// One scheme only: pbkdf2-sha512 in the modular-crypt layout the application
// verifies against:
//
//   $pbkdf2-sha512$<rounds>$<salt>$<checksum>
//
// salt = 16 random bytes, checksum = 64 bytes, both in "adapted base64"
// (standard alphabet with '+' replaced by '.', no padding).

use anyhow::Result;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use std::num::NonZeroU32;

pub const SCHEME: &str = "pbkdf2-sha512";
pub const DEFAULT_ROUNDS: u32 = 25_000;
const SALT_BYTES: usize = 16;
const CHECKSUM_BYTES: usize = 64;

/// A derived credential hash in modular-crypt form.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialHash(String);

impl CredentialHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short SHA-256 fingerprint, safe to log.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        digest.iter().take(6).map(|b| format!("{:02x}", b)).collect()
    }
}

impl std::fmt::Debug for CredentialHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CredentialHash({})", self.fingerprint())
    }
}

fn ab64_encode(bytes: &[u8]) -> String {
    STANDARD_NO_PAD.encode(bytes).replace('+', ".")
}

fn ab64_decode(text: &str) -> Option<Vec<u8>> {
    STANDARD_NO_PAD.decode(text.replace('.', "+")).ok()
}

fn rounds_nonzero(rounds: u32) -> Result<NonZeroU32> {
    NonZeroU32::new(rounds).ok_or_else(|| anyhow::anyhow!("pbkdf2 rounds must be at least 1"))
}

/// Derive a hash with a fresh random salt.
pub fn derive(password: &str, rounds: u32) -> Result<CredentialHash> {
    let mut salt = [0u8; SALT_BYTES];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| anyhow::anyhow!("Failed to generate salt"))?;
    derive_with_salt(password, rounds, &salt)
}

/// Derive a hash with a caller-provided salt.
pub fn derive_with_salt(password: &str, rounds: u32, salt: &[u8]) -> Result<CredentialHash> {
    let iterations = rounds_nonzero(rounds)?;
    let mut checksum = [0u8; CHECKSUM_BYTES];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA512,
        iterations,
        salt,
        password.as_bytes(),
        &mut checksum,
    );
    Ok(CredentialHash(format!(
        "${}${}${}${}",
        SCHEME,
        rounds,
        ab64_encode(salt),
        ab64_encode(&checksum)
    )))
}

/// Check `password` against a modular-crypt hash produced by this scheme.
/// Malformed hashes never verify.
pub fn verify(password: &str, hash: &str) -> bool {
    let parts: Vec<&str> = hash.split('$').collect();
    // ["", scheme, rounds, salt, checksum]
    let [empty, scheme, rounds, salt, checksum] = parts.as_slice() else {
        return false;
    };
    if !empty.is_empty() || *scheme != SCHEME {
        return false;
    }
    let Some(iterations) = rounds.parse::<u32>().ok().and_then(NonZeroU32::new) else {
        return false;
    };
    let (Some(salt), Some(checksum)) = (ab64_decode(salt), ab64_decode(checksum)) else {
        return false;
    };
    pbkdf2::verify(
        pbkdf2::PBKDF2_HMAC_SHA512,
        iterations,
        &salt,
        password.as_bytes(),
        &checksum,
    )
    .is_ok()
}
