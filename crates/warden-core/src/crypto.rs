//! Cryptographic primitives for principal credentials
//!
//! This module provides the building blocks the gateway issues and checks
//! credentials with:
//!
//! - `KeyPair` / `PublicKey`: Ed25519 signing and verification
//! - `encrypt` / `decrypt`: AES-256-GCM authenticated encryption
//! - `random_bytes` / `random_array`: CSPRNG-backed randomness
//! - `to_hex` / `from_hex`: the wire codec for keys, nonces and signatures
//!
//! Signatures are 64 bytes detached, public keys 32 bytes, private key
//! material 64 bytes (seed ‖ public half, the conventional Ed25519 keypair
//! encoding). Verification is constant-time.

use crate::error::{CryptoError, Result};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;

/// Ed25519 signature length in bytes
pub const SIGNATURE_LEN: usize = 64;

/// Ed25519 public key length in bytes
pub const PUBLIC_KEY_LEN: usize = 32;

/// Ed25519 keypair encoding length in bytes (seed ‖ public)
pub const KEYPAIR_LEN: usize = 64;

/// AES-256-GCM key length in bytes
pub const AEAD_KEY_LEN: usize = 32;

/// AES-GCM nonce length in bytes
pub const AEAD_NONCE_LEN: usize = 12;

/// Ed25519 key pair held for a principal
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key().to_hex())
            .field("private_key", &"[redacted]")
            .finish()
    }
}

impl KeyPair {
    /// Generate a new random key pair from the OS CSPRNG
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Reconstruct a key pair from its 64-byte hex encoding (seed ‖ public)
    pub fn from_private_hex(hex_str: &str) -> Result<Self> {
        let bytes = from_hex(hex_str)?;
        let bytes: [u8; KEYPAIR_LEN] =
            bytes
                .try_into()
                .map_err(|b: Vec<u8>| CryptoError::InvalidKeyLength {
                    expected: KEYPAIR_LEN,
                    actual: b.len(),
                })?;
        let signing_key = SigningKey::from_keypair_bytes(&bytes)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        Ok(Self { signing_key })
    }

    /// Get the public half
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            verifying_key: self.signing_key.verifying_key(),
        }
    }

    /// Hex encoding of the keypair (seed ‖ public), 128 hex chars
    pub fn private_key_hex(&self) -> String {
        to_hex(&self.signing_key.to_keypair_bytes())
    }

    /// Produce a 64-byte detached signature over `message`
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LEN] {
        self.signing_key.sign(message).to_bytes()
    }
}

/// Ed25519 public key for verification
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    verifying_key: VerifyingKey,
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicKey")
            .field("key", &self.to_hex())
            .finish()
    }
}

impl PublicKey {
    /// Create a public key from raw bytes
    pub fn from_bytes(bytes: &[u8; PUBLIC_KEY_LEN]) -> Result<Self> {
        let verifying_key = VerifyingKey::from_bytes(bytes)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        Ok(Self { verifying_key })
    }

    /// Create a public key from its 64-char hex encoding
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = from_hex(hex_str)?;
        let bytes: [u8; PUBLIC_KEY_LEN] =
            bytes
                .try_into()
                .map_err(|b: Vec<u8>| CryptoError::InvalidKeyLength {
                    expected: PUBLIC_KEY_LEN,
                    actual: b.len(),
                })?;
        Self::from_bytes(&bytes)
    }

    /// Get the raw key bytes
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.verifying_key.to_bytes()
    }

    /// Hex encoding of the key, 64 hex chars
    pub fn to_hex(&self) -> String {
        to_hex(&self.to_bytes())
    }

    /// Verify a 64-byte detached signature over `message`
    ///
    /// Constant-time with respect to the signature contents.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        let sig_bytes: [u8; SIGNATURE_LEN] = signature
            .try_into()
            .map_err(|_| CryptoError::InvalidSignatureLength(signature.len()))?;
        let signature = Signature::from_bytes(&sig_bytes);
        self.verifying_key
            .verify(message, &signature)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

/// Encrypt `plaintext` with AES-256-GCM under a 32-byte key
///
/// Output layout: 12-byte random nonce ‖ ciphertext ‖ 16-byte tag.
pub fn encrypt(key: &[u8; AEAD_KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
            expected: AEAD_KEY_LEN,
            actual: key.len(),
        })?;

    let nonce_bytes = random_array::<AEAD_NONCE_LEN>();
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut blob = Vec::with_capacity(AEAD_NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt a blob produced by [`encrypt`]
///
/// Any mismatch (truncated input, wrong key, altered ciphertext or tag)
/// yields the same opaque [`CryptoError::DecryptionFailed`].
pub fn decrypt(key: &[u8; AEAD_KEY_LEN], blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() < AEAD_NONCE_LEN {
        return Err(CryptoError::DecryptionFailed);
    }

    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::DecryptionFailed)?;

    let (nonce_bytes, ciphertext) = blob.split_at(AEAD_NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// Generate `n` random bytes from the OS CSPRNG
pub fn random_bytes(n: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; n];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Generate a fixed-size random array from the OS CSPRNG
pub fn random_array<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Encode bytes as lowercase hex
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode a hex string to bytes
pub fn from_hex(hex_str: &str) -> Result<Vec<u8>> {
    Ok(hex::decode(hex_str)?)
}
