//! # Warden Core
//!
//! Core types and cryptographic primitives for the Warden zero-trust
//! admission gateway.
//!
//! ## Key Concepts
//!
//! - **Principal**: a named agent identity that can present credentials
//! - **Credential**: the Ed25519 keypair + challenge nonce issued at registration
//! - **Nonce**: a 16-byte random challenge value bound to a principal;
//!   proof-of-possession signatures are computed over its stored hex encoding
//!
//! This crate is synchronous and HTTP-free; the gateway service lives in
//! `warden-gateway`.

pub mod crypto;
pub mod error;
pub mod principal;

pub use crypto::{KeyPair, PublicKey};
pub use error::{CryptoError, Result};
pub use principal::{Principal, PrincipalStatus};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the library version
pub fn version() -> &'static str {
    VERSION
}
