//! Shared cryptographic helpers
//!
//! - `jwt`: signing and verification of identity credentials
//! - `hash`: SHA-256 digests used for cache keys

pub mod hash;
pub mod jwt;

pub use jwt::{CredentialCodec, CredentialError, Identity};
