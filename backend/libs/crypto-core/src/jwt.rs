/// Credential signing and verification for the notes gateway
///
/// A credential is a compact JWT signed with HMAC-SHA256 using a single
/// process-wide secret. The only identity claim it carries is the user id.
///
/// ## Security Design
///
/// - **HS256 ONLY**: tokens declaring any other algorithm are rejected
/// - **Injected secret**: the codec owns its keys; nothing is read from the
///   environment here
/// - **Constant-time comparison**: signature checks go through the HMAC
///   verifier, never a byte-wise string compare
/// - **Optional expiry**: an `exp` claim is written only when a TTL is
///   configured, but any `exp` present on an incoming token is enforced
///
/// ## Usage
///
/// ```rust
/// use crypto_core::jwt::{CredentialCodec, Identity};
///
/// let codec = CredentialCodec::new("a-long-random-process-wide-secret", None)?;
/// let credential = codec.sign(&Identity::new("user-42"))?;
/// assert_eq!(codec.verify(&credential)?, Identity::new("user-42"));
/// # Ok::<(), crypto_core::jwt::CredentialError>(())
/// ```
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

// ============================================================================
// Constants
// ============================================================================

/// Credential algorithm - symmetric, shared secret
const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// Secrets shorter than this are accepted but logged as weak (256 bits)
pub const MIN_SECRET_LENGTH: usize = 32;

// ============================================================================
// Data Structures
// ============================================================================

/// The authenticated claim attached to a request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
}

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Credential payload
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id
    pub id: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp), absent for non-expiring credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    /// The process-wide secret is missing or unusable
    #[error("credential configuration error: {0}")]
    Config(String),

    /// Signature mismatch, malformed payload, wrong algorithm or expired
    #[error("invalid credential")]
    InvalidCredential,

    /// The identity could not be encoded into a credential
    #[error("failed to sign credential: {0}")]
    Signing(String),
}

// ============================================================================
// Codec
// ============================================================================

/// Signs and verifies identity credentials with a shared secret
///
/// Holds no mutable state; a single instance is built at startup and shared
/// read-only between request handlers.
#[derive(Clone)]
pub struct CredentialCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Option<Duration>,
}

impl CredentialCodec {
    /// Build a codec from the process-wide secret
    ///
    /// `ttl` controls whether signed credentials carry an `exp` claim.
    ///
    /// ## Errors
    ///
    /// Returns `CredentialError::Config` if the secret is empty or blank.
    pub fn new(secret: &str, ttl: Option<Duration>) -> Result<Self, CredentialError> {
        if secret.trim().is_empty() {
            return Err(CredentialError::Config(
                "credential secret must not be empty".to_string(),
            ));
        }

        if secret.len() < MIN_SECRET_LENGTH {
            warn!(
                length = secret.len(),
                minimum = MIN_SECRET_LENGTH,
                "Credential secret is shorter than recommended"
            );
        }

        let mut validation = Validation::new(JWT_ALGORITHM);
        // exp is optional in this format, but checked whenever present
        validation.required_spec_claims.clear();
        validation.validate_exp = true;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        })
    }

    /// Lifetime of newly signed credentials, if any
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Sign a credential for the given identity
    pub fn sign(&self, identity: &Identity) -> Result<String, CredentialError> {
        if identity.id.is_empty() {
            return Err(CredentialError::Signing(
                "identity id must not be empty".to_string(),
            ));
        }

        let now = Utc::now();
        let claims = Claims {
            id: identity.id.clone(),
            iat: now.timestamp(),
            exp: self.ttl.map(|ttl| (now + ttl).timestamp()),
        };

        encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| CredentialError::Signing(e.to_string()))
    }

    /// Verify a credential and return the identity it carries
    ///
    /// Every failure (bad signature, malformed token, foreign algorithm,
    /// expired token, empty id) collapses into `InvalidCredential`.
    pub fn verify(&self, credential: &str) -> Result<Identity, CredentialError> {
        let token_data = decode::<Claims>(credential, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!(error = %e, "Credential verification failed");
                CredentialError::InvalidCredential
            })?;

        if token_data.claims.id.is_empty() {
            debug!("Credential carries an empty identity");
            return Err(CredentialError::InvalidCredential);
        }

        Ok(Identity {
            id: token_data.claims.id,
        })
    }
}

impl fmt::Debug for CredentialCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialCodec")
            .field("algorithm", &JWT_ALGORITHM)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
