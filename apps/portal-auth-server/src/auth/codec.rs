// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signed, time-bounded credential encoding.
//!
//! Credentials are HS256 JWTs signed with one process-wide secret, loaded at
//! startup. In cookie-session mode the secret is the hosted identity
//! provider's JWT secret, so the access tokens it mints decode here too.
//!
//! ## Validation
//!
//! - Signature is verified before any claim is trusted
//! - Expiry is checked with zero leeway: `now > exp` is expired
//! - Audience is checked only when configured

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::claims::{CredentialKind, IdentityClaims, TokenPayload};
use super::error::AuthError;

/// Default access credential lifetime (30 minutes).
pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(30 * 60);

/// Default refresh credential lifetime (7 days).
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Stateless credential encoder/decoder.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenCodec {
    /// Create a codec for the given signing secret.
    ///
    /// An empty secret is a configuration fault.
    pub fn new(secret: &str) -> Result<Self, AuthError> {
        if secret.trim().is_empty() {
            return Err(AuthError::InternalFault(
                "signing secret is empty".to_string(),
            ));
        }

        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_aud = false;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl: DEFAULT_ACCESS_TTL,
            refresh_ttl: DEFAULT_REFRESH_TTL,
        })
    }

    /// Override the credential lifetimes.
    pub fn with_ttls(mut self, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }

    /// Require an `aud` claim.
    ///
    /// Credentials minted by this codec carry no audience, so only set this
    /// when every presented credential comes from the identity provider.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.validation.set_audience(&[audience.into()]);
        self.validation.validate_aud = true;
        self
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    fn ttl(&self, kind: CredentialKind) -> Duration {
        match kind {
            CredentialKind::Access => self.access_ttl,
            CredentialKind::Refresh => self.refresh_ttl,
        }
    }

    /// Issue a new credential of `kind` for the given identity.
    pub fn encode(&self, claims: &IdentityClaims, kind: CredentialKind) -> Result<String, AuthError> {
        let issued_at = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl(kind).as_secs())
            .map_err(|_| AuthError::InternalFault(format!("{kind} ttl out of range")))?;

        let payload = TokenPayload {
            subject_id: claims.subject_id.clone(),
            email: claims.email.clone(),
            is_admin: claims.is_admin,
            role: claims.role.as_str().to_string(),
            issued_at,
            expires_at: issued_at + ttl,
            kind,
        };
        self.encode_payload(&payload)
    }

    /// Sign an explicit payload as-is.
    pub fn encode_payload(&self, payload: &TokenPayload) -> Result<String, AuthError> {
        encode(&Header::new(ALGORITHM), payload, &self.encoding_key)
            .map_err(|e| AuthError::InternalFault(format!("failed to sign credential: {e}")))
    }

    /// Verify signature and expiry and return the payload.
    pub fn decode(&self, token: &str) -> Result<TokenPayload, AuthError> {
        let token_data = decode::<TokenPayload>(token, &self.decoding_key, &self.validation)
            .map_err(decode_error)?;

        Ok(token_data.claims)
    }

    /// Decode and require a specific credential kind.
    pub fn decode_kind(&self, token: &str, expected: CredentialKind) -> Result<TokenPayload, AuthError> {
        let payload = self.decode(token)?;
        if payload.kind != expected {
            return Err(AuthError::MalformedCredential);
        }
        Ok(payload)
    }
}

/// Map a decoding failure to the gate's taxonomy.
///
/// Key and crypto backend failures are our fault, not the caller's.
fn decode_error(e: jsonwebtoken::errors::Error) -> AuthError {
    match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::ExpiredCredential,
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::InvalidKeyFormat
        | ErrorKind::InvalidEcdsaKey
        | ErrorKind::InvalidEddsaKey
        | ErrorKind::InvalidRsaKey(_)
        | ErrorKind::RsaFailedSigning
        | ErrorKind::Signing(_)
        | ErrorKind::InvalidAlgorithmName
        | ErrorKind::MissingAlgorithm
        | ErrorKind::Provider(_) => AuthError::InternalFault(format!("credential verification failed: {e}")),
        _ => AuthError::MalformedCredential,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::roles::Role;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    const SECRET: &str = "test-signing-secret-with-enough-entropy";

    fn claims() -> IdentityClaims {
        IdentityClaims {
            subject_id: "user_123".to_string(),
            email: "admin@example.com".to_string(),
            is_admin: true,
            role: Role::Admin,
        }
    }

    fn payload_expiring_at(expires_at: i64) -> TokenPayload {
        TokenPayload {
            subject_id: "user_123".to_string(),
            email: "admin@example.com".to_string(),
            is_admin: false,
            role: "user".to_string(),
            issued_at: expires_at - 60,
            expires_at,
            kind: CredentialKind::Access,
        }
    }

    #[test]
    fn empty_secret_is_internal_fault() {
        assert!(matches!(TokenCodec::new("  "), Err(AuthError::InternalFault(_))));
    }

    #[test]
    fn decode_returns_encoded_payload() {
        let codec = TokenCodec::new(SECRET).unwrap();
        let payload = payload_expiring_at(Utc::now().timestamp() + 600);

        let token = codec.encode_payload(&payload).unwrap();
        assert_eq!(codec.decode(&token).unwrap(), payload);
    }

    #[test]
    fn encode_stamps_kind_and_ttl() {
        let codec = TokenCodec::new(SECRET)
            .unwrap()
            .with_ttls(Duration::from_secs(60), Duration::from_secs(3600));

        let access = codec.decode(&codec.encode(&claims(), CredentialKind::Access).unwrap()).unwrap();
        assert_eq!(access.kind, CredentialKind::Access);
        assert_eq!(access.expires_at - access.issued_at, 60);
        assert_eq!(access.subject_id, "user_123");
        assert!(access.is_admin);
        assert_eq!(access.role, "admin");

        let refresh = codec.decode(&codec.encode(&claims(), CredentialKind::Refresh).unwrap()).unwrap();
        assert_eq!(refresh.kind, CredentialKind::Refresh);
        assert_eq!(refresh.expires_at - refresh.issued_at, 3600);
    }

    #[test]
    fn expired_payload_is_rejected() {
        let codec = TokenCodec::new(SECRET).unwrap();
        let token = codec
            .encode_payload(&payload_expiring_at(Utc::now().timestamp() - 5))
            .unwrap();

        assert_eq!(codec.decode(&token), Err(AuthError::ExpiredCredential));
    }

    #[test]
    fn wrong_secret_is_invalid_signature() {
        let issuer = TokenCodec::new("some-other-secret").unwrap();
        let verifier = TokenCodec::new(SECRET).unwrap();
        let token = issuer.encode(&claims(), CredentialKind::Access).unwrap();

        assert_eq!(verifier.decode(&token), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn tampered_payload_is_invalid_signature() {
        let codec = TokenCodec::new(SECRET).unwrap();
        let token = codec
            .encode_payload(&payload_expiring_at(Utc::now().timestamp() + 600))
            .unwrap();

        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let mut forged = payload_expiring_at(Utc::now().timestamp() + 600);
        forged.is_admin = true;
        parts[1] = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let forged_token = parts.join(".");

        assert_eq!(codec.decode(&forged_token), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = TokenCodec::new(SECRET).unwrap();
        assert_eq!(codec.decode("not-a-token"), Err(AuthError::MalformedCredential));
        assert_eq!(codec.decode(""), Err(AuthError::MalformedCredential));
    }

    #[test]
    fn decode_kind_rejects_refresh_as_access() {
        let codec = TokenCodec::new(SECRET).unwrap();
        let refresh = codec.encode(&claims(), CredentialKind::Refresh).unwrap();

        assert_eq!(
            codec.decode_kind(&refresh, CredentialKind::Access),
            Err(AuthError::MalformedCredential)
        );
        assert!(codec.decode_kind(&refresh, CredentialKind::Refresh).is_ok());
    }

    #[test]
    fn key_failures_are_internal_faults() {
        use jsonwebtoken::errors::new_error;

        for kind in [
            ErrorKind::InvalidKeyFormat,
            ErrorKind::MissingAlgorithm,
            ErrorKind::Provider("backend unavailable".to_string()),
        ] {
            assert!(matches!(decode_error(new_error(kind)), AuthError::InternalFault(_)));
        }
        assert_eq!(
            decode_error(new_error(ErrorKind::InvalidToken)),
            AuthError::MalformedCredential
        );
        assert_eq!(
            decode_error(new_error(ErrorKind::InvalidAlgorithm)),
            AuthError::MalformedCredential
        );
    }

    #[test]
    fn audience_is_enforced_when_configured() {
        let codec = TokenCodec::new(SECRET).unwrap().with_audience("authenticated");
        let token = codec.encode(&claims(), CredentialKind::Access).unwrap();

        assert_eq!(codec.decode(&token), Err(AuthError::MalformedCredential));
    }
}
