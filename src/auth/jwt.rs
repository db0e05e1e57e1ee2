use std::str::FromStr;

use anyhow::Context;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::claims::Claims;
use crate::config::JwtConfig;

/// Why a token was refused. Callers at the service boundary treat all of
/// these as "unauthenticated".
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("bad token signature")]
    BadSignature,
    #[error("malformed token")]
    Malformed,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            _ => TokenError::Malformed,
        }
    }
}

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    ttl: Duration,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys")
            .field("algorithm", &self.algorithm)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> anyhow::Result<Self> {
        let algorithm = Algorithm::from_str(cfg.algorithm.trim())
            .with_context(|| format!("unknown jwt algorithm {}", cfg.algorithm))?;
        anyhow::ensure!(
            matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512),
            "jwt algorithm {:?} is not a symmetric HMAC algorithm",
            algorithm
        );
        anyhow::ensure!(!cfg.secret.is_empty(), "jwt secret must not be empty");
        anyhow::ensure!(cfg.ttl_minutes > 0, "jwt ttl must be positive");

        Ok(Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            algorithm,
            ttl: Duration::minutes(cfg.ttl_minutes),
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn sign(&self, subject: &str) -> anyhow::Result<String> {
        self.sign_at(subject, OffsetDateTime::now_utc())
    }

    pub fn sign_at(&self, subject: &str, now: OffsetDateTime) -> anyhow::Result<String> {
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.unix_timestamp(),
            exp: (now + self.ttl).unix_timestamp(),
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .context("encode jwt")?;
        debug!(sub = %subject, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    /// Expiry is checked against `now` here rather than inside `jsonwebtoken`,
    /// with no leeway: a token is dead from its `exp` second onwards.
    pub fn verify_at(&self, token: &str, now: OffsetDateTime) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.decoding, &validation)?.claims;
        if now.unix_timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }
        debug!(sub = %claims.sub, "jwt verified");
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str, ttl_minutes: i64) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: secret.into(),
            algorithm: "HS256".into(),
            ttl_minutes,
        })
        .expect("keys")
    }

    fn tamper_signature(token: &str) -> String {
        let (head, sig) = token.rsplit_once('.').expect("three segments");
        let mut chars: Vec<char> = sig.chars().collect();
        chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
        format!("{}.{}", head, chars.into_iter().collect::<String>())
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let keys = make_keys("dev-secret", 15);
        let token = keys.sign("alice").expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn expiry_is_exact() {
        let keys = make_keys("dev-secret", 15);
        let issued = OffsetDateTime::now_utc();
        let token = keys.sign_at("alice", issued).expect("sign");

        let just_before = issued + keys.ttl() - Duration::seconds(1);
        let just_after = issued + keys.ttl() + Duration::seconds(1);
        assert!(keys.verify_at(&token, just_before).is_ok());
        assert_eq!(keys.verify_at(&token, just_after), Err(TokenError::Expired));
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let keys = make_keys("dev-secret", 15);
        let token = keys.sign("alice").expect("sign");
        let err = keys.verify(&tamper_signature(&token)).unwrap_err();
        assert!(matches!(err, TokenError::BadSignature | TokenError::Malformed));
    }

    #[test]
    fn foreign_secret_is_bad_signature() {
        let token = make_keys("one-secret", 15).sign("alice").expect("sign");
        let err = make_keys("other-secret", 15).verify(&token).unwrap_err();
        assert_eq!(err, TokenError::BadSignature);
    }

    #[test]
    fn garbage_is_malformed() {
        let keys = make_keys("dev-secret", 15);
        assert_eq!(keys.verify("not-a-jwt"), Err(TokenError::Malformed));
        assert_eq!(keys.verify(""), Err(TokenError::Malformed));
    }

    #[test]
    fn rejects_asymmetric_or_unknown_algorithms() {
        for alg in ["RS256", "none", "HS999"] {
            let cfg = JwtConfig {
                secret: "s".into(),
                algorithm: alg.into(),
                ttl_minutes: 15,
            };
            assert!(JwtKeys::new(&cfg).is_err(), "{} should be refused", alg);
        }
    }

    #[test]
    fn algorithm_mismatch_is_refused() {
        let hs512 = JwtKeys::new(&JwtConfig {
            secret: "dev-secret".into(),
            algorithm: "HS512".into(),
            ttl_minutes: 15,
        })
        .expect("keys");
        let token = hs512.sign("alice").expect("sign");
        assert!(make_keys("dev-secret", 15).verify(&token).is_err());
    }
}
