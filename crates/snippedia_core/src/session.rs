//! crates/snippedia_core/src/session.rs
//!
//! Stateless session credentials signed with HMAC-SHA256.
//!
//! A credential is a compact JWS (`header.claims.signature`, each part base64url
//! without padding) whose claims are `{"user_id": "<uuid>", "exp": <unix seconds>}`.
//! Nothing is persisted, so a credential stays valid until it expires.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";

/// Default credential lifetime: one week.
pub const DEFAULT_LIFETIME_HOURS: i64 = 24 * 7;

#[derive(Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    user_id: String,
    exp: i64,
}

/// Mints and validates session credentials.
#[derive(Clone)]
pub struct SessionIssuer {
    secret: Vec<u8>,
    lifetime: Duration,
}

impl SessionIssuer {
    pub fn new(secret: impl Into<Vec<u8>>, lifetime: Duration) -> Self {
        Self {
            secret: secret.into(),
            lifetime,
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issues a credential for `user_id` that expires one lifetime from now.
    pub fn issue(&self, user_id: Uuid) -> DomainResult<String> {
        self.issue_at(user_id, Utc::now())
    }

    /// Issues a credential as if the current time were `now`.
    pub fn issue_at(&self, user_id: Uuid, now: DateTime<Utc>) -> DomainResult<String> {
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        };
        let expires_at = now.checked_add_signed(self.lifetime).ok_or_else(|| {
            DomainError::Signing("session lifetime overflows the expiry instant".to_string())
        })?;
        let claims = Claims {
            user_id: user_id.to_string(),
            exp: expires_at.timestamp(),
        };

        let header_json =
            serde_json::to_vec(&header).map_err(|e| DomainError::Signing(e.to_string()))?;
        let claims_json =
            serde_json::to_vec(&claims).map_err(|e| DomainError::Signing(e.to_string()))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(claims_json)
        );
        let signature = self
            .mac(signing_input.as_bytes())
            .map_err(DomainError::Signing)?
            .finalize()
            .into_bytes();

        Ok(format!(
            "{}.{}",
            signing_input,
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Verifies the signature and expiry of `token` and returns the subject user id.
    pub fn validate(&self, token: &str) -> DomainResult<Uuid> {
        self.validate_at(token, Utc::now())
    }

    /// Validates `token` as if the current time were `now`.
    ///
    /// The signature is checked before anything else, so a tampered credential is
    /// always `InvalidToken` even when its claimed expiry has passed.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> DomainResult<Uuid> {
        let mut parts = token.split('.');
        let (header_b64, claims_b64, signature_b64) =
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(h), Some(c), Some(s), None) => (h, c, s),
                _ => return Err(DomainError::InvalidToken),
            };

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| DomainError::InvalidToken)?;
        let signing_input = format!("{}.{}", header_b64, claims_b64);
        self.mac(signing_input.as_bytes())
            .map_err(|_| DomainError::InvalidToken)?
            .verify_slice(&signature)
            .map_err(|_| DomainError::InvalidToken)?;

        let header: Header = decode_part(header_b64)?;
        if header.alg != ALGORITHM {
            return Err(DomainError::InvalidToken);
        }

        let claims: Claims = decode_part(claims_b64)?;
        if now.timestamp() >= claims.exp {
            return Err(DomainError::Expired);
        }

        Uuid::parse_str(&claims.user_id).map_err(|_| DomainError::InvalidToken)
    }

    fn mac(&self, data: &[u8]) -> Result<HmacSha256, String> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).map_err(|e| e.to_string())?;
        mac.update(data);
        Ok(mac)
    }
}

fn decode_part<T: for<'de> Deserialize<'de>>(part: &str) -> DomainResult<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|_| DomainError::InvalidToken)?;
    serde_json::from_slice(&bytes).map_err(|_| DomainError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn issuer() -> SessionIssuer {
        SessionIssuer::new(
            b"test-secret-key-32-bytes-long!!".to_vec(),
            Duration::hours(DEFAULT_LIFETIME_HOURS),
        )
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn issue_and_validate_round_trip() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();

        let token = issuer.issue(user_id).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(issuer.validate(&token).unwrap(), user_id);
    }

    #[test]
    fn issue_is_deterministic_for_fixed_clock() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();

        let a = issuer.issue_at(user_id, fixed_now()).unwrap();
        let b = issuer.issue_at(user_id, fixed_now()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn oversized_lifetime_fails_to_issue() {
        let issuer = SessionIssuer::new(b"k".to_vec(), Duration::hours(3_000_000_000));
        let err = issuer.issue(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, DomainError::Signing(_)));
    }

    #[test]
    fn claims_carry_user_id_and_expiry() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();
        let token = issuer.issue_at(user_id, fixed_now()).unwrap();

        let claims_part = token.split('.').nth(1).unwrap();
        let claims: Claims = decode_part(claims_part).unwrap();
        assert_eq!(claims.user_id, user_id.to_string());
        assert_eq!(
            claims.exp,
            (fixed_now() + Duration::days(7)).timestamp()
        );
    }

    #[test]
    fn valid_until_just_before_expiry() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();
        let token = issuer.issue_at(user_id, fixed_now()).unwrap();

        let almost = fixed_now() + Duration::days(7) - Duration::seconds(1);
        assert_eq!(issuer.validate_at(&token, almost).unwrap(), user_id);
    }

    #[test]
    fn reject_expired() {
        let issuer = issuer();
        let token = issuer.issue_at(Uuid::new_v4(), fixed_now()).unwrap();

        let later = fixed_now() + Duration::days(8);
        assert_eq!(issuer.validate_at(&token, later), Err(DomainError::Expired));
    }

    #[test]
    fn reject_tampered_signature() {
        let issuer = issuer();
        let token = issuer.issue(Uuid::new_v4()).unwrap();

        let (rest, sig) = token.rsplit_once('.').unwrap();
        let flipped = if sig.starts_with('A') { "B" } else { "A" };
        let tampered = format!("{}.{}{}", rest, flipped, &sig[1..]);
        assert_eq!(issuer.validate(&tampered), Err(DomainError::InvalidToken));
    }

    #[test]
    fn reject_tampered_claims() {
        let issuer = issuer();
        let token = issuer.issue(Uuid::new_v4()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let forged_claims = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&Claims {
                user_id: Uuid::new_v4().to_string(),
                exp: i64::MAX,
            })
            .unwrap(),
        );
        let forged = format!("{}.{}.{}", parts[0], forged_claims, parts[2]);
        assert_eq!(issuer.validate(&forged), Err(DomainError::InvalidToken));
    }

    #[test]
    fn reject_token_signed_with_other_secret() {
        let other = SessionIssuer::new(b"another-secret".to_vec(), Duration::hours(1));
        let token = other.issue(Uuid::new_v4()).unwrap();
        assert_eq!(issuer().validate(&token), Err(DomainError::InvalidToken));
    }

    #[test]
    fn tampered_and_expired_is_invalid_not_expired() {
        let issuer = issuer();
        let token = issuer.issue_at(Uuid::new_v4(), fixed_now()).unwrap();
        let tampered = format!("{}x", token);

        let later = fixed_now() + Duration::days(30);
        assert_eq!(
            issuer.validate_at(&tampered, later),
            Err(DomainError::InvalidToken)
        );
    }

    #[test]
    fn reject_malformed() {
        let issuer = issuer();
        for token in ["", "abc", "a.b", "a.b.c.d", "###.###.###"] {
            assert_eq!(issuer.validate(token), Err(DomainError::InvalidToken));
        }
    }
}
