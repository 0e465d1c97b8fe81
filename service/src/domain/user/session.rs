//! [`Session`] definitions.

use std::time::Duration;

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, Error, FromStr};
use jsonwebtoken::{
    errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

#[cfg(doc)]
use crate::domain::User;
use crate::domain::user;

/// Claims of a signed, stateless [`User`] session.
///
/// Nothing is stored server-side: a [`Session`] is valid as long as its
/// [`Token`] signature verifies and it hasn't expired yet.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Session {
    /// ID of the [`User`] this [`Session`] belongs to.
    #[serde(rename = "sub")]
    pub user_id: user::Id,

    /// [`user::Role`] of the [`User`] at the moment of issuance.
    ///
    /// Informational only, the live [`User`] record is authoritative.
    pub role: user::Role,

    /// [`DateTime`] when this [`Session`] was issued.
    #[serde(rename = "iat", with = "common::datetime::serde::unix_timestamp")]
    pub issued_at: IssuanceDateTime,

    /// [`DateTime`] when this [`Session`] expires.
    #[serde(rename = "exp", with = "common::datetime::serde::unix_timestamp")]
    pub expires_at: ExpirationDateTime,
}

impl Session {
    /// Default lifetime of a [`Session`].
    pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

    /// Creates a new [`Session`] issued at `now` and living for `ttl`.
    #[must_use]
    pub fn new(
        user_id: user::Id,
        role: user::Role,
        now: DateTimeOf,
        ttl: Duration,
    ) -> Self {
        Self {
            user_id,
            role,
            issued_at: now.coerce(),
            expires_at: (now + ttl).coerce(),
        }
    }

    /// Indicates whether this [`Session`] is expired at the given moment.
    ///
    /// Expiration is inclusive and compared with a second precision, the
    /// same one the [`Token`] carries.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTimeOf) -> bool {
        now.unix_timestamp() >= self.expires_at.unix_timestamp()
    }

    /// Signs this [`Session`] into a [`Token`].
    ///
    /// # Errors
    ///
    /// If the claims cannot be serialized or signed.
    pub fn encode(
        &self,
        key: &EncodingKey,
    ) -> Result<Token, jsonwebtoken::errors::Error> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), self, key)
            .map(Token)
    }

    /// Verifies and decodes the provided [`Token`] at the given moment.
    ///
    /// The signature is checked before anything else, so a tampered [`Token`]
    /// never reaches the expiration check.
    ///
    /// # Errors
    ///
    /// See [`DecodeError`] for details.
    pub fn decode(
        token: &Token,
        key: &DecodingKey,
        now: DateTimeOf,
    ) -> Result<Self, DecodeError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let session = jsonwebtoken::decode::<Self>(&token.0, key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => DecodeError::InvalidSignature,
                _ => DecodeError::Malformed(e),
            })?
            .claims;

        if session.is_expired_at(now) {
            return Err(DecodeError::Expired(session.expires_at));
        }
        Ok(session)
    }
}

/// Error of [`Session::decode()`].
#[derive(Debug, Display, Error)]
pub enum DecodeError {
    /// [`Token`] isn't a structurally valid signed [`Session`].
    #[display("malformed token: {_0}")]
    Malformed(jsonwebtoken::errors::Error),

    /// [`Token`] signature doesn't match its contents.
    #[display("token signature mismatch")]
    InvalidSignature,

    /// [`Session`] has expired.
    #[display("token expired at {}", _0.to_rfc3339())]
    Expired(#[error(not(source))] ExpirationDateTime),
}

/// Access token of a [`Session`].
#[derive(AsRef, Clone, Debug, Display, Eq, FromStr, PartialEq)]
#[as_ref(str)]
pub struct Token(String);

impl Token {
    /// Creates a new [`Token`] without checking its contents.
    ///
    /// # Safety
    ///
    /// The provided `token` must be a valid [`Token`] representation.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub const unsafe fn new_unchecked(token: String) -> Self {
        Self(token)
    }
}

/// [`DateTime`] when a [`Session`] was issued.
pub type IssuanceDateTime = DateTimeOf<(Session, unit::Issuance)>;

/// [`DateTime`] when a [`Session`] expires.
pub type ExpirationDateTime = DateTimeOf<(Session, unit::Expiration)>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;
    use jsonwebtoken::{DecodingKey, EncodingKey};

    use crate::domain::user;

    use super::{DecodeError, Session, Token};

    const SECRET: &[u8] = b"test-secret";

    fn at(secs: i64) -> DateTime {
        DateTime::from_unix_timestamp(secs).unwrap()
    }

    fn token(s: &str) -> Token {
        s.parse().unwrap()
    }

    fn issue(now: DateTime, ttl: Duration) -> (Session, Token) {
        let session =
            Session::new(user::Id::new(), user::Role::Individual, now, ttl);
        let token = session
            .encode(&EncodingKey::from_secret(SECRET))
            .unwrap();
        (session, token)
    }

    fn decode(token: &Token, now: DateTime) -> Result<Session, DecodeError> {
        Session::decode(token, &DecodingKey::from_secret(SECRET), now)
    }

    #[test]
    fn roundtrips_before_expiration() {
        let (session, token) = issue(at(1_000), Session::DEFAULT_TTL);

        assert_eq!(decode(&token, at(1_000)).unwrap(), session);
        assert_eq!(decode(&token, at(1_000 + 3_599)).unwrap(), session);
        assert_eq!(session.expires_at.unix_timestamp(), 1_000 + 3_600);
        assert_eq!(session.issued_at.unix_timestamp(), 1_000);
    }

    #[test]
    fn expires_exactly_at_exp() {
        let (_, token) = issue(at(1_000), Session::DEFAULT_TTL);

        assert!(matches!(
            decode(&token, at(1_000 + 3_600)),
            Err(DecodeError::Expired(_)),
        ));
        assert!(matches!(
            decode(&token, at(1_000 + 3_601)),
            Err(DecodeError::Expired(_)),
        ));
    }

    #[test]
    fn honors_custom_ttl() {
        let (_, token) = issue(at(1_000), Duration::from_secs(5));

        assert!(decode(&token, at(1_004)).is_ok());
        assert!(matches!(
            decode(&token, at(1_005)),
            Err(DecodeError::Expired(_)),
        ));
    }

    #[test]
    fn zero_ttl_is_expired_immediately() {
        let (_, token) = issue(at(1_000), Duration::ZERO);

        assert!(matches!(
            decode(&token, at(1_000)),
            Err(DecodeError::Expired(_)),
        ));
    }

    #[test]
    fn carries_role_snapshot() {
        let session = Session::new(
            user::Id::new(),
            user::Role::Admin,
            at(1_000),
            Session::DEFAULT_TTL,
        );
        let token = session
            .encode(&EncodingKey::from_secret(SECRET))
            .unwrap();

        assert_eq!(decode(&token, at(1_000)).unwrap().role, user::Role::Admin);
    }

    #[test]
    fn rejects_foreign_secret() {
        let (_, token) = issue(at(1_000), Session::DEFAULT_TTL);

        let res = Session::decode(
            &token,
            &DecodingKey::from_secret(b"another-secret"),
            at(1_000),
        );

        assert!(matches!(res, Err(DecodeError::InvalidSignature)));
    }

    #[test]
    fn rejects_spliced_payload() {
        let (_, original) = issue(at(1_000), Session::DEFAULT_TTL);
        let (_, other) = issue(at(1_000), Session::DEFAULT_TTL);

        let original: Vec<_> = original.as_ref().split('.').collect();
        let other: Vec<_> = other.as_ref().split('.').collect();
        let forged =
            token(&format!("{}.{}.{}", original[0], other[1], original[2]));

        assert!(matches!(
            decode(&forged, at(1_000)),
            Err(DecodeError::InvalidSignature),
        ));
    }

    #[test]
    fn rejects_extended_expiration() {
        let (_, original) = issue(at(1_000), Duration::from_secs(60));
        let (_, longer) = issue(at(1_000), Duration::from_secs(86_400));

        let original: Vec<_> = original.as_ref().split('.').collect();
        let longer: Vec<_> = longer.as_ref().split('.').collect();
        let forged =
            token(&format!("{}.{}.{}", original[0], longer[1], original[2]));

        assert!(matches!(
            decode(&forged, at(2_000)),
            Err(DecodeError::InvalidSignature),
        ));
    }

    #[test]
    fn rejects_altered_signature() {
        let (_, original) = issue(at(1_000), Session::DEFAULT_TTL);
        let (head, sig) = original.as_ref().rsplit_once('.').unwrap();
        let flipped = if sig.starts_with('A') { 'B' } else { 'A' };
        let forged = token(&format!("{head}.{flipped}{}", &sig[1..]));

        assert!(matches!(
            decode(&forged, at(1_000)),
            Err(DecodeError::InvalidSignature),
        ));
    }

    #[test]
    fn checks_signature_before_expiration() {
        let (_, token) = issue(at(1_000), Session::DEFAULT_TTL);

        let res = Session::decode(
            &token,
            &DecodingKey::from_secret(b"another-secret"),
            at(1_000_000),
        );

        assert!(matches!(res, Err(DecodeError::InvalidSignature)));
    }

    #[test]
    fn rejects_malformed_tokens() {
        for raw in ["", "garbage", "a.b", "a.b.c", "a.b.c.d", "...."] {
            assert!(
                matches!(decode(&token(raw), at(1_000)), Err(DecodeError::Malformed(_))),
                "{raw:?}",
            );
        }
    }
}
