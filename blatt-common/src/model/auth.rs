//! Bearer-token session identities.
//!
//! A token is `user_id.secret.salt` with both binary parts URL-safe base64.
//! The server persists only the argon2 hash of the secret, so a leaked
//! session table cannot be replayed.

use crate::{
    model::{Id, user::UserMarker},
    util::Ttl,
};
use argon2::{Argon2, Params};
use base64::{DecodeError, Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use std::{
    fmt::{Debug, Display, Formatter},
    num::ParseIntError,
    str::FromStr,
};
use thiserror::Error;
use time::UtcDateTime;

pub const TOKEN_SECRET_LEN: usize = 32;
pub const TOKEN_SALT_LEN: usize = 16;
pub const TOKEN_HASH_LEN: usize = Params::DEFAULT_OUTPUT_LEN;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing the token failed: {0}")]
pub struct TokenHashError(argon2::Error);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum TokenDecodeError {
    #[error("Not enough parts separated by '.'")]
    MissingPart,
    #[error("Invalid user id: {0}")]
    InvalidUserId(ParseIntError),
    #[error("Decoding base64 failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("The secret part has the wrong length")]
    InvalidSecretLength,
    #[error("The salt part has the wrong length")]
    InvalidSaltLength,
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct AuthToken {
    pub user: Id<UserMarker>,
    secret: [u8; TOKEN_SECRET_LEN],
    salt: [u8; TOKEN_SALT_LEN],
}

impl AuthToken {
    #[must_use]
    pub fn issue(user: Id<UserMarker>) -> Self {
        Self {
            user,
            secret: rand::random(),
            salt: rand::random(),
        }
    }

    pub fn hash(&self) -> Result<TokenHash, TokenHashError> {
        let mut hash = Box::new([0; TOKEN_HASH_LEN]);
        Argon2::default()
            .hash_password_into(&self.secret, &self.salt, &mut *hash)
            .map_err(TokenHashError)?;

        Ok(TokenHash(hash))
    }
}

impl Display for AuthToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.user,
            BASE64_URL_SAFE_NO_PAD.encode(self.secret),
            BASE64_URL_SAFE_NO_PAD.encode(self.salt),
        )
    }
}

impl FromStr for AuthToken {
    type Err = TokenDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '.');

        let user_part = parts.next().ok_or(Self::Err::MissingPart)?;
        let secret_part = parts.next().ok_or(Self::Err::MissingPart)?;
        let salt_part = parts.next().ok_or(Self::Err::MissingPart)?;

        let user = u64::from_str(user_part)
            .map_err(Self::Err::InvalidUserId)?
            .into();
        let secret = BASE64_URL_SAFE_NO_PAD
            .decode(secret_part)?
            .try_into()
            .map_err(|_| Self::Err::InvalidSecretLength)?;
        let salt = BASE64_URL_SAFE_NO_PAD
            .decode(salt_part)?
            .try_into()
            .map_err(|_| Self::Err::InvalidSaltLength)?;

        Ok(Self { user, secret, salt })
    }
}

impl Debug for AuthToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("user", &self.user)
            .field("secret", &"[redacted]")
            .field("salt", &"[redacted]")
            .finish()
    }
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct TokenHash(Box<[u8; TOKEN_HASH_LEN]>);

impl TokenHash {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &*self.0
    }
}

impl Debug for TokenHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TokenHash").field(&"[redacted]").finish()
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The stored token hash has an invalid length")]
pub struct InvalidTokenHashError;

impl TryFrom<Box<[u8]>> for TokenHash {
    type Error = InvalidTokenHashError;

    fn try_from(value: Box<[u8]>) -> Result<Self, Self::Error> {
        Ok(Self(value.try_into().map_err(|_| InvalidTokenHashError)?))
    }
}

/// A minted session row. Minting is the authentication provider's business;
/// the application only ever looks sessions up by token hash.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Session {
    pub user: Id<UserMarker>,
    pub token_hash: TokenHash,
    pub created_at: UtcDateTime,
    pub lifetime: Option<Ttl>,
}

impl Session {
    #[must_use]
    pub fn expired_at(&self, now: UtcDateTime) -> bool {
        self.lifetime
            .is_some_and(|lifetime| self.created_at + lifetime.get() < now)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        model::auth::{AuthToken, Session, TokenDecodeError},
        util::Ttl,
    };
    use time::{Duration, macros::utc_datetime};

    #[test]
    fn token_survives_a_string_round_trip() {
        let token = AuthToken::issue(42.into());
        let parsed: AuthToken = token.to_string().parse().unwrap();
        assert_eq!(parsed, token);
        assert_eq!(parsed.hash().unwrap(), token.hash().unwrap());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert_eq!(
            "justonepart".parse::<AuthToken>(),
            Err(TokenDecodeError::MissingPart)
        );
        assert!(matches!(
            "notanumber.YQ.YQ".parse::<AuthToken>(),
            Err(TokenDecodeError::InvalidUserId(_))
        ));
        assert_eq!(
            "7.YQ.YQ".parse::<AuthToken>(),
            Err(TokenDecodeError::InvalidSecretLength)
        );
    }

    #[test]
    fn sessions_expire_by_lifetime_only() {
        let created_at = utc_datetime!(2025-06-01 12:00);
        let token = AuthToken::issue(1.into());

        let bounded = Session {
            user: 1.into(),
            token_hash: token.hash().unwrap(),
            created_at,
            lifetime: Ttl::new(Duration::hours(1)),
        };
        assert!(!bounded.expired_at(created_at + Duration::minutes(59)));
        assert!(bounded.expired_at(created_at + Duration::minutes(61)));

        let unbounded = Session {
            lifetime: None,
            ..bounded
        };
        assert!(!unbounded.expired_at(created_at + Duration::days(365)));
    }
}
