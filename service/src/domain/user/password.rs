//! [`Password`] and [`PasswordHash`] definitions.

use std::str::FromStr;

use derive_more::{Debug, Display, Error, From};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use secrecy::{zeroize::Zeroize, CloneableSecret, ExposeSecret as _, SecretBox};
use tokio::task;

#[cfg(doc)]
use crate::domain::User;

/// Raw password of a [`User`].
///
/// Lives only for the duration of a single request and is never persisted.
#[derive(Clone, Debug, Eq, PartialEq)]
#[debug("Password(***)")]
pub struct Password(String);

impl Password {
    /// Creates a new [`Password`] if the given `password` is valid.
    #[must_use]
    pub fn new(password: impl Into<String>) -> Option<Self> {
        let password = password.into();
        Self::check(&password).then_some(Self(password))
    }

    /// Checks whether the given `password` is a valid [`Password`].
    ///
    /// Bcrypt only digests the first 72 bytes, so longer inputs are refused.
    fn check(password: impl AsRef<str>) -> bool {
        let password = password.as_ref();
        !password.is_empty() && password.len() <= 72
    }
}

impl AsRef<[u8]> for Password {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl FromStr for Password {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Password`")
    }
}

impl CloneableSecret for Password {}
impl Zeroize for Password {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// Work factor of the bcrypt hashing.
#[derive(Clone, Copy, Debug, Display, Eq, Ord, PartialEq, PartialOrd)]
pub struct Cost(u32);

impl Cost {
    /// Lowest [`Cost`] accepted by bcrypt.
    pub const MIN: Self = Self(4);

    /// Highest [`Cost`] accepted by bcrypt.
    pub const MAX: Self = Self(31);

    /// Creates a new [`Cost`] if the given `cost` is in the bcrypt range.
    #[must_use]
    pub const fn new(cost: u32) -> Option<Self> {
        if cost >= Self::MIN.0 && cost <= Self::MAX.0 {
            Some(Self(cost))
        } else {
            None
        }
    }

    /// Returns the numeric value of this [`Cost`].
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Default for Cost {
    fn default() -> Self {
        Self(bcrypt::DEFAULT_COST)
    }
}

/// Salted bcrypt hash of a [`Password`] in the modular crypt format
/// (`$2b$<cost>$<salt><digest>`).
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wraps an already computed hash, as read from a storage.
    ///
    /// Malformed values are accepted and simply never verify.
    #[must_use]
    pub fn from_stored(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// Hashes the given [`Password`] with a fresh random salt.
    ///
    /// Blocks the current thread for the whole bcrypt computation, see
    /// [`PasswordHash::compute()`] for the async counterpart.
    ///
    /// # Errors
    ///
    /// If bcrypt fails to produce the hash (no randomness available).
    pub fn new(password: &Password, cost: Cost) -> Result<Self, HashError> {
        Ok(Self(bcrypt::hash(password, cost.get())?))
    }

    /// Checks whether the given [`Password`] matches this [`PasswordHash`].
    ///
    /// Returns `false` for a malformed hash instead of failing.
    #[must_use]
    pub fn verify(&self, password: &Password) -> bool {
        bcrypt::verify(password, &self.0).unwrap_or(false)
    }

    /// Hashes the given [`Password`] on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// See [`PasswordHash::new()`] for details.
    pub async fn compute(
        password: SecretBox<Password>,
        cost: Cost,
    ) -> Result<Self, HashError> {
        task::spawn_blocking(move || Self::new(password.expose_secret(), cost))
            .await?
    }

    /// Verifies the given [`Password`] on the blocking thread pool.
    pub async fn check(&self, password: SecretBox<Password>) -> bool {
        let hash = self.clone();
        task::spawn_blocking(move || hash.verify(password.expose_secret()))
            .await
            .unwrap_or(false)
    }
}

/// Error of computing a [`PasswordHash`].
#[derive(Debug, Display, Error, From)]
pub enum HashError {
    /// Bcrypt failed.
    #[display("bcrypt failed: {_0}")]
    Bcrypt(bcrypt::BcryptError),

    /// Blocking task didn't complete.
    #[display("hashing task failed: {_0}")]
    Join(task::JoinError),
}

#[cfg(test)]
mod spec {
    use secrecy::SecretBox;

    use super::{Cost, Password, PasswordHash};

    fn password(s: &str) -> Password {
        Password::new(s).unwrap()
    }

    #[test]
    fn verifies_only_original_password() {
        let hash = PasswordHash::new(&password("s3cret!"), Cost::MIN).unwrap();

        assert!(hash.verify(&password("s3cret!")));
        assert!(!hash.verify(&password("s3cret")));
        assert!(!hash.verify(&password("S3CRET!")));
    }

    #[test]
    fn hash_is_self_describing() {
        let hash = PasswordHash::new(&password("pw"), Cost::MIN).unwrap();

        assert!(hash.to_string().starts_with("$2b$04$"), "{hash}");
        assert_eq!(hash.to_string().len(), 60);
    }

    #[test]
    fn salts_every_hash() {
        let first = PasswordHash::new(&password("pw"), Cost::MIN).unwrap();
        let second = PasswordHash::new(&password("pw"), Cost::MIN).unwrap();

        assert_ne!(first, second);
        assert!(first.verify(&password("pw")));
        assert!(second.verify(&password("pw")));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        for stored in ["", "plain-text", "$2b$04$short", "$9z$04$abcdefgh"] {
            let hash = PasswordHash::from_stored(stored);

            assert!(!hash.verify(&password("plain-text")), "{stored}");
        }
    }

    #[test]
    fn validates_password() {
        assert!(Password::new("").is_none());
        assert!(Password::new("x").is_some());
        assert!(Password::new("x".repeat(72)).is_some());
        assert!(Password::new("x".repeat(73)).is_none());
    }

    #[test]
    fn hides_password_from_debug_output() {
        assert_eq!(format!("{:?}", password("hunter2")), "Password(***)");
    }

    #[test]
    fn validates_cost() {
        assert_eq!(Cost::new(3), None);
        assert_eq!(Cost::new(4), Some(Cost::MIN));
        assert_eq!(Cost::new(32), None);
        assert_eq!(Cost::default().get(), 12);
    }

    #[tokio::test]
    async fn hashes_on_blocking_pool() {
        let hash = PasswordHash::compute(
            SecretBox::new(Box::new(password("pw"))),
            Cost::MIN,
        )
        .await
        .unwrap();

        assert!(hash.check(SecretBox::new(Box::new(password("pw")))).await);
        assert!(!hash.check(SecretBox::new(Box::new(password("pv")))).await);
    }
}
