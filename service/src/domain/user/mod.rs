//! [`User`] definitions.

pub mod password;
pub mod session;

use std::sync::LazyLock;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::business_domain;
#[cfg(doc)]
use crate::domain::BusinessDomain;

pub use self::{
    password::{Password, PasswordHash},
    session::Session,
};

/// Registered principal capable of authenticating.
#[derive(Clone, Debug)]
pub struct User {
    /// ID of this [`User`].
    pub id: Id,

    /// [`Name`] of this [`User`].
    pub name: Name,

    /// [`Email`] of this [`User`].
    ///
    /// Unique across all [`User`]s.
    pub email: Email,

    /// [`Role`] of this [`User`].
    pub role: Role,

    /// [`PasswordHash`] of this [`User`].
    pub password_hash: PasswordHash,

    /// [`Avatar`] of this [`User`].
    pub avatar: Option<Avatar>,

    /// ID of the [`BusinessDomain`] this [`User`] is affiliated with.
    pub domain_id: business_domain::Id,

    /// [`Permissions`] granted to this [`User`].
    pub permissions: Permissions,

    /// [`DateTime`] when this [`User`] was created.
    pub created_at: CreationDateTime,
}

impl User {
    /// Indicates whether this [`User`] has the [`Role::Admin`].
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// ID of a [`User`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Name of a [`User`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name && !name.is_empty() && name.len() <= 512
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

/// Email address of a [`User`].
///
/// Compared case-sensitively, exactly as stored.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Email(String);

impl Email {
    /// Creates a new [`Email`] if the given `address` is valid.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Option<Self> {
        let address = address.into();
        Self::check(&address).then_some(Self(address))
    }

    /// Checks whether the given `address` is a valid [`Email`].
    fn check(address: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Email`] format.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(
                "^([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                     \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                  |\\x22([^\\x0d\\x22\\x5c\\x80-\\xff]\
                  |\\x5c[\\x00-\\x7f])*\\x22)\
                  (\\x2e([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                           \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                        |\\x22([^\\x0d\\x22\\x5c\\x80-\\xff]\
                        |\\x5c[\\x00-\\x7f])*\\x22))*\\x40\
                  ([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                     \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                  |\\x5b([^\\x0d\\x5b-\\x5d\\x80-\\xff]\
                        |\\x5c[\\x00-\\x7f])*\\x5d)\
                  (\\x2e([^\\x00-\\x20\\x22\\x28\\x29\\x2c\\x2e\\x3a-\
                           \\x3c\\x3e\\x40\\x5b-\\x5d\\x7f-\\xff]+\
                        |\\x5b([^\\x0d\\x5b-\\x5d\\x80-\\xff]\
                        |\\x5c[\\x00-\\x7f])*\\x5d))*$",
            )
            .expect("valid regex")
        });

        address.as_ref().len() <= 320 && REGEX.is_match(address.as_ref())
    }
}

impl FromStr for Email {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Email`")
    }
}

define_kind! {
    #[doc = "Role of a `User`."]
    enum Role {
        #[doc = "Administrator managing other `User`s and domains."]
        Admin = 1,

        #[doc = "Regular individual `User`."]
        Individual = 2,
    }
}

/// Avatar of a [`User`], usually an image URL.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Avatar(String);

impl Avatar {
    /// Creates a new [`Avatar`] if the given `avatar` is valid.
    #[must_use]
    pub fn new(avatar: impl Into<String>) -> Option<Self> {
        let avatar = avatar.into();
        Self::check(&avatar).then_some(Self(avatar))
    }

    /// Checks whether the given `avatar` is a valid [`Avatar`].
    fn check(avatar: impl AsRef<str>) -> bool {
        let avatar = avatar.as_ref();
        avatar.trim() == avatar && !avatar.is_empty() && avatar.len() <= 2048
    }
}

impl FromStr for Avatar {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Avatar`")
    }
}

/// Capability granted to a [`User`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Permission(String);

impl Permission {
    /// Creates a new [`Permission`] if the given `permission` is valid.
    #[must_use]
    pub fn new(permission: impl Into<String>) -> Option<Self> {
        let permission = permission.into();
        Self::check(&permission).then_some(Self(permission))
    }

    /// Checks whether the given `permission` is a valid [`Permission`].
    fn check(permission: impl AsRef<str>) -> bool {
        let permission = permission.as_ref();
        !permission.is_empty()
            && permission.len() <= 128
            && !permission.chars().any(char::is_whitespace)
    }
}

impl FromStr for Permission {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Permission`")
    }
}

/// Set of [`Permission`]s kept in the order they were granted.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Permissions(Vec<Permission>);

impl Permissions {
    /// Indicates whether the provided [`Permission`] is granted.
    #[must_use]
    pub fn contains(&self, permission: &Permission) -> bool {
        self.0.contains(permission)
    }

    /// Returns an iterator over the granted [`Permission`]s.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Permission> {
        self.0.iter()
    }

    /// Returns the number of granted [`Permission`]s.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Indicates whether no [`Permission`]s are granted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Permission> for Permissions {
    /// Collects [`Permission`]s dropping repeated ones.
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        let mut out = Vec::new();
        for p in iter {
            if !out.contains(&p) {
                out.push(p);
            }
        }
        Self(out)
    }
}

impl From<Vec<Permission>> for Permissions {
    fn from(permissions: Vec<Permission>) -> Self {
        permissions.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a Permissions {
    type Item = &'a Permission;
    type IntoIter = std::slice::Iter<'a, Permission>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// [`DateTime`] when a [`User`] was created.
pub type CreationDateTime = DateTimeOf<(User, unit::Creation)>;

#[cfg(test)]
mod spec {
    use super::{Avatar, Email, Name, Permission, Permissions, Role};

    #[test]
    fn validates_name() {
        assert!(Name::new("Ada Lovelace").is_some());
        assert!(Name::new("").is_none());
        assert!(Name::new(" Ada").is_none());
        assert!(Name::new("a".repeat(513)).is_none());
    }

    #[test]
    fn validates_email() {
        assert!(Email::new("a@x.com").is_some());
        assert!(Email::new("first.last@sub.example.org").is_some());
        assert!(Email::new("not-an-email").is_none());
        assert!(Email::new("a@@x.com").is_none());
        assert!(Email::new("").is_none());
    }

    #[test]
    fn parses_from_str() {
        assert_eq!("a@x.com".parse::<Email>().unwrap().to_string(), "a@x.com");
        assert!("not-an-email".parse::<Email>().is_err());
        assert!("".parse::<Name>().is_err());
        assert!("".parse::<Avatar>().is_err());
    }

    #[test]
    fn email_is_case_sensitive() {
        assert_ne!(Email::new("A@x.com"), Email::new("a@x.com"));
    }

    #[test]
    fn validates_avatar() {
        assert!(Avatar::new("https://cdn.example.com/a.png").is_some());
        assert!(Avatar::new("").is_none());
        assert!(Avatar::new("a.png ").is_none());
    }

    #[test]
    fn role_uses_lowercase_names() {
        assert_eq!(Role::Admin.to_string(), "admin");
        assert_eq!(Role::Individual.to_string(), "individual");
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("superuser".parse::<Role>().is_err());
        assert!("ADMIN".parse::<Role>().is_err());
    }

    #[test]
    fn permissions_behave_as_ordered_set() {
        let p = |s: &str| Permission::new(s).unwrap();
        let perms: Permissions =
            vec![p("news:read"), p("users:write"), p("news:read")].into();

        assert_eq!(perms.len(), 2);
        assert!(perms.contains(&p("users:write")));
        assert!(!perms.contains(&p("users:delete")));
        assert_eq!(
            perms.iter().map(AsRef::<str>::as_ref).collect::<Vec<_>>(),
            ["news:read", "users:write"],
        );
    }

    #[test]
    fn validates_permission() {
        assert!(Permission::new("dashboard:read").is_some());
        assert!(Permission::new("").is_none());
        assert!(Permission::new("two words").is_none());
    }
}
