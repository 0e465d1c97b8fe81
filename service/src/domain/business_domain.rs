//! [`BusinessDomain`] definitions.

use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::User;

/// Business domain (organization unit) every [`User`] is affiliated with.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BusinessDomain {
    /// ID of this [`BusinessDomain`].
    pub id: Id,

    /// [`Name`] of this [`BusinessDomain`].
    ///
    /// Unique across all [`BusinessDomain`]s.
    pub name: Name,

    /// [`Icon`] of this [`BusinessDomain`].
    pub icon: Option<Icon>,

    /// Indicator whether this [`BusinessDomain`] is locked.
    pub locked: bool,

    /// [`AdminContact`] of this [`BusinessDomain`].
    pub admin_contact: Option<AdminContact>,
}

/// ID of a [`BusinessDomain`].
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

/// Name of a [`BusinessDomain`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
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
        name.trim() == name && !name.is_empty() && name.len() <= 128
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

/// Icon of a [`BusinessDomain`], usually an image URL or an emoji.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Icon(String);

impl Icon {
    /// Creates a new [`Icon`] if the given `icon` is valid.
    #[must_use]
    pub fn new(icon: impl Into<String>) -> Option<Self> {
        let icon = icon.into();
        (!icon.trim().is_empty() && icon.len() <= 2048).then_some(Self(icon))
    }
}

impl FromStr for Icon {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Icon`")
    }
}

/// Contact of a [`BusinessDomain`] administrator.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct AdminContact(String);

impl AdminContact {
    /// Creates a new [`AdminContact`] if the given `contact` is valid.
    #[must_use]
    pub fn new(contact: impl Into<String>) -> Option<Self> {
        let contact = contact.into();
        let valid = contact.trim() == contact
            && !contact.is_empty()
            && contact.len() <= 320;
        valid.then_some(Self(contact))
    }
}

impl FromStr for AdminContact {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `AdminContact`")
    }
}

#[cfg(test)]
mod spec {
    use super::{AdminContact, Icon, Name};

    #[test]
    fn validates_name() {
        assert!(Name::new("Finance").is_some());
        assert!(Name::new("").is_none());
        assert!(Name::new("Finance ").is_none());
        assert!(Name::new("x".repeat(128)).is_some());
        assert!(Name::new("x".repeat(129)).is_none());
    }

    #[test]
    fn validates_icon_and_contact() {
        assert!(Icon::new("📈").is_some());
        assert!(Icon::new("  ").is_none());
        assert!(AdminContact::new("ops@example.com").is_some());
        assert!(AdminContact::new("").is_none());
    }

    #[test]
    fn parses_from_str() {
        assert_eq!("Finance".parse::<Name>().unwrap().to_string(), "Finance");
        assert!(" Finance".parse::<Name>().is_err());
        assert!("".parse::<Icon>().is_err());
        assert_eq!(
            "ops@example.com".parse::<AdminContact>().unwrap().to_string(),
            "ops@example.com",
        );
    }
}
