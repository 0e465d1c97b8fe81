//! Identity service: credentials, sessions and the accounts behind them.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;
#[cfg(test)]
mod testing;

use std::time::Duration;

use common::clock;
use derive_more::Debug;

use crate::domain::user::{password, Session};
#[cfg(doc)]
use infra::Database;

pub use self::{command::Command, query::Query};

/// [`Service`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// [JWT] encoding key.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_encoding_key: jsonwebtoken::EncodingKey,

    /// [JWT] decoding key.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_decoding_key: jsonwebtoken::DecodingKey,

    /// Default lifetime of an issued [`Session`].
    pub session_ttl: Duration,

    /// Bcrypt work factor for new password hashes.
    pub password_cost: password::Cost,
}

impl Config {
    /// Creates a new [`Config`] signing [`Session`]s with the provided
    /// `secret`.
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        Self {
            jwt_encoding_key: jsonwebtoken::EncodingKey::from_secret(secret),
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(secret),
            session_ttl: Session::DEFAULT_TTL,
            password_cost: password::Cost::default(),
        }
    }
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db, Clk = clock::System> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,

    /// [`Clock`] of this [`Service`].
    ///
    /// [`Clock`]: common::Clock
    clock: Clk,
}

impl<Db> Service<Db> {
    /// Creates a new [`Service`] with the provided parameters.
    pub fn new(config: Config, database: Db) -> Self {
        Self::with_clock(config, database, clock::System)
    }
}

impl<Db, Clk> Service<Db, Clk> {
    /// Creates a new [`Service`] reading the current time from the provided
    /// `clock`.
    pub fn with_clock(config: Config, database: Db, clock: Clk) -> Self {
        Self {
            config,
            database,
            clock,
        }
    }

    /// Returns [`Config`] of this [`Service`].
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Returns [`Clock`] of this [`Service`].
    ///
    /// [`Clock`]: common::Clock
    #[must_use]
    pub fn clock(&self) -> &Clk {
        &self.clock
    }
}
