//! [`Config`]-related definitions.

use std::time;

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use derive_more::{Debug, Display, Error as StdError};
use serde::Deserialize;
use service::domain::user::password;
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: Server,

    /// Service configuration.
    pub service: Service,

    /// Postgres configuration.
    pub postgres: Postgres,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    #[default(vec!["*".to_owned()])]
    pub origins: Vec<String>,
}

/// Service configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Service {
    /// Secret signing the issued [JWT]s.
    ///
    /// [JWT]: https://wikipedia.org/wiki/JSON_Web_Token
    #[debug(skip)]
    #[default("secret".to_owned())]
    pub jwt_secret: String,

    /// Lifetime of the issued sessions.
    #[default(time::Duration::from_secs(60 * 60))]
    #[serde(with = "humantime_serde")]
    pub session_ttl: time::Duration,

    /// Bcrypt work factor for password hashes.
    #[default(12)]
    pub password_cost: u32,
}

impl TryFrom<Service> for service::Config {
    type Error = InvalidPasswordCost;

    fn try_from(value: Service) -> Result<Self, Self::Error> {
        let Service {
            jwt_secret,
            session_ttl,
            password_cost,
        } = value;
        Ok(Self {
            jwt_encoding_key: jsonwebtoken::EncodingKey::from_secret(
                jwt_secret.as_bytes(),
            ),
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(
                jwt_secret.as_bytes(),
            ),
            session_ttl,
            password_cost: password::Cost::new(password_cost)
                .ok_or(InvalidPasswordCost(password_cost))?,
        })
    }
}

/// Error of a `service.password_cost` being out of the bcrypt range.
#[derive(Clone, Copy, Debug, Display, StdError)]
#[display(
    "`service.password_cost` must be in {}..={} range, but is {_0}",
    password::Cost::MIN,
    password::Cost::MAX,
)]
pub struct InvalidPasswordCost(#[error(not(source))] pub u32);

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[debug(skip)]
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("postgres".to_owned())]
    pub dbname: String,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use super::Service;

    #[test]
    fn defaults_to_hour_long_sessions() {
        let conf = service::Config::try_from(Service::default()).unwrap();

        assert_eq!(conf.session_ttl, Duration::from_secs(60 * 60));
        assert_eq!(conf.password_cost.get(), 12);
    }

    #[test]
    fn rejects_password_cost_out_of_bcrypt_range() {
        for cost in [0, 3, 32] {
            let res = service::Config::try_from(Service {
                password_cost: cost,
                ..Service::default()
            });

            assert!(res.is_err(), "cost {cost} is accepted");
        }
    }

    #[test]
    fn hides_secret_from_debug_output() {
        let conf = Service {
            jwt_secret: "s3cr3t-value".to_owned(),
            ..Service::default()
        };

        assert!(!format!("{conf:?}").contains("s3cr3t-value"));
        assert!(!format!(
            "{:?}",
            service::Config::try_from(conf).unwrap(),
        )
        .contains("s3cr3t-value"));
    }
}
