//! Fixtures for exercising [`Service`] commands against [`Memory`].

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use common::{Clock, DateTime};
use secrecy::SecretBox;

use crate::{
    command::{CreateBusinessDomain, CreateUser},
    domain::{business_domain, user, BusinessDomain, User},
    infra::Memory,
    Command as _, Config, Service,
};

/// Secret signing [`user::Session`]s in tests.
pub(crate) const SECRET: &[u8] = b"test-secret";

/// Unix timestamp every [`ManualClock`] starts from.
pub(crate) const START: i64 = 1_700_000_000;

/// [`Clock`] moved forward by hand.
#[derive(Clone, Debug)]
pub(crate) struct ManualClock(Arc<Mutex<DateTime>>);

impl ManualClock {
    /// Creates a new [`ManualClock`] pointing to [`START`].
    pub(crate) fn new() -> Self {
        Self(Arc::new(Mutex::new(
            DateTime::from_unix_timestamp(START).unwrap(),
        )))
    }

    /// Moves this [`ManualClock`] forward by the provided [`Duration`].
    pub(crate) fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime {
        *self.0.lock().unwrap()
    }
}

/// [`Service`] under test.
pub(crate) type TestService = Service<Memory, ManualClock>;

/// Creates a new [`TestService`] over an empty [`Memory`] along with its
/// [`ManualClock`].
pub(crate) fn service() -> (TestService, ManualClock) {
    let clock = ManualClock::new();
    let config = Config {
        password_cost: user::password::Cost::MIN,
        ..Config::new(SECRET)
    };
    (Service::with_clock(config, Memory::new(), clock.clone()), clock)
}

/// Wraps the provided raw `password` into a secret.
pub(crate) fn password(password: &str) -> SecretBox<user::Password> {
    SecretBox::new(Box::new(user::Password::new(password).unwrap()))
}

/// Creates a new [`BusinessDomain`] with the provided `name`.
pub(crate) async fn domain(svc: &TestService, name: &str) -> BusinessDomain {
    svc.execute(CreateBusinessDomain {
        name: business_domain::Name::new(name).unwrap(),
        icon: None,
        locked: false,
        admin_contact: None,
    })
    .await
    .unwrap()
}

/// Registers a new [`User`] with the provided credentials.
pub(crate) async fn register(
    svc: &TestService,
    email: &str,
    raw_password: &str,
    role: user::Role,
    domain_id: business_domain::Id,
) -> User {
    svc.execute(CreateUser {
        name: user::Name::new("Test User").unwrap(),
        email: user::Email::new(email).unwrap(),
        password: password(raw_password),
        role,
        avatar: None,
        domain_id,
        permissions: user::Permissions::default(),
    })
    .await
    .unwrap()
}
