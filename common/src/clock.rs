//! [`Clock`] abstractions.

use crate::DateTime;

/// Source of the current [`DateTime`].
pub trait Clock {
    /// Returns the current [`DateTime`].
    fn now(&self) -> DateTime;
}

/// [`Clock`] backed by the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct System;

impl Clock for System {
    fn now(&self) -> DateTime {
        DateTime::now()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime {
        (**self).now()
    }
}

#[cfg(test)]
mod spec {
    use super::{Clock, System};
    use crate::DateTime;

    #[test]
    fn system_clock_moves_forward() {
        let before = DateTime::now();
        let now = System.now();

        assert!(now >= before);
    }

    #[test]
    fn borrowed_clock_delegates() {
        fn now_of(clock: impl Clock) -> DateTime {
            clock.now()
        }

        let before = DateTime::now();

        assert!(now_of(&System) >= before);
    }
}
