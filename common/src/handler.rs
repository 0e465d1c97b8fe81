//! [`Handler`] abstractions.
//!
//! Every service operation is a [`Handler`] parametrized by its input: a
//! command, a query or a single database operation.

use std::future::Future;

/// Executable handler of `Args`.
pub trait Handler<Args = ()> {
    /// Type of successful [`Handler`] result.
    type Ok;

    /// Type of this [`Handler`] error.
    type Err;

    /// Executes this [`Handler`] with the provided `args`.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}

