//! [`User`] read model definition.
//!
//! [`User`]: crate::domain::User

pub mod list {
    //! [`User`]s list definitions.

    use common::define_pagination;
    use derive_more::{From, Into};

    use crate::domain::{business_domain, user};
    #[cfg(doc)]
    use crate::domain::{BusinessDomain, User};

    define_pagination!(Cursor, Node, Filter);

    /// Node in a [`Connection`].
    pub type Node = user::Id;

    /// Cursor pointing to a specific [`User`] in a list.
    pub type Cursor = user::Id;

    /// Filter for [`Selector`].
    ///
    /// Unset criteria match every [`User`].
    #[derive(Clone, Copy, Debug, Default)]
    pub struct Filter {
        /// [`user::Role`] the [`User`]s should have.
        pub role: Option<user::Role>,

        /// ID of the [`BusinessDomain`] the [`User`]s should be affiliated
        /// with.
        pub domain_id: Option<business_domain::Id>,
    }

    /// Total count of [`User`]s.
    #[derive(Clone, Copy, Debug, Eq, From, Hash, Into, PartialEq)]
    pub struct TotalCount(i32);
}
