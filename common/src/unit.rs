//! Marker types.

/// Marker type describing an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker type describing an issuance of a credential.
#[derive(Clone, Copy, Debug)]
pub struct Issuance;

/// Marker type describing an expiration of a credential.
#[derive(Clone, Copy, Debug)]
pub struct Expiration;
