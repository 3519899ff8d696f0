//! Address identity: one secondary credential per primary identity.
//!
//! Every component resolves the addresses it is handed through
//! [`IdentityResolver::resolve`] before checking roles or recording
//! ownership, so a user acting through their secondary credential is
//! indistinguishable from the primary.

pub mod error;
pub mod resolver;

pub use error::IdentityError;
pub use resolver::{IdentityResolver, IdentityStore};
