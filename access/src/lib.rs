//! Access control shared by every ledger component.
//!
//! A singleton gate holds the owner and the pause flag; owner-maintained
//! allow-lists hold the supported countries, currencies and tokens; role
//! tables record who is a verified user, logistics partner, delivery person
//! or document verifier.

pub mod error;
pub mod gate;
pub mod lists;
pub mod roles;
pub mod store;

pub use error::AccessError;
pub use gate::{AccessGate, Gate};
pub use lists::ListKind;
pub use roles::{Role, RoleGrant};
pub use store::AccessStore;
