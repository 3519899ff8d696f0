//! Pool guarantee applications (PGA).
//!
//! A buyer asks the financier pool to guarantee a trade. Financiers vote
//! with their financier power, the seller accepts, the buyer pays collateral
//! and later the balance into custody, a logistics partner reports shipment,
//! the platform issues a certificate, and a delivery person hands over the
//! goods. The buyer's consent to the delivery agreement is the only path to
//! completion and releases the trade value to the seller.

pub mod engine;
pub mod error;
pub mod model;
pub mod params;
pub mod store;

pub use engine::PgaEngine;
pub use error::PgaError;
pub use model::{
    DeliveryAgreement, GuaranteeBallot, NewApplication, NewDeliveryAgreement, PgaStatus,
    PoolGuaranteeApplication,
};
pub use params::PgaParams;
pub use store::PgaStore;
