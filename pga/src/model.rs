//! Application and delivery agreement records.

use serde::{Deserialize, Serialize};
use std::fmt;
use tradefin_types::{Address, Amount, DocHash, Timestamp};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PgaStatus {
    Created,
    GuaranteeApproved,
    SellerApproved,
    CollateralPaid,
    GoodsShipped,
    BalancePaymentPaid,
    CertificateIssued,
    DeliveryAwaitingConsent,
    Completed,
    Rejected,
    Expired,
    Disputed,
}

impl PgaStatus {
    /// States before completion that still lapse when the guarantee expires.
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            Self::Created
                | Self::GuaranteeApproved
                | Self::SellerApproved
                | Self::CollateralPaid
                | Self::GoodsShipped
                | Self::BalancePaymentPaid
                | Self::CertificateIssued
                | Self::DeliveryAwaitingConsent
        )
    }
}

impl fmt::Display for PgaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolGuaranteeApplication {
    pub id: String,
    pub buyer: Address,
    pub seller: Address,
    pub token: Address,
    /// Normalised ISO currency code.
    pub currency: String,
    pub trade_value: Amount,
    pub guarantee_amount: Amount,
    pub collateral_amount: Amount,
    pub issuance_fee: Amount,
    /// Guarantee lifetime in seconds, counted from creation.
    pub duration: u64,
    pub created_at: Timestamp,
    pub voting_deadline: Timestamp,
    /// Financier power at creation; the base for the approval threshold.
    pub eligible_power: Amount,
    pub votes_for: Amount,
    pub votes_against: Amount,
    pub status: PgaStatus,
    pub collateral_paid: bool,
    pub issuance_fee_paid: bool,
    pub balance_payment_paid: bool,
    pub goods_shipped: bool,
    pub seller_has_voted: bool,
    pub logistic_partner: Option<Address>,
    pub shipped_at: Option<Timestamp>,
    pub certificate_issued_at: Option<Timestamp>,
    pub delivery_agreement_id: Option<String>,
    pub completed_at: Option<Timestamp>,
    /// Buyer funds held for this application, excluding the issuance fee.
    pub custody: Amount,
    pub dispute_reason: Option<String>,
    pub dispute_settled: bool,
    pub metadata: String,
    pub documents: Vec<DocHash>,
}

impl PoolGuaranteeApplication {
    /// When the application lapses, if it still can.
    pub fn expiry(&self) -> Option<Timestamp> {
        match self.status {
            PgaStatus::Created => Some(self.voting_deadline),
            s if s.is_pending() => Some(self.created_at.plus(self.duration)),
            _ => None,
        }
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expiry().is_some_and(|at| now > at)
    }

    /// Balance still owed by the buyer after the collateral.
    pub fn balance_due(&self) -> Amount {
        self.trade_value - self.collateral_amount
    }
}

/// A financier's vote on a guarantee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuaranteeBallot {
    pub financier: Address,
    pub support: bool,
    pub power: Amount,
    pub cast_at: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAgreement {
    pub id: String,
    pub pga_id: String,
    pub delivery_person: Address,
    pub buyer: Address,
    pub created_at: Timestamp,
    pub deadline: Timestamp,
    /// One-way.
    pub buyer_consent: bool,
    pub buyer_signed_at: Option<Timestamp>,
    pub notes: String,
    pub proof_uri: Option<String>,
}

/// Terms of a new application; the buyer is the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewApplication {
    pub id: String,
    pub seller: Address,
    pub token: Address,
    pub currency: String,
    pub trade_value: Amount,
    pub guarantee_amount: Amount,
    pub collateral_amount: Amount,
    pub duration: u64,
    pub metadata: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDeliveryAgreement {
    pub id: String,
    pub delivery_person: Address,
    pub deadline: Timestamp,
    pub notes: String,
}
