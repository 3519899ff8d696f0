//! Escrow records.

use serde::{Deserialize, Serialize};
use std::fmt;
use tradefin_types::{Address, Amount, DocHash, Timestamp};

/// Created → Funded → InProgress → Completed, with Disputed and Refunded
/// reachable from the funded states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowStatus {
    Created,
    Funded,
    InProgress,
    Completed,
    Disputed,
    Refunded,
}

impl EscrowStatus {
    /// Funds are held and work may proceed.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Funded | Self::InProgress)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Refunded)
    }
}

impl fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MilestoneStatus {
    Pending,
    Completed,
    Released,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub description: String,
    pub amount: Amount,
    pub status: MilestoneStatus,
    pub completed_at: Option<Timestamp>,
    pub released_at: Option<Timestamp>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisputeStatus {
    Raised,
    InArbitration,
    Resolved,
}

impl fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    pub status: DisputeStatus,
    pub raised_by: Address,
    pub reason: String,
    pub raised_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
    /// Set on resolution.
    pub awarded_to_importer: Option<bool>,
}

impl Dispute {
    pub fn is_open(&self) -> bool {
        self.status != DisputeStatus::Resolved
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubWalletRole {
    Finance,
    Operations,
    Compliance,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    ReleaseFunds,
    ApproveMilestone,
    RaiseDispute,
    ManageWork,
    UploadDocuments,
}

/// A wallet acting for the principal that granted it. Never removed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubWallet {
    pub wallet: Address,
    pub role: SubWalletRole,
    pub permissions: Vec<Permission>,
    pub granted_by: Address,
    pub granted_at: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    pub id: u64,
    pub importer: Address,
    pub exporter: Address,
    pub arbitrator: Address,
    pub token: Address,
    pub total_amount: Amount,
    /// Paid to the exporter so far. Never exceeds `total_amount`.
    pub released_amount: Amount,
    pub arbitrator_fee: Amount,
    pub deadline: Timestamp,
    pub status: EscrowStatus,
    pub dispute: Option<Dispute>,
    pub milestones: Vec<Milestone>,
    pub sub_wallets: Vec<SubWallet>,
    pub documents: Vec<DocHash>,
    pub created_at: Timestamp,
    pub funded_at: Option<Timestamp>,
}

impl Escrow {
    /// Funds still held for this escrow.
    pub fn remaining(&self) -> Amount {
        self.total_amount.saturating_sub(self.released_amount)
    }

    pub fn has_open_dispute(&self) -> bool {
        self.dispute.as_ref().is_some_and(Dispute::is_open)
    }

    /// Whether `caller` is `principal` or a sub-wallet `principal` granted
    /// `permission` to.
    pub fn acts_for(&self, caller: &Address, principal: &Address, permission: Permission) -> bool {
        caller == principal
            || self.sub_wallets.iter().any(|sw| {
                sw.wallet == *caller
                    && sw.granted_by == *principal
                    && sw.permissions.contains(&permission)
            })
    }

    /// Importer, exporter, arbitrator, or a sub-wallet allowed to upload
    /// documents.
    pub fn is_party(&self, addr: &Address) -> bool {
        *addr == self.importer
            || *addr == self.exporter
            || *addr == self.arbitrator
            || self.acts_for(addr, &self.importer, Permission::UploadDocuments)
            || self.acts_for(addr, &self.exporter, Permission::UploadDocuments)
    }

    pub fn milestones_total(&self) -> Amount {
        self.milestones.iter().map(|m| m.amount).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneSpec {
    pub description: String,
    pub amount: Amount,
}

/// Parameters of a new escrow; the importer is the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEscrow {
    pub exporter: Address,
    pub arbitrator: Address,
    pub token: Address,
    pub total_amount: Amount,
    pub arbitrator_fee: Amount,
    pub deadline: Timestamp,
    pub milestones: Vec<MilestoneSpec>,
}
