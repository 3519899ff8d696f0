//! Logical tables of the shared store.

use serde::{Deserialize, Serialize};

/// A disjoint key space inside the shared store.
///
/// Each backend maps every table to its own namespace (an LMDB named
/// database, a separate map component in memory), so identical keys in two
/// tables can never collide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Table {
    /// Schema version and other bookkeeping.
    Meta,
    /// Sequential id counters, keyed by counter name.
    Counters,
    /// secondary credential → primary identity.
    IdentityPrimary,
    /// primary identity → secondary credential.
    IdentitySecondary,
    /// secondary credential → primary it asked to be linked to.
    IdentityRequests,
    /// Pause flag and owner.
    AccessGate,
    /// (role, address) → grant.
    AccessRoles,
    /// (list, value) → marker: countries, currencies, tokens.
    AccessLists,
    /// (user, token) → stake record.
    Stakes,
    /// token → pool totals.
    StakePools,
    /// user → aggregate voting power.
    StakeAccounts,
    /// Global voting-power totals.
    StakeTotals,
    Proposals,
    /// (proposal, voter) → ballot.
    ProposalVotes,
    /// (proposal, financier) → approval.
    ExecutionApprovals,
    FinanceRequests,
    /// (request, voter) → ballot.
    FinanceRequestVotes,
    Escrows,
    Applications,
    /// (application, financier) → ballot.
    ApplicationVotes,
    DeliveryAgreements,
    Invoices,
    /// invoice number → invoice id.
    InvoiceNumbers,
    Documents,
}

impl Table {
    pub const ALL: [Table; 24] = [
        Table::Meta,
        Table::Counters,
        Table::IdentityPrimary,
        Table::IdentitySecondary,
        Table::IdentityRequests,
        Table::AccessGate,
        Table::AccessRoles,
        Table::AccessLists,
        Table::Stakes,
        Table::StakePools,
        Table::StakeAccounts,
        Table::StakeTotals,
        Table::Proposals,
        Table::ProposalVotes,
        Table::ExecutionApprovals,
        Table::FinanceRequests,
        Table::FinanceRequestVotes,
        Table::Escrows,
        Table::Applications,
        Table::ApplicationVotes,
        Table::DeliveryAgreements,
        Table::Invoices,
        Table::InvoiceNumbers,
        Table::Documents,
    ];

    /// Stable on-disk name of the table.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Meta => "meta",
            Self::Counters => "counters",
            Self::IdentityPrimary => "identity_primary",
            Self::IdentitySecondary => "identity_secondary",
            Self::IdentityRequests => "identity_requests",
            Self::AccessGate => "access_gate",
            Self::AccessRoles => "access_roles",
            Self::AccessLists => "access_lists",
            Self::Stakes => "stakes",
            Self::StakePools => "stake_pools",
            Self::StakeAccounts => "stake_accounts",
            Self::StakeTotals => "stake_totals",
            Self::Proposals => "proposals",
            Self::ProposalVotes => "proposal_votes",
            Self::ExecutionApprovals => "execution_approvals",
            Self::FinanceRequests => "finance_requests",
            Self::FinanceRequestVotes => "finance_request_votes",
            Self::Escrows => "escrows",
            Self::Applications => "applications",
            Self::ApplicationVotes => "application_votes",
            Self::DeliveryAgreements => "delivery_agreements",
            Self::Invoices => "invoices",
            Self::InvoiceNumbers => "invoice_numbers",
            Self::Documents => "documents",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn table_names_are_unique() {
        let names: HashSet<_> = Table::ALL.iter().map(|t| t.name()).collect();
        assert_eq!(names.len(), Table::ALL.len());
    }
}
