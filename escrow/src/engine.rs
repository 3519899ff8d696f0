//! Escrow state machine.

use tradefin_access::{AccessGate, AccessStore};
use tradefin_identity::{IdentityResolver, IdentityStore};
use tradefin_types::{Address, Amount, DocHash, Settlement, Timestamp};

use crate::error::EscrowError;
use crate::model::{
    Dispute, DisputeStatus, Escrow, EscrowStatus, Milestone, MilestoneStatus, NewEscrow,
    Permission, SubWallet, SubWalletRole,
};
use crate::params::EscrowParams;
use crate::store::EscrowStore;

pub struct EscrowEngine {
    params: EscrowParams,
}

impl EscrowEngine {
    pub fn new(params: EscrowParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &EscrowParams {
        &self.params
    }

    /// Open an escrow with the caller as importer.
    pub fn create_escrow<S>(
        &self,
        store: &mut S,
        caller: &Address,
        new: NewEscrow,
        now: Timestamp,
    ) -> Result<u64, EscrowError>
    where
        S: EscrowStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let importer = IdentityResolver::resolve(store, caller)?;
        let exporter = IdentityResolver::resolve(store, &new.exporter)?;
        let arbitrator = IdentityResolver::resolve(store, &new.arbitrator)?;
        AccessGate::ensure_verified(store, &importer)?;
        AccessGate::ensure_token_supported(store, &new.token)?;

        if [importer, exporter, arbitrator].iter().any(Address::is_zero)
            || importer == exporter
            || importer == arbitrator
            || exporter == arbitrator
        {
            return Err(EscrowError::InvalidParties);
        }
        if new.total_amount == 0 {
            return Err(EscrowError::ZeroAmount);
        }
        if new.arbitrator_fee >= new.total_amount {
            return Err(EscrowError::ArbitratorFeeTooHigh {
                fee: new.arbitrator_fee,
                total: new.total_amount,
            });
        }
        if new.milestones.is_empty() {
            return Err(EscrowError::NoMilestones);
        }
        if new.milestones.len() > self.params.max_milestones {
            return Err(EscrowError::TooManyMilestones {
                max: self.params.max_milestones,
            });
        }
        let mut sum: Amount = 0;
        for (index, spec) in new.milestones.iter().enumerate() {
            if spec.amount == 0 {
                return Err(EscrowError::InvalidMilestoneAmount(index));
            }
            self.check_text(&spec.description)?;
            sum = sum.checked_add(spec.amount).ok_or(EscrowError::Overflow)?;
        }
        if sum > new.total_amount {
            return Err(EscrowError::MilestonesExceedTotal {
                sum,
                total: new.total_amount,
            });
        }
        if new.deadline <= now {
            return Err(EscrowError::DeadlineInPast(new.deadline));
        }

        let id = store.next_escrow_id()?;
        let escrow = Escrow {
            id,
            importer,
            exporter,
            arbitrator,
            token: new.token,
            total_amount: new.total_amount,
            released_amount: 0,
            arbitrator_fee: new.arbitrator_fee,
            deadline: new.deadline,
            status: EscrowStatus::Created,
            dispute: None,
            milestones: new
                .milestones
                .into_iter()
                .map(|spec| Milestone {
                    description: spec.description,
                    amount: spec.amount,
                    status: MilestoneStatus::Pending,
                    completed_at: None,
                    released_at: None,
                })
                .collect(),
            sub_wallets: Vec::new(),
            documents: Vec::new(),
            created_at: now,
            funded_at: None,
        };
        store.put_escrow(&escrow)?;
        tracing::info!(id, %importer, %exporter, total = escrow.total_amount, "escrow created");
        Ok(id)
    }

    /// Importer deposits exactly the total.
    pub fn fund<S>(
        &self,
        store: &mut S,
        id: u64,
        caller: &Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<Settlement, EscrowError>
    where
        S: EscrowStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let who = IdentityResolver::resolve(store, caller)?;
        let mut escrow = load(store, id)?;
        if who != escrow.importer {
            return Err(EscrowError::Unauthorized(who));
        }
        expect_status(&escrow, &[EscrowStatus::Created])?;
        if amount != escrow.total_amount {
            return Err(EscrowError::AmountMismatch {
                expected: escrow.total_amount,
                got: amount,
            });
        }
        if now > escrow.deadline {
            return Err(EscrowError::DeadlinePassed(escrow.deadline));
        }
        escrow.status = EscrowStatus::Funded;
        escrow.funded_at = Some(now);
        store.put_escrow(&escrow)?;
        tracing::info!(id, amount, "escrow funded");
        Ok(Settlement::new().pull(escrow.token, *caller, amount))
    }

    pub fn begin_work<S>(
        &self,
        store: &mut S,
        id: u64,
        caller: &Address,
    ) -> Result<(), EscrowError>
    where
        S: EscrowStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let who = IdentityResolver::resolve(store, caller)?;
        let mut escrow = load(store, id)?;
        if !escrow.acts_for(&who, &escrow.exporter, Permission::ManageWork) {
            return Err(EscrowError::Unauthorized(who));
        }
        expect_status(&escrow, &[EscrowStatus::Funded])?;
        escrow.status = EscrowStatus::InProgress;
        store.put_escrow(&escrow)?;
        tracing::info!(id, "escrow work started");
        Ok(())
    }

    pub fn complete_milestone<S>(
        &self,
        store: &mut S,
        id: u64,
        index: usize,
        caller: &Address,
        now: Timestamp,
    ) -> Result<(), EscrowError>
    where
        S: EscrowStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let who = IdentityResolver::resolve(store, caller)?;
        let mut escrow = load(store, id)?;
        if !escrow.acts_for(&who, &escrow.importer, Permission::ApproveMilestone) {
            return Err(EscrowError::Unauthorized(who));
        }
        if escrow.has_open_dispute() {
            return Err(EscrowError::DisputeActive);
        }
        expect_status(&escrow, &[EscrowStatus::Funded, EscrowStatus::InProgress])?;
        let milestone = escrow
            .milestones
            .get_mut(index)
            .ok_or(EscrowError::InvalidMilestone(index))?;
        match milestone.status {
            MilestoneStatus::Pending => {}
            MilestoneStatus::Completed => return Err(EscrowError::MilestoneAlreadyCompleted(index)),
            MilestoneStatus::Released => return Err(EscrowError::MilestoneAlreadyReleased(index)),
        }
        milestone.status = MilestoneStatus::Completed;
        milestone.completed_at = Some(now);
        store.put_escrow(&escrow)?;
        tracing::info!(id, index, "milestone completed");
        Ok(())
    }

    /// Pay a completed milestone to the exporter. Releasing the last
    /// milestone completes the escrow and refunds any unallocated
    /// remainder to the importer.
    pub fn release_milestone<S>(
        &self,
        store: &mut S,
        id: u64,
        index: usize,
        caller: &Address,
        now: Timestamp,
    ) -> Result<Settlement, EscrowError>
    where
        S: EscrowStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let who = IdentityResolver::resolve(store, caller)?;
        let mut escrow = load(store, id)?;
        if !escrow.acts_for(&who, &escrow.importer, Permission::ReleaseFunds) {
            return Err(EscrowError::Unauthorized(who));
        }
        if escrow.has_open_dispute() {
            return Err(EscrowError::DisputeActive);
        }
        expect_status(&escrow, &[EscrowStatus::Funded, EscrowStatus::InProgress])?;
        let milestone = escrow
            .milestones
            .get(index)
            .ok_or(EscrowError::InvalidMilestone(index))?;
        match milestone.status {
            MilestoneStatus::Completed => {}
            MilestoneStatus::Pending => return Err(EscrowError::MilestoneNotCompleted(index)),
            MilestoneStatus::Released => return Err(EscrowError::MilestoneAlreadyReleased(index)),
        }
        let amount = milestone.amount;
        let released = escrow
            .released_amount
            .checked_add(amount)
            .filter(|r| *r <= escrow.total_amount)
            .ok_or(EscrowError::ExceedsTotal)?;

        escrow.released_amount = released;
        escrow.milestones[index].status = MilestoneStatus::Released;
        escrow.milestones[index].released_at = Some(now);

        let mut settlement = Settlement::new().pay(escrow.token, escrow.exporter, amount);
        if escrow
            .milestones
            .iter()
            .all(|m| m.status == MilestoneStatus::Released)
        {
            escrow.status = EscrowStatus::Completed;
            settlement.push_out(escrow.token, escrow.importer, escrow.remaining());
            tracing::info!(id, "escrow completed");
        }
        store.put_escrow(&escrow)?;
        tracing::info!(id, index, amount, "milestone released");
        Ok(settlement)
    }

    pub fn raise_dispute<S>(
        &self,
        store: &mut S,
        id: u64,
        caller: &Address,
        reason: &str,
        now: Timestamp,
    ) -> Result<(), EscrowError>
    where
        S: EscrowStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let who = IdentityResolver::resolve(store, caller)?;
        let mut escrow = load(store, id)?;
        let principal = if escrow.acts_for(&who, &escrow.importer, Permission::RaiseDispute) {
            escrow.importer
        } else if escrow.acts_for(&who, &escrow.exporter, Permission::RaiseDispute) {
            escrow.exporter
        } else {
            return Err(EscrowError::Unauthorized(who));
        };
        expect_status(&escrow, &[EscrowStatus::Funded, EscrowStatus::InProgress])?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(EscrowError::EmptyReason);
        }
        self.check_text(reason)?;

        escrow.status = EscrowStatus::Disputed;
        escrow.dispute = Some(Dispute {
            status: DisputeStatus::Raised,
            raised_by: principal,
            reason: reason.to_string(),
            raised_at: now,
            resolved_at: None,
            awarded_to_importer: None,
        });
        store.put_escrow(&escrow)?;
        tracing::info!(id, raised_by = %principal, "escrow dispute raised");
        Ok(())
    }

    pub fn escalate_dispute<S>(
        &self,
        store: &mut S,
        id: u64,
        caller: &Address,
    ) -> Result<(), EscrowError>
    where
        S: EscrowStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let who = IdentityResolver::resolve(store, caller)?;
        let mut escrow = load(store, id)?;
        if who != escrow.arbitrator {
            return Err(EscrowError::Unauthorized(who));
        }
        let dispute = escrow.dispute.as_mut().ok_or(EscrowError::NoDispute)?;
        if dispute.status != DisputeStatus::Raised {
            return Err(EscrowError::InvalidDisputeStatus(dispute.status));
        }
        dispute.status = DisputeStatus::InArbitration;
        store.put_escrow(&escrow)?;
        tracing::info!(id, "escrow dispute escalated");
        Ok(())
    }

    /// The arbitrator takes at most the fee from the remainder and awards
    /// the rest to one side.
    pub fn resolve_dispute<S>(
        &self,
        store: &mut S,
        id: u64,
        caller: &Address,
        award_to_importer: bool,
        now: Timestamp,
    ) -> Result<Settlement, EscrowError>
    where
        S: EscrowStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let who = IdentityResolver::resolve(store, caller)?;
        let mut escrow = load(store, id)?;
        if who != escrow.arbitrator {
            return Err(EscrowError::Unauthorized(who));
        }
        expect_status(&escrow, &[EscrowStatus::Disputed])?;
        let remaining = escrow.remaining();
        let fee = escrow.arbitrator_fee.min(remaining);
        let award = remaining - fee;

        let dispute = escrow.dispute.as_mut().ok_or(EscrowError::NoDispute)?;
        if !dispute.is_open() {
            return Err(EscrowError::InvalidDisputeStatus(dispute.status));
        }
        dispute.status = DisputeStatus::Resolved;
        dispute.resolved_at = Some(now);
        dispute.awarded_to_importer = Some(award_to_importer);

        let mut settlement = Settlement::new().pay(escrow.token, escrow.arbitrator, fee);
        if award_to_importer {
            escrow.status = EscrowStatus::Refunded;
            settlement.push_out(escrow.token, escrow.importer, award);
        } else {
            escrow.status = EscrowStatus::Completed;
            escrow.released_amount += award;
            settlement.push_out(escrow.token, escrow.exporter, award);
        }
        store.put_escrow(&escrow)?;
        tracing::info!(id, award_to_importer, fee, award, "escrow dispute resolved");
        Ok(settlement)
    }

    /// Return the unreleased balance once the deadline has passed without
    /// work starting.
    pub fn refund_expired<S>(
        &self,
        store: &mut S,
        id: u64,
        caller: &Address,
        now: Timestamp,
    ) -> Result<Settlement, EscrowError>
    where
        S: EscrowStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let who = IdentityResolver::resolve(store, caller)?;
        let mut escrow = load(store, id)?;
        if who != escrow.importer {
            return Err(EscrowError::Unauthorized(who));
        }
        if escrow.has_open_dispute() {
            return Err(EscrowError::DisputeActive);
        }
        expect_status(&escrow, &[EscrowStatus::Funded])?;
        if now <= escrow.deadline {
            return Err(EscrowError::DeadlineNotReached(escrow.deadline));
        }
        let refund = escrow.remaining();
        escrow.status = EscrowStatus::Refunded;
        store.put_escrow(&escrow)?;
        tracing::info!(id, refund, "expired escrow refunded");
        Ok(Settlement::new().pay(escrow.token, escrow.importer, refund))
    }

    /// Delegate permissions to a sub-wallet acting for the caller.
    #[allow(clippy::too_many_arguments)]
    pub fn add_sub_wallet<S>(
        &self,
        store: &mut S,
        id: u64,
        caller: &Address,
        wallet: &Address,
        role: SubWalletRole,
        permissions: &[Permission],
        now: Timestamp,
    ) -> Result<(), EscrowError>
    where
        S: EscrowStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let principal = IdentityResolver::resolve(store, caller)?;
        let mut escrow = load(store, id)?;
        if principal != escrow.importer && principal != escrow.exporter {
            return Err(EscrowError::Unauthorized(principal));
        }
        if escrow.status.is_terminal() {
            return Err(EscrowError::InvalidStatus {
                id,
                status: escrow.status,
            });
        }
        if wallet.is_zero()
            || *wallet == escrow.importer
            || *wallet == escrow.exporter
            || *wallet == escrow.arbitrator
        {
            return Err(EscrowError::InvalidSubWallet(*wallet));
        }
        if permissions.is_empty() {
            return Err(EscrowError::NoPermissions);
        }
        if escrow.sub_wallets.iter().any(|sw| sw.wallet == *wallet) {
            return Err(EscrowError::DuplicateSubWallet(*wallet));
        }
        if escrow.sub_wallets.len() >= self.params.max_sub_wallets {
            return Err(EscrowError::TooManySubWallets {
                max: self.params.max_sub_wallets,
            });
        }
        let mut granted = Vec::with_capacity(permissions.len());
        for permission in permissions {
            if !granted.contains(permission) {
                granted.push(*permission);
            }
        }
        escrow.sub_wallets.push(SubWallet {
            wallet: *wallet,
            role,
            permissions: granted,
            granted_by: principal,
            granted_at: now,
        });
        store.put_escrow(&escrow)?;
        tracing::info!(id, %wallet, ?role, "sub-wallet added");
        Ok(())
    }

    /// Append a document reference. Authorization is the caller's concern.
    pub fn link_document<S: EscrowStore>(
        store: &mut S,
        id: u64,
        hash: &DocHash,
    ) -> Result<(), EscrowError> {
        let mut escrow = load(store, id)?;
        if escrow.documents.contains(hash) {
            return Err(EscrowError::DocumentAlreadyLinked(*hash));
        }
        escrow.documents.push(*hash);
        store.put_escrow(&escrow)?;
        tracing::debug!(id, %hash, "document linked to escrow");
        Ok(())
    }

    pub fn escrow<S: EscrowStore>(store: &S, id: u64) -> Result<Option<Escrow>, EscrowError> {
        Ok(store.escrow(id)?)
    }

    /// Whether `addr` takes part in any escrow, sub-wallets included.
    pub fn involves<S: EscrowStore>(store: &S, addr: &Address) -> Result<bool, EscrowError> {
        Ok(store.escrows()?.iter().any(|e| {
            e.importer == *addr
                || e.exporter == *addr
                || e.arbitrator == *addr
                || e.sub_wallets.iter().any(|w| w.wallet == *addr)
        }))
    }

    fn check_text(&self, text: &str) -> Result<(), EscrowError> {
        if text.chars().count() > self.params.max_text_len {
            return Err(EscrowError::TextTooLong {
                max: self.params.max_text_len,
            });
        }
        Ok(())
    }
}

fn load<S: EscrowStore>(store: &S, id: u64) -> Result<Escrow, EscrowError> {
    store.escrow(id)?.ok_or(EscrowError::EscrowNotFound(id))
}

fn expect_status(escrow: &Escrow, allowed: &[EscrowStatus]) -> Result<(), EscrowError> {
    if !allowed.contains(&escrow.status) {
        return Err(EscrowError::InvalidStatus {
            id: escrow.id,
            status: escrow.status,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MilestoneSpec;
    use tradefin_access::Role;
    use tradefin_nullables::NullStore;
    use tradefin_store::StoreTxn;

    const T0: u64 = 1_700_000_000;

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    fn setup(txn: &mut StoreTxn<'_>) {
        AccessGate::initialize(txn, &addr(1)).unwrap();
        AccessGate::add_token(txn, &addr(1), &addr(99)).unwrap();
        AccessGate::add_country(txn, &addr(1), "GH").unwrap();
        AccessGate::grant_role(txn, &addr(1), &addr(2), Role::VerifiedUser, Some("GH"), Timestamp::new(T0))
            .unwrap();
    }

    fn new_escrow(milestones: &[Amount]) -> NewEscrow {
        NewEscrow {
            exporter: addr(3),
            arbitrator: addr(4),
            token: addr(99),
            total_amount: 1_000,
            arbitrator_fee: 50,
            deadline: Timestamp::new(T0 + 1_000),
            milestones: milestones
                .iter()
                .map(|a| MilestoneSpec {
                    description: "ship".into(),
                    amount: *a,
                })
                .collect(),
        }
    }

    #[test]
    fn create_rejects_bad_terms() {
        let backend = NullStore::new();
        let mut txn = StoreTxn::begin(&backend);
        setup(&mut txn);
        let engine = EscrowEngine::new(EscrowParams::default());
        let now = Timestamp::new(T0);

        let mut terms = new_escrow(&[600, 500]);
        assert!(matches!(
            engine.create_escrow(&mut txn, &addr(2), terms.clone(), now),
            Err(EscrowError::MilestonesExceedTotal { sum: 1_100, total: 1_000 })
        ));
        terms = new_escrow(&[]);
        assert!(matches!(
            engine.create_escrow(&mut txn, &addr(2), terms, now),
            Err(EscrowError::NoMilestones)
        ));
        terms = new_escrow(&[1_000]);
        terms.arbitrator = addr(3);
        assert!(matches!(
            engine.create_escrow(&mut txn, &addr(2), terms, now),
            Err(EscrowError::InvalidParties)
        ));
        terms = new_escrow(&[1_000]);
        terms.arbitrator_fee = 1_000;
        assert!(matches!(
            engine.create_escrow(&mut txn, &addr(2), terms, now),
            Err(EscrowError::ArbitratorFeeTooHigh { .. })
        ));
        terms = new_escrow(&[1_000]);
        terms.deadline = now;
        assert!(matches!(
            engine.create_escrow(&mut txn, &addr(2), terms, now),
            Err(EscrowError::DeadlineInPast(_))
        ));
        assert!(matches!(
            engine.create_escrow(&mut txn, &addr(5), new_escrow(&[1_000]), now),
            Err(EscrowError::Access(_))
        ));
        assert_eq!(engine.create_escrow(&mut txn, &addr(2), new_escrow(&[1_000]), now).unwrap(), 1);
    }

    #[test]
    fn releasing_last_milestone_refunds_unallocated_remainder() {
        let backend = NullStore::new();
        let mut txn = StoreTxn::begin(&backend);
        setup(&mut txn);
        let engine = EscrowEngine::new(EscrowParams::default());
        let now = Timestamp::new(T0);
        let id = engine.create_escrow(&mut txn, &addr(2), new_escrow(&[400, 500]), now).unwrap();
        engine.fund(&mut txn, id, &addr(2), 1_000, now).unwrap();

        engine.complete_milestone(&mut txn, id, 0, &addr(2), now).unwrap();
        let first = engine.release_milestone(&mut txn, id, 0, &addr(2), now).unwrap();
        assert_eq!(first.paid_to(&addr(3)), 400);
        assert_eq!(first.transfers().len(), 1);

        engine.complete_milestone(&mut txn, id, 1, &addr(2), now).unwrap();
        let last = engine.release_milestone(&mut txn, id, 1, &addr(2), now).unwrap();
        assert_eq!(last.paid_to(&addr(3)), 500);
        assert_eq!(last.paid_to(&addr(2)), 100);

        let escrow = EscrowEngine::escrow(&txn, id).unwrap().unwrap();
        assert_eq!(escrow.status, EscrowStatus::Completed);
        assert_eq!(escrow.released_amount, 900);
    }

    #[test]
    fn sub_wallet_permissions_are_scoped() {
        let backend = NullStore::new();
        let mut txn = StoreTxn::begin(&backend);
        setup(&mut txn);
        let engine = EscrowEngine::new(EscrowParams::default());
        let now = Timestamp::new(T0);
        let id = engine.create_escrow(&mut txn, &addr(2), new_escrow(&[1_000]), now).unwrap();
        engine.fund(&mut txn, id, &addr(2), 1_000, now).unwrap();

        let finance = addr(7);
        engine
            .add_sub_wallet(
                &mut txn,
                id,
                &addr(2),
                &finance,
                SubWalletRole::Finance,
                &[Permission::ApproveMilestone, Permission::ApproveMilestone],
                now,
            )
            .unwrap();
        assert_eq!(
            EscrowEngine::escrow(&txn, id).unwrap().unwrap().sub_wallets[0].permissions,
            vec![Permission::ApproveMilestone]
        );
        assert!(matches!(
            engine.add_sub_wallet(&mut txn, id, &addr(2), &finance, SubWalletRole::Finance, &[Permission::ReleaseFunds], now),
            Err(EscrowError::DuplicateSubWallet(_))
        ));
        assert!(matches!(
            engine.add_sub_wallet(&mut txn, id, &addr(2), &addr(4), SubWalletRole::Finance, &[Permission::ReleaseFunds], now),
            Err(EscrowError::InvalidSubWallet(_))
        ));

        engine.complete_milestone(&mut txn, id, 0, &finance, now).unwrap();
        assert!(matches!(
            engine.release_milestone(&mut txn, id, 0, &finance, now),
            Err(EscrowError::Unauthorized(_))
        ));
        assert!(matches!(
            engine.raise_dispute(&mut txn, id, &finance, "late", now),
            Err(EscrowError::Unauthorized(_))
        ));
    }

    #[test]
    fn document_links_are_unique() {
        let backend = NullStore::new();
        let mut txn = StoreTxn::begin(&backend);
        setup(&mut txn);
        let engine = EscrowEngine::new(EscrowParams::default());
        let id = engine
            .create_escrow(&mut txn, &addr(2), new_escrow(&[1_000]), Timestamp::new(T0))
            .unwrap();
        let hash = DocHash::digest(b"bill of lading");
        EscrowEngine::link_document(&mut txn, id, &hash).unwrap();
        assert!(matches!(
            EscrowEngine::link_document(&mut txn, id, &hash),
            Err(EscrowError::DocumentAlreadyLinked(_))
        ));
        assert!(matches!(
            EscrowEngine::link_document(&mut txn, 42, &hash),
            Err(EscrowError::EscrowNotFound(42))
        ));
    }
}
