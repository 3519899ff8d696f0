//! The transactional operation boundary.
//!
//! Every mutating call opens a [`StoreTxn`] over the shared store, runs one
//! engine operation against it, executes the resulting settlement through
//! the token bank, and only then commits. Any failure before the commit
//! drops the transaction, and transfers already made for the operation are
//! reversed, so a failed call leaves no trace.

use tracing::Span;

use tradefin_access::{AccessError, AccessGate, Role};
use tradefin_escrow::{Escrow, EscrowEngine, NewEscrow, Permission, SubWalletRole};
use tradefin_governance::{
    Ballot, GovernanceEngine, Proposal, ProposalCategory, ProposalStatus, RequestStatus,
    TradeFinanceRequest,
};
use tradefin_identity::{IdentityError, IdentityResolver};
use tradefin_pga::{
    DeliveryAgreement, NewApplication, NewDeliveryAgreement, PgaEngine, PgaStatus,
    PoolGuaranteeApplication,
};
use tradefin_registry::{
    DocumentRecord, DocumentRegistry, Invoice, InvoiceLedger, NewDocument, NewInvoice,
};
use tradefin_staking::{Stake, StakeLedger, StakeTotals, StakerAccount};
use tradefin_store::{KvStore, StoreTxn};
use tradefin_types::{
    Address, Amount, Clock, DocHash, ErrorCode, PriceOracle, Settlement, Timestamp, TokenBank,
    Transfer, TransferError,
};

use crate::config::{GenesisConfig, PlatformConfig};
use crate::error::PlatformError;
use crate::tracing_spans::{
    admin_span, document_span, escrow_span, governance_span, invoice_span, pga_span, stake_span,
};

/// The component engines, configured once at startup.
pub struct Engines {
    pub stakes: StakeLedger,
    pub governance: GovernanceEngine,
    pub escrow: EscrowEngine,
    pub pga: PgaEngine,
    pub invoices: InvoiceLedger,
    pub documents: DocumentRegistry,
}

impl Engines {
    pub fn from_config(config: &PlatformConfig) -> Self {
        Self {
            stakes: StakeLedger::new(config.staking.clone()),
            governance: GovernanceEngine::new(config.governance.clone()),
            escrow: EscrowEngine::new(config.escrow.clone()),
            pga: PgaEngine::new(config.pga.clone()),
            invoices: InvoiceLedger::new(config.registry.clone()),
            documents: DocumentRegistry::new(config.registry.clone()),
        }
    }
}

pub struct Platform<S, B, O, C> {
    store: S,
    bank: B,
    oracle: O,
    clock: C,
    engines: Engines,
}

impl<B, O, C> Platform<Box<dyn KvStore>, B, O, C>
where
    B: TokenBank,
    O: PriceOracle,
    C: Clock,
{
    /// Open the configured storage backend and apply genesis if the store
    /// is empty.
    pub fn open(config: &PlatformConfig, bank: B, oracle: O, clock: C) -> Result<Self, PlatformError> {
        let store = config.storage.open()?;
        let mut platform = Self::new(store, bank, oracle, clock, config);
        platform.apply_genesis(&config.genesis)?;
        Ok(platform)
    }
}

impl<S, B, O, C> Platform<S, B, O, C>
where
    S: KvStore,
    B: TokenBank,
    O: PriceOracle,
    C: Clock,
{
    pub fn new(store: S, bank: B, oracle: O, clock: C, config: &PlatformConfig) -> Self {
        Self {
            store,
            bank,
            oracle,
            clock,
            engines: Engines::from_config(config),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn engines(&self) -> &Engines {
        &self.engines
    }

    // ── Operation boundary ─────────────────────────────────────────────

    fn transact<T, E, F>(&mut self, span: Span, op: F) -> Result<T, PlatformError>
    where
        F: FnOnce(&Engines, &mut StoreTxn<'_>, &O, Timestamp) -> Result<(T, Settlement), E>,
        PlatformError: From<E>,
    {
        let _entered = span.enter();
        let now = self.clock.now();
        let mut txn = StoreTxn::begin(&self.store);
        let (value, settlement) = match op(&self.engines, &mut txn, &self.oracle, now) {
            Ok(done) => done,
            Err(e) => {
                let err = PlatformError::from(e);
                tracing::debug!(code = err.code(), kind = %err.kind(), error = %err, "operation rejected");
                return Err(err);
            }
        };
        if let Err(e) = execute_settlement(&mut self.bank, &settlement) {
            tracing::warn!(error = %e, "settlement failed, operation rolled back");
            return Err(PlatformError::TransferFailed(e));
        }
        let writes = txn.pending_writes();
        if let Err(e) = txn.commit() {
            let legs: Vec<&Transfer> = settlement.transfers().iter().collect();
            compensate(&mut self.bank, &legs);
            tracing::error!(error = %e, "commit failed, transfers reversed");
            return Err(PlatformError::Store(e));
        }
        tracing::trace!(writes, transfers = settlement.transfers().len(), "operation committed");
        Ok(value)
    }

    /// An operation that moves no funds.
    fn apply<T, E, F>(&mut self, span: Span, op: F) -> Result<T, PlatformError>
    where
        F: FnOnce(&Engines, &mut StoreTxn<'_>, Timestamp) -> Result<T, E>,
        PlatformError: From<E>,
    {
        self.transact(span, |engines, txn, _, now| {
            op(engines, txn, now).map(|value| (value, Settlement::new()))
        })
    }

    /// An operation whose only result is its settlement.
    fn settle<E, F>(&mut self, span: Span, op: F) -> Result<Settlement, PlatformError>
    where
        F: FnOnce(&Engines, &mut StoreTxn<'_>, &O, Timestamp) -> Result<Settlement, E>,
        PlatformError: From<E>,
    {
        self.transact(span, |engines, txn, oracle, now| {
            op(engines, txn, oracle, now).map(|s| (s.clone(), s))
        })
    }

    fn read<T, E, F>(&self, op: F) -> Result<T, PlatformError>
    where
        F: FnOnce(&StoreTxn<'_>) -> Result<T, E>,
        PlatformError: From<E>,
    {
        let txn = StoreTxn::begin(&self.store);
        Ok(op(&txn)?)
    }

    // ── Administration ─────────────────────────────────────────────────

    pub fn initialize(&mut self, owner: &Address) -> Result<(), PlatformError> {
        self.apply(admin_span("initialize", owner), |_, txn, _| {
            AccessGate::initialize(txn, owner)
        })
    }

    /// Initialise the gate and allow-lists from `genesis` unless the store
    /// already has an owner. Returns whether anything was written.
    pub fn apply_genesis(&mut self, genesis: &GenesisConfig) -> Result<bool, PlatformError> {
        let Some(owner) = genesis.owner_address()? else {
            return Ok(false);
        };
        let tokens = genesis.token_addresses()?;
        self.apply(admin_span("genesis", &owner), |_, txn, _| {
            if AccessGate::is_initialized(txn)? {
                return Ok(false);
            }
            AccessGate::initialize(txn, &owner)?;
            for code in &genesis.countries {
                AccessGate::add_country(txn, &owner, code)?;
            }
            for code in &genesis.currencies {
                AccessGate::add_currency(txn, &owner, code)?;
            }
            for token in &tokens {
                AccessGate::add_token(txn, &owner, token)?;
            }
            tracing::info!(%owner, "genesis applied");
            Ok::<_, AccessError>(true)
        })
    }

    pub fn set_paused(&mut self, caller: &Address, paused: bool) -> Result<(), PlatformError> {
        self.admin(caller, "set_paused", |txn, owner| AccessGate::set_paused(txn, owner, paused))
    }

    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: &Address) -> Result<(), PlatformError> {
        self.admin(caller, "transfer_ownership", |txn, owner| {
            AccessGate::transfer_ownership(txn, owner, new_owner)
        })
    }

    pub fn add_country(&mut self, caller: &Address, code: &str) -> Result<(), PlatformError> {
        self.admin(caller, "add_country", |txn, owner| AccessGate::add_country(txn, owner, code))
    }

    pub fn remove_country(&mut self, caller: &Address, code: &str) -> Result<(), PlatformError> {
        self.admin(caller, "remove_country", |txn, owner| AccessGate::remove_country(txn, owner, code))
    }

    pub fn add_currency(&mut self, caller: &Address, code: &str) -> Result<(), PlatformError> {
        self.admin(caller, "add_currency", |txn, owner| AccessGate::add_currency(txn, owner, code))
    }

    pub fn remove_currency(&mut self, caller: &Address, code: &str) -> Result<(), PlatformError> {
        self.admin(caller, "remove_currency", |txn, owner| AccessGate::remove_currency(txn, owner, code))
    }

    pub fn add_token(&mut self, caller: &Address, token: &Address) -> Result<(), PlatformError> {
        self.admin(caller, "add_token", |txn, owner| AccessGate::add_token(txn, owner, token))
    }

    pub fn remove_token(&mut self, caller: &Address, token: &Address) -> Result<(), PlatformError> {
        self.admin(caller, "remove_token", |txn, owner| AccessGate::remove_token(txn, owner, token))
    }

    pub fn grant_role(
        &mut self,
        caller: &Address,
        user: &Address,
        role: Role,
        country: Option<&str>,
    ) -> Result<(), PlatformError> {
        let now = self.clock.now();
        self.admin(caller, "grant_role", |txn, owner| {
            AccessGate::grant_role(txn, owner, user, role, country, now)
        })
    }

    pub fn revoke_role(&mut self, caller: &Address, user: &Address, role: Role) -> Result<(), PlatformError> {
        self.admin(caller, "revoke_role", |txn, owner| AccessGate::revoke_role(txn, owner, user, role))
    }

    /// Owner administration. Not gated on the pause flag.
    fn admin<F>(&mut self, caller: &Address, action: &'static str, op: F) -> Result<(), PlatformError>
    where
        F: FnOnce(&mut StoreTxn<'_>, &Address) -> Result<(), AccessError>,
    {
        self.apply(admin_span(action, caller), |_, txn, _| {
            let caller = IdentityResolver::resolve(txn, caller)?;
            op(txn, &caller)?;
            Ok::<_, PlatformError>(())
        })
    }

    /// Ask for the caller's address to act for `primary`. The caller is the
    /// secondary credential and must not hold ledger state of its own.
    pub fn request_identity_link(&mut self, caller: &Address, primary: &Address) -> Result<(), PlatformError> {
        self.apply(admin_span("request_identity_link", caller), |_, txn, _| {
            AccessGate::ensure_not_paused(txn)?;
            ensure_unencumbered(txn, caller)?;
            IdentityResolver::request_link(txn, caller, primary)?;
            Ok::<_, PlatformError>(())
        })
    }

    /// Link a secondary credential to a primary identity. The primary
    /// confirms a link the secondary requested; the owner may link
    /// directly. Either way the secondary must hold no ledger state.
    pub fn link_identity(
        &mut self,
        caller: &Address,
        secondary: &Address,
        primary: &Address,
    ) -> Result<(), PlatformError> {
        self.apply(admin_span("link_identity", caller), |_, txn, _| {
            AccessGate::ensure_not_paused(txn)?;
            let who = IdentityResolver::resolve(txn, caller)?;
            ensure_unencumbered(txn, secondary)?;
            if AccessGate::is_owner(txn, &who)? {
                IdentityResolver::link(txn, secondary, primary)?;
            } else if who == *primary {
                IdentityResolver::confirm_link(txn, secondary, primary)?;
            } else {
                return Err(PlatformError::Access(AccessError::NotOwner(who)));
            }
            Ok::<_, PlatformError>(())
        })
    }

    // ── Staking ────────────────────────────────────────────────────────

    pub fn stake(
        &mut self,
        caller: &Address,
        token: &Address,
        amount: Amount,
        lock_deadline: Timestamp,
    ) -> Result<Settlement, PlatformError> {
        self.settle(stake_span("stake", caller, token), |e, txn, oracle, now| {
            e.stakes.stake(txn, oracle, caller, token, amount, lock_deadline, now)
        })
    }

    pub fn stake_as_financier(
        &mut self,
        caller: &Address,
        token: &Address,
        amount: Amount,
        lock_deadline: Timestamp,
    ) -> Result<Settlement, PlatformError> {
        self.settle(stake_span("stake_as_financier", caller, token), |e, txn, oracle, now| {
            e.stakes
                .stake_as_financier(txn, oracle, caller, token, amount, lock_deadline, now)
        })
    }

    pub fn unstake(&mut self, caller: &Address, token: &Address, amount: Amount) -> Result<Settlement, PlatformError> {
        self.settle(stake_span("unstake", caller, token), |e, txn, _, now| {
            e.stakes.unstake(txn, caller, token, amount, now)
        })
    }

    pub fn emergency_withdraw(&mut self, caller: &Address, token: &Address) -> Result<Settlement, PlatformError> {
        self.settle(stake_span("emergency_withdraw", caller, token), |e, txn, _, now| {
            e.stakes.emergency_withdraw(txn, caller, token, now)
        })
    }

    pub fn claim_rewards(&mut self, caller: &Address, token: &Address) -> Result<Settlement, PlatformError> {
        self.settle(stake_span("claim_rewards", caller, token), |e, txn, _, now| {
            e.stakes.claim_rewards(txn, caller, token, now)
        })
    }

    pub fn request_financier_revocation(&mut self, caller: &Address, token: &Address) -> Result<(), PlatformError> {
        self.apply(stake_span("request_revocation", caller, token), |e, txn, now| {
            e.stakes.request_financier_revocation(txn, caller, token, now)
        })
    }

    pub fn complete_financier_revocation(&mut self, caller: &Address, token: &Address) -> Result<(), PlatformError> {
        self.apply(stake_span("complete_revocation", caller, token), |e, txn, now| {
            e.stakes.complete_financier_revocation(txn, caller, token, now)
        })
    }

    pub fn refresh_voting_power(&mut self, user: &Address) -> Result<StakerAccount, PlatformError> {
        self.apply(stake_span("refresh_voting_power", user, &Address::ZERO), |e, txn, now| {
            e.stakes.refresh_voting_power(txn, user, now)
        })
    }

    // ── Governance ─────────────────────────────────────────────────────

    pub fn create_proposal(
        &mut self,
        caller: &Address,
        category: ProposalCategory,
        title: &str,
        description: &str,
        requires_multisig: bool,
    ) -> Result<u64, PlatformError> {
        self.apply(governance_span("create_proposal", 0), |e, txn, now| {
            e.governance.create_proposal(
                txn,
                &e.stakes,
                caller,
                category,
                title,
                description,
                requires_multisig,
                now,
            )
        })
    }

    pub fn vote(&mut self, caller: &Address, proposal_id: u64, support: bool) -> Result<Amount, PlatformError> {
        self.apply(governance_span("vote", proposal_id), |e, txn, now| {
            e.governance.vote(txn, &e.stakes, proposal_id, caller, support, now)
        })
    }

    pub fn finalize_proposal(&mut self, proposal_id: u64) -> Result<ProposalStatus, PlatformError> {
        self.apply(governance_span("finalize", proposal_id), |e, txn, now| {
            e.governance.finalize(txn, proposal_id, now)
        })
    }

    pub fn cancel_proposal(&mut self, caller: &Address, proposal_id: u64) -> Result<(), PlatformError> {
        self.apply(governance_span("cancel", proposal_id), |e, txn, now| {
            e.governance.cancel(txn, proposal_id, caller, now)
        })
    }

    pub fn approve_execution(&mut self, caller: &Address, proposal_id: u64) -> Result<u32, PlatformError> {
        self.apply(governance_span("approve_execution", proposal_id), |e, txn, now| {
            e.governance.approve_execution(txn, proposal_id, caller, now)
        })
    }

    pub fn execute_proposal(&mut self, caller: &Address, proposal_id: u64) -> Result<(), PlatformError> {
        self.apply(governance_span("execute", proposal_id), |e, txn, now| {
            e.governance.execute(txn, proposal_id, caller, now)
        })
    }

    pub fn submit_request(
        &mut self,
        caller: &Address,
        token: &Address,
        amount: Amount,
        purpose: &str,
    ) -> Result<u64, PlatformError> {
        self.apply(governance_span("submit_request", 0), |e, txn, now| {
            e.governance.submit_request(txn, &e.stakes, caller, token, amount, purpose, now)
        })
    }

    pub fn vote_request(&mut self, caller: &Address, request_id: u64, support: bool) -> Result<Amount, PlatformError> {
        self.apply(governance_span("vote_request", request_id), |e, txn, now| {
            e.governance
                .vote_request(txn, &e.stakes, request_id, caller, support, now)
        })
    }

    pub fn finalize_request(&mut self, request_id: u64) -> Result<RequestStatus, PlatformError> {
        self.apply(governance_span("finalize_request", request_id), |e, txn, now| {
            e.governance.finalize_request(txn, request_id, now)
        })
    }

    pub fn disburse_request(&mut self, caller: &Address, request_id: u64) -> Result<Settlement, PlatformError> {
        self.settle(governance_span("disburse_request", request_id), |e, txn, _, now| {
            e.governance.disburse_request(txn, request_id, caller, now)
        })
    }

    // ── Escrow ─────────────────────────────────────────────────────────

    pub fn create_escrow(&mut self, caller: &Address, terms: NewEscrow) -> Result<u64, PlatformError> {
        self.apply(escrow_span("create", 0), |e, txn, now| {
            e.escrow.create_escrow(txn, caller, terms, now)
        })
    }

    pub fn fund_escrow(&mut self, caller: &Address, id: u64, amount: Amount) -> Result<Settlement, PlatformError> {
        self.settle(escrow_span("fund", id), |e, txn, _, now| {
            e.escrow.fund(txn, id, caller, amount, now)
        })
    }

    pub fn begin_work(&mut self, caller: &Address, id: u64) -> Result<(), PlatformError> {
        self.apply(escrow_span("begin_work", id), |e, txn, _| e.escrow.begin_work(txn, id, caller))
    }

    pub fn complete_milestone(&mut self, caller: &Address, id: u64, index: usize) -> Result<(), PlatformError> {
        self.apply(escrow_span("complete_milestone", id), |e, txn, now| {
            e.escrow.complete_milestone(txn, id, index, caller, now)
        })
    }

    pub fn release_milestone(&mut self, caller: &Address, id: u64, index: usize) -> Result<Settlement, PlatformError> {
        self.settle(escrow_span("release_milestone", id), |e, txn, _, now| {
            e.escrow.release_milestone(txn, id, index, caller, now)
        })
    }

    pub fn raise_escrow_dispute(&mut self, caller: &Address, id: u64, reason: &str) -> Result<(), PlatformError> {
        self.apply(escrow_span("raise_dispute", id), |e, txn, now| {
            e.escrow.raise_dispute(txn, id, caller, reason, now)
        })
    }

    pub fn escalate_dispute(&mut self, caller: &Address, id: u64) -> Result<(), PlatformError> {
        self.apply(escrow_span("escalate_dispute", id), |e, txn, _| {
            e.escrow.escalate_dispute(txn, id, caller)
        })
    }

    pub fn resolve_dispute(
        &mut self,
        caller: &Address,
        id: u64,
        award_to_importer: bool,
    ) -> Result<Settlement, PlatformError> {
        self.settle(escrow_span("resolve_dispute", id), |e, txn, _, now| {
            e.escrow.resolve_dispute(txn, id, caller, award_to_importer, now)
        })
    }

    pub fn refund_expired_escrow(&mut self, caller: &Address, id: u64) -> Result<Settlement, PlatformError> {
        self.settle(escrow_span("refund_expired", id), |e, txn, _, now| {
            e.escrow.refund_expired(txn, id, caller, now)
        })
    }

    pub fn add_sub_wallet(
        &mut self,
        caller: &Address,
        id: u64,
        wallet: &Address,
        role: SubWalletRole,
        permissions: &[Permission],
    ) -> Result<(), PlatformError> {
        self.apply(escrow_span("add_sub_wallet", id), |e, txn, now| {
            e.escrow
                .add_sub_wallet(txn, id, caller, wallet, role, permissions, now)
        })
    }

    // ── Pool guarantees ────────────────────────────────────────────────

    pub fn create_application(&mut self, caller: &Address, terms: NewApplication) -> Result<(), PlatformError> {
        let span = pga_span("create", &terms.id);
        self.apply(span, |e, txn, now| e.pga.create_application(txn, &e.stakes, caller, terms, now))
    }

    pub fn vote_guarantee(&mut self, caller: &Address, pga_id: &str, support: bool) -> Result<PgaStatus, PlatformError> {
        self.apply(pga_span("vote", pga_id), |e, txn, now| {
            e.pga.vote_guarantee(txn, &e.stakes, pga_id, caller, support, now)
        })
    }

    pub fn seller_decision(&mut self, caller: &Address, pga_id: &str, approve: bool) -> Result<PgaStatus, PlatformError> {
        self.apply(pga_span("seller_decision", pga_id), |e, txn, now| {
            e.pga.seller_decision(txn, pga_id, caller, approve, now)
        })
    }

    pub fn pay_collateral(&mut self, caller: &Address, pga_id: &str, amount: Amount) -> Result<Settlement, PlatformError> {
        self.settle(pga_span("pay_collateral", pga_id), |e, txn, _, now| {
            e.pga.pay_collateral(txn, pga_id, caller, amount, now)
        })
    }

    pub fn report_shipment(&mut self, caller: &Address, pga_id: &str) -> Result<(), PlatformError> {
        self.apply(pga_span("report_shipment", pga_id), |e, txn, now| {
            e.pga.report_shipment(txn, pga_id, caller, now)
        })
    }

    pub fn pay_balance(&mut self, caller: &Address, pga_id: &str, amount: Amount) -> Result<Settlement, PlatformError> {
        self.settle(pga_span("pay_balance", pga_id), |e, txn, _, now| {
            e.pga.pay_balance(txn, pga_id, caller, amount, now)
        })
    }

    pub fn issue_certificate(&mut self, caller: &Address, pga_id: &str) -> Result<(), PlatformError> {
        self.apply(pga_span("issue_certificate", pga_id), |e, txn, now| {
            e.pga.issue_certificate(txn, pga_id, caller, now)
        })
    }

    pub fn create_delivery_agreement(
        &mut self,
        caller: &Address,
        pga_id: &str,
        agreement: NewDeliveryAgreement,
    ) -> Result<(), PlatformError> {
        self.apply(pga_span("create_delivery_agreement", pga_id), |e, txn, now| {
            e.pga.create_delivery_agreement(txn, pga_id, caller, agreement, now)
        })
    }

    pub fn submit_delivery_proof(
        &mut self,
        caller: &Address,
        agreement_id: &str,
        proof_uri: &str,
    ) -> Result<(), PlatformError> {
        self.apply(pga_span("submit_delivery_proof", agreement_id), |e, txn, _| {
            e.pga.submit_delivery_proof(txn, agreement_id, caller, proof_uri)
        })
    }

    pub fn buyer_consent(&mut self, caller: &Address, agreement_id: &str) -> Result<Settlement, PlatformError> {
        self.settle(pga_span("buyer_consent", agreement_id), |e, txn, _, now| {
            e.pga.buyer_consent(txn, agreement_id, caller, now)
        })
    }

    pub fn raise_pga_dispute(&mut self, caller: &Address, pga_id: &str, reason: &str) -> Result<(), PlatformError> {
        self.apply(pga_span("raise_dispute", pga_id), |e, txn, now| {
            e.pga.raise_dispute(txn, pga_id, caller, reason, now)
        })
    }

    pub fn settle_pga_dispute(&mut self, caller: &Address, pga_id: &str, pay_seller: bool) -> Result<Settlement, PlatformError> {
        self.settle(pga_span("settle_dispute", pga_id), |e, txn, _, _| {
            e.pga.settle_dispute(txn, pga_id, caller, pay_seller)
        })
    }

    pub fn expire_application(&mut self, pga_id: &str) -> Result<Settlement, PlatformError> {
        self.settle(pga_span("expire", pga_id), |e, txn, _, now| e.pga.expire(txn, pga_id, now))
    }

    pub fn attach_pga_document(&mut self, caller: &Address, pga_id: &str, hash: &DocHash) -> Result<(), PlatformError> {
        self.apply(pga_span("attach_document", pga_id), |e, txn, _| {
            e.pga.attach_document(txn, pga_id, caller, hash)
        })
    }

    // ── Invoices and documents ─────────────────────────────────────────

    pub fn create_invoice(&mut self, caller: &Address, invoice: NewInvoice) -> Result<u64, PlatformError> {
        self.apply(invoice_span("create", 0), |e, txn, now| e.invoices.create(txn, caller, invoice, now))
    }

    pub fn send_invoice(&mut self, caller: &Address, id: u64) -> Result<(), PlatformError> {
        self.apply(invoice_span("send", id), |e, txn, _| e.invoices.send(txn, id, caller))
    }

    pub fn mark_invoice_viewed(&mut self, caller: &Address, id: u64) -> Result<bool, PlatformError> {
        self.apply(invoice_span("mark_viewed", id), |e, txn, _| e.invoices.mark_viewed(txn, id, caller))
    }

    pub fn mark_invoice_overdue(&mut self, id: u64) -> Result<(), PlatformError> {
        self.apply(invoice_span("mark_overdue", id), |e, txn, now| e.invoices.mark_overdue(txn, id, now))
    }

    pub fn pay_invoice(&mut self, caller: &Address, id: u64, amount: Amount) -> Result<Settlement, PlatformError> {
        self.settle(invoice_span("pay", id), |e, txn, _, now| e.invoices.pay(txn, id, caller, amount, now))
    }

    pub fn cancel_invoice(&mut self, caller: &Address, id: u64) -> Result<(), PlatformError> {
        self.apply(invoice_span("cancel", id), |e, txn, _| e.invoices.cancel(txn, id, caller))
    }

    pub fn register_document(&mut self, caller: &Address, document: NewDocument) -> Result<(), PlatformError> {
        let span = document_span("register", &document.hash);
        self.apply(span, |e, txn, now| e.documents.register(txn, caller, document, now))
    }

    pub fn verify_document(&mut self, caller: &Address, hash: &DocHash) -> Result<bool, PlatformError> {
        self.apply(document_span("verify", hash), |e, txn, now| e.documents.verify(txn, hash, caller, now))
    }

    pub fn link_document_to_escrow(&mut self, caller: &Address, hash: &DocHash, escrow_id: u64) -> Result<(), PlatformError> {
        self.apply(document_span("link_to_escrow", hash), |e, txn, _| {
            e.documents.link_to_escrow(txn, hash, escrow_id, caller)
        })
    }

    pub fn link_document_to_invoice(&mut self, caller: &Address, hash: &DocHash, invoice_id: u64) -> Result<(), PlatformError> {
        self.apply(document_span("link_to_invoice", hash), |e, txn, _| {
            e.documents.link_to_invoice(txn, hash, invoice_id, caller)
        })
    }

    // ── Queries ────────────────────────────────────────────────────────

    pub fn owner(&self) -> Result<Address, PlatformError> {
        self.read(|txn| AccessGate::owner(txn))
    }

    pub fn is_paused(&self) -> Result<bool, PlatformError> {
        self.read(|txn| AccessGate::is_paused(txn))
    }

    pub fn resolve(&self, addr: &Address) -> Result<Address, PlatformError> {
        self.read(|txn| IdentityResolver::resolve(txn, addr))
    }

    pub fn has_role(&self, user: &Address, role: Role) -> Result<bool, PlatformError> {
        self.read(|txn| AccessGate::has_role(txn, user, role))
    }

    pub fn stake_of(&self, user: &Address, token: &Address) -> Result<Option<Stake>, PlatformError> {
        self.read(|txn| StakeLedger::stake_of(txn, user, token))
    }

    pub fn staker_account(&self, user: &Address) -> Result<StakerAccount, PlatformError> {
        self.read(|txn| StakeLedger::account(txn, user))
    }

    pub fn stake_totals(&self) -> Result<StakeTotals, PlatformError> {
        self.read(|txn| StakeLedger::totals(txn))
    }

    pub fn pending_rewards(&self, user: &Address, token: &Address) -> Result<Amount, PlatformError> {
        let now = self.clock.now();
        self.read(|txn| self.engines.stakes.pending_rewards(txn, user, token, now))
    }

    pub fn proposal(&self, id: u64) -> Result<Option<Proposal>, PlatformError> {
        self.read(|txn| GovernanceEngine::proposal(txn, id))
    }

    pub fn ballots(&self, id: u64) -> Result<Vec<Ballot>, PlatformError> {
        self.read(|txn| GovernanceEngine::ballots(txn, id))
    }

    pub fn request(&self, id: u64) -> Result<Option<TradeFinanceRequest>, PlatformError> {
        self.read(|txn| GovernanceEngine::request(txn, id))
    }

    pub fn escrow(&self, id: u64) -> Result<Option<Escrow>, PlatformError> {
        self.read(|txn| EscrowEngine::escrow(txn, id))
    }

    pub fn application(&self, pga_id: &str) -> Result<Option<PoolGuaranteeApplication>, PlatformError> {
        self.read(|txn| PgaEngine::application(txn, pga_id))
    }

    pub fn delivery_agreement(&self, agreement_id: &str) -> Result<Option<DeliveryAgreement>, PlatformError> {
        self.read(|txn| PgaEngine::delivery_agreement(txn, agreement_id))
    }

    pub fn invoice(&self, id: u64) -> Result<Option<Invoice>, PlatformError> {
        self.read(|txn| InvoiceLedger::invoice(txn, id))
    }

    pub fn invoice_by_number(&self, number: &str) -> Result<Option<Invoice>, PlatformError> {
        self.read(|txn| InvoiceLedger::invoice_by_number(txn, number))
    }

    pub fn document(&self, hash: &DocHash) -> Result<Option<DocumentRecord>, PlatformError> {
        self.read(|txn| DocumentRegistry::document(txn, hash))
    }
}

/// Refuse to turn `addr` into a secondary credential while records keyed
/// under it exist: once linked it resolves elsewhere and they strand.
fn ensure_unencumbered(txn: &StoreTxn<'_>, addr: &Address) -> Result<(), PlatformError> {
    let staked = StakeLedger::stakes_of(txn, addr)?
        .iter()
        .any(|stake| stake.active || stake.pending_rewards > 0);
    let in_use = staked
        || !AccessGate::roles_of(txn, addr)?.is_empty()
        || EscrowEngine::involves(txn, addr)?
        || InvoiceLedger::involves(txn, addr)?
        || PgaEngine::involves(txn, addr)?;
    if in_use {
        return Err(IdentityError::CredentialInUse(*addr).into());
    }
    Ok(())
}

fn execute_leg<B: TokenBank>(bank: &mut B, leg: &Transfer) -> Result<(), TransferError> {
    match leg {
        Transfer::In { token, from, amount } => bank.transfer_in(token, from, *amount),
        Transfer::Out { token, to, amount } => bank.transfer_out(token, to, *amount),
    }
}

/// Run every leg in order. On failure the legs already executed are
/// reversed before the error is returned.
fn execute_settlement<B: TokenBank>(bank: &mut B, settlement: &Settlement) -> Result<(), TransferError> {
    let mut done: Vec<&Transfer> = Vec::with_capacity(settlement.transfers().len());
    for leg in settlement.transfers() {
        if let Err(e) = execute_leg(bank, leg) {
            compensate(bank, &done);
            return Err(e);
        }
        done.push(leg);
    }
    Ok(())
}

fn compensate<B: TokenBank>(bank: &mut B, legs: &[&Transfer]) {
    for leg in legs.iter().rev() {
        if let Err(e) = execute_leg(bank, &leg.reversed()) {
            // Custody and the ledger now disagree; needs manual reconciliation.
            tracing::error!(error = %e, leg = ?leg, "failed to reverse transfer");
        }
    }
}
