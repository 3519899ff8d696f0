//! Pool guarantee state machine.

use tradefin_access::lists::normalize_currency;
use tradefin_access::{AccessGate, AccessStore, Role};
use tradefin_identity::{IdentityResolver, IdentityStore};
use tradefin_staking::{StakeLedger, StakeStore};
use tradefin_types::{apply_bps, Address, Amount, DocHash, Settlement, Timestamp, BPS_DENOMINATOR};

use crate::error::PgaError;
use crate::model::{
    DeliveryAgreement, GuaranteeBallot, NewApplication, NewDeliveryAgreement, PgaStatus,
    PoolGuaranteeApplication,
};
use crate::params::PgaParams;
use crate::store::PgaStore;

/// Longest accepted application or agreement identifier, in bytes.
pub const MAX_ID_LEN: usize = 64;

pub struct PgaEngine {
    params: PgaParams,
}

impl PgaEngine {
    pub fn new(params: PgaParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PgaParams {
        &self.params
    }

    /// Open an application with the caller as buyer. Every staker is
    /// recomputed and the financier power at this instant becomes the
    /// voting base.
    pub fn create_application<S>(
        &self,
        store: &mut S,
        stakes: &StakeLedger,
        caller: &Address,
        new: NewApplication,
        now: Timestamp,
    ) -> Result<(), PgaError>
    where
        S: PgaStore + StakeStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let buyer = IdentityResolver::resolve(store, caller)?;
        let seller = IdentityResolver::resolve(store, &new.seller)?;
        check_id(&new.id)?;
        if store.application(&new.id)?.is_some() {
            return Err(PgaError::DuplicateApplication(new.id));
        }
        if buyer.is_zero() || seller.is_zero() || buyer == seller {
            return Err(PgaError::InvalidParties);
        }
        AccessGate::ensure_verified(store, &buyer)?;
        AccessGate::ensure_verified(store, &seller)?;
        AccessGate::ensure_token_supported(store, &new.token)?;
        AccessGate::ensure_currency_supported(store, &new.currency)?;
        let currency = normalize_currency(&new.currency)?;

        if new.collateral_amount == 0 || new.collateral_amount >= new.trade_value {
            return Err(PgaError::InvalidCollateral {
                collateral: new.collateral_amount,
                trade_value: new.trade_value,
            });
        }
        if new.guarantee_amount == 0 || new.guarantee_amount > new.trade_value {
            return Err(PgaError::InvalidGuarantee {
                guarantee: new.guarantee_amount,
                trade_value: new.trade_value,
            });
        }
        if new.duration < self.params.min_duration {
            return Err(PgaError::DurationTooShort {
                min: self.params.min_duration,
            });
        }
        self.check_text(&new.metadata)?;
        let eligible = stakes.recompute_all(store, now)?.total_financier_voting_power;
        if eligible == 0 {
            return Err(PgaError::NoEligibleFinanciers);
        }
        let issuance_fee =
            apply_bps(new.guarantee_amount, self.params.issuance_fee_bps).ok_or(PgaError::Overflow)?;

        let app = PoolGuaranteeApplication {
            id: new.id,
            buyer,
            seller,
            token: new.token,
            currency,
            trade_value: new.trade_value,
            guarantee_amount: new.guarantee_amount,
            collateral_amount: new.collateral_amount,
            issuance_fee,
            duration: new.duration,
            created_at: now,
            voting_deadline: now.plus(self.params.voting_period),
            eligible_power: eligible,
            votes_for: 0,
            votes_against: 0,
            status: PgaStatus::Created,
            collateral_paid: false,
            issuance_fee_paid: false,
            balance_payment_paid: false,
            goods_shipped: false,
            seller_has_voted: false,
            logistic_partner: None,
            shipped_at: None,
            certificate_issued_at: None,
            delivery_agreement_id: None,
            completed_at: None,
            custody: 0,
            dispute_reason: None,
            dispute_settled: false,
            metadata: new.metadata,
            documents: Vec::new(),
        };
        store.put_application(&app)?;
        tracing::info!(id = %app.id, %buyer, %seller, trade_value = app.trade_value, "guarantee application created");
        Ok(())
    }

    /// A financier backs or opposes the guarantee. The outcome is decided
    /// as soon as either side can no longer be overturned.
    pub fn vote_guarantee<S>(
        &self,
        store: &mut S,
        stakes: &StakeLedger,
        pga_id: &str,
        caller: &Address,
        support: bool,
        now: Timestamp,
    ) -> Result<PgaStatus, PgaError>
    where
        S: PgaStore + StakeStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let financier = IdentityResolver::resolve(store, caller)?;
        let mut app = load_live(store, pga_id, now)?;
        let target = if support {
            PgaStatus::GuaranteeApproved
        } else {
            PgaStatus::Rejected
        };
        expect_status(&app, PgaStatus::Created, target)?;
        let account = stakes.recompute(store, &financier, now)?;
        if !account.is_financier {
            return Err(PgaError::NotFinancier(financier));
        }
        if store.guarantee_ballot(pga_id, &financier)?.is_some() {
            return Err(PgaError::AlreadyVoted(financier));
        }
        let power = stakes
            .power_at(store, &financier, app.created_at)?
            .financier_voting_power;
        if power == 0 {
            return Err(PgaError::NoVotingPower(financier));
        }

        let tally = if support {
            &mut app.votes_for
        } else {
            &mut app.votes_against
        };
        *tally = tally.checked_add(power).ok_or(PgaError::Overflow)?;
        store.put_guarantee_ballot(
            pga_id,
            &GuaranteeBallot {
                financier,
                support,
                power,
                cast_at: now,
            },
        )?;

        let approval = u128::from(self.params.approval_bps);
        let for_scaled = app.votes_for.checked_mul(BPS_DENOMINATOR).ok_or(PgaError::Overflow)?;
        let against_scaled = app
            .votes_against
            .checked_mul(BPS_DENOMINATOR)
            .ok_or(PgaError::Overflow)?;
        let approve_line = approval
            .checked_mul(app.eligible_power)
            .ok_or(PgaError::Overflow)?;
        let reject_line = BPS_DENOMINATOR
            .saturating_sub(approval)
            .checked_mul(app.eligible_power)
            .ok_or(PgaError::Overflow)?;
        if for_scaled >= approve_line {
            app.status = PgaStatus::GuaranteeApproved;
        } else if against_scaled > reject_line {
            app.status = PgaStatus::Rejected;
        }
        store.put_application(&app)?;
        tracing::info!(id = %pga_id, %financier, support, power, status = %app.status, "guarantee vote cast");
        Ok(app.status)
    }

    pub fn seller_decision<S>(
        &self,
        store: &mut S,
        pga_id: &str,
        caller: &Address,
        approve: bool,
        now: Timestamp,
    ) -> Result<PgaStatus, PgaError>
    where
        S: PgaStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let who = IdentityResolver::resolve(store, caller)?;
        let mut app = load_live(store, pga_id, now)?;
        if who != app.seller {
            return Err(PgaError::Unauthorized(who));
        }
        if app.seller_has_voted {
            return Err(PgaError::SellerAlreadyDecided);
        }
        let target = if approve {
            PgaStatus::SellerApproved
        } else {
            PgaStatus::Rejected
        };
        expect_status(&app, PgaStatus::GuaranteeApproved, target)?;
        app.seller_has_voted = true;
        app.status = target;
        store.put_application(&app)?;
        tracing::info!(id = %pga_id, approve, "seller decided");
        Ok(target)
    }

    /// Buyer deposits the collateral plus the issuance fee.
    pub fn pay_collateral<S>(
        &self,
        store: &mut S,
        pga_id: &str,
        caller: &Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<Settlement, PgaError>
    where
        S: PgaStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let who = IdentityResolver::resolve(store, caller)?;
        let mut app = load_live(store, pga_id, now)?;
        if who != app.buyer {
            return Err(PgaError::Unauthorized(who));
        }
        expect_status(&app, PgaStatus::SellerApproved, PgaStatus::CollateralPaid)?;
        let expected = app
            .collateral_amount
            .checked_add(app.issuance_fee)
            .ok_or(PgaError::Overflow)?;
        if amount != expected {
            return Err(PgaError::AmountMismatch { expected, got: amount });
        }
        app.collateral_paid = true;
        app.issuance_fee_paid = true;
        app.custody = app.collateral_amount;
        app.status = PgaStatus::CollateralPaid;
        store.put_application(&app)?;
        tracing::info!(id = %pga_id, collateral = app.collateral_amount, fee = app.issuance_fee, "collateral paid");
        Ok(Settlement::new().pull(app.token, *caller, amount))
    }

    pub fn report_shipment<S>(
        &self,
        store: &mut S,
        pga_id: &str,
        caller: &Address,
        now: Timestamp,
    ) -> Result<(), PgaError>
    where
        S: PgaStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let partner = IdentityResolver::resolve(store, caller)?;
        if !AccessGate::has_role(store, &partner, Role::LogisticsPartner)? {
            return Err(PgaError::Unauthorized(partner));
        }
        let mut app = load_live(store, pga_id, now)?;
        expect_status(&app, PgaStatus::CollateralPaid, PgaStatus::GoodsShipped)?;
        app.goods_shipped = true;
        app.logistic_partner = Some(partner);
        app.shipped_at = Some(now);
        app.status = PgaStatus::GoodsShipped;
        store.put_application(&app)?;
        tracing::info!(id = %pga_id, %partner, "goods shipped");
        Ok(())
    }

    /// Buyer pays the rest of the trade value.
    pub fn pay_balance<S>(
        &self,
        store: &mut S,
        pga_id: &str,
        caller: &Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<Settlement, PgaError>
    where
        S: PgaStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let who = IdentityResolver::resolve(store, caller)?;
        let mut app = load_live(store, pga_id, now)?;
        if who != app.buyer {
            return Err(PgaError::Unauthorized(who));
        }
        expect_status(&app, PgaStatus::GoodsShipped, PgaStatus::BalancePaymentPaid)?;
        let expected = app.balance_due();
        if amount != expected {
            return Err(PgaError::AmountMismatch { expected, got: amount });
        }
        app.balance_payment_paid = true;
        app.custody = app.custody.checked_add(amount).ok_or(PgaError::Overflow)?;
        app.status = PgaStatus::BalancePaymentPaid;
        store.put_application(&app)?;
        tracing::info!(id = %pga_id, amount, "balance paid");
        Ok(Settlement::new().pull(app.token, *caller, amount))
    }

    pub fn issue_certificate<S>(
        &self,
        store: &mut S,
        pga_id: &str,
        caller: &Address,
        now: Timestamp,
    ) -> Result<(), PgaError>
    where
        S: PgaStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let who = IdentityResolver::resolve(store, caller)?;
        AccessGate::ensure_owner(store, &who)?;
        let mut app = load_live(store, pga_id, now)?;
        expect_status(&app, PgaStatus::BalancePaymentPaid, PgaStatus::CertificateIssued)?;
        app.certificate_issued_at = Some(now);
        app.status = PgaStatus::CertificateIssued;
        store.put_application(&app)?;
        tracing::info!(id = %pga_id, "certificate issued");
        Ok(())
    }

    /// The shipping partner (or the owner) hands the delivery to a
    /// registered delivery person, pending the buyer's consent.
    pub fn create_delivery_agreement<S>(
        &self,
        store: &mut S,
        pga_id: &str,
        caller: &Address,
        new: NewDeliveryAgreement,
        now: Timestamp,
    ) -> Result<(), PgaError>
    where
        S: PgaStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let who = IdentityResolver::resolve(store, caller)?;
        let mut app = load_live(store, pga_id, now)?;
        if app.logistic_partner != Some(who) && !AccessGate::is_owner(store, &who)? {
            return Err(PgaError::Unauthorized(who));
        }
        expect_status(&app, PgaStatus::CertificateIssued, PgaStatus::DeliveryAwaitingConsent)?;
        check_id(&new.id)?;
        if store.agreement(&new.id)?.is_some() {
            return Err(PgaError::DuplicateAgreement(new.id));
        }
        let delivery_person = IdentityResolver::resolve(store, &new.delivery_person)?;
        AccessGate::ensure_role(store, &delivery_person, Role::DeliveryPerson)?;
        if new.deadline <= now {
            return Err(PgaError::DeadlineInPast(new.deadline));
        }
        self.check_text(&new.notes)?;

        let agreement = DeliveryAgreement {
            id: new.id,
            pga_id: app.id.clone(),
            delivery_person,
            buyer: app.buyer,
            created_at: now,
            deadline: new.deadline,
            buyer_consent: false,
            buyer_signed_at: None,
            notes: new.notes,
            proof_uri: None,
        };
        app.delivery_agreement_id = Some(agreement.id.clone());
        app.status = PgaStatus::DeliveryAwaitingConsent;
        store.put_agreement(&agreement)?;
        store.put_application(&app)?;
        tracing::info!(id = %pga_id, agreement = %agreement.id, %delivery_person, "delivery agreement created");
        Ok(())
    }

    pub fn submit_delivery_proof<S>(
        &self,
        store: &mut S,
        agreement_id: &str,
        caller: &Address,
        proof_uri: &str,
    ) -> Result<(), PgaError>
    where
        S: PgaStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let who = IdentityResolver::resolve(store, caller)?;
        let mut agreement = load_agreement(store, agreement_id)?;
        if who != agreement.delivery_person {
            return Err(PgaError::Unauthorized(who));
        }
        if agreement.buyer_consent {
            return Err(PgaError::AlreadyConsented);
        }
        let proof_uri = proof_uri.trim();
        if proof_uri.is_empty() {
            return Err(PgaError::EmptyProof);
        }
        self.check_text(proof_uri)?;
        agreement.proof_uri = Some(proof_uri.to_string());
        store.put_agreement(&agreement)?;
        tracing::info!(agreement = %agreement_id, "delivery proof submitted");
        Ok(())
    }

    /// The buyer signs for the delivery. This completes the application and
    /// releases the trade value to the seller.
    pub fn buyer_consent<S>(
        &self,
        store: &mut S,
        agreement_id: &str,
        caller: &Address,
        now: Timestamp,
    ) -> Result<Settlement, PgaError>
    where
        S: PgaStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let who = IdentityResolver::resolve(store, caller)?;
        let mut agreement = load_agreement(store, agreement_id)?;
        if who != agreement.buyer {
            return Err(PgaError::Unauthorized(who));
        }
        if agreement.buyer_consent {
            return Err(PgaError::AlreadyConsented);
        }
        let mut app = load_live(store, &agreement.pga_id, now)?;
        expect_status(&app, PgaStatus::DeliveryAwaitingConsent, PgaStatus::Completed)?;

        agreement.buyer_consent = true;
        agreement.buyer_signed_at = Some(now);
        let payout = app.trade_value.min(app.custody);
        app.custody -= payout;
        app.completed_at = Some(now);
        app.status = PgaStatus::Completed;
        store.put_agreement(&agreement)?;
        store.put_application(&app)?;
        tracing::info!(id = %app.id, agreement = %agreement_id, payout, "guarantee completed");
        Ok(Settlement::new().pay(app.token, app.seller, payout))
    }

    pub fn raise_dispute<S>(
        &self,
        store: &mut S,
        pga_id: &str,
        caller: &Address,
        reason: &str,
        now: Timestamp,
    ) -> Result<(), PgaError>
    where
        S: PgaStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let who = IdentityResolver::resolve(store, caller)?;
        let mut app = load_live(store, pga_id, now)?;
        if who != app.buyer {
            return Err(PgaError::Unauthorized(who));
        }
        match app.status {
            PgaStatus::DeliveryAwaitingConsent => {}
            PgaStatus::Completed => {
                let closes = app
                    .completed_at
                    .unwrap_or(app.created_at)
                    .plus(self.params.dispute_grace_period);
                if now > closes {
                    return Err(PgaError::DisputeWindowClosed(closes));
                }
            }
            from => {
                return Err(PgaError::InvalidTransition {
                    from,
                    to: PgaStatus::Disputed,
                })
            }
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(PgaError::EmptyReason);
        }
        self.check_text(reason)?;
        app.dispute_reason = Some(reason.to_string());
        app.status = PgaStatus::Disputed;
        store.put_application(&app)?;
        tracing::info!(id = %pga_id, "guarantee disputed");
        Ok(())
    }

    /// The owner settles a dispute by paying whatever is still in custody
    /// to one side.
    pub fn settle_dispute<S>(
        &self,
        store: &mut S,
        pga_id: &str,
        caller: &Address,
        pay_seller: bool,
    ) -> Result<Settlement, PgaError>
    where
        S: PgaStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let who = IdentityResolver::resolve(store, caller)?;
        AccessGate::ensure_owner(store, &who)?;
        let mut app = load(store, pga_id)?;
        if app.status != PgaStatus::Disputed {
            return Err(PgaError::InvalidTransition {
                from: app.status,
                to: PgaStatus::Disputed,
            });
        }
        if app.dispute_settled {
            return Err(PgaError::DisputeAlreadySettled);
        }
        let payout = app.custody;
        let to = if pay_seller { app.seller } else { app.buyer };
        app.custody = 0;
        app.dispute_settled = true;
        store.put_application(&app)?;
        tracing::info!(id = %pga_id, pay_seller, payout, "guarantee dispute settled");
        Ok(Settlement::new().pay(app.token, to, payout))
    }

    /// Anyone may lapse an application whose expiry has passed; custody goes
    /// back to the buyer.
    pub fn expire<S>(&self, store: &mut S, pga_id: &str, now: Timestamp) -> Result<Settlement, PgaError>
    where
        S: PgaStore + AccessStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let mut app = load(store, pga_id)?;
        let expiry = app.expiry().ok_or(PgaError::CannotExpire)?;
        if now <= expiry {
            return Err(PgaError::NotExpired(expiry));
        }
        let refund = app.custody;
        app.custody = 0;
        app.status = PgaStatus::Expired;
        store.put_application(&app)?;
        tracing::info!(id = %pga_id, refund, "guarantee application expired");
        Ok(Settlement::new().pay(app.token, app.buyer, refund))
    }

    pub fn attach_document<S>(
        &self,
        store: &mut S,
        pga_id: &str,
        caller: &Address,
        hash: &DocHash,
    ) -> Result<(), PgaError>
    where
        S: PgaStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let who = IdentityResolver::resolve(store, caller)?;
        let mut app = load(store, pga_id)?;
        if who != app.buyer && who != app.seller {
            return Err(PgaError::Unauthorized(who));
        }
        if app.documents.contains(hash) {
            return Err(PgaError::DocumentAlreadyAttached(*hash));
        }
        app.documents.push(*hash);
        store.put_application(&app)?;
        tracing::debug!(id = %pga_id, %hash, "document attached to application");
        Ok(())
    }

    pub fn application<S: PgaStore>(
        store: &S,
        pga_id: &str,
    ) -> Result<Option<PoolGuaranteeApplication>, PgaError> {
        Ok(store.application(pga_id)?)
    }

    /// Whether `addr` is a party to any application.
    pub fn involves<S: PgaStore>(store: &S, addr: &Address) -> Result<bool, PgaError> {
        Ok(store.applications()?.iter().any(|app| {
            app.buyer == *addr || app.seller == *addr || app.logistic_partner == Some(*addr)
        }))
    }

    pub fn delivery_agreement<S: PgaStore>(
        store: &S,
        agreement_id: &str,
    ) -> Result<Option<DeliveryAgreement>, PgaError> {
        Ok(store.agreement(agreement_id)?)
    }

    fn check_text(&self, text: &str) -> Result<(), PgaError> {
        if text.chars().count() > self.params.max_text_len {
            return Err(PgaError::TextTooLong {
                max: self.params.max_text_len,
            });
        }
        Ok(())
    }
}

fn check_id(id: &str) -> Result<(), PgaError> {
    if id.trim().is_empty() || id.len() > MAX_ID_LEN {
        return Err(PgaError::InvalidId { max: MAX_ID_LEN });
    }
    Ok(())
}

fn load<S: PgaStore>(store: &S, id: &str) -> Result<PoolGuaranteeApplication, PgaError> {
    store
        .application(id)?
        .ok_or_else(|| PgaError::ApplicationNotFound(id.to_string()))
}

/// Load an application that has not lapsed.
fn load_live<S: PgaStore>(
    store: &S,
    id: &str,
    now: Timestamp,
) -> Result<PoolGuaranteeApplication, PgaError> {
    let app = load(store, id)?;
    match app.expiry() {
        Some(at) if now > at => Err(PgaError::ApplicationExpired(at)),
        _ => Ok(app),
    }
}

fn load_agreement<S: PgaStore>(store: &S, id: &str) -> Result<DeliveryAgreement, PgaError> {
    store
        .agreement(id)?
        .ok_or_else(|| PgaError::AgreementNotFound(id.to_string()))
}

fn expect_status(app: &PoolGuaranteeApplication, from: PgaStatus, to: PgaStatus) -> Result<(), PgaError> {
    if app.status != from {
        return Err(PgaError::InvalidTransition {
            from: app.status,
            to,
        });
    }
    Ok(())
}
