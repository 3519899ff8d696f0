use proptest::prelude::*;
use tradefin_access::{AccessError, AccessGate, Role};
use tradefin_nullables::{NullOracle, NullStore};
use tradefin_pga::{
    NewApplication, NewDeliveryAgreement, PgaEngine, PgaError, PgaParams, PgaStatus,
};
use tradefin_staking::{StakeLedger, StakingParams};
use tradefin_store::StoreTxn;
use tradefin_types::{Address, DocHash, Timestamp, SECS_PER_DAY, TOKEN_UNIT};

const T0: u64 = 1_700_000_000;

fn addr(b: u8) -> Address {
    Address::new([b; 20])
}

fn owner() -> Address {
    addr(1)
}

fn buyer() -> Address {
    addr(2)
}

fn seller() -> Address {
    addr(3)
}

fn shipper() -> Address {
    addr(5)
}

fn courier() -> Address {
    addr(6)
}

fn token() -> Address {
    addr(99)
}

fn days(n: u64) -> Timestamp {
    Timestamp::new(T0 + n * SECS_PER_DAY)
}

struct Fixture {
    stakes: StakeLedger,
    pga: PgaEngine,
    oracle: NullOracle,
}

impl Fixture {
    fn new() -> Self {
        Self {
            stakes: StakeLedger::new(StakingParams::default()),
            pga: PgaEngine::new(PgaParams::default()),
            oracle: NullOracle::new(),
        }
    }

    fn init(&self, txn: &mut StoreTxn<'_>, financiers: &[Address]) {
        AccessGate::initialize(txn, &owner()).unwrap();
        AccessGate::add_token(txn, &owner(), &token()).unwrap();
        AccessGate::add_country(txn, &owner(), "KE").unwrap();
        AccessGate::add_currency(txn, &owner(), "USD").unwrap();
        for user in [buyer(), seller()] {
            AccessGate::grant_role(txn, &owner(), &user, Role::VerifiedUser, Some("KE"), days(0)).unwrap();
        }
        AccessGate::grant_role(txn, &owner(), &shipper(), Role::LogisticsPartner, None, days(0)).unwrap();
        AccessGate::grant_role(txn, &owner(), &courier(), Role::DeliveryPerson, None, days(0)).unwrap();
        for f in financiers {
            self.stakes
                .stake_as_financier(txn, &self.oracle, f, &token(), 10_000 * TOKEN_UNIT, days(365), days(0))
                .unwrap();
        }
    }

    fn create(&self, txn: &mut StoreTxn<'_>, id: &str) -> Result<(), PgaError> {
        self.pga.create_application(
            txn,
            &self.stakes,
            &buyer(),
            NewApplication {
                id: id.into(),
                seller: seller(),
                token: token(),
                currency: "usd".into(),
                trade_value: 10_000,
                guarantee_amount: 8_000,
                collateral_amount: 1_000,
                duration: 90 * SECS_PER_DAY,
                metadata: "cocoa, 20t".into(),
            },
            days(0),
        )
    }

    /// Drive an application to CertificateIssued.
    fn through_certificate(&self, txn: &mut StoreTxn<'_>, id: &str) {
        self.create(txn, id).unwrap();
        self.pga.vote_guarantee(txn, &self.stakes, id, &addr(10), true, days(0)).unwrap();
        self.pga.seller_decision(txn, id, &seller(), true, days(1)).unwrap();
        self.pga.pay_collateral(txn, id, &buyer(), 1_000, days(2)).unwrap();
        self.pga.report_shipment(txn, id, &shipper(), days(3)).unwrap();
        self.pga.pay_balance(txn, id, &buyer(), 9_000, days(4)).unwrap();
        self.pga.issue_certificate(txn, id, &owner(), days(5)).unwrap();
    }

    fn agreement(&self, txn: &mut StoreTxn<'_>, id: &str, agreement: &str) {
        self.pga
            .create_delivery_agreement(
                txn,
                id,
                &shipper(),
                NewDeliveryAgreement {
                    id: agreement.into(),
                    delivery_person: courier(),
                    deadline: days(20),
                    notes: "door to door".into(),
                },
                days(6),
            )
            .unwrap();
    }
}

fn status(txn: &StoreTxn<'_>, id: &str) -> PgaStatus {
    PgaEngine::application(txn, id).unwrap().unwrap().status
}

#[test]
fn guarantee_runs_to_completion() {
    let backend = NullStore::new();
    let mut txn = StoreTxn::begin(&backend);
    let f = Fixture::new();
    f.init(&mut txn, &[addr(10)]);

    f.through_certificate(&mut txn, "pga-1");
    let app = PgaEngine::application(&txn, "pga-1").unwrap().unwrap();
    assert_eq!(app.currency, "USD");
    assert_eq!(app.custody, 10_000);
    assert!(app.collateral_paid && app.balance_payment_paid && app.goods_shipped);
    assert_eq!(app.logistic_partner, Some(shipper()));

    f.agreement(&mut txn, "pga-1", "da-1");
    assert_eq!(status(&txn, "pga-1"), PgaStatus::DeliveryAwaitingConsent);

    assert!(matches!(
        f.pga.submit_delivery_proof(&mut txn, "da-1", &buyer(), "ipfs://proof"),
        Err(PgaError::Unauthorized(_))
    ));
    f.pga.submit_delivery_proof(&mut txn, "da-1", &courier(), "ipfs://proof").unwrap();
    assert!(matches!(
        f.pga.buyer_consent(&mut txn, "da-1", &seller(), days(7)),
        Err(PgaError::Unauthorized(_))
    ));

    let payout = f.pga.buyer_consent(&mut txn, "da-1", &buyer(), days(7)).unwrap();
    assert_eq!(payout.paid_to(&seller()), 10_000);
    let app = PgaEngine::application(&txn, "pga-1").unwrap().unwrap();
    assert_eq!(app.status, PgaStatus::Completed);
    assert_eq!(app.custody, 0);
    assert_eq!(app.completed_at, Some(days(7)));

    let agreement = PgaEngine::delivery_agreement(&txn, "da-1").unwrap().unwrap();
    assert!(agreement.buyer_consent);
    assert_eq!(agreement.buyer_signed_at, Some(days(7)));
    assert!(matches!(
        f.pga.buyer_consent(&mut txn, "da-1", &buyer(), days(8)),
        Err(PgaError::AlreadyConsented)
    ));
    assert!(matches!(
        f.pga.submit_delivery_proof(&mut txn, "da-1", &courier(), "ipfs://late"),
        Err(PgaError::AlreadyConsented)
    ));
}

#[test]
fn creation_checks() {
    let backend = NullStore::new();
    let mut txn = StoreTxn::begin(&backend);
    let f = Fixture::new();

    // no financier has staked yet
    f.init(&mut txn, &[]);
    assert!(matches!(f.create(&mut txn, "pga-1"), Err(PgaError::NoEligibleFinanciers)));

    f.stakes
        .stake_as_financier(&mut txn, &f.oracle, &addr(10), &token(), 10_000 * TOKEN_UNIT, days(365), days(0))
        .unwrap();
    f.create(&mut txn, "pga-1").unwrap();
    assert!(matches!(
        f.create(&mut txn, "pga-1"),
        Err(PgaError::DuplicateApplication(_))
    ));

    let bad = NewApplication {
        id: "pga-2".into(),
        seller: seller(),
        token: token(),
        currency: "USD".into(),
        trade_value: 10_000,
        guarantee_amount: 8_000,
        collateral_amount: 10_000,
        duration: 90 * SECS_PER_DAY,
        metadata: String::new(),
    };
    assert!(matches!(
        f.pga.create_application(&mut txn, &f.stakes, &buyer(), bad.clone(), days(0)),
        Err(PgaError::InvalidCollateral { .. })
    ));
    assert!(matches!(
        f.pga.create_application(
            &mut txn,
            &f.stakes,
            &buyer(),
            NewApplication { collateral_amount: 1_000, guarantee_amount: 10_001, ..bad.clone() },
            days(0)
        ),
        Err(PgaError::InvalidGuarantee { .. })
    ));
    assert!(matches!(
        f.pga.create_application(
            &mut txn,
            &f.stakes,
            &buyer(),
            NewApplication { collateral_amount: 1_000, duration: SECS_PER_DAY, ..bad.clone() },
            days(0)
        ),
        Err(PgaError::DurationTooShort { .. })
    ));
    assert!(matches!(
        f.pga.create_application(
            &mut txn,
            &f.stakes,
            &buyer(),
            NewApplication { collateral_amount: 1_000, currency: "EUR".into(), ..bad.clone() },
            days(0)
        ),
        Err(PgaError::Access(AccessError::UnsupportedCurrency(_)))
    ));
    assert!(matches!(
        f.pga.create_application(
            &mut txn,
            &f.stakes,
            &addr(7),
            NewApplication { collateral_amount: 1_000, ..bad },
            days(0)
        ),
        Err(PgaError::Access(AccessError::NotVerified(_)))
    ));
}

#[test]
fn financier_votes_decide_early() {
    let backend = NullStore::new();
    let mut txn = StoreTxn::begin(&backend);
    let f = Fixture::new();
    f.init(&mut txn, &[addr(10), addr(11)]);
    f.create(&mut txn, "pga-1").unwrap();

    assert!(matches!(
        f.pga.vote_guarantee(&mut txn, &f.stakes, "pga-1", &buyer(), true, days(0)),
        Err(PgaError::NotFinancier(_))
    ));
    // half the power is not enough to approve
    assert_eq!(
        f.pga.vote_guarantee(&mut txn, &f.stakes, "pga-1", &addr(10), true, days(0)).unwrap(),
        PgaStatus::Created
    );
    assert!(matches!(
        f.pga.vote_guarantee(&mut txn, &f.stakes, "pga-1", &addr(10), true, days(0)),
        Err(PgaError::AlreadyVoted(_))
    ));
    assert_eq!(
        f.pga.vote_guarantee(&mut txn, &f.stakes, "pga-1", &addr(11), false, days(0)).unwrap(),
        PgaStatus::Rejected
    );
    assert!(matches!(
        f.pga.seller_decision(&mut txn, "pga-1", &seller(), true, days(1)),
        Err(PgaError::InvalidTransition { from: PgaStatus::Rejected, to: PgaStatus::SellerApproved })
    ));
}

#[test]
fn unanimous_vote_approves_after_lock_decay() {
    let backend = NullStore::new();
    let mut txn = StoreTxn::begin(&backend);
    let f = Fixture::new();
    f.init(&mut txn, &[addr(10)]);

    f.pga
        .create_application(
            &mut txn,
            &f.stakes,
            &buyer(),
            NewApplication {
                id: "pga-late".into(),
                seller: seller(),
                token: token(),
                currency: "USD".into(),
                trade_value: 10_000,
                guarantee_amount: 8_000,
                collateral_amount: 1_000,
                duration: 90 * SECS_PER_DAY,
                metadata: String::new(),
            },
            days(180),
        )
        .unwrap();
    let app = PgaEngine::application(&txn, "pga-late").unwrap().unwrap();
    assert!(app.eligible_power < 10_000 * TOKEN_UNIT);

    assert_eq!(
        f.pga.vote_guarantee(&mut txn, &f.stakes, "pga-late", &addr(10), true, days(181)).unwrap(),
        PgaStatus::GuaranteeApproved
    );
    let app = PgaEngine::application(&txn, "pga-late").unwrap().unwrap();
    assert_eq!(app.votes_for, app.eligible_power);
}

#[test]
fn seller_decides_once() {
    let backend = NullStore::new();
    let mut txn = StoreTxn::begin(&backend);
    let f = Fixture::new();
    f.init(&mut txn, &[addr(10)]);
    f.create(&mut txn, "pga-1").unwrap();
    f.pga.vote_guarantee(&mut txn, &f.stakes, "pga-1", &addr(10), true, days(0)).unwrap();

    assert!(matches!(
        f.pga.seller_decision(&mut txn, "pga-1", &buyer(), true, days(1)),
        Err(PgaError::Unauthorized(_))
    ));
    assert_eq!(
        f.pga.seller_decision(&mut txn, "pga-1", &seller(), false, days(1)).unwrap(),
        PgaStatus::Rejected
    );
    assert!(matches!(
        f.pga.seller_decision(&mut txn, "pga-1", &seller(), true, days(1)),
        Err(PgaError::SellerAlreadyDecided)
    ));
}

#[test]
fn payments_must_match_exactly() {
    let backend = NullStore::new();
    let mut txn = StoreTxn::begin(&backend);
    let f = Fixture::new();
    f.init(&mut txn, &[addr(10)]);
    f.create(&mut txn, "pga-1").unwrap();
    f.pga.vote_guarantee(&mut txn, &f.stakes, "pga-1", &addr(10), true, days(0)).unwrap();
    f.pga.seller_decision(&mut txn, "pga-1", &seller(), true, days(1)).unwrap();

    assert!(matches!(
        f.pga.pay_collateral(&mut txn, "pga-1", &buyer(), 999, days(2)),
        Err(PgaError::AmountMismatch { expected: 1_000, got: 999 })
    ));
    let pulled = f.pga.pay_collateral(&mut txn, "pga-1", &buyer(), 1_000, days(2)).unwrap();
    assert_eq!(pulled.pulled_from(&buyer()), 1_000);

    assert!(matches!(
        f.pga.report_shipment(&mut txn, "pga-1", &courier(), days(3)),
        Err(PgaError::Unauthorized(_))
    ));
    f.pga.report_shipment(&mut txn, "pga-1", &shipper(), days(3)).unwrap();
    assert!(matches!(
        f.pga.pay_balance(&mut txn, "pga-1", &buyer(), 10_000, days(4)),
        Err(PgaError::AmountMismatch { expected: 9_000, .. })
    ));
}

#[test]
fn issuance_fee_is_charged_with_collateral() {
    let backend = NullStore::new();
    let mut txn = StoreTxn::begin(&backend);
    let mut f = Fixture::new();
    f.pga = PgaEngine::new(PgaParams {
        issuance_fee_bps: 100,
        ..PgaParams::default()
    });
    f.init(&mut txn, &[addr(10)]);
    f.create(&mut txn, "pga-1").unwrap();
    assert_eq!(PgaEngine::application(&txn, "pga-1").unwrap().unwrap().issuance_fee, 80);

    f.pga.vote_guarantee(&mut txn, &f.stakes, "pga-1", &addr(10), true, days(0)).unwrap();
    f.pga.seller_decision(&mut txn, "pga-1", &seller(), true, days(1)).unwrap();
    let pulled = f.pga.pay_collateral(&mut txn, "pga-1", &buyer(), 1_080, days(2)).unwrap();
    assert_eq!(pulled.pulled_from(&buyer()), 1_080);
    let app = PgaEngine::application(&txn, "pga-1").unwrap().unwrap();
    assert!(app.issuance_fee_paid);
    assert_eq!(app.custody, 1_000);
}

#[test]
fn expiry_is_lazy_and_refunds_custody() {
    let backend = NullStore::new();
    let mut txn = StoreTxn::begin(&backend);
    let f = Fixture::new();
    f.init(&mut txn, &[addr(10)]);
    f.create(&mut txn, "pga-1").unwrap();
    f.pga.vote_guarantee(&mut txn, &f.stakes, "pga-1", &addr(10), true, days(0)).unwrap();
    f.pga.seller_decision(&mut txn, "pga-1", &seller(), true, days(1)).unwrap();
    f.pga.pay_collateral(&mut txn, "pga-1", &buyer(), 1_000, days(2)).unwrap();

    assert!(matches!(
        f.pga.expire(&mut txn, "pga-1", days(10)),
        Err(PgaError::NotExpired(_))
    ));
    assert!(matches!(
        f.pga.report_shipment(&mut txn, "pga-1", &shipper(), days(91)),
        Err(PgaError::ApplicationExpired(_))
    ));
    assert_eq!(status(&txn, "pga-1"), PgaStatus::CollateralPaid);

    let refund = f.pga.expire(&mut txn, "pga-1", days(91)).unwrap();
    assert_eq!(refund.paid_to(&buyer()), 1_000);
    assert_eq!(status(&txn, "pga-1"), PgaStatus::Expired);
    assert!(matches!(
        f.pga.expire(&mut txn, "pga-1", days(92)),
        Err(PgaError::CannotExpire)
    ));
}

#[test]
fn unvoted_application_lapses_after_voting_period() {
    let backend = NullStore::new();
    let mut txn = StoreTxn::begin(&backend);
    let f = Fixture::new();
    f.init(&mut txn, &[addr(10)]);
    f.create(&mut txn, "pga-1").unwrap();
    assert!(matches!(
        f.pga.vote_guarantee(&mut txn, &f.stakes, "pga-1", &addr(10), true, days(4)),
        Err(PgaError::ApplicationExpired(_))
    ));
    assert!(f.pga.expire(&mut txn, "pga-1", days(4)).unwrap().is_empty());
}

#[test]
fn dispute_after_delivery_is_settled_by_owner() {
    let backend = NullStore::new();
    let mut txn = StoreTxn::begin(&backend);
    let f = Fixture::new();
    f.init(&mut txn, &[addr(10)]);
    f.through_certificate(&mut txn, "pga-1");
    f.agreement(&mut txn, "pga-1", "da-1");

    assert!(matches!(
        f.pga.raise_dispute(&mut txn, "pga-1", &seller(), "damaged", days(7)),
        Err(PgaError::Unauthorized(_))
    ));
    f.pga.raise_dispute(&mut txn, "pga-1", &buyer(), "damaged", days(7)).unwrap();
    assert!(matches!(
        f.pga.buyer_consent(&mut txn, "da-1", &buyer(), days(8)),
        Err(PgaError::InvalidTransition { from: PgaStatus::Disputed, to: PgaStatus::Completed })
    ));
    assert!(matches!(
        f.pga.settle_dispute(&mut txn, "pga-1", &buyer(), true),
        Err(PgaError::Access(AccessError::NotOwner(_)))
    ));
    let settled = f.pga.settle_dispute(&mut txn, "pga-1", &owner(), false).unwrap();
    assert_eq!(settled.paid_to(&buyer()), 10_000);
    assert!(matches!(
        f.pga.settle_dispute(&mut txn, "pga-1", &owner(), true),
        Err(PgaError::DisputeAlreadySettled)
    ));
}

#[test]
fn completed_application_can_be_disputed_within_grace() {
    let backend = NullStore::new();
    let mut txn = StoreTxn::begin(&backend);
    let f = Fixture::new();
    f.init(&mut txn, &[addr(10)]);
    for (id, da) in [("pga-1", "da-1"), ("pga-2", "da-2")] {
        f.through_certificate(&mut txn, id);
        f.agreement(&mut txn, id, da);
        f.pga.buyer_consent(&mut txn, da, &buyer(), days(7)).unwrap();
    }
    assert!(matches!(
        f.pga.raise_dispute(&mut txn, "pga-1", &buyer(), "short weight", days(15)),
        Err(PgaError::DisputeWindowClosed(_))
    ));
    f.pga.raise_dispute(&mut txn, "pga-2", &buyer(), "short weight", days(14)).unwrap();
    assert_eq!(status(&txn, "pga-2"), PgaStatus::Disputed);
}

#[test]
fn documents_attach_once_for_parties() {
    let backend = NullStore::new();
    let mut txn = StoreTxn::begin(&backend);
    let f = Fixture::new();
    f.init(&mut txn, &[addr(10)]);
    f.create(&mut txn, "pga-1").unwrap();
    let hash = DocHash::digest(b"proforma invoice");
    f.pga.attach_document(&mut txn, "pga-1", &seller(), &hash).unwrap();
    assert!(matches!(
        f.pga.attach_document(&mut txn, "pga-1", &buyer(), &hash),
        Err(PgaError::DocumentAlreadyAttached(_))
    ));
    assert!(matches!(
        f.pga.attach_document(&mut txn, "pga-1", &shipper(), &DocHash::digest(b"x")),
        Err(PgaError::Unauthorized(_))
    ));
}

#[test]
fn paused_platform_halts_applications() {
    let backend = NullStore::new();
    let mut txn = StoreTxn::begin(&backend);
    let f = Fixture::new();
    f.init(&mut txn, &[addr(10)]);
    AccessGate::set_paused(&mut txn, &owner(), true).unwrap();
    assert!(matches!(
        f.create(&mut txn, "pga-1"),
        Err(PgaError::Access(AccessError::Halted))
    ));
}

#[derive(Clone, Copy, Debug)]
enum Action {
    Vote,
    Seller,
    Collateral,
    Ship,
    Balance,
    Certificate,
    Agreement,
    Consent,
}

fn attempt(f: &Fixture, txn: &mut StoreTxn<'_>, action: Action) -> Result<(), PgaError> {
    let id = "pga-1";
    let now = days(1);
    match action {
        Action::Vote => f.pga.vote_guarantee(txn, &f.stakes, id, &addr(10), true, days(0)).map(|_| ()),
        Action::Seller => f.pga.seller_decision(txn, id, &seller(), true, now).map(|_| ()),
        Action::Collateral => f.pga.pay_collateral(txn, id, &buyer(), 1_000, now).map(|_| ()),
        Action::Ship => f.pga.report_shipment(txn, id, &shipper(), now),
        Action::Balance => f.pga.pay_balance(txn, id, &buyer(), 9_000, now).map(|_| ()),
        Action::Certificate => f.pga.issue_certificate(txn, id, &owner(), now),
        Action::Agreement => f.pga.create_delivery_agreement(
            txn,
            id,
            &shipper(),
            NewDeliveryAgreement {
                id: "da-1".into(),
                delivery_person: courier(),
                deadline: days(20),
                notes: String::new(),
            },
            now,
        ),
        Action::Consent => f.pga.buyer_consent(txn, "da-1", &buyer(), now).map(|_| ()),
    }
}

const ORDER: [Action; 8] = [
    Action::Vote,
    Action::Seller,
    Action::Collateral,
    Action::Ship,
    Action::Balance,
    Action::Certificate,
    Action::Agreement,
    Action::Consent,
];

proptest! {
    /// Actions attempted out of order fail without touching the status;
    /// the status only ever advances one step along the happy path.
    #[test]
    fn status_only_advances_in_order(picks in prop::collection::vec(0usize..8, 1..40)) {
        let backend = NullStore::new();
        let mut txn = StoreTxn::begin(&backend);
        let f = Fixture::new();
        f.init(&mut txn, &[addr(10)]);
        f.create(&mut txn, "pga-1").unwrap();

        let mut done = 0usize;
        for pick in picks {
            let before = status(&txn, "pga-1");
            let result = attempt(&f, &mut txn, ORDER[pick]);
            let after = status(&txn, "pga-1");
            if pick == done {
                prop_assert!(result.is_ok());
                prop_assert_ne!(before, after);
                done += 1;
            } else {
                prop_assert!(result.is_err());
                prop_assert_eq!(before, after);
            }
        }
    }
}
