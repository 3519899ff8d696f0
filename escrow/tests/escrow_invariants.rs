use proptest::prelude::*;
use tradefin_access::{AccessGate, Role};
use tradefin_escrow::{
    EscrowEngine, EscrowError, EscrowParams, EscrowStatus, MilestoneSpec, NewEscrow,
};
use tradefin_nullables::NullStore;
use tradefin_store::StoreTxn;
use tradefin_types::{Address, Amount, Settlement, Timestamp, Transfer};

const T0: u64 = 1_700_000_000;

fn addr(b: u8) -> Address {
    Address::new([b; 20])
}

fn importer() -> Address {
    addr(2)
}

fn exporter() -> Address {
    addr(3)
}

fn arbitrator() -> Address {
    addr(4)
}

fn setup(txn: &mut StoreTxn<'_>) {
    AccessGate::initialize(txn, &addr(1)).unwrap();
    AccessGate::add_token(txn, &addr(1), &addr(99)).unwrap();
    AccessGate::add_country(txn, &addr(1), "NG").unwrap();
    AccessGate::grant_role(txn, &addr(1), &importer(), Role::VerifiedUser, Some("NG"), Timestamp::new(T0))
        .unwrap();
}

fn terms(total: Amount, fee: Amount, milestones: &[Amount]) -> NewEscrow {
    NewEscrow {
        exporter: exporter(),
        arbitrator: arbitrator(),
        token: addr(99),
        total_amount: total,
        arbitrator_fee: fee,
        deadline: Timestamp::new(T0 + 30 * 86_400),
        milestones: milestones
            .iter()
            .map(|a| MilestoneSpec {
                description: "milestone".into(),
                amount: *a,
            })
            .collect(),
    }
}

/// Net tokens held for the escrow after applying `settlement`.
fn apply(held: &mut i128, settlement: &Settlement) {
    for leg in settlement.transfers() {
        match leg {
            Transfer::In { amount, .. } => *held += *amount as i128,
            Transfer::Out { amount, .. } => *held -= *amount as i128,
        }
    }
}

#[test]
fn full_lifecycle_without_dispute() {
    let backend = NullStore::new();
    let mut txn = StoreTxn::begin(&backend);
    setup(&mut txn);
    let engine = EscrowEngine::new(EscrowParams::default());
    let now = Timestamp::new(T0);

    let id = engine.create_escrow(&mut txn, &importer(), terms(1_000, 50, &[1_000]), now).unwrap();
    assert!(matches!(
        engine.fund(&mut txn, id, &importer(), 999, now),
        Err(EscrowError::AmountMismatch { expected: 1_000, got: 999 })
    ));
    assert!(matches!(
        engine.fund(&mut txn, id, &exporter(), 1_000, now),
        Err(EscrowError::Unauthorized(_))
    ));
    let funded = engine.fund(&mut txn, id, &importer(), 1_000, now).unwrap();
    assert_eq!(funded.pulled_from(&importer()), 1_000);

    engine.begin_work(&mut txn, id, &exporter()).unwrap();
    assert!(matches!(
        engine.release_milestone(&mut txn, id, 0, &importer(), now),
        Err(EscrowError::MilestoneNotCompleted(0))
    ));
    engine.complete_milestone(&mut txn, id, 0, &importer(), now).unwrap();
    let paid = engine.release_milestone(&mut txn, id, 0, &importer(), now).unwrap();
    assert_eq!(paid.paid_to(&exporter()), 1_000);

    let escrow = EscrowEngine::escrow(&txn, id).unwrap().unwrap();
    assert_eq!(escrow.status, EscrowStatus::Completed);
    assert_eq!(escrow.released_amount, 1_000);
    assert!(matches!(
        engine.release_milestone(&mut txn, id, 0, &importer(), now),
        Err(EscrowError::InvalidStatus { .. })
    ));
}

#[test]
fn dispute_freezes_releases_until_resolved() {
    let backend = NullStore::new();
    let mut txn = StoreTxn::begin(&backend);
    setup(&mut txn);
    let engine = EscrowEngine::new(EscrowParams::default());
    let now = Timestamp::new(T0);

    let id = engine
        .create_escrow(&mut txn, &importer(), terms(1_000, 50, &[300, 700]), now)
        .unwrap();
    engine.fund(&mut txn, id, &importer(), 1_000, now).unwrap();
    engine.complete_milestone(&mut txn, id, 0, &importer(), now).unwrap();
    engine.release_milestone(&mut txn, id, 0, &importer(), now).unwrap();

    assert!(matches!(
        engine.raise_dispute(&mut txn, id, &exporter(), "   ", now),
        Err(EscrowError::EmptyReason)
    ));
    engine.raise_dispute(&mut txn, id, &exporter(), "goods rejected", now).unwrap();
    assert!(matches!(
        engine.complete_milestone(&mut txn, id, 1, &importer(), now),
        Err(EscrowError::DisputeActive)
    ));
    assert!(matches!(
        engine.resolve_dispute(&mut txn, id, &importer(), true, now),
        Err(EscrowError::Unauthorized(_))
    ));
    engine.escalate_dispute(&mut txn, id, &arbitrator()).unwrap();

    let outcome = engine.resolve_dispute(&mut txn, id, &arbitrator(), false, now).unwrap();
    assert_eq!(outcome.paid_to(&arbitrator()), 50);
    assert_eq!(outcome.paid_to(&exporter()), 650);

    let escrow = EscrowEngine::escrow(&txn, id).unwrap().unwrap();
    assert_eq!(escrow.status, EscrowStatus::Completed);
    assert_eq!(escrow.released_amount, 950);
    assert_eq!(escrow.dispute.unwrap().awarded_to_importer, Some(false));
}

#[test]
fn expired_escrow_refunds_importer() {
    let backend = NullStore::new();
    let mut txn = StoreTxn::begin(&backend);
    setup(&mut txn);
    let engine = EscrowEngine::new(EscrowParams::default());
    let now = Timestamp::new(T0);

    let id = engine.create_escrow(&mut txn, &importer(), terms(500, 0, &[500]), now).unwrap();
    engine.fund(&mut txn, id, &importer(), 500, now).unwrap();
    assert!(matches!(
        engine.refund_expired(&mut txn, id, &importer(), now),
        Err(EscrowError::DeadlineNotReached(_))
    ));
    let later = Timestamp::new(T0 + 31 * 86_400);
    let refund = engine.refund_expired(&mut txn, id, &importer(), later).unwrap();
    assert_eq!(refund.paid_to(&importer()), 500);
    assert_eq!(
        EscrowEngine::escrow(&txn, id).unwrap().unwrap().status,
        EscrowStatus::Refunded
    );
}

#[derive(Clone, Debug)]
enum Step {
    Complete(usize),
    Release(usize),
    Dispute,
    Escalate,
    Resolve(bool),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (0usize..4).prop_map(Step::Complete),
        3 => (0usize..4).prop_map(Step::Release),
        1 => Just(Step::Dispute),
        1 => Just(Step::Escalate),
        1 => any::<bool>().prop_map(Step::Resolve),
    ]
}

proptest! {
    /// Whatever sequence of actions is attempted, the exporter never receives
    /// more than the total, and funds leave custody only as far as they came in.
    #[test]
    fn funds_are_conserved(
        amounts in prop::collection::vec(1u128..500, 1..4),
        slack in 0u128..300,
        fee in 0u128..100,
        steps in prop::collection::vec(step(), 0..20),
    ) {
        let backend = NullStore::new();
        let mut txn = StoreTxn::begin(&backend);
        setup(&mut txn);
        let engine = EscrowEngine::new(EscrowParams::default());
        let now = Timestamp::new(T0);

        let total: Amount = amounts.iter().sum::<Amount>() + slack + fee + 1;
        let id = engine.create_escrow(&mut txn, &importer(), terms(total, fee, &amounts), now).unwrap();
        let mut held: i128 = 0;
        apply(&mut held, &engine.fund(&mut txn, id, &importer(), total, now).unwrap());

        for s in steps {
            let result = match s {
                Step::Complete(i) => engine.complete_milestone(&mut txn, id, i, &importer(), now).map(|_| Settlement::new()),
                Step::Release(i) => engine.release_milestone(&mut txn, id, i, &importer(), now),
                Step::Dispute => engine.raise_dispute(&mut txn, id, &exporter(), "quality", now).map(|_| Settlement::new()),
                Step::Escalate => engine.escalate_dispute(&mut txn, id, &arbitrator()).map(|_| Settlement::new()),
                Step::Resolve(to_importer) => engine.resolve_dispute(&mut txn, id, &arbitrator(), to_importer, now),
            };
            if let Ok(settlement) = result {
                apply(&mut held, &settlement);
            }

            let escrow = EscrowEngine::escrow(&txn, id).unwrap().unwrap();
            prop_assert!(escrow.released_amount <= escrow.total_amount);
            prop_assert!(escrow.milestones_total() <= escrow.total_amount);
            prop_assert!(held >= 0);
            if escrow.status.is_terminal() {
                prop_assert_eq!(held, 0);
            } else {
                prop_assert_eq!(held as u128, escrow.remaining());
            }
        }
    }
}
