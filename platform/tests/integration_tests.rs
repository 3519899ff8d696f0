use proptest::prelude::*;
use tradefin_access::{AccessError, Role};
use tradefin_escrow::{EscrowStatus, MilestoneSpec, NewEscrow};
use tradefin_identity::IdentityError;
use tradefin_nullables::{NullBank, NullClock, NullOracle, NullStore};
use tradefin_pga::{NewApplication, NewDeliveryAgreement, PgaStatus};
use tradefin_platform::{GenesisConfig, Platform, PlatformConfig, PlatformError, StorageConfig};
use tradefin_registry::{InvoiceStatus, NewInvoice};
use tradefin_staking::StakingError;
use tradefin_types::{Address, Amount, Clock, ErrorCode, ErrorKind, SECS_PER_DAY, TOKEN_UNIT};

type TestPlatform = Platform<NullStore, NullBank, NullOracle, NullClock>;

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

fn arbitrator() -> Address {
    addr(4)
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

fn genesis() -> GenesisConfig {
    GenesisConfig {
        owner: Some(owner().to_string()),
        countries: vec!["KE".into()],
        currencies: vec!["USD".into()],
        tokens: vec![token().to_string()],
    }
}

fn platform() -> TestPlatform {
    let config = PlatformConfig::default();
    let mut platform = Platform::new(
        NullStore::new(),
        NullBank::new(),
        NullOracle::new(),
        NullClock::new(T0),
        &config,
    );
    assert!(platform.apply_genesis(&genesis()).unwrap());
    for user in [buyer(), seller()] {
        platform
            .grant_role(&owner(), &user, Role::VerifiedUser, Some("KE"))
            .unwrap();
    }
    platform
        .grant_role(&owner(), &shipper(), Role::LogisticsPartner, None)
        .unwrap();
    platform
        .grant_role(&owner(), &courier(), Role::DeliveryPerson, None)
        .unwrap();
    platform
}

fn invoice_draft(number: &str, amount: Amount, platform: &TestPlatform) -> NewInvoice {
    NewInvoice {
        number: number.into(),
        payer: buyer(),
        amount,
        token: token(),
        due_date: platform.clock().now().plus(30 * SECS_PER_DAY),
        description: "spare parts".into(),
    }
}

/// Engine errors arrive wrapped in their component's error, so match on the
/// stable code rather than the variant path.
fn is_halted<T>(result: Result<T, PlatformError>) -> bool {
    matches!(result, Err(ref e) if e.code() == "HALTED")
}

#[test]
fn genesis_is_applied_once() {
    let mut platform = platform();
    assert_eq!(platform.owner().unwrap(), owner());
    assert!(!platform.apply_genesis(&genesis()).unwrap());
    assert!(platform.has_role(&buyer(), Role::VerifiedUser).unwrap());
}

#[test]
fn escrow_settles_through_the_bank() {
    let mut platform = platform();
    platform.bank_mut().mint(token(), buyer(), 1_000);
    let deadline = platform.clock().now().plus(30 * SECS_PER_DAY);

    let id = platform
        .create_escrow(
            &buyer(),
            NewEscrow {
                exporter: seller(),
                arbitrator: arbitrator(),
                token: token(),
                total_amount: 1_000,
                arbitrator_fee: 50,
                deadline,
                milestones: vec![MilestoneSpec {
                    description: "bill of lading".into(),
                    amount: 1_000,
                }],
            },
        )
        .unwrap();
    platform.fund_escrow(&buyer(), id, 1_000).unwrap();
    assert_eq!(platform.bank().custody_of(&token()), 1_000);
    assert_eq!(platform.bank().balance_of(&token(), &buyer()), 0);

    platform.begin_work(&seller(), id).unwrap();
    platform.complete_milestone(&buyer(), id, 0).unwrap();
    let paid = platform.release_milestone(&buyer(), id, 0).unwrap();
    assert_eq!(paid.paid_to(&seller()), 1_000);

    let escrow = platform.escrow(id).unwrap().unwrap();
    assert_eq!(escrow.status, EscrowStatus::Completed);
    assert_eq!(platform.bank().balance_of(&token(), &seller()), 1_000);
    assert_eq!(platform.bank().custody_of(&token()), 0);
}

#[test]
fn pool_guarantee_settles_through_the_bank() {
    let mut platform = platform();
    let financier = addr(10);
    let stake = 10_000 * TOKEN_UNIT;
    platform.bank_mut().mint(token(), financier, stake);
    platform.bank_mut().mint(token(), buyer(), 10_000);

    let lock = platform.clock().now().plus(365 * SECS_PER_DAY);
    platform.stake_as_financier(&financier, &token(), stake, lock).unwrap();

    platform
        .create_application(
            &buyer(),
            NewApplication {
                id: "pga-1".into(),
                seller: seller(),
                token: token(),
                currency: "USD".into(),
                trade_value: 10_000,
                guarantee_amount: 8_000,
                collateral_amount: 1_000,
                duration: 90 * SECS_PER_DAY,
                metadata: "coffee, 12t".into(),
            },
        )
        .unwrap();
    assert_eq!(
        platform.vote_guarantee(&financier, "pga-1", true).unwrap(),
        PgaStatus::GuaranteeApproved
    );
    platform.clock().advance(SECS_PER_DAY);
    platform.seller_decision(&seller(), "pga-1", true).unwrap();
    platform.pay_collateral(&buyer(), "pga-1", 1_000).unwrap();
    platform.report_shipment(&shipper(), "pga-1").unwrap();
    platform.pay_balance(&buyer(), "pga-1", 9_000).unwrap();
    platform.issue_certificate(&owner(), "pga-1").unwrap();
    platform
        .create_delivery_agreement(
            &shipper(),
            "pga-1",
            NewDeliveryAgreement {
                id: "da-1".into(),
                delivery_person: courier(),
                deadline: platform.clock().now().plus(14 * SECS_PER_DAY),
                notes: "port to warehouse".into(),
            },
        )
        .unwrap();
    platform
        .submit_delivery_proof(&courier(), "da-1", "ipfs://proof")
        .unwrap();
    assert_eq!(platform.bank().custody_of(&token()), stake + 10_000);

    platform.buyer_consent(&buyer(), "da-1").unwrap();
    let app = platform.application("pga-1").unwrap().unwrap();
    assert_eq!(app.status, PgaStatus::Completed);
    assert_eq!(platform.bank().balance_of(&token(), &seller()), 10_000);
    assert_eq!(platform.bank().balance_of(&token(), &buyer()), 0);
    assert_eq!(platform.bank().custody_of(&token()), stake);
}

#[test]
fn failed_transfer_rolls_the_operation_back() {
    let mut platform = platform();
    platform.bank_mut().mint(token(), buyer(), 2_500);
    let draft = invoice_draft("INV-7", 2_500, &platform);
    let id = platform.create_invoice(&seller(), draft).unwrap();
    platform.send_invoice(&seller(), id).unwrap();

    // the pull from the payer succeeds, the payout to the payee does not
    platform.bank_mut().fail_after(1);
    let err = platform.pay_invoice(&buyer(), id, 2_500).unwrap_err();
    assert!(matches!(err, PlatformError::TransferFailed(_)));
    assert_eq!(err.kind(), ErrorKind::External);

    let invoice = platform.invoice(id).unwrap().unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Sent);
    assert_eq!(invoice.paid_at, None);
    assert_eq!(platform.bank().balance_of(&token(), &buyer()), 2_500);
    assert_eq!(platform.bank().custody_of(&token()), 0);

    platform.pay_invoice(&buyer(), id, 2_500).unwrap();
    assert_eq!(platform.invoice(id).unwrap().unwrap().status, InvoiceStatus::Paid);
    assert_eq!(platform.bank().balance_of(&token(), &seller()), 2_500);
}

#[test]
fn rejected_operation_moves_nothing() {
    let mut platform = platform();
    platform.bank_mut().mint(token(), buyer(), 2_500);
    let draft = invoice_draft("INV-8", 2_500, &platform);
    let id = platform.create_invoice(&seller(), draft).unwrap();
    let before = platform.bank().transfer_count();

    // still a draft
    let err = platform.pay_invoice(&buyer(), id, 2_500).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
    assert_eq!(platform.bank().transfer_count(), before);
}

#[test]
fn pause_halts_every_mutation() {
    let mut platform = platform();
    platform.bank_mut().mint(token(), buyer(), 1_000 * TOKEN_UNIT);
    assert!(matches!(
        platform.set_paused(&buyer(), true),
        Err(PlatformError::Access(AccessError::NotOwner(_)))
    ));
    platform.set_paused(&owner(), true).unwrap();
    assert!(platform.is_paused().unwrap());

    let lock = platform.clock().now().plus(60 * SECS_PER_DAY);
    let draft = invoice_draft("INV-9", 100, &platform);
    assert!(is_halted(platform.stake(&buyer(), &token(), 100 * TOKEN_UNIT, lock)));
    assert!(is_halted(platform.create_invoice(&seller(), draft)));
    assert!(is_halted(platform.request_identity_link(&addr(20), &buyer())));
    assert!(is_halted(platform.link_identity(&buyer(), &addr(20), &buyer())));
    assert!(is_halted(platform.submit_request(&buyer(), &token(), 100, "working capital")));
    assert!(is_halted(platform.raise_pga_dispute(&buyer(), "pga-1", "late")));
    assert!(is_halted(platform.cancel_invoice(&seller(), 1)));
    assert_eq!(platform.bank().transfer_count(), 0);

    // owner administration still works
    platform.add_country(&owner(), "GH").unwrap();
    platform
        .grant_role(&owner(), &addr(21), Role::DocumentVerifier, None)
        .unwrap();

    platform.set_paused(&owner(), false).unwrap();
    platform.stake(&buyer(), &token(), 100 * TOKEN_UNIT, lock).unwrap();
}

#[test]
fn stake_round_trip_pays_rewards_from_custody() {
    let mut platform = platform();
    let alice = addr(7);
    let bob = addr(8);
    let amount = 1_000 * TOKEN_UNIT;
    platform.bank_mut().mint(token(), alice, amount);
    platform.bank_mut().mint(token(), bob, 100 * TOKEN_UNIT);

    let lock = platform.clock().now().plus(30 * SECS_PER_DAY);
    platform.stake(&alice, &token(), amount, lock).unwrap();
    assert!(matches!(
        platform.unstake(&alice, &token(), amount),
        Err(PlatformError::Staking(StakingError::LockNotElapsed(_)))
    ));

    platform.clock().advance(30 * SECS_PER_DAY);
    // custody only holds the principal, so the reward leg cannot be paid
    assert!(matches!(
        platform.unstake(&alice, &token(), amount),
        Err(PlatformError::TransferFailed(_))
    ));
    let stake = platform.stake_of(&alice, &token()).unwrap().unwrap();
    assert!(stake.active);
    assert_eq!(stake.amount, amount);

    let lock = platform.clock().now().plus(30 * SECS_PER_DAY);
    platform.stake(&bob, &token(), 100 * TOKEN_UNIT, lock).unwrap();
    let settlement = platform.unstake(&alice, &token(), amount).unwrap();
    let payout = settlement.paid_to(&alice);
    assert!(payout > amount);
    assert_eq!(platform.bank().balance_of(&token(), &alice), payout);
    assert!(!platform.stake_of(&alice, &token()).unwrap().unwrap().active);
    assert_eq!(
        platform.bank().custody_of(&token()),
        amount + 100 * TOKEN_UNIT - payout
    );
}

#[test]
fn secondary_credentials_act_for_their_primary() {
    let mut platform = platform();
    let hot_wallet = addr(20);
    // the primary alone cannot claim a wallet
    assert!(matches!(
        platform.link_identity(&seller(), &hot_wallet, &seller()),
        Err(PlatformError::Identity(IdentityError::NoLinkRequest { .. }))
    ));
    platform.request_identity_link(&hot_wallet, &seller()).unwrap();
    assert_eq!(platform.resolve(&hot_wallet).unwrap(), hot_wallet);
    assert!(matches!(
        platform.link_identity(&addr(30), &hot_wallet, &seller()),
        Err(PlatformError::Access(AccessError::NotOwner(_)))
    ));
    platform.link_identity(&seller(), &hot_wallet, &seller()).unwrap();
    assert_eq!(platform.resolve(&hot_wallet).unwrap(), seller());

    let draft = invoice_draft("INV-10", 500, &platform);
    let id = platform.create_invoice(&hot_wallet, draft).unwrap();
    assert_eq!(platform.invoice(id).unwrap().unwrap().payee, seller());
    platform.send_invoice(&hot_wallet, id).unwrap();
}

#[test]
fn a_wallet_cannot_be_claimed_without_its_request() {
    let mut platform = platform();
    let attacker = addr(40);
    let victim = addr(41);
    platform.bank_mut().mint(token(), victim, 1_000 * TOKEN_UNIT);

    assert!(matches!(
        platform.link_identity(&attacker, &victim, &attacker),
        Err(PlatformError::Identity(IdentityError::NoLinkRequest { .. }))
    ));
    // a request naming someone else does not authorize the attacker
    platform.request_identity_link(&victim, &buyer()).unwrap();
    assert!(matches!(
        platform.link_identity(&attacker, &victim, &attacker),
        Err(PlatformError::Identity(IdentityError::NoLinkRequest { .. }))
    ));
    assert_eq!(platform.resolve(&victim).unwrap(), victim);

    // the victim's own funds still land under the victim
    let lock = platform.clock().now().plus(60 * SECS_PER_DAY);
    platform.stake(&victim, &token(), 1_000 * TOKEN_UNIT, lock).unwrap();
    assert_eq!(
        platform.stake_of(&victim, &token()).unwrap().unwrap().amount,
        1_000 * TOKEN_UNIT
    );
    assert!(platform.stake_of(&attacker, &token()).unwrap().is_none());
}

#[test]
fn credentials_holding_records_cannot_become_secondaries() {
    let mut platform = platform();
    let staker = addr(42);
    platform.bank_mut().mint(token(), staker, 1_000 * TOKEN_UNIT);
    let lock = platform.clock().now().plus(60 * SECS_PER_DAY);
    platform.stake(&staker, &token(), 1_000 * TOKEN_UNIT, lock).unwrap();

    assert!(matches!(
        platform.request_identity_link(&staker, &seller()),
        Err(PlatformError::Identity(IdentityError::CredentialInUse(a))) if a == staker
    ));
    // not even the owner can strand the stake
    assert!(matches!(
        platform.link_identity(&owner(), &staker, &seller()),
        Err(PlatformError::Identity(IdentityError::CredentialInUse(_)))
    ));
    assert_eq!(platform.resolve(&staker).unwrap(), staker);
    assert!(platform.stake_of(&staker, &token()).unwrap().unwrap().active);

    // a role holder
    assert!(matches!(
        platform.request_identity_link(&buyer(), &seller()),
        Err(PlatformError::Identity(IdentityError::CredentialInUse(_)))
    ));

    // an invoice payer
    let payer = addr(43);
    let draft = NewInvoice {
        payer,
        ..invoice_draft("INV-11", 10, &platform)
    };
    platform.create_invoice(&seller(), draft).unwrap();
    assert!(matches!(
        platform.link_identity(&owner(), &payer, &buyer()),
        Err(PlatformError::Identity(IdentityError::CredentialInUse(_)))
    ));
}

#[test]
fn lmdb_backed_platform_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = PlatformConfig {
        storage: StorageConfig::Lmdb {
            path: dir.path().to_path_buf(),
            map_size: 16 * 1024 * 1024,
        },
        genesis: genesis(),
        ..PlatformConfig::default()
    };

    let id = {
        let mut platform =
            Platform::open(&config, NullBank::new(), NullOracle::new(), NullClock::new(T0)).unwrap();
        platform
            .grant_role(&owner(), &seller(), Role::VerifiedUser, Some("KE"))
            .unwrap();
        let draft = NewInvoice {
            number: "INV-100".into(),
            payer: buyer(),
            amount: 750,
            token: token(),
            due_date: tradefin_types::Timestamp::new(T0 + SECS_PER_DAY),
            description: String::new(),
        };
        platform.create_invoice(&seller(), draft).unwrap()
    };

    let mut platform =
        Platform::open(&config, NullBank::new(), NullOracle::new(), NullClock::new(T0)).unwrap();
    assert!(!platform.apply_genesis(&config.genesis).unwrap());
    assert_eq!(platform.owner().unwrap(), owner());
    assert!(platform.has_role(&seller(), Role::VerifiedUser).unwrap());
    let invoice = platform.invoice_by_number("INV-100").unwrap().unwrap();
    assert_eq!(invoice.id, id);
    assert_eq!(invoice.amount, 750);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Whatever transfers fail, the bank and the invoice ledger agree.
    #[test]
    fn invoice_ledger_and_bank_agree(
        amounts in prop::collection::vec(1u128..5_000, 1..6),
        failures in prop::collection::vec(prop::option::of(0usize..2), 1..6),
    ) {
        let mut platform = platform();
        let total: Amount = amounts.iter().sum();
        platform.bank_mut().mint(token(), buyer(), total);

        let mut ids = Vec::new();
        for (i, amount) in amounts.iter().enumerate() {
            let draft = invoice_draft(&format!("INV-{i}"), *amount, &platform);
            let id = platform.create_invoice(&seller(), draft).unwrap();
            platform.send_invoice(&seller(), id).unwrap();
            ids.push((id, *amount));
        }

        for (round, (id, amount)) in ids.iter().enumerate() {
            if let Some(Some(n)) = failures.get(round) {
                platform.bank_mut().fail_after(*n);
            }
            let _ = platform.pay_invoice(&buyer(), *id, *amount);
            platform.bank_mut().stop_failing();
        }

        let paid: Amount = ids
            .iter()
            .filter(|(id, _)| platform.invoice(*id).unwrap().unwrap().status == InvoiceStatus::Paid)
            .map(|(_, amount)| *amount)
            .sum();
        let bank = platform.bank();
        prop_assert_eq!(bank.balance_of(&token(), &seller()), paid);
        prop_assert_eq!(bank.balance_of(&token(), &buyer()), total - paid);
        prop_assert_eq!(bank.custody_of(&token()), 0);
    }
}
