//! Recharges from the main chain.

use sidechain_admission::{ChainParams, ErrorKind, FeeHelper, Verdict};
use sidechain_core::{
    Fixed64, Output, Payload, RechargeToSideChainPayload, TransactionBuilder,
};
use sidechain_testkit::{ChainFixture, START_HEIGHT};

const DEPOSIT: Fixed64 = Fixed64::from_coins(100);

/// A deposit covering `amount` plus the cross-chain minimum.
fn deposit_for(fixture: &ChainFixture, amount: Fixed64) -> Fixed64 {
    amount + fixture.params.min_cross_chain_tx_fee()
}

#[tokio::test]
async fn recharge_crediting_declared_amount_is_accepted() {
    let fixture = ChainFixture::new();
    let recipient = fixture.recipient.program_hash();
    let main_tx = fixture.main_chain_deposit(recipient, deposit_for(&fixture, DEPOSIT), DEPOSIT);
    let tx = fixture.recharge(&main_tx, vec![Output::native(fixture.native(), DEPOSIT, recipient)]);

    let validator = fixture.validator();
    assert_eq!(validator.check_transaction_sanity(&tx).await, Ok(()));
    assert_eq!(validator.admit(&tx).await, Verdict::Accepted);
}

#[tokio::test]
async fn replayed_main_chain_transaction_is_rejected() {
    let fixture = ChainFixture::new();
    let recipient = fixture.recipient.program_hash();
    let main_tx = fixture.main_chain_deposit(recipient, deposit_for(&fixture, DEPOSIT), DEPOSIT);
    let first = fixture.recharge(&main_tx, vec![Output::native(fixture.native(), DEPOSIT, recipient)]);
    let validator = fixture.validator();
    assert_eq!(validator.admit(&first).await, Verdict::Accepted);
    fixture.ledger.commit(first, START_HEIGHT + 1);

    // Different side-chain transaction, same main-chain deposit.
    let half = Fixed64::from_coins(50);
    let replay = fixture.recharge(
        &main_tx,
        vec![
            Output::native(fixture.native(), half, recipient),
            Output::native(fixture.native(), half, recipient),
        ],
    );
    assert_eq!(
        validator.check_transaction_context(&replay).await,
        Err(ErrorKind::RechargeToSideChain)
    );
}

#[tokio::test]
async fn credit_follows_exchange_rate() {
    let fixture = ChainFixture::with_params(ChainParams {
        exchange_rate: 0.8,
        ..ChainParams::default()
    });
    let recipient = fixture.recipient.program_hash();
    let main_tx = fixture.main_chain_deposit(recipient, deposit_for(&fixture, DEPOSIT), DEPOSIT);
    let validator = fixture.validator();

    let exchanged = Fixed64::from_raw(80_00000000);
    let tx = fixture.recharge(&main_tx, vec![Output::native(fixture.native(), exchanged, recipient)]);
    assert_eq!(validator.admit(&tx).await, Verdict::Accepted);

    let unexchanged = fixture.recharge(&main_tx, vec![Output::native(fixture.native(), DEPOSIT, recipient)]);
    assert_eq!(
        validator.admit(&unexchanged).await,
        Verdict::Rejected(ErrorKind::RechargeToSideChain)
    );
}

#[tokio::test]
async fn extra_recharge_output_breaks_total() {
    let fixture = ChainFixture::new();
    let recipient = fixture.recipient.program_hash();
    let main_tx = fixture.main_chain_deposit(recipient, deposit_for(&fixture, DEPOSIT), DEPOSIT);
    let tx = fixture.recharge(
        &main_tx,
        vec![
            Output::native(fixture.native(), DEPOSIT, recipient),
            Output::native(fixture.native(), Fixed64::from_raw(1), fixture.owner.program_hash()),
        ],
    );
    assert_eq!(
        fixture.validator().admit(&tx).await,
        Verdict::Rejected(ErrorKind::RechargeToSideChain)
    );
}

#[tokio::test]
async fn declared_amount_above_deposit_ceiling_is_rejected() {
    let fixture = ChainFixture::new();
    let recipient = fixture.recipient.program_hash();
    // The deposit leaves no room for the cross-chain fee.
    let main_tx = fixture.main_chain_deposit(recipient, DEPOSIT, DEPOSIT);
    let tx = fixture.recharge(&main_tx, vec![Output::native(fixture.native(), DEPOSIT, recipient)]);
    assert_eq!(
        fixture.validator().admit(&tx).await,
        Verdict::Rejected(ErrorKind::RechargeToSideChain)
    );
}

#[tokio::test]
async fn malformed_embedded_transaction_is_rejected() {
    let fixture = ChainFixture::new();
    let tx = TransactionBuilder::new(Payload::RechargeToSideChain(RechargeToSideChainPayload {
        merkle_proof: Default::default(),
        main_chain_transaction: vec![0xff, 0x00, 0x13].into(),
    }))
    .output(Output::native(fixture.native(), DEPOSIT, fixture.recipient.program_hash()))
    .build();
    assert_eq!(
        fixture.validator().admit(&tx).await,
        Verdict::Rejected(ErrorKind::RechargeToSideChain)
    );
}

#[tokio::test]
async fn recharge_fee_map_is_exchanged_deposit_minus_credit() {
    let fixture = ChainFixture::new();
    let recipient = fixture.recipient.program_hash();
    let deposit = deposit_for(&fixture, DEPOSIT);
    let main_tx = fixture.main_chain_deposit(recipient, deposit, DEPOSIT);
    let tx = fixture.recharge(&main_tx, vec![Output::native(fixture.native(), DEPOSIT, recipient)]);

    let fees = FeeHelper::new(fixture.ledger.clone(), fixture.params.exchange_rate);
    let map = fees.compute_fee_map(&tx).await.unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(map[&fixture.native()], fixture.params.min_cross_chain_tx_fee());
    assert_eq!(
        fees.get_fee(&tx, &fixture.native()).await,
        fixture.params.min_cross_chain_tx_fee()
    );
}

#[tokio::test]
async fn recharge_fee_map_ignores_undeclared_outputs() {
    let fixture = ChainFixture::new();
    let recipient = fixture.recipient.program_hash();
    let main_tx = fixture.main_chain_deposit(recipient, deposit_for(&fixture, DEPOSIT), DEPOSIT);
    let tx = fixture.recharge(
        &main_tx,
        vec![Output::native(fixture.native(), DEPOSIT, fixture.owner.program_hash())],
    );

    let map = fixture.validator().fee_helper().compute_fee_map(&tx).await.unwrap();
    assert!(map.is_empty());
}
