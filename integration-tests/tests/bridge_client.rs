//! Contract query surface: token registries feeding the amount formulas,
//! pagination, refunds and user-side sends.

use std::sync::Arc;

use coreumbridge_xrpl_relayer::amount::{
    compute_received_on_coreum, compute_received_on_xrpl, XRPL_TOKEN_DECIMALS,
};
use coreumbridge_xrpl_relayer::coreum::{
    Coin, ContractClient, CoreumToken, PendingRefund, TokenState, XrplToken,
};
use xrpl_primitives::{Currency, Value};

use integration_tests::helpers::{bridge_config, coreum_account, usd_issuer, xrpl_account};
use integration_tests::mocks::MockBridge;

fn registered_usd() -> XrplToken {
    XrplToken {
        issuer: usd_issuer(),
        currency: Currency::new("USD").unwrap(),
        coreum_denom: "uusdbridged".to_owned(),
        sending_precision: 3,
        bridging_fee: 1_000_000_000_000,
        max_holding_amount: u128::MAX,
        state: TokenState::Enabled,
    }
}

fn registered_core() -> CoreumToken {
    CoreumToken {
        denom: "ucore".to_owned(),
        decimals: 6,
        xrpl_currency: Currency::new("COR").unwrap(),
        sending_precision: 2,
        bridging_fee: 50_000,
        max_holding_amount: u128::MAX,
        state: TokenState::Enabled,
    }
}

#[test_log::test(tokio::test)]
async fn token_queries_paginate() {
    let bridge = MockBridge::new(bridge_config(3, 2));
    bridge.register_tokens(
        vec![registered_usd()],
        (0..5)
            .map(|index| CoreumToken {
                denom: format!("denom-{index}"),
                ..registered_core()
            })
            .collect(),
    );
    let client = Arc::new(bridge.client(coreum_account(1)));

    let all = client.coreum_tokens(None, None).await.unwrap();
    assert_eq!(all.len(), 5);
    let page = client.coreum_tokens(Some(2), Some(2)).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].denom, "denom-2");

    let xrpl = client.xrpl_tokens(None, None).await.unwrap();
    assert_eq!(xrpl.len(), 1);
    assert_eq!(xrpl[0].coreum_denom, "uusdbridged");
}

#[test_log::test(tokio::test)]
async fn registry_parameters_drive_the_deposit_formula() {
    let bridge = MockBridge::new(bridge_config(3, 2));
    bridge.register_tokens(vec![registered_usd()], vec![]);
    let client = Arc::new(bridge.client(coreum_account(1)));

    let token = client.xrpl_tokens(None, None).await.unwrap().remove(0);
    let deposit = Value::parse("1234.56789", false).unwrap();
    let credited = compute_received_on_coreum(
        &deposit,
        XRPL_TOKEN_DECIMALS,
        token.bridging_fee,
        token.sending_precision,
    )
    .unwrap();
    // truncate(1234.56789, 3) = 1234.567; * 10^15; - 10^12.
    assert_eq!(credited, 1_234_566_000_000_000_000);
}

#[test_log::test(tokio::test)]
async fn registry_parameters_drive_the_withdrawal_formula() {
    let bridge = MockBridge::new(bridge_config(3, 2));
    bridge.register_tokens(vec![], vec![registered_core()]);
    let client = Arc::new(bridge.client(coreum_account(1)));

    let token = client.coreum_tokens(None, None).await.unwrap().remove(0);
    let received = compute_received_on_xrpl(
        10_000_000,
        token.decimals,
        token.bridging_fee,
        token.sending_precision,
        None,
    )
    .unwrap();
    // 10.000000 - 0.05 fee, truncated at two decimals.
    assert_eq!(received, Value::parse("9.95", false).unwrap().rat().clone());
}

#[test_log::test(tokio::test)]
async fn sends_and_refunds_are_scoped_to_the_caller() {
    let bridge = MockBridge::new(bridge_config(3, 2));
    bridge.add_refund(
        coreum_account(7),
        PendingRefund {
            id: "refund-1".to_owned(),
            coin: Coin {
                denom: "uusdbridged".to_owned(),
                amount: 42,
            },
            xrpl_tx_hash: None,
        },
    );

    let owner = Arc::new(bridge.client(coreum_account(7)));
    let stranger = Arc::new(bridge.client(coreum_account(8)));
    assert_eq!(owner.pending_refunds(&coreum_account(7)).await.unwrap().len(), 1);
    assert!(stranger
        .pending_refunds(&coreum_account(8))
        .await
        .unwrap()
        .is_empty());

    owner
        .send_to_xrpl(
            &xrpl_account(0x42),
            &Coin {
                denom: "ucore".to_owned(),
                amount: 1_000_000,
            },
            None,
        )
        .await
        .unwrap();
}
