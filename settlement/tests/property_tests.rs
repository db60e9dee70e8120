//! Property-based tests for the settlement controller

use proptest::prelude::*;
use protocol_core::{AccessControl, Address, CallContext, Capability, EventLog, MessageId};
use settlement::{InMemoryLiquidityPool, LiquidityPool, Settlement, SettlementController};

fn setup(reserve: u128) -> (AccessControl, Address, Address, SettlementController) {
    let admin = Address::derive("admin");
    let handler = Address::derive("handler");
    let usd = Address::derive("USD");
    let mut access = AccessControl::new(admin);
    access
        .grant(&admin, handler, Capability::SettlementInvoke)
        .unwrap();
    let pool = InMemoryLiquidityPool::new().with_reserve(usd, reserve);
    (access, handler, usd, SettlementController::new(Box::new(pool)))
}

proptest! {
    /// Reserve plus credited balances never changes, whatever succeeds or fails
    #[test]
    fn prop_value_is_conserved(
        reserve in 0u128..10_000,
        amounts in prop::collection::vec(0u128..3_000, 1..20)
    ) {
        let (access, handler, usd, mut controller) = setup(reserve);
        let mut events = EventLog::new();

        for (i, amount) in amounts.iter().enumerate() {
            let mut ctx = CallContext::new(handler, &access, &mut events);
            let beneficiary = Address::derive(&format!("bank-{}", i % 3));
            let _ = controller.process_settlement(
                &mut ctx,
                MessageId::from_bytes([i as u8; 32]),
                usd,
                *amount,
                beneficiary,
            );
        }

        let credited: u128 = (0..3)
            .map(|i| controller.pool().balance_of(&usd, &Address::derive(&format!("bank-{}", i))))
            .sum();
        prop_assert_eq!(controller.pool().available(&usd) + credited, reserve);
    }

    /// The same message id moves value at most once
    #[test]
    fn prop_at_most_once_per_message(amount in 1u128..1_000, repeats in 2usize..6) {
        let (access, handler, usd, mut controller) = setup(1_000_000);
        let mut events = EventLog::new();
        let bank = Address::derive("bank");
        let id = MessageId::from_bytes([42; 32]);

        let mut ids = Vec::new();
        for _ in 0..repeats {
            let mut ctx = CallContext::new(handler, &access, &mut events);
            ids.push(controller.process_settlement(&mut ctx, id, usd, amount, bank).unwrap());
        }

        prop_assert!(ids.windows(2).all(|w| w[0] == w[1]));
        prop_assert_eq!(controller.pool().balance_of(&usd, &bank), amount);
    }
}

#[test]
fn test_zero_amount_rejected() {
    let (access, handler, usd, mut controller) = setup(100);
    let mut events = EventLog::new();
    let mut ctx = CallContext::new(handler, &access, &mut events);

    let err = controller
        .process_settlement(&mut ctx, MessageId::from_bytes([1; 32]), usd, 0, Address::derive("bank"))
        .unwrap_err();
    assert!(matches!(err, protocol_core::Error::InvalidAmount(_)));
    assert_eq!(controller.settlement_count(), 0);
}
