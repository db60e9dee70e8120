//! End-to-end scenarios against a single domain

use gateway::config::ReserveConfig;
use gateway::{AdminCommand, Config, InboundDelivery, Ledger, Submission};
use message_bus::{CreditTransfer, DeliveryEnvelope};
use proptest::prelude::*;
use protocol_core::{
    Address, Capability, DomainId, Error, MessageId, MessageStatus, MessageType, ProtocolEvent,
};

const RESERVE: u128 = 1_000_000_000;

fn config(domain: u32) -> Config {
    let mut config = Config::default();
    config.domain = domain;
    config.reserves.push(ReserveConfig {
        asset: "USD".into(),
        amount: RESERVE.to_string(),
    });
    config
}

fn ledger() -> Ledger {
    Ledger::bootstrap(&config(1)).unwrap().0
}

fn transfer(amount: u128) -> CreditTransfer {
    CreditTransfer {
        debtor: Address::derive("bank-a"),
        creditor: Address::derive("bank-b"),
        asset: Address::derive("USD"),
        amount,
        instruction_id: [9u8; 32],
    }
}

fn submission(amount: u128) -> Submission {
    Submission::new(MessageType::credit_transfer(), transfer(amount).encode(), 1)
}

#[test]
fn test_credit_transfer_completes() {
    let mut ledger = ledger();
    let admin = ledger.identities().admin;
    let payload = transfer(100).encode();
    assert_eq!(payload.len(), 180);

    let receipt = ledger
        .submit_message(
            admin,
            Submission::new(MessageType::credit_transfer(), payload, 1),
        )
        .unwrap();

    let completions: Vec<_> = ledger.events().completions().collect();
    assert_eq!(completions.len(), 1);
    match completions[0] {
        ProtocolEvent::MessageCompleted {
            message_id,
            settlement_id,
            amount,
            ..
        } => {
            assert_eq!(*message_id, receipt.message_id);
            assert!(!settlement_id.is_zero());
            assert_eq!(Some(*settlement_id), receipt.settlement_id);
            assert_eq!(*amount, 100);
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(
        ledger.record(&receipt.message_id).unwrap().status,
        MessageStatus::Completed
    );
    assert!(ledger.is_processed(&MessageType::credit_transfer(), &receipt.message_id));
}

#[test]
fn test_resubmission_is_rejected() {
    let mut ledger = ledger();
    let admin = ledger.identities().admin;
    let first = ledger.submit_message(admin, submission(100)).unwrap();
    let processed = ledger.processed_count(&MessageType::credit_transfer());
    let events = ledger.events().len();

    let err = ledger.submit_message(admin, submission(100)).unwrap_err();

    assert_eq!(err, Error::DuplicateMessage(first.message_id));
    assert_eq!(ledger.processed_count(&MessageType::credit_transfer()), processed);
    assert_eq!(ledger.events().len(), events);
    assert_eq!(ledger.settlement().settlement_count(), 1);
}

#[test]
fn test_zero_amount_rejected_without_settlement() {
    let mut ledger = ledger();
    let admin = ledger.identities().admin;
    let events = ledger.events().len();

    let err = ledger.submit_message(admin, submission(0)).unwrap_err();

    assert!(matches!(err, Error::InvalidAmount(_)));
    assert_eq!(ledger.events().len(), events);
    assert_eq!(ledger.settlement().settlement_count(), 0);
    assert_eq!(ledger.records().count(), 0);
    assert_eq!(
        ledger.settlement().pool().available(&Address::derive("USD")),
        RESERVE
    );
}

#[test]
fn test_short_payload_rejected() {
    let mut ledger = ledger();
    let admin = ledger.identities().admin;
    let mut payload = transfer(100).encode();
    payload.pop();

    let err = ledger
        .submit_message(
            admin,
            Submission::new(MessageType::credit_transfer(), payload, 1),
        )
        .unwrap_err();

    assert_eq!(
        err,
        Error::InvalidPayloadLength {
            expected: 180,
            actual: 179
        }
    );
    assert_eq!(ledger.records().count(), 0);
}

#[test]
fn test_unknown_message_type_rejected() {
    let mut ledger = ledger();
    let admin = ledger.identities().admin;

    let err = ledger
        .submit_message(
            admin,
            Submission::new(MessageType::new("camt.056"), transfer(100).encode(), 1),
        )
        .unwrap_err();

    assert_eq!(err, Error::UnknownMessageType(MessageType::new("camt.056")));
    assert_eq!(ledger.records().count(), 0);
}

#[test]
fn test_undeclared_origin_never_dispatched() {
    let mut ledger = ledger();
    let relay = ledger.identities().relay;
    let events = ledger.events().len();
    let payload = DeliveryEnvelope {
        message_id: MessageId::from_bytes([5; 32]),
        message_type: MessageType::credit_transfer(),
        origin_domain: DomainId(2),
        submitter: Address::derive("bank-a"),
        body: transfer(100).encode(),
    }
    .encode()
    .unwrap();

    let err = ledger
        .receive_message(
            relay,
            InboundDelivery {
                source_domain: DomainId(2),
                sender: Address::derive("domain-2/router"),
                payload,
                proof: Vec::new(),
            },
        )
        .unwrap_err();

    assert!(matches!(err, Error::UnauthorizedOrigin { domain: 2, .. }));
    assert_eq!(ledger.processed_count(&MessageType::credit_transfer()), 0);
    assert_eq!(ledger.settlement().settlement_count(), 0);
    assert_eq!(ledger.records().count(), 0);
    assert_eq!(ledger.events().len(), events);
}

#[test]
fn test_paused_handler_fails_fast_then_recovers() {
    let mut ledger = ledger();
    let ids = *ledger.identities();

    ledger
        .administer(ids.admin, AdminCommand::PauseHandler(ids.credit_transfer_handler))
        .unwrap();
    let err = ledger.submit_message(ids.admin, submission(100)).unwrap_err();
    assert!(matches!(err, Error::Paused(_)));
    assert_eq!(ledger.records().count(), 0);

    // Unpause needs Admin, not just EmergencyPause
    let guardian = Address::derive("guardian");
    ledger
        .administer(
            ids.admin,
            AdminCommand::Grant {
                account: guardian,
                capability: Capability::EmergencyPause,
            },
        )
        .unwrap();
    assert!(matches!(
        ledger.administer(guardian, AdminCommand::UnpauseHandler(ids.credit_transfer_handler)),
        Err(Error::Unauthorized {
            capability: Capability::Admin,
            ..
        })
    ));

    ledger
        .administer(ids.admin, AdminCommand::UnpauseHandler(ids.credit_transfer_handler))
        .unwrap();
    assert!(ledger.submit_message(ids.admin, submission(100)).is_ok());
}

#[test]
fn test_admin_commands_require_admin() {
    let mut ledger = ledger();
    let mallory = Address::derive("mallory");
    let events = ledger.events().len();

    let err = ledger
        .administer(
            mallory,
            AdminCommand::Grant {
                account: mallory,
                capability: Capability::Submit,
            },
        )
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Unauthorized {
            capability: Capability::Admin,
            ..
        }
    ));
    assert!(!ledger.access().has(&mallory, Capability::Submit));
    assert_eq!(ledger.events().len(), events);
}

#[test]
fn test_granted_submitter_uses_own_identity() {
    let mut ledger = ledger();
    let admin = ledger.identities().admin;
    let bank = Address::derive("bank-a");
    ledger
        .administer(
            admin,
            AdminCommand::Grant {
                account: bank,
                capability: Capability::Submit,
            },
        )
        .unwrap();

    // Same payload and nonce from two submitters: distinct messages
    let by_admin = ledger.submit_message(admin, submission(100)).unwrap();
    let by_bank = ledger.submit_message(bank, submission(100)).unwrap();

    assert_ne!(by_admin.message_id, by_bank.message_id);
    assert_eq!(ledger.record(&by_bank.message_id).unwrap().submitter, bank);
}

#[test]
fn test_next_nonce_is_a_new_message() {
    let mut ledger = ledger();
    let admin = ledger.identities().admin;
    let first = ledger.submit_message(admin, submission(100)).unwrap();

    let mut again = submission(100);
    again.nonce = 2;
    let second = ledger.submit_message(admin, again).unwrap();

    assert_ne!(first.message_id, second.message_id);
    assert_eq!(ledger.processed_count(&MessageType::credit_transfer()), 2);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_amounts_above_maximum_rejected(excess in 1u128..1_000_000) {
        let mut ledger = ledger();
        let admin = ledger.identities().admin;
        let amount = message_bus::handlers::credit_transfer::MAXIMUM_AMOUNT + excess;

        let result = ledger.submit_message(admin, submission(amount));

        prop_assert!(matches!(result, Err(Error::InvalidAmount(_))));
        prop_assert_eq!(ledger.settlement().settlement_count(), 0);
    }

    #[test]
    fn prop_amounts_within_bounds_settle(amount in 1u128..=RESERVE) {
        let mut ledger = ledger();
        let admin = ledger.identities().admin;

        let receipt = ledger.submit_message(admin, submission(amount)).unwrap();

        prop_assert_eq!(receipt.status, MessageStatus::Completed);
        prop_assert_eq!(
            ledger
                .settlement()
                .pool()
                .balance_of(&Address::derive("USD"), &Address::derive("bank-b")),
            amount
        );
    }
}
