//! Protocol coordinator
//!
//! The [`Ledger`] owns every component of one domain and runs each command
//! as a single atomic unit. Components that grow with traffic (event log,
//! registry, processed-message sets, settlements) journal the writes of the
//! open command and undo them if any step fails, so a rejected message
//! leaves no record, no settlement, no processed-set entry and no event
//! behind. Configuration writes (grants, schemas, routes, pause switches)
//! check every precondition before they write, so an admin command can only
//! fail before it changes anything.
//!
//! # Pipeline
//!
//! ```text
//! submit ─► registry ─► schema ─► processor ─► handler ─► settlement
//!                                                 │
//!                       (remote destination) ─────┴─► router ─► delivery
//!
//! receive ─► router (authenticate) ─► registry ─► schema ─► processor ─► ...
//! ```
//!
//! The delivery hand-off is the last fallible step of a routed submission:
//! once the delivery service accepted a payload it cannot be recalled.

use crate::config::Config;
use crate::types::{AdminCommand, Identities, InboundDelivery, Submission, SubmissionReceipt};
use ledger_core::{derive_message_id, MessageRecord, MessageRegistry};
use message_bus::handlers::credit_transfer::FIELDS as CREDIT_TRANSFER_FIELDS;
use message_bus::{
    CreditTransferHandler, DeliveryEnvelope, DeliveryService, LoopbackDelivery, MessageProcessor,
    MessageRouter, OriginVerifier, Outbox, RequiredAction, RouteRequest, SignedRelay,
    TrustedRelay,
};
use protocol_core::{
    AccessControl, Address, CallContext, Capability, DomainId, Error, EventLog, EventRecord,
    MessageId, MessageProtocol, MessageStatus, MessageType, ProtocolEvent, ReentrancyGuard,
    Result, SettlementId, Transactional,
};
use settlement::{InMemoryLiquidityPool, LiquidityPool, SettlementController};
use tracing::{debug, info, warn};

/// Schema descriptor registered for credit transfers at bootstrap
const CREDIT_TRANSFER_DESCRIPTOR: &[u8] = b"urn:iso:std:iso:20022:tech:xsd:pacs.008.001.08";

/// Components that receive a call context
#[derive(Debug)]
struct Core {
    protocol: MessageProtocol,
    registry: MessageRegistry,
    processor: MessageProcessor,
    settlement: SettlementController,
    router: MessageRouter,
}

/// Everything a command may change
#[derive(Debug)]
struct State {
    access: AccessControl,
    events: EventLog,
    core: Core,
}

/// Protocol coordinator for one domain
#[derive(Debug)]
pub struct Ledger {
    identities: Identities,
    state: State,
    guard: ReentrancyGuard,
}

impl Ledger {
    /// Create a coordinator.
    ///
    /// Grants the component capabilities (processor, credit-transfer
    /// handler, delivery service) and records the grants as events.
    pub fn new(
        identities: Identities,
        domain: DomainId,
        pool: Box<dyn LiquidityPool>,
        delivery: Box<dyn DeliveryService>,
        verifier: Box<dyn OriginVerifier>,
    ) -> Result<Self> {
        let mut access = AccessControl::new(identities.admin);
        let mut events = EventLog::new();
        for (account, capability) in [
            (identities.processor, Capability::ProcessorInvoke),
            (identities.credit_transfer_handler, Capability::SettlementInvoke),
            (identities.relay, Capability::Deliver),
        ] {
            access.grant(&identities.admin, account, capability)?;
            events.emit(ProtocolEvent::CapabilityGranted {
                account,
                capability,
            });
        }

        let core = Core {
            protocol: MessageProtocol::new(),
            registry: MessageRegistry::new(domain),
            processor: MessageProcessor::new(identities.processor),
            settlement: SettlementController::new(pool),
            router: MessageRouter::new(identities.router, domain, delivery, verifier),
        };

        info!(%domain, router = %identities.router, "ledger created");
        Ok(Self {
            identities,
            state: State {
                access,
                events,
                core,
            },
            guard: ReentrancyGuard::new("ledger"),
        })
    }

    /// Build a domain from configuration: loopback delivery, configured
    /// relay verification, funded pool and the credit-transfer pipeline.
    ///
    /// Returns the ledger and the outbox its delivery service writes to.
    pub fn bootstrap(config: &Config) -> crate::Result<(Self, Outbox)> {
        let domain = config.domain_id();
        for principal in config.default_principals() {
            warn!(
                %domain,
                principal,
                "principal uses its well-known default address, set it in the config file or environment"
            );
        }
        let identities = Identities::for_domain(
            domain,
            config.admin_address()?,
            config.relay_address()?,
        );

        let mut pool = InMemoryLiquidityPool::new();
        for (asset, amount) in config.initial_reserves()? {
            pool.fund(asset, amount);
        }

        let delivery = LoopbackDelivery::new(domain, config.fee_schedule());
        let outbox = delivery.outbox();
        let verifier: Box<dyn OriginVerifier> = match config.relay_key()? {
            Some(key) => Box::new(SignedRelay::new(key)),
            None => {
                warn!(%domain, "no relay public key configured, relay proofs are not checked");
                Box::new(TrustedRelay)
            }
        };

        let mut ledger = Self::new(
            identities,
            domain,
            Box::new(pool),
            Box::new(delivery),
            verifier,
        )?;
        ledger.install_credit_transfer(config.amount_bounds()?)?;
        Ok((ledger, outbox))
    }

    /// Register the credit-transfer schema and handler (as the admin)
    pub fn install_credit_transfer(&mut self, bounds: message_bus::AmountBounds) -> Result<()> {
        let admin = self.identities.admin;
        let handler = CreditTransferHandler::new(self.identities.credit_transfer_handler, bounds);
        self.administer(
            admin,
            AdminCommand::RegisterMessageFormat {
                message_type: MessageType::credit_transfer(),
                required_fields: CREDIT_TRANSFER_FIELDS.to_vec(),
                descriptor: bytes::Bytes::from_static(CREDIT_TRANSFER_DESCRIPTOR),
            },
        )?;
        self.administer(admin, AdminCommand::InstallHandler(Box::new(handler)))
    }

    /// Run `op` against the state, undoing its writes on failure
    fn transact<T>(&mut self, op: impl FnOnce(&mut State) -> Result<T>) -> Result<T> {
        self.guard.enter()?;
        self.state.begin();
        let result = op(&mut self.state);
        match &result {
            Ok(_) => self.state.commit(),
            Err(e) => {
                warn!(error = %e, kind = e.kind().as_str(), "command rolled back");
                self.state.rollback();
            }
        }
        self.guard.exit();
        result
    }

    /// Submit a message from `caller` (requires `Submit`)
    pub fn submit_message(
        &mut self,
        caller: Address,
        submission: Submission,
    ) -> Result<SubmissionReceipt> {
        self.transact(|state| {
            let mut ctx = CallContext::new(caller, &state.access, &mut state.events);
            state.core.submit(&mut ctx, submission)
        })
    }

    /// Accept an inbound delivery from the delivery service (requires `Deliver`)
    pub fn receive_message(
        &mut self,
        caller: Address,
        delivery: InboundDelivery,
    ) -> Result<SubmissionReceipt> {
        self.transact(|state| {
            let mut ctx = CallContext::new(caller, &state.access, &mut state.events);
            state.core.receive(&mut ctx, delivery)
        })
    }

    /// Record the outcome of a routed message (requires `Deliver` or `Admin`)
    pub fn acknowledge_delivery(
        &mut self,
        caller: Address,
        message_id: MessageId,
        delivered: bool,
    ) -> Result<MessageStatus> {
        self.transact(|state| {
            let mut ctx = CallContext::new(caller, &state.access, &mut state.events);
            state.core.acknowledge(&mut ctx, message_id, delivered)
        })
    }

    /// Apply an administrative command
    pub fn administer(&mut self, caller: Address, command: AdminCommand) -> Result<()> {
        let label = command.label();
        self.transact(|state| state.administer(caller, command))?;
        debug!(command = label, %caller, "admin command applied");
        Ok(())
    }

    /// Delivery fee the router would charge for a remote submission by `caller`
    pub fn quote_submission(&self, caller: Address, submission: &Submission) -> Result<u128> {
        let domain = self.domain();
        let destination = submission
            .destination
            .filter(|d| *d != domain)
            .ok_or_else(|| Error::MissingDestination(submission.message_type.clone()))?;
        let envelope = DeliveryEnvelope {
            message_id: derive_message_id(
                domain,
                &caller,
                &submission.message_type,
                &submission.payload,
                submission.nonce,
            ),
            message_type: submission.message_type.clone(),
            origin_domain: domain,
            submitter: caller,
            body: submission.payload.clone(),
        };
        self.state.core.router.quote(destination, &envelope)
    }

    /// Component addresses
    pub fn identities(&self) -> &Identities {
        &self.identities
    }

    /// Local domain
    pub fn domain(&self) -> DomainId {
        self.state.core.registry.domain()
    }

    /// Message record
    pub fn record(&self, message_id: &MessageId) -> Option<&MessageRecord> {
        self.state.core.registry.get_record(message_id)
    }

    /// Message records in creation order
    pub fn records(&self) -> impl Iterator<Item = &MessageRecord> {
        self.state.core.registry.records()
    }

    /// Audit log
    pub fn events(&self) -> &EventLog {
        &self.state.events
    }

    /// Events after a sequence number
    pub fn events_since(&self, sequence: u64) -> &[EventRecord] {
        self.state.events.since(sequence)
    }

    /// Capability table
    pub fn access(&self) -> &AccessControl {
        &self.state.access
    }

    /// Schema registry
    pub fn protocol(&self) -> &MessageProtocol {
        &self.state.core.protocol
    }

    /// Message processor
    pub fn processor(&self) -> &MessageProcessor {
        &self.state.core.processor
    }

    /// Message router
    pub fn router(&self) -> &MessageRouter {
        &self.state.core.router
    }

    /// Settlement controller
    pub fn settlement(&self) -> &SettlementController {
        &self.state.core.settlement
    }

    /// Whether the handler registered for `message_type` has processed `message_id`
    pub fn is_processed(&self, message_type: &MessageType, message_id: &MessageId) -> bool {
        let processor = &self.state.core.processor;
        processor
            .handler_for(message_type)
            .ok()
            .and_then(|address| processor.handler(&address))
            .map(|handler| handler.is_processed(message_id))
            .unwrap_or(false)
    }

    /// Size of the processed set of the handler registered for `message_type`
    pub fn processed_count(&self, message_type: &MessageType) -> usize {
        let processor = &self.state.core.processor;
        processor
            .handler_for(message_type)
            .ok()
            .and_then(|address| processor.handler(&address))
            .map(|handler| handler.processed_count())
            .unwrap_or(0)
    }
}

impl Transactional for State {
    fn begin(&mut self) {
        self.events.begin();
        self.core.registry.begin();
        self.core.processor.begin();
        self.core.settlement.begin();
    }

    fn commit(&mut self) {
        self.events.commit();
        self.core.registry.commit();
        self.core.processor.commit();
        self.core.settlement.commit();
    }

    fn rollback(&mut self) {
        self.core.settlement.rollback();
        self.core.processor.rollback();
        self.core.registry.rollback();
        self.events.rollback();
    }
}

impl State {
    fn administer(&mut self, caller: Address, command: AdminCommand) -> Result<()> {
        let State {
            access,
            events,
            core,
        } = self;

        match command {
            AdminCommand::Grant {
                account,
                capability,
            } => {
                if access.grant(&caller, account, capability)? {
                    info!(%account, ?capability, "capability granted");
                    events.emit(ProtocolEvent::CapabilityGranted {
                        account,
                        capability,
                    });
                }
                Ok(())
            }
            AdminCommand::Revoke {
                account,
                capability,
            } => {
                if access.revoke(&caller, &account, capability)? {
                    info!(%account, ?capability, "capability revoked");
                    events.emit(ProtocolEvent::CapabilityRevoked {
                        account,
                        capability,
                    });
                }
                Ok(())
            }
            AdminCommand::RegisterMessageFormat {
                message_type,
                required_fields,
                descriptor,
            } => core.protocol.register_message_format(
                &mut CallContext::new(caller, access, events),
                message_type,
                required_fields,
                descriptor,
            ),
            AdminCommand::InstallHandler(handler) => core
                .processor
                .install_handler(&mut CallContext::new(caller, access, events), handler),
            AdminCommand::RegisterMessageHandler {
                message_type,
                handler,
            } => core.processor.register_message_handler(
                &mut CallContext::new(caller, access, events),
                message_type,
                handler,
            ),
            AdminCommand::SetRequiredAction {
                message_type,
                action,
            } => core.processor.set_required_action(
                &mut CallContext::new(caller, access, events),
                message_type,
                action,
            ),
            AdminCommand::RegisterTarget {
                handler,
                domain,
                route,
            } => core.router.register_target(
                &mut CallContext::new(caller, access, events),
                handler,
                domain,
                route,
            ),
            AdminCommand::SetTrustedOrigin {
                domain,
                sender,
                trusted,
            } => core.router.set_trusted_origin(
                &mut CallContext::new(caller, access, events),
                domain,
                sender,
                trusted,
            ),
            AdminCommand::PauseHandler(handler) => core
                .processor
                .pause_handler(&mut CallContext::new(caller, access, events), &handler)
                .map(drop),
            AdminCommand::UnpauseHandler(handler) => core
                .processor
                .unpause_handler(&mut CallContext::new(caller, access, events), &handler)
                .map(drop),
            AdminCommand::PauseRouter => core
                .router
                .pause(&mut CallContext::new(caller, access, events))
                .map(drop),
            AdminCommand::UnpauseRouter => core
                .router
                .unpause(&mut CallContext::new(caller, access, events))
                .map(drop),
        }
    }
}

impl Core {
    fn submit(
        &mut self,
        ctx: &mut CallContext<'_>,
        submission: Submission,
    ) -> Result<SubmissionReceipt> {
        ctx.require(Capability::Submit)?;
        let Submission {
            message_type,
            payload,
            nonce,
            destination,
            fee,
        } = submission;

        let local = self.registry.domain();
        let remote = destination.filter(|d| *d != local);
        if remote.is_none()
            && self.processor.required_action(&message_type) == RequiredAction::SettleAndRoute
        {
            return Err(Error::MissingDestination(message_type));
        }

        let message_id = self
            .registry
            .create_record(message_type.clone(), ctx.caller, &payload, nonce)?;
        let settlement_id = self.settle(ctx, message_id, &message_type, &payload)?;

        let (status, delivery) = match remote {
            Some(target_domain) => {
                let handler = self.processor.handler_for(&message_type)?;
                let receipt = self.router.route(
                    ctx,
                    &mut self.registry,
                    RouteRequest {
                        message_id,
                        handler,
                        target_domain,
                        payload: &payload,
                        fee,
                    },
                )?;
                (MessageStatus::Routed, Some(receipt))
            }
            None => {
                self.set_status(ctx, message_id, MessageStatus::Completed)?;
                (MessageStatus::Completed, None)
            }
        };

        info!(%message_id, %message_type, %status, "message accepted");
        Ok(SubmissionReceipt {
            message_id,
            status,
            settlement_id,
            delivery,
        })
    }

    fn receive(
        &mut self,
        ctx: &mut CallContext<'_>,
        delivery: InboundDelivery,
    ) -> Result<SubmissionReceipt> {
        let inbound = self.router.receive_message(
            ctx,
            delivery.source_domain,
            delivery.sender,
            &delivery.payload,
            &delivery.proof,
        )?;
        let envelope = inbound.envelope;
        let message_id = envelope.message_id;

        self.registry.import_record(
            message_id,
            envelope.message_type.clone(),
            envelope.submitter,
            inbound.source_domain,
            &envelope.body,
        )?;
        let settlement_id = self.settle(ctx, message_id, &envelope.message_type, &envelope.body)?;
        self.set_status(ctx, message_id, MessageStatus::Completed)?;

        info!(
            %message_id,
            message_type = %envelope.message_type,
            origin = %inbound.source_domain,
            "inbound message completed"
        );
        Ok(SubmissionReceipt {
            message_id,
            status: MessageStatus::Completed,
            settlement_id,
            delivery: None,
        })
    }

    /// Validate, mark `Validated` and dispatch to the handler
    fn settle(
        &mut self,
        ctx: &mut CallContext<'_>,
        message_id: MessageId,
        message_type: &MessageType,
        payload: &[u8],
    ) -> Result<Option<SettlementId>> {
        let fields = self.protocol.decode_and_validate(message_type, payload)?;
        debug!(%message_id, fields = fields.len(), "payload validated");
        self.set_status(ctx, message_id, MessageStatus::Validated)?;

        self.processor
            .dispatch(ctx, &mut self.settlement, message_id, message_type, payload)?;
        Ok(self
            .settlement
            .settlement(&message_id)
            .map(|record| record.settlement_id))
    }

    fn acknowledge(
        &mut self,
        ctx: &mut CallContext<'_>,
        message_id: MessageId,
        delivered: bool,
    ) -> Result<MessageStatus> {
        ctx.require_any(&[Capability::Admin, Capability::Deliver])?;

        let status = if delivered {
            MessageStatus::Completed
        } else {
            MessageStatus::Failed
        };
        let current = self.registry.record(&message_id)?.status;
        if current != MessageStatus::Routed {
            return Err(Error::InvalidTransition {
                from: current,
                to: status,
            });
        }

        self.set_status(ctx, message_id, status)?;
        info!(%message_id, delivered, "delivery acknowledged");
        Ok(status)
    }

    fn set_status(
        &mut self,
        ctx: &mut CallContext<'_>,
        message_id: MessageId,
        status: MessageStatus,
    ) -> Result<()> {
        self.registry.update_status(&message_id, status)?;
        ctx.emit(ProtocolEvent::StatusChanged { message_id, status });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use message_bus::{CreditTransfer, FeeSchedule, RouteKind, TargetRoute};
    use protocol_core::ErrorKind;

    fn usd() -> Address {
        Address::derive("USD")
    }

    fn ledger() -> Ledger {
        let mut config = Config::default();
        config.reserves.push(crate::config::ReserveConfig {
            asset: "USD".into(),
            amount: "1000000".into(),
        });
        Ledger::bootstrap(&config).unwrap().0
    }

    fn transfer(amount: u128) -> Vec<u8> {
        CreditTransfer {
            debtor: Address::derive("bank-a"),
            creditor: Address::derive("bank-b"),
            asset: usd(),
            amount,
            instruction_id: [4u8; 32],
        }
        .encode()
    }

    #[test]
    fn test_bootstrap_grants_components() {
        let ledger = ledger();
        let ids = *ledger.identities();
        assert!(ledger.access().has(&ids.processor, Capability::ProcessorInvoke));
        assert!(ledger
            .access()
            .has(&ids.credit_transfer_handler, Capability::SettlementInvoke));
        assert!(ledger.access().has(&ids.relay, Capability::Deliver));
        assert!(ledger.protocol().is_registered(&MessageType::credit_transfer()));
        assert_eq!(
            ledger.processor().handler_for(&MessageType::credit_transfer()),
            Ok(ids.credit_transfer_handler)
        );
    }

    #[test]
    fn test_local_submission_completes() {
        let mut ledger = ledger();
        let admin = ledger.identities().admin;
        let receipt = ledger
            .submit_message(
                admin,
                Submission::new(MessageType::credit_transfer(), transfer(100), 1),
            )
            .unwrap();

        assert_eq!(receipt.status, MessageStatus::Completed);
        assert!(receipt.delivery.is_none());
        assert!(receipt.settlement_id.is_some_and(|id| !id.is_zero()));
        let record = ledger.record(&receipt.message_id).unwrap();
        assert_eq!(record.status, MessageStatus::Completed);
        assert_eq!(
            ledger
                .settlement()
                .pool()
                .balance_of(&usd(), &Address::derive("bank-b")),
            100
        );
        assert_eq!(ledger.events().completions().count(), 1);
    }

    #[test]
    fn test_failed_submission_leaves_no_trace() {
        let mut ledger = ledger();
        let admin = ledger.identities().admin;
        let before = ledger.events().len();

        // More than the pool holds
        let err = ledger
            .submit_message(
                admin,
                Submission::new(MessageType::credit_transfer(), transfer(2_000_000), 1),
            )
            .unwrap_err();

        assert!(matches!(err, Error::SettlementFailed(_)));
        assert_eq!(ledger.records().count(), 0);
        assert_eq!(ledger.events().len(), before);
        assert_eq!(ledger.processed_count(&MessageType::credit_transfer()), 0);
        assert_eq!(ledger.settlement().pool().available(&usd()), 1_000_000);
    }

    #[test]
    fn test_failure_after_settlement_is_undone() {
        let mut ledger = ledger();
        let ids = *ledger.identities();
        let earlier = ledger
            .submit_message(
                ids.admin,
                Submission::new(MessageType::credit_transfer(), transfer(100), 1),
            )
            .unwrap();

        let records = ledger.records().count();
        let events = ledger.events().len();
        let processed = ledger.processed_count(&MessageType::credit_transfer());
        let settlements = ledger.settlement().settlement_count();
        let bank_b = Address::derive("bank-b");

        // Settles, then fails to route: no target for domain 2
        let submission = Submission::new(MessageType::credit_transfer(), transfer(500), 2)
            .to_domain(DomainId(2), u128::MAX);
        let err = ledger
            .submit_message(ids.admin, submission.clone())
            .unwrap_err();
        assert!(matches!(err, Error::RouteNotFound { domain: 2, .. }));

        assert_eq!(ledger.records().count(), records);
        assert_eq!(ledger.events().len(), events);
        assert_eq!(
            ledger.processed_count(&MessageType::credit_transfer()),
            processed
        );
        assert_eq!(ledger.settlement().settlement_count(), settlements);
        assert_eq!(ledger.settlement().pool().balance_of(&usd(), &bank_b), 100);
        assert_eq!(ledger.settlement().pool().available(&usd()), 999_900);
        assert_eq!(
            ledger.record(&earlier.message_id).unwrap().status,
            MessageStatus::Completed
        );

        // Nothing of the failed attempt blocks a retry once the route exists
        ledger
            .administer(
                ids.admin,
                AdminCommand::RegisterTarget {
                    handler: ids.credit_transfer_handler,
                    domain: DomainId(2),
                    route: TargetRoute {
                        kind: RouteKind::Router,
                        target_address: Address::derive("domain-2/router"),
                        metadata: bytes::Bytes::new(),
                    },
                },
            )
            .unwrap();
        let receipt = ledger.submit_message(ids.admin, submission).unwrap();
        assert_eq!(receipt.status, MessageStatus::Routed);
        assert_eq!(ledger.settlement().pool().balance_of(&usd(), &bank_b), 600);
    }

    #[test]
    fn test_submit_requires_capability() {
        let mut ledger = ledger();
        let err = ledger
            .submit_message(
                Address::derive("mallory"),
                Submission::new(MessageType::credit_transfer(), transfer(100), 1),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(ledger.records().count(), 0);
    }

    #[test]
    fn test_settle_and_route_requires_destination() {
        let mut ledger = ledger();
        let admin = ledger.identities().admin;
        ledger
            .administer(
                admin,
                AdminCommand::SetRequiredAction {
                    message_type: MessageType::credit_transfer(),
                    action: RequiredAction::SettleAndRoute,
                },
            )
            .unwrap();

        let local = ledger.domain();
        let err = ledger
            .submit_message(
                admin,
                Submission::new(MessageType::credit_transfer(), transfer(100), 1)
                    .to_domain(local, 0),
            )
            .unwrap_err();
        assert_eq!(err, Error::MissingDestination(MessageType::credit_transfer()));
    }

    #[test]
    fn test_routed_submission_and_acknowledgement() {
        let mut ledger = ledger();
        let ids = *ledger.identities();
        ledger
            .administer(
                ids.admin,
                AdminCommand::RegisterTarget {
                    handler: ids.credit_transfer_handler,
                    domain: DomainId(2),
                    route: TargetRoute {
                        kind: RouteKind::Router,
                        target_address: Address::derive("domain-2/router"),
                        metadata: bytes::Bytes::new(),
                    },
                },
            )
            .unwrap();

        let submission = Submission::new(MessageType::credit_transfer(), transfer(100), 1);
        let fee = ledger
            .quote_submission(ids.admin, &submission.clone().to_domain(DomainId(2), 0))
            .unwrap();
        assert!(fee > FeeSchedule::default().base_fee);

        let receipt = ledger
            .submit_message(ids.admin, submission.to_domain(DomainId(2), fee))
            .unwrap();
        assert_eq!(receipt.status, MessageStatus::Routed);
        assert_eq!(receipt.delivery.as_ref().map(|d| d.fee), Some(fee));

        let err = ledger
            .acknowledge_delivery(Address::derive("mallory"), receipt.message_id, true)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        assert_eq!(
            ledger.acknowledge_delivery(ids.relay, receipt.message_id, true),
            Ok(MessageStatus::Completed)
        );
        assert!(matches!(
            ledger.acknowledge_delivery(ids.relay, receipt.message_id, false),
            Err(Error::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_grant_and_revoke_emit_events() {
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
        assert!(ledger.access().has(&bank, Capability::Submit));

        ledger
            .administer(
                admin,
                AdminCommand::Revoke {
                    account: bank,
                    capability: Capability::Submit,
                },
            )
            .unwrap();
        assert!(!ledger.access().has(&bank, Capability::Submit));

        let tail: Vec<_> = ledger.events().records().iter().rev().take(2).collect();
        assert!(matches!(
            tail[0].event,
            ProtocolEvent::CapabilityRevoked { account, .. } if account == bank
        ));
        assert!(matches!(
            tail[1].event,
            ProtocolEvent::CapabilityGranted { account, .. } if account == bank
        ));
    }
}
