//! Domain events fired after a magistrate transaction has been applied.
//!
//! Events are observational only. Dispatching never touches wallet state.

use std::fmt;

use tracing::debug;

use crate::core::transaction::TransactionData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MagistrateEvent {
    BusinessRegistered,
    BusinessResigned,
    BusinessUpdated,
    BridgechainRegistered,
    BridgechainResigned,
    BridgechainUpdated,
}

impl MagistrateEvent {
    pub const ALL: [MagistrateEvent; 6] = [
        MagistrateEvent::BusinessRegistered,
        MagistrateEvent::BusinessResigned,
        MagistrateEvent::BusinessUpdated,
        MagistrateEvent::BridgechainRegistered,
        MagistrateEvent::BridgechainResigned,
        MagistrateEvent::BridgechainUpdated,
    ];

    /// Name subscribers listen on.
    pub fn name(self) -> &'static str {
        match self {
            MagistrateEvent::BusinessRegistered => "business.registered",
            MagistrateEvent::BusinessResigned => "business.resigned",
            MagistrateEvent::BusinessUpdated => "business.updated",
            MagistrateEvent::BridgechainRegistered => "bridgechain.registered",
            MagistrateEvent::BridgechainResigned => "bridgechain.resigned",
            MagistrateEvent::BridgechainUpdated => "bridgechain.updated",
        }
    }
}

impl fmt::Display for MagistrateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Receives events emitted by handlers.
pub trait EventDispatcher {
    fn dispatch(&mut self, event: MagistrateEvent, data: &TransactionData);
}

/// A dispatched event together with the transaction that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedEvent {
    pub event: MagistrateEvent,
    pub data: TransactionData,
}

/// Records every event in dispatch order.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventDispatcher {
    events: Vec<DispatchedEvent>,
}

impl MemoryEventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[DispatchedEvent] {
        &self.events
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.iter().map(|e| e.event.name()).collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventDispatcher for MemoryEventDispatcher {
    fn dispatch(&mut self, event: MagistrateEvent, data: &TransactionData) {
        debug!(
            event = event.name(),
            transaction_id = data.id.as_deref().unwrap_or_default(),
            sender = %data.sender_public_key,
            "Dispatched event"
        );
        self.events.push(DispatchedEvent {
            event,
            data: data.clone(),
        });
    }
}
