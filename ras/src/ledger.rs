//! Pending-transaction ledger: one entry per in-flight request, keyed by
//! sequence number, each with its own completion channel.

use std::collections::HashMap;
use std::time::Duration;

use h323_messages::{MessageKind, RasMessage};
use h323_types::SequenceNumber;
use tokio::sync::mpsc;

use crate::request::RequestClass;

/// What a waiting transaction can be told.
#[derive(Debug)]
pub(crate) enum LedgerEvent {
    /// A correlated confirm or reject.
    Response(RasMessage),
    /// The gatekeeper sent RequestInProgress; wait this much longer.
    InProgress(Duration),
    /// The engine is shutting down.
    Aborted,
}

/// Result of offering an inbound response to the ledger.
#[derive(Debug, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// No transaction is waiting on this sequence number.
    Unknown,
    /// A transaction is waiting but this message kind cannot answer it.
    WrongKind,
}

struct PendingEntry {
    class: RequestClass,
    tx: mpsc::UnboundedSender<LedgerEvent>,
}

pub struct TransactionLedger {
    entries: HashMap<SequenceNumber, PendingEntry>,
    next: SequenceNumber,
}

impl TransactionLedger {
    pub fn new(first: SequenceNumber) -> Self {
        Self {
            entries: HashMap::new(),
            next: first,
        }
    }

    /// Start from a random sequence number so a restarted endpoint does not
    /// reuse numbers a gatekeeper may still associate with old requests.
    pub fn with_random_start() -> Self {
        Self::new(SequenceNumber::new(rand::random::<u16>()))
    }

    /// Allocate a sequence number not held by any pending transaction.
    pub fn allocate(&mut self) -> SequenceNumber {
        loop {
            let seq = self.next;
            self.next = seq.next();
            if !self.entries.contains_key(&seq) {
                return seq;
            }
        }
    }

    /// Allocate a sequence number and open an entry for it in one step.
    pub(crate) fn open(
        &mut self,
        class: RequestClass,
    ) -> (SequenceNumber, mpsc::UnboundedReceiver<LedgerEvent>) {
        let seq = self.allocate();
        let (tx, rx) = mpsc::unbounded_channel();
        self.entries.insert(seq, PendingEntry { class, tx });
        (seq, rx)
    }

    /// Route an inbound response to the transaction waiting on its sequence
    /// number. The entry stays until its owner removes it.
    pub fn deliver(&self, message: RasMessage) -> Delivery {
        let seq = message.sequence_number();
        let Some(entry) = self.entries.get(&seq) else {
            return Delivery::Unknown;
        };
        let event = match message.kind() {
            MessageKind::RequestInProgress => {
                let delay = match &message {
                    RasMessage::RequestInProgress(rip) => rip.delay_ms,
                    _ => 0,
                };
                LedgerEvent::InProgress(Duration::from_millis(u64::from(delay)))
            }
            kind if entry.class.accepts(kind) => LedgerEvent::Response(message),
            _ => return Delivery::WrongKind,
        };
        // A closed receiver means the owner is mid-teardown; its guard removes the entry.
        let _ = entry.tx.send(event);
        Delivery::Delivered
    }

    /// Remove an entry. Returns `false` if it was already gone.
    pub fn remove(&mut self, seq: SequenceNumber) -> bool {
        self.entries.remove(&seq).is_some()
    }

    /// Tell every waiting transaction the engine is going away.
    pub fn abort_all(&self) -> usize {
        for entry in self.entries.values() {
            let _ = entry.tx.send(LedgerEvent::Aborted);
        }
        self.entries.len()
    }

    pub fn contains(&self, seq: SequenceNumber) -> bool {
        self.entries.contains_key(&seq)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for TransactionLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionLedger")
            .field("pending", &self.entries.len())
            .field("next", &self.next)
            .finish()
    }
}

impl Default for TransactionLedger {
    fn default() -> Self {
        Self::with_random_start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use h323_messages::{
        AdmissionConfirm, BandwidthConfirm, CallModel, RequestInProgress, SecurityTokens,
    };
    use h323_types::Bandwidth;
    use proptest::prelude::*;

    fn acf(seq: SequenceNumber) -> RasMessage {
        AdmissionConfirm {
            seq,
            bandwidth: Bandwidth::from_kbps(64),
            call_model: CallModel::Direct,
            dest_call_signal_address: None,
            irr_frequency: None,
            destination_info: Vec::new(),
            alternate_endpoints: Vec::new(),
            will_respond_to_irr: false,
            security: SecurityTokens::default(),
        }
        .into()
    }

    #[test]
    fn allocation_skips_numbers_in_use() {
        let mut ledger = TransactionLedger::new(SequenceNumber::new(10));
        let (first, _rx) = ledger.open(RequestClass::Admission);
        assert_eq!(first.value(), 10);
        // Force the cursor back onto the pending number.
        ledger.next = SequenceNumber::new(10);
        assert_eq!(ledger.allocate().value(), 11);
    }

    #[test]
    fn allocation_wraps_past_zero() {
        let mut ledger = TransactionLedger::new(SequenceNumber::new(u16::MAX));
        assert_eq!(ledger.allocate().value(), u16::MAX);
        assert_eq!(ledger.allocate().value(), 1);
    }

    #[test]
    fn response_reaches_its_waiter() {
        let mut ledger = TransactionLedger::new(SequenceNumber::FIRST);
        let (seq, mut rx) = ledger.open(RequestClass::Admission);
        assert_eq!(ledger.deliver(acf(seq)), Delivery::Delivered);
        assert!(matches!(rx.try_recv(), Ok(LedgerEvent::Response(_))));
        // Delivery does not remove; the owner does.
        assert!(ledger.contains(seq));
        assert!(ledger.remove(seq));
        assert!(!ledger.remove(seq));
    }

    #[test]
    fn wrong_kind_is_not_delivered() {
        let mut ledger = TransactionLedger::new(SequenceNumber::FIRST);
        let (seq, mut rx) = ledger.open(RequestClass::Admission);
        let bcf: RasMessage = BandwidthConfirm {
            seq,
            bandwidth: Bandwidth::ZERO,
            security: SecurityTokens::default(),
        }
        .into();
        assert_eq!(ledger.deliver(bcf), Delivery::WrongKind);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn unknown_sequence_is_reported() {
        let ledger = TransactionLedger::new(SequenceNumber::FIRST);
        assert_eq!(
            ledger.deliver(acf(SequenceNumber::new(77))),
            Delivery::Unknown
        );
    }

    #[test]
    fn request_in_progress_extends() {
        let mut ledger = TransactionLedger::new(SequenceNumber::FIRST);
        let (seq, mut rx) = ledger.open(RequestClass::Registration);
        let rip: RasMessage = RequestInProgress {
            seq,
            delay_ms: 1500,
            security: SecurityTokens::default(),
        }
        .into();
        ledger.deliver(rip);
        match rx.try_recv() {
            Ok(LedgerEvent::InProgress(d)) => assert_eq!(d, Duration::from_millis(1500)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn abort_all_reaches_every_waiter() {
        let mut ledger = TransactionLedger::new(SequenceNumber::FIRST);
        let (_, mut a) = ledger.open(RequestClass::Admission);
        let (_, mut b) = ledger.open(RequestClass::Disengage);
        assert_eq!(ledger.abort_all(), 2);
        assert!(matches!(a.try_recv(), Ok(LedgerEvent::Aborted)));
        assert!(matches!(b.try_recv(), Ok(LedgerEvent::Aborted)));
    }

    proptest! {
        /// Under any interleaving of opens and removes, every open number is
        /// unique among pending entries and each entry is removed exactly once.
        #[test]
        fn open_numbers_unique_and_removed_once(
            start in 1u16..=u16::MAX,
            ops in prop::collection::vec(any::<bool>(), 1..200),
        ) {
            let mut ledger = TransactionLedger::new(SequenceNumber::new(start));
            let mut open: Vec<SequenceNumber> = Vec::new();
            let mut receivers = Vec::new();
            for op in ops {
                if op || open.is_empty() {
                    let (seq, rx) = ledger.open(RequestClass::Admission);
                    prop_assert!(!open.contains(&seq));
                    open.push(seq);
                    receivers.push(rx);
                } else {
                    let seq = open.remove(0);
                    prop_assert!(ledger.remove(seq));
                    prop_assert!(!ledger.remove(seq));
                }
                prop_assert_eq!(ledger.len(), open.len());
            }
            for seq in open.drain(..) {
                prop_assert!(ledger.remove(seq));
            }
            prop_assert!(ledger.is_empty());
        }
    }
}
