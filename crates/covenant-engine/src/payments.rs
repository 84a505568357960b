//! # Payment Processor
//!
//! `dispatch(payer, payee, amount, method, method_data) -> payment id`.
//! A failed dispatch aborts the enclosing operation. The engine dispatches
//! as the last step before commit, so a failure leaves nothing staged
//! behind.

use std::collections::BTreeSet;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use covenant_core::{Amount, ObligationId, PartyAddress, PaymentId};
use covenant_state::PaymentMethod;

/// What the engine asks the processor to move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Debited party.
    pub payer: PartyAddress,
    /// Credited party.
    pub payee: PartyAddress,
    /// Amount in minor units.
    pub amount: Amount,
    /// Settlement method.
    pub method: PaymentMethod,
    /// Opaque method details.
    pub method_data: String,
    /// Obligation the payment settles.
    pub obligation: ObligationId,
}

/// A dispatched payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Processor-issued id.
    pub id: PaymentId,
    /// The request that produced it.
    #[serde(flatten)]
    pub request: PaymentRequest,
}

/// Why a dispatch failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// The processor refused the payment.
    #[error("payment declined: {0}")]
    Declined(String),
    /// The processor could not be reached.
    #[error("payment processor unavailable: {0}")]
    Unavailable(String),
}

/// Moves money on the engine's behalf.
pub trait PaymentProcessor: Send + Sync {
    /// Execute a payment.
    fn dispatch(&self, request: &PaymentRequest) -> Result<PaymentId, PaymentError>;

    /// Look up a dispatched payment, if the processor keeps records.
    fn payment(&self, _id: &PaymentId) -> Option<PaymentRecord> {
        None
    }
}

/// In-memory ledger of dispatched payments, kept in dispatch order.
///
/// Payers can be put on a decline list to exercise failure paths.
#[derive(Debug, Default)]
pub struct InMemoryPaymentProcessor {
    records: RwLock<Vec<PaymentRecord>>,
    declined: RwLock<BTreeSet<PartyAddress>>,
}

impl InMemoryPaymentProcessor {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decline every future payment from `payer`.
    pub fn decline_payer(&self, payer: PartyAddress) {
        self.declined.write().insert(payer);
    }

    /// Lift a decline.
    pub fn accept_payer(&self, payer: &PartyAddress) {
        self.declined.write().remove(payer);
    }

    /// Every dispatched payment, oldest first.
    pub fn all(&self) -> Vec<PaymentRecord> {
        self.records.read().clone()
    }
}

impl PaymentProcessor for InMemoryPaymentProcessor {
    fn dispatch(&self, request: &PaymentRequest) -> Result<PaymentId, PaymentError> {
        if self.declined.read().contains(&request.payer) {
            return Err(PaymentError::Declined(format!(
                "payer {} is on the decline list",
                request.payer
            )));
        }
        let id = PaymentId::new();
        self.records.write().push(PaymentRecord {
            id,
            request: request.clone(),
        });
        tracing::debug!(payment = %id, payer = %request.payer, payee = %request.payee, amount = %request.amount, "payment dispatched");
        Ok(id)
    }

    fn payment(&self, id: &PaymentId) -> Option<PaymentRecord> {
        self.records.read().iter().find(|r| &r.id == id).cloned()
    }
}
