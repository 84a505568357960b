//! # Obligation Terms
//!
//! Kind-specific payload carried on every obligation. The lifecycle table
//! never inspects terms; the engine reads them for time checks, payment
//! dispatch, and renewal.

use serde::{Deserialize, Serialize};

use covenant_core::{Amount, ContentDigest, Interval, ItemId, ObligationId, TemplateId, Timestamp};

use crate::kind::ObligationKind;

/// How a payment is settled. Forwarded verbatim to the payment processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Bank wire or ACH.
    #[default]
    BankTransfer,
    /// Card network.
    Card,
    /// On-ledger wallet.
    Wallet,
    /// Anything else; details live in the method data.
    Other,
}

impl PaymentMethod {
    /// The canonical `snake_case` name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BankTransfer => "bank_transfer",
            Self::Card => "card",
            Self::Wallet => "wallet",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Renewal cursor of a recurring bill.
///
/// `next_cycle` is `Some` until the bill has produced its successor, after
/// which it is cleared for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    /// Distance between consecutive due dates.
    pub interval: Interval,
    /// Due date the successor will carry.
    pub next_cycle: Option<Timestamp>,
}

/// A one-off or recurring bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillTerms {
    /// Amount owed.
    pub amount: Amount,
    /// When the bill falls due.
    pub due_date: Timestamp,
    /// Settlement method.
    pub method: PaymentMethod,
    /// Opaque method details (account reference, card token).
    pub method_data: String,
    /// Free-text description.
    pub description: String,
    /// Present on recurring bills.
    pub recurrence: Option<Recurrence>,
}

/// A recurring subscription charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionTerms {
    /// Charged per cycle.
    pub amount: Amount,
    /// Cycle length.
    pub interval: Interval,
    /// When the next cycle may be processed.
    pub next_due: Timestamp,
    /// Optional hard stop.
    pub end_date: Option<Timestamp>,
    /// Settlement method.
    pub method: PaymentMethod,
    /// Opaque method details.
    pub method_data: String,
    /// Cycles charged so far.
    pub cycles_processed: u64,
}

/// An insurance policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTerms {
    /// Product label (e.g. "health", "property").
    pub policy_type: String,
    /// Maximum payout per claim.
    pub coverage: Amount,
    /// Premium per term.
    pub premium: Amount,
    /// Start of cover.
    pub start: Timestamp,
    /// End of cover.
    pub end: Timestamp,
}

/// A claim against a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimTerms {
    /// Policy the claim is raised against. Resolved on every insurer action.
    pub policy: ObligationId,
    /// Amount claimed.
    pub amount: Amount,
    /// Claimant's account of the loss.
    pub description: String,
    /// Set when the insurer rejects.
    pub rejection_reason: Option<String>,
}

/// A multi-party contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractTerms {
    /// Human-readable title.
    pub title: String,
    /// Template the contract was instantiated from, if any.
    pub template: Option<TemplateId>,
    /// Digest of the agreed body text.
    pub body_digest: Option<ContentDigest>,
}

/// A supply-chain verification request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationTerms {
    /// Item under verification. Resolved on creation and on decision.
    pub item: ItemId,
    /// Fee paid to the verifier on approval. May be zero.
    pub fee: Amount,
    /// Verifier's findings, set on decision.
    pub findings: Option<String>,
}

/// Kind-specific payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Terms {
    /// Bill terms.
    Bill(BillTerms),
    /// Subscription terms.
    Subscription(SubscriptionTerms),
    /// Policy terms.
    Policy(PolicyTerms),
    /// Claim terms.
    Claim(ClaimTerms),
    /// Contract terms.
    Contract(ContractTerms),
    /// Verification terms.
    Verification(VerificationTerms),
}

impl Terms {
    /// The kind these terms belong to.
    pub fn kind(&self) -> ObligationKind {
        match self {
            Self::Bill(_) => ObligationKind::Bill,
            Self::Subscription(_) => ObligationKind::Subscription,
            Self::Policy(_) => ObligationKind::Policy,
            Self::Claim(_) => ObligationKind::Claim,
            Self::Contract(_) => ObligationKind::Contract,
            Self::Verification(_) => ObligationKind::Verification,
        }
    }

    /// Bill terms, if this is a bill.
    pub fn as_bill(&self) -> Option<&BillTerms> {
        match self {
            Self::Bill(t) => Some(t),
            _ => None,
        }
    }

    /// Mutable bill terms.
    pub fn as_bill_mut(&mut self) -> Option<&mut BillTerms> {
        match self {
            Self::Bill(t) => Some(t),
            _ => None,
        }
    }

    /// Subscription terms, if this is a subscription.
    pub fn as_subscription(&self) -> Option<&SubscriptionTerms> {
        match self {
            Self::Subscription(t) => Some(t),
            _ => None,
        }
    }

    /// Mutable subscription terms.
    pub fn as_subscription_mut(&mut self) -> Option<&mut SubscriptionTerms> {
        match self {
            Self::Subscription(t) => Some(t),
            _ => None,
        }
    }

    /// Policy terms, if this is a policy.
    pub fn as_policy(&self) -> Option<&PolicyTerms> {
        match self {
            Self::Policy(t) => Some(t),
            _ => None,
        }
    }

    /// Claim terms, if this is a claim.
    pub fn as_claim(&self) -> Option<&ClaimTerms> {
        match self {
            Self::Claim(t) => Some(t),
            _ => None,
        }
    }

    /// Mutable claim terms.
    pub fn as_claim_mut(&mut self) -> Option<&mut ClaimTerms> {
        match self {
            Self::Claim(t) => Some(t),
            _ => None,
        }
    }

    /// Contract terms, if this is a contract.
    pub fn as_contract(&self) -> Option<&ContractTerms> {
        match self {
            Self::Contract(t) => Some(t),
            _ => None,
        }
    }

    /// Verification terms, if this is a verification.
    pub fn as_verification(&self) -> Option<&VerificationTerms> {
        match self {
            Self::Verification(t) => Some(t),
            _ => None,
        }
    }

    /// Mutable verification terms.
    pub fn as_verification_mut(&mut self) -> Option<&mut VerificationTerms> {
        match self {
            Self::Verification(t) => Some(t),
            _ => None,
        }
    }
}
