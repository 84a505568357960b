//! # Administration
//!
//! The engine is constructed with one administrator address. Only that
//! address may swap a collaborator or hand the role to someone else. The
//! collaborator slots are read once per operation, so a swap takes effect
//! for the next operation and never in the middle of one.

use std::sync::Arc;

use parking_lot::RwLock;

use covenant_compliance::{ComplianceGate, IdentityService, JurisdictionRegistry};
use covenant_core::PartyAddress;

use crate::documents::DocumentRegistry;
use crate::error::EngineError;
use crate::items::ItemRecord;
use crate::payments::PaymentProcessor;
use crate::resolver::{PolicySource, RecordSource};

/// The single privileged operator of an engine.
#[derive(Debug)]
pub struct Administrator {
    address: RwLock<PartyAddress>,
}

impl Administrator {
    /// Grant the role to `address`.
    pub fn new(address: PartyAddress) -> Self {
        Self {
            address: RwLock::new(address),
        }
    }

    /// Current administrator.
    pub fn address(&self) -> PartyAddress {
        self.address.read().clone()
    }

    /// Fail unless `caller` is the administrator.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotAdministrator`].
    pub fn require(&self, caller: &PartyAddress) -> Result<(), EngineError> {
        if *self.address.read() == *caller {
            Ok(())
        } else {
            tracing::warn!(caller = %caller, "privileged call rejected");
            Err(EngineError::NotAdministrator(caller.clone()))
        }
    }

    /// Hand the role to `next`.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotAdministrator`] unless `caller` holds the role.
    pub fn transfer(&self, caller: &PartyAddress, next: PartyAddress) -> Result<(), EngineError> {
        let mut current = self.address.write();
        if *current != *caller {
            return Err(EngineError::NotAdministrator(caller.clone()));
        }
        tracing::info!(from = %caller, to = %next, "administrator transferred");
        *current = next;
        Ok(())
    }
}

/// The external collaborators an engine is wired to.
#[derive(Clone)]
pub struct Services {
    /// Compliance predicate consulted at creation.
    pub gate: Arc<dyn ComplianceGate>,
    /// Jurisdiction activity.
    pub jurisdictions: Arc<dyn JurisdictionRegistry>,
    /// Party identity verification.
    pub identity: Arc<dyn IdentityService>,
    /// Payment dispatch.
    pub payments: Arc<dyn PaymentProcessor>,
    /// Document linking.
    pub documents: Arc<dyn DocumentRegistry>,
    /// Source of policies referenced by claims.
    pub policies: PolicySource,
    /// Source of supply-chain items.
    pub items: Arc<dyn RecordSource<ItemRecord>>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("policies", &self.policies)
            .finish_non_exhaustive()
    }
}

/// Updatable collaborator slots.
#[derive(Debug)]
pub(crate) struct ServiceSlots {
    services: RwLock<Services>,
}

impl ServiceSlots {
    pub(crate) fn new(services: Services) -> Self {
        Self {
            services: RwLock::new(services),
        }
    }

    /// Consistent copy of every slot for one operation.
    pub(crate) fn snapshot(&self) -> Services {
        self.services.read().clone()
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut Services)) {
        f(&mut self.services.write());
    }
}
