//! Administrator and officer roles.

use std::collections::BTreeSet;

use common::Identity;
use serde::{Deserialize, Serialize};

use super::{RegistryError, RegistryEvent};

/// A role an operation can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Administrator,
    Officer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "the administrator",
            Role::Officer => "authorized officers",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The administrator and the officer set.
///
/// Officers can only be added. The administrator is the null identity once
/// renounced, after which no administrator check can pass again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    administrator: Identity,
    officers: BTreeSet<Identity>,
}

impl Roles {
    pub fn new(administrator: Identity) -> Self {
        Self {
            administrator,
            officers: BTreeSet::new(),
        }
    }

    /// Current administrator, null once renounced.
    pub fn administrator(&self) -> Identity {
        self.administrator
    }

    pub fn is_renounced(&self) -> bool {
        self.administrator.is_null()
    }

    pub fn is_administrator(&self, identity: Identity) -> bool {
        !identity.is_null() && identity == self.administrator
    }

    pub fn is_officer(&self, identity: Identity) -> bool {
        !identity.is_null() && self.officers.contains(&identity)
    }

    pub fn officers(&self) -> impl Iterator<Item = Identity> + '_ {
        self.officers.iter().copied()
    }

    pub fn officer_count(&self) -> usize {
        self.officers.len()
    }

    pub fn ensure_administrator(
        &self,
        caller: Identity,
        action: &'static str,
    ) -> Result<(), RegistryError> {
        if self.is_administrator(caller) {
            Ok(())
        } else {
            Err(RegistryError::Unauthorized {
                caller,
                required: Role::Administrator,
                action,
            })
        }
    }

    pub fn ensure_officer(&self, caller: Identity, action: &'static str) -> Result<(), RegistryError> {
        if self.is_officer(caller) {
            Ok(())
        } else {
            Err(RegistryError::Unauthorized {
                caller,
                required: Role::Officer,
                action,
            })
        }
    }

    // Commands

    /// Adds `officer` to the officer set.
    ///
    /// Re-adding an existing officer is accepted and still recorded.
    pub fn add_officer(
        &self,
        caller: Identity,
        officer: Identity,
    ) -> Result<RegistryEvent, RegistryError> {
        self.ensure_administrator(caller, "add officers")?;

        if officer.is_null() {
            return Err(RegistryError::InvalidIdentity { context: "officer" });
        }

        Ok(RegistryEvent::officer_added(officer))
    }

    pub fn transfer_administration(
        &self,
        caller: Identity,
        new_administrator: Identity,
    ) -> Result<RegistryEvent, RegistryError> {
        self.ensure_administrator(caller, "transfer administration")?;

        if new_administrator.is_null() {
            return Err(RegistryError::InvalidIdentity {
                context: "new administrator",
            });
        }

        Ok(RegistryEvent::administration_transferred(
            self.administrator,
            new_administrator,
        ))
    }

    /// Vacates the administrator role for good.
    pub fn renounce_administration(&self, caller: Identity) -> Result<RegistryEvent, RegistryError> {
        self.ensure_administrator(caller, "renounce administration")?;

        Ok(RegistryEvent::administration_transferred(
            self.administrator,
            Identity::NULL,
        ))
    }

    // Event application

    pub(crate) fn set_administrator(&mut self, administrator: Identity) {
        self.administrator = administrator;
    }

    pub(crate) fn insert_officer(&mut self, officer: Identity) {
        self.officers.insert(officer);
    }
}
