//! Execution-environment seam
//!
//! The ledger never verifies signatures or resolves identities itself.
//! Whatever runtime embeds it attests, per action, which principals have
//! authorized the call and which accounts exist, and receives best-effort
//! visibility callbacks after each committed transfer.

use crate::types::AccountId;
use parking_lot::RwLock;
use std::collections::HashSet;

/// Collaborator interface supplied by the embedding runtime.
pub trait Host: Send + Sync {
    /// Whether `principal` has authorized the current action, directly or
    /// via delegated notification.
    fn is_authorized(&self, principal: &AccountId) -> bool;

    /// Whether `principal` exists at the ledger-identity level.
    fn account_exists(&self, principal: &AccountId) -> bool;

    /// Best-effort visibility hook, invoked after commit for both transfer
    /// parties. Must never abort or mutate the ledger.
    fn notify(&self, _principal: &AccountId) {}
}

/// In-process host backed by explicit allow-lists.
///
/// Embedders without a real runtime (and every test in this crate) drive
/// the ledger through one of these: accounts and authorizations are plain
/// sets, and notifications are recorded for inspection.
#[derive(Debug, Default)]
pub struct LocalHost {
    authorized: RwLock<HashSet<AccountId>>,
    accounts: RwLock<HashSet<AccountId>>,
    notified: RwLock<Vec<AccountId>>,
}

impl LocalHost {
    /// Empty host: no accounts, no authorizations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an existing account.
    pub fn add_account(&self, id: &AccountId) {
        self.accounts.write().insert(id.clone());
    }

    /// Mark a principal as having authorized subsequent actions. The
    /// account is registered as existing as well.
    pub fn authorize(&self, id: &AccountId) {
        self.add_account(id);
        self.authorized.write().insert(id.clone());
    }

    /// Withdraw a principal's authorization.
    pub fn revoke(&self, id: &AccountId) {
        self.authorized.write().remove(id);
    }

    /// Principals notified so far, in callback order.
    pub fn notified(&self) -> Vec<AccountId> {
        self.notified.read().clone()
    }
}

impl Host for LocalHost {
    fn is_authorized(&self, principal: &AccountId) -> bool {
        self.authorized.read().contains(principal)
    }

    fn account_exists(&self, principal: &AccountId) -> bool {
        self.accounts.read().contains(principal)
    }

    fn notify(&self, principal: &AccountId) {
        self.notified.write().push(principal.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_implies_existence() {
        let host = LocalHost::new();
        let alice = AccountId::new("alice");

        assert!(!host.account_exists(&alice));
        host.authorize(&alice);
        assert!(host.account_exists(&alice));
        assert!(host.is_authorized(&alice));

        host.revoke(&alice);
        assert!(!host.is_authorized(&alice));
        assert!(host.account_exists(&alice));
    }

    #[test]
    fn test_notifications_are_recorded() {
        let host = LocalHost::new();
        let alice = AccountId::new("alice");
        let bob = AccountId::new("bob");

        host.notify(&alice);
        host.notify(&bob);
        assert_eq!(host.notified(), vec![alice, bob]);
    }
}
