// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory registry of active conversations.
//!
//! Maps each user to the order they are currently filling in, and hands out
//! per-user async locks so that events from one user are processed strictly
//! one at a time while different users proceed in parallel.

use std::sync::Arc;

use dashmap::DashMap;
use intake_core::{OrderId, UserId};
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockTable = DashMap<UserId, Arc<Mutex<()>>>;

/// Concurrency-safe `user -> active order` map plus per-user locks.
///
/// Not durable: after a restart it is rebuilt with [`SessionRegistry::restore`].
#[derive(Debug, Default)]
pub struct SessionRegistry {
    active: DashMap<UserId, OrderId>,
    locks: Arc<LockTable>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The order the user is currently working on.
    pub fn get(&self, user: UserId) -> Option<OrderId> {
        self.active.get(&user).map(|entry| *entry)
    }

    /// Point the user at `order_id`, returning the order it replaces.
    pub fn insert(&self, user: UserId, order_id: OrderId) -> Option<OrderId> {
        self.active.insert(user, order_id)
    }

    /// End the user's session.
    pub fn remove(&self, user: UserId) -> Option<OrderId> {
        self.active.remove(&user).map(|(_, order_id)| order_id)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Acquire the user's event lock. Held for the whole handling of one event.
    pub async fn lock(&self, user: UserId) -> UserLock {
        // Clone the Arc out so the shard guard is released before awaiting.
        let lock = self.locks.entry(user).or_default().value().clone();
        UserLock {
            user,
            guard: Some(lock.lock_owned().await),
            locks: self.locks.clone(),
        }
    }

    /// Number of users with a lock currently held or awaited.
    pub fn locked_users(&self) -> usize {
        self.locks.len()
    }

    /// Load sessions recovered from storage. Existing entries win.
    pub fn restore(&self, sessions: impl IntoIterator<Item = (UserId, OrderId)>) -> usize {
        let mut restored = 0;
        for (user, order_id) in sessions {
            if let dashmap::mapref::entry::Entry::Vacant(slot) = self.active.entry(user) {
                slot.insert(order_id);
                restored += 1;
            }
        }
        restored
    }
}

/// Exclusive hold on one user's events. The user's lock entry is dropped
/// from the table once nobody holds or awaits it.
#[derive(Debug)]
pub struct UserLock {
    user: UserId,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockTable>,
}

impl UserLock {
    pub fn user(&self) -> UserId {
        self.user
    }
}

impl Drop for UserLock {
    fn drop(&mut self) {
        // Release the mutex first so only the table's Arc is left when idle.
        drop(self.guard.take());
        self.locks
            .remove_if(&self.user, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn insert_replaces_and_reports_previous() {
        let registry = SessionRegistry::new();
        assert_eq!(registry.insert(UserId(1), OrderId(1)), None);
        assert_eq!(registry.insert(UserId(1), OrderId(2)), Some(OrderId(1)));
        assert_eq!(registry.get(UserId(1)), Some(OrderId(2)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_clears_entry() {
        let registry = SessionRegistry::new();
        registry.insert(UserId(1), OrderId(3));
        assert_eq!(registry.remove(UserId(1)), Some(OrderId(3)));
        assert_eq!(registry.get(UserId(1)), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn restore_keeps_live_entries() {
        let registry = SessionRegistry::new();
        registry.insert(UserId(1), OrderId(10));
        let restored = registry.restore([(UserId(1), OrderId(4)), (UserId(2), OrderId(5))]);
        assert_eq!(restored, 1);
        assert_eq!(registry.get(UserId(1)), Some(OrderId(10)));
        assert_eq!(registry.get(UserId(2)), Some(OrderId(5)));
    }

    #[tokio::test]
    async fn same_user_lock_is_exclusive() {
        let registry = Arc::new(SessionRegistry::new());
        let guard = registry.lock(UserId(1)).await;

        let contender = {
            let registry = registry.clone();
            tokio::spawn(async move {
                let _guard = registry.lock(UserId(1)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn lock_entries_are_dropped_when_idle() {
        let registry = Arc::new(SessionRegistry::new());
        for user in 0..100 {
            drop(registry.lock(UserId(user)).await);
        }
        assert_eq!(registry.locked_users(), 0);

        let held = registry.lock(UserId(1)).await;
        let waiter = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.lock(UserId(1)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(held);
        assert_eq!(registry.locked_users(), 1, "entry kept while a waiter holds it");

        let second = waiter.await.unwrap();
        assert_eq!(second.user(), UserId(1));
        drop(second);
        assert_eq!(registry.locked_users(), 0);
    }

    #[tokio::test]
    async fn different_users_do_not_block() {
        let registry = SessionRegistry::new();
        let _a = registry.lock(UserId(1)).await;
        let b = tokio::time::timeout(Duration::from_millis(100), registry.lock(UserId(2))).await;
        assert!(b.is_ok());
    }
}
