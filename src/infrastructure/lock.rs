use crate::domain::GroupId;
use crate::domain::ports::LockManager;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Process-local TTL lock table, one slot per group.
///
/// Mirrors the semantics of a cache lock: acquisition fails while a live
/// holder exists, an expired slot can be taken over, and release is
/// idempotent. The TTL is the only recovery path when a holder never
/// releases.
#[derive(Default, Clone)]
pub struct InMemoryLockManager {
    slots: Arc<Mutex<HashMap<GroupId, Instant>>>,
}

impl InMemoryLockManager {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockManager for InMemoryLockManager {
    async fn try_acquire(&self, group_id: GroupId, ttl: Duration) -> Result<bool> {
        let mut slots = self.slots.lock().expect("lock table poisoned");
        let now = Instant::now();
        match slots.get(&group_id) {
            Some(expires_at) if *expires_at > now => Ok(false),
            _ => {
                slots.insert(group_id, now + ttl);
                Ok(true)
            }
        }
    }

    async fn release(&self, group_id: GroupId) -> Result<()> {
        let mut slots = self.slots.lock().expect("lock table poisoned");
        slots.remove(&group_id);
        Ok(())
    }
}
