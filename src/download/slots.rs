//! Worker slots: the concurrency bound plus per-slot pacing.
//!
//! The pool holds one semaphore permit per slot. A task must hold a
//! [`SlotGuard`] while it fetches, so at most `size` fetches are in flight.
//! Each slot remembers when it was last released; [`SlotGuard::pace`] waits
//! until the configured spacing has elapsed since then, which serializes the
//! delay per slot rather than globally.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::trace;

use super::SchedulerError;

#[derive(Debug)]
struct Slot {
    index: usize,
    released_at: Option<Instant>,
}

type IdleSlots = Arc<Mutex<VecDeque<Slot>>>;

/// Fixed-size pool of worker slots.
#[derive(Debug)]
pub(crate) struct SlotPool {
    semaphore: Arc<Semaphore>,
    idle: IdleSlots,
    spacing: Duration,
    size: usize,
}

impl SlotPool {
    pub(crate) fn new(size: usize, spacing: Duration) -> Self {
        let idle = (0..size)
            .map(|index| Slot {
                index,
                released_at: None,
            })
            .collect();
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            idle: Arc::new(Mutex::new(idle)),
            spacing,
            size,
        }
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    pub(crate) fn spacing(&self) -> Duration {
        self.spacing
    }

    /// Waits for a free slot.
    pub(crate) async fn acquire(&self) -> Result<SlotGuard, SchedulerError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| SchedulerError::SlotPoolClosed)?;
        // Holding a permit guarantees an idle slot: slots go back before permits do.
        let slot = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or(SchedulerError::SlotPoolClosed)?;
        trace!(slot = slot.index, "slot acquired");
        Ok(SlotGuard {
            slot: Some(slot),
            idle: Arc::clone(&self.idle),
            spacing: self.spacing,
            _permit: permit,
        })
    }
}

/// Exclusive use of one worker slot; released on drop.
#[derive(Debug)]
pub(crate) struct SlotGuard {
    slot: Option<Slot>,
    idle: IdleSlots,
    spacing: Duration,
    _permit: OwnedSemaphorePermit,
}

impl SlotGuard {
    pub(crate) fn index(&self) -> usize {
        self.slot.as_ref().map_or(usize::MAX, |slot| slot.index)
    }

    /// Sleeps until the slot has rested for the configured spacing.
    pub(crate) async fn pace(&self) {
        let Some(released_at) = self.slot.as_ref().and_then(|slot| slot.released_at) else {
            return;
        };
        let ready = released_at + self.spacing;
        if ready > Instant::now() {
            trace!(slot = self.index(), wait_ms = (ready - Instant::now()).as_millis(), "pacing");
            tokio::time::sleep_until(ready).await;
        }
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if let Some(mut slot) = self.slot.take() {
            slot.released_at = Some(Instant::now());
            self.idle
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(slot);
        }
        // `_permit` is dropped after this body, so the slot is idle before
        // another task can acquire.
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pool_bounds_concurrent_guards() {
        let pool = SlotPool::new(2, Duration::ZERO);
        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();
        assert_ne!(a.index(), b.index());

        let third = tokio::time::timeout(Duration::from_millis(20), pool.acquire()).await;
        assert!(third.is_err(), "third slot must wait");

        drop(a);
        let c = tokio::time::timeout(Duration::from_millis(100), pool.acquire())
            .await
            .unwrap()
            .unwrap();
        assert_ne!(c.index(), b.index());
    }

    #[tokio::test]
    async fn test_first_use_is_not_paced() {
        let pool = SlotPool::new(1, Duration::from_secs(5));
        let guard = pool.acquire().await.unwrap();
        tokio::time::timeout(Duration::from_millis(100), guard.pace())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reuse_waits_for_spacing() {
        let spacing = Duration::from_millis(150);
        let pool = SlotPool::new(1, spacing);
        drop(pool.acquire().await.unwrap());

        let released = Instant::now();
        let guard = pool.acquire().await.unwrap();
        guard.pace().await;
        assert!(released.elapsed() >= spacing - Duration::from_millis(5));
    }

    #[tokio::test]
    async fn test_rested_slot_is_not_paced_again() {
        let pool = SlotPool::new(1, Duration::from_millis(50));
        drop(pool.acquire().await.unwrap());
        tokio::time::sleep(Duration::from_millis(80)).await;

        let guard = pool.acquire().await.unwrap();
        let before = Instant::now();
        guard.pace().await;
        assert!(before.elapsed() < Duration::from_millis(40));
    }
}
