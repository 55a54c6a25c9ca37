//! Request governor
//!
//! Process-wide throttle for outbound provider calls. The provider allows a
//! fixed number of calls before it starts rejecting requests, so every call
//! from every job goes through one shared [`RequestGovernor`]:
//!
//! 1. [`RequestGovernor::acquire`] waits (FIFO, no busy polling) until a call
//!    slot is free and returns a [`GovernorPermit`].
//! 2. The caller performs exactly one provider call.
//! 3. [`GovernorPermit::release`] records the call. When the running count
//!    reaches the threshold, the governor throttles: no permit is handed out
//!    until the cooldown elapses, after which the count resets to zero.
//!
//! Slots are handed out by a semaphore holding `threshold` permits per window.
//! Acquired permits are forgotten rather than returned, so a window can never
//! issue more than `threshold` calls, and the permits are only replenished by
//! the single cooldown task.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::time::{interval_at, sleep_until, Instant};
use tracing::{debug, error, info, warn};

use crate::config::GovernorConfig;

/// Point-in-time view of the governor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernorStatus {
    pub call_count: u32,
    pub throttling: bool,
    pub threshold: u32,
    pub cooldown_secs: u64,
    /// Cooldowns that have run to completion since startup
    pub cooldowns_completed: u64,
}

#[derive(Debug, Default)]
struct GovernorState {
    call_count: u32,
    throttling: bool,
    cooldowns_completed: u64,
}

#[derive(Debug)]
struct Inner {
    config: GovernorConfig,
    slots: Semaphore,
    state: Mutex<GovernorState>,
}

/// Shared handle to the process-wide request governor.
///
/// Cloning is cheap; all clones throttle against the same counter.
#[derive(Debug, Clone)]
pub struct RequestGovernor {
    inner: Arc<Inner>,
}

impl RequestGovernor {
    pub fn new(config: GovernorConfig) -> Self {
        let threshold = config.threshold.max(1);
        Self {
            inner: Arc::new(Inner {
                slots: Semaphore::new(threshold as usize),
                config: GovernorConfig {
                    threshold,
                    ..config
                },
                state: Mutex::new(GovernorState::default()),
            }),
        }
    }

    /// Wait until one provider call may be made.
    ///
    /// Never returns while a cooldown is active. Waiters are served in FIFO order.
    pub async fn acquire(&self) -> GovernorPermit {
        // The semaphore is never closed, so acquire cannot fail.
        if let Ok(slot) = self.inner.slots.acquire().await {
            slot.forget();
        }
        GovernorPermit {
            inner: Some(self.inner.clone()),
        }
    }

    /// Run `call` under a permit, releasing it afterwards whatever the outcome.
    pub async fn run<F, T>(&self, call: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        let permit = self.acquire().await;
        let output = call.await;
        permit.release();
        output
    }

    pub fn status(&self) -> GovernorStatus {
        let state = self.inner.lock_state();
        GovernorStatus {
            call_count: state.call_count,
            throttling: state.throttling,
            threshold: self.inner.config.threshold,
            cooldown_secs: self.inner.config.cooldown_secs,
            cooldowns_completed: state.cooldowns_completed,
        }
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.inner.config
    }
}

/// Permission to perform exactly one provider call.
///
/// Dropping the permit releases it, so a call that failed or was cancelled
/// still consumes its quota slot.
#[must_use = "a permit must be released after the provider call"]
#[derive(Debug)]
pub struct GovernorPermit {
    inner: Option<Arc<Inner>>,
}

impl GovernorPermit {
    /// Record the call this permit allowed.
    pub fn release(mut self) {
        if let Some(inner) = self.inner.take() {
            Inner::record_call(&inner);
        }
    }
}

impl Drop for GovernorPermit {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            Inner::record_call(&inner);
        }
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, GovernorState> {
        // The state holds plain counters, so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Count one call and start the cooldown when the threshold is reached.
    ///
    /// Increment and compare happen under the same lock, so exactly one
    /// caller observes the transition into throttling.
    fn record_call(inner: &Arc<Inner>) {
        let start_cooldown = {
            let mut state = inner.lock_state();
            state.call_count += 1;
            debug!(
                call_count = state.call_count,
                threshold = inner.config.threshold,
                "Provider call recorded"
            );
            if state.call_count >= inner.config.threshold && !state.throttling {
                state.throttling = true;
                true
            } else {
                false
            }
        };

        if start_cooldown {
            Inner::start_cooldown(inner.clone());
        }
    }

    fn start_cooldown(inner: Arc<Inner>) {
        let cooldown = inner.config.cooldown();
        warn!(
            cooldown_secs = cooldown.as_secs(),
            threshold = inner.config.threshold,
            "Provider quota reached, pausing outbound calls"
        );

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    inner.countdown(cooldown).await;
                    inner.finish_cooldown();
                });
            },
            Err(_) => {
                error!("No async runtime available for the governor cooldown, resetting immediately");
                inner.finish_cooldown();
            },
        }
    }

    async fn countdown(&self, cooldown: Duration) {
        let start = Instant::now();
        let deadline = start + cooldown;
        let every = self.config.progress_interval();
        let mut ticker = interval_at(start + every, every);
        let sleep = sleep_until(deadline);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => break,
                _ = ticker.tick() => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    info!(remaining_secs = remaining.as_secs(), "Provider cooldown in progress");
                },
            }
        }
    }

    fn finish_cooldown(&self) {
        {
            let mut state = self.lock_state();
            state.call_count = 0;
            state.throttling = false;
            state.cooldowns_completed += 1;
        }
        self.slots.add_permits(self.config.threshold as usize);
        info!("Provider cooldown finished, resuming outbound calls");
    }
}
