//! Daily match notifications
//!
//! For every user, looks up upcoming matches of each favorite team and
//! competition, keeps the ones played "today" in the reference offset and
//! sends one [`Digest`] per user who has at least one. Provider lookups go
//! through the same governed provider as ingestion.
//!
//! A failed lookup skips that favorite. A failed send is logged and left for
//! the next scheduled run; nothing is retried within a run.

pub mod digest;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Days, FixedOffset, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use matchday_common::types::{Match, NotificationCandidate, User};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::NotificationConfig;
use crate::provider::Provider;
use crate::storage::Store;

pub use digest::{Digest, DigestSender, LogDigestSender, NotifyError, WebhookDigestSender};

/// Totals of one notification run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationReport {
    pub users_checked: u64,
    pub digests_sent: u64,
    pub digests_failed: u64,
    pub favorites_failed: u64,
}

#[derive(Default)]
struct UserOutcome {
    sent: bool,
    send_failed: bool,
    favorites_failed: u64,
}

pub struct NotificationJob {
    provider: Arc<dyn Provider>,
    store: Arc<dyn Store>,
    sender: Arc<dyn DigestSender>,
    lookahead_days: u32,
    offset: FixedOffset,
    fan_out: usize,
}

impl NotificationJob {
    pub fn new(
        provider: Arc<dyn Provider>,
        store: Arc<dyn Store>,
        sender: Arc<dyn DigestSender>,
        config: &NotificationConfig,
        fan_out: usize,
    ) -> Result<Self, NotifyError> {
        let offset = config
            .reference_offset()
            .map_err(|e| NotifyError::Config(e.to_string()))?;

        Ok(Self {
            provider,
            store,
            sender,
            lookahead_days: config.lookahead_days,
            offset,
            fan_out: fan_out.max(1),
        })
    }

    /// Run one notification cycle as of `now`
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<NotificationReport, NotifyError> {
        let today = now.with_timezone(&self.offset).date_naive();
        let users = self.store.users().await?;
        info!(
            users = users.len(),
            date = %today,
            channel = self.sender.channel_name(),
            "Notification run started"
        );

        let outcomes: Vec<UserOutcome> = stream::iter(users.iter().cloned())
            .map(|user| async move { self.notify_user(&user, today).await })
            .buffer_unordered(self.fan_out)
            .collect()
            .await;

        let mut report = NotificationReport {
            users_checked: users.len() as u64,
            ..Default::default()
        };
        for outcome in outcomes {
            report.favorites_failed += outcome.favorites_failed;
            if outcome.sent {
                report.digests_sent += 1;
            }
            if outcome.send_failed {
                report.digests_failed += 1;
            }
        }

        info!(
            users_checked = report.users_checked,
            digests_sent = report.digests_sent,
            digests_failed = report.digests_failed,
            favorites_failed = report.favorites_failed,
            "Notification run finished"
        );
        Ok(report)
    }

    async fn notify_user(&self, user: &User, today: NaiveDate) -> UserOutcome {
        let mut outcome = UserOutcome::default();
        let until = today
            .checked_add_days(Days::new(u64::from(self.lookahead_days)))
            .unwrap_or(today);

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        let mut matches: Vec<Match> = Vec::new();

        for (kind, subject_id) in user.favorites() {
            let upcoming = match self.provider.matches(kind, subject_id, today, until).await {
                Ok(upcoming) => upcoming,
                Err(e) => {
                    warn!(
                        user_id = %user.id,
                        kind = %kind,
                        subject_id = subject_id,
                        error = %e,
                        "Skipping favorite, match lookup failed"
                    );
                    outcome.favorites_failed += 1;
                    continue;
                },
            };

            for m in upcoming {
                if m.utc_date.with_timezone(&self.offset).date_naive() != today {
                    continue;
                }
                if !seen.insert((kind, subject_id, m.id)) {
                    continue;
                }
                candidates.push(NotificationCandidate {
                    user_id: user.id,
                    kind,
                    subject_id,
                    match_id: m.id,
                    match_date: today,
                });
                if !matches.iter().any(|known| known.id == m.id) {
                    matches.push(m);
                }
            }
        }

        if candidates.is_empty() {
            debug!(user_id = %user.id, "No matches today");
            return outcome;
        }

        let digest = Digest {
            user_id: user.id,
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            date: today,
            candidates,
            matches,
        };

        match self.sender.send_digest(&digest).await {
            Ok(()) => outcome.sent = true,
            Err(e) => {
                warn!(
                    user_id = %user.id,
                    error = %e,
                    "Digest delivery failed, deferring to next run"
                );
                outcome.send_failed = true;
            },
        }
        outcome
    }
}
