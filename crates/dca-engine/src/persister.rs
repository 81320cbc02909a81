//! Day-stamp write-back.
//!
//! After a confirmed purchase the asset's `LAST_BUY_DATE` is set to today and
//! the whole target map is written back. A write that cannot be completed is
//! escalated exactly once and reported as an error.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use dca_core::config::PersistConfig;
use dca_core::{DATE_FORMAT, TargetEntry, TargetMap, TargetRecord};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::notify::{self, Notifier};
use crate::store::{StoreError, TargetStore};

/// Bounded retry schedule for store writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay after attempt N is `delays[N - 1]`; the last entry repeats.
    pub delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&PersistConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &PersistConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delays: config.retry_delays_secs.iter().map(|s| Duration::from_secs(*s)).collect(),
        }
    }

    /// Delay after the 1-based `attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let idx = (attempt.saturating_sub(1) as usize).min(self.delays.len().saturating_sub(1));
        self.delays.get(idx).copied().unwrap_or_default()
    }
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("LAST_BUY_DATE for {key} not saved after {attempts} attempts: {last}")]
    Exhausted { key: String, attempts: u32, last: StoreError },

    #[error("LAST_BUY_DATE for {key} rejected by store: {source}")]
    Rejected {
        key: String,
        attempts: u32,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistReceipt {
    pub attempts: u32,
}

/// Set `LAST_BUY_DATE` for `key` in memory.
///
/// A legacy entry becomes a structured record that keeps its time, takes
/// `default_amount` and is enabled. A missing entry is created holding only
/// the date. An existing later date is kept.
pub fn stamp(map: &mut TargetMap, key: &str, date: NaiveDate, default_amount: f64) {
    if let Some(TargetEntry::Legacy(time)) = map.get(key) {
        let record = TargetRecord::from_legacy(time, default_amount);
        map.insert(key, TargetEntry::Structured(record));
    }
    match map.get_mut(key) {
        Some(TargetEntry::Structured(rec)) => {
            if rec.last_buy_date_value().is_some_and(|existing| existing > date) {
                warn!("[persist] {key} already stamped later than {date}; keeping existing date");
                return;
            }
            rec.last_buy_date = Some(date.format(DATE_FORMAT).to_string());
        }
        _ => {
            let record = TargetRecord {
                last_buy_date: Some(date.format(DATE_FORMAT).to_string()),
                ..TargetRecord::default()
            };
            map.insert(key, TargetEntry::Structured(record));
        }
    }
}

/// Writes day-stamps through a [`TargetStore`] with bounded retries.
pub struct StatePersister {
    store: Arc<dyn TargetStore>,
    notifier: Arc<dyn Notifier>,
    policy: RetryPolicy,
    default_amount: f64,
}

impl StatePersister {
    pub fn new(
        store: Arc<dyn TargetStore>,
        notifier: Arc<dyn Notifier>,
        policy: RetryPolicy,
        default_amount: f64,
    ) -> Self {
        Self {
            store,
            notifier,
            policy,
            default_amount,
        }
    }

    /// Stamp `key` with `date` and write the full map back.
    ///
    /// `map` is updated in place even when the write fails, so later assets in
    /// the same cycle carry the stamp forward.
    pub async fn persist(&self, map: &mut TargetMap, key: &str, date: NaiveDate) -> Result<PersistReceipt, PersistError> {
        stamp(map, key, date, self.default_amount);
        info!("[persist] saving LAST_BUY_DATE {key} = {date} via {}", self.store.name());

        let max = self.policy.max_attempts;
        let mut attempt = 0;
        let last = loop {
            attempt += 1;
            match self.write_once(map).await {
                Ok(()) => {
                    info!("[persist] {key} saved (attempt {attempt}/{max})");
                    return Ok(PersistReceipt { attempts: attempt });
                }
                Err(e) if !e.is_transient() => {
                    error!("[persist] {key} write rejected: {e}");
                    self.escalate(key, date, attempt, &e).await;
                    return Err(PersistError::Rejected {
                        key: key.to_string(),
                        attempts: attempt,
                        source: e,
                    });
                }
                Err(e) if attempt >= max => break e,
                Err(e) => {
                    let delay = self.policy.delay_after(attempt);
                    warn!("[persist] attempt {attempt}/{max} failed: {e}; retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                }
            }
        };

        error!("[persist] {key} not saved after {attempt} attempts: {last}");
        self.escalate(key, date, attempt, &last).await;
        Err(PersistError::Exhausted {
            key: key.to_string(),
            attempts: attempt,
            last,
        })
    }

    /// One put, falling back to create when the map does not exist yet.
    ///
    /// A create that conflicts means the map appeared since the put; the
    /// next attempt updates it.
    async fn write_once(&self, map: &TargetMap) -> Result<(), StoreError> {
        match self.store.put(map).await {
            Err(StoreError::NotFound) => {
                info!("[persist] target map missing in {}; creating", self.store.name());
                match self.store.create(map).await {
                    Err(StoreError::Rejected {
                        status: status @ (409 | 422),
                        message,
                    }) => {
                        warn!("[persist] create conflicted (HTTP {status}); map now exists, will update");
                        Err(StoreError::Transient(format!("create conflict {status}: {message}")))
                    }
                    other => other,
                }
            }
            other => other,
        }
    }

    async fn escalate(&self, key: &str, date: NaiveDate, attempts: u32, e: &StoreError) {
        let n = notify::persist_escalation(key, date, attempts, &e.to_string());
        notify::deliver(self.notifier.as_ref(), &n).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::notify::Severity;
    use crate::test_support::{RecordingNotifier, ScriptedStore};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn map() -> TargetMap {
        TargetMap::parse(r#"{"BTC_THB":"07:00","ETH_THB":{"TIME":"21:30","AMOUNT":150,"NOTE":"x"}}"#).unwrap()
    }

    fn persister(store: &Arc<ScriptedStore>, notifier: &Arc<RecordingNotifier>) -> StatePersister {
        StatePersister::new(store.clone(), notifier.clone(), RetryPolicy::default(), 20.0)
    }

    #[test]
    fn stamp_migrates_legacy_entry() {
        let mut m = map();
        stamp(&mut m, "BTC_THB", date(15), 20.0);
        let Some(TargetEntry::Structured(rec)) = m.get("BTC_THB") else {
            panic!("expected structured entry");
        };
        assert_eq!(rec.time.as_deref(), Some("07:00"));
        assert_eq!(rec.amount_value(), Some(20.0));
        assert_eq!(rec.buy_enabled, Some(true));
        assert_eq!(rec.last_buy_date.as_deref(), Some("2025-06-15"));
    }

    #[test]
    fn stamp_keeps_unknown_fields_and_creates_missing() {
        let mut m = map();
        stamp(&mut m, "ETH_THB", date(15), 20.0);
        stamp(&mut m, "SOL_THB", date(15), 20.0);
        let json = m.to_json();
        assert!(json.contains(r#""NOTE":"x""#));
        assert!(json.contains(r#""SOL_THB":{"LAST_BUY_DATE":"2025-06-15"}"#));
    }

    #[test]
    fn stamp_never_moves_backward() {
        let mut m = TargetMap::parse(r#"{"BTC_THB":{"TIME":"07:00","LAST_BUY_DATE":"2025-06-20"}}"#).unwrap();
        stamp(&mut m, "BTC_THB", date(15), 20.0);
        assert!(m.to_json().contains("2025-06-20"));
    }

    #[test]
    fn retry_delays_repeat_last() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 3);
        assert_eq!(p.delay_after(1), Duration::from_secs(1));
        assert_eq!(p.delay_after(2), Duration::from_secs(3));
        assert_eq!(p.delay_after(7), Duration::from_secs(5));
        let empty = RetryPolicy {
            max_attempts: 2,
            delays: vec![],
        };
        assert_eq!(empty.delay_after(1), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_third_attempt() {
        let store = Arc::new(ScriptedStore::new(
            Some(map()),
            vec![StoreError::Transient("502".into()), StoreError::Transient("timeout".into())],
        ));
        let notifier = Arc::new(RecordingNotifier::default());
        let mut m = map();

        let start = tokio::time::Instant::now();
        let receipt = persister(&store, &notifier).persist(&mut m, "BTC_THB", date(15)).await.unwrap();

        assert_eq!(receipt.attempts, 3);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(4) && elapsed < Duration::from_secs(5));
        assert!(notifier.sent().is_empty());
        assert!(store.stored().unwrap().to_json().contains("2025-06-15"));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_escalates_once() {
        let store = Arc::new(ScriptedStore::new(
            Some(map()),
            vec![
                StoreError::Transient("a".into()),
                StoreError::Transient("b".into()),
                StoreError::Transient("c".into()),
            ],
        ));
        let notifier = Arc::new(RecordingNotifier::default());
        let mut m = map();

        let err = persister(&store, &notifier).persist(&mut m, "BTC_THB", date(15)).await.unwrap_err();

        assert!(matches!(err, PersistError::Exhausted { attempts: 3, .. }));
        assert_eq!(store.puts.load(Ordering::SeqCst), 3);
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].severity, Severity::Critical);
        assert!(sent[0].text.contains("BTC_THB"));
        assert!(sent[0].text.contains("2025-06-15"));
        assert!(sent[0].text.contains("Error: transient store error: c"));
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_stops_immediately() {
        let store = Arc::new(ScriptedStore::new(
            Some(map()),
            vec![StoreError::Rejected {
                status: 403,
                message: "forbidden".into(),
            }],
        ));
        let notifier = Arc::new(RecordingNotifier::default());
        let mut m = map();

        let err = persister(&store, &notifier).persist(&mut m, "BTC_THB", date(15)).await.unwrap_err();

        assert!(matches!(err, PersistError::Rejected { attempts: 1, .. }));
        assert_eq!(store.puts.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn creates_missing_map() {
        let store = Arc::new(ScriptedStore::new(None, vec![]));
        let notifier = Arc::new(RecordingNotifier::default());
        let mut m = TargetMap::new();

        let receipt = persister(&store, &notifier).persist(&mut m, "BTC_THB", date(15)).await.unwrap();

        assert_eq!(receipt.attempts, 1);
        assert_eq!(store.creates.load(Ordering::SeqCst), 1);
        assert!(store.stored().unwrap().contains_key("BTC_THB"));
    }

    #[tokio::test(start_paused = true)]
    async fn create_conflict_retries_as_update() {
        let store = Arc::new(
            ScriptedStore::new(Some(map()), vec![StoreError::NotFound]).with_create_errors(vec![
                StoreError::Rejected {
                    status: 409,
                    message: "Already exists".into(),
                },
            ]),
        );
        let notifier = Arc::new(RecordingNotifier::default());
        let mut m = map();

        let receipt = persister(&store, &notifier).persist(&mut m, "BTC_THB", date(15)).await.unwrap();

        assert_eq!(receipt.attempts, 2);
        assert_eq!(store.puts.load(Ordering::SeqCst), 2);
        assert_eq!(store.creates.load(Ordering::SeqCst), 1);
        assert!(notifier.sent().iter().all(|n| n.severity != Severity::Critical));
        assert!(store.stored().unwrap().to_json().contains("2025-06-15"));
    }

    #[tokio::test(start_paused = true)]
    async fn create_refused_for_other_reasons_is_fatal() {
        let store = Arc::new(ScriptedStore::new(None, vec![]).with_create_errors(vec![StoreError::Rejected {
            status: 403,
            message: "Resource not accessible by integration".into(),
        }]));
        let notifier = Arc::new(RecordingNotifier::default());
        let mut m = TargetMap::new();

        let err = persister(&store, &notifier).persist(&mut m, "BTC_THB", date(15)).await.unwrap_err();

        assert!(matches!(err, PersistError::Rejected { attempts: 1, .. }));
        assert_eq!(notifier.sent()[0].severity, Severity::Critical);
    }

    #[tokio::test(start_paused = true)]
    async fn escalation_survives_notifier_failure() {
        let store = Arc::new(ScriptedStore::new(
            Some(map()),
            vec![StoreError::Malformed("bad".into())],
        ));
        let notifier = Arc::new(RecordingNotifier::failing());
        let mut m = map();
        let err = persister(&store, &notifier).persist(&mut m, "BTC_THB", date(15)).await;
        assert!(err.is_err());
        assert_eq!(notifier.sent().len(), 1);
    }
}
