//! In-memory audit trail and request counters.
//!
//! Both live for the process lifetime and are shared by every in-flight
//! request. The audit log is append-only and never mutates an entry after
//! insertion; it grows without bound at write time and is capped only when
//! read (`MAX_RETURNED_ENTRIES`). Counters are monotonic atomics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Read-time cap on how many entries the log listing returns.
pub const MAX_RETURNED_ENTRIES: usize = 200;

/// Stored question/answer snippets are truncated to this many characters.
pub const SNIPPET_MAX_CHARS: usize = 200;

/// Immutable record of one request's outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub ts: DateTime<Utc>,
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_snippet: Option<String>,
}

impl AuditEntry {
    /// Entry for a guardrail rejection (input or output screen).
    pub fn blocked(id: Uuid, reason: &str) -> Self {
        Self {
            id,
            ts: Utc::now(),
            blocked: true,
            reason: Some(reason.to_string()),
            question: None,
            answer_snippet: None,
        }
    }

    /// Entry for a served answer, with truncated snippets.
    pub fn served(id: Uuid, question: &str, answer: &str) -> Self {
        Self {
            id,
            ts: Utc::now(),
            blocked: false,
            reason: None,
            question: Some(snippet(question)),
            answer_snippet: Some(snippet(answer)),
        }
    }
}

/// Truncate to `SNIPPET_MAX_CHARS` characters, respecting char boundaries.
pub fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_MAX_CHARS).collect()
}

/// Append-only, insertion-ordered store of audit entries.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, entry: AuditEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The most recent `limit` entries, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<AuditEntry> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let start = entries.len().saturating_sub(limit);
        entries[start..].to_vec()
    }
}

/// Process-wide request counters, reset only on restart.
#[derive(Debug, Default)]
pub struct Metrics {
    total: AtomicU64,
    blocked: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time view of the counters, serialized as the metrics response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total: u64,
    pub blocked: u64,
    pub errors: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr_total(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_blocked(&self) {
        self.blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total: self.total.load(Ordering::Relaxed),
            blocked: self.blocked.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_append_preserves_insertion_order() {
        let log = AuditLog::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        log.append(AuditEntry::blocked(first, "<script"));
        log.append(AuditEntry::served(second, "q", "a"));

        let entries = log.recent(MAX_RETURNED_ENTRIES);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, first);
        assert_eq!(entries[1].id, second);
    }

    #[test]
    fn test_recent_caps_at_limit_keeping_newest() {
        let log = AuditLog::new();
        let mut last = Uuid::nil();
        for _ in 0..250 {
            last = Uuid::new_v4();
            log.append(AuditEntry::served(last, "q", "a"));
        }

        assert_eq!(log.len(), 250);
        let entries = log.recent(MAX_RETURNED_ENTRIES);
        assert_eq!(entries.len(), MAX_RETURNED_ENTRIES);
        assert_eq!(entries.last().unwrap().id, last);
    }

    #[test]
    fn test_snippet_truncates_on_char_boundary() {
        let long = "é".repeat(300);
        let cut = snippet(&long);
        assert_eq!(cut.chars().count(), SNIPPET_MAX_CHARS);

        assert_eq!(snippet("short"), "short");
    }

    #[test]
    fn test_served_entry_truncates_snippets() {
        let question = "q".repeat(500);
        let answer = "a".repeat(500);
        let entry = AuditEntry::served(Uuid::new_v4(), &question, &answer);
        assert_eq!(entry.question.unwrap().len(), SNIPPET_MAX_CHARS);
        assert_eq!(entry.answer_snippet.unwrap().len(), SNIPPET_MAX_CHARS);
        assert!(!entry.blocked);
        assert!(entry.reason.is_none());
    }

    #[test]
    fn test_blocked_entry_has_reason_only() {
        let entry = AuditEntry::blocked(Uuid::new_v4(), "system message:");
        assert!(entry.blocked);
        assert_eq!(entry.reason.as_deref(), Some("system message:"));
        assert!(entry.question.is_none());
        assert!(entry.answer_snippet.is_none());
    }

    #[test]
    fn test_metrics_increment_and_snapshot() {
        let metrics = Metrics::new();
        metrics.incr_total();
        metrics.incr_total();
        metrics.incr_blocked();
        metrics.incr_errors();

        let snap = metrics.snapshot();
        assert_eq!(snap.total, 2);
        assert_eq!(snap.blocked, 1);
        assert_eq!(snap.errors, 1);
    }

    #[test]
    fn test_concurrent_appends_and_increments_are_not_lost() {
        let log = Arc::new(AuditLog::new());
        let metrics = Arc::new(Metrics::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let log = log.clone();
                let metrics = metrics.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        metrics.incr_total();
                        log.append(AuditEntry::served(Uuid::new_v4(), "q", "a"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(log.len(), 800);
        assert_eq!(metrics.snapshot().total, 800);
    }
}
