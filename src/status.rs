//! Display status of a prescription.
//!
//! Derived from `status` and `nextFollowUp` only; the client owns no
//! transitions. Rules are checked top to bottom, first match wins.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::models::{Prescription, RecordStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    /// No status flags and no follow-up.
    Active,
    FollowUpPending,
    FollowUpCompleted,
    Resolved,
}

impl DisplayStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::FollowUpPending => "Review Pending",
            Self::FollowUpCompleted => "Review Completed",
            Self::Resolved => "Resolved",
        }
    }
}

impl std::fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.label())
    }
}

/// Signals a rule can test.
#[derive(Debug, Clone, Copy)]
struct Signals {
    completed: bool,
    has_follow_up: bool,
    explicit_active: bool,
}

struct Rule {
    applies: fn(&Signals) -> bool,
    status: DisplayStatus,
}

const RULES: &[Rule] = &[
    Rule {
        applies: |s| s.completed,
        status: DisplayStatus::FollowUpCompleted,
    },
    Rule {
        applies: |s| s.has_follow_up,
        status: DisplayStatus::FollowUpPending,
    },
    Rule {
        applies: |s| s.explicit_active,
        status: DisplayStatus::Resolved,
    },
];

const FALLBACK: DisplayStatus = DisplayStatus::Active;

fn parse_status(status: Option<&str>) -> Option<RecordStatus> {
    status.and_then(|s| s.parse().ok())
}

/// Derive the display status from the raw backend fields.
pub fn derive_status(status: Option<&str>, next_follow_up: Option<DateTime<Utc>>) -> DisplayStatus {
    let parsed = parse_status(status);
    let signals = Signals {
        completed: parsed == Some(RecordStatus::FollowUpCompleted),
        has_follow_up: next_follow_up.is_some(),
        explicit_active: parsed == Some(RecordStatus::Active),
    };
    RULES
        .iter()
        .find(|rule| (rule.applies)(&signals))
        .map_or(FALLBACK, |rule| rule.status)
}

/// Follow-up date has passed and the review has not been completed.
pub fn is_overdue(
    status: Option<&str>,
    next_follow_up: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    let completed = parse_status(status) == Some(RecordStatus::FollowUpCompleted);
    !completed && next_follow_up.is_some_and(|date| date < now)
}

impl Prescription {
    pub fn display_status(&self) -> DisplayStatus {
        derive_status(self.status.as_deref(), self.next_follow_up)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        is_overdue(self.status.as_deref(), self.next_follow_up, now)
    }

    /// Status label for history lists. A completed review carries the day it
    /// was marked complete, e.g. `Review Completed (04-Jun-2024)`.
    pub fn status_label(&self) -> String {
        let status = self.display_status();
        match (status, self.updated_at) {
            (DisplayStatus::FollowUpCompleted, Some(at)) => format!(
                "{} ({})",
                status.label(),
                at.with_timezone(&Local).format("%d-%b-%Y")
            ),
            _ => status.label().to_string(),
        }
    }
}
