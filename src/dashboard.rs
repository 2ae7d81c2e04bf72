//! Dashboard aggregation: backend statistics, recent records and the
//! upcoming follow-up list.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::{self, ApiClient, ApiError};
use crate::models::{DashboardStats, ListFilter, Patient, Prescription, Ref};

/// Records shown in each "recent" list.
pub const RECENT_LIMIT: u32 = 5;
/// Prescriptions scanned for follow-ups.
pub const FOLLOW_UP_SCAN_LIMIT: u32 = 50;
/// Follow-ups shown.
pub const FOLLOW_UP_LIMIT: usize = 5;
/// A follow-up this many days out or fewer counts as due soon.
pub const DUE_SOON_DAYS: i64 = 3;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUp {
    pub id: String,
    pub prescription_id: String,
    pub patient_name: String,
    /// Human-facing patient code, empty when the patient is not populated.
    pub patient_code: String,
    pub next_follow_up: DateTime<Utc>,
    /// Whole days from now, rounded up. Negative when overdue.
    pub days_until: i64,
    pub is_overdue: bool,
}

impl FollowUp {
    pub fn label(&self) -> String {
        match self.days_until {
            d if d < 0 => format!("{} days overdue", d.unsigned_abs()),
            0 => "Today".to_string(),
            d => format!("In {d} days"),
        }
    }
}

/// Days from `now` to `at`, rounded towards the future.
pub fn days_until(at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let ms = (at - now).num_milliseconds();
    ms.div_euclid(DAY_MS) + i64::from(ms.rem_euclid(DAY_MS) > 0)
}

/// Follow-ups among `prescriptions`, soonest first, at most five.
pub fn upcoming_follow_ups(prescriptions: &[Prescription], now: DateTime<Utc>) -> Vec<FollowUp> {
    let mut follow_ups: Vec<FollowUp> = prescriptions
        .iter()
        .filter_map(|p| {
            let at = p.next_follow_up?;
            let days = days_until(at, now);
            Some(FollowUp {
                id: p.id.clone(),
                prescription_id: p.prescription_id.clone(),
                patient_name: p.display_patient_name().to_string(),
                patient_code: match &p.patient {
                    Ref::Populated(summary) => summary.patient_id.clone(),
                    Ref::Id(_) => String::new(),
                },
                next_follow_up: at,
                days_until: days,
                is_overdue: days < 0,
            })
        })
        .collect();
    follow_ups.sort_by_key(|f| f.next_follow_up);
    follow_ups.truncate(FOLLOW_UP_LIMIT);
    follow_ups
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub recent_prescriptions: Vec<Prescription>,
    pub recent_patients: Vec<Patient>,
    pub follow_ups: Vec<FollowUp>,
}

impl Dashboard {
    /// Follow-ups due within the next few days, excluding today.
    pub fn due_soon(&self) -> usize {
        self.follow_ups
            .iter()
            .filter(|f| f.days_until > 0 && f.days_until <= DUE_SOON_DAYS)
            .count()
    }
}

/// Fetch everything the dashboard shows.
pub async fn load_dashboard(client: &ApiClient, now: DateTime<Utc>) -> Result<Dashboard, ApiError> {
    let stats = api::stats::dashboard(client).await?;
    let (recent_prescriptions, recent_patients) = tokio::try_join!(
        api::prescriptions::list(client, 1, RECENT_LIMIT, ListFilter::All),
        api::patients::list(client, 1, RECENT_LIMIT),
    )?;
    let scan = api::prescriptions::list(client, 1, FOLLOW_UP_SCAN_LIMIT, ListFilter::All).await?;

    let follow_ups = upcoming_follow_ups(&scan.items, now);
    tracing::debug!(
        recent_prescriptions = recent_prescriptions.items.len(),
        recent_patients = recent_patients.items.len(),
        follow_ups = follow_ups.len(),
        "Dashboard loaded"
    );

    Ok(Dashboard {
        stats,
        recent_prescriptions: recent_prescriptions.items,
        recent_patients: recent_patients.items,
        follow_ups,
    })
}
