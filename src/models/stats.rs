use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    pub total_patients: u32,
    pub total_prescriptions: u32,
    pub today_prescriptions: u32,
    pub week_prescriptions: u32,
    pub month_prescriptions: u32,
    pub total_follow_ups: u32,
    pub follow_ups_today: u32,
    pub overdue_follow_ups: u32,
}

/// Record counts reported by the danger-zone summary and by import verification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataCounts {
    pub patients: u32,
    pub prescriptions: u32,
    pub doctors: u32,
    pub templates: u32,
}

impl DataCounts {
    pub fn total(&self) -> u32 {
        self.patients + self.prescriptions + self.doctors + self.templates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_counts_default_to_zero() {
        let counts: DataCounts = serde_json::from_str(r#"{"patients": 4}"#).unwrap();
        assert_eq!(counts.patients, 4);
        assert_eq!(counts.templates, 0);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn deserializes_dashboard_stats() {
        let stats: DashboardStats =
            serde_json::from_str(r#"{"totalPatients": 10, "overdueFollowUps": 2}"#).unwrap();
        assert_eq!(stats.total_patients, 10);
        assert_eq!(stats.overdue_follow_ups, 2);
        assert_eq!(stats.week_prescriptions, 0);
    }
}
