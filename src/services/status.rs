use std::cmp::Reverse;
use std::collections::HashMap;

use serde::Serialize;

use crate::database::{Activity, ActivityStatus};

/// Activity with its current status folded on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityView {
    #[serde(flatten)]
    pub activity: Activity,
    pub latest_status: Option<ActivityStatus>,
}

/// Reduce status history to the newest row per activity.
///
/// Rows are ordered by `created_at` descending, then `id` descending, and the
/// first row seen for each activity wins. Rows without an activity are dropped.
pub fn latest_per_activity(mut rows: Vec<ActivityStatus>) -> HashMap<i64, ActivityStatus> {
    rows.sort_by_key(|row| Reverse((row.created_at, row.id)));

    let mut latest = HashMap::with_capacity(rows.len());
    for row in rows {
        if let Some(activity_id) = row.activity_id {
            latest.entry(activity_id).or_insert(row);
        }
    }
    latest
}

/// Attach the current status to each activity, keeping the activity order
pub fn with_latest_status(activities: Vec<Activity>, statuses: Vec<ActivityStatus>) -> Vec<ActivityView> {
    let mut latest = latest_per_activity(statuses);
    activities
        .into_iter()
        .map(|activity| {
            let latest_status = latest.remove(&activity.id);
            ActivityView {
                activity,
                latest_status,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn status(id: i64, activity_id: i64, created_at: DateTime<Utc>, completed: i32) -> ActivityStatus {
        ActivityStatus {
            id,
            activity_id: Some(activity_id),
            updated_by: None,
            pending_count: Some(0),
            completed_count: Some(completed),
            status: Some("pending".to_string()),
            notes: None,
            reviewed: None,
            reviewed_at: None,
            created_at,
        }
    }

    fn activity(id: i64) -> Activity {
        Activity {
            id,
            user_id: Uuid::nil(),
            service_id: Some(1),
            description: format!("activity {}", id),
            count: 1,
            file_url: None,
            created_at: at(0),
            updated_at: at(0),
            service: None,
            officer: None,
        }
    }

    #[test]
    fn picks_maximum_created_at_regardless_of_input_order() {
        let rows = vec![
            status(1, 10, at(5), 1),
            status(2, 10, at(30), 3),
            status(3, 10, at(15), 2),
        ];
        let latest = latest_per_activity(rows);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[&10].id, 2);
        assert_eq!(latest[&10].completed_count, Some(3));
    }

    #[test]
    fn equal_timestamps_resolve_to_larger_id() {
        let rows = vec![status(7, 10, at(5), 1), status(9, 10, at(5), 2), status(8, 10, at(5), 3)];
        assert_eq!(latest_per_activity(rows)[&10].id, 9);
    }

    #[test]
    fn drops_rows_without_activity() {
        let mut orphan = status(1, 0, at(1), 1);
        orphan.activity_id = None;
        assert!(latest_per_activity(vec![orphan]).is_empty());
    }

    #[test]
    fn fold_keeps_one_row_per_activity_and_order() {
        let activities = vec![activity(2), activity(1), activity(3)];
        let statuses = vec![
            status(1, 1, at(1), 1),
            status(2, 1, at(2), 2),
            status(3, 2, at(1), 5),
        ];

        let views = with_latest_status(activities, statuses);
        let ids: Vec<i64> = views.iter().map(|v| v.activity.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
        assert_eq!(views[0].latest_status.as_ref().map(|s| s.id), Some(3));
        assert_eq!(views[1].latest_status.as_ref().map(|s| s.id), Some(2));
        assert!(views[2].latest_status.is_none());
    }

    #[test]
    fn view_flattens_activity_fields() {
        let view = ActivityView {
            activity: activity(4),
            latest_status: None,
        };
        let value = serde_json::to_value(&view).expect("serialize");
        assert_eq!(value["id"], 4);
        assert!(value["latest_status"].is_null());
    }
}
