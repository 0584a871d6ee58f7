//! Roster entity model.
//!
//! Every persisted record is a JSON document. Field names inside documents
//! are camelCase, matching what the web tier writes. Entity kinds map
//! one-to-one onto collections in the backing document store.

use serde::{Deserialize, Serialize};

/// A persisted record as stored and transported: an arbitrary JSON object.
pub type Document = serde_json::Value;

/// The roster collections managed by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Church members and regular attendees.
    Contact,
    /// Outreach prospects not yet on the roster.
    Prospect,
    /// Bus-route riders.
    Rider,
    /// Ministry workers and volunteers.
    Worker,
    /// Submitted prayer requests.
    PrayerRequest,
    /// Per-service attendance logs (counts only).
    AttendanceLog,
}

impl EntityKind {
    /// Every entity kind, in a stable order.
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Contact,
        EntityKind::Prospect,
        EntityKind::Rider,
        EntityKind::Worker,
        EntityKind::PrayerRequest,
        EntityKind::AttendanceLog,
    ];

    /// Name of the backing collection for this entity kind.
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Contact => "contacts",
            EntityKind::Prospect => "prospects",
            EntityKind::Rider => "riders",
            EntityKind::Worker => "workers",
            EntityKind::PrayerRequest => "prayer_requests",
            EntityKind::AttendanceLog => "attendance_logs",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_names_are_unique() {
        let mut names: Vec<_> = EntityKind::ALL.iter().map(|k| k.collection()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), EntityKind::ALL.len());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&EntityKind::PrayerRequest).unwrap();
        assert_eq!(json, "\"prayer_request\"");
        let back: EntityKind = serde_json::from_str("\"attendance_log\"").unwrap();
        assert_eq!(back, EntityKind::AttendanceLog);
    }
}
