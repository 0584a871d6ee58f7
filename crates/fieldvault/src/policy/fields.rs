//! Per-entity sensitive-field declarations.
//!
//! Field names match the persisted document keys (camelCase, as the web
//! tier writes them). Array-valued fields like `tags` are encrypted
//! element-wise. Attendance logs hold counts only and declare no sensitive
//! fields.

use common::EntityKind;

/// Sensitive fields for an entity kind.
pub fn sensitive_fields(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Contact => &[
            "firstName",
            "lastName",
            "address",
            "city",
            "state",
            "zip",
            "phone",
            "email",
            "notes",
            "tags",
        ],
        EntityKind::Prospect => &[
            "firstName",
            "lastName",
            "address",
            "city",
            "state",
            "zip",
            "phone",
            "email",
            "prayerRequest",
            "tags",
        ],
        EntityKind::Rider => &[
            "firstName",
            "lastName",
            "address",
            "phone",
            "guardianName",
            "notes",
        ],
        EntityKind::Worker => &["firstName", "lastName", "address", "phone", "email"],
        EntityKind::PrayerRequest => &["requesterName", "request"],
        EntityKind::AttendanceLog => &[],
    }
}
