//! Session record types
//!
//! `NewSession` carries the creation-time fields written by
//! [`SessionStore::add`](crate::SessionStore::add); `Session` is the read
//! projection returned by the getters. Fields that other writers fill in
//! later (aggregates, utm attribution) only exist on the read side.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::SessionError;

/// Number of fixed metadata columns (`metadata_1` .. `metadata_10`).
pub const METADATA_SLOTS: usize = 10;

/// Creation-time fields of a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewSession {
    pub session_id: u64,
    pub project_id: u32,
    /// Start of the session, epoch millis
    pub timestamp: u64,
    pub user_uuid: String,
    pub user_device: String,
    pub user_device_type: String,
    pub user_country: String,
    pub user_state: String,
    pub user_city: String,
    pub user_os: String,
    pub user_os_version: String,
    pub user_browser: String,
    pub user_browser_version: String,
    pub user_device_memory_size: u64,
    pub user_device_heap_size: u64,
    pub user_id: String,
    pub rev_id: String,
    pub tracker_version: String,
    pub platform: String,
    pub timezone: String,
    pub screen_width: u32,
    pub screen_height: u32,
}

impl NewSession {
    /// Coarse bucket derived from the start time, written once at insert.
    pub fn issue_score(&self) -> i64 {
        (self.timestamp / 1000) as i64
    }
}

/// A session row as seen by readers.
///
/// Descriptor columns that were normalised to NULL on insert come back as
/// empty strings (or zero for the size fields). `duration` is never
/// negative here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    pub session_id: u64,
    pub project_id: u32,
    pub timestamp: u64,
    pub duration: u64,
    pub platform: String,
    pub timezone: String,
    pub user_uuid: String,
    pub user_device: String,
    pub user_device_type: String,
    pub user_country: String,
    pub user_state: String,
    pub user_city: String,
    pub user_os: String,
    pub user_os_version: String,
    pub user_browser: String,
    pub user_browser_version: String,
    pub user_device_memory_size: u64,
    pub user_device_heap_size: u64,
    pub screen_width: u32,
    pub screen_height: u32,
    pub rev_id: String,
    pub tracker_version: String,
    pub user_id: Option<String>,
    pub user_anonymous_id: Option<String>,
    pub referrer: Option<String>,
    pub base_referrer: Option<String>,
    pub pages_count: u32,
    pub events_count: u32,
    pub errors_count: u32,
    pub issue_types: BTreeSet<IssueType>,
    pub issue_score: i64,
    pub metadata: Metadata,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
}

/// Narrow projection returned by batch reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionTiming {
    pub session_id: u64,
    pub timestamp: u64,
    pub duration: u64,
}

/// Issue tags attached to a session by the detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    ClickRage,
    DeadClick,
    ExcessiveScrolling,
    BadRequest,
    MissingResource,
    Memory,
    Cpu,
    SlowResource,
    SlowPageLoad,
    Crash,
    MlCpu,
    MlMemory,
    MlDeadClick,
    MlClickRage,
    MlMouseThrashing,
    MlExcessiveScrolling,
    MlSlowResources,
    Custom,
    JsException,
    MouseThrashing,
    AppCrash,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::ClickRage => "click_rage",
            IssueType::DeadClick => "dead_click",
            IssueType::ExcessiveScrolling => "excessive_scrolling",
            IssueType::BadRequest => "bad_request",
            IssueType::MissingResource => "missing_resource",
            IssueType::Memory => "memory",
            IssueType::Cpu => "cpu",
            IssueType::SlowResource => "slow_resource",
            IssueType::SlowPageLoad => "slow_page_load",
            IssueType::Crash => "crash",
            IssueType::MlCpu => "ml_cpu",
            IssueType::MlMemory => "ml_memory",
            IssueType::MlDeadClick => "ml_dead_click",
            IssueType::MlClickRage => "ml_click_rage",
            IssueType::MlMouseThrashing => "ml_mouse_thrashing",
            IssueType::MlExcessiveScrolling => "ml_excessive_scrolling",
            IssueType::MlSlowResources => "ml_slow_resources",
            IssueType::Custom => "custom",
            IssueType::JsException => "js_exception",
            IssueType::MouseThrashing => "mouse_thrashing",
            IssueType::AppCrash => "app_crash",
        }
    }
}

/// The ten fixed metadata columns of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata([Option<String>; METADATA_SLOTS]);

impl Metadata {
    pub fn from_columns(values: [Option<String>; METADATA_SLOTS]) -> Self {
        Self(values)
    }

    pub fn get(&self, slot: MetadataSlot) -> Option<&str> {
        self.0[slot.position()].as_deref()
    }

    /// Iterate over populated slots as `(slot, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (MetadataSlot, &str)> {
        self.0.iter().enumerate().filter_map(|(pos, value)| {
            value
                .as_deref()
                .map(|v| (MetadataSlot(pos as u8 + 1), v))
        })
    }
}

/// A validated, 1-based metadata slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetadataSlot(u8);

impl MetadataSlot {
    pub fn index(self) -> u32 {
        self.0 as u32
    }

    /// Zero-based position, used to index per-slot lookup tables.
    pub(crate) fn position(self) -> usize {
        self.0 as usize - 1
    }
}

impl TryFrom<u32> for MetadataSlot {
    type Error = SessionError;

    fn try_from(index: u32) -> Result<Self, Self::Error> {
        if (1..=METADATA_SLOTS as u32).contains(&index) {
            Ok(Self(index as u8))
        } else {
            Err(SessionError::InvalidMetadataSlot(index))
        }
    }
}

impl std::fmt::Display for MetadataSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "metadata_{}", self.0)
    }
}

/// Outcome of the set-once referrer write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferrerUpdate {
    Applied,
    /// Referrer was already set, or no such session. The row is untouched.
    AlreadySet,
}

impl ReferrerUpdate {
    pub fn applied(self) -> bool {
        self == ReferrerUpdate::Applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_slot_bounds() {
        assert!(MetadataSlot::try_from(0).is_err());
        assert!(MetadataSlot::try_from(11).is_err());
        assert_eq!(MetadataSlot::try_from(1).unwrap().index(), 1);
        assert_eq!(MetadataSlot::try_from(10).unwrap().position(), 9);
    }

    #[test]
    fn test_metadata_slot_error_carries_index() {
        match MetadataSlot::try_from(11) {
            Err(SessionError::InvalidMetadataSlot(11)) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_metadata_iter_skips_empty_slots() {
        let mut columns: [Option<String>; METADATA_SLOTS] = Default::default();
        columns[2] = Some("plan".to_string());
        columns[9] = Some("tier".to_string());
        let metadata = Metadata::from_columns(columns);

        let populated: Vec<(u32, &str)> = metadata.iter().map(|(s, v)| (s.index(), v)).collect();
        assert_eq!(populated, vec![(3, "plan"), (10, "tier")]);
        assert_eq!(metadata.get(MetadataSlot::try_from(1).unwrap()), None);
    }

    #[test]
    fn test_issue_type_names_match_serde() {
        for tag in [IssueType::ClickRage, IssueType::MlSlowResources, IssueType::JsException] {
            let json = serde_json::to_string(&tag).unwrap();
            assert_eq!(json, format!("\"{}\"", tag.as_str()));
        }
    }

    #[test]
    fn test_issue_score_is_start_seconds() {
        let session = NewSession {
            timestamp: 1_700_000_123_456,
            ..Default::default()
        };
        assert_eq!(session.issue_score(), 1_700_000_123);
    }
}
