//! SQLite schema for the sessions table
//!
//! Column names follow the replay backend's `sessions` table. `issue_types`
//! holds a JSON array of tag names; the aggregate and utm columns are
//! written by other services and only read here.

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    session_id INTEGER PRIMARY KEY,
    project_id INTEGER NOT NULL,
    start_ts INTEGER NOT NULL,
    duration INTEGER,                      -- ms, NULL until the session ends

    -- Device / user descriptors (set at creation)
    user_uuid TEXT NOT NULL,
    user_device TEXT NOT NULL DEFAULT '',
    user_device_type TEXT NOT NULL DEFAULT '',
    user_country TEXT NOT NULL DEFAULT '',
    user_state TEXT,
    user_city TEXT,
    user_os TEXT NOT NULL DEFAULT '',
    user_os_version TEXT,
    user_browser TEXT,
    user_browser_version TEXT,
    user_device_memory_size INTEGER,
    user_device_heap_size INTEGER,
    timezone TEXT NOT NULL DEFAULT '',
    screen_width INTEGER NOT NULL DEFAULT 0,
    screen_height INTEGER NOT NULL DEFAULT 0,

    rev_id TEXT,
    tracker_version TEXT NOT NULL DEFAULT '',
    platform TEXT NOT NULL DEFAULT 'web',
    issue_score INTEGER NOT NULL DEFAULT 0,

    -- Filled in after creation
    user_id TEXT,
    user_anonymous_id TEXT,
    referrer TEXT,
    base_referrer TEXT,
    file_key BLOB,

    -- Maintained by other writers
    pages_count INTEGER NOT NULL DEFAULT 0,
    events_count INTEGER NOT NULL DEFAULT 0,
    errors_count INTEGER NOT NULL DEFAULT 0,
    issue_types TEXT NOT NULL DEFAULT '[]',
    utm_source TEXT,
    utm_medium TEXT,
    utm_campaign TEXT,

    metadata_1 TEXT,
    metadata_2 TEXT,
    metadata_3 TEXT,
    metadata_4 TEXT,
    metadata_5 TEXT,
    metadata_6 TEXT,
    metadata_7 TEXT,
    metadata_8 TEXT,
    metadata_9 TEXT,
    metadata_10 TEXT
);

CREATE INDEX IF NOT EXISTS idx_sessions_project_start ON sessions(project_id, start_ts);
"#;
