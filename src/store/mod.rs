//! Session persistence over a pooled SQLite connection
//!
//! Every method issues exactly one statement. Point reads fail with
//! `NotFound` when the row is missing; point updates on a missing row
//! affect zero rows and return normally.

mod fields;
mod pool;
mod schema;

use rusqlite::types::Value;
use rusqlite::{ffi, ErrorCode, Row};
use std::rc::Rc;

use crate::error::{Result, SessionError};
use crate::session::{
    Metadata, MetadataSlot, NewSession, ReferrerUpdate, Session, SessionTiming, METADATA_SLOTS,
};

pub use fields::MAX_TEXT_CHARS;
pub use pool::{Pool, SqlitePool};
pub use schema::SCHEMA;

const INSERT_SESSION: &str = r#"INSERT INTO sessions
       (session_id, project_id, start_ts,
        user_uuid, user_device, user_device_type, user_country,
        user_os, user_os_version,
        rev_id,
        tracker_version, issue_score,
        platform,
        user_browser, user_browser_version, user_device_memory_size, user_device_heap_size,
        user_id, user_state, user_city, timezone, screen_width, screen_height)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
               ?17, ?18, ?19, ?20, ?21, ?22, ?23)"#;

const SELECT_SESSION: &str = r#"SELECT platform,
              duration, project_id, start_ts, timezone,
              user_uuid, user_os, user_os_version,
              user_device, user_device_type, user_country, user_state, user_city,
              rev_id, tracker_version,
              user_id, user_anonymous_id, referrer, base_referrer,
              pages_count, events_count, errors_count, issue_types,
              user_browser, user_browser_version, issue_score,
              metadata_1, metadata_2, metadata_3, metadata_4, metadata_5,
              metadata_6, metadata_7, metadata_8, metadata_9, metadata_10,
              utm_source, utm_medium, utm_campaign,
              user_device_memory_size, user_device_heap_size, screen_width, screen_height
       FROM sessions
       WHERE session_id = ?1"#;

/// Column index of `issue_types` in [`SELECT_SESSION`]
const ISSUE_TYPES_COLUMN: usize = 22;
/// Column index of `metadata_1` in [`SELECT_SESSION`]
const METADATA_FIRST_COLUMN: usize = 26;

/// One statement per slot; the column is never formatted into SQL at runtime.
const METADATA_UPDATES: [&str; METADATA_SLOTS] = [
    "UPDATE sessions SET metadata_1 = ?1 WHERE session_id = ?2",
    "UPDATE sessions SET metadata_2 = ?1 WHERE session_id = ?2",
    "UPDATE sessions SET metadata_3 = ?1 WHERE session_id = ?2",
    "UPDATE sessions SET metadata_4 = ?1 WHERE session_id = ?2",
    "UPDATE sessions SET metadata_5 = ?1 WHERE session_id = ?2",
    "UPDATE sessions SET metadata_6 = ?1 WHERE session_id = ?2",
    "UPDATE sessions SET metadata_7 = ?1 WHERE session_id = ?2",
    "UPDATE sessions SET metadata_8 = ?1 WHERE session_id = ?2",
    "UPDATE sessions SET metadata_9 = ?1 WHERE session_id = ?2",
    "UPDATE sessions SET metadata_10 = ?1 WHERE session_id = ?2",
];

/// Typed access to the `sessions` table over a shared [`Pool`].
pub struct SessionStore<P = SqlitePool> {
    db: P,
}

impl<P: Pool> SessionStore<P> {
    pub fn new(db: P) -> Self {
        Self { db }
    }

    // ============================================
    // CREATE
    // ============================================

    /// Insert a new session row.
    ///
    /// Empty descriptor strings and zero memory/heap sizes are stored as
    /// NULL. Fails with `Conflict` if the id is already taken.
    #[tracing::instrument(skip(self, sess), fields(session_id = sess.session_id))]
    pub fn add(&self, sess: &NewSession) -> Result<()> {
        let user_id = fields::non_empty(fields::truncate(&sess.user_id));

        let result = self.db.exec(
            INSERT_SESSION,
            rusqlite::params![
                sess.session_id,
                sess.project_id,
                sess.timestamp,
                sess.user_uuid,
                sess.user_device,
                sess.user_device_type,
                sess.user_country,
                sess.user_os,
                fields::non_empty(&sess.user_os_version),
                fields::non_empty(&sess.rev_id),
                sess.tracker_version,
                sess.issue_score(),
                sess.platform,
                fields::non_empty(&sess.user_browser),
                fields::non_empty(&sess.user_browser_version),
                fields::non_zero(sess.user_device_memory_size),
                fields::non_zero(sess.user_device_heap_size),
                user_id,
                fields::non_empty(&sess.user_state),
                fields::non_empty(&sess.user_city),
                sess.timezone,
                sess.screen_width,
                sess.screen_height,
            ],
        );

        match result {
            Ok(_) => {
                tracing::debug!(project_id = sess.project_id, "session added");
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation
                    && (e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                        || e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE) =>
            {
                Err(SessionError::Conflict(sess.session_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    // ============================================
    // READS
    // ============================================

    /// Fetch the full session record.
    #[tracing::instrument(skip(self))]
    pub fn get(&self, session_id: u64) -> Result<Session> {
        let Some(id) = row_id(session_id) else {
            return Err(SessionError::NotFound(session_id));
        };
        let result = self
            .db
            .query_row(SELECT_SESSION, rusqlite::params![id], |row| {
                map_session(session_id, row)
            });

        not_found_as(session_id, result)
    }

    /// Batch lookup of `(session_id, start, duration)` for the session ender.
    ///
    /// Unknown ids are skipped and the result order follows the table scan,
    /// not the input.
    #[tracing::instrument(skip(self, session_ids), fields(requested = session_ids.len()))]
    pub fn get_many(&self, session_ids: &[u64]) -> Result<Vec<SessionTiming>> {
        if session_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Rc<Vec<Value>> = Rc::new(
            session_ids
                .iter()
                .filter_map(|&id| row_id(id))
                .map(Value::Integer)
                .collect(),
        );

        let sessions = self.db.query(
            "SELECT session_id, duration, start_ts FROM sessions WHERE session_id IN rarray(?1)",
            rusqlite::params![ids],
            |row| {
                Ok(SessionTiming {
                    session_id: row.get(0)?,
                    duration: fields::duration(row.get(1)?),
                    timestamp: row.get(2)?,
                })
            },
        )?;

        tracing::debug!(found = sessions.len(), "sessions fetched");
        Ok(sessions)
    }

    /// Stored duration, with NULL and negative values read as zero.
    #[tracing::instrument(skip(self))]
    pub fn get_duration(&self, session_id: u64) -> Result<u64> {
        let Some(id) = row_id(session_id) else {
            return Err(SessionError::NotFound(session_id));
        };
        let result = self.db.query_row(
            "SELECT duration FROM sessions WHERE session_id = ?1",
            rusqlite::params![id],
            |row| row.get::<_, Option<i64>>(0),
        );

        not_found_as(session_id, result).map(fields::duration)
    }

    // ============================================
    // UPDATES
    // ============================================

    /// Set `duration = end_timestamp - start_ts` and return the stored value.
    ///
    /// The difference is stored as computed, negative included; only the
    /// read paths floor it to zero.
    #[tracing::instrument(skip(self))]
    pub fn update_duration(&self, session_id: u64, end_timestamp: u64) -> Result<i64> {
        let Some(id) = row_id(session_id) else {
            return Err(SessionError::NotFound(session_id));
        };
        let result = self.db.query_row(
            "UPDATE sessions SET duration = ?2 - start_ts WHERE session_id = ?1 RETURNING duration",
            rusqlite::params![id, end_timestamp],
            |row| row.get::<_, i64>(0),
        );

        let duration = not_found_as(session_id, result)?;
        if duration < 0 {
            tracing::warn!(duration, "session ended before it started");
        }
        tracing::debug!(duration, "duration updated");
        Ok(duration)
    }

    #[tracing::instrument(skip(self, key), fields(key_len = key.len()))]
    pub fn insert_encryption_key(&self, session_id: u64, key: &[u8]) -> Result<()> {
        let Some(id) = row_id(session_id) else {
            return Ok(());
        };
        let rows = self.db.exec(
            "UPDATE sessions SET file_key = ?1 WHERE session_id = ?2",
            rusqlite::params![key, id],
        )?;
        tracing::debug!(rows, "encryption key stored");
        Ok(())
    }

    /// Overwrite `user_id`, truncated to [`MAX_TEXT_CHARS`].
    #[tracing::instrument(skip(self, user_id))]
    pub fn insert_user_id(&self, session_id: u64, user_id: &str) -> Result<()> {
        let Some(id) = row_id(session_id) else {
            return Ok(());
        };
        let rows = self.db.exec(
            "UPDATE sessions SET user_id = ?1 WHERE session_id = ?2",
            rusqlite::params![fields::truncate(user_id), id],
        )?;
        tracing::debug!(rows, "user id stored");
        Ok(())
    }

    /// Overwrite `user_anonymous_id`, truncated to [`MAX_TEXT_CHARS`].
    #[tracing::instrument(skip(self, user_anonymous_id))]
    pub fn insert_user_anonymous_id(&self, session_id: u64, user_anonymous_id: &str) -> Result<()> {
        let Some(id) = row_id(session_id) else {
            return Ok(());
        };
        let rows = self.db.exec(
            "UPDATE sessions SET user_anonymous_id = ?1 WHERE session_id = ?2",
            rusqlite::params![fields::truncate(user_anonymous_id), id],
        )?;
        tracing::debug!(rows, "anonymous id stored");
        Ok(())
    }

    /// Set referrer and base referrer, only if no referrer is stored yet.
    ///
    /// A missing session and an already-set referrer both report
    /// `AlreadySet`; neither is an error.
    #[tracing::instrument(skip(self, referrer, base_referrer))]
    pub fn insert_referrer(
        &self,
        session_id: u64,
        referrer: &str,
        base_referrer: &str,
    ) -> Result<ReferrerUpdate> {
        let Some(id) = row_id(session_id) else {
            return Ok(ReferrerUpdate::AlreadySet);
        };
        let rows = self.db.exec(
            "UPDATE sessions SET referrer = ?1, base_referrer = ?2
             WHERE session_id = ?3 AND referrer IS NULL",
            rusqlite::params![
                fields::truncate(referrer),
                fields::truncate(base_referrer),
                id
            ],
        )?;

        if rows == 0 {
            tracing::debug!("referrer already set, skipped");
            Ok(ReferrerUpdate::AlreadySet)
        } else {
            tracing::debug!("referrer stored");
            Ok(ReferrerUpdate::Applied)
        }
    }

    /// Overwrite one metadata slot, truncated to [`MAX_TEXT_CHARS`].
    ///
    /// `slot` is 1-based; anything outside 1..=10 is rejected with
    /// `InvalidMetadataSlot` before the database is touched.
    #[tracing::instrument(skip(self, value))]
    pub fn insert_metadata(&self, session_id: u64, slot: u32, value: &str) -> Result<()> {
        let slot = MetadataSlot::try_from(slot)?;
        let Some(id) = row_id(session_id) else {
            return Ok(());
        };
        let rows = self.db.exec(
            METADATA_UPDATES[slot.position()],
            rusqlite::params![fields::truncate(value), id],
        )?;
        tracing::debug!(rows, column = %slot, "metadata stored");
        Ok(())
    }
}

/// SQLite rowid for a session id. Ids above `i64::MAX` cannot exist in the
/// table, so callers treat `None` as a missing row.
fn row_id(session_id: u64) -> Option<i64> {
    i64::try_from(session_id).ok()
}

fn not_found_as<T>(session_id: u64, result: rusqlite::Result<T>) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(SessionError::NotFound(session_id)),
        Err(e) => Err(e.into()),
    }
}

fn map_session(session_id: u64, row: &Row<'_>) -> rusqlite::Result<Session> {
    let mut metadata: [Option<String>; METADATA_SLOTS] = Default::default();
    for (pos, slot) in metadata.iter_mut().enumerate() {
        *slot = row.get(METADATA_FIRST_COLUMN + pos)?;
    }

    Ok(Session {
        session_id,
        platform: row.get(0)?,
        duration: fields::duration(row.get(1)?),
        project_id: row.get(2)?,
        timestamp: row.get(3)?,
        timezone: fields::text(row.get(4)?),
        user_uuid: row.get(5)?,
        user_os: fields::text(row.get(6)?),
        user_os_version: fields::text(row.get(7)?),
        user_device: fields::text(row.get(8)?),
        user_device_type: fields::text(row.get(9)?),
        user_country: fields::text(row.get(10)?),
        user_state: fields::text(row.get(11)?),
        user_city: fields::text(row.get(12)?),
        rev_id: fields::text(row.get(13)?),
        tracker_version: fields::text(row.get(14)?),
        user_id: row.get(15)?,
        user_anonymous_id: row.get(16)?,
        referrer: row.get(17)?,
        base_referrer: row.get(18)?,
        pages_count: row.get(19)?,
        events_count: row.get(20)?,
        errors_count: row.get(21)?,
        issue_types: fields::issue_types(ISSUE_TYPES_COLUMN, row.get(ISSUE_TYPES_COLUMN)?)?,
        user_browser: fields::text(row.get(23)?),
        user_browser_version: fields::text(row.get(24)?),
        issue_score: row.get(25)?,
        metadata: Metadata::from_columns(metadata),
        utm_source: row.get(36)?,
        utm_medium: row.get(37)?,
        utm_campaign: row.get(38)?,
        user_device_memory_size: fields::size(row.get(39)?),
        user_device_heap_size: fields::size(row.get(40)?),
        screen_width: row.get(41)?,
        screen_height: row.get(42)?,
    })
}
