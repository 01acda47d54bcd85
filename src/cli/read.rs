//! Read command implementations

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::error::SessionError;
use crate::session::Session;
use crate::store::{Pool, SessionStore};

pub fn get<P: Pool>(store: &SessionStore<P>, session_id: u64, json: bool) -> Result<()> {
    let session = match store.get(session_id) {
        Ok(s) => s,
        Err(SessionError::NotFound(_)) => {
            println!("Session '{}' not found.", session_id);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
    } else {
        print_session(&session);
    }
    Ok(())
}

pub fn get_many<P: Pool>(store: &SessionStore<P>, session_ids: &[u64]) -> Result<()> {
    let mut sessions = store.get_many(session_ids)?;

    if sessions.is_empty() {
        println!("No matching sessions.");
        return Ok(());
    }

    sessions.sort_by_key(|s| s.session_id);
    println!("{:<22} {:<26} {:>12}", "Session", "Start", "Duration ms");
    println!("{}", "-".repeat(62));
    for s in sessions {
        println!(
            "{:<22} {:<26} {:>12}",
            s.session_id,
            format_millis(s.timestamp),
            s.duration
        );
    }
    Ok(())
}

pub fn duration<P: Pool>(store: &SessionStore<P>, session_id: u64) -> Result<()> {
    println!("{}", store.get_duration(session_id)?);
    Ok(())
}

fn format_millis(ts: u64) -> String {
    i64::try_from(ts)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}

fn print_session(s: &Session) {
    println!("\n{}", "=".repeat(80));
    println!("Session: {} (project {})", s.session_id, s.project_id);
    println!("Start: {} | Duration: {} ms", format_millis(s.timestamp), s.duration);
    println!("Platform: {} | Tracker: {}", s.platform, s.tracker_version);
    println!("{}", "=".repeat(80));

    println!(
        "Device: {} {} ({}x{})",
        s.user_device, s.user_device_type, s.screen_width, s.screen_height
    );
    println!("OS: {} {}", s.user_os, s.user_os_version);
    println!("Browser: {} {}", s.user_browser, s.user_browser_version);
    println!(
        "Location: {} / {} / {} ({})",
        s.user_country, s.user_state, s.user_city, s.timezone
    );
    println!("User: {}", s.user_id.as_deref().unwrap_or("-"));
    println!("Anonymous: {}", s.user_anonymous_id.as_deref().unwrap_or("-"));
    println!("Referrer: {}", s.referrer.as_deref().unwrap_or("-"));
    println!(
        "Counts: {} pages, {} events, {} errors",
        s.pages_count, s.events_count, s.errors_count
    );

    if !s.issue_types.is_empty() {
        let tags: Vec<&str> = s.issue_types.iter().map(|t| t.as_str()).collect();
        println!("Issues: {}", tags.join(", "));
    }

    for (slot, value) in s.metadata.iter() {
        println!("{}: {}", slot, value);
    }
}
