//! Update command implementations

use anyhow::{Context, Result};

use crate::store::{Pool, SessionStore};

pub fn end<P: Pool>(store: &SessionStore<P>, session_id: u64, end_timestamp: u64) -> Result<()> {
    let duration = store
        .update_duration(session_id, end_timestamp)
        .with_context(|| format!("ending session {}", session_id))?;
    println!("Session {} duration set to {} ms", session_id, duration);
    Ok(())
}

pub fn user_id<P: Pool>(store: &SessionStore<P>, session_id: u64, user_id: &str) -> Result<()> {
    store.insert_user_id(session_id, user_id)?;
    println!("Updated user id of session {}", session_id);
    Ok(())
}

pub fn anonymous_id<P: Pool>(store: &SessionStore<P>, session_id: u64, anon_id: &str) -> Result<()> {
    store.insert_user_anonymous_id(session_id, anon_id)?;
    println!("Updated anonymous id of session {}", session_id);
    Ok(())
}

pub fn referrer<P: Pool>(
    store: &SessionStore<P>,
    session_id: u64,
    referrer: &str,
    base_referrer: &str,
) -> Result<()> {
    if store
        .insert_referrer(session_id, referrer, base_referrer)?
        .applied()
    {
        println!("Referrer set for session {}", session_id);
    } else {
        println!(
            "Session {} already has a referrer (or does not exist); left unchanged",
            session_id
        );
    }
    Ok(())
}

pub fn metadata<P: Pool>(store: &SessionStore<P>, session_id: u64, slot: u32, value: &str) -> Result<()> {
    store.insert_metadata(session_id, slot, value)?;
    println!("Set metadata_{} on session {}", slot, session_id);
    Ok(())
}

pub fn encryption_key<P: Pool>(store: &SessionStore<P>, session_id: u64, key: &str) -> Result<()> {
    store.insert_encryption_key(session_id, key.as_bytes())?;
    println!("Stored encryption key for session {}", session_id);
    Ok(())
}
