//! Add command implementation

use anyhow::{Context, Result};
use std::io::Read;

use crate::session::NewSession;
use crate::store::{Pool, SessionStore};

/// Insert a session described by a JSON document (`-` reads stdin).
pub fn run<P: Pool>(store: &SessionStore<P>, source: &str) -> Result<()> {
    let raw = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading session from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source).with_context(|| format!("reading {}", source))?
    };

    let session: NewSession = serde_json::from_str(&raw).context("parsing session JSON")?;
    store
        .add(&session)
        .with_context(|| format!("adding session {}", session.session_id))?;

    println!("Session {} added", session.session_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqlitePool;

    #[test]
    fn test_add_from_json_file() {
        let pool = SqlitePool::open_in_memory().unwrap();
        pool.migrate().unwrap();
        let store = SessionStore::new(pool);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(
            &path,
            r#"{"session_id": 77, "project_id": 3, "timestamp": 1700000000000,
                "user_uuid": "abc", "platform": "ios", "user_browser": ""}"#,
        )
        .unwrap();

        run(&store, path.to_str().unwrap()).unwrap();

        let sess = store.get(77).unwrap();
        assert_eq!(sess.platform, "ios");
        assert_eq!(sess.user_browser, "");
        assert!(run(&store, path.to_str().unwrap()).is_err());
    }
}
