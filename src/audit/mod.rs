//! Audit log: SQLite-based operation history.
//!
//! Records every vault operation (init, project creation, grants, secret
//! writes, failed unlocks) in `audit.db` next to the record store.  Only
//! ids, key names and outcomes are written; never values or key material.
//!
//! If the database can't be opened or written to, operations silently
//! continue without logging.

use std::path::Path;

use chrono::Utc;
use rusqlite::Connection;

/// SQLite-backed audit log.
pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open (or create) the audit database at `<dir>/audit.db`.
    ///
    /// Returns `None` if the database can't be opened; callers should
    /// treat this as "audit logging unavailable" and continue normally.
    pub fn open(dir: &Path) -> Option<Self> {
        let db_path = dir.join("audit.db");
        let conn = Connection::open(&db_path).ok()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&db_path, perms);
        }

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS audit_log (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp   TEXT NOT NULL,
                operation   TEXT NOT NULL,
                principal   TEXT NOT NULL,
                project_id  TEXT,
                key_name    TEXT,
                details     TEXT
            );",
        )
        .ok()?;

        Some(Self { conn })
    }

    /// Record an operation. Errors are silently ignored.
    pub fn log(
        &self,
        operation: &str,
        principal: &str,
        project_id: Option<&str>,
        key_name: Option<&str>,
        details: Option<&str>,
    ) {
        let now = Utc::now().to_rfc3339();
        let _ = self.conn.execute(
            "INSERT INTO audit_log (timestamp, operation, principal, project_id, key_name, details)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![now, operation, principal, project_id, key_name, details],
        );
    }
}

/// Convenience helper: log an event next to the record store at `store_path`.
///
/// Never fails the parent operation.
pub fn log_audit(
    store_path: &Path,
    op: &str,
    principal: &str,
    project_id: Option<&str>,
    key: Option<&str>,
    details: Option<&str>,
) {
    let Some(dir) = store_path.parent() else {
        return;
    };

    if let Some(audit) = AuditLog::open(dir) {
        audit.log(op, principal, project_id, key, details);
    }
}
