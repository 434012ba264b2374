//! Append-only audit trail of health checks.
//!
//! `health_checks` rows are written by [`log_visit`] and read back, newest
//! first, by [`recent_logs`]. Nothing in this crate updates or deletes rows.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use sqlx::{Connection, Row};

use super::{DbConnection, StoreError};

/// Timestamp layout used on the wire for every backend
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Layouts SQLite (and text-typed columns in general) hand back
const TEXT_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Rust type the MySQL `checked_at TIMESTAMP` column decodes into.
///
/// sqlx only accepts `NaiveDateTime` for `DATETIME` columns; `DateTime<Utc>`
/// covers both `TIMESTAMP` and `DATETIME`. Sessions run at UTC.
type MySqlCheckedAt = DateTime<Utc>;

/// One row of `health_checks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheckRecord {
    pub id: i64,
    pub client_ip: String,
    /// Always `YYYY-MM-DDTHH:MM:SS`, regardless of backend
    pub checked_at: String,
}

/// Record that `client_ip` triggered a health check.
///
/// Runs inside its own transaction on the caller's connection and commits
/// before returning.
pub async fn log_visit(conn: &mut DbConnection, client_ip: &str) -> Result<(), StoreError> {
    const INSERT: &str = "INSERT INTO health_checks (client_ip) VALUES (?)";

    match conn {
        DbConnection::MySql(conn) => {
            let mut tx = conn.begin().await?;
            sqlx::query(INSERT).bind(client_ip).execute(&mut *tx).await?;
            tx.commit().await?;
        }
        DbConnection::Sqlite(conn) => {
            let mut tx = conn.begin().await?;
            sqlx::query(INSERT).bind(client_ip).execute(&mut *tx).await?;
            tx.commit().await?;
        }
    }

    tracing::debug!(client_ip, "Recorded health check");
    Ok(())
}

/// Fetch at most `limit` records, most recent first.
///
/// Rows sharing a `checked_at` second come back in descending `id` order.
pub async fn recent_logs(
    conn: &mut DbConnection,
    limit: u32,
) -> Result<Vec<HealthCheckRecord>, StoreError> {
    let limit = i64::from(limit);

    let records = match conn {
        DbConnection::MySql(conn) => {
            let rows = sqlx::query(
                "SELECT id, client_ip, checked_at FROM health_checks \
                 ORDER BY checked_at DESC, id DESC LIMIT ?",
            )
            .bind(limit)
            .fetch_all(&mut *conn)
            .await?;

            rows.iter()
                .map(|row| {
                    let checked_at: MySqlCheckedAt = row.try_get("checked_at")?;
                    Ok(HealthCheckRecord {
                        id: row.try_get("id")?,
                        client_ip: row.try_get("client_ip")?,
                        checked_at: format_timestamp(&checked_at.naive_utc()),
                    })
                })
                .collect::<Result<Vec<_>, sqlx::Error>>()?
        }
        DbConnection::Sqlite(conn) => {
            // SQLite stores CURRENT_TIMESTAMP as text; read it as such.
            let rows = sqlx::query(
                "SELECT id, client_ip, CAST(checked_at AS TEXT) AS checked_at FROM health_checks \
                 ORDER BY checked_at DESC, id DESC LIMIT ?",
            )
            .bind(limit)
            .fetch_all(&mut *conn)
            .await?;

            rows.iter()
                .map(|row| {
                    let checked_at: String = row.try_get("checked_at")?;
                    Ok(HealthCheckRecord {
                        id: row.try_get("id")?,
                        client_ip: row.try_get("client_ip")?,
                        checked_at: normalize_timestamp(&checked_at),
                    })
                })
                .collect::<Result<Vec<_>, sqlx::Error>>()?
        }
    };

    Ok(records)
}

fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Bring a textual timestamp into the wire layout. Unrecognised text passes through.
pub(crate) fn normalize_timestamp(raw: &str) -> String {
    let raw = raw.trim();

    for layout in TEXT_TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, layout) {
            return format_timestamp(&ts);
        }
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return format_timestamp(&ts.naive_utc());
    }

    raw.to_string()
}
