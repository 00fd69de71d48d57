// Read-only access to an Rdio Scanner SQLite database.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, params};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::models::{
    AudioRow, CallRow, RowTimestamp, SystemRow, TalkgroupRow, decode_json_column,
};
use crate::error::Error;

/// File name Rdio Scanner uses inside its data directory.
pub const DEFAULT_DATABASE_FILE: &str = "rdio-scanner.db";

const DEFAULT_AUDIO_MIME: &str = "audio/mpeg";

const CALL_COLUMNS: &str = r#"
    c.id, c.dateTime, c.system, s.label, c.talkgroup, t.label, t.name,
    tg.label, g.label, c.frequency, c.frequencies, c.patches, c.sources,
    c.audioName, c.audioType
"#;

const CALL_JOINS: &str = r#"
    FROM rdio_scanner_calls c
    LEFT JOIN rdio_scanner_systems s ON s.id = c.system
    LEFT JOIN rdio_scanner_talkgroups t ON t.systemId = s._id AND t.id = c.talkgroup
    LEFT JOIN rdio_scanner_tags tg ON tg._id = t.tagId
    LEFT JOIN rdio_scanner_groups g ON g._id = t.groupId
"#;

/// Handle to an Rdio Scanner database file.
///
/// The connection is opened lazily on first query, read-only, and kept
/// until [`close`](Self::close). Cheap to clone; clones share the handle.
#[derive(Debug, Clone)]
pub struct RdioDatabase {
    path: PathBuf,
    conn: Arc<Mutex<Option<Connection>>>,
}

impl RdioDatabase {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            conn: Arc::new(Mutex::new(None)),
        }
    }

    /// Database at `data_dir/file_name`.
    pub fn in_data_dir(data_dir: &Path, file_name: &str) -> Self {
        Self::new(data_dir.join(file_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a connection is currently open.
    pub async fn is_open(&self) -> bool {
        self.conn.lock().await.is_some()
    }

    /// Drop the connection. The next query reopens it.
    pub async fn close(&self) {
        if self.conn.lock().await.take().is_some() {
            debug!(path = %self.path.display(), "closed rdio scanner database");
        }
    }

    async fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, Error> {
        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            debug!(path = %self.path.display(), "opening rdio scanner database");
            let conn = Connection::open_with_flags(
                &self.path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            *guard = Some(conn);
        }
        let conn = guard.as_ref().ok_or(Error::DatabaseClosed)?;
        Ok(f(conn)?)
    }

    // ── Systems & talkgroups ─────────────────────────────────────────

    pub async fn list_systems(&self) -> Result<Vec<SystemRow>, Error> {
        debug!("listing rdio systems");
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"SELECT id, label FROM rdio_scanner_systems ORDER BY "order", id"#,
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(SystemRow {
                    id: required_int(row, 0)?,
                    label: text_column(row, 1)?,
                })
            })?;
            skip_malformed(rows, "system")
        })
        .await
    }

    /// Talkgroups of one system, keyed by the system's public id.
    pub async fn list_talkgroups(&self, system_id: i64) -> Result<Vec<TalkgroupRow>, Error> {
        debug!(system_id, "listing rdio talkgroups");
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"SELECT s.id, t.id, t.label, t.name, tg.label, g.label
                   FROM rdio_scanner_talkgroups t
                   JOIN rdio_scanner_systems s ON s._id = t.systemId
                   LEFT JOIN rdio_scanner_tags tg ON tg._id = t.tagId
                   LEFT JOIN rdio_scanner_groups g ON g._id = t.groupId
                   WHERE s.id = ?1
                   ORDER BY t."order", t.id"#,
            )?;
            let rows = stmt.query_map(params![system_id], |row| {
                Ok(TalkgroupRow {
                    system_id: required_int(row, 0)?,
                    id: required_int(row, 1)?,
                    label: text_column(row, 2)?,
                    name: text_column(row, 3)?,
                    tag: text_column(row, 4)?,
                    group: text_column(row, 5)?,
                })
            })?;
            skip_malformed(rows, "talkgroup")
        })
        .await
    }

    // ── Calls ────────────────────────────────────────────────────────

    /// Newest calls first, at most `limit`.
    pub async fn recent_calls(&self, limit: usize) -> Result<Vec<CallRow>, Error> {
        debug!(limit, "listing recent rdio calls");
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {CALL_COLUMNS} {CALL_JOINS} ORDER BY c.dateTime DESC, c.id DESC LIMIT ?1"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![limit], call_from_row)?;
            skip_malformed(rows, "call")
        })
        .await
    }

    pub async fn find_call(&self, call_id: i64) -> Result<Option<CallRow>, Error> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {CALL_COLUMNS} {CALL_JOINS} WHERE c.id = ?1");
            match conn.query_row(&sql, params![call_id], call_from_row) {
                Err(e) if is_row_decode_error(&e) => {
                    warn!(call_id, error = %e, "skipping malformed rdio call row");
                    Ok(None)
                }
                other => other.optional(),
            }
        })
        .await
    }

    /// Stored audio for a call, or `None` if the row or its blob is missing.
    pub async fn call_audio(&self, call_id: i64) -> Result<Option<AudioRow>, Error> {
        debug!(call_id, "reading rdio call audio");
        let row = self
            .with_conn(|conn| {
                conn.query_row(
                    "SELECT audio, audioType, audioName FROM rdio_scanner_calls WHERE id = ?1",
                    params![call_id],
                    |row| {
                        Ok((
                            row.get::<_, Option<Vec<u8>>>(0)?,
                            row.get::<_, Option<String>>(1)?,
                            row.get::<_, Option<String>>(2)?,
                        ))
                    },
                )
                .optional()
            })
            .await?;

        Ok(row.and_then(|(data, mime, name)| {
            let data = data.filter(|d| !d.is_empty())?;
            Some(AudioRow {
                data,
                mime_type: mime
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| DEFAULT_AUDIO_MIME.to_owned()),
                file_name: name,
            })
        }))
    }
}

// ── Row mapping ──────────────────────────────────────────────────────

/// Errors raised while reading one row's values, as opposed to failures
/// of the query itself.
fn is_row_decode_error(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::IntegralValueOutOfRange(..)
            | rusqlite::Error::Utf8Error(..)
    )
}

/// Collect mapped rows, dropping the ones whose values cannot be read.
fn skip_malformed<T>(
    rows: impl Iterator<Item = rusqlite::Result<T>>,
    kind: &'static str,
) -> rusqlite::Result<Vec<T>> {
    let mut out = Vec::new();
    for row in rows {
        match row {
            Ok(value) => out.push(value),
            Err(e) if is_row_decode_error(&e) => {
                warn!(kind, error = %e, "skipping malformed rdio row");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(out)
}

fn call_from_row(row: &Row<'_>) -> rusqlite::Result<CallRow> {
    let id = required_int(row, 0)?;
    let frequencies = text_column(row, 10)?;
    let patches = text_column(row, 11)?;
    let sources = text_column(row, 12)?;

    Ok(CallRow {
        id,
        date_time: RowTimestamp::from_sql(row.get_ref(1)?),
        system: required_int(row, 2)?,
        system_label: text_column(row, 3)?,
        talkgroup: required_int(row, 4)?,
        talkgroup_label: text_column(row, 5)?,
        talkgroup_name: text_column(row, 6)?,
        tag: text_column(row, 7)?,
        group: text_column(row, 8)?,
        frequency: int_column(row, 9)?,
        frequencies: decode_json_column(frequencies.as_deref(), "frequencies", id),
        patches: decode_json_column(patches.as_deref(), "patches", id),
        sources: decode_json_column(sources.as_deref(), "sources", id),
        audio_name: text_column(row, 13)?,
        audio_type: text_column(row, 14)?,
    })
}

// SQLite does not enforce declared column types, so every value is
// read through `get_ref` and converted leniently.
fn text_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Text(raw) | ValueRef::Blob(raw) => Some(String::from_utf8_lossy(raw).into_owned()),
        ValueRef::Integer(v) => Some(v.to_string()),
        ValueRef::Real(v) => Some(v.to_string()),
        ValueRef::Null => None,
    })
}

/// An integer column the row cannot do without.
fn required_int(row: &Row<'_>, idx: usize) -> rusqlite::Result<i64> {
    match int_column(row, idx)? {
        Some(v) => Ok(v),
        None => {
            let value = row.get_ref(idx)?;
            Err(rusqlite::Error::InvalidColumnType(
                idx,
                row.as_ref().column_name(idx)?.to_owned(),
                value.data_type(),
            ))
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
fn int_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<i64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Integer(v) => Some(v),
        ValueRef::Real(v) => Some(v as i64),
        ValueRef::Text(raw) => std::str::from_utf8(raw).ok().and_then(|t| t.trim().parse().ok()),
        ValueRef::Null | ValueRef::Blob(_) => None,
    })
}
