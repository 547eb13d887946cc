//! Audio metadata queries

use crate::error::Result;
use crate::timestamp_from_millis;
use sqlx::SqlitePool;
use tape_core::types::{AudioId, AudioRecord, AudioUpdate, UserId};

const COLUMNS: &str = "id, owner_id, file_name, display_name, duration_seconds, stream_ref, \
                       uploaded_at, shared_from_owner_id";

#[derive(sqlx::FromRow)]
struct AudioRow {
    id: String,
    owner_id: String,
    file_name: String,
    display_name: String,
    duration_seconds: f64,
    stream_ref: String,
    uploaded_at: i64,
    shared_from_owner_id: Option<String>,
}

impl TryFrom<AudioRow> for AudioRecord {
    type Error = crate::StorageError;

    fn try_from(row: AudioRow) -> Result<Self> {
        Ok(AudioRecord {
            id: AudioId::new(row.id),
            owner_id: UserId::new(row.owner_id),
            file_name: row.file_name,
            display_name: row.display_name,
            duration_seconds: row.duration_seconds,
            stream_ref: row.stream_ref,
            uploaded_at: timestamp_from_millis("uploaded_at", row.uploaded_at)?,
            shared_from_owner_id: row.shared_from_owner_id.map(UserId::new),
        })
    }
}

fn into_records(rows: Vec<AudioRow>) -> Result<Vec<AudioRecord>> {
    rows.into_iter().map(AudioRecord::try_from).collect()
}

/// Get a single record by id
pub async fn get_by_id(pool: &SqlitePool, id: &AudioId) -> Result<Option<AudioRecord>> {
    let row = sqlx::query_as::<_, AudioRow>(&format!("SELECT {COLUMNS} FROM audio WHERE id = ?"))
        .bind(id.as_str())
        .fetch_optional(pool)
        .await?;

    row.map(AudioRecord::try_from).transpose()
}

/// Records owned by a user, newest first
///
/// Ties on `uploaded_at` fall back to insertion order.
pub async fn list_by_owner(pool: &SqlitePool, owner: &UserId) -> Result<Vec<AudioRecord>> {
    let rows = sqlx::query_as::<_, AudioRow>(&format!(
        "SELECT {COLUMNS} FROM audio WHERE owner_id = ? ORDER BY uploaded_at DESC, rowid DESC"
    ))
    .bind(owner.as_str())
    .fetch_all(pool)
    .await?;

    into_records(rows)
}

/// Records of any owner sharing one blob
pub async fn list_by_stream_ref(pool: &SqlitePool, stream_ref: &str) -> Result<Vec<AudioRecord>> {
    let rows = sqlx::query_as::<_, AudioRow>(&format!(
        "SELECT {COLUMNS} FROM audio WHERE stream_ref = ? ORDER BY uploaded_at DESC, rowid DESC"
    ))
    .bind(stream_ref)
    .fetch_all(pool)
    .await?;

    into_records(rows)
}

/// Insert a record
pub async fn insert(pool: &SqlitePool, record: &AudioRecord) -> Result<()> {
    sqlx::query(&format!(
        "INSERT INTO audio ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(record.id.as_str())
    .bind(record.owner_id.as_str())
    .bind(&record.file_name)
    .bind(&record.display_name)
    .bind(record.duration_seconds)
    .bind(&record.stream_ref)
    .bind(record.uploaded_at.timestamp_millis())
    .bind(record.shared_from_owner_id.as_ref().map(UserId::as_str))
    .execute(pool)
    .await?;

    Ok(())
}

/// Apply the set fields of `update`
pub async fn update(pool: &SqlitePool, id: &AudioId, update: &AudioUpdate) -> Result<()> {
    if let Some(name) = &update.display_name {
        sqlx::query("UPDATE audio SET display_name = ? WHERE id = ?")
            .bind(name)
            .bind(id.as_str())
            .execute(pool)
            .await?;
    }

    Ok(())
}

/// Delete a record
pub async fn delete(pool: &SqlitePool, id: &AudioId) -> Result<()> {
    sqlx::query("DELETE FROM audio WHERE id = ?")
        .bind(id.as_str())
        .execute(pool)
        .await?;

    Ok(())
}
