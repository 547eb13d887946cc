/// Audio collection API routes
use crate::{
    error::{Result, ServerError},
    middleware::AuthenticatedUser,
    services::NewUpload,
    state::AppState,
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tape_core::{AudioId, AudioRecord, UserId};

/// Wire shape of an audio record
#[derive(Debug, Serialize)]
pub struct AudioView {
    #[serde(rename = "_id")]
    pub id: AudioId,
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_by: Option<UserId>,
    pub file_name: String,
    pub name: String,
    pub duration: f64,
    pub stream_url: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<AudioRecord> for AudioView {
    fn from(record: AudioRecord) -> Self {
        Self {
            stream_url: format!("/audio/{}/stream", record.id),
            id: record.id,
            user_id: record.owner_id,
            shared_by: record.shared_from_owner_id,
            file_name: record.file_name,
            name: record.display_name,
            duration: record.duration_seconds,
            uploaded_at: record.uploaded_at,
        }
    }
}

/// POST /audio/upload/:user_id
///
/// Multipart fields: `file` (audio bytes), `name`, `duration` (seconds).
/// Responds with the new audio id.
pub async fn upload_audio(
    Path(user_id): Path<String>,
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<AudioId>)> {
    let owner = UserId::new(user_id);
    auth.ensure_is(&owner)?;

    let upload = parse_upload(&headers, body).await?;
    let record = app_state.library.upload(&owner, upload).await?;

    Ok((StatusCode::CREATED, Json(record.id)))
}

async fn parse_upload(headers: &HeaderMap, body: Bytes) -> Result<NewUpload> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ServerError::Validation("Missing Content-Type".to_string()))?;

    if !content_type.starts_with("multipart/form-data") {
        return Err(ServerError::Validation(
            "Expected multipart/form-data".to_string(),
        ));
    }

    let boundary = multer::parse_boundary(content_type)
        .map_err(|_| ServerError::Validation("Missing boundary".to_string()))?;

    // Convert Bytes to a stream for multer
    let stream = futures_util::stream::once(async move { Ok::<_, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut file: Option<(String, String, Bytes)> = None;
    let mut name: Option<String> = None;
    let mut duration: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::Validation(format!("Failed to parse multipart: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("unknown").to_string();
                let file_type = field
                    .content_type()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                let data = field.bytes().await.map_err(|e| {
                    ServerError::Validation(format!("Failed to read file: {}", e))
                })?;
                file = Some((file_name, file_type, data));
            }
            "name" => name = Some(read_text(field).await?),
            "duration" => duration = Some(read_text(field).await?),
            _ => {}
        }
    }

    let (file_name, content_type, data) =
        file.ok_or_else(|| ServerError::Validation("Missing file".to_string()))?;
    let display_name = name.ok_or_else(|| ServerError::Validation("Missing name".to_string()))?;
    let duration_seconds = duration
        .ok_or_else(|| ServerError::Validation("Missing duration".to_string()))?
        .trim()
        .parse::<f64>()
        .map_err(|_| ServerError::Validation("Duration must be a number".to_string()))?;

    Ok(NewUpload {
        file_name,
        content_type,
        display_name,
        duration_seconds,
        data,
    })
}

async fn read_text(field: multer::Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| ServerError::Validation(format!("Failed to read field: {}", e)))
}

/// GET /audio/all/:user_id
pub async fn list_audio(
    Path(user_id): Path<String>,
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<Vec<AudioView>>> {
    let owner = UserId::new(user_id);
    auth.ensure_is(&owner)?;

    let records = app_state.library.list(&owner).await?;
    Ok(Json(records.into_iter().map(AudioView::from).collect()))
}

/// GET /audio/:audio_id
pub async fn get_audio(
    Path(audio_id): Path<String>,
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<AudioView>> {
    let record = app_state
        .library
        .get(auth.user_id(), &AudioId::new(audio_id))
        .await?;
    Ok(Json(record.into()))
}

/// PUT /audio/update/:user_id/:audio_id/:name
pub async fn rename_audio(
    Path((user_id, audio_id, name)): Path<(String, String, String)>,
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<AudioView>> {
    let owner = UserId::new(user_id);
    auth.ensure_is(&owner)?;

    if name.trim().is_empty() {
        return Err(ServerError::Validation("Name cannot be empty".to_string()));
    }

    let record = app_state
        .library
        .rename(&owner, &AudioId::new(audio_id), &name)
        .await?;
    Ok(Json(record.into()))
}

/// DELETE /audio/delete/:user_id/:audio_id
pub async fn delete_audio(
    Path((user_id, audio_id)): Path<(String, String)>,
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<StatusCode> {
    let owner = UserId::new(user_id);
    auth.ensure_is(&owner)?;

    app_state
        .library
        .delete(&owner, &AudioId::new(audio_id))
        .await?;
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn multipart_body(boundary: &str, parts: &[(&str, Option<(&str, &str)>, &str)]) -> Bytes {
        let mut body = String::new();
        for (name, file, value) in parts {
            body.push_str(&format!("--{boundary}\r\n"));
            match file {
                Some((file_name, content_type)) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )),
                None => body.push_str(&format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")),
            }
            body.push_str(value);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{boundary}--\r\n"));
        Bytes::from(body)
    }

    fn headers(boundary: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_str(&format!("multipart/form-data; boundary={boundary}")).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn parses_all_fields() {
        let body = multipart_body(
            "XyZ",
            &[
                ("file", Some(("take.mp3", "audio/mpeg")), "ID3data"),
                ("name", None, "Take one"),
                ("duration", None, "12.5"),
            ],
        );

        let upload = parse_upload(&headers("XyZ"), body).await.unwrap();
        assert_eq!(upload.file_name, "take.mp3");
        assert_eq!(upload.content_type, "audio/mpeg");
        assert_eq!(upload.display_name, "Take one");
        assert_eq!(upload.duration_seconds, 12.5);
        assert_eq!(&upload.data[..], b"ID3data");
    }

    #[tokio::test]
    async fn rejects_non_numeric_duration() {
        let body = multipart_body(
            "XyZ",
            &[
                ("file", Some(("take.mp3", "audio/mpeg")), "ID3data"),
                ("name", None, "Take one"),
                ("duration", None, "three minutes"),
            ],
        );

        let result = parse_upload(&headers("XyZ"), body).await;
        assert!(matches!(result, Err(ServerError::Validation(_))));
    }

    #[tokio::test]
    async fn rejects_missing_file() {
        let body = multipart_body("XyZ", &[("name", None, "Take"), ("duration", None, "1")]);
        let result = parse_upload(&headers("XyZ"), body).await;
        assert!(matches!(result, Err(ServerError::Validation(_))));
    }

    #[test]
    fn view_links_to_stream_route() {
        let record = AudioRecord {
            id: AudioId::new("abc"),
            owner_id: UserId::new("bob"),
            file_name: "f.mp3".to_string(),
            display_name: "F".to_string(),
            duration_seconds: 2.0,
            stream_ref: "blob.mp3".to_string(),
            uploaded_at: Utc::now(),
            shared_from_owner_id: Some(UserId::new("alice")),
        };

        let json = serde_json::to_value(AudioView::from(record)).unwrap();
        assert_eq!(json["_id"], "abc");
        assert_eq!(json["stream_url"], "/audio/abc/stream");
        assert_eq!(json["shared_by"], "alice");
        assert_eq!(json["name"], "F");
    }
}
