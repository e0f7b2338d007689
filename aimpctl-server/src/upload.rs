//! `POST /uploadTrack/playlist_id/{playlist_id}`: consumes a pre-parsed
//! multipart form. A file field whose extension is on the player's
//! supported-upload list is copied to a permanent path under
//! `document_root/uploads` and added to the playlist; a text field is
//! treated as a URL and added the same way. One failing part aborts the
//! whole request — nothing partially ingested is left behind to be
//! rediscovered on the next listing.

use std::path::Path as FsPath;
use std::sync::Arc;

use axum::extract::{Multipart, Path as PathParams, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::AppState;

#[derive(Deserialize)]
pub struct UploadParams {
    playlist_id: i32,
}

pub async fn upload_track(
    State(state): State<Arc<AppState>>,
    PathParams(params): PathParams<UploadParams>,
    mut multipart: Multipart,
) -> Response {
    if !state.enable_track_upload {
        return StatusCode::FORBIDDEN.into_response();
    }

    let supported: Vec<String> = state.player.supported_upload_extensions();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(_) => return StatusCode::FORBIDDEN.into_response(),
        };

        let file_name = field.file_name().map(str::to_owned);
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(_) => return StatusCode::FORBIDDEN.into_response(),
        };

        let url = match file_name {
            Some(name) => {
                let extension = FsPath::new(&name).extension().and_then(|e| e.to_str()).unwrap_or("").to_lowercase();
                if !supported.iter().any(|ext| ext.eq_ignore_ascii_case(&extension)) {
                    return StatusCode::FORBIDDEN.into_response();
                }
                match persist_upload(&state, &name, &bytes).await {
                    Ok(path) => path,
                    Err(_) => return StatusCode::FORBIDDEN.into_response(),
                }
            }
            None => match String::from_utf8(bytes.to_vec()) {
                Ok(url) => url,
                Err(_) => return StatusCode::FORBIDDEN.into_response(),
            },
        };

        if state.player.add_url_to_playlist(params.playlist_id, &url).is_err() {
            return StatusCode::FORBIDDEN.into_response();
        }
    }

    StatusCode::OK.into_response()
}

async fn persist_upload(state: &AppState, original_name: &str, bytes: &[u8]) -> std::io::Result<String> {
    let uploads_dir = state.document_root.join("uploads");
    tokio::fs::create_dir_all(&uploads_dir).await?;
    let destination = uploads_dir.join(original_name);
    tokio::fs::write(&destination, bytes).await?;
    Ok(destination.to_string_lossy().into_owned())
}
