//! `GET /downloadTrack/playlist_id/{playlist_id}/track_id/{track_id}`:
//! resolves the entry through the store, reads the file from disk, and
//! answers with `Content-Length`, a MIME type guessed from the extension,
//! and `Content-Disposition: attachment` carrying a UTF-8 basename.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path as PathParams, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::AppState;

#[derive(Deserialize)]
pub struct DownloadParams {
    playlist_id: i32,
    track_id: i32,
}

pub async fn download_track(State(state): State<Arc<AppState>>, PathParams(params): PathParams<DownloadParams>) -> Response {
    let entry = match state.store.get_playlist_entry_info(params.playlist_id, params.track_id).await {
        Ok(entry) => entry,
        Err(_) => return StatusCode::NOT_FOUND.into_response(),
    };

    let path = Path::new(&entry.filename);
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(_) => return StatusCode::NOT_FOUND.into_response(),
    };

    let basename = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "track".to_owned());
    let mime = mime_guess::from_path(path).first_or_octet_stream();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime.as_ref())
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(header::CONTENT_DISPOSITION, format!("attachment; filename=\"{basename}\""))
        .body(Body::from(bytes))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aimpctl_rpc::build_dispatcher;
    use aimpctl_rpc::methods::Context;
    use aimpctl_rpc::player::tests::StubBackend;
    use aimpctl_rpc::rating::RatingWriter;
    use aimpctl_rpc::scheduler::Scheduler;
    use aimpctl_store::Store;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn missing_track_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let player: Arc<dyn aimpctl_rpc::PlayerBackend> = Arc::new(StubBackend::default());
        let state = Arc::new(AppState {
            dispatcher: build_dispatcher(Arc::new(Context {
                store: Arc::new(Store::open_in_memory().unwrap()),
                player: player.clone(),
                scheduler: Arc::new(Scheduler::new()),
                rating: Arc::new(RatingWriter::new(dir.path().join("ratings.txt"))),
                enable_physical_track_deletion: false,
                enable_scheduler: true,
            })),
            store: Arc::new(Store::open_in_memory().unwrap()),
            player,
            document_root: dir.path().to_path_buf(),
            enable_track_upload: false,
            init_cookies: vec![],
        });
        let app = crate::build_router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/downloadTrack/playlist_id/1/track_id/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
