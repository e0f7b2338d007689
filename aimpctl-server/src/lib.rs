//! The HTTP transport. An axum `Router` wires the four request shapes the
//! remote-control surface exposes — RPC dispatch (JSON-RPC, XML-RPC,
//! query-string), track download, track upload, and static file serving —
//! onto a single `Arc<AppState>` passed through axum's `State` extractor.
//! No process-wide singleton holds this state; the binary constructs it
//! once at startup and everything downstream borrows it explicitly.

mod download;
mod rpc;
mod upload;

use std::path::PathBuf;
use std::sync::Arc;

use aimpctl_rpc::player::PlayerBackend;
use aimpctl_rpc::Dispatcher;
use aimpctl_store::Store;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

pub(crate) type StaticService = ServeDir<ServeFile>;

pub struct AppState {
    pub dispatcher: Dispatcher,
    pub store: Arc<Store>,
    pub player: Arc<dyn PlayerBackend>,
    pub document_root: PathBuf,
    pub enable_track_upload: bool,
    pub init_cookies: Vec<String>,
}

/// Builds the full router. Explicit routes for download/upload/XML-RPC take
/// priority; everything else falls through to the fallback built by
/// [`rpc::make_fallback`], which either dispatches an RPC request or serves
/// it from `document_root`. `ServeDir` rejects `..` path segments with 400
/// before any handler runs, and falls back to `index.htm` for a directory
/// request.
pub fn build_router(state: Arc<AppState>) -> Router {
    let index_file = state.document_root.join("index.htm");
    let static_service = ServeDir::new(&state.document_root).fallback(ServeFile::new(index_file));

    Router::new()
        .route(
            "/downloadTrack/playlist_id/{playlist_id}/track_id/{track_id}",
            get(download::download_track),
        )
        .route("/uploadTrack/playlist_id/{playlist_id}", post(upload::upload_track))
        .route("/RPC_XML", post(rpc::dispatch_rpc))
        .fallback(rpc::make_fallback(static_service))
        .layer(middleware::from_fn_with_state(state.clone(), inject_init_cookies))
        .with_state(state)
}

/// Appends the configured `Set-Cookie` values to any response whose request
/// carried no `Cookie` header.
async fn inject_init_cookies(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let had_cookie = request.headers().contains_key(axum::http::header::COOKIE);
    let mut response = next.run(request).await;
    if !had_cookie {
        for cookie in &state.init_cookies {
            if let Ok(value) = axum::http::HeaderValue::from_str(cookie) {
                response.headers_mut().append(axum::http::header::SET_COOKIE, value);
            }
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use aimpctl_rpc::build_dispatcher;
    use aimpctl_rpc::methods::Context;
    use aimpctl_rpc::player::tests::StubBackend;
    use aimpctl_rpc::rating::RatingWriter;
    use aimpctl_rpc::scheduler::Scheduler;
    use tower::ServiceExt;

    fn test_state(document_root: PathBuf) -> Arc<AppState> {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let player: Arc<dyn aimpctl_rpc::PlayerBackend> = Arc::new(StubBackend::default());
        let ctx = Arc::new(Context {
            store: store.clone(),
            player: player.clone(),
            scheduler: Arc::new(Scheduler::new()),
            rating: Arc::new(RatingWriter::new(document_root.join("ratings.txt"))),
            enable_physical_track_deletion: false,
            enable_scheduler: true,
        });
        Arc::new(AppState {
            dispatcher: build_dispatcher(ctx),
            store,
            player,
            document_root,
            enable_track_upload: false,
            init_cookies: vec!["aimpctl=1".into()],
        })
    }

    #[tokio::test]
    async fn static_file_is_served_for_plain_get() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.htm"), b"hello").unwrap();
        let app = build_router(test_state(dir.path().to_path_buf()));

        let response = app
            .oneshot(axum::http::Request::builder().uri("/index.htm").body(axum::body::Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn init_cookie_is_injected_when_request_has_none() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.htm"), b"hello").unwrap();
        let app = build_router(test_state(dir.path().to_path_buf()));

        let response = app
            .oneshot(axum::http::Request::builder().uri("/index.htm").body(axum::body::Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().get(axum::http::header::SET_COOKIE).is_some());
    }

    #[tokio::test]
    async fn query_string_get_is_routed_to_rpc_dispatch_not_static() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path().to_path_buf()));

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/?action=get_volume")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
