//! RPC dispatch handlers: the explicit `/RPC_XML` route and the fallback
//! that distinguishes an RPC request (any `POST`, or a `GET` carrying a
//! query string) from a plain static-file `GET`.

use std::sync::Arc;

use aimpctl_rpc::dispatch::render_pending;
use aimpctl_rpc::DispatchResult;
use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;

use crate::{AppState, StaticService};

pub async fn dispatch_rpc(State(state): State<Arc<AppState>>, uri: Uri, body: Bytes) -> Response {
    run_dispatch(&state, &uri, &body).await
}

type BoxFuture = std::pin::Pin<Box<dyn std::future::Future<Output = Response> + Send>>;

/// Builds the handler for everything not claimed by the explicit
/// download/upload/`/RPC_XML` routes: a `POST`, or a `GET` carrying a query
/// string, is an RPC request; a plain `GET` is served from `document_root`
/// via the captured `ServeDir`/`ServeFile` service.
pub fn make_fallback(static_service: StaticService) -> impl Fn(State<Arc<AppState>>, Request) -> BoxFuture + Clone {
    move |State(state): State<Arc<AppState>>, request: Request| {
        let static_service = static_service.clone();
        Box::pin(async move {
            let method = request.method().clone();
            let uri = request.uri().clone();
            if method == Method::POST || uri.query().is_some() {
                let body = axum::body::to_bytes(request.into_body(), usize::MAX).await.unwrap_or_default();
                run_dispatch(&state, &uri, &body).await
            } else {
                match static_service.oneshot(request).await {
                    Ok(response) => response.into_response(),
                    Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
                }
            }
        })
    }
}

async fn run_dispatch(state: &AppState, uri: &Uri, body: &[u8]) -> Response {
    let uri_str = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| uri.path().to_owned());

    match state.dispatcher.dispatch(&uri_str, body).await {
        DispatchResult::Reply { body, content_type } => Response::builder()
            .status(StatusCode::OK)
            .header(axum::http::header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap(),
        DispatchResult::Pending { frontend, request_id, rx } => {
            let value = rx.await.unwrap_or(aimpctl_value::Value::Null);
            let (body, content_type) = render_pending(frontend.as_ref(), &request_id, value);
            Response::builder()
                .status(StatusCode::OK)
                .header(axum::http::header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap()
        }
    }
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
    use std::path::PathBuf;

    fn state() -> AppState {
        let store = std::sync::Arc::new(Store::open_in_memory().unwrap());
        let dir = tempfile::tempdir().unwrap();
        let player: std::sync::Arc<dyn aimpctl_rpc::PlayerBackend> = std::sync::Arc::new(StubBackend::default());
        let ctx = std::sync::Arc::new(Context {
            store: store.clone(),
            player: player.clone(),
            scheduler: std::sync::Arc::new(Scheduler::new()),
            rating: std::sync::Arc::new(RatingWriter::new(dir.path().join("ratings.txt"))),
            enable_physical_track_deletion: false,
            enable_scheduler: true,
        });
        AppState {
            dispatcher: build_dispatcher(ctx),
            store,
            player,
            document_root: PathBuf::from(dir.path()),
            enable_track_upload: false,
            init_cookies: vec![],
        }
    }

    #[tokio::test]
    async fn json_rpc_post_dispatches_through_the_registry() {
        let state = state();
        let uri: Uri = "/".parse().unwrap();
        let body = br#"{"method":"VolumeLevel","params":{"level":50},"id":2}"#;
        let response = run_dispatch(&state, &uri, body).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn query_string_get_resolves_through_compat_dialect() {
        let state = state();
        let uri: Uri = "/?action=get_volume".parse().unwrap();
        let response = run_dispatch(&state, &uri, b"").await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
