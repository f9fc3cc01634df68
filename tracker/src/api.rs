use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use swarm_proto::rpc::{
    OwnersResponse, PeersResponse, RegisterRequest, RegisterResponse, StatsResponse,
};

use crate::state::Tracker;

/// Builds the tracker's RPC surface. Every route is total: there is no
/// 4xx for a well-formed body, only empty results.
pub fn router(tracker: Tracker) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/peers", get(get_peers))
        .route("/owners/{index}", get(owners_of))
        .route("/stats", get(stats))
        .fallback(not_found)
        .with_state(tracker)
}

async fn register(
    State(tracker): State<Tracker>,
    Json(req): Json<RegisterRequest>,
) -> Json<RegisterResponse> {
    tracing::info!(peer_id = %req.peer_id, num_pieces = req.pieces.len(), "register");
    tracker.register(req.peer_id, req.pieces);
    Json(RegisterResponse { ok: true })
}

async fn get_peers(State(tracker): State<Tracker>) -> Json<PeersResponse> {
    Json(PeersResponse {
        peers: tracker.get_peers(),
    })
}

async fn owners_of(
    State(tracker): State<Tracker>,
    Path(index): Path<u32>,
) -> Json<OwnersResponse> {
    Json(OwnersResponse {
        owners: tracker.owners_of(index),
    })
}

async fn stats(State(tracker): State<Tracker>) -> Json<StatsResponse> {
    let s = tracker.stats();
    Json(StatsResponse {
        peer_count: s.peer_count,
        register_count: s.register_count,
        lookup_count: s.lookup_count,
        uptime_secs: s.uptime_secs,
        popularity: s.popularity,
    })
}

/// Catches requests to unregistered paths. The three RPCs themselves
/// never produce an error response; this only fires for a route that
/// doesn't exist at all.
async fn not_found() -> Response {
    (axum::http::StatusCode::NOT_FOUND, "no such route").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn body_json<T: serde::de::DeserializeOwned>(resp: Response) -> T {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn register_then_get_peers_roundtrip() {
        let app = router(Tracker::new());

        let req = Request::post("/register")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::to_vec(&RegisterRequest {
                    peer_id: "127.0.0.1:9000".into(),
                    pieces: vec![0, 1, 2],
                })
                .unwrap(),
            ))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(Request::get("/peers").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body: PeersResponse = body_json(resp).await;
        assert_eq!(body.peers["127.0.0.1:9000"], vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn owners_of_unregistered_index_is_empty() {
        let app = router(Tracker::new());
        let resp = app
            .oneshot(Request::get("/owners/7").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: OwnersResponse = body_json(resp).await;
        assert!(body.owners.is_empty());
    }
}
