//! In-process stand-in for a PeerTube instance and the instance directory.
//!
//! Serves a small fixed catalog over real HTTP and records every query so
//! tests can check what the catalog client sent.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use parking_lot::Mutex;
use peerwatch_core::Preferences;
use peerwatch_core::config::CatalogConfig;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

/// Query received by the fake instance.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub endpoint: &'static str,
    pub params: HashMap<String, String>,
}

#[derive(Clone, Default)]
struct FakeState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FakeState {
    fn record(&self, endpoint: &'static str, params: &HashMap<String, String>) {
        self.requests.lock().push(RecordedRequest {
            endpoint,
            params: params.clone(),
        });
    }
}

/// Running fake instance. The server stops when this is dropped.
pub struct FakeInstance {
    pub url: String,
    state: FakeState,
    task: JoinHandle<()>,
}

impl FakeInstance {
    pub async fn start() -> Self {
        let state = FakeState::default();
        let router = Router::new()
            .route("/api/v1/videos", get(list_videos))
            .route("/api/v1/videos/{id}", get(video_details))
            .route("/api/v1/search/videos", get(search_videos))
            .route("/api/v1/instances", get(list_instances))
            .route("/api/v1/broken-instances", get(broken_directory))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            url: format!("http://{addr}"),
            state,
            task,
        }
    }

    /// Preferences pointing at this instance.
    pub fn preferences(&self) -> Preferences {
        let mut preferences = Preferences::default();
        preferences.set_preferred_instance(&self.url);
        preferences
    }

    /// Catalog configuration whose directory endpoint is this instance.
    pub fn catalog_config(&self) -> CatalogConfig {
        CatalogConfig {
            instance_directory_url: format!("{}/api/v1/instances", self.url),
            ..CatalogConfig::default()
        }
    }

    /// Catalog configuration whose directory endpoint always fails.
    pub fn broken_directory_config(&self) -> CatalogConfig {
        CatalogConfig {
            instance_directory_url: format!("{}/api/v1/broken-instances", self.url),
            ..CatalogConfig::default()
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }

    pub fn last_request(&self, endpoint: &str) -> Option<RecordedRequest> {
        self.requests()
            .into_iter()
            .rev()
            .find(|request| request.endpoint == endpoint)
    }
}

impl Drop for FakeInstance {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn video(uuid: &str, name: &str, is_live: bool) -> Value {
    let duration = if is_live { 0 } else { 125 };
    json!({
        "id": 1,
        "uuid": uuid,
        "name": name,
        "description": format!("About {name}"),
        "duration": duration,
        "thumbnailPath": format!("/static/thumbnails/{uuid}.jpg"),
        "publishedAt": "2024-03-01T10:00:00.000Z",
        "views": 42,
        "likes": 3,
        "dislikes": 1,
        "isLive": is_live,
    })
}

fn catalog() -> Vec<Value> {
    vec![
        video("clip-1", "Mountain Timelapse", false),
        video("hls-only", "River Crossing", false),
        video("live-1", "Morning Stream", true),
    ]
}

fn page(items: Vec<Value>, params: &HashMap<String, String>) -> Value {
    let start: usize = params.get("start").and_then(|s| s.parse().ok()).unwrap_or(0);
    let count: usize = params.get("count").and_then(|s| s.parse().ok()).unwrap_or(15);
    let total = items.len();
    let data: Vec<Value> = items.into_iter().skip(start).take(count).collect();
    json!({ "total": total, "data": data })
}

async fn list_videos(
    State(state): State<FakeState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    state.record("videos", &params);
    Json(page(catalog(), &params))
}

async fn search_videos(
    State(state): State<FakeState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    state.record("search", &params);
    let keywords = params
        .get("search")
        .map(|s| s.to_lowercase())
        .unwrap_or_default();
    let matches = catalog()
        .into_iter()
        .filter(|video| {
            video["name"]
                .as_str()
                .is_some_and(|name| name.to_lowercase().contains(&keywords))
        })
        .collect();
    Json(page(matches, &params))
}

async fn video_details(
    State(state): State<FakeState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state.record("details", &HashMap::from([("id".to_string(), id.clone())]));

    let details = match id.as_str() {
        "clip-1" => json!({
            "isLive": false,
            "files": [
                {"resolution": {"id": 720, "label": "720p"}, "torrentUrl": "https://media.example/torrents/clip-1-720.torrent"},
                {"resolution": {"id": 360, "label": "360p"}, "torrentUrl": "https://media.example/torrents/clip-1-360.torrent"}
            ],
            "streamingPlaylists": []
        }),
        "hls-only" => json!({
            "isLive": false,
            "files": [],
            "streamingPlaylists": [{
                "playlistUrl": "https://media.example/hls/hls-only/master.m3u8",
                "files": [
                    {"resolution": {"id": 1080, "label": "1080p"}, "magnetUri": "magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567&dn=hls-only-1080"}
                ]
            }]
        }),
        "live-1" => json!({
            "isLive": true,
            "files": [],
            "streamingPlaylists": [{"playlistUrl": "https://media.example/live/live-1/master.m3u8", "files": []}]
        }),
        "empty" => json!({ "isLive": false, "files": [], "streamingPlaylists": [] }),
        _ => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Video not found", "status": 404 })),
            );
        }
    };

    (StatusCode::OK, Json(details))
}

async fn list_instances(
    State(state): State<FakeState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    state.record("instances", &params);
    let instances = vec![
        json!({
            "id": 1,
            "name": "Framatube",
            "host": "framatube.org",
            "shortDescription": "Framasoft's instance",
            "totalLocalVideos": 850,
            "totalUsers": 12
        }),
        json!({
            "id": 2,
            "name": "Quiet Corner",
            "host": "quiet.example",
            "shortDescription": null,
            "totalLocalVideos": 3,
            "totalUsers": 1
        }),
    ];
    Json(page(instances, &params))
}

async fn broken_directory(
    State(state): State<FakeState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    state.record("broken-instances", &params);
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "errors": { "count": { "msg": "Count must be below 100", "param": "count" } }
        })),
    )
}
