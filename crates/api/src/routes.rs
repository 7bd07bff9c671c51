use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use core_sim::{SimConfig, SimState};
use runtime::engine::{LoopEngine, RunSummary};
use serde::{Deserialize, Serialize};

use crate::{
    state::{AppState, RunEvent},
    ws,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/static/styles.css", get(styles))
        .route("/static/app.js", get(script))
        .route("/runs", post(start_run))
        .route("/runs/:run_id", get(run_summary))
        .route("/ws/events", get(ws::events_socket))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(ui::index_html())
}

async fn styles() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css")], ui::styles_css())
}

async fn script() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/javascript")], ui::app_js())
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct StartRunRequest {
    pub supply_initial: f64,
    pub borrow_initial: f64,
    pub supply_target: f64,
    pub wallet_balance: f64,
    /// Falls back to the server-configured cap when absent.
    pub max_operations: Option<u64>,
}

impl Default for StartRunRequest {
    fn default() -> Self {
        Self {
            supply_initial: 1_000.0,
            borrow_initial: 600.0,
            supply_target: 1_500.0,
            wallet_balance: 0.0,
            max_operations: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct StartRunResponse {
    run_id: u64,
    summary: RunSummary,
}

async fn start_run(
    State(state): State<AppState>,
    body: Option<Json<StartRunRequest>>,
) -> Result<impl IntoResponse, StatusCode> {
    let request = body.map(|Json(request)| request).unwrap_or_default();

    let run_id = state
        .allocate_run_id()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let sim_state = SimState::new(
        request.supply_initial,
        request.borrow_initial,
        request.supply_target,
        request.wallet_balance,
    )
    .map_err(|_| StatusCode::BAD_REQUEST)?;
    let config = SimConfig::default()
        .validated()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let defaults = state.defaults();
    let max_operations = request.max_operations.unwrap_or(defaults.max_operations);

    // Subscribers may or may not be connected; publishing into an empty
    // channel is fine.
    let _ = state.publish_event(RunEvent::run_started(run_id));

    let mut engine = LoopEngine::new(sim_state, config)
        .with_wallet_supply_limit(defaults.wallet_supply_limit)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let mut journal_rows = Vec::new();
    let summary = engine
        .run_to_target_observed(max_operations, |report| {
            let _ = state.publish_event(RunEvent::from_report(run_id, report));
            journal_rows.push(report.journal_row());
        })
        .await;
    state
        .append_journal_rows(&journal_rows)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let _ = state.publish_event(RunEvent::run_completed(run_id, &summary));
    state.record_summary(run_id, summary.clone());

    let location = format!("/runs/{run_id}");

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(StartRunResponse { run_id, summary }),
    ))
}

async fn run_summary(
    State(state): State<AppState>,
    Path(run_id): Path<u64>,
) -> Result<Json<RunSummary>, StatusCode> {
    state.summary(run_id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use runtime::replay::ReplayCsvWriter;
    use tower::ServiceExt;

    use crate::state::{AppState, RunDefaults, RunEvent};

    use super::router;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn serves_ui_shell_and_static_assets() {
        let app = router(AppState::new());

        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("Supply Progress"));

        let app = router(AppState::new());
        let response = app
            .oneshot(
                Request::get("/static/app.js")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn post_runs_with_invalid_position_is_rejected() {
        let app = router(AppState::new());

        let request = Request::post("/runs")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"supply_initial": 100.0, "borrow_initial": 150.0}"#,
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn post_runs_returns_summary_and_location() {
        let app = router(AppState::new());

        let request = Request::post("/runs")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"supply_initial": 1000.0, "borrow_initial": 600.0, "supply_target": 1500.0, "wallet_balance": 600.0}"#,
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/runs/1"
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["run_id"], 1);
        assert_eq!(json["summary"]["target_reached"], true);
    }

    #[tokio::test]
    async fn configured_operation_cap_bounds_the_run() {
        let defaults = RunDefaults {
            max_operations: 2,
            ..RunDefaults::default()
        };
        let app = router(AppState::with_run_options(defaults, None));

        let request = Request::post("/runs")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"supply_target": 1000000.0}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert!(json["summary"]["total_operations"].as_u64().unwrap() <= 2);
        assert_eq!(json["summary"]["target_reached"], false);
    }

    #[tokio::test]
    async fn configured_wallet_limit_of_zero_blocks_wallet_injection() {
        let defaults = RunDefaults {
            wallet_supply_limit: 0.0,
            ..RunDefaults::default()
        };
        let app = router(AppState::with_run_options(defaults, None));

        let request = Request::post("/runs")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"wallet_balance": 600.0}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["summary"]["wallet_remaining"], 600.0);
    }

    #[tokio::test]
    async fn completed_runs_append_replay_journal_rows() {
        let buffer = SharedBuffer::default();
        let journal: ReplayCsvWriter<Box<dyn io::Write + Send>> =
            ReplayCsvWriter::new(Box::new(buffer.clone()));
        let app = router(AppState::with_run_options(
            RunDefaults::default(),
            Some(journal),
        ));

        let response = app
            .oneshot(Request::post("/runs").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let total_operations = json["summary"]["total_operations"].as_u64().unwrap();

        let csv = buffer.contents();
        assert_eq!(csv.lines().count() as u64, total_operations);
        assert!(csv.contains(",applied,"));
    }

    #[tokio::test]
    async fn location_header_resolves_to_the_run_summary() {
        let app = router(AppState::new());

        let response = app
            .clone()
            .oneshot(Request::post("/runs").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let location = response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_owned();

        let response = app
            .oneshot(Request::get(&location).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(json["total_operations"].as_u64().unwrap() >= 1);
    }

    #[tokio::test]
    async fn unknown_run_summary_is_not_found() {
        let app = router(AppState::new());

        let response = app
            .oneshot(Request::get("/runs/99").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn run_events_are_published_to_subscribers() {
        let state = AppState::new();
        let mut events = state.subscribe_events();
        let app = router(state);

        let response = app
            .oneshot(Request::post("/runs").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let first = events.recv().await.unwrap();
        assert!(matches!(first, RunEvent::RunStarted { run_id: 1 }));

        let mut saw_completion = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, RunEvent::RunCompleted { .. }) {
                saw_completion = true;
            }
        }
        assert!(saw_completion);
    }
}
