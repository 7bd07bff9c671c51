use std::io::Write;

use axum::{routing::get, Router};

use api::state::{AppState, RunDefaults};
use runtime::replay::ReplayCsvWriter;

use crate::config::Config;

pub fn build_app(
    config: &Config,
    journal: Option<ReplayCsvWriter<Box<dyn Write + Send>>>,
) -> Router {
    debug_assert!(runtime::module_ready());
    debug_assert!(api::module_ready());
    debug_assert!(ui::module_ready());

    let defaults = RunDefaults {
        wallet_supply_limit: config.wallet_supply_limit_pct / 100.0,
        max_operations: config.max_operations,
    };

    api::routes::router(AppState::with_run_options(defaults, journal))
        .route("/health", get(healthcheck))
}

async fn healthcheck() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::config::Config;

    fn test_config() -> Config {
        Config {
            listen_addr: "127.0.0.1:0".parse().unwrap(),
            replay_output_path: "artifacts/replay.csv".to_owned(),
            wallet_supply_limit_pct: 70.0,
            max_operations: 200,
        }
    }

    #[tokio::test]
    async fn server_healthcheck_responds_ok() {
        let app = super::build_app(&test_config(), None);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn server_serves_ui_shell_at_root() {
        let app = super::build_app(&test_config(), None);

        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn configured_operation_cap_bounds_every_run() {
        let mut config = test_config();
        config.max_operations = 2;
        let app = super::build_app(&config, None);

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
}
