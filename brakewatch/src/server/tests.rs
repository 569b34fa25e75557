#[cfg(test)]
mod route_tests {
    use crate::model::classifier::{tests::rule_params, LogisticRegression};
    use crate::model::handle::{LoadFailure, LoadOutcome, LoadedModel};
    use crate::server::{routes, types::AppState};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        Router,
    };
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::{json, Value};
    use tower::ServiceExt; // for `app.oneshot()`

    fn router(outcome: LoadOutcome) -> Router {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        routes::create_router(AppState::new(outcome), handle)
    }

    fn loaded() -> LoadOutcome {
        LoadOutcome::Loaded {
            model: LoadedModel::new(LogisticRegression::new(rule_params()).unwrap()),
            location: "test".into(),
        }
    }

    fn failed() -> LoadOutcome {
        LoadOutcome::Failed(LoadFailure {
            message: "failed to load model from runs:/abc/model: run abc not found".into(),
            trace: "trace".into(),
        })
    }

    fn post(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_ok() {
        let app = router(loaded());
        let (status, body) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok", "error": null}));
    }

    #[tokio::test]
    async fn test_health_reports_load_failure() {
        let app = router(failed());
        let (status, body) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "error");
        assert!(body["error"].as_str().unwrap().contains("run abc not found"));
    }

    #[tokio::test]
    async fn test_predict_single() {
        let app = router(loaded());
        let payload = json!({
            "brake_pressure": 135, "brake_temp": 98, "vehicle_speed": 70, "pad_wear_level": 92
        });
        let (status, body) = send(&app, post(payload.to_string())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"], 1);
        let p = body["probability"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&p) && p > 0.9);
    }

    #[tokio::test]
    async fn test_predict_batch() {
        let app = router(loaded());
        let payload = json!([
            {"brake_pressure": 135, "brake_temp": 98, "vehicle_speed": 70, "pad_wear_level": 92},
            {"brake_pressure": 100, "brake_temp": 80, "vehicle_speed": 60, "pad_wear_level": 40}
        ]);
        let (status, body) = send(&app, post(payload.to_string())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"], json!([1, 0]));
        let probabilities = body["probability"].as_array().unwrap();
        assert_eq!(probabilities.len(), 2);
        assert!(probabilities
            .iter()
            .all(|p| (0.0..=1.0).contains(&p.as_f64().unwrap())));
    }

    #[tokio::test]
    async fn test_predict_positional_features() {
        let app = router(loaded());
        let payload = json!({"features": [100, 80, 60, 40]});
        let (status, body) = send(&app, post(payload.to_string())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"], 0);
    }

    #[tokio::test]
    async fn test_invalid_json_does_not_poison_next_request() {
        let app = router(loaded());
        let (status, body) = send(&app, post("{\"brake_pressure\": ")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body["error"].as_str().unwrap().is_empty());
        assert!(body.get("details").is_none());

        let payload = json!({
            "brake_pressure": 100, "brake_temp": 80, "vehicle_speed": 60, "pad_wear_level": 40
        });
        let (status, _) = send(&app, post(payload.to_string())).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_field_is_client_error() {
        let app = router(loaded());
        let payload = json!({"brake_pressure": 135, "brake_temp": 98});
        let (status, body) = send(&app, post(payload.to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("missing field"));
    }

    #[tokio::test]
    async fn test_predict_without_model_is_server_error() {
        let app = router(failed());
        let payload = json!({
            "brake_pressure": 135, "brake_temp": 98, "vehicle_speed": 70, "pad_wear_level": 92
        });
        for _ in 0..3 {
            let (status, body) = send(&app, post(payload.to_string())).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert!(body["error"].as_str().unwrap().contains("run abc not found"));
        }
        let (_, health) = send(&app, get("/health")).await;
        assert_eq!(health["status"], "error");
    }

    #[tokio::test]
    async fn test_details_only_when_enabled() {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let app = routes::create_router(AppState::new(failed()).with_details(true), handle);
        let (status, body) = send(&app, post("{}")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["details"], "trace");
    }

    #[tokio::test]
    async fn test_oversized_body_is_json_error() {
        let app = router(loaded());
        // Past axum's default 2 MB request body limit.
        let (status, body) = send(&app, post(vec![b' '; 3 * 1024 * 1024])).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to read request body"));
        assert!(body.get("details").is_none());

        let (status, _) = send(&app, post(json!({"features": [100, 80, 60, 40]}).to_string())).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_predict_rejects_get() {
        let app = router(loaded());
        let response = app.oneshot(get("/predict")).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = router(loaded());
        let response = app.oneshot(get("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
