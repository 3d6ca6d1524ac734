use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tracing::debug;

use crate::data::Dataset;
use crate::filter::filter;

type Filters = Query<HashMap<String, String>>;

pub fn router(data: Arc<Dataset>) -> Router {
    let v1_routes = Router::new()
        .route("/clusters", get(clusters))
        .route("/enclaves", get(enclaves))
        .route("/services", get(services))
        .route("/logs", get(logs))
        .with_state(data);

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", v1_routes)
        .layer(CorsLayer::permissive())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

fn respond(collection: &str, records: &[Value], query: &HashMap<String, String>) -> Json<Vec<Value>> {
    let out = filter(records, query);
    debug!(collection, filters = query.len(), matched = out.len(), "listing");
    Json(out)
}

async fn clusters(State(data): State<Arc<Dataset>>, Query(q): Filters) -> Json<Vec<Value>> {
    respond("clusters", &data.clusters, &q)
}

async fn enclaves(State(data): State<Arc<Dataset>>, Query(q): Filters) -> Json<Vec<Value>> {
    respond("enclaves", &data.enclaves, &q)
}

async fn services(State(data): State<Arc<Dataset>>, Query(q): Filters) -> Json<Vec<Value>> {
    respond("services", &data.services, &q)
}

async fn logs(State(data): State<Arc<Dataset>>, Query(q): Filters) -> Json<Vec<Value>> {
    respond("logs", &data.logs, &q)
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        router(Arc::new(Dataset::embedded().unwrap()))
    }

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let (status, body) = get_json("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "healthy" }));
    }

    #[tokio::test]
    async fn unfiltered_listing_returns_all_records() {
        let (status, body) = get_json("/api/v1/services").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn query_parameters_filter_records() {
        let (_, body) = get_json("/api/v1/services?enclave=quick-start").await;
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["postgres", "hasura", "api"]);

        let (_, body) = get_json("/api/v1/services?enclave=quick-start&port=8080").await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["name"], "hasura");
    }

    #[tokio::test]
    async fn boolean_and_unknown_filters() {
        let (_, body) = get_json("/api/v1/clusters?is_running=true").await;
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (_, body) = get_json("/api/v1/logs?severity=error").await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn every_collection_is_routed() {
        for path in ["clusters", "enclaves", "services", "logs"] {
            let (status, body) = get_json(&format!("/api/v1/{path}")).await;
            assert_eq!(status, StatusCode::OK, "{path}");
            assert!(body.is_array(), "{path}");
        }
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/enclaves")
                    .header(header::ORIGIN, "http://dashboard.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/v2/enclaves")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
