use crate::{
    detector::DEFAULT_CONFIDENCE,
    error::ApiError,
    intake::frame::{source, writer::save_upload},
    pipeline::{
        domain::LiveStats,
        services::stream::{mjpeg_stream, MJPEG_CONTENT_TYPE},
    },
    server::state::AppState,
};
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::io::ErrorKind;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;
const MODEL_MISSING_MESSAGE: &str = "Model not found - image saved.";

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.configuration.server.cors_origins);

    Router::new()
        .route("/esp32/video_feed", get(video_feed))
        .route("/esp32/stats", get(live_stats))
        .route("/upload", post(upload_image))
        .route("/detect", post(detect_image))
        .route("/api/latest", get(latest_result))
        .route("/image/{name}", get(serve_image))
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
                .layer(cors),
        )
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {}: {}", origin, e);
                None
            }
        })
        .collect();

    // Credentials rule out wildcards, so methods and headers mirror the request.
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

/// A bare file name: no directory components, nothing that climbs out.
fn safe_file_name(name: &str) -> Result<&str, ApiError> {
    let invalid = name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name == ".";
    if invalid {
        return Err(ApiError::BadRequest(format!("Invalid file name: {name}")));
    }
    Ok(name)
}

async fn video_feed(State(state): State<AppState>) -> Response {
    if state.logger.start().is_some() {
        info!("Started snapshot logging to {}", state.logger.path().display());
    }

    let source = source::from_settings(state.client.clone(), &state.configuration.camera);
    info!("Live feed client connected, reading from {} source", source.name());
    let stream = mjpeg_stream(source, Arc::clone(&state.cycle), state.stream_timing());

    (
        [
            (header::CONTENT_TYPE, MJPEG_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(stream.map(Ok::<_, Infallible>)),
    )
        .into_response()
}

async fn live_stats(State(state): State<AppState>) -> Json<LiveStats> {
    Json(state.stats.snapshot())
}

async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart data: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = safe_file_name(field.file_name().unwrap_or_default())?.to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {e}")))?;

        let image_path = state.upload_path(&file_name);
        save_upload(&data, &image_path).await?;
        info!("Saved upload {} ({} bytes)", image_path.display(), data.len());

        match &state.analyzer {
            Some(analyzer) => {
                let annotated_path = state.annotated_path(&file_name);
                let result = analyzer
                    .analyze(&image_path, &annotated_path, DEFAULT_CONFIDENCE)
                    .await?;
                state.record_analysis(image_path, annotated_path, result);
            }
            None => state.record_message(image_path, MODEL_MISSING_MESSAGE),
        }

        return Ok(Json(json!({ "status": "ok", "filename": file_name })));
    }

    Err(ApiError::BadRequest("Missing multipart field 'file'".to_string()))
}

#[derive(Debug, Deserialize)]
struct DetectParams {
    filename: String,
    #[serde(default = "default_confidence")]
    conf: f32,
}

fn default_confidence() -> f32 {
    DEFAULT_CONFIDENCE
}

async fn detect_image(
    State(state): State<AppState>,
    Query(params): Query<DetectParams>,
) -> Result<Json<Value>, ApiError> {
    let file_name = safe_file_name(&params.filename)?;
    let image_path = state.upload_path(file_name);
    if !tokio::fs::try_exists(&image_path).await.unwrap_or(false) {
        return Err(ApiError::NotFound("Image not found".to_string()));
    }

    let analyzer = state
        .analyzer
        .as_ref()
        .ok_or_else(|| ApiError::Internal("Trained model not found on server".to_string()))?;

    let annotated_path = state.annotated_path(file_name);
    let result = analyzer
        .analyze(&image_path, &annotated_path, params.conf)
        .await?;
    state.record_analysis(image_path, annotated_path, result.clone());

    Ok(Json(json!({ "status": "ok", "result": result })))
}

async fn latest_result(State(state): State<AppState>) -> Json<Value> {
    Json(state.latest.read().to_json())
}

async fn serve_image(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let name = safe_file_name(&name)?;
    let server = &state.configuration.server;

    for dir in [&server.results_dir, &server.upload_dir] {
        let candidate = dir.join(name);
        match tokio::fs::read(&candidate).await {
            Ok(bytes) => {
                return Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response());
            }
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => {
                error!("Failed to read {}: {}", candidate.display(), e);
                return Err(ApiError::Internal("Failed to read image".to_string()));
            }
        }
    }

    Err(ApiError::NotFound("Image not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Configuration,
        detector::{Detector, ModelDetection},
        error::AppError,
        pipeline::domain::BoundingBox,
        test_support::encode_jpeg,
    };
    use async_trait::async_trait;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const BOUNDARY: &str = "test-boundary";

    struct OneParticle;

    #[async_trait]
    impl Detector for OneParticle {
        async fn detect(&self, _: &std::path::Path, _: f32, _: f32) -> Result<Vec<ModelDetection>, AppError> {
            Ok(vec![ModelDetection {
                bounding_box: BoundingBox::from_rect(2, 2, 10, 10),
                class_id: 0,
                confidence: 0.8,
            }])
        }

        fn name(&self) -> &'static str {
            "one-particle"
        }
    }

    fn state(dir: &tempfile::TempDir) -> AppState {
        let mut configuration = Configuration::default();
        configuration.server.upload_dir = dir.path().join("uploads");
        configuration.server.results_dir = dir.path().join("results");
        configuration.logger.path = dir.path().join("live_log.csv");
        configuration.camera.url = "http://127.0.0.1:9/video".to_string();
        AppState::new(configuration).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn multipart_request(file_name: &str, contents: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: image/jpeg\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(contents);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::post("/upload")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn stats_start_at_all_water() {
        let dir = tempfile::tempdir().unwrap();
        let response = create_router(state(&dir)).oneshot(get_request("/esp32/stats")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({
                "objects": 0,
                "grams_per_ml": 0.0,
                "percent_plastic": 0.0,
                "percent_water": 100.0,
                "water_ml": 100.0
            })
        );
    }

    #[tokio::test]
    async fn upload_without_detector_saves_and_records_message() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);
        let router = create_router(state.clone());

        let response = router
            .clone()
            .oneshot(multipart_request("water.jpg", b"not really a jpeg"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "status": "ok", "filename": "water.jpg" }));
        assert_eq!(std::fs::read(dir.path().join("uploads/water.jpg")).unwrap(), b"not really a jpeg");

        let latest = body_json(router.oneshot(get_request("/api/latest")).await.unwrap()).await;
        assert_eq!(latest, json!({ "imageUrl": "/image/water.jpg", "stats": {} }));
    }

    #[tokio::test]
    async fn upload_with_detector_writes_annotated_result() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir).with_detector(Arc::new(OneParticle));
        let router = create_router(state);

        let response = router
            .clone()
            .oneshot(multipart_request("sample.jpg", &encode_jpeg(32, 32, [10, 10, 10])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(dir.path().join("results/annotated_sample.jpg").exists());

        let latest = body_json(router.oneshot(get_request("/api/latest")).await.unwrap()).await;
        assert_eq!(latest["imageUrl"], "/image/annotated_sample.jpg");
        assert_eq!(latest["stats"], json!({ "count": 1, "percent_plastic": 0.99, "percent_water": 99.01 }));
    }

    #[tokio::test]
    async fn detect_reports_missing_image_before_missing_model() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(state(&dir));

        let missing = router
            .clone()
            .oneshot(Request::post("/detect?filename=nope.jpg").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(missing).await, json!({ "detail": "Image not found" }));

        std::fs::create_dir_all(dir.path().join("uploads")).unwrap();
        std::fs::write(dir.path().join("uploads/here.jpg"), encode_jpeg(8, 8, [0, 0, 0])).unwrap();
        let no_model = router
            .oneshot(Request::post("/detect?filename=here.jpg").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(no_model.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn detect_runs_detector_on_stored_upload() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("uploads")).unwrap();
        std::fs::write(dir.path().join("uploads/here.jpg"), encode_jpeg(32, 32, [0, 0, 0])).unwrap();
        let router = create_router(state(&dir).with_detector(Arc::new(OneParticle)));

        let response = router
            .oneshot(Request::post("/detect?filename=here.jpg&conf=0.5").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["result"]["summary"]["count"], 1);
        assert_eq!(body["result"]["detections"][0]["class_id"], 0);
    }

    #[tokio::test]
    async fn image_prefers_results_then_uploads() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("uploads")).unwrap();
        std::fs::create_dir_all(dir.path().join("results")).unwrap();
        std::fs::write(dir.path().join("uploads/a.jpg"), b"upload").unwrap();
        std::fs::write(dir.path().join("uploads/b.jpg"), b"upload").unwrap();
        std::fs::write(dir.path().join("results/a.jpg"), b"result").unwrap();
        let router = create_router(state(&dir));

        let a = router.clone().oneshot(get_request("/image/a.jpg")).await.unwrap();
        assert_eq!(a.headers()[header::CONTENT_TYPE], "image/jpeg");
        assert_eq!(&a.into_body().collect().await.unwrap().to_bytes()[..], b"result");

        let b = router.clone().oneshot(get_request("/image/b.jpg")).await.unwrap();
        assert_eq!(&b.into_body().collect().await.unwrap().to_bytes()[..], b"upload");

        let missing = router.oneshot(get_request("/image/c.jpg")).await.unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn image_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let response = create_router(state(&dir))
            .oneshot(get_request("/image/..%2Flive_log.csv"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn video_feed_streams_placeholder_and_starts_logger() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);
        let response = create_router(state.clone())
            .oneshot(get_request("/esp32/video_feed"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], MJPEG_CONTENT_TYPE);
        assert!(state.logger.is_running());

        let mut body = response.into_body();
        let first = body.frame().await.unwrap().unwrap().into_data().unwrap();
        assert!(first.starts_with(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n\xFF\xD8"));
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let dir = tempfile::tempdir().unwrap();
        let response = create_router(state(&dir))
            .oneshot(
                Request::get("/esp32/stats")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:5173"
        );
    }

    #[test]
    fn file_names_with_directories_are_rejected() {
        assert!(safe_file_name("ok.jpg").is_ok());
        assert!(safe_file_name("../etc/passwd").is_err());
        assert!(safe_file_name("a\\b.jpg").is_err());
        assert!(safe_file_name("").is_err());
    }
}
