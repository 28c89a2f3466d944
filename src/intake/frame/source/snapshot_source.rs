use crate::{common::Frame, error::FrameError, intake::frame::source::FrameSource};
use std::future::Future;
use std::pin::Pin;

/// Polls a still-image endpoint (e.g. `/cam-lo.jpg`), one request per frame.
pub struct SnapshotSource {
    client: reqwest::Client,
    url: String,
}

impl SnapshotSource {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }
}

impl FrameSource for SnapshotSource {
    fn fetch_next_frame<'a>(
        &'a mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Frame, FrameError>> + Send + 'a>> {
        Box::pin(async move {
            let response = self.client.get(&self.url).send().await?.error_for_status()?;
            let body = response.bytes().await?;
            Frame::from_jpeg(&body)
        })
    }

    fn name(&self) -> &'static str {
        "snapshot"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{encode_jpeg, serve};
    use axum::{http::StatusCode, routing::get, Router};

    #[tokio::test]
    async fn decodes_each_snapshot() {
        let jpeg = encode_jpeg(32, 24, [90, 90, 90]);
        let base = serve(Router::new().route("/cam-lo.jpg", get(move || async move { jpeg }))).await;

        let mut source = SnapshotSource::new(reqwest::Client::new(), format!("{base}/cam-lo.jpg"));
        for _ in 0..2 {
            let frame = source.fetch_next_frame().await.unwrap();
            assert_eq!((frame.width(), frame.height()), (32, 24));
        }
    }

    #[tokio::test]
    async fn http_error_status_is_reported() {
        let base = serve(Router::new().route(
            "/cam-lo.jpg",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        ))
        .await;

        let mut source = SnapshotSource::new(reqwest::Client::new(), format!("{base}/cam-lo.jpg"));
        assert!(matches!(
            source.fetch_next_frame().await,
            Err(FrameError::Request(_))
        ));
    }
}
