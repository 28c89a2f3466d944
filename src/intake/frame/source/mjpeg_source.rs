use crate::{
    common::Frame,
    error::FrameError,
    intake::frame::{scanner::JpegScanner, source::FrameSource},
};
use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, warn};

/// Reads an HTTP multipart MJPEG feed and cuts frames out on JPEG markers.
/// The connection and the scan buffer persist between fetches, so frames
/// that arrived in the same chunk are served by later calls.
pub struct MjpegSource {
    client: reqwest::Client,
    url: String,
    response: Option<reqwest::Response>,
    scanner: JpegScanner,
}

impl MjpegSource {
    pub fn new(client: reqwest::Client, url: String, max_buffer_bytes: usize) -> Self {
        Self {
            client,
            url,
            response: None,
            scanner: JpegScanner::new(max_buffer_bytes),
        }
    }

    async fn open(&self) -> Result<reqwest::Response, FrameError> {
        debug!("Opening MJPEG stream at {}", self.url);
        let response = self.client.get(&self.url).send().await?;
        Ok(response.error_for_status()?)
    }

    async fn next_jpeg(&mut self) -> Result<Bytes, FrameError> {
        loop {
            if let Some(jpeg) = self.scanner.next_frame() {
                return Ok(jpeg);
            }

            let mut response = match self.response.take() {
                Some(response) => response,
                None => self.open().await?,
            };
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    self.scanner.push(&chunk);
                    self.response = Some(response);
                }
                Ok(None) => {
                    self.scanner.clear();
                    return Err(FrameError::SourceUnavailable(format!(
                        "stream from {} ended before a complete frame",
                        self.url
                    )));
                }
                Err(e) => {
                    self.scanner.clear();
                    return Err(FrameError::Request(e));
                }
            }
        }
    }
}

impl FrameSource for MjpegSource {
    fn fetch_next_frame<'a>(
        &'a mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Frame, FrameError>> + Send + 'a>> {
        Box::pin(async move {
            loop {
                let jpeg = self.next_jpeg().await?;
                match Frame::from_jpeg(&jpeg) {
                    Ok(frame) => return Ok(frame),
                    Err(e) => {
                        warn!("Skipping undecodable MJPEG frame of {} bytes: {}", jpeg.len(), e);
                    }
                }
            }
        })
    }

    fn reset(&mut self) {
        self.response = None;
        self.scanner.clear();
    }

    fn name(&self) -> &'static str {
        "mjpeg"
    }
}
