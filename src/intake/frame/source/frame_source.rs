use crate::{common::Frame, error::FrameError};
use std::future::Future;
use std::pin::Pin;

/// Anything that can hand out whole decoded frames one at a time.
pub trait FrameSource: Send {
    fn fetch_next_frame<'a>(
        &'a mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Frame, FrameError>> + Send + 'a>>;

    /// Drops any half-read connection state after a failed or timed out
    /// fetch so the next attempt starts clean.
    fn reset(&mut self) {}

    fn name(&self) -> &'static str;
}
