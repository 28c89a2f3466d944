use crate::{
    config::SerialSettings,
    error::FrameError,
    intake::frame::{scanner::EnvelopeScanner, writer::SequentialFileWriter},
};
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

const READ_CHUNK_BYTES: usize = 4096;

pub fn open_port(settings: &SerialSettings) -> Result<SerialStream, FrameError> {
    info!(
        "Opening serial port: {} at {} baud",
        settings.port, settings.baud_rate
    );
    tokio_serial::new(&settings.port, settings.baud_rate)
        .open_native_async()
        .map_err(|e| {
            FrameError::SourceUnavailable(format!("failed to open {}: {}", settings.port, e))
        })
}

/// Opens the configured port and runs a recorder on it in the background
/// until `cancel` fires or the link closes.
pub async fn spawn_serial_capture(
    settings: &SerialSettings,
    cancel: CancellationToken,
) -> Result<JoinHandle<()>, FrameError> {
    let port = open_port(settings)?;
    let writer = SequentialFileWriter::create(settings.out_dir.clone()).await?;
    let scanner = EnvelopeScanner::new(settings.start_marker.as_bytes(), settings.end_marker.as_bytes())
        .with_max_buffer_bytes(settings.max_buffer_bytes);
    let recorder = SerialFrameRecorder::new(port, scanner, writer, settings.idle_sleep());

    Ok(tokio::spawn(async move {
        match recorder.run(cancel).await {
            Ok(saved) => info!("Serial capture stopped after {} frames", saved),
            Err(e) => error!("Serial capture failed: {}", e),
        }
    }))
}

/// Long-running capture loop: reads a serial link, cuts out every
/// `<IMG>...</IMG>` envelope and saves each payload as the next numbered file.
/// The connection is owned by the recorder and released when `run` returns.
pub struct SerialFrameRecorder<R> {
    reader: R,
    scanner: EnvelopeScanner,
    writer: SequentialFileWriter,
    idle_sleep: Duration,
}

impl<R: AsyncRead + Unpin + Send> SerialFrameRecorder<R> {
    pub fn new(
        reader: R,
        scanner: EnvelopeScanner,
        writer: SequentialFileWriter,
        idle_sleep: Duration,
    ) -> Self {
        Self {
            reader,
            scanner,
            writer,
            idle_sleep,
        }
    }

    /// Runs until the link closes or `cancel` fires. Returns how many frames
    /// were saved over the recorder's lifetime.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<u64, FrameError> {
        let mut chunk = vec![0u8; READ_CHUNK_BYTES];
        loop {
            let read = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Serial capture cancelled");
                    break;
                }
                read = self.reader.read(&mut chunk) => read,
            };

            match read {
                Ok(0) => {
                    info!("Serial connection closed");
                    break;
                }
                Ok(n) => {
                    self.scanner.push(&chunk[..n]);
                    self.save_complete_payloads().await;
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                    ) =>
                {
                    tokio::time::sleep(self.idle_sleep).await;
                }
                Err(e) => return Err(FrameError::Read(e)),
            }
        }
        Ok(self.writer.next_id())
    }

    async fn save_complete_payloads(&mut self) {
        while let Some(payload) = self.scanner.next_payload() {
            match self.writer.write(&payload).await {
                Ok(path) => info!("Saved {}", path.display()),
                Err(e) => error!("Dropping serial frame of {} bytes: {}", payload.len(), e),
            }
        }
        debug!("{} bytes pending after scan", self.scanner.pending().len());
    }
}
