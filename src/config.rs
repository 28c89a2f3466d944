use crate::error::ConfigError;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const CONFIG_FILE: &str = "microplastic";
const ENV_PREFIX: &str = "MICROPLASTIC";
const LEGACY_CAMERA_URL_VAR: &str = "CAM_URL";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub server: ServerSettings,
    pub camera: CameraSettings,
    pub sample: SampleSettings,
    pub stream: StreamSettings,
    pub estimator: EstimatorSettings,
    pub logger: LoggerSettings,
    pub serial: Option<SerialSettings>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_address: String,
    pub upload_dir: PathBuf,
    pub results_dir: PathBuf,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraMode {
    /// Continuous multipart stream, frames cut out on JPEG markers.
    Mjpeg,
    /// One still image per request.
    Snapshot,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub url: String,
    pub mode: CameraMode,
    pub fetch_timeout_ms: u64,
    pub max_buffer_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SampleSettings {
    pub water_ml: f64,
    pub mm_per_pixel: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    pub frame_interval_ms: u64,
    pub jpeg_quality: u8,
    pub placeholder_width: u32,
    pub placeholder_height: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EstimatorSettings {
    pub blur_kernel: usize,
    pub canny_low: f32,
    pub canny_high: f32,
    pub dilation_iterations: usize,
    pub min_box_side: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggerSettings {
    pub path: PathBuf,
    pub interval_secs: u64,
    pub duration_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    pub port: String,
    pub baud_rate: u32,
    pub out_dir: PathBuf,
    pub start_marker: String,
    pub end_marker: String,
    pub idle_sleep_ms: u64,
    pub max_buffer_bytes: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            camera: CameraSettings::default(),
            sample: SampleSettings::default(),
            stream: StreamSettings::default(),
            estimator: EstimatorSettings::default(),
            logger: LoggerSettings::default(),
            serial: None,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            upload_dir: PathBuf::from("uploads"),
            results_dir: PathBuf::from("results"),
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
            ],
        }
    }
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            url: "http://10.190.245.60:8080/video".to_string(),
            mode: CameraMode::Mjpeg,
            fetch_timeout_ms: 5_000,
            max_buffer_bytes: 4 * 1024 * 1024,
        }
    }
}

impl Default for SampleSettings {
    fn default() -> Self {
        Self {
            water_ml: 100.0,
            mm_per_pixel: 0.05,
        }
    }
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            frame_interval_ms: 100,
            jpeg_quality: 80,
            placeholder_width: 320,
            placeholder_height: 240,
        }
    }
}

impl Default for EstimatorSettings {
    fn default() -> Self {
        Self {
            blur_kernel: 11,
            canny_low: 30.0,
            canny_high: 150.0,
            dilation_iterations: 2,
            min_box_side: 5,
        }
    }
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("live_log.csv"),
            interval_secs: 5,
            duration_secs: 30,
        }
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            out_dir: PathBuf::from("serial_frames"),
            start_marker: "<IMG>".to_string(),
            end_marker: "</IMG>".to_string(),
            idle_sleep_ms: 10,
            max_buffer_bytes: 4 * 1024 * 1024,
        }
    }
}

impl Configuration {
    /// Defaults, then `microplastic.toml` if present, then `MICROPLASTIC__*`
    /// environment variables. `CAM_URL` still overrides the camera address.
    pub fn load() -> Result<Self, ConfigError> {
        let configuration: Configuration = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .set_override_option("camera.url", std::env::var(LEGACY_CAMERA_URL_VAR).ok())?
            .build()?
            .try_deserialize()?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample.water_ml > 0.0) {
            return Err(invalid("sample.water_ml", "must be greater than zero"));
        }
        if self.sample.mm_per_pixel < 0.0 {
            return Err(invalid("sample.mm_per_pixel", "must not be negative"));
        }
        if self.camera.fetch_timeout_ms == 0 {
            return Err(invalid("camera.fetch_timeout_ms", "must be greater than zero"));
        }
        if self.stream.placeholder_width == 0 || self.stream.placeholder_height == 0 {
            return Err(invalid("stream.placeholder", "dimensions must be non-zero"));
        }
        if self.estimator.blur_kernel % 2 == 0 {
            return Err(invalid("estimator.blur_kernel", "must be odd"));
        }
        if self.estimator.canny_low > self.estimator.canny_high {
            return Err(invalid("estimator.canny_low", "must not exceed canny_high"));
        }
        if self.logger.interval_secs == 0 {
            return Err(invalid("logger.interval_secs", "must be greater than zero"));
        }
        if let Some(serial) = &self.serial {
            if serial.start_marker.is_empty() || serial.end_marker.is_empty() {
                return Err(invalid("serial.markers", "must not be empty"));
            }
            if serial.max_buffer_bytes < serial.start_marker.len() {
                return Err(invalid("serial.max_buffer_bytes", "must hold at least one start marker"));
            }
        }
        Ok(())
    }
}

impl CameraSettings {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl StreamSettings {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

impl LoggerSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

impl SerialSettings {
    pub fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.idle_sleep_ms)
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}
