use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Direction of an audio endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Input,
    Output,
}

/// An audio endpoint reported by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioDevice {
    pub id: String,
    /// Platform label; may be empty before the user grants mic permission
    pub label: String,
    pub kind: DeviceKind,
}

impl AudioDevice {
    /// Label to show in a picker, falling back to the device id
    pub fn display_name(&self) -> String {
        if !self.label.trim().is_empty() {
            return self.label.clone();
        }
        match self.kind {
            DeviceKind::Input => format!("Mic {}", self.id),
            DeviceKind::Output => format!("Speaker {}", self.id),
        }
    }
}

/// Capture-layer processing requested from the platform
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConstraints {
    /// Device to open; `None` means the platform default
    pub device_id: Option<String>,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
    pub sample_rate: u32,
    pub channels: u16,
    /// Buffer size in milliseconds (affects latency)
    pub buffer_duration_ms: u64,
}

impl CaptureConstraints {
    /// Voice capture: echo cancellation and noise suppression on, platform
    /// AGC off because the pipeline's own gain stage owns the level.
    pub fn voice(device_id: Option<String>) -> Self {
        Self {
            device_id,
            ..Self::default()
        }
    }
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            device_id: None,
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: false,
            sample_rate: 48000,
            channels: 1,
            buffer_duration_ms: 20,
        }
    }
}

/// An opened microphone
///
/// Holding one of these keeps the hardware open; `stop` must be called on
/// every path that abandons it.
#[async_trait::async_trait]
pub trait CaptureStream: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing and release the device
    async fn stop(&mut self) -> Result<()>;

    /// Check if the stream is currently capturing
    fn is_capturing(&self) -> bool;

    /// Device this stream was opened on
    fn device_id(&self) -> &str;
}

/// Platform audio host: device enumeration and capture
///
/// Platform-specific implementations live outside this crate; the
/// synthetic host is used for demos and tests.
#[async_trait::async_trait]
pub trait AudioHost: Send + Sync {
    /// List input and output endpoints
    async fn enumerate_devices(&self) -> Result<Vec<AudioDevice>>;

    /// Open a capture stream with the given constraints
    async fn open_capture(&self, constraints: &CaptureConstraints) -> Result<Box<dyn CaptureStream>>;

    /// Get host name for logging
    fn name(&self) -> &str;
}
