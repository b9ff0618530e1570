// Synthetic audio host
//
// Generates a quiet sine tone per opened microphone instead of talking to
// hardware. Used by the demo binary and tests; it keeps count of open
// capture handles so leaks are observable.

use anyhow::{bail, Result};
use std::collections::HashSet;
use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::backend::{AudioDevice, AudioFrame, AudioHost, CaptureConstraints, CaptureStream, DeviceKind};

const TONE_HZ: f32 = 440.0;
const TONE_AMPLITUDE: f32 = 3000.0;

#[derive(Default)]
struct HostState {
    devices: Vec<AudioDevice>,
    denied: HashSet<String>,
    constraints: Vec<CaptureConstraints>,
}

/// Audio host backed by generated tones
#[derive(Clone)]
pub struct SyntheticHost {
    state: Arc<Mutex<HostState>>,
    open_captures: Arc<AtomicUsize>,
    opened_total: Arc<AtomicUsize>,
    stopped_total: Arc<AtomicUsize>,
}

impl SyntheticHost {
    /// Host with one default microphone and one default speaker
    pub fn new() -> Self {
        Self::with_devices(vec![
            AudioDevice {
                id: "default".to_string(),
                label: "Synthetic Microphone".to_string(),
                kind: DeviceKind::Input,
            },
            AudioDevice {
                id: "default-out".to_string(),
                label: "Synthetic Speaker".to_string(),
                kind: DeviceKind::Output,
            },
        ])
    }

    pub fn with_devices(devices: Vec<AudioDevice>) -> Self {
        Self {
            state: Arc::new(Mutex::new(HostState {
                devices,
                ..HostState::default()
            })),
            open_captures: Arc::new(AtomicUsize::new(0)),
            opened_total: Arc::new(AtomicUsize::new(0)),
            stopped_total: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_device(&self, device: AudioDevice) {
        self.lock().devices.push(device);
    }

    pub fn remove_device(&self, device_id: &str) {
        self.lock().devices.retain(|d| d.id != device_id);
    }

    /// Refuse to open `device_id`, as if permission were denied
    pub fn deny(&self, device_id: &str) {
        self.lock().denied.insert(device_id.to_string());
    }

    pub fn allow(&self, device_id: &str) {
        self.lock().denied.remove(device_id);
    }

    /// Capture handles currently open
    pub fn open_captures(&self) -> usize {
        self.open_captures.load(Ordering::SeqCst)
    }

    pub fn opened_total(&self) -> usize {
        self.opened_total.load(Ordering::SeqCst)
    }

    pub fn stopped_total(&self) -> usize {
        self.stopped_total.load(Ordering::SeqCst)
    }

    /// Constraints of every capture request, in order
    pub fn requested_constraints(&self) -> Vec<CaptureConstraints> {
        self.lock().constraints.clone()
    }
}

impl Default for SyntheticHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AudioHost for SyntheticHost {
    async fn enumerate_devices(&self) -> Result<Vec<AudioDevice>> {
        Ok(self.lock().devices.clone())
    }

    async fn open_capture(&self, constraints: &CaptureConstraints) -> Result<Box<dyn CaptureStream>> {
        let device_id = {
            let mut state = self.lock();
            state.constraints.push(constraints.clone());

            let device_id = match &constraints.device_id {
                Some(id) => id.clone(),
                None => match state.devices.iter().find(|d| d.kind == DeviceKind::Input) {
                    Some(device) => device.id.clone(),
                    None => bail!("no input device available"),
                },
            };

            if state.denied.contains(&device_id) {
                bail!("permission denied for {}", device_id);
            }
            if !state
                .devices
                .iter()
                .any(|d| d.kind == DeviceKind::Input && d.id == device_id)
            {
                bail!("device {} not found", device_id);
            }
            device_id
        };

        self.open_captures.fetch_add(1, Ordering::SeqCst);
        self.opened_total.fetch_add(1, Ordering::SeqCst);
        info!("Synthetic host opened {}", device_id);

        Ok(Box::new(SyntheticCapture {
            device_id,
            sample_rate: constraints.sample_rate,
            channels: constraints.channels,
            frame_ms: constraints.buffer_duration_ms.max(1),
            capturing: Arc::new(AtomicBool::new(false)),
            open: true,
            task: None,
            open_captures: Arc::clone(&self.open_captures),
            stopped_total: Arc::clone(&self.stopped_total),
        }))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

struct SyntheticCapture {
    device_id: String,
    sample_rate: u32,
    channels: u16,
    frame_ms: u64,
    capturing: Arc<AtomicBool>,
    open: bool,
    task: Option<JoinHandle<()>>,
    open_captures: Arc<AtomicUsize>,
    stopped_total: Arc<AtomicUsize>,
}

impl SyntheticCapture {
    fn release(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.capturing.store(false, Ordering::SeqCst);
        if self.open {
            self.open = false;
            self.open_captures.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait::async_trait]
impl CaptureStream for SyntheticCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if !self.open {
            bail!("capture on {} already stopped", self.device_id);
        }
        if self.capturing.swap(true, Ordering::SeqCst) {
            bail!("capture on {} already started", self.device_id);
        }

        let (tx, rx) = mpsc::channel(32);
        let sample_rate = self.sample_rate;
        let channels = self.channels;
        let frame_ms = self.frame_ms;
        let capturing = Arc::clone(&self.capturing);

        self.task = Some(tokio::spawn(async move {
            let samples_per_frame = (sample_rate as u64 * frame_ms / 1000) as usize;
            let mut ticker = tokio::time::interval(Duration::from_millis(frame_ms));
            let mut phase: u64 = 0;
            let mut timestamp_ms = 0;

            while capturing.load(Ordering::SeqCst) {
                ticker.tick().await;
                let mut samples = Vec::with_capacity(samples_per_frame * channels as usize);
                for _ in 0..samples_per_frame {
                    let t = phase as f32 / sample_rate as f32;
                    let value = (TONE_AMPLITUDE * (2.0 * PI * TONE_HZ * t).sin()) as i16;
                    for _ in 0..channels {
                        samples.push(value);
                    }
                    phase += 1;
                }

                let frame = AudioFrame {
                    samples,
                    sample_rate,
                    channels,
                    timestamp_ms,
                };
                if tx.send(frame).await.is_err() {
                    break;
                }
                timestamp_ms += frame_ms;
            }
            debug!("Synthetic capture task ended");
        }));

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if self.open {
            self.stopped_total.fetch_add(1, Ordering::SeqCst);
            info!("Synthetic host closed {}", self.device_id);
        }
        self.release();
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn device_id(&self) -> &str {
        &self.device_id
    }
}

impl Drop for SyntheticCapture {
    fn drop(&mut self) {
        self.release();
    }
}
