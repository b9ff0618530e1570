//! Local audio: device catalog, capture, gain staging and remote playback
//!
//! The pipeline is capture -> gain -> published track. Exactly one chain
//! and one published track exist at a time; every rebuild retires the
//! previous chain.

pub mod backend;
pub mod catalog;
pub mod gain;
pub mod pipeline;
pub mod playback;
pub mod synthetic;

pub use backend::{AudioDevice, AudioFrame, AudioHost, CaptureConstraints, CaptureStream, DeviceKind};
pub use catalog::{DeviceCatalog, DeviceList};
pub use gain::{percent_to_linear, GainStage};
pub use pipeline::AudioPipeline;
pub use playback::{PlaybackSink, RemotePlayback};
pub use synthetic::SyntheticHost;
