use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::backend::{AudioDevice, AudioHost, DeviceKind};

/// Snapshot of the devices known to the catalog
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeviceList {
    pub inputs: Vec<AudioDevice>,
    pub outputs: Vec<AudioDevice>,
}

impl DeviceList {
    pub fn has_input(&self, device_id: &str) -> bool {
        self.inputs.iter().any(|d| d.id == device_id)
    }

    pub fn has_output(&self, device_id: &str) -> bool {
        self.outputs.iter().any(|d| d.id == device_id)
    }
}

/// Refreshable list of input and output devices
///
/// Cheap to clone; clones share the same list.
#[derive(Clone)]
pub struct DeviceCatalog {
    host: Arc<dyn AudioHost>,
    devices: Arc<RwLock<DeviceList>>,
}

impl DeviceCatalog {
    pub fn new(host: Arc<dyn AudioHost>) -> Self {
        Self {
            host,
            devices: Arc::new(RwLock::new(DeviceList::default())),
        }
    }

    /// Re-enumerate devices from the host
    ///
    /// On failure the previous list is kept.
    pub async fn refresh(&self) -> Result<DeviceList> {
        let devices = self
            .host
            .enumerate_devices()
            .await
            .with_context(|| format!("Failed to enumerate devices on {}", self.host.name()))?;

        let mut list = DeviceList::default();
        for device in devices {
            debug!("Found {:?} device {} ({})", device.kind, device.id, device.display_name());
            match device.kind {
                DeviceKind::Input => list.inputs.push(device),
                DeviceKind::Output => list.outputs.push(device),
            }
        }

        info!(
            "Device catalog refreshed: {} inputs, {} outputs",
            list.inputs.len(),
            list.outputs.len()
        );

        *self.devices.write().await = list.clone();
        Ok(list)
    }

    pub async fn list(&self) -> DeviceList {
        self.devices.read().await.clone()
    }
}
