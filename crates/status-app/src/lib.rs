pub mod config;

use serde::Serialize;
use types::{DeviceInfo, InverterEndpoint, RuntimeData};

pub use config::StatusConfig;

/// One-shot status snapshot printed by the binary.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub endpoint: InverterEndpoint,
    pub device_info: DeviceInfo,
    pub runtime_data: RuntimeData,
}
