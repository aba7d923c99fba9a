use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Errors that can occur during headless GPU initialization.
#[derive(Debug)]
pub enum GpuContextError {
    /// No compatible GPU adapter found.
    AdapterRequest(wgpu::RequestAdapterError),
    /// GPU device request failed (limits or features not met).
    DeviceRequest(wgpu::RequestDeviceError),
}

impl fmt::Display for GpuContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdapterRequest(e) => {
                write!(f, "no compatible GPU adapter found: {e}")
            }
            Self::DeviceRequest(e) => write!(f, "device request failed: {e}"),
        }
    }
}

impl std::error::Error for GpuContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::AdapterRequest(e) => Some(e),
            Self::DeviceRequest(e) => Some(e),
        }
    }
}

/// Which adapter to prefer when several are present.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum AdapterPreference {
    /// Integrated GPU first; the repros target integrated-GPU driver bugs.
    #[default]
    LowPower,
    /// Discrete GPU first.
    HighPerformance,
}

impl From<AdapterPreference> for wgpu::PowerPreference {
    fn from(p: AdapterPreference) -> Self {
        match p {
            AdapterPreference::LowPower => Self::LowPower,
            AdapterPreference::HighPerformance => Self::HighPerformance,
        }
    }
}

/// Adapter selection options.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema,
)]
#[serde(default)]
pub struct GpuOptions {
    /// Adapter preference.
    pub adapter: AdapterPreference,
}

/// Owns a wgpu device and queue with no presentation surface.
pub struct GpuContext {
    /// The wgpu logical device.
    pub device: wgpu::Device,
    /// The wgpu command queue.
    pub queue: wgpu::Queue,
    /// Adapter the device was created on.
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Request an adapter and device without a surface.
    ///
    /// `DEPTH32FLOAT_STENCIL8` is enabled when the adapter offers it; the
    /// stencil-clear pipeline needs it.
    ///
    /// # Errors
    ///
    /// Returns `GpuContextError` if the adapter or device request fails.
    pub async fn headless(options: &GpuOptions) -> Result<Self, GpuContextError> {
        let instance = wgpu::Instance::default();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                compatible_surface: None,
                power_preference: options.adapter.into(),
                ..Default::default()
            })
            .await
            .map_err(GpuContextError::AdapterRequest)?;

        let adapter_info = adapter.get_info();
        log::info!(
            "using GPU: {} ({:?}, {:?})",
            adapter_info.name,
            adapter_info.device_type,
            adapter_info.backend
        );

        let required_features =
            adapter.features() & wgpu::Features::DEPTH32FLOAT_STENCIL8;
        if required_features.is_empty() {
            log::warn!("adapter lacks DEPTH32FLOAT_STENCIL8; stencil-clear pipeline unavailable");
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Repro Device"),
                required_features,
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            })
            .await
            .map_err(GpuContextError::DeviceRequest)?;

        Ok(Self {
            device,
            queue,
            adapter_info,
        })
    }

    /// Whether the device can create `Depth32FloatStencil8` attachments.
    pub fn supports_depth32_stencil8(&self) -> bool {
        self.device
            .features()
            .contains(wgpu::Features::DEPTH32FLOAT_STENCIL8)
    }

    /// Command encoder labelled after the work it records.
    pub fn create_encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(label),
            })
    }

    /// Submit the recorded commands; the returned index lets a read-back
    /// wait for exactly this submission.
    pub fn submit(&self, encoder: wgpu::CommandEncoder) -> wgpu::SubmissionIndex {
        self.queue.submit(std::iter::once(encoder.finish()))
    }
}
