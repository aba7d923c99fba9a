//! Buffer creation from layout-checked host data.

use wgpu::util::DeviceExt;

use crate::error::ReproError;
use crate::layout::occlusion::CombineVisibilityResultOptions;
use crate::layout::GpuLayout;

use super::context::GpuContext;

/// Buffer initialized with the packed bytes of `data`.
pub fn upload<T: GpuLayout>(
    device: &wgpu::Device,
    label: &str,
    data: &[T],
    usage: wgpu::BufferUsages,
) -> wgpu::Buffer {
    log::debug!(
        "{label}: uploading {} x {} ({} bytes each)",
        data.len(),
        T::NAME,
        T::size()
    );
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(data),
        usage: usage | wgpu::BufferUsages::COPY_DST,
    })
}

/// Zeroed buffer of `size` bytes.
pub fn zeroed(
    device: &wgpu::Device,
    label: &str,
    size: u64,
    usage: wgpu::BufferUsages,
) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: usage | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Uniform-buffer bytes of the combine options, laid out by encase.
///
/// # Errors
///
/// [`ReproError::Encode`] if encase rejects the value.
pub fn encode_options(
    options: &CombineVisibilityResultOptions,
) -> Result<Vec<u8>, ReproError> {
    let mut buffer = encase::UniformBuffer::new(Vec::<u8>::new());
    buffer
        .write(options)
        .map_err(|e| ReproError::Encode(e.to_string()))?;
    Ok(buffer.into_inner())
}

/// Uniform buffer holding the combine options.
///
/// # Errors
///
/// As [`encode_options`].
pub fn options_uniform(
    device: &wgpu::Device,
    options: &CombineVisibilityResultOptions,
) -> Result<wgpu::Buffer, ReproError> {
    let bytes = encode_options(options)?;
    Ok(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Combine Options Uniform"),
        contents: &bytes,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    }))
}

/// Map a `MAP_READ` buffer after `submission` completes and copy its bytes.
///
/// # Errors
///
/// [`ReproError::Readback`] if the device is lost while waiting or the map
/// request fails.
pub fn read_back(
    context: &GpuContext,
    buffer: &wgpu::Buffer,
    submission: wgpu::SubmissionIndex,
) -> Result<Vec<u8>, ReproError> {
    let slice = buffer.slice(..);
    let (sender, receiver) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });

    let _ = context
        .device
        .poll(wgpu::PollType::WaitForSubmissionIndex(submission))
        .map_err(|e| ReproError::Readback(e.to_string()))?;

    receiver
        .recv()
        .map_err(|e| ReproError::Readback(e.to_string()))?
        .map_err(|e| ReproError::Readback(e.to_string()))?;
    let bytes = slice.get_mapped_range().to_vec();
    buffer.unmap();
    Ok(bytes)
}
