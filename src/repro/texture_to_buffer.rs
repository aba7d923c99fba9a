//! Texture-to-buffer repro: copy geometry, fill pattern and read-back check.
//!
//! A texture is filled with a known byte pattern, the destination buffer is
//! pre-filled with [`BUFFER_FILL_VALUE`], and the texture is copied into the
//! buffer one row at a time. Afterwards every byte inside the copy region
//! must hold the pattern and every byte outside it must be untouched.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ReproError;

/// Value the destination buffer is filled with before the copy.
pub const BUFFER_FILL_VALUE: u8 = 1;

/// An uncompressed color format the copy can be exercised with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    /// wgpu format.
    pub format: wgpu::TextureFormat,
    /// Lower-case name used in options files.
    pub name: &'static str,
    /// Bytes per texel.
    pub bytes_per_pixel: u32,
}

const fn info(format: wgpu::TextureFormat, name: &'static str, bytes_per_pixel: u32) -> FormatInfo {
    FormatInfo {
        format,
        name,
        bytes_per_pixel,
    }
}

/// Every format the repro knows about.
pub const FORMATS: &[FormatInfo] = {
    use wgpu::TextureFormat as F;
    &[
        // 8-bit
        info(F::R8Unorm, "r8unorm", 1),
        info(F::R8Snorm, "r8snorm", 1),
        info(F::R8Uint, "r8uint", 1),
        info(F::R8Sint, "r8sint", 1),
        // 16-bit
        info(F::R16Uint, "r16uint", 2),
        info(F::R16Sint, "r16sint", 2),
        info(F::R16Float, "r16float", 2),
        info(F::Rg8Unorm, "rg8unorm", 2),
        info(F::Rg8Snorm, "rg8snorm", 2),
        info(F::Rg8Uint, "rg8uint", 2),
        info(F::Rg8Sint, "rg8sint", 2),
        // 32-bit
        info(F::R32Uint, "r32uint", 4),
        info(F::R32Sint, "r32sint", 4),
        info(F::R32Float, "r32float", 4),
        info(F::Rg16Uint, "rg16uint", 4),
        info(F::Rg16Sint, "rg16sint", 4),
        info(F::Rg16Float, "rg16float", 4),
        info(F::Rgba8Unorm, "rgba8unorm", 4),
        info(F::Rgba8UnormSrgb, "rgba8unorm-srgb", 4),
        info(F::Rgba8Snorm, "rgba8snorm", 4),
        info(F::Rgba8Uint, "rgba8uint", 4),
        info(F::Rgba8Sint, "rgba8sint", 4),
        info(F::Bgra8Unorm, "bgra8unorm", 4),
        info(F::Bgra8UnormSrgb, "bgra8unorm-srgb", 4),
        info(F::Rgb10a2Unorm, "rgb10a2unorm", 4),
        info(F::Rgb10a2Uint, "rgb10a2uint", 4),
        info(F::Rg11b10Ufloat, "rg11b10ufloat", 4),
        info(F::Rgb9e5Ufloat, "rgb9e5ufloat", 4),
        // 64-bit
        info(F::Rg32Uint, "rg32uint", 8),
        info(F::Rg32Sint, "rg32sint", 8),
        info(F::Rg32Float, "rg32float", 8),
        info(F::Rgba16Uint, "rgba16uint", 8),
        info(F::Rgba16Sint, "rgba16sint", 8),
        info(F::Rgba16Float, "rgba16float", 8),
        // 128-bit
        info(F::Rgba32Uint, "rgba32uint", 16),
        info(F::Rgba32Sint, "rgba32sint", 16),
        info(F::Rgba32Float, "rgba32float", 16),
    ]
};

/// Look up a format by its options-file name.
///
/// # Errors
///
/// [`ReproError::UnknownFormat`] if no format has that name.
pub fn format_by_name(name: &str) -> Result<&'static FormatInfo, ReproError> {
    FORMATS
        .iter()
        .find(|f| f.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| ReproError::UnknownFormat(name.to_owned()))
}

/// Copy extent and destination placement for the repro.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(default)]
pub struct TextureToBufferOptions {
    /// Texture and copy width in texels.
    pub width: u32,
    /// Texture and copy height in rows.
    pub height: u32,
    /// Depth (array layers or 3D slices).
    pub depth: u32,
    /// Destination buffer size in bytes.
    pub buffer_size: u64,
    /// Byte offset of the first copied texel in the buffer.
    pub destination_offset: u64,
    /// Formats to exercise, by name.
    pub formats: Vec<String>,
}

impl Default for TextureToBufferOptions {
    fn default() -> Self {
        Self {
            width: 64,
            height: 8,
            depth: 1,
            buffer_size: 2048,
            destination_offset: 0,
            formats: vec!["r32float".to_owned()],
        }
    }
}

impl TextureToBufferOptions {
    /// Resolve the configured format names.
    ///
    /// # Errors
    ///
    /// [`ReproError::UnknownFormat`] on the first unknown name.
    pub fn resolve_formats(&self) -> Result<Vec<&'static FormatInfo>, ReproError> {
        self.formats.iter().map(|n| format_by_name(n)).collect()
    }

    /// Copy layout for one format.
    #[must_use]
    pub fn layout(&self, format: &FormatInfo) -> CopyLayout {
        CopyLayout {
            width: self.width,
            height: self.height,
            depth: self.depth,
            bytes_per_pixel: format.bytes_per_pixel,
            destination_offset: self.destination_offset,
        }
    }
}

/// Byte geometry of a texture-to-buffer copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyLayout {
    /// Copy width in texels.
    pub width: u32,
    /// Copy height in rows.
    pub height: u32,
    /// Copy depth in slices.
    pub depth: u32,
    /// Bytes per texel.
    pub bytes_per_pixel: u32,
    /// Byte offset of the first texel in the buffer.
    pub destination_offset: u64,
}

impl CopyLayout {
    /// Bytes between the starts of consecutive rows in the buffer.
    #[must_use]
    pub fn bytes_per_row(&self) -> u64 {
        u64::from(self.width) * u64::from(self.bytes_per_pixel)
    }

    /// Bytes between the starts of consecutive slices in the buffer.
    #[must_use]
    pub fn bytes_per_image(&self) -> u64 {
        u64::from(self.height) * self.bytes_per_row()
    }

    /// Texel bytes in the source texture.
    #[must_use]
    pub fn texture_bytes(&self) -> u64 {
        u64::from(self.depth) * self.bytes_per_image()
    }

    /// One past the last byte the copy writes.
    #[must_use]
    pub fn end_offset(&self) -> u64 {
        self.destination_offset + self.texture_bytes()
    }

    /// Whether the whole copy lands inside a buffer of `buffer_size` bytes.
    #[must_use]
    pub fn fits(&self, buffer_size: u64) -> bool {
        self.end_offset() <= buffer_size
    }

    /// Reject a destination buffer the copy does not fit in.
    ///
    /// # Errors
    ///
    /// [`ReproError::BufferTooSmall`] when [`CopyLayout::fits`] fails.
    pub fn require_fit(&self, buffer_size: u64) -> Result<(), ReproError> {
        if self.fits(buffer_size) {
            return Ok(());
        }
        log::warn!(
            "buffer size too small: copy ends at {}, buffer is {buffer_size} bytes",
            self.end_offset()
        );
        Err(ReproError::BufferTooSmall {
            needed: self.end_offset(),
            size: buffer_size,
        })
    }

    /// Whether the row pitch satisfies wgpu's copy alignment.
    #[must_use]
    pub fn row_pitch_aligned(&self) -> bool {
        self.bytes_per_row() % u64::from(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) == 0
    }

    /// `(row, buffer offset)` of every single-row copy, slice by slice.
    #[must_use]
    pub fn row_copies(&self) -> Vec<(u32, u64)> {
        (0..self.depth)
            .flat_map(|slice| (0..self.height).map(move |row| (slice, row)))
            .map(|(slice, row)| {
                let offset = self.destination_offset
                    + u64::from(slice) * self.bytes_per_image()
                    + u64::from(row) * self.bytes_per_row();
                (row, offset)
            })
            .collect()
    }
}

/// Byte `i` of the texture fill pattern.
#[must_use]
pub fn pattern_byte(start: u8, i: usize) -> u8 {
    start.wrapping_add((i & 0xFF) as u8) | 0x80
}

/// The first `len` bytes of the fill pattern.
#[must_use]
pub fn fill_pattern(start: u8, len: usize) -> Vec<u8> {
    (0..len).map(|i| pattern_byte(start, i)).collect()
}

/// First byte of the destination buffer that is not what the copy should
/// have left there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyMismatch {
    /// Buffer byte index.
    pub index: usize,
    /// Texel column.
    pub x: u64,
    /// Row.
    pub row: u64,
    /// Slice.
    pub slice: u64,
    /// Byte offset in the source texture data.
    pub src_offset: u64,
    /// Expected byte.
    pub expected: u8,
    /// Byte found.
    pub actual: u8,
    /// The byte lies outside the copy region, so the copy wrote where it
    /// should not have.
    pub corruption: bool,
}

impl fmt::Display for CopyMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}buffer not correct value at {}, {}, {}, srcOffset: {}, expected {}, was: {}",
            if self.corruption { "DATA CORRUPTION!: " } else { "" },
            self.x,
            self.row,
            self.slice,
            self.src_offset,
            self.expected,
            self.actual
        )
    }
}

/// Verify the destination buffer after the copy.
///
/// # Errors
///
/// The first [`CopyMismatch`], scanning from byte 0.
pub fn check_contents(layout: &CopyLayout, start: u8, buffer: &[u8]) -> Result<(), CopyMismatch> {
    let dst = layout.destination_offset;
    let bpr = layout.bytes_per_row();
    let bpi = layout.bytes_per_image();
    let bpp = u64::from(layout.bytes_per_pixel);
    if bpr == 0 || bpi == 0 {
        return check_untouched(buffer);
    }

    for (index, &actual) in buffer.iter().enumerate() {
        let i = index as u64;
        let p = i.saturating_sub(dst);
        let slice = p / bpi;
        let row = p % bpi / bpr;
        let byte_x = p % bpi % bpr;
        let x = byte_x / bpp;
        let src_offset = slice * bpi + row * bpr + byte_x;
        let in_bounds = i >= dst
            && slice < u64::from(layout.depth)
            && row < u64::from(layout.height)
            && x < u64::from(layout.width);
        let expected = if in_bounds {
            pattern_byte(start, src_offset as usize)
        } else {
            BUFFER_FILL_VALUE
        };
        if actual != expected {
            return Err(CopyMismatch {
                index,
                x,
                row,
                slice,
                src_offset,
                expected,
                actual,
                corruption: !in_bounds,
            });
        }
    }
    Ok(())
}

fn check_untouched(buffer: &[u8]) -> Result<(), CopyMismatch> {
    buffer
        .iter()
        .position(|&b| b != BUFFER_FILL_VALUE)
        .map_or(Ok(()), |index| {
            Err(CopyMismatch {
                index,
                x: 0,
                row: 0,
                slice: 0,
                src_offset: 0,
                expected: BUFFER_FILL_VALUE,
                actual: buffer[index],
                corruption: true,
            })
        })
}

/// Simulate a conforming copy: fill, then place each row.
///
/// # Errors
///
/// [`ReproError::BufferTooSmall`] if the copy does not fit in
/// `buffer_size` bytes.
pub fn simulate_copy(
    layout: &CopyLayout,
    start: u8,
    buffer_size: usize,
) -> Result<Vec<u8>, ReproError> {
    layout.require_fit(buffer_size as u64)?;
    let mut buffer = vec![BUFFER_FILL_VALUE; buffer_size];
    let texels = fill_pattern(start, layout.texture_bytes() as usize);
    let bpr = layout.bytes_per_row() as usize;
    for (src, (_, offset)) in texels.chunks_exact(bpr.max(1)).zip(layout.row_copies()) {
        let dst = offset as usize;
        buffer[dst..dst + bpr].copy_from_slice(src);
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r32float_layout() -> CopyLayout {
        let opts = TextureToBufferOptions::default();
        let format = format_by_name("r32float").unwrap();
        opts.layout(format)
    }

    #[test]
    fn table_matches_wgpu_block_sizes() {
        for f in FORMATS {
            assert_eq!(
                f.format.block_copy_size(None),
                Some(f.bytes_per_pixel),
                "{}",
                f.name
            );
        }
    }

    #[test]
    fn format_lookup_is_case_insensitive() {
        assert_eq!(
            format_by_name("R32Float").unwrap().format,
            wgpu::TextureFormat::R32Float
        );
        assert!(matches!(
            format_by_name("bc1"),
            Err(ReproError::UnknownFormat(_))
        ));
    }

    #[test]
    fn default_copy_geometry() {
        let layout = r32float_layout();
        assert_eq!(layout.bytes_per_row(), 256);
        assert_eq!(layout.bytes_per_image(), 2048);
        assert_eq!(layout.end_offset(), 2048);
        assert!(layout.fits(2048));
        assert!(!layout.fits(2047));
        assert!(layout.row_pitch_aligned());
    }

    #[test]
    fn row_copies_step_by_row_pitch() {
        let layout = CopyLayout {
            destination_offset: 16,
            ..r32float_layout()
        };
        let rows = layout.row_copies();
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0], (0, 16));
        assert_eq!(rows[3], (3, 16 + 3 * 256));
    }

    #[test]
    fn pattern_wraps_and_sets_high_bit() {
        assert_eq!(pattern_byte(1, 0), 0x81);
        assert_eq!(pattern_byte(0xFF, 1), 0x80);
        assert_eq!(pattern_byte(1, 0x100), 0x81);
        assert!(fill_pattern(7, 600).iter().all(|b| b & 0x80 != 0));
    }

    #[test]
    fn conforming_copy_passes() {
        let layout = r32float_layout();
        let buffer = simulate_copy(&layout, 1, 2048).unwrap();
        assert_eq!(check_contents(&layout, 1, &buffer), Ok(()));
    }

    #[test]
    fn copy_into_larger_buffer_leaves_tail_untouched() {
        let layout = CopyLayout {
            width: 4,
            height: 2,
            depth: 1,
            bytes_per_pixel: 2,
            destination_offset: 8,
        };
        let buffer = simulate_copy(&layout, 3, 64).unwrap();
        assert!(buffer[..8].iter().all(|&b| b == BUFFER_FILL_VALUE));
        assert!(buffer[24..].iter().all(|&b| b == BUFFER_FILL_VALUE));
        assert_eq!(check_contents(&layout, 3, &buffer), Ok(()));
    }

    #[test]
    fn wrong_texel_is_reported_with_position() {
        let layout = r32float_layout();
        let mut buffer = simulate_copy(&layout, 1, 2048).unwrap();
        // row 2, texel 3, second byte
        let index = 2 * 256 + 3 * 4 + 1;
        buffer[index] = 0;
        let err = check_contents(&layout, 1, &buffer).unwrap_err();
        assert_eq!((err.x, err.row, err.slice), (3, 2, 0));
        assert_eq!(err.index, index);
        assert_eq!(err.actual, 0);
        assert!(!err.corruption);
    }

    #[test]
    fn write_past_the_copy_is_corruption() {
        let layout = CopyLayout {
            height: 4,
            ..r32float_layout()
        };
        let mut buffer = simulate_copy(&layout, 1, 2048).unwrap();
        buffer[1500] = 0x99;
        let err = check_contents(&layout, 1, &buffer).unwrap_err();
        assert!(err.corruption);
        assert_eq!(err.expected, BUFFER_FILL_VALUE);
        assert!(err.to_string().starts_with("DATA CORRUPTION!"));
    }

    #[test]
    fn copy_that_overruns_the_buffer_is_refused() {
        let layout = CopyLayout {
            destination_offset: 8,
            ..r32float_layout()
        };
        assert!(matches!(
            simulate_copy(&layout, 1, 2048),
            Err(ReproError::BufferTooSmall {
                needed: 2056,
                size: 2048
            })
        ));
        assert!(r32float_layout().require_fit(2048).is_ok());
    }

    #[test]
    fn unknown_format_in_options_is_an_error() {
        let opts = TextureToBufferOptions {
            formats: vec!["r32float".to_owned(), "nope".to_owned()],
            ..TextureToBufferOptions::default()
        };
        assert!(matches!(
            opts.resolve_formats(),
            Err(ReproError::UnknownFormat(ref n)) if n == "nope"
        ));
    }
}
