//! Pixel format descriptors and plane geometry.
//!
//! A [`FormatDescriptor`] is the small piece of a pixel format that buffer
//! planning needs: how many components the format has and how far its
//! chroma planes are subsampled. [`FormatDescriptor::plane_layout`] turns it
//! into per-plane dimensions for a given picture size.

use std::str::FromStr;

use ffmpeg_next::format::Pixel;

use crate::error::PumpError;

/// Component count and chroma subsampling of a pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatDescriptor {
    /// The pixel format this descriptor was resolved from.
    pub format: Pixel,
    /// Number of components (planes for planar formats).
    pub components: usize,
    /// log2 of the horizontal chroma subsampling factor.
    pub chroma_shift_w: u8,
    /// log2 of the vertical chroma subsampling factor.
    pub chroma_shift_h: u8,
}

/// Per-component dimensions of a picture in one pixel format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaneLayout {
    /// Number of components.
    pub component_count: usize,
    /// Width of each component, indexed by component.
    pub widths: Vec<u32>,
    /// Height of each component, indexed by component.
    pub heights: Vec<u32>,
}

impl PlaneLayout {
    /// `(width, height)` of one component, if it exists.
    pub fn plane(&self, index: usize) -> Option<(u32, u32)> {
        Some((*self.widths.get(index)?, *self.heights.get(index)?))
    }
}

impl FormatDescriptor {
    /// Build a descriptor from raw values.
    pub fn new(format: Pixel, components: usize, chroma_shift_w: u8, chroma_shift_h: u8) -> Self {
        Self {
            format,
            components,
            chroma_shift_w,
            chroma_shift_h,
        }
    }

    /// Look up the descriptor of a pixel format.
    ///
    /// # Errors
    ///
    /// Returns [`PumpError::UnknownPixelFormat`] for [`Pixel::None`] or any
    /// format FFmpeg has no descriptor for.
    pub fn resolve(format: Pixel) -> Result<Self, PumpError> {
        if format == Pixel::None {
            return Err(PumpError::UnknownPixelFormat("none".to_string()));
        }
        let descriptor = format
            .descriptor()
            .ok_or_else(|| PumpError::UnknownPixelFormat(format!("{format:?}")))?;

        Ok(Self::new(
            format,
            descriptor.nb_components() as usize,
            descriptor.log2_chroma_w(),
            descriptor.log2_chroma_h(),
        ))
    }

    /// Per-component dimensions for a `width` × `height` picture.
    ///
    /// Component 0 and any component past index 2 (alpha) are full size.
    /// Components 1 and 2 are divided by the chroma subsampling factor,
    /// rounding up.
    ///
    /// # Example
    ///
    /// ```
    /// use framepump::{FormatDescriptor, Pixel};
    ///
    /// // 4:2:0 with alpha
    /// let layout = FormatDescriptor::new(Pixel::YUVA420P, 4, 1, 1).plane_layout(5, 3);
    /// assert_eq!(layout.widths, vec![5, 3, 3, 5]);
    /// assert_eq!(layout.heights, vec![3, 2, 2, 3]);
    /// ```
    pub fn plane_layout(&self, width: u32, height: u32) -> PlaneLayout {
        let (widths, heights) = (0..self.components)
            .map(|index| match index {
                1 | 2 => (
                    shift_round_up(width, self.chroma_shift_w),
                    shift_round_up(height, self.chroma_shift_h),
                ),
                _ => (width, height),
            })
            .unzip();

        PlaneLayout {
            component_count: self.components,
            widths,
            heights,
        }
    }
}

/// Resolve a pixel format by its FFmpeg name, e.g. `"yuv420p"`.
///
/// # Errors
///
/// Returns [`PumpError::UnknownPixelFormat`] if FFmpeg does not know the name.
pub fn parse_pixel_format(name: &str) -> Result<Pixel, PumpError> {
    Pixel::from_str(name).map_err(|_| PumpError::UnknownPixelFormat(name.to_string()))
}

fn shift_round_up(value: u32, shift: u8) -> u32 {
    value.div_ceil(1 << shift)
}
