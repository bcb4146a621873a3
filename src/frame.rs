//! Frame buffer allocation and clearing.

use std::ptr;

use ffmpeg_next::{Error as FfmpegError, format::Pixel, frame::Video as VideoFrame};

use crate::error::PumpError;

/// Pixel format and size of a frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameShape {
    /// Pixel format of the buffer.
    pub format: Pixel,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameShape {
    /// Describe a frame buffer.
    pub fn new(format: Pixel, width: u32, height: u32) -> Self {
        Self {
            format,
            width,
            height,
        }
    }
}

/// Allocate a frame.
///
/// With a shape, the frame gets pixel buffers of that format and size.
/// Without one it is an empty frame the decoder will attach its own buffers
/// to.
pub(crate) fn allocate_frame(shape: Option<FrameShape>) -> Result<VideoFrame, PumpError> {
    let mut frame = VideoFrame::empty();
    let Some(shape) = shape else {
        return Ok(frame);
    };

    frame.set_format(shape.format);
    frame.set_width(shape.width);
    frame.set_height(shape.height);

    let code = unsafe { ffmpeg_sys_next::av_frame_get_buffer(frame.as_mut_ptr(), 0) };
    if code < 0 {
        return Err(PumpError::Allocation(format!(
            "{}x{} {:?}: {}",
            shape.width,
            shape.height,
            shape.format,
            FfmpegError::from(code),
        )));
    }
    Ok(frame)
}

/// Zero every buffer backing a frame.
///
/// This covers side buffers such as the palette of `PAL8` frames, not just
/// the image planes. Shared buffers are copied first, so other references
/// to the old pixel data are left untouched.
///
/// # Errors
///
/// Returns [`PumpError::Allocation`] if the frame has no buffers or they
/// cannot be made writable.
pub fn clear_frame(frame: &mut VideoFrame) -> Result<(), PumpError> {
    make_writable(frame)?;
    unsafe {
        for &buffer in &(*frame.as_mut_ptr()).buf {
            if buffer.is_null() || (*buffer).data.is_null() {
                continue;
            }
            ptr::write_bytes((*buffer).data, 0, (*buffer).size as usize);
        }
    }
    Ok(())
}

/// Give `frame` buffers of its own, copying them if they are shared.
pub(crate) fn make_writable(frame: &mut VideoFrame) -> Result<(), PumpError> {
    let code = unsafe { ffmpeg_sys_next::av_frame_make_writable(frame.as_mut_ptr()) };
    if code < 0 {
        return Err(PumpError::Allocation(format!(
            "cannot make frame writable: {}",
            FfmpegError::from(code)
        )));
    }
    Ok(())
}
