//! # framepump
//!
//! Read decoded video frames out of media containers and write raw frames
//! into newly encoded ones, powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate.
//!
//! `framepump` sits between an application that works with raw pixel
//! buffers and the demux, decode, encode and mux machinery. An
//! [`InputPipeline`] yields frames of one video stream in a pixel format of
//! your choosing; an [`OutputPipeline`] accepts frames, converts them to
//! whatever its encoder negotiated, and drives the encoder's and muxer's
//! buffering until the file is finalised.
//!
//! ## Quick Start
//!
//! ### Read Frames
//!
//! ```no_run
//! use framepump::{InputOptions, InputPipeline, Pixel, ReadStatus};
//!
//! framepump::init(framepump::FfmpegLogLevel::Error)?;
//!
//! let options = InputOptions::new().with_pixel_format(Pixel::RGB24);
//! let mut input = InputPipeline::open("input.mp4", &options)?;
//! let mut frame = input.allocate_frame()?;
//!
//! while input.read_frame(&mut frame)? == ReadStatus::Frame {
//!     let rgb = frame.data(0);
//!     println!("{} bytes at pts {:?}", rgb.len(), frame.pts());
//! }
//! input.close();
//! # Ok::<(), framepump::PumpError>(())
//! ```
//!
//! ### Re-encode a Stream
//!
//! ```no_run
//! use framepump::{InputOptions, InputPipeline, OutputOptions, OutputPipeline};
//!
//! framepump::init(framepump::FfmpegLogLevel::Error)?;
//!
//! let mut input = InputPipeline::open("input.mp4", &InputOptions::new())?;
//! let options = OutputOptions::new(
//!     input.pixel_format(),
//!     input.width(),
//!     input.height(),
//!     input.frame_rate(),
//! )
//! .with_encoder("ffv1");
//! let mut output = OutputPipeline::open("output.mkv", &options)?;
//!
//! framepump::pump(&mut input, &mut output, None, None)?;
//! output.close()?;
//! # Ok::<(), framepump::PumpError>(())
//! ```
//!
//! ## Features
//!
//! - **Forward frame reading** with automatic pixel-format conversion and
//!   per-frame best-effort timestamps
//! - **Frame counting** from container metadata or by decoding once
//! - **Seeking by frame index** through decode-and-discard
//! - **Encoder negotiation**: preferred encoder, fallback codec, container
//!   default, and the closest supported pixel format
//! - **Complete finalisation**: encoder drain, muxer flush, trailer
//! - **Pluggable backend** traits for custom demuxers, codecs and muxers
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod backend;
pub mod config;
mod conversion;
mod cursor;
pub mod descriptor;
pub mod error;
pub mod ffmpeg;
pub mod frame;
pub mod input;
pub mod iterator;
pub mod negotiate;
pub mod options;
pub mod output;
pub mod progress;
pub mod pump;

pub use backend::{Demuxer, FrameDecoder, FrameEncoder, Muxer, Received, Scaler};
pub use config::{FrameCountPolicy, InputOptions, OutputOptions};
pub use conversion::ConverterBinding;
pub use cursor::ReadStatus;
pub use descriptor::{FormatDescriptor, PlaneLayout, parse_pixel_format};
pub use error::PumpError;
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, init, set_ffmpeg_log_level};
pub use frame::{FrameShape, clear_frame};
pub use input::{InputParts, InputPipeline, count_frames, count_frames_with, is_single_image_format};
pub use iterator::Frames;
pub use options::BackendOptions;
pub use output::{OutputParts, OutputPipeline};
pub use progress::{OperationType, ProgressCallback, ProgressInfo};
pub use pump::pump;

pub use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational, codec::Id as CodecId, format::Pixel,
    frame::Video as VideoFrame,
};
