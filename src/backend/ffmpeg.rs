//! FFmpeg implementation of the backend contract.
//!
//! Besides the trait implementations this module holds the FFmpeg side of
//! opening pipelines: probing an input container, selecting and configuring
//! an encoder for an output container, and the capability queries the
//! negotiation rules in [`crate::negotiate`] are fed with.

use std::ffi::CString;
use std::path::Path;
use std::ptr;

use ffmpeg_next::{
    Codec, Dictionary, Error as FfmpegError, Packet,
    codec::{Id as CodecId, context::Context as CodecContext},
    decoder, encoder,
    format::{self, Flags as FormatFlags, Pixel, context::Input, context::Output},
    frame::Video as VideoFrame,
    media::Type as MediaType,
    packet::Mut as PacketMut,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};

use crate::backend::{Demuxer, FrameDecoder, FrameEncoder, Muxer, Received, Scaler};
use crate::config::{InputOptions, OutputOptions};
use crate::conversion::ConverterBinding;
use crate::error::PumpError;
use crate::input::InputParts;
use crate::negotiate::{negotiate_pixel_format, select_encoder};
use crate::options::BackendOptions;
use crate::output::OutputParts;

/// Map the "try again" and "end of file" codes onto [`Received`].
fn classify<T>(result: Result<T, FfmpegError>) -> Result<Received<T>, FfmpegError> {
    match result {
        Ok(value) => Ok(Received::Ready(value)),
        Err(FfmpegError::Other {
            errno: ffmpeg_next::error::EAGAIN,
        }) => Ok(Received::NeedsInput),
        Err(FfmpegError::Eof) => Ok(Received::EndOfStream),
        Err(error) => Err(error),
    }
}

/// Demuxer over an opened FFmpeg input container.
pub struct FfmpegDemuxer(Input);

impl Demuxer for FfmpegDemuxer {
    fn read_packet(&mut self) -> Result<Option<Packet>, FfmpegError> {
        let mut packet = Packet::empty();
        match packet.read(&mut self.0) {
            Ok(()) => Ok(Some(packet)),
            Err(FfmpegError::Eof) => Ok(None),
            Err(error) => Err(error),
        }
    }
}

/// Opened FFmpeg video decoder.
pub struct FfmpegDecoder(decoder::Video);

impl FrameDecoder for FfmpegDecoder {
    fn send_packet(&mut self, packet: &Packet) -> Result<(), FfmpegError> {
        self.0.send_packet(packet)
    }

    fn send_eof(&mut self) -> Result<(), FfmpegError> {
        self.0.send_eof()
    }

    fn receive_frame(
        &mut self,
        frame: &mut VideoFrame,
    ) -> Result<Received<Option<i64>>, FfmpegError> {
        classify(self.0.receive_frame(frame).map(|()| frame.timestamp()))
    }
}

/// Opened FFmpeg video encoder.
pub struct FfmpegEncoder(encoder::Video);

impl FrameEncoder for FfmpegEncoder {
    fn send_frame(&mut self, frame: &VideoFrame) -> Result<(), FfmpegError> {
        self.0.send_frame(frame)
    }

    fn send_eof(&mut self) -> Result<(), FfmpegError> {
        self.0.send_eof()
    }

    fn receive_packet(&mut self, packet: &mut Packet) -> Result<Received<()>, FfmpegError> {
        classify(self.0.receive_packet(packet))
    }
}

/// FFmpeg output container whose header has been written.
pub struct FfmpegMuxer(Output);

impl Muxer for FfmpegMuxer {
    fn write_packet(&mut self, packet: &mut Packet) -> Result<(), FfmpegError> {
        // Packets of a single stream arrive in order, so the interleaving
        // queue is bypassed and the container does its own buffering.
        let code = unsafe { ffmpeg_sys_next::av_write_frame(self.0.as_mut_ptr(), packet.as_mut_ptr()) };
        if code < 0 {
            return Err(FfmpegError::from(code));
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<bool, FfmpegError> {
        let code = unsafe { ffmpeg_sys_next::av_write_frame(self.0.as_mut_ptr(), ptr::null_mut()) };
        if code < 0 {
            return Err(FfmpegError::from(code));
        }
        Ok(code == 1)
    }

    fn write_trailer(&mut self) -> Result<(), FfmpegError> {
        self.0.write_trailer()
    }
}

/// Software scaler between two fixed frame shapes.
pub struct FfmpegScaler(ScalingContext);

impl FfmpegScaler {
    /// Create a scaler for a binding. Both sides share the binding's size.
    pub fn new(binding: ConverterBinding) -> Result<Self, PumpError> {
        let context = ScalingContext::get(
            binding.source,
            binding.width,
            binding.height,
            binding.destination,
            binding.width,
            binding.height,
            ScalingFlags::BICUBIC,
        )
        .map_err(|error| {
            PumpError::Conversion(format!(
                "cannot create scaler {:?} -> {:?} at {}x{}: {error}",
                binding.source, binding.destination, binding.width, binding.height,
            ))
        })?;
        Ok(Self(context))
    }
}

impl Scaler for FfmpegScaler {
    fn scale(&mut self, source: &VideoFrame, destination: &mut VideoFrame) -> Result<(), FfmpegError> {
        self.0.run(source, destination)
    }
}

fn open_error(path: &Path, reason: impl std::fmt::Display) -> PumpError {
    PumpError::Open {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn path_to_cstring(path: &Path) -> Result<CString, PumpError> {
    CString::new(path.to_string_lossy().as_bytes())
        .map_err(|_| open_error(path, "path contains an interior NUL byte"))
}

/// Open and probe an input container, optionally forcing its format.
fn open_input(
    path: &Path,
    container_format: Option<&str>,
    settings: &BackendOptions,
) -> Result<Input, PumpError> {
    let Some(name) = container_format else {
        return format::input_with_dictionary(path, settings.to_dictionary())
            .map_err(|error| open_error(path, error));
    };

    let format_name = CString::new(name)
        .map_err(|_| PumpError::UnknownContainerFormat(name.to_string()))?;
    let c_path = path_to_cstring(path)?;

    unsafe {
        let input_format = ffmpeg_sys_next::av_find_input_format(format_name.as_ptr());
        if input_format.is_null() {
            return Err(PumpError::UnknownContainerFormat(name.to_string()));
        }

        let mut context = ptr::null_mut();
        let mut dictionary = settings.to_dictionary().disown();
        let code = ffmpeg_sys_next::avformat_open_input(
            &mut context,
            c_path.as_ptr(),
            input_format,
            &mut dictionary,
        );
        // Entries the demuxer did not consume are left behind.
        drop(Dictionary::own(dictionary));
        if code < 0 {
            return Err(open_error(path, FfmpegError::from(code)));
        }

        let code = ffmpeg_sys_next::avformat_find_stream_info(context, ptr::null_mut());
        if code < 0 {
            ffmpeg_sys_next::avformat_close_input(&mut context);
            return Err(open_error(path, FfmpegError::from(code)));
        }

        Ok(Input::wrap(context))
    }
}

/// Open an input file and its best video stream as pipeline parts.
pub(crate) fn open_input_parts(
    path: &Path,
    options: &InputOptions,
) -> Result<InputParts, PumpError> {
    let settings = BackendOptions::parse(&options.options)?;
    let input = open_input(path, options.container_format.as_deref(), &settings)?;
    let format_name = input.format().name().to_string();

    let (stream_index, frame_rate, time_base, reported_frames, decoder) = {
        let stream = input
            .streams()
            .best(MediaType::Video)
            .ok_or_else(|| PumpError::NoVideoStream {
                path: path.to_path_buf(),
            })?;

        let context = CodecContext::from_parameters(stream.parameters())
            .map_err(|error| open_error(path, format!("cannot create codec context: {error}")))?;
        let codec = decoder::find(context.id()).ok_or_else(|| {
            open_error(path, format!("no decoder for codec {:?}", context.id()))
        })?;
        let decoder = context
            .decoder()
            .open_as_with(codec, settings.to_dictionary())
            .and_then(|opened| opened.video())
            .map_err(|error| open_error(path, format!("cannot open decoder: {error}")))?;

        (
            stream.index(),
            stream.rate(),
            stream.time_base(),
            u64::try_from(stream.frames()).unwrap_or(0),
            decoder,
        )
    };

    log::debug!(
        "Opened {:?} as {format_name}: stream {stream_index}, {}x{} {:?}, rate {frame_rate}",
        path,
        decoder.width(),
        decoder.height(),
        decoder.format(),
    );

    Ok(InputParts {
        format: decoder.format(),
        width: decoder.width(),
        height: decoder.height(),
        demuxer: Box::new(FfmpegDemuxer(input)),
        decoder: Box::new(FfmpegDecoder(decoder)),
        stream_index,
        frame_rate,
        time_base,
        format_name,
        reported_frames,
    })
}

/// Whether the output container can hold streams of `codec`.
fn container_accepts(output: &Output, codec: Codec) -> bool {
    if codec.medium() != MediaType::Video {
        return false;
    }
    let answer = unsafe {
        ffmpeg_sys_next::avformat_query_codec(
            output.format().as_ptr(),
            codec.id().into(),
            ffmpeg_sys_next::FF_COMPLIANCE_NORMAL as i32,
        )
    };
    answer == 1
}

/// The container's default video encoder for this file name.
fn default_video_encoder(output: &Output, path: &Path) -> Option<Codec> {
    let file_name = CString::new(path.to_string_lossy().as_bytes()).ok()?;
    let id = unsafe {
        ffmpeg_sys_next::av_guess_codec(
            output.format().as_ptr(),
            ptr::null(),
            file_name.as_ptr(),
            ptr::null(),
            ffmpeg_sys_next::AVMediaType::AVMEDIA_TYPE_VIDEO,
        )
    };
    encoder::find(CodecId::from(id))
}

/// Pixel formats an encoder declares, or `None` when it accepts any.
fn supported_pixel_formats(codec: Codec) -> Option<Vec<Pixel>> {
    codec.video().ok()?.formats().map(|formats| formats.collect())
}

/// The candidate losing the least information when converting from `source`.
fn closest_pixel_format(candidates: &[Pixel], source: Pixel) -> Pixel {
    let mut list: Vec<ffmpeg_sys_next::AVPixelFormat> =
        candidates.iter().map(|&format| format.into()).collect();
    list.push(ffmpeg_sys_next::AVPixelFormat::AV_PIX_FMT_NONE);

    let best = unsafe {
        ffmpeg_sys_next::avcodec_find_best_pix_fmt_of_list(
            list.as_ptr(),
            source.into(),
            0,
            ptr::null_mut(),
        )
    };
    Pixel::from(best)
}

/// Create an output container, choose and open its encoder, and write the
/// container header.
pub(crate) fn open_output_parts(
    path: &Path,
    options: &OutputOptions,
) -> Result<OutputParts, PumpError> {
    let settings = BackendOptions::parse(&options.options)?;
    let mut output = match options.container_format.as_deref() {
        Some(name) => format::output_as_with(path, name, settings.to_dictionary()),
        None => format::output_with(path, settings.to_dictionary()),
    }
    .map_err(|error| open_error(path, format!("cannot create output container: {error}")))?;

    let needs_global_header = output.format().flags().contains(FormatFlags::GLOBAL_HEADER);

    let preferred = options
        .encoder
        .as_deref()
        .and_then(encoder::find_by_name)
        .into_iter()
        .chain(options.fallback_codec.and_then(encoder::find));
    let codec = select_encoder(
        preferred,
        |codec| container_accepts(&output, *codec),
        || default_video_encoder(&output, path),
    )
    .ok_or_else(|| PumpError::NoEncoder {
        path: path.to_path_buf(),
    })?;
    let encoder_name = codec.name().to_string();

    let pixel_format = negotiate_pixel_format(
        options.pixel_format,
        supported_pixel_formats(codec).as_deref(),
        options.source_format,
        closest_pixel_format,
        &encoder_name,
    )?;

    let time_base = options.frame_rate.invert();

    let mut stream = output
        .add_stream(codec)
        .map_err(|error| open_error(path, format!("cannot add stream: {error}")))?;
    let stream_index = stream.index();

    let mut encoder = CodecContext::new_with_codec(codec)
        .encoder()
        .video()
        .map_err(|error| open_error(path, format!("cannot create encoder context: {error}")))?;

    encoder.set_width(options.width);
    encoder.set_height(options.height);
    encoder.set_format(pixel_format);
    encoder.set_time_base(time_base);
    encoder.set_frame_rate(Some(options.frame_rate));

    if needs_global_header {
        unsafe {
            (*encoder.as_mut_ptr()).flags |= ffmpeg_sys_next::AV_CODEC_FLAG_GLOBAL_HEADER as i32;
        }
    }

    let encoder = encoder
        .open_as_with(codec, settings.to_dictionary())
        .map_err(|error| open_error(path, format!("cannot open encoder {encoder_name}: {error}")))?;

    stream.set_time_base(time_base);
    stream.set_rate(options.frame_rate);
    stream.set_avg_frame_rate(options.frame_rate);
    stream.set_parameters(&encoder);

    output
        .write_header_with(settings.to_dictionary())
        .map_err(|error| open_error(path, format!("cannot write header: {error}")))?;

    // The muxer may replace the stream time base while writing the header.
    let stream_time_base = output
        .stream(stream_index)
        .map(|stream| stream.time_base())
        .unwrap_or(time_base);

    log::info!(
        "Opened {:?} for writing: encoder {encoder_name}, {}x{} {:?}, stream time base {stream_time_base}",
        path,
        options.width,
        options.height,
        pixel_format,
    );

    Ok(OutputParts {
        encoder: Box::new(FfmpegEncoder(encoder)),
        muxer: Box::new(FfmpegMuxer(output)),
        stream_index,
        encoder_name,
        pixel_format,
        codec_time_base: time_base,
        stream_time_base,
    })
}
