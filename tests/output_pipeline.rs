//! Output pipeline integration tests over scripted backends.

mod common;

use common::{DelayedEncoder, HEIGHT, RecordingMuxer, WIDTH, output_parts};
use framepump::{OutputOptions, OutputPipeline, Pixel, PumpError, Rational};

fn gray_options() -> OutputOptions {
    OutputOptions::new(Pixel::GRAY8, WIDTH, HEIGHT, Rational::new(25, 1))
}

fn write_frames(output: &mut OutputPipeline, count: usize) {
    let mut frame = output.allocate_frame().expect("Failed to allocate frame");
    for _ in 0..count {
        output.write_frame(&mut frame).expect("Failed to write frame");
    }
}

#[test]
fn buffered_frames_are_written_at_close() {
    let (encoder, _) = DelayedEncoder::new(2);
    let (muxer, muxer_log) = RecordingMuxer::new();
    let mut output = OutputPipeline::from_parts(
        output_parts(encoder, muxer, 0, Pixel::GRAY8),
        &gray_options(),
    )
    .expect("Failed to build output pipeline");

    let mut frame = output.allocate_frame().expect("Failed to allocate frame");
    let mut emitted = Vec::new();
    for _ in 0..5 {
        output.write_frame(&mut frame).expect("Failed to write frame");
        emitted.push(muxer_log.borrow().packets.len());
    }
    assert_eq!(emitted, vec![0, 0, 1, 2, 3]);
    assert_eq!(output.frames_written(), 5);

    output.close().expect("Failed to close output");
    let log = muxer_log.borrow();
    assert_eq!(log.packets.len(), 5);
    assert!(log.trailer_written);
}

#[test]
fn packets_are_rescaled_and_tagged_with_the_stream() {
    let (encoder, _) = DelayedEncoder::new(0);
    let (muxer, muxer_log) = RecordingMuxer::new();
    let mut output = OutputPipeline::from_parts(
        output_parts(encoder, muxer, 3, Pixel::GRAY8),
        &gray_options(),
    )
    .expect("Failed to build output pipeline");

    write_frames(&mut output, 3);
    output.close().expect("Failed to close output");

    let log = muxer_log.borrow();
    let written: Vec<_> = log.packets.iter().map(|&(stream, pts, _)| (stream, pts)).collect();
    assert_eq!(written, vec![(3, Some(0)), (3, Some(40)), (3, Some(80))]);
}

#[test]
fn stream_facts_come_from_the_parts() {
    let (encoder, _) = DelayedEncoder::new(0);
    let (muxer, _) = RecordingMuxer::new();
    let output = OutputPipeline::from_parts(
        output_parts(encoder, muxer, 2, Pixel::GRAY8),
        &gray_options(),
    )
    .expect("Failed to build output pipeline");

    assert_eq!(output.stream_index(), 2);
    assert_eq!(output.codec_time_base(), Rational::new(1, 25));
    assert_eq!(output.stream_time_base(), Rational::new(1, 1000));
    assert_eq!(output.encoder_name(), "delayed");
}

#[test]
fn frame_timestamps_come_from_the_submission_count() {
    let (encoder, encoder_log) = DelayedEncoder::new(0);
    let (muxer, _) = RecordingMuxer::new();
    let mut output = OutputPipeline::from_parts(
        output_parts(encoder, muxer, 0, Pixel::GRAY8),
        &gray_options(),
    )
    .expect("Failed to build output pipeline");

    let mut frame = output.allocate_frame().expect("Failed to allocate frame");
    for pts in [900, 17, -3] {
        frame.set_pts(Some(pts));
        output.write_frame(&mut frame).expect("Failed to write frame");
    }

    assert_eq!(encoder_log.borrow().frames, vec![Some(0), Some(1), Some(2)]);
}

#[test]
fn packets_without_pts_fall_back_to_the_frame_timestamp() {
    let (encoder, _) = DelayedEncoder::new(0);
    let (muxer, muxer_log) = RecordingMuxer::new();
    let mut output = OutputPipeline::from_parts(
        output_parts(encoder.stripping_pts(), muxer, 0, Pixel::GRAY8),
        &gray_options(),
    )
    .expect("Failed to build output pipeline");

    write_frames(&mut output, 2);

    let pts: Vec<_> = muxer_log.borrow().packets.iter().map(|&(_, pts, _)| pts).collect();
    assert_eq!(pts, vec![Some(0), Some(40)]);
}

#[test]
fn closing_with_nothing_written_still_finalises() {
    let (encoder, encoder_log) = DelayedEncoder::new(1);
    let (muxer, muxer_log) = RecordingMuxer::new();
    let output = OutputPipeline::from_parts(
        output_parts(encoder, muxer, 0, Pixel::GRAY8),
        &gray_options(),
    )
    .expect("Failed to build output pipeline");

    output.close().expect("Failed to close output");
    assert!(encoder_log.borrow().eof_sent);
    assert!(muxer_log.borrow().packets.is_empty());
    assert!(muxer_log.borrow().trailer_written);
}

#[test]
fn muxer_is_flushed_until_it_reports_done() {
    let (encoder, _) = DelayedEncoder::new(0);
    let (muxer, muxer_log) = RecordingMuxer::new();
    let output = OutputPipeline::from_parts(
        output_parts(encoder, muxer.buffering(4), 0, Pixel::GRAY8),
        &gray_options(),
    )
    .expect("Failed to build output pipeline");

    output.close().expect("Failed to close output");
    assert_eq!(muxer_log.borrow().flushes, 4);
}

#[test]
fn trailer_is_written_when_encoder_flush_fails() {
    let (encoder, _) = DelayedEncoder::new(2);
    let (muxer, muxer_log) = RecordingMuxer::new();
    let mut output = OutputPipeline::from_parts(
        output_parts(encoder.failing_eof(), muxer, 0, Pixel::GRAY8),
        &gray_options(),
    )
    .expect("Failed to build output pipeline");

    write_frames(&mut output, 4);
    let result = output.close();

    assert!(matches!(result, Err(PumpError::Flush(_))));
    let log = muxer_log.borrow();
    assert!(log.trailer_written);
    assert_eq!(log.flushes, 0, "muxer flush is skipped after an encoder flush failure");
    assert_eq!(log.packets.len(), 2);
}

#[test]
fn trailer_is_written_when_muxer_flush_fails() {
    let (encoder, _) = DelayedEncoder::new(0);
    let (muxer, muxer_log) = RecordingMuxer::new();
    let mut output = OutputPipeline::from_parts(
        output_parts(encoder, muxer.failing_flush(), 0, Pixel::GRAY8),
        &gray_options(),
    )
    .expect("Failed to build output pipeline");

    write_frames(&mut output, 1);
    assert!(matches!(output.close(), Err(PumpError::Flush(_))));
    assert!(muxer_log.borrow().trailer_written);
}

#[test]
fn write_failure_is_an_encode_error() {
    let (encoder, _) = DelayedEncoder::new(0);
    let (muxer, _) = RecordingMuxer::new();
    let mut output = OutputPipeline::from_parts(
        output_parts(encoder, muxer.failing_writes(), 0, Pixel::GRAY8),
        &gray_options(),
    )
    .expect("Failed to build output pipeline");

    let mut frame = output.allocate_frame().expect("Failed to allocate frame");
    assert!(matches!(
        output.write_frame(&mut frame),
        Err(PumpError::Encode(_))
    ));
}

#[test]
fn negotiated_format_converts_before_encoding() {
    let (encoder, encoder_log) = DelayedEncoder::new(0);
    let (muxer, muxer_log) = RecordingMuxer::new();
    let options = OutputOptions::new(Pixel::RGB24, WIDTH, HEIGHT, Rational::new(25, 1));
    let mut output =
        OutputPipeline::from_parts(output_parts(encoder, muxer, 0, Pixel::YUV420P), &options)
            .expect("Failed to build output pipeline");

    assert_eq!(output.source_format(), Pixel::RGB24);
    assert_eq!(output.pixel_format(), Pixel::YUV420P);
    let binding = output.conversion().expect("conversion expected");
    assert_eq!((binding.source, binding.destination), (Pixel::RGB24, Pixel::YUV420P));

    let mut frame = output.allocate_frame().expect("Failed to allocate frame");
    assert_eq!(frame.format(), Pixel::RGB24);
    frame.set_pts(Some(77));
    output.write_frame(&mut frame).expect("Failed to write frame");
    output.write_frame(&mut frame).expect("Failed to write frame");

    assert_eq!(frame.pts(), Some(77), "caller frame is left untouched");
    let log = encoder_log.borrow();
    assert_eq!(log.formats, vec![Pixel::YUV420P, Pixel::YUV420P]);
    assert_eq!(log.frames, vec![Some(0), Some(1)]);
    drop(log);

    output.close().expect("Failed to close output");
    assert_eq!(muxer_log.borrow().packets.len(), 2);
}

#[test]
fn layout_describes_source_frames() {
    let (encoder, _) = DelayedEncoder::new(0);
    let (muxer, _) = RecordingMuxer::new();
    let options = OutputOptions::new(Pixel::YUV420P, 5, 3, Rational::new(30, 1));
    let output =
        OutputPipeline::from_parts(output_parts(encoder, muxer, 0, Pixel::YUV420P), &options)
            .expect("Failed to build output pipeline");

    let layout = output.plane_layout();
    assert_eq!(layout.widths, vec![5, 3, 3]);
    assert_eq!(layout.heights, vec![3, 2, 2]);
    assert_eq!(output.encoder_name(), "delayed");
    assert_eq!(output.frame_rate(), Rational::new(30, 1));
}
