//! Pipeline integration tests
//!
//! Drive the decoder-facing API the way a decoder, a control thread and an
//! output thread would.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use aout_rust::audio_output::types::{INPUT_RATE_DEFAULT, INPUT_RATE_MIN};
use aout_rust::audio_output::{
    AoutError, AudioFormat, ChannelMask, Coordinator, ErrorCause, Mtime, NullOutputFactory,
    ReplayGain, ReplayGainMode, SampleFormat, SoftwareMixerFactory, StreamHandle, StreamState,
};
use aout_rust::config::{parse_config, PipelineConfig};
use proptest::prelude::*;
use rstest::rstest;

fn pipeline() -> (Coordinator, NullOutputFactory) {
    Coordinator::with_null_output(PipelineConfig::default())
}

fn submit_at(c: &Coordinator, handle: &StreamHandle, samples: usize, pts: Mtime) {
    let mut buf = c.request_buffer(handle, samples).expect("stream should be usable");
    buf.pts = pts;
    c.submit(handle, buf, INPUT_RATE_DEFAULT).expect("submit");
}

#[test]
fn test_create_submit_run_destroy() {
    let (c, outputs) = pipeline();
    let format = AudioFormat::new(SampleFormat::S16, 44_100, ChannelMask::STEREO);
    let handle = c.create(&format, None, None).unwrap();

    let mut buf = c.request_buffer(&handle, 1024).unwrap();
    assert_eq!(buf.len(), 1024 * 4);
    assert_eq!(buf.pts, 0);
    buf.pts = 1000;
    c.submit(&handle, buf, INPUT_RATE_DEFAULT).unwrap();
    c.run_mixer();

    let played = outputs.played();
    assert_eq!(played.len(), 1);
    assert_eq!(played[0].length, 23_219);

    c.destroy(handle).unwrap();
    assert!(!c.is_admitted());
    assert!(!c.has_output());
    assert!(!c.has_mixer());
}

#[rstest]
#[case(8_000, 40)]
#[case(8_000, 0)]
#[case(3_999, 2)]
#[case(192_001, 2)]
fn test_rejected_formats(#[case] rate: u32, #[case] channels: u32) {
    let (c, outputs) = pipeline();
    let mut format = AudioFormat::new(SampleFormat::S16, rate, ChannelMask::lowest(channels));
    format.channels = channels;

    let result = c.create(&format, None, None);
    assert!(matches!(result, Err(AoutError::InvalidFormat(_))));
    assert!(!c.is_admitted());
    assert!(outputs.opened().is_empty());
}

#[test]
fn test_mask_mismatch_rejected() {
    let (c, _) = pipeline();
    let mut format = AudioFormat::stereo_s16(48_000);
    format.channels = 3;
    assert!(matches!(
        c.create(&format, None, None),
        Err(AoutError::InvalidFormat(_))
    ));
}

#[test]
fn test_single_admission() {
    let (c, outputs) = pipeline();
    let first = c.create(&AudioFormat::stereo_s16(44_100), None, None).unwrap();
    let second = c.create(&AudioFormat::stereo_f32(48_000), None, None);
    assert_eq!(second.unwrap_err(), AoutError::AlreadyAdmitted);
    assert_eq!(outputs.opened().len(), 1);

    c.destroy(first).unwrap();
    let third = c.create(&AudioFormat::stereo_f32(48_000), None, None).unwrap();
    assert_eq!(third.state(), StreamState::Active);
    assert_eq!(outputs.opened().len(), 2);
}

#[test]
fn test_errored_stream_gives_no_buffer() {
    let c = Coordinator::new(
        PipelineConfig::default(),
        Arc::new(NullOutputFactory::failing()),
        Arc::new(SoftwareMixerFactory::new()),
    );
    let handle = c.create(&AudioFormat::stereo_s16(44_100), None, None).unwrap();
    assert_eq!(
        handle.state(),
        StreamState::Errored(ErrorCause::OutputUnavailable)
    );
    for samples in [1, 1024, 8192] {
        assert!(c.request_buffer(&handle, samples).is_none());
    }
    assert_eq!(c.run_mixer(), 0);
    c.destroy(handle).unwrap();
}

#[test]
fn test_oversized_request_keeps_stream_usable() {
    let (c, outputs) = pipeline();
    let handle = c.create(&AudioFormat::stereo_s16(48_000), None, None).unwrap();
    assert!(c.request_buffer(&handle, usize::MAX / 2).is_none());
    assert_eq!(handle.state(), StreamState::Active);

    submit_at(&c, &handle, 480, 1_000);
    assert_eq!(outputs.played().len(), 1);
    c.destroy(handle).unwrap();
}

#[test]
fn test_oversized_delay_config_rejected() {
    assert!(parse_config("max_pts_delay = 9000000000000000000\n").is_err());
}

#[test]
fn test_fifo_order_preserved() {
    let (c, outputs) = pipeline();
    let handle = c.create(&AudioFormat::stereo_s16(48_000), None, None).unwrap();
    c.set_paused(&handle, true, 1).unwrap();

    let mut expected = Vec::new();
    let mut pts = 1000;
    for i in 0..16 {
        let mut buf = c.request_buffer(&handle, 480).unwrap();
        buf.data_mut()[0] = i as u8;
        buf.pts = pts;
        c.submit(&handle, buf, INPUT_RATE_DEFAULT).unwrap();
        expected.push(i as u8);
        pts += 10_000;
    }
    assert_eq!(handle.pending(), 16);

    c.set_paused(&handle, false, 1).unwrap();
    assert_eq!(c.run_mixer(), 16);
    let order: Vec<u8> = outputs.played().iter().map(|p| p.data[0]).collect();
    assert_eq!(order, expected);
}

#[test]
fn test_resume_shifts_only_queued() {
    let (c, outputs) = pipeline();
    let handle = c.create(&AudioFormat::stereo_s16(48_000), None, None).unwrap();

    submit_at(&c, &handle, 480, 10_000);
    submit_at(&c, &handle, 480, 20_000);
    assert_eq!(outputs.played().len(), 2);

    c.set_paused(&handle, true, 30_000).unwrap();
    submit_at(&c, &handle, 480, 30_000);
    submit_at(&c, &handle, 480, 40_000);
    c.set_paused(&handle, false, 280_000).unwrap();
    c.run_mixer();

    let stamps: Vec<Mtime> = outputs.played().iter().map(|p| p.pts).collect();
    assert_eq!(stamps, vec![10_000, 20_000, 280_000, 290_000]);
}

#[test]
fn test_flush_empties_queue() {
    let (c, outputs) = pipeline();
    let handle = c.create(&AudioFormat::stereo_s16(48_000), None, None).unwrap();
    c.set_paused(&handle, true, 5).unwrap();
    for i in 0..4 {
        submit_at(&c, &handle, 480, 10_000 + i * 10_000);
    }
    c.flush(&handle);
    assert_eq!(handle.pending(), 0);
    assert_eq!(c.get_and_reset_dropped(&handle), 0);

    c.set_paused(&handle, false, 10).unwrap();
    assert_eq!(c.run_mixer(), 0);
    assert!(outputs.played().is_empty());

    // The timeline restarts from the next buffer
    submit_at(&c, &handle, 480, 900_000);
    assert_eq!(outputs.played()[0].pts, 900_000);
    assert_eq!(c.get_and_reset_dropped(&handle), 0);
}

#[test]
fn test_replay_gain_scales_output() {
    let config = parse_config("replay_gain_mode = track\n").unwrap();
    assert_eq!(config.replay_gain.mode, ReplayGainMode::Track);
    let (c, outputs) = Coordinator::with_null_output(config);

    let rg = ReplayGain {
        track_gain: Some(-6.0206),
        ..Default::default()
    };
    let handle = c
        .create(&AudioFormat::stereo_s16(44_100), Some(&rg), None)
        .unwrap();
    let mut buf = c.request_buffer(&handle, 1).unwrap();
    buf.data_mut()[..2].copy_from_slice(&1000i16.to_ne_bytes());
    buf.pts = 1;
    c.submit(&handle, buf, INPUT_RATE_DEFAULT).unwrap();

    let played = outputs.played();
    assert_eq!(i16::from_ne_bytes([played[0].data[0], played[0].data[1]]), 500);
}

#[test]
fn test_volume_applied() {
    let (c, outputs) = pipeline();
    c.set_volume(0.0);
    let handle = c.create(&AudioFormat::stereo_f32(48_000), None, None).unwrap();
    let mut buf = c.request_buffer(&handle, 1).unwrap();
    buf.data_mut()[..4].copy_from_slice(&0.75f32.to_ne_bytes());
    buf.pts = 1;
    c.submit(&handle, buf, INPUT_RATE_DEFAULT).unwrap();

    let played = outputs.played();
    let data = &played[0].data;
    assert_eq!(f32::from_ne_bytes([data[0], data[1], data[2], data[3]]), 0.0);
}

#[test]
fn test_rate_bounds() {
    let (c, _) = pipeline();
    let handle = c.create(&AudioFormat::stereo_s16(48_000), None, None).unwrap();
    let mut buf = c.request_buffer(&handle, 16).unwrap();
    buf.pts = 1;
    assert!(matches!(
        c.submit(&handle, buf, INPUT_RATE_MIN - 1),
        Err(AoutError::InvalidArgument(_))
    ));

    let mut buf = c.request_buffer(&handle, 16).unwrap();
    buf.pts = 1;
    c.submit(&handle, buf, INPUT_RATE_MIN).unwrap();
    assert_eq!(handle.playback_rate(), INPUT_RATE_MIN);
}

#[test]
fn test_destroy_wrong_handle() {
    let (c, _) = pipeline();
    let first = c.create(&AudioFormat::stereo_s16(44_100), None, None).unwrap();
    let stale = first.clone();
    c.destroy(first).unwrap();
    let current = c.create(&AudioFormat::stereo_s16(44_100), None, None).unwrap();

    assert_eq!(c.destroy(stale), Err(AoutError::NotFound));
    assert!(c.is_admitted());
    assert_eq!(current.state(), StreamState::Active);
}

#[test]
fn test_concurrent_decoder_control_output() {
    let (c, outputs) = pipeline();
    let c = Arc::new(c);
    let handle = c.create(&AudioFormat::stereo_s16(48_000), None, None).unwrap();
    let done = Arc::new(AtomicBool::new(false));

    let decoder = {
        let c = Arc::clone(&c);
        let handle = handle.clone();
        thread::spawn(move || {
            let mut pts = 1;
            for _ in 0..200 {
                let mut buf = c.request_buffer(&handle, 480).unwrap();
                buf.pts = pts;
                c.submit(&handle, buf, INPUT_RATE_DEFAULT).unwrap();
                pts += 10_000;
            }
        })
    };

    let output = {
        let c = Arc::clone(&c);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                c.run_mixer();
                thread::yield_now();
            }
        })
    };

    let control = {
        let c = Arc::clone(&c);
        let handle = handle.clone();
        thread::spawn(move || {
            for i in 0..50 {
                let date = i * 1000;
                c.set_paused(&handle, true, date).unwrap();
                c.set_paused(&handle, false, date + 500).unwrap();
                assert_eq!(c.get_and_reset_dropped(&handle), 0);
            }
        })
    };

    decoder.join().unwrap();
    control.join().unwrap();
    done.store(true, Ordering::Release);
    output.join().unwrap();

    c.run_mixer();
    assert_eq!(handle.pending(), 0);
    assert_eq!(outputs.played().len(), 200);

    let stamps: Vec<Mtime> = outputs.played().iter().map(|p| p.pts).collect();
    assert!(stamps.windows(2).all(|w| w[0] < w[1]));

    c.destroy(handle).unwrap();
}

#[test]
fn test_dropped_counter_not_lost_under_concurrency() {
    let (c, _) = pipeline();
    let c = Arc::new(c);
    let handle = c.create(&AudioFormat::stereo_s16(48_000), None, None).unwrap();
    submit_at(&c, &handle, 480, 10_000_000);

    const LATE: u32 = 300;
    let decoder = {
        let c = Arc::clone(&c);
        let handle = handle.clone();
        thread::spawn(move || {
            for _ in 0..LATE {
                let mut buf = c.request_buffer(&handle, 480).unwrap();
                buf.pts = 1000;
                c.submit(&handle, buf, INPUT_RATE_DEFAULT).unwrap();
            }
        })
    };

    let mut seen = 0;
    while !decoder.is_finished() {
        seen += c.get_and_reset_dropped(&handle);
    }
    decoder.join().unwrap();
    seen += c.get_and_reset_dropped(&handle);

    assert_eq!(seen, LATE);
    assert_eq!(c.get_and_reset_dropped(&handle), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_valid_formats_admitted(
        rate in 4_000u32..=192_000,
        channels in 1u32..=32,
        sample_format in prop_oneof![
            Just(SampleFormat::U8),
            Just(SampleFormat::S16),
            Just(SampleFormat::S32),
            Just(SampleFormat::F32),
            Just(SampleFormat::F64),
        ],
    ) {
        let (c, _) = pipeline();
        let format = AudioFormat::new(sample_format, rate, ChannelMask::lowest(channels));
        let handle = c.create(&format, None, None).unwrap();
        prop_assert_eq!(handle.state(), StreamState::Active);

        let buf = c.request_buffer(&handle, 64).unwrap();
        prop_assert_eq!(
            buf.len(),
            64 * channels as usize * sample_format.bytes_per_sample() as usize
        );
        c.destroy(handle).unwrap();
    }

    #[test]
    fn prop_out_of_range_rate_rejected(
        rate in prop_oneof![0u32..4_000, 192_001u32..1_000_000],
    ) {
        let (c, _) = pipeline();
        let format = AudioFormat::stereo_s16(rate);
        prop_assert!(matches!(
            c.create(&format, None, None),
            Err(AoutError::InvalidFormat(_))
        ));
        prop_assert!(!c.is_admitted());
    }

    #[test]
    fn prop_resume_shift_exact(pause in 1i64..10_000_000) {
        let (c, outputs) = pipeline();
        let handle = c.create(&AudioFormat::stereo_s16(48_000), None, None).unwrap();
        c.set_paused(&handle, true, 100).unwrap();
        submit_at(&c, &handle, 480, 1_000);
        submit_at(&c, &handle, 480, 11_000);
        c.set_paused(&handle, false, 100 + pause).unwrap();
        c.run_mixer();

        let stamps: Vec<Mtime> = outputs.played().iter().map(|p| p.pts).collect();
        prop_assert_eq!(stamps, vec![1_000 + pause, 11_000 + pause]);
    }
}
