use anyhow::{Context, Result};
use clap::Parser;
use crossbeam::channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use std::f32::consts::PI;
use std::time::Duration;

use aout_rust::audio_output::{AudioBuffer, Coordinator, Mtime, StreamHandle};
use aout_rust::audio_output::types::INPUT_RATE_DEFAULT;
use aout_rust::config::load_config;
use aout_rust::logging::{init_logging, LogLevel};
use aout_rust::Cli;

/// Progress reported by the decoder thread
enum DecoderEvent {
    Submitted { index: usize, pts: Mtime },
    Finished,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(LogLevel::from_verbosity(cli.verbose));

    let config = load_config(cli.config.as_deref())?;
    let config = cli.merge_into_config(config)?;
    let format = cli.format()?;
    log::info!(
        "simulating {} buffers of {} samples at {} Hz, {} channels",
        cli.buffers(),
        cli.samples(),
        format.rate,
        format.channels
    );

    let (coordinator, outputs) = Coordinator::with_null_output(config);
    let handle = coordinator
        .create(&format, None, None)
        .context("Failed to create audio input")?;

    let (event_tx, event_rx) = unbounded();
    let (stop_tx, stop_rx) = bounded(1);

    let threads = crossbeam::scope(|s| {
        let decoder = s.spawn(|_| decode(&coordinator, &handle, &cli, event_tx));
        s.spawn(|_| drain(&coordinator, stop_rx));
        let control = s.spawn(|_| control(&coordinator, &handle, &cli, event_rx, stop_tx));

        let decoded = decoder.join();
        let controlled = control.join();
        (decoded, controlled)
    });

    let (decoded, controlled) = match threads {
        Ok(results) => results,
        Err(_) => anyhow::bail!("simulation thread panicked"),
    };
    let submitted = decoded
        .map_err(|_| anyhow::anyhow!("decoder thread panicked"))?
        .context("Decoder failed")?;
    controlled
        .map_err(|_| anyhow::anyhow!("control thread panicked"))?
        .context("Control failed")?;

    let dropped = coordinator.get_and_reset_dropped(&handle);
    coordinator
        .destroy(handle)
        .context("Failed to destroy audio input")?;

    let played = outputs.played();
    println!("submitted: {}", submitted);
    println!("delivered: {}", played.len());
    println!("dropped:   {}", dropped);
    if let (Some(first), Some(last)) = (played.first(), played.last()) {
        println!("pts range: {} .. {} us", first.pts, last.pts.saturating_add(last.length));
    }
    Ok(())
}

/// Decoder loop: request, fill, submit
fn decode(
    coordinator: &Coordinator,
    handle: &StreamHandle,
    cli: &Cli,
    events: Sender<DecoderEvent>,
) -> Result<usize> {
    let format = handle.format().clone();
    let samples = cli.samples();
    let step = format
        .duration_of(samples)
        .context("Buffer duration overflows")?;
    let mut pts: Mtime = 1;
    let mut phase = 0f32;
    let mut submitted = 0;

    for index in 0..cli.buffers() {
        let Some(mut buffer) = coordinator.request_buffer(handle, samples) else {
            log::warn!("stream unusable after {} buffers", submitted);
            break;
        };
        fill_tone(&mut buffer, format.channels as usize, format.rate, &mut phase);
        buffer.pts = pts;

        coordinator.submit(handle, buffer, INPUT_RATE_DEFAULT)?;
        submitted += 1;
        let _ = events.send(DecoderEvent::Submitted { index, pts });
        pts = pts.saturating_add(step);
    }

    let _ = events.send(DecoderEvent::Finished);
    Ok(submitted)
}

/// Fill a signed 16-bit buffer with a 440 Hz tone
fn fill_tone(buffer: &mut AudioBuffer, channels: usize, rate: u32, phase: &mut f32) {
    let inc = 2.0 * PI * 440.0 / rate as f32;
    for frame in buffer.data_mut().chunks_exact_mut(2 * channels) {
        let v = (phase.sin() * i16::MAX as f32 * 0.5) as i16;
        for sample in frame.chunks_exact_mut(2) {
            sample.copy_from_slice(&v.to_ne_bytes());
        }
        *phase = (*phase + inc) % (2.0 * PI);
    }
}

/// Output context: keep draining until told to stop
fn drain(coordinator: &Coordinator, stop: Receiver<()>) {
    let mut delivered = 0;
    loop {
        match stop.recv_timeout(Duration::from_millis(2)) {
            Err(RecvTimeoutError::Timeout) => delivered += coordinator.run_mixer(),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    log::debug!("output thread delivered {} buffers", delivered);
}

/// Control loop: pause and resume on cue, then flush what is left
fn control(
    coordinator: &Coordinator,
    handle: &StreamHandle,
    cli: &Cli,
    events: Receiver<DecoderEvent>,
    stop: Sender<()>,
) -> Result<()> {
    for event in events.iter() {
        match event {
            DecoderEvent::Submitted { index, pts } if Some(index) == cli.pause_at => {
                coordinator.set_paused(handle, true, pts)?;
                log::info!("paused at {} us", pts);
                std::thread::sleep(Duration::from_millis(cli.pause_ms));
                let resume = pts.saturating_add((cli.pause_ms as Mtime).saturating_mul(1000));
                coordinator.set_paused(handle, false, resume)?;
                log::info!("resumed at {} us", resume);
            }
            DecoderEvent::Submitted { .. } => {}
            DecoderEvent::Finished => break,
        }
    }

    let _ = stop.send(());
    coordinator.run_mixer();
    let pending = handle.pending();
    if pending > 0 {
        log::info!("flushing {} pending buffers", pending);
    }
    coordinator.flush(handle);
    Ok(())
}
