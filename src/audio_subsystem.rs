use std::ffi::c_void;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};
use std::sync::Mutex;

use sdl3::audio::{AudioCallback, AudioDevice, AudioFormat, AudioSpec, AudioStreamWithCallback};
use sdl3::{AudioSubsystem, Sdl};

static AUDIO_QUEUE: Mutex<Vec<i16>> = Mutex::new(Vec::new());
static QUEUE_LIMIT: AtomicUsize = AtomicUsize::new(48_000);

// Buffer the core writes into; published by `CoreAudioBuffer`.
static CORE_BUF: AtomicPtr<i16> = AtomicPtr::new(std::ptr::null_mut());
static CORE_BUF_LEN: AtomicUsize = AtomicUsize::new(0);

/// Sample buffer lent to the core through `jg_audioinfo_t.buf`.
pub struct CoreAudioBuffer {
    samples: Vec<i16>,
}

impl CoreAudioBuffer {
    pub fn new(len: usize) -> Self {
        let mut samples = vec![0i16; len];
        CORE_BUF_LEN.store(samples.len(), Ordering::Release);
        CORE_BUF.store(samples.as_mut_ptr(), Ordering::Release);
        Self { samples }
    }

    pub fn as_mut_ptr(&mut self) -> *mut c_void {
        self.samples.as_mut_ptr().cast()
    }
}

impl Drop for CoreAudioBuffer {
    fn drop(&mut self) {
        CORE_BUF.store(std::ptr::null_mut(), Ordering::Release);
        CORE_BUF_LEN.store(0, Ordering::Release);
    }
}

/// Audio callback handed to the core: `samples` interleaved samples are
/// ready in the lent buffer.
pub unsafe extern "C" fn jg_audio(samples: usize) {
    let ptr = CORE_BUF.load(Ordering::Acquire);
    if ptr.is_null() {
        return;
    }
    let len = samples.min(CORE_BUF_LEN.load(Ordering::Acquire));
    // SAFETY: `ptr` is owned by a live CoreAudioBuffer of at least `len` samples.
    let samples = unsafe { std::slice::from_raw_parts(ptr, len) };
    push_samples(samples);
}

pub fn push_samples(samples: &[i16]) {
    let Ok(mut queue) = AUDIO_QUEUE.lock() else {
        return;
    };
    queue.extend_from_slice(samples);
    let limit = QUEUE_LIMIT.load(Ordering::Relaxed);
    if queue.len() > limit {
        let excess = queue.len() - limit;
        queue.drain(..excess);
    }
}

/// Copies queued samples into `out`, padding with silence on underrun.
/// Returns how many real samples were written.
pub fn drain_into(out: &mut [i16]) -> usize {
    let Ok(mut queue) = AUDIO_QUEUE.lock() else {
        out.fill(0);
        return 0;
    };
    let n = out.len().min(queue.len());
    out[..n].copy_from_slice(&queue[..n]);
    out[n..].fill(0);
    queue.drain(..n);
    n
}

pub struct AudioHandler;

impl AudioCallback<i16> for AudioHandler {
    fn callback(&mut self, out: &mut [i16]) {
        drain_into(out);
    }
}

pub struct AudioOutput {
    pub subsystem: AudioSubsystem,
    pub device: AudioDevice,
    pub stream: AudioStreamWithCallback<AudioHandler>,
}

pub fn initialize_audio_subsystem(
    sdl_context: &Sdl,
    rate: u32,
    channels: u32,
) -> Result<AudioOutput, String> {
    let subsystem = sdl_context.audio().map_err(|e| e.to_string())?;
    let device = subsystem.default_playback_device();

    let spec = AudioSpec {
        freq: Some(rate as i32),
        channels: Some(channels as i32),
        format: Some(AudioFormat::S16LE),
    };
    // Half a second of backlog at most.
    QUEUE_LIMIT.store((rate * channels / 2) as usize, Ordering::Relaxed);

    let stream = device
        .open_playback_stream_with_callback(&spec, AudioHandler)
        .map_err(|e| format!("failed to open playback stream: {e}"))?;
    stream.resume().map_err(|e| e.to_string())?;
    tracing::info!(rate, channels, "audio output started");

    Ok(AudioOutput {
        subsystem,
        device,
        stream,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    static LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn core_buffer_feeds_queue_and_underrun_is_silent() {
        let _guard = LOCK.lock().unwrap_or_else(|e| e.into_inner());
        drain_into(&mut [0; 4096]);

        let mut buf = CoreAudioBuffer::new(4);
        let ptr = buf.as_mut_ptr().cast::<i16>();
        unsafe {
            for i in 0..4 {
                *ptr.add(i) = (i as i16 + 1) * 100;
            }
            // Asking for more than the buffer holds is clamped.
            jg_audio(8);
        }

        let mut out = [7i16; 6];
        assert_eq!(drain_into(&mut out), 4);
        assert_eq!(out, [100, 200, 300, 400, 0, 0]);
    }

    #[test]
    fn dropped_buffer_ignores_callbacks() {
        let _guard = LOCK.lock().unwrap_or_else(|e| e.into_inner());
        drain_into(&mut [0; 4096]);

        drop(CoreAudioBuffer::new(16));
        unsafe { jg_audio(16) };
        assert_eq!(drain_into(&mut [0; 16]), 0);
    }
}
