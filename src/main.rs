use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use sdl3::event::Event;
use sdl3::keyboard::Keycode;
use sdl3::pixels::PixelFormat;
use sdl3::rect::Rect;
use sdl3::sys::pixels::{
    SDL_PIXELFORMAT_RGB565, SDL_PIXELFORMAT_RGBA5551, SDL_PIXELFORMAT_XBGR8888,
    SDL_PIXELFORMAT_XRGB8888,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jgmanager::audio_subsystem::{self, CoreAudioBuffer};
use jgmanager::ffi::{
    JG_PIXFMT_RGB565, JG_PIXFMT_RGBX5551, JG_PIXFMT_XBGR8888, JG_PIXFMT_XRGB8888,
    JG_SAMPFMT_INT16,
};
use jgmanager::input::InputPort;
use jgmanager::{log_driver, HostConfig, JgManager, NativeCore, SettingsFile};

#[derive(Parser)]
#[command(name = "jgmanager", version, about = "Run a JG emulator core")]
struct Cli {
    /// Path to the core shared library.
    core: PathBuf,
    /// ROM to load.
    rom: PathBuf,
    /// Slot used by the quick save (F2) and quick load (F4) keys.
    #[arg(long, default_value_t = 1)]
    slot: i32,
    /// Stop after this many frames.
    #[arg(long)]
    frames: Option<u64>,
    /// Run without a window or audio output.
    #[arg(long)]
    headless: bool,
    /// Cheat code to apply after loading; may be repeated.
    #[arg(long = "cheat")]
    cheats: Vec<String>,
    /// Window scale factor, overriding the saved one.
    #[arg(long)]
    scale: Option<u32>,
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

// Keyboard bindings for port 0, by core input definition name.
fn key_to_def(keycode: Keycode) -> Option<&'static str> {
    match keycode {
        Keycode::Up => Some("Up"),
        Keycode::Down => Some("Down"),
        Keycode::Left => Some("Left"),
        Keycode::Right => Some("Right"),
        Keycode::RShift => Some("Select"),
        Keycode::Return => Some("Start"),
        Keycode::X => Some("A"),
        Keycode::Z => Some("B"),
        _ => None,
    }
}

fn bytes_per_pixel(pixfmt: u32) -> usize {
    match pixfmt {
        JG_PIXFMT_RGB565 | JG_PIXFMT_RGBX5551 => 2,
        _ => 4,
    }
}

fn sdl_pixel_format(pixfmt: u32) -> Result<PixelFormat> {
    let raw = match pixfmt {
        JG_PIXFMT_XRGB8888 => SDL_PIXELFORMAT_XRGB8888,
        JG_PIXFMT_XBGR8888 => SDL_PIXELFORMAT_XBGR8888,
        JG_PIXFMT_RGBX5551 => SDL_PIXELFORMAT_RGBA5551,
        JG_PIXFMT_RGB565 => SDL_PIXELFORMAT_RGB565,
        other => bail!("unsupported pixel format {other}"),
    };
    PixelFormat::try_from(raw).map_err(|e| anyhow!("pixel format: {e:?}"))
}

struct Session {
    mgr: JgManager<NativeCore>,
    settings: SettingsFile,
    video_buf: Vec<u8>,
    audio_buf: Option<CoreAudioBuffer>,
    ports: Vec<InputPort>,
}

impl Session {
    fn start(cli: &Cli) -> Result<Self> {
        let core = NativeCore::open(&cli.core)?;
        let mut mgr = JgManager::new(core, HostConfig::default())?;

        if let Some(info) = mgr.coreinfo() {
            info!(core = %info.fname, version = %info.version, "core loaded");
        }

        let config_path = mgr.paths().config_file();
        let settings = SettingsFile::load(&config_path)?;
        let changed = settings.apply(mgr.settings_mut());
        info!(changed, path = %config_path.display(), "settings applied");

        let data = std::fs::read(&cli.rom)
            .with_context(|| format!("failed to read {}", cli.rom.display()))?;
        mgr.load_game(&cli.rom, data)?;

        // Output buffers must be in place before the setup calls.
        let video = mgr.videoinfo().context("core reports no video info")?;
        let mut video_buf =
            vec![0u8; video.wmax as usize * video.hmax as usize * bytes_per_pixel(video.pixfmt)];
        // SAFETY: `video_buf` lives in the session next to the manager.
        unsafe { mgr.set_video_buffer(video_buf.as_mut_ptr().cast()) };

        let mut audio_buf = None;
        if let Some(audio) = mgr.audioinfo() {
            if audio.sampfmt != JG_SAMPFMT_INT16 {
                warn!(sampfmt = audio.sampfmt, "unsupported sample format, audio disabled");
            } else {
                let mut buf = CoreAudioBuffer::new((audio.spf * audio.channels.max(1)) as usize);
                // SAFETY: as for the video buffer.
                unsafe { mgr.set_audio_buffer(buf.as_mut_ptr()) };
                mgr.set_audio_cb(Some(audio_subsystem::jg_audio));
                audio_buf = Some(buf);
            }
        }

        mgr.setup_video();
        mgr.setup_audio();

        let numinputs = mgr.coreinfo().map(|c| c.numinputs).unwrap_or(0) as i32;
        let mut ports = Vec::new();
        for port in 0..numinputs {
            let Some(info) = mgr.inputinfo(port) else {
                continue;
            };
            let mut input = InputPort::new(&info);
            // SAFETY: `ports` is kept alive with the session.
            unsafe { mgr.set_inputstate(input.state_ptr(), port) };
            ports.push(input);
        }

        for code in &cli.cheats {
            mgr.cheat_set(code)?;
        }

        Ok(Self {
            mgr,
            settings,
            video_buf,
            audio_buf,
            ports,
        })
    }

    fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.mgr.frametime().max(1)))
    }

    fn handle_key(&mut self, keycode: Keycode, pressed: bool, slot: i32) -> Result<bool> {
        if let Some(def) = key_to_def(keycode) {
            if let Some(port) = self.ports.first_mut() {
                port.set_button(def, pressed);
            }
            return Ok(true);
        }
        if !pressed {
            return Ok(true);
        }
        match keycode {
            Keycode::Escape => return Ok(false),
            Keycode::F1 => self.mgr.reset(false),
            Keycode::F2 => {
                self.mgr.state_qsave(slot)?;
            }
            Keycode::F4 => {
                self.mgr.state_qload(slot)?;
            }
            Keycode::F5 => self.mgr.media_select(),
            Keycode::F6 => self.mgr.media_insert(),
            _ => {}
        }
        Ok(true)
    }

    fn finish(mut self) -> Result<()> {
        self.settings.capture(self.mgr.settings());
        self.settings.save(&self.mgr.paths().config_file())?;
        self.mgr.unload_game();
        Ok(())
    }
}

fn run_headless(mut session: Session, frames: u64) -> Result<()> {
    for _ in 0..frames {
        session.mgr.exec_frame();
    }
    info!(frames, "headless run finished");
    session.finish()
}

fn run_window(mut session: Session, cli: &Cli) -> Result<()> {
    let scale = cli.scale.unwrap_or(session.settings.frontend.scale).max(1);
    session.settings.frontend.scale = scale;

    let video = session.mgr.videoinfo().context("core reports no video info")?;
    let bpp = bytes_per_pixel(video.pixfmt);
    let out_w = (f64::from(video.h) * video.aspect).round() as u32;

    let sdl_context = sdl3::init().map_err(|e| anyhow!("SDL init: {e:?}"))?;
    let video_subsystem = sdl_context.video().map_err(|e| anyhow!("SDL video: {e:?}"))?;
    let title = format!("jgmanager - {}", session.mgr.gamename());
    let window = video_subsystem
        .window(&title, out_w * scale, video.h * scale)
        .position_centered()
        .resizable()
        .build()
        .map_err(|e| anyhow!("failed to create window: {e:?}"))?;
    let mut canvas = window.into_canvas();
    let texture_creator = canvas.texture_creator();
    let mut texture = texture_creator
        .create_texture_streaming(sdl_pixel_format(video.pixfmt)?, video.wmax, video.hmax)
        .map_err(|e| anyhow!("failed to create texture: {e:?}"))?;

    let _audio = match session.mgr.audioinfo() {
        Some(a) if session.audio_buf.is_some() => Some(
            audio_subsystem::initialize_audio_subsystem(&sdl_context, a.rate, a.channels)
                .map_err(|e| anyhow!(e))?,
        ),
        _ => None,
    };

    let mut event_pump = sdl_context.event_pump().map_err(|e| anyhow!("SDL events: {e:?}"))?;
    let mut frame = 0u64;
    'running: loop {
        let started = Instant::now();
        for event in event_pump.poll_iter() {
            let keep_going = match event {
                Event::Quit { .. } => false,
                Event::KeyDown {
                    keycode: Some(k),
                    repeat: false,
                    ..
                } => session.handle_key(k, true, cli.slot)?,
                Event::KeyUp {
                    keycode: Some(k), ..
                } => session.handle_key(k, false, cli.slot)?,
                _ => true,
            };
            if !keep_going {
                break 'running;
            }
        }

        session.mgr.exec_frame();
        frame += 1;

        // The core updates the visible area every frame.
        if let Some(v) = session.mgr.videoinfo() {
            texture
                .update(None, &session.video_buf, v.p as usize * bpp)
                .map_err(|e| anyhow!("texture update: {e:?}"))?;
            let (win_w, win_h) = canvas.output_size().map_err(|e| anyhow!("{e:?}"))?;
            canvas.clear();
            canvas
                .copy(
                    &texture,
                    Rect::new(v.x as i32, v.y as i32, v.w, v.h),
                    Rect::new(0, 0, win_w, win_h),
                )
                .map_err(|e| anyhow!("{e:?}"))?;
            canvas.present();
        }

        if let Some(msg) = log_driver::take_screen_message() {
            if let Err(e) = canvas.window_mut().set_title(&format!("{title} - {msg}")) {
                warn!(error = ?e, message = %msg, "failed to show screen message");
            }
        }

        if cli.frames.is_some_and(|n| frame >= n) {
            break;
        }
        if let Some(rest) = session.frame_interval().checked_sub(started.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    session.finish()
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);
    info!(version = env!("CARGO_PKG_VERSION"), "jgmanager starting");

    let session = Session::start(&cli)?;
    if cli.headless {
        run_headless(session, cli.frames.unwrap_or(60))
    } else {
        run_window(session, &cli)
    }
}
