use std::ffi::{c_double, CString};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};

use crate::config::HostConfig;
use crate::error::{Error, Result};
use crate::ffi::{
    cstr_lossy, jg_audioinfo_t, jg_cb_audio_t, jg_cb_rumble_t, jg_inputstate_t, jg_pixfmt_t,
    jg_sampfmt_t, jg_setting_t, jg_videoinfo_t,
};
use crate::game_info::GameInfo;
use crate::log_driver;
use crate::paths::{path_to_cstring, Paths};
use crate::plugin::Core;

static FRAMETIME: AtomicI32 = AtomicI32::new(60);

unsafe extern "C" fn jg_frametime(interval: c_double) {
    FRAMETIME.store((interval + 0.5) as i32, Ordering::Relaxed);
}

/// Result of a state load or save, keeping the integer codes of the ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateStatus {
    Failed,
    Ok,
    NotLoaded,
    Unknown(i32),
}

impl StateStatus {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => StateStatus::Failed,
            1 => StateStatus::Ok,
            2 => StateStatus::NotLoaded,
            other => StateStatus::Unknown(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            StateStatus::Failed => 0,
            StateStatus::Ok => 1,
            StateStatus::NotLoaded => 2,
            StateStatus::Unknown(code) => code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreInfo {
    pub name: String,
    pub fname: String,
    pub version: String,
    pub sys: String,
    pub numinputs: u32,
    pub hints: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputInfo {
    pub kind: u32,
    pub index: i32,
    pub name: String,
    pub fname: String,
    /// Names of the axes followed by the buttons.
    pub defs: Vec<String>,
    pub numaxes: i32,
    pub numbuttons: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioInfo {
    pub sampfmt: jg_sampfmt_t,
    pub rate: u32,
    pub channels: u32,
    pub spf: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub pixfmt: jg_pixfmt_t,
    pub wmax: u32,
    pub hmax: u32,
    pub w: u32,
    pub h: u32,
    pub x: u32,
    pub y: u32,
    pub p: u32,
    pub aspect: f64,
}

impl From<&jg_audioinfo_t> for AudioInfo {
    fn from(raw: &jg_audioinfo_t) -> Self {
        AudioInfo {
            sampfmt: raw.sampfmt,
            rate: raw.rate,
            channels: raw.channels,
            spf: raw.spf,
        }
    }
}

impl From<&jg_videoinfo_t> for VideoInfo {
    fn from(raw: &jg_videoinfo_t) -> Self {
        VideoInfo {
            pixfmt: raw.pixfmt,
            wmax: raw.wmax,
            hmax: raw.hmax,
            w: raw.w,
            h: raw.h,
            x: raw.x,
            y: raw.y,
            p: raw.p,
            aspect: raw.aspect,
        }
    }
}

/// Drives one core for the length of a session.
pub struct JgManager<C: Core> {
    core: C,
    config: HostConfig,
    paths: Paths,
    settings: (*mut jg_setting_t, usize),
    game: Option<GameInfo>,
    gamename: String,
    loaded: bool,
}

impl<C: Core> JgManager<C> {
    /// Sets paths from the environment, then initialises the core.
    pub fn new(core: C, config: HostConfig) -> Result<Self> {
        let paths = Paths::from_env(&config)?;
        Ok(Self::with_paths(core, config, paths))
    }

    pub fn with_paths(mut core: C, config: HostConfig, paths: Paths) -> Self {
        core.set_paths(paths.pathinfo());
        let settings = core.settings();
        core.set_cb_frametime(Some(jg_frametime));
        core.set_cb_log(Some(log_driver::jg_log));
        if core.init() == 0 {
            tracing::warn!("core initialisation reported failure");
        }
        tracing::debug!(
            base = %paths.base().display(),
            core = %paths.core().display(),
            settings = settings.1,
            "core ready"
        );

        Self {
            core,
            config,
            paths,
            settings,
            game: None,
            gamename: String::new(),
            loaded: false,
        }
    }

    pub fn init(&mut self) -> i32 {
        self.core.init()
    }

    pub fn load_game(&mut self, path: impl AsRef<Path>, data: Vec<u8>) -> Result<()> {
        let path = path.as_ref();
        self.unload_game();

        let mut info = GameInfo::new(path, data)?;
        self.core.set_gameinfo(info.build());
        self.gamename = info.name().to_owned();
        tracing::info!(
            game = %info.name(),
            size = info.size(),
            crc = %format!("{:08x}", info.crc()),
            md5 = %info.md5(),
            "loading game"
        );
        // The core may keep pointers into `info` until unload.
        self.game = Some(info);

        if !self.core.game_load() {
            self.game = None;
            return Err(Error::GameLoad(path.display().to_string()));
        }

        self.loaded = true;
        Ok(())
    }

    pub fn unload_game(&mut self) {
        if self.loaded {
            self.core.game_unload();
            self.loaded = false;
            self.game = None;
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn basepath(&self) -> &Path {
        self.paths.base()
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    pub fn gamename(&self) -> &str {
        &self.gamename
    }

    pub fn game(&self) -> Option<&GameInfo> {
        self.game.as_ref()
    }

    pub fn settings(&self) -> &[jg_setting_t] {
        let (ptr, len) = self.settings;
        if ptr.is_null() {
            return &[];
        }
        // SAFETY: the array is owned by the core, which `self` owns.
        unsafe { std::slice::from_raw_parts(ptr, len) }
    }

    pub fn settings_mut(&mut self) -> &mut [jg_setting_t] {
        let (ptr, len) = self.settings;
        if ptr.is_null() {
            return &mut [];
        }
        // SAFETY: as in `settings`, and `&mut self` makes the borrow unique.
        unsafe { std::slice::from_raw_parts_mut(ptr, len) }
    }

    pub fn setting(&self, name: &str) -> Option<&jg_setting_t> {
        self.settings()
            .iter()
            .find(|s| unsafe { cstr_lossy(s.name) } == name)
    }

    pub fn setting_mut(&mut self, name: &str) -> Option<&mut jg_setting_t> {
        self.settings_mut()
            .iter_mut()
            .find(|s| unsafe { cstr_lossy(s.name) } == name)
    }

    pub fn exec_frame(&mut self) {
        self.core.exec_frame();
    }

    pub fn reset(&mut self, hard: bool) {
        if self.loaded {
            self.core.reset(hard);
        }
    }

    pub fn state_load(&mut self, path: &Path) -> Result<StateStatus> {
        if !self.loaded {
            return Ok(StateStatus::NotLoaded);
        }
        let path = path_to_cstring(path)?;
        Ok(StateStatus::from_code(self.core.state_load(&path)))
    }

    pub fn state_save(&mut self, path: &Path) -> Result<StateStatus> {
        if !self.loaded {
            return Ok(StateStatus::NotLoaded);
        }
        let path = path_to_cstring(path)?;
        Ok(StateStatus::from_code(self.core.state_save(&path)))
    }

    pub fn slot_path(&self, slot: i32) -> PathBuf {
        self.paths.slot_path(&self.gamename, slot)
    }

    pub fn state_qload(&mut self, slot: i32) -> Result<StateStatus> {
        if !self.loaded {
            return Ok(StateStatus::NotLoaded);
        }
        let status = self.state_load(&self.slot_path(slot))?;
        log_driver::screen(match status {
            StateStatus::Failed => "State Load Failed",
            StateStatus::Ok => "State Loaded",
            _ => "State Load Unknown",
        });
        Ok(status)
    }

    pub fn state_qsave(&mut self, slot: i32) -> Result<StateStatus> {
        if !self.loaded {
            return Ok(StateStatus::NotLoaded);
        }
        let status = self.state_save(&self.slot_path(slot))?;
        log_driver::screen(match status {
            StateStatus::Failed => "State Save Failed",
            StateStatus::Ok => "State Saved",
            _ => "State Save Unknown",
        });
        Ok(status)
    }

    /// Snapshot of the running game's state, or `None` when nothing is loaded.
    pub fn state_save_raw(&mut self) -> Option<Vec<u8>> {
        if !self.loaded {
            return None;
        }
        let size = self.core.state_size();
        let ptr = self.core.state_save_raw();
        if ptr.is_null() {
            return None;
        }
        // SAFETY: the core returns `state_size()` readable bytes.
        Some(unsafe { std::slice::from_raw_parts(ptr.cast::<u8>(), size) }.to_vec())
    }

    /// Restores a snapshot taken with `state_save_raw`. The core reads
    /// exactly `state_size()` bytes, so any other length is rejected.
    pub fn state_load_raw(&mut self, data: &[u8]) -> StateStatus {
        if !self.loaded {
            return StateStatus::NotLoaded;
        }
        let expected = self.core.state_size();
        if data.len() != expected {
            tracing::warn!(expected, got = data.len(), "state snapshot has the wrong size");
            return StateStatus::Failed;
        }
        self.core.state_load_raw(data);
        StateStatus::Ok
    }

    pub fn media_select(&mut self) {
        if !self.loaded {
            return;
        }
        self.core.media_select();
    }

    pub fn media_insert(&mut self) {
        if !self.loaded {
            return;
        }
        self.core.media_insert();
    }

    pub fn cheat_clear(&mut self) {
        self.core.cheat_clear();
    }

    pub fn cheat_set(&mut self, code: &str) -> Result<()> {
        let code = CString::new(code)?;
        self.core.cheat_set(&code);
        Ok(())
    }

    pub fn frametime(&self) -> i32 {
        FRAMETIME.load(Ordering::Relaxed)
    }

    pub fn rehash(&mut self) {
        if self.loaded {
            self.core.rehash();
        }
    }

    pub fn coreinfo(&mut self) -> Option<CoreInfo> {
        let sys = CString::new(self.config.system.as_str()).ok()?;
        let ptr = self.core.coreinfo(&sys);
        // SAFETY: non-null pointers from the core reference static data.
        let raw = unsafe { ptr.as_ref() }?;
        Some(unsafe {
            CoreInfo {
                name: cstr_lossy(raw.name),
                fname: cstr_lossy(raw.fname),
                version: cstr_lossy(raw.version),
                sys: cstr_lossy(raw.sys),
                numinputs: raw.numinputs,
                hints: raw.hints,
            }
        })
    }

    pub fn inputinfo(&mut self, port: i32) -> Option<InputInfo> {
        let ptr = self.core.inputinfo(port);
        // SAFETY: as in `coreinfo`; `defs` holds numaxes + numbuttons entries.
        let raw = unsafe { ptr.as_ref() }?;
        let count = usize::try_from(raw.numaxes).unwrap_or(0)
            + usize::try_from(raw.numbuttons).unwrap_or(0);
        let defs = if raw.defs.is_null() {
            Vec::new()
        } else {
            unsafe { std::slice::from_raw_parts(raw.defs, count) }
                .iter()
                .map(|&d| unsafe { cstr_lossy(d) })
                .collect()
        };
        Some(InputInfo {
            kind: raw.type_,
            index: raw.index,
            name: unsafe { cstr_lossy(raw.name) },
            fname: unsafe { cstr_lossy(raw.fname) },
            defs,
            numaxes: raw.numaxes,
            numbuttons: raw.numbuttons,
        })
    }

    pub fn audioinfo(&mut self) -> Option<AudioInfo> {
        // SAFETY: pointer lives as long as the core.
        unsafe { self.core.audioinfo().as_ref() }.map(AudioInfo::from)
    }

    pub fn videoinfo(&mut self) -> Option<VideoInfo> {
        // SAFETY: pointer lives as long as the core.
        unsafe { self.core.videoinfo().as_ref() }.map(VideoInfo::from)
    }

    /// Lends `buf` to the core as its audio output buffer.
    ///
    /// # Safety
    /// `buf` must stay valid until another buffer is set or the core is dropped.
    pub unsafe fn set_audio_buffer(&mut self, buf: *mut std::ffi::c_void) {
        if let Some(info) = unsafe { self.core.audioinfo().as_mut() } {
            info.buf = buf;
        }
    }

    /// Lends `buf` to the core as its video output buffer.
    ///
    /// # Safety
    /// `buf` must stay valid until another buffer is set or the core is dropped.
    pub unsafe fn set_video_buffer(&mut self, buf: *mut std::ffi::c_void) {
        if let Some(info) = unsafe { self.core.videoinfo().as_mut() } {
            info.buf = buf;
        }
    }

    pub fn set_audio_cb(&mut self, cb: jg_cb_audio_t) {
        self.core.set_cb_audio(cb);
    }

    pub fn set_rumble_cb(&mut self, cb: jg_cb_rumble_t) {
        self.core.set_cb_rumble(cb);
    }

    pub fn data_push(&mut self, kind: u32, port: i32, data: &[u8]) {
        self.core.data_push(kind, port, data);
    }

    pub fn setup_audio(&mut self) {
        self.core.setup_audio();
    }

    pub fn setup_video(&mut self) {
        self.core.setup_video();
    }

    /// # Safety
    /// `state` and the arrays it points to must outlive the loaded game.
    pub unsafe fn set_inputstate(&mut self, state: *mut jg_inputstate_t, port: i32) {
        self.core.set_inputstate(state, port);
    }
}

impl<C: Core> Drop for JgManager<C> {
    fn drop(&mut self) {
        self.unload_game();
        self.core.deinit();
    }
}
