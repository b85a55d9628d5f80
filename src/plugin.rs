use std::ffi::{c_char, c_int, c_void, CStr};
use std::path::{Path, PathBuf};

use libloading::Library;

use crate::error::{Error, Result};
use crate::ffi::{
    jg_audioinfo_t, jg_cb_audio_t, jg_cb_frametime_t, jg_cb_log_t, jg_cb_rumble_t,
    jg_coreinfo_t, jg_fileinfo_t, jg_inputinfo_t, jg_inputstate_t, jg_pathinfo_t, jg_setting_t,
    jg_videoinfo_t,
};

/// The JG entry points a frontend drives.
///
/// Methods mirror the C functions one to one. Pointer-returning accessors
/// hand back whatever the core returned, including null.
pub trait Core {
    fn init(&mut self) -> i32;
    fn deinit(&mut self);
    fn reset(&mut self, hard: bool);
    fn exec_frame(&mut self);
    fn game_load(&mut self) -> bool;
    fn game_unload(&mut self) -> bool;
    fn state_load(&mut self, path: &CStr) -> i32;
    fn state_save(&mut self, path: &CStr) -> i32;
    fn state_load_raw(&mut self, data: &[u8]);
    /// Returns a pointer to `state_size()` bytes owned by the core.
    fn state_save_raw(&mut self) -> *const c_void;
    fn state_size(&mut self) -> usize;
    fn media_select(&mut self);
    fn media_insert(&mut self);
    fn cheat_clear(&mut self);
    fn cheat_set(&mut self, code: &CStr);
    fn rehash(&mut self);
    fn data_push(&mut self, kind: u32, port: i32, data: &[u8]);

    fn coreinfo(&mut self, sys: &CStr) -> *mut jg_coreinfo_t;
    fn videoinfo(&mut self) -> *mut jg_videoinfo_t;
    fn audioinfo(&mut self) -> *mut jg_audioinfo_t;
    fn inputinfo(&mut self, port: i32) -> *mut jg_inputinfo_t;
    /// Returns the core-owned settings array and its length.
    fn settings(&mut self) -> (*mut jg_setting_t, usize);

    fn setup_video(&mut self);
    fn setup_audio(&mut self);
    fn set_inputstate(&mut self, state: *mut jg_inputstate_t, port: i32);
    fn set_gameinfo(&mut self, info: jg_fileinfo_t);
    fn set_paths(&mut self, paths: jg_pathinfo_t);

    fn set_cb_audio(&mut self, cb: jg_cb_audio_t);
    fn set_cb_frametime(&mut self, cb: jg_cb_frametime_t);
    fn set_cb_log(&mut self, cb: jg_cb_log_t);
    fn set_cb_rumble(&mut self, cb: jg_cb_rumble_t);
}

struct Symbols {
    init: unsafe extern "C" fn() -> c_int,
    deinit: unsafe extern "C" fn(),
    reset: unsafe extern "C" fn(c_int),
    exec_frame: unsafe extern "C" fn(),
    game_load: unsafe extern "C" fn() -> c_int,
    game_unload: unsafe extern "C" fn() -> c_int,
    state_load: unsafe extern "C" fn(*const c_char) -> c_int,
    state_load_raw: unsafe extern "C" fn(*const c_void),
    state_save: unsafe extern "C" fn(*const c_char) -> c_int,
    state_save_raw: unsafe extern "C" fn() -> *const c_void,
    state_size: unsafe extern "C" fn() -> usize,
    media_select: unsafe extern "C" fn(),
    media_insert: unsafe extern "C" fn(),
    cheat_clear: unsafe extern "C" fn(),
    cheat_set: unsafe extern "C" fn(*const c_char),
    rehash: unsafe extern "C" fn(),
    data_push: unsafe extern "C" fn(u32, c_int, *const c_void, usize),
    get_coreinfo: unsafe extern "C" fn(*const c_char) -> *mut jg_coreinfo_t,
    get_videoinfo: unsafe extern "C" fn() -> *mut jg_videoinfo_t,
    get_audioinfo: unsafe extern "C" fn() -> *mut jg_audioinfo_t,
    get_inputinfo: unsafe extern "C" fn(c_int) -> *mut jg_inputinfo_t,
    get_settings: unsafe extern "C" fn(*mut usize) -> *mut jg_setting_t,
    setup_video: unsafe extern "C" fn(),
    setup_audio: unsafe extern "C" fn(),
    set_inputstate: unsafe extern "C" fn(*mut jg_inputstate_t, c_int),
    set_gameinfo: unsafe extern "C" fn(jg_fileinfo_t),
    set_paths: unsafe extern "C" fn(jg_pathinfo_t),
    set_cb_audio: unsafe extern "C" fn(jg_cb_audio_t),
    set_cb_frametime: unsafe extern "C" fn(jg_cb_frametime_t),
    set_cb_log: unsafe extern "C" fn(jg_cb_log_t),
    set_cb_rumble: unsafe extern "C" fn(jg_cb_rumble_t),
}

/// A core opened from a shared library at runtime.
pub struct NativeCore {
    path: PathBuf,
    syms: Symbols,
    // Must outlive every pointer in `syms`.
    _lib: Library,
}

macro_rules! resolve {
    ($lib:expr, $path:expr, $name:literal) => {{
        // SAFETY: the signature matches the declaration in jg.h.
        let sym = unsafe { $lib.get(concat!($name, "\0").as_bytes()) }.map_err(|source| {
            Error::MissingSymbol {
                path: $path.to_path_buf(),
                symbol: $name,
                source,
            }
        })?;
        *sym
    }};
}

impl NativeCore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        // SAFETY: loading a core runs its initialisers; the core is trusted.
        let lib = unsafe { Library::new(path) }.map_err(|source| Error::LoadLibrary {
            path: path.to_path_buf(),
            source,
        })?;

        let syms = Symbols {
            init: resolve!(lib, path, "jg_init"),
            deinit: resolve!(lib, path, "jg_deinit"),
            reset: resolve!(lib, path, "jg_reset"),
            exec_frame: resolve!(lib, path, "jg_exec_frame"),
            game_load: resolve!(lib, path, "jg_game_load"),
            game_unload: resolve!(lib, path, "jg_game_unload"),
            state_load: resolve!(lib, path, "jg_state_load"),
            state_load_raw: resolve!(lib, path, "jg_state_load_raw"),
            state_save: resolve!(lib, path, "jg_state_save"),
            state_save_raw: resolve!(lib, path, "jg_state_save_raw"),
            state_size: resolve!(lib, path, "jg_state_size"),
            media_select: resolve!(lib, path, "jg_media_select"),
            media_insert: resolve!(lib, path, "jg_media_insert"),
            cheat_clear: resolve!(lib, path, "jg_cheat_clear"),
            cheat_set: resolve!(lib, path, "jg_cheat_set"),
            rehash: resolve!(lib, path, "jg_rehash"),
            data_push: resolve!(lib, path, "jg_data_push"),
            get_coreinfo: resolve!(lib, path, "jg_get_coreinfo"),
            get_videoinfo: resolve!(lib, path, "jg_get_videoinfo"),
            get_audioinfo: resolve!(lib, path, "jg_get_audioinfo"),
            get_inputinfo: resolve!(lib, path, "jg_get_inputinfo"),
            get_settings: resolve!(lib, path, "jg_get_settings"),
            setup_video: resolve!(lib, path, "jg_setup_video"),
            setup_audio: resolve!(lib, path, "jg_setup_audio"),
            set_inputstate: resolve!(lib, path, "jg_set_inputstate"),
            set_gameinfo: resolve!(lib, path, "jg_set_gameinfo"),
            set_paths: resolve!(lib, path, "jg_set_paths"),
            set_cb_audio: resolve!(lib, path, "jg_set_cb_audio"),
            set_cb_frametime: resolve!(lib, path, "jg_set_cb_frametime"),
            set_cb_log: resolve!(lib, path, "jg_set_cb_log"),
            set_cb_rumble: resolve!(lib, path, "jg_set_cb_rumble"),
        };

        tracing::debug!(path = %path.display(), "core library opened");
        Ok(Self {
            path: path.to_path_buf(),
            syms,
            _lib: lib,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// SAFETY (all methods below): each pointer was resolved from the library held
// in `_lib`, and arguments follow the contract in jg.h.
impl Core for NativeCore {
    fn init(&mut self) -> i32 {
        unsafe { (self.syms.init)() }
    }

    fn deinit(&mut self) {
        unsafe { (self.syms.deinit)() }
    }

    fn reset(&mut self, hard: bool) {
        unsafe { (self.syms.reset)(c_int::from(hard)) }
    }

    fn exec_frame(&mut self) {
        unsafe { (self.syms.exec_frame)() }
    }

    fn game_load(&mut self) -> bool {
        unsafe { (self.syms.game_load)() != 0 }
    }

    fn game_unload(&mut self) -> bool {
        unsafe { (self.syms.game_unload)() != 0 }
    }

    fn state_load(&mut self, path: &CStr) -> i32 {
        unsafe { (self.syms.state_load)(path.as_ptr()) }
    }

    fn state_save(&mut self, path: &CStr) -> i32 {
        unsafe { (self.syms.state_save)(path.as_ptr()) }
    }

    fn state_load_raw(&mut self, data: &[u8]) {
        unsafe { (self.syms.state_load_raw)(data.as_ptr().cast()) }
    }

    fn state_save_raw(&mut self) -> *const c_void {
        unsafe { (self.syms.state_save_raw)() }
    }

    fn state_size(&mut self) -> usize {
        unsafe { (self.syms.state_size)() }
    }

    fn media_select(&mut self) {
        unsafe { (self.syms.media_select)() }
    }

    fn media_insert(&mut self) {
        unsafe { (self.syms.media_insert)() }
    }

    fn cheat_clear(&mut self) {
        unsafe { (self.syms.cheat_clear)() }
    }

    fn cheat_set(&mut self, code: &CStr) {
        unsafe { (self.syms.cheat_set)(code.as_ptr()) }
    }

    fn rehash(&mut self) {
        unsafe { (self.syms.rehash)() }
    }

    fn data_push(&mut self, kind: u32, port: i32, data: &[u8]) {
        unsafe { (self.syms.data_push)(kind, port, data.as_ptr().cast(), data.len()) }
    }

    fn coreinfo(&mut self, sys: &CStr) -> *mut jg_coreinfo_t {
        unsafe { (self.syms.get_coreinfo)(sys.as_ptr()) }
    }

    fn videoinfo(&mut self) -> *mut jg_videoinfo_t {
        unsafe { (self.syms.get_videoinfo)() }
    }

    fn audioinfo(&mut self) -> *mut jg_audioinfo_t {
        unsafe { (self.syms.get_audioinfo)() }
    }

    fn inputinfo(&mut self, port: i32) -> *mut jg_inputinfo_t {
        unsafe { (self.syms.get_inputinfo)(port) }
    }

    fn settings(&mut self) -> (*mut jg_setting_t, usize) {
        let mut len = 0usize;
        let ptr = unsafe { (self.syms.get_settings)(&mut len) };
        (ptr, len)
    }

    fn setup_video(&mut self) {
        unsafe { (self.syms.setup_video)() }
    }

    fn setup_audio(&mut self) {
        unsafe { (self.syms.setup_audio)() }
    }

    fn set_inputstate(&mut self, state: *mut jg_inputstate_t, port: i32) {
        unsafe { (self.syms.set_inputstate)(state, port) }
    }

    fn set_gameinfo(&mut self, info: jg_fileinfo_t) {
        unsafe { (self.syms.set_gameinfo)(info) }
    }

    fn set_paths(&mut self, paths: jg_pathinfo_t) {
        unsafe { (self.syms.set_paths)(paths) }
    }

    fn set_cb_audio(&mut self, cb: jg_cb_audio_t) {
        unsafe { (self.syms.set_cb_audio)(cb) }
    }

    fn set_cb_frametime(&mut self, cb: jg_cb_frametime_t) {
        unsafe { (self.syms.set_cb_frametime)(cb) }
    }

    fn set_cb_log(&mut self, cb: jg_cb_log_t) {
        unsafe { (self.syms.set_cb_log)(cb) }
    }

    fn set_cb_rumble(&mut self, cb: jg_cb_rumble_t) {
        unsafe { (self.syms.set_cb_rumble)(cb) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_library_is_reported() {
        let err = NativeCore::open("/nonexistent/libjg-core.so")
            .err()
            .expect("opening a missing library must fail");
        assert!(matches!(err, Error::LoadLibrary { .. }));
        assert!(err.to_string().contains("/nonexistent/libjg-core.so"));
    }
}
