//! Raw mirrors of the JG 1.0 plugin header.
#![allow(non_camel_case_types)]

use std::ffi::{c_char, c_double, c_float, c_int, c_uint, c_void, CStr};

pub const JG_LOG_DBG: c_int = 0;
pub const JG_LOG_INF: c_int = 1;
pub const JG_LOG_WRN: c_int = 2;
pub const JG_LOG_ERR: c_int = 3;
pub const JG_LOG_SCR: c_int = 4;

pub type jg_pixfmt_t = c_uint;
pub const JG_PIXFMT_XRGB8888: jg_pixfmt_t = 0;
pub const JG_PIXFMT_XBGR8888: jg_pixfmt_t = 1;
pub const JG_PIXFMT_RGBX5551: jg_pixfmt_t = 2;
pub const JG_PIXFMT_RGB565: jg_pixfmt_t = 3;

pub type jg_sampfmt_t = c_uint;
pub const JG_SAMPFMT_INT16: jg_sampfmt_t = 0;
pub const JG_SAMPFMT_FLT32: jg_sampfmt_t = 1;

pub type jg_inputtype_t = c_uint;
pub const JG_INPUT_CONTROLLER: jg_inputtype_t = 0;
pub const JG_INPUT_GUN: jg_inputtype_t = 1;
pub const JG_INPUT_KEYBOARD: jg_inputtype_t = 2;
pub const JG_INPUT_POINTER: jg_inputtype_t = 3;
pub const JG_INPUT_SPINNER: jg_inputtype_t = 4;
pub const JG_INPUT_TOUCH: jg_inputtype_t = 5;
pub const JG_INPUT_EXTERNAL: jg_inputtype_t = 6;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct jg_coreinfo_t {
    pub name: *const c_char,
    pub fname: *const c_char,
    pub version: *const c_char,
    pub sys: *const c_char,
    pub numinputs: u32,
    pub hints: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct jg_videoinfo_t {
    pub pixfmt: jg_pixfmt_t,
    pub wmax: c_uint,
    pub hmax: c_uint,
    pub w: c_uint,
    pub h: c_uint,
    pub x: c_uint,
    pub y: c_uint,
    pub p: c_uint,
    pub aspect: c_double,
    pub buf: *mut c_void,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct jg_audioinfo_t {
    pub sampfmt: jg_sampfmt_t,
    pub rate: c_uint,
    pub channels: c_uint,
    pub spf: c_uint,
    pub buf: *mut c_void,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct jg_pathinfo_t {
    pub base: *const c_char,
    pub core: *const c_char,
    pub user: *const c_char,
    pub bios: *const c_char,
    pub save: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct jg_fileinfo_t {
    pub data: *mut c_void,
    pub size: usize,
    pub crc: u32,
    pub md5: *const c_char,
    pub path: *const c_char,
    pub name: *const c_char,
    pub fname: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct jg_inputinfo_t {
    pub type_: jg_inputtype_t,
    pub index: c_int,
    pub name: *const c_char,
    pub fname: *const c_char,
    pub defs: *const *const c_char,
    pub numaxes: c_int,
    pub numbuttons: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct jg_inputstate_t {
    pub axis: *mut i16,
    pub button: *mut u8,
    pub coord: *mut i32,
    pub rel: *mut i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct jg_setting_t {
    pub name: *const c_char,
    pub fname: *const c_char,
    pub opts: *const c_char,
    pub desc: *const c_char,
    pub val: c_uint,
    pub min: c_uint,
    pub max: c_uint,
    pub flags: c_int,
}

pub type jg_cb_audio_t = Option<unsafe extern "C" fn(samples: usize)>;
pub type jg_cb_frametime_t = Option<unsafe extern "C" fn(interval: c_double)>;
pub type jg_cb_log_t = Option<unsafe extern "C" fn(level: c_int, fmt: *const c_char, ...)>;
pub type jg_cb_rumble_t =
    Option<unsafe extern "C" fn(port: c_int, strength: c_float, len: usize) -> c_int>;

/// Copies a nullable C string into an owned `String`, replacing invalid UTF-8.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string.
pub unsafe fn cstr_lossy(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn null_string_is_empty() {
        assert_eq!(unsafe { cstr_lossy(std::ptr::null()) }, "");
    }

    #[test]
    fn copies_c_string() {
        let s = CString::new("nestopia").unwrap();
        assert_eq!(unsafe { cstr_lossy(s.as_ptr()) }, "nestopia");
    }
}
