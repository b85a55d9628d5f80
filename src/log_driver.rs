use std::ffi::{c_char, c_int};
use std::sync::Mutex;

use crate::ffi::{cstr_lossy, JG_LOG_DBG, JG_LOG_ERR, JG_LOG_INF, JG_LOG_SCR, JG_LOG_WRN};

static SCREEN_MESSAGE: Mutex<Option<String>> = Mutex::new(None);

extern "C" {
    /// Log callback handed to the core. Defined in `csrc/jg_log.c`: formats
    /// the message and forwards it to `jgmanager_log_message`.
    #[link_name = "jgmanager_log"]
    pub fn jg_log(level: c_int, fmt: *const c_char, ...);
}

#[no_mangle]
unsafe extern "C" fn jgmanager_log_message(level: c_int, msg: *const c_char) {
    let text = unsafe { cstr_lossy(msg) };
    log(level, text.trim_end());
}

/// Routes a message at a JG log level to `tracing`. Screen-level messages
/// are also kept for on-screen display.
pub fn log(level: c_int, text: &str) {
    match level {
        JG_LOG_DBG => tracing::debug!(target: "jg", "{text}"),
        JG_LOG_INF => tracing::info!(target: "jg", "{text}"),
        JG_LOG_WRN => tracing::warn!(target: "jg", "{text}"),
        JG_LOG_ERR => tracing::error!(target: "jg", "{text}"),
        JG_LOG_SCR => {
            tracing::info!(target: "jg", screen = true, "{text}");
            if let Ok(mut slot) = SCREEN_MESSAGE.lock() {
                *slot = Some(text.to_owned());
            }
        }
        other => tracing::info!(target: "jg", level = other, "{text}"),
    }
}

pub fn screen(text: &str) {
    log(JG_LOG_SCR, text);
}

/// Takes the most recent screen message, if any.
pub fn take_screen_message() -> Option<String> {
    SCREEN_MESSAGE.lock().ok().and_then(|mut slot| slot.take())
}

#[cfg(test)]
pub(crate) static TEST_LOCK: Mutex<()> = Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn screen_messages_are_kept_until_taken() {
        let _guard = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        take_screen_message();

        log(JG_LOG_INF, "not for the screen");
        assert_eq!(take_screen_message(), None);

        let fmt = CString::new("FDS: Disk %d Side %c\n").unwrap();
        unsafe { jg_log(JG_LOG_SCR, fmt.as_ptr(), 1 as c_int, b'A' as c_int) };
        assert_eq!(
            take_screen_message().as_deref(),
            Some("FDS: Disk 1 Side A")
        );
        assert_eq!(take_screen_message(), None);
    }

    #[test]
    fn core_messages_expand_string_arguments() {
        let _guard = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        take_screen_message();

        let fmt = CString::new("Loaded %s (100%%)").unwrap();
        let name = CString::new("smb.nes").unwrap();
        unsafe { jg_log(JG_LOG_SCR, fmt.as_ptr(), name.as_ptr()) };
        assert_eq!(
            take_screen_message().as_deref(),
            Some("Loaded smb.nes (100%)")
        );
    }
}
