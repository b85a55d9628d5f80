//! Host side of the JG emulator plugin API: loads a core library, hands it
//! paths, game data and output buffers, and forwards frontend requests.

pub mod audio_subsystem;
pub mod config;
pub mod error;
pub mod ffi;
pub mod game_info;
pub mod input;
pub mod log_driver;
pub mod manager;
pub mod paths;
pub mod plugin;

pub use crate::config::{HostConfig, SettingsFile};
pub use crate::error::{Error, Result};
pub use crate::manager::{JgManager, StateStatus};
pub use crate::plugin::{Core, NativeCore};
