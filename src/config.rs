use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ffi::jg_setting_t;

/// Fixed conventions of the frontend the core is hosted in.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Directory name under the XDG data home.
    pub app_name: String,
    /// File whose presence in the working directory marks a source checkout.
    pub asset_marker: String,
    /// Installed core asset directory.
    pub data_dir: PathBuf,
    /// System identifier passed to `jg_get_coreinfo`.
    pub system: String,
    /// Extension for numbered state slots.
    pub state_ext: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            app_name: "nestopia".into(),
            asset_marker: "NstDatabase.xml".into(),
            data_dir: PathBuf::from("/usr/share/nestopia"),
            system: "nes".into(),
            state_ext: "nst".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendConfig {
    pub scale: u32,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self { scale: 3 }
    }
}

/// Persistent settings, stored as TOML under the base directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsFile {
    pub frontend: FrontendConfig,
    /// Core setting values keyed by setting name.
    pub core: BTreeMap<String, u32>,
}

impl SettingsFile {
    /// Reads `path`; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(Error::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&text).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text).map_err(|source| Error::ConfigWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes stored values into the core's settings, clamped to each
    /// setting's range. Returns how many settings were changed.
    pub fn apply(&self, settings: &mut [jg_setting_t]) -> usize {
        let mut changed = 0;
        for (name, &value) in &self.core {
            let Some(setting) = settings
                .iter_mut()
                .find(|s| unsafe { crate::ffi::cstr_lossy(s.name) } == *name)
            else {
                tracing::warn!(setting = %name, "ignoring unknown core setting");
                continue;
            };
            let clamped = value.clamp(setting.min, setting.max.max(setting.min));
            if clamped != value {
                tracing::warn!(setting = %name, value, clamped, "setting out of range");
            }
            if setting.val != clamped {
                setting.val = clamped;
                changed += 1;
            }
        }
        changed
    }

    /// Replaces stored core values with the core's current ones.
    pub fn capture(&mut self, settings: &[jg_setting_t]) {
        self.core = settings
            .iter()
            .filter(|s| !s.name.is_null())
            .map(|s| (unsafe { crate::ffi::cstr_lossy(s.name) }, s.val))
            .collect();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::ffi::CString;

    pub(crate) fn setting(name: &CString, val: u32, min: u32, max: u32) -> jg_setting_t {
        jg_setting_t {
            name: name.as_ptr(),
            fname: std::ptr::null(),
            opts: std::ptr::null(),
            desc: std::ptr::null(),
            val,
            min,
            max,
            flags: 0,
        }
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = SettingsFile::load(&dir.path().join("settings.toml")).unwrap();
        assert_eq!(file.frontend.scale, 3);
        assert!(file.core.is_empty());
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let mut file = SettingsFile::default();
        file.core.insert("palette".into(), 2);
        file.frontend.scale = 4;
        file.save(&path).unwrap();

        let loaded = SettingsFile::load(&path).unwrap();
        assert_eq!(loaded.core.get("palette"), Some(&2));
        assert_eq!(loaded.frontend.scale, 4);
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "core = 5").unwrap();
        assert!(matches!(
            SettingsFile::load(&path),
            Err(Error::ConfigParse { .. })
        ));
    }

    #[test]
    fn apply_clamps_and_skips_unknown() {
        let palette = CString::new("palette").unwrap();
        let overscan = CString::new("overscan_t").unwrap();
        let mut settings = [setting(&palette, 0, 0, 3), setting(&overscan, 8, 0, 16)];

        let mut file = SettingsFile::default();
        file.core.insert("palette".into(), 9);
        file.core.insert("overscan_t".into(), 8);
        file.core.insert("nonexistent".into(), 1);

        assert_eq!(file.apply(&mut settings), 1);
        assert_eq!(settings[0].val, 3);
        assert_eq!(settings[1].val, 8);
    }

    #[test]
    fn capture_reads_current_values() {
        let palette = CString::new("palette").unwrap();
        let settings = [setting(&palette, 2, 0, 3)];
        let mut file = SettingsFile::default();
        file.capture(&settings);
        assert_eq!(file.core.get("palette"), Some(&2));
    }
}
