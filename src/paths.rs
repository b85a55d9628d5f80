use std::ffi::CString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::HostConfig;
use crate::error::{Error, Result};
use crate::ffi::jg_pathinfo_t;

/// Directories handed to the core, plus the frontend-only state and
/// screenshot directories under the same base.
#[derive(Debug)]
pub struct Paths {
    base: PathBuf,
    save: PathBuf,
    core: PathBuf,
    state_ext: String,
    c_base: CString,
    c_save: CString,
    c_core: CString,
}

impl Paths {
    /// Resolves the layout from the process environment and creates it on disk.
    pub fn from_env(config: &HostConfig) -> Result<Self> {
        let cwd = std::env::current_dir().ok();
        let paths = Self::resolve(config, |key| std::env::var(key).ok(), cwd.as_deref())?;
        paths.create_dirs()?;
        Ok(paths)
    }

    /// Computes the layout without touching the filesystem beyond probing for
    /// the core asset marker in `cwd`.
    pub fn resolve<F>(config: &HostConfig, env: F, cwd: Option<&Path>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = match env("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
            Some(xdg) => PathBuf::from(xdg).join(&config.app_name),
            None => {
                let home = env("HOME").filter(|v| !v.is_empty()).ok_or(Error::NoHomeDir)?;
                PathBuf::from(home)
                    .join(".local")
                    .join("share")
                    .join(&config.app_name)
            }
        };
        let save = base.join("save");

        // Running from a source checkout: assets sit next to the binary.
        let core = match cwd {
            Some(dir) if dir.join(&config.asset_marker).exists() => dir.to_path_buf(),
            _ => config.data_dir.clone(),
        };

        Ok(Self {
            c_base: path_to_cstring(&base)?,
            c_save: path_to_cstring(&save)?,
            c_core: path_to_cstring(&core)?,
            base,
            save,
            core,
            state_ext: config.state_ext.clone(),
        })
    }

    pub fn create_dirs(&self) -> Result<()> {
        for dir in [self.save.clone(), self.state_dir(), self.screenshot_dir()] {
            fs::create_dir_all(&dir).map_err(|source| Error::CreateDir { path: dir, source })?;
        }
        Ok(())
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn save(&self) -> &Path {
        &self.save
    }

    pub fn core(&self) -> &Path {
        &self.core
    }

    pub fn state_dir(&self) -> PathBuf {
        self.base.join("state")
    }

    pub fn screenshot_dir(&self) -> PathBuf {
        self.base.join("screenshots")
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("settings.toml")
    }

    /// `<base>/state/<game>_<slot>.<ext>`
    pub fn slot_path(&self, game: &str, slot: i32) -> PathBuf {
        self.state_dir()
            .join(format!("{game}_{slot}.{}", self.state_ext))
    }

    /// Pointers stay valid for as long as `self` is alive.
    pub fn pathinfo(&self) -> jg_pathinfo_t {
        jg_pathinfo_t {
            base: self.c_base.as_ptr(),
            core: self.c_core.as_ptr(),
            user: self.c_base.as_ptr(),
            bios: self.c_base.as_ptr(),
            save: self.c_save.as_ptr(),
        }
    }
}

pub(crate) fn path_to_cstring(path: &Path) -> Result<CString> {
    Ok(CString::new(path.to_string_lossy().into_owned())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::cstr_lossy;

    fn env_of<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn xdg_data_home_wins() {
        let config = HostConfig::default();
        let env = env_of(&[("XDG_DATA_HOME", "/xdg"), ("HOME", "/home/u")]);
        let paths = Paths::resolve(&config, env, None).unwrap();
        assert_eq!(paths.base(), Path::new("/xdg/nestopia"));
        assert_eq!(paths.save(), Path::new("/xdg/nestopia/save"));
    }

    #[test]
    fn falls_back_to_home() {
        let config = HostConfig::default();
        let paths = Paths::resolve(&config, env_of(&[("HOME", "/home/u")]), None).unwrap();
        assert_eq!(paths.base(), Path::new("/home/u/.local/share/nestopia"));
    }

    #[test]
    fn no_home_is_an_error() {
        let err = Paths::resolve(&HostConfig::default(), env_of(&[]), None).unwrap_err();
        assert!(matches!(err, Error::NoHomeDir));
    }

    #[test]
    fn empty_xdg_data_home_falls_back_to_home() {
        let env = env_of(&[("XDG_DATA_HOME", ""), ("HOME", "/home/u")]);
        let paths = Paths::resolve(&HostConfig::default(), env, None).unwrap();
        assert_eq!(paths.base(), Path::new("/home/u/.local/share/nestopia"));
    }

    #[test]
    fn empty_home_is_an_error() {
        let err = Paths::resolve(&HostConfig::default(), env_of(&[("HOME", "")]), None)
            .unwrap_err();
        assert!(matches!(err, Error::NoHomeDir));
    }

    #[test]
    fn core_path_prefers_cwd_with_marker() {
        let config = HostConfig::default();
        let dir = tempfile::tempdir().unwrap();
        let env = env_of(&[("HOME", "/home/u")]);

        let paths = Paths::resolve(&config, &env, Some(dir.path())).unwrap();
        assert_eq!(paths.core(), config.data_dir.as_path());

        fs::write(dir.path().join("NstDatabase.xml"), b"<xml/>").unwrap();
        let paths = Paths::resolve(&config, &env, Some(dir.path())).unwrap();
        assert_eq!(paths.core(), dir.path());
    }

    #[test]
    fn creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let xdg = dir.path().to_string_lossy().into_owned();
        let vars = [("XDG_DATA_HOME", xdg.as_str())];
        let paths = Paths::resolve(&HostConfig::default(), env_of(&vars), None).unwrap();
        paths.create_dirs().unwrap();

        let base = dir.path().join("nestopia");
        assert!(base.join("save").is_dir());
        assert!(base.join("state").is_dir());
        assert!(base.join("screenshots").is_dir());
    }

    #[test]
    fn slot_path_layout() {
        let paths =
            Paths::resolve(&HostConfig::default(), env_of(&[("XDG_DATA_HOME", "/d")]), None)
                .unwrap();
        assert_eq!(
            paths.slot_path("Super Mario Bros", 3),
            Path::new("/d/nestopia/state/Super Mario Bros_3.nst")
        );
    }

    #[test]
    fn pathinfo_shares_base_for_bios_and_user() {
        let paths =
            Paths::resolve(&HostConfig::default(), env_of(&[("XDG_DATA_HOME", "/d")]), None)
                .unwrap();
        let info = paths.pathinfo();
        unsafe {
            assert_eq!(cstr_lossy(info.base), "/d/nestopia");
            assert_eq!(cstr_lossy(info.bios), "/d/nestopia");
            assert_eq!(cstr_lossy(info.user), "/d/nestopia");
            assert_eq!(cstr_lossy(info.save), "/d/nestopia/save");
        }
    }
}
