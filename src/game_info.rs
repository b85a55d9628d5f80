use std::ffi::CString;
use std::path::Path;

use md5::{Digest, Md5};

use crate::error::Result;
use crate::ffi::jg_fileinfo_t;
use crate::paths::path_to_cstring;

/// The ROM currently handed to the core. Owns every buffer that
/// `jg_fileinfo_t` points into.
pub struct GameInfo {
    data: Vec<u8>,
    crc: u32,
    md5: CString,
    path: CString,
    name: String,
    c_name: CString,
    fname: CString,
}

impl GameInfo {
    pub fn new(path: &Path, data: Vec<u8>) -> Result<Self> {
        let crc = crc32fast::hash(&data);
        let digest = Md5::digest(&data);
        let md5: String = digest.iter().map(|b| format!("{b:02x}")).collect();

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let fname = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(GameInfo {
            crc,
            md5: CString::new(md5)?,
            path: path_to_cstring(path)?,
            c_name: CString::new(name.as_str())?,
            name,
            fname: CString::new(fname)?,
            data,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn crc(&self) -> u32 {
        self.crc
    }

    pub fn md5(&self) -> &str {
        self.md5.to_str().unwrap_or_default()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Pointers stay valid while `self` is alive and not moved out of its
    /// heap buffers.
    pub fn build(&mut self) -> jg_fileinfo_t {
        jg_fileinfo_t {
            data: self.data.as_mut_ptr().cast(),
            size: self.data.len(),
            crc: self.crc,
            md5: self.md5.as_ptr(),
            path: self.path.as_ptr(),
            name: self.c_name.as_ptr(),
            fname: self.fname.as_ptr(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::cstr_lossy;

    #[test]
    fn derives_names_and_hashes() {
        let mut info = GameInfo::new(Path::new("/roms/Zelda (U).nes"), b"abc".to_vec()).unwrap();
        assert_eq!(info.name(), "Zelda (U)");
        assert_eq!(info.crc(), 0x3524_41c2);
        assert_eq!(info.md5(), "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(info.size(), 3);

        let raw = info.build();
        assert_eq!(raw.size, 3);
        assert_eq!(raw.crc, 0x3524_41c2);
        unsafe {
            assert_eq!(cstr_lossy(raw.name), "Zelda (U)");
            assert_eq!(cstr_lossy(raw.fname), "Zelda (U).nes");
            assert_eq!(cstr_lossy(raw.path), "/roms/Zelda (U).nes");
            assert_eq!(cstr_lossy(raw.md5), "900150983cd24fb0d6963f7d28e17f72");
        }
    }

    #[test]
    fn empty_rom_hashes() {
        let info = GameInfo::new(Path::new("empty.nes"), Vec::new()).unwrap();
        assert_eq!(info.crc(), 0);
        assert_eq!(info.md5(), "d41d8cd98f00b204e9800998ecf8427e");
    }
}
