// Dump loading: memory-map the file and validate it as UTF-8 once.
// The mapping lives as long as the `DumpText` and is released when it drops.

use crate::logger;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

pub struct DumpText {
    mmap: Option<Mmap>,
}

impl DumpText {
    pub fn open(path: &Path) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        logger::debug(&format!("DumpText: Opening file {}", path.display()));
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        // Zero-length files cannot be mapped on every platform.
        let mmap = if len > 0 {
            unsafe { Some(Mmap::map(&file)?) }
        } else {
            None
        };
        let dump = Self { mmap };
        std::str::from_utf8(dump.bytes())
            .map_err(|e| format!("{} is not valid UTF-8: {}", path.display(), e))?;
        logger::debug(&format!("DumpText: mapped {} bytes", len));
        Ok(dump)
    }

    fn bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }

    pub fn as_str(&self) -> &str {
        // SAFETY: `open` validated these bytes as UTF-8 and the map is read-only.
        unsafe { std::str::from_utf8_unchecked(self.bytes()) }
    }

    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
