//! 文件存储
//!
//! 基于 `std::fs::File` 的 [`Storage`] 实现。

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use super::Storage;
use crate::error::{Error, ErrorKind, Result};

/// 文件存储
///
/// 使用定位读写（unix 上为 `pread`/`pwrite`），多个线程可共享同一个实例，
/// 不需要维护共享的文件指针。
#[derive(Debug)]
pub struct FileStorage {
    file: File,
    path: PathBuf,
}

impl FileStorage {
    /// 以读写方式打开已存在的文件
    ///
    /// 文件不存在或无权限时返回 `OpenFailed`，不会创建新文件。
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| {
                log::debug!("[FILE] open {} failed: {}", path.display(), e);
                Error::from_io(ErrorKind::OpenFailed, "Failed to open storage file", &e)
            })?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// 文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Storage for FileStorage {
    #[cfg(unix)]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        use std::os::unix::fs::FileExt;
        Ok(self.file.read_at(buf, offset)?)
    }

    #[cfg(windows)]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        use std::os::windows::fs::FileExt;
        Ok(self.file.seek_read(buf, offset)?)
    }

    #[cfg(unix)]
    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<usize> {
        use std::os::unix::fs::FileExt;
        Ok(self.file.write_at(buf, offset)?)
    }

    #[cfg(windows)]
    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<usize> {
        use std::os::windows::fs::FileExt;
        Ok(self.file.seek_write(buf, offset)?)
    }

    fn len_bytes(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn flush(&self) -> Result<()> {
        Ok(self.file.sync_data()?)
    }
}
