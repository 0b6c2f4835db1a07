//! 文件句柄

use std::io::{self, SeekFrom};
use std::sync::Arc;

use super::shared::SharedCache;
use crate::error::{Error, ErrorKind, Result};
use crate::storage::Storage;
use crate::types::HandleId;

/// 文件句柄
///
/// 表示一个通过共享缓存打开的存储，持有字节流位置。读写都经过缓存，
/// 修改在驱逐、`fsync` 或 `close` 时才写回存储。
///
/// # 文件长度
///
/// 句柄维护逻辑长度：打开时取存储长度，写入超过末尾时增长。
/// 读取在逻辑长度处截断，位于或超过末尾的读取返回 0。
/// 写回总是写整块，因此末尾不满一块的数据落盘后文件会被补零到块边界。
pub struct CachedFile {
    /// 共享缓存
    cache: Arc<SharedCache>,
    /// 缓存中注册的句柄
    handle: HandleId,
    /// 底层存储
    storage: Arc<dyn Storage>,
    /// 当前位置
    pos: u64,
    /// 逻辑长度
    len: u64,
    /// 是否已关闭
    closed: bool,
}

impl CachedFile {
    pub(super) fn new(
        cache: Arc<SharedCache>,
        handle: HandleId,
        storage: Arc<dyn Storage>,
        len: u64,
    ) -> Self {
        Self {
            cache,
            handle,
            storage,
            pos: 0,
            len,
            closed: false,
        }
    }

    /// 缓存中的句柄标识
    pub fn handle(&self) -> HandleId {
        self.handle
    }

    /// 获取当前位置
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// 逻辑长度（字节）
    pub fn len(&self) -> u64 {
        self.len
    }

    /// 逻辑长度是否为 0
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 从当前位置读取
    ///
    /// # 返回
    ///
    /// 实际读取的字节数；到达末尾时返回 0。存储错误发生在已有进度之后时，
    /// 返回已读取的部分
    ///
    /// # 示例
    ///
    /// ```rust,ignore
    /// let mut buf = vec![0u8; 4096];
    /// let n = file.read(&mut buf)?;
    /// ```
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let available = self.len.saturating_sub(self.pos);
        let want = (buf.len() as u64).min(available) as usize;
        if want == 0 {
            return Ok(0);
        }

        let n = self
            .cache
            .lock()
            .read_at(self.handle, self.pos, &mut buf[..want])?;
        self.pos += n as u64;
        Ok(n)
    }

    /// 在当前位置写入
    ///
    /// # 返回
    ///
    /// 实际写入缓存的字节数。返回错误时位置不变
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let n = self.cache.lock().write_at(self.handle, self.pos, buf)?;
        self.pos += n as u64;
        self.len = self.len.max(self.pos);
        Ok(n)
    }

    /// 移动位置
    ///
    /// 允许移动到末尾之后；之后的写入会扩展文件
    ///
    /// # 错误
    ///
    /// 结果为负或溢出时返回 `InvalidInput`
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
            SeekFrom::End(delta) => self.len.checked_add_signed(delta),
        };
        self.pos = new_pos.ok_or(Error::new(
            ErrorKind::InvalidInput,
            "Seek to a negative or overflowing position",
        ))?;
        Ok(self.pos)
    }

    /// 写回该句柄的所有脏块并刷新底层存储，不关闭句柄
    ///
    /// 部分块写回失败时仍会刷新底层存储，返回第一个错误
    pub fn fsync(&mut self) -> Result<()> {
        let synced = self.cache.lock().sync(self.handle);
        let flushed = self.storage.flush();

        let written = synced?;
        log::debug!("[FILE] fsync {}: {} blocks", self.handle, written);
        flushed
    }

    /// 关闭句柄
    ///
    /// 先写回所有脏块，再释放句柄；写回失败时句柄同样被释放，返回第一个错误
    pub fn close(mut self) -> Result<()> {
        self.close_inner()
    }

    fn close_inner(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        log::debug!("[FILE] closing {}", self.handle);
        self.cache.lock().close(self.handle)
    }
}

impl Drop for CachedFile {
    fn drop(&mut self) {
        if let Err(e) = self.close_inner() {
            log::error!("[FILE] implicit close of {} failed: {}", self.handle, e);
        }
    }
}

impl core::fmt::Debug for CachedFile {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CachedFile")
            .field("handle", &self.handle)
            .field("pos", &self.pos)
            .field("len", &self.len)
            .field("closed", &self.closed)
            .finish()
    }
}

impl io::Read for CachedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(CachedFile::read(self, buf)?)
    }
}

impl io::Write for CachedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(CachedFile::write(self, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.fsync()?)
    }
}

impl io::Seek for CachedFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(CachedFile::seek(self, pos)?)
    }
}
