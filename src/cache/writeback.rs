//! 写回协议
//!
//! 驱逐触发的写回和显式同步共用 [`flush_one`]，保证两条路径在存储上的效果一致。
//! 同步采用尽力而为的方式：每个脏块都会尝试写回，返回遇到的第一个错误，
//! 写回失败的块保持为脏，由下一次同步或驱逐重试。

use super::block_cache::{BlockCache, CacheStats};
use super::buffer::CacheBuffer;
use crate::error::Result;
use crate::storage::write_block_at;
use crate::types::{BlockKey, HandleId};

/// 写回单个块
///
/// 块不脏时什么都不做。成功后清除脏标志；失败时保留脏标志、记录 `WRITE_ERROR`，
/// 错误原样返回。
///
/// # 返回
///
/// 是否发生了物理写入
pub(crate) fn flush_one(buf: &mut CacheBuffer, stats: &mut CacheStats) -> Result<bool> {
    if !buf.is_dirty() {
        return Ok(false);
    }

    match write_block_at(buf.owner.as_ref(), buf.key.offset, &buf.data) {
        Ok(()) => {
            buf.mark_clean();
            stats.writebacks += 1;
            log::trace!("[WRITEBACK] flushed {}", buf.key);
            Ok(true)
        }
        Err(e) => {
            buf.mark_write_error();
            stats.write_errors += 1;
            log::error!("[WRITEBACK] flush of {} failed: {}", buf.key, e);
            Err(e)
        }
    }
}

impl BlockCache {
    /// 写回某句柄的所有脏块
    ///
    /// 不驱逐、不改变 LRU 顺序。
    ///
    /// # 返回
    ///
    /// 成功返回写回的块数量；有块写回失败时返回第一个错误（其余块仍会尝试）
    pub fn sync(&mut self, handle: HandleId) -> Result<usize> {
        self.storage(handle)?;

        let keys: Vec<BlockKey> = self
            .dirty_set
            .range(BlockKey::first_of(handle)..=BlockKey::last_of(handle))
            .copied()
            .collect();

        let flushed = self.flush_keys(&keys)?;
        log::debug!("[WRITEBACK] sync {}: {} blocks written", handle, flushed);
        Ok(flushed)
    }

    /// 写回所有句柄的所有脏块
    pub fn flush_all(&mut self) -> Result<usize> {
        let keys: Vec<BlockKey> = self.dirty_set.iter().copied().collect();

        log::debug!("[WRITEBACK] flushing {} dirty blocks", keys.len());
        self.flush_keys(&keys)
    }

    /// 关闭句柄：写回脏块、丢弃驻留块、注销句柄并刷新底层存储
    ///
    /// 即使写回失败，句柄也会被注销；返回第一个错误
    pub fn close(&mut self, handle: HandleId) -> Result<()> {
        let synced = self.sync(handle);
        let storage = self.release(handle)?;
        let flushed = storage.flush();

        synced?;
        flushed
    }

    fn flush_keys(&mut self, keys: &[BlockKey]) -> Result<usize> {
        let mut flushed = 0;
        let mut first_err = None;

        for key in keys {
            let Some(buf) = self.cache.peek_mut(key) else {
                self.dirty_set.remove(key);
                continue;
            };
            match flush_one(buf, &mut self.stats) {
                Ok(written) => {
                    self.dirty_set.remove(key);
                    if written {
                        flushed += 1;
                    }
                }
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(flushed),
        }
    }
}
