//! 字节范围读写
//!
//! 把任意偏移、任意长度的读写拆成逐块的段，每段通过 [`BlockCache::acquire`] 取得驻留块，
//! 再与调用者缓冲区互相拷贝。

use super::block_cache::BlockCache;
use crate::error::{Error, ErrorKind, Result};
use crate::types::HandleId;

/// 单个块内的一段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// 所在块的起始偏移
    pub block_offset: u64,
    /// 段在块内的起始位置
    pub start: usize,
    /// 段长度
    pub len: usize,
}

impl Segment {
    /// 定位从 `pos` 开始、剩余 `remaining` 字节的第一段
    ///
    /// `start = pos % block_size`，`len = min(remaining, block_size - start)`
    pub fn locate(pos: u64, remaining: usize, block_size: usize) -> Self {
        let start = (pos % block_size as u64) as usize;
        Self {
            block_offset: pos - start as u64,
            start,
            len: remaining.min(block_size - start),
        }
    }

    fn range(&self) -> core::ops::Range<usize> {
        self.start..self.start + self.len
    }
}

impl BlockCache {
    /// 从 `offset` 读取 `buf.len()` 字节
    ///
    /// 末尾之后的字节读出为 0（块加载时补零）。
    ///
    /// # 返回
    ///
    /// 实际拷贝的字节数。第一段就遇到存储错误时返回错误；
    /// 加载失败发生在已有进度之后时返回已拷贝的字节数。
    /// 驱逐写回失败（`EvictionFailed`）总是返回错误，不论已有多少进度
    pub fn read_at(&mut self, handle: HandleId, offset: u64, buf: &mut [u8]) -> Result<usize> {
        check_range(offset, buf.len())?;

        let mut done = 0;
        while done < buf.len() {
            let seg = Segment::locate(offset + done as u64, buf.len() - done, self.block_size());
            let block = match self.acquire(handle, seg.block_offset) {
                Ok(block) => block,
                Err(e) => return partial(done, e, "read"),
            };
            buf[done..done + seg.len].copy_from_slice(&block.data[seg.range()]);
            log::trace!("[IO] read {:?} of {}", seg, handle);
            done += seg.len;
        }
        Ok(done)
    }

    /// 向 `offset` 写入 `buf`
    ///
    /// 每段拷贝进块后标记为脏；块中未被覆盖的字节保持原内容。
    ///
    /// # 返回
    ///
    /// 实际写入缓存的字节数，错误语义同 [`read_at`](Self::read_at)
    pub fn write_at(&mut self, handle: HandleId, offset: u64, buf: &[u8]) -> Result<usize> {
        check_range(offset, buf.len())?;

        let mut done = 0;
        while done < buf.len() {
            let seg = Segment::locate(offset + done as u64, buf.len() - done, self.block_size());
            let block = match self.acquire(handle, seg.block_offset) {
                Ok(block) => block,
                Err(e) => return partial(done, e, "write"),
            };
            block.data[seg.range()].copy_from_slice(&buf[done..done + seg.len]);
            self.mark_dirty(handle, seg.block_offset);
            log::trace!("[IO] wrote {:?} of {}", seg, handle);
            done += seg.len;
        }
        Ok(done)
    }
}

fn check_range(offset: u64, len: usize) -> Result<()> {
    offset.checked_add(len as u64).map(|_| ()).ok_or(Error::new(
        ErrorKind::InvalidInput,
        "Byte range overflows the storage offset space",
    ))
}

/// 段级错误：没有进度时返回错误，否则保留已完成的部分
///
/// 驱逐写回失败意味着某个脏块的修改已经丢失，可能正是本次调用写入的前几段，
/// 不能折算成短计数。
fn partial(done: usize, err: Error, op: &str) -> Result<usize> {
    if done == 0 || err.kind() == ErrorKind::EvictionFailed {
        return Err(err);
    }
    log::warn!("[IO] {} stopped after {} bytes: {}", op, done, err);
    Ok(done)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::mock::MockStorage;
    use crate::types::CacheConfig;

    const BS: usize = 4096;

    fn setup(max_blocks: usize, fill: u8) -> (BlockCache, Arc<MockStorage>, HandleId) {
        let config = CacheConfig::default().with_max_blocks(max_blocks);
        let mut cache = BlockCache::new(config).unwrap();
        let storage = Arc::new(MockStorage::filled(fill, 16 * BS));
        let handle = cache.register(storage.clone());
        (cache, storage, handle)
    }

    #[test]
    fn test_segment_locate() {
        assert_eq!(
            Segment::locate(0, 10, BS),
            Segment { block_offset: 0, start: 0, len: 10 }
        );
        assert_eq!(
            Segment::locate(4090, 100, BS),
            Segment { block_offset: 0, start: 4090, len: 6 }
        );
        assert_eq!(
            Segment::locate(8192 + 1, 20000, BS),
            Segment { block_offset: 8192, start: 1, len: 4095 }
        );
        assert_eq!(Segment::locate(4096, 4096, BS).len, 4096);
    }

    #[test]
    fn test_round_trip_misaligned() {
        let (mut cache, _, h) = setup(8, b'A');
        let data: Vec<u8> = (0..3 * BS + 17).map(|i| (i % 251) as u8).collect();

        for offset in [0u64, 1, 4095, 4096, 5000] {
            assert_eq!(cache.write_at(h, offset, &data).unwrap(), data.len());
            let mut out = vec![0u8; data.len()];
            assert_eq!(cache.read_at(h, offset, &mut out).unwrap(), data.len());
            assert_eq!(out, data);
        }
    }

    #[test]
    fn test_zero_length() {
        let (mut cache, storage, h) = setup(8, b'A');
        assert_eq!(cache.read_at(h, 100, &mut [0u8; 0]).unwrap(), 0);
        assert_eq!(cache.write_at(h, 100, &[]).unwrap(), 0);
        assert_eq!(storage.read_count(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_partial_write_preserves_neighbors() {
        let (mut cache, _, h) = setup(8, b'X');

        cache.write_at(h, 2000, b"0123456789").unwrap();

        let mut out = vec![0u8; BS];
        cache.read_at(h, 0, &mut out).unwrap();
        assert!(out[..2000].iter().all(|&b| b == b'X'));
        assert_eq!(&out[2000..2010], b"0123456789");
        assert!(out[2010..].iter().all(|&b| b == b'X'));
    }

    #[test]
    fn test_write_marks_only_touched_blocks_dirty() {
        let (mut cache, _, h) = setup(8, b'A');
        cache.read_at(h, 0, &mut vec![0u8; 3 * BS]).unwrap();

        // 跨越块1和块2的边界
        cache.write_at(h, 2 * BS as u64 - 2, b"abcd").unwrap();
        assert!(!cache.peek(h, 0).unwrap().is_dirty());
        assert!(cache.peek(h, BS as u64).unwrap().is_dirty());
        assert!(cache.peek(h, 2 * BS as u64).unwrap().is_dirty());
        assert_eq!(cache.dirty_count(), 2);
    }

    #[test]
    fn test_dirty_block_survives_eviction() {
        let max = 4;
        let (mut cache, storage, h) = setup(max, b'A');

        cache.write_at(h, 10, b"fresh").unwrap();
        for i in 1..=max {
            cache.read_at(h, (i * BS) as u64, &mut [0u8; 1]).unwrap();
        }
        assert!(!cache.contains(h, 0));

        let mut out = [0u8; 5];
        cache.read_at(h, 10, &mut out).unwrap();
        assert_eq!(&out, b"fresh");
        assert_eq!(&storage.contents()[10..15], b"fresh");
    }

    #[test]
    fn test_error_on_first_segment() {
        let (mut cache, storage, h) = setup(8, b'A');
        storage.set_fail_reads(true);

        let err = cache.read_at(h, 0, &mut [0u8; 10]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        let err = cache.write_at(h, 0, b"abc").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(cache.dirty_count(), 0);
    }

    #[test]
    fn test_error_after_progress_returns_partial_count() {
        let (mut cache, storage, h) = setup(8, b'A');
        cache.read_at(h, 0, &mut [0u8; 1]).unwrap();
        storage.set_fail_reads(true);

        // 块0命中，块1加载失败
        let mut out = vec![0u8; 2 * BS];
        assert_eq!(cache.read_at(h, 100, &mut out).unwrap(), BS - 100);
        assert!(out[..BS - 100].iter().all(|&b| b == b'A'));

        let data = vec![b'w'; 2 * BS];
        assert_eq!(cache.write_at(h, 0, &data).unwrap(), BS);
        assert_eq!(cache.dirty_count(), 1);
    }

    #[test]
    fn test_write_evicting_own_segment_fails() {
        let (mut cache, storage, h) = setup(1, b'A');
        storage.set_fail_writes(true);

        // 第二段的准入驱逐第一段刚写入的脏块，写回失败
        let err = cache.write_at(h, 0, &[b'w'; 2 * BS]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EvictionFailed);
        assert_eq!(cache.stats().write_errors, 1);
        assert_eq!(cache.dirty_count(), 0);

        storage.set_fail_writes(false);
        let mut out = [0u8; 1];
        cache.read_at(h, 0, &mut out).unwrap();
        assert_eq!(out[0], b'A');
    }

    #[test]
    fn test_read_evicting_other_handle_fails() {
        let (mut cache, storage, h1) = setup(2, b'A');
        let other = Arc::new(MockStorage::filled(b'B', 4 * BS));
        let h2 = cache.register(other);

        cache.write_at(h1, 0, b"dirty").unwrap();
        storage.set_fail_writes(true);

        // 块0准入时缓存未满；块1准入时驱逐 h1 的脏块
        let mut out = vec![0u8; 2 * BS];
        let err = cache.read_at(h2, 0, &mut out).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EvictionFailed);
        assert!(out[..BS].iter().all(|&b| b == b'B'));
        assert!(!cache.contains(h1, 0));
        assert!(!cache.contains(h2, BS as u64));
    }

    #[test]
    fn test_overflowing_range_rejected() {
        let (mut cache, _, h) = setup(8, b'A');
        let err = cache.read_at(h, u64::MAX - 2, &mut [0u8; 10]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
