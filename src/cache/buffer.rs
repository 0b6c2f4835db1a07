//! 缓存块结构

use std::sync::Arc;

use bitflags::bitflags;

use crate::storage::Storage;
use crate::types::BlockKey;

bitflags! {
    /// 缓存块标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BlockFlags: u8 {
        /// 数据已修改（脏），与存储中的内容可能不同
        const DIRTY       = 0x01;
        /// 最近一次写回失败
        const WRITE_ERROR = 0x02;
    }
}

/// 缓存块
///
/// 数据总是完整驻留的 `block_size` 字节，不存在部分加载的块。
/// 块持有所属存储的引用，驱逐时无需再查找句柄即可写回。
///
/// # 字段说明
///
/// - `key`: 句柄 + 块对齐偏移
/// - `data`: 块数据缓冲区
/// - `flags`: 块状态标志
/// - `owner`: 块数据所属的存储
pub struct CacheBuffer {
    /// 块键
    pub key: BlockKey,

    /// 块数据
    pub data: Vec<u8>,

    /// 块状态标志
    pub flags: BlockFlags,

    /// 所属存储
    pub owner: Arc<dyn Storage>,
}

impl core::fmt::Debug for CacheBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CacheBuffer")
            .field("key", &self.key)
            .field("data_len", &self.data.len())
            .field("flags", &self.flags)
            .finish()
    }
}

impl CacheBuffer {
    /// 用已加载的数据创建干净的缓存块
    pub fn new(key: BlockKey, data: Vec<u8>, owner: Arc<dyn Storage>) -> Self {
        Self {
            key,
            data,
            flags: BlockFlags::empty(),
            owner,
        }
    }

    /// 标记为脏（已修改）
    pub fn mark_dirty(&mut self) {
        self.flags.insert(BlockFlags::DIRTY);
    }

    /// 标记为干净（已写入存储）
    pub fn mark_clean(&mut self) {
        self.flags.remove(BlockFlags::DIRTY | BlockFlags::WRITE_ERROR);
    }

    /// 检查是否是脏块
    pub fn is_dirty(&self) -> bool {
        self.flags.contains(BlockFlags::DIRTY)
    }

    /// 记录写回失败
    pub fn mark_write_error(&mut self) {
        self.flags.insert(BlockFlags::WRITE_ERROR);
    }

    /// 最近一次写回是否失败
    pub fn has_write_error(&self) -> bool {
        self.flags.contains(BlockFlags::WRITE_ERROR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::mock::MockStorage;
    use crate::types::HandleId;

    fn buffer() -> CacheBuffer {
        let owner: Arc<dyn Storage> = Arc::new(MockStorage::filled(0, 4096));
        CacheBuffer::new(BlockKey::new(HandleId(1), 4096), vec![0u8; 4096], owner)
    }

    #[test]
    fn test_buffer_creation() {
        let buf = buffer();
        assert_eq!(buf.key.offset, 4096);
        assert_eq!(buf.data.len(), 4096);
        assert_eq!(buf.flags, BlockFlags::empty());
    }

    #[test]
    fn test_dirty_flag() {
        let mut buf = buffer();

        assert!(!buf.is_dirty());

        buf.mark_dirty();
        assert!(buf.is_dirty());
        assert!(buf.flags.contains(BlockFlags::DIRTY));

        buf.mark_clean();
        assert!(!buf.is_dirty());
    }

    #[test]
    fn test_clean_clears_write_error() {
        let mut buf = buffer();
        buf.mark_dirty();
        buf.mark_write_error();
        assert!(buf.has_write_error());
        assert!(buf.is_dirty());

        buf.mark_clean();
        assert_eq!(buf.flags, BlockFlags::empty());
    }
}
