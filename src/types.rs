//! 缓存数据结构定义
//!
//! 句柄标识、块键以及缓存配置。

use core::fmt;

use crate::consts::{BLOCK_SIZE, CACHE_CAPACITY, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE};
use crate::error::{Error, ErrorKind, Result};

/// 已注册存储句柄的标识
///
/// 由 [`BlockCache`](crate::cache::BlockCache) 分配，单调递增且不复用，
/// 因此已关闭句柄的块永远不会与新句柄的块冲突。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandleId(pub u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

/// 缓存块键：句柄 + 块对齐的字节偏移
///
/// 先按句柄、再按偏移排序，同一句柄的块在有序集合中是连续的一段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockKey {
    /// 所属句柄
    pub handle: HandleId,
    /// 块对齐的字节偏移
    pub offset: u64,
}

impl BlockKey {
    /// 创建块键
    pub const fn new(handle: HandleId, offset: u64) -> Self {
        Self { handle, offset }
    }

    /// 某句柄的最小键
    pub const fn first_of(handle: HandleId) -> Self {
        Self::new(handle, 0)
    }

    /// 某句柄的最大键
    pub const fn last_of(handle: HandleId) -> Self {
        Self::new(handle, u64::MAX)
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:#x}", self.handle, self.offset)
    }
}

/// 缓存配置
///
/// 在构造缓存时固定，运行期间不可调整。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// 块大小（字节）
    pub block_size: usize,
    /// 缓存总容量（字节），向下取整到整块
    pub capacity_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            block_size: BLOCK_SIZE,
            capacity_bytes: CACHE_CAPACITY,
        }
    }
}

impl CacheConfig {
    /// 设置块大小
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// 设置缓存容量（字节）
    pub fn with_capacity_bytes(mut self, capacity_bytes: usize) -> Self {
        self.capacity_bytes = capacity_bytes;
        self
    }

    /// 按块数设置缓存容量
    pub fn with_max_blocks(mut self, blocks: usize) -> Self {
        self.capacity_bytes = blocks.saturating_mul(self.block_size);
        self
    }

    /// 缓存可容纳的块数
    pub fn max_blocks(&self) -> usize {
        if self.block_size == 0 {
            0
        } else {
            self.capacity_bytes / self.block_size
        }
    }

    /// 校验配置
    ///
    /// 块大小必须是 `MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE` 内的 2 的幂，
    /// 容量至少容纳一个块。
    pub fn validate(&self) -> Result<()> {
        if !self.block_size.is_power_of_two()
            || !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&self.block_size)
        {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Block size must be a power of two between 512 and 65536",
            ));
        }
        if self.max_blocks() == 0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Cache capacity must hold at least one block",
            ));
        }
        Ok(())
    }
}
