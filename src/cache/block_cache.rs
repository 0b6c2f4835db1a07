//! 块目录实现（使用 lru crate）
//!
//! 以 `(句柄, 块对齐偏移)` 为键索引驻留块，维护最近使用顺序并负责准入与驱逐。
//!
//! # 结构
//!
//! ```text
//! struct BlockCache {
//!     cache: LruCache<BlockKey, CacheBuffer>,        // O(1)，自动维护 LRU 顺序
//!     dirty_set: BTreeSet<BlockKey>,                 // 按 (句柄, 偏移) 有序的脏块索引
//!     handles: HashMap<HandleId, Arc<dyn Storage>>,  // 已注册句柄
//!     block_size: usize,
//!     stats: CacheStats,
//! }
//! ```
//!
//! 不变量：
//! - 驻留块数 ≤ 容量（`capacity_bytes / block_size`）
//! - 键在 `dirty_set` 中 当且仅当 对应驻留块带 `DIRTY` 标志
//! - 每个键至多一个驻留块

use std::collections::{BTreeSet, HashMap};
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use super::buffer::CacheBuffer;
use super::writeback::flush_one;
use crate::consts::DIRTY_RATIO_WARN_PERCENT;
use crate::error::{Error, ErrorKind, Result};
use crate::storage::{read_block_at, Storage};
use crate::types::{BlockKey, CacheConfig, HandleId};

/// 缓存统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// 总访问次数
    pub total_accesses: u64,
    /// 缓存命中次数
    pub hits: u64,
    /// 缓存未命中次数（每次未命中都从存储加载一次）
    pub misses: u64,
    /// 驱逐次数
    pub evictions: u64,
    /// 脏块写回次数
    pub writebacks: u64,
    /// 写回失败次数
    pub write_errors: u64,
    /// 当前脏块数量
    pub dirty_blocks: usize,
    /// 当前驻留块数量
    pub resident_blocks: usize,
}

impl CacheStats {
    /// 计算命中率
    pub fn hit_rate(&self) -> f64 {
        if self.total_accesses == 0 {
            0.0
        } else {
            self.hits as f64 / self.total_accesses as f64
        }
    }
}

/// 块缓存
///
/// 单线程的缓存引擎，所有句柄共享同一个目录。并发访问由
/// [`SharedCache`](crate::fs::SharedCache) 的全局锁串行化。
///
/// - `acquire` 命中时把块提升为最近使用
/// - 未命中时先从存储读出整块，再（必要时）驱逐最久未使用的块，最后插入
/// - 驱逐脏块前先写回；写回失败时块仍被移除，调用者收到 `EvictionFailed`
pub struct BlockCache {
    /// LRU缓存核心：管理块的生命周期和访问顺序
    pub(super) cache: LruCache<BlockKey, CacheBuffer>,

    /// 脏块集合：追踪需要写回的块
    pub(super) dirty_set: BTreeSet<BlockKey>,

    /// 已注册的句柄
    handles: HashMap<HandleId, Arc<dyn Storage>>,

    /// 下一个句柄编号
    next_handle: u64,

    /// 块大小（字节）
    block_size: usize,

    /// 统计信息
    pub(super) stats: CacheStats,
}

impl BlockCache {
    /// 创建新的块缓存
    ///
    /// # 参数
    ///
    /// * `config` - 缓存配置，容量向下取整到整块
    ///
    /// # 示例
    ///
    /// ```rust,ignore
    /// let cache = BlockCache::new(CacheConfig::default())?;  // 4096个4KB块 = 16MB缓存
    /// ```
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        let capacity = NonZeroUsize::new(config.max_blocks()).ok_or(Error::new(
            ErrorKind::InvalidInput,
            "Cache capacity must hold at least one block",
        ))?;

        log::debug!(
            "[CACHE] new cache: {} blocks of {} bytes",
            capacity,
            config.block_size
        );

        Ok(Self {
            cache: LruCache::new(capacity),
            dirty_set: BTreeSet::new(),
            handles: HashMap::new(),
            next_handle: 1,
            block_size: config.block_size,
            stats: CacheStats::default(),
        })
    }

    // ===== 句柄注册 =====

    /// 注册存储，分配新的句柄
    pub fn register(&mut self, storage: Arc<dyn Storage>) -> HandleId {
        let handle = HandleId(self.next_handle);
        self.next_handle += 1;
        self.handles.insert(handle, storage);
        log::debug!("[CACHE] registered handle {}", handle);
        handle
    }

    /// 注销句柄并丢弃它的所有驻留块（不写回）
    ///
    /// 返回句柄对应的存储，由调用者负责释放
    pub fn release(&mut self, handle: HandleId) -> Result<Arc<dyn Storage>> {
        let storage = self.handles.remove(&handle).ok_or(Error::new(
            ErrorKind::InvalidHandle,
            "Handle is not registered",
        ))?;
        let dropped = self.invalidate_handle(handle);
        log::debug!(
            "[CACHE] released handle {}, dropped {} blocks",
            handle,
            dropped
        );
        Ok(storage)
    }

    /// 获取句柄对应的存储
    pub fn storage(&self, handle: HandleId) -> Result<&Arc<dyn Storage>> {
        self.handles.get(&handle).ok_or(Error::new(
            ErrorKind::InvalidHandle,
            "Handle is not registered",
        ))
    }

    /// 句柄是否已注册
    pub fn is_registered(&self, handle: HandleId) -> bool {
        self.handles.contains_key(&handle)
    }

    // ===== 块目录 =====

    /// 获取驻留块
    ///
    /// # 参数
    ///
    /// * `handle` - 已注册的句柄
    /// * `block_offset` - 块对齐的字节偏移
    ///
    /// # 返回
    ///
    /// 块的可变引用：
    /// - 如果块已驻留：提升为最近使用并返回
    /// - 如果块不驻留：从存储读取整块（末尾之后补零），满时先驱逐最久未使用的块，再插入
    ///
    /// # 错误
    ///
    /// - `InvalidHandle`: 句柄未注册
    /// - `InvalidInput`: 偏移未按块对齐
    /// - 加载失败：目录保持不变
    /// - `EvictionFailed`: 驱逐写回失败，被驱逐的块已移除，新块不插入
    pub fn acquire(&mut self, handle: HandleId, block_offset: u64) -> Result<&mut CacheBuffer> {
        if block_offset % self.block_size as u64 != 0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Block offset is not aligned to the block size",
            ));
        }
        let owner = Arc::clone(self.storage(handle)?);
        let key = BlockKey::new(handle, block_offset);

        self.stats.total_accesses += 1;

        // get_mut 会自动更新LRU顺序
        if self.cache.contains(&key) {
            self.stats.hits += 1;
            log::trace!("[CACHE] acquire {} HIT", key);
            return self.cache.get_mut(&key).ok_or(Error::new(
                ErrorKind::InvalidState,
                "Resident block vanished during lookup",
            ));
        }

        self.stats.misses += 1;
        log::debug!(
            "[CACHE] acquire {} MISS, cache={}/{}",
            key,
            self.cache.len(),
            self.cache.cap().get()
        );

        // 先读入临时缓冲区：加载失败时目录不变
        let mut data = vec![0u8; self.block_size];
        let loaded = read_block_at(owner.as_ref(), block_offset, &mut data)?;
        if loaded < self.block_size {
            log::trace!(
                "[CACHE] {} short load: {} bytes, zero-filled the rest",
                key,
                loaded
            );
        }

        self.warn_dirty_ratio();

        if self.cache.len() >= self.cache.cap().get() {
            self.evict_lru()?;
        }

        self.cache.put(key, CacheBuffer::new(key, data, owner));
        self.cache.get_mut(&key).ok_or(Error::new(
            ErrorKind::InvalidState,
            "Inserted block vanished from the directory",
        ))
    }

    /// 标记块为脏
    ///
    /// 块不驻留时什么都不做；不改变 LRU 顺序
    pub fn mark_dirty(&mut self, handle: HandleId, block_offset: u64) {
        let key = BlockKey::new(handle, block_offset);
        if let Some(buf) = self.cache.peek_mut(&key) {
            buf.mark_dirty();
            if self.dirty_set.insert(key) {
                log::trace!(
                    "[CACHE] mark_dirty {}, total_dirty={}",
                    key,
                    self.dirty_set.len()
                );
            }
        }
    }

    /// 驱逐最久未使用的块
    ///
    /// 脏块先写回；写回失败时块仍然被移除（不能因拒绝驱逐而让缓存无限增长），
    /// 以 `EvictionFailed` 返回给触发驱逐的调用者。
    fn evict_lru(&mut self) -> Result<()> {
        let Some((key, mut buf)) = self.cache.pop_lru() else {
            return Ok(());
        };
        self.stats.evictions += 1;
        self.dirty_set.remove(&key);

        if !buf.is_dirty() {
            log::debug!("[CACHE] evicted clean block {}", key);
            return Ok(());
        }

        log::debug!("[CACHE] evicting dirty block {}", key);
        flush_one(&mut buf, &mut self.stats).map(|_| ()).map_err(|e| {
            log::error!(
                "[CACHE] write-back of evicted block {} failed, data lost: {}",
                key,
                e
            );
            e.with_kind(
                ErrorKind::EvictionFailed,
                "Write-back of evicted dirty block failed, block dropped",
            )
        })
    }

    /// 脏块比例超过阈值时告警
    fn warn_dirty_ratio(&self) {
        let dirty_ratio = (self.dirty_set.len() * 100) / self.cache.len().max(1);
        if dirty_ratio > DIRTY_RATIO_WARN_PERCENT {
            log::warn!(
                "[CACHE] High dirty ratio: {}/{} ({}%). Consider syncing",
                self.dirty_set.len(),
                self.cache.len(),
                dirty_ratio
            );
        }
    }

    /// 查看驻留块（不改变 LRU 顺序）
    pub fn peek(&self, handle: HandleId, block_offset: u64) -> Option<&CacheBuffer> {
        self.cache.peek(&BlockKey::new(handle, block_offset))
    }

    /// 块是否驻留
    pub fn contains(&self, handle: HandleId, block_offset: u64) -> bool {
        self.cache.contains(&BlockKey::new(handle, block_offset))
    }

    /// 丢弃句柄的所有驻留块（不写回）
    ///
    /// # 返回
    ///
    /// 丢弃的块数量
    pub fn invalidate_handle(&mut self, handle: HandleId) -> usize {
        let keys: Vec<BlockKey> = self
            .cache
            .iter()
            .filter(|(key, _)| key.handle == handle)
            .map(|(key, _)| *key)
            .collect();

        for key in &keys {
            self.cache.pop(key);
            self.dirty_set.remove(key);
        }

        keys.len()
    }

    /// 块大小（字节）
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// 获取缓存统计信息
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.dirty_blocks = self.dirty_set.len();
        stats.resident_blocks = self.cache.len();
        stats
    }

    /// 获取缓存容量（块数）
    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }

    /// 获取当前缓存块数量
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// 检查缓存是否为空
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// 获取脏块数量
    pub fn dirty_count(&self) -> usize {
        self.dirty_set.len()
    }

    /// 获取某句柄的脏块数量
    pub fn dirty_count_of(&self, handle: HandleId) -> usize {
        self.dirty_set
            .range(BlockKey::first_of(handle)..=BlockKey::last_of(handle))
            .count()
    }
}

impl core::fmt::Debug for BlockCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BlockCache")
            .field("capacity", &self.cache.cap())
            .field("len", &self.cache.len())
            .field("dirty_count", &self.dirty_set.len())
            .field("handles", &self.handles.len())
            .field("block_size", &self.block_size)
            .field("stats", &self.stats)
            .finish()
    }
}
