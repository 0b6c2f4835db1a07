//! 共享缓存
//!
//! 进程内所有打开的句柄共享同一个 [`BlockCache`]，由一把全局互斥锁保护。

use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::file::CachedFile;
use crate::cache::{BlockCache, CacheStats};
use crate::error::Result;
use crate::storage::{FileStorage, Storage};
use crate::types::CacheConfig;

/// 共享块缓存
///
/// 显式构造、以 `Arc` 共享给所有句柄；没有隐式的全局单例，
/// 测试可以各自使用独立的缓存实例。
///
/// # 并发
///
/// 所有目录与写回操作（包括未命中加载和写回时的存储 I/O）都在同一把锁内完成，
/// 每次 `read`/`write`/`fsync`/`close` 调用在整个调用期间持有锁。
/// 这把全部缓存流量串行化，同一时刻至多一个存储 I/O 在进行。
///
/// # 示例
///
/// ```rust,ignore
/// let cache = SharedCache::new(CacheConfig::default())?;
/// let mut file = cache.open("data.bin")?;
/// file.write(b"Hello")?;
/// file.fsync()?;
/// file.close()?;
/// ```
pub struct SharedCache {
    inner: Mutex<BlockCache>,
    config: CacheConfig,
}

impl SharedCache {
    /// 创建共享缓存
    pub fn new(config: CacheConfig) -> Result<Arc<Self>> {
        let cache = BlockCache::new(config)?;
        Ok(Arc::new(Self {
            inner: Mutex::new(cache),
            config,
        }))
    }

    /// 使用默认配置（4 KiB 块，16 MiB 容量）创建共享缓存
    pub fn with_default_config() -> Result<Arc<Self>> {
        Self::new(CacheConfig::default())
    }

    /// 以读写方式打开已存在的文件
    ///
    /// # 错误
    ///
    /// 文件不存在或无法打开时返回 `OpenFailed`
    pub fn open(self: &Arc<Self>, path: impl AsRef<Path>) -> Result<CachedFile> {
        let storage = FileStorage::open(path)?;
        log::debug!("[FILE] opened {}", storage.path().display());
        self.attach(Arc::new(storage))
    }

    /// 在任意存储上打开句柄
    pub fn attach(self: &Arc<Self>, storage: Arc<dyn Storage>) -> Result<CachedFile> {
        let len = storage.len_bytes()?;
        let handle = self.lock().register(Arc::clone(&storage));
        Ok(CachedFile::new(Arc::clone(self), handle, storage, len))
    }

    /// 获取全局缓存锁
    ///
    /// 持有期间所有句柄的读写都会阻塞
    pub fn lock(&self) -> MutexGuard<'_, BlockCache> {
        self.inner.lock()
    }

    /// 缓存配置
    pub fn config(&self) -> CacheConfig {
        self.config
    }

    /// 获取缓存统计信息
    pub fn stats(&self) -> CacheStats {
        self.lock().stats()
    }

    /// 写回所有句柄的所有脏块
    ///
    /// 用于显式拆除缓存前的全量刷新；返回写回的块数量
    pub fn flush_all(&self) -> Result<usize> {
        self.lock().flush_all()
    }
}

impl core::fmt::Debug for SharedCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SharedCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
