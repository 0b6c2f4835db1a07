//! 块缓存模块
//!
//! 固定块大小、按块粒度的写回缓存，位于字节流读写接口与底层存储之间。
//!
//! # 主要组件
//!
//! - [`CacheBuffer`] - 单个缓存块，包含数据、状态标志和所属存储
//! - [`BlockCache`] - 块目录，使用 lru crate 提供 LRU 驱逐
//! - [`BlockFlags`] - 缓存块状态标志
//! - [`CacheStats`] - 缓存统计信息
//!
//! # 组成
//!
//! | 组件          | 文件              | 职责                                   |
//! |---------------|-------------------|----------------------------------------|
//! | 块目录        | `block_cache.rs`  | 键索引、LRU 顺序、准入与驱逐、句柄注册 |
//! | 写回协议      | `writeback.rs`    | 单块写回、按句柄同步、全量刷新         |
//! | 范围读写      | `io.rs`           | 把字节范围拆成逐块的段                 |
//!
//! # 使用示例
//!
//! ```rust,ignore
//! use bcache_core::{BlockCache, CacheConfig};
//!
//! let mut cache = BlockCache::new(CacheConfig::default())?;
//! let handle = cache.register(storage);
//!
//! cache.write_at(handle, 0, b"Hello")?;
//!
//! let mut buf = [0u8; 5];
//! cache.read_at(handle, 0, &mut buf)?;
//!
//! // 写回该句柄的所有脏块
//! cache.sync(handle)?;
//! ```
//!
//! # 性能特性
//!
//! - **查找**: O(1) - HashMap 查找（lru crate 内部）
//! - **LRU 驱逐**: O(1) - 直接访问 LRU 链表尾部
//! - **同步**: O(k log n) - k 为该句柄的脏块数量

mod block_cache;
mod buffer;
mod io;
mod writeback;

pub use block_cache::{BlockCache, CacheStats};
pub use buffer::{BlockFlags, CacheBuffer};
pub use io::Segment;
