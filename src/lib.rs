//! bcache_core: 块粒度的写回缓存
//!
//! 位于字节流文件接口（open/read/write/seek/fsync/close）与底层存储之间，
//! 以固定大小的块为单位缓存数据：
//! - **LRU 块目录**：`(句柄, 块对齐偏移)` 为键，满时驱逐最久未使用的块
//! - **写回**：写入只修改缓存并标记为脏，驱逐或显式同步时才写入存储
//! - **范围读写**：任意偏移和长度的读写被拆成逐块的段
//! - **单锁并发**：所有句柄共享一个缓存，由一把全局锁串行化
//!
//! # 示例
//!
//! ```rust,ignore
//! use std::io::SeekFrom;
//! use bcache_core::{CacheConfig, Result, SharedCache};
//!
//! fn main() -> Result<()> {
//!     let cache = SharedCache::new(CacheConfig::default())?;
//!     let mut file = cache.open("data.bin")?;
//!
//!     file.write(b"Hello")?;
//!     file.seek(SeekFrom::Start(0))?;
//!
//!     let mut buf = vec![0u8; 4096];
//!     file.read(&mut buf)?;
//!
//!     file.fsync()?;
//!     file.close()
//! }
//! ```
//!
//! # 模块结构
//!
//! - [`error`] - 错误类型定义
//! - [`consts`] - 常量定义
//! - [`types`] - 句柄、块键与配置
//! - [`storage`] - 底层存储抽象
//! - [`cache`] - 块目录、写回协议与范围读写
//! - [`fs`] - 共享缓存与文件句柄

#![deny(unsafe_code)]
#![warn(missing_docs)]

// ===== 核心模块 =====

/// 错误处理
pub mod error;

/// 常量定义
pub mod consts;

/// 数据结构定义
pub mod types;

/// 底层存储抽象
pub mod storage;

/// 块缓存
pub mod cache;

/// 字节流接口
pub mod fs;

// ===== 公共导出 =====

// 错误处理
pub use error::{Error, ErrorKind, Result};

// 常量
pub use consts::{BLOCK_SIZE, CACHE_CAPACITY};

// 数据结构
pub use types::{BlockKey, CacheConfig, HandleId};

// 存储
pub use storage::{FileStorage, Storage};

// Cache
pub use cache::{BlockCache, BlockFlags, CacheBuffer, CacheStats, Segment};

// 文件接口
pub use fs::{CachedFile, SharedCache};
