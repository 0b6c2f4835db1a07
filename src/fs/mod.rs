//! 字节流接口
//!
//! fs/shared.rs 提供显式构造、以 `Arc` 共享的缓存对象；
//! fs/file.rs 提供带读写位置的文件句柄（open/read/write/seek/fsync/close）。

mod file;
mod shared;

pub use file::CachedFile;
pub use shared::SharedCache;
