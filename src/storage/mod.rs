//! 底层存储抽象
//!
//! storage/device.rs 定义缓存所依赖的定位读写接口，以及整块读写的辅助函数。
//! storage/file.rs 提供基于 `std::fs::File` 的实现（pread/pwrite 语义，不依赖共享的文件指针）。

mod device;
mod file;

#[cfg(test)]
pub(crate) mod mock;

pub use device::{read_block_at, write_block_at, Storage};
pub use file::FileStorage;
