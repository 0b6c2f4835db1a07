//! 存储核心类型

use crate::error::{Error, ErrorKind, Result};

/// 存储接口
///
/// 实现此 trait 以提供底层定位读写。缓存只通过这里访问存储，
/// 所有方法都带显式偏移，不存在共享的读写位置，因此实现必须是 `Send + Sync`。
///
/// # 示例
///
/// ```rust,ignore
/// use bcache_core::{Result, Storage};
///
/// struct MyStorage {
///     // ...
/// }
///
/// impl Storage for MyStorage {
///     fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
///         // 实现定位读取
///         Ok(buf.len())
///     }
///
///     fn write_at(&self, offset: u64, buf: &[u8]) -> Result<usize> {
///         // 实现定位写入
///         Ok(buf.len())
///     }
///
///     fn len_bytes(&self) -> Result<u64> {
///         Ok(0)
///     }
/// }
/// ```
pub trait Storage: Send + Sync {
    /// 从 `offset` 读取最多 `buf.len()` 字节
    ///
    /// # 返回
    ///
    /// 实际读取的字节数；到达末尾时返回 0
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// 向 `offset` 写入最多 `buf.len()` 字节
    ///
    /// # 返回
    ///
    /// 实际写入的字节数
    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<usize>;

    /// 存储当前长度（字节）
    fn len_bytes(&self) -> Result<u64>;

    /// 将已写入的数据刷到稳定存储
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// 读取一个完整的块
///
/// 短读会继续重试直到填满 `buf` 或遇到末尾，末尾之后的字节补零。
///
/// # 返回
///
/// 从存储中实际读到的字节数（其余为补零）
pub fn read_block_at(storage: &dyn Storage, offset: u64, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = storage.read_at(offset + filled as u64, &mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf[filled..].fill(0);
    Ok(filled)
}

/// 写入一个完整的块
///
/// 短写会继续重试；存储一个字节都不接受时返回 `Io` 错误。
pub fn write_block_at(storage: &dyn Storage, offset: u64, buf: &[u8]) -> Result<()> {
    let mut written = 0;
    while written < buf.len() {
        let n = storage.write_at(offset + written as u64, &buf[written..])?;
        if n == 0 {
            return Err(Error::new(
                ErrorKind::Io,
                "Storage accepted zero bytes during block write",
            ));
        }
        written += n;
    }
    Ok(())
}
