//! 错误类型定义
//!
//! 提供块缓存操作的错误类型。

use core::fmt;
use std::io;

/// 块缓存操作错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: &'static str,
    io_kind: Option<io::ErrorKind>,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// 打开底层存储失败
    OpenFailed,
    /// I/O 错误（读、写、刷新）
    Io,
    /// 驱逐时写回脏块失败，块已被丢弃，其中的修改丢失
    EvictionFailed,
    /// 句柄未注册或已关闭
    InvalidHandle,
    /// 无效参数
    InvalidInput,
    /// 无效状态（内部一致性错误）
    InvalidState,
}

impl Error {
    /// 创建新错误
    pub const fn new(kind: ErrorKind, message: &'static str) -> Self {
        Self {
            kind,
            message,
            io_kind: None,
        }
    }

    /// 从底层 I/O 错误创建，保留其 `io::ErrorKind`
    pub fn from_io(kind: ErrorKind, message: &'static str, cause: &io::Error) -> Self {
        Self {
            kind,
            message,
            io_kind: Some(cause.kind()),
        }
    }

    /// 换成新的类别和消息，保留底层 `io::ErrorKind`
    pub const fn with_kind(self, kind: ErrorKind, message: &'static str) -> Self {
        Self {
            kind,
            message,
            io_kind: self.io_kind,
        }
    }

    /// 获取错误类型
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// 获取错误消息
    pub const fn message(&self) -> &'static str {
        self.message
    }

    /// 底层操作系统错误的类别（如果有）
    pub const fn io_kind(&self) -> Option<io::ErrorKind> {
        self.io_kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.io_kind {
            Some(io_kind) => write!(f, "{:?}: {} ({:?})", self.kind, self.message, io_kind),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::from_io(ErrorKind::Io, "storage I/O failed", &err)
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        let kind = match (err.kind, err.io_kind) {
            (_, Some(io_kind)) => io_kind,
            (ErrorKind::InvalidInput, None) => io::ErrorKind::InvalidInput,
            (ErrorKind::OpenFailed, None) => io::ErrorKind::NotFound,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

/// Result 类型别名
pub type Result<T> = core::result::Result<T, Error>;
