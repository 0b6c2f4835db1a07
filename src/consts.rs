//! 块缓存常量定义

//=============================================================================
// 块大小
//=============================================================================

/// 默认块大小（4096 字节）
pub const BLOCK_SIZE: usize = 4096;

/// 最小块大小（512 字节，一个扇区）
pub const MIN_BLOCK_SIZE: usize = 512;

/// 最大块大小（65536 字节）
pub const MAX_BLOCK_SIZE: usize = 65536;

//=============================================================================
// 缓存容量
//=============================================================================

/// 默认缓存容量（16 MiB）
pub const CACHE_CAPACITY: usize = 16 * 1024 * 1024;

/// 默认缓存块数量（`CACHE_CAPACITY / BLOCK_SIZE`）
pub const DEFAULT_MAX_BLOCKS: usize = CACHE_CAPACITY / BLOCK_SIZE;

/// 准入时脏块比例告警阈值（百分比）
pub const DIRTY_RATIO_WARN_PERCENT: usize = 80;
