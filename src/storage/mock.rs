//! 测试用内存存储
//!
//! 记录读写次数，可注入读写失败。

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::Storage;
use crate::error::{Error, ErrorKind, Result};

pub(crate) struct MockStorage {
    data: Mutex<Vec<u8>>,
    write_log: Mutex<Vec<u64>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    flushes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    max_transfer: usize,
}

impl MockStorage {
    pub(crate) fn filled(byte: u8, len: usize) -> Self {
        Self {
            data: Mutex::new(vec![byte; len]),
            write_log: Mutex::new(Vec::new()),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            flushes: AtomicUsize::new(0),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            max_transfer: usize::MAX,
        }
    }

    /// 单次读写最多传输的字节数，用于模拟短读短写
    pub(crate) fn with_max_transfer(mut self, max: usize) -> Self {
        self.max_transfer = max;
        self
    }

    pub(crate) fn contents(&self) -> Vec<u8> {
        self.data.lock().clone()
    }

    pub(crate) fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub(crate) fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub(crate) fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    /// 每次写入的起始偏移，按发生顺序
    pub(crate) fn write_offsets(&self) -> Vec<u64> {
        self.write_log.lock().clone()
    }

    pub(crate) fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl Storage for MockStorage {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::new(ErrorKind::Io, "injected read failure"));
        }
        let data = self.data.lock();
        let start = offset as usize;
        if start >= data.len() {
            return Ok(0);
        }
        let n = buf.len().min(data.len() - start).min(self.max_transfer);
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<usize> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::new(ErrorKind::Io, "injected write failure"));
        }
        self.write_log.lock().push(offset);
        let mut data = self.data.lock();
        let start = offset as usize;
        let n = buf.len().min(self.max_transfer);
        if data.len() < start + n {
            data.resize(start + n, 0);
        }
        data[start..start + n].copy_from_slice(&buf[..n]);
        Ok(n)
    }

    fn len_bytes(&self) -> Result<u64> {
        Ok(self.data.lock().len() as u64)
    }

    fn flush(&self) -> Result<()> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
