//! I/O 抽象层.
//!
//! 为容器读取器提供带缓冲的只读接口, 支持文件与内存两种后端.

use byteorder::{BigEndian, ByteOrder};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use reel_core::{ReelError, ReelResult};

/// I/O 后端 trait
pub trait IoBackend: Send {
    /// 读取数据到缓冲区, 返回 0 表示已无数据
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    /// 定位
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64>;
    /// 获取当前位置
    fn position(&mut self) -> io::Result<u64>;
    /// 获取总大小 (如果可知)
    fn size(&self) -> Option<u64>;
}

/// 默认缓冲区大小 (32 KB)
const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// I/O 上下文
///
/// 封装底层后端, 读到末尾时返回 `ReelError::Eof`.
pub struct IoContext {
    inner: Box<dyn IoBackend>,
    buffer: Vec<u8>,
    /// 缓冲区中的有效数据长度
    buf_len: usize,
    /// 缓冲区当前读取位置
    buf_pos: usize,
}

impl IoContext {
    /// 从 I/O 后端创建上下文
    pub fn new(backend: Box<dyn IoBackend>) -> Self {
        Self {
            inner: backend,
            buffer: vec![0u8; DEFAULT_BUFFER_SIZE],
            buf_len: 0,
            buf_pos: 0,
        }
    }

    /// 以只读方式打开文件
    pub fn open_read(path: impl AsRef<Path>) -> ReelResult<Self> {
        let file = std::fs::File::open(path)?;
        Ok(Self::new(Box::new(FileBackend::new(file))))
    }

    /// 从内存数据创建
    pub fn from_memory(data: Vec<u8>) -> Self {
        Self::new(Box::new(MemoryBackend::from_data(data)))
    }

    /// 读取指定字节数
    pub fn read_exact(&mut self, buf: &mut [u8]) -> ReelResult<()> {
        let mut filled = 0;
        while filled < buf.len() {
            if self.buf_pos == self.buf_len {
                self.buf_pos = 0;
                self.buf_len = self.inner.read(&mut self.buffer)?;
                if self.buf_len == 0 {
                    return Err(ReelError::Eof);
                }
            }
            let n = (self.buf_len - self.buf_pos).min(buf.len() - filled);
            buf[filled..filled + n].copy_from_slice(&self.buffer[self.buf_pos..self.buf_pos + n]);
            self.buf_pos += n;
            filled += n;
        }
        Ok(())
    }

    /// 读取 1 个字节
    pub fn read_u8(&mut self) -> ReelResult<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// 读取 u24 大端
    pub fn read_u24_be(&mut self) -> ReelResult<u32> {
        let mut buf = [0u8; 3];
        self.read_exact(&mut buf)?;
        Ok(BigEndian::read_u24(&buf))
    }

    /// 读取 u32 大端
    pub fn read_u32_be(&mut self) -> ReelResult<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(BigEndian::read_u32(&buf))
    }

    /// 读取指定数量的字节
    pub fn read_bytes(&mut self, count: usize) -> ReelResult<Vec<u8>> {
        let mut buf = vec![0u8; count];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// 跳过指定字节数
    pub fn skip(&mut self, count: usize) -> ReelResult<()> {
        let buffered = self.buf_len - self.buf_pos;
        if count <= buffered {
            self.buf_pos += count;
            return Ok(());
        }
        let remaining = (count - buffered) as i64;
        self.buf_pos = 0;
        self.buf_len = 0;
        self.inner.seek(SeekFrom::Current(remaining))?;
        Ok(())
    }

    /// 定位, 会清空读缓冲区
    pub fn seek(&mut self, pos: SeekFrom) -> ReelResult<u64> {
        let logical = match pos {
            // 当前位置需按缓冲区中尚未消耗的数据修正
            SeekFrom::Current(offset) => SeekFrom::Start(
                (self.position()? as i64)
                    .checked_add(offset)
                    .filter(|p| *p >= 0)
                    .ok_or_else(|| ReelError::InvalidArgument("seek 位置不能为负".into()))?
                    as u64,
            ),
            other => other,
        };
        self.buf_pos = 0;
        self.buf_len = 0;
        Ok(self.inner.seek(logical)?)
    }

    /// 获取当前逻辑位置
    pub fn position(&mut self) -> ReelResult<u64> {
        let raw = self.inner.position()?;
        Ok(raw - (self.buf_len - self.buf_pos) as u64)
    }

    /// 获取总大小
    pub fn size(&self) -> Option<u64> {
        self.inner.size()
    }
}

/// 文件后端
struct FileBackend {
    file: std::fs::File,
    size: Option<u64>,
}

impl FileBackend {
    fn new(file: std::fs::File) -> Self {
        let size = file.metadata().ok().map(|m| m.len());
        Self { file, size }
    }
}

impl IoBackend for FileBackend {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }

    fn position(&mut self) -> io::Result<u64> {
        self.file.stream_position()
    }

    fn size(&self) -> Option<u64> {
        self.size
    }
}

/// 内存后端, 用于测试和内存中处理
pub struct MemoryBackend {
    cursor: io::Cursor<Vec<u8>>,
}

impl MemoryBackend {
    /// 从已有数据创建
    pub fn from_data(data: Vec<u8>) -> Self {
        Self {
            cursor: io::Cursor::new(data),
        }
    }
}

impl IoBackend for MemoryBackend {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor.seek(pos)
    }

    fn position(&mut self) -> io::Result<u64> {
        Ok(self.cursor.position())
    }

    fn size(&self) -> Option<u64> {
        Some(self.cursor.get_ref().len() as u64)
    }
}
