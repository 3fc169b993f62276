//! 已打开的媒体源.
//!
//! `MediaSource` 是解复用器眼中的"容器句柄": 一个已打开的输入,
//! 可以枚举流, 顺序读包, 定位和关闭. `InputContext` 是基于
//! `IoContext` + `ContainerReader` 的默认实现.

use std::path::Path;

use reel_codec::Packet;
use reel_core::{ReelError, ReelResult};

use crate::format_id::FormatId;
use crate::io::IoContext;
use crate::reader::{ContainerReader, SeekRequest};
use crate::registry::FormatRegistry;
use crate::stream::Stream;

/// 已打开的媒体源
pub trait MediaSource: Send {
    /// 格式名称
    fn format_name(&self) -> &str;

    /// 容器声明的所有流
    fn streams(&self) -> &[Stream];

    /// 读取下一个数据包, 耗尽时返回 `ReelError::Eof`
    fn read_packet(&mut self) -> ReelResult<Packet>;

    /// 定位
    fn seek(&mut self, request: &SeekRequest) -> ReelResult<()>;

    /// 容器时长 (秒), `None` 表示未知
    fn duration(&self) -> Option<f64>;

    /// 容器起始时间 (微秒)
    fn start_time(&self) -> Option<i64>;

    /// 是否支持按 PTS 定位
    fn seeks_by_pts(&self) -> bool;

    /// 关闭输入, 之后的读取与定位都会失败
    fn close(&mut self);
}

/// 基于容器读取器的媒体源
pub struct InputContext {
    io: IoContext,
    reader: Box<dyn ContainerReader>,
    closed: bool,
}

impl InputContext {
    /// 打开定位符 (文件路径) 并解析容器头部
    pub fn open(locator: &str, registry: &FormatRegistry) -> ReelResult<Self> {
        let io = IoContext::open_read(locator)
            .map_err(|e| ReelError::Open(format!("{locator}: {e}")))?;
        let filename = Path::new(locator)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(locator);
        Self::from_io(io, registry, Some(filename))
            .map_err(|e| ReelError::Open(format!("{locator}: {e}")))
    }

    /// 基于已有的 I/O 上下文打开
    pub fn from_io(
        mut io: IoContext,
        registry: &FormatRegistry,
        filename: Option<&str>,
    ) -> ReelResult<Self> {
        let reader = registry.open_reader(&mut io, filename)?;
        Ok(Self {
            io,
            reader,
            closed: false,
        })
    }

    /// 格式标识
    pub fn format_id(&self) -> FormatId {
        self.reader.format_id()
    }

    fn ensure_open(&self) -> ReelResult<()> {
        if self.closed {
            return Err(ReelError::InvalidState("输入已关闭".into()));
        }
        Ok(())
    }
}

impl MediaSource for InputContext {
    fn format_name(&self) -> &str {
        self.reader.name()
    }

    fn streams(&self) -> &[Stream] {
        self.reader.streams()
    }

    fn read_packet(&mut self) -> ReelResult<Packet> {
        self.ensure_open()?;
        self.reader.read_packet(&mut self.io)
    }

    fn seek(&mut self, request: &SeekRequest) -> ReelResult<()> {
        self.ensure_open()?;
        self.reader.seek(&mut self.io, request)
    }

    fn duration(&self) -> Option<f64> {
        self.reader.duration()
    }

    fn start_time(&self) -> Option<i64> {
        self.reader.start_time()
    }

    fn seeks_by_pts(&self) -> bool {
        self.reader.seeks_by_pts()
    }

    fn close(&mut self) {
        if !self.closed {
            log::debug!("关闭 {} 输入", self.reader.name());
            self.closed = true;
        }
    }
}
