//! 容器读取器 (ContainerReader) trait 定义.
//!
//! 每种容器格式实现一个读取器, 负责解析头部, 顺序读出数据包以及定位.
//!
//! 使用流程:
//! 1. 调用 `open()` 解析头部, 建立流信息
//! 2. 调用 `streams()` 获取流信息
//! 3. 循环调用 `read_packet()` 读取数据包, 直到返回 `ReelError::Eof`
//! 4. 可选: 调用 `seek()` 定位

use reel_codec::Packet;
use reel_core::ReelResult;

use crate::format_id::FormatId;
use crate::io::IoContext;
use crate::stream::Stream;

/// 容器读取器 trait
pub trait ContainerReader: Send {
    /// 格式标识
    fn format_id(&self) -> FormatId;

    /// 格式名称
    fn name(&self) -> &str;

    /// 解析容器头部
    fn open(&mut self, io: &mut IoContext) -> ReelResult<()>;

    /// 所有流信息
    fn streams(&self) -> &[Stream];

    /// 读取下一个数据包
    ///
    /// # 返回
    /// - `Ok(packet)`: 成功读取一个数据包
    /// - `Err(ReelError::Eof)`: 已到达文件末尾
    fn read_packet(&mut self, io: &mut IoContext) -> ReelResult<Packet>;

    /// 定位
    fn seek(&mut self, io: &mut IoContext, request: &SeekRequest) -> ReelResult<()>;

    /// 容器时长 (秒), `None` 表示未知
    fn duration(&self) -> Option<f64>;

    /// 容器起始时间 (微秒), `None` 表示未知
    fn start_time(&self) -> Option<i64> {
        None
    }

    /// 是否支持按显示时间戳 (PTS) 定位, 否则按解码时间戳 (DTS)
    fn seeks_by_pts(&self) -> bool {
        false
    }
}

/// Seek 标志
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekFlags {
    /// 向后 seek (落在目标之前最近的同步点)
    pub backward: bool,
    /// 基于字节位置 seek
    pub byte: bool,
    /// 允许落在任意帧 (不仅是关键帧)
    pub any: bool,
}

impl Default for SeekFlags {
    fn default() -> Self {
        Self {
            backward: true,
            byte: false,
            any: false,
        }
    }
}

/// 定位请求
///
/// `stream_index` 为 `None` 时, 三个时间戳均以微秒为单位;
/// 否则以该流的 time_base 为单位.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekRequest {
    /// 参考流
    pub stream_index: Option<usize>,
    /// 可接受的最小时间戳
    pub min_ts: i64,
    /// 目标时间戳
    pub target_ts: i64,
    /// 可接受的最大时间戳
    pub max_ts: i64,
    /// 标志
    pub flags: SeekFlags,
}

impl SeekRequest {
    /// 以微秒为单位定位, 不限制上下界
    pub fn to_micros(target_ts: i64) -> Self {
        Self {
            stream_index: None,
            min_ts: i64::MIN,
            target_ts,
            max_ts: i64::MAX,
            flags: SeekFlags::default(),
        }
    }
}
