//! 压缩数据包 (Packet).
//!
//! 从容器中读出的一个编码数据单元, 属于且仅属于一条流.

use bytes::Bytes;
use reel_core::Rational;
use reel_core::timestamp::NOPTS_VALUE;

/// 压缩数据包
///
/// 刻意不实现 `Clone`: 数据包在读取线程、待分发队列和消费者缓冲区之间
/// 以所有权转移的方式流动, 任一时刻只有一个持有者.
#[derive(Debug)]
pub struct Packet {
    /// 压缩数据
    pub data: Bytes,
    /// 显示时间戳 (PTS)
    pub pts: i64,
    /// 解码时间戳 (DTS)
    pub dts: i64,
    /// 数据包时长 (以 time_base 为单位)
    pub duration: i64,
    /// 时间基
    pub time_base: Rational,
    /// 所属流的索引
    pub stream_index: usize,
    /// 是否为关键帧
    pub is_keyframe: bool,
    /// 在容器中的字节偏移量 (-1 表示未知)
    pub pos: i64,
}

impl Packet {
    /// 创建空数据包
    pub fn empty() -> Self {
        Self {
            data: Bytes::new(),
            pts: NOPTS_VALUE,
            dts: NOPTS_VALUE,
            duration: 0,
            time_base: Rational::UNDEFINED,
            stream_index: 0,
            is_keyframe: false,
            pos: -1,
        }
    }

    /// 从数据创建数据包
    pub fn from_data(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            ..Self::empty()
        }
    }

    /// 创建属于指定流的数据包
    pub fn for_stream(stream_index: usize, data: impl Into<Bytes>) -> Self {
        Self {
            stream_index,
            ..Self::from_data(data)
        }
    }

    /// 数据大小 (字节)
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 是否为空包
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
