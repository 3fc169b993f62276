//! 流信息定义.
//!
//! 描述容器声明的一条音视频/字幕流. 由容器读取器持有, 调用方只读.

use reel_codec::CodecId;
use reel_core::{MediaType, Rational, Timestamp};
use std::time::Duration;

/// 流信息
#[derive(Debug, Clone)]
pub struct Stream {
    /// 流索引 (在容器中的位置, 从 0 开始)
    pub index: usize,
    /// 媒体类型
    pub media_type: MediaType,
    /// 编解码器标识
    pub codec_id: CodecId,
    /// 时间基
    pub time_base: Rational,
    /// 流时长 (以 time_base 为单位, -1 表示未知)
    pub duration: i64,
    /// 起始时间 (以 time_base 为单位)
    pub start_time: i64,
    /// 编解码器私有数据 (如 AVC sequence header)
    pub extra_data: Vec<u8>,
    /// 流特定参数
    pub params: StreamParams,
    /// 元数据 (标题, 语言等)
    pub metadata: Vec<(String, String)>,
}

impl Stream {
    /// 创建只带基本信息的流
    pub fn new(index: usize, media_type: MediaType, codec_id: CodecId, time_base: Rational) -> Self {
        Self {
            index,
            media_type,
            codec_id,
            time_base,
            duration: -1,
            start_time: 0,
            extra_data: Vec::new(),
            params: StreamParams::Other,
            metadata: Vec::new(),
        }
    }

    /// 流时长, 未知时返回 `None`
    pub fn duration(&self) -> Option<Duration> {
        if self.duration < 0 {
            return None;
        }
        Timestamp::new(self.duration, self.time_base).to_duration()
    }

    /// 语言标签 (来自 `language` 元数据)
    pub fn language(&self) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == "language")
            .map(|(_, v)| v.as_str())
    }

    /// 诊断用的 `'类型/编解码器'` 描述
    pub fn describe(&self) -> String {
        format!("'{}/{}'", self.media_type, self.codec_id)
    }
}

/// 流特定参数
#[derive(Debug, Clone)]
pub enum StreamParams {
    /// 视频流参数
    Video(VideoStreamParams),
    /// 音频流参数
    Audio(AudioStreamParams),
    /// 其他
    Other,
}

/// 视频流参数
#[derive(Debug, Clone)]
pub struct VideoStreamParams {
    /// 宽度 (像素, 0 表示未知)
    pub width: u32,
    /// 高度 (像素, 0 表示未知)
    pub height: u32,
    /// 帧率 (0/1 表示未知)
    pub frame_rate: Rational,
}

/// 音频流参数
#[derive(Debug, Clone)]
pub struct AudioStreamParams {
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 声道数
    pub channels: u32,
}
