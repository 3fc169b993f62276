//! 编解码器标识符.

use reel_core::MediaType;
use std::fmt;

/// 编解码器标识符
///
/// 唯一标识一种编解码算法, 与容器格式无关.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecId {
    /// 未知编解码器
    None,

    // ========================
    // 视频编解码器
    // ========================
    /// H.264 / AVC
    H264,
    /// H.265 / HEVC
    H265,
    /// AV1
    Av1,
    /// VP6 (Flash 常用)
    Vp6,
    /// Sorenson H.263 (FLV1)
    Flv1,
    /// Screen Video
    ScreenVideo,

    // ========================
    // 音频编解码器
    // ========================
    /// AAC
    Aac,
    /// MP3
    Mp3,
    /// Speex
    Speex,
    /// Nellymoser
    Nellymoser,
    /// PCM 有符号 16 位小端
    PcmS16le,
    /// G.711 A-law
    PcmAlaw,
    /// G.711 mu-law
    PcmMulaw,
}

impl CodecId {
    /// 所有已知编解码器
    pub const ALL: &[CodecId] = &[
        Self::None,
        Self::H264,
        Self::H265,
        Self::Av1,
        Self::Vp6,
        Self::Flv1,
        Self::ScreenVideo,
        Self::Aac,
        Self::Mp3,
        Self::Speex,
        Self::Nellymoser,
        Self::PcmS16le,
        Self::PcmAlaw,
        Self::PcmMulaw,
    ];

    /// 获取编解码器对应的媒体类型
    pub const fn media_type(&self) -> MediaType {
        match self {
            Self::None => MediaType::Unknown,
            Self::H264 | Self::H265 | Self::Av1 | Self::Vp6 | Self::Flv1 | Self::ScreenVideo => {
                MediaType::Video
            }
            Self::Aac
            | Self::Mp3
            | Self::Speex
            | Self::Nellymoser
            | Self::PcmS16le
            | Self::PcmAlaw
            | Self::PcmMulaw => MediaType::Audio,
        }
    }

    /// 短名称
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::H264 => "h264",
            Self::H265 => "hevc",
            Self::Av1 => "av1",
            Self::Vp6 => "vp6f",
            Self::Flv1 => "flv1",
            Self::ScreenVideo => "flashsv",
            Self::Aac => "aac",
            Self::Mp3 => "mp3",
            Self::Speex => "speex",
            Self::Nellymoser => "nellymoser",
            Self::PcmS16le => "pcm_s16le",
            Self::PcmAlaw => "pcm_alaw",
            Self::PcmMulaw => "pcm_mulaw",
        }
    }

    /// 人类可读的完整名称
    pub const fn long_name(&self) -> &'static str {
        match self {
            Self::None => "unknown codec",
            Self::H264 => "H.264 / AVC / MPEG-4 AVC / MPEG-4 part 10",
            Self::H265 => "H.265 / HEVC (High Efficiency Video Coding)",
            Self::Av1 => "Alliance for Open Media AV1",
            Self::Vp6 => "On2 VP6 (Flash version)",
            Self::Flv1 => "FLV / Sorenson Spark / Sorenson H.263 (Flash Video)",
            Self::ScreenVideo => "Flash Screen Video v1",
            Self::Aac => "AAC (Advanced Audio Coding)",
            Self::Mp3 => "MP3 (MPEG audio layer 3)",
            Self::Speex => "Speex",
            Self::Nellymoser => "Nellymoser Asao",
            Self::PcmS16le => "PCM signed 16-bit little-endian",
            Self::PcmAlaw => "PCM A-law / G.711 A-law",
            Self::PcmMulaw => "PCM mu-law / G.711 mu-law",
        }
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
