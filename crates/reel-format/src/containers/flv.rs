//! FLV (Flash Video) 容器读取器.
//!
//! # 文件结构
//! ```text
//! Header (9 bytes): "FLV" | version | flags (bit0=video, bit2=audio) | data_offset (u32 BE)
//! PreviousTagSize0 (u32 BE) = 0
//! Tag: type (8=audio, 9=video, 18=script) | data_size (u24) | timestamp (u24 + u8 扩展位)
//!      | stream_id (u24, 恒为 0) | data
//! PreviousTagSize (u32 BE)
//! ...
//! ```
//!
//! 音频与视频 Tag 在文件中交错出现, 时间戳以毫秒为单位 (DTS).
//! AVC/HEVC/AV1 的 sequence header 作为 extradata 保存, 不产生数据包.

use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;
use log::{debug, trace};
use reel_codec::{CodecId, Packet};
use reel_core::{MediaType, Rational, ReelError, ReelResult, Timestamp};
use std::io::SeekFrom;

use crate::format_id::FormatId;
use crate::io::IoContext;
use crate::probe::{FormatProbe, ProbeScore, SCORE_EXTENSION, SCORE_MAX};
use crate::reader::{ContainerReader, SeekRequest};
use crate::stream::{AudioStreamParams, Stream, StreamParams, VideoStreamParams};

const TAG_AUDIO: u8 = 8;
const TAG_VIDEO: u8 = 9;
const TAG_SCRIPT: u8 = 18;

/// Tag 头部长度
const TAG_HEADER_SIZE: u32 = 11;

/// 打开时最多预读的 Tag 数
const MAX_PROBE_TAGS: usize = 32;

const VIDEO_FRAME_KEY: u8 = 1;
const VIDEO_CODEC_AVC: u8 = 7;
const VIDEO_CODEC_HEVC: u8 = 12;
const VIDEO_CODEC_AV1: u8 = 13;

const AUDIO_FORMAT_AAC: u8 = 10;

/// FLV Tag 头部
#[derive(Debug, Clone, Copy)]
struct TagHeader {
    kind: u8,
    data_size: u32,
    /// 毫秒
    timestamp: u32,
    /// Tag 起始字节偏移
    pos: u64,
}

/// 同步点: 可以从这里开始解码的 Tag
#[derive(Debug, Clone, Copy)]
struct SyncPoint {
    pos: u64,
    timestamp_ms: i64,
}

/// FLV 读取器
pub struct FlvReader {
    streams: Vec<Stream>,
    audio_index: Option<usize>,
    video_index: Option<usize>,
    /// 来自 onMetaData 的时长 (秒)
    duration_secs: Option<f64>,
    /// 第一个 Tag 的字节偏移
    first_tag_pos: u64,
    /// 第一个媒体 Tag 的时间戳 (毫秒)
    first_timestamp: Option<u32>,
    /// 同步点索引, 首次 seek 时建立
    sync_points: Option<Vec<SyncPoint>>,
}

impl FlvReader {
    /// 工厂函数
    pub fn create() -> ReelResult<Box<dyn ContainerReader>> {
        Ok(Box::new(Self::new()))
    }

    fn new() -> Self {
        Self {
            streams: Vec::new(),
            audio_index: None,
            video_index: None,
            duration_secs: None,
            first_tag_pos: 0,
            first_timestamp: None,
            sync_points: None,
        }
    }

    fn read_file_header(&mut self, io: &mut IoContext) -> ReelResult<()> {
        let signature = io.read_bytes(3)?;
        if signature != b"FLV" {
            return Err(ReelError::InvalidData("不是 FLV 文件".into()));
        }
        let version = io.read_u8()?;
        let flags = io.read_u8()?;
        let data_offset = io.read_u32_be()?;
        debug!("FLV: version={version} flags=0x{flags:02X} data_offset={data_offset}");

        // 数据区之后紧跟 PreviousTagSize0
        self.first_tag_pos = u64::from(data_offset) + 4;
        io.seek(SeekFrom::Start(self.first_tag_pos))?;
        Ok(())
    }

    fn read_tag_header(io: &mut IoContext) -> ReelResult<TagHeader> {
        let pos = io.position()?;
        let kind = io.read_u8()?;
        let data_size = io.read_u24_be()?;
        let low = io.read_u24_be()?;
        let extended = io.read_u8()?;
        let _stream_id = io.read_u24_be()?;
        Ok(TagHeader {
            kind,
            data_size,
            timestamp: (u32::from(extended) << 24) | low,
            pos,
        })
    }

    /// 跳过 Tag 剩余数据与 PreviousTagSize
    fn finish_tag(io: &mut IoContext, remaining: u32) -> ReelResult<()> {
        io.skip(remaining as usize + 4)
    }

    fn ensure_audio_stream(&mut self, header_byte: u8) -> usize {
        if let Some(idx) = self.audio_index {
            return idx;
        }
        let sound_format = header_byte >> 4;
        let codec_id = match sound_format {
            0 | 3 => CodecId::PcmS16le,
            2 | 14 => CodecId::Mp3,
            4..=6 => CodecId::Nellymoser,
            7 => CodecId::PcmAlaw,
            8 => CodecId::PcmMulaw,
            AUDIO_FORMAT_AAC => CodecId::Aac,
            11 => CodecId::Speex,
            _ => CodecId::None,
        };
        let sample_rate = match (header_byte >> 2) & 0x03 {
            0 => 5512,
            1 => 11025,
            2 => 22050,
            _ => 44100,
        };
        let idx = self.streams.len();
        let mut stream = Stream::new(idx, MediaType::Audio, codec_id, Rational::MILLI);
        stream.params = StreamParams::Audio(AudioStreamParams {
            sample_rate,
            channels: if header_byte & 0x01 == 1 { 2 } else { 1 },
        });
        debug!("FLV: 发现音频流 #{idx} ({codec_id})");
        self.streams.push(stream);
        self.audio_index = Some(idx);
        idx
    }

    fn ensure_video_stream(&mut self, header_byte: u8) -> usize {
        if let Some(idx) = self.video_index {
            return idx;
        }
        let codec_id = match header_byte & 0x0F {
            2 => CodecId::Flv1,
            3 => CodecId::ScreenVideo,
            4 | 5 => CodecId::Vp6,
            VIDEO_CODEC_AVC => CodecId::H264,
            VIDEO_CODEC_HEVC => CodecId::H265,
            VIDEO_CODEC_AV1 => CodecId::Av1,
            _ => CodecId::None,
        };
        let idx = self.streams.len();
        let mut stream = Stream::new(idx, MediaType::Video, codec_id, Rational::MILLI);
        stream.params = StreamParams::Video(VideoStreamParams {
            width: 0,
            height: 0,
            frame_rate: Rational::new(0, 1),
        });
        debug!("FLV: 发现视频流 #{idx} ({codec_id})");
        self.streams.push(stream);
        self.video_index = Some(idx);
        idx
    }

    fn read_audio_tag(&mut self, io: &mut IoContext, tag: &TagHeader) -> ReelResult<Option<Packet>> {
        if tag.data_size == 0 {
            Self::finish_tag(io, 0)?;
            return Ok(None);
        }
        let header_byte = io.read_u8()?;
        let index = self.ensure_audio_stream(header_byte);
        let mut remaining = tag.data_size - 1;

        if header_byte >> 4 == AUDIO_FORMAT_AAC {
            if remaining == 0 {
                Self::finish_tag(io, 0)?;
                return Ok(None);
            }
            let aac_packet_type = io.read_u8()?;
            remaining -= 1;
            if aac_packet_type == 0 {
                // AudioSpecificConfig
                self.streams[index].extra_data = io.read_bytes(remaining as usize)?;
                Self::finish_tag(io, 0)?;
                return Ok(None);
            }
        }

        let data = io.read_bytes(remaining as usize)?;
        Self::finish_tag(io, 0)?;
        let ts = i64::from(tag.timestamp);
        Ok(Some(self.make_packet(index, data, ts, ts, true, tag.pos)))
    }

    fn read_video_tag(&mut self, io: &mut IoContext, tag: &TagHeader) -> ReelResult<Option<Packet>> {
        if tag.data_size == 0 {
            Self::finish_tag(io, 0)?;
            return Ok(None);
        }
        let header_byte = io.read_u8()?;
        let index = self.ensure_video_stream(header_byte);
        let is_keyframe = header_byte >> 4 == VIDEO_FRAME_KEY;
        let mut remaining = tag.data_size - 1;
        let dts = i64::from(tag.timestamp);
        let mut pts = dts;

        if matches!(
            header_byte & 0x0F,
            VIDEO_CODEC_AVC | VIDEO_CODEC_HEVC | VIDEO_CODEC_AV1
        ) {
            if remaining < 4 {
                Self::finish_tag(io, remaining)?;
                return Ok(None);
            }
            let packet_type = io.read_u8()?;
            // 有符号 24 位 composition time offset
            let raw_cts = io.read_u24_be()?;
            let cts = ((raw_cts << 8) as i32) >> 8;
            remaining -= 4;
            match packet_type {
                0 => {
                    self.streams[index].extra_data = io.read_bytes(remaining as usize)?;
                    Self::finish_tag(io, 0)?;
                    return Ok(None);
                }
                2 => {
                    // End of sequence
                    Self::finish_tag(io, remaining)?;
                    return Ok(None);
                }
                _ => pts = dts + i64::from(cts),
            }
        }

        let data = io.read_bytes(remaining as usize)?;
        Self::finish_tag(io, 0)?;
        Ok(Some(self.make_packet(index, data, pts, dts, is_keyframe, tag.pos)))
    }

    fn make_packet(
        &mut self,
        stream_index: usize,
        data: Vec<u8>,
        pts: i64,
        dts: i64,
        is_keyframe: bool,
        pos: u64,
    ) -> Packet {
        if self.first_timestamp.is_none() {
            self.first_timestamp = Some(dts as u32);
        }
        let mut pkt = Packet::for_stream(stream_index, Bytes::from(data));
        pkt.pts = pts;
        pkt.dts = dts;
        pkt.time_base = Rational::MILLI;
        pkt.is_keyframe = is_keyframe;
        pkt.pos = pos as i64;
        pkt
    }

    /// 解析 onMetaData (AMF0), 只提取数值字段
    fn read_script_tag(&mut self, io: &mut IoContext, tag: &TagHeader) -> ReelResult<()> {
        let data = io.read_bytes(tag.data_size as usize)?;
        Self::finish_tag(io, 0)?;

        if let Some(duration) = amf_number(&data, b"duration").filter(|d| *d > 0.0) {
            debug!("FLV: onMetaData duration={duration}s");
            self.duration_secs = Some(duration);
            let duration_ms = (duration * 1000.0) as i64;
            for stream in &mut self.streams {
                stream.duration = duration_ms;
            }
        }

        if let Some(idx) = self.video_index {
            if let StreamParams::Video(ref mut params) = self.streams[idx].params {
                if let Some(w) = amf_number(&data, b"width") {
                    params.width = w as u32;
                }
                if let Some(h) = amf_number(&data, b"height") {
                    params.height = h as u32;
                }
                if let Some(fps) = amf_number(&data, b"framerate") {
                    params.frame_rate = Rational::new((fps * 1000.0).round() as i32, 1000);
                }
            }
        }
        Ok(())
    }

    /// 读取一个 Tag, 非媒体 Tag 返回 `None`
    fn read_tag(&mut self, io: &mut IoContext) -> ReelResult<Option<Packet>> {
        let tag = Self::read_tag_header(io)?;
        match tag.kind {
            TAG_AUDIO => self.read_audio_tag(io, &tag),
            TAG_VIDEO => self.read_video_tag(io, &tag),
            TAG_SCRIPT => self.read_script_tag(io, &tag).map(|_| None),
            other => {
                trace!("FLV: 跳过未知 Tag 类型 {other}");
                Self::finish_tag(io, tag.data_size)?;
                Ok(None)
            }
        }
    }

    /// 扫描所有 Tag, 建立同步点索引
    ///
    /// 有视频流时只有视频关键帧是同步点, 否则每个音频 Tag 都是.
    fn build_sync_points(&self, io: &mut IoContext) -> ReelResult<Vec<SyncPoint>> {
        let has_video = self.video_index.is_some();
        let mut points = Vec::new();
        io.seek(SeekFrom::Start(self.first_tag_pos))?;
        loop {
            let tag = match Self::read_tag_header(io) {
                Ok(tag) => tag,
                Err(ReelError::Eof) => break,
                Err(e) => return Err(e),
            };
            let mut consumed = 0;
            let is_sync = match tag.kind {
                TAG_VIDEO if tag.data_size > 0 => {
                    consumed = 1;
                    match io.read_u8() {
                        Ok(flags) => flags >> 4 == VIDEO_FRAME_KEY,
                        Err(ReelError::Eof) => break,
                        Err(e) => return Err(e),
                    }
                }
                TAG_AUDIO => !has_video,
                _ => false,
            };
            if is_sync {
                points.push(SyncPoint {
                    pos: tag.pos,
                    timestamp_ms: i64::from(tag.timestamp),
                });
            }
            match Self::finish_tag(io, tag.data_size - consumed) {
                Ok(()) => {}
                Err(ReelError::Eof) => break,
                Err(e) => return Err(e),
            }
        }
        debug!("FLV: 建立 {} 个同步点", points.len());
        Ok(points)
    }

    /// 把请求中的时间戳换算为毫秒
    fn to_millis(&self, request: &SeekRequest, value: i64) -> ReelResult<i64> {
        if value == i64::MIN || value == i64::MAX {
            return Ok(value);
        }
        let time_base = match request.stream_index {
            Some(idx) => {
                self.streams
                    .get(idx)
                    .ok_or(ReelError::StreamNotFound(idx))?
                    .time_base
            }
            None => Rational::MICRO,
        };
        Timestamp::new(value, time_base)
            .rescale(Rational::MILLI)
            .map(|ts| ts.pts)
            .ok_or_else(|| ReelError::Seek(format!("无法换算时间戳 {value}")))
    }
}

impl ContainerReader for FlvReader {
    fn format_id(&self) -> FormatId {
        FormatId::Flv
    }

    fn name(&self) -> &str {
        "flv"
    }

    fn open(&mut self, io: &mut IoContext) -> ReelResult<()> {
        self.read_file_header(io)?;

        // 预读若干 Tag 以建立流信息
        for _ in 0..MAX_PROBE_TAGS {
            match self.read_tag(io) {
                Ok(_) => {}
                Err(ReelError::Eof) => break,
                Err(e) => return Err(e),
            }
            if self.audio_index.is_some() && self.video_index.is_some() {
                break;
            }
        }
        if self.streams.is_empty() {
            return Err(ReelError::InvalidData("FLV: 未找到音频或视频流".into()));
        }

        io.seek(SeekFrom::Start(self.first_tag_pos))?;
        debug!("FLV: 打开完成, {} 个流", self.streams.len());
        Ok(())
    }

    fn streams(&self) -> &[Stream] {
        &self.streams
    }

    fn read_packet(&mut self, io: &mut IoContext) -> ReelResult<Packet> {
        loop {
            if let Some(pkt) = self.read_tag(io)? {
                return Ok(pkt);
            }
        }
    }

    fn seek(&mut self, io: &mut IoContext, request: &SeekRequest) -> ReelResult<()> {
        if request.flags.byte {
            let pos = u64::try_from(request.target_ts)
                .map_err(|_| ReelError::Seek("字节位置不能为负".into()))?;
            io.seek(SeekFrom::Start(pos.max(self.first_tag_pos)))?;
            return Ok(());
        }

        let target = self.to_millis(request, request.target_ts)?;
        let min = self.to_millis(request, request.min_ts)?;
        let max = self.to_millis(request, request.max_ts)?;

        let before_first = self
            .first_timestamp
            .is_some_and(|ms| target <= i64::from(ms));
        if request.flags.backward && before_first {
            debug!("FLV: seek 目标 {target}ms 不晚于首个 Tag, 回到数据区开头");
            io.seek(SeekFrom::Start(self.first_tag_pos))?;
            return Ok(());
        }

        let points = match self.sync_points.take() {
            Some(points) => points,
            None => self.build_sync_points(io)?,
        };

        let rewind = request.flags.backward
            && points.first().is_none_or(|p| target <= p.timestamp_ms);
        if rewind {
            self.sync_points = Some(points);
            debug!("FLV: seek 目标 {target}ms 不晚于首个同步点, 回到数据区开头");
            io.seek(SeekFrom::Start(self.first_tag_pos))?;
            return Ok(());
        }

        let chosen = if request.flags.backward {
            points
                .iter()
                .rev()
                .find(|p| p.timestamp_ms <= target)
                .or(points.first())
        } else {
            points.iter().find(|p| p.timestamp_ms >= target)
        }
        .copied();
        self.sync_points = Some(points);

        let pos = match chosen {
            Some(point) if point.timestamp_ms < min || point.timestamp_ms > max => {
                return Err(ReelError::Seek(format!(
                    "同步点 {}ms 不在 [{min}, {max}] 范围内",
                    point.timestamp_ms
                )));
            }
            Some(point) => point.pos,
            // 没有同步点 (如空文件): 回到数据区开头
            None if request.flags.backward => self.first_tag_pos,
            None => return Err(ReelError::Seek(format!("{target}ms 之后没有同步点"))),
        };
        debug!("FLV: seek 目标 {target}ms -> 字节偏移 {pos}");
        io.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    fn duration(&self) -> Option<f64> {
        self.duration_secs
    }

    fn start_time(&self) -> Option<i64> {
        self.first_timestamp.map(|ms| i64::from(ms) * 1000)
    }
}

/// 在 AMF0 数据中查找 `key` 后紧跟的 Number 值
fn amf_number(data: &[u8], key: &[u8]) -> Option<f64> {
    let pos = data.windows(key.len()).position(|w| w == key)?;
    let value = data.get(pos + key.len()..pos + key.len() + 9)?;
    if value[0] != 0x00 {
        return None;
    }
    let number = BigEndian::read_f64(&value[1..]);
    number.is_finite().then_some(number)
}

/// FLV 格式探测器
pub struct FlvProbe;

impl FormatProbe for FlvProbe {
    fn probe(&self, data: &[u8], filename: Option<&str>) -> Option<ProbeScore> {
        if data.len() >= 9 && data.starts_with(b"FLV") && data[3] == 1 {
            return Some(SCORE_MAX);
        }
        filename
            .and_then(FormatId::from_filename)
            .filter(|id| *id == FormatId::Flv)
            .map(|_| SCORE_EXTENSION)
    }

    fn format_id(&self) -> FormatId {
        FormatId::Flv
    }
}
