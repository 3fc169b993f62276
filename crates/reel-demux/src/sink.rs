//! 流消费者 (StreamSink).
//!
//! 每条可消费的流对应一个 `StreamSink`, 由解复用器独占持有.
//! 调用方通过流标识操作消费者, 不需要知道其具体类型.

use std::collections::VecDeque;
use std::time::Duration;

use reel_codec::{CodecId, CodecRegistry, Packet};
use reel_core::{MediaType, ReelError, ReelResult};
use reel_format::Stream;

use crate::config::DemuxerConfig;

/// 流消费者能力接口
pub trait StreamSink: Send {
    /// 流标识
    fn stream_index(&self) -> usize;

    /// 媒体类型
    fn media_type(&self) -> MediaType;

    /// 编解码器
    fn codec_id(&self) -> CodecId;

    /// 语言标签
    fn language(&self) -> Option<&str> {
        None
    }

    /// 流自身报告的时长
    fn duration(&self) -> Option<Duration> {
        None
    }

    /// 拉取信号: 内部缓冲不足时返回 true
    fn needs_more_data(&self) -> bool;

    /// 是否接收该数据包 (通常是流标识相等)
    fn accepts(&self, packet: &Packet) -> bool {
        packet.stream_index == self.stream_index()
    }

    /// 被动消费者: 无论是谁发起读取, 属于它的数据包都立即交付
    fn is_passive(&self) -> bool {
        false
    }

    /// 接管数据包
    fn push(&mut self, packet: Packet);

    /// 取出最早缓冲的数据包
    fn pop(&mut self) -> Option<Packet>;

    /// 内部缓冲的数据包数量
    fn buffered(&self) -> usize;

    /// 丢弃内部缓冲, 返回丢弃的数量
    fn flush(&mut self) -> usize;

    /// 成为该媒体类型的选中流
    fn connect(&mut self);

    /// 取消选中
    fn disconnect(&mut self);

    /// 是否为选中流
    fn is_connected(&self) -> bool;
}

/// 视频流消费者
///
/// 按容器顺序缓冲压缩数据包, 等待外部解码器取走.
pub struct VideoSink {
    stream_index: usize,
    codec_id: CodecId,
    language: Option<String>,
    duration: Option<Duration>,
    capacity: usize,
    buffer: VecDeque<Packet>,
    connected: bool,
}

impl VideoSink {
    /// 为一条视频流创建消费者
    pub fn new(stream: &Stream, capacity: usize) -> Self {
        Self {
            stream_index: stream.index,
            codec_id: stream.codec_id,
            language: stream.language().map(str::to_string),
            duration: stream.duration(),
            capacity: capacity.max(1),
            buffer: VecDeque::with_capacity(capacity),
            connected: false,
        }
    }
}

impl StreamSink for VideoSink {
    fn stream_index(&self) -> usize {
        self.stream_index
    }

    fn media_type(&self) -> MediaType {
        MediaType::Video
    }

    fn codec_id(&self) -> CodecId {
        self.codec_id
    }

    fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn needs_more_data(&self) -> bool {
        self.buffer.len() < self.capacity
    }

    fn push(&mut self, packet: Packet) {
        self.buffer.push_back(packet);
    }

    fn pop(&mut self) -> Option<Packet> {
        self.buffer.pop_front()
    }

    fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn flush(&mut self) -> usize {
        let count = self.buffer.len();
        self.buffer.clear();
        count
    }

    fn connect(&mut self) {
        self.connected = true;
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// 流分类: 为容器声明的流创建消费者
pub trait SinkFactory {
    /// - `Ok(Some(sink))`: 该流可消费
    /// - `Ok(None)`: 不支持的媒体类型, 记入忽略列表
    /// - `Err(_)`: 分类失败, 该流被跳过
    fn create(
        &self,
        stream: &Stream,
        codecs: &CodecRegistry,
        config: &DemuxerConfig,
    ) -> ReelResult<Option<Box<dyn StreamSink>>>;
}

/// 默认分类: 仅为视频流创建消费者
pub struct VideoSinkFactory;

impl SinkFactory for VideoSinkFactory {
    fn create(
        &self,
        stream: &Stream,
        codecs: &CodecRegistry,
        config: &DemuxerConfig,
    ) -> ReelResult<Option<Box<dyn StreamSink>>> {
        if stream.media_type != MediaType::Video {
            return Ok(None);
        }
        codecs.find_decoder(stream.codec_id).map_err(|e| {
            ReelError::StreamClassification(format!("流 #{} {}: {e}", stream.index, stream.describe()))
        })?;
        Ok(Some(Box::new(VideoSink::new(
            stream,
            config.sink_buffer_packets,
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_core::Rational;

    fn video_stream(codec_id: CodecId) -> Stream {
        let mut stream = Stream::new(0, MediaType::Video, codec_id, Rational::MILLI);
        stream.duration = 1500;
        stream
            .metadata
            .push(("language".to_string(), "eng".to_string()));
        stream
    }

    fn codecs() -> CodecRegistry {
        let mut codecs = CodecRegistry::new();
        reel_codec::register_all(&mut codecs);
        codecs
    }

    #[test]
    fn test_视频消费者缓冲策略() {
        let mut sink = VideoSink::new(&video_stream(CodecId::H264), 2);
        assert!(sink.needs_more_data());
        assert!(!sink.is_passive());
        assert_eq!(sink.language(), Some("eng"));
        assert_eq!(sink.duration(), Some(Duration::from_millis(1500)));

        sink.push(Packet::for_stream(0, vec![1]));
        assert!(sink.needs_more_data());
        sink.push(Packet::for_stream(0, vec![2]));
        assert!(!sink.needs_more_data());

        assert_eq!(sink.pop().map(|p| p.data[0]), Some(1));
        assert!(sink.needs_more_data());
        assert_eq!(sink.flush(), 1);
        assert_eq!(sink.buffered(), 0);
    }

    #[test]
    fn test_只接收自己的数据包() {
        let sink = VideoSink::new(&video_stream(CodecId::H264), 4);
        assert!(sink.accepts(&Packet::for_stream(0, vec![0])));
        assert!(!sink.accepts(&Packet::for_stream(1, vec![0])));
    }

    #[test]
    fn test_容量至少为一() {
        let sink = VideoSink::new(&video_stream(CodecId::H264), 0);
        assert!(sink.needs_more_data());
    }

    #[test]
    fn test_分类() {
        let config = DemuxerConfig::default();
        let codecs = codecs();

        let sink = VideoSinkFactory
            .create(&video_stream(CodecId::H264), &codecs, &config)
            .unwrap();
        assert!(sink.is_some());

        let audio = Stream::new(1, MediaType::Audio, CodecId::Aac, Rational::MILLI);
        assert!(
            VideoSinkFactory
                .create(&audio, &codecs, &config)
                .unwrap()
                .is_none()
        );

        let unknown = video_stream(CodecId::None);
        assert!(matches!(
            VideoSinkFactory.create(&unknown, &codecs, &config),
            Err(ReelError::StreamClassification(_))
        ));
    }
}
