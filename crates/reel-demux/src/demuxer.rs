//! 解复用器.
//!
//! 从一个已打开的媒体源顺序读包, 按流标识分发给各消费者.
//! 读取路径 (`feed`) 与定位路径 (`on_seek`) 由同一把锁串行化,
//! 保证待分发队列与 EOF 标志始终和容器的实际读位置一致.
//!
//! 分发规则 (对新读出的数据包):
//! - 没有对应消费者: 立即丢弃
//! - 消费者就是请求者, 或是被动消费者: 立即交付
//! - 消费者是选中流: 进入待分发队列
//! - 消费者未被选中: 丢弃

use std::collections::{BTreeMap, HashMap};
use std::sync::mpsc::Receiver;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, error, warn};
use reel_codec::{CodecRegistry, Packet};
use reel_core::{MediaType, ReelError, ReelResult};
use reel_format::{FormatRegistry, InputContext, MediaSource, SeekRequest};

use crate::clock::{ClockEvent, ClockStatus, ObserverId, PlaybackClock};
use crate::config::DemuxerConfig;
use crate::descriptor::StreamDescriptor;
use crate::packet_queue::PacketQueue;
use crate::sink::{SinkFactory, StreamSink, VideoSinkFactory};

/// `feed` 的结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    /// 请求者不再需要数据
    Satisfied,
    /// 容器已读完 (或读取失败)
    EndOfFile,
}

/// 分发统计
///
/// 任意时刻 `packets_read == delivered + discarded + 待分发队列长度`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemuxStats {
    /// 从容器读出的数据包数
    pub packets_read: u64,
    /// 交付给消费者的数据包数
    pub delivered: u64,
    /// 进入过待分发队列的数据包数
    pub queued: u64,
    /// 丢弃的数据包数 (无消费者, 未选中, 或定位时清空)
    pub discarded: u64,
}

struct DemuxState {
    source: Box<dyn MediaSource>,
    sinks: BTreeMap<usize, Box<dyn StreamSink>>,
    pending: PacketQueue,
    eof: bool,
    selected: HashMap<MediaType, usize>,
    clock_events: Receiver<ClockEvent>,
    stats: DemuxStats,
}

/// 解复用器
pub struct Demultiplexer {
    state: Mutex<DemuxState>,
    ignored: BTreeMap<usize, String>,
    duration: Duration,
    format_name: String,
    clock: PlaybackClock,
    observer: ObserverId,
}

impl Demultiplexer {
    /// 打开定位符 (文件路径), 使用内置的容器格式与解码器描述
    pub fn open(locator: &str, clock: PlaybackClock, config: &DemuxerConfig) -> ReelResult<Self> {
        let mut formats = FormatRegistry::new();
        reel_format::register_all(&mut formats);
        let mut codecs = CodecRegistry::new();
        reel_codec::register_all(&mut codecs);

        let input = InputContext::open(locator, &formats)?;
        debug!("已打开 {locator} ({})", input.format_name());
        Self::from_source(Box::new(input), &codecs, clock, config)
    }

    /// 基于已打开的媒体源构造, 使用默认的流分类
    pub fn from_source(
        source: Box<dyn MediaSource>,
        codecs: &CodecRegistry,
        clock: PlaybackClock,
        config: &DemuxerConfig,
    ) -> ReelResult<Self> {
        Self::with_sink_factory(source, codecs, &VideoSinkFactory, clock, config)
    }

    /// 基于已打开的媒体源构造, 由 `factory` 决定每条流的消费者
    pub fn with_sink_factory(
        source: Box<dyn MediaSource>,
        codecs: &CodecRegistry,
        factory: &dyn SinkFactory,
        clock: PlaybackClock,
        config: &DemuxerConfig,
    ) -> ReelResult<Self> {
        let mut sinks: BTreeMap<usize, Box<dyn StreamSink>> = BTreeMap::new();
        let mut ignored = BTreeMap::new();

        for stream in source.streams() {
            match factory.create(stream, codecs, config) {
                Ok(Some(sink)) => {
                    debug!("流 #{} {} 已建立消费者", stream.index, stream.describe());
                    sinks.insert(stream.index, sink);
                }
                Ok(None) => {
                    let reason = stream.describe();
                    debug!("忽略流 #{} {reason}", stream.index);
                    ignored.insert(stream.index, reason);
                }
                Err(e) => error!("跳过流 #{}: {e}", stream.index),
            }
        }

        let duration = resolve_duration(source.as_ref(), &sinks);
        let format_name = source.format_name().to_string();
        let (observer, clock_events) = clock.add_observer();

        let mut state = DemuxState {
            source,
            sinks,
            pending: PacketQueue::new(),
            eof: false,
            selected: HashMap::new(),
            clock_events,
            stats: DemuxStats::default(),
        };
        if config.auto_select {
            if let Some(index) = first_of_type(&state.sinks, MediaType::Video) {
                state.select(MediaType::Video, index);
            }
        }

        Ok(Self {
            state: Mutex::new(state),
            ignored,
            duration,
            format_name,
            clock,
            observer,
        })
    }

    fn lock(&self) -> MutexGuard<'_, DemuxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 为 `stream_index` 拉取数据, 直到它不再需要数据或容器读完
    pub fn feed(&self, stream_index: usize) -> ReelResult<FeedStatus> {
        let mut guard = self.lock();
        let state = &mut *guard;
        if !state.sinks.contains_key(&stream_index) {
            return Err(ReelError::StreamNotFound(stream_index));
        }

        loop {
            let Some(requester) = state.sinks.get_mut(&stream_index) else {
                return Err(ReelError::StreamNotFound(stream_index));
            };
            if !requester.needs_more_data() {
                return Ok(FeedStatus::Satisfied);
            }

            if let Some(packet) = state.pending.take_first_matching(|p| requester.accepts(p)) {
                requester.push(packet);
                state.stats.delivered += 1;
                continue;
            }

            if state.eof {
                return Ok(FeedStatus::EndOfFile);
            }

            match state.source.read_packet() {
                Ok(packet) => {
                    state.stats.packets_read += 1;
                    state.route(stream_index, packet);
                }
                Err(ReelError::Eof) => {
                    debug!("{}: 已读到末尾", self.format_name);
                    state.eof = true;
                    return Ok(FeedStatus::EndOfFile);
                }
                Err(e) => {
                    error!("{}: 读取数据包失败, 按末尾处理: {e}", self.format_name);
                    state.eof = true;
                    return Ok(FeedStatus::EndOfFile);
                }
            }
        }
    }

    /// 切换某一媒体类型的选中流, 要求时钟处于停止状态
    pub fn select_stream(&self, descriptor: &StreamDescriptor) -> ReelResult<()> {
        let mut state = self.lock();
        let status = self.clock.status();
        if status != ClockStatus::Stopped {
            return Err(ReelError::InvalidState(format!(
                "播放时钟处于 {status:?} 状态, 无法切换流"
            )));
        }

        let sink = state
            .sinks
            .get(&descriptor.identifier)
            .ok_or(ReelError::StreamNotFound(descriptor.identifier))?;
        if sink.media_type() != descriptor.media_type {
            return Err(ReelError::InvalidArgument(format!(
                "流 #{} 不是 {} 流",
                descriptor.identifier, descriptor.media_type
            )));
        }
        state.select(descriptor.media_type, descriptor.identifier);
        Ok(())
    }

    /// 选中第一条视频流
    pub fn select_first_video_stream(&self) -> ReelResult<()> {
        let descriptor = self
            .streams_of_type(MediaType::Video)
            .into_iter()
            .next()
            .ok_or_else(|| ReelError::InvalidState("没有可选的视频流".into()))?;
        self.select_stream(&descriptor)
    }

    /// 某一媒体类型当前选中的流
    pub fn selected_stream(&self, media_type: MediaType) -> Option<StreamDescriptor> {
        let state = self.lock();
        let index = *state.selected.get(&media_type)?;
        state.sinks.get(&index).map(|sink| describe(sink.as_ref()))
    }

    /// 定位通知: 清空待分发队列与消费者缓冲, 然后让容器回到开头
    pub fn on_seek(&self, position: Duration) {
        let mut state = self.lock();
        state.seek(position);
    }

    /// 处理时钟发来的事件, 返回处理的事件数
    pub fn poll_clock_events(&self) -> usize {
        let mut state = self.lock();
        let events: Vec<ClockEvent> = state.clock_events.try_iter().collect();
        for event in &events {
            match *event {
                ClockEvent::Seek(position) => state.seek(position),
                ClockEvent::StatusChanged(status) => debug!("时钟状态: {status:?}"),
            }
        }
        events.len()
    }

    /// 媒体时长, 未知时为零
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// 某一媒体类型的所有可消费流, 按标识排序
    pub fn streams_of_type(&self, media_type: MediaType) -> Vec<StreamDescriptor> {
        self.lock()
            .sinks
            .values()
            .filter(|sink| sink.media_type() == media_type)
            .map(|sink| describe(sink.as_ref()))
            .collect()
    }

    /// 被忽略的流: 标识 -> 原因
    pub fn ignored_streams(&self) -> &BTreeMap<usize, String> {
        &self.ignored
    }

    /// 容器格式名称
    pub fn format_name(&self) -> &str {
        &self.format_name
    }

    /// 从消费者取出最早缓冲的数据包
    pub fn take_packet(&self, stream_index: usize) -> ReelResult<Option<Packet>> {
        let mut state = self.lock();
        let sink = state
            .sinks
            .get_mut(&stream_index)
            .ok_or(ReelError::StreamNotFound(stream_index))?;
        Ok(sink.pop())
    }

    /// 消费者内部缓冲的数据包数
    pub fn buffered_packets(&self, stream_index: usize) -> ReelResult<usize> {
        let state = self.lock();
        state
            .sinks
            .get(&stream_index)
            .map(|sink| sink.buffered())
            .ok_or(ReelError::StreamNotFound(stream_index))
    }

    /// 待分发队列长度
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// 是否已读到末尾
    pub fn is_eof(&self) -> bool {
        self.lock().eof
    }

    /// 分发统计
    pub fn stats(&self) -> DemuxStats {
        self.lock().stats
    }
}

impl DemuxState {
    fn route(&mut self, requester: usize, packet: Packet) {
        let index = packet.stream_index;
        let Some(sink) = self.sinks.get_mut(&index) else {
            self.stats.discarded += 1;
            return;
        };
        if index == requester || sink.is_passive() {
            sink.push(packet);
            self.stats.delivered += 1;
        } else if sink.is_connected() {
            self.pending.push_back(packet);
            self.stats.queued += 1;
        } else {
            self.stats.discarded += 1;
        }
    }

    /// 先断开旧的选中流, 再连接新流
    fn select(&mut self, media_type: MediaType, index: usize) {
        if let Some(previous) = self.selected.remove(&media_type) {
            if let Some(sink) = self.sinks.get_mut(&previous) {
                sink.disconnect();
            }
        }
        if let Some(sink) = self.sinks.get_mut(&index) {
            sink.connect();
            self.selected.insert(media_type, index);
            debug!("选中 {media_type} 流 #{index}");
        }
    }

    fn seek(&mut self, position: Duration) {
        self.eof = false;
        let dropped = self.pending.drain_all();
        self.stats.discarded += dropped as u64;
        let flushed: usize = self.sinks.values_mut().map(|sink| sink.flush()).sum();
        debug!("定位到 {position:?}: 清空待分发 {dropped} 个, 消费者缓冲 {flushed} 个");

        let request = if self.source.seeks_by_pts() {
            SeekRequest::to_micros(self.source.start_time().unwrap_or(0))
        } else {
            SeekRequest::to_micros(0)
        };
        if let Err(e) = self.source.seek(&request) {
            error!("容器定位失败: {e}");
        }
    }
}

impl Drop for Demultiplexer {
    fn drop(&mut self) {
        if self.clock.status() != ClockStatus::Stopped {
            self.clock.stop();
        }
        self.clock.remove_observer(self.observer);

        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        state.source.close();
        let dropped = state.pending.drain_all();
        if dropped > 0 {
            debug!("释放 {dropped} 个未分发的数据包");
        }
    }
}

fn describe(sink: &dyn StreamSink) -> StreamDescriptor {
    StreamDescriptor {
        media_type: sink.media_type(),
        identifier: sink.stream_index(),
        language: sink.language().map(str::to_string),
    }
}

fn first_of_type(sinks: &BTreeMap<usize, Box<dyn StreamSink>>, media_type: MediaType) -> Option<usize> {
    sinks
        .values()
        .find(|sink| sink.media_type() == media_type)
        .map(|sink| sink.stream_index())
}

/// 优先使用容器时长, 其次是第一个报告了时长的流
fn resolve_duration(
    source: &dyn MediaSource,
    sinks: &BTreeMap<usize, Box<dyn StreamSink>>,
) -> Duration {
    let container = source
        .duration()
        .filter(|d| *d > 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok());
    if let Some(duration) = container {
        return duration;
    }
    if let Some(duration) = sinks.values().find_map(|sink| sink.duration()) {
        return duration;
    }
    warn!("{}: 无法确定媒体时长", source.format_name());
    Duration::ZERO
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_codec::CodecId;
    use reel_core::Rational;
    use reel_format::Stream;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// 按脚本依次返回数据包的媒体源
    struct ScriptedSource {
        streams: Vec<Stream>,
        /// (流标识, 负载标记)
        script: Vec<(usize, u8)>,
        cursor: usize,
        duration: Option<f64>,
        by_pts: bool,
        fail_read_at: Option<usize>,
        fail_seek: bool,
        reads: Arc<AtomicUsize>,
        seeks: Arc<Mutex<Vec<SeekRequest>>>,
        closed: Arc<AtomicBool>,
    }

    impl ScriptedSource {
        fn new(streams: Vec<Stream>, script: &[(usize, u8)]) -> Self {
            Self {
                streams,
                script: script.to_vec(),
                cursor: 0,
                duration: None,
                by_pts: false,
                fail_read_at: None,
                fail_seek: false,
                reads: Arc::new(AtomicUsize::new(0)),
                seeks: Arc::new(Mutex::new(Vec::new())),
                closed: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl MediaSource for ScriptedSource {
        fn format_name(&self) -> &str {
            "scripted"
        }

        fn streams(&self) -> &[Stream] {
            &self.streams
        }

        fn read_packet(&mut self) -> ReelResult<Packet> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.fail_read_at == Some(self.cursor) {
                return Err(ReelError::InvalidData("损坏的数据".into()));
            }
            let (index, tag) = *self.script.get(self.cursor).ok_or(ReelError::Eof)?;
            self.cursor += 1;
            Ok(Packet::for_stream(index, vec![tag]))
        }

        fn seek(&mut self, request: &SeekRequest) -> ReelResult<()> {
            self.seeks.lock().unwrap().push(*request);
            if self.fail_seek {
                return Err(ReelError::Seek("不支持".into()));
            }
            self.cursor = 0;
            Ok(())
        }

        fn duration(&self) -> Option<f64> {
            self.duration
        }

        fn start_time(&self) -> Option<i64> {
            Some(1_000)
        }

        fn seeks_by_pts(&self) -> bool {
            self.by_pts
        }

        fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    /// 测试用音频消费者, 可配置为被动
    struct AudioSink {
        index: usize,
        passive: bool,
        buffer: Vec<Packet>,
        connected: bool,
    }

    impl StreamSink for AudioSink {
        fn stream_index(&self) -> usize {
            self.index
        }
        fn media_type(&self) -> MediaType {
            MediaType::Audio
        }
        fn codec_id(&self) -> CodecId {
            CodecId::Aac
        }
        fn needs_more_data(&self) -> bool {
            self.buffer.len() < 2
        }
        fn is_passive(&self) -> bool {
            self.passive
        }
        fn push(&mut self, packet: Packet) {
            self.buffer.push(packet);
        }
        fn pop(&mut self) -> Option<Packet> {
            (!self.buffer.is_empty()).then(|| self.buffer.remove(0))
        }
        fn buffered(&self) -> usize {
            self.buffer.len()
        }
        fn flush(&mut self) -> usize {
            let n = self.buffer.len();
            self.buffer.clear();
            n
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

    /// 视频走默认分类, 音频建立 `AudioSink`
    struct AudioAwareFactory {
        passive: bool,
    }

    impl SinkFactory for AudioAwareFactory {
        fn create(
            &self,
            stream: &Stream,
            codecs: &CodecRegistry,
            config: &DemuxerConfig,
        ) -> ReelResult<Option<Box<dyn StreamSink>>> {
            if stream.media_type == MediaType::Audio {
                return Ok(Some(Box::new(AudioSink {
                    index: stream.index,
                    passive: self.passive,
                    buffer: Vec::new(),
                    connected: false,
                })));
            }
            VideoSinkFactory.create(stream, codecs, config)
        }
    }

    type ConnectionLog = Arc<Mutex<Vec<(usize, &'static str)>>>;

    /// 记录 connect/disconnect 调用顺序的消费者
    struct RecordingSink {
        inner: Box<dyn StreamSink>,
        log: ConnectionLog,
    }

    impl StreamSink for RecordingSink {
        fn stream_index(&self) -> usize {
            self.inner.stream_index()
        }
        fn media_type(&self) -> MediaType {
            self.inner.media_type()
        }
        fn codec_id(&self) -> CodecId {
            self.inner.codec_id()
        }
        fn needs_more_data(&self) -> bool {
            self.inner.needs_more_data()
        }
        fn push(&mut self, packet: Packet) {
            self.inner.push(packet);
        }
        fn pop(&mut self) -> Option<Packet> {
            self.inner.pop()
        }
        fn buffered(&self) -> usize {
            self.inner.buffered()
        }
        fn flush(&mut self) -> usize {
            self.inner.flush()
        }
        fn connect(&mut self) {
            self.log.lock().unwrap().push((self.stream_index(), "connect"));
            self.inner.connect();
        }
        fn disconnect(&mut self) {
            self.log.lock().unwrap().push((self.stream_index(), "disconnect"));
            self.inner.disconnect();
        }
        fn is_connected(&self) -> bool {
            self.inner.is_connected()
        }
    }

    struct RecordingFactory {
        log: ConnectionLog,
    }

    impl SinkFactory for RecordingFactory {
        fn create(
            &self,
            stream: &Stream,
            codecs: &CodecRegistry,
            config: &DemuxerConfig,
        ) -> ReelResult<Option<Box<dyn StreamSink>>> {
            let inner = VideoSinkFactory.create(stream, codecs, config)?;
            Ok(inner.map(|inner| {
                Box::new(RecordingSink {
                    inner,
                    log: Arc::clone(&self.log),
                }) as Box<dyn StreamSink>
            }))
        }
    }

    fn video(index: usize) -> Stream {
        Stream::new(index, MediaType::Video, CodecId::H264, Rational::MILLI)
    }

    fn audio(index: usize) -> Stream {
        Stream::new(index, MediaType::Audio, CodecId::Aac, Rational::MILLI)
    }

    fn codecs() -> CodecRegistry {
        let mut codecs = CodecRegistry::new();
        reel_codec::register_all(&mut codecs);
        codecs
    }

    fn config(buffer: usize) -> DemuxerConfig {
        DemuxerConfig {
            sink_buffer_packets: buffer,
            auto_select: true,
        }
    }

    fn build(source: ScriptedSource, buffer: usize) -> Demultiplexer {
        Demultiplexer::from_source(
            Box::new(source),
            &codecs(),
            PlaybackClock::new(),
            &config(buffer),
        )
        .unwrap()
    }

    fn build_with_audio(source: ScriptedSource, passive: bool, clock: PlaybackClock) -> Demultiplexer {
        Demultiplexer::with_sink_factory(
            Box::new(source),
            &codecs(),
            &AudioAwareFactory { passive },
            clock,
            &config(2),
        )
        .unwrap()
    }

    fn drain(demuxer: &Demultiplexer, index: usize) -> Vec<u8> {
        std::iter::from_fn(|| demuxer.take_packet(index).unwrap())
            .map(|p| p.data[0])
            .collect()
    }

    fn assert_accounted(demuxer: &Demultiplexer) {
        let stats = demuxer.stats();
        assert_eq!(
            stats.packets_read,
            stats.delivered + stats.discarded + demuxer.pending_len() as u64
        );
    }

    #[test]
    fn test_分类_视频建立消费者_其他忽略() {
        let demuxer = build(ScriptedSource::new(vec![video(0), audio(1)], &[]), 4);

        let videos = demuxer.streams_of_type(MediaType::Video);
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].identifier, 0);
        assert!(demuxer.streams_of_type(MediaType::Audio).is_empty());
        assert_eq!(demuxer.ignored_streams().len(), 1);
        assert_eq!(demuxer.ignored_streams()[&1], "'audio/aac'");
        assert_eq!(demuxer.format_name(), "scripted");
    }

    #[test]
    fn test_分类失败只跳过该流() {
        let broken = Stream::new(1, MediaType::Video, CodecId::None, Rational::MILLI);
        let demuxer = build(ScriptedSource::new(vec![video(0), broken], &[]), 4);

        let videos = demuxer.streams_of_type(MediaType::Video);
        assert_eq!(videos.len(), 1);
        assert!(demuxer.ignored_streams().is_empty());
    }

    #[test]
    fn test_语言来自元数据() {
        let mut stream = video(0);
        stream.metadata.push(("language".into(), "fra".into()));
        let demuxer = build(ScriptedSource::new(vec![stream], &[]), 4);
        let videos = demuxer.streams_of_type(MediaType::Video);
        assert_eq!(videos[0].language.as_deref(), Some("fra"));
    }

    #[test]
    fn test_未知流标识的数据包被丢弃() {
        let source = ScriptedSource::new(vec![video(0), audio(1)], &[(1, 0x10), (0, 0x01), (0, 0x02)]);
        let demuxer = build(source, 2);

        assert_eq!(demuxer.feed(0).unwrap(), FeedStatus::Satisfied);
        assert_eq!(drain(&demuxer, 0), vec![0x01, 0x02]);

        let stats = demuxer.stats();
        assert_eq!(stats.packets_read, 3);
        assert_eq!(stats.delivered, 2);
        assert_eq!(stats.discarded, 1);
        assert_eq!(demuxer.pending_len(), 0);
    }

    #[test]
    fn test_选中流的数据包按顺序排队() {
        let script = [(1, 0x10), (0, 0x01), (1, 0x11), (0, 0x02), (1, 0x12)];
        let demuxer = build_with_audio(
            ScriptedSource::new(vec![video(0), audio(1)], &script),
            false,
            PlaybackClock::new(),
        );
        demuxer
            .select_stream(&demuxer.streams_of_type(MediaType::Audio)[0])
            .unwrap();

        assert_eq!(demuxer.feed(0).unwrap(), FeedStatus::Satisfied);
        assert_eq!(demuxer.pending_len(), 2);
        assert_eq!(demuxer.buffered_packets(1).unwrap(), 0);

        // 音频请求时先从待分发队列取, 保持容器顺序
        assert_eq!(demuxer.feed(1).unwrap(), FeedStatus::Satisfied);
        assert_eq!(drain(&demuxer, 1), vec![0x10, 0x11]);
        assert_eq!(demuxer.pending_len(), 0);
        assert_eq!(demuxer.stats().packets_read, 4);

        assert_eq!(demuxer.feed(1).unwrap(), FeedStatus::EndOfFile);
        assert_eq!(drain(&demuxer, 1), vec![0x12]);
        assert_accounted(&demuxer);
    }

    #[test]
    fn test_未选中流的数据包被丢弃() {
        let script = [(1, 0x10), (0, 0x01), (0, 0x02)];
        let demuxer = build_with_audio(
            ScriptedSource::new(vec![video(0), audio(1)], &script),
            false,
            PlaybackClock::new(),
        );

        demuxer.feed(0).unwrap();
        assert_eq!(demuxer.pending_len(), 0);
        assert_eq!(demuxer.stats().discarded, 1);
        assert_accounted(&demuxer);
    }

    #[test]
    fn test_被动消费者立即接收() {
        let script = [(1, 0x10), (0, 0x01), (1, 0x11), (0, 0x02)];
        let demuxer = build_with_audio(
            ScriptedSource::new(vec![video(0), audio(1)], &script),
            true,
            PlaybackClock::new(),
        );

        demuxer.feed(0).unwrap();
        assert_eq!(demuxer.pending_len(), 0);
        assert_eq!(drain(&demuxer, 1), vec![0x10, 0x11]);
        assert_eq!(drain(&demuxer, 0), vec![0x01, 0x02]);
        assert_eq!(demuxer.stats().delivered, 4);
    }

    #[test]
    fn test_任意交错下每个数据包只处理一次() {
        let script: Vec<(usize, u8)> = (0..60u8).map(|i| ((i % 3) as usize, i)).collect();
        let demuxer = build_with_audio(
            ScriptedSource::new(vec![video(0), audio(1)], &script),
            false,
            PlaybackClock::new(),
        );
        demuxer
            .select_stream(&demuxer.streams_of_type(MediaType::Audio)[0])
            .unwrap();

        let mut video_seen = Vec::new();
        let mut audio_seen = Vec::new();
        loop {
            let v = demuxer.feed(0).unwrap();
            video_seen.extend(drain(&demuxer, 0));
            let a = demuxer.feed(1).unwrap();
            audio_seen.extend(drain(&demuxer, 1));
            assert_accounted(&demuxer);
            if v == FeedStatus::EndOfFile && a == FeedStatus::EndOfFile && demuxer.pending_len() == 0 {
                break;
            }
        }

        let expected_video: Vec<u8> = (0..60u8).filter(|i| i % 3 == 0).collect();
        let expected_audio: Vec<u8> = (0..60u8).filter(|i| i % 3 == 1).collect();
        assert_eq!(video_seen, expected_video);
        assert_eq!(audio_seen, expected_audio);
        assert_eq!(demuxer.stats().discarded, 20);
    }

    #[test]
    fn test_切换选中流() {
        let demuxer = build(ScriptedSource::new(vec![video(0), video(1)], &[]), 4);
        assert_eq!(demuxer.selected_stream(MediaType::Video).unwrap().identifier, 0);

        let second = demuxer.streams_of_type(MediaType::Video)[1].clone();
        demuxer.select_stream(&second).unwrap();
        {
            let state = demuxer.lock();
            assert!(!state.sinks[&0].is_connected());
            assert!(state.sinks[&1].is_connected());
        }
        demuxer.select_first_video_stream().unwrap();
        let state = demuxer.lock();
        let connected = state.sinks.values().filter(|s| s.is_connected()).count();
        assert_eq!(connected, 1);
        assert!(state.sinks[&0].is_connected());
    }

    #[test]
    fn test_切换时先断开旧流再连接新流() {
        let log = ConnectionLog::default();
        let demuxer = Demultiplexer::with_sink_factory(
            Box::new(ScriptedSource::new(vec![video(0), video(1)], &[])),
            &codecs(),
            &RecordingFactory { log: Arc::clone(&log) },
            PlaybackClock::new(),
            &config(4),
        )
        .unwrap();
        assert_eq!(*log.lock().unwrap(), vec![(0, "connect")]);

        let second = demuxer.streams_of_type(MediaType::Video)[1].clone();
        demuxer.select_stream(&second).unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec![(0, "connect"), (0, "disconnect"), (1, "connect")]
        );
    }

    #[test]
    fn test_播放中禁止切换() {
        let clock = PlaybackClock::new();
        let demuxer = Demultiplexer::from_source(
            Box::new(ScriptedSource::new(vec![video(0), video(1)], &[])),
            &codecs(),
            clock.clone(),
            &config(4),
        )
        .unwrap();
        let second = demuxer.streams_of_type(MediaType::Video)[1].clone();

        clock.play();
        assert!(matches!(
            demuxer.select_stream(&second),
            Err(ReelError::InvalidState(_))
        ));
        clock.pause();
        assert!(demuxer.select_stream(&second).is_err());
        assert_eq!(demuxer.selected_stream(MediaType::Video).unwrap().identifier, 0);

        clock.stop();
        assert!(demuxer.select_stream(&second).is_ok());
    }

    #[test]
    fn test_选择无效流() {
        let demuxer = build(ScriptedSource::new(vec![video(0)], &[]), 4);
        let missing = StreamDescriptor {
            media_type: MediaType::Video,
            identifier: 7,
            language: None,
        };
        assert!(matches!(
            demuxer.select_stream(&missing),
            Err(ReelError::StreamNotFound(7))
        ));
        let wrong_type = StreamDescriptor {
            media_type: MediaType::Audio,
            identifier: 0,
            language: None,
        };
        assert!(matches!(
            demuxer.select_stream(&wrong_type),
            Err(ReelError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_关闭自动选择() {
        let demuxer = Demultiplexer::from_source(
            Box::new(ScriptedSource::new(vec![video(0)], &[])),
            &codecs(),
            PlaybackClock::new(),
            &DemuxerConfig {
                sink_buffer_packets: 4,
                auto_select: false,
            },
        )
        .unwrap();
        assert!(demuxer.selected_stream(MediaType::Video).is_none());
    }

    #[test]
    fn test_末尾后不再读取() {
        let source = ScriptedSource::new(vec![video(0)], &[(0, 1)]);
        let reads = Arc::clone(&source.reads);
        let demuxer = build(source, 4);

        assert_eq!(demuxer.feed(0).unwrap(), FeedStatus::EndOfFile);
        assert!(demuxer.is_eof());
        let attempts = reads.load(Ordering::SeqCst);
        assert_eq!(attempts, 2);

        drain(&demuxer, 0);
        assert_eq!(demuxer.feed(0).unwrap(), FeedStatus::EndOfFile);
        assert_eq!(demuxer.feed(0).unwrap(), FeedStatus::EndOfFile);
        assert_eq!(reads.load(Ordering::SeqCst), attempts);
    }

    #[test]
    fn test_读取错误按末尾处理() {
        let mut source = ScriptedSource::new(vec![video(0)], &[(0, 1), (0, 2), (0, 3)]);
        source.fail_read_at = Some(1);
        let demuxer = build(source, 4);

        assert_eq!(demuxer.feed(0).unwrap(), FeedStatus::EndOfFile);
        assert!(demuxer.is_eof());
        assert_eq!(drain(&demuxer, 0), vec![1]);
    }

    #[test]
    fn test_未知流请求() {
        let demuxer = build(ScriptedSource::new(vec![video(0), audio(1)], &[]), 4);
        assert!(matches!(demuxer.feed(1), Err(ReelError::StreamNotFound(1))));
        assert!(demuxer.take_packet(5).is_err());
    }

    #[test]
    fn test_定位清空队列并重新读取() {
        let script = [(1, 0x10), (1, 0x11), (0, 0x01), (0, 0x02), (0, 0x03)];
        let source = ScriptedSource::new(vec![video(0), audio(1)], &script);
        let seeks = Arc::clone(&source.seeks);
        let demuxer = build_with_audio(source, false, PlaybackClock::new());
        demuxer
            .select_stream(&demuxer.streams_of_type(MediaType::Audio)[0])
            .unwrap();

        demuxer.feed(0).unwrap();
        assert_eq!(demuxer.pending_len(), 2);
        assert_eq!(demuxer.buffered_packets(0).unwrap(), 2);

        demuxer.on_seek(Duration::from_secs(5));
        assert_eq!(demuxer.pending_len(), 0);
        assert!(!demuxer.is_eof());
        assert_eq!(demuxer.buffered_packets(0).unwrap(), 0);
        assert_accounted(&demuxer);

        let requests = seeks.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].target_ts, 0);
        assert!(requests[0].flags.backward);

        // 重新从容器开头读取, 而不是取旧的缓冲
        assert_eq!(demuxer.feed(1).unwrap(), FeedStatus::Satisfied);
        assert_eq!(drain(&demuxer, 1), vec![0x10, 0x11]);
        assert_eq!(demuxer.stats().packets_read, 6);
    }

    #[test]
    fn test_定位重置末尾标志() {
        let demuxer = build(ScriptedSource::new(vec![video(0)], &[(0, 1)]), 4);
        assert_eq!(demuxer.feed(0).unwrap(), FeedStatus::EndOfFile);
        demuxer.on_seek(Duration::ZERO);
        assert!(!demuxer.is_eof());
        assert_eq!(demuxer.feed(0).unwrap(), FeedStatus::EndOfFile);
        assert_eq!(drain(&demuxer, 0), vec![1]);
    }

    #[test]
    fn test_按_pts_定位到起始时间() {
        let mut source = ScriptedSource::new(vec![video(0)], &[]);
        source.by_pts = true;
        let seeks = Arc::clone(&source.seeks);
        let demuxer = build(source, 4);

        demuxer.on_seek(Duration::from_secs(1));
        let requests = seeks.lock().unwrap().clone();
        assert_eq!(requests[0].target_ts, 1_000);
        assert_eq!(requests[0].min_ts, i64::MIN);
        assert!(requests[0].flags.backward);
    }

    #[test]
    fn test_定位失败不致命() {
        let mut source = ScriptedSource::new(vec![video(0)], &[(0, 1)]);
        source.fail_seek = true;
        let demuxer = build(source, 4);
        demuxer.feed(0).unwrap();
        demuxer.on_seek(Duration::ZERO);
        assert!(!demuxer.is_eof());
    }

    #[test]
    fn test_时钟事件驱动定位() {
        let clock = PlaybackClock::new();
        let source = ScriptedSource::new(vec![video(0)], &[(0, 1), (0, 2)]);
        let seeks = Arc::clone(&source.seeks);
        let demuxer =
            Demultiplexer::from_source(Box::new(source), &codecs(), clock.clone(), &config(4))
                .unwrap();

        demuxer.feed(0).unwrap();
        assert!(demuxer.is_eof());

        clock.play();
        clock.seek(Duration::from_secs(2));
        assert_eq!(demuxer.poll_clock_events(), 2);
        assert!(!demuxer.is_eof());
        assert_eq!(seeks.lock().unwrap().len(), 1);
        assert_eq!(demuxer.poll_clock_events(), 0);
    }

    #[test]
    fn test_时长优先使用容器值() {
        let mut stream = video(0);
        stream.duration = 10_000;
        let mut source = ScriptedSource::new(vec![stream.clone()], &[]);
        source.duration = Some(2.5);
        assert_eq!(build(source, 4).duration(), Duration::from_millis(2500));

        let source = ScriptedSource::new(vec![stream], &[]);
        assert_eq!(build(source, 4).duration(), Duration::from_secs(10));
    }

    #[test]
    fn test_容器时长溢出时回退() {
        let mut stream = video(0);
        stream.duration = 10_000;
        let mut source = ScriptedSource::new(vec![stream], &[]);
        source.duration = Some(1e30);
        assert_eq!(build(source, 4).duration(), Duration::from_secs(10));

        let mut source = ScriptedSource::new(vec![video(0)], &[]);
        source.duration = Some(f64::INFINITY);
        assert_eq!(build(source, 4).duration(), Duration::ZERO);
    }

    #[test]
    fn test_无时长信息时为零() {
        let demuxer = build(ScriptedSource::new(vec![video(0)], &[]), 4);
        assert_eq!(demuxer.duration(), Duration::ZERO);
    }

    #[test]
    fn test_销毁时释放资源() {
        let clock = PlaybackClock::new();
        let source = ScriptedSource::new(vec![video(0), video(1)], &[(1, 1), (0, 2)]);
        let closed = Arc::clone(&source.closed);
        let demuxer =
            Demultiplexer::from_source(Box::new(source), &codecs(), clock.clone(), &config(4))
                .unwrap();
        assert_eq!(clock.observer_count(), 1);

        clock.play();
        drop(demuxer);
        assert!(closed.load(Ordering::SeqCst));
        assert_eq!(clock.observer_count(), 0);
        assert_eq!(clock.status(), ClockStatus::Stopped);
    }

    #[test]
    fn test_跨线程共享() {
        let demuxer = Arc::new(build(
            ScriptedSource::new(vec![video(0)], &[(0, 1), (0, 2), (0, 3)]),
            8,
        ));
        let worker = {
            let demuxer = Arc::clone(&demuxer);
            std::thread::spawn(move || demuxer.feed(0).unwrap())
        };
        let status = worker.join().unwrap();
        demuxer.on_seek(Duration::ZERO);
        assert_eq!(status, FeedStatus::EndOfFile);
        assert_eq!(demuxer.buffered_packets(0).unwrap(), 0);
    }
}
