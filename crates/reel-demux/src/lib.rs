//! # reel-demux
//!
//! 单读取者, 多消费者的解复用器.
//!
//! 一个 `Demultiplexer` 独占一个已打开的媒体源, 为容器中每条可消费的流
//! 建立一个 `StreamSink`. 消费者缓冲不足时调用 `feed`, 解复用器只读取
//! 满足该消费者所需的数据包, 其余选中流的数据包暂存在待分发队列中.
//!
//! ```rust,no_run
//! use reel_core::MediaType;
//! use reel_demux::{Demultiplexer, DemuxerConfig, FeedStatus, PlaybackClock};
//!
//! let clock = PlaybackClock::new();
//! let demuxer = Demultiplexer::open("clip.flv", clock, &DemuxerConfig::default())?;
//! let video = demuxer.selected_stream(MediaType::Video).expect("没有视频流");
//! while demuxer.feed(video.identifier)? == FeedStatus::Satisfied {
//!     while let Some(packet) = demuxer.take_packet(video.identifier)? {
//!         println!("pts={} size={}", packet.pts, packet.size());
//!     }
//! }
//! # Ok::<(), reel_core::ReelError>(())
//! ```

pub mod capabilities;
pub mod clock;
pub mod config;
pub mod demuxer;
pub mod descriptor;
pub mod packet_queue;
pub mod sink;

// 重导出常用类型
pub use capabilities::{ContainerInfo, DecoderInfo, available_containers, available_decoders};
pub use clock::{ClockEvent, ClockStatus, ObserverId, PlaybackClock};
pub use config::DemuxerConfig;
pub use demuxer::{DemuxStats, Demultiplexer, FeedStatus};
pub use descriptor::StreamDescriptor;
pub use packet_queue::PacketQueue;
pub use sink::{SinkFactory, StreamSink, VideoSink, VideoSinkFactory};
