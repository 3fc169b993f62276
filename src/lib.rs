//! # Reel
//!
//! 单读取者, 多消费者的容器解复用框架.
//!
//! 从一个容器文件中顺序读取交错的数据包, 按流分发给各自的消费者.
//! 消费者按需拉取 (`feed`), 只有选中流的数据包会被暂存, 定位时清空.
//! 解码与渲染由外部库完成.
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use reel::core::MediaType;
//! use reel::demux::{Demultiplexer, DemuxerConfig, PlaybackClock};
//!
//! let demuxer = Demultiplexer::open("clip.flv", PlaybackClock::new(), &DemuxerConfig::default())?;
//! for stream in demuxer.streams_of_type(MediaType::Video) {
//!     println!("{stream}");
//! }
//! println!("时长: {:?}", demuxer.duration());
//! # Ok::<(), reel::core::ReelError>(())
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `reel-core` | 错误类型, 媒体类型, 时间基与时间戳 |
//! | `reel-codec` | 编解码器标识, 数据包, 解码器描述 |
//! | `reel-format` | I/O, 容器读取器, 格式探测, 媒体源 |
//! | `reel-demux` | 解复用器, 消费者, 播放时钟 |

/// 核心类型
pub use reel_core as core;

/// 编解码器描述与数据包
pub use reel_codec as codec;

/// 容器读取
pub use reel_format as format;

/// 解复用
pub use reel_demux as demux;

pub mod config;
pub mod logging;
