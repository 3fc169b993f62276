//! # reel-format
//!
//! 容器读取层: I/O 抽象, 容器读取器, 格式探测, 以及供解复用器使用的
//! `MediaSource` 句柄.
//!
//! 使用流程:
//! 1. 创建 `FormatRegistry` 并调用 [`register_all`]
//! 2. 通过 `InputContext::open()` 打开文件 (自动探测格式)
//! 3. 通过 `MediaSource` 接口枚举流, 读包, 定位

pub mod containers;
pub mod format_id;
pub mod io;
pub mod probe;
pub mod reader;
pub mod registry;
pub mod source;
pub mod stream;

// 重导出常用类型
pub use format_id::FormatId;
pub use io::IoContext;
pub use probe::{FormatProbe, ProbeResult, ProbeScore};
pub use reader::{ContainerReader, SeekFlags, SeekRequest};
pub use registry::FormatRegistry;
pub use source::{InputContext, MediaSource};
pub use stream::{AudioStreamParams, Stream, StreamParams, VideoStreamParams};

/// 注册所有内置容器格式
pub fn register_all(registry: &mut FormatRegistry) {
    containers::register_all_readers(registry);
}
