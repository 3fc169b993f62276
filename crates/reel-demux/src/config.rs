//! 解复用器配置.

use serde::{Deserialize, Serialize};

/// 解复用器配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DemuxerConfig {
    /// 每个视频消费者内部缓冲的数据包数, 低于此值时请求补充
    #[serde(default = "default_sink_buffer_packets")]
    pub sink_buffer_packets: usize,
    /// 构造完成后自动选中第一条视频流
    #[serde(default = "default_true")]
    pub auto_select: bool,
}

fn default_sink_buffer_packets() -> usize {
    8
}

fn default_true() -> bool {
    true
}

impl Default for DemuxerConfig {
    fn default() -> Self {
        Self {
            sink_buffer_packets: default_sink_buffer_packets(),
            auto_select: default_true(),
        }
    }
}
