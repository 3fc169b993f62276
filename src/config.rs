//! 配置文件 (JSON).

use anyhow::{Context, Result};
use reel_demux::DemuxerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::logging::LoggingConfig;

/// 顶层配置, 缺省的部分使用默认值
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReelConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub demuxer: DemuxerConfig,
}

impl ReelConfig {
    /// 从 JSON 文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败, path={}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("解析配置文件失败, path={}", path.display()))
    }
}
