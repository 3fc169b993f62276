//! 可用容器格式与解码器列表.
//!
//! 进程内首次调用时根据默认注册表计算一次, 之后只读.
//! 仅用于诊断与界面展示, 不在数据路径上.

use std::sync::OnceLock;

use reel_codec::CodecRegistry;
use reel_core::MediaType;
use reel_format::FormatRegistry;

/// 容器格式描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub name: String,
    pub long_name: String,
}

/// 解码器描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderInfo {
    pub name: String,
    pub long_name: String,
    pub media_type: MediaType,
}

static CONTAINERS: OnceLock<Vec<ContainerInfo>> = OnceLock::new();
static DECODERS: OnceLock<Vec<DecoderInfo>> = OnceLock::new();

/// 可读取的容器格式, 按名称排序
pub fn available_containers() -> &'static [ContainerInfo] {
    CONTAINERS.get_or_init(|| {
        let mut registry = FormatRegistry::new();
        reel_format::register_all(&mut registry);
        let mut list: Vec<ContainerInfo> = registry
            .list_readers()
            .into_iter()
            .map(|(_, name, long_name)| ContainerInfo {
                name: name.to_string(),
                long_name: long_name.to_string(),
            })
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        log::debug!("可用容器格式: {} 种", list.len());
        list
    })
}

/// 可用的解码器, 按名称排序
pub fn available_decoders() -> &'static [DecoderInfo] {
    DECODERS.get_or_init(|| {
        let mut registry = CodecRegistry::new();
        reel_codec::register_all(&mut registry);
        let mut list: Vec<DecoderInfo> = registry
            .list_decoders()
            .into_iter()
            .map(|d| DecoderInfo {
                name: d.name.clone(),
                long_name: d.long_name.clone(),
                media_type: d.media_type,
            })
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        log::debug!("可用解码器: {} 种", list.len());
        list
    })
}
