//! 解码器描述注册表.
//!
//! 记录宿主环境可解码的编解码器. 解复用器据此判断一条视频流能否建立消费者.

use std::collections::HashMap;

use reel_core::{MediaType, ReelError, ReelResult};

use crate::codec_id::CodecId;

/// 解码器描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderDescriptor {
    /// 编解码器标识
    pub codec_id: CodecId,
    /// 短名称
    pub name: String,
    /// 完整名称
    pub long_name: String,
    /// 媒体类型
    pub media_type: MediaType,
}

impl DecoderDescriptor {
    /// 根据编解码器标识生成默认描述
    pub fn from_codec(codec_id: CodecId) -> Self {
        Self {
            codec_id,
            name: codec_id.name().to_string(),
            long_name: codec_id.long_name().to_string(),
            media_type: codec_id.media_type(),
        }
    }
}

/// 解码器描述注册表
pub struct CodecRegistry {
    decoders: HashMap<CodecId, DecoderDescriptor>,
}

impl CodecRegistry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// 注册一个解码器 (使用默认描述)
    pub fn register_decoder(&mut self, codec_id: CodecId) {
        self.register_descriptor(DecoderDescriptor::from_codec(codec_id));
    }

    /// 注册自定义解码器描述, 同一编解码器重复注册时覆盖旧值
    pub fn register_descriptor(&mut self, descriptor: DecoderDescriptor) {
        log::trace!("注册解码器: {}", descriptor.name);
        self.decoders.insert(descriptor.codec_id, descriptor);
    }

    /// 查找解码器描述
    pub fn find_decoder(&self, codec_id: CodecId) -> ReelResult<&DecoderDescriptor> {
        self.decoders
            .get(&codec_id)
            .ok_or_else(|| ReelError::CodecNotFound(format!("未找到 {codec_id} 的解码器")))
    }

    /// 获取所有已注册的解码器描述
    pub fn list_decoders(&self) -> Vec<&DecoderDescriptor> {
        self.decoders.values().collect()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}
