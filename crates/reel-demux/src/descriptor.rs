//! 流描述.

use std::fmt;

use reel_core::MediaType;

/// 面向调用方的流描述 (不可变值, 与活动的消费者相互独立)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescriptor {
    /// 媒体类型
    pub media_type: MediaType,
    /// 流标识 (容器内的流索引)
    pub identifier: usize,
    /// 语言标签, 未声明时为 `None`
    pub language: Option<String>,
}

impl fmt::Display for StreamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.identifier, self.media_type)?;
        if let Some(lang) = &self.language {
            write!(f, " [{lang}]")?;
        }
        Ok(())
    }
}
