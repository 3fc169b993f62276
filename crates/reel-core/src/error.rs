//! 统一错误类型定义.
//!
//! 所有 Reel crate 共用的错误类型. 按恢复策略大致分为三类:
//! - 构造期致命: `Open`
//! - 单流可恢复: `StreamClassification`
//! - 运行期可恢复: `Eof`, `Seek`, `InvalidState` 等

use thiserror::Error;

/// Reel 框架统一错误类型
#[derive(Debug, Error)]
pub enum ReelError {
    /// 无法打开输入 (定位符无效或容器头部无法解析)
    #[error("打开输入失败: {0}")]
    Open(String),

    /// 单条流分类失败, 该流被跳过
    #[error("流分类失败: {0}")]
    StreamClassification(String),

    /// 已到达流末尾
    #[error("已到达流末尾")]
    Eof,

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 无效数据 (损坏的码流等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 容器定位失败
    #[error("定位失败: {0}")]
    Seek(String),

    /// 当前状态不允许该操作
    #[error("状态错误: {0}")]
    InvalidState(String),

    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 未找到指定的流
    #[error("未找到流: 索引 {0}")]
    StreamNotFound(usize),

    /// 未找到指定的解码器描述
    #[error("未找到解码器: {0}")]
    CodecNotFound(String),

    /// 未找到指定的容器格式
    #[error("未找到容器格式: {0}")]
    FormatNotFound(String),
}

impl ReelError {
    /// 是否为流末尾信号 (而非真正的错误)
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }
}

/// Reel 框架统一 Result 类型
pub type ReelResult<T> = Result<T, ReelError>;
