//! 格式探测.
//!
//! 通过文件头部数据和扩展名识别容器格式.

use crate::format_id::FormatId;

/// 探测置信度, 数值越高越可信
pub type ProbeScore = u32;

/// 仅扩展名匹配
pub const SCORE_EXTENSION: ProbeScore = 50;

/// 魔数完全匹配
pub const SCORE_MAX: ProbeScore = 100;

/// 探测结果
#[derive(Debug, Clone)]
pub struct ProbeResult {
    /// 识别出的格式
    pub format_id: FormatId,
    /// 置信度分数
    pub score: ProbeScore,
}

/// 格式探测器 trait
pub trait FormatProbe: Send + Sync {
    /// 根据文件头部数据探测格式
    ///
    /// 返回 `None` 表示不是此格式.
    fn probe(&self, data: &[u8], filename: Option<&str>) -> Option<ProbeScore>;

    /// 此探测器对应的格式
    fn format_id(&self) -> FormatId;
}
