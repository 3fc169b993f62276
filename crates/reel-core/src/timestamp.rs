//! 时间戳类型, 用于表示媒体流中的时间点或时长.

use crate::rational::Rational;
use std::fmt;
use std::time::Duration;

/// 表示"未定义"的时间戳值
pub const NOPTS_VALUE: i64 = i64::MIN;

/// 时间戳
///
/// 实际时间 (秒) = pts * time_base.num / time_base.den.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    /// 时间戳值, `NOPTS_VALUE` 表示未定义
    pub pts: i64,
    /// 时间基
    pub time_base: Rational,
}

impl Timestamp {
    /// 创建新的时间戳
    pub const fn new(pts: i64, time_base: Rational) -> Self {
        Self { pts, time_base }
    }

    /// 判断时间戳是否有效 (非 NOPTS_VALUE 且时间基有效)
    pub const fn is_valid(&self) -> bool {
        self.pts != NOPTS_VALUE && self.time_base.is_valid()
    }

    /// 转换为秒, 无效时间戳返回 `f64::NAN`
    pub fn to_seconds(&self) -> f64 {
        if !self.is_valid() {
            return f64::NAN;
        }
        self.pts as f64 * self.time_base.to_f64()
    }

    /// 转换为 `Duration`
    ///
    /// 无效, 为负或超出 `Duration` 范围的时间戳返回 `None`.
    pub fn to_duration(&self) -> Option<Duration> {
        let secs = self.to_seconds();
        if secs >= 0.0 {
            Duration::try_from_secs_f64(secs).ok()
        } else {
            None
        }
    }

    /// 将时间戳重缩放到新的时间基
    ///
    /// new_pts = pts * old_tb.num * new_tb.den / (old_tb.den * new_tb.num)
    pub fn rescale(&self, new_time_base: Rational) -> Option<Self> {
        if !self.is_valid() || !new_time_base.is_valid() {
            return None;
        }
        let num = i128::from(self.pts)
            * i128::from(self.time_base.num)
            * i128::from(new_time_base.den);
        let den = i128::from(self.time_base.den) * i128::from(new_time_base.num);
        if den == 0 {
            return None;
        }
        Some(Self::new((num / den) as i64, new_time_base))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{:.6}s", self.to_seconds())
        } else {
            write!(f, "NOPTS")
        }
    }
}
