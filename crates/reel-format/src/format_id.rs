//! 容器格式标识符.

use std::fmt;

/// 容器格式标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FormatId {
    /// Flash Video (FLV)
    Flv,
}

impl FormatId {
    /// 所有已知格式
    pub const ALL: &[FormatId] = &[Self::Flv];

    /// 短名称
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Flv => "flv",
        }
    }

    /// 人类可读的完整名称
    pub const fn long_name(&self) -> &'static str {
        match self {
            Self::Flv => "FLV (Flash Video)",
        }
    }

    /// 常用文件扩展名
    pub const fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Flv => &["flv"],
        }
    }

    /// 从文件路径猜测格式
    pub fn from_filename(filename: &str) -> Option<FormatId> {
        let (_, ext) = filename.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        Self::ALL
            .iter()
            .find(|id| id.extensions().contains(&ext.as_str()))
            .copied()
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
