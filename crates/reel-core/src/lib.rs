//! # reel-core
//!
//! Reel 解复用框架核心库, 提供基础类型定义和统一错误处理.
//!
//! 其余 crate 共用这里的 `ReelError`, `MediaType`, `Rational` 与 `Timestamp`.

pub mod error;
pub mod media_type;
pub mod rational;
pub mod timestamp;

// 重导出常用类型
pub use error::{ReelError, ReelResult};
pub use media_type::MediaType;
pub use rational::Rational;
pub use timestamp::Timestamp;
