//! 容器读取器实现.

pub mod flv;

use crate::format_id::FormatId;
use crate::registry::FormatRegistry;

/// 注册所有内置容器读取器与探测器
pub fn register_all_readers(registry: &mut FormatRegistry) {
    registry.register_reader(FormatId::Flv, "flv", flv::FlvReader::create);
    registry.register_probe(Box::new(flv::FlvProbe));
}
