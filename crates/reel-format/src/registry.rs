//! 容器格式注册表.
//!
//! 管理所有已注册的容器读取器, 支持按格式标识创建和自动探测.

use std::collections::HashMap;
use std::io::SeekFrom;

use reel_core::{ReelError, ReelResult};

use crate::format_id::FormatId;
use crate::io::IoContext;
use crate::probe::{FormatProbe, ProbeResult};
use crate::reader::ContainerReader;

/// 读取器工厂函数类型
pub type ReaderFactory = fn() -> ReelResult<Box<dyn ContainerReader>>;

/// 探测时最多读取的头部字节数
const PROBE_SIZE: usize = 8192;

/// 容器格式注册表
pub struct FormatRegistry {
    readers: HashMap<FormatId, ReaderEntry>,
    probes: Vec<Box<dyn FormatProbe>>,
}

struct ReaderEntry {
    name: String,
    factory: ReaderFactory,
}

impl FormatRegistry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self {
            readers: HashMap::new(),
            probes: Vec::new(),
        }
    }

    /// 注册一个容器读取器
    pub fn register_reader(
        &mut self,
        format_id: FormatId,
        name: impl Into<String>,
        factory: ReaderFactory,
    ) {
        self.readers.insert(
            format_id,
            ReaderEntry {
                name: name.into(),
                factory,
            },
        );
    }

    /// 注册一个格式探测器
    pub fn register_probe(&mut self, probe: Box<dyn FormatProbe>) {
        self.probes.push(probe);
    }

    /// 创建指定格式的读取器实例
    pub fn create_reader(&self, format_id: FormatId) -> ReelResult<Box<dyn ContainerReader>> {
        let entry = self.readers.get(&format_id).ok_or_else(|| {
            ReelError::FormatNotFound(format!("未找到 {format_id} 的读取器"))
        })?;
        (entry.factory)()
    }

    /// 探测数据的容器格式, 返回置信度最高的结果
    pub fn probe(&self, data: &[u8], filename: Option<&str>) -> Option<ProbeResult> {
        let mut best: Option<ProbeResult> = None;
        for probe in &self.probes {
            if let Some(score) = probe.probe(data, filename) {
                if best.as_ref().is_none_or(|b| score > b.score) {
                    best = Some(ProbeResult {
                        format_id: probe.format_id(),
                        score,
                    });
                }
            }
        }
        best
    }

    /// 列出所有已注册的读取器: (格式, 名称, 完整名称)
    pub fn list_readers(&self) -> Vec<(FormatId, &str, &'static str)> {
        self.readers
            .iter()
            .map(|(id, entry)| (*id, entry.name.as_str(), id.long_name()))
            .collect()
    }

    /// 探测输入格式, 完成后回到起始位置
    pub fn probe_input(
        &self,
        io: &mut IoContext,
        filename: Option<&str>,
    ) -> ReelResult<ProbeResult> {
        let probe_size = io
            .size()
            .map_or(PROBE_SIZE, |s| (s as usize).min(PROBE_SIZE));
        let mut head = Vec::with_capacity(probe_size);
        for _ in 0..probe_size {
            match io.read_u8() {
                Ok(b) => head.push(b),
                Err(ReelError::Eof) => break,
                Err(e) => return Err(e),
            }
        }
        io.seek(SeekFrom::Start(0))?;

        self.probe(&head, filename)
            .ok_or_else(|| ReelError::FormatNotFound("无法识别输入文件格式".into()))
    }

    /// 探测格式, 创建读取器并解析头部
    pub fn open_reader(
        &self,
        io: &mut IoContext,
        filename: Option<&str>,
    ) -> ReelResult<Box<dyn ContainerReader>> {
        let result = self.probe_input(io, filename)?;
        log::debug!("探测到格式 {} (置信度 {})", result.format_id, result.score);
        let mut reader = self.create_reader(result.format_id)?;
        reader.open(io)?;
        Ok(reader)
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}
