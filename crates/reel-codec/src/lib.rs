//! # reel-codec
//!
//! 编解码器描述与压缩数据包定义.
//!
//! 真正的解码由外部库完成, 本 crate 只描述"有哪些解码器可用",
//! 以及在解复用器与消费者之间传递的 `Packet`.
//!
//! ```rust
//! use reel_codec::{CodecId, CodecRegistry};
//!
//! let mut reg = CodecRegistry::new();
//! reel_codec::register_all(&mut reg);
//! assert!(reg.find_decoder(CodecId::H264).is_ok());
//! ```

pub mod codec_id;
pub mod packet;
pub mod registry;

// 重导出常用类型
pub use codec_id::CodecId;
pub use packet::Packet;
pub use registry::{CodecRegistry, DecoderDescriptor};

/// 注册所有已知编解码器的解码器描述
///
/// `CodecId::None` 不会被注册, 使用它的流在分类时会失败.
pub fn register_all(registry: &mut CodecRegistry) {
    for id in CodecId::ALL {
        if *id != CodecId::None {
            registry.register_decoder(*id);
        }
    }
}
