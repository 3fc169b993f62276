//! 待分发数据包队列.
//!
//! 保存已从容器读出, 但当前请求者不是其所属流的数据包.
//! 按插入顺序保存, 支持按条件取出第一个匹配项.
//!
//! 队列没有容量上限: 内存占用取决于容器的交错粒度和消费者的拉取节奏.

use std::collections::VecDeque;

use reel_codec::Packet;

/// 待分发数据包队列 (FIFO + 条件取出)
#[derive(Debug, Default)]
pub struct PacketQueue {
    packets: VecDeque<Packet>,
}

impl PacketQueue {
    /// 创建空队列
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加到队尾, 队列接管数据包所有权
    pub fn push_back(&mut self, packet: Packet) {
        self.packets.push_back(packet);
    }

    /// 按插入顺序扫描, 取出第一个满足条件的数据包
    pub fn take_first_matching<F>(&mut self, mut predicate: F) -> Option<Packet>
    where
        F: FnMut(&Packet) -> bool,
    {
        let pos = self.packets.iter().position(|p| predicate(p))?;
        self.packets.remove(pos)
    }

    /// 取出全部数据包, 返回被释放的数量
    pub fn drain_all(&mut self) -> usize {
        let count = self.packets.len();
        self.packets.clear();
        count
    }

    /// 当前数据包数量
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }
}
