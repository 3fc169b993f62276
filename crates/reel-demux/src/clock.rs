//! 播放时钟.
//!
//! 多个组件共享同一个时钟: 它维护播放状态与播放位置, 并把定位与
//! 状态变化通过 channel 通知给观察者. 观察者自行轮询, 时钟不持有
//! 任何观察者对象.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// 时钟状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockStatus {
    Stopped,
    Playing,
    Paused,
}

/// 时钟事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// 播放位置被跳转
    Seek(Duration),
    /// 播放状态改变
    StatusChanged(ClockStatus),
}

/// 观察者句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// 播放时钟 (线程安全, 克隆后共享同一状态)
#[derive(Clone)]
pub struct PlaybackClock {
    inner: Arc<ClockInner>,
}

struct ClockInner {
    state: Mutex<ClockState>,
    next_observer: AtomicU64,
}

struct ClockState {
    status: ClockStatus,
    /// 最近一次开始播放前累计的播放位置
    base_offset: Duration,
    /// 最近一次开始播放的系统时间
    resumed_at: Option<Instant>,
    observers: Vec<(ObserverId, Sender<ClockEvent>)>,
}

impl ClockState {
    fn offset(&self) -> Duration {
        match self.resumed_at {
            Some(t) => self.base_offset + t.elapsed(),
            None => self.base_offset,
        }
    }

    /// 通知所有观察者, 顺带移除已断开的接收端
    fn notify(&mut self, event: ClockEvent) {
        self.observers.retain(|(_, tx)| tx.send(event).is_ok());
    }
}

impl PlaybackClock {
    /// 创建处于停止状态的时钟
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ClockInner {
                state: Mutex::new(ClockState {
                    status: ClockStatus::Stopped,
                    base_offset: Duration::ZERO,
                    resumed_at: None,
                    observers: Vec::new(),
                }),
                next_observer: AtomicU64::new(1),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ClockState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// 当前状态
    pub fn status(&self) -> ClockStatus {
        self.lock().status
    }

    /// 开始或恢复播放
    pub fn play(&self) {
        let mut state = self.lock();
        if state.status == ClockStatus::Playing {
            return;
        }
        state.status = ClockStatus::Playing;
        state.resumed_at = Some(Instant::now());
        state.notify(ClockEvent::StatusChanged(ClockStatus::Playing));
    }

    /// 暂停, 保留当前位置
    pub fn pause(&self) {
        let mut state = self.lock();
        if state.status != ClockStatus::Playing {
            return;
        }
        state.base_offset = state.offset();
        state.resumed_at = None;
        state.status = ClockStatus::Paused;
        state.notify(ClockEvent::StatusChanged(ClockStatus::Paused));
    }

    /// 停止并回到开头
    pub fn stop(&self) {
        let mut state = self.lock();
        if state.status == ClockStatus::Stopped {
            return;
        }
        state.base_offset = Duration::ZERO;
        state.resumed_at = None;
        state.status = ClockStatus::Stopped;
        state.notify(ClockEvent::Seek(Duration::ZERO));
        state.notify(ClockEvent::StatusChanged(ClockStatus::Stopped));
    }

    /// 跳转到指定位置, 不改变播放状态
    pub fn seek(&self, position: Duration) {
        let mut state = self.lock();
        state.base_offset = position;
        if state.resumed_at.is_some() {
            state.resumed_at = Some(Instant::now());
        }
        state.notify(ClockEvent::Seek(position));
    }

    /// 当前播放位置
    pub fn playing_offset(&self) -> Duration {
        self.lock().offset()
    }

    /// 注册观察者, 返回句柄与事件接收端
    pub fn add_observer(&self) -> (ObserverId, Receiver<ClockEvent>) {
        let id = ObserverId(self.inner.next_observer.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel();
        self.lock().observers.push((id, tx));
        (id, rx)
    }

    /// 注销观察者, 之后不会再收到事件
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let mut state = self.lock();
        let before = state.observers.len();
        state.observers.retain(|(oid, _)| *oid != id);
        state.observers.len() != before
    }

    /// 已注册的观察者数量
    pub fn observer_count(&self) -> usize {
        self.lock().observers.len()
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}
