use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::RwLock;

/// # Summary
/// 时间供给器接口，用于隔离物理系统时钟。
/// 实时预测会话的所有等待（分钟边界、失败退避）都必须经由此接口完成，
/// 以便测试中用虚拟时钟驱动整个会话。
#[async_trait]
pub trait TimeProvider: Send + Sync {
    /// 获取当前挂载的时间
    fn now(&self) -> DateTime<Utc>;

    /// # Summary
    /// 协作式挂起，直到挂载时间到达 `deadline`。
    ///
    /// # Logic
    /// 1. 若 `deadline` 已过去，立即返回。
    /// 2. 否则挂起当前任务（不得忙等）。
    async fn sleep_until(&self, deadline: DateTime<Utc>);
}

/// # Summary
/// 针对实盘运行的真实时钟，直接返回操作系统当前时间，等待交给 tokio 定时器。
pub struct RealTimeProvider;

#[async_trait]
impl TimeProvider for RealTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        if let Ok(wait) = (deadline - Utc::now()).to_std() {
            tokio::time::sleep(wait).await;
        }
    }
}

/// # Summary
/// 测试与回放专用虚拟时钟，`sleep_until` 直接把时间拨到目标时刻。
///
/// # Invariants
/// - 时间只会前进：`sleep_until` 不会把时钟回拨。
/// - 并发安全：内部利用 `RwLock` 提供多线程安全的读写。
pub struct FakeClockProvider {
    current_time: RwLock<DateTime<Utc>>,
}

impl FakeClockProvider {
    /// 使用指定的初始时间创建虚拟时钟
    pub fn new(initial_time: DateTime<Utc>) -> Self {
        Self {
            current_time: RwLock::new(initial_time),
        }
    }
}

#[async_trait]
impl TimeProvider for FakeClockProvider {
    fn now(&self) -> DateTime<Utc> {
        *self
            .current_time
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        let mut time = self
            .current_time
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if deadline > *time {
            *time = deadline;
        }
    }
}
