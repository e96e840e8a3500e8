//! Queue Module - 排队核心
//!
//! # 模块结构
//!
//! - [`ranking`] - 等待集合排序与队号重排
//! - [`estimator`] - 等待时间预估策略链
//! - [`query`] - 只读查询（位置、统计、展示文案）
//! - [`manager`] - 串行化的生命周期命令与事件广播

pub mod estimator;
pub mod manager;
pub mod query;
pub mod ranking;

pub use estimator::{EstimateSource, WaitEstimate, WaitTimeEstimator, WaitTimeStrategy};
pub use manager::{ManagerError, ManagerResult, QueueManager};
pub use query::{QueueQuery, format_wait_time};
pub use ranking::RankedQueue;
