//! 核心模块 - 排队引擎配置
//!
//! - [`QueueConfig`] - 预估参数、业务日与时区
//! - [`DiningTimeTable`] - 按人数的平均用餐时长

pub mod config;

pub use config::{DiningTimeTable, QueueConfig};
