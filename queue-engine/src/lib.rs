//! Queue Engine - 餐厅现场排队叫号核心
//!
//! # 架构概述
//!
//! Walk-in customers register at a kiosk, get a priority-aware queue
//! number and a wait estimate, and move through
//! `waiting → called → seated → completed` (or leave early as
//! `cancelled` / `no_show`).
//!
//! - **排序** (`queue::ranking`): priority tier, then registration time
//! - **预估** (`queue::estimator`): table-aware model with simple fallback
//! - **命令** (`queue::manager`): serialised lifecycle transitions
//! - **查询** (`queue::query`): position, stats, display buckets
//! - **存储** (`store`): in-memory and embedded redb stores
//!
//! # 模块结构
//!
//! ```text
//! queue-engine/src/
//! ├── core/          # 配置
//! ├── queue/         # 排序、预估、命令、查询
//! ├── store/         # 存储契约与实现
//! └── utils/         # 日志、业务日
//! ```

pub mod core;
pub mod queue;
pub mod store;
pub mod utils;

// Re-export 公共类型
pub use core::{DiningTimeTable, QueueConfig};
pub use queue::{
    EstimateSource, ManagerError, ManagerResult, QueueManager, QueueQuery, WaitEstimate,
    format_wait_time,
};
pub use store::{CustomerStore, MemoryStore, RedbStore, StoreError, TableProvider};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
