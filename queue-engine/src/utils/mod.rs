//! 工具模块 - 日志与业务日时间换算

pub mod logger;
pub mod time;
