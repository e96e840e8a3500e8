use chrono::NaiveTime;
use chrono_tz::Tz;

use crate::utils::time;

/// 排队引擎配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | QUEUE_CONCURRENT_CAPACITY | 10 | 同时服务的桌数/服务位 |
/// | QUEUE_AVG_SERVICE_MINUTES | 5 | 每批次平均服务时间(分钟) |
/// | QUEUE_MIN_WAIT_MINUTES | 5 | 预估等待下限 |
/// | QUEUE_MAX_WAIT_MINUTES | 120 | 预估等待上限 |
/// | QUEUE_TURNOVER_WINDOW_MINUTES | 60 | 翻台率统计窗口 |
/// | QUEUE_TABLE_AWARE_CAP_MINUTES | 60 | 桌台模型上限 |
/// | QUEUE_SANITY_THRESHOLD_MINUTES | 45 | 超过则与简单模型取小 |
/// | QUEUE_MAX_PARTY_SIZE | 20 | 单组最大人数 |
/// | QUEUE_TIMEZONE | Asia/Manila | 业务时区 |
/// | QUEUE_BUSINESS_DAY_CUTOFF | 04:00 | 营业日分界 (HH:MM) |
/// | QUEUE_TABLE_AWARE | true | 是否启用桌台模型 |
///
/// # 示例
///
/// ```ignore
/// QUEUE_CONCURRENT_CAPACITY=6 QUEUE_TIMEZONE=Asia/Singapore cargo run
/// ```
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Service slots available simultaneously (simple model divisor)
    pub concurrent_capacity: u32,
    /// Minutes per served batch (simple model)
    pub avg_service_minutes: u32,
    pub min_wait_minutes: u32,
    pub max_wait_minutes: u32,
    /// Trailing window used for the turnover rate
    pub turnover_window_minutes: u32,
    pub table_aware_cap_minutes: u32,
    /// Above this the table-aware estimate is checked against the simple one
    pub sanity_threshold_minutes: u32,
    pub max_party_size: u32,
    pub timezone: Tz,
    pub business_day_cutoff: NaiveTime,
    pub table_aware_enabled: bool,
    pub dining_times: DiningTimeTable,
}

impl QueueConfig {
    /// 从环境变量加载配置
    ///
    /// 未设置或无法解析时使用默认值
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            concurrent_capacity: env_parse("QUEUE_CONCURRENT_CAPACITY")
                .filter(|v| *v > 0)
                .unwrap_or(defaults.concurrent_capacity),
            avg_service_minutes: env_parse("QUEUE_AVG_SERVICE_MINUTES")
                .unwrap_or(defaults.avg_service_minutes),
            min_wait_minutes: env_parse("QUEUE_MIN_WAIT_MINUTES")
                .unwrap_or(defaults.min_wait_minutes),
            max_wait_minutes: env_parse("QUEUE_MAX_WAIT_MINUTES")
                .unwrap_or(defaults.max_wait_minutes),
            turnover_window_minutes: env_parse("QUEUE_TURNOVER_WINDOW_MINUTES")
                .filter(|v| *v > 0)
                .unwrap_or(defaults.turnover_window_minutes),
            table_aware_cap_minutes: env_parse("QUEUE_TABLE_AWARE_CAP_MINUTES")
                .unwrap_or(defaults.table_aware_cap_minutes),
            sanity_threshold_minutes: env_parse("QUEUE_SANITY_THRESHOLD_MINUTES")
                .unwrap_or(defaults.sanity_threshold_minutes),
            max_party_size: env_parse("QUEUE_MAX_PARTY_SIZE")
                .filter(|v| *v > 0)
                .unwrap_or(defaults.max_party_size),
            timezone: env_parse("QUEUE_TIMEZONE").unwrap_or(defaults.timezone),
            business_day_cutoff: std::env::var("QUEUE_BUSINESS_DAY_CUTOFF")
                .ok()
                .map(|s| time::parse_cutoff(&s))
                .unwrap_or(defaults.business_day_cutoff),
            table_aware_enabled: env_parse("QUEUE_TABLE_AWARE")
                .unwrap_or(defaults.table_aware_enabled),
            dining_times: defaults.dining_times,
        }
    }

    /// Clamp a minutes value into the displayable range
    pub fn clamp_wait(&self, minutes: u32) -> u32 {
        minutes.clamp(self.min_wait_minutes, self.max_wait_minutes.max(self.min_wait_minutes))
    }

    /// Turnover window in Unix millis
    pub fn turnover_window_millis(&self) -> i64 {
        i64::from(self.turnover_window_minutes) * 60_000
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrent_capacity: 10,
            avg_service_minutes: 5,
            min_wait_minutes: 5,
            max_wait_minutes: 120,
            turnover_window_minutes: 60,
            table_aware_cap_minutes: 60,
            sanity_threshold_minutes: 45,
            max_party_size: 20,
            timezone: chrono_tz::Asia::Manila,
            business_day_cutoff: NaiveTime::from_hms_opt(4, 0, 0).unwrap_or(NaiveTime::MIN),
            table_aware_enabled: true,
            dining_times: DiningTimeTable::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// 平均用餐时长 (按人数)
///
/// Brackets are `(max_party_size, minutes)` sorted ascending; parties
/// larger than the last bracket use `fallback_minutes`.
#[derive(Debug, Clone, PartialEq)]
pub struct DiningTimeTable {
    pub brackets: Vec<(u32, u32)>,
    pub fallback_minutes: u32,
}

impl DiningTimeTable {
    pub fn new(mut brackets: Vec<(u32, u32)>, fallback_minutes: u32) -> Self {
        brackets.sort_by_key(|(size, _)| *size);
        Self {
            brackets,
            fallback_minutes,
        }
    }

    /// Average dining minutes for a party of `party_size`
    pub fn minutes_for(&self, party_size: u32) -> u32 {
        self.brackets
            .iter()
            .find(|(max_size, _)| party_size <= *max_size)
            .map(|(_, minutes)| *minutes)
            .unwrap_or(self.fallback_minutes)
    }
}

impl Default for DiningTimeTable {
    fn default() -> Self {
        Self::new(vec![(1, 15), (2, 20), (4, 25), (7, 30)], 35)
    }
}
