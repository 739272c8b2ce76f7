//! 轮询间隔计算
//!
//! 上游每 5 分钟刷新一次数据，而配额是每台设备每天 200 次请求（平均约
//! 7.2 分钟一次）。轮询在 5 分钟和 10 分钟两种基础间隔之间交替，长期平均
//! 低于配额，再根据读数时间戳与本地时钟的差值微调，尽量贴近上游刷新时刻。

use rand::Rng;
use std::time::Duration;

/// 每台设备每天允许的请求数
pub const REQUESTS_PER_DEVICE_PER_DAY: u32 = 200;

const MINUTE_MS: i64 = 60 * 1000;

/// 较短的基础间隔
pub const SHORT_BASE_MS: i64 = 5 * MINUTE_MS;

/// 较长的基础间隔
pub const LONG_BASE_MS: i64 = 10 * MINUTE_MS;

/// 上一次间隔超过该值时下一次取短间隔
pub const ALTERNATION_THRESHOLD_MS: i64 = 15 * MINUTE_MS / 2;

/// 上游数据刷新周期
pub const REFRESH_PERIOD_MS: i64 = 5 * MINUTE_MS;

/// 失败重试的最大随机等待
pub const MAX_BACKOFF_MS: u64 = 10 * 60 * 1000;

/// 一次间隔计算的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextDelay {
    /// 调整后的等待时间（已截断为非负）
    pub delay: Duration,

    /// 本地时钟与读数时间戳的差值（毫秒），异常时已归零
    pub delta_ms: i64,

    /// 原始差值是否超过一个刷新周期而被归零
    pub clock_skew: bool,
}

/// 成功轮询后计算下一次等待时间
///
/// * `previous` - 上一次（调整后）的等待时间
/// * `now_ms` - 本地时钟（unix 毫秒）
/// * `reading_time_s` - 刚取回读数中的时间戳（unix 秒）
/// * `offset_secs` - 设备的固定错峰偏移
pub fn next_delay(
    previous: Duration,
    now_ms: i64,
    reading_time_s: i64,
    offset_secs: i64,
) -> NextDelay {
    let previous_ms = i64::try_from(previous.as_millis()).unwrap_or(i64::MAX);
    let base = if previous_ms > ALTERNATION_THRESHOLD_MS {
        SHORT_BASE_MS
    } else {
        LONG_BASE_MS
    };

    let mut delta = now_ms.saturating_sub(reading_time_s.saturating_mul(1000));
    let clock_skew = delta > REFRESH_PERIOD_MS;
    if clock_skew {
        delta = 0;
    }

    let aligned = if delta < REFRESH_PERIOD_MS / 2 {
        // 读数很新，下一次刷新快到了
        base - delta
    } else {
        // 读数偏旧，等再下一次刷新
        base + REFRESH_PERIOD_MS - delta
    };

    let adjusted = aligned.saturating_sub(offset_secs.saturating_mul(1000));

    NextDelay {
        delay: Duration::from_millis(adjusted.max(0) as u64),
        delta_ms: delta,
        clock_skew,
    }
}

/// 失败后的随机等待，在 [0, 10 分钟] 内均匀分布
///
/// 每台设备各自取随机数，避免多台设备同时重试耗尽共享配额。
pub fn backoff_delay<R: Rng + ?Sized>(rng: &mut R) -> Duration {
    Duration::from_millis(rng.gen_range(0..=MAX_BACKOFF_MS))
}
