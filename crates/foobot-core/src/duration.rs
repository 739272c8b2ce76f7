use std::time::Duration;

const UNITS: [(&str, u64); 5] = [
    ("w", 7 * 24 * 60 * 60 * 1000),
    ("d", 24 * 60 * 60 * 1000),
    ("h", 60 * 60 * 1000),
    ("m", 60 * 1000),
    ("s", 1000),
];

/// 日志用的可读时长，例如 `1h 2m 3s 40ms`
pub fn format_duration(duration: Duration) -> String {
    format_millis(i64::try_from(duration.as_millis()).unwrap_or(i64::MAX))
}

/// 同 [`format_duration`]，允许负值（时钟差可能为负）
pub fn format_millis(millis: i64) -> String {
    let mut parts = Vec::new();
    let mut remainder = millis.unsigned_abs();

    for (suffix, unit) in UNITS {
        if remainder >= unit {
            parts.push(format!("{}{}", remainder / unit, suffix));
            remainder %= unit;
        }
    }
    parts.push(format!("{}ms", remainder));

    let formatted = parts.join(" ");
    if millis < 0 {
        format!("-{}", formatted)
    } else {
        formatted
    }
}
