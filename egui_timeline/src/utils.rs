//! 工具函数模块
//!
//! 包含通用的工具函数，如时间格式化等。

/// 将时间（秒）格式化为 "MM:SS.mmm" 格式
///
/// # 示例
///
/// ```
/// use egui_timeline::utils::format_time;
///
/// let formatted = format_time(125.5);
/// assert_eq!(formatted, "02:05.500");
/// ```
pub fn format_time(time_seconds: f64) -> String {
    let millis_total = (time_seconds.max(0.0) * 1000.0).round() as u64;
    let minutes = millis_total / 60_000;
    let seconds = (millis_total / 1000) % 60;
    let milliseconds = millis_total % 1000;
    format!("{:02}:{:02}.{:03}", minutes, seconds, milliseconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_seconds_millis() {
        assert_eq!(format_time(0.0), "00:00.000");
        assert_eq!(format_time(62.5), "01:02.500");
        assert_eq!(format_time(0.1), "00:00.100");
        assert_eq!(format_time(-3.0), "00:00.000");
    }
}
