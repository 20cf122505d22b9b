use chrono::{DateTime, FixedOffset, Offset, Utc};

/// 获取当前时间（东八区 UTC+8）
pub fn now_beijing() -> DateTime<FixedOffset> {
    let beijing = FixedOffset::east_opt(8 * 3600).unwrap_or_else(|| Utc.fix());
    Utc::now().with_timezone(&beijing)
}

/// 当前 Unix 时间戳（秒）
pub fn now_unix() -> i64 {
    Utc::now().timestamp()
}

/// 邮箱归一化：去掉首尾空白并转小写
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Admin@Example.COM "), "admin@example.com");
        assert_eq!(normalize_email(""), "");
    }

    #[test]
    fn test_now_beijing_offset() {
        assert_eq!(now_beijing().offset().local_minus_utc(), 8 * 3600);
    }
}
