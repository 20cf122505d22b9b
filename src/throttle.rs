use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::config::ThrottleConfig;
use crate::metrics::METRICS;

/// 登录尝试限流策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottlePolicy {
    /// 窗口内同一账户允许的尝试次数，达到即封禁
    pub max_attempts: u32,
    /// 同一账户下单个来源地址允许的尝试次数
    pub max_attempts_per_source: u32,
    /// 触发封禁后的封禁时长
    pub block_duration: Duration,
    /// 滑动窗口：超过该时长没有新尝试则计数清零
    pub window: Duration,
    /// 两次清理过期记录之间的最小间隔
    pub cleanup_interval: Duration,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            max_attempts_per_source: 10,
            block_duration: Duration::from_secs(60),
            window: Duration::from_secs(60),
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl From<&ThrottleConfig> for ThrottlePolicy {
    fn from(cfg: &ThrottleConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts,
            max_attempts_per_source: cfg.max_attempts_per_source,
            block_duration: Duration::from_secs(cfg.block_duration_seconds),
            window: Duration::from_secs(cfg.window_seconds),
            cleanup_interval: Duration::from_secs(cfg.cleanup_interval_seconds),
        }
    }
}

/// 单个账户的尝试记录
struct AttemptRecord {
    attempt_count: u32,
    last_attempt: Instant,
    blocked_until: Option<Instant>,
    per_source: HashMap<String, u32>,
}

impl AttemptRecord {
    fn new(now: Instant) -> Self {
        Self {
            attempt_count: 0,
            last_attempt: now,
            blocked_until: None,
            per_source: HashMap::new(),
        }
    }

    fn is_blocked(&self, now: Instant) -> bool {
        self.blocked_until.is_some_and(|until| until > now)
    }
}

// 封禁时长过大时 Instant 加法会溢出，退化为一个足够远的截止时间
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

fn block_deadline(now: Instant, block_duration: Duration) -> Instant {
    now.checked_add(block_duration)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

struct Registry {
    records: HashMap<String, AttemptRecord>,
    last_sweep: Instant,
}

/// 某个账户当前状态的只读快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptSnapshot {
    pub attempt_count: u32,
    pub blocked: bool,
    pub per_source: HashMap<String, u32>,
}

/// 登录尝试限流器
///
/// 按账户（邮箱）和来源地址两个维度统计登录尝试，超过阈值后临时封禁。
/// 所有状态由一把互斥锁保护，临界区内不做任何 IO，也不会跨 `.await` 持有。
/// 过期记录在调用 [`LoginThrottle::evaluate`] 时顺带清理，不需要后台任务。
///
/// 注意：统计的是"尝试"而不是"失败"，登录成功同样消耗次数。
pub struct LoginThrottle {
    state: Mutex<Registry>,
    policy: ThrottlePolicy,
}

impl LoginThrottle {
    pub fn new(policy: ThrottlePolicy) -> Self {
        Self {
            state: Mutex::new(Registry {
                records: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            policy,
        }
    }

    pub fn policy(&self) -> &ThrottlePolicy {
        &self.policy
    }

    /// 记录一次登录尝试并给出判定，返回 `true` 表示应当拒绝
    pub fn evaluate(&self, identity: &str, source: &str) -> bool {
        self.evaluate_at(identity, source, Instant::now())
    }

    pub(crate) fn evaluate_at(&self, identity: &str, source: &str, now: Instant) -> bool {
        let policy = &self.policy;
        let mut registry = self.lock();

        if now.saturating_duration_since(registry.last_sweep) > policy.cleanup_interval {
            self.sweep(&mut registry, now);
        }

        let record = registry
            .records
            .entry(identity.to_string())
            .or_insert_with(|| AttemptRecord::new(now));

        if now.saturating_duration_since(record.last_attempt) > policy.window {
            record.attempt_count = 0;
        }

        // 封禁期内的尝试不再计数
        if record.is_blocked(now) {
            tracing::debug!("账户 {} 处于封禁期，拒绝登录尝试 (来源: {})", identity, source);
            METRICS.throttle_blocked.inc();
            return true;
        }

        record.attempt_count = record.attempt_count.saturating_add(1);
        record.last_attempt = now;

        let source_count = {
            let count = record.per_source.entry(source.to_string()).or_insert(0);
            *count = count.saturating_add(1);
            *count
        };

        if record.attempt_count >= policy.max_attempts {
            let until = block_deadline(now, policy.block_duration);
            // blocked_until 只能向后推
            record.blocked_until = Some(record.blocked_until.map_or(until, |prev| prev.max(until)));
            tracing::warn!(
                "账户 {} 在窗口内尝试 {} 次，封禁 {} 秒",
                identity,
                record.attempt_count,
                policy.block_duration.as_secs()
            );
        }

        let blocked = source_count >= policy.max_attempts_per_source || record.is_blocked(now);
        if blocked {
            tracing::debug!(
                "拒绝账户 {} 的登录尝试: 总计 {} 次, 来源 {} 计 {} 次",
                identity,
                record.attempt_count,
                source,
                source_count
            );
            METRICS.throttle_blocked.inc();
        }

        blocked
    }

    /// 查看某个账户的当前记录
    pub fn snapshot(&self, identity: &str) -> Option<AttemptSnapshot> {
        let now = Instant::now();
        let registry = self.lock();
        registry.records.get(identity).map(|record| AttemptSnapshot {
            attempt_count: record.attempt_count,
            blocked: record.is_blocked(now),
            per_source: record.per_source.clone(),
        })
    }

    pub fn tracked_identities(&self) -> usize {
        self.lock().records.len()
    }

    /// 清理窗口内没有活动的记录，仍在封禁期的记录保留
    fn sweep(&self, registry: &mut Registry, now: Instant) {
        let window = self.policy.window;
        let before = registry.records.len();

        registry.records.retain(|_, record| {
            now.saturating_duration_since(record.last_attempt) <= window || record.is_blocked(now)
        });
        registry.last_sweep = now;

        let remaining = registry.records.len();
        let cleaned = before - remaining;
        if cleaned > 0 {
            tracing::debug!("LoginThrottle 清理了 {} 条过期记录，剩余 {} 条", cleaned, remaining);
        }
        METRICS.throttle_tracked_identities.set(remaining as i64);
    }

    // 临界区内的每一步都保持记录一致，锁中毒时直接继续使用
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
