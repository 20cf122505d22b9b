use once_cell::sync::Lazy;
use prometheus::{Counter, CounterVec, Encoder, IntGauge, Opts, Registry, TextEncoder};

pub struct Metrics {
    pub registry: Registry,
    pub login_attempts: CounterVec,
    pub throttle_blocked: Counter,
    pub throttle_tracked_identities: IntGauge,
}

impl Metrics {
    fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let login_attempts = CounterVec::new(
            Opts::new("login_attempts_total", "Login attempts grouped by account kind and result"),
            &["kind", "result"],
        )?;
        registry.register(Box::new(login_attempts.clone()))?;

        let throttle_blocked = Counter::new(
            "throttle_blocked_total",
            "Login attempts rejected by the login throttle",
        )?;
        registry.register(Box::new(throttle_blocked.clone()))?;

        let throttle_tracked_identities = IntGauge::new(
            "throttle_tracked_identities",
            "Identities tracked by the login throttle after the last sweep",
        )?;
        registry.register(Box::new(throttle_tracked_identities.clone()))?;

        Ok(Self {
            registry,
            login_attempts,
            throttle_blocked,
            throttle_tracked_identities,
        })
    }

    pub fn render(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder.encode(&metric_families, &mut buffer).map_err(|e| e.to_string())?;
        String::from_utf8(buffer).map_err(|e| e.to_string())
    }

    pub fn record_login(&self, kind: &str, result: &str) {
        self.login_attempts.with_label_values(&[kind, result]).inc();
    }
}

// 指标名都是常量，注册失败只可能是重复注册
pub static METRICS: Lazy<Metrics> =
    Lazy::new(|| Metrics::new().expect("metrics registry initialisation failed"));
