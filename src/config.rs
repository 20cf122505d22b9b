use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub throttle: ThrottleConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_cors_origin() -> String {
    "http://localhost:3001".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    pub token_ttl_seconds: u64,
}

/// 管理员登录限流参数，缺省值与 `ThrottlePolicy::default()` 一致
#[derive(Debug, Clone, Deserialize)]
pub struct ThrottleConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_max_attempts")]
    pub max_attempts_per_source: u32,
    #[serde(default = "default_throttle_seconds")]
    pub block_duration_seconds: u64,
    #[serde(default = "default_throttle_seconds")]
    pub window_seconds: u64,
    #[serde(default = "default_throttle_seconds")]
    pub cleanup_interval_seconds: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            max_attempts_per_source: default_max_attempts(),
            block_duration_seconds: default_throttle_seconds(),
            window_seconds: default_throttle_seconds(),
            cleanup_interval_seconds: default_throttle_seconds(),
        }
    }
}

fn default_max_attempts() -> u32 {
    10
}

fn default_throttle_seconds() -> u64 {
    60
}

impl ThrottleConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        let checks = [
            ("max_attempts", self.max_attempts as u64),
            ("max_attempts_per_source", self.max_attempts_per_source as u64),
            ("block_duration_seconds", self.block_duration_seconds),
            ("window_seconds", self.window_seconds),
            ("cleanup_interval_seconds", self.cleanup_interval_seconds),
        ];
        for (name, value) in checks {
            if value == 0 {
                anyhow::bail!("throttle.{} 必须大于 0", name);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
    /// 没有任何管理员时自动创建的初始管理员
    #[serde(default)]
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            bootstrap_admin: None,
        }
    }
}

fn default_data_file() -> PathBuf {
    PathBuf::from("data/accounts.json")
}

#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapAdmin {
    pub user_name: String,
    pub email: String,
    pub password: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        // 加载 .env 文件 (如果存在)
        let _ = dotenvy::dotenv();

        let config: Config = config::Config::builder()
            .add_source(config::File::with_name("config"))
            .build()?
            .try_deserialize()?;

        config.finish(env::var("JWT_SECRET").ok())
    }

    /// 应用环境变量覆盖并校验
    fn finish(mut self, jwt_secret: Option<String>) -> anyhow::Result<Self> {
        if let Some(secret) = jwt_secret {
            self.auth.jwt_secret = secret;
        }

        if self.auth.jwt_secret.is_empty() {
            anyhow::bail!("JWT_SECRET 未设置! 请在环境变量、.env 或 config.toml 中配置");
        }

        self.throttle.validate()?;

        Ok(self)
    }
}
