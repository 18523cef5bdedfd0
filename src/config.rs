use std::{env, net::SocketAddr, str::FromStr};

use sqlx::postgres::{PgConnectOptions, PgSslMode};

/// 服务监听端口
pub const PORT: u16 = 8080;

/// 日志过滤规则所在的环境变量
pub const LOG_ENV: &str = "NEWS_TOPIC_LOG";

/// 数据库连接配置
///
/// 优先使用 `DATABASE_URL`，未设置时由 `postgres_*` 系列变量拼装。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub username: String,
    pub password: String,
    pub dbname: String,
    pub host: String,
    /// 完整连接串，设置后覆盖上面四项
    pub database_url: Option<String>,
    /// HTTP 监听端口，固定为 [`PORT`]
    pub port: u16,
}

impl Config {
    /// 从进程环境变量读取配置
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 通过任意查找函数读取配置，缺省值与环境变量版本一致
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            username: get("postgres_username", "postgres"),
            password: get("postgres_password", "postgres"),
            dbname: get("postgres_dbname", "postgres"),
            host: get("postgres_host", "localhost"),
            database_url: lookup("DATABASE_URL").filter(|v| !v.is_empty()),
            port: PORT,
        }
    }

    /// 生成 [`PgConnectOptions`]
    ///
    /// `DATABASE_URL` 格式错误时返回 [`sqlx::Error::Configuration`]。
    pub fn connect_options(&self) -> Result<PgConnectOptions, sqlx::Error> {
        match &self.database_url {
            Some(url) => PgConnectOptions::from_str(url),
            None => Ok(PgConnectOptions::new()
                .username(&self.username)
                .password(&self.password)
                .database(&self.dbname)
                .host(&self.host)
                .ssl_mode(PgSslMode::Disable)),
        }
    }

    /// 监听所有网卡上的 [`Config::port`]
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}
