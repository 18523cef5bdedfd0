use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

use crate::config::Config;

/// 数据库连接池类型
pub type DBPool = sqlx::PgPool;

/// 建表语句，启动时执行
const SCHEMA: &str = include_str!("../../sql/01-CREATE_TABLE.sql");

const MAX_CONNECTIONS: u32 = 10;
const MIN_CONNECTIONS: u32 = 2;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_LIFETIME: Duration = Duration::from_secs(25 * 60);

/// 根据 [`Config`] 创建数据库连接池，取连接前先检测连接是否可用
pub async fn connect(config: &Config) -> Result<DBPool, sqlx::Error> {
    let options = config.connect_options()?;

    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .min_connections(MIN_CONNECTIONS)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .idle_timeout(IDLE_TIMEOUT)
        .max_lifetime(MAX_LIFETIME)
        .test_before_acquire(true)
        .connect_with(options)
        .await?;

    tracing::info!(max_connections = MAX_CONNECTIONS, "database pool ready");
    Ok(pool)
}

/// 执行建表迁移
///
/// 将 [`SCHEMA`] 按 `;` 分割，每条 SQL 单独执行，所有语句均可重复执行
pub async fn migrate(db: &DBPool) -> Result<(), sqlx::Error> {
    for sql in statements(SCHEMA) {
        sqlx::query(sql).execute(db).await?;
    }
    tracing::info!("schema migrated");
    Ok(())
}

fn statements(content: &str) -> impl Iterator<Item = &str> {
    content.split(';').map(str::trim).filter(|sql| !sql.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements() {
        let sqls: Vec<_> = statements(SCHEMA).collect();

        assert!(sqls.iter().all(|s| !s.is_empty()));
        assert!(sqls.iter().any(|s| s.starts_with("CREATE TABLE IF NOT EXISTS news ")));
        assert!(sqls.iter().any(|s| s.starts_with("CREATE TABLE IF NOT EXISTS tags")));
        assert!(sqls.iter().any(|s| s.starts_with("CREATE TABLE IF NOT EXISTS news_tag")));
    }
}
