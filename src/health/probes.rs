//! Probes for the gateway's critical dependencies.
//!
//! Both wrap process-wide handles created at startup; the probes only borrow
//! them for a ping and never own their lifecycle.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;

use super::HealthProbe;

/// Component name reported for the primary datastore
pub const DATASTORE_COMPONENT: &str = "database_postgres";

/// Component name reported for the cache/broker
pub const CACHE_COMPONENT: &str = "cache_broker_redis";

/// Primary datastore liveness: `SELECT 1` on a pooled connection.
#[derive(Clone)]
pub struct PostgresProbe {
    pool: PgPool,
}

impl PostgresProbe {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthProbe for PostgresProbe {
    fn component(&self) -> &str {
        DATASTORE_COMPONENT
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("postgres ping failed")?;
        Ok(())
    }
}

/// Cache/broker liveness: `PING` over a multiplexed connection.
#[derive(Clone)]
pub struct RedisProbe {
    client: redis::Client,
}

impl RedisProbe {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    /// Open a client from a connection URL. Does not connect yet.
    pub fn open(connection_url: &str) -> Result<Self> {
        let client = redis::Client::open(connection_url)
            .with_context(|| format!("invalid redis url '{}'", connection_url))?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl HealthProbe for RedisProbe {
    fn component(&self) -> &str {
        CACHE_COMPONENT
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .context("redis connection failed")?;
        let reply: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .context("redis ping failed")?;
        if reply != "PONG" {
            return Err(anyhow!("unexpected PING reply '{}'", reply));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redis_probe_rejects_bad_url() {
        assert!(RedisProbe::open("not a url").is_err());
    }

    #[test]
    fn redis_probe_reports_component() {
        let probe = RedisProbe::open("redis://127.0.0.1:6379").unwrap();
        assert_eq!(probe.component(), CACHE_COMPONENT);
    }

    #[tokio::test]
    async fn postgres_probe_reports_unreachable_database() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_millis(200))
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap();
        let probe = PostgresProbe::new(pool);
        assert_eq!(probe.component(), DATASTORE_COMPONENT);
        assert!(probe.ping().await.is_err());
    }
}
