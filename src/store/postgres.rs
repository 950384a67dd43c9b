use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use serde_json::Value as JsonValue;
use tokio_postgres::NoTls;

use super::{StoreBackend, StoreError};

/// Postgres backend: one table per entity kind, `id TEXT PRIMARY KEY`
/// plus a JSONB document column.
pub struct PostgresBackend {
    pool: Pool,
}

impl PostgresBackend {
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        let config = database_url
            .parse::<tokio_postgres::Config>()
            .map_err(|e| StoreError::InvalidConnectionString(e.to_string()))?;

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let manager = Manager::from_config(config, NoTls, manager_config);

        let pool = Pool::builder(manager)
            .max_size(16)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(StoreError::BuildError)?;

        let _conn = pool.get().await?;
        tracing::info!("Database connection pool created successfully");

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        super::migrations::run(&self.pool).await
    }
}

#[async_trait]
impl StoreBackend for PostgresBackend {
    async fn get(&self, kind: &str, id: &str) -> Result<Option<JsonValue>, StoreError> {
        let client = self.pool.get().await?;
        let row = client.query_opt(&build_get_sql(kind), &[&id]).await?;
        Ok(row.map(|r| r.get(0)))
    }

    async fn put(&self, kind: &str, id: &str, data: JsonValue) -> Result<(), StoreError> {
        let client = self.pool.get().await?;
        client.execute(&build_upsert_sql(kind), &[&id, &data]).await?;
        Ok(())
    }

    async fn ids(&self, kind: &str) -> Result<Vec<String>, StoreError> {
        let client = self.pool.get().await?;
        let rows = client.query(&build_ids_sql(kind), &[]).await?;
        Ok(rows.iter().map(|r| r.get(0)).collect())
    }
}

/// Wrap an identifier in double quotes to handle reserved keywords.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name)
}

fn build_get_sql(table: &str) -> String {
    format!("SELECT data FROM {} WHERE id = $1", quote_ident(table))
}

fn build_upsert_sql(table: &str) -> String {
    format!(
        "INSERT INTO {} (id, data) VALUES ($1, $2) ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data",
        quote_ident(table)
    )
}

fn build_ids_sql(table: &str) -> String {
    format!("SELECT id FROM {} ORDER BY id", quote_ident(table))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_sql_shape() {
        assert_eq!(
            build_upsert_sql("markets"),
            "INSERT INTO \"markets\" (id, data) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data"
        );
    }

    #[test]
    fn test_identifiers_are_quoted() {
        assert_eq!(
            build_get_sql("transactions"),
            "SELECT data FROM \"transactions\" WHERE id = $1"
        );
        assert_eq!(
            build_ids_sql("pools"),
            "SELECT id FROM \"pools\" ORDER BY id"
        );
    }
}
