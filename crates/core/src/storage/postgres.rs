use crate::domain::BrokerRecord;
use crate::storage::source::BrokerSource;
use anyhow::{Context, Result};

const SELECT_BROKER: &str = "SELECT code::text AS code, COALESCE(broker, '') AS broker, \
     total_score::float8 AS total_score, register_country, operating_period, official_link, logo, \
     license_info::text AS license_info, account_info::text AS account_info, \
     whychose::text AS whychose, safe::text AS safe, pros::text AS pros, faq::text AS faq \
     FROM broker_data_web";

/// Reads `broker_data_web` directly.
#[derive(Debug, Clone)]
pub struct PgBrokerSource {
    pool: sqlx::PgPool,
}

impl PgBrokerSource {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connect DATABASE_URL failed")?;
        Ok(Self::new(pool))
    }
}

#[async_trait::async_trait]
impl BrokerSource for PgBrokerSource {
    fn source_name(&self) -> &'static str {
        "postgres"
    }

    async fn fetch_all(&self) -> Result<Vec<BrokerRecord>> {
        let sql = format!("{SELECT_BROKER} ORDER BY total_score DESC NULLS LAST");
        let rows = sqlx::query_as::<_, BrokerRecord>(&sql)
            .persistent(false)
            .fetch_all(&self.pool)
            .await
            .context("select broker_data_web failed")?;
        Ok(rows)
    }

    async fn fetch_by_code(&self, code: &str) -> Result<Option<BrokerRecord>> {
        let by_code = format!("{SELECT_BROKER} WHERE code::text = $1 LIMIT 1");
        let row = sqlx::query_as::<_, BrokerRecord>(&by_code)
            .persistent(false)
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("select broker by code failed (code={code})"))?;
        if row.is_some() {
            return Ok(row);
        }

        // Links built from the display name: "IC Markets" is routed as "ic-markets".
        let by_name =
            format!("{SELECT_BROKER} WHERE LOWER(REPLACE(broker, ' ', '-')) = LOWER($1) LIMIT 1");
        let row = sqlx::query_as::<_, BrokerRecord>(&by_name)
            .persistent(false)
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("select broker by name failed (code={code})"))?;
        Ok(row)
    }
}
