pub mod domain;
pub mod lookup;
pub mod normalize;
pub mod ranking;
pub mod risk;
pub mod slug;
pub mod storage;
pub mod views;

pub mod config {
    use anyhow::Context;

    const DEFAULT_SITE_NAME: &str = "Zenpro FX";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub broker_api_base_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub site_name: String,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                database_url: non_empty_var("DATABASE_URL"),
                broker_api_base_url: non_empty_var("BROKER_API_BASE_URL"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                site_name: non_empty_var("SITE_NAME")
                    .unwrap_or_else(|| DEFAULT_SITE_NAME.to_string()),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_broker_api_base_url(&self) -> anyhow::Result<&str> {
            self.broker_api_base_url
                .as_deref()
                .context("BROKER_API_BASE_URL is required")
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|s| !s.trim().is_empty())
    }
}
