pub mod calendar;
pub mod domain;
pub mod loader;
pub mod pricing;
pub mod source;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub source_base_url: Option<String>,
        pub source_auth_token: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                source_base_url: non_empty_var("RECOMMENDATION_SOURCE_BASE_URL"),
                source_auth_token: non_empty_var("RECOMMENDATION_SOURCE_AUTH_TOKEN"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
            })
        }

        pub fn require_source_base_url(&self) -> anyhow::Result<&str> {
            self.source_base_url
                .as_deref()
                .context("RECOMMENDATION_SOURCE_BASE_URL is required")
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn missing_base_url_is_reported_by_name() {
            let settings = Settings {
                source_base_url: None,
                source_auth_token: None,
                sentry_dsn: None,
            };
            let err = settings.require_source_base_url().unwrap_err();
            assert!(err.to_string().contains("RECOMMENDATION_SOURCE_BASE_URL"));
        }
    }
}
