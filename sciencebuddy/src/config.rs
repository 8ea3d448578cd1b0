use thiserror::Error;
use url::Url;

/// Base URL used when neither `--target-url` nor `TARGET_URL` is given.
pub const DEFAULT_TARGET_URL: &str = "https://sciencebuddy.ngrok.app";

/// Environment variable overriding the base URL.
pub const TARGET_URL_ENV: &str = "TARGET_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid target URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unsupported scheme {0:?} in target URL, expected http or https")]
    UnsupportedScheme(String),

    #[error("Target URL {0:?} must not carry a query or fragment")]
    QueryOrFragment(String),
}

/// The service under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConfig {
    base_url: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_TARGET_URL.to_string(),
        }
    }
}

impl TargetConfig {
    pub fn new(url: &str) -> Result<Self, ConfigError> {
        let parsed = Url::parse(url).map_err(|source| ConfigError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        match parsed.scheme() {
            "http" | "https" => {}
            scheme => return Err(ConfigError::UnsupportedScheme(scheme.to_string())),
        }
        // Endpoint paths are appended to the base as text.
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(ConfigError::QueryOrFragment(url.to_string()));
        }

        Ok(Self {
            base_url: url.trim_end_matches('/').to_string(),
        })
    }

    /// Read `TARGET_URL`, falling back to the default.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(None, std::env::var(TARGET_URL_ENV).ok())
    }

    /// Pick the first non-empty of an explicit URL, the environment value and the default.
    pub fn resolve(explicit: Option<&str>, env: Option<String>) -> Result<Self, ConfigError> {
        let explicit = explicit.filter(|url| !url.is_empty()).map(str::to_owned);
        match explicit.or(env.filter(|url| !url.is_empty())) {
            Some(url) => Self::new(&url),
            None => Ok(Self::default()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_env_uses_the_default() {
        temp_env::with_var_unset(TARGET_URL_ENV, || {
            let target = TargetConfig::from_env().unwrap();
            assert_eq!(target.base_url(), "https://sciencebuddy.ngrok.app");
            assert_eq!(target.endpoint("chat"), "https://sciencebuddy.ngrok.app/chat");
        });
    }

    #[test]
    fn env_overrides_the_default() {
        temp_env::with_var(TARGET_URL_ENV, Some("http://localhost:8080"), || {
            let target = TargetConfig::from_env().unwrap();
            assert_eq!(target.endpoint("chat"), "http://localhost:8080/chat");
            assert_eq!(target.endpoint("/summary"), "http://localhost:8080/summary");
        });
    }

    #[test]
    fn empty_env_counts_as_unset() {
        temp_env::with_var(TARGET_URL_ENV, Some(""), || {
            assert_eq!(TargetConfig::from_env().unwrap(), TargetConfig::default());
        });
    }

    #[test]
    fn explicit_url_beats_env() {
        let target = TargetConfig::resolve(
            Some("http://127.0.0.1:3002/"),
            Some("http://localhost:8080".to_string()),
        )
        .unwrap();
        assert_eq!(target.base_url(), "http://127.0.0.1:3002");
    }

    #[test]
    fn path_prefix_is_kept() {
        let target = TargetConfig::new("https://example.com/buddy/").unwrap();
        assert_eq!(target.endpoint("chat"), "https://example.com/buddy/chat");
    }

    #[test]
    fn query_and_fragment_are_rejected() {
        for url in [
            "http://localhost:8080/?token=abc",
            "http://localhost:8080#frag",
            "http://localhost:8080/?",
        ] {
            assert!(
                matches!(TargetConfig::new(url), Err(ConfigError::QueryOrFragment(_))),
                "{url}"
            );
        }

        temp_env::with_var(TARGET_URL_ENV, Some("http://localhost:8080/?token=abc"), || {
            assert!(TargetConfig::from_env().is_err());
        });
    }

    #[test]
    fn malformed_urls_are_rejected() {
        assert!(matches!(
            TargetConfig::new("localhost:8080/chat"),
            Err(ConfigError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            TargetConfig::new("not a url"),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            TargetConfig::new("ftp://example.com"),
            Err(ConfigError::UnsupportedScheme(scheme)) if scheme == "ftp"
        ));
    }
}
