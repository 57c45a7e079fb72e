//! API endpoint configuration.

use crate::error::ConfigError;
use url::{form_urlencoded, Url};

/// Environment variable read by [`ApiConfig::from_env`].
pub const BASE_URL_ENV: &str = "API_BASE_URL";

/// Process-wide settings shared by every request a [`Client`](crate::Client) makes.
///
/// # Examples
///
/// ```
/// use pagewise::ApiConfig;
///
/// # fn example() -> Result<(), pagewise::ConfigError> {
/// let config = ApiConfig::new("https://api.example.com")?;
/// let url = config.build_url(
///     "/api/books",
///     [("page", Some("2")), ("search", None), ("sort", Some(""))],
/// );
/// assert_eq!(url, "https://api.example.com/api/books?page=2");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    base_url: String,
}

impl ApiConfig {
    /// Creates a configuration for the given base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingBaseUrl`] for an empty string and
    /// [`ConfigError::InvalidBaseUrl`] if it is not an absolute URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let base_url = base_url.into();
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        Url::parse(trimmed)?;

        Ok(Self {
            base_url: trimmed.to_string(),
        })
    }

    /// Reads the base URL from the `API_BASE_URL` environment variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_var(BASE_URL_ENV)
    }

    /// Reads the base URL from the named environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingBaseUrl`] if the variable is unset or empty.
    pub fn from_env_var(name: &str) -> Result<Self, ConfigError> {
        let value = std::env::var(name).map_err(|_| ConfigError::MissingBaseUrl)?;
        Self::new(value)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins the base URL and `path`, appending a query string.
    ///
    /// Parameters whose value is `None` or empty are dropped; the others keep
    /// their input order. The base URL and path are concatenated as given, so
    /// `path` is expected to start with `/`.
    pub fn build_url<I, K, V>(&self, path: &str, query: I) -> String
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        let mut has_params = false;

        for (key, value) in query {
            if let Some(value) = value {
                if !value.as_ref().is_empty() {
                    serializer.append_pair(key.as_ref(), value.as_ref());
                    has_params = true;
                }
            }
        }

        if has_params {
            format!("{}{}?{}", self.base_url, path, serializer.finish())
        } else {
            format!("{}{}", self.base_url, path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ApiConfig {
        ApiConfig::new("https://api.example.com").unwrap()
    }

    #[test]
    fn test_build_url_without_query() {
        let url = config().build_url("/api/books", Vec::<(&str, Option<&str>)>::new());
        assert_eq!(url, "https://api.example.com/api/books");
    }

    #[test]
    fn test_build_url_drops_all_empty_params() {
        let url = config().build_url("/api/tests", [("bookId", None), ("q", Some(""))]);
        assert_eq!(url, "https://api.example.com/api/tests");
    }

    #[test]
    fn test_build_url_keeps_insertion_order_and_encodes() {
        let url = config().build_url(
            "/api/books",
            [
                ("title", Some("The Hobbit & more")),
                ("author", Some("Tolkien")),
            ],
        );
        assert_eq!(
            url,
            "https://api.example.com/api/books?title=The+Hobbit+%26+more&author=Tolkien"
        );
    }

    #[test]
    fn test_missing_base_url() {
        assert!(matches!(ApiConfig::new("  "), Err(ConfigError::MissingBaseUrl)));
        assert!(matches!(
            ApiConfig::from_env_var("PAGEWISE_TEST_SURELY_UNSET_VAR"),
            Err(ConfigError::MissingBaseUrl)
        ));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ApiConfig::new("api.example.com"),
            Err(ConfigError::InvalidBaseUrl(_))
        ));
    }
}
