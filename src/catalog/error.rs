use thiserror::Error;

pub const NETWORK_MESSAGE: &str = "No internet connection.";
pub const SEARCH_FAILED_MESSAGE: &str = "Search failed. Please try again.";

/// Failures talking to the song catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// No connectivity: connect refused, DNS, timeout.
    #[error("network unreachable: {0}")]
    Network(String),

    /// Non-2xx status or a payload that does not parse.
    #[error("catalog service error: {0}")]
    Service(String),

    /// The catalog has nothing for this id (lyrics, download options).
    #[error("not found: {0}")]
    NotFound(String),
}

impl CatalogError {
    /// Banner text for the search view.
    pub fn user_message(&self) -> &'static str {
        match self {
            CatalogError::Network(_) => NETWORK_MESSAGE,
            _ => SEARCH_FAILED_MESSAGE,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound(_))
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            CatalogError::Network(e.to_string())
        } else {
            CatalogError::Service(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_errors_get_the_connectivity_banner() {
        assert_eq!(CatalogError::Network("x".into()).user_message(), NETWORK_MESSAGE);
        assert_eq!(CatalogError::Service("500".into()).user_message(), SEARCH_FAILED_MESSAGE);
        assert_eq!(CatalogError::NotFound("id".into()).user_message(), SEARCH_FAILED_MESSAGE);
    }
}
