//! HTTP client for the song catalog.

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::error::{CatalogError, Result};
use super::raw::{LyricsEnvelope, SearchEnvelope, SongDetailsEnvelope};
use crate::audio::{StreamUrl, Track};
use crate::config::CatalogConfig;

/// Lyrics for one song, serialized the way the proxy returns them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lyrics {
    #[serde(rename = "lyrics")]
    pub text: String,
    /// Empty when the catalog has none.
    pub copyright: String,
}

/// Bounds connection setup only for streamed bodies.
const STREAM_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: Client,
    stream_http: Client,
    base_url: Url,
}

impl CatalogClient {
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|e| CatalogError::Service(format!("invalid catalog URL {}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(CatalogError::Service(format!("invalid catalog URL {}", config.base_url)));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        // a whole track can take longer than any API call; no total deadline
        let stream_http = Client::builder()
            .connect_timeout(STREAM_CONNECT_TIMEOUT)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            stream_http,
            base_url,
        })
    }

    /// Client for audio bodies, used by the stream fetcher and the downloader.
    pub fn stream_http(&self) -> &Client {
        &self.stream_http
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// `base_url` plus `segments`, each percent-encoded as a single path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CatalogError::Service(format!("invalid catalog URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Search songs. An empty query never reaches the network.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<Track>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.endpoint(&["api", "search", "songs"])?;
        let limit = limit.to_string();
        debug!(query = %query, "Searching catalog");

        let envelope: SearchEnvelope = self
            .get_json(url, &[("query", query), ("limit", limit.as_str())])
            .await
            .map_err(|e| match e {
                CatalogError::NotFound(message) => CatalogError::Service(message),
                other => other,
            })?;

        if !envelope.success {
            debug!(query = %query, "Catalog reported no success, treating as empty");
            return Ok(Vec::new());
        }

        let tracks: Vec<Track> = envelope
            .data
            .and_then(|data| data.results)
            .unwrap_or_default()
            .into_iter()
            .map(Track::from)
            .collect();

        info!(query = %query, "Search returned {} tracks", tracks.len());
        Ok(tracks)
    }

    /// Every quality variant the catalog offers for download.
    pub async fn fetch_download_options(&self, song_id: &str) -> Result<Vec<StreamUrl>> {
        let url = self.endpoint(&["api", "songs", song_id])?;
        let envelope: SongDetailsEnvelope = self.get_json(url, &[]).await?;

        let options = envelope
            .success
            .then_some(envelope.data)
            .flatten()
            .and_then(|songs| songs.into_iter().next())
            .and_then(|song| song.download_url)
            .unwrap_or_default();

        if options.is_empty() {
            return Err(CatalogError::NotFound(song_id.to_string()));
        }
        debug!(song_id = %song_id, "{} download options", options.len());
        Ok(options)
    }

    pub async fn fetch_lyrics(&self, song_id: &str) -> Result<Lyrics> {
        let url = self.endpoint(&["api", "songs", song_id, "lyrics"])?;
        let envelope: LyricsEnvelope = self.get_json(url, &[]).await?;

        let raw = envelope
            .success
            .then_some(envelope.data)
            .flatten()
            .ok_or_else(|| CatalogError::NotFound(song_id.to_string()))?;

        match raw.lyrics {
            Some(text) if !text.trim().is_empty() => Ok(Lyrics {
                text,
                copyright: raw.copyright.unwrap_or_default(),
            }),
            _ => Err(CatalogError::NotFound(song_id.to_string())),
        }
    }

    /// Reachability check: a one-result search for "test".
    pub async fn health_check(&self) -> bool {
        let url = match self.endpoint(&["api", "search", "songs"]) {
            Ok(url) => url,
            Err(e) => {
                warn!("Catalog health check failed: {}", e);
                return false;
            }
        };
        match self
            .get_json::<SearchEnvelope>(url, &[("query", "test"), ("limit", "1")])
            .await
        {
            Ok(envelope) => envelope.success,
            Err(e) => {
                warn!("Catalog health check failed: {}", e);
                false
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, query: &[(&str, &str)]) -> Result<T> {
        let response = self.http.get(url.clone()).query(query).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Catalog request to {} failed", url);
            return Err(CatalogError::Service(format!("{}: {}", status, body)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CatalogError::Service(format!("malformed payload: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(uri: &str) -> CatalogClient {
        let config = CatalogConfig {
            base_url: format!("{}/", uri),
            timeout_secs: 5,
            ..CatalogConfig::default()
        };
        CatalogClient::new(&config).unwrap()
    }

    fn search_payload() -> serde_json::Value {
        json!({
            "success": true,
            "data": { "results": [
                {
                    "id": "s1",
                    "name": "First",
                    "duration": 200,
                    "artists": { "primary": [{ "id": "a1", "name": "Someone" }] },
                    "downloadUrl": [
                        { "quality": "160kbps", "url": "https://cdn.test/s1/160" },
                        { "quality": "320kbps", "url": "https://cdn.test/s1/320" }
                    ]
                },
                { "id": "s2", "name": "Silent", "downloadUrl": [] }
            ] }
        })
    }

    #[tokio::test]
    async fn search_maps_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search/songs"))
            .and(query_param("query", "first"))
            .and(query_param("limit", "20"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_payload()))
            .expect(1)
            .mount(&server)
            .await;

        let tracks = client_for(&server.uri()).search("  first ", 20).await.unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].artist, "Someone");
        assert_eq!(tracks[0].duration_ms, 200_000);
        assert_eq!(tracks[0].stream_url.as_deref(), Some("https://cdn.test/s1/320"));
        assert!(!tracks[1].has_source());
    }

    #[tokio::test]
    async fn empty_query_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_payload()))
            .expect(0)
            .mount(&server)
            .await;

        let tracks = client_for(&server.uri()).search("   ", 20).await.unwrap();
        assert!(tracks.is_empty());
    }

    #[tokio::test]
    async fn empty_payload_is_an_empty_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search/songs"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": { "results": [] } })),
            )
            .mount(&server)
            .await;

        let tracks = client_for(&server.uri()).search("test", 20).await.unwrap();
        assert!(tracks.is_empty());
    }

    #[tokio::test]
    async fn unsuccessful_search_is_empty_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search/songs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": false })))
            .mount(&server)
            .await;

        assert!(client_for(&server.uri()).search("x", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn server_errors_are_service_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search/songs"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = client_for(&server.uri()).search("x", 5).await.unwrap_err();
        assert!(matches!(err, CatalogError::Service(_)));
        assert_eq!(err.user_message(), "Search failed. Please try again.");
    }

    #[tokio::test]
    async fn malformed_payload_is_a_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search/songs"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client_for(&server.uri()).search("x", 5).await.unwrap_err();
        assert!(matches!(err, CatalogError::Service(_)));
    }

    #[tokio::test]
    async fn unreachable_catalog_is_a_network_error() {
        // nothing listens on port 1
        let err = client_for("http://127.0.0.1:1").search("x", 5).await.unwrap_err();
        assert!(matches!(err, CatalogError::Network(_)), "{:?}", err);
        assert_eq!(err.user_message(), "No internet connection.");
    }

    #[tokio::test]
    async fn download_options_come_from_song_details() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/songs/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": [{ "downloadUrl": [
                    { "quality": "12kbps", "url": "u12" },
                    { "quality": "320kbps", "url": "u320" }
                ] }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/songs/s2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": [] })))
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let options = client.fetch_download_options("s1").await.unwrap();
        assert_eq!(options, vec![StreamUrl::new("12kbps", "u12"), StreamUrl::new("320kbps", "u320")]);

        let err = client.fetch_download_options("s2").await.unwrap_err();
        assert!(err.is_not_found());
        let err = client.fetch_download_options("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn lyrics_present_and_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/songs/s1/lyrics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": { "lyrics": "la la<br>la", "copyright": "(c) Someone" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/songs/s2/lyrics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": false })))
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let lyrics = client.fetch_lyrics("s1").await.unwrap();
        assert_eq!(lyrics.text, "la la<br>la");
        assert_eq!(lyrics.copyright, "(c) Someone");
        assert!(client.fetch_lyrics("s2").await.unwrap_err().is_not_found());
    }

    #[test]
    fn song_ids_stay_inside_their_path_segment() {
        let client = client_for("http://catalog.test/base");
        let url = client.endpoint(&["api", "songs", "x/../search/songs", "lyrics"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://catalog.test/base/api/songs/x%2F..%2Fsearch%2Fsongs/lyrics"
        );

        let url = client.endpoint(&["api", "songs", "a b?c#d"]).unwrap();
        assert_eq!(url.path(), "/base/api/songs/a%20b%3Fc%23d");
    }

    #[tokio::test]
    async fn escaped_song_id_reaches_the_song_route() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/songs/a%2Fb/lyrics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": { "lyrics": "words" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let lyrics = client_for(&server.uri()).fetch_lyrics("a/b").await.unwrap();
        assert_eq!(lyrics.text, "words");
        assert_eq!(lyrics.copyright, "");
    }

    #[test]
    fn unparseable_base_url_is_rejected() {
        let config = CatalogConfig {
            base_url: "not a url".to_string(),
            ..CatalogConfig::default()
        };
        assert!(matches!(CatalogClient::new(&config), Err(CatalogError::Service(_))));
    }

    #[tokio::test]
    async fn stream_client_outlives_the_api_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/audio/s1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![7u8; 64])
                    .set_delay(Duration::from_millis(2_000)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/search/songs"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(search_payload())
                    .set_delay(Duration::from_millis(2_000)),
            )
            .mount(&server)
            .await;

        let config = CatalogConfig {
            base_url: server.uri(),
            timeout_secs: 1,
            ..CatalogConfig::default()
        };
        let client = CatalogClient::new(&config).unwrap();

        let err = client.search("slow", 5).await.unwrap_err();
        assert!(matches!(err, CatalogError::Network(_)), "{:?}", err);

        let body = client
            .stream_http()
            .get(format!("{}/audio/s1", server.uri()))
            .send()
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        assert_eq!(body.len(), 64);
    }

    #[tokio::test]
    async fn health_check_reflects_a_minimal_search() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search/songs"))
            .and(query_param("query", "test"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": { "results": [] } })))
            .mount(&server)
            .await;

        assert!(client_for(&server.uri()).health_check().await);
        assert!(!client_for("http://127.0.0.1:1").health_check().await);
    }
}
