//! Wikipedia lookup-by-title via the MediaWiki action API.
//!
//! A lookup resolves the best-matching title first (search with one hit, the
//! equivalent of auto-suggest), then fetches that page's plain-text extract
//! with redirects followed. Missing pages, empty extracts, and disambiguation
//! pages are all reported as `NotFound`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use lyricsmith_shared::{EncyclopediaConfig, LyricsmithError, Result};

use crate::http::{build_client, check_status, endpoint, transport_error};
use crate::{Encyclopedia, EncyclopediaPage};

/// MediaWiki action API client.
pub struct WikipediaClient {
    client: Client,
    api_url: Url,
    timeout_secs: u64,
}

impl WikipediaClient {
    pub fn new(config: &EncyclopediaConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            api_url: endpoint(&config.base_url, "w/api.php")?,
            timeout_secs: config.timeout_secs,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, params: &[(&str, &str)]) -> Result<T> {
        let response = self
            .client
            .get(self.api_url.clone())
            .query(params)
            .send()
            .await
            .map_err(|e| transport_error("encyclopedia lookup", self.timeout_secs, e))?;

        let response = check_status("encyclopedia lookup", response).await?;

        response
            .json()
            .await
            .map_err(|e| LyricsmithError::Provider(format!("invalid encyclopedia body: {e}")))
    }

    /// Best-matching page title for a free-form query.
    async fn resolve_title(&self, query: &str) -> Result<String> {
        let body: QueryResponse<SearchQuery> = self
            .get_json(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", "1"),
                ("format", "json"),
                ("formatversion", "2"),
            ])
            .await?;

        body.query
            .and_then(|q| q.search.into_iter().next())
            .map(|hit| hit.title)
            .ok_or_else(|| LyricsmithError::not_found(format!("no encyclopedia page for '{query}'")))
    }

    async fn fetch_extract(&self, title: &str) -> Result<EncyclopediaPage> {
        let body: QueryResponse<PagesQuery> = self
            .get_json(&[
                ("action", "query"),
                ("prop", "extracts|pageprops"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", title),
                ("format", "json"),
                ("formatversion", "2"),
            ])
            .await?;

        let page = body
            .query
            .and_then(|q| q.pages.into_iter().next())
            .ok_or_else(|| LyricsmithError::not_found(format!("no page titled '{title}'")))?;

        if page.missing {
            return Err(LyricsmithError::not_found(format!("no page titled '{title}'")));
        }
        if page
            .pageprops
            .as_ref()
            .is_some_and(|props| props.disambiguation.is_some())
        {
            return Err(LyricsmithError::not_found(format!(
                "'{}' is a disambiguation page",
                page.title
            )));
        }

        let content = page.extract.unwrap_or_default();
        if content.trim().is_empty() {
            return Err(LyricsmithError::not_found(format!(
                "page '{}' has no text",
                page.title
            )));
        }

        Ok(EncyclopediaPage {
            title: page.title,
            content,
        })
    }
}

#[async_trait]
impl Encyclopedia for WikipediaClient {
    #[instrument(skip(self))]
    async fn lookup(&self, title: &str) -> Result<EncyclopediaPage> {
        let resolved = self.resolve_title(title).await?;
        debug!(%resolved, "encyclopedia title resolved");
        self.fetch_extract(&resolved).await
    }
}

// ---------------------------------------------------------------------------
// Wire types (formatversion=2)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct QueryResponse<Q> {
    #[serde(default = "Option::default")]
    query: Option<Q>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    title: String,
}

#[derive(Debug, Deserialize)]
struct PagesQuery {
    #[serde(default)]
    pages: Vec<PageItem>,
}

#[derive(Debug, Deserialize)]
struct PageItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    pageprops: Option<PageProps>,
}

#[derive(Debug, Deserialize)]
struct PageProps {
    #[serde(default)]
    disambiguation: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> WikipediaClient {
        WikipediaClient::new(&EncyclopediaConfig {
            base_url: server.uri(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    async fn mount_search(server: &MockServer, query: &str, titles: &[&str]) {
        let hits: Vec<_> = titles
            .iter()
            .map(|t| serde_json::json!({ "ns": 0, "title": t }))
            .collect();
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("list", "search"))
            .and(query_param("srsearch", query))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "batchcomplete": true,
                "query": { "search": hits }
            })))
            .mount(server)
            .await;
    }

    async fn mount_page(server: &MockServer, title: &str, page: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("prop", "extracts|pageprops"))
            .and(query_param("titles", title))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "batchcomplete": true,
                "query": { "pages": [page] }
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn lookup_resolves_title_and_returns_extract() {
        let server = MockServer::start().await;
        mount_search(&server, "Bella Ciao (song)", &["Bella ciao"]).await;
        mount_page(
            &server,
            "Bella ciao",
            serde_json::json!({
                "pageid": 1,
                "title": "Bella ciao",
                "extract": "\"Bella ciao\" is an Italian song dedicated to the partisans."
            }),
        )
        .await;

        let page = client(&server).lookup("Bella Ciao (song)").await.unwrap();
        assert_eq!(page.title, "Bella ciao");
        assert!(page.content.contains("Italian song"));
    }

    #[tokio::test]
    async fn no_search_hits_is_not_found() {
        let server = MockServer::start().await;
        mount_search(&server, "asdkjasdkj (song)", &[]).await;

        let err = client(&server).lookup("asdkjasdkj (song)").await.unwrap_err();
        assert!(matches!(err, LyricsmithError::NotFound(_)));
    }

    #[tokio::test]
    async fn disambiguation_page_is_not_found() {
        let server = MockServer::start().await;
        mount_search(&server, "Hello (song)", &["Hello"]).await;
        mount_page(
            &server,
            "Hello",
            serde_json::json!({
                "pageid": 2,
                "title": "Hello",
                "extract": "Hello may refer to:",
                "pageprops": { "disambiguation": "" }
            }),
        )
        .await;

        let err = client(&server).lookup("Hello (song)").await.unwrap_err();
        assert!(matches!(err, LyricsmithError::NotFound(_)));
        assert!(err.to_string().contains("disambiguation"));
    }

    #[tokio::test]
    async fn missing_page_is_not_found() {
        let server = MockServer::start().await;
        mount_search(&server, "Ghost (song)", &["Ghost Song"]).await;
        mount_page(
            &server,
            "Ghost Song",
            serde_json::json!({ "title": "Ghost Song", "missing": true }),
        )
        .await;

        let err = client(&server).lookup("Ghost (song)").await.unwrap_err();
        assert!(matches!(err, LyricsmithError::NotFound(_)));
    }

    #[tokio::test]
    async fn server_error_is_a_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server).lookup("Anything").await.unwrap_err();
        assert!(err.is_provider_failure());
    }
}
