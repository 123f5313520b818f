use super::{CatalogError, CatalogQuery, CatalogSource, Taxonomy};
use crate::config::AppConfig;
use crate::model::{Author, Title, TitlePage};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("mangahub/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct CatalogClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl From<&AppConfig> for CatalogClientConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.catalog_base_url.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
        }
    }
}

/// HTTP client for the catalog's REST surface. Each call is a single GET; no retries.
pub struct CatalogClient {
    client: Client,
    base_url: Url,
}

impl CatalogClient {
    pub fn new(config: &CatalogClientConfig) -> Result<Self, CatalogError> {
        let base_url = parse_base_url(&config.base_url)?;
        let client = ClientBuilder::new()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| CatalogError::InvalidEndpoint(format!("http client setup failed: {err}")))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, CatalogError> {
        debug!(%url, "Catalog request");
        let response = self
            .client
            .get(url.clone())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|err| transport_error(&url, &err))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "Catalog request rejected");
            return Err(CatalogError::Status {
                url: url.to_string(),
                code: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| transport_error(&url, &err))?;
        decode_payload(&url, &body)
    }
}

#[async_trait]
impl CatalogSource for CatalogClient {
    async fn fetch_page(
        &self,
        query: &CatalogQuery,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Title>, CatalogError> {
        let url = page_url(&self.base_url, query, page, page_size)?;
        let envelope: TitlePage = self.get_json(url).await?;
        debug!(
            context = %query,
            page = envelope.metadata.page,
            per = envelope.metadata.per,
            total = envelope.metadata.total,
            count = envelope.items.len(),
            "Catalog page decoded"
        );
        Ok(envelope.items)
    }

    async fn fetch_taxonomy(&self, taxonomy: Taxonomy) -> Result<Vec<String>, CatalogError> {
        let url = endpoint_url(&self.base_url, &taxonomy.path_segments())?;
        self.get_json(url).await
    }

    async fn fetch_authors(&self) -> Result<Vec<Author>, CatalogError> {
        let url = endpoint_url(&self.base_url, &["list", "authors"])?;
        self.get_json(url).await
    }
}

fn parse_base_url(raw: &str) -> Result<Url, CatalogError> {
    let url = Url::parse(raw.trim())
        .map_err(|err| CatalogError::InvalidEndpoint(format!("{raw}: {err}")))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(CatalogError::InvalidEndpoint(format!(
            "{raw}: expected an http(s) base URL"
        )));
    }
    Ok(url)
}

fn endpoint_url(base: &Url, segments: &[&str]) -> Result<Url, CatalogError> {
    let mut url = base.clone();
    url.set_query(None);
    url.path_segments_mut()
        .map_err(|_| CatalogError::InvalidEndpoint(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

pub(crate) fn page_url(
    base: &Url,
    query: &CatalogQuery,
    page: u32,
    page_size: u32,
) -> Result<Url, CatalogError> {
    let mut url = endpoint_url(base, &query.path_segments())?;
    url.query_pairs_mut()
        .append_pair("page", &page.max(1).to_string())
        .append_pair("per", &page_size.max(1).to_string());
    Ok(url)
}

fn transport_error(url: &Url, err: &reqwest::Error) -> CatalogError {
    let message = if err.is_timeout() {
        format!("timed out: {err}")
    } else {
        err.to_string()
    };
    CatalogError::Transport {
        url: url.to_string(),
        message,
    }
}

pub(crate) fn decode_payload<T: DeserializeOwned>(url: &Url, body: &[u8]) -> Result<T, CatalogError> {
    serde_json::from_slice(body).map_err(|err| CatalogError::Decode {
        url: url.to_string(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        parse_base_url("https://catalog.example.test").expect("base url")
    }

    #[test]
    fn page_urls_follow_catalog_layout() {
        let url = page_url(&base(), &CatalogQuery::AllTitles, 3, 10).unwrap();
        assert_eq!(url.as_str(), "https://catalog.example.test/list/mangas?page=3&per=10");

        let url = page_url(&base(), &CatalogQuery::BestRanked, 1, 10).unwrap();
        assert_eq!(url.as_str(), "https://catalog.example.test/list/bestMangas?page=1&per=10");

        let url = page_url(&base(), &CatalogQuery::ByGenre("Award Winning".into()), 2, 20).unwrap();
        assert_eq!(
            url.as_str(),
            "https://catalog.example.test/list/mangaByGenre/Award%20Winning?page=2&per=20"
        );

        let url = page_url(&base(), &CatalogQuery::ByAuthor("998C1B16".into()), 1, 10).unwrap();
        assert_eq!(
            url.as_str(),
            "https://catalog.example.test/list/mangaByAuthor/998C1B16?page=1&per=10"
        );
    }

    #[test]
    fn search_text_is_a_single_encoded_segment() {
        let url = page_url(&base(), &CatalogQuery::SearchText("fate/zero".into()), 1, 10).unwrap();
        assert_eq!(
            url.as_str(),
            "https://catalog.example.test/search/mangasContains/fate%2Fzero?page=1&per=10"
        );
    }

    #[test]
    fn base_url_path_prefix_is_kept() {
        let base = parse_base_url("https://catalog.example.test/api/").unwrap();
        let url = endpoint_url(&base, &Taxonomy::Demographics.path_segments()).unwrap();
        assert_eq!(url.as_str(), "https://catalog.example.test/api/list/demographics");
    }

    #[test]
    fn rejects_non_http_base_urls() {
        assert!(matches!(
            parse_base_url("ftp://catalog.example.test"),
            Err(CatalogError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            parse_base_url("not a url"),
            Err(CatalogError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn decodes_page_envelope_and_taxonomy_arrays() {
        let url = base();
        let body = br#"{"metadata":{"page":1,"per":10,"total":64},"items":[{"id":2,"title":"Berserk","score":9.47,"status":"currently_publishing","mainPicture":"\"https://cdn.example.test/2.jpg\"","url":"\"https://myanimelist.net/manga/2/Berserk\"","authors":[],"genres":[],"themes":[],"demographics":[]}]}"#;
        let page: TitlePage = decode_payload(&url, body).expect("envelope");
        assert_eq!(page.metadata.total, 64);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].title, "Berserk");
        assert!(page.items[0].is_scored());

        let names: Vec<String> = decode_payload(&url, br#"["Josei","Kids","Seinen"]"#).unwrap();
        assert_eq!(names, vec!["Josei", "Kids", "Seinen"]);
    }

    #[test]
    fn malformed_payload_is_a_decode_error() {
        let err = decode_payload::<TitlePage>(&base(), b"<html>503</html>").unwrap_err();
        assert_eq!(err.code(), "decode_error");
        assert!(err.to_string().contains("catalog.example.test"));
    }

    #[test]
    fn client_builds_from_config() {
        let config = CatalogClientConfig::from(&AppConfig::default());
        let client = CatalogClient::new(&config).expect("client");
        assert_eq!(client.base_url().scheme(), "https");
    }
}
