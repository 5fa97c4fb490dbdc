//! Web retrieval gateway
//!
//! Normalizes the search tool's delimited text output into `SearchHit`
//! records and fetches page full text with bounded timeouts. The search tool
//! itself is an external collaborator behind the `SearchTool` trait.

use crate::types::{FetchOutcome, RetrievalError, RetrievalResult};
use async_trait::async_trait;
use futures::FutureExt;
use reportify_core::{retry_async, RetryConfig, SearchConfig, SearchHit};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Line prefixes recognized by the search block parser
const TITLE_PREFIX: &str = "标题:";
const LINK_PREFIX: &str = "链接:";
const SNIPPET_PREFIX: &str = "摘要:";

/// Delimiter line between result blocks
const BLOCK_DELIMITER: &str = "---";

/// Sentinel emitted by the search tool when nothing was found
const NO_RESULTS_SENTINEL: &str = "没有找到相关搜索结果";

/// Black-box web search tool: query in, raw block text out
#[async_trait]
pub trait SearchTool: Send + Sync {
    async fn run(&self, query: &str) -> RetrievalResult<String>;
}

/// HTTP-backed search tool hitting a configured endpoint
pub struct HttpSearchTool {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSearchTool {
    pub fn new(endpoint: String, timeout_secs: u64) -> RetrievalResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RetrievalError::Search(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl SearchTool for HttpSearchTool {
    async fn run(&self, query: &str) -> RetrievalResult<String> {
        let url = format!("{}?q={}", self.endpoint, urlencoding::encode(query));
        let client = self.client.clone();

        let retry = RetryConfig {
            max_attempts: 2,
            initial_delay_ms: 500,
            ..RetryConfig::default()
        };

        retry_async(
            move || {
                let client = client.clone();
                let url = url.clone();
                async move {
                    let response = client
                        .get(&url)
                        .send()
                        .await
                        .map_err(|e| RetrievalError::Search(format!("Search request failed: {}", e)))?;

                    if !response.status().is_success() {
                        return Err(RetrievalError::Search(format!(
                            "Search endpoint returned status {}",
                            response.status()
                        )));
                    }

                    response
                        .text()
                        .await
                        .map_err(|e| RetrievalError::Search(format!("Failed to read search response: {}", e)))
                }
                .boxed()
            },
            retry,
            "web_search",
        )
        .await
    }
}

/// Parse the search tool's delimited text block into normalized hits.
///
/// Blocks are separated by a line containing only `---`. Within a block the
/// prefixes `标题:` / `链接:` / `摘要:` map to title/url/snippet; all other
/// lines are ignored. A record is emitted only if at least one field was
/// recognized. Malformed or delimiter-free input yields an empty list.
pub fn parse_search_block(text: &str) -> Vec<SearchHit> {
    if text.trim().is_empty() || text.contains(NO_RESULTS_SENTINEL) {
        return Vec::new();
    }

    let mut hits = Vec::new();
    let mut title: Option<String> = None;
    let mut url: Option<String> = None;
    let mut snippet: Option<String> = None;

    let flush = |title: &mut Option<String>,
                     url: &mut Option<String>,
                     snippet: &mut Option<String>,
                     hits: &mut Vec<SearchHit>| {
        if title.is_some() || url.is_some() || snippet.is_some() {
            hits.push(SearchHit::web(
                title.take().unwrap_or_default(),
                url.take().unwrap_or_default(),
                snippet.take().unwrap_or_default(),
            ));
        }
    };

    for line in text.lines() {
        let line = line.trim();
        if line == BLOCK_DELIMITER {
            flush(&mut title, &mut url, &mut snippet, &mut hits);
        } else if let Some(rest) = line.strip_prefix(TITLE_PREFIX) {
            title = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix(LINK_PREFIX) {
            url = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix(SNIPPET_PREFIX) {
            snippet = Some(rest.trim().to_string());
        }
    }
    flush(&mut title, &mut url, &mut snippet, &mut hits);

    hits
}

/// Uniform gateway over the web search tool and full-text fetching
pub struct RetrievalGateway {
    tool: Arc<dyn SearchTool>,
    http: reqwest::Client,
    config: SearchConfig,
}

impl RetrievalGateway {
    pub fn new(tool: Arc<dyn SearchTool>, config: SearchConfig) -> RetrievalResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RetrievalError::Fetch(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { tool, http, config })
    }

    /// Create a gateway backed by the configured HTTP search endpoint
    pub fn from_config(config: SearchConfig) -> RetrievalResult<Self> {
        let tool = HttpSearchTool::new(config.endpoint.clone(), config.timeout_secs)?;
        Self::new(Arc::new(tool), config)
    }

    /// Search the web, returning up to `max_results` normalized hits
    pub async fn search_web(
        &self,
        query: &str,
        max_results: usize,
    ) -> RetrievalResult<Vec<SearchHit>> {
        debug!("Searching web for: {}", query);

        let raw = self.tool.run(query).await?;
        let mut hits = parse_search_block(&raw);
        hits.truncate(max_results);

        info!("Web search for '{}' returned {} hits", query, hits.len());
        Ok(hits)
    }

    /// Fetch a page and extract its visible text.
    ///
    /// Never returns an error: transport failures and empty extractions are
    /// explicit `FetchOutcome` variants for the caller to route on.
    pub async fn fetch_full_text(&self, url: &str) -> FetchOutcome {
        debug!("Fetching full text from: {}", url);

        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Full-text fetch failed for {}: {}", url, e);
                return FetchOutcome::Failed {
                    reason: format!("无法获取全文内容：{}", e),
                };
            }
        };

        if !response.status().is_success() {
            return FetchOutcome::Failed {
                reason: format!("无法获取全文内容：HTTP {}", response.status()),
            };
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                return FetchOutcome::Failed {
                    reason: format!("无法获取全文内容：{}", e),
                };
            }
        };

        let text = html2text::from_read(&body[..], 120)
            .unwrap_or_else(|_| String::from_utf8_lossy(&body).to_string());
        let text = text.trim().to_string();

        if text.is_empty() {
            debug!("No extractable text at {}", url);
            FetchOutcome::NothingExtractable
        } else {
            FetchOutcome::Extracted(text)
        }
    }

    /// Configured default for result truncation
    pub fn max_results(&self) -> usize {
        self.config.max_results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reportify_core::HitSource;

    fn test_config() -> SearchConfig {
        SearchConfig {
            endpoint: "http://localhost:9/search".to_string(),
            timeout_secs: 1,
            max_results: 5,
        }
    }

    struct FixedTool(String);

    #[async_trait]
    impl SearchTool for FixedTool {
        async fn run(&self, _query: &str) -> RetrievalResult<String> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_parse_well_formed_blocks() {
        let text = "标题: 量子计算进展\n链接: https://example.com/a\n摘要: 概述文章\n---\n标题: 政策解读\n链接: https://example.com/b\n摘要: 政策文章\n";
        let hits = parse_search_block(text);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "量子计算进展");
        assert_eq!(hits[0].url, "https://example.com/a");
        assert_eq!(hits[0].snippet, "概述文章");
        assert_eq!(hits[0].source, HitSource::Web);
        assert_eq!(hits[1].url, "https://example.com/b");
    }

    #[test]
    fn test_parse_partial_block_still_emitted() {
        // A block missing title and snippet is still a record
        let text = "链接: https://example.com/only-link\n";
        let hits = parse_search_block(text);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "");
        assert_eq!(hits[0].url, "https://example.com/only-link");
    }

    #[test]
    fn test_parse_unrecognized_lines_ignored() {
        let text = "something else entirely\n标题: 有效标题\nnoise: value\n";
        let hits = parse_search_block(text);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "有效标题");
    }

    #[test]
    fn test_parse_malformed_input_yields_empty() {
        assert!(parse_search_block("").is_empty());
        assert!(parse_search_block("   \n  ").is_empty());
        assert!(parse_search_block("no recognizable fields at all").is_empty());
        assert!(parse_search_block("没有找到相关搜索结果").is_empty());
    }

    #[test]
    fn test_parse_delimiter_only_blocks() {
        let text = "---\n---\n---\n";
        assert!(parse_search_block(text).is_empty());
    }

    #[tokio::test]
    async fn test_search_web_truncates_to_max_results() {
        let mut raw = String::new();
        for i in 0..8 {
            raw.push_str(&format!("标题: 结果{}\n链接: https://example.com/{}\n---\n", i, i));
        }

        let gateway =
            RetrievalGateway::new(Arc::new(FixedTool(raw)), test_config()).unwrap();
        let hits = gateway.search_web("测试", 3).await.unwrap();

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].title, "结果0");
    }
}
