//! GitHub Discussions source fetcher.
//!
//! Pages through a repository's discussions with the GraphQL API, newest
//! first, 100 per request, following `pageInfo.endCursor` until
//! `hasNextPage` is false. Each discussion carries its first five comments;
//! the bound comes from the query itself.
//!
//! # Environment Variables
//!
//! - `GITHUB_TOKEN`: required. Sent as a bearer token, never logged.
//!
//! # Errors
//!
//! | Condition | Error |
//! |-----------|-------|
//! | Request not sent, or non-2xx status | [`Error::Transport`] |
//! | Body contains a non-empty `errors` array | [`Error::Graph`] |
//! | `data.repository.discussions` missing or malformed | [`Error::Schema`] |

use std::time::Duration;

use async_trait::async_trait;
use discussion_harness_core::models::{Comment, DiscussionRecord, RepoRef};
use discussion_harness_core::{Error, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::SourceConfig;

/// Discussions requested per page.
pub const PAGE_SIZE: u32 = 100;

/// Comments requested per discussion.
pub const COMMENTS_PER_DISCUSSION: u32 = 5;

/// Login reported for discussions and comments whose author was deleted.
pub const GHOST_LOGIN: &str = "ghost";

/// Discussions query. Every varying input is a bound variable.
pub const DISCUSSIONS_QUERY: &str = r#"
query($owner: String!, $name: String!, $cursor: String, $pageSize: Int!, $commentCount: Int!) {
  repository(owner: $owner, name: $name) {
    discussions(first: $pageSize, after: $cursor, orderBy: {field: CREATED_AT, direction: DESC}) {
      pageInfo {
        endCursor
        hasNextPage
      }
      edges {
        node {
          title
          bodyText
          createdAt
          url
          author {
            login
          }
          comments(first: $commentCount) {
            edges {
              node {
                bodyText
                author {
                  login
                }
              }
            }
          }
        }
      }
    }
  }
}
"#;

/// Raw HTTP answer from a GraphQL endpoint.
#[derive(Debug, Clone)]
pub struct GraphqlResponse {
    pub status: u16,
    pub body: String,
}

/// Sends one GraphQL request.
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    /// POST `{query, variables}`. Fails only if no response was received.
    async fn post(&self, query: &str, variables: &Value) -> Result<GraphqlResponse>;
}

/// [`GraphqlTransport`] over HTTPS with a bearer token.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl HttpTransport {
    pub fn new(config: &SourceConfig, token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("discussion-harness/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(config.connection_timeout_secs))
            .build()
            .map_err(|e| Error::Transport(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            token: token.into(),
        })
    }

    /// Build a transport with the token from `GITHUB_TOKEN`.
    pub fn from_env(config: &SourceConfig) -> anyhow::Result<Self> {
        let token = std::env::var("GITHUB_TOKEN")
            .map_err(|_| anyhow::anyhow!("GITHUB_TOKEN environment variable not set"))?;
        Ok(Self::new(config, token)?)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GraphqlTransport for HttpTransport {
    async fn post(&self, query: &str, variables: &Value) -> Result<GraphqlResponse> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| Error::Transport(format!("GraphQL request failed: {}", e)))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Transport(format!("cannot read GraphQL response: {}", e)))?;
        Ok(GraphqlResponse { status, body })
    }
}

// ============ Response shape ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiscussionPage {
    page_info: PageInfo,
    #[serde(default)]
    edges: Vec<Edge<DiscussionNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    end_cursor: Option<String>,
    has_next_page: bool,
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: T,
}

#[derive(Debug, Deserialize)]
struct Author {
    login: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiscussionNode {
    title: String,
    body_text: String,
    created_at: String,
    url: String,
    author: Option<Author>,
    comments: CommentConnection,
}

#[derive(Debug, Deserialize, Default)]
struct CommentConnection {
    #[serde(default)]
    edges: Vec<Edge<CommentNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentNode {
    body_text: String,
    author: Option<Author>,
}

fn login(author: Option<Author>) -> String {
    author
        .map(|a| a.login)
        .unwrap_or_else(|| GHOST_LOGIN.to_string())
}

impl From<DiscussionNode> for DiscussionRecord {
    fn from(node: DiscussionNode) -> Self {
        DiscussionRecord {
            title: node.title,
            body_text: node.body_text,
            created_at: node.created_at,
            url: node.url,
            author: login(node.author),
            comments: node
                .comments
                .edges
                .into_iter()
                .map(|e| Comment {
                    body_text: e.node.body_text,
                    author: login(e.node.author),
                })
                .collect(),
        }
    }
}

/// Check one response and extract its page.
fn parse_page(response: GraphqlResponse) -> Result<DiscussionPage> {
    if !(200..300).contains(&response.status) {
        return Err(Error::Transport(format!(
            "query failed with HTTP {}: {}",
            response.status,
            response.body.chars().take(500).collect::<String>()
        )));
    }

    let mut json: Value = serde_json::from_str(&response.body)
        .map_err(|e| Error::Schema(format!("response is not JSON: {}", e)))?;

    if let Some(errors) = json.get("errors") {
        let empty = errors.as_array().is_some_and(|a| a.is_empty());
        if !errors.is_null() && !empty {
            return Err(Error::Graph(errors.to_string()));
        }
    }

    let discussions = json
        .pointer_mut("/data/repository/discussions")
        .filter(|v| !v.is_null())
        .map(Value::take)
        .ok_or_else(|| {
            Error::Schema("response has no data.repository.discussions".to_string())
        })?;

    serde_json::from_value(discussions)
        .map_err(|e| Error::Schema(format!("unexpected discussions shape: {}", e)))
}

/// Fetches every discussion of a repository.
pub struct DiscussionFetcher<T: GraphqlTransport> {
    transport: T,
}

impl<T: GraphqlTransport> DiscussionFetcher<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Variables for one page request.
    pub fn variables(repo: &RepoRef, cursor: Option<&str>) -> Value {
        json!({
            "owner": repo.owner,
            "name": repo.name,
            "cursor": cursor,
            "pageSize": PAGE_SIZE,
            "commentCount": COMMENTS_PER_DISCUSSION,
        })
    }

    /// Fetch all pages, newest discussion first.
    ///
    /// There is no page cap: the loop ends only when upstream reports
    /// `hasNextPage: false` or a request fails.
    pub async fn fetch(&self, repo: &RepoRef) -> Result<Vec<DiscussionRecord>> {
        let mut discussions = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let variables = Self::variables(repo, cursor.as_deref());
            let response = self.transport.post(DISCUSSIONS_QUERY, &variables).await?;
            let page = parse_page(response)?;
            pages += 1;

            debug!(
                repository = %repo,
                page = pages,
                items = page.edges.len(),
                "fetched discussion page"
            );
            discussions.extend(page.edges.into_iter().map(|e| DiscussionRecord::from(e.node)));

            if !page.page_info.has_next_page {
                break;
            }
            match page.page_info.end_cursor {
                Some(next) => cursor = Some(next),
                None => {
                    return Err(Error::Schema(
                        "hasNextPage is true but endCursor is null".to_string(),
                    ))
                }
            }
        }

        info!(
            repository = %repo,
            pages,
            discussions = discussions.len(),
            "fetched discussions"
        );
        Ok(discussions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replays canned responses and records the variables it was sent.
    struct ScriptedTransport {
        responses: Mutex<Vec<GraphqlResponse>>,
        seen: Mutex<Vec<Value>>,
    }

    impl ScriptedTransport {
        fn new(mut responses: Vec<GraphqlResponse>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GraphqlTransport for ScriptedTransport {
        async fn post(&self, _query: &str, variables: &Value) -> Result<GraphqlResponse> {
            self.seen.lock().unwrap().push(variables.clone());
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| Error::Transport("script exhausted".to_string()))
        }
    }

    fn ok(body: Value) -> GraphqlResponse {
        GraphqlResponse {
            status: 200,
            body: body.to_string(),
        }
    }

    fn page(count: usize, start: usize, next: Option<&str>) -> GraphqlResponse {
        let edges: Vec<Value> = (start..start + count)
            .map(|i| {
                json!({ "node": {
                    "title": format!("Discussion {}", i),
                    "bodyText": format!("body {}", i),
                    "createdAt": format!("2024-01-01T00:00:{:02}Z", i % 60),
                    "url": format!("https://github.com/acme/widget/discussions/{}", i),
                    "author": { "login": "octocat" },
                    "comments": { "edges": [
                        { "node": { "bodyText": "first!", "author": null } }
                    ] }
                }})
            })
            .collect();
        ok(json!({ "data": { "repository": { "discussions": {
            "pageInfo": { "endCursor": next, "hasNextPage": next.is_some() },
            "edges": edges,
        }}}}))
    }

    fn repo() -> RepoRef {
        RepoRef::new("acme", "widget")
    }

    #[tokio::test]
    async fn test_three_pages_yield_240_records() {
        let transport = ScriptedTransport::new(vec![
            page(100, 0, Some("c1")),
            page(100, 100, Some("c2")),
            page(40, 200, None),
        ]);
        let fetcher = DiscussionFetcher::new(transport);

        let records = fetcher.fetch(&repo()).await.unwrap();
        assert_eq!(records.len(), 240);
        assert_eq!(records[239].title, "Discussion 239");

        let seen = fetcher.transport().seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen[0]["cursor"].is_null());
        assert_eq!(seen[1]["cursor"], "c1");
        assert_eq!(seen[2]["cursor"], "c2");
        assert_eq!(seen[0]["owner"], "acme");
        assert_eq!(seen[0]["pageSize"], 100);
        assert_eq!(seen[0]["commentCount"], 5);
    }

    #[tokio::test]
    async fn test_record_mapping_and_ghost_authors() {
        let transport = ScriptedTransport::new(vec![page(1, 7, None)]);
        let records = DiscussionFetcher::new(transport)
            .fetch(&repo())
            .await
            .unwrap();
        let r = &records[0];
        assert_eq!(r.body_text, "body 7");
        assert_eq!(r.author, "octocat");
        assert_eq!(r.comments.len(), 1);
        assert_eq!(r.comments[0].author, GHOST_LOGIN);
    }

    #[tokio::test]
    async fn test_http_error_is_transport_error() {
        let transport = ScriptedTransport::new(vec![GraphqlResponse {
            status: 502,
            body: "bad gateway".to_string(),
        }]);
        let err = DiscussionFetcher::new(transport)
            .fetch(&repo())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn test_graphql_errors_are_graph_errors() {
        let transport = ScriptedTransport::new(vec![ok(json!({
            "data": null,
            "errors": [{ "message": "Could not resolve to a Repository" }]
        }))]);
        let err = DiscussionFetcher::new(transport)
            .fetch(&repo())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Graph(_)));
    }

    #[tokio::test]
    async fn test_missing_path_is_schema_error() {
        let transport = ScriptedTransport::new(vec![ok(json!({
            "data": { "repository": null }
        }))]);
        let err = DiscussionFetcher::new(transport)
            .fetch(&repo())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[tokio::test]
    async fn test_failure_on_later_page_propagates() {
        let transport = ScriptedTransport::new(vec![
            page(100, 0, Some("c1")),
            GraphqlResponse {
                status: 401,
                body: "Bad credentials".to_string(),
            },
        ]);
        let err = DiscussionFetcher::new(transport)
            .fetch(&repo())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn test_next_page_without_cursor_is_schema_error() {
        let transport = ScriptedTransport::new(vec![ok(json!({
            "data": { "repository": { "discussions": {
                "pageInfo": { "endCursor": null, "hasNextPage": true },
                "edges": []
            }}}
        }))]);
        let err = DiscussionFetcher::new(transport)
            .fetch(&repo())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[tokio::test]
    async fn test_http_transport_uses_source_config() {
        let config = SourceConfig {
            endpoint: "http://127.0.0.1:1/graphql".to_string(),
            connection_timeout_secs: 1,
            repositories: Vec::new(),
        };
        let transport = HttpTransport::new(&config, "token").unwrap();
        assert_eq!(transport.endpoint(), "http://127.0.0.1:1/graphql");

        let err = transport.post(DISCUSSIONS_QUERY, &json!({})).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
