//! Typed operations of the knowledge-base agent API.

use async_trait::async_trait;
use log::debug;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::model::{
    Backlink, Database, DatabaseSummary, DeletedPage, DeletedRow, Envelope, Graph, ListEnvelope,
    Page, PageList, Row, RowList, SearchResult, SearchResults,
};

pub const DEFAULT_SEARCH_LIMIT: u32 = 20;
pub const DEFAULT_LIST_LIMIT: u32 = 50;
pub const DEFAULT_ROW_LIMIT: u32 = 50;
pub const DEFAULT_GRAPH_DEPTH: u32 = 2;

/// Body of a page creation request.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct NewPage {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl NewPage {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Filters and window for `list_pages`.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPagesQuery {
    pub limit: u32,
    pub offset: u32,
    /// Only children of this page.
    pub parent_id: Option<String>,
    /// Case-insensitive title filter.
    pub search: Option<String>,
}

impl Default for ListPagesQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
            parent_id: None,
            search: None,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Full-text search across all pages.
    async fn search(&self, query: &str, limit: u32, offset: u32) -> Result<SearchResults>;
    /// A single page including its markdown body.
    async fn read_page(&self, id: &str) -> Result<Page>;
    async fn create_page(&self, page: &NewPage) -> Result<Page>;
    /// Replaces the markdown body of a page.
    async fn update_page(&self, id: &str, markdown: &str) -> Result<Page>;
    async fn delete_page(&self, id: &str) -> Result<DeletedPage>;
    async fn list_pages(&self, query: &ListPagesQuery) -> Result<PageList>;
    /// Pages linking to the given page.
    async fn backlinks(&self, id: &str) -> Result<Vec<Backlink>>;
    /// The link graph, centred on `page_id` when given.
    async fn graph(&self, page_id: Option<String>, depth: u32) -> Result<Graph>;
    async fn list_databases(&self) -> Result<Vec<DatabaseSummary>>;
    /// A database with its column schema.
    async fn read_database(&self, id: &str) -> Result<Database>;
    async fn query_rows(&self, database_id: &str, limit: u32, offset: u32) -> Result<RowList>;
    /// Adds a row; `properties` is validated against the database schema.
    async fn create_row(&self, database_id: &str, properties: &Map<String, Value>) -> Result<Row>;
    async fn update_row(
        &self,
        database_id: &str,
        row_id: &str,
        properties: &Map<String, Value>,
    ) -> Result<Row>;
    async fn delete_row(&self, database_id: &str, row_id: &str) -> Result<DeletedRow>;
}

/// Wire shapes of individual endpoints (internal).
mod api {
    use serde::Deserialize;

    use crate::model::Page;

    #[derive(Deserialize, Debug)]
    pub struct PageDetail {
        pub id: String,
        pub title: String,
        pub icon: Option<String>,
        pub parent_id: Option<String>,
        pub markdown: Option<String>,
        pub created_at: Option<String>,
        pub updated_at: Option<String>,
    }

    #[derive(Deserialize, Debug)]
    pub struct CreatedPage {
        pub id: String,
        pub title: String,
        pub created_at: Option<String>,
    }

    #[derive(Deserialize, Debug)]
    pub struct UpdatedPage {
        pub id: String,
        #[serde(default)]
        pub title: String,
        pub updated_at: Option<String>,
    }

    #[derive(Deserialize, Debug)]
    pub struct PageSummary {
        pub id: String,
        pub title: String,
        pub icon: Option<String>,
        pub parent_id: Option<String>,
        pub created_at: Option<String>,
        pub updated_at: Option<String>,
    }

    impl From<PageDetail> for Page {
        fn from(p: PageDetail) -> Self {
            Page {
                id: p.id,
                title: p.title,
                icon: p.icon,
                parent_id: p.parent_id,
                markdown: Some(p.markdown.unwrap_or_default()),
                created_at: p.created_at,
                updated_at: p.updated_at,
            }
        }
    }

    impl From<CreatedPage> for Page {
        fn from(p: CreatedPage) -> Self {
            Page {
                id: p.id,
                title: p.title,
                created_at: p.created_at,
                ..Default::default()
            }
        }
    }

    impl From<UpdatedPage> for Page {
        fn from(p: UpdatedPage) -> Self {
            Page {
                id: p.id,
                title: p.title,
                updated_at: p.updated_at,
                ..Default::default()
            }
        }
    }

    impl From<PageSummary> for Page {
        fn from(p: PageSummary) -> Self {
            Page {
                id: p.id,
                title: p.title,
                icon: p.icon,
                parent_id: p.parent_id,
                markdown: None,
                created_at: p.created_at,
                updated_at: p.updated_at,
            }
        }
    }
}

/// HTTP implementation of [`KnowledgeBase`].
#[derive(Clone)]
pub struct KbClient {
    http_client: HttpClient,
}

impl KbClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self::from_http_client(HttpClient::from_config(config)?))
    }

    /// Create from an existing HttpClient.
    pub fn from_http_client(http_client: HttpClient) -> Self {
        Self { http_client }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Envelope<T>> {
        self.http_client.request(method, path, query, body).await
    }

    async fn call_list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<ListEnvelope<T>> {
        self.http_client.request(Method::GET, path, query, None).await
    }
}

fn to_body<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(Error::Encode)
}

#[async_trait]
impl KnowledgeBase for KbClient {
    #[tracing::instrument(skip(self))]
    async fn search(&self, query: &str, limit: u32, offset: u32) -> Result<SearchResults> {
        let params = [
            ("q", query.to_string()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ];
        let envelope: ListEnvelope<SearchResult> = self.call_list("/search", &params).await?;

        let (results, meta) = envelope.into_parts();
        let (total, limit, offset) = meta.resolve(results.len(), limit, offset);
        debug!("Search '{}' returned {} of {} results", query, results.len(), total);

        Ok(SearchResults {
            results,
            total,
            limit,
            offset,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn read_page(&self, id: &str) -> Result<Page> {
        let envelope: Envelope<api::PageDetail> = self
            .call(Method::GET, &format!("/pages/{}", id), &[], None)
            .await?;
        Ok(envelope.data.into())
    }

    #[tracing::instrument(skip(self, page), fields(title = %page.title))]
    async fn create_page(&self, page: &NewPage) -> Result<Page> {
        let body = to_body(page)?;
        let envelope: Envelope<api::CreatedPage> =
            self.call(Method::POST, "/pages", &[], Some(&body)).await?;
        debug!("Created page {}", envelope.data.id);
        Ok(envelope.data.into())
    }

    #[tracing::instrument(skip(self, markdown))]
    async fn update_page(&self, id: &str, markdown: &str) -> Result<Page> {
        let body = serde_json::json!({ "markdown": markdown });
        let envelope: Envelope<api::UpdatedPage> = self
            .call(Method::PUT, &format!("/pages/{}", id), &[], Some(&body))
            .await?;
        Ok(envelope.data.into())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_page(&self, id: &str) -> Result<DeletedPage> {
        let envelope: Envelope<DeletedPage> = self
            .call(Method::DELETE, &format!("/pages/{}", id), &[], None)
            .await?;
        Ok(envelope.data)
    }

    #[tracing::instrument(skip(self))]
    async fn list_pages(&self, query: &ListPagesQuery) -> Result<PageList> {
        let mut params = vec![
            ("limit", query.limit.to_string()),
            ("offset", query.offset.to_string()),
        ];
        if let Some(parent_id) = &query.parent_id {
            params.push(("parent_id", parent_id.clone()));
        }
        if let Some(search) = &query.search {
            params.push(("search", search.clone()));
        }

        let envelope: ListEnvelope<api::PageSummary> = self.call_list("/pages", &params).await?;

        let (pages, meta) = envelope.into_parts();
        let (total, limit, offset) = meta.resolve(pages.len(), query.limit, query.offset);

        Ok(PageList {
            pages: pages.into_iter().map(Page::from).collect(),
            total,
            limit,
            offset,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn backlinks(&self, id: &str) -> Result<Vec<Backlink>> {
        let envelope: ListEnvelope<Backlink> = self
            .call_list(&format!("/pages/{}/backlinks", id), &[])
            .await?;
        Ok(envelope.into_parts().0)
    }

    #[tracing::instrument(skip(self))]
    async fn graph(&self, page_id: Option<String>, depth: u32) -> Result<Graph> {
        let mut params = vec![("depth", depth.to_string())];
        if let Some(page_id) = page_id {
            params.push(("pageId", page_id));
        }
        let envelope: Envelope<Graph> = self.call(Method::GET, "/graph", &params, None).await?;
        Ok(envelope.data)
    }

    #[tracing::instrument(skip(self))]
    async fn list_databases(&self) -> Result<Vec<DatabaseSummary>> {
        let envelope: ListEnvelope<DatabaseSummary> = self.call_list("/databases", &[]).await?;
        Ok(envelope.into_parts().0)
    }

    #[tracing::instrument(skip(self))]
    async fn read_database(&self, id: &str) -> Result<Database> {
        let envelope: Envelope<Database> = self
            .call(Method::GET, &format!("/databases/{}", id), &[], None)
            .await?;
        Ok(envelope.data)
    }

    #[tracing::instrument(skip(self))]
    async fn query_rows(&self, database_id: &str, limit: u32, offset: u32) -> Result<RowList> {
        let params = [("limit", limit.to_string()), ("offset", offset.to_string())];
        let envelope: ListEnvelope<Row> = self
            .call_list(&format!("/databases/{}/rows", database_id), &params)
            .await?;

        let (rows, meta) = envelope.into_parts();
        let (total, limit, offset) = meta.resolve(rows.len(), limit, offset);
        debug!("Database {} returned {} of {} rows", database_id, rows.len(), total);

        Ok(RowList {
            rows,
            total,
            limit,
            offset,
        })
    }

    #[tracing::instrument(skip(self, properties))]
    async fn create_row(&self, database_id: &str, properties: &Map<String, Value>) -> Result<Row> {
        let body = serde_json::json!({ "properties": properties });
        let envelope: Envelope<Row> = self
            .call(
                Method::POST,
                &format!("/databases/{}/rows", database_id),
                &[],
                Some(&body),
            )
            .await?;
        debug!("Created row {} in database {}", envelope.data.id, database_id);
        Ok(envelope.data)
    }

    #[tracing::instrument(skip(self, properties))]
    async fn update_row(
        &self,
        database_id: &str,
        row_id: &str,
        properties: &Map<String, Value>,
    ) -> Result<Row> {
        let body = serde_json::json!({ "properties": properties });
        let envelope: Envelope<Row> = self
            .call(
                Method::PUT,
                &format!("/databases/{}/rows/{}", database_id, row_id),
                &[],
                Some(&body),
            )
            .await?;
        Ok(envelope.data)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_row(&self, database_id: &str, row_id: &str) -> Result<DeletedRow> {
        let envelope: Envelope<DeletedRow> = self
            .call(
                Method::DELETE,
                &format!("/databases/{}/rows/{}", database_id, row_id),
                &[],
                None,
            )
            .await?;
        Ok(envelope.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use reqwest::Client;
    use serde_json::json;

    fn client_for(server: &mockito::Server) -> KbClient {
        KbClient::from_http_client(HttpClient::new(Client::new(), &server.url(), 3))
    }

    #[tokio::test]
    async fn test_search() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/agent/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "deployment guide".into()),
                Matcher::UrlEncoded("limit".into(), "20".into()),
                Matcher::UrlEncoded("offset".into(), "0".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "data": [
                        {"page_id": "p1", "title": "Deploying", "snippet": "the <b>deployment</b>", "score": 0.82, "icon": "🚀"},
                        {"page_id": "p2", "title": "Guide", "snippet": "a guide", "score": 0.4, "icon": null}
                    ],
                    "meta": {"total": 12, "limit": 20, "offset": 0}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let results = client_for(&server)
            .search("deployment guide", DEFAULT_SEARCH_LIMIT, 0)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(results.total, 12);
        assert_eq!(results.results.len(), 2);
        assert_eq!(results.results[0].page_id, "p1");
        assert_eq!(results.results[0].icon.as_deref(), Some("🚀"));
        assert_eq!(results.results[1].icon, None);
    }

    #[tokio::test]
    async fn test_search_meta_defaults() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/agent/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"data": [{"page_id": "p1", "title": "T", "snippet": "s", "score": 1.0}]}"#,
            )
            .create_async()
            .await;

        let results = client_for(&server).search("x", 5, 10).await.unwrap();

        assert_eq!(results.total, 1);
        assert_eq!(results.limit, 5);
        assert_eq!(results.offset, 10);
    }

    #[tokio::test]
    async fn test_search_without_data_is_empty() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/agent/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"meta": {}}"#)
            .create_async()
            .await;

        let results = client_for(&server).search("x", 20, 0).await.unwrap();

        assert!(results.results.is_empty());
        assert_eq!((results.total, results.limit, results.offset), (0, 20, 0));
    }

    #[tokio::test]
    async fn test_search_validation_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/agent/search")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error": {"code": "VALIDATION_ERROR", "message": "Invalid query"}}"#)
            .create_async()
            .await;

        let err = client_for(&server).search("", 20, 0).await.unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(err.code(), Some("VALIDATION_ERROR"));
    }

    #[tokio::test]
    async fn test_read_page() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/agent/pages/p1")
            .with_status(200)
            .with_body(
                json!({"data": {
                    "id": "p1", "title": "Hello", "icon": null, "parent_id": "root",
                    "markdown": "# Hello", "created_at": "2025-01-01T00:00:00Z",
                    "updated_at": "2025-01-02T00:00:00Z"
                }, "meta": {}})
                .to_string(),
            )
            .create_async()
            .await;

        let page = client_for(&server).read_page("p1").await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            page,
            Page {
                id: "p1".to_string(),
                title: "Hello".to_string(),
                icon: None,
                parent_id: Some("root".to_string()),
                markdown: Some("# Hello".to_string()),
                created_at: Some("2025-01-01T00:00:00Z".to_string()),
                updated_at: Some("2025-01-02T00:00:00Z".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_read_page_without_markdown_defaults_to_empty() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/agent/pages/p1")
            .with_status(200)
            .with_body(r#"{"data": {"id": "p1", "title": "Empty"}}"#)
            .create_async()
            .await;

        let page = client_for(&server).read_page("p1").await.unwrap();
        assert_eq!(page.markdown.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_read_page_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/agent/pages/missing")
            .with_status(404)
            .with_body(r#"{"error": {"code": "NOT_FOUND", "message": "Page not found"}}"#)
            .create_async()
            .await;

        let err = client_for(&server).read_page("missing").await.unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_read_page_missing_data_is_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/agent/pages/p1")
            .with_status(200)
            .with_body(r#"{"meta": {}}"#)
            .create_async()
            .await;

        let err = client_for(&server).read_page("p1").await.unwrap_err();
        assert!(matches!(err, Error::Server(_)));
    }

    #[tokio::test]
    async fn test_create_page_round_trips_title_and_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/agent/pages")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "title": "Agent API Test Page",
                "markdown": "# Hello",
                "icon": "🐍"
            })))
            .with_status(201)
            .with_body(
                r#"{"data": {"id": "new-id", "title": "Agent API Test Page", "created_at": "2025-01-01T00:00:00Z"}}"#,
            )
            .create_async()
            .await;

        let page = client_for(&server)
            .create_page(&NewPage {
                title: "Agent API Test Page".to_string(),
                markdown: Some("# Hello".to_string()),
                icon: Some("🐍".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(page.id, "new-id");
        assert_eq!(page.title, "Agent API Test Page");
        assert_eq!(page.created_at.as_deref(), Some("2025-01-01T00:00:00Z"));
        assert_eq!(page.markdown, None);
    }

    #[tokio::test]
    async fn test_create_page_omits_unset_fields() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/agent/pages")
            .match_body(Matcher::Json(json!({ "title": "Bare" })))
            .with_status(201)
            .with_body(r#"{"data": {"id": "b1", "title": "Bare"}}"#)
            .create_async()
            .await;

        client_for(&server)
            .create_page(&NewPage::new("Bare"))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_page() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/api/agent/pages/p1")
            .match_body(Matcher::Json(json!({ "markdown": "# Updated" })))
            .with_status(200)
            .with_body(r#"{"data": {"id": "p1", "updated_at": "2025-02-01T00:00:00Z"}}"#)
            .create_async()
            .await;

        let page = client_for(&server)
            .update_page("p1", "# Updated")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(page.id, "p1");
        assert_eq!(page.title, "");
        assert_eq!(page.updated_at.as_deref(), Some("2025-02-01T00:00:00Z"));
    }

    #[tokio::test]
    async fn test_delete_page() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/api/agent/pages/p1")
            .with_status(200)
            .with_body(r#"{"data": {"id": "p1", "deleted_at": "2025-03-01T00:00:00Z"}}"#)
            .create_async()
            .await;

        let deleted = client_for(&server).delete_page("p1").await.unwrap();

        mock.assert_async().await;
        assert_eq!(deleted.id, "p1");
        assert_eq!(deleted.deleted_at.as_deref(), Some("2025-03-01T00:00:00Z"));
    }

    #[tokio::test]
    async fn test_list_pages_with_filters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/agent/pages?limit=5&offset=10&parent_id=root&search=notes")
            .with_status(200)
            .with_body(
                json!({
                    "data": [
                        {"id": "c1", "title": "Meeting notes", "icon": null, "parent_id": "root",
                         "created_at": "2025-01-01T00:00:00Z", "updated_at": "2025-01-01T00:00:00Z"}
                    ],
                    "meta": {"total": 11, "limit": 5, "offset": 10}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let list = client_for(&server)
            .list_pages(&ListPagesQuery {
                limit: 5,
                offset: 10,
                parent_id: Some("root".to_string()),
                search: Some("notes".to_string()),
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(list.total, 11);
        assert_eq!(list.pages.len(), 1);
        assert_eq!(list.pages[0].parent_id.as_deref(), Some("root"));
        assert_eq!(list.pages[0].markdown, None);
    }

    #[tokio::test]
    async fn test_list_pages_meta_defaults() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/agent/pages?limit=50&offset=0")
            .with_status(200)
            .with_body(r#"{"data": [{"id": "a", "title": "A"}, {"id": "b", "title": "B"}]}"#)
            .create_async()
            .await;

        let list = client_for(&server)
            .list_pages(&ListPagesQuery::default())
            .await
            .unwrap();

        assert_eq!(list.total, 2);
        assert_eq!(list.limit, DEFAULT_LIST_LIMIT);
        assert_eq!(list.offset, 0);
    }

    #[tokio::test]
    async fn test_list_pages_null_data_is_empty() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/agent/pages?limit=50&offset=0")
            .with_status(200)
            .with_body(r#"{"data": null}"#)
            .create_async()
            .await;

        let list = client_for(&server)
            .list_pages(&ListPagesQuery::default())
            .await
            .unwrap();

        assert!(list.pages.is_empty());
        assert_eq!(list.total, 0);
        assert_eq!(list.limit, DEFAULT_LIST_LIMIT);
    }

    #[tokio::test]
    async fn test_list_pages_retries_after_rate_limit() {
        let mut server = mockito::Server::new_async().await;
        let limited = server
            .mock("GET", "/api/agent/pages?limit=50&offset=0")
            .with_status(429)
            .with_header("retry-after", "0")
            .with_body(r#"{"error": {"code": "RATE_LIMIT_EXCEEDED", "message": "slow down"}}"#)
            .expect(2)
            .create_async()
            .await;
        let ok = server
            .mock("GET", "/api/agent/pages?limit=50&offset=0")
            .with_status(200)
            .with_body(r#"{"data": [{"id": "a", "title": "A"}], "meta": {"total": 1}}"#)
            .expect(1)
            .create_async()
            .await;

        let list = client_for(&server)
            .list_pages(&ListPagesQuery::default())
            .await
            .unwrap();

        limited.assert_async().await;
        ok.assert_async().await;
        assert_eq!(list.pages[0].id, "a");
    }

    #[tokio::test]
    async fn test_backlinks() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/agent/pages/p1/backlinks")
            .with_status(200)
            .with_body(r#"{"data": [{"id": "p2", "title": "Linker", "icon": null}]}"#)
            .create_async()
            .await;

        let links = client_for(&server).backlinks("p1").await.unwrap();
        assert_eq!(
            links,
            vec![Backlink {
                id: "p2".to_string(),
                title: "Linker".to_string(),
                icon: None
            }]
        );
    }

    #[tokio::test]
    async fn test_graph_centered_on_page() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/agent/graph?depth=1&pageId=p1")
            .with_status(200)
            .with_body(
                r#"{"data": {"nodes": [{"id": "p1", "label": "One", "icon": null, "link_count": 1},
                                      {"id": "p2", "label": "Two", "icon": null, "link_count": 1}],
                             "edges": [{"source": "p1", "target": "p2"}]}}"#,
            )
            .create_async()
            .await;

        let graph = client_for(&server)
            .graph(Some("p1".to_string()), 1)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges[0].target, "p2");
    }

    #[tokio::test]
    async fn test_backlinks_without_data_is_empty() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/agent/pages/p1/backlinks")
            .with_status(200)
            .with_body(r#"{}"#)
            .create_async()
            .await;

        let links = client_for(&server).backlinks("p1").await.unwrap();
        assert!(links.is_empty());
    }

    #[test]
    fn test_to_body_encode_failure() {
        let mut map = std::collections::BTreeMap::new();
        map.insert((1, 2), "non-string key");

        let err = to_body(&map).unwrap_err();
        assert!(matches!(err, Error::Encode(_)));
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn test_list_databases() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/agent/databases")
            .with_status(200)
            .with_body(
                json!({
                    "data": [{
                        "id": "d1", "title": "Bug Tracker", "page_id": "p1", "icon": "🐛",
                        "column_count": 4, "row_count": 12,
                        "created_at": "2025-01-01T00:00:00Z", "updated_at": "2025-01-02T00:00:00Z"
                    }],
                    "meta": {"total": 1, "limit": 1, "offset": 0}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let databases = client_for(&server).list_databases().await.unwrap();

        mock.assert_async().await;
        assert_eq!(databases.len(), 1);
        assert_eq!(databases[0].title, "Bug Tracker");
        assert_eq!(databases[0].row_count, 12);
    }

    #[tokio::test]
    async fn test_read_database_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/agent/databases/d404")
            .with_status(404)
            .with_body(r#"{"error": {"code": "NOT_FOUND", "message": "Database not found"}}"#)
            .create_async()
            .await;

        let err = client_for(&server).read_database("d404").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(err.code(), Some("NOT_FOUND"));
    }

    #[tokio::test]
    async fn test_query_rows() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/agent/databases/d1/rows?limit=2&offset=4")
            .with_status(200)
            .with_body(
                json!({
                    "data": [{
                        "id": "r1",
                        "properties": {"title": {"type": "TITLE", "value": "Crash on save"}},
                        "page_id": "p9",
                        "created_at": "2025-01-01T00:00:00Z", "updated_at": "2025-01-01T00:00:00Z"
                    }],
                    "meta": {"total": 5, "limit": 2, "offset": 4}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let rows = client_for(&server).query_rows("d1", 2, 4).await.unwrap();

        mock.assert_async().await;
        assert_eq!((rows.total, rows.limit, rows.offset), (5, 2, 4));
        assert_eq!(rows.rows[0].properties["title"]["value"], "Crash on save");
    }

    #[tokio::test]
    async fn test_create_row_wraps_properties() {
        let properties = json!({"title": {"type": "TITLE", "value": "New bug"}});
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/agent/databases/d1/rows")
            .match_body(Matcher::Json(json!({ "properties": properties.clone() })))
            .with_status(201)
            .with_body(
                json!({"data": {"id": "r2", "properties": properties.clone(), "page_id": "p10",
                                "created_at": "2025-01-03T00:00:00Z"}})
                .to_string(),
            )
            .create_async()
            .await;

        let row = client_for(&server)
            .create_row("d1", properties.as_object().unwrap())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(row.id, "r2");
        assert_eq!(row.page_id.as_deref(), Some("p10"));
        assert_eq!(row.updated_at, None);
    }

    #[tokio::test]
    async fn test_update_and_delete_row() {
        let properties = json!({"status": {"type": "SELECT", "value": "Done"}});
        let mut server = mockito::Server::new_async().await;
        let update = server
            .mock("PUT", "/api/agent/databases/d1/rows/r1")
            .match_body(Matcher::Json(json!({ "properties": properties.clone() })))
            .with_status(200)
            .with_body(
                json!({"data": {"id": "r1", "properties": properties.clone(),
                                "updated_at": "2025-01-04T00:00:00Z"}})
                .to_string(),
            )
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/api/agent/databases/d1/rows/r1")
            .with_status(200)
            .with_body(r#"{"data": {"id": "r1", "deleted_at": "2025-01-05T00:00:00Z"}}"#)
            .create_async()
            .await;

        let kb = client_for(&server);
        let row = kb
            .update_row("d1", "r1", properties.as_object().unwrap())
            .await
            .unwrap();
        let deleted = kb.delete_row("d1", "r1").await.unwrap();

        update.assert_async().await;
        delete.assert_async().await;
        assert_eq!(row.updated_at.as_deref(), Some("2025-01-04T00:00:00Z"));
        assert_eq!(deleted.id, "r1");
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_authentication_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/agent/pages/p1/backlinks")
            .with_status(401)
            .with_body(r#"{"error": {"code": "UNAUTHORIZED", "message": "Invalid API key"}}"#)
            .create_async()
            .await;

        let err = client_for(&server).backlinks("p1").await.unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
    }
}
