//! Elasticsearch 호환 HTTP 저장소 클라이언트
//!
//! 파이프라인이 쓰는 좁은 API만 구현합니다.
//!
//! | 동작 | 요청 |
//! |------|------|
//! | ping | `GET /` |
//! | 템플릿 삭제 | `DELETE /_template/{name}` |
//! | 템플릿 생성 | `PUT /_template/{name}` |
//! | 단건 쓰기 | `PUT /{index}/_doc/{id}` 또는 `POST /{index}/_doc` |
//! | 벌크 쓰기 | `POST /_bulk` (NDJSON) |
//! | 검색 | `POST /{index}/_search` |
//! | 새로 고침 | `POST /{index}/_refresh` |
//!
//! `include_type_name`이 켜져 있으면 `_doc` 대신 문서 타입을 경로와 벌크 메타데이터에 넣습니다.

use std::time::Duration;

use logvane_core::config::StoreConfig;
use logvane_core::error::StoreError;
use logvane_core::store::{
    BulkSummary, DocumentStore, IndexRequest, SearchRequest, SortOrder, TemplateDeletion,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::LogPipelineError;

/// Elasticsearch 호환 저장소 클라이언트
#[derive(Debug, Clone)]
pub struct ElasticsearchStore {
    base_url: String,
    http: Client,
    username: Option<String>,
    password: Option<String>,
    include_type_name: bool,
}

impl ElasticsearchStore {
    /// 설정으로 클라이언트를 생성합니다.
    pub fn new(config: &StoreConfig) -> Result<Self, LogPipelineError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| LogPipelineError::Config {
                field: "store".to_owned(),
                reason: format!("failed to construct HTTP client: {e}"),
            })?;

        let (username, password) = if config.username.is_empty() {
            (None, None)
        } else {
            (Some(config.username.clone()), Some(config.password.clone()))
        };

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_owned(),
            http,
            username,
            password,
            include_type_name: config.include_type_name,
        })
    }

    /// 기준 URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let req = self.http.request(method, url);
        match &self.username {
            Some(user) => req.basic_auth(user, self.password.as_deref()),
            None => req,
        }
    }

    fn doc_path(&self, req: &IndexRequest) -> String {
        let type_segment = if self.include_type_name {
            req.document_type.as_str()
        } else {
            "_doc"
        };
        match &req.id {
            Some(id) => format!("{}/{type_segment}/{id}", req.index),
            None => format!("{}/{type_segment}", req.index),
        }
    }

    /// 벌크 요청 본문(NDJSON)을 만듭니다.
    pub fn bulk_body(&self, requests: &[IndexRequest]) -> Result<String, StoreError> {
        let mut body = String::new();
        for req in requests {
            let mut meta = serde_json::Map::new();
            meta.insert("_index".to_owned(), Value::String(req.index.clone()));
            if let Some(id) = &req.id {
                meta.insert("_id".to_owned(), Value::String(id.clone()));
            }
            if self.include_type_name {
                meta.insert("_type".to_owned(), Value::String(req.document_type.clone()));
            }
            let action = json!({ "index": meta });
            body.push_str(&encode(&action)?);
            body.push('\n');
            body.push_str(&encode(&req.body)?);
            body.push('\n');
        }
        Ok(body)
    }
}

fn encode(value: &Value) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::InvalidResponse(e.to_string()))
}

fn connection(err: reqwest::Error) -> StoreError {
    StoreError::Connection(err.to_string())
}

async fn send(req: RequestBuilder) -> Result<Response, StoreError> {
    req.send().await.map_err(connection)
}

async fn expect_success(response: Response) -> Result<Value, StoreError> {
    let status = response.status();
    let text = response.text().await.map_err(connection)?;
    if !status.is_success() {
        return Err(StoreError::Rejected {
            status: status.as_u16(),
            body: text,
        });
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text)
        .map_err(|e| StoreError::InvalidResponse(format!("{e}: {text}")))
}

/// 벌크 응답을 요약합니다.
pub fn summarize_bulk_response(response: &Value) -> Result<BulkSummary, StoreError> {
    let items = response
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| StoreError::InvalidResponse("bulk response has no items".to_owned()))?;

    let mut summary = BulkSummary::default();
    for item in items {
        let Some(result) = item.as_object().and_then(|o| o.values().next()) else {
            summary.record_failure("malformed bulk item");
            continue;
        };
        let status = result.get("status").and_then(Value::as_u64).unwrap_or(0);
        if (200..300).contains(&status) {
            summary.succeeded += 1;
            continue;
        }
        let reason = match result.get("error") {
            Some(err) => format!(
                "{}: {}",
                err.get("type").and_then(Value::as_str).unwrap_or("error"),
                err.get("reason").and_then(Value::as_str).unwrap_or("")
            ),
            None => format!("status {status}"),
        };
        summary.record_failure(reason);
    }
    Ok(summary)
}

impl DocumentStore for ElasticsearchStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let response = send(self.request(Method::GET, "/")).await?;
        expect_success(response).await.map(|_| ())
    }

    async fn delete_template(&self, name: &str) -> Result<TemplateDeletion, StoreError> {
        let response = send(self.request(Method::DELETE, &format!("_template/{name}"))).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(TemplateDeletion::NotFound);
        }
        expect_success(response).await?;
        Ok(TemplateDeletion::Deleted)
    }

    async fn put_template(
        &self,
        name: &str,
        index_pattern: &str,
        mapping: &Value,
    ) -> Result<(), StoreError> {
        let body = json!({
            "index_patterns": [index_pattern],
            "mappings": mapping,
        });
        let response = send(
            self.request(Method::PUT, &format!("_template/{name}"))
                .json(&body),
        )
        .await?;
        expect_success(response).await.map(|_| ())
    }

    async fn index(&self, request: &IndexRequest) -> Result<(), StoreError> {
        let method = if request.id.is_some() {
            Method::PUT
        } else {
            Method::POST
        };
        let response =
            send(self.request(method, &self.doc_path(request)).json(&request.body)).await?;
        expect_success(response).await.map(|_| ())
    }

    async fn bulk_index(&self, requests: &[IndexRequest]) -> Result<BulkSummary, StoreError> {
        if requests.is_empty() {
            return Ok(BulkSummary::default());
        }
        let body = self.bulk_body(requests)?;
        debug!(documents = requests.len(), bytes = body.len(), "sending bulk request");
        let response = send(
            self.request(Method::POST, "_bulk")
                .header(CONTENT_TYPE, "application/x-ndjson")
                .body(body),
        )
        .await?;
        let value = expect_success(response).await?;
        summarize_bulk_response(&value)
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<Value>, StoreError> {
        let sort: Vec<Value> = request
            .sort
            .iter()
            .map(|(field, order)| {
                let order = match order {
                    SortOrder::Asc => "asc",
                    SortOrder::Desc => "desc",
                };
                let mut entry = serde_json::Map::new();
                entry.insert(
                    field.clone(),
                    json!({ "order": order, "unmapped_type": "keyword" }),
                );
                Value::Object(entry)
            })
            .collect();

        let mut body = json!({
            "query": { "match_all": {} },
            "sort": sort,
            "size": request.size,
        });
        if !request.source_fields.is_empty() {
            body["_source"] = json!(request.source_fields);
        }

        let response = send(
            self.request(Method::POST, &format!("{}/_search", request.index))
                .json(&body),
        )
        .await?;
        let value = expect_success(response).await?;
        let hits = value
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .ok_or_else(|| StoreError::InvalidResponse("search response has no hits".to_owned()))?;
        Ok(hits
            .iter()
            .filter_map(|hit| hit.get("_source").cloned())
            .collect())
    }

    async fn refresh(&self, index_pattern: &str) -> Result<(), StoreError> {
        let response = send(
            self.request(Method::POST, &format!("{index_pattern}/_refresh")),
        )
        .await?;
        expect_success(response).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn store_for(url: &str, include_type_name: bool) -> ElasticsearchStore {
        let config = StoreConfig {
            url: url.to_owned(),
            include_type_name,
            ..Default::default()
        };
        ElasticsearchStore::new(&config).unwrap()
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let store = store_for("http://localhost:9200/", false);
        assert_eq!(store.base_url(), "http://localhost:9200");
    }

    #[test]
    fn bulk_body_is_ndjson() {
        let store = store_for("http://localhost:9200", false);
        let reqs = vec![
            IndexRequest::new("iislog-2023.01", "iislog", json!({"a": 1})).with_id("f:10"),
            IndexRequest::new("iislog-2023.01", "iislog", json!({"a": 2})),
        ];
        let body = store.bulk_body(&reqs).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 4);
        let meta: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(meta["index"]["_index"], "iislog-2023.01");
        assert_eq!(meta["index"]["_id"], "f:10");
        assert!(meta["index"].get("_type").is_none());
        assert!(body.ends_with('\n'));
    }

    #[test]
    fn legacy_mode_adds_type() {
        let store = store_for("http://localhost:9200", true);
        let req = IndexRequest::new("routerlog-2024.01", "routerlog", json!({}));
        assert_eq!(store.doc_path(&req), "routerlog-2024.01/routerlog");
        let body = store.bulk_body(&[req]).unwrap();
        assert!(body.contains("\"_type\":\"routerlog\""));
    }

    #[test]
    fn summarize_counts_item_failures() {
        let response = json!({
            "errors": true,
            "items": [
                {"index": {"status": 201}},
                {"index": {"status": 200}},
                {"index": {"status": 400, "error": {"type": "mapper_parsing_exception", "reason": "bad ip"}}},
            ]
        });
        let summary = summarize_bulk_response(&response).unwrap();
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errors[0], "mapper_parsing_exception: bad ip");
    }

    #[tokio::test]
    async fn delete_missing_template_is_not_found() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/_template/iislog_template")
            .with_status(404)
            .with_body(r#"{"error":"index_template_missing_exception","status":404}"#)
            .create_async()
            .await;

        let store = store_for(&server.url(), false);
        let result = store.delete_template("iislog_template").await.unwrap();
        assert_eq!(result, TemplateDeletion::NotFound);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_existing_template() {
        let mut server = Server::new_async().await;
        server
            .mock("DELETE", "/_template/routerlog_template")
            .with_status(200)
            .with_body(r#"{"acknowledged":true}"#)
            .create_async()
            .await;

        let store = store_for(&server.url(), false);
        assert_eq!(
            store.delete_template("routerlog_template").await.unwrap(),
            TemplateDeletion::Deleted
        );
    }

    #[tokio::test]
    async fn put_template_sends_pattern_and_mapping() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/_template/routerlog_template")
            .match_body(Matcher::PartialJson(json!({
                "index_patterns": ["routerlog-*"],
                "mappings": {"properties": {"SRC": {"type": "ip"}}}
            })))
            .with_status(200)
            .with_body(r#"{"acknowledged":true}"#)
            .create_async()
            .await;

        let store = store_for(&server.url(), false);
        store
            .put_template(
                "routerlog_template",
                "routerlog-*",
                &json!({"properties": {"SRC": {"type": "ip"}}}),
            )
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn index_with_id_uses_put() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/iislog-2023.01/_doc/u_ex230105.log:4096")
            .with_status(201)
            .with_body(r#"{"result":"created"}"#)
            .create_async()
            .await;

        let store = store_for(&server.url(), false);
        let req = IndexRequest::new("iislog-2023.01", "iislog", json!({"offset": 4096}))
            .with_id("u_ex230105.log:4096");
        store.index(&req).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_write_reports_status() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/routerlog-2024.01/_doc")
            .with_status(400)
            .with_body("mapper_parsing_exception")
            .create_async()
            .await;

        let store = store_for(&server.url(), false);
        let req = IndexRequest::new("routerlog-2024.01", "routerlog", json!({}));
        let err = store.index(&req).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected { status: 400, .. }));
    }

    #[tokio::test]
    async fn bulk_index_parses_summary() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/_bulk")
            .match_header("content-type", "application/x-ndjson")
            .with_status(200)
            .with_body(
                r#"{"errors":false,"items":[{"index":{"status":201}},{"index":{"status":201}}]}"#,
            )
            .create_async()
            .await;

        let store = store_for(&server.url(), false);
        let reqs = vec![
            IndexRequest::new("iislog-2023.01", "iislog", json!({})),
            IndexRequest::new("iislog-2023.02", "iislog", json!({})),
        ];
        let summary = store.bulk_index(&reqs).await.unwrap();
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn search_returns_sources() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/iislog-*/_search")
            .match_body(Matcher::PartialJson(json!({
                "_source": ["file", "offset"],
                "size": 1
            })))
            .with_status(200)
            .with_body(
                r#"{"hits":{"total":{"value":1},"hits":[{"_id":"x","_source":{"file":"u_ex230105.log","offset":4096}}]}}"#,
            )
            .create_async()
            .await;

        let store = store_for(&server.url(), false);
        let request = SearchRequest {
            index: "iislog-*".to_owned(),
            source_fields: vec!["file".to_owned(), "offset".to_owned()],
            sort: vec![
                ("file".to_owned(), SortOrder::Desc),
                ("offset".to_owned(), SortOrder::Desc),
            ],
            size: 1,
        };
        let hits = store.search(&request).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["file"], "u_ex230105.log");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn basic_auth_header_is_sent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_header("authorization", Matcher::Regex("^Basic ".to_owned()))
            .with_status(200)
            .with_body(r#"{"version":{"number":"8.11.0"}}"#)
            .create_async()
            .await;

        let config = StoreConfig {
            url: server.url(),
            username: "ingest".to_owned(),
            password: "secret".to_owned(),
            ..Default::default()
        };
        ElasticsearchStore::new(&config).unwrap().ping().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unreachable_store_is_connection_error() {
        let store = store_for("http://127.0.0.1:1", false);
        let err = store.ping().await.unwrap_err();
        assert!(matches!(err, StoreError::Connection(_)));
    }
}
