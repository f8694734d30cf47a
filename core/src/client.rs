//! Uniform CRUD client for one REST resource.
//!
//! # Design
//! `ResourceClient` holds only its normalized path and a shared transport.
//! Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and an executing method that sends it and decodes the
//! response through `crate::response`. Hosts that perform I/O themselves
//! use the `build_*` half and decode with the `response` functions.
//!
//! Every URL the client produces ends in a slash:
//!
//! | operation | method     | path                  |
//! |-----------|------------|-----------------------|
//! | list      | GET        | `/resource/`          |
//! | get       | GET        | `/resource/{id}/`     |
//! | create    | POST       | `/resource/`          |
//! | update    | PUT        | `/resource/{id}/`     |
//! | remove    | DELETE     | `/resource/{id}/`     |
//! | action    | POST / GET | `/resource/{action}/` |
//!
//! Ids and action names must be a single path component; anything else
//! fails with `ApiError::InvalidSegment` before a request is built.
//!
//! `list` expects a JSON array, possibly wrapped in a paginated or `data`
//! envelope (see `response::normalize_list`).

use std::fmt::Display;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};
use crate::path;
use crate::response;
use crate::transport::{RequestOptions, TransportClient};
use crate::types::Page;

#[derive(Debug, Clone)]
pub struct ResourceClient {
    path: String,
    transport: Arc<TransportClient>,
}

impl ResourceClient {
    pub fn new(resource_path: &str, transport: Arc<TransportClient>) -> Self {
        Self {
            path: path::normalize(resource_path),
            transport,
        }
    }

    /// Normalized resource path, e.g. `/masters/bins/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn item_path(&self, segment: impl Display) -> Result<String, ApiError> {
        path::join(&self.path, &segment.to_string())
    }

    pub fn build_list(&self, options: &RequestOptions) -> HttpRequest {
        self.transport.prepare(HttpMethod::Get, &self.path, None, options)
    }

    pub fn build_get(&self, id: impl Display, options: &RequestOptions) -> Result<HttpRequest, ApiError> {
        let item = self.item_path(id)?;
        Ok(self.transport.prepare(HttpMethod::Get, &item, None, options))
    }

    pub fn build_create<P>(&self, payload: &P, options: &RequestOptions) -> Result<HttpRequest, ApiError>
    where
        P: Serialize + ?Sized,
    {
        let body = to_json(payload)?;
        Ok(self.transport.prepare(HttpMethod::Post, &self.path, Some(body), options))
    }

    pub fn build_update<P>(
        &self,
        id: impl Display,
        payload: &P,
        options: &RequestOptions,
    ) -> Result<HttpRequest, ApiError>
    where
        P: Serialize + ?Sized,
    {
        let item = self.item_path(id)?;
        let body = to_json(payload)?;
        Ok(self.transport.prepare(HttpMethod::Put, &item, Some(body), options))
    }

    pub fn build_remove(&self, id: impl Display, options: &RequestOptions) -> Result<HttpRequest, ApiError> {
        let item = self.item_path(id)?;
        Ok(self.transport.prepare(HttpMethod::Delete, &item, None, options))
    }

    /// POST when a payload is given, GET otherwise.
    pub fn build_action<P>(
        &self,
        action: &str,
        payload: Option<&P>,
        options: &RequestOptions,
    ) -> Result<HttpRequest, ApiError>
    where
        P: Serialize + ?Sized,
    {
        let action_path = self.item_path(action)?;
        Ok(match payload {
            Some(payload) => {
                let body = to_json(payload)?;
                self.transport.prepare(HttpMethod::Post, &action_path, Some(body), options)
            }
            None => self.transport.prepare(HttpMethod::Get, &action_path, None, options),
        })
    }

    pub fn list<T: DeserializeOwned>(&self, options: &RequestOptions) -> Result<Vec<T>, ApiError> {
        let response = self.transport.execute(self.build_list(options))?;
        response::decode_list(response)
    }

    /// Like `list`, keeping pagination metadata.
    pub fn list_page<T: DeserializeOwned>(&self, options: &RequestOptions) -> Result<Page<T>, ApiError> {
        let response = self.transport.execute(self.build_list(options))?;
        response::decode_page(response)
    }

    pub fn get<T: DeserializeOwned>(&self, id: impl Display, options: &RequestOptions) -> Result<T, ApiError> {
        let response = self.transport.execute(self.build_get(id, options)?)?;
        response::decode_item(response)
    }

    pub fn create<P, T>(&self, payload: &P, options: &RequestOptions) -> Result<T, ApiError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.transport.execute(self.build_create(payload, options)?)?;
        response::decode_item(response)
    }

    pub fn update<P, T>(&self, id: impl Display, payload: &P, options: &RequestOptions) -> Result<T, ApiError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.transport.execute(self.build_update(id, payload, options)?)?;
        response::decode_item(response)
    }

    pub fn remove(&self, id: impl Display, options: &RequestOptions) -> Result<(), ApiError> {
        let response = self.transport.execute(self.build_remove(id, options)?)?;
        response::decode_empty(response)
    }

    pub fn action<P, R>(&self, action: &str, payload: Option<&P>, options: &RequestOptions) -> Result<R, ApiError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.transport.execute(self.build_action(action, payload, options)?)?;
        response::decode_item(response)
    }
}

fn to_json<P: Serialize + ?Sized>(payload: &P) -> Result<String, ApiError> {
    serde_json::to_string(payload).map_err(|e| ApiError::SerializationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use serde_json::{json, Value};

    use crate::config::AudienceConfig;
    use crate::http::{HostIo, HttpExecutor, HttpResponse};
    use crate::session::{MemorySessionStore, SessionStore, TOKEN_KEY};
    use crate::transport::BearerAuth;

    /// Records requests and replays canned responses.
    #[derive(Default)]
    struct Scripted {
        seen: Mutex<Vec<HttpRequest>>,
        replies: Mutex<VecDeque<HttpResponse>>,
    }

    impl Scripted {
        fn reply(&self, status: u16, body: &str) {
            self.replies.lock().unwrap().push_back(HttpResponse {
                status,
                headers: Vec::new(),
                body: body.to_string(),
            });
        }

        fn last(&self) -> HttpRequest {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl HttpExecutor for Scripted {
        fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            self.seen.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ApiError::network("no scripted reply"))
        }
    }

    fn transport(executor: Arc<dyn HttpExecutor>) -> Arc<TransportClient> {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        store.set(TOKEN_KEY, "tok");
        let auth = Arc::new(BearerAuth::new(store, "auth/login"));
        Arc::new(TransportClient::new(
            &AudienceConfig::new("http://localhost:8000/api"),
            auth,
            executor,
        ))
    }

    fn bins() -> ResourceClient {
        ResourceClient::new("bins", transport(Arc::new(HostIo)))
    }

    const BASE: &str = "http://localhost:8000/api";

    #[test]
    fn build_list_targets_resource_root() {
        let req = bins().build_list(&RequestOptions::default());
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, format!("{BASE}/bins/"));
        assert!(req.body.is_none());
    }

    #[test]
    fn build_get_appends_id_with_trailing_slash() {
        let req = bins().build_get("42", &RequestOptions::default()).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, format!("{BASE}/bins/42/"));
    }

    #[test]
    fn build_get_accepts_numeric_ids() {
        let req = bins().build_get(42u64, &RequestOptions::default()).unwrap();
        assert_eq!(req.url, format!("{BASE}/bins/42/"));
    }

    #[test]
    fn build_create_posts_json_to_root() {
        let req = bins()
            .build_create(&json!({"name": "B1"}), &RequestOptions::default())
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, format!("{BASE}/bins/"));
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"name": "B1"}));
    }

    #[test]
    fn build_update_puts_to_item() {
        let req = bins()
            .build_update("B1-id", &json!({"name": "B1-renamed"}), &RequestOptions::default())
            .unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.url, format!("{BASE}/bins/B1-id/"));
    }

    #[test]
    fn build_remove_deletes_item() {
        let req = bins().build_remove(7, &RequestOptions::default()).unwrap();
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.url, format!("{BASE}/bins/7/"));
        assert!(req.body.is_none());
    }

    #[test]
    fn action_with_payload_is_post() {
        let req = bins()
            .build_action("bulk-sync", Some(&json!({"ids": [1, 2]})), &RequestOptions::default())
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, format!("{BASE}/bins/bulk-sync/"));
        assert!(req.body.is_some());
    }

    #[test]
    fn action_without_payload_is_get() {
        let req = bins()
            .build_action::<Value>("bulk-sync", None, &RequestOptions::default())
            .unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, format!("{BASE}/bins/bulk-sync/"));
        assert!(req.body.is_none());
    }

    #[test]
    fn declared_slashes_do_not_leak_into_urls() {
        let transport = transport(Arc::new(HostIo));
        for declared in ["bins", "/bins", "bins/", "/bins/", "//bins//"] {
            let client = ResourceClient::new(declared, transport.clone());
            assert_eq!(client.path(), "/bins/", "{declared}");
            assert_eq!(
                client.build_get("42", &RequestOptions::default()).unwrap().url,
                format!("{BASE}/bins/42/")
            );
        }
    }

    #[test]
    fn item_operations_reject_malformed_ids() {
        let bins = bins();
        let none = RequestOptions::default();
        for id in ["", ".", "..", "a/b", "../users"] {
            assert!(matches!(bins.build_get(id, &none), Err(ApiError::InvalidSegment(_))), "get {id:?}");
            assert!(
                matches!(bins.build_update(id, &json!({}), &none), Err(ApiError::InvalidSegment(_))),
                "update {id:?}"
            );
            assert!(matches!(bins.build_remove(id, &none), Err(ApiError::InvalidSegment(_))), "remove {id:?}");
            assert!(
                matches!(bins.build_action::<Value>(id, None, &none), Err(ApiError::InvalidSegment(_))),
                "action {id:?}"
            );
        }
    }

    #[test]
    fn remove_with_empty_id_sends_nothing() {
        let scripted = Arc::new(Scripted::default());
        scripted.reply(204, "");
        let client = ResourceClient::new("bins", transport(scripted.clone()));
        let err = client.remove("", &RequestOptions::default()).unwrap_err();
        assert!(matches!(err, ApiError::InvalidSegment(_)));
        assert!(scripted.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn every_request_carries_bearer() {
        let req = bins().build_remove(1, &RequestOptions::default()).unwrap();
        assert_eq!(req.header("Authorization"), Some("Bearer tok"));
    }

    #[test]
    fn create_decodes_created_resource() {
        let scripted = Arc::new(Scripted::default());
        scripted.reply(201, r#"{"id":9,"name":"B1"}"#);
        let client = ResourceClient::new("masters/bins", transport(scripted.clone()));

        let created: Value = client
            .create(&json!({"name": "B1"}), &RequestOptions::default())
            .unwrap();
        assert_eq!(created["id"], 9);
        assert_eq!(scripted.last().url, format!("{BASE}/masters/bins/"));
    }

    #[test]
    fn list_normalizes_paginated_response() {
        let scripted = Arc::new(Scripted::default());
        scripted.reply(200, r#"{"count":1,"next":null,"previous":null,"results":[{"id":1}]}"#);
        let client = ResourceClient::new("bins", transport(scripted));
        let items: Vec<Value> = client.list(&RequestOptions::default()).unwrap();
        assert_eq!(items, vec![json!({"id": 1})]);
    }

    #[test]
    fn remove_discards_body() {
        let scripted = Arc::new(Scripted::default());
        scripted.reply(204, "");
        let client = ResourceClient::new("bins", transport(scripted.clone()));
        client.remove("3", &RequestOptions::default()).unwrap();
        assert_eq!(scripted.last().method, HttpMethod::Delete);
    }

    #[test]
    fn failures_propagate_unchanged() {
        let scripted = Arc::new(Scripted::default());
        scripted.reply(500, "internal error");
        let client = ResourceClient::new("bins", transport(scripted));
        let err = client.get::<Value>("1", &RequestOptions::default()).unwrap_err();
        match err {
            ApiError::RequestFailed { status, body } => {
                assert_eq!(status, Some(500));
                assert_eq!(body, "internal error");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn no_retry_after_failure() {
        let scripted = Arc::new(Scripted::default());
        scripted.reply(503, "");
        scripted.reply(200, "[]");
        let client = ResourceClient::new("bins", transport(scripted.clone()));
        assert!(client.list::<Value>(&RequestOptions::default()).is_err());
        assert_eq!(scripted.seen.lock().unwrap().len(), 1);
    }
}
