//! In-memory REST backend speaking the admin API conventions.
//!
//! Every collection answers `GET|POST /{collection}/`, numeric items answer
//! `GET|PUT|DELETE /{collection}/{id}/`, and any other trailing segment is a
//! custom action (`GET` or `POST`). Paths without a trailing slash are 404.
//! All routes except `POST /auth/login/` require a bearer token issued by
//! that login route.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const LOGIN_PATH: &str = "/auth/login/";
pub const DEMO_USERNAME: &str = "admin";
pub const DEMO_PASSWORD: &str = "admin";

const DEFAULT_PAGE_SIZE: usize = 10;

/// Collections served by the standalone binary.
pub const DEFAULT_COLLECTIONS: &[&str] = &[
    "masters/continents",
    "masters/countries",
    "masters/zones",
    "masters/wards",
    "masters/bins",
    "vehicles/vehicle-creation",
    "staff/drivers",
    "operations/routes",
    "operations/trips",
    "operations/complaints",
    "customers/customers",
    "administration/users",
];

#[derive(Default)]
struct Collection {
    items: BTreeMap<u64, Value>,
    next_id: u64,
}

#[derive(Default)]
pub struct MockState {
    collections: HashMap<String, Collection>,
    tokens: HashSet<String>,
}

pub type Db = Arc<RwLock<MockState>>;

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

pub fn app(collections: &[&str]) -> Router {
    let mut state = MockState::default();
    for name in collections {
        state.collections.insert(name.trim_matches('/').to_string(), Collection::default());
    }
    let db: Db = Arc::new(RwLock::new(state));
    Router::new()
        .route(LOGIN_PATH, post(login))
        .fallback(dispatch)
        .with_state(db)
}

pub async fn run(listener: TcpListener, collections: &[&str]) -> Result<(), std::io::Error> {
    axum::serve(listener, app(collections)).await
}

fn error(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

async fn login(State(db): State<Db>, body: Bytes) -> Response {
    let Ok(input) = serde_json::from_slice::<LoginRequest>(&body) else {
        return error(StatusCode::BAD_REQUEST, "username and password are required");
    };
    if input.username != DEMO_USERNAME || input.password != DEMO_PASSWORD {
        return error(StatusCode::UNAUTHORIZED, "invalid credentials");
    }
    let token = Uuid::new_v4().to_string();
    db.write().await.tokens.insert(token.clone());
    tracing::info!(username = %input.username, "issued token");
    Json(json!({
        "token": token,
        "role": "admin",
        "unique_id": "u-1",
        "name": "Administrator",
    }))
    .into_response()
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

async fn dispatch(
    State(db): State<Db>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let authorized = match bearer(&headers) {
        Some(token) => db.read().await.tokens.contains(token),
        None => false,
    };
    if !authorized {
        return error(StatusCode::UNAUTHORIZED, "authentication credentials were not provided");
    }

    let path = uri.path();
    if !path.ends_with('/') {
        return error(StatusCode::NOT_FOUND, "not found");
    }
    let path = path.trim_matches('/');

    let payload = if body.is_empty() {
        None
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(value) => Some(value),
            Err(_) => return error(StatusCode::BAD_REQUEST, "malformed JSON"),
        }
    };

    let mut state = db.write().await;
    if let Some(collection) = state.collections.get_mut(path) {
        return collection_route(collection, &method, &query, payload);
    }

    let Some((parent, segment)) = path.rsplit_once('/') else {
        return error(StatusCode::NOT_FOUND, "not found");
    };
    let Some(collection) = state.collections.get_mut(parent) else {
        return error(StatusCode::NOT_FOUND, "not found");
    };
    match segment.parse::<u64>() {
        Ok(id) => item_route(collection, id, &method, payload),
        Err(_) => action_route(parent, segment, &method, payload),
    }
}

fn collection_route(
    collection: &mut Collection,
    method: &Method,
    query: &HashMap<String, String>,
    payload: Option<Value>,
) -> Response {
    match *method {
        Method::GET => {
            let items: Vec<Value> = collection.items.values().cloned().collect();
            let Some(page) = query.get("page").and_then(|p| p.parse::<usize>().ok()) else {
                return Json(items).into_response();
            };
            let size = query
                .get("page_size")
                .and_then(|s| s.parse::<usize>().ok())
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_PAGE_SIZE);
            let start = page.saturating_sub(1).saturating_mul(size);
            let results: Vec<Value> = items.iter().skip(start).take(size).cloned().collect();
            let next = (start.saturating_add(size) < items.len()).then(|| format!("?page={}", page + 1));
            let previous = (page > 1).then(|| format!("?page={}", page - 1));
            Json(json!({
                "count": items.len(),
                "next": next,
                "previous": previous,
                "results": results,
            }))
            .into_response()
        }
        Method::POST => {
            let Some(Value::Object(mut fields)) = payload else {
                return error(StatusCode::BAD_REQUEST, "expected a JSON object");
            };
            collection.next_id += 1;
            let id = collection.next_id;
            fields.insert("id".to_string(), json!(id));
            let item = Value::Object(fields);
            collection.items.insert(id, item.clone());
            (StatusCode::CREATED, Json(item)).into_response()
        }
        _ => error(StatusCode::METHOD_NOT_ALLOWED, "method not allowed"),
    }
}

fn item_route(collection: &mut Collection, id: u64, method: &Method, payload: Option<Value>) -> Response {
    match *method {
        Method::GET => match collection.items.get(&id) {
            Some(item) => Json(item.clone()).into_response(),
            None => error(StatusCode::NOT_FOUND, "not found"),
        },
        Method::PUT => {
            let Some(item) = collection.items.get_mut(&id) else {
                return error(StatusCode::NOT_FOUND, "not found");
            };
            let Some(Value::Object(mut fields)) = payload else {
                return error(StatusCode::BAD_REQUEST, "expected a JSON object");
            };
            fields.insert("id".to_string(), json!(id));
            *item = Value::Object(fields);
            Json(item.clone()).into_response()
        }
        Method::DELETE => match collection.items.remove(&id) {
            Some(_) => StatusCode::NO_CONTENT.into_response(),
            None => error(StatusCode::NOT_FOUND, "not found"),
        },
        _ => error(StatusCode::METHOD_NOT_ALLOWED, "method not allowed"),
    }
}

fn action_route(collection: &str, action: &str, method: &Method, payload: Option<Value>) -> Response {
    match *method {
        Method::GET => Json(json!({ "collection": collection, "action": action })).into_response(),
        Method::POST => Json(json!({
            "collection": collection,
            "action": action,
            "received": payload,
        }))
        .into_response(),
        _ => error(StatusCode::METHOD_NOT_ALLOWED, "method not allowed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_requires_scheme_prefix() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer(&headers), Some("abc"));
        headers.insert(header::AUTHORIZATION, "Token abc".parse().unwrap());
        assert_eq!(bearer(&headers), None);
    }

    #[test]
    fn create_assigns_sequential_ids() {
        let mut collection = Collection::default();
        let first = collection_route(&mut collection, &Method::POST, &HashMap::new(), Some(json!({"name": "B1"})));
        let second = collection_route(&mut collection, &Method::POST, &HashMap::new(), Some(json!({"name": "B2"})));
        assert_eq!(first.status(), StatusCode::CREATED);
        assert_eq!(second.status(), StatusCode::CREATED);
        assert_eq!(collection.items.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(collection.items[&2]["name"], "B2");
    }

    #[test]
    fn create_rejects_non_object_payload() {
        let mut collection = Collection::default();
        let resp = collection_route(&mut collection, &Method::POST, &HashMap::new(), Some(json!([1, 2])));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(collection.items.is_empty());
    }

    #[test]
    fn update_replaces_fields_and_keeps_id() {
        let mut collection = Collection::default();
        collection_route(&mut collection, &Method::POST, &HashMap::new(), Some(json!({"name": "B1", "zone": 3})));
        let resp = item_route(&mut collection, 1, &Method::PUT, Some(json!({"name": "B1-renamed"})));
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(collection.items[&1], json!({"id": 1, "name": "B1-renamed"}));
    }

    #[test]
    fn action_rejects_delete() {
        let resp = action_route("masters/bins", "bulk-sync", &Method::DELETE, None);
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
