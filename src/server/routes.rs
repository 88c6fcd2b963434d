use crate::server::api::{self, ApiError, AppState};

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status_code: u16,
    pub content_type: &'static str,
    pub body: String,
}

/// Dispatch one request. `path` may carry a query string.
pub fn route_request(state: &AppState, method: &str, path: &str, body: &str) -> HttpResponse {
    let (path, query) = match path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path, None),
    };
    let keyword = query.and_then(|q| query_param(q, "q"));

    match (method, path) {
        ("GET", "/api/health") => match api::health_payload() {
            Ok(payload) => ok_json(payload),
            Err(err) => error_response(500, &err.to_string()),
        },
        ("GET", "/api/heroes") => api_response(api::heroes_payload(state, keyword.as_deref())),
        ("GET", path) if path.starts_with("/api/heroes/") => {
            let name = path_segment(path, "/api/heroes/");
            api_response(api::hero_payload(state, &name))
        }
        ("GET", "/api/skills") => api_response(api::skills_payload(state, keyword.as_deref())),
        ("GET", path) if path.starts_with("/api/skills/") => {
            let name = path_segment(path, "/api/skills/");
            api_response(api::skill_payload(state, &name))
        }
        ("GET", "/api/metadata") => api_response(api::metadata_payload(state)),
        ("POST", "/api/recommend") => api_response(api::recommend_payload(state, body)),
        ("POST", "/api/synergy") => api_response(api::synergy_payload(state, body)),
        _ => error_response(404, "Route not found"),
    }
}

fn api_response(result: Result<String, ApiError>) -> HttpResponse {
    match result {
        Ok(payload) => ok_json(payload),
        Err(err @ (ApiError::Parse(_) | ApiError::BadRequest(_))) => {
            error_response(400, &err.to_string())
        }
        Err(err @ ApiError::NotFound(_)) => error_response(404, &err.to_string()),
        Err(err @ ApiError::Serialize(_)) => {
            tracing::error!(%err, "response serialization failed");
            error_response(500, &err.to_string())
        }
    }
}

fn ok_json(body: String) -> HttpResponse {
    HttpResponse {
        status_code: 200,
        content_type: "application/json",
        body,
    }
}

fn error_response(status_code: u16, message: &str) -> HttpResponse {
    HttpResponse {
        status_code,
        content_type: "application/json",
        body: format!(
            "{{\n  \"status\": \"error\",\n  \"message\": {}\n}}",
            serde_json::to_string(message).unwrap_or_else(|_| "\"Unknown error\"".to_string())
        ),
    }
}

fn path_segment(path: &str, prefix: &str) -> String {
    let raw = path.trim_start_matches(prefix).split('/').next().unwrap_or("");
    decode(raw)
}

fn query_param(query: &str, key: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        (name == key).then(|| decode(&value.replace('+', " ")))
    })
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
