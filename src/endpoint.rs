/// HTTP endpoint for model inference
///
/// One process serves one domain. Requests are accepted by `tiny_http` and
/// handed to a fixed worker pool; every worker shares the same read-only
/// `AppContext`.
///
/// Endpoints:
/// - GET  /                  - Service health and available endpoints
/// - POST /predict_{domain}  - Predict from a flat feature object or {"data": {...}}
/// - GET  /predict_{domain}  - HTML usage example (when enabled)

use serde_json::{Map, Value, json};
use std::io::Read;
use std::sync::Arc;
use threadpool::ThreadPool;
use tiny_http::{Method, Request, Response, Server, StatusCode};
use tracing::{debug, info, warn};

use crate::align::{MissingFeaturePolicy, Record, align, missing_features};
use crate::context::{AppContext, ModelState};
use crate::error::{RequestError, ServerError};

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

/// A fully rendered response, independent of the HTTP library.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl HttpReply {
    pub fn json(status: u16, value: Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: value.to_string(),
        }
    }

    pub fn html(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: "text/html; charset=utf-8",
            body,
        }
    }

    /// Parsed JSON body (None for HTML replies).
    pub fn json_body(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }

    fn into_response(self) -> Response<std::io::Cursor<Vec<u8>>> {
        let response = Response::from_string(self.body).with_status_code(StatusCode(self.status));
        match tiny_http::Header::from_bytes(&b"Content-Type"[..], self.content_type.as_bytes()) {
            Ok(header) => response.with_header(header),
            Err(()) => response,
        }
    }
}

fn error_reply(err: &RequestError) -> HttpReply {
    HttpReply::json(err.status_code(), err.to_json())
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Routing path for a request URL: the query string is dropped and the path
/// percent-decoded. With `trim_trailing` set, trailing whitespace is also
/// removed so `/predict_flood%20` routes like `/predict_flood`.
pub fn normalize_path(url: &str, trim_trailing: bool) -> String {
    let raw = url.split('?').next().unwrap_or_default();
    let decoded = urlencoding::decode(raw)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| raw.to_string());

    if trim_trailing {
        let trimmed = decoded.trim_end();
        if trimmed.len() != decoded.len() {
            debug!(from = %decoded, to = %trimmed, "normalized request path");
        }
        trimmed.to_string()
    } else {
        decoded
    }
}

/// Handles one request end to end. Never panics on bad input; every failure
/// becomes a JSON error reply.
pub fn handle_request(ctx: &AppContext, method: &Method, url: &str, body: &[u8]) -> HttpReply {
    let path = normalize_path(url, ctx.normalize_path);
    let predict_path = ctx.domain.predict_path();

    let reply = if path == "/" {
        match method {
            Method::Get => handle_root(ctx),
            _ => method_not_allowed(&path, &["GET"]),
        }
    } else if path == predict_path {
        match method {
            Method::Post => handle_predict(ctx, body),
            Method::Get if ctx.usage_page => handle_usage_page(ctx),
            _ if ctx.usage_page => method_not_allowed(&path, &["GET", "POST"]),
            _ => method_not_allowed(&path, &["POST"]),
        }
    } else {
        HttpReply::json(
            404,
            json!({
                "error": "Not found",
                "available_endpoints": ["/", predict_path],
            }),
        )
    };

    info!(method = %method, path = %path, status = reply.status, "request handled");
    reply
}

/// Handle GET /
fn handle_root(ctx: &AppContext) -> HttpReply {
    HttpReply::json(
        200,
        json!({
            "service": ctx.name,
            "status": ctx.status_label(),
            "endpoints": [format!("{} (POST)", ctx.domain.predict_path())],
        }),
    )
}

fn method_not_allowed(path: &str, allowed: &[&str]) -> HttpReply {
    HttpReply::json(
        405,
        json!({
            "error": "Method not allowed",
            "path": path,
            "allowed": allowed,
        }),
    )
}

/// Handle POST /predict_{domain}
fn handle_predict(ctx: &AppContext, body: &[u8]) -> HttpReply {
    match predict(ctx, body) {
        Ok(prediction) => {
            let mut out = Map::new();
            out.insert(ctx.domain.prediction_key(), prediction);
            HttpReply::json(200, Value::Object(out))
        }
        Err(err) => {
            match &err {
                RequestError::Prediction(source) => {
                    warn!(domain = %ctx.domain, error = %source, "prediction failed")
                }
                other => debug!(domain = %ctx.domain, error = %other, "request rejected"),
            }
            error_reply(&err)
        }
    }
}

/// Validates the body, aligns it to the feature order and runs the model.
/// Model availability is checked before the body is looked at.
pub fn predict(ctx: &AppContext, body: &[u8]) -> Result<Value, RequestError> {
    let (predictor, feature_order) = match ctx.state() {
        ModelState::Ready { predictor, feature_order } => (predictor, feature_order),
        ModelState::Unavailable { reason } => {
            return Err(RequestError::ModelUnavailable { details: reason.clone() });
        }
    };

    let payload: Value = serde_json::from_slice(body).map_err(|e| RequestError::Malformed {
        details: e.to_string(),
    })?;
    let record = extract_record(payload)?;

    if ctx.missing_features == MissingFeaturePolicy::Reject {
        let missing = missing_features(&record, feature_order);
        if !missing.is_empty() {
            return Err(RequestError::SchemaViolation { missing });
        }
    }

    let row = align(&record, feature_order);
    let prediction = predictor.predict(&row).map_err(RequestError::Prediction)?;
    Ok(prediction.to_json())
}

/// The feature record of a request: the body itself, or the object under
/// its `data` key when that key is present.
pub fn extract_record(payload: Value) -> Result<Record, RequestError> {
    match payload {
        Value::Null => Err(RequestError::Malformed {
            details: "body is JSON null".to_string(),
        }),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Object(inner)) => Ok(inner),
            Some(_) => Err(RequestError::NotAnObject),
            None => Ok(map),
        },
        _ => Err(RequestError::NotAnObject),
    }
}

/// Handle GET /predict_{domain}
fn handle_usage_page(ctx: &AppContext) -> HttpReply {
    let path = ctx.domain.predict_path();
    let fields: Vec<String> = ctx
        .feature_order()
        .unwrap_or_default()
        .iter()
        .map(|name| format!("{}: \"<value>\"", Value::from(name.as_str())))
        .collect();
    let example = format!("{{\"data\": {{{}}}}}", fields.join(", "));

    let page = format!(
        "<h1>{name}</h1>\
         <p>POST JSON to <code>{path}</code> with either a raw object of features or {{\"data\": {{...}}}}.</p>\
         <p>Example curl:</p>\
         <pre>curl -X POST http://localhost:{port}{path} -H 'Content-Type: application/json' -d '{example}'</pre>",
        name = html_escape(&ctx.name),
        path = path,
        port = ctx.port,
        example = html_escape(&example),
    );
    HttpReply::html(200, page)
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

// ---------------------------------------------------------------------------
// HTTP Server
// ---------------------------------------------------------------------------

/// Binds the listener without serving, so callers can learn the address.
pub fn bind(addr: &str) -> Result<Server, ServerError> {
    Server::http(addr).map_err(|e| ServerError::Bind {
        addr: addr.to_string(),
        message: e.to_string(),
    })
}

/// Start HTTP endpoint server on the specified port (blocks forever)
pub fn start_endpoint_server(port: u16, workers: usize, ctx: Arc<AppContext>) -> Result<(), ServerError> {
    let server = bind(&format!("0.0.0.0:{}", port))?;

    println!("📡 {} listening on http://0.0.0.0:{}", ctx.name, port);
    println!("   GET  / - Service health");
    println!("   POST {} - Predict", ctx.domain.predict_path());
    if ctx.usage_page {
        println!("   GET  {} - Usage example", ctx.domain.predict_path());
    }
    println!();

    serve(server, workers, ctx);
    Ok(())
}

/// Accept loop: each request is handled on the worker pool. Returns when
/// the server is dropped or unblocked.
pub fn serve(server: Server, workers: usize, ctx: Arc<AppContext>) {
    let pool = ThreadPool::new(workers.max(1));

    for request in server.incoming_requests() {
        let ctx = Arc::clone(&ctx);
        pool.execute(move || respond(&ctx, request));
    }

    pool.join();
}

/// Largest request body accepted; longer bodies are answered with 400.
pub const MAX_BODY_BYTES: u64 = 1024 * 1024;

/// Reads at most `limit` bytes of body, failing when more remain.
fn read_body(reader: &mut dyn Read, limit: u64) -> Result<Vec<u8>, RequestError> {
    let mut body = Vec::new();
    reader
        .take(limit + 1)
        .read_to_end(&mut body)
        .map_err(|e| RequestError::Malformed { details: e.to_string() })?;
    if body.len() as u64 > limit {
        return Err(RequestError::Malformed {
            details: format!("request body exceeds {} bytes", limit),
        });
    }
    Ok(body)
}

fn respond(ctx: &AppContext, mut request: Request) {
    let reply = match read_body(request.as_reader(), MAX_BODY_BYTES) {
        Ok(body) => handle_request(ctx, request.method(), request.url(), &body),
        Err(e) => error_reply(&e),
    };

    if let Err(e) = request.respond(reply.into_response()) {
        warn!(error = %e, "failed to send response");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::AlignedRow;
    use crate::config::ServiceConfig;
    use crate::error::PipelineError;
    use crate::model::{Domain, Prediction};

    /// Sums numeric features; fails on any string value.
    struct Summing;

    impl crate::pipeline::Predictor for Summing {
        fn predict(&self, row: &AlignedRow<'_>) -> Result<Prediction, PipelineError> {
            let mut total = 0.0;
            for (name, value) in row.iter() {
                match value {
                    Value::Number(n) => total += n.as_f64().unwrap_or(0.0),
                    Value::Null => {}
                    other => {
                        return Err(PipelineError::NotNumeric {
                            feature: name.to_string(),
                            value: other.to_string(),
                        });
                    }
                }
            }
            Ok(Prediction::Sequence(vec![total]))
        }
    }

    fn features() -> Vec<String> {
        vec!["MonsoonIntensity".to_string(), "Urbanization".to_string()]
    }

    fn ctx(domain: Domain) -> AppContext {
        AppContext::ready(&ServiceConfig::defaults_for(domain), Box::new(Summing), features())
    }

    fn post(ctx: &AppContext, url: &str, body: &str) -> HttpReply {
        handle_request(ctx, &Method::Post, url, body.as_bytes())
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/predict_flood%20", true), "/predict_flood");
        assert_eq!(normalize_path("/predict_flood%20?x=1", true), "/predict_flood");
        assert_eq!(normalize_path("/predict_flood%20", false), "/predict_flood ");
        assert_eq!(normalize_path("/", true), "/");
    }

    #[test]
    fn test_root_reports_status() {
        let reply = handle_request(&ctx(Domain::Flood), &Method::Get, "/", b"");
        let body = reply.json_body().unwrap();
        assert_eq!(reply.status, 200);
        assert_eq!(body["service"], "Flood API");
        assert_eq!(body["status"], "ok");

        let config = ServiceConfig::defaults_for(Domain::Earthquake);
        let missing = AppContext::unavailable(&config, "Model file not found: Earthquake_model.bin");
        let body = handle_request(&missing, &Method::Get, "/", b"").json_body().unwrap();
        assert_eq!(body["status"], "model_missing");
        assert_eq!(body["endpoints"][0], "/predict_earthquake (POST)");
    }

    #[test]
    fn test_predict_flat_and_wrapped_bodies() {
        let ctx = ctx(Domain::Flood);

        let flat = post(&ctx, "/predict_flood", r#"{"MonsoonIntensity": 2, "Urbanization": 3}"#);
        assert_eq!(flat.status, 200);
        assert_eq!(flat.json_body().unwrap(), json!({ "flood_prediction": [5.0] }));

        let wrapped = post(
            &ctx,
            "/predict_flood",
            r#"{"data": {"Urbanization": 1, "MonsoonIntensity": 1, "extra": "ignored"}}"#,
        );
        assert_eq!(wrapped.json_body().unwrap(), json!({ "flood_prediction": [2.0] }));
    }

    #[test]
    fn test_trailing_whitespace_routes_when_enabled() {
        let reply = post(&ctx(Domain::Flood), "/predict_flood%20", r#"{"MonsoonIntensity": 1, "Urbanization": 1}"#);
        assert_eq!(reply.status, 200);

        let reply = post(&ctx(Domain::Earthquake), "/predict_earthquake%20", "{}");
        assert_eq!(reply.status, 404);
    }

    #[test]
    fn test_invalid_json_is_400() {
        for body in ["", "not json", "{\"a\":", "null"] {
            let reply = post(&ctx(Domain::Flood), "/predict_flood", body);
            assert_eq!(reply.status, 400, "body {:?}", body);
            assert_eq!(reply.json_body().unwrap()["error"], "invalid or empty JSON body");
        }
    }

    #[test]
    fn test_non_object_payload_is_400() {
        for body in ["[1, 2]", "42", r#"{"data": [1]}"#, r#"{"data": null}"#] {
            let reply = post(&ctx(Domain::Earthquake), "/predict_earthquake", body);
            assert_eq!(reply.status, 400, "body {:?}", body);
            assert!(reply.json_body().unwrap()["error"].as_str().unwrap().contains("JSON object"));
        }
    }

    #[test]
    fn test_reject_policy_lists_missing_features() {
        let reply = post(&ctx(Domain::Flood), "/predict_flood", r#"{"Urbanization": 3}"#);
        assert_eq!(reply.status, 400);
        assert_eq!(
            reply.json_body().unwrap(),
            json!({ "error": "Missing features", "missing": ["MonsoonIntensity"] })
        );
    }

    #[test]
    fn test_impute_policy_accepts_partial_records() {
        let reply = post(&ctx(Domain::Earthquake), "/predict_earthquake", r#"{"Urbanization": 3}"#);
        assert_eq!(reply.status, 200);
        assert_eq!(reply.json_body().unwrap(), json!({ "earthquake_prediction": [3.0] }));
    }

    #[test]
    fn test_prediction_failure_is_500_with_details() {
        let reply = post(
            &ctx(Domain::Earthquake),
            "/predict_earthquake",
            r#"{"MonsoonIntensity": "heavy"}"#,
        );
        assert_eq!(reply.status, 500);
        let body = reply.json_body().unwrap();
        assert_eq!(body["error"], "prediction failed");
        assert!(body["details"].as_str().unwrap().contains("MonsoonIntensity"));
    }

    #[test]
    fn test_model_unavailable_checked_before_body() {
        let config = ServiceConfig::defaults_for(Domain::Flood);
        let ctx = AppContext::unavailable(&config, "Model file not found: flood_model.bin");

        let reply = post(&ctx, "/predict_flood", "not json");
        assert_eq!(reply.status, 500);
        let body = reply.json_body().unwrap();
        assert_eq!(body["error"], "model not available");
        assert!(body["details"].as_str().unwrap().contains("flood_model.bin"));
    }

    #[test]
    fn test_usage_page_lists_features() {
        let reply = handle_request(&ctx(Domain::Flood), &Method::Get, "/predict_flood", b"");
        assert_eq!(reply.status, 200);
        assert!(reply.content_type.starts_with("text/html"));
        assert!(reply.body.contains("<h1>Flood API</h1>"));
        assert!(reply.body.contains("\"MonsoonIntensity\": \"&lt;value&gt;\""));
        assert!(reply.body.contains("&lt;value&gt;"));
        assert!(reply.body.contains("localhost:5000/predict_flood"));
    }

    #[test]
    fn test_get_predict_without_usage_page_is_405() {
        let reply = handle_request(&ctx(Domain::Earthquake), &Method::Get, "/predict_earthquake", b"");
        assert_eq!(reply.status, 405);
    }

    #[test]
    fn test_unknown_route_is_404() {
        let reply = handle_request(&ctx(Domain::Flood), &Method::Get, "/predict_earthquake", b"");
        assert_eq!(reply.status, 404);
        assert_eq!(reply.json_body().unwrap()["available_endpoints"][1], "/predict_flood");
    }

    #[test]
    fn test_body_over_limit_is_rejected() {
        let body = vec![b'x'; 11];
        let err = read_body(&mut &body[..], 10).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(err.to_json()["details"].as_str().unwrap().contains("exceeds 10 bytes"));

        assert_eq!(read_body(&mut &body[..10], 10).unwrap().len(), 10);
    }
}
