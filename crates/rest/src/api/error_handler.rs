//! Answering the errors raised inside an API as negotiated data.

use super::ApiState;
use crate::RequestContext;
use crate::body::ResponseBody;
use crate::error::{BoxError, HttpError};
use crate::error_handler::ErrorHandler;
use crate::mask::MaskError;
use crate::reply::Reply;
use crate::utils::strip_rule_params;
use http::header::{CONTENT_LENGTH, WWW_AUTHENTICATE};
use http::{HeaderMap, HeaderValue, Response, StatusCode};
use serde_json::{Map, Value, json};
use std::error::Error;
use std::sync::Arc;
use tracing::{error, warn};

/// Handler registered for one error type; `None` when the error is of another type.
pub(crate) type TypedErrorHandler = Arc<dyn Fn(&(dyn Error + Send + Sync + 'static)) -> Option<Reply> + Send + Sync>;

/// Handler for the errors no typed handler claimed.
pub(crate) type FallbackErrorHandler = Arc<dyn Fn(&(dyn Error + Send + Sync + 'static)) -> Reply + Send + Sync>;

const HELP_CUTOFF: f64 = 0.6;
const HELP_MATCHES: usize = 3;

pub(crate) fn typed_error_handler<E, F>(handler: F) -> TypedErrorHandler
where
    E: Error + 'static,
    F: Fn(&E) -> Reply + Send + Sync + 'static,
{
    Arc::new(move |err: &(dyn Error + Send + Sync + 'static)| err.downcast_ref::<E>().map(&handler))
}

/// Handlers the API answers mask failures with, after the user supplied ones.
pub(crate) fn mask_error_handler() -> TypedErrorHandler {
    typed_error_handler::<MaskError, _>(|err| Reply::data(json!({"message": err.to_string()})).with_status(StatusCode::BAD_REQUEST))
}

fn unpack(reply: Reply) -> Result<(Value, StatusCode, HeaderMap), Response<ResponseBody>> {
    match reply {
        Reply::Data { data, status, headers } => Ok((data, status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR), headers)),
        Reply::Response(response) => Err(response),
    }
}

impl ApiState {
    /// Whether the failed request targeted a route of this API.
    ///
    /// Unknown urls belong to the API only when it catches every 404.
    pub(crate) fn owns_request(&self, req: &RequestContext) -> bool {
        if let Some(endpoint) = req.endpoint() {
            return self.owns_endpoint(endpoint);
        }
        let route = req.route();
        if route.is_unmatched() { self.catch_all_404s } else { route.endpoints().any(|endpoint| self.owns_endpoint(endpoint)) }
    }

    /// Turns an error into a response negotiated like regular data.
    ///
    /// Fails only when exceptions propagate, leaving the error to the host.
    pub(crate) fn handle_error(
        &self,
        req: &RequestContext,
        err: &(dyn Error + Send + Sync + 'static),
    ) -> Result<Response<ResponseBody>, BoxError> {
        let config = self.config();
        let http_error = err.downcast_ref::<HttpError>();
        if http_error.is_none() && config.propagate_exceptions {
            return Err(err.to_string().into());
        }

        let handled = self.error_handlers.iter().find_map(|handler| handler(err));
        let unpacked = match handled {
            Some(reply) => unpack(reply),
            None => match (http_error, &self.default_error_handler) {
                (Some(http_error), _) => {
                    let mut body = Map::new();
                    if config.error_include_message {
                        body.insert("message".into(), Value::from(http_error.reason()));
                    }
                    Ok((Value::Object(body), http_error.status(), http_error.headers().clone()))
                }
                (None, Some(default_handler)) => unpack(default_handler(err)),
                (None, None) => {
                    let mut body = Map::new();
                    if config.error_include_message {
                        body.insert("message".into(), Value::from("Internal Server Error"));
                    }
                    Ok((Value::Object(body), StatusCode::INTERNAL_SERVER_ERROR, HeaderMap::new()))
                }
            },
        };
        let (mut data, status, mut headers) = match unpacked {
            Ok(parts) => parts,
            Err(response) => return Ok(response),
        };

        if let Value::Object(body) = &mut data {
            if config.error_include_message && !body.contains_key("message") {
                body.insert("message".into(), Value::from(err.to_string()));
            }
            if config.error_include_code {
                body.insert("code".into(), Value::from(status.as_u16()));
            }
        }
        if let Some(explicit) = http_error.and_then(HttpError::data) {
            data = explicit.clone();
        }

        let mut fallback = None;
        if status.is_server_error() {
            error!(cause = %err, status = status.as_u16(), path = req.uri().path(), "request failed");
        } else if status == StatusCode::NOT_FOUND && config.error_404_help && config.error_include_message {
            if let Value::Object(body) = &mut data {
                let message = body.get("message").and_then(Value::as_str);
                if let Some(help) = self.help_on_404(req.uri().path(), message) {
                    body.insert("message".into(), Value::from(help));
                }
            }
        } else if status == StatusCode::NOT_ACCEPTABLE && self.default_mediatype.is_none() {
            fallback = Some(self.representations.first().map_or("text/plain", |(mediatype, _)| mediatype).to_string());
        }

        headers.remove(CONTENT_LENGTH);
        let mut response = self.make_response(req, &data, status, headers, fallback.as_deref())?;

        if status == StatusCode::UNAUTHORIZED && self.serve_challenge_on_401 {
            let challenge = format!("Basic realm=\"{}\"", config.http_basic_auth_realm);
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                response.headers_mut().insert(WWW_AUTHENTICATE, value);
            }
        }
        Ok(response)
    }

    /// Suggests close rules for a url that matched nothing.
    fn help_on_404(&self, path: &str, message: Option<&str>) -> Option<String> {
        let mut scored = self
            .rules
            .iter()
            .map(|rule| (strsim::normalized_levenshtein(path, &strip_rule_params(rule)), rule.as_str()))
            .filter(|(score, _)| *score >= HELP_CUTOFF)
            .collect::<Vec<_>>();
        if scored.is_empty() {
            return None;
        }
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let matches = scored.into_iter().take(HELP_MATCHES).map(|(_, rule)| rule).collect::<Vec<_>>();
        let prefix = message.map(|message| format!("{}. ", message.trim_end_matches('.'))).unwrap_or_default();
        Some(format!("{prefix}You have requested this URI [{path}] but did you mean {} ?", matches.join(" or ")))
    }
}

/// Error handler installed by an API around the server's one.
pub(crate) struct ApiErrorHandler {
    original: Box<dyn ErrorHandler>,
    api: Arc<ApiState>,
}

impl ApiErrorHandler {
    pub(crate) fn new(original: Box<dyn ErrorHandler>, api: Arc<ApiState>) -> Self {
        Self { original, api }
    }
}

impl ErrorHandler for ApiErrorHandler {
    fn response(&self, req: &RequestContext, err: &(dyn Error + Send + Sync + 'static)) -> Response<ResponseBody> {
        if self.api.owns_request(req) {
            match self.api.handle_error(req, err) {
                Ok(response) => return response,
                Err(e) => warn!(cause = %e, "api could not answer the error, handing it over"),
            }
        }
        self.original.response(req, err)
    }
}
