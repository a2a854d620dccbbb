//! Turning handler failures into responses.

use crate::RequestContext;
use crate::body::ResponseBody;
use crate::error::HttpError;
use crate::responder::{Responder, text_response};
use http::{Response, StatusCode};
use std::error::Error;
use tracing::error;

/// Answers a request whose handler (or routing) failed.
///
/// The server owns exactly one error handler; extensions such as an API wrap the current one
/// and delegate to it for the requests they do not own.
pub trait ErrorHandler: Send + Sync {
    fn response(&self, req: &RequestContext, err: &(dyn Error + Send + Sync + 'static)) -> Response<ResponseBody>;
}

impl<F> ErrorHandler for F
where
    F: Fn(&RequestContext, &(dyn Error + Send + Sync + 'static)) -> Response<ResponseBody> + Send + Sync,
{
    fn response(&self, req: &RequestContext, err: &(dyn Error + Send + Sync + 'static)) -> Response<ResponseBody> {
        (self)(req, err)
    }
}

/// Renders [`HttpError`]s as plain text and everything else as a bare 500.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultErrorHandler;

impl ErrorHandler for DefaultErrorHandler {
    fn response(&self, req: &RequestContext, err: &(dyn Error + Send + Sync + 'static)) -> Response<ResponseBody> {
        match err.downcast_ref::<HttpError>() {
            Some(http_error) => http_error.clone().response_to(req),
            None => {
                error!(cause = %err, path = req.uri().path(), "unhandled error");
                text_response(StatusCode::INTERNAL_SERVER_ERROR, ResponseBody::from("Internal Server Error"))
            }
        }
    }
}
