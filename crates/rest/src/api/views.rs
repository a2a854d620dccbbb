use super::ApiState;
use crate::RequestContext;
use crate::apidoc;
use crate::body::{OptionReqBody, ResponseBody};
use crate::error::{BoxError, HttpError};
use crate::handler::RequestHandler;
use crate::representation::output_json;
use async_trait::async_trait;
use http::{HeaderMap, Response, StatusCode};
use std::sync::Arc;

/// Serves the swagger document as JSON; 500 when it could not be built.
pub(crate) struct SpecsView {
    api: Arc<ApiState>,
}

impl SpecsView {
    pub(crate) fn new(api: Arc<ApiState>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl RequestHandler for SpecsView {
    async fn invoke<'server, 'req>(
        &self,
        _req: RequestContext<'server, 'req>,
        _req_body: OptionReqBody,
    ) -> Result<Response<ResponseBody>, BoxError> {
        let schema = self.api.schema();
        let status = if schema.get("error").is_some() { StatusCode::INTERNAL_SERVER_ERROR } else { StatusCode::OK };
        output_json(&schema, status, HeaderMap::new(), self.api.config())
    }
}

/// Serves the swagger UI page.
pub(crate) struct DocView {
    api: Arc<ApiState>,
}

impl DocView {
    pub(crate) fn new(api: Arc<ApiState>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl RequestHandler for DocView {
    async fn invoke<'server, 'req>(
        &self,
        _req: RequestContext<'server, 'req>,
        _req_body: OptionReqBody,
    ) -> Result<Response<ResponseBody>, BoxError> {
        apidoc::render(&self.api)
    }
}

/// Answers the API root with 404 when the documentation lives elsewhere.
pub(crate) struct RootView;

#[async_trait]
impl RequestHandler for RootView {
    async fn invoke<'server, 'req>(
        &self,
        req: RequestContext<'server, 'req>,
        _req_body: OptionReqBody,
    ) -> Result<Response<ResponseBody>, BoxError> {
        Err(HttpError::not_found(req.uri().path()).into())
    }
}
