use crate::RequestContext;
use crate::body::OptionReqBody;
use crate::error::BoxError;
use crate::extract::from_request::FromRequest;
use async_trait::async_trait;
use http::{HeaderMap, Method, Uri};

#[async_trait]
impl FromRequest for Method {
    async fn from_request<'server, 'req>(
        req: &RequestContext<'server, 'req>,
        _body: OptionReqBody,
    ) -> Result<Self, BoxError> {
        Ok(req.method().clone())
    }
}

#[async_trait]
impl FromRequest for HeaderMap {
    async fn from_request<'server, 'req>(
        req: &RequestContext<'server, 'req>,
        _body: OptionReqBody,
    ) -> Result<Self, BoxError> {
        Ok(req.headers().clone())
    }
}

#[async_trait]
impl FromRequest for Uri {
    async fn from_request<'server, 'req>(
        req: &RequestContext<'server, 'req>,
        _body: OptionReqBody,
    ) -> Result<Self, BoxError> {
        Ok(req.uri().clone())
    }
}
