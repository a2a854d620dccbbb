use crate::RequestContext;
use crate::body::OptionReqBody;
use crate::error::BoxError;
use async_trait::async_trait;

/// Builds a handler argument from the request.
#[async_trait]
pub trait FromRequest: Sized + Send {
    async fn from_request<'server, 'req>(
        req: &RequestContext<'server, 'req>,
        body: OptionReqBody,
    ) -> Result<Self, BoxError>;
}

/// A failed extraction yields `None` instead of an error.
#[async_trait]
impl<T> FromRequest for Option<T>
where
    T: FromRequest,
{
    async fn from_request<'server, 'req>(
        req: &RequestContext<'server, 'req>,
        body: OptionReqBody,
    ) -> Result<Self, BoxError> {
        Ok(T::from_request(req, body).await.ok())
    }
}

#[async_trait]
impl FromRequest for () {
    async fn from_request<'server, 'req>(
        _req: &RequestContext<'server, 'req>,
        _body: OptionReqBody,
    ) -> Result<Self, BoxError> {
        Ok(())
    }
}
