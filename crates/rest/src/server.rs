use crate::body::{OptionReqBody, ResponseBody};
use crate::error::{BoxError, HttpError};
use crate::error_handler::{DefaultErrorHandler, ErrorHandler};
use crate::plugin::{Plugin, Registration};
use crate::request::{RequestContext, RouteInfo};
use crate::router::{Router, RouterBuilder, RouterError, RouterItem, RouterItemBuilder};
use bytes::Bytes;
use http::{Request, Response};
use http_body::Body as HttpBody;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

type PendingPlugin = Box<dyn FnOnce(&mut Registration)>;

pub struct ServerBuilder {
    router: RouterBuilder,
    error_handler: Box<dyn ErrorHandler>,
    address: Option<io::Result<Vec<SocketAddr>>>,
    plugins: Vec<PendingPlugin>,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { router: Router::builder(), error_handler: Box::new(DefaultErrorHandler), address: None, plugins: vec![] }
    }

    #[must_use]
    pub fn address<A: ToSocketAddrs>(mut self, address: A) -> Self {
        self.address = Some(address.to_socket_addrs().map(Iterator::collect));
        self
    }

    #[must_use]
    pub fn route(mut self, path: impl Into<String>, item_builder: RouterItemBuilder) -> Self {
        self.router.add_route(path, item_builder);
        self
    }

    /// Replaces the routes registered so far
    #[must_use]
    pub fn router(mut self, router: RouterBuilder) -> Self {
        self.router = router;
        self
    }

    /// Sets the handler answering failed requests; plugins wrap it when the server is built
    #[must_use]
    pub fn error_handler(mut self, error_handler: impl ErrorHandler + 'static) -> Self {
        self.error_handler = Box::new(error_handler);
        self
    }

    /// Installs a plugin, in registration order, once the server is built
    #[must_use]
    pub fn plugin<P: Plugin + 'static>(mut self, plugin: P) -> Self {
        self.plugins.push(Box::new(move |registration| plugin.register(registration)));
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        let address = self.address.ok_or(ServerBuildError::MissingAddress)?.map_err(ServerBuildError::InvalidAddress)?;

        let mut registration = Registration::new(self.router, self.error_handler);
        for plugin in self.plugins {
            plugin(&mut registration);
        }

        let (router, error_handler) = registration.into_parts();
        Ok(Server { router: router.build()?, error_handler, address })
    }
}

pub struct Server {
    router: Router,
    error_handler: Box<dyn ErrorHandler>,
    address: Vec<SocketAddr>,
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("address must be set")]
    MissingAddress,
    #[error("invalid address: {0}")]
    InvalidAddress(#[source] io::Error),
    #[error(transparent)]
    Router(#[from] RouterError),
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub async fn start(self) {
        let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            debug!("a global tracing subscriber is already installed");
        }

        info!("start listening at {:?}", self.address);
        let tcp_listener = match TcpListener::bind(self.address.as_slice()).await {
            Ok(tcp_listener) => tcp_listener,
            Err(e) => {
                error!(cause = %e, "bind server error");
                return;
            }
        };

        let server = Arc::new(self);
        loop {
            let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let server = Arc::clone(&server);

            tokio::spawn(async move {
                let service = service_fn(move |request: Request<Incoming>| {
                    let server = Arc::clone(&server);
                    async move { Ok::<_, Infallible>(server.dispatch(request).await) }
                });

                match http1::Builder::new().serve_connection(TokioIo::new(tcp_stream), service).await {
                    Ok(()) => {
                        info!("finished process, connection shutdown");
                    }
                    Err(e) => {
                        error!(cause = %e, "service has error, connection shutdown");
                    }
                }
            });
        }
    }

    /// Routes one request and answers it, handing failures to the error handler.
    ///
    /// An unknown path fails with 404; a known path whose items all reject the request
    /// fails with 405 listing the methods registered there.
    pub async fn dispatch<B>(&self, request: Request<B>) -> Response<ResponseBody>
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (header, body) = request.into_parts();
        let req_body = OptionReqBody::from_body(body);

        let path = header.uri.path();
        let route_result = self.router.at(path);
        let request_context = RequestContext::new(&header, route_result.params());

        let matched = route_result.router_items().iter().find(|item| item.filter().matches(&request_context));
        let route = RouteInfo::new(route_result.router_items(), matched.and_then(RouterItem::endpoint));
        let request_context = request_context.with_route(route);

        let result = match matched {
            Some(item) => item.handler().invoke(request_context, req_body).await,
            None if route.is_unmatched() => Err(HttpError::not_found(path).into()),
            None => Err(HttpError::method_not_allowed(&header.method, path, &route.allowed_methods()).into()),
        };

        result.unwrap_or_else(|e| self.error_handler.response(&request_context, e.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler_fn;
    use crate::router::{get, post};
    use http::header::ALLOW;
    use http::{Method, StatusCode};
    use http_body_util::BodyExt;

    async fn hello() -> &'static str {
        "hello"
    }

    async fn echo(body: String) -> String {
        body
    }

    fn server() -> Server {
        Server::builder()
            .address("127.0.0.1:0")
            .route("/hello", get(handler_fn(hello)))
            .route("/echo", post(handler_fn(echo)))
            .build()
            .unwrap()
    }

    async fn body_of(response: Response<ResponseBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_matched_route() {
        let response = server().dispatch(Request::get("/hello").body(String::new()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await, "hello");

        let request = Request::builder().method(Method::POST).uri("/echo").body("ping".to_string()).unwrap();
        assert_eq!(body_of(server().dispatch(request).await).await, "ping");
    }

    #[tokio::test]
    async fn test_dispatch_unknown_path() {
        let response = server().dispatch(Request::get("/nowhere").body(String::new()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_dispatch_wrong_method() {
        let request = Request::builder().method(Method::DELETE).uri("/hello").body(String::new()).unwrap();
        let response = server().dispatch(request).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(ALLOW).unwrap(), "GET");
    }

    #[test]
    fn test_missing_address() {
        assert!(matches!(Server::builder().build(), Err(ServerBuildError::MissingAddress)));
    }
}
