//! REST resources, content negotiation and swagger documentation for a small async HTTP
//! server.
//!
//! The crate has two layers:
//! - the host: [`Server`], its [`Router`], [`handler_fn`] extractors, decorators and the
//!   [`ErrorHandler`] chain, extended through [`Plugin`]s;
//! - the REST extension: an [`Api`] plugin mounting [`Namespace`]s of [`Resource`]s, which
//!   validates and marshals data with [`Model`]s, negotiates representations from the
//!   `Accept` header and serves a swagger document with its UI.

mod body;

mod fn_trait;
mod handler;
mod request;
mod responder;
mod server;

mod api;
mod apidoc;
mod cors;
mod doc;
mod error;
mod error_handler;
mod namespace;
mod plugin;
mod reply;
mod resource;
mod static_files;
mod swagger;

pub mod config;
pub mod decorator;
pub mod extract;
pub mod fields;
pub mod marshal;
pub mod mask;
pub mod mimetype;
pub mod model;
pub mod representation;
pub mod reqparse;
pub mod router;
pub mod utils;

pub use api::{Api, ApiHandle, OperationIdFn};
pub use apidoc::{SWAGGER_UI_CDN, SWAGGER_UI_STATIC};
pub use body::OptionReqBody;
pub use body::ResponseBody;
pub use config::{ApiConfig, DocExpansion};
pub use cors::CrossDomain;
pub use doc::{Doc, Expect, Marshalling, ResponseDoc};
pub use error::{BoxError, HttpError, RestError, abort};
pub use error_handler::{DefaultErrorHandler, ErrorHandler};
pub use fields::Field;
pub use fn_trait::FnTrait;
pub use handler::{BoxedMethodHandler, FnHandler, MethodHandler, RequestHandler, handler_fn};
pub use marshal::{marshal, marshal_with_envelope};
pub use mask::Mask;
pub use model::Model;
pub use namespace::{Namespace, ResourceRoute};
pub use plugin::{Plugin, Registration};
pub use reply::{IntoReply, Reply};
pub use reqparse::{Args, Argument, RequestParser};
pub use request::{PathParams, RequestContext, RouteInfo};
pub use resource::{Resource, ResourceBuilder};
pub use responder::Responder;
pub use router::Router;
pub use server::{Server, ServerBuildError, ServerBuilder};
pub use static_files::StaticFiles;
