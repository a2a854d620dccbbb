//! Extending a server with routes and error handling in one step.

use crate::error_handler::{DefaultErrorHandler, ErrorHandler};
use crate::router::{RouterBuilder, RouterItemBuilder};

/// Something that installs itself into a server while it is being built.
pub trait Plugin {
    fn register(self, registration: &mut Registration);
}

/// The parts of a server a [`Plugin`] may extend.
pub struct Registration {
    router: RouterBuilder,
    error_handler: Box<dyn ErrorHandler>,
}

impl Registration {
    pub(crate) fn new(router: RouterBuilder, error_handler: Box<dyn ErrorHandler>) -> Self {
        Self { router, error_handler }
    }

    pub(crate) fn into_parts(self) -> (RouterBuilder, Box<dyn ErrorHandler>) {
        (self.router, self.error_handler)
    }

    pub fn route(&mut self, path: impl Into<String>, item_builder: RouterItemBuilder) -> &mut Self {
        self.router.add_route(path, item_builder);
        self
    }

    /// Replaces the error handler with one built around the current one.
    pub fn wrap_error_handler<F>(&mut self, wrap: F) -> &mut Self
    where
        F: FnOnce(Box<dyn ErrorHandler>) -> Box<dyn ErrorHandler>,
    {
        let current = std::mem::replace(&mut self.error_handler, Box::new(DefaultErrorHandler));
        self.error_handler = wrap(current);
        self
    }
}
