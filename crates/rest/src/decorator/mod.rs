//! Handler decorators.
//!
//! A [`Decorator`] wraps a handler into another handler. Resources apply
//! [`MethodDecorator`]s to each of their method handlers, while namespaces and the API apply
//! [`ViewDecorator`]s to every routed resource view.

mod decorator_composer;
mod decorator_fn;

pub use decorator_composer::DecoratorComposer;
pub use decorator_fn::{DecoratorFn, decorator_fn};

use crate::handler::{BoxedMethodHandler, RequestHandler};

pub trait Decorator<In> {
    type Out;

    fn decorate(&self, raw: In) -> Self::Out;
}

pub trait DecoratorExt<In>: Decorator<In> {
    /// Applies `self` first, then `decorator`.
    fn and_then<D>(self, decorator: D) -> DecoratorComposer<Self, D>
    where
        Self: Sized,
    {
        DecoratorComposer::new(self, decorator)
    }

    /// Applies `decorator` first, then `self`.
    fn compose<D>(self, decorator: D) -> DecoratorComposer<D, Self>
    where
        Self: Sized,
    {
        DecoratorComposer::new(decorator, self)
    }
}

impl<T: Decorator<In> + ?Sized, In> DecoratorExt<In> for T {}

/// Wraps a single method handler of a resource.
pub type MethodDecorator = dyn Decorator<BoxedMethodHandler, Out = BoxedMethodHandler> + Send + Sync;

/// Wraps a whole routed view.
pub type ViewDecorator = dyn Decorator<Box<dyn RequestHandler>, Out = Box<dyn RequestHandler>> + Send + Sync;
