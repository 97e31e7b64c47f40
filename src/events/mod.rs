//! Device event normalization and dispatch

mod dispatcher;
mod normalizer;

pub use self::dispatcher::EventDispatcher;
pub use self::normalizer::EventNormalizer;
