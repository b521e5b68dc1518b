use std::io;

/// Usage and output errors raised while configuring or rendering a view.
///
/// Apart from `Io`, every variant is a programmer error: the call that raised it
/// is aborted and retrying it unchanged will fail the same way.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("wrong use of dynamic() in a static view")]
    DynamicOnStaticView,

    #[error("wrong use of dynamic view: provide a model or use a static view instead")]
    ModelMissing,

    #[error("wrong use of static view: model not supported, use a dynamic view instead")]
    ModelNotSupported,

    #[error("partial expects a model of type {expected}")]
    ModelTypeMismatch { expected: &'static str },

    #[error("view is bound to a binder and does not accept partials")]
    PartialsNotSupported,

    #[error("cannot set thread-safety for views with stream output")]
    ThreadSafeWithTransportSink,

    #[error("cannot use stream output for thread-safe views")]
    TransportSinkOnThreadSafeView,

    #[error("output was streamed to its destination and cannot be returned; use write() instead")]
    OutputNotRetrievable,

    #[error("stream sink content is no longer retrievable after the first pass")]
    SinkFlushed,

    #[error("dynamic region #{region} has no cached block ({cached} blocks cached)")]
    CacheDesync { region: usize, cached: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T, E = RenderError> = std::result::Result<T, E>;
