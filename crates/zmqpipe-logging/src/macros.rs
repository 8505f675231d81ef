//! ---
//! zmq_section: "03-logging"
//! zmq_subsection: "module"
//! zmq_type: "source"
//! zmq_scope: "code"
//! zmq_description: "Structured logging adapters and sinks."
//! zmq_version: "v0.1.0"
//! zmq_owner: "tbd"
//! ---
/// Emit a debug log enriched with publish context.
#[macro_export]
macro_rules! pipe_debug {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::DEBUG,
            topic = ctx.topic.unwrap_or(""),
            addr = ctx.addr.unwrap_or(""),
            frame = ctx.frame,
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::pipe_debug!(context = $crate::LogContext::default(), $($arg)+)
    }};
}

/// Emit an error log enriched with publish context.
#[macro_export]
macro_rules! pipe_error {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::ERROR,
            topic = ctx.topic.unwrap_or(""),
            addr = ctx.addr.unwrap_or(""),
            frame = ctx.frame,
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::pipe_error!(context = $crate::LogContext::default(), $($arg)+)
    }};
}
