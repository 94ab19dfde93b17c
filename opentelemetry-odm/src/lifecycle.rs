//! Span lifecycle around one intercepted operation.
//!
//! One span is started per routed call and ended exactly once, whichever
//! completion style the operation uses. `finish_span` takes the span by
//! value, so a finished span cannot be touched again; the three call
//! conventions (synchronous result, in-flight future, completion callback)
//! all converge on it.

use opentelemetry::trace::{Span, SpanKind, Status, Tracer};
use opentelemetry::KeyValue;

use crate::attributes::{self, operation_attributes, safe_serialize, COMPONENT_NAME};
use crate::error::record_error;
use crate::instrument::InstrumentationConfig;
use crate::odm::{ExecRequest, Execution, OpCallback, OpResult};

/// Start the client span for one routed operation, parented to the context
/// captured at invocation time.
pub(crate) fn start_operation_span<T: Tracer>(
    tracer: &T,
    request: &ExecRequest,
    config: &InstrumentationConfig,
) -> T::Span {
    let operation = &request.operation;
    let name = format!(
        "{COMPONENT_NAME}.{}.{}",
        operation.model, operation.query_type
    );
    tracer
        .span_builder(name)
        .with_kind(SpanKind::Client)
        .with_attributes(operation_attributes(
            operation,
            request.connection.as_ref(),
            config.enhanced_database_reporting,
        ))
        .start_with_context(tracer, &request.cx)
}

/// Settle the span for an observed outcome and end it. Consuming the span
/// here is what guarantees it ends exactly once.
pub(crate) fn finish_span<S: Span>(mut span: S, result: &OpResult, enhanced: bool) {
    match result {
        Ok(value) => {
            if enhanced {
                if let Some(serialized) = safe_serialize(value) {
                    span.set_attribute(KeyValue::new(attributes::RESPONSE, serialized));
                }
            }
            span.set_status(Status::Ok);
        }
        Err(error) => record_error(&mut span, error),
    }
    span.end();
}

/// Adapt a promise- or synchronous-style execution: the caller gets the same
/// shape and the same value back, with the span settled at completion. A
/// synchronous result ends the span before this function returns; no extra
/// suspension point is introduced for in-flight operations.
pub(crate) fn adapt_execution<S>(span: S, execution: Execution, enhanced: bool) -> Execution
where
    S: Span + Send + 'static,
{
    match execution {
        Execution::Ready(result) => {
            finish_span(span, &result, enhanced);
            Execution::Ready(result)
        }
        Execution::Pending(fut) => Execution::Pending(Box::pin(async move {
            let result = fut.await;
            finish_span(span, &result, enhanced);
            result
        })),
    }
}

/// Adapt a callback-style invocation: the span settles before the original
/// callback runs, and the callback sees the outcome unchanged.
pub(crate) fn adapt_callback<S>(span: S, callback: OpCallback, enhanced: bool) -> OpCallback
where
    S: Span + Send + 'static,
{
    Box::new(move |result: &OpResult| {
        finish_span(span, result, enhanced);
        callback(result);
    })
}
