//! Enable/disable control over a target's operation entry points.

use std::sync::Arc;

use opentelemetry::trace::{Tracer, TracerProvider};
use tracing::debug;

use crate::error::EnableError;
use crate::lifecycle::{adapt_callback, adapt_execution, start_operation_span};
use crate::odm::{Entrypoints, ExecFn, ExecRequest};

/// Instrumentation scope name reported to the tracer provider.
const SCOPE_NAME: &str = "opentelemetry-odm";

/// Behavior switches recognized by [`enable`].
#[derive(Clone, Debug, Default)]
pub struct InstrumentationConfig {
    /// Capture full save payloads and operation responses as span
    /// attributes. Off by default for payload-size and privacy reasons.
    pub enhanced_database_reporting: bool,
}

impl InstrumentationConfig {
    /// Toggle capture of save payloads and operation responses.
    pub fn with_enhanced_database_reporting(mut self, enabled: bool) -> Self {
        self.enhanced_database_reporting = enabled;
        self
    }
}

/// Active registration for one instrumented target.
///
/// Returned by [`enable`]; holds the pre-patch originals of every decorated
/// entry point. [`Instrumentation::disable`], or dropping the handle, puts
/// them back exactly, after which the target behaves as if it had never been
/// instrumented. Only one registration per target can be active at a time.
pub struct Instrumentation {
    entrypoints: Arc<Entrypoints>,
    originals: Option<Originals>,
}

struct Originals {
    query: ExecFn,
    aggregate: ExecFn,
    document: ExecFn,
    model_aggregate: ExecFn,
}

impl std::fmt::Debug for Instrumentation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instrumentation")
            .field("active", &self.originals.is_some())
            .finish()
    }
}

impl Instrumentation {
    /// Restore every entry point to its pre-patch original and release the
    /// target for future registrations.
    pub fn disable(mut self) {
        self.restore();
    }

    fn restore(&mut self) {
        if let Some(originals) = self.originals.take() {
            self.entrypoints.query.install(originals.query);
            self.entrypoints.aggregate.install(originals.aggregate);
            self.entrypoints.document.install(originals.document);
            self.entrypoints
                .model_aggregate
                .install(originals.model_aggregate);
            self.entrypoints.release();
            debug!(target: "opentelemetry_odm", "entry point originals restored");
        }
    }
}

impl Drop for Instrumentation {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Install tracing wrappers around all four operation entry points of
/// `entrypoints`, producing spans through a tracer obtained from `provider`.
///
/// Installation either fully succeeds or leaves the target untouched: a
/// target that already has an active registration is rejected with
/// [`EnableError::AlreadyEnabled`] rather than stacking wrappers.
pub fn enable<P>(
    entrypoints: &Arc<Entrypoints>,
    provider: &P,
    config: InstrumentationConfig,
) -> Result<Instrumentation, EnableError>
where
    P: TracerProvider,
    P::Tracer: Send + Sync + 'static,
    <P::Tracer as Tracer>::Span: Send + 'static,
{
    if !entrypoints.claim() {
        return Err(EnableError::AlreadyEnabled);
    }

    let tracer = Arc::new(provider.tracer(SCOPE_NAME));
    let originals = Originals {
        query: decorate(&entrypoints.query, &tracer, &config),
        aggregate: decorate(&entrypoints.aggregate, &tracer, &config),
        document: decorate(&entrypoints.document, &tracer, &config),
        model_aggregate: decorate(&entrypoints.model_aggregate, &tracer, &config),
    };
    debug!(
        target: "opentelemetry_odm",
        enhanced_database_reporting = config.enhanced_database_reporting,
        "entry point wrappers installed"
    );

    Ok(Instrumentation {
        entrypoints: Arc::clone(entrypoints),
        originals: Some(originals),
    })
}

/// Replace one entry point with its instrumented wrapper, returning the
/// original for later restoration.
fn decorate<T>(
    hook: &crate::odm::Hook,
    tracer: &Arc<T>,
    config: &InstrumentationConfig,
) -> ExecFn
where
    T: Tracer + Send + Sync + 'static,
    T::Span: Send + 'static,
{
    let original = hook.current();
    hook.install(instrumented(
        Arc::clone(tracer),
        original.clone(),
        config.clone(),
    ));
    original
}

/// The wrapper layered over one entry point: start the span from the
/// synchronously captured parent context, delegate to the original, and let
/// the lifecycle adapter settle the span for whichever completion style the
/// call uses. Result and error pass through unchanged.
fn instrumented<T>(tracer: Arc<T>, original: ExecFn, config: InstrumentationConfig) -> ExecFn
where
    T: Tracer + Send + Sync + 'static,
    T::Span: Send + 'static,
{
    Arc::new(move |mut request: ExecRequest| {
        let span = start_operation_span(tracer.as_ref(), &request, &config);
        let enhanced = config.enhanced_database_reporting;
        match request.callback.take() {
            Some(callback) => {
                // Callback style: the wrapped callback owns the span; the
                // execution value flows back untouched.
                request.callback = Some(adapt_callback(span, callback, enhanced));
                original(request)
            }
            None => {
                let execution = original(request);
                adapt_execution(span, execution, enhanced)
            }
        }
    })
}
