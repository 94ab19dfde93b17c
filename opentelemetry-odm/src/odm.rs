//! The object-document-mapper capability this crate instruments.
//!
//! An ODM that wants its database calls traced exposes its operation entry
//! points as swappable [`Hook`]s collected in [`Entrypoints`]. The library
//! routes every operation through the current hook implementation; the
//! instrumentation layer decorates those implementations and can restore the
//! originals exactly, so a disabled target behaves as if it had never been
//! instrumented.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use opentelemetry::Context;
use serde_json::Value;

use crate::error::OdmError;

/// Live connection metadata, resolved at call time.
///
/// Implementations must reflect the connection currently in use; values are
/// read per operation and never cached by the instrumentation.
pub trait Connection: Send + Sync {
    /// Host the connection is bound to.
    fn host(&self) -> &str;
    /// Port the connection is bound to.
    fn port(&self) -> u16;
    /// Name of the selected database.
    fn database(&self) -> &str;
    /// Authenticated user, when the connection has one.
    fn user(&self) -> Option<&str>;
}

/// The kind of operation an entry point is about to execute.
///
/// String forms follow the driver vocabulary and appear verbatim in span
/// names and the `odm.query` attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
#[allow(missing_docs)] // variant names mirror the driver vocabulary
pub enum QueryType {
    Find,
    FindOne,
    FindOneAndUpdate,
    FindOneAndDelete,
    FindOneAndRemove,
    Save,
    Remove,
    Update,
    UpdateOne,
    UpdateMany,
    DeleteOne,
    DeleteMany,
    Count,
    CountDocuments,
    EstimatedDocumentCount,
    Aggregate,
}

impl QueryType {
    /// Driver-style name of this operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Find => "find",
            QueryType::FindOne => "findOne",
            QueryType::FindOneAndUpdate => "findOneAndUpdate",
            QueryType::FindOneAndDelete => "findOneAndDelete",
            QueryType::FindOneAndRemove => "findOneAndRemove",
            QueryType::Save => "save",
            QueryType::Remove => "remove",
            QueryType::Update => "update",
            QueryType::UpdateOne => "updateOne",
            QueryType::UpdateMany => "updateMany",
            QueryType::DeleteOne => "deleteOne",
            QueryType::DeleteMany => "deleteMany",
            QueryType::Count => "count",
            QueryType::CountDocuments => "countDocuments",
            QueryType::EstimatedDocumentCount => "estimatedDocumentCount",
            QueryType::Aggregate => "aggregate",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Describes one intercepted operation: which model it runs against and the
/// payloads that go with it. Absent payloads stay `None` and produce no span
/// attributes.
#[derive(Clone, Debug)]
pub struct Operation {
    /// Model the operation belongs to, e.g. `User`.
    pub model: String,
    /// Backing collection name, e.g. `users`.
    pub collection: String,
    /// Kind of operation.
    pub query_type: QueryType,
    /// Query criteria / filter.
    pub criteria: Option<Value>,
    /// Call options.
    pub options: Option<Value>,
    /// Update payload for the update family.
    pub update: Option<Value>,
    /// Aggregation pipeline stages.
    pub pipeline: Option<Value>,
    /// Document payload for save-style operations.
    pub document: Option<Value>,
}

impl Operation {
    /// A bare descriptor with no payloads.
    pub fn new(
        model: impl Into<String>,
        collection: impl Into<String>,
        query_type: QueryType,
    ) -> Self {
        Operation {
            model: model.into(),
            collection: collection.into(),
            query_type,
            criteria: None,
            options: None,
            update: None,
            pipeline: None,
            document: None,
        }
    }

    /// A query-family descriptor carrying its filter criteria.
    pub fn query(
        model: impl Into<String>,
        collection: impl Into<String>,
        query_type: QueryType,
        criteria: Value,
    ) -> Self {
        Operation::new(model, collection, query_type).with_criteria(criteria)
    }

    /// An aggregation descriptor carrying its pipeline stages.
    pub fn aggregate(
        model: impl Into<String>,
        collection: impl Into<String>,
        pipeline: Value,
    ) -> Self {
        let mut op = Operation::new(model, collection, QueryType::Aggregate);
        op.pipeline = Some(pipeline);
        op
    }

    /// A save descriptor carrying the document being persisted.
    pub fn save(
        model: impl Into<String>,
        collection: impl Into<String>,
        document: Value,
    ) -> Self {
        let mut op = Operation::new(model, collection, QueryType::Save);
        op.document = Some(document);
        op
    }

    /// Attach query criteria.
    pub fn with_criteria(mut self, criteria: Value) -> Self {
        self.criteria = Some(criteria);
        self
    }

    /// Attach call options.
    pub fn with_options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }

    /// Attach an update payload.
    pub fn with_update(mut self, update: Value) -> Self {
        self.update = Some(update);
        self
    }
}

/// Outcome of one operation: the driver result value or the driver error,
/// exactly as the caller will observe it.
pub type OpResult = Result<Value, OdmError>;

/// Caller-supplied completion callback. An entry point given a callback must
/// invoke it exactly once with the final outcome.
pub type OpCallback = Box<dyn FnOnce(&OpResult) + Send>;

/// One routed operation call: the parent context captured synchronously at
/// invocation time, the live connection, the operation descriptor, and the
/// completion callback when the caller used callback style.
pub struct ExecRequest {
    /// Parent span context, captured before any suspension point.
    pub cx: Context,
    /// Connection the operation runs on.
    pub connection: Arc<dyn Connection>,
    /// What is being executed.
    pub operation: Operation,
    /// Completion callback, for callback-style invocations.
    pub callback: Option<OpCallback>,
}

impl ExecRequest {
    /// A promise-style request.
    pub fn new(cx: Context, connection: Arc<dyn Connection>, operation: Operation) -> Self {
        ExecRequest {
            cx,
            connection,
            operation,
            callback: None,
        }
    }

    /// Switch the request to callback style.
    pub fn with_callback(mut self, callback: OpCallback) -> Self {
        self.callback = Some(callback);
        self
    }
}

impl fmt::Debug for ExecRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecRequest")
            .field("operation", &self.operation)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// How an entry point delivers its outcome.
///
/// `Ready` is a synchronous completion; `Pending` resolves later. Callers
/// that do not care about the difference can [`Execution::outcome`] either.
pub enum Execution {
    /// The operation completed synchronously.
    Ready(OpResult),
    /// The operation is still in flight.
    Pending(BoxFuture<'static, OpResult>),
}

impl Execution {
    /// Wait for the outcome, whichever completion style produced it.
    pub async fn outcome(self) -> OpResult {
        match self {
            Execution::Ready(result) => result,
            Execution::Pending(fut) => fut.await,
        }
    }
}

impl fmt::Debug for Execution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Execution::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Execution::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// An operation entry point implementation.
pub type ExecFn = Arc<dyn Fn(ExecRequest) -> Execution + Send + Sync>;

/// One swappable operation entry point.
///
/// The ODM calls through [`Hook::call`]; the instrumentation controller
/// replaces the implementation and puts the original back on disable.
pub struct Hook {
    exec: RwLock<ExecFn>,
}

impl Hook {
    /// Create an entry point with its original implementation.
    pub fn new(exec: ExecFn) -> Self {
        Hook {
            exec: RwLock::new(exec),
        }
    }

    /// Route one operation through the current implementation.
    pub fn call(&self, request: ExecRequest) -> Execution {
        let exec = {
            let guard = self.exec.read().expect("entry point lock poisoned");
            Arc::clone(&guard)
        };
        exec(request)
    }

    /// Current implementation.
    pub(crate) fn current(&self) -> ExecFn {
        Arc::clone(&self.exec.read().expect("entry point lock poisoned"))
    }

    /// Swap in a new implementation, returning the previous one.
    pub(crate) fn install(&self, exec: ExecFn) -> ExecFn {
        let mut guard = self.exec.write().expect("entry point lock poisoned");
        std::mem::replace(&mut *guard, exec)
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hook")
    }
}

/// The operation entry points an ODM exposes for instrumentation: the
/// generic query executor shared by the find/update/delete/count family, the
/// aggregate executor, the per-document instance methods (save/remove), and
/// the model-level aggregate invoked directly with a callback.
#[derive(Debug)]
pub struct Entrypoints {
    /// Query-builder execution.
    pub query: Hook,
    /// Aggregate-builder execution.
    pub aggregate: Hook,
    /// Document instance methods (save / remove).
    pub document: Hook,
    /// Model-level aggregate, callback form.
    pub model_aggregate: Hook,
    installed: AtomicBool,
}

impl Entrypoints {
    /// Collect the four entry points of a target library instance.
    pub fn new(
        query: ExecFn,
        aggregate: ExecFn,
        document: ExecFn,
        model_aggregate: ExecFn,
    ) -> Self {
        Entrypoints {
            query: Hook::new(query),
            aggregate: Hook::new(aggregate),
            document: Hook::new(document),
            model_aggregate: Hook::new(model_aggregate),
            installed: AtomicBool::new(false),
        }
    }

    /// Claim this target for instrumentation. Returns false when wrappers
    /// are already installed.
    pub(crate) fn claim(&self) -> bool {
        !self.installed.swap(true, Ordering::SeqCst)
    }

    /// Release the claim after the originals were restored.
    pub(crate) fn release(&self) {
        self.installed.store(false, Ordering::SeqCst);
    }
}
