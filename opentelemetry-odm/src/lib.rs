//! # OpenTelemetry ODM Instrumentation
//!
//! Transparently turns object-document-mapper operations into OpenTelemetry
//! client spans. The target library exposes its operation entry points as
//! swappable [`odm::Hook`]s; [`enable`] decorates them so every database
//! call (promise style, callback style, or a chainable builder finally
//! executed) produces exactly one correctly parented span, and
//! [`Instrumentation::disable`] restores the originals exactly.
//!
//! Span names follow `odm.<model>.<queryType>`; the attribute vocabulary is
//! fixed and lives in [`attributes`]. Instrumentation is fail-open: results
//! and errors always reach the caller unchanged, and a payload that cannot
//! be serialized only costs its attribute.
//!
//! ## Example
//!
//! ```
//! use opentelemetry::Context;
//! use opentelemetry_odm::odm::{
//!     Connection, Entrypoints, ExecFn, ExecRequest, Execution, Operation, QueryType,
//! };
//! use opentelemetry_odm::{enable, InstrumentationConfig};
//! use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! struct LocalConnection;
//!
//! impl Connection for LocalConnection {
//!     fn host(&self) -> &str {
//!         "localhost"
//!     }
//!     fn port(&self) -> u16 {
//!         27017
//!     }
//!     fn database(&self) -> &str {
//!         "test"
//!     }
//!     fn user(&self) -> Option<&str> {
//!         None
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // The target ODM routes every operation through entry points like this one.
//! let exec: ExecFn = Arc::new(|_request| Execution::Ready(Ok(json!([]))));
//! let entrypoints = Arc::new(Entrypoints::new(
//!     exec.clone(),
//!     exec.clone(),
//!     exec.clone(),
//!     exec,
//! ));
//!
//! let exporter = InMemorySpanExporter::default();
//! let provider = SdkTracerProvider::builder()
//!     .with_simple_exporter(exporter.clone())
//!     .build();
//! let registration = enable(&entrypoints, &provider, InstrumentationConfig::default())?;
//!
//! // Operations routed through the entry points now produce client spans.
//! let request = ExecRequest::new(
//!     Context::current(),
//!     Arc::new(LocalConnection),
//!     Operation::query("User", "users", QueryType::Find, json!({"age": 18})),
//! );
//! match entrypoints.query.call(request) {
//!     Execution::Ready(result) => assert!(result.is_ok()),
//!     Execution::Pending(_) => unreachable!("this entry point completes synchronously"),
//! }
//! assert_eq!(exporter.get_finished_spans().unwrap().len(), 1);
//!
//! registration.disable();
//! # Ok(())
//! # }
//! ```
#![warn(missing_debug_implementations, missing_docs, unreachable_pub)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod attributes;
pub mod error;
mod instrument;
mod lifecycle;
pub mod odm;

pub use error::{EnableError, OdmError};
pub use instrument::{enable, Instrumentation, InstrumentationConfig};
