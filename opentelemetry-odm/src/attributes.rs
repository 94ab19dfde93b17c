//! Span attribute vocabulary and extraction.
//!
//! The key strings below are the layer's wire-visible contract toward the
//! exporter; they never change between releases. Each operation populates a
//! deterministic subset: absent payloads mean absent keys, never empty
//! values.

use opentelemetry::KeyValue;
use serde::Serialize;

use crate::odm::{Connection, Operation};

/// Component marker value, also the first segment of every span name.
pub const COMPONENT_NAME: &str = "odm";

/// Component marker key.
pub const COMPONENT: &str = "component";
/// Database paradigm, always `nosql`.
pub const DB_TYPE: &str = "db.type";
/// Selected database name.
pub const DB_NAME: &str = "db.name";
/// Connection host.
pub const DB_HOST: &str = "db.host";
/// Connection port.
pub const DB_PORT: &str = "db.port";
/// Authenticated user, omitted when the connection has none.
pub const DB_USER: &str = "db.user";
/// Backing collection name.
pub const COLLECTION: &str = "db.collection";
/// Serialized query criteria.
pub const STATEMENT: &str = "db.statement";
/// Serialized call options.
pub const OPTIONS: &str = "db.options";
/// Serialized update payload.
pub const UPDATE: &str = "db.updates";
/// Serialized save payload (enhanced reporting only).
pub const SAVE: &str = "db.save";
/// Serialized operation response (enhanced reporting only).
pub const RESPONSE: &str = "db.response";
/// Numeric driver error code.
pub const ERROR_CODE: &str = "db.error_code";
/// Model the operation ran against.
pub const MODEL: &str = "odm.model";
/// Operation kind, driver vocabulary.
pub const QUERY_TYPE: &str = "odm.query";
/// Serialized aggregation pipeline.
pub const AGGREGATE_PIPELINE: &str = "odm.aggregate_pipeline";

/// Serialize a payload for attribute capture.
///
/// Object keys keep the insertion order of the source value. A payload the
/// serializer cannot represent degrades to `None`; the attribute is simply
/// omitted and the operation itself is unaffected.
pub fn safe_serialize<T: Serialize>(payload: &T) -> Option<String> {
    serde_json::to_string(payload).ok()
}

/// Attributes describing the live connection, read at call time.
pub fn connection_attributes(connection: &dyn Connection) -> Vec<KeyValue> {
    let mut attrs = vec![
        KeyValue::new(DB_NAME, connection.database().to_owned()),
        KeyValue::new(DB_HOST, connection.host().to_owned()),
        KeyValue::new(DB_PORT, i64::from(connection.port())),
    ];
    if let Some(user) = connection.user() {
        attrs.push(KeyValue::new(DB_USER, user.to_owned()));
    }
    attrs
}

/// Initial attribute set for one operation span.
pub fn operation_attributes(
    operation: &Operation,
    connection: &dyn Connection,
    enhanced: bool,
) -> Vec<KeyValue> {
    let mut attrs = vec![
        KeyValue::new(COMPONENT, COMPONENT_NAME),
        KeyValue::new(DB_TYPE, "nosql"),
        KeyValue::new(MODEL, operation.model.clone()),
        KeyValue::new(QUERY_TYPE, operation.query_type.as_str()),
        KeyValue::new(COLLECTION, operation.collection.clone()),
    ];
    attrs.extend(connection_attributes(connection));

    if let Some(serialized) = operation.criteria.as_ref().and_then(safe_serialize) {
        attrs.push(KeyValue::new(STATEMENT, serialized));
    }
    if let Some(serialized) = operation.options.as_ref().and_then(safe_serialize) {
        attrs.push(KeyValue::new(OPTIONS, serialized));
    }
    if let Some(serialized) = operation.update.as_ref().and_then(safe_serialize) {
        attrs.push(KeyValue::new(UPDATE, serialized));
    }
    if let Some(serialized) = operation.pipeline.as_ref().and_then(safe_serialize) {
        attrs.push(KeyValue::new(AGGREGATE_PIPELINE, serialized));
    }
    if enhanced {
        if let Some(serialized) = operation.document.as_ref().and_then(safe_serialize) {
            attrs.push(KeyValue::new(SAVE, serialized));
        }
    }
    attrs
}
