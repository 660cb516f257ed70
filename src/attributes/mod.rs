//! Attribute sources: how each field of a record to write gets its value.

mod resolve;

pub use resolve::{encode_value, resolve, Arguments};

use crate::context::RequestContext;
use crate::error::AppError;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

pub type ResolverFn = Arc<dyn Fn(RequestContext) -> BoxFuture<'static, Result<Value, AppError>> + Send + Sync>;

/// Which server timestamp a field receives. Both resolve to the current instant; an
/// `Insert` timestamp is skipped under update semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimestampKind {
    Insert,
    Update,
}

/// Where a field's value comes from.
#[derive(Clone)]
pub enum AttributeSource {
    /// Literal JSON null.
    Null,
    /// Let the store apply the column default.
    Default,
    /// Fresh UUID v4.
    GeneratedId,
    /// Current UTC instant, RFC 3339 with milliseconds.
    Timestamp(TimestampKind),
    /// Request-scoped store, keyed by field name. Absent keys leave the field unset.
    Context,
    /// Caller-supplied argument bag, keyed by field name.
    Argument,
    /// Validated inbound payload.
    Payload,
    /// Decoded route parameter, coerced to the field type.
    RouteParam,
    Custom(ResolverFn),
}

impl AttributeSource {
    pub fn custom<F, Fut>(f: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, AppError>> + Send + 'static,
    {
        AttributeSource::Custom(Arc::new(move |ctx| f(ctx).boxed()))
    }

    /// Synchronous variant of [`AttributeSource::custom`].
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&RequestContext) -> Result<Value, AppError> + Send + Sync + 'static,
    {
        AttributeSource::Custom(Arc::new(move |ctx| {
            let out = f(&ctx);
            futures::future::ready(out).boxed()
        }))
    }
}

impl std::fmt::Debug for AttributeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeSource::Null => f.write_str("Null"),
            AttributeSource::Default => f.write_str("Default"),
            AttributeSource::GeneratedId => f.write_str("GeneratedId"),
            AttributeSource::Timestamp(kind) => write!(f, "Timestamp({:?})", kind),
            AttributeSource::Context => f.write_str("Context"),
            AttributeSource::Argument => f.write_str("Argument"),
            AttributeSource::Payload => f.write_str("Payload"),
            AttributeSource::RouteParam => f.write_str("RouteParam"),
            AttributeSource::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Ordered field -> source declarations for one action. A field appears at most once.
#[derive(Clone, Debug, Default)]
pub struct AttributeSpec {
    entries: Vec<(String, AttributeSource)>,
}

impl AttributeSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare (or redeclare) the source for `field`. Redeclaring keeps the original position.
    pub fn field(mut self, field: impl Into<String>, source: AttributeSource) -> Self {
        let field = field.into();
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some(entry) => entry.1 = source,
            None => self.entries.push((field, source)),
        }
        self
    }

    /// All listed fields come from the payload.
    pub fn payload<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        fields
            .into_iter()
            .fold(Self::new(), |spec, f| spec.field(f, AttributeSource::Payload))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeSource)> {
        self.entries.iter().map(|(name, source)| (name.as_str(), source))
    }

    pub fn payload_fields(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, source)| matches!(source, AttributeSource::Payload))
            .map(|(name, _)| name)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A resolved field value: a concrete value or the store's column default.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Set(Value),
    Default,
}

/// The record to write. Fields left unset by their source are absent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedRecord {
    values: BTreeMap<String, FieldValue>,
}

impl ResolvedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) {
        self.values.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    /// Concrete value of a field, None when unset or defaulted.
    pub fn value(&self, field: &str) -> Option<&Value> {
        match self.values.get(field) {
            Some(FieldValue::Set(v)) => Some(v),
            _ => None,
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// JSON view of the concrete values; defaulted fields are left out.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .filter_map(|(k, v)| match v {
                    FieldValue::Set(v) => Some((k.clone(), v.clone())),
                    FieldValue::Default => None,
                })
                .collect(),
        )
    }
}
