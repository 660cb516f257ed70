//! Standard response envelope and the framework-neutral reply handed to adapters.

use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Metadata {
    /// Always 0: counting is not performed.
    pub total_count: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    Collection { data: Vec<Value>, metadata: Metadata },
    Single { data: Value },
}

impl Envelope {
    pub fn single(data: Value) -> Self {
        Envelope::Single { data }
    }

    pub fn collection(data: Vec<Value>) -> Self {
        Envelope::Collection {
            data,
            metadata: Metadata { total_count: 0 },
        }
    }

    pub fn into_value(self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Status plus optional JSON body, ready for an adapter's `respond`.
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl Reply {
    pub fn new(status: StatusCode, body: Option<Value>) -> Self {
        Reply { status, body }
    }

    pub fn json(status: StatusCode, envelope: Envelope) -> Self {
        Reply::new(status, Some(envelope.into_value()))
    }

    pub fn empty(status: StatusCode) -> Self {
        Reply::new(status, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelopes_serialize_flat() {
        assert_eq!(Envelope::single(json!({ "id": 1 })).into_value(), json!({ "data": { "id": 1 } }));
        assert_eq!(
            Envelope::collection(vec![json!(1)]).into_value(),
            json!({ "data": [1], "metadata": { "total_count": 0 } })
        );
    }
}
