//! Payload decoding shared by the adapters.
//!
//! A single-value event must carry a JSON object; a batch event a JSON
//! array of objects. When a key is given it must be present, non-null and
//! non-empty in every object. Other fields fall back to their defaults.
//! A batch with any bad element is rejected as a whole.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::DecodeError;
use crate::domain::envelope::Payload;

/// Turns one frame payload into zero or more domain values.
pub type Decoder<T> = Arc<dyn Fn(&Payload) -> Result<Vec<T>, DecodeError> + Send + Sync>;

/// [`Decoder`] for events carrying one object.
#[must_use]
pub fn single<T: DeserializeOwned + 'static>(key: Option<&'static str>) -> Decoder<T> {
    Arc::new(move |payload| decode_one(payload, key))
}

/// [`Decoder`] for events carrying an array of objects.
#[must_use]
pub fn batch<T: DeserializeOwned + 'static>(key: Option<&'static str>) -> Decoder<T> {
    Arc::new(move |payload| decode_batch(payload, key))
}

/// Decode a payload carrying one object.
///
/// # Errors
///
/// Returns `DecodeError` if the payload is not an object with `key`.
pub fn decode_one<T: DeserializeOwned>(
    payload: &Payload,
    key: Option<&'static str>,
) -> Result<Vec<T>, DecodeError> {
    let value = json_of(payload)?;
    decode_object(value, key).map(|item| vec![item])
}

/// Decode a payload carrying an array of objects.
///
/// # Errors
///
/// Returns `DecodeError` if the payload is not an array, or any element is
/// not an object with `key`.
pub fn decode_batch<T: DeserializeOwned>(
    payload: &Payload,
    key: Option<&'static str>,
) -> Result<Vec<T>, DecodeError> {
    match json_of(payload)? {
        Value::Array(items) => items.iter().map(|item| decode_object(item, key)).collect(),
        other => Err(DecodeError::UnexpectedShape {
            expected: "array",
            found: shape(other),
        }),
    }
}

/// Decode a polled response body: either one object or an array of them.
///
/// # Errors
///
/// Returns `DecodeError` under the same rules as the stream decoders.
pub fn decode_any<T: DeserializeOwned>(
    value: &Value,
    key: Option<&'static str>,
) -> Result<Vec<T>, DecodeError> {
    match value {
        Value::Array(items) => items.iter().map(|item| decode_object(item, key)).collect(),
        Value::Null => Err(DecodeError::Null),
        other => decode_object(other, key).map(|item| vec![item]),
    }
}

fn json_of(payload: &Payload) -> Result<&Value, DecodeError> {
    match payload {
        Payload::Json(Value::Null) => Err(DecodeError::Null),
        Payload::Json(value) => Ok(value),
        Payload::Text(_) => Err(DecodeError::NotJson),
    }
}

fn decode_object<T: DeserializeOwned>(
    value: &Value,
    key: Option<&'static str>,
) -> Result<T, DecodeError> {
    let Value::Object(fields) = value else {
        return Err(DecodeError::UnexpectedShape {
            expected: "object",
            found: shape(value),
        });
    };

    if let Some(key) = key {
        match fields.get(key) {
            None | Some(Value::Null) => return Err(DecodeError::MissingKey(key)),
            Some(Value::String(s)) if s.is_empty() => return Err(DecodeError::MissingKey(key)),
            Some(_) => {}
        }
    }

    T::deserialize(value).map_err(|e| DecodeError::InvalidField(e.to_string()))
}

const fn shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_case::test_case;

    use super::*;
    use crate::domain::market_data::PriceUpdate;

    #[test]
    fn single_object_decodes() {
        let payload = Payload::Json(json!({"asset": "BTC", "price": 65000}));
        let updates: Vec<PriceUpdate> = decode_one(&payload, Some("asset")).unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].asset, "BTC");
    }

    #[test_case(Payload::Json(json!(null)), DecodeError::Null ; "null body")]
    #[test_case(Payload::Text("halted".to_string()), DecodeError::NotJson ; "text body")]
    #[test_case(Payload::Json(json!(42)), DecodeError::UnexpectedShape { expected: "object", found: "number" } ; "number body")]
    #[test_case(Payload::Json(json!([{"asset": "BTC"}])), DecodeError::UnexpectedShape { expected: "object", found: "array" } ; "array for single")]
    #[test_case(Payload::Json(json!({"price": 1})), DecodeError::MissingKey("asset") ; "missing key")]
    #[test_case(Payload::Json(json!({"asset": null})), DecodeError::MissingKey("asset") ; "null key")]
    #[test_case(Payload::Json(json!({"asset": ""})), DecodeError::MissingKey("asset") ; "empty key")]
    fn single_rejections(payload: Payload, expected: DecodeError) {
        let result: Result<Vec<PriceUpdate>, _> = decode_one(&payload, Some("asset"));
        assert_eq!(result.unwrap_err(), expected);
    }

    #[test]
    fn wrong_field_type_is_invalid() {
        let payload = Payload::Json(json!({"asset": "BTC", "price": {"nested": true}}));
        let result: Result<Vec<PriceUpdate>, _> = decode_one(&payload, Some("asset"));
        assert!(matches!(result, Err(DecodeError::InvalidField(_))));
    }

    #[test]
    fn epoch_millis_timestamp_decodes() {
        let payload = Payload::Json(json!({"asset": "BTC", "price": 65000, "timestamp": 1_700_000_000_000_i64}));
        let updates: Vec<PriceUpdate> = decode_one(&payload, Some("asset")).unwrap();
        assert_eq!(
            updates[0].timestamp.map(|t| t.timestamp_millis()),
            Some(1_700_000_000_000)
        );
    }

    #[test]
    fn batch_decodes_every_element() {
        let payload = Payload::Json(json!([
            {"asset": "BTC", "price": 65000},
            {"asset": "ETH", "price": 3200}
        ]));
        let updates: Vec<PriceUpdate> = decode_batch(&payload, Some("asset")).unwrap();
        let assets: Vec<_> = updates.iter().map(|u| u.asset.as_str()).collect();
        assert_eq!(assets, vec!["BTC", "ETH"]);
    }

    #[test]
    fn batch_with_bad_element_is_rejected() {
        let payload = Payload::Json(json!([{"asset": "BTC"}, null]));
        let result: Result<Vec<PriceUpdate>, _> = decode_batch(&payload, Some("asset"));
        assert!(result.is_err());

        let payload = Payload::Json(json!({"asset": "BTC"}));
        let result: Result<Vec<PriceUpdate>, _> = decode_batch(&payload, Some("asset"));
        assert!(matches!(result, Err(DecodeError::UnexpectedShape { expected: "array", .. })));
    }

    #[test]
    fn decode_any_accepts_object_or_array() {
        let one: Vec<PriceUpdate> = decode_any(&json!({"asset": "SOL"}), Some("asset")).unwrap();
        assert_eq!(one.len(), 1);

        let many: Vec<PriceUpdate> =
            decode_any(&json!([{"asset": "SOL"}, {"asset": "ADA"}]), Some("asset")).unwrap();
        assert_eq!(many.len(), 2);

        let none: Result<Vec<PriceUpdate>, _> = decode_any(&json!(null), Some("asset"));
        assert_eq!(none.unwrap_err(), DecodeError::Null);
    }

    #[test]
    fn keyless_decoding_only_needs_an_object() {
        let payload = Payload::Json(json!({}));
        let metrics: Vec<crate::domain::risk::RiskMetrics> = decode_one(&payload, None).unwrap();
        assert_eq!(metrics.len(), 1);
    }
}
