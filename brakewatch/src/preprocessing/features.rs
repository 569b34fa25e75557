use crate::error::InferenceError;
use ndarray::Array2;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Column names accepted in a prediction payload, in training order.
pub const FEATURE_NAMES: [&str; 4] = [
    "brake_pressure",
    "brake_temp",
    "vehicle_speed",
    "pad_wear_level",
];

/// One set of brake sensor readings.
///
/// Each field accepts a JSON number or a string holding one, so form-style
/// clients sending `"135"` are served the same as `135`.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BrakeReading {
    #[serde(deserialize_with = "numeric")]
    pub brake_pressure: f64,
    #[serde(deserialize_with = "numeric")]
    pub brake_temp: f64,
    #[serde(deserialize_with = "numeric")]
    pub vehicle_speed: f64,
    #[serde(deserialize_with = "numeric")]
    pub pad_wear_level: f64,
}

impl BrakeReading {
    pub fn get(&self, feature: &str) -> Option<f64> {
        match feature {
            "brake_pressure" => Some(self.brake_pressure),
            "brake_temp" => Some(self.brake_temp),
            "vehicle_speed" => Some(self.vehicle_speed),
            "pad_wear_level" => Some(self.pad_wear_level),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct Numeric(#[serde(deserialize_with = "numeric")] f64);

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PositionalPayload {
    features: Vec<Numeric>,
}

/// A decoded `/predict` body.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionRequest {
    Single(BrakeReading),
    Batch(Vec<BrakeReading>),
    /// `{"features": [...]}` with values in the model's column order.
    Positional(Vec<f64>),
}

impl PredictionRequest {
    pub fn parse(body: &[u8]) -> Result<Self, InferenceError> {
        let value: Value = serde_json::from_slice(body).map_err(InferenceError::InvalidJson)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, InferenceError> {
        match value {
            Value::Array(items) => {
                if items.is_empty() {
                    return Err(InferenceError::InvalidInput(
                        "batch must contain at least one record".to_string(),
                    ));
                }
                let readings = items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| {
                        BrakeReading::deserialize(item)
                            .map_err(|e| InferenceError::InvalidInput(format!("record {i}: {e}")))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::Batch(readings))
            }
            Value::Object(map) if map.contains_key("features") => {
                let payload = PositionalPayload::deserialize(Value::Object(map))
                    .map_err(InferenceError::InvalidRecord)?;
                Ok(Self::Positional(
                    payload.features.into_iter().map(|n| n.0).collect(),
                ))
            }
            Value::Object(map) => BrakeReading::deserialize(Value::Object(map))
                .map(Self::Single)
                .map_err(InferenceError::InvalidRecord),
            other => Err(InferenceError::InvalidInput(format!(
                "expected a JSON object or an array of objects, got {}",
                kind(&other)
            ))),
        }
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, Self::Batch(_))
    }

    /// Shapes the request into a `[rows, features]` matrix ordered by `feature_names`.
    pub fn to_rows(&self, feature_names: &[String]) -> Result<Array2<f64>, InferenceError> {
        let cols = feature_names.len();
        match self {
            Self::Positional(values) => {
                if values.len() != cols {
                    return Err(InferenceError::ShapeMismatch {
                        expected: cols,
                        got: values.len(),
                    });
                }
                Ok(Array2::from_shape_vec((1, cols), values.clone())?)
            }
            Self::Single(reading) => readings_to_rows(std::slice::from_ref(reading), feature_names),
            Self::Batch(readings) => readings_to_rows(readings, feature_names),
        }
    }
}

fn readings_to_rows(
    readings: &[BrakeReading],
    feature_names: &[String],
) -> Result<Array2<f64>, InferenceError> {
    let mut data = Vec::with_capacity(readings.len() * feature_names.len());
    for reading in readings {
        for name in feature_names {
            let value = reading.get(name).ok_or_else(|| {
                InferenceError::InvalidInput(format!("model expects unknown feature `{name}`"))
            })?;
            data.push(value);
        }
    }
    Ok(Array2::from_shape_vec(
        (readings.len(), feature_names.len()),
        data,
    )?)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn numeric<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(NumericVisitor)
}

struct NumericVisitor;

impl NumericVisitor {
    fn finite<E: de::Error>(value: f64) -> Result<f64, E> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(E::custom(format!("non-finite value {value}")))
        }
    }
}

impl<'de> Visitor<'de> for NumericVisitor {
    type Value = f64;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number or a numeric string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
        Ok(v as f64)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
        Ok(v as f64)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
        Self::finite(v)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
        let parsed: f64 = v
            .trim()
            .parse()
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))?;
        Self::finite(parsed)
    }
}
