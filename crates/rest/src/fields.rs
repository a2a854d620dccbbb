//! Field declarations: how one attribute of a model is documented and marshalled.
//!
//! ```
//! use micro_rest::fields::Field;
//!
//! let task = Field::string().required().description("The task details").min_length(1);
//! assert_eq!(task.schema()["type"], "string");
//! ```

use crate::mask::Mask;
use crate::marshal::{marshal_object, MarshalError};
use crate::model::Model;
use crate::utils::not_none;
use serde_json::{json, Map, Value};
use thiserror::Error;

/// A value that could not be converted to its declared field type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unable to marshal field '{field}' value {value}: {reason}")]
pub struct FieldError {
    field: String,
    value: String,
    reason: String,
}

impl FieldError {
    fn new(field: &str, value: &Value, reason: &str) -> Self {
        Self { field: field.to_string(), value: value.to_string(), reason: reason.to_string() }
    }
}

#[derive(Debug, Clone)]
pub enum FieldKind {
    Raw,
    String,
    Integer,
    Float,
    Boolean,
    DateTime,
    Date,
    Nested { model: Model, allow_null: bool },
    List(Box<Field>),
}

#[derive(Debug, Clone)]
pub struct Field {
    kind: FieldKind,
    required: bool,
    readonly: bool,
    description: Option<String>,
    title: Option<String>,
    example: Option<Value>,
    default: Option<Value>,
    attribute: Option<String>,
    format: Option<String>,
    minimum: Option<Value>,
    maximum: Option<Value>,
    exclusive_minimum: bool,
    exclusive_maximum: bool,
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<String>,
    enumeration: Option<Vec<Value>>,
}

impl Field {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            required: false,
            readonly: false,
            description: None,
            title: None,
            example: None,
            default: None,
            attribute: None,
            format: None,
            minimum: None,
            maximum: None,
            exclusive_minimum: false,
            exclusive_maximum: false,
            min_length: None,
            max_length: None,
            pattern: None,
            enumeration: None,
        }
    }

    /// Any JSON value, passed through untouched.
    pub fn raw() -> Self {
        Self::new(FieldKind::Raw)
    }

    pub fn string() -> Self {
        Self::new(FieldKind::String)
    }

    pub fn integer() -> Self {
        Self::new(FieldKind::Integer)
    }

    pub fn float() -> Self {
        Self::new(FieldKind::Float)
    }

    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    /// An ISO 8601 date-time string.
    pub fn datetime() -> Self {
        Self::new(FieldKind::DateTime)
    }

    /// An ISO 8601 date string.
    pub fn date() -> Self {
        Self::new(FieldKind::Date)
    }

    pub fn nested(model: &Model) -> Self {
        Self::new(FieldKind::Nested { model: model.clone(), allow_null: false })
    }

    pub fn list(item: Field) -> Self {
        Self::new(FieldKind::List(Box::new(item)))
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn example(mut self, example: impl Into<Value>) -> Self {
        self.example = Some(example.into());
        self
    }

    /// The value marshalled when the source has none.
    #[must_use]
    pub fn default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Reads the value from another (dotted) key of the source object.
    #[must_use]
    pub fn attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    #[must_use]
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    #[must_use]
    pub fn min(mut self, minimum: impl Into<Value>) -> Self {
        self.minimum = Some(minimum.into());
        self
    }

    #[must_use]
    pub fn max(mut self, maximum: impl Into<Value>) -> Self {
        self.maximum = Some(maximum.into());
        self
    }

    #[must_use]
    pub fn exclusive_min(mut self) -> Self {
        self.exclusive_minimum = true;
        self
    }

    #[must_use]
    pub fn exclusive_max(mut self) -> Self {
        self.exclusive_maximum = true;
        self
    }

    /// Minimum string length, or minimum item count for lists.
    #[must_use]
    pub fn min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    /// Maximum string length, or maximum item count for lists.
    #[must_use]
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    #[must_use]
    pub fn enumeration<V: Into<Value>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.enumeration = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Lets a nested field marshal `null` instead of an object of nulls.
    #[must_use]
    pub fn allow_null(mut self) -> Self {
        if let FieldKind::Nested { allow_null, .. } = &mut self.kind {
            *allow_null = true;
        }
        self
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// The model this field nests, directly or as list items.
    pub fn nested_model(&self) -> Option<&Model> {
        match &self.kind {
            FieldKind::Nested { model, .. } => Some(model),
            FieldKind::List(item) => item.nested_model(),
            _ => None,
        }
    }

    /// Whether a nested mask can select inside this field's values.
    pub(crate) fn accepts_mask(&self) -> bool {
        match &self.kind {
            FieldKind::Nested { .. } | FieldKind::Raw => true,
            FieldKind::List(item) => item.accepts_mask(),
            _ => false,
        }
    }

    /// The JSON schema documenting this field.
    pub fn schema(&self) -> Value {
        let mut schema = Map::new();
        match &self.kind {
            FieldKind::Raw => {
                schema.insert("type".into(), json!("object"));
            }
            FieldKind::String => {
                schema.insert("type".into(), json!("string"));
                schema.insert("minLength".into(), json!(self.min_length));
                schema.insert("maxLength".into(), json!(self.max_length));
                schema.insert("pattern".into(), json!(self.pattern));
                schema.insert("enum".into(), json!(self.enumeration));
            }
            FieldKind::Integer | FieldKind::Float => {
                let kind = if matches!(self.kind, FieldKind::Integer) { "integer" } else { "number" };
                schema.insert("type".into(), json!(kind));
                schema.insert("minimum".into(), json!(self.minimum));
                schema.insert("maximum".into(), json!(self.maximum));
                schema.insert("exclusiveMinimum".into(), json!(self.exclusive_minimum.then_some(true)));
                schema.insert("exclusiveMaximum".into(), json!(self.exclusive_maximum.then_some(true)));
                schema.insert("enum".into(), json!(self.enumeration));
            }
            FieldKind::Boolean => {
                schema.insert("type".into(), json!("boolean"));
            }
            FieldKind::DateTime => {
                schema.insert("type".into(), json!("string"));
                schema.insert("format".into(), json!("date-time"));
            }
            FieldKind::Date => {
                schema.insert("type".into(), json!("string"));
                schema.insert("format".into(), json!("date"));
            }
            FieldKind::Nested { model, .. } => {
                let reference = json!({"$ref": model.reference()});
                let extra = self.common_schema();
                if extra.is_empty() {
                    return reference;
                }
                schema.insert("allOf".into(), json!([reference]));
                schema.extend(extra);
                return Value::Object(schema);
            }
            FieldKind::List(item) => {
                schema.insert("type".into(), json!("array"));
                schema.insert("items".into(), item.schema());
                schema.insert("minItems".into(), json!(self.min_length));
                schema.insert("maxItems".into(), json!(self.max_length));
            }
        }
        if let Some(format) = &self.format {
            schema.insert("format".into(), json!(format));
        }
        schema.extend(self.common_schema());
        Value::Object(not_none(schema))
    }

    fn common_schema(&self) -> Map<String, Value> {
        let mut schema = Map::new();
        schema.insert("title".into(), json!(self.title));
        schema.insert("description".into(), json!(self.description));
        schema.insert("default".into(), json!(self.default));
        schema.insert("example".into(), json!(self.example));
        schema.insert("readOnly".into(), json!(self.readonly.then_some(true)));
        not_none(schema)
    }

    /// Marshals the value stored under `key` (or the field's attribute) of `data`.
    pub fn output(&self, key: &str, data: &Value, mask: Option<&Mask>) -> Result<Value, MarshalError> {
        let path = self.attribute.as_deref().unwrap_or(key);
        let value = lookup(data, path).unwrap_or(&Value::Null);
        self.format_value(key, value, mask)
    }

    fn format_value(&self, key: &str, value: &Value, mask: Option<&Mask>) -> Result<Value, MarshalError> {
        if value.is_null() {
            return match &self.kind {
                FieldKind::Nested { allow_null: true, .. } => Ok(Value::Null),
                FieldKind::Nested { model, .. } if self.default.is_none() => marshal_object(&Value::Null, model, mask, false),
                _ => Ok(self.default.clone().unwrap_or(Value::Null)),
            };
        }

        let formatted = match &self.kind {
            FieldKind::Raw => match mask {
                Some(mask) => mask.apply(value, false)?,
                None => value.clone(),
            },
            FieldKind::String => match value {
                Value::String(s) => Value::String(s.clone()),
                other => Value::String(other.to_string()),
            },
            FieldKind::Integer => Value::from(to_integer(value).ok_or_else(|| FieldError::new(key, value, "not an integer"))?),
            FieldKind::Float => Value::from(to_float(value).ok_or_else(|| FieldError::new(key, value, "not a number"))?),
            FieldKind::Boolean => Value::Bool(truthy(value)),
            FieldKind::DateTime | FieldKind::Date => match value {
                Value::String(s) => Value::String(s.clone()),
                _ => return Err(FieldError::new(key, value, "unsupported date format").into()),
            },
            FieldKind::Nested { model, .. } => marshal_object(value, model, mask, false)?,
            FieldKind::List(item) => {
                let items = match value {
                    Value::Array(items) => items.iter().collect::<Vec<_>>(),
                    single => vec![single],
                };
                Value::Array(
                    items.into_iter().map(|value| item.format_value(key, value, mask)).collect::<Result<Vec<_>, _>>()?,
                )
            }
        };
        Ok(formatted)
    }
}

/// Follows a dotted path through objects and arrays.
fn lookup<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    if let Some(value) = data.get(path) {
        return Some(value);
    }
    path.split('.').try_fold(data, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|index| items.get(index)),
        _ => None,
    })
}

#[allow(clippy::cast_possible_truncation, reason = "floats are truncated like integer conversion")]
fn to_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| number.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(number) => number.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
