//! Shaping handler data into the declared output of a model.

use crate::error::BoxError;
use crate::fields::FieldError;
use crate::mask::{Mask, MaskError};
use crate::model::Model;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarshalError {
    #[error(transparent)]
    Mask(#[from] MaskError),
    #[error(transparent)]
    Field(#[from] FieldError),
}

impl MarshalError {
    /// Unwraps into the underlying error so error handlers can match on it directly.
    pub fn into_source(self) -> BoxError {
        match self {
            MarshalError::Mask(e) => Box::new(e),
            MarshalError::Field(e) => Box::new(e),
        }
    }
}

/// Marshals an object, or each element of a list, with `model`.
pub fn marshal(data: &Value, model: &Model, mask: Option<&Mask>, skip_none: bool) -> Result<Value, MarshalError> {
    match data {
        Value::Array(items) => items
            .iter()
            .map(|item| marshal_object(item, model, mask, skip_none))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => marshal_object(other, model, mask, skip_none),
    }
}

/// Like [`marshal`], wrapping the result as `{envelope: result}`.
pub fn marshal_with_envelope(
    data: &Value,
    model: &Model,
    mask: Option<&Mask>,
    skip_none: bool,
    envelope: Option<&str>,
) -> Result<Value, MarshalError> {
    let marshalled = marshal(data, model, mask, skip_none)?;
    Ok(match envelope {
        Some(envelope) => {
            let mut wrapped = Map::new();
            wrapped.insert(envelope.to_string(), marshalled);
            Value::Object(wrapped)
        }
        None => marshalled,
    })
}

pub(crate) fn marshal_object(data: &Value, model: &Model, mask: Option<&Mask>, skip_none: bool) -> Result<Value, MarshalError> {
    let fields = model.fields();
    let mut out = Map::new();

    let mut emit = |key: &str, value: Value| {
        if !(skip_none && value.is_null()) {
            out.insert(key.to_string(), value);
        }
    };

    match mask.filter(|mask| !mask.is_empty()) {
        None => {
            for (key, field) in &fields {
                emit(*key, field.output(*key, data, None)?);
            }
        }
        Some(mask) => {
            for (key, nested) in mask.entries() {
                let Some(field) = fields.get(key) else {
                    continue;
                };
                if nested.is_some() && !field.accepts_mask() {
                    return Err(MaskError::Inconsistent("Mask is inconsistent with data".to_string()).into());
                }
                emit(key, field.output(key, data, nested)?);
            }
            if mask.has_wildcard() {
                for (key, field) in &fields {
                    if !mask.contains(*key) {
                        emit(*key, field.output(*key, data, None)?);
                    }
                }
            }
        }
    }

    Ok(Value::Object(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Field;
    use serde_json::json;

    fn models() -> (Model, Model) {
        let owner = Model::builder("Owner").field("name", Field::string()).field("email", Field::string()).build();
        let todo = Model::builder("Todo")
            .field("id", Field::integer())
            .field("task", Field::string())
            .field("owner", Field::nested(&owner))
            .build();
        (owner, todo)
    }

    #[test]
    fn test_marshal_keeps_declared_fields_in_order() {
        let (_, todo) = models();
        let data = json!({"task": "build", "id": "3", "secret": true});
        let marshalled = marshal(&data, &todo, None, false).unwrap();
        assert_eq!(marshalled, json!({"id": 3, "task": "build", "owner": {"name": null, "email": null}}));
        assert_eq!(marshalled.as_object().unwrap().keys().collect::<Vec<_>>(), vec!["id", "task", "owner"]);
    }

    #[test]
    fn test_marshal_list_and_envelope() {
        let (owner, _) = models();
        let data = json!([{"name": "a"}, {"name": "b"}]);
        let marshalled = marshal_with_envelope(&data, &owner, None, true, Some("owners")).unwrap();
        assert_eq!(marshalled, json!({"owners": [{"name": "a"}, {"name": "b"}]}));
    }

    #[test]
    fn test_marshal_with_mask() {
        let (_, todo) = models();
        let data = json!({"id": 1, "task": "build", "owner": {"name": "ann", "email": "a@b.c"}});

        let mask = Mask::parse("{task,owner{email},unknown}").unwrap();
        assert_eq!(marshal(&data, &todo, Some(&mask), false).unwrap(), json!({"task": "build", "owner": {"email": "a@b.c"}}));

        let mask = Mask::parse("{owner{name},*}").unwrap();
        assert_eq!(
            marshal(&data, &todo, Some(&mask), false).unwrap(),
            json!({"owner": {"name": "ann"}, "id": 1, "task": "build"})
        );
    }

    #[test]
    fn test_mask_selects_inside_raw_fields() {
        let todo = Model::builder("Todo").field("task", Field::string()).field("meta", Field::raw()).build();
        let data = json!({"task": "build", "meta": {"tags": ["api"], "color": "red"}});

        let mask = Mask::parse("{meta{tags}}").unwrap();
        assert_eq!(marshal(&data, &todo, Some(&mask), false).unwrap(), json!({"meta": {"tags": ["api"]}}));

        let mask = Mask::parse("{task,meta}").unwrap();
        assert_eq!(marshal(&data, &todo, Some(&mask), false).unwrap(), data);

        let mask = Mask::parse("{meta{tags}}").unwrap();
        let error = marshal(&json!({"meta": 3}), &todo, Some(&mask), false).unwrap_err();
        assert!(matches!(error, MarshalError::Mask(MaskError::Inconsistent(_))));
    }

    #[test]
    fn test_nested_mask_on_scalar_is_inconsistent() {
        let (_, todo) = models();
        let mask = Mask::parse("{task{x}}").unwrap();
        let error = marshal(&json!({"task": "a"}), &todo, Some(&mask), false).unwrap_err();
        assert_eq!(error.to_string(), "Mask error: Mask is inconsistent with data");
    }

    #[test]
    fn test_skip_none() {
        let (owner, _) = models();
        assert_eq!(marshal(&json!({"name": "a"}), &owner, None, true).unwrap(), json!({"name": "a"}));
    }
}
