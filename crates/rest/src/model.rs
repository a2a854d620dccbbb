//! Named models: ordered field sets documented as swagger definitions and used to validate
//! payloads.

use crate::error::RestError;
use crate::fields::Field;
use crate::utils::not_none;
use indexmap::IndexMap;
use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, Validator};
use once_cell::sync::OnceCell;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::error;

/// A named, ordered set of fields. Cloning is cheap.
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

struct ModelInner {
    name: String,
    fields: IndexMap<String, Field>,
    parent: Option<Model>,
    strict: bool,
    mask: Option<String>,
    /// Compiled validators, without and with format checking.
    validators: [OnceCell<Result<Validator, String>>; 2],
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.inner.name)
            .field("fields", &self.inner.fields.keys().collect::<Vec<_>>())
            .field("parent", &self.inner.parent.as_ref().map(Model::name))
            .finish_non_exhaustive()
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Model {
    pub fn builder(name: impl Into<String>) -> ModelBuilder {
        ModelBuilder { name: name.into(), fields: IndexMap::new(), parent: None, strict: false, mask: None }
    }

    /// Starts a model extending `parent`; documented with `allOf`.
    pub fn inherit(name: impl Into<String>, parent: &Model) -> ModelBuilder {
        let mut builder = Self::builder(name);
        builder.parent = Some(parent.clone());
        builder
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn parent(&self) -> Option<&Model> {
        self.inner.parent.as_ref()
    }

    /// The default fields mask of this model, if any.
    pub fn mask(&self) -> Option<&str> {
        self.inner.mask.as_deref()
    }

    /// The fields declared on this model only.
    pub fn own_fields(&self) -> &IndexMap<String, Field> {
        &self.inner.fields
    }

    /// Inherited fields first, then the model's own.
    pub fn fields(&self) -> IndexMap<&str, &Field> {
        let mut fields = self.inner.parent.as_ref().map(Model::fields).unwrap_or_default();
        for (name, field) in &self.inner.fields {
            fields.insert(name.as_str(), field);
        }
        fields
    }

    pub fn reference(&self) -> String {
        format!("#/definitions/{}", self.inner.name)
    }

    /// The swagger definition of this model.
    pub fn schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = vec![];
        for (name, field) in &self.inner.fields {
            properties.insert(name.clone(), field.schema());
            if field.is_required() {
                required.push(name.clone());
            }
        }
        required.sort();

        let mut schema = Map::new();
        schema.insert("required".into(), if required.is_empty() { Value::Null } else { json!(required) });
        schema.insert("properties".into(), Value::Object(properties));
        schema.insert("type".into(), json!("object"));
        schema.insert("x-mask".into(), json!(self.inner.mask));
        if self.inner.strict {
            schema.insert("additionalProperties".into(), json!(false));
        }
        let schema = Value::Object(not_none(schema));

        match &self.inner.parent {
            Some(parent) => json!({"allOf": [{"$ref": parent.reference()}, schema]}),
            None => schema,
        }
    }

    /// This model followed by every model it references, each once.
    pub fn dependencies(&self) -> Vec<Model> {
        let mut found = vec![];
        self.collect_dependencies(&mut found);
        found
    }

    fn collect_dependencies(&self, found: &mut Vec<Model>) {
        if found.iter().any(|model| model.name() == self.name()) {
            return;
        }
        found.push(self.clone());
        if let Some(parent) = &self.inner.parent {
            parent.collect_dependencies(found);
        }
        for field in self.inner.fields.values() {
            if let Some(model) = field.nested_model() {
                model.collect_dependencies(found);
            }
        }
    }

    /// The schema of this model with its dependencies inlined as definitions.
    pub fn validation_schema(&self) -> Value {
        let definitions = self
            .dependencies()
            .into_iter()
            .map(|model| (model.name().to_string(), model.schema()))
            .collect::<Map<_, _>>();
        let mut schema = self.schema();
        if let Value::Object(map) = &mut schema {
            map.insert("definitions".into(), Value::Object(definitions));
        }
        schema
    }

    /// Validates `data` against the model.
    ///
    /// Failures come back as [`RestError::Invalid`] mapping field path to message. Paths are
    /// dotted; a missing required property is reported under its own name. `check_formats`
    /// also validates `format` keywords such as `date-time`. A schema which does not compile,
    /// e.g. from a bad `pattern`, is a [`RestError::Specs`] on every call.
    pub fn validate(&self, data: &Value, check_formats: bool) -> Result<(), RestError> {
        let validator = self.inner.validators[usize::from(check_formats)].get_or_init(|| {
            let schema = self.validation_schema();
            jsonschema::options()
                .with_draft(Draft::Draft4)
                .should_validate_formats(check_formats)
                .build(&schema)
                .map_err(|e| {
                    error!(model = self.name(), "unable to compile validation schema: {e}");
                    format!("Unable to compile validation schema of model {}: {e}", self.name())
                })
        });
        let validator = validator.as_ref().map_err(|e| RestError::Specs(e.clone()))?;

        let mut errors = Map::new();
        for error in validator.iter_errors(data) {
            let mut path = error.instance_path().as_str().trim_start_matches('/').replace('/', ".");
            if let ValidationErrorKind::Required { property } = error.kind() {
                let property = property.as_str().map_or_else(|| property.to_string(), str::to_string);
                path = if path.is_empty() { property } else { format!("{path}.{property}") };
            }
            errors.insert(path, Value::String(error.to_string()));
        }

        if errors.is_empty() { Ok(()) } else { Err(RestError::Invalid(errors)) }
    }
}

#[derive(Debug)]
pub struct ModelBuilder {
    name: String,
    fields: IndexMap<String, Field>,
    parent: Option<Model>,
    strict: bool,
    mask: Option<String>,
}

impl ModelBuilder {
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    /// Rejects properties not declared on the model.
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    #[must_use]
    pub fn mask(mut self, mask: impl Into<String>) -> Self {
        self.mask = Some(mask.into());
        self
    }

    pub fn build(self) -> Model {
        Model {
            inner: Arc::new(ModelInner {
                name: self.name,
                fields: self.fields,
                parent: self.parent,
                strict: self.strict,
                mask: self.mask,
                validators: [OnceCell::new(), OnceCell::new()],
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid(result: Result<(), RestError>) -> Map<String, Value> {
        match result {
            Err(RestError::Invalid(errors)) => errors,
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    fn todo() -> Model {
        Model::builder("Todo")
            .field("id", Field::integer().readonly())
            .field("task", Field::string().required())
            .field("done", Field::boolean())
            .build()
    }

    #[test]
    fn test_schema() {
        assert_eq!(
            todo().schema(),
            json!({
                "required": ["task"],
                "properties": {
                    "id": {"type": "integer", "readOnly": true},
                    "task": {"type": "string"},
                    "done": {"type": "boolean"}
                },
                "type": "object"
            })
        );
    }

    #[test]
    fn test_strict_and_mask_schema() {
        let model = Model::builder("Tag").field("name", Field::string()).strict().mask("{name}").build();
        let schema = model.schema();
        assert_eq!(schema["additionalProperties"], json!(false));
        assert_eq!(schema["x-mask"], json!("{name}"));
        assert!(schema.get("required").is_none());
    }

    #[test]
    fn test_inherit() {
        let parent = todo();
        let child = Model::inherit("DatedTodo", &parent).field("due", Field::date()).build();
        assert_eq!(
            child.schema(),
            json!({"allOf": [
                {"$ref": "#/definitions/Todo"},
                {"properties": {"due": {"type": "string", "format": "date"}}, "type": "object"}
            ]})
        );
        assert_eq!(child.fields().keys().copied().collect::<Vec<_>>(), vec!["id", "task", "done", "due"]);
        assert_eq!(child.dependencies().iter().map(Model::name).collect::<Vec<_>>(), vec!["DatedTodo", "Todo"]);
    }

    #[test]
    fn test_dependencies_follow_nested_fields_once() {
        let owner = Model::builder("Owner").field("name", Field::string()).build();
        let todo = Model::builder("Todo")
            .field("owner", Field::nested(&owner))
            .field("watchers", Field::list(Field::nested(&owner)))
            .build();
        assert_eq!(todo.dependencies().iter().map(Model::name).collect::<Vec<_>>(), vec!["Todo", "Owner"]);
    }

    #[test]
    fn test_validate() {
        let model = todo();
        assert!(model.validate(&json!({"task": "write docs"}), false).is_ok());

        let errors = invalid(model.validate(&json!({"done": "yes"}), false));
        assert!(errors.contains_key("task"));
        assert!(errors.contains_key("done"));
    }

    #[test]
    fn test_validate_nested_paths() {
        let owner = Model::builder("Owner").field("name", Field::string().required()).build();
        let todo = Model::builder("Todo").field("owner", Field::nested(&owner)).build();

        let errors = invalid(todo.validate(&json!({"owner": {}}), false));
        assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["owner.name"]);
    }

    #[test]
    fn test_validate_formats_on_demand() {
        let model = Model::builder("Event").field("at", Field::datetime()).build();
        let data = json!({"at": "not a date"});
        assert!(model.validate(&data, false).is_ok());
        assert!(invalid(model.validate(&data, true)).contains_key("at"));
    }

    #[test]
    fn test_uncompilable_schema_rejects_every_payload() {
        let model = Model::builder("Todo").field("task", Field::string().required().pattern("([a-z")).build();

        for _ in 0..2 {
            match model.validate(&json!({}), false) {
                Err(RestError::Specs(message)) => assert!(message.contains("Todo")),
                other => panic!("expected a schema error, got {other:?}"),
            }
        }
        assert!(matches!(model.validate(&json!({"task": "abc"}), true), Err(RestError::Specs(_))));
    }
}
