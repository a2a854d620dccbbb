//! Partial responses through field masks such as `{name,owner{email},*}`.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

static LEXER: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\{|\}|,|[\w:\-\*]+").ok());

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MaskError {
    #[error("Mask parse error: {0}")]
    Parse(String),
    #[error("Mask error: {0}")]
    Inconsistent(String),
}

impl MaskError {
    fn parse(reason: &str) -> Self {
        MaskError::Parse(reason.to_string())
    }
}

/// A parsed mask: selected keys, each optionally restricted by a nested mask.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mask {
    fields: IndexMap<String, Option<Mask>>,
}

impl Mask {
    pub fn parse(mask: &str) -> Result<Mask, MaskError> {
        let mask = mask.split_whitespace().collect::<String>();
        if mask.is_empty() {
            return Ok(Mask::default());
        }

        let mask = match mask.strip_prefix('{') {
            Some(inner) => inner.strip_suffix('}').ok_or_else(|| MaskError::parse("Missing delimiter"))?,
            None => mask.as_str(),
        };

        let Some(lexer) = LEXER.as_ref() else {
            return Err(MaskError::parse("Invalid lexer"));
        };

        let mut current = IndexMap::new();
        let mut stack: Vec<(IndexMap<String, Option<Mask>>, String)> = vec![];
        let mut previous: Option<&str> = None;

        for token in lexer.find_iter(mask).map(|m| m.as_str()) {
            match token {
                "{" => {
                    let key = previous
                        .filter(|key| current.contains_key(*key))
                        .ok_or_else(|| MaskError::parse("Unexpected opening bracket"))?;
                    stack.push((std::mem::take(&mut current), key.to_string()));
                }
                "}" => {
                    let (mut parent, key) = stack.pop().ok_or_else(|| MaskError::parse("Unexpected closing bracket"))?;
                    parent.insert(key, Some(Mask { fields: std::mem::take(&mut current) }));
                    current = parent;
                }
                "," => {
                    if matches!(previous, None | Some("," | "{")) {
                        return Err(MaskError::parse("Unexpected comma"));
                    }
                }
                name => {
                    current.insert(name.to_string(), None);
                }
            }
            previous = Some(token);
        }

        if !stack.is_empty() {
            return Err(MaskError::parse("Missing closing bracket"));
        }
        Ok(Mask { fields: current })
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether `*` keeps the keys not listed explicitly.
    pub fn has_wildcard(&self) -> bool {
        self.fields.contains_key("*")
    }

    /// Listed keys with their nested masks, in mask order; `*` excluded.
    pub fn entries(&self) -> impl Iterator<Item = (&str, Option<&Mask>)> {
        self.fields.iter().filter(|(key, _)| key.as_str() != "*").map(|(key, nested)| (key.as_str(), nested.as_ref()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Filters raw data; with `skip` absent keys are left out instead of set to `null`.
    pub fn apply(&self, data: &Value, skip: bool) -> Result<Value, MaskError> {
        match data {
            Value::Array(items) => items.iter().map(|item| self.apply(item, skip)).collect::<Result<Vec<_>, _>>().map(Value::Array),
            Value::Object(object) => {
                let mut out = Map::new();
                for (key, nested) in self.entries() {
                    let value = object.get(key);
                    if skip && value.is_none_or(Value::is_null) {
                        continue;
                    }
                    let value = match (nested, value) {
                        (Some(mask), Some(value)) if !value.is_null() => mask.apply(value, skip)?,
                        (_, value) => value.cloned().unwrap_or(Value::Null),
                    };
                    out.insert(key.to_string(), value);
                }
                if self.has_wildcard() {
                    for (key, value) in object {
                        if !out.contains_key(key) {
                            out.insert(key.clone(), value.clone());
                        }
                    }
                }
                Ok(Value::Object(out))
            }
            _ => Err(MaskError::Inconsistent("Mask is inconsistent with data".to_string())),
        }
    }
}
