use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static FIRST_CAP_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(.)([A-Z][a-z]+)").ok());
static ALL_CAP_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").ok());
static RULE_PARAM_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"<(?:(?P<converter>[a-zA-Z_][a-zA-Z0-9_]*)(?:\([^)]*\))?:)?(?P<name>[a-zA-Z_][a-zA-Z0-9_]*)>").ok());

const MERGE_MAX_DEPTH: usize = 10;

/// `TodoList` -> `todo_list`, `HTTPResponse` -> `http_response`.
pub fn camel_to_dash(value: &str) -> String {
    let (Some(first), Some(all)) = (FIRST_CAP_RE.as_ref(), ALL_CAP_RE.as_ref()) else {
        return value.to_lowercase();
    };
    let partial = first.replace_all(value, "${1}_${2}");
    all.replace_all(&partial, "${1}_${2}").to_lowercase()
}

/// Default operation id, e.g. `get_todo_list`.
pub fn default_id(resource: &str, method: &str) -> String {
    format!("{}_{}", method.to_lowercase(), camel_to_dash(resource))
}

/// Recursively merges `second` into `first`; values of `second` win.
pub fn merge(first: &Value, second: &Value) -> Value {
    merge_bounded(first, second, 0)
}

fn merge_bounded(first: &Value, second: &Value, depth: usize) -> Value {
    match (first, second) {
        (Value::Object(a), Value::Object(b)) if depth < MERGE_MAX_DEPTH => {
            let mut merged = a.clone();
            for (key, value) in b {
                let value = match a.get(key) {
                    Some(existing) => merge_bounded(existing, value, depth + 1),
                    None => value.clone(),
                };
                merged.insert(key.clone(), value);
            }
            Value::Object(merged)
        }
        (_, second) => second.clone(),
    }
}

/// Drops the `null` entries of an object, keeping order.
pub fn not_none(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter().filter(|(_, value)| !value.is_null()).collect()
}

/// Converts `/todos/<int:todo_id>` into the router syntax `/todos/{todo_id}`.
pub fn to_router_path(rule: &str) -> String {
    match RULE_PARAM_RE.as_ref() {
        Some(re) => re.replace_all(rule, "{$name}").into_owned(),
        None => rule.to_string(),
    }
}

/// The parameters of a rule with their converter, `string` when none is given.
pub fn rule_params(rule: &str) -> Vec<(String, String)> {
    let Some(re) = RULE_PARAM_RE.as_ref() else {
        return vec![];
    };
    re.captures_iter(rule)
        .filter_map(|captures| {
            let name = captures.name("name")?.as_str().to_string();
            let converter = captures.name("converter").map_or("string", |c| c.as_str()).to_string();
            Some((name, converter))
        })
        .collect()
}

/// Builds a concrete path from a rule, or `None` when a parameter has no value.
pub(crate) fn fill_rule_params<'a>(rule: &str, value_of: impl Fn(&str) -> Option<&'a str>) -> Option<String> {
    let Some(re) = RULE_PARAM_RE.as_ref() else {
        return Some(rule.to_string());
    };
    let mut path = String::with_capacity(rule.len());
    let mut last = 0;
    for captures in re.captures_iter(rule) {
        let (whole, name) = (captures.get(0)?, captures.name("name")?);
        path.push_str(&rule[last..whole.start()]);
        path.push_str(value_of(name.as_str())?);
        last = whole.end();
    }
    path.push_str(&rule[last..]);
    Some(path)
}

/// Strips the parameters of a rule, `/todos/<todo_id>` -> `/todos/`.
pub(crate) fn strip_rule_params(rule: &str) -> String {
    match RULE_PARAM_RE.as_ref() {
        Some(re) => re.replace_all(rule, "").into_owned(),
        None => rule.to_string(),
    }
}
