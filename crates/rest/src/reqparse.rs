//! Declarative request argument parsing.
//!
//! A [`RequestParser`] reads each declared [`Argument`] from one or more request locations,
//! converts it and collects the results into [`ParsedArgs`]. Attached to a resource method
//! through `Doc::expect_parser`, the parser runs before the handler, which reads the result
//! with the [`Args`] extractor.
//!
//! ```
//! use micro_rest::reqparse::{ArgKind, Argument, Location, RequestParser};
//!
//! let parser = RequestParser::new()
//!     .argument(Argument::new("rate").kind(ArgKind::Integer).required().help("Rate cannot be converted"))
//!     .argument(Argument::new("name").location(Location::Args));
//! # let _ = parser;
//! ```

use crate::RequestContext;
use crate::body::OptionReqBody;
use crate::error::{BoxError, HttpError, RestError};
use crate::extract::{FromRequest, parse_payload};
use async_trait::async_trait;
use http::HeaderMap;
use http::header::{CONTENT_TYPE, COOKIE};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// The JSON body.
    Json,
    /// The urlencoded post body.
    Form,
    /// The query string.
    Args,
    /// The post body or the query string.
    Values,
    Headers,
    Cookies,
}

impl Location {
    fn friendly_name(self) -> &'static str {
        match self {
            Location::Json => "the JSON body",
            Location::Form => "the post body",
            Location::Args => "the query string",
            Location::Values => "the post body or the query string",
            Location::Headers => "the HTTP headers",
            Location::Cookies => "the request's cookies",
        }
    }

    fn swagger_name(self) -> &'static str {
        match self {
            Location::Json => "body",
            Location::Form => "formData",
            Location::Headers => "header",
            Location::Args | Location::Values | Location::Cookies => "query",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    String,
    Integer,
    Float,
    Boolean,
    /// Any JSON value, unconverted.
    Raw,
}

impl ArgKind {
    fn swagger_type(self) -> &'static str {
        match self {
            ArgKind::String => "string",
            ArgKind::Integer => "integer",
            ArgKind::Float => "number",
            ArgKind::Boolean => "boolean",
            ArgKind::Raw => "object",
        }
    }

    fn convert(self, value: &Value) -> Result<Value, String> {
        match (self, value) {
            (ArgKind::Raw, value) => Ok(value.clone()),
            (ArgKind::String, Value::String(s)) => Ok(Value::String(s.clone())),
            (ArgKind::String, other) => Ok(Value::String(other.to_string())),
            (ArgKind::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(Value::Number(n.clone())),
            (ArgKind::Integer, Value::String(s)) => {
                s.trim().parse::<i64>().map(Value::from).map_err(|_parse_error| format!("Invalid integer value: '{s}'"))
            }
            (ArgKind::Float, Value::Number(n)) => n.as_f64().map(Value::from).ok_or_else(|| format!("Invalid number value: {n}")),
            (ArgKind::Float, Value::String(s)) => {
                s.trim().parse::<f64>().map(Value::from).map_err(|_parse_error| format!("Invalid number value: '{s}'"))
            }
            (ArgKind::Boolean, Value::Bool(b)) => Ok(Value::Bool(*b)),
            (ArgKind::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "on" | "yes" => Ok(Value::Bool(true)),
                "false" | "0" | "off" | "no" => Ok(Value::Bool(false)),
                _ => Err(format!("Invalid literal for boolean(): {s}")),
            },
            (kind, other) => Err(format!("Invalid {} value: {other}", kind.swagger_type())),
        }
    }
}

/// One declared request argument.
#[derive(Debug, Clone)]
pub struct Argument {
    name: String,
    dest: Option<String>,
    kind: ArgKind,
    locations: Vec<Location>,
    required: bool,
    default: Option<Value>,
    choices: Option<Vec<Value>>,
    append: bool,
    help: Option<String>,
    case_sensitive: bool,
    trim: bool,
    nullable: bool,
    ignore: bool,
    store_missing: bool,
}

impl Argument {
    /// A string argument read from the JSON body or the query string and post body.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dest: None,
            kind: ArgKind::String,
            locations: vec![Location::Json, Location::Values],
            required: false,
            default: None,
            choices: None,
            append: false,
            help: None,
            case_sensitive: true,
            trim: false,
            nullable: true,
            ignore: false,
            store_missing: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(mut self, kind: ArgKind) -> Self {
        self.kind = kind;
        self
    }

    /// Reads the argument from `location` only.
    #[must_use]
    pub fn location(mut self, location: Location) -> Self {
        self.locations = vec![location];
        self
    }

    #[must_use]
    pub fn locations(mut self, locations: impl IntoIterator<Item = Location>) -> Self {
        self.locations = locations.into_iter().collect();
        self
    }

    /// Stores the result under another name.
    #[must_use]
    pub fn dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    #[must_use]
    pub fn choices<V: Into<Value>>(mut self, choices: impl IntoIterator<Item = V>) -> Self {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    /// Collects every occurrence into a list.
    #[must_use]
    pub fn append(mut self) -> Self {
        self.append = true;
        self
    }

    /// Prefixed to every error message of this argument.
    #[must_use]
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    #[must_use]
    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self
    }

    #[must_use]
    pub fn trim(mut self) -> Self {
        self.trim = true;
        self
    }

    /// Rejects explicit `null` values.
    #[must_use]
    pub fn not_nullable(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Skips values that fail conversion instead of rejecting the request.
    #[must_use]
    pub fn ignore_errors(mut self) -> Self {
        self.ignore = true;
        self
    }

    /// Leaves the argument out of the result when the request does not carry it.
    #[must_use]
    pub fn skip_missing(mut self) -> Self {
        self.store_missing = false;
        self
    }

    fn dest_name(&self) -> &str {
        self.dest.as_deref().unwrap_or(&self.name)
    }

    fn error(&self, reason: &str) -> String {
        match &self.help {
            Some(help) => format!("{help} {reason}"),
            None => reason.to_string(),
        }
    }

    /// Parses this argument; `Ok(None)` when absent and not stored.
    fn parse(&self, sources: &Sources) -> Result<Option<Value>, String> {
        let mut results = vec![];

        for location in &self.locations {
            for raw in sources.values(*location, &self.name) {
                let mut value = raw;
                if let Value::String(s) = &mut value {
                    if self.trim {
                        *s = s.trim().to_string();
                    }
                    if !self.case_sensitive {
                        *s = s.to_lowercase();
                    }
                }

                let converted = if value.is_null() {
                    if self.nullable { Ok(Value::Null) } else { Err("Must not be null!".to_string()) }
                } else {
                    self.kind.convert(&value)
                };
                let value = match converted {
                    Ok(value) => value,
                    Err(_) if self.ignore => continue,
                    Err(reason) => return Err(self.error(&reason)),
                };

                if let Some(choices) = &self.choices {
                    if !self.is_choice(choices, &value) {
                        let shown = value.as_str().map_or_else(|| value.to_string(), str::to_string);
                        return Err(self.error(&format!("The value '{shown}' is not a valid choice for '{}'.", self.name)));
                    }
                }
                results.push(value);
            }
        }

        if results.is_empty() {
            if self.required {
                let location = self.locations.iter().map(|l| l.friendly_name()).collect::<Vec<_>>().join(" or ");
                return Err(self.error(&format!("Missing required parameter in {location}")));
            }
            return Ok(self.store_missing.then(|| self.default.clone().unwrap_or(Value::Null)));
        }

        if self.append {
            return Ok(Some(Value::Array(results)));
        }
        Ok(results.into_iter().next())
    }

    fn is_choice(&self, choices: &[Value], value: &Value) -> bool {
        choices.iter().any(|choice| match (choice, value) {
            (Value::String(c), Value::String(v)) if !self.case_sensitive => c.to_lowercase() == *v,
            (choice, value) => choice == value,
        })
    }

    /// The swagger parameter documenting this argument; cookies are not documented.
    fn swagger_param(&self) -> Option<Value> {
        let location = match self.locations.as_slice() {
            [Location::Cookies] => return None,
            [single] => single.swagger_name(),
            _ => "query",
        };

        let mut param = Map::new();
        param.insert("name".into(), json!(self.name));
        param.insert("in".into(), json!(location));
        if self.append {
            param.insert("type".into(), json!("array"));
            param.insert("items".into(), json!({"type": self.kind.swagger_type()}));
            param.insert("collectionFormat".into(), json!("multi"));
        } else {
            param.insert("type".into(), json!(self.kind.swagger_type()));
        }
        if let Some(help) = &self.help {
            param.insert("description".into(), json!(help));
        }
        if self.required {
            param.insert("required".into(), json!(true));
        }
        if let Some(default) = &self.default {
            param.insert("default".into(), default.clone());
        }
        if let Some(choices) = &self.choices {
            param.insert("enum".into(), json!(choices));
        }
        Some(Value::Object(param))
    }
}

/// An ordered set of arguments parsed together.
#[derive(Debug, Clone, Default)]
pub struct RequestParser {
    args: Vec<Argument>,
    bundle_errors: bool,
    strict: bool,
}

impl RequestParser {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn argument(mut self, argument: Argument) -> Self {
        self.args.push(argument);
        self
    }

    /// Reports every failing argument at once instead of the first one.
    #[must_use]
    pub fn bundle_errors(mut self) -> Self {
        self.bundle_errors = true;
        self
    }

    /// Rejects body and query keys no argument declares.
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Replaces the argument with the same name, keeping its position.
    #[must_use]
    pub fn replace_argument(mut self, argument: Argument) -> Self {
        match self.args.iter_mut().find(|existing| existing.name == argument.name) {
            Some(existing) => *existing = argument,
            None => self.args.push(argument),
        }
        self
    }

    #[must_use]
    pub fn remove_argument(mut self, name: &str) -> Self {
        self.args.retain(|argument| argument.name != name);
        self
    }

    pub fn args(&self) -> &[Argument] {
        &self.args
    }

    /// Reads the request and parses every argument.
    pub async fn parse_request(&self, req: &RequestContext<'_, '_>, body: &OptionReqBody) -> Result<ParsedArgs, BoxError> {
        let sources = Sources::read(req, body, self.needs_body()).await?;
        Ok(self.parse(&sources)?)
    }

    fn needs_body(&self) -> bool {
        self.strict
            || self
                .args
                .iter()
                .flat_map(|argument| &argument.locations)
                .any(|location| matches!(location, Location::Json | Location::Form | Location::Values))
    }

    fn parse(&self, sources: &Sources) -> Result<ParsedArgs, HttpError> {
        let mut parsed = Map::new();
        let mut errors = Map::new();

        for argument in &self.args {
            match argument.parse(sources) {
                Ok(Some(value)) => {
                    parsed.insert(argument.dest_name().to_string(), value);
                }
                Ok(None) => {}
                Err(message) => {
                    errors.insert(argument.name.clone(), Value::String(message));
                    if !self.bundle_errors {
                        break;
                    }
                }
            }
        }

        if !errors.is_empty() {
            return Err(HttpError::validation(errors));
        }

        if self.strict {
            let unknown = sources.keys().into_iter().filter(|key| !self.args.iter().any(|a| a.name == *key)).collect::<Vec<_>>();
            if !unknown.is_empty() {
                return Err(HttpError::bad_request(format!("Unknown arguments: {}", unknown.join(", "))));
            }
        }

        Ok(ParsedArgs(parsed))
    }

    /// Swagger parameters; body arguments are merged into one `payload` parameter.
    pub fn swagger_params(&self) -> Result<Vec<Value>, RestError> {
        let mut params = vec![];
        let mut properties = Map::new();
        let mut required = vec![];

        for param in self.args.iter().filter_map(Argument::swagger_param) {
            if param["in"] == "body" {
                let name = param["name"].as_str().unwrap_or_default().to_string();
                if param.get("required").is_some() {
                    required.push(name.clone());
                }
                let mut schema = param.as_object().cloned().unwrap_or_default();
                for key in ["name", "in", "required", "collectionFormat"] {
                    schema.remove(key);
                }
                properties.insert(name, Value::Object(schema));
            } else {
                params.push(param);
            }
        }

        if !properties.is_empty() {
            if params.iter().any(|param| param["in"] == "formData") {
                return Err(RestError::Specs("Can't use formData and body at the same time".to_string()));
            }
            let mut schema = json!({"type": "object", "properties": properties});
            if !required.is_empty() {
                schema["required"] = json!(required);
            }
            params.push(json!({"name": "payload", "in": "body", "required": true, "schema": schema}));
        }
        Ok(params)
    }
}

/// The outcome of a [`RequestParser`], keyed by destination name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedArgs(Map<String, Value>);

impl ParsedArgs {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// Deserializes the arguments into a typed struct.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.0.clone()))
    }
}

impl From<Map<String, Value>> for ParsedArgs {
    fn from(args: Map<String, Value>) -> Self {
        ParsedArgs(args)
    }
}

/// Extracts the arguments parsed for the current operation.
#[derive(Debug, Clone)]
pub struct Args(pub ParsedArgs);

#[async_trait]
impl FromRequest for Args {
    async fn from_request<'server, 'req>(
        req: &RequestContext<'server, 'req>,
        _body: OptionReqBody,
    ) -> Result<Self, BoxError> {
        req.extension::<ParsedArgs>()
            .cloned()
            .map(Args)
            .ok_or_else(|| HttpError::internal().with_message("No request parser ran for this operation").into())
    }
}

/// Everything a parser can read, gathered once per request.
#[derive(Debug, Default)]
struct Sources {
    json: Option<Map<String, Value>>,
    form: Vec<(String, String)>,
    args: Vec<(String, String)>,
    headers: HeaderMap,
    cookies: Vec<(String, String)>,
}

impl Sources {
    async fn read(req: &RequestContext<'_, '_>, body: &OptionReqBody, with_body: bool) -> Result<Self, BoxError> {
        let headers = req.headers().clone();
        let args: Vec<(String, String)> = serde_urlencoded::from_str(req.uri().query().unwrap_or(""))
            .map_err(|e| HttpError::bad_request(format!("Failed to decode query string: {e}")))?;

        let cookies = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let mut sources = Sources { args, headers, cookies, ..Sources::default() };
        if !with_body {
            return Ok(sources);
        }

        let content_type = sources.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or("").to_string();
        let bytes = body.bytes().await?;
        if content_type.starts_with("application/x-www-form-urlencoded") {
            sources.form = serde_urlencoded::from_bytes(&bytes)
                .map_err(|e| HttpError::bad_request(format!("Failed to decode form body: {e}")))?;
        } else if let Value::Object(map) = parse_payload(&bytes)? {
            sources.json = Some(map);
        }
        Ok(sources)
    }

    fn values(&self, location: Location, name: &str) -> Vec<Value> {
        let pairs = |pairs: &[(String, String)]| {
            pairs.iter().filter(|(key, _)| key == name).map(|(_, value)| Value::String(value.clone())).collect::<Vec<_>>()
        };
        match location {
            Location::Json => match self.json.as_ref().and_then(|json| json.get(name)) {
                Some(Value::Array(items)) => items.clone(),
                Some(value) => vec![value.clone()],
                None => vec![],
            },
            Location::Form => pairs(&self.form),
            Location::Args => pairs(&self.args),
            Location::Values => {
                let mut values = pairs(&self.args);
                values.extend(pairs(&self.form));
                values
            }
            Location::Headers => self
                .headers
                .get_all(name)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .map(|value| Value::String(value.to_string()))
                .collect(),
            Location::Cookies => pairs(&self.cookies),
        }
    }

    /// Keys of the JSON body, query string and post body.
    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = vec![];
        let json_keys = self.json.iter().flat_map(|json| json.keys().cloned());
        let pair_keys = self.args.iter().chain(&self.form).map(|(key, _)| key.clone());
        for key in json_keys.chain(pair_keys) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn query(pairs: &[(&str, &str)]) -> Sources {
        Sources {
            args: pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect(),
            ..Sources::default()
        }
    }

    fn errors(error: HttpError) -> Value {
        error.data().unwrap()["errors"].clone()
    }

    #[test]
    fn test_converts_and_defaults() {
        let parser = RequestParser::new()
            .argument(Argument::new("rate").kind(ArgKind::Integer))
            .argument(Argument::new("active").kind(ArgKind::Boolean).location(Location::Args))
            .argument(Argument::new("page").kind(ArgKind::Integer).default(1))
            .argument(Argument::new("name").dest("who"));

        let parsed = parser.parse(&query(&[("rate", "5"), ("active", "on"), ("name", "ann")])).unwrap();
        assert_eq!(parsed.get("rate"), Some(&json!(5)));
        assert_eq!(parsed.get("active"), Some(&json!(true)));
        assert_eq!(parsed.get("page"), Some(&json!(1)));
        assert_eq!(parsed.get("who"), Some(&json!("ann")));
    }

    #[test]
    fn test_missing_required_uses_friendly_location_and_help() {
        let parser = RequestParser::new().argument(Argument::new("foo").required().location(Location::Form).help("Foo is needed."));
        let error = parser.parse(&Sources::default()).unwrap_err();
        assert_eq!(error.status(), http::StatusCode::BAD_REQUEST);
        assert_eq!(errors(error), json!({"foo": "Foo is needed. Missing required parameter in the post body"}));

        let parser = RequestParser::new().argument(Argument::new("foo").required());
        assert_eq!(
            errors(parser.parse(&Sources::default()).unwrap_err()),
            json!({"foo": "Missing required parameter in the JSON body or the post body or the query string"})
        );
    }

    #[test]
    fn test_bundle_errors() {
        let args = || {
            RequestParser::new()
                .argument(Argument::new("a").required())
                .argument(Argument::new("b").kind(ArgKind::Integer))
        };
        let sources = query(&[("b", "x")]);
        assert_eq!(errors(args().parse(&sources).unwrap_err()).as_object().unwrap().len(), 1);
        assert_eq!(errors(args().bundle_errors().parse(&sources).unwrap_err()).as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_choices_append_and_case() {
        let parser = RequestParser::new()
            .argument(Argument::new("color").choices(["red", "blue"]).case_insensitive().trim())
            .argument(Argument::new("tag").append());

        let parsed = parser.parse(&query(&[("color", " RED "), ("tag", "a"), ("tag", "b")])).unwrap();
        assert_eq!(parsed.get("color"), Some(&json!("red")));
        assert_eq!(parsed.get("tag"), Some(&json!(["a", "b"])));

        let error = parser.parse(&query(&[("color", "green")])).unwrap_err();
        assert_eq!(errors(error)["color"], "The value 'green' is not a valid choice for 'color'.");
    }

    #[test]
    fn test_json_headers_and_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Token", HeaderValue::from_static("abc"));
        let sources = Sources {
            json: json!({"task": "write", "ids": [1, 2]}).as_object().cloned(),
            headers,
            cookies: vec![("session".into(), "s1".into())],
            ..Sources::default()
        };
        let parser = RequestParser::new()
            .argument(Argument::new("task").location(Location::Json))
            .argument(Argument::new("ids").kind(ArgKind::Integer).location(Location::Json).append())
            .argument(Argument::new("X-Token").location(Location::Headers).dest("token"))
            .argument(Argument::new("session").location(Location::Cookies))
            .argument(Argument::new("absent").skip_missing());

        let parsed = parser.parse(&sources).unwrap();
        assert_eq!(
            Value::Object(parsed.into_inner()),
            json!({"task": "write", "ids": [1, 2], "token": "abc", "session": "s1"})
        );
    }

    #[test]
    fn test_strict_rejects_unknown() {
        let parser = RequestParser::new().argument(Argument::new("a")).strict();
        let error = parser.parse(&query(&[("a", "1"), ("b", "2")])).unwrap_err();
        assert_eq!(error.reason(), "Unknown arguments: b");
    }

    #[test]
    fn test_not_nullable() {
        let parser = RequestParser::new().argument(Argument::new("a").location(Location::Json).not_nullable());
        let sources = Sources { json: json!({"a": null}).as_object().cloned(), ..Sources::default() };
        assert_eq!(errors(parser.parse(&sources).unwrap_err())["a"], "Must not be null!");
    }

    #[test]
    fn test_swagger_params() {
        let parser = RequestParser::new()
            .argument(Argument::new("page").kind(ArgKind::Integer).location(Location::Args).default(1))
            .argument(Argument::new("task").location(Location::Json).required().help("The task"))
            .argument(Argument::new("session").location(Location::Cookies));

        assert_eq!(
            parser.swagger_params().unwrap(),
            vec![
                json!({"name": "page", "in": "query", "type": "integer", "default": 1}),
                json!({"name": "payload", "in": "body", "required": true, "schema": {
                    "type": "object",
                    "properties": {"task": {"type": "string", "description": "The task"}},
                    "required": ["task"]
                }}),
            ]
        );

        let mixed = RequestParser::new()
            .argument(Argument::new("a").location(Location::Json))
            .argument(Argument::new("b").location(Location::Form));
        assert!(matches!(mixed.swagger_params(), Err(RestError::Specs(_))));
    }
}
