//! Runtime settings of an [`Api`](crate::Api).
//!
//! Settings are plain data: build them in code with the setters, deserialize them with serde,
//! or read them from the environment with [`ApiConfig::from_env`].

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to parse environment variable '{key}': {details}")]
    ParseError { key: String, details: String },
}

/// How the Swagger UI expands operations when the doc page opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocExpansion {
    #[default]
    None,
    List,
    Full,
}

impl DocExpansion {
    pub fn as_str(self) -> &'static str {
        match self {
            DocExpansion::None => "none",
            DocExpansion::List => "list",
            DocExpansion::Full => "full",
        }
    }
}

impl FromStr for DocExpansion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(DocExpansion::None),
            "list" => Ok(DocExpansion::List),
            "full" => Ok(DocExpansion::Full),
            other => Err(format!("expected none, list or full, got '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Validate payloads against `expect` models unless an operation says otherwise.
    pub validate: bool,
    /// Request header carrying a fields mask.
    pub mask_header: String,
    /// Document the mask header on marshalling operations.
    pub mask_swagger: bool,
    pub json_indent: Option<usize>,
    pub json_sort_keys: bool,
    pub error_include_message: bool,
    pub error_include_code: bool,
    /// Suggest close routes in 404 messages.
    pub error_404_help: bool,
    /// Hand non-HTTP errors to the host error handler untouched.
    pub propagate_exceptions: bool,
    pub swagger_validator_url: Option<String>,
    pub swagger_ui_doc_expansion: DocExpansion,
    pub swagger_ui_operation_id: bool,
    pub swagger_ui_request_duration: bool,
    pub http_basic_auth_realm: String,
    /// Host advertised in the swagger document.
    pub server_name: Option<String>,
    pub debug: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            validate: false,
            mask_header: "X-Fields".to_string(),
            mask_swagger: true,
            json_indent: None,
            json_sort_keys: false,
            error_include_message: true,
            error_include_code: true,
            error_404_help: false,
            propagate_exceptions: false,
            swagger_validator_url: None,
            swagger_ui_doc_expansion: DocExpansion::None,
            swagger_ui_operation_id: false,
            swagger_ui_request_duration: false,
            http_basic_auth_realm: "micro-rest".to_string(),
            server_name: None,
            debug: false,
        }
    }
}

impl ApiConfig {
    /// Reads the settings from environment variables, keeping defaults for unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = ApiConfig::default();
        Ok(Self {
            validate: env_parse("RESTPLUS_VALIDATE", defaults.validate, parse_bool)?,
            mask_header: env_or_default("RESTPLUS_MASK_HEADER", &defaults.mask_header),
            mask_swagger: env_parse("RESTPLUS_MASK_SWAGGER", defaults.mask_swagger, parse_bool)?,
            json_indent: env_optional("RESTPLUS_JSON_INDENT", |v| v.parse::<usize>().map_err(|e| e.to_string()))?,
            json_sort_keys: env_parse("RESTPLUS_JSON_SORT_KEYS", defaults.json_sort_keys, parse_bool)?,
            error_include_message: env_parse("ERROR_INCLUDE_MESSAGE", defaults.error_include_message, parse_bool)?,
            error_include_code: env_parse("ERROR_INCLUDE_CODE", defaults.error_include_code, parse_bool)?,
            error_404_help: env_parse("ERROR_404_HELP", defaults.error_404_help, parse_bool)?,
            propagate_exceptions: env_parse("PROPAGATE_EXCEPTIONS", defaults.propagate_exceptions, parse_bool)?,
            swagger_validator_url: env::var("SWAGGER_VALIDATOR_URL").ok(),
            swagger_ui_doc_expansion: env_parse(
                "SWAGGER_UI_DOC_EXPANSION",
                defaults.swagger_ui_doc_expansion,
                DocExpansion::from_str,
            )?,
            swagger_ui_operation_id: env_parse("SWAGGER_UI_OPERATION_ID", defaults.swagger_ui_operation_id, parse_bool)?,
            swagger_ui_request_duration: env_parse(
                "SWAGGER_UI_REQUEST_DURATION",
                defaults.swagger_ui_request_duration,
                parse_bool,
            )?,
            http_basic_auth_realm: env_or_default("HTTP_BASIC_AUTH_REALM", &defaults.http_basic_auth_realm),
            server_name: env::var("SERVER_NAME").ok(),
            debug: env_parse("DEBUG", defaults.debug, parse_bool)?,
        })
    }

    #[must_use]
    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    #[must_use]
    pub fn mask_header(mut self, header: impl Into<String>) -> Self {
        self.mask_header = header.into();
        self
    }

    #[must_use]
    pub fn mask_swagger(mut self, enabled: bool) -> Self {
        self.mask_swagger = enabled;
        self
    }

    #[must_use]
    pub fn json_indent(mut self, indent: usize) -> Self {
        self.json_indent = Some(indent);
        self
    }

    #[must_use]
    pub fn json_sort_keys(mut self, sort_keys: bool) -> Self {
        self.json_sort_keys = sort_keys;
        self
    }

    #[must_use]
    pub fn error_include_message(mut self, include: bool) -> Self {
        self.error_include_message = include;
        self
    }

    #[must_use]
    pub fn error_include_code(mut self, include: bool) -> Self {
        self.error_include_code = include;
        self
    }

    #[must_use]
    pub fn error_404_help(mut self, enabled: bool) -> Self {
        self.error_404_help = enabled;
        self
    }

    #[must_use]
    pub fn propagate_exceptions(mut self, propagate: bool) -> Self {
        self.propagate_exceptions = propagate;
        self
    }

    #[must_use]
    pub fn swagger_validator_url(mut self, url: impl Into<String>) -> Self {
        self.swagger_validator_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn swagger_ui_doc_expansion(mut self, expansion: DocExpansion) -> Self {
        self.swagger_ui_doc_expansion = expansion;
        self
    }

    #[must_use]
    pub fn swagger_ui_operation_id(mut self, display: bool) -> Self {
        self.swagger_ui_operation_id = display;
        self
    }

    #[must_use]
    pub fn swagger_ui_request_duration(mut self, display: bool) -> Self {
        self.swagger_ui_request_duration = display;
        self
    }

    #[must_use]
    pub fn http_basic_auth_realm(mut self, realm: impl Into<String>) -> Self {
        self.http_basic_auth_realm = realm.into();
        self
    }

    #[must_use]
    pub fn server_name(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = Some(server_name.into());
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// The indent used by the JSON representation.
    pub(crate) fn effective_json_indent(&self) -> Option<usize> {
        self.json_indent.or(if self.debug { Some(4) } else { None })
    }
}

/// Helper to load an environment variable with a default value
pub fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T, F>(key: &str, default: T, parse: F) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Result<T, String>,
{
    Ok(env_optional(key, parse)?.unwrap_or(default))
}

fn env_optional<T, F>(key: &str, parse: F) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Result<T, String>,
{
    match env::var(key) {
        Ok(value) => parse(&value).map(Some).map_err(|details| ConfigError::ParseError { key: key.to_string(), details }),
        Err(_) => Ok(None),
    }
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(format!("expected a boolean, got '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.mask_header, "X-Fields");
        assert!(config.mask_swagger);
        assert!(config.error_include_message);
        assert_eq!(config.swagger_ui_doc_expansion, DocExpansion::None);
        assert_eq!(config.effective_json_indent(), None);
        assert_eq!(config.debug(true).effective_json_indent(), Some(4));
    }

    #[test]
    fn test_from_env_uses_defaults_when_unset() {
        temp_env::with_vars_unset(["RESTPLUS_VALIDATE", "RESTPLUS_MASK_HEADER", "SWAGGER_UI_DOC_EXPANSION"], || {
            let config = ApiConfig::from_env().unwrap();
            assert!(!config.validate);
            assert_eq!(config.mask_header, "X-Fields");
        });
    }

    #[test]
    fn test_from_env_reads_values() {
        temp_env::with_vars(
            [
                ("RESTPLUS_VALIDATE", Some("true")),
                ("RESTPLUS_MASK_HEADER", Some("X-Mask")),
                ("RESTPLUS_JSON_INDENT", Some("2")),
                ("SWAGGER_UI_DOC_EXPANSION", Some("list")),
                ("SWAGGER_VALIDATOR_URL", Some("http://somewhere.com/validator")),
            ],
            || {
                let config = ApiConfig::from_env().unwrap();
                assert!(config.validate);
                assert_eq!(config.mask_header, "X-Mask");
                assert_eq!(config.json_indent, Some(2));
                assert_eq!(config.swagger_ui_doc_expansion, DocExpansion::List);
                assert_eq!(config.swagger_validator_url.as_deref(), Some("http://somewhere.com/validator"));
            },
        );
    }

    #[test]
    fn test_from_env_rejects_bad_values() {
        temp_env::with_var("ERROR_404_HELP", Some("maybe"), || {
            let error = ApiConfig::from_env().unwrap_err();
            assert!(matches!(error, ConfigError::ParseError { ref key, .. } if key == "ERROR_404_HELP"));
        });
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ApiConfig = serde_json::from_str(r#"{"validate": true, "swagger_ui_doc_expansion": "full"}"#).unwrap();
        assert!(config.validate);
        assert_eq!(config.swagger_ui_doc_expansion, DocExpansion::Full);
        assert_eq!(config.mask_header, "X-Fields");
    }
}
