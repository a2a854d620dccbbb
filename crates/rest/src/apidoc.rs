//! The Swagger UI page documenting an API.

use crate::api::ApiState;
use crate::body::ResponseBody;
use crate::error::BoxError;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response, StatusCode};
use minijinja::Environment;
use serde::Serialize;

// No extension: urls are written as is, the title is escaped explicitly.
const TEMPLATE_NAME: &str = "swagger-ui";
const TEMPLATE: &str = include_str!("../templates/swagger-ui.html");

/// Where the UI assets come from when the API does not serve them itself.
pub const SWAGGER_UI_CDN: &str = "https://cdn.jsdelivr.net/npm/swagger-ui-dist@5";

/// Url prefix of the assets served from a local swagger UI directory.
pub const SWAGGER_UI_STATIC: &str = "/swaggerui";

#[derive(Debug, Serialize)]
struct DocPage<'a> {
    title: &'a str,
    specs_url: String,
    additional_css: Option<&'a str>,
    assets: &'a str,
    validator_url: Option<&'a str>,
    doc_expansion: &'a str,
    display_operation_id: bool,
    display_request_duration: bool,
}

fn render_page(page: &DocPage<'_>) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template(TEMPLATE_NAME, TEMPLATE)?;
    env.get_template(TEMPLATE_NAME)?.render(page)
}

/// Renders the documentation page of a mounted API.
pub(crate) fn render(api: &ApiState) -> Result<Response<ResponseBody>, BoxError> {
    let config = api.config();
    let page = DocPage {
        title: &api.info.title,
        specs_url: api.specs_url(),
        additional_css: api.additional_css.as_deref(),
        assets: if api.serve_static { SWAGGER_UI_STATIC } else { SWAGGER_UI_CDN },
        validator_url: config.swagger_validator_url.as_deref(),
        doc_expansion: config.swagger_ui_doc_expansion.as_str(),
        display_operation_id: config.swagger_ui_operation_id,
        display_request_duration: config.swagger_ui_request_duration,
    };

    let html = render_page(&page)?;
    let mut response = Response::new(ResponseBody::from(html));
    *response.status_mut() = StatusCode::OK;
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> DocPage<'static> {
        DocPage {
            title: "Todo <API>",
            specs_url: "/api/swagger.json".to_string(),
            additional_css: None,
            assets: SWAGGER_UI_CDN,
            validator_url: None,
            doc_expansion: "none",
            display_operation_id: false,
            display_request_duration: true,
        }
    }

    #[test]
    fn test_render_page() {
        let html = render_page(&page()).unwrap();
        assert!(html.contains("<title>Todo &lt;API&gt;</title>"));
        assert!(html.contains(r#"url: "/api/swagger.json","#));
        assert!(html.contains(r#"docExpansion: "none","#));
        assert!(html.contains("displayOperationId: false,"));
        assert!(html.contains("displayRequestDuration: true,"));
        assert!(html.contains(&format!("{SWAGGER_UI_CDN}/swagger-ui-bundle.js")));
        assert!(!html.contains("validatorUrl"));
        assert!(!html.contains("stylesheet\" type=\"text/css\" href=\"/custom.css"));
    }

    #[test]
    fn test_render_page_options() {
        let page = DocPage {
            additional_css: Some("/custom.css"),
            validator_url: Some("https://validator.swagger.io/validator"),
            assets: SWAGGER_UI_STATIC,
            ..page()
        };
        let html = render_page(&page).unwrap();
        assert!(html.contains(r#"validatorUrl: "https://validator.swagger.io/validator" || null,"#));
        assert!(html.contains(r#"href="/custom.css""#));
        assert!(html.contains("/swaggerui/swagger-ui.css"));
    }
}
