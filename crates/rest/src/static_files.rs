//! Serving the swagger UI assets from a local directory.

use crate::RequestContext;
use crate::body::{OptionReqBody, ResponseBody};
use crate::error::{BoxError, HttpError};
use crate::handler::RequestHandler;
use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response};
use mime::Mime;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::warn;

/// Serves the files under a directory; the file comes from the `path` route parameter.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    base_dir: PathBuf,
}

impl StaticFiles {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    /// Maps a url path below the base directory; anything leaving it is refused.
    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let mut path = self.base_dir.clone();
        for component in Path::new(url_path.trim_start_matches('/')).components() {
            match component {
                Component::Normal(segment) => path.push(segment),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(path)
    }

    fn content_type(path: &Path) -> Mime {
        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or_default().to_lowercase();
        match extension.as_str() {
            "html" => mime::TEXT_HTML_UTF_8,
            "css" => mime::TEXT_CSS_UTF_8,
            "js" => mime::APPLICATION_JAVASCRIPT_UTF_8,
            "json" | "map" => mime::APPLICATION_JSON,
            "png" => mime::IMAGE_PNG,
            "svg" => mime::IMAGE_SVG,
            "txt" => mime::TEXT_PLAIN_UTF_8,
            _ => mime::APPLICATION_OCTET_STREAM,
        }
    }

    /// Reads a file and its content type.
    pub async fn load(&self, url_path: &str) -> io::Result<(Vec<u8>, Mime)> {
        let path = self.map_path(url_path).ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "invalid path"))?;
        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "not a file"));
        }
        let bytes = tokio::fs::read(&path).await?;
        Ok((bytes, Self::content_type(&path)))
    }
}

#[async_trait]
impl RequestHandler for StaticFiles {
    async fn invoke<'server, 'req>(
        &self,
        req: RequestContext<'server, 'req>,
        _req_body: OptionReqBody,
    ) -> Result<Response<ResponseBody>, BoxError> {
        let file = req.path_params().get("path").unwrap_or_default();
        match self.load(file).await {
            Ok((bytes, content_type)) => {
                let mut response = Response::new(ResponseBody::from(bytes));
                if let Ok(value) = HeaderValue::from_str(content_type.as_ref()) {
                    response.headers_mut().insert(CONTENT_TYPE, value);
                }
                Ok(response)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(HttpError::not_found(req.uri().path()).into()),
            Err(e) => {
                warn!(cause = %e, file, "unable to read static file");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_path_prevents_traversal() {
        let files = StaticFiles::new("swaggerui");
        assert!(files.map_path("../Cargo.toml").is_none());
        assert!(files.map_path("css/../../Cargo.toml").is_none());
        assert_eq!(files.map_path("./swagger-ui.css"), Some(PathBuf::from("swaggerui/swagger-ui.css")));
    }

    #[test]
    fn test_content_type() {
        assert_eq!(StaticFiles::content_type(Path::new("swagger-ui.css")), mime::TEXT_CSS_UTF_8);
        assert_eq!(StaticFiles::content_type(Path::new("swagger-ui-bundle.JS")), mime::APPLICATION_JAVASCRIPT_UTF_8);
        assert_eq!(StaticFiles::content_type(Path::new("favicon-32x32.png")), mime::IMAGE_PNG);
        assert_eq!(StaticFiles::content_type(Path::new("LICENSE")), mime::APPLICATION_OCTET_STREAM);
    }

    #[tokio::test]
    async fn test_load() {
        let files = StaticFiles::new(env!("CARGO_MANIFEST_DIR"));
        let (bytes, content_type) = files.load("templates/swagger-ui.html").await.unwrap();
        assert_eq!(content_type, mime::TEXT_HTML_UTF_8);
        assert!(String::from_utf8(bytes).unwrap().contains("SwaggerUIBundle"));

        let missing = files.load("templates/missing.css").await.unwrap_err();
        assert_eq!(missing.kind(), io::ErrorKind::NotFound);
    }
}
