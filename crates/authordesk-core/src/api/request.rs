//! Outgoing request descriptions.
//!
//! Requests are kept as plain data rather than `reqwest::RequestBuilder`s so
//! the pipeline can dispatch the same request a second time after a refresh.

use reqwest::multipart::{Form, Part};
use reqwest::Method;

/// Path of the refresh endpoint; a 401 from it never triggers a refresh.
pub const TOKEN_REFRESH_PATH: &str = "/auth/token-refresh";

/// Path of the login endpoint.
pub const TOKEN_GENERATE_PATH: &str = "/auth/token-generate";

#[derive(Debug, Clone, PartialEq)]
pub enum FormField {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime: Option<String>,
        bytes: Vec<u8>,
    },
}

impl FormField {
    pub fn text(name: &str, value: impl Into<String>) -> Self {
        FormField::Text {
            name: name.to_string(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FormField::Text { name, .. } | FormField::File { name, .. } => name,
        }
    }
}

/// Build a multipart form from field descriptions
pub(crate) fn multipart_form(fields: &[FormField]) -> reqwest::Result<Form> {
    let mut form = Form::new();
    for field in fields {
        form = match field {
            FormField::Text { name, value } => form.text(name.clone(), value.clone()),
            FormField::File {
                name,
                file_name,
                mime,
                bytes,
            } => {
                let mut part = Part::bytes(bytes.clone()).file_name(file_name.clone());
                if let Some(mime) = mime {
                    part = part.mime_str(mime)?;
                }
                form.part(name.clone(), part)
            }
        };
    }
    Ok(form)
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Multipart(Vec<FormField>),
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    retry: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            retry: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn multipart(mut self, fields: Vec<FormField>) -> Self {
        self.body = RequestBody::Multipart(fields);
        self
    }

    /// Whether this request is already a replay after a refresh
    pub fn is_retry(&self) -> bool {
        self.retry
    }

    pub(crate) fn mark_retry(&mut self) {
        self.retry = true;
    }

    pub fn is_refresh_endpoint(&self) -> bool {
        self.path.contains(TOKEN_REFRESH_PATH)
    }

    /// A 401 on this request should be recovered by refreshing the session
    pub fn should_refresh_on(&self, status: reqwest::StatusCode) -> bool {
        status == reqwest::StatusCode::UNAUTHORIZED && !self.retry && !self.is_refresh_endpoint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_builder() {
        let req = ApiRequest::post("/manage/authors/edit")
            .query("id", 7)
            .multipart(vec![FormField::text("name", "Leo")]);

        assert_eq!(req.method, Method::POST);
        assert_eq!(req.query, vec![("id".to_string(), "7".to_string())]);
        assert!(matches!(req.body, RequestBody::Multipart(ref f) if f[0].name() == "name"));
        assert!(!req.is_retry());
    }

    #[test]
    fn test_should_refresh_only_on_first_401() {
        let mut req = ApiRequest::get("/profile");
        assert!(req.should_refresh_on(StatusCode::UNAUTHORIZED));
        assert!(!req.should_refresh_on(StatusCode::FORBIDDEN));
        assert!(!req.should_refresh_on(StatusCode::OK));

        req.mark_retry();
        assert!(!req.should_refresh_on(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_refresh_endpoint_is_exempt() {
        let req = ApiRequest::post(TOKEN_REFRESH_PATH);
        assert!(req.is_refresh_endpoint());
        assert!(!req.should_refresh_on(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_multipart_form_rejects_bad_mime() {
        let fields = vec![FormField::File {
            name: "avatar".to_string(),
            file_name: "a.png".to_string(),
            mime: Some("not a mime".to_string()),
            bytes: vec![1, 2, 3],
        }];
        assert!(multipart_form(&fields).is_err());

        let ok = vec![FormField::File {
            name: "avatar".to_string(),
            file_name: "a.png".to_string(),
            mime: Some("image/png".to_string()),
            bytes: vec![1, 2, 3],
        }];
        assert!(multipart_form(&ok).is_ok());
    }
}
