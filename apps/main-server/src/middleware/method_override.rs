//! HTML form method override.
//!
//! Browsers can only submit GET and POST, so edit and delete forms post to
//! `...?_method=PUT` or `...?_method=DELETE`. The rewrite runs before
//! routing so the router sees the intended method.

use axum::http::{Method, Request};

fn override_from_query(query: &str) -> Option<Method> {
    let (_, value) = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "_method")?;

    match value.to_ascii_uppercase().as_str() {
        "PUT" => Some(Method::PUT),
        "PATCH" => Some(Method::PATCH),
        "DELETE" => Some(Method::DELETE),
        _ => None,
    }
}

/// Rewrites `POST ?_method=...` requests to the requested method.
pub fn method_override<B>(mut request: Request<B>) -> Request<B> {
    if request.method() != Method::POST {
        return request;
    }

    if let Some(method) = request.uri().query().and_then(override_from_query) {
        tracing::trace!(%method, uri = %request.uri(), "Overriding request method");
        *request.method_mut() = method;
    }
    request
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewritten(method: Method, uri: &str) -> Method {
        let request = Request::builder().method(method).uri(uri).body(()).unwrap();
        method_override(request).method().clone()
    }

    #[test]
    fn test_post_is_rewritten() {
        assert_eq!(rewritten(Method::POST, "/locations/1?_method=DELETE"), Method::DELETE);
        assert_eq!(rewritten(Method::POST, "/locations/1?x=1&_method=put"), Method::PUT);
    }

    #[test]
    fn test_other_requests_are_untouched() {
        assert_eq!(rewritten(Method::GET, "/locations/1?_method=DELETE"), Method::GET);
        assert_eq!(rewritten(Method::POST, "/locations/1?_method=GET"), Method::POST);
        assert_eq!(rewritten(Method::POST, "/locations/1"), Method::POST);
    }
}
