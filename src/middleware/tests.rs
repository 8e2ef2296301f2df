#[cfg(test)]
mod tests {
    use hyper::HeaderMap;
    use crate::middleware::{add_cors_headers, allowed_origin, client_id};

    #[test]
    fn test_add_cors_headers() {
        let mut headers = HeaderMap::new();
        add_cors_headers(&mut headers, "http://localhost:3000");

        assert_eq!(
            headers.get("access-control-allow-origin").unwrap(),
            "http://localhost:3000"
        );
        assert_eq!(
            headers.get("access-control-allow-methods").unwrap(),
            "GET"
        );
        assert_eq!(
            headers.get("access-control-allow-headers").unwrap(),
            "Content-Type, Authorization"
        );
    }

    #[test]
    fn test_allowed_origin() {
        let allowed = vec!["http://localhost:3000".to_string()];
        assert_eq!(
            allowed_origin(Some("http://localhost:3000"), &allowed).as_deref(),
            Some("http://localhost:3000")
        );
        assert_eq!(allowed_origin(Some("http://evil.test"), &allowed), None);
        assert_eq!(allowed_origin(None, &allowed), None);

        let any = vec!["*".to_string()];
        assert_eq!(allowed_origin(None, &any).as_deref(), Some("*"));
    }

    #[test]
    fn test_client_id() {
        let peer = "10.0.0.9:5555".parse().ok();
        assert_eq!(client_id(Some("203.0.113.7, 10.0.0.1"), peer), "203.0.113.7");
        assert_eq!(client_id(Some("  "), peer), "10.0.0.9");
        assert_eq!(client_id(None, peer), "10.0.0.9");
        assert_eq!(client_id(None, None), "unknown");
    }
}
