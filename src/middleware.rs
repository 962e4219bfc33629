use axum::{
    extract::Request,
    http::{HeaderValue, header::HeaderName},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Header carrying the caller's session key. Echoed on every response so
/// clients can persist the key they were handed.
pub const SESSION_KEY_HEADER: &str = "x-session-key";

/// Session identity resolved for the current request.
#[derive(Clone, Debug)]
pub struct SessionKey(pub String);

/// Resolves the caller's session key, minting a fresh one when the header is
/// absent or unusable, and hands it to handlers as an `Extension`.
pub async fn session_key(mut req: Request, next: Next) -> Response {
    let provided = req
        .headers()
        .get(SESSION_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(sanitize_session_key);

    let key = provided.unwrap_or_else(|| Uuid::new_v4().to_string());
    req.extensions_mut().insert(SessionKey(key.clone()));

    let mut res = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&key) {
        res.headers_mut()
            .insert(HeaderName::from_static(SESSION_KEY_HEADER), value);
    }
    res
}

/// Accepts only keys that fit the `carts.session_key` column and contain
/// nothing beyond what this service itself hands out.
fn sanitize_session_key(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let acceptable = !trimmed.is_empty()
        && trimmed.len() <= 64
        && trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');
    acceptable.then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_keys_this_service_hands_out() {
        let key = Uuid::new_v4().to_string();
        assert_eq!(sanitize_session_key(&key), Some(key));
    }

    #[test]
    fn rejects_blank_and_oversized_keys() {
        assert_eq!(sanitize_session_key(""), None);
        assert_eq!(sanitize_session_key("   "), None);
        assert_eq!(sanitize_session_key(&"a".repeat(65)), None);
    }

    #[test]
    fn rejects_keys_with_unexpected_characters() {
        assert_eq!(sanitize_session_key("abc def"), None);
        assert_eq!(sanitize_session_key("abc;DROP TABLE carts"), None);
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(
            sanitize_session_key("  abc-123  "),
            Some("abc-123".to_string())
        );
    }
}
