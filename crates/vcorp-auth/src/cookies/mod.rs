// Cookie handling: parsing the Cookie header and building the session
// Set-Cookie value.

use std::collections::HashMap;

use crate::context::AuthContext;

/// Cookie attributes for a single cookie.
#[derive(Debug, Clone)]
pub struct CookieAttributes {
    pub value: String,
    pub max_age: Option<i64>,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
}

/// SameSite cookie attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl std::fmt::Display for SameSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SameSite::Strict => write!(f, "Strict"),
            SameSite::Lax => write!(f, "Lax"),
            SameSite::None => write!(f, "None"),
        }
    }
}

/// Parse a `Cookie` header string into a map of name → value.
pub fn parse_cookies(cookie_header: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for cookie in cookie_header.split("; ") {
        if let Some((name, value)) = cookie.split_once('=') {
            map.insert(name.to_string(), value.to_string());
        }
    }
    map
}

/// Serialize a `CookieAttributes` into a `Set-Cookie` header value string.
pub fn serialize_cookie(name: &str, attrs: &CookieAttributes) -> String {
    let mut parts = vec![format!("{}={}", name, attrs.value)];

    if let Some(max_age) = attrs.max_age {
        parts.push(format!("Max-Age={}", max_age));
    }
    if let Some(ref domain) = attrs.domain {
        parts.push(format!("Domain={}", domain));
    }
    if let Some(ref path) = attrs.path {
        parts.push(format!("Path={}", path));
    }
    if attrs.secure {
        parts.push("Secure".into());
    }
    if attrs.http_only {
        parts.push("HttpOnly".into());
    }
    if let Some(same_site) = attrs.same_site {
        parts.push(format!("SameSite={}", same_site));
    }

    parts.join("; ")
}

/// Build the session cookie for a freshly minted token.
///
/// HttpOnly, SameSite=Lax, Path=/, Max-Age matching the session TTL, and
/// Secure unless the deployment runs on localhost.
pub fn build_session_cookie(ctx: &AuthContext, token: &str) -> String {
    let attrs = CookieAttributes {
        value: token.to_string(),
        max_age: Some(ctx.options.session.expires_in as i64),
        domain: ctx.options.cookie.domain.clone(),
        path: Some("/".into()),
        secure: ctx.options.cookie.secure.unwrap_or(!ctx.is_local()),
        http_only: true,
        same_site: Some(SameSite::Lax),
    };
    serialize_cookie(&ctx.options.cookie.name, &attrs)
}

/// Build the Set-Cookie value that clears the session cookie.
pub fn clear_session_cookie(ctx: &AuthContext) -> String {
    let attrs = CookieAttributes {
        value: String::new(),
        max_age: Some(0),
        domain: ctx.options.cookie.domain.clone(),
        path: Some("/".into()),
        secure: ctx.options.cookie.secure.unwrap_or(!ctx.is_local()),
        http_only: true,
        same_site: Some(SameSite::Lax),
    };
    serialize_cookie(&ctx.options.cookie.name, &attrs)
}

/// Pull the session token out of a Cookie header, if present.
pub fn session_token_from_header(ctx: &AuthContext, cookie_header: &str) -> Option<String> {
    parse_cookies(cookie_header)
        .remove(&ctx.options.cookie.name)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::tests_support::NoopGateway;
    use crate::mailer::tests_support::NoopMailer;
    use std::sync::Arc;
    use vcorp_core::options::VcorpOptions;

    fn ctx(base_url: &str) -> Arc<AuthContext> {
        let options = VcorpOptions::new("a-test-secret-that-is-long-enough!!").base_url(base_url);
        AuthContext::new(
            options,
            Arc::new(crate::context::tests_support::UnusedAdapter),
            Arc::new(NoopMailer::default()),
            Arc::new(NoopGateway::default()),
        )
    }

    #[test]
    fn test_parse_cookies() {
        let header = "vcorp_auth_token=abc123; theme=dark";
        let cookies = parse_cookies(header);
        assert_eq!(cookies.get("vcorp_auth_token").unwrap(), "abc123");
        assert_eq!(cookies.get("theme").unwrap(), "dark");
    }

    #[test]
    fn test_session_cookie_local_is_not_secure() {
        let ctx = ctx("http://localhost:3001");
        let cookie = build_session_cookie(&ctx, "tok");
        assert!(cookie.starts_with("vcorp_auth_token=tok"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_session_cookie_production_is_secure() {
        let ctx = ctx("https://api.thevacorp.com");
        let cookie = build_session_cookie(&ctx, "tok");
        assert!(cookie.contains("Secure"));
    }

    #[test]
    fn test_clear_session_cookie() {
        let ctx = ctx("http://localhost:3001");
        let cookie = clear_session_cookie(&ctx);
        assert!(cookie.starts_with("vcorp_auth_token="));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn test_session_token_from_header() {
        let ctx = ctx("http://localhost:3001");
        assert_eq!(
            session_token_from_header(&ctx, "vcorp_auth_token=tok123; other=x"),
            Some("tok123".to_string())
        );
        assert_eq!(session_token_from_header(&ctx, "other=x"), None);
        assert_eq!(session_token_from_header(&ctx, "vcorp_auth_token="), None);
    }
}
