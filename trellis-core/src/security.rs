//! Security headers added to every composed response
//!
//! - Content-Security-Policy bound to the request nonce
//! - CORS headers derived from the configured allow-lists
//! - A fixed set of hardening headers (COOP/CORP, HSTS, nosniff, ...)

use crate::{AppConfig, HttpRequest};
use crate::config::CorsConfig;

/// Content Security Policy, directives kept in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentSecurityPolicy {
    pub directives: Vec<(String, Vec<String>)>,
}

impl ContentSecurityPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directive, replacing an earlier one of the same name
    pub fn directive(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        let name = name.into();
        match self.directives.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = values,
            None => self.directives.push((name, values)),
        }
        self
    }

    /// The policy the router sends for `request`.
    ///
    /// Outside production the dev host is also allowed on any port over
    /// http(s) and ws(s), so live-reload clients keep working.
    pub fn for_request(config: &AppConfig, request: &HttpRequest) -> Self {
        let csp = &config.content_security_policy;
        let nonce = format!("'nonce-{}'", request.nonce());

        let mut origins = csp.allowed_origins.clone();
        if !config.is_production {
            let (http, ws) = if config.tls.enabled {
                ("https", "wss")
            } else {
                ("http", "ws")
            };
            origins.push(format!("{}://{}:*", http, config.host));
            origins.push(format!("{}://{}:*", ws, config.host));
        }

        let sources = |base: &[&str]| -> Vec<String> {
            base.iter()
                .map(|value| value.to_string())
                .chain(origins.iter().cloned())
                .collect()
        };

        let script = if csp.allow_inline_scripts {
            "'unsafe-inline'".to_string()
        } else {
            nonce.clone()
        };
        let style = if csp.allow_inline_styles {
            "'unsafe-inline'".to_string()
        } else {
            nonce.clone()
        };

        let mut font_src = sources(&["'self'", nonce.as_str()]);
        font_src.extend(["https:".to_string(), "data:".to_string()]);

        Self::new()
            .directive("base-uri", vec!["'self'".into()])
            .directive("connect-src", sources(&["'self'", nonce.as_str()]))
            .directive("default-src", sources(&["'self'", nonce.as_str()]))
            .directive("font-src", font_src)
            .directive("form-action", vec!["'self'".into()])
            .directive("frame-ancestors", vec!["'self'".into()])
            .directive("img-src", vec!["*".into()])
            .directive("media-src", vec!["'self'".into()])
            .directive("object-src", vec!["'none'".into()])
            .directive("script-src", sources(&["'self'", script.as_str()]))
            .directive(
                "script-src-attr",
                vec![if csp.allow_inline_scripts {
                    "'unsafe-inline'".into()
                } else {
                    "'none'".into()
                }],
            )
            .directive("style-src", sources(&["'self'", style.as_str()]))
            .directive("upgrade-insecure-requests", Vec::new())
    }

    pub fn to_header_value(&self) -> String {
        self.directives
            .iter()
            .map(|(directive, values)| {
                if values.is_empty() {
                    directive.clone()
                } else {
                    format!("{} {}", directive, values.join(" "))
                }
            })
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// CORS response headers for `request`.
///
/// `access-control-allow-origin` is `*` when the first configured origin is
/// `*`, the request's own origin when it is on the allow-list, and omitted
/// otherwise.
pub fn cors_headers(cors: &CorsConfig, request: &HttpRequest) -> Vec<(&'static str, String)> {
    let mut headers = vec![(
        "access-control-allow-credentials",
        cors.allow_credentials.to_string(),
    )];

    let allow_headers = if cors.allowed_headers.is_empty() {
        request
            .header("access-control-request-headers")
            .unwrap_or_default()
            .to_string()
    } else {
        cors.allowed_headers.join(",")
    };
    headers.push(("access-control-allow-headers", allow_headers));

    if !cors.allowed_methods.is_empty() {
        headers.push(("access-control-allow-methods", cors.allowed_methods.join(",")));
    }

    let wildcard = cors.allowed_origins.first().is_some_and(|origin| origin == "*");
    if wildcard {
        headers.push(("access-control-allow-origin", "*".to_string()));
    } else if let Some(origin) = request
        .header("origin")
        .filter(|origin| cors.allowed_origins.iter().any(|allowed| allowed == origin))
    {
        headers.push(("access-control-allow-origin", origin.to_string()));
    }

    if !cors.exposed_headers.is_empty() {
        headers.push(("access-control-expose-headers", cors.exposed_headers.join(",")));
    }

    headers.push(("access-control-max-age", cors.max_age.to_string()));

    if !cors.allowed_methods.iter().any(|method| method == "*") {
        headers.push(("vary", "origin".to_string()));
    }

    headers
}

/// Headers sent on every response regardless of configuration
pub const HARDENING_HEADERS: [(&str, &str); 10] = [
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("origin-agent-cluster", "?1"),
    (
        "permissions-policy",
        "autoplay=(self), camera=(), encrypted-media=(self), geolocation=(self), microphone=(), payment=(), sync-xhr=(self)",
    ),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=31536000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-xss-protection", "0"),
    ("x-permitted-cross-domain-policies", "none"),
];
