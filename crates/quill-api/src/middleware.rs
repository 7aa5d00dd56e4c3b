//! Request gate. Every request is classified as authenticated or not and
//! checked against a fixed set of path patterns before reaching a handler.

use std::sync::LazyLock;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use crate::state::AppState;

/// Paths the gate looks at. Anything else passes through untouched.
pub const GATED_PATHS: &[&str] = &["/", "/chat/:id", "/api/:path*", "/actions/:path*", "/login", "/register"];

/// Pages that only make sense without a session.
const SIGN_IN_PAGES: &[&str] = &["/login", "/register"];

static GATE: LazyLock<Gate> = LazyLock::new(Gate::default);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `:name`, exactly one segment.
    Param,
    /// `:name*`, zero or more trailing segments.
    CatchAll,
}

#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: &'static str,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(raw: &'static str) -> Self {
        let segments = split(raw)
            .map(|seg| match seg.strip_prefix(':') {
                Some(name) if name.ends_with('*') => Segment::CatchAll,
                Some(_) => Segment::Param,
                None => Segment::Literal(seg.to_string()),
            })
            .collect();
        Self { raw, segments }
    }

    pub fn matches(&self, path: &str) -> bool {
        let mut parts = split(path);
        for segment in &self.segments {
            match segment {
                Segment::CatchAll => return true,
                Segment::Param => {
                    if parts.next().is_none() {
                        return false;
                    }
                }
                Segment::Literal(lit) => {
                    if parts.next() != Some(lit.as_str()) {
                        return false;
                    }
                }
            }
        }
        parts.next().is_none()
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|seg| !seg.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Authenticated,
    Unauthenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Redirect(&'static str),
}

pub struct Gate {
    patterns: Vec<PathPattern>,
}

impl Default for Gate {
    fn default() -> Self {
        Self {
            patterns: GATED_PATHS.iter().copied().map(PathPattern::parse).collect(),
        }
    }
}

impl Gate {
    pub fn evaluate(&self, path: &str, session: SessionState) -> GateDecision {
        let Some(pattern) = self.patterns.iter().find(|p| p.matches(path)) else {
            return GateDecision::Proceed;
        };

        let sign_in_page = SIGN_IN_PAGES.contains(&pattern.raw);
        match (session, sign_in_page) {
            (SessionState::Authenticated, true) => GateDecision::Redirect("/"),
            (SessionState::Authenticated, false) => GateDecision::Proceed,
            (SessionState::Unauthenticated, true) => GateDecision::Proceed,
            (SessionState::Unauthenticated, false) => GateDecision::Redirect("/login"),
        }
    }
}

/// Resolves the session cookie, attaches the `AuthUser` to the request and
/// applies the gate.
pub async fn gate(
    State(state): State<AppState>,
    cookies: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let user = state.auth.user_from_cookies(&cookies);
    let session = match user {
        Some(_) => SessionState::Authenticated,
        None => SessionState::Unauthenticated,
    };

    if let GateDecision::Redirect(to) = GATE.evaluate(req.uri().path(), session) {
        debug!("Gate redirecting {} to {}", req.uri().path(), to);
        return Redirect::to(to).into_response();
    }

    if let Some(user) = user {
        req.extensions_mut().insert(user);
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    use SessionState::{Authenticated, Unauthenticated};

    #[test]
    fn patterns_match_by_segment() {
        let root = PathPattern::parse("/");
        assert!(root.matches("/"));
        assert!(!root.matches("/chat"));

        let chat = PathPattern::parse("/chat/:id");
        assert!(chat.matches("/chat/abc"));
        assert!(chat.matches("/chat/abc/"));
        assert!(!chat.matches("/chat"));
        assert!(!chat.matches("/chat/abc/def"));

        let api = PathPattern::parse("/api/:path*");
        assert!(api.matches("/api"));
        assert!(api.matches("/api/history"));
        assert!(api.matches("/api/a/b/c"));
        assert!(!api.matches("/apis"));
    }

    #[test]
    fn unauthenticated_requests_to_protected_paths_redirect_to_login() {
        let gate = Gate::default();
        for path in ["/", "/chat/x", "/api/history", "/actions/chat-visibility"] {
            assert_eq!(gate.evaluate(path, Unauthenticated), GateDecision::Redirect("/login"), "{path}");
            assert_eq!(gate.evaluate(path, Authenticated), GateDecision::Proceed, "{path}");
        }
    }

    #[test]
    fn sign_in_pages_bounce_signed_in_users() {
        let gate = Gate::default();
        for path in ["/login", "/register"] {
            assert_eq!(gate.evaluate(path, Authenticated), GateDecision::Redirect("/"));
            assert_eq!(gate.evaluate(path, Unauthenticated), GateDecision::Proceed);
        }
    }

    #[test]
    fn unmatched_paths_pass_through() {
        let gate = Gate::default();
        for path in ["/health", "/logout", "/static/app.css"] {
            assert_eq!(gate.evaluate(path, Unauthenticated), GateDecision::Proceed);
        }
    }
}
