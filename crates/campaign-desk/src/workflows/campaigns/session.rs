use std::collections::HashMap;

use axum::http::{header, HeaderMap};

use crate::config::AuthConfig;

/// Authenticated caller of a campaign action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Maps bearer tokens to the users they authenticate.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    tokens: HashMap<String, String>,
}

impl SessionRegistry {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            tokens: config
                .api_tokens
                .iter()
                .map(|(user, token)| (token.clone(), user.clone()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn session_for_token(&self, token: &str) -> Option<Session> {
        self.tokens.get(token).map(Session::new)
    }

    /// Reads `Authorization: Bearer <token>`. Missing, malformed, or unknown tokens yield `None`.
    pub fn authenticate(&self, headers: &HeaderMap) -> Option<Session> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let (scheme, token) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        self.session_for_token(token.trim())
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("tokens", &self.tokens.len())
            .finish()
    }
}
