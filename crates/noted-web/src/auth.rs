//! Membership authorization for WebSocket connections.
//!
//! Verifying tokens and team membership belongs to the account layer; the
//! server only asks the question through [`MembershipAuthorizer`].

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use noted_core::config::MemberToken;
use noted_core::{NotedError, NotedResult, TeamId, UserId};
use std::collections::HashMap;

/// Answers who a token belongs to and whether that user may join a team's
/// live feed.
#[async_trait]
pub trait MembershipAuthorizer: Send + Sync {
    /// Returns the user behind `token`, or `Unauthorized`.
    async fn authenticate(&self, token: &str) -> NotedResult<UserId>;

    /// `Ok(())` if `user` belongs to `team`, `Forbidden` otherwise.
    async fn check_membership(&self, user: UserId, team: TeamId) -> NotedResult<()>;
}

/// Authorizer backed by a fixed token table from the configuration.
#[derive(Debug, Default)]
pub struct StaticAuthorizer {
    tokens: HashMap<String, UserId>,
    teams: HashMap<UserId, Vec<TeamId>>,
}

impl StaticAuthorizer {
    pub fn new(members: impl IntoIterator<Item = MemberToken>) -> Self {
        let mut authorizer = Self::default();
        for member in members {
            authorizer
                .teams
                .entry(member.user_id)
                .or_default()
                .extend(member.teams);
            authorizer.tokens.insert(member.token, member.user_id);
        }
        authorizer
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl MembershipAuthorizer for StaticAuthorizer {
    async fn authenticate(&self, token: &str) -> NotedResult<UserId> {
        self.tokens
            .get(token)
            .copied()
            .ok_or_else(|| NotedError::unauthorized("Invalid or expired token"))
    }

    async fn check_membership(&self, user: UserId, team: TeamId) -> NotedResult<()> {
        let is_member = self
            .teams
            .get(&user)
            .is_some_and(|teams| teams.contains(&team));
        if is_member {
            Ok(())
        } else {
            Err(NotedError::Forbidden {
                user_id: user,
                team_id: team,
            })
        }
    }
}

/// Find the bearer token: `?token=` first, then `Authorization: Bearer <token>`.
///
/// Browsers cannot set headers on WebSocket requests, hence the query form.
pub fn extract_token(query: Option<&str>, headers: &HeaderMap) -> Option<String> {
    if let Some(token) = query.filter(|t| !t.is_empty()) {
        return Some(token.to_string());
    }

    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Some(token.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn authorizer() -> StaticAuthorizer {
        StaticAuthorizer::new([MemberToken {
            token: "alice".to_string(),
            user_id: UserId(1),
            teams: vec![TeamId(7)],
        }])
    }

    fn bearer(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[tokio::test]
    async fn test_member_is_authorized() {
        let auth = authorizer();
        let user = auth.authenticate("alice").await.unwrap();
        assert_eq!(user, UserId(1));
        auth.check_membership(user, TeamId(7)).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_member_is_forbidden() {
        let err = authorizer()
            .check_membership(UserId(1), TeamId(9))
            .await
            .unwrap_err();
        assert!(matches!(err, NotedError::Forbidden { team_id: TeamId(9), .. }));
    }

    #[tokio::test]
    async fn test_unknown_user_is_forbidden() {
        let err = authorizer()
            .check_membership(UserId(2), TeamId(7))
            .await
            .unwrap_err();
        assert!(matches!(err, NotedError::Forbidden { user_id: UserId(2), .. }));
    }

    #[tokio::test]
    async fn test_unknown_token_is_unauthorized() {
        let err = authorizer().authenticate("mallory").await.unwrap_err();
        assert!(matches!(err, NotedError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_tokens_of_same_user_share_teams() {
        let auth = StaticAuthorizer::new([
            MemberToken {
                token: "laptop".to_string(),
                user_id: UserId(3),
                teams: vec![TeamId(1)],
            },
            MemberToken {
                token: "phone".to_string(),
                user_id: UserId(3),
                teams: vec![TeamId(2)],
            },
        ]);
        let user = auth.authenticate("phone").await.unwrap();
        auth.check_membership(user, TeamId(1)).await.unwrap();
        auth.check_membership(user, TeamId(2)).await.unwrap();
    }

    #[test]
    fn test_query_token_wins() {
        let headers = bearer("Bearer from-header");
        assert_eq!(
            extract_token(Some("from-query"), &headers).as_deref(),
            Some("from-query")
        );
    }

    #[test]
    fn test_bearer_header() {
        assert_eq!(
            extract_token(None, &bearer("Bearer abc")).as_deref(),
            Some("abc")
        );
        assert_eq!(extract_token(Some(""), &bearer("Bearer abc")).as_deref(), Some("abc"));
    }

    #[test]
    fn test_malformed_header() {
        assert_eq!(extract_token(None, &bearer("Basic abc")), None);
        assert_eq!(extract_token(None, &bearer("Bearer")), None);
        assert_eq!(extract_token(None, &bearer("Bearer a b")), None);
        assert_eq!(extract_token(None, &HeaderMap::new()), None);
    }
}
