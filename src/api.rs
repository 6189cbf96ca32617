use async_trait::async_trait;

use crate::error::Result;
use crate::types::{PagedResult, Repository, UserProfile, UserSummary};

/// The slice of the GitHub REST API this client talks to.
#[async_trait]
pub trait GitHubApi: Send + Sync + std::fmt::Debug {
    /// Web URL for a user's profile page, used when no `html_url` is at hand.
    fn profile_url(&self, login: &str) -> String;

    async fn search_users(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<PagedResult<UserSummary>>;

    async fn get_user(&self, login: &str) -> Result<UserProfile>;

    /// Repositories owned by `login`, most recently updated first.
    async fn list_user_repos(
        &self,
        login: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Repository>>;
}
