use std::sync::Arc;

use async_trait::async_trait;

use crate::api::GitHubApi;
use crate::error::Result;
use crate::paginator::PageSource;
use crate::types::{PagedResult, Repository, UserSummary};

pub const USER_SEARCH_PAGE_SIZE: u32 = 30;
pub const USER_REPOS_PAGE_SIZE: u32 = 5;

/// `/search/users`, keyed by the search query
pub struct UserSearch {
    api: Arc<dyn GitHubApi>,
    per_page: u32,
}

impl UserSearch {
    pub fn new(api: Arc<dyn GitHubApi>, per_page: u32) -> Self {
        Self {
            api,
            per_page: per_page.max(1),
        }
    }
}

#[async_trait]
impl PageSource for UserSearch {
    type Item = UserSummary;

    fn page_size(&self) -> usize {
        self.per_page as usize
    }

    async fn fetch_page(&self, query: &str, page: u32) -> Result<PagedResult<UserSummary>> {
        self.api.search_users(query, page, self.per_page).await
    }
}

/// `/users/{login}/repos`, keyed by login
pub struct UserRepos {
    api: Arc<dyn GitHubApi>,
    per_page: u32,
}

impl UserRepos {
    pub fn new(api: Arc<dyn GitHubApi>, per_page: u32) -> Self {
        Self {
            api,
            per_page: per_page.max(1),
        }
    }
}

#[async_trait]
impl PageSource for UserRepos {
    type Item = Repository;

    fn page_size(&self) -> usize {
        self.per_page as usize
    }

    async fn fetch_page(&self, login: &str, page: u32) -> Result<PagedResult<Repository>> {
        let repos = self.api.list_user_repos(login, page, self.per_page).await?;
        Ok(PagedResult::new(repos))
    }
}
