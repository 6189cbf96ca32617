use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::GitHubApi;
use crate::error::{OctoseekError, Result};
use crate::types::{
    AccountKind, PagedResult, ProfileStats, Repository, UserProfile, UserSummary,
};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

pub struct GitHub {
    client: Octocrab,
    web_base: String,
}

impl std::fmt::Debug for GitHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHub")
            .field("web_base", &self.web_base)
            .finish_non_exhaustive()
    }
}

impl From<octocrab::Error> for OctoseekError {
    fn from(err: octocrab::Error) -> Self {
        match err {
            octocrab::Error::GitHub { source, .. } => OctoseekError::Api(source.message.clone()),
            other => OctoseekError::Api(other.to_string()),
        }
    }
}

impl GitHub {
    /// Anonymous access works against the public API, just with a much lower rate limit.
    pub fn new(api_url: &str, token: Option<String>) -> Result<Self> {
        let mut builder = Octocrab::builder()
            .base_uri(api_url)
            .map_err(|e| OctoseekError::Config(format!("invalid api_url {}: {}", api_url, e)))?;
        if let Some(token) = token {
            builder = builder.personal_token(token);
        }
        let client = builder
            .build()
            .map_err(|e| OctoseekError::Api(e.to_string()))?;

        Ok(Self {
            client,
            web_base: web_base(api_url),
        })
    }
}

/// Map an API root onto the matching web root:
/// `https://api.github.com` -> `https://github.com`,
/// `https://ghe.example.com/api/v3` -> `https://ghe.example.com`
fn web_base(api_url: &str) -> String {
    let trimmed = api_url.trim_end_matches('/');
    if let Some(rest) = trimmed.strip_suffix("/api/v3") {
        return rest.to_string();
    }
    match trimmed.split_once("://") {
        Some((scheme, host)) => {
            let host = host.strip_prefix("api.").unwrap_or(host);
            format!("{}://{}", scheme, host)
        }
        None => trimmed.to_string(),
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

// GitHub API request/response types

#[derive(Serialize)]
struct SearchParams<'a> {
    q: &'a str,
    page: u32,
    per_page: u32,
}

#[derive(Serialize)]
struct ReposParams {
    sort: &'static str,
    page: u32,
    per_page: u32,
}

#[derive(Deserialize)]
struct GhSearchResponse {
    total_count: u64,
    #[serde(default)]
    incomplete_results: bool,
    items: Vec<GhUser>,
}

// Search items only carry the first block of fields; the rest show up on /users/{login}.
#[derive(Deserialize)]
struct GhUser {
    id: u64,
    login: String,
    #[serde(default)]
    avatar_url: String,
    #[serde(default)]
    html_url: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    score: Option<f64>,
    #[serde(default)]
    site_admin: bool,

    name: Option<String>,
    company: Option<String>,
    blog: Option<String>,
    location: Option<String>,
    email: Option<String>,
    bio: Option<String>,
    twitter_username: Option<String>,
    hireable: Option<bool>,
    public_repos: Option<u32>,
    public_gists: Option<u32>,
    followers: Option<u32>,
    following: Option<u32>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl GhUser {
    fn kind(&self) -> AccountKind {
        self.kind
            .as_deref()
            .map(AccountKind::from_api_str)
            .unwrap_or(AccountKind::Unknown)
    }
}

impl From<GhUser> for UserSummary {
    fn from(u: GhUser) -> Self {
        UserSummary {
            kind: u.kind(),
            id: u.id,
            login: u.login,
            avatar_url: u.avatar_url,
            html_url: u.html_url,
            score: u.score,
            site_admin: u.site_admin,
        }
    }
}

impl From<GhUser> for UserProfile {
    fn from(u: GhUser) -> Self {
        UserProfile {
            kind: u.kind(),
            id: u.id,
            login: u.login,
            name: non_empty(u.name),
            avatar_url: u.avatar_url,
            html_url: u.html_url,
            bio: non_empty(u.bio),
            company: non_empty(u.company),
            location: non_empty(u.location),
            blog: non_empty(u.blog),
            email: non_empty(u.email),
            twitter_username: non_empty(u.twitter_username),
            hireable: u.hireable,
            stats: ProfileStats {
                public_repos: u.public_repos.unwrap_or(0),
                public_gists: u.public_gists.unwrap_or(0),
                followers: u.followers.unwrap_or(0),
                following: u.following.unwrap_or(0),
            },
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Deserialize)]
struct GhRepo {
    id: u64,
    name: String,
    full_name: String,
    description: Option<String>,
    html_url: String,
    language: Option<String>,
    #[serde(default)]
    stargazers_count: u32,
    #[serde(default)]
    forks_count: u32,
    #[serde(default)]
    watchers_count: u32,
    #[serde(default)]
    open_issues_count: u32,
    #[serde(default)]
    fork: bool,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    topics: Vec<String>,
    license: Option<GhLicense>,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct GhLicense {
    name: String,
    spdx_id: Option<String>,
}

impl From<GhRepo> for Repository {
    fn from(r: GhRepo) -> Self {
        let license = r.license.map(|l| match l.spdx_id {
            Some(id) if !id.is_empty() && id != "NOASSERTION" => id,
            _ => l.name,
        });

        Repository {
            id: r.id,
            name: r.name,
            full_name: r.full_name,
            description: non_empty(r.description),
            html_url: r.html_url,
            language: r.language,
            stars: r.stargazers_count,
            forks: r.forks_count,
            watchers: r.watchers_count,
            open_issues: r.open_issues_count,
            fork: r.fork,
            archived: r.archived,
            topics: r.topics,
            license,
            updated_at: r.updated_at,
        }
    }
}

#[async_trait]
impl GitHubApi for GitHub {
    fn profile_url(&self, login: &str) -> String {
        format!("{}/{}", self.web_base, urlencoding::encode(login))
    }

    async fn search_users(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<PagedResult<UserSummary>> {
        let params = SearchParams {
            q: query,
            page,
            per_page,
        };
        let response: GhSearchResponse = self.client.get("/search/users", Some(&params)).await?;

        if response.incomplete_results {
            warn!(query, page, "GitHub returned incomplete search results");
        }

        Ok(PagedResult {
            items: response.items.into_iter().map(UserSummary::from).collect(),
            total_count: Some(response.total_count),
        })
    }

    async fn get_user(&self, login: &str) -> Result<UserProfile> {
        let route = format!("/users/{}", urlencoding::encode(login));
        let user: GhUser = self.client.get(&route, None::<&()>).await?;
        Ok(user.into())
    }

    async fn list_user_repos(
        &self,
        login: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Repository>> {
        let route = format!("/users/{}/repos", urlencoding::encode(login));
        let params = ReposParams {
            sort: "updated",
            page,
            per_page,
        };
        let repos: Vec<GhRepo> = self.client.get(&route, Some(&params)).await?;
        Ok(repos.into_iter().map(Repository::from).collect())
    }
}
