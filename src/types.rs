use chrono::{DateTime, Utc};
use serde::Serialize;

/// One page as returned by the API, before it is merged into a list.
#[derive(Debug, Clone, Serialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total_count: Option<u64>,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            total_count: None,
        }
    }
}

/// A user as listed by the search endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSummary {
    pub id: u64,
    pub login: String,
    pub avatar_url: String,
    pub html_url: String,
    pub kind: AccountKind,
    pub score: Option<f64>,
    pub site_admin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AccountKind {
    User,
    Organization,
    Bot,
    Unknown,
}

impl AccountKind {
    pub fn from_api_str(s: &str) -> Self {
        match s {
            "User" => AccountKind::User,
            "Organization" => AccountKind::Organization,
            "Bot" => AccountKind::Bot,
            _ => AccountKind::Unknown,
        }
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountKind::User => write!(f, "User"),
            AccountKind::Organization => write!(f, "Org"),
            AccountKind::Bot => write!(f, "Bot"),
            AccountKind::Unknown => write!(f, "?"),
        }
    }
}

/// Full profile from `/users/{login}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: u64,
    pub login: String,
    pub name: Option<String>,
    pub kind: AccountKind,
    pub avatar_url: String,
    pub html_url: String,
    pub bio: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub blog: Option<String>,
    pub email: Option<String>,
    pub twitter_username: Option<String>,
    pub hireable: Option<bool>,
    pub stats: ProfileStats,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.login)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ProfileStats {
    pub public_repos: u32,
    pub public_gists: u32,
    pub followers: u32,
    pub following: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub html_url: String,
    pub language: Option<String>,
    pub stars: u32,
    pub forks: u32,
    pub watchers: u32,
    pub open_issues: u32,
    pub fork: bool,
    pub archived: bool,
    pub topics: Vec<String>,
    pub license: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}
