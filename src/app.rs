use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;

use crate::action::Action;
use crate::api::GitHubApi;
use crate::config::Config;
use crate::event::Event;
use crate::paginator::{near_end, FetchKind, PageSource, Paginator};
use crate::sources::{UserRepos, UserSearch};
use crate::types::UserProfile;

const PAGE_JUMP: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Search,     // Search box + user results
    UserDetail, // Profile header + repositories
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Editing,
}

/// State of the user detail screen. Dropped when navigating back.
pub struct UserDetail {
    pub login: String,
    pub profile: Option<UserProfile>,
    pub loading: bool,
    pub error: Option<String>,
    pub repos: Arc<Paginator<UserRepos>>,
    pub repo_index: usize,
}

pub struct App {
    pub screen: Screen,
    pub input_mode: InputMode,
    pub input: String,
    pub search: Arc<Paginator<UserSearch>>,
    pub user_index: usize,
    pub detail: Option<UserDetail>,
    pub error: Option<String>,
    pub notice: Option<String>,
    pub should_quit: bool,
    prefetch_threshold: usize,
    repo_page_size: u32,
    repo_load_more_delay: Duration,
    initial_query: bool,
    load_id: u64,
    api: Arc<dyn GitHubApi>,
    action_tx: mpsc::UnboundedSender<Action>,
}

impl App {
    pub fn new(
        api: Arc<dyn GitHubApi>,
        config: &Config,
        action_tx: mpsc::UnboundedSender<Action>,
        initial_query: Option<String>,
    ) -> Self {
        let search = Paginator::new(UserSearch::new(Arc::clone(&api), config.search.page_size))
            .with_load_more_delay(config.search.load_more_delay());

        let input = initial_query.unwrap_or_default();
        search.set_query(&input);

        Self {
            screen: Screen::Search,
            input_mode: InputMode::Normal,
            initial_query: !input.trim().is_empty(),
            input,
            search: Arc::new(search),
            user_index: 0,
            detail: None,
            error: None,
            notice: None,
            should_quit: false,
            prefetch_threshold: config.search.prefetch_threshold,
            repo_page_size: config.repos.page_size,
            repo_load_more_delay: config.repos.load_more_delay(),
            load_id: 0,
            api,
            action_tx,
        }
    }

    pub fn handle_event(&self, event: Event) -> Action {
        match event {
            Event::Init => {
                if self.initial_query {
                    Action::SearchConfirm
                } else {
                    Action::EnterSearchMode
                }
            }
            Event::Key(key) => self.handle_key(key),
            Event::WheelDown => Action::ScrollDown,
            Event::WheelUp => Action::ScrollUp,
            _ => Action::None,
        }
    }

    fn handle_key(&self, key: KeyEvent) -> Action {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if self.input_mode == InputMode::Editing {
            return match key.code {
                KeyCode::Enter => Action::SearchConfirm,
                KeyCode::Esc => Action::ExitSearchMode,
                KeyCode::Backspace => Action::SearchBackspace,
                KeyCode::Char('u') if ctrl => Action::ClearSearch,
                KeyCode::Char(c) if !ctrl => Action::SearchInput(c),
                _ => Action::None,
            };
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => match self.screen {
                Screen::Search => Action::Quit,
                Screen::UserDetail => Action::Back,
            },
            KeyCode::Char('d') if ctrl => Action::PageDown,
            KeyCode::Char('u') if ctrl => Action::PageUp,
            KeyCode::PageDown => Action::PageDown,
            KeyCode::PageUp => Action::PageUp,
            KeyCode::Char('j') | KeyCode::Down => Action::ScrollDown,
            KeyCode::Char('k') | KeyCode::Up => Action::ScrollUp,
            KeyCode::Char('g') | KeyCode::Home => Action::GoToTop,
            KeyCode::Char('G') | KeyCode::End => Action::GoToBottom,
            KeyCode::Enter => Action::Select,
            KeyCode::Char('m') => Action::LoadMore,
            KeyCode::Char('r') => Action::Refresh,
            KeyCode::Char('o') => Action::OpenInBrowser,
            KeyCode::Char('y') => Action::YankUrl,
            KeyCode::Char('/') | KeyCode::Char('s') if self.screen == Screen::Search => {
                Action::EnterSearchMode
            }
            KeyCode::Char('c') if self.screen == Screen::Search => Action::ClearSearch,
            KeyCode::Char('p') if self.screen == Screen::UserDetail => Action::OpenProfile,
            KeyCode::Backspace if self.screen == Screen::UserDetail => Action::Back,
            _ => Action::None,
        }
    }

    pub fn update(&mut self, action: Action) {
        if !matches!(action, Action::None) {
            self.notice = None;
            if !matches!(action, Action::Quit | Action::Back) {
                self.error = None;
            }
        }

        match action {
            Action::Quit => {
                self.should_quit = true;
            }
            Action::Back => match self.screen {
                Screen::Search => {
                    self.should_quit = true;
                }
                Screen::UserDetail => {
                    self.screen = Screen::Search;
                    self.detail = None;
                }
            },
            Action::ScrollUp => self.move_selection(|i, _| i.saturating_sub(1)),
            Action::ScrollDown => self.move_selection(|i, _| i + 1),
            Action::PageUp => self.move_selection(|i, _| i.saturating_sub(PAGE_JUMP)),
            Action::PageDown => self.move_selection(|i, _| i + PAGE_JUMP),
            Action::GoToTop => self.move_selection(|_, _| 0),
            Action::GoToBottom => self.move_selection(|_, len| len.saturating_sub(1)),
            Action::Select => match self.screen {
                Screen::Search => {
                    let login = self
                        .search
                        .state()
                        .items
                        .get(self.user_index)
                        .map(|u| u.login.clone());
                    if let Some(login) = login {
                        self.open_detail(login);
                    }
                }
                Screen::UserDetail => self.open_url(self.selected_url()),
            },
            Action::Refresh => match self.screen {
                Screen::Search => {
                    let submitted = self.search.state().submitted_query().map(str::to_string);
                    if let Some(query) = submitted {
                        self.input = query;
                        self.search.set_query(&self.input);
                        self.user_index = 0;
                        spawn_fetch(&self.search, FetchKind::Reset);
                    }
                }
                Screen::UserDetail => {
                    if let Some(login) = self.detail.as_ref().map(|d| d.login.clone()) {
                        self.open_detail(login);
                    }
                }
            },

            // Search input
            Action::EnterSearchMode => {
                self.screen = Screen::Search;
                self.input_mode = InputMode::Editing;
            }
            Action::ExitSearchMode => {
                self.input_mode = InputMode::Normal;
            }
            Action::SearchInput(c) => {
                self.input.push(c);
                self.search.set_query(&self.input);
            }
            Action::SearchBackspace => {
                self.input.pop();
                self.search.set_query(&self.input);
            }
            Action::SearchConfirm => {
                self.input_mode = InputMode::Normal;
                self.search.set_query(&self.input);
                self.user_index = 0;
                spawn_fetch(&self.search, FetchKind::Reset);
            }
            Action::ClearSearch => {
                self.input.clear();
                self.search.clear();
                self.user_index = 0;
            }

            Action::LoadMore => match self.screen {
                Screen::Search => spawn_fetch(&self.search, FetchKind::Incremental),
                Screen::UserDetail => {
                    if let Some(detail) = &self.detail {
                        spawn_fetch(&detail.repos, FetchKind::Incremental);
                    }
                }
            },

            // User detail
            Action::ProfileLoaded(profile, load_id) => {
                if let Some(detail) = self.current_detail(load_id) {
                    detail.profile = Some(*profile);
                    detail.loading = false;
                }
            }
            Action::ProfileFailed(msg, load_id) => {
                if let Some(detail) = self.current_detail(load_id) {
                    detail.error = Some(msg);
                    detail.loading = false;
                }
            }

            Action::OpenInBrowser => self.open_url(self.selected_url()),
            Action::OpenProfile => {
                let url = self.detail.as_ref().map(|d| self.profile_url(d));
                self.open_url(url);
            }
            Action::YankUrl => {
                if let Some(url) = self.selected_url() {
                    match arboard::Clipboard::new().and_then(|mut c| c.set_text(url.clone())) {
                        Ok(()) => self.notice = Some(format!("Copied {}", url)),
                        Err(e) => self.error = Some(format!("Clipboard unavailable: {}", e)),
                    }
                }
            }

            Action::None => {}
        }
    }

    /// Whether the list on screen is waiting on a first page.
    pub fn loading(&self) -> bool {
        match self.screen {
            Screen::Search => self.search.state().is_loading(),
            Screen::UserDetail => self
                .detail
                .as_ref()
                .is_some_and(|d| d.loading || d.repos.state().is_loading()),
        }
    }

    /// Error to surface in the status bar, most specific first.
    pub fn status_error(&self) -> Option<String> {
        if let Some(err) = &self.error {
            return Some(err.clone());
        }
        match self.screen {
            Screen::Search => self.search.state().error.clone(),
            Screen::UserDetail => self
                .detail
                .as_ref()
                .and_then(|d| d.error.clone().or_else(|| d.repos.state().error.clone())),
        }
    }

    fn current_detail(&mut self, load_id: u64) -> Option<&mut UserDetail> {
        if load_id != self.load_id {
            return None;
        }
        self.detail.as_mut()
    }

    fn move_selection(&mut self, step: impl Fn(usize, usize) -> usize) {
        match self.screen {
            Screen::Search => {
                let len = self.search.state().items.len();
                if len == 0 {
                    return;
                }
                self.user_index = step(self.user_index, len).min(len - 1);
                if near_end(self.user_index, len, self.prefetch_threshold) {
                    spawn_fetch(&self.search, FetchKind::Incremental);
                }
            }
            Screen::UserDetail => {
                let Some(detail) = self.detail.as_mut() else {
                    return;
                };
                let len = detail.repos.state().items.len();
                if len == 0 {
                    return;
                }
                detail.repo_index = step(detail.repo_index, len).min(len - 1);
                if near_end(detail.repo_index, len, 1) {
                    spawn_fetch(&detail.repos, FetchKind::Incremental);
                }
            }
        }
    }

    fn open_detail(&mut self, login: String) {
        self.load_id += 1;

        let repos = Arc::new(
            Paginator::new(UserRepos::new(Arc::clone(&self.api), self.repo_page_size))
                .with_load_more_delay(self.repo_load_more_delay),
        );
        repos.set_query(&login);
        spawn_fetch(&repos, FetchKind::Reset);

        self.detail = Some(UserDetail {
            login: login.clone(),
            profile: None,
            loading: true,
            error: None,
            repos,
            repo_index: 0,
        });
        self.screen = Screen::UserDetail;
        self.spawn_load_profile(login, self.load_id);
    }

    fn profile_url(&self, detail: &UserDetail) -> String {
        detail
            .profile
            .as_ref()
            .map(|p| p.html_url.clone())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.api.profile_url(&detail.login))
    }

    /// URL of whatever is highlighted: a user on the search screen, a repo
    /// (or the profile, if there are none) on the detail screen.
    pub fn selected_url(&self) -> Option<String> {
        match self.screen {
            Screen::Search => self.search.state().items.get(self.user_index).map(|u| {
                if u.html_url.is_empty() {
                    self.api.profile_url(&u.login)
                } else {
                    u.html_url.clone()
                }
            }),
            Screen::UserDetail => {
                let detail = self.detail.as_ref()?;
                let repo_url = detail
                    .repos
                    .state()
                    .items
                    .get(detail.repo_index)
                    .map(|r| r.html_url.clone());
                Some(repo_url.unwrap_or_else(|| self.profile_url(detail)))
            }
        }
    }

    fn open_url(&mut self, url: Option<String>) {
        let Some(url) = url else {
            return;
        };
        match open::that(&url) {
            Ok(()) => self.notice = Some(format!("Opened {}", url)),
            Err(e) => self.error = Some(format!("Failed to open browser: {}", e)),
        }
    }

    fn spawn_load_profile(&self, login: String, load_id: u64) {
        let tx = self.action_tx.clone();
        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            match api.get_user(&login).await {
                Ok(profile) => {
                    tx.send(Action::ProfileLoaded(Box::new(profile), load_id)).ok();
                }
                Err(e) => {
                    tx.send(Action::ProfileFailed(e.to_string(), load_id)).ok();
                }
            }
        });
    }
}

fn spawn_fetch<S: PageSource + 'static>(paginator: &Arc<Paginator<S>>, kind: FetchKind) {
    // Skip the task entirely when the paginator would ignore the trigger anyway.
    if kind == FetchKind::Incremental && !paginator.state().can_load_more() {
        return;
    }
    let paginator = Arc::clone(paginator);
    tokio::spawn(async move {
        match kind {
            FetchKind::Reset => paginator.search(true).await,
            FetchKind::Incremental => paginator.load_more().await,
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::stub::{profile, StubApi};
    use crate::config::{ReposConfig, SearchConfig};

    fn config() -> Config {
        Config {
            search: SearchConfig {
                load_more_delay_ms: 0,
                ..SearchConfig::default()
            },
            repos: ReposConfig {
                load_more_delay_ms: 0,
                ..ReposConfig::default()
            },
            ..Config::default()
        }
    }

    fn app(api: StubApi, query: Option<&str>) -> (App, mpsc::UnboundedReceiver<Action>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::new(Arc::new(api), &config(), tx, query.map(str::to_string));
        (app, rx)
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    async fn wait_for_users(app: &App, n: usize) {
        let mut rx = app.search.subscribe();
        rx.wait_for(|s| !s.is_loading() && s.items.len() == n)
            .await
            .unwrap();
    }

    #[test]
    fn init_starts_editing_without_query() {
        let (app, _rx) = app(StubApi::default(), None);
        assert!(matches!(app.handle_event(Event::Init), Action::EnterSearchMode));
    }

    #[test]
    fn init_submits_initial_query() {
        let (app, _rx) = app(StubApi::default(), Some("octocat"));
        assert_eq!(app.input, "octocat");
        assert!(matches!(app.handle_event(Event::Init), Action::SearchConfirm));
    }

    #[test]
    fn editing_mode_captures_characters() {
        let (mut app, _rx) = app(StubApi::default(), None);
        app.update(Action::EnterSearchMode);
        assert!(matches!(
            app.handle_event(key(KeyCode::Char('q'))),
            Action::SearchInput('q')
        ));
        assert!(matches!(
            app.handle_event(key(KeyCode::Esc)),
            Action::ExitSearchMode
        ));
    }

    #[test]
    fn normal_mode_keys() {
        let (app, _rx) = app(StubApi::default(), None);
        assert!(matches!(app.handle_event(key(KeyCode::Char('q'))), Action::Quit));
        assert!(matches!(app.handle_event(key(KeyCode::Char('j'))), Action::ScrollDown));
        assert!(matches!(app.handle_event(key(KeyCode::Char('m'))), Action::LoadMore));
        assert!(matches!(
            app.handle_event(key(KeyCode::Char('/'))),
            Action::EnterSearchMode
        ));
        assert!(matches!(app.handle_event(Event::WheelDown), Action::ScrollDown));
    }

    #[test]
    fn typing_updates_trimmed_query() {
        let (mut app, _rx) = app(StubApi::default(), None);
        for c in " octo".chars() {
            app.update(Action::SearchInput(c));
        }
        app.update(Action::SearchBackspace);
        assert_eq!(app.input, " oct");
        assert_eq!(app.search.state().query, "oct");
    }

    #[tokio::test]
    async fn confirm_searches_and_scroll_loads_more() {
        let (mut app, _rx) = app(StubApi::with_total(42), Some("octocat"));
        app.update(Action::SearchConfirm);
        wait_for_users(&app, 30).await;

        app.update(Action::GoToBottom);
        assert_eq!(app.user_index, 29);
        wait_for_users(&app, 42).await;
        assert!(app.search.state().end_reached);
    }

    #[tokio::test]
    async fn scrolling_far_from_end_does_not_load() {
        let api = Arc::new(StubApi::with_total(60));
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(api.clone(), &config(), tx, Some("octocat".into()));
        app.update(Action::SearchConfirm);
        wait_for_users(&app, 30).await;

        app.update(Action::ScrollDown);
        app.update(Action::PageDown);
        assert_eq!(app.user_index, 11);
        tokio::task::yield_now().await;
        assert_eq!(api.calls(), vec!["search octocat 1 30"]);
    }

    #[tokio::test]
    async fn clear_resets_input_and_results() {
        let (mut app, _rx) = app(StubApi::with_total(3), Some("octocat"));
        app.update(Action::SearchConfirm);
        wait_for_users(&app, 3).await;

        app.update(Action::ClearSearch);
        assert!(app.input.is_empty());
        assert_eq!(app.user_index, 0);
        assert!(app.search.state().items.is_empty());
    }

    #[tokio::test]
    async fn select_opens_detail_and_loads_profile() {
        let (mut app, mut rx) = app(StubApi::with_total(7), Some("octocat"));
        app.update(Action::SearchConfirm);
        wait_for_users(&app, 7).await;

        app.update(Action::ScrollDown);
        app.update(Action::Select);
        assert_eq!(app.screen, Screen::UserDetail);
        assert_eq!(app.detail.as_ref().unwrap().login, "user1");

        let action = rx.recv().await.unwrap();
        app.update(action);
        let detail = app.detail.as_ref().unwrap();
        assert!(!detail.loading);
        assert_eq!(detail.profile.as_ref().unwrap().login, "user1");

        let mut repos = detail.repos.subscribe();
        repos
            .wait_for(|s| !s.is_loading() && s.items.len() == 5)
            .await
            .unwrap();
        assert!(!detail.repos.state().end_reached);
    }

    #[tokio::test]
    async fn stale_profile_is_ignored() {
        let (mut app, _rx) = app(StubApi::with_total(2), Some("octocat"));
        app.update(Action::SearchConfirm);
        wait_for_users(&app, 2).await;

        app.update(Action::Select);
        app.update(Action::ProfileLoaded(Box::new(profile("someone-else")), 0));
        let detail = app.detail.as_ref().unwrap();
        assert!(detail.profile.is_none());
        assert!(detail.loading);
    }

    #[tokio::test]
    async fn profile_failure_sets_detail_error() {
        let (mut app, _rx) = app(StubApi::with_total(1), Some("octocat"));
        app.update(Action::SearchConfirm);
        wait_for_users(&app, 1).await;

        app.update(Action::Select);
        app.update(Action::ProfileFailed("Not Found".into(), 1));
        assert_eq!(app.status_error().as_deref(), Some("Not Found"));
    }

    #[tokio::test]
    async fn back_discards_detail() {
        let (mut app, _rx) = app(StubApi::with_total(1), Some("octocat"));
        app.update(Action::SearchConfirm);
        wait_for_users(&app, 1).await;

        app.update(Action::Select);
        app.update(Action::Back);
        assert_eq!(app.screen, Screen::Search);
        assert!(app.detail.is_none());
        assert!(!app.should_quit);

        app.update(Action::Back);
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn selected_url_follows_screen() {
        let (mut app, _rx) = app(StubApi::with_total(1), Some("octocat"));
        app.update(Action::SearchConfirm);
        wait_for_users(&app, 1).await;
        assert_eq!(
            app.selected_url().as_deref(),
            Some("https://github.com/user0")
        );

        app.update(Action::Select);
        // No repos and no profile yet: fall back to the profile URL.
        assert_eq!(
            app.selected_url().as_deref(),
            Some("https://github.com/user0")
        );
    }

    #[tokio::test]
    async fn search_failure_surfaces_in_status() {
        let api = StubApi {
            fail: true,
            ..StubApi::default()
        };
        let (mut app, _rx) = app(api, Some("octocat"));
        assert!(app.status_error().is_none());

        app.update(Action::SearchConfirm);
        let mut rx = app.search.subscribe();
        rx.wait_for(|s| !s.is_loading() && s.error.is_some())
            .await
            .unwrap();

        let err = app.status_error().unwrap();
        assert!(err.contains("stub failure"), "unexpected error: {}", err);
    }
}
