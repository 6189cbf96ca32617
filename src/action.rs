use crate::types::UserProfile;

#[derive(Debug, Clone)]
pub enum Action {
    Quit,
    Back,
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    GoToTop,
    GoToBottom,
    Select,
    Refresh,

    // Search input
    EnterSearchMode,
    ExitSearchMode,
    SearchInput(char),
    SearchBackspace,
    SearchConfirm,
    ClearSearch,

    // Pagination: explicit "show more"
    LoadMore,

    // User detail
    ProfileLoaded(Box<UserProfile>, u64),
    ProfileFailed(String, u64),

    OpenInBrowser,
    OpenProfile,
    YankUrl,

    None,
}
