use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::warn;

use crate::storage::LocalStorage;

pub const THEME_STORAGE_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    fn from_dark(is_dark: bool) -> Self {
        if is_dark { Theme::Dark } else { Theme::Light }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }
}

/// Class list of the root element. The UI picks its palette from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootClasses(BTreeSet<String>);

impl RootClasses {
    pub fn contains(&self, class: &str) -> bool {
        self.0.contains(class)
    }

    /// Replace whichever theme class is present with `theme`.
    fn apply(&mut self, theme: Theme) {
        self.0.remove(Theme::Light.as_str());
        self.0.remove(Theme::Dark.as_str());
        self.0.insert(theme.as_str().to_string());
    }

    pub fn theme(&self) -> Option<Theme> {
        if self.contains(Theme::Dark.as_str()) {
            Some(Theme::Dark)
        } else if self.contains(Theme::Light.as_str()) {
            Some(Theme::Light)
        } else {
            None
        }
    }
}

/// Saved value when it names a theme, else the OS preference.
fn resolve(saved: Option<&str>, os_prefers_dark: bool) -> Theme {
    saved
        .and_then(Theme::parse)
        .unwrap_or(Theme::from_dark(os_prefers_dark))
}

/// Apply the stored theme (or the OS preference) before the first frame is
/// drawn, and remember the preference if none was saved yet.
pub fn bootstrap(storage: &LocalStorage, os_prefers_dark: bool) -> RootClasses {
    let saved = storage.get_item(THEME_STORAGE_KEY);
    let theme = resolve(saved.as_deref(), os_prefers_dark);

    let mut root = RootClasses::default();
    root.apply(theme);

    if saved.is_none() {
        if let Err(err) = storage.set_item(THEME_STORAGE_KEY, theme.as_str()) {
            warn!(error = %err, "could not persist initial theme");
        }
    }
    root
}

/// Guess the terminal's color scheme from `COLORFGBG` ("fg;bg").
/// Background colors 0-6 and 8 are dark; unknown means dark.
pub fn os_prefers_dark() -> bool {
    std::env::var("COLORFGBG")
        .ok()
        .as_deref()
        .and_then(background_is_dark)
        .unwrap_or(true)
}

fn background_is_dark(colorfgbg: &str) -> Option<bool> {
    let bg: u8 = colorfgbg.rsplit(';').next()?.trim().parse().ok()?;
    Some(matches!(bg, 0..=6 | 8))
}

/// Dark/light preference persisted to local storage and mirrored onto the
/// root class list.
pub struct ThemeState {
    storage: Arc<LocalStorage>,
    is_dark: bool,
    root: RootClasses,
}

impl ThemeState {
    pub fn new(storage: Arc<LocalStorage>, os_prefers_dark: bool, root: RootClasses) -> Self {
        let saved = storage.get_item(THEME_STORAGE_KEY);
        let is_dark = resolve(saved.as_deref(), os_prefers_dark) == Theme::Dark;
        Self { storage, is_dark, root }
    }

    pub fn is_dark(&self) -> bool {
        self.is_dark
    }

    pub fn root(&self) -> &RootClasses {
        &self.root
    }

    pub fn toggle(&mut self) {
        self.set(Theme::from_dark(!self.is_dark));
    }

    pub fn set(&mut self, theme: Theme) {
        self.is_dark = theme == Theme::Dark;
        self.root.apply(theme);
        if let Err(err) = self.storage.set_item(THEME_STORAGE_KEY, theme.as_str()) {
            warn!(error = %err, "could not persist theme");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> (tempfile::TempDir, Arc<LocalStorage>) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(LocalStorage::open(dir.path()).unwrap());
        (dir, storage)
    }

    #[test]
    fn bootstrap_uses_os_preference_and_persists_it() {
        let (_dir, storage) = storage();

        let root = bootstrap(&storage, false);

        assert_eq!(root.theme(), Some(Theme::Light));
        assert_eq!(storage.get_item(THEME_STORAGE_KEY).as_deref(), Some("light"));
    }

    #[test]
    fn saved_preference_beats_os_preference() {
        let (_dir, storage) = storage();
        storage.set_item(THEME_STORAGE_KEY, "light").unwrap();

        let root = bootstrap(&storage, true);
        let theme = ThemeState::new(storage.clone(), true, root);

        assert!(!theme.is_dark());
        assert!(theme.root().contains("light"));
        assert!(!theme.root().contains("dark"));
    }

    #[test]
    fn unrecognized_saved_value_falls_back_to_os_preference() {
        let (_dir, storage) = storage();
        storage.set_item(THEME_STORAGE_KEY, "blue").unwrap();

        let root = bootstrap(&storage, true);
        let mut theme = ThemeState::new(storage.clone(), true, root);

        assert!(theme.is_dark());
        assert!(theme.root().contains("dark"));

        theme.toggle();
        assert!(!theme.is_dark());
        assert_eq!(theme.root().theme(), Some(Theme::Light));
        assert_eq!(storage.get_item(THEME_STORAGE_KEY).as_deref(), Some("light"));
    }

    #[test]
    fn toggling_twice_restores_value_and_class() {
        let (_dir, storage) = storage();
        let root = bootstrap(&storage, true);
        let mut theme = ThemeState::new(storage.clone(), true, root.clone());
        let original = storage.get_item(THEME_STORAGE_KEY);

        theme.toggle();
        assert!(!theme.is_dark());
        assert_eq!(storage.get_item(THEME_STORAGE_KEY).as_deref(), Some("light"));
        assert_eq!(theme.root().theme(), Some(Theme::Light));

        theme.toggle();
        assert!(theme.is_dark());
        assert_eq!(storage.get_item(THEME_STORAGE_KEY), original);
        assert_eq!(theme.root(), &root);
    }

    #[test]
    fn set_replaces_class() {
        let (_dir, storage) = storage();
        let mut theme = ThemeState::new(storage.clone(), false, bootstrap(&storage, false));

        theme.set(Theme::Dark);

        assert!(theme.root().contains("dark"));
        assert!(!theme.root().contains("light"));
        assert_eq!(storage.get_item(THEME_STORAGE_KEY).as_deref(), Some("dark"));
    }

    #[test]
    fn colorfgbg_background_is_classified() {
        assert_eq!(background_is_dark("15;0"), Some(true));
        assert_eq!(background_is_dark("0;15"), Some(false));
        assert_eq!(background_is_dark("12;default;8"), Some(true));
        assert_eq!(background_is_dark("garbage"), None);
    }
}
