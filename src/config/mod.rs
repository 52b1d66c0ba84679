use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Result};
use dotenvy::dotenv;
use serde::Deserialize;

const DEFAULT_AUTH_READY_TIMEOUT_MS: u64 = 3000;
const APP_DIR_NAME: &str = "agenda_manager";

/// Raw environment as seen by `envy`; each backend setting has three
/// accepted names, checked in declaration order.
#[derive(Debug, Default, Deserialize)]
struct EnvVars {
    nuxt_public_supabase_url: Option<String>,
    supabase_url: Option<String>,
    vite_supabase_url: Option<String>,
    nuxt_public_supabase_anon_key: Option<String>,
    supabase_anon_key: Option<String>,
    vite_supabase_anon_key: Option<String>,
    agenda_data_dir: Option<PathBuf>,
    agenda_auth_ready_timeout_ms: Option<u64>,
}

/// Configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    supabase_url: String,
    supabase_anon_key: String,
    data_dir: PathBuf,
    auth_ready_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Variables from a `.env` file are loaded first if one exists.
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let vars = envy::from_env::<EnvVars>()?;
        Self::resolve(vars)
    }

    fn resolve(vars: EnvVars) -> Result<Self> {
        let Some(supabase_url) = first_set([
            vars.nuxt_public_supabase_url,
            vars.supabase_url,
            vars.vite_supabase_url,
        ]) else {
            bail!("URL do Supabase não configurada (NUXT_PUBLIC_SUPABASE_URL, SUPABASE_URL ou VITE_SUPABASE_URL)");
        };

        let Some(supabase_anon_key) = first_set([
            vars.nuxt_public_supabase_anon_key,
            vars.supabase_anon_key,
            vars.vite_supabase_anon_key,
        ]) else {
            bail!(
                "Chave pública do Supabase não configurada (NUXT_PUBLIC_SUPABASE_ANON_KEY, SUPABASE_ANON_KEY ou VITE_SUPABASE_ANON_KEY)"
            );
        };

        let data_dir = vars.agenda_data_dir.unwrap_or_else(default_data_dir);
        let auth_ready_timeout = Duration::from_millis(
            vars.agenda_auth_ready_timeout_ms
                .unwrap_or(DEFAULT_AUTH_READY_TIMEOUT_MS),
        );

        Ok(Self {
            supabase_url,
            supabase_anon_key,
            data_dir,
            auth_ready_timeout,
        })
    }

    pub fn supabase_url(&self) -> &str {
        &self.supabase_url
    }

    pub fn supabase_anon_key(&self) -> &str {
        &self.supabase_anon_key
    }

    /// Directory holding local storage and logs.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn auth_ready_timeout(&self) -> Duration {
        self.auth_ready_timeout
    }

    pub fn set_data_dir(&mut self, dir: PathBuf) {
        self.data_dir = dir;
    }
}

fn first_set<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(format!(".{APP_DIR_NAME}")))
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    Config::load()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars = envy::from_iter::<_, EnvVars>(
            pairs
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string())),
        )?;
        Config::resolve(vars)
    }

    #[test]
    fn first_name_wins() {
        let config = from_pairs(&[
            ("VITE_SUPABASE_URL", "https://vite.supabase.co"),
            ("NUXT_PUBLIC_SUPABASE_URL", "https://nuxt.supabase.co"),
            ("SUPABASE_URL", "https://plain.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
        ])
        .unwrap();
        assert_eq!(config.supabase_url(), "https://nuxt.supabase.co");
        assert_eq!(config.supabase_anon_key(), "anon");
    }

    #[test]
    fn falls_through_to_last_alternative() {
        let config = from_pairs(&[
            ("SUPABASE_URL", "  "),
            ("VITE_SUPABASE_URL", "https://vite.supabase.co"),
            ("VITE_SUPABASE_ANON_KEY", "vite-anon"),
        ])
        .unwrap();
        assert_eq!(config.supabase_url(), "https://vite.supabase.co");
        assert_eq!(config.supabase_anon_key(), "vite-anon");
        assert_eq!(config.auth_ready_timeout(), Duration::from_millis(3000));
    }

    #[test]
    fn missing_key_names_accepted_variables() {
        let err = from_pairs(&[("SUPABASE_URL", "https://plain.supabase.co")]).unwrap_err();
        assert!(err.to_string().contains("SUPABASE_ANON_KEY"));
    }

    #[test]
    fn optional_settings_are_read() {
        let config = from_pairs(&[
            ("SUPABASE_URL", "https://plain.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("AGENDA_DATA_DIR", "/tmp/agenda"),
            ("AGENDA_AUTH_READY_TIMEOUT_MS", "500"),
        ])
        .unwrap();
        assert_eq!(config.data_dir(), Path::new("/tmp/agenda"));
        assert_eq!(config.auth_ready_timeout(), Duration::from_millis(500));
    }
}
