use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

/// Flat key/value credential bundle, looked up by name.
#[derive(Debug, Clone, Default)]
pub struct SecretBundle(HashMap<String, String>);

impl SecretBundle {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let values: HashMap<String, String> = serde_json::from_str(raw)?;
        Ok(Self(values))
    }
}

/// Cookies and login for the ESPN API. Public leagues need none of these.
#[derive(Debug, Clone, Default)]
pub struct EspnCredentials {
    pub espn_s2: Option<String>,
    pub swid: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// How requests to the league API will authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Cookies,
    /// A login was supplied without cookies; the API only accepts cookies, so requests go out unauthenticated.
    LoginWithoutCookies,
    Public,
}

impl EspnCredentials {
    pub fn auth_mode(&self) -> AuthMode {
        match (&self.espn_s2, &self.swid, &self.username, &self.password) {
            (Some(_), Some(_), _, _) => AuthMode::Cookies,
            (_, _, Some(_), Some(_)) => AuthMode::LoginWithoutCookies,
            _ => AuthMode::Public,
        }
    }
}

impl From<&SecretBundle> for EspnCredentials {
    fn from(bundle: &SecretBundle) -> Self {
        let owned = |key: &str| bundle.get(key).map(str::to_string);
        Self {
            espn_s2: owned("espn_s2"),
            swid: owned("espn_swid"),
            username: owned("espn_username"),
            password: owned("espn_password"),
        }
    }
}

pub struct SecretStore {
    dir: PathBuf,
}

impl SecretStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Reads `{dir}/{name}.json`; without that file, falls back to `ESPN_*` env vars.
    pub async fn load(&self, name: &str) -> Result<SecretBundle> {
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(anyhow!("Invalid secret name '{}'", name));
        }

        let path = self.dir.join(format!("{}.json", name));
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                tracing::debug!("Loaded secret bundle '{}' from {}", name, path.display());
                SecretBundle::from_json(&raw).with_context(|| format!("Malformed secret bundle {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No secret file for '{}', reading ESPN_* environment variables", name);
                Ok(Self::from_lookup(|var| env::var(var).ok()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> SecretBundle {
        let mut values = HashMap::new();
        for (key, var) in [
            ("espn_s2", "ESPN_S2"),
            ("espn_swid", "ESPN_SWID"),
            ("espn_username", "ESPN_USERNAME"),
            ("espn_password", "ESPN_PASSWORD"),
        ] {
            if let Some(value) = lookup(var) {
                values.insert(key.to_string(), value);
            }
        }
        SecretBundle(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_from_bundle() {
        let bundle = SecretBundle::from_json(r#"{"espn_s2": "abc", "espn_swid": "{XYZ}", "espn_password": ""}"#).unwrap();
        let creds = EspnCredentials::from(&bundle);

        assert_eq!(creds.espn_s2.as_deref(), Some("abc"));
        assert_eq!(creds.swid.as_deref(), Some("{XYZ}"));
        assert!(creds.username.is_none());
        assert!(creds.password.is_none()); // empty strings count as missing
    }

    #[tokio::test]
    async fn test_load_reads_named_file() {
        let dir = std::env::temp_dir().join(format!("outlook-secrets-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("work-league.json"), r#"{"espn_s2": "cookie"}"#).await.unwrap();

        let store = SecretStore::new(&dir);
        let bundle = store.load("work-league").await.unwrap();
        assert_eq!(bundle.get("espn_s2"), Some("cookie"));

        assert!(store.load("../escape").await.is_err());
        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[test]
    fn test_env_fallback_maps_variables() {
        let env: HashMap<&str, &str> = [("ESPN_S2", "env-cookie"), ("ESPN_SWID", "{ENV}"), ("ESPN_USERNAME", "")]
            .into_iter()
            .collect();
        let bundle = SecretStore::from_lookup(|var| env.get(var).map(|v| v.to_string()));

        let creds = EspnCredentials::from(&bundle);
        assert_eq!(creds.espn_s2.as_deref(), Some("env-cookie"));
        assert_eq!(creds.swid.as_deref(), Some("{ENV}"));
        assert!(creds.username.is_none());
        assert_eq!(creds.auth_mode(), AuthMode::Cookies);
    }

    #[tokio::test]
    async fn test_missing_file_falls_back_without_error() {
        let dir = std::env::temp_dir().join(format!("outlook-secrets-{}", uuid::Uuid::new_v4()));
        assert!(SecretStore::new(&dir).load("not-written").await.is_ok());
    }

    #[test]
    fn test_auth_mode() {
        let login = EspnCredentials {
            username: Some("me".into()),
            password: Some("pw".into()),
            ..Default::default()
        };
        assert_eq!(login.auth_mode(), AuthMode::LoginWithoutCookies);

        let half = EspnCredentials {
            espn_s2: Some("abc".into()),
            ..Default::default()
        };
        assert_eq!(half.auth_mode(), AuthMode::Public);
    }
}
