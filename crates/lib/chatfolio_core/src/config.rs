//! Session configuration for the NLU provider.

use std::path::PathBuf;

/// Default Dialogflow agent project.
pub const DEFAULT_PROJECT_ID: &str = "chatfolio-q9qs";
/// Default service-account key file, relative to the working directory.
pub const DEFAULT_CREDENTIALS_PATH: &str = "chatfolio-q9qs-b17009ca2aa1.json";
/// Default query language.
pub const DEFAULT_LANGUAGE_CODE: &str = "en";
/// Default IANA time zone used to resolve relative dates.
pub const DEFAULT_TIME_ZONE: &str = "America/New_York";

/// Per-process settings for talking to the provider.
///
/// Built once at startup and only read afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Provider project identifier.
    pub project_id: String,
    /// Path to the service-account JSON key.
    pub credentials_path: PathBuf,
    /// Language code sent with every text query (e.g. "en").
    pub language_code: String,
    /// Time zone sent with every query.
    pub time_zone: String,
}

impl SessionConfig {
    /// Resource path of a conversational session within the agent.
    pub fn session_path(&self, session_id: &str) -> String {
        format!(
            "projects/{}/agent/sessions/{}",
            self.project_id, session_id
        )
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            project_id: DEFAULT_PROJECT_ID.into(),
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_PATH),
            language_code: DEFAULT_LANGUAGE_CODE.into(),
            time_zone: DEFAULT_TIME_ZONE.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_path_includes_project_and_session() {
        let config = SessionConfig {
            project_id: "demo-project".into(),
            ..SessionConfig::default()
        };
        assert_eq!(
            config.session_path("abc123"),
            "projects/demo-project/agent/sessions/abc123"
        );
    }

    #[test]
    fn defaults_match_deployed_agent() {
        let config = SessionConfig::default();
        assert_eq!(config.project_id, "chatfolio-q9qs");
        assert_eq!(config.language_code, "en");
        assert_eq!(
            config.credentials_path,
            PathBuf::from("chatfolio-q9qs-b17009ca2aa1.json")
        );
    }
}
