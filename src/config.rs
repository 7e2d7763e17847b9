//! Client identity and behaviour settings.
//!
//! Server capabilities are learned from 005 at runtime and are not part of
//! this configuration. With the `serde` feature a config can be loaded from
//! TOML; omitted fields take their defaults.

use std::time::Duration;

use crate::error::ConfigError;

fn default_nickname() -> String {
    "slirc".to_string()
}

fn default_username() -> String {
    "slirc".to_string()
}

fn default_realname() -> String {
    "slirc-client".to_string()
}

fn default_ping_interval() -> u64 {
    120
}

fn default_ping_timeout() -> u64 {
    60
}

/// Settings for one connection.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClientConfig {
    /// Preferred nickname.
    pub nickname: String,
    /// Second choice when the first is taken during registration.
    pub alt_nickname: Option<String>,
    /// Ident sent in USER.
    pub username: String,
    /// Real name sent in USER.
    pub realname: String,
    /// Server password sent with PASS.
    pub password: Option<String>,
    /// Seconds of silence before we send our own PING.
    pub ping_interval: u64,
    /// Seconds to wait for the PONG before giving up on the connection.
    pub ping_timeout: u64,
    /// Ask for the channel's list modes right after joining.
    pub request_list_modes_on_join: bool,
    /// List-mode letters to request; every list mode in the mode table when unset.
    pub list_mode_chars: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            nickname: default_nickname(),
            alt_nickname: None,
            username: default_username(),
            realname: default_realname(),
            password: None,
            ping_interval: default_ping_interval(),
            ping_timeout: default_ping_timeout(),
            request_list_modes_on_join: false,
            list_mode_chars: None,
        }
    }
}

impl ClientConfig {
    /// Config with a nickname and defaults for everything else.
    pub fn new(nickname: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            ..Self::default()
        }
    }

    /// Ping interval as a duration.
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval)
    }

    /// Ping timeout as a duration.
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout)
    }

    /// Reject settings the protocol cannot carry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nickname.is_empty() {
            return Err(ConfigError::EmptyNickname);
        }
        for nick in std::iter::once(&self.nickname).chain(self.alt_nickname.as_ref()) {
            if !is_sendable_nick(nick) {
                return Err(ConfigError::InvalidNickname(nick.clone()));
            }
        }
        if self.username.is_empty() {
            return Err(ConfigError::EmptyUsername);
        }
        if self.ping_timeout == 0 {
            return Err(ConfigError::ZeroPingTimeout);
        }
        Ok(())
    }

    /// Load and validate a TOML document.
    #[cfg(feature = "serde")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// Nicknames may not contain separators or start with a digit, `-`, `:` or `#`.
fn is_sendable_nick(nick: &str) -> bool {
    let Some(first) = nick.chars().next() else {
        return false;
    };
    if first.is_ascii_digit() || matches!(first, '-' | ':' | '#' | '&') {
        return false;
    }
    !nick
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, ',' | '!' | '@' | '*' | '?'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ClientConfig::default().validate().is_ok());
        assert_eq!(ClientConfig::default().ping_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_validation_errors() {
        assert_eq!(ClientConfig::new("").validate(), Err(ConfigError::EmptyNickname));
        assert_eq!(
            ClientConfig::new("bad nick").validate(),
            Err(ConfigError::InvalidNickname("bad nick".to_string()))
        );
        assert_eq!(
            ClientConfig::new("9lives").validate(),
            Err(ConfigError::InvalidNickname("9lives".to_string()))
        );

        let mut config = ClientConfig::new("ok");
        config.alt_nickname = Some("a,b".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::InvalidNickname(_))));

        let mut config = ClientConfig::new("ok");
        config.username.clear();
        assert_eq!(config.validate(), Err(ConfigError::EmptyUsername));

        let mut config = ClientConfig::new("ok");
        config.ping_timeout = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroPingTimeout));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_toml() {
        let config = ClientConfig::from_toml_str(
            r#"
            nickname = "rustbot"
            alt_nickname = "rustbot_"
            ping_interval = 30
            request_list_modes_on_join = true
            "#,
        )
        .unwrap();
        assert_eq!(config.nickname, "rustbot");
        assert_eq!(config.alt_nickname.as_deref(), Some("rustbot_"));
        assert_eq!(config.username, "slirc");
        assert_eq!(config.ping_interval(), Duration::from_secs(30));
        assert!(config.request_list_modes_on_join);

        assert!(matches!(
            ClientConfig::from_toml_str("nickname = 5"),
            Err(ConfigError::Parse(_))
        ));
        assert_eq!(
            ClientConfig::from_toml_str("nickname = \"\""),
            Err(ConfigError::EmptyNickname)
        );
    }
}
