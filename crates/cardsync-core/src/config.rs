//! Bridge configuration.
//!
//! One immutable [`BridgeConfig`] is built at startup and passed by
//! reference into the engine; nothing reads the environment after that.
//! Missing required settings refuse startup rather than surfacing later
//! as data faults.

use secrecy::SecretString;

pub const ENV_MASTER_CHECKLIST_ID: &str = "CARDSYNC_MASTER_CHECKLIST_ID";
pub const ENV_MASTER_CARD_ID: &str = "CARDSYNC_MASTER_CARD_ID";
pub const ENV_SUB_CHECKLIST_NAME: &str = "CARDSYNC_SUB_CHECKLIST_NAME";
pub const ENV_TRELLO_API_KEY: &str = "CARDSYNC_TRELLO_API_KEY";
pub const ENV_TRELLO_API_TOKEN: &str = "CARDSYNC_TRELLO_API_TOKEN";
pub const ENV_PORT: &str = "CARDSYNC_PORT";

const DEFAULT_PORT: u16 = 3000;

#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Immutable bridge settings.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// The single aggregating checklist that mirrors all tracked subs.
    pub master_checklist_id: String,
    /// Card the master checklist lives on.
    pub master_card_id: String,
    /// Checklists with this name (case-insensitive) are tracked subs.
    pub sub_checklist_name: String,
    pub api_key: SecretString,
    pub api_token: SecretString,
    /// Port for the webhook HTTP surface.
    pub port: u16,
}

impl BridgeConfig {
    /// Load from `CARDSYNC_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary lookup function. The seam the tests use
    /// instead of mutating process-wide environment state.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let require = |key: &'static str| -> Result<String, ConfigError> {
            match lookup(key) {
                Some(v) if !v.trim().is_empty() => Ok(v),
                _ => Err(ConfigError::Missing(key)),
            }
        };

        let port = match lookup(ENV_PORT) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: ENV_PORT,
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            master_checklist_id: require(ENV_MASTER_CHECKLIST_ID)?,
            master_card_id: require(ENV_MASTER_CARD_ID)?,
            sub_checklist_name: require(ENV_SUB_CHECKLIST_NAME)?,
            api_key: SecretString::from(require(ENV_TRELLO_API_KEY)?),
            api_token: SecretString::from(require(ENV_TRELLO_API_TOKEN)?),
            port,
        })
    }

    pub fn is_master_checklist(&self, checklist_id: &str) -> bool {
        self.master_checklist_id == checklist_id
    }

    pub fn is_master_card(&self, card_id: &str) -> bool {
        self.master_card_id == card_id
    }

    /// Case-insensitive match on the tracked sub-checklist name.
    pub fn is_tracked_sub_name(&self, checklist_name: &str) -> bool {
        self.sub_checklist_name.eq_ignore_ascii_case(checklist_name)
    }
}
