/// Engine and per-scope configuration, loadable from RON.
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::corpus::Weight;
use super::ids::{ChannelId, UserId};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Settings for one community.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// Master switch for collecting and speaking.
    pub active: bool,
    pub banned: bool,
    /// The only channel the engine listens to and speaks in.
    pub channel: Option<ChannelId>,
    /// Delivery webhook handed back to the host with each reply.
    pub webhook: Option<String>,
    /// 0.0..1.0 chance of speaking after an eligible message.
    pub sending_probability: f64,
    /// 0.0..1.0 chance of learning an eligible message.
    pub collection_probability: f64,
    /// Replaces `sending_probability` when the bot is mentioned.
    pub reply_probability: f64,
    /// Users whose messages are never collected.
    pub untracked_users: FxHashSet<UserId>,
    /// Users whose mentions are blanked from generated text.
    pub disabled_mentions: FxHashSet<UserId>,
    /// Users whose direct messages are learned, with their weight.
    pub dm_learners: FxHashMap<UserId, Weight>,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            active: true,
            banned: false,
            channel: None,
            webhook: None,
            sending_probability: 0.10,
            collection_probability: 0.50,
            reply_probability: 0.80,
            untracked_users: FxHashSet::default(),
            disabled_mentions: FxHashSet::default(),
            dm_learners: FxHashMap::default(),
        }
    }
}

impl ScopeConfig {
    pub fn is_tracked(&self, user: UserId) -> bool {
        !self.untracked_users.contains(&user)
    }
}

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Collected texts a scope needs before it may speak.
    pub min_texts: usize,
    /// Inclusive bounds for the token budget of one generation.
    pub min_words: usize,
    pub max_words: usize,
    pub send_cooldown_ms: u64,
    /// Time after the last send before a mention unlocks the reply probability.
    pub mention_cooldown_ms: u64,
    /// (min, max) suggested typing delay before delivery.
    pub typing_delay_ms: (u64, u64),
    /// Copied into every newly seen scope.
    pub scope_defaults: ScopeConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_texts: 5,
            min_words: 5,
            max_words: 40,
            send_cooldown_ms: 15_000,
            mention_cooldown_ms: 1_000,
            typing_delay_ms: (5_000, 10_000),
            scope_defaults: ScopeConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load engine settings from a RON file. Missing fields take defaults.
    pub fn load_from_ron(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: EngineConfig = ron::from_str(&contents)?;
        Ok(config)
    }
}
