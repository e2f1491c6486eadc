/// The chatter pipeline: message → collection → reply decision → text.
///
/// Wires together per-scope configuration, the collected text log, the
/// shared Markov chain, mention redaction and state persistence.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::core::markov::{MarkovChain, MarkovError};
use crate::core::mentions::redact_mentions;
use crate::core::shared::SharedChain;
use crate::schema::config::{ConfigError, EngineConfig, ScopeConfig};
use crate::schema::corpus::{CorpusItem, StoredText, TextSource, Weight};
use crate::schema::ids::{ChannelId, MessageId, ScopeId, UserId};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("markov error: {0}")]
    Markov(#[from] MarkovError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("failed to persist state file: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("unknown scope: {0:?}")]
    UnknownScope(ScopeId),
}

/// A chat message as seen by the host.
#[derive(Debug, Clone, Copy)]
pub struct IncomingMessage<'a> {
    pub scope: ScopeId,
    pub channel: ChannelId,
    pub author: UserId,
    pub message_id: MessageId,
    pub content: &'a str,
    pub author_is_bot: bool,
    /// The message mentions the engine's own user.
    pub mentions_bot: bool,
    /// The host is allowed to post in `channel`.
    pub can_send: bool,
}

/// Text the host should deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub scope: ScopeId,
    pub content: String,
    /// Set when the bot was mentioned; deliver as a reply to this message.
    pub reply_to: Option<MessageId>,
    pub webhook: Option<String>,
    /// Suggested typing delay before delivery.
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeStats {
    pub texts: usize,
    pub keys: usize,
}

/// Everything the engine keeps for one community.
#[derive(Debug)]
pub struct ScopeState {
    pub config: ScopeConfig,
    texts: Vec<StoredText>,
    chain: Arc<SharedChain>,
    last_send_ms: Option<u64>,
}

impl ScopeState {
    fn new(config: ScopeConfig) -> Self {
        Self {
            config,
            texts: Vec::new(),
            chain: Arc::new(SharedChain::default()),
            last_send_ms: None,
        }
    }

    fn add_text(&mut self, text: StoredText) {
        self.chain.learn(&text.text, i64::from(text.weight.get()));
        self.texts.push(text);
    }

    fn rebuild(&self) {
        self.chain.replace(self.texts.iter().map(CorpusItem::from));
    }

    pub fn texts(&self) -> &[StoredText] {
        &self.texts
    }

    pub fn stats(&self) -> ScopeStats {
        ScopeStats {
            texts: self.texts.len(),
            keys: self.chain.key_count(),
        }
    }
}

/// On-disk form of a scope.
#[derive(Debug, Serialize, Deserialize)]
struct ScopeRecord {
    #[serde(default)]
    config: ScopeConfig,
    #[serde(default)]
    texts: Vec<StoredText>,
    #[serde(default)]
    chain: MarkovChain,
}

/// The top-level chatter engine. Built via `ChatterEngine::builder()`.
pub struct ChatterEngine {
    config: EngineConfig,
    scopes: BTreeMap<ScopeId, ScopeState>,
    rng: StdRng,
}

/// Builder for constructing a `ChatterEngine`.
pub struct ChatterEngineBuilder {
    seed: u64,
    config_path: Option<String>,
    state_path: Option<String>,
    /// Directly provided config (for testing without files).
    config: Option<EngineConfig>,
}

impl ChatterEngine {
    pub fn builder() -> ChatterEngineBuilder {
        ChatterEngineBuilder {
            seed: 0,
            config_path: None,
            state_path: None,
            config: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handle one channel message: maybe learn it, maybe answer it.
    ///
    /// `now_ms` is the host's clock in milliseconds and drives the cooldowns.
    pub fn observe(&mut self, message: &IncomingMessage<'_>, now_ms: u64) -> Option<Reply> {
        if message.author_is_bot || message.content.trim().is_empty() {
            return None;
        }

        let Self { config, scopes, rng } = self;
        let scope = scopes
            .entry(message.scope)
            .or_insert_with(|| ScopeState::new(config.scope_defaults.clone()));

        if scope.config.banned || !scope.config.active {
            return None;
        }
        if scope.config.channel != Some(message.channel) || !message.can_send {
            return None;
        }

        let texts_before = scope.texts.len();
        if roll(rng, scope.config.collection_probability) && scope.config.is_tracked(message.author) {
            scope.add_text(StoredText {
                text: message.content.to_string(),
                author: message.author,
                message_id: message.message_id,
                weight: Weight::ONE,
                source: TextSource::Channel,
            });
            tracing::debug!(scope = message.scope.0, "collected message");
        }

        if texts_before < config.min_texts {
            tracing::debug!(scope = message.scope.0, texts = texts_before, "not enough texts to speak");
            return None;
        }

        let mut send_probability = scope.config.sending_probability;
        let mut last_send = scope.last_send_ms;
        if message.mentions_bot && elapsed(last_send, now_ms, config.mention_cooldown_ms) {
            send_probability = scope.config.reply_probability;
            last_send = None;
        }

        let will_respond =
            roll(rng, send_probability) && elapsed(last_send, now_ms, config.send_cooldown_ms);
        if !will_respond {
            return None;
        }
        scope.last_send_ms = Some(now_ms);

        let low = config.min_words.min(config.max_words);
        let high = config.min_words.max(config.max_words);
        let max_tokens = rng.gen_range(low..=high);
        let generated = scope.chain.generate(rng, max_tokens);
        let content = redact_mentions(&generated, &scope.config.disabled_mentions);
        if content.trim().is_empty() {
            tracing::debug!(scope = message.scope.0, "generation produced nothing");
            return None;
        }

        let (delay_low, delay_high) = config.typing_delay_ms;
        let delay_ms = if delay_high > delay_low {
            rng.gen_range(delay_low..=delay_high)
        } else {
            delay_low
        };

        tracing::info!(scope = message.scope.0, max_tokens, "sending generated message");
        Some(Reply {
            scope: message.scope,
            content,
            reply_to: message.mentions_bot.then_some(message.message_id),
            webhook: scope.config.webhook.clone(),
            delay_ms,
        })
    }

    /// Learn a direct message into every scope that opted the author in.
    ///
    /// Returns the number of scopes that learned it.
    pub fn learn_direct(&mut self, author: UserId, message_id: MessageId, text: &str) -> usize {
        if text.trim().is_empty() {
            return 0;
        }

        let mut learned = 0;
        for (id, scope) in self.scopes.iter_mut() {
            let Some(&weight) = scope.config.dm_learners.get(&author) else {
                continue;
            };
            scope.add_text(StoredText {
                text: text.to_string(),
                author,
                message_id,
                weight,
                source: TextSource::Dm,
            });
            tracing::info!(scope = id.0, user = author.0, weight = weight.get(), "learned direct message");
            learned += 1;
        }
        learned
    }

    /// Generate for a scope outside the reply flow, with mentions redacted.
    pub fn generate(&mut self, scope: ScopeId, max_tokens: usize) -> Result<String, PipelineError> {
        let state = self.scopes.get(&scope).ok_or(PipelineError::UnknownScope(scope))?;
        let generated = state.chain.generate(&mut self.rng, max_tokens);
        Ok(redact_mentions(&generated, &state.config.disabled_mentions))
    }

    /// Record a text and learn it immediately. Creates the scope if needed.
    pub fn add_text(&mut self, scope: ScopeId, text: StoredText) {
        self.scope_entry(scope).add_text(text);
    }

    /// Replace a scope's text log and rebuild its chain from it.
    pub fn rescan(&mut self, scope: ScopeId, texts: Vec<StoredText>) {
        let state = self.scope_entry(scope);
        state.texts = texts;
        state.rebuild();
        tracing::info!(scope = scope.0, texts = state.texts.len(), keys = state.chain.key_count(), "rescanned scope");
    }

    /// Rebuild a scope's chain from its stored text log.
    pub fn rebuild(&mut self, scope: ScopeId) -> Result<ScopeStats, PipelineError> {
        let state = self.scopes.get(&scope).ok_or(PipelineError::UnknownScope(scope))?;
        state.rebuild();
        tracing::info!(scope = scope.0, keys = state.chain.key_count(), "rebuilt chain");
        Ok(state.stats())
    }

    /// Discard a scope's chain and its text log. Settings are kept.
    pub fn clear_scope(&mut self, scope: ScopeId) -> Result<(), PipelineError> {
        let state = self.scopes.get_mut(&scope).ok_or(PipelineError::UnknownScope(scope))?;
        state.texts.clear();
        state.chain.clear();
        tracing::info!(scope = scope.0, "cleared texts and chain");
        Ok(())
    }

    /// Discard a scope's chain. The text log is kept, so `rebuild` restores it.
    /// Use `clear_scope` to forget the texts too.
    pub fn clear_chain(&mut self, scope: ScopeId) -> Result<(), PipelineError> {
        let state = self.scopes.get(&scope).ok_or(PipelineError::UnknownScope(scope))?;
        state.chain.clear();
        tracing::info!(scope = scope.0, "cleared chain");
        Ok(())
    }

    pub fn stats(&self, scope: ScopeId) -> Result<ScopeStats, PipelineError> {
        self.scopes
            .get(&scope)
            .map(ScopeState::stats)
            .ok_or(PipelineError::UnknownScope(scope))
    }

    /// A handle to a scope's chain for generating from other threads.
    pub fn chain(&self, scope: ScopeId) -> Result<Arc<SharedChain>, PipelineError> {
        self.scopes
            .get(&scope)
            .map(|state| Arc::clone(&state.chain))
            .ok_or(PipelineError::UnknownScope(scope))
    }

    pub fn scope(&self, scope: ScopeId) -> Option<&ScopeState> {
        self.scopes.get(&scope)
    }

    /// Mutable settings for a scope. Creates the scope with defaults if needed.
    pub fn config_mut(&mut self, scope: ScopeId) -> &mut ScopeConfig {
        &mut self.scope_entry(scope).config
    }

    fn scope_entry(&mut self, scope: ScopeId) -> &mut ScopeState {
        let defaults = &self.config.scope_defaults;
        self.scopes
            .entry(scope)
            .or_insert_with(|| ScopeState::new(defaults.clone()))
    }

    /// Write every scope's config, text log and chain to a RON file atomically.
    pub fn save_state(&self, path: &Path) -> Result<(), PipelineError> {
        let records: BTreeMap<ScopeId, ScopeRecord> = self
            .scopes
            .iter()
            .map(|(id, state)| {
                let record = ScopeRecord {
                    config: state.config.clone(),
                    texts: state.texts.clone(),
                    chain: (*state.chain.snapshot()).clone(),
                };
                (*id, record)
            })
            .collect();

        let serialized = ron::ser::to_string_pretty(&records, ron::ser::PrettyConfig::default())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        write_atomic(path, serialized.as_bytes())?;
        tracing::info!(path = %path.display(), scopes = records.len(), "saved engine state");
        Ok(())
    }
}

impl ChatterEngineBuilder {
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Load engine settings from a RON file if it exists.
    pub fn config_path(mut self, path: &str) -> Self {
        self.config_path = Some(path.to_string());
        self
    }

    /// Load saved scopes from a RON state file if it exists.
    pub fn state_path(mut self, path: &str) -> Self {
        self.state_path = Some(path.to_string());
        self
    }

    /// Provide settings directly (for testing without files).
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<ChatterEngine, PipelineError> {
        let mut config = self.config.unwrap_or_default();
        if let Some(ref path) = self.config_path {
            if Path::new(path).exists() {
                config = EngineConfig::load_from_ron(Path::new(path))?;
            }
        }

        let mut scopes = BTreeMap::new();
        if let Some(ref path) = self.state_path {
            if Path::new(path).exists() {
                scopes = load_state(Path::new(path))?;
                tracing::info!(path = %path, scopes = scopes.len(), "loaded engine state");
            }
        }

        Ok(ChatterEngine {
            config,
            scopes,
            rng: StdRng::seed_from_u64(self.seed),
        })
    }
}

/// `rng.gen::<f64>()` is in `[0, 1)`, so 1.0 always passes and 0.0 never does.
fn roll<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    rng.gen::<f64>() < probability
}

fn elapsed(last: Option<u64>, now_ms: u64, cooldown_ms: u64) -> bool {
    match last {
        Some(last) => last.saturating_add(cooldown_ms) < now_ms,
        None => true,
    }
}

fn load_state(path: &Path) -> Result<BTreeMap<ScopeId, ScopeState>, PipelineError> {
    let contents = std::fs::read_to_string(path)?;
    let records: BTreeMap<ScopeId, ScopeRecord> = ron::from_str(&contents)?;
    Ok(records
        .into_iter()
        .map(|(id, record)| {
            let state = ScopeState {
                config: record.config,
                texts: record.texts,
                chain: Arc::new(SharedChain::new(record.chain)),
                last_send_ms: None,
            };
            (id, state)
        })
        .collect())
}

/// Write through a temp file in the destination directory, then rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}
