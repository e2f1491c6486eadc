//! Chatter Engine: Markov chatter for chat communities.
//!
//! Learns word-pair transitions from short chat messages and produces new
//! messages by random walk, followed by a cleanup pass that repairs the
//! brackets, quotes and edge punctuation that naive token joining breaks.

pub mod core;
pub mod schema;
