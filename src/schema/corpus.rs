/// Corpus items: what the ingestor accepts and what a scope keeps on record.
use serde::{Deserialize, Deserializer, Serialize};

use super::ids::{MessageId, UserId};

/// Repetition factor applied when a text is learned. Always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Weight(u32);

impl Weight {
    pub const ONE: Weight = Weight(1);

    /// Clamp a raw integer weight into range. Non-positive input becomes 1.
    pub fn new(raw: i64) -> Self {
        Self(raw.clamp(1, i64::from(u32::MAX)) as u32)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for Weight {
    fn default() -> Self {
        Self::ONE
    }
}

impl From<i64> for Weight {
    fn from(raw: i64) -> Self {
        Self::new(raw)
    }
}

/// Weights arrive from hand-edited corpus files, so anything that is not a
/// usable integer falls back to 1 instead of failing the whole document.
impl<'de> Deserialize<'de> for Weight {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawWeight {
            Int(i64),
            Float(f64),
            Text(String),
            Other(serde::de::IgnoredAny),
        }

        Ok(match RawWeight::deserialize(deserializer)? {
            RawWeight::Int(n) => Weight::new(n),
            RawWeight::Float(f) => Weight::new(f as i64),
            RawWeight::Text(s) => s.trim().parse::<i64>().map(Weight::new).unwrap_or(Weight::ONE),
            RawWeight::Other(_) => Weight::ONE,
        })
    }
}

/// One unit of training input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CorpusItem {
    /// Bare text, learned once.
    PlainText(String),
    /// Text learned `weight` times.
    WeightedText {
        #[serde(default)]
        text: String,
        #[serde(default)]
        weight: Weight,
    },
}

/// A stray number or flag in a corpus list is learned as its text. Anything
/// else that is neither text nor a record becomes an empty item, which learns
/// nothing, so one bad entry never costs the rest of the list.
impl<'de> Deserialize<'de> for CorpusItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawItem {
            Text(String),
            Weighted {
                #[serde(default)]
                text: String,
                #[serde(default)]
                weight: Weight,
            },
            Int(i64),
            Float(f64),
            Bool(bool),
            Other(serde::de::IgnoredAny),
        }

        Ok(match RawItem::deserialize(deserializer)? {
            RawItem::Text(text) => Self::PlainText(text),
            RawItem::Weighted { text, weight } => Self::WeightedText { text, weight },
            RawItem::Int(n) => Self::PlainText(n.to_string()),
            RawItem::Float(f) => Self::PlainText(f.to_string()),
            RawItem::Bool(b) => Self::PlainText(b.to_string()),
            RawItem::Other(_) => Self::PlainText(String::new()),
        })
    }
}

impl CorpusItem {
    pub fn weighted(text: impl Into<String>, weight: i64) -> Self {
        Self::WeightedText {
            text: text.into(),
            weight: Weight::new(weight),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::PlainText(text) => text,
            Self::WeightedText { text, .. } => text,
        }
    }

    pub fn weight(&self) -> Weight {
        match self {
            Self::PlainText(_) => Weight::ONE,
            Self::WeightedText { weight, .. } => *weight,
        }
    }
}

impl From<&str> for CorpusItem {
    fn from(text: &str) -> Self {
        Self::PlainText(text.to_string())
    }
}

impl From<String> for CorpusItem {
    fn from(text: String) -> Self {
        Self::PlainText(text)
    }
}

/// Where a collected text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TextSource {
    #[default]
    Channel,
    Dm,
}

/// A collected message kept in a scope's text log so its chain can be rebuilt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredText {
    pub text: String,
    pub author: UserId,
    pub message_id: MessageId,
    #[serde(default)]
    pub weight: Weight,
    #[serde(default)]
    pub source: TextSource,
}

impl From<&StoredText> for CorpusItem {
    fn from(stored: &StoredText) -> Self {
        Self::WeightedText {
            text: stored.text.clone(),
            weight: stored.weight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_clamps_non_positive() {
        assert_eq!(Weight::new(0).get(), 1);
        assert_eq!(Weight::new(-7).get(), 1);
        assert_eq!(Weight::new(4).get(), 4);
    }

    #[test]
    fn plain_text_has_unit_weight() {
        let item = CorpusItem::from("hello there friend");
        assert_eq!(item.weight(), Weight::ONE);
        assert_eq!(item.text(), "hello there friend");
    }

    #[test]
    fn corpus_list_parses_mixed_items() {
        let items: Vec<CorpusItem> =
            ron::from_str(r#"["plain words here", (text: "weighted words here", weight: 3)]"#)
                .unwrap();
        assert_eq!(items[0], CorpusItem::from("plain words here"));
        assert_eq!(items[1], CorpusItem::weighted("weighted words here", 3));
    }

    #[test]
    fn malformed_weights_fall_back_to_one() {
        let items: Vec<CorpusItem> = ron::from_str(
            r#"[(text: "a b c", weight: -2), (text: "d e f", weight: "lots"), (text: "g h i", weight: "2")]"#,
        )
        .unwrap();
        let weights: Vec<u32> = items.iter().map(|i| i.weight().get()).collect();
        assert_eq!(weights, vec![1, 1, 2]);
    }

    #[test]
    fn stray_scalars_are_coerced_to_text() {
        let items: Vec<CorpusItem> =
            ron::from_str(r#"[42, "the quick fox jumps", true, 2.5, ()]"#).unwrap();
        let texts: Vec<&str> = items.iter().map(CorpusItem::text).collect();
        assert_eq!(texts, vec!["42", "the quick fox jumps", "true", "2.5", ""]);
        assert!(items.iter().all(|i| i.weight() == Weight::ONE));
    }
}
