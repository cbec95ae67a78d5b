//! Turns arbitrary advisory payloads into a [`PresentationTree`].
//!
//! Payloads arrive as native JSON, as JSON encoded inside a string, or as
//! free text. Strings become leaves through a [`TextParser`]; mappings and
//! sequences become sections, recursively, in payload order.

use serde_json::Value;

use crate::json_like::JsonLike;
use crate::tree::{Leaf, PresentationTree, Section};

/// Splits a free-text line into a leaf.
pub trait TextParser {
    fn parse(&self, text: &str) -> Leaf;
}

impl<F> TextParser for F
where
    F: Fn(&str) -> Leaf,
{
    fn parse(&self, text: &str) -> Leaf {
        self(text)
    }
}

/// Default parser: title before the first colon, trimmed body after it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColonSplit;

impl TextParser for ColonSplit {
    fn parse(&self, text: &str) -> Leaf {
        split_on_colon(text)
    }
}

/// `"Soil Type: Loamy"` gives title `"Soil Type"` and description `"Loamy"`.
///
/// Without a colon the whole text is the title. A colon followed only by
/// whitespace also yields no description.
pub fn split_on_colon(text: &str) -> Leaf {
    match text.split_once(':') {
        Some((title, rest)) => {
            let rest = rest.trim();
            let description = (!rest.is_empty()).then(|| rest.to_string());
            Leaf::new(title, description)
        }
        None => Leaf::titled(text),
    }
}

/// Display label for a mapping key: underscores become spaces and every
/// word starts upper-case (`"soil_health_card"` → `"Soil Health Card"`).
pub fn format_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut in_word = false;
    for c in key.chars() {
        let c = if c == '_' { ' ' } else { c };
        let is_word = c.is_alphanumeric();
        if is_word && !in_word {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        in_word = is_word;
    }
    out
}

/// Keys made only of ASCII digits are positions, not labels.
pub fn is_ordinal_key(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

/// Normalizes payloads with a fixed text parser.
#[derive(Debug, Clone, Default)]
pub struct ResponseNormalizer<P = ColonSplit> {
    parser: P,
}

impl<P: TextParser> ResponseNormalizer<P> {
    pub fn new(parser: P) -> Self {
        Self { parser }
    }

    pub fn parser(&self) -> &P {
        &self.parser
    }

    /// Normalize a payload as received from the agent.
    ///
    /// A top-level string is first decoded as JSON; when that fails it is
    /// handed to the parser as plain text.
    pub fn normalize(&self, payload: &Value) -> PresentationTree {
        match payload {
            Value::String(text) => self.normalize_text(text),
            other => self.normalize_value(JsonLike::from(other)),
        }
    }

    /// Normalize text that may or may not be encoded JSON.
    pub fn normalize_text(&self, text: &str) -> PresentationTree {
        match JsonLike::parse(text) {
            Ok(decoded) => self.normalize_value(decoded),
            Err(e) => {
                tracing::debug!("Advisory text is not JSON ({}); parsing as plain text", e);
                PresentationTree::Leaf(self.parser.parse(text))
            }
        }
    }

    /// Normalize an already-decoded value. Strings are never decoded again.
    pub fn normalize_value(&self, value: JsonLike) -> PresentationTree {
        match value {
            JsonLike::String(text) => PresentationTree::Leaf(self.parser.parse(&text)),
            JsonLike::Mapping(entries) => self.normalize_mapping(entries),
            JsonLike::Sequence(items) => {
                let is_ordinal_group = !items.is_empty();
                let children = items
                    .into_iter()
                    .map(|item| self.normalize_value(item))
                    .collect();
                PresentationTree::section(None, children, is_ordinal_group)
            }
            scalar => PresentationTree::Leaf(Leaf::titled(
                scalar.scalar_text().unwrap_or_default(),
            )),
        }
    }

    fn normalize_mapping(&self, entries: Vec<(String, JsonLike)>) -> PresentationTree {
        let is_ordinal_group =
            !entries.is_empty() && entries.iter().all(|(key, _)| is_ordinal_key(key));

        let children = entries
            .into_iter()
            .map(|(key, value)| {
                let child = self.normalize_value(value);
                if is_ordinal_key(&key) {
                    child
                } else {
                    label_child(format_key(&key), child)
                }
            })
            .collect();

        PresentationTree::section(None, children, is_ordinal_group)
    }
}

// A keyed leaf is wrapped so the key is still shown above it
fn label_child(label: String, child: PresentationTree) -> PresentationTree {
    match child {
        PresentationTree::Section(section) => PresentationTree::Section(Section {
            label: Some(label),
            ..section
        }),
        leaf @ PresentationTree::Leaf(_) => {
            PresentationTree::section(Some(label), vec![leaf], false)
        }
    }
}

/// Normalize `payload` with `parser`.
pub fn normalize<P: TextParser>(payload: &Value, parser: P) -> PresentationTree {
    ResponseNormalizer::new(parser).normalize(payload)
}
