//! Display-agnostic hierarchy produced by the normalizer.

use std::fmt;

use serde::Serialize;

/// Terminal displayable unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Leaf {
    pub title: String,
    /// `None` when the source text had no delimited body
    pub description: Option<String>,
}

impl Leaf {
    pub fn new(title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            title: title.into(),
            description,
        }
    }

    pub fn titled(title: impl Into<String>) -> Self {
        Self::new(title, None)
    }

    /// Plain-text form, `"title: description"` or just the title.
    pub fn to_text(&self) -> String {
        match &self.description {
            Some(description) => format!("{}: {}", self.title, description),
            None => self.title.clone(),
        }
    }
}

/// Group of child nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// Absent when the originating key was an ordinal index
    pub label: Option<String>,
    pub children: Vec<PresentationTree>,
    /// Child order matters but children carry no meaningful labels
    pub is_ordinal_group: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PresentationTree {
    Leaf(Leaf),
    Section(Section),
}

impl PresentationTree {
    pub fn leaf(title: impl Into<String>, description: Option<String>) -> Self {
        Self::Leaf(Leaf::new(title, description))
    }

    pub fn section(
        label: Option<String>,
        children: Vec<PresentationTree>,
        is_ordinal_group: bool,
    ) -> Self {
        Self::Section(Section {
            label,
            children,
            is_ordinal_group,
        })
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Self::Leaf(leaf) => Some(leaf),
            Self::Section(_) => None,
        }
    }

    pub fn as_section(&self) -> Option<&Section> {
        match self {
            Self::Section(section) => Some(section),
            Self::Leaf(_) => None,
        }
    }

    /// Number of leaves in the tree
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Section(section) => section.children.iter().map(Self::leaf_count).sum(),
        }
    }

    /// Depth of the deepest leaf; a lone leaf has depth 1.
    pub fn depth(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Section(section) => {
                1 + section.children.iter().map(Self::depth).max().unwrap_or(0)
            }
        }
    }

    fn write_outline(&self, f: &mut fmt::Formatter<'_>, depth: usize, bullet: bool) -> fmt::Result {
        let indent = "  ".repeat(depth);
        let marker = if bullet { "- " } else { "" };
        match self {
            Self::Leaf(leaf) => writeln!(f, "{}{}{}", indent, marker, leaf.to_text()),
            Self::Section(section) => {
                let child_depth = match &section.label {
                    Some(label) => {
                        writeln!(f, "{}{}{}", indent, marker, label)?;
                        depth + 1
                    }
                    None => depth,
                };
                for child in &section.children {
                    child.write_outline(f, child_depth, section.is_ordinal_group)?;
                }
                Ok(())
            }
        }
    }
}

/// Indented plain-text outline, one node per line.
impl fmt::Display for PresentationTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_outline(f, 0, false)
    }
}
