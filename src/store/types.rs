use crate::hierarchy::{ObjectKind, Tree};
use crate::utils::now_iso;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

/// Handle to an object inside a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRef {
    pub id: String,
    pub kind: ObjectKind,
}

impl StoreRef {
    pub fn new(id: impl Into<String>, kind: ObjectKind) -> Self {
        Self { id: id.into(), kind }
    }
}

/// What `open_or_create` may create when nothing matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateKind {
    /// Open an existing object only
    None,
    Notebook,
    Group,
    Section,
}

/// Outcome of `open_or_create`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opened {
    pub target: StoreRef,
    /// False when an existing object with the same name was reused
    pub created: bool,
}

/// A single page inside a section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub created_at: String,
}

impl Page {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            created_at: now_iso(),
        }
    }

    /// Identity used when merging: two pages with equal title and body are the same page.
    ///
    /// SHA-256 over the title, a NUL separator and the body, hex encoded.
    /// The creation time is not part of it.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.title.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.body.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Pages of one section, in display order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionContent {
    #[serde(default)]
    pub pages: Vec<Page>,
}

impl SectionContent {
    /// Append every page of `other` not already present; never removes pages.
    ///
    /// Returns the number of pages added.
    pub fn merge_from(&mut self, other: &SectionContent) -> usize {
        let mut known: HashSet<String> = self.pages.iter().map(Page::content_hash).collect();
        let mut added = 0;

        for page in &other.pages {
            if known.insert(page.content_hash()) {
                self.pages.push(page.clone());
                added += 1;
            }
        }

        added
    }
}

/// A notebook held by a store: its hierarchy plus the pages of each section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notebook {
    pub tree: Tree,
    /// Section id -> pages; sections without an entry are empty
    pub sections: HashMap<String, SectionContent>,
}

impl Notebook {
    pub fn new(tree: Tree) -> Self {
        Self {
            tree,
            sections: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_is_additive_and_deduplicates() {
        let mut target = SectionContent {
            pages: vec![Page::new("Kept", "only in target"), Page::new("Shared", "same")],
        };
        let source = SectionContent {
            pages: vec![Page::new("Shared", "same"), Page::new("New", "from source")],
        };

        let added = target.merge_from(&source);

        assert_eq!(added, 1);
        let titles: Vec<&str> = target.pages.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Kept", "Shared", "New"]);

        assert_eq!(target.merge_from(&source), 0);
        assert_eq!(target.pages.len(), 3);
    }

    #[test]
    fn test_page_hash_ignores_timestamp() {
        let mut a = Page::new("T", "B");
        let b = Page::new("T", "B");
        a.created_at = "2020-01-01T00:00:00Z".to_string();
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_page_hash_separates_title_from_body() {
        let joined = Page::new("Meeting notes", "");
        let split = Page::new("Meeting", " notes");
        assert_ne!(joined.content_hash(), split.content_hash());
        assert_ne!(Page::new("T", "B").content_hash(), Page::new("T", "C").content_hash());
        assert_eq!(joined.content_hash().len(), 64);
    }
}
