//! Model resource resolution.
//!
//! A model named `Foo` lives in a resource called `Foo.eomodel`, either
//! directly under a resource root or under its `Resources/` folder.

use ecrule_model::MODEL_EXTENSION;
use std::path::{Path, PathBuf};

/// Sub-folder searched after the root itself.
const RESOURCES_DIR: &str = "Resources";

/// Resolves model names to resource paths, searching roots in order.
#[derive(Debug, Clone, Default)]
pub struct ResourceLocator {
    roots: Vec<PathBuf>,
}

impl ResourceLocator {
    pub fn new(roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    /// A locator with a single resource root.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            roots: vec![root.into()],
        }
    }

    /// Appends a root searched after the existing ones.
    #[must_use]
    pub fn and_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Path of the resource for `name`, or `None` if no root has one.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        if !is_plain_name(name) {
            return None;
        }
        let file_name = format!("{name}.{MODEL_EXTENSION}");
        self.roots.iter().find_map(|root| {
            [root.join(&file_name), root.join(RESOURCES_DIR).join(&file_name)]
                .into_iter()
                .find(|candidate| candidate.is_file())
        })
    }
}

/// Rejects names that could escape a resource root.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && Path::new(name).components().count() == 1
}
