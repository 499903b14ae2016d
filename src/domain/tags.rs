use std::collections::BTreeMap;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Keys accepted in a taxonomy tag mapping.
pub const TAG_KEYS: [&str; 4] = ["frameworks", "architectures", "tasks", "subjects"];

/// Taxonomy tags of a registered model.
///
/// Each key holds an ordered set: insertion order is kept and duplicates
/// collapse onto their first occurrence.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags {
    #[serde(default)]
    pub frameworks: IndexSet<String>,
    #[serde(default)]
    pub architectures: IndexSet<String>,
    #[serde(default)]
    pub tasks: IndexSet<String>,
    #[serde(default)]
    pub subjects: IndexSet<String>,
}

impl Tags {
    pub fn slot_mut(&mut self, key: &str) -> Option<&mut IndexSet<String>> {
        match key {
            "frameworks" => Some(&mut self.frameworks),
            "architectures" => Some(&mut self.architectures),
            "tasks" => Some(&mut self.tasks),
            "subjects" => Some(&mut self.subjects),
            _ => None,
        }
    }
}

/// Opaque user labels.
pub type Labels = BTreeMap<String, String>;
