//! Rename resolution.
//!
//! Applies a [`MappingTable`] to a [`WorkingTree`] one rule at a time. Each
//! rename is visible to the lookups and collision checks of later rules, and
//! a rename whose destination is already taken is skipped, never forced.

use std::fmt;

use crate::mapping::{MappingTable, RenameRule, Target};
use crate::tree::{EntryId, WorkingTree};

/// What happened to one mapping rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed { old: String, new: String },
    SkippedTargetExists { old: String, new: String },
    NotFound { old: String },
}

impl RenameOutcome {
    pub fn is_renamed(&self) -> bool {
        matches!(self, RenameOutcome::Renamed { .. })
    }

    /// The mapping key this outcome reports on
    pub fn old_name(&self) -> &str {
        match self {
            RenameOutcome::Renamed { old, .. }
            | RenameOutcome::SkippedTargetExists { old, .. }
            | RenameOutcome::NotFound { old } => old,
        }
    }
}

impl fmt::Display for RenameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenameOutcome::Renamed { old, new } => write!(f, "renamed: {} -> {}", old, new),
            RenameOutcome::SkippedTargetExists { old, new } => {
                write!(f, "skipped: {} -> {} (target exists)", old, new)
            }
            RenameOutcome::NotFound { old } => write!(f, "not found: {}", old),
        }
    }
}

/// Run one resolution pass, returning the outcome of every rule in order
pub fn resolve(tree: &mut WorkingTree, table: &MappingTable) -> Vec<RenameOutcome> {
    let log: Vec<RenameOutcome> = table
        .rules()
        .iter()
        .map(|rule| apply(tree, rule))
        .collect();

    let renamed = log.iter().filter(|o| o.is_renamed()).count();
    log::info!(
        "resolved {} rule(s): {} renamed, {} skipped or not found",
        log.len(),
        renamed,
        log.len() - renamed
    );
    log
}

fn apply(tree: &mut WorkingTree, rule: &RenameRule) -> RenameOutcome {
    let Some(id) = locate(tree, rule) else {
        log::debug!("no file matches '{}'", rule.old_name);
        return RenameOutcome::NotFound {
            old: rule.old_name.clone(),
        };
    };

    let destination = tree.get(id).path.with_base_name(&rule.new_name);
    if tree.try_rename(id, destination) {
        RenameOutcome::Renamed {
            old: rule.old_name.clone(),
            new: rule.new_name.clone(),
        }
    } else {
        log::debug!(
            "'{}' not renamed: '{}' already exists beside it",
            rule.old_name,
            rule.new_name
        );
        RenameOutcome::SkippedTargetExists {
            old: rule.old_name.clone(),
            new: rule.new_name.clone(),
        }
    }
}

fn locate(tree: &WorkingTree, rule: &RenameRule) -> Option<EntryId> {
    match &rule.target {
        Target::Path(path) => tree.find_file(path),
        Target::BaseName(name) => {
            let candidates = tree.files_named(name);
            if candidates.len() > 1 {
                log::warn!(
                    "'{}' matches {} files; renaming {} (address a file by its full path to pick another)",
                    name,
                    candidates.len(),
                    tree.get(candidates[0]).path
                );
            }
            candidates.first().copied()
        }
    }
}
