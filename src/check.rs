// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Structural consistency checking.
//!
//! The session keeps folders in three parallel structures (group records,
//! folder records, placeholder tabs) plus a linked sibling chain, and the
//! browser assumes they agree. This module audits all of it and returns the
//! _complete_ list of findings rather than the first, so the `check` command
//! can show the user everything wrong in one run. Nothing here aborts:
//! surfacing a broken chain non-fatally is the entire point of `check`,
//! even though the same defect is fatal to any command that needs folder
//! order.

use crate::session::{chain_defects, SessionDocument};

use std::collections::HashSet;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// One structural inconsistency of the session document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inconsistency {
    /// A folder record has no folder-kind group record, so it cannot render.
    GroupMissing { folder_id: String },

    /// A folder-kind group record has no folder record, so it cannot render.
    FolderMissing { group_id: String },

    /// A folder has no placeholder tab and would vanish when emptied.
    PlaceholderMissing { folder_id: String },

    /// A folder has more than one placeholder tab.
    ExtraPlaceholders { folder_id: String, count: usize },

    /// A workspace's sibling chain does not describe a total order.
    BrokenSiblingChain {
        workspace_id: String,
        detail: String,
    },
}

impl Display for Inconsistency {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::GroupMissing { folder_id } => {
                write!(fmt, "folder {folder_id} has no matching group record")
            }
            Self::FolderMissing { group_id } => {
                write!(fmt, "folder group {group_id} has no matching folder record")
            }
            Self::PlaceholderMissing { folder_id } => {
                write!(fmt, "folder {folder_id} has no placeholder tab")
            }
            Self::ExtraPlaceholders { folder_id, count } => {
                write!(fmt, "folder {folder_id} has {count} placeholder tabs")
            }
            Self::BrokenSiblingChain {
                workspace_id,
                detail,
            } => write!(fmt, "workspace {workspace_id}: {detail}"),
        }
    }
}

/// Audit every structural invariant of the session document.
///
/// Returns every finding. An empty listing means the session is sound.
pub fn check(doc: &SessionDocument) -> Vec<Inconsistency> {
    let mut findings = Vec::new();

    // Group/folder pairing is global, group records carry no workspace.
    let group_ids: HashSet<&str> = doc
        .groups
        .iter()
        .filter(|group| group.is_folder())
        .map(|group| group.id.as_str())
        .collect();
    let folder_ids: HashSet<&str> = doc.folders.iter().map(|folder| folder.id.as_str()).collect();

    for folder in &doc.folders {
        if !group_ids.contains(folder.id.as_str()) {
            findings.push(Inconsistency::GroupMissing {
                folder_id: folder.id.clone(),
            });
        }
    }
    for group in doc.groups.iter().filter(|group| group.is_folder()) {
        if !folder_ids.contains(group.id.as_str()) {
            findings.push(Inconsistency::FolderMissing {
                group_id: group.id.clone(),
            });
        }
    }

    for folder in &doc.folders {
        match doc.placeholder_count(&folder.id) {
            1 => {}
            0 => findings.push(Inconsistency::PlaceholderMissing {
                folder_id: folder.id.clone(),
            }),
            count => findings.push(Inconsistency::ExtraPlaceholders {
                folder_id: folder.id.clone(),
                count,
            }),
        }
    }

    for space in &doc.spaces {
        let folders = doc.workspace_folders(&space.id);
        for defect in chain_defects(&folders) {
            findings.push(Inconsistency::BrokenSiblingChain {
                workspace_id: space.id.clone(),
                detail: defect.to_string(),
            });
        }
    }

    findings
}
