// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Session document model.
//!
//! In-memory representation of the browser's decompressed session JSON. The
//! session tracks four parallel collections that matter to us: workspaces
//! (called __spaces__ on disk), native tab groups, folders, and tabs.
//!
//! # Folders Are Two Records Plus One Tab
//!
//! A folder only renders in the browser when _both_ a group record (which
//! carries the visible label) and a folder record (which carries the render
//! order) exist under the same id. On top of that, every folder owns exactly
//! one hidden __placeholder tab__ marked with `zenIsEmpty`. The placeholder
//! is what keeps a folder alive when its last real tab is removed, so it must
//! never be dropped or duplicated. [`crate::check`] audits all three legs of
//! this invariant.
//!
//! # Two Ordering Mechanisms
//!
//! Folder render order is a singly linked chain through `prevSiblingInfo`,
//! not array position. Tab order inside a folder is plain `tabs` array order
//! among tabs sharing a `groupId`. [`SessionDocument::folders_in_order`]
//! materializes the chain into an explicit sequence once, so the rest of the
//! crate never re-walks the raw linkage; the chain is only rewritten when a
//! plan is applied.
//!
//! # Unknown Fields
//!
//! The browser stores far more per record than we model. Every struct here
//! flattens unmodeled fields into a raw JSON map so that a read-modify-write
//! cycle returns them untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Group kind discriminator for folder-backing groups.
///
/// Groups of any other kind are plain native tab groups and are invisible to
/// reconciliation and consistency checking.
pub const FOLDER_GROUP_KIND: &str = "folder";

/// Decompressed session payload.
///
/// Single mutable aggregate for one invocation: parsed once, borrowed by
/// every component, serialized once, discarded.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct SessionDocument {
    /// Workspaces in declaration order.
    #[serde(default)]
    pub spaces: Vec<Workspace>,

    /// Native tab groups, folder-backing or otherwise.
    #[serde(default)]
    pub groups: Vec<TabGroup>,

    /// Folder records, ordered by sibling chain rather than array position.
    #[serde(default)]
    pub folders: Vec<Folder>,

    /// All tabs of the session.
    #[serde(default)]
    pub tabs: Vec<Tab>,

    /// Everything else the browser keeps in the session file.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// A named top-level container of pinned tabs and folders.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Workspace {
    /// UUID the rest of the session references this workspace by.
    pub id: String,

    /// Human-readable name, resolved through [`SessionDocument::resolve_workspace`].
    pub name: String,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Native tab group record.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct TabGroup {
    pub id: String,

    /// Kind discriminator. [`FOLDER_GROUP_KIND`] marks a folder-backing group.
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Visible label of the group or folder.
    #[serde(default)]
    pub name: String,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl TabGroup {
    /// Check if this group backs a folder.
    pub fn is_folder(&self) -> bool {
        self.kind == FOLDER_GROUP_KIND
    }
}

/// Folder record carrying render order.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Folder {
    /// Matches the id of a folder-backing [`TabGroup`].
    pub id: String,

    /// Workspace this folder renders in.
    #[serde(rename = "workspaceId")]
    pub workspace_id: String,

    /// Link to the folder rendered directly before this one. `None` marks
    /// the head of the workspace's chain.
    #[serde(rename = "prevSiblingInfo")]
    pub prev_sibling: Option<SiblingInfo>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Folder {
    fn prev_id(&self) -> Option<&str> {
        self.prev_sibling.as_ref().map(|info| info.id.as_str())
    }
}

/// Reference half of the sibling chain linkage.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct SiblingInfo {
    pub id: String,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl SiblingInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            extra: serde_json::Map::new(),
        }
    }
}

/// A single tab.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Tab {
    pub id: String,

    #[serde(default)]
    pub url: String,

    /// Folder membership. `None` means the tab sits outside any folder.
    #[serde(rename = "groupId")]
    pub group_id: Option<String>,

    #[serde(default)]
    pub pinned: bool,

    /// Hidden placeholder marker. Placeholders never show up in listings or
    /// matching, only in consistency counts.
    #[serde(rename = "zenIsEmpty", default)]
    pub placeholder: bool,

    #[serde(rename = "workspaceId", default)]
    pub workspace_id: String,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl SessionDocument {
    /// Resolve a workspace name to its record.
    ///
    /// Matching is case-sensitive and exact. Ambiguity here is a hard user
    /// error, not a warning, so no fuzzy fallback exists.
    ///
    /// # Errors
    ///
    /// - Return [`SessionError::WorkspaceNotFound`] if no space carries the
    ///   name, listing every available name.
    pub fn resolve_workspace(&self, name: &str) -> Result<&Workspace> {
        self.spaces
            .iter()
            .find(|space| space.name == name)
            .ok_or_else(|| SessionError::WorkspaceNotFound {
                name: name.to_owned(),
                available: self.spaces.iter().map(|s| s.name.clone()).collect(),
            })
    }

    /// Folder records of one workspace in raw array order.
    pub fn workspace_folders(&self, workspace_id: &str) -> Vec<&Folder> {
        self.folders
            .iter()
            .filter(|folder| folder.workspace_id == workspace_id)
            .collect()
    }

    /// Folders of a workspace in render order.
    ///
    /// Reconstructs display order by walking the sibling chain from its head.
    ///
    /// # Errors
    ///
    /// - Return [`SessionError::BrokenSiblingChain`] if the chain does not
    ///   visit every folder of the workspace exactly once.
    pub fn folders_in_order(&self, workspace_id: &str) -> Result<Vec<&Folder>> {
        let folders = self.workspace_folders(workspace_id);
        if folders.is_empty() {
            return Ok(Vec::new());
        }

        let defects = chain_defects(&folders);
        if !defects.is_empty() {
            return Err(SessionError::BrokenSiblingChain {
                workspace_id: workspace_id.to_owned(),
                defects,
            });
        }

        // INVARIANT: Defect scan left exactly one head and no forks, so the
        // successor map is a function and the walk terminates.
        let mut next: HashMap<&str, &Folder> = HashMap::new();
        let mut head = None;
        for &folder in &folders {
            match folder.prev_id() {
                Some(prev) => {
                    next.insert(prev, folder);
                }
                None => head = Some(folder),
            }
        }

        let mut ordered = Vec::with_capacity(folders.len());
        let mut cursor = head;
        while let Some(folder) = cursor {
            ordered.push(folder);
            cursor = next.get(folder.id.as_str()).copied();
        }

        Ok(ordered)
    }

    /// Visible tabs of a folder in array order.
    ///
    /// Excludes the placeholder from presentation. Use
    /// [`SessionDocument::placeholder_count`] for consistency counts.
    pub fn tabs_in_folder(&self, folder_id: &str) -> Vec<&Tab> {
        self.tabs
            .iter()
            .filter(|tab| tab.group_id.as_deref() == Some(folder_id) && !tab.placeholder)
            .collect()
    }

    /// Number of placeholder tabs attached to a folder.
    pub fn placeholder_count(&self, folder_id: &str) -> usize {
        self.tabs
            .iter()
            .filter(|tab| tab.group_id.as_deref() == Some(folder_id) && tab.placeholder)
            .count()
    }

    /// Pinned, non-placeholder tabs of a workspace in array order.
    pub fn pinned_tabs(&self, workspace_id: &str) -> Vec<&Tab> {
        self.tabs
            .iter()
            .filter(|tab| tab.workspace_id == workspace_id && tab.pinned && !tab.placeholder)
            .collect()
    }

    /// Visible label of a folder, resolved through its paired group.
    pub fn folder_name(&self, folder_id: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|group| group.id == folder_id)
            .map(|group| group.name.as_str())
    }
}

/// Collect every structural defect of one workspace's sibling chain.
///
/// Returns an empty listing for a healthy chain. Callers that only need the
/// order should use [`SessionDocument::folders_in_order`]; the checker uses
/// this directly so it can report every problem instead of the first.
pub fn chain_defects(folders: &[&Folder]) -> Vec<ChainDefect> {
    let mut defects = Vec::new();
    if folders.is_empty() {
        return defects;
    }

    let ids: HashMap<&str, &Folder> = folders.iter().map(|f| (f.id.as_str(), *f)).collect();

    let mut heads = Vec::new();
    let mut claimants: HashMap<&str, Vec<&str>> = HashMap::new();
    for folder in folders {
        match folder.prev_id() {
            None => heads.push(folder.id.clone()),
            Some(prev) if !ids.contains_key(prev) => defects.push(ChainDefect::DanglingPrev {
                folder_id: folder.id.clone(),
                prev_id: prev.to_owned(),
            }),
            Some(prev) => claimants.entry(prev).or_default().push(folder.id.as_str()),
        }
    }

    match heads.len() {
        0 => defects.push(ChainDefect::NoHead),
        1 => {}
        _ => defects.push(ChainDefect::MultipleHeads(heads.clone())),
    }

    for (prev, kids) in claimants.iter().filter(|(_, v)| v.len() > 1) {
        defects.push(ChainDefect::Fork {
            prev_id: (*prev).to_owned(),
            claimants: kids.iter().map(|id| (*id).to_owned()).collect(),
        });
    }

    // INVARIANT: Only attempt the walk on an otherwise sound chain, anything
    // unvisited at this point is stranded on a cycle.
    if defects.is_empty() && heads.len() == 1 {
        let next: HashMap<&str, &str> = claimants
            .iter()
            .map(|(prev, v)| (*prev, v[0]))
            .collect();
        let mut visited = vec![heads[0].as_str()];
        let mut cursor = heads[0].as_str();
        while let Some(&succ) = next.get(cursor) {
            visited.push(succ);
            cursor = succ;
        }
        if visited.len() != folders.len() {
            let mut unreachable: Vec<String> = folders
                .iter()
                .filter(|f| !visited.contains(&f.id.as_str()))
                .map(|f| f.id.clone())
                .collect();
            unreachable.sort();
            defects.push(ChainDefect::Unreachable(unreachable));
        }
    }

    defects
}

/// One way a sibling chain can be broken.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainDefect {
    /// Every folder claims a predecessor, so the chain is one big cycle.
    NoHead,

    /// More than one folder claims to be the head.
    MultipleHeads(Vec<String>),

    /// Two folders claim the same predecessor.
    Fork {
        prev_id: String,
        claimants: Vec<String>,
    },

    /// A folder references a predecessor outside the workspace.
    DanglingPrev { folder_id: String, prev_id: String },

    /// Folders the walk from the head never reaches.
    Unreachable(Vec<String>),
}

impl Display for ChainDefect {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::NoHead => write!(fmt, "no head folder, every folder has a predecessor"),
            Self::MultipleHeads(ids) => {
                write!(fmt, "multiple head folders: {}", ids.join(", "))
            }
            Self::Fork { prev_id, claimants } => write!(
                fmt,
                "folders {} all claim {prev_id} as predecessor",
                claimants.join(", ")
            ),
            Self::DanglingPrev { folder_id, prev_id } => write!(
                fmt,
                "folder {folder_id} references predecessor {prev_id} outside its workspace"
            ),
            Self::Unreachable(ids) => {
                write!(fmt, "folders unreachable from the head: {}", ids.join(", "))
            }
        }
    }
}

/// Session model error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum SessionError {
    /// No workspace matches the requested name.
    #[error("no workspace named {name:?} (available: {})", available.join(", "))]
    WorkspaceNotFound {
        name: String,
        available: Vec<String>,
    },

    /// The sibling chain of a workspace does not describe a total order.
    #[error("broken folder sibling chain in workspace {workspace_id}: {}", describe(defects))]
    BrokenSiblingChain {
        workspace_id: String,
        defects: Vec<ChainDefect>,
    },

    /// No folder record carries the requested id.
    #[error("no folder with id {folder_id:?}")]
    UnknownFolder { folder_id: String },
}

fn describe(defects: &[ChainDefect]) -> String {
    defects
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Friendly result alias :3
pub type Result<T, E = SessionError> = std::result::Result<T, E>;
