// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Session reconciliation.
//!
//! Diff the parsed session against the declared folder specification and
//! produce an ordered __plan__ of mutations that brings the session into
//! alignment: create missing folders, pull matched pinned tabs into them,
//! and reorder folders and tabs to the declared order.
//!
//! # Scope of Mutation
//!
//! The engine never creates or deletes real tabs. Pinned tabs present in the
//! session but absent from the specification are left exactly where they
//! are; folders present in the session but not declared keep their relative
//! order after the declared ones. Destructive cleanup is a job for the
//! browser's own UI, not for a batch tool running against a file the user
//! cannot see.
//!
//! # Purity
//!
//! [`compute_plan`] is a pure function of `(document, specification)`. Two
//! calls on identical inputs yield identical plans, which is what makes the
//! `diff` command meaningful and `apply` idempotent: applying a plan and
//! recomputing yields an empty plan. Purity is also why new folder ids are
//! _derived_ (a short SHA-256 of workspace id and folder name) rather than
//! random: a plan can reference a folder that the same plan creates.
//!
//! Non-fatal conditions (unmatched patterns, ambiguous patterns, tabs
//! claimed by two folders) are accumulated as [`Warning`]s on the plan and
//! reported by the caller after the work completes, never silently dropped.

pub mod apply;

use crate::{
    config::{FolderSpec, WorkspaceSpec},
    matcher::{self, TabMatch},
    session::{Folder, Result as SessionResult, SessionDocument, Workspace},
};

use sha2::{Digest, Sha256};
use std::{
    collections::{HashMap, HashSet},
    fmt::{Display, Formatter, Result as FmtResult},
};
use tracing::{debug, instrument};

/// One mutation of the session document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Create a folder: group record, folder record, and placeholder tab.
    CreateFolder {
        workspace_id: String,
        id: String,
        name: String,
        position: usize,
    },

    /// Move a pinned tab into a folder.
    AssignTab { tab_id: String, folder_id: String },

    /// Splice a folder to a new slot in its workspace's sibling chain.
    /// `None` moves it to the front.
    ReorderFolder {
        folder_id: String,
        new_prev_sibling: Option<String>,
    },

    /// Move a tab to a new position among its folder's visible tabs.
    ReorderTab { tab_id: String, new_position: usize },
}

impl Display for Operation {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::CreateFolder { name, position, .. } => {
                write!(fmt, "create folder {name:?} at position {position}")
            }
            Self::AssignTab { tab_id, folder_id } => {
                write!(fmt, "assign tab {tab_id} to folder {folder_id}")
            }
            Self::ReorderFolder {
                folder_id,
                new_prev_sibling: Some(prev),
            } => write!(fmt, "move folder {folder_id} after {prev}"),
            Self::ReorderFolder { folder_id, .. } => {
                write!(fmt, "move folder {folder_id} to the front")
            }
            Self::ReorderTab {
                tab_id,
                new_position,
            } => write!(fmt, "move tab {tab_id} to position {new_position}"),
        }
    }
}

/// Non-fatal conditions found while computing a plan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Warning {
    /// No pinned tab matched a pattern; that single assignment is skipped.
    NoMatch {
        workspace: String,
        folder: String,
        title: String,
        pattern: String,
    },

    /// A pattern matched more than one tab; the first in array order wins.
    AmbiguousMatch {
        pattern: String,
        total: usize,
        chosen_url: String,
    },

    /// Two declared folders matched the same tab; the later one wins.
    ConflictingAssignment {
        url: String,
        first_folder: String,
        second_folder: String,
    },
}

impl Display for Warning {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::NoMatch {
                workspace,
                folder,
                title,
                pattern,
            } => write!(
                fmt,
                "no pinned tab matches {pattern:?} ({title:?} in folder {folder:?} of workspace {workspace:?}), skipping"
            ),
            Self::AmbiguousMatch {
                pattern,
                total,
                chosen_url,
            } => write!(
                fmt,
                "pattern {pattern:?} matches {total} tabs, using first match {chosen_url}"
            ),
            Self::ConflictingAssignment {
                url,
                first_folder,
                second_folder,
            } => write!(
                fmt,
                "tab {url} is claimed by folders {first_folder:?} and {second_folder:?}, {second_folder:?} wins"
            ),
        }
    }
}

/// Ordered mutation plan plus accumulated warnings.
///
/// Computed fresh on every invocation from two immutable inputs and never
/// persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Plan {
    pub operations: Vec<Operation>,
    pub warnings: Vec<Warning>,
}

impl Plan {
    /// Check if the plan mutates anything. Warnings alone do not count.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Derive the id of a folder this tool creates.
///
/// Stable for a given workspace and folder name, which keeps plan
/// computation pure and lets reorder operations reference folders created
/// earlier in the same plan.
pub fn derive_folder_id(workspace_id: &str, name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(workspace_id.as_bytes());
    hasher.update(b"/");
    hasher.update(name.as_bytes());
    format!("zf-{}", hex::encode(&hasher.finalize()[..8]))
}

/// Derive the id of the placeholder tab paired with a created folder.
pub fn placeholder_id(folder_id: &str) -> String {
    format!("{folder_id}-empty")
}

/// Compute the mutation plan aligning `doc` with `spec`.
///
/// # Errors
///
/// - Return [`crate::session::SessionError::WorkspaceNotFound`] if the
///   specification names a workspace the session lacks.
/// - Return [`crate::session::SessionError::BrokenSiblingChain`] if folder
///   order cannot be reconstructed; run `check` to see every defect.
#[instrument(skip(doc, spec), level = "debug")]
pub fn compute_plan(doc: &SessionDocument, spec: &FolderSpec) -> SessionResult<Plan> {
    let mut plan = Plan::default();

    for workspace_spec in &spec.workspaces {
        let workspace = doc.resolve_workspace(&workspace_spec.name)?;
        let current = doc.folders_in_order(&workspace.id)?;
        plan_workspace(doc, workspace, workspace_spec, &current, &mut plan);
    }

    debug!(
        "planned {} operations, {} warnings",
        plan.operations.len(),
        plan.warnings.len()
    );
    Ok(plan)
}

fn plan_workspace(
    doc: &SessionDocument,
    workspace: &Workspace,
    spec: &WorkspaceSpec,
    current: &[&Folder],
    plan: &mut Plan,
) {
    // Existing folders by label. First occurrence wins on duplicate labels
    // so the choice is stable.
    let mut by_name: HashMap<&str, &Folder> = HashMap::new();
    for &folder in current {
        if let Some(name) = doc.folder_name(&folder.id) {
            by_name.entry(name).or_insert(folder);
        }
    }

    // Resolve every pattern up front so a tab claimed by two folders is
    // owned by the last one before any operation is emitted. Emitting while
    // walking would leave the earlier folder with stale assign/reorder
    // operations for a tab it no longer owns.
    let mut owners: HashMap<usize, usize> = HashMap::new();
    let mut resolved: Vec<Vec<usize>> = vec![Vec::new(); spec.folders.len()];
    for (folder_pos, folder_spec) in spec.folders.iter().enumerate() {
        for tab_spec in &folder_spec.tabs {
            let matched = matcher::find_tab(doc, &workspace.id, &tab_spec.pattern);
            if let TabMatch::Ambiguous { first, total } = matched {
                plan.warnings.push(Warning::AmbiguousMatch {
                    pattern: tab_spec.pattern.clone(),
                    total,
                    chosen_url: doc.tabs[first].url.clone(),
                });
            }
            let Some(index) = matched.chosen() else {
                plan.warnings.push(Warning::NoMatch {
                    workspace: spec.name.clone(),
                    folder: folder_spec.name.clone(),
                    title: tab_spec.title.clone(),
                    pattern: tab_spec.pattern.clone(),
                });
                continue;
            };

            if let Some(previous) = owners.insert(index, folder_pos) {
                if previous != folder_pos {
                    plan.warnings.push(Warning::ConflictingAssignment {
                        url: doc.tabs[index].url.clone(),
                        first_folder: spec.folders[previous].name.clone(),
                        second_folder: folder_spec.name.clone(),
                    });
                    resolved[previous].retain(|&i| i != index);
                }
            }
            if !resolved[folder_pos].contains(&index) {
                resolved[folder_pos].push(index);
            }
        }
    }

    // Target folder sequence: declared folders in declaration order, then
    // undeclared folders keeping their current relative order.
    let mut target: Vec<(String, bool)> = Vec::new();
    let mut folder_ids: Vec<String> = Vec::with_capacity(spec.folders.len());
    let mut consumed: HashSet<&str> = HashSet::new();
    for folder_spec in &spec.folders {
        match by_name.get(folder_spec.name.as_str()) {
            Some(&folder) => {
                consumed.insert(folder.id.as_str());
                target.push((folder.id.clone(), false));
                folder_ids.push(folder.id.clone());
            }
            None => {
                let id = derive_folder_id(&workspace.id, &folder_spec.name);
                target.push((id.clone(), true));
                folder_ids.push(id);
            }
        }
    }
    for &folder in current {
        if !consumed.contains(folder.id.as_str()) {
            target.push((folder.id.clone(), false));
        }
    }

    // Emit folder operations against a simulated chain rather than the
    // original one. Comparing against the pre-apply chain can skip a splice
    // that an earlier splice invalidates, breaking the recompute fixed
    // point.
    let mut sim: Vec<String> = current.iter().map(|folder| folder.id.clone()).collect();
    for (position, (id, is_new)) in target.iter().enumerate() {
        if *is_new {
            plan.operations.push(Operation::CreateFolder {
                workspace_id: workspace.id.clone(),
                id: id.clone(),
                name: spec.folders[position].name.clone(),
                position,
            });
            sim.insert(position, id.clone());
        } else if sim[position] != *id {
            plan.operations.push(Operation::ReorderFolder {
                folder_id: id.clone(),
                new_prev_sibling: position.checked_sub(1).map(|p| sim[p].clone()),
            });
            let from = sim.iter().position(|entry| entry == id).unwrap();
            sim.remove(from);
            sim.insert(position, id.clone());
        }
    }

    // Tab operations per declared folder, again against a simulation of the
    // post-assignment member order.
    for (folder_pos, folder_spec) in spec.folders.iter().enumerate() {
        let folder_id = folder_ids[folder_pos].as_str();
        let desired = &resolved[folder_pos];

        for &tab_index in desired {
            if doc.tabs[tab_index].group_id.as_deref() != Some(folder_id) {
                plan.operations.push(Operation::AssignTab {
                    tab_id: doc.tabs[tab_index].id.clone(),
                    folder_id: folder_id.to_owned(),
                });
            }
        }

        // INVARIANT: Assignment never moves a tab in the array, so the
        // post-assignment member order is plain array order over the tabs
        // this folder will own.
        let mut tab_sim: Vec<usize> = doc
            .tabs
            .iter()
            .enumerate()
            .filter(|(index, tab)| {
                if tab.placeholder {
                    return false;
                }
                match owners.get(index) {
                    Some(&owner) => owner == folder_pos,
                    None => tab.group_id.as_deref() == Some(folder_id),
                }
            })
            .map(|(index, _)| index)
            .collect();

        for (position, &tab_index) in desired.iter().enumerate() {
            if tab_sim.get(position) != Some(&tab_index) {
                plan.operations.push(Operation::ReorderTab {
                    tab_id: doc.tabs[tab_index].id.clone(),
                    new_position: position,
                });
                let from = tab_sim.iter().position(|&entry| entry == tab_index).unwrap();
                tab_sim.remove(from);
                tab_sim.insert(position, tab_index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{
        Folder, SessionDocument, SiblingInfo, Tab, TabGroup, Workspace, FOLDER_GROUP_KIND,
    };
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn base_doc() -> SessionDocument {
        SessionDocument {
            spaces: vec![Workspace {
                id: "ws-1".into(),
                name: "Work".into(),
                extra: serde_json::Map::new(),
            }],
            ..SessionDocument::default()
        }
    }

    fn add_folder(doc: &mut SessionDocument, id: &str, name: &str, prev: Option<&str>) {
        doc.groups.push(TabGroup {
            id: id.into(),
            kind: FOLDER_GROUP_KIND.into(),
            name: name.into(),
            extra: serde_json::Map::new(),
        });
        doc.folders.push(Folder {
            id: id.into(),
            workspace_id: "ws-1".into(),
            prev_sibling: prev.map(SiblingInfo::new),
            extra: serde_json::Map::new(),
        });
        doc.tabs.push(Tab {
            id: placeholder_id(id),
            url: String::new(),
            group_id: Some(id.into()),
            pinned: true,
            placeholder: true,
            workspace_id: "ws-1".into(),
            extra: serde_json::Map::new(),
        });
    }

    fn add_pinned(doc: &mut SessionDocument, id: &str, url: &str, group: Option<&str>) {
        doc.tabs.push(Tab {
            id: id.into(),
            url: url.into(),
            group_id: group.map(str::to_owned),
            pinned: true,
            placeholder: false,
            workspace_id: "ws-1".into(),
            extra: serde_json::Map::new(),
        });
    }

    fn spec(yaml: &str) -> FolderSpec {
        yaml.parse().unwrap()
    }

    #[test]
    fn create_and_populate_empty_workspace() {
        let mut doc = base_doc();
        add_pinned(&mut doc, "t1", "https://fly.io/apps/x", None);
        let spec = spec(indoc! {r#"
            Work:
              Infra:
                Fly: fly.io
        "#});

        let plan = compute_plan(&doc, &spec).unwrap();

        let infra = derive_folder_id("ws-1", "Infra");
        assert_eq!(
            plan.operations,
            vec![
                Operation::CreateFolder {
                    workspace_id: "ws-1".into(),
                    id: infra.clone(),
                    name: "Infra".into(),
                    position: 0,
                },
                Operation::AssignTab {
                    tab_id: "t1".into(),
                    folder_id: infra,
                },
            ]
        );
        assert_eq!(plan.warnings, Vec::new());
    }

    #[test]
    fn reorder_only_for_existing_assigned_folders() {
        let mut doc = base_doc();
        add_folder(&mut doc, "f-a", "Alpha", None);
        add_folder(&mut doc, "f-b", "Beta", Some("f-a"));
        let spec = spec(indoc! {r#"
            Work:
              Beta: {}
              Alpha: {}
        "#});

        let plan = compute_plan(&doc, &spec).unwrap();

        assert_eq!(
            plan.operations,
            vec![Operation::ReorderFolder {
                folder_id: "f-b".into(),
                new_prev_sibling: None,
            }]
        );
    }

    #[test]
    fn converged_document_yields_empty_plan() {
        let mut doc = base_doc();
        add_folder(&mut doc, "f-a", "Infra", None);
        add_pinned(&mut doc, "t1", "https://fly.io/apps", Some("f-a"));
        let spec = spec(indoc! {r#"
            Work:
              Infra:
                Fly: fly.io
        "#});

        let plan = compute_plan(&doc, &spec).unwrap();

        assert!(plan.is_empty());
    }

    #[test]
    fn plan_is_deterministic() {
        let mut doc = base_doc();
        add_folder(&mut doc, "f-a", "Alpha", None);
        add_pinned(&mut doc, "t1", "https://fly.io", None);
        add_pinned(&mut doc, "t2", "https://hetzner.com", None);
        let spec = spec(indoc! {r#"
            Work:
              Beta:
                Hetzner: hetzner.com
              Alpha:
                Fly: fly.io
        "#});

        let first = compute_plan(&doc, &spec).unwrap();
        let second = compute_plan(&doc, &spec).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn apply_then_recompute_reaches_fixed_point() {
        let mut doc = base_doc();
        add_folder(&mut doc, "f-a", "Alpha", None);
        add_folder(&mut doc, "f-b", "Beta", Some("f-a"));
        add_pinned(&mut doc, "t1", "https://fly.io", Some("f-b"));
        add_pinned(&mut doc, "t2", "https://hetzner.com", None);
        add_pinned(&mut doc, "t3", "https://lobste.rs", Some("f-a"));
        let spec = spec(indoc! {r#"
            Work:
              Beta:
                Hetzner: hetzner.com
                Fly: fly.io
              Gamma:
                Lobsters: lobste.rs
              Alpha: {}
        "#});

        let plan = compute_plan(&doc, &spec).unwrap();
        assert!(!plan.is_empty());
        apply::apply(&mut doc, &plan).unwrap();

        let again = compute_plan(&doc, &spec).unwrap();
        assert_eq!(again.operations, Vec::new());
    }

    #[test]
    fn tab_reorder_emitted_when_spec_order_differs() {
        let mut doc = base_doc();
        add_folder(&mut doc, "f-a", "Infra", None);
        add_pinned(&mut doc, "t1", "https://fly.io", Some("f-a"));
        add_pinned(&mut doc, "t2", "https://hetzner.com", Some("f-a"));
        let spec = spec(indoc! {r#"
            Work:
              Infra:
                Hetzner: hetzner.com
                Fly: fly.io
        "#});

        let plan = compute_plan(&doc, &spec).unwrap();

        assert_eq!(
            plan.operations,
            vec![Operation::ReorderTab {
                tab_id: "t2".into(),
                new_position: 0,
            }]
        );
    }

    #[test]
    fn conflicting_claim_goes_to_later_folder() {
        let mut doc = base_doc();
        add_pinned(&mut doc, "t1", "https://fly.io", None);
        let spec = spec(indoc! {r#"
            Work:
              First:
                Fly: fly.io
              Second:
                AlsoFly: fly.io
        "#});

        let plan = compute_plan(&doc, &spec).unwrap();

        let second = derive_folder_id("ws-1", "Second");
        let assigns: Vec<&Operation> = plan
            .operations
            .iter()
            .filter(|op| matches!(op, Operation::AssignTab { .. }))
            .collect();
        assert_eq!(
            assigns,
            vec![&Operation::AssignTab {
                tab_id: "t1".into(),
                folder_id: second,
            }]
        );
        assert_eq!(
            plan.warnings,
            vec![Warning::ConflictingAssignment {
                url: "https://fly.io".into(),
                first_folder: "First".into(),
                second_folder: "Second".into(),
            }]
        );
    }

    #[test]
    fn ambiguous_pattern_warns_and_uses_first() {
        let mut doc = base_doc();
        add_folder(&mut doc, "f-a", "Social", None);
        add_pinned(&mut doc, "t1", "https://dropbox.com", None);
        add_pinned(&mut doc, "t2", "https://x.com", None);
        let spec = spec(indoc! {r#"
            Work:
              Social:
                X: x.com
        "#});

        let plan = compute_plan(&doc, &spec).unwrap();

        assert_eq!(
            plan.warnings,
            vec![Warning::AmbiguousMatch {
                pattern: "x.com".into(),
                total: 2,
                chosen_url: "https://dropbox.com".into(),
            }]
        );
        assert_eq!(
            plan.operations,
            vec![Operation::AssignTab {
                tab_id: "t1".into(),
                folder_id: "f-a".into(),
            }]
        );
    }

    #[test]
    fn unmatched_pattern_warns_and_skips() {
        let mut doc = base_doc();
        add_folder(&mut doc, "f-a", "Infra", None);
        let spec = spec(indoc! {r#"
            Work:
              Infra:
                Fly: fly.io
        "#});

        let plan = compute_plan(&doc, &spec).unwrap();

        assert!(plan.is_empty());
        assert_eq!(
            plan.warnings,
            vec![Warning::NoMatch {
                workspace: "Work".into(),
                folder: "Infra".into(),
                title: "Fly".into(),
                pattern: "fly.io".into(),
            }]
        );
    }

    #[test]
    fn unknown_workspace_is_fatal() {
        let doc = base_doc();
        let spec = spec(indoc! {r#"
            Personal:
              Reading: {}
        "#});

        assert!(compute_plan(&doc, &spec).is_err());
    }

    #[test]
    fn undeclared_folders_keep_relative_order_after_declared() {
        let mut doc = base_doc();
        add_folder(&mut doc, "f-a", "Alpha", None);
        add_folder(&mut doc, "f-b", "Beta", Some("f-a"));
        add_folder(&mut doc, "f-c", "Gamma", Some("f-b"));
        let spec = spec(indoc! {r#"
            Work:
              Gamma: {}
        "#});

        let mut applied = doc.clone();
        let plan = compute_plan(&doc, &spec).unwrap();
        apply::apply(&mut applied, &plan).unwrap();

        let order: Vec<&str> = applied
            .folders_in_order("ws-1")
            .unwrap()
            .iter()
            .map(|f| f.id.as_str())
            .collect();
        assert_eq!(order, vec!["f-c", "f-a", "f-b"]);
    }

    #[test]
    fn derived_ids_are_stable_and_distinct() {
        assert_eq!(
            derive_folder_id("ws-1", "Infra"),
            derive_folder_id("ws-1", "Infra")
        );
        assert_ne!(
            derive_folder_id("ws-1", "Infra"),
            derive_folder_id("ws-2", "Infra")
        );
        assert_ne!(
            derive_folder_id("ws-1", "Infra"),
            derive_folder_id("ws-1", "Comms")
        );
    }
}
