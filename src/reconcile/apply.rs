// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Plan execution.
//!
//! Execute a computed [`Plan`](crate::reconcile::Plan) against the in-memory
//! session document, operation by operation in plan order. This module only
//! mutates memory; persisting the result (and the mandatory backup
//! beforehand) is sequenced by the caller through [`crate::codec`].
//!
//! Every unknown id is a hard error. A plan computed from the same document
//! can never trip these, so tripping one means the plan and document went
//! out of sync and nothing should be written.

use crate::{
    reconcile::{placeholder_id, Operation, Plan},
    session::{Folder, SessionDocument, SessionError, SiblingInfo, Tab, TabGroup, FOLDER_GROUP_KIND},
};

use tracing::{debug, info, instrument};

/// Execute every operation of a plan in order.
///
/// # Errors
///
/// - Return [`ApplyError::Session`] if folder order cannot be reconstructed
///   or a referenced folder does not exist.
/// - Return [`ApplyError::UnknownTab`] / [`ApplyError::UnassignedTab`] if a
///   tab operation references a tab the document lacks.
/// - Return [`ApplyError::DuplicateFolder`] if a create collides with an
///   existing folder id.
#[instrument(skip(doc, plan), level = "debug")]
pub fn apply(doc: &mut SessionDocument, plan: &Plan) -> Result<()> {
    info!("applying {} operations", plan.operations.len());
    for operation in &plan.operations {
        debug!("{operation}");
        match operation {
            Operation::CreateFolder {
                workspace_id,
                id,
                name,
                position,
            } => create_folder(doc, workspace_id, id, name, *position)?,
            Operation::AssignTab { tab_id, folder_id } => assign_tab(doc, tab_id, folder_id)?,
            Operation::ReorderFolder {
                folder_id,
                new_prev_sibling,
            } => reorder_folder(doc, folder_id, new_prev_sibling.as_deref())?,
            Operation::ReorderTab {
                tab_id,
                new_position,
            } => reorder_tab(doc, tab_id, *new_position)?,
        }
    }

    Ok(())
}

fn create_folder(
    doc: &mut SessionDocument,
    workspace_id: &str,
    id: &str,
    name: &str,
    position: usize,
) -> Result<()> {
    if doc.folders.iter().any(|folder| folder.id == id) {
        return Err(ApplyError::DuplicateFolder { id: id.to_owned() });
    }

    let mut order: Vec<String> = doc
        .folders_in_order(workspace_id)?
        .iter()
        .map(|folder| folder.id.clone())
        .collect();

    // INVARIANT: A folder renders only as group record + folder record +
    // placeholder tab; all three are created together.
    doc.groups.push(TabGroup {
        id: id.to_owned(),
        kind: FOLDER_GROUP_KIND.to_owned(),
        name: name.to_owned(),
        extra: serde_json::Map::new(),
    });
    doc.folders.push(Folder {
        id: id.to_owned(),
        workspace_id: workspace_id.to_owned(),
        prev_sibling: None,
        extra: serde_json::Map::new(),
    });
    doc.tabs.push(Tab {
        id: placeholder_id(id),
        url: String::new(),
        group_id: Some(id.to_owned()),
        pinned: true,
        placeholder: true,
        workspace_id: workspace_id.to_owned(),
        extra: serde_json::Map::new(),
    });

    order.insert(position.min(order.len()), id.to_owned());
    relink(doc, &order);

    Ok(())
}

fn assign_tab(doc: &mut SessionDocument, tab_id: &str, folder_id: &str) -> Result<()> {
    if !doc.folders.iter().any(|folder| folder.id == folder_id) {
        return Err(SessionError::UnknownFolder {
            folder_id: folder_id.to_owned(),
        }
        .into());
    }

    let tab = doc
        .tabs
        .iter_mut()
        .find(|tab| tab.id == tab_id)
        .ok_or_else(|| ApplyError::UnknownTab {
            tab_id: tab_id.to_owned(),
        })?;
    tab.group_id = Some(folder_id.to_owned());

    Ok(())
}

fn reorder_folder(
    doc: &mut SessionDocument,
    folder_id: &str,
    new_prev_sibling: Option<&str>,
) -> Result<()> {
    let workspace_id = doc
        .folders
        .iter()
        .find(|folder| folder.id == folder_id)
        .map(|folder| folder.workspace_id.clone())
        .ok_or_else(|| SessionError::UnknownFolder {
            folder_id: folder_id.to_owned(),
        })?;

    let mut order: Vec<String> = doc
        .folders_in_order(&workspace_id)?
        .iter()
        .map(|folder| folder.id.clone())
        .collect();
    order.retain(|entry| entry != folder_id);

    let at = match new_prev_sibling {
        None => 0,
        Some(prev) => {
            order
                .iter()
                .position(|entry| entry == prev)
                .ok_or_else(|| SessionError::UnknownFolder {
                    folder_id: prev.to_owned(),
                })?
                + 1
        }
    };
    order.insert(at, folder_id.to_owned());
    relink(doc, &order);

    Ok(())
}

fn reorder_tab(doc: &mut SessionDocument, tab_id: &str, new_position: usize) -> Result<()> {
    let from = doc
        .tabs
        .iter()
        .position(|tab| tab.id == tab_id)
        .ok_or_else(|| ApplyError::UnknownTab {
            tab_id: tab_id.to_owned(),
        })?;
    let folder_id = doc.tabs[from]
        .group_id
        .clone()
        .ok_or_else(|| ApplyError::UnassignedTab {
            tab_id: tab_id.to_owned(),
        })?;

    let tab = doc.tabs.remove(from);

    // Remaining visible members in array order; the placeholder never
    // counts toward positions.
    let members: Vec<usize> = doc
        .tabs
        .iter()
        .enumerate()
        .filter(|(_, tab)| tab.group_id.as_deref() == Some(folder_id.as_str()) && !tab.placeholder)
        .map(|(index, _)| index)
        .collect();

    let at = if new_position < members.len() {
        members[new_position]
    } else {
        members.last().map(|&index| index + 1).unwrap_or(from)
    };
    doc.tabs.insert(at, tab);

    Ok(())
}

/// Rewrite the sibling chain of one workspace from an explicit order.
fn relink(doc: &mut SessionDocument, order: &[String]) {
    for (position, folder_id) in order.iter().enumerate() {
        let prev = position
            .checked_sub(1)
            .map(|before| SiblingInfo::new(order[before].clone()));
        if let Some(folder) = doc.folders.iter_mut().find(|folder| folder.id == *folder_id) {
            folder.prev_sibling = prev;
        }
    }
}

/// Plan execution error types.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    /// Session model lookup or ordering failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A tab operation references a tab the document lacks.
    #[error("no tab with id {tab_id:?}")]
    UnknownTab { tab_id: String },

    /// A reorder targets a tab that sits outside any folder.
    #[error("tab {tab_id:?} is outside any folder")]
    UnassignedTab { tab_id: String },

    /// A create collides with an existing folder id.
    #[error("folder id {id:?} already exists")]
    DuplicateFolder { id: String },
}

/// Friendly result alias :3
pub type Result<T, E = ApplyError> = std::result::Result<T, E>;
