// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Pinned tab matching.
//!
//! Resolve URL patterns from the folder specification to actual pinned tabs
//! of one workspace. Matching is deliberately simple: a pattern matches a
//! tab when it is a case-insensitive substring of the tab's URL. The
//! acceptable tradeoff is that a careless short pattern can match more than
//! one tab. When that happens the first match in `tabs` array order wins and
//! the caller receives an ambiguity signal to surface as a warning; users
//! are steered toward distinguishing fragments (`//x.com` rather than
//! `x.com`) instead of a heavier pattern language.
//!
//! Only pinned, non-placeholder tabs of the target workspace participate.

use crate::session::SessionDocument;

/// Outcome of resolving one URL pattern.
///
/// Indices point into the document's `tabs` array so callers can reach the
/// matched tab without cloning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TabMatch {
    /// No pinned tab of the workspace matched. Non-fatal: the caller skips
    /// this one assignment and reports it.
    None,

    /// Exactly one tab matched.
    Unique(usize),

    /// More than one tab matched. The first in array order is used; the
    /// caller logs the ambiguity and proceeds.
    Ambiguous { first: usize, total: usize },
}

impl TabMatch {
    /// Index of the tab the pattern resolves to, if any.
    pub fn chosen(&self) -> Option<usize> {
        match self {
            Self::None => None,
            Self::Unique(index) => Some(*index),
            Self::Ambiguous { first, .. } => Some(*first),
        }
    }
}

/// Resolve a URL pattern against the pinned tabs of a workspace.
pub fn find_tab(doc: &SessionDocument, workspace_id: &str, pattern: &str) -> TabMatch {
    let needle = pattern.to_lowercase();
    let mut matches = doc.tabs.iter().enumerate().filter(|(_, tab)| {
        tab.workspace_id == workspace_id
            && tab.pinned
            && !tab.placeholder
            && tab.url.to_lowercase().contains(&needle)
    });

    let first = match matches.next() {
        Some((index, _)) => index,
        None => return TabMatch::None,
    };

    match matches.count() {
        0 => TabMatch::Unique(first),
        rest => TabMatch::Ambiguous {
            first,
            total: rest + 1,
        },
    }
}
