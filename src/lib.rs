// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Declarative pinned-tab folder management for the Zen browser.
//!
//! Zenfold reads the browser's compressed session file, compares its pinned
//! tab folders against a YAML specification, and computes an ordered plan of
//! mutations (create folder, assign tab, reorder) that brings the session in
//! line with the declaration. Plans can be inspected (`diff`) or executed
//! (`apply`) with a mandatory backup and an atomic write.
//!
//! The library carries no global state: profile and workspace selection are
//! plain arguments everywhere, so the whole pipeline is usable outside the
//! CLI, tests included.

pub mod check;
pub mod codec;
pub mod config;
pub mod matcher;
pub mod path;
pub mod probe;
pub mod reconcile;
pub mod session;
