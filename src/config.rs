// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Folder specification layout.
//!
//! Specify the layout for the declarative YAML file that describes which
//! folders should exist and which pinned tabs belong in them. File I/O is a
//! thin wrapper over [`FromStr`], so callers and tests can parse straight
//! from strings.
//!
//! # General Layout
//!
//! The top level maps workspace names to folder mappings. Each folder maps
//! tab titles to URL match patterns:
//!
//! ```yaml
//! Work:
//!   Infra:
//!     Fly: fly.io
//!     Hetzner: hetzner.com
//!   Comms:
//!     Mail: mail.proton.me
//! ```
//!
//! Key order is meaningful at every level: it defines the target render
//! order of folders and of tabs inside each folder. The parser therefore
//! walks YAML mappings directly, which preserve document order, and
//! materializes plain vectors. Hash maps would silently destroy the one
//! piece of information this format exists to carry.
//!
//! Tab titles are labels for humans and diagnostics; matching is driven by
//! the URL pattern alone.

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Parsed folder specification, order-preserving at every level.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FolderSpec {
    pub workspaces: Vec<WorkspaceSpec>,
}

/// Desired folders of one workspace in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkspaceSpec {
    pub name: String,
    pub folders: Vec<FolderEntry>,
}

/// One declared folder and its tabs in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FolderEntry {
    pub name: String,
    pub tabs: Vec<TabEntry>,
}

/// One declared tab: a display title and the URL pattern that finds it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TabEntry {
    pub title: String,
    pub pattern: String,
}

impl FolderSpec {
    /// Load a folder specification from disk.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if the file cannot be read.
    /// - Return any error [`FromStr`] produces for its content.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|err| ConfigError::Read {
            source: err,
            path: path.as_ref().to_owned(),
        })?;

        content.parse()
    }

    /// Restrict the specification to a single workspace by name.
    pub fn retain_workspace(&mut self, name: &str) {
        self.workspaces.retain(|workspace| workspace.name == name);
    }
}

impl FromStr for FolderSpec {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let root: serde_yaml::Value = serde_yaml::from_str(data)?;
        let root = as_mapping(&root, "<top level>")?;

        let mut workspaces = Vec::with_capacity(root.len());
        for (key, body) in root {
            let workspace = as_string(key, "<top level>")?;
            let folders_map = as_mapping(body, &workspace)?;

            let mut folders = Vec::with_capacity(folders_map.len());
            for (key, body) in folders_map {
                let folder = as_string(key, &workspace)?;
                let at = format!("{workspace}.{folder}");
                let tabs_map = as_mapping(body, &at)?;

                let mut tabs = Vec::with_capacity(tabs_map.len());
                for (key, value) in tabs_map {
                    let title = as_string(key, &at)?;
                    let pattern = match value.as_str() {
                        Some(pattern) => pattern.to_owned(),
                        None => {
                            return Err(ConfigError::Shape {
                                at: format!("{at}.{title}"),
                                expected: "a URL pattern string",
                            })
                        }
                    };
                    tabs.push(TabEntry { title, pattern });
                }

                folders.push(FolderEntry { name: folder, tabs });
            }

            workspaces.push(WorkspaceSpec {
                name: workspace,
                folders,
            });
        }

        Ok(Self { workspaces })
    }
}

fn as_mapping<'a>(
    value: &'a serde_yaml::Value,
    at: &str,
) -> Result<&'a serde_yaml::Mapping, ConfigError> {
    value.as_mapping().ok_or_else(|| ConfigError::Shape {
        at: at.to_owned(),
        expected: "a mapping",
    })
}

fn as_string(value: &serde_yaml::Value, at: &str) -> Result<String, ConfigError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| ConfigError::Shape {
            at: at.to_owned(),
            expected: "a string key",
        })
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read folder spec at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration parsed but has the wrong shape.
    #[error("expected {expected} at {at}")]
    Shape { at: String, expected: &'static str },
}

/// Friendly result alias :3
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_preserves_declaration_order() {
        let spec: FolderSpec = indoc! {r#"
            Work:
              Infra:
                Fly: fly.io
                Hetzner: hetzner.com
              Comms:
                Mail: mail.proton.me
            Personal:
              Reading:
                Lobsters: lobste.rs
        "#}
        .parse()
        .unwrap();

        let expect = FolderSpec {
            workspaces: vec![
                WorkspaceSpec {
                    name: "Work".into(),
                    folders: vec![
                        FolderEntry {
                            name: "Infra".into(),
                            tabs: vec![
                                TabEntry {
                                    title: "Fly".into(),
                                    pattern: "fly.io".into(),
                                },
                                TabEntry {
                                    title: "Hetzner".into(),
                                    pattern: "hetzner.com".into(),
                                },
                            ],
                        },
                        FolderEntry {
                            name: "Comms".into(),
                            tabs: vec![TabEntry {
                                title: "Mail".into(),
                                pattern: "mail.proton.me".into(),
                            }],
                        },
                    ],
                },
                WorkspaceSpec {
                    name: "Personal".into(),
                    folders: vec![FolderEntry {
                        name: "Reading".into(),
                        tabs: vec![TabEntry {
                            title: "Lobsters".into(),
                            pattern: "lobste.rs".into(),
                        }],
                    }],
                },
            ],
        };

        assert_eq!(spec, expect);
    }

    #[test]
    fn parse_rejects_mapping_as_pattern() {
        let result = indoc! {r#"
            Work:
              Infra:
                Fly:
                  nested: true
        "#}
        .parse::<FolderSpec>();

        match result {
            Err(ConfigError::Shape { at, .. }) => assert_eq!(at, "Work.Infra.Fly"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn parse_rejects_scalar_folder_body() {
        let result = indoc! {r#"
            Work:
              Infra: not-a-mapping
        "#}
        .parse::<FolderSpec>();

        match result {
            Err(ConfigError::Shape { at, expected }) => {
                assert_eq!(at, "Work.Infra");
                assert_eq!(expected, "a mapping");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn parse_rejects_invalid_yaml() {
        let result = "Work: [unclosed".parse::<FolderSpec>();
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn empty_folder_is_allowed() {
        let spec: FolderSpec = indoc! {r#"
            Work:
              Inbox: {}
        "#}
        .parse()
        .unwrap();

        assert_eq!(spec.workspaces[0].folders[0].tabs, Vec::new());
    }

    #[test]
    fn retain_workspace_filters_by_name() {
        let mut spec: FolderSpec = indoc! {r#"
            Work:
              Infra:
                Fly: fly.io
            Personal:
              Reading:
                Lobsters: lobste.rs
        "#}
        .parse()
        .unwrap();

        spec.retain_workspace("Personal");

        assert_eq!(spec.workspaces.len(), 1);
        assert_eq!(spec.workspaces[0].name, "Personal");
    }
}
