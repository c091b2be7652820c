// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine where the folder specification and the browser's session file
//! live. The browser keeps one directory per profile under a platform
//! specific root, and each profile stores its session at a fixed file name
//! inside it.

use std::{
    fs,
    path::{Path, PathBuf},
};

/// File name of the session container inside a profile directory.
pub const SESSION_FILE_NAME: &str = "sessionstore.jsonlz4";

/// Determine default absolute path to the folder specification.
///
/// Uses `$XDG_CONFIG_HOME/zenfold/folders.yaml`. Does not check that the
/// path actually exists.
///
/// # Errors
///
/// - Return [`PathError::NoWayHome`] if the configuration directory cannot
///   be determined.
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("zenfold").join("folders.yaml"))
        .ok_or(PathError::NoWayHome)
}

/// Expand `~` and environment variables in a user-supplied path.
///
/// # Errors
///
/// - Return [`PathError::Expansion`] if an environment variable in the path
///   cannot be resolved.
pub fn expand_path(input: &str) -> Result<PathBuf> {
    Ok(PathBuf::from(
        shellexpand::full(input)
            .map_err(PathError::Expansion)?
            .into_owned(),
    ))
}

/// Determine the platform root holding all browser profiles.
///
/// # Errors
///
/// - Return [`PathError::NoWayHome`] if the home directory cannot be
///   determined.
pub fn profiles_root() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(PathError::NoWayHome)?;
    if cfg!(target_os = "macos") {
        Ok(home
            .join("Library")
            .join("Application Support")
            .join("zen")
            .join("Profiles"))
    } else {
        Ok(home.join(".zen"))
    }
}

/// Locate the session file of a profile under a profile root.
///
/// With a name, matches the directory called exactly `name` or ending in
/// `.name` (profile directories carry a random prefix). Without a name,
/// picks the single directory whose name contains `default`.
///
/// # Errors
///
/// - Return [`PathError::ReadProfiles`] if the root cannot be listed.
/// - Return [`PathError::ProfileNotFound`] / [`PathError::NoDefaultProfile`]
///   if no directory matches.
pub fn session_file_in(root: &Path, profile: Option<&str>) -> Result<PathBuf> {
    let mut entries: Vec<PathBuf> = fs::read_dir(root)
        .map_err(|err| PathError::ReadProfiles {
            source: err,
            root: root.to_owned(),
        })?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    entries.sort();

    let dir = match profile {
        Some(name) => entries
            .iter()
            .find(|path| {
                file_name(path).map(|dir_name| {
                    dir_name == name || dir_name.ends_with(&format!(".{name}"))
                }) == Some(true)
            })
            .ok_or_else(|| PathError::ProfileNotFound {
                root: root.to_owned(),
                name: name.to_owned(),
            })?,
        None => entries
            .iter()
            .find(|path| file_name(path).is_some_and(|dir_name| dir_name.contains("default")))
            .ok_or_else(|| PathError::NoDefaultProfile {
                root: root.to_owned(),
            })?,
    };

    Ok(dir.join(SESSION_FILE_NAME))
}

/// Locate the session file of a profile under the platform root.
///
/// # Errors
///
/// - Return any error of [`profiles_root`] and [`session_file_in`].
pub fn session_file(profile: Option<&str>) -> Result<PathBuf> {
    session_file_in(&profiles_root()?, profile)
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

/// Path resolution error types.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// No way to determine the user's home or config directory.
    #[error("cannot determine absolute path to user's home directory")]
    NoWayHome,

    /// Shell expansion of a user-supplied path failed.
    #[error(transparent)]
    Expansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Profile root cannot be listed.
    #[error("failed to list browser profiles under {:?}", root.display())]
    ReadProfiles {
        #[source]
        source: std::io::Error,
        root: PathBuf,
    },

    /// No profile directory matches the requested name.
    #[error("no profile named {name:?} under {:?}", root.display())]
    ProfileNotFound { root: PathBuf, name: String },

    /// No default profile directory exists and none was named.
    #[error("no default profile under {:?}, pass --profile", root.display())]
    NoDefaultProfile { root: PathBuf },
}

/// Friendly result alias :3
pub type Result<T, E = PathError> = std::result::Result<T, E>;
