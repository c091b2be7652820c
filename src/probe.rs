// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Browser process detection.
//!
//! Writing the session file while the browser runs is unsafe: the browser
//! holds its own in-memory copy and overwrites the file on exit, discarding
//! anything written underneath it. This module offers a best-effort presence
//! check the CLI consults before `apply`.
//!
//! The check is advisory by nature. It races against the browser starting a
//! moment later and it only knows a fixed set of executable names, so it can
//! warn, but it can never guarantee safety. Core logic never depends on it;
//! it is injected at the command layer precisely so library users and tests
//! stay platform-independent.

use sysinfo::System;

/// Capability check for a running browser instance.
pub trait BrowserProbe {
    /// Best-effort check whether the target browser appears to be running.
    fn browser_running(&self) -> bool;
}

/// Any closure works as a probe, which keeps tests trivial.
impl<F> BrowserProbe for F
where
    F: Fn() -> bool,
{
    fn browser_running(&self) -> bool {
        self()
    }
}

/// Process-table probe backed by sysinfo.
#[derive(Debug)]
pub struct SysinfoProbe {
    names: Vec<String>,
}

impl SysinfoProbe {
    /// Probe for the stock Zen executable names.
    pub fn new() -> Self {
        Self::with_names(["zen", "zen-bin"])
    }

    /// Probe for a custom set of executable names.
    pub fn with_names(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            names: names
                .into_iter()
                .map(|name| name.into().to_lowercase())
                .collect(),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowserProbe for SysinfoProbe {
    /// Scan the process table for a known executable name.
    ///
    /// Names are compared exactly (case-insensitive) so "zenity" and
    /// friends never trip the check.
    fn browser_running(&self) -> bool {
        let mut system = System::new();
        system.refresh_processes();
        system.processes().values().any(|process| {
            let name = process.name().to_lowercase();
            self.names.iter().any(|known| *known == name)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_probes() {
        let always = || true;
        let never = || false;

        assert!(always.browser_running());
        assert!(!never.browser_running());
    }

    #[test]
    fn probe_without_names_finds_nothing() {
        let probe = SysinfoProbe::with_names(Vec::<String>::new());
        assert!(!probe.browser_running());
    }
}
