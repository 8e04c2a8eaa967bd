// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command registry: name and alias resolution.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::command::CliCommand;

/// Immutable lookup table from command names and aliases to descriptors.
///
/// Built once at startup; concurrent reads need no synchronization.
pub struct Registry {
    commands: HashMap<String, Arc<dyn CliCommand>>,
    aliases: BTreeMap<String, String>,
}

impl Registry {
    /// Build a registry from descriptors and an alias table.
    ///
    /// Aliases whose target is missing are dropped, as are aliases that
    /// collide with a canonical name (the canonical command wins).
    pub fn new(commands: Vec<Arc<dyn CliCommand>>, aliases: Vec<(String, String)>) -> Self {
        let mut by_name: HashMap<String, Arc<dyn CliCommand>> =
            commands.into_iter().map(|c| (c.name().to_string(), c)).collect();
        let mut valid_aliases = BTreeMap::new();
        for (alias, target) in aliases {
            if by_name.contains_key(&alias) || !by_name.contains_key(&target) {
                continue;
            }
            if let Some(command) = by_name.get(&target).cloned() {
                by_name.insert(alias.clone(), command);
                valid_aliases.insert(alias, target);
            }
        }
        Self { commands: by_name, aliases: valid_aliases }
    }

    /// Resolve a command or alias name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn CliCommand>> {
        self.commands.get(name)
    }

    /// All non-internal commands, sorted by name, aliases excluded.
    pub fn visible(&self) -> Vec<&Arc<dyn CliCommand>> {
        let mut visible: Vec<_> = self
            .commands
            .iter()
            .filter(|(name, c)| !c.is_internal() && !self.aliases.contains_key(*name))
            .map(|(_, c)| c)
            .collect();
        visible.sort_by_key(|c| c.name());
        visible
    }

    /// The retained alias table, alias → canonical name.
    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
