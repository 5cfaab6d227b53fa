// This file is part of testsh, a POSIX-style job-controlling shell.
// Copyright (C) 2025 testsh developers
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Type definitions for shell variables
//!
//! A variable keeps its `name=value` string form so that it can be handed
//! to a child environment without reassembly. Variables imported from the
//! startup environment are marked *external*; only external variables are
//! passed on to child processes.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Definition of a variable
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Variable {
    /// The `name=value` string
    raw: String,
    /// Byte position of the `=` separating name and value
    eq: usize,
    /// Whether the variable was inherited from the startup environment
    pub external: bool,
}

impl Variable {
    /// Builds a variable from its `name=value` string form.
    ///
    /// If the string contains no `=`, one is appended, making the value
    /// empty.
    fn parse(mut raw: String, external: bool) -> Self {
        let eq = match raw.find('=') {
            Some(position) => position,
            None => {
                let position = raw.len();
                raw.push('=');
                position
            }
        };
        Variable { raw, eq, external }
    }

    /// Name of the variable.
    pub fn name(&self) -> &str {
        &self.raw[..self.eq]
    }

    /// Value of the variable.
    pub fn value(&self) -> &str {
        &self.raw[self.eq + 1..]
    }

    /// The whole `name=value` string.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// Collection of variables, keyed by name
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VariableSet {
    vars: HashMap<String, Variable>,
}

impl VariableSet {
    /// Inserts or updates a variable from its `name=value` string form.
    ///
    /// When `external` is `None`, an existing variable keeps its
    /// attribute and a new one defaults to not external.
    pub fn upsert(&mut self, raw: String, external: Option<bool>) {
        let variable = Variable::parse(raw, external.unwrap_or(false));
        match self.vars.entry(variable.name().to_string()) {
            Entry::Occupied(mut entry) => {
                let external = external.unwrap_or(entry.get().external);
                let mut variable = variable;
                variable.external = external;
                entry.insert(variable);
            }
            Entry::Vacant(entry) => {
                entry.insert(variable);
            }
        }
    }

    /// Looks up a variable by name.
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.vars.get(name)
    }

    /// Iterates over all variables in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.vars.values()
    }

    /// Number of variables in the set.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_set_upsert_and_get() {
        let mut vars = VariableSet::default();
        vars.upsert("PATH=/bin:/usr/bin".to_string(), Some(true));
        let path = vars.get("PATH").unwrap();
        assert_eq!(path.name(), "PATH");
        assert_eq!(path.value(), "/bin:/usr/bin");
        assert_eq!(path.raw(), "PATH=/bin:/usr/bin");
        assert!(path.external);
        assert_eq!(vars.get("HOME"), None);
    }

    #[test]
    fn variable_set_upsert_replaces_value() {
        let mut vars = VariableSet::default();
        vars.upsert("A=1".to_string(), None);
        vars.upsert("A=2".to_string(), None);
        assert_eq!(vars.len(), 1);
        assert_eq!(vars.get("A").unwrap().value(), "2");
    }

    #[test]
    fn variable_set_upsert_keeps_attribute_by_default() {
        let mut vars = VariableSet::default();
        vars.upsert("A=1".to_string(), Some(true));
        vars.upsert("A=2".to_string(), None);
        assert!(vars.get("A").unwrap().external);

        vars.upsert("B=1".to_string(), None);
        assert!(!vars.get("B").unwrap().external);
    }

    #[test]
    fn variable_without_equals_gets_empty_value() {
        let mut vars = VariableSet::default();
        vars.upsert("LONE".to_string(), None);
        let lone = vars.get("LONE").unwrap();
        assert_eq!(lone.name(), "LONE");
        assert_eq!(lone.value(), "");
    }

    #[test]
    fn variable_value_may_contain_equals() {
        let mut vars = VariableSet::default();
        vars.upsert("EQ=a=b".to_string(), None);
        assert_eq!(vars.get("EQ").unwrap().value(), "a=b");
    }
}
