//! Admin principals and capability checks.

use std::collections::BTreeSet;

/// Actor name used when the admin listener is trusted without an identity.
pub const LOCAL_ADMIN: &str = "admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    /// Reorder items.
    EditItems,
    /// Change plugin settings.
    ManageOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub name: String,
    capabilities: BTreeSet<Capability>,
}

impl Principal {
    pub fn new(
        name: impl Into<String>,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Self {
        Self {
            name: name.into(),
            capabilities: capabilities.into_iter().collect(),
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// Maps the identity presented on a request to a principal.
///
/// `editors` may reorder; `managers` may reorder and change settings. With
/// both lists empty every caller of the admin listener is a manager.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    editors: BTreeSet<String>,
    managers: BTreeSet<String>,
}

impl AccessPolicy {
    pub fn new(
        editors: impl IntoIterator<Item = String>,
        managers: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            editors: editors.into_iter().collect(),
            managers: managers.into_iter().collect(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.editors.is_empty() && self.managers.is_empty()
    }

    pub fn resolve(&self, identity: Option<&str>) -> Option<Principal> {
        let identity = identity.map(str::trim).filter(|value| !value.is_empty());

        if self.is_open() {
            let name = identity.unwrap_or(LOCAL_ADMIN);
            return Some(Principal::new(
                name,
                [Capability::EditItems, Capability::ManageOptions],
            ));
        }

        let name = identity?;
        if self.managers.contains(name) {
            Some(Principal::new(
                name,
                [Capability::EditItems, Capability::ManageOptions],
            ))
        } else if self.editors.contains(name) {
            Some(Principal::new(name, [Capability::EditItems]))
        } else {
            None
        }
    }
}
