// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Per-component definition registry.
//!
//! Each connector owns a static [`DefinitionCell`] that loads its
//! definition on first use. Concurrent first callers block until that load
//! finishes and then all observe the same immutable definition.
//!
//! Connectors also submit a [`ComponentRegistration`] through `inventory`
//! so hosts can discover every linked component by id.

use once_cell::sync::OnceCell;

use crate::definition::ComponentDefinition;
use crate::error::LoadError;

/// One-time guard around a component's definition.
pub struct DefinitionCell {
    cell: OnceCell<ComponentDefinition>,
}

impl DefinitionCell {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Return the definition, running `load` if no load has succeeded yet.
    pub fn get_or_load<F>(&self, load: F) -> Result<&ComponentDefinition, LoadError>
    where
        F: FnOnce() -> Result<ComponentDefinition, LoadError>,
    {
        self.cell.get_or_try_init(load)
    }

    pub fn get(&self) -> Option<&ComponentDefinition> {
        self.cell.get()
    }
}

impl Default for DefinitionCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Discovery entry for a linked component.
pub struct ComponentRegistration {
    /// Component definition id, e.g. `github`.
    pub id: &'static str,
    /// Loads (once) and returns the component's definition.
    pub definition: fn() -> Result<&'static ComponentDefinition, LoadError>,
}

// Register ComponentRegistration with inventory
inventory::collect!(&'static ComponentRegistration);

/// All components linked into the binary.
pub fn registered_components() -> impl Iterator<Item = &'static ComponentRegistration> {
    inventory::iter::<&'static ComponentRegistration>
        .into_iter()
        .copied()
}

/// Find a linked component by definition id.
pub fn find_component(id: &str) -> Option<&'static ComponentRegistration> {
    registered_components().find(|registration| registration.id == id)
}

/// Load every linked component, failing on the first invalid definition.
pub fn load_all() -> Result<Vec<&'static ComponentDefinition>, LoadError> {
    registered_components()
        .map(|registration| (registration.definition)())
        .collect()
}
