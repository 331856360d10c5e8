use tracing::debug;

use super::{ActionId, ActionSelection, Controller};

/// A visible action and its cached settings
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub id: ActionId,
    pub controller: Controller,
    pub selection: ActionSelection,
}

/// Bound actions in the order they appeared
#[derive(Debug, Default)]
pub struct Bindings {
    actions: Vec<Binding>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an action, or refresh it if the host re-sends an appear.
    /// Returns true when the action was not bound before.
    pub fn bind(&mut self, id: ActionId, controller: Controller, selection: ActionSelection) -> bool {
        if let Some(existing) = self.get_mut(&id) {
            existing.controller = controller;
            existing.selection = selection;
            return false;
        }

        debug!(action = %id, ?controller, "action bound");
        self.actions.push(Binding {
            id,
            controller,
            selection,
        });
        true
    }

    pub fn unbind(&mut self, id: &ActionId) -> Option<Binding> {
        let idx = self.actions.iter().position(|b| &b.id == id)?;
        debug!(action = %id, "action unbound");
        Some(self.actions.remove(idx))
    }

    pub fn get(&self, id: &ActionId) -> Option<&Binding> {
        self.actions.iter().find(|b| &b.id == id)
    }

    pub fn get_mut(&mut self, id: &ActionId) -> Option<&mut Binding> {
        self.actions.iter_mut().find(|b| &b.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.actions.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Binding> {
        self.actions.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
