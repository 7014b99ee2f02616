//! In-memory work item store.

use super::{ItemFilter, WorkItemStore};
use crate::core::{
    ImagePayload, InputStatus, ItemId, ProductItem, RenderStatus, SceneItem, WorkItem,
};
use crate::errors::RenderError;
use parking_lot::RwLock;

/// A [`WorkItemStore`] backed by a locked `Vec`.
///
/// Items keep insertion order. The lock is never held across an await.
#[derive(Debug, Default)]
pub struct InMemoryWorkItemStore {
    items: RwLock<Vec<WorkItem>>,
}

impl InMemoryWorkItemStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a product photo and returns its id.
    pub fn add_product(&self, product: ProductItem) -> ItemId {
        let id = product.id;
        self.items.write().push(WorkItem::Product(product));
        id
    }

    /// Sets a product's selection flag.
    pub fn set_selected(&self, id: ItemId, selected: bool) -> Result<(), RenderError> {
        self.with_product(id, |product| product.selected = selected)
    }

    /// Sets a product's input status.
    pub fn set_input_status(&self, id: ItemId, status: InputStatus) -> Result<(), RenderError> {
        self.with_product(id, |product| product.input_status = status)
    }

    /// Returns every product item.
    #[must_use]
    pub fn products(&self) -> Vec<ProductItem> {
        self.items
            .read()
            .iter()
            .filter_map(|item| item.as_product().cloned())
            .collect()
    }

    /// Returns every scene item.
    #[must_use]
    pub fn scenes(&self) -> Vec<SceneItem> {
        self.items
            .read()
            .iter()
            .filter_map(|item| item.as_scene().cloned())
            .collect()
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns true if the store holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    fn with_product<F>(&self, id: ItemId, f: F) -> Result<(), RenderError>
    where
        F: FnOnce(&mut ProductItem),
    {
        let mut items = self.items.write();
        match items.iter_mut().find(|item| item.id() == id) {
            Some(WorkItem::Product(product)) => {
                f(product);
                product.updated_at = chrono::Utc::now();
                Ok(())
            }
            Some(WorkItem::Scene(_)) => Err(RenderError::InvalidInput(format!(
                "{id} is a scene, not a product"
            ))),
            None => Err(RenderError::ItemNotFound(id)),
        }
    }
}

impl WorkItemStore for InMemoryWorkItemStore {
    fn list_items(&self, filter: &ItemFilter) -> Vec<WorkItem> {
        self.items
            .read()
            .iter()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect()
    }

    fn get(&self, id: ItemId) -> Option<WorkItem> {
        self.items.read().iter().find(|item| item.id() == id).cloned()
    }

    fn update_status(
        &self,
        id: ItemId,
        status: RenderStatus,
        output: Option<ImagePayload>,
    ) -> Result<(), RenderError> {
        let mut items = self.items.write();
        let item = items
            .iter_mut()
            .find(|item| item.id() == id)
            .ok_or(RenderError::ItemNotFound(id))?;

        let current = item.render_status();
        if !current.can_transition_to(status) {
            return Err(RenderError::InvalidTransition {
                id,
                from: current,
                to: status,
            });
        }

        item.apply_status(status, output);
        Ok(())
    }

    fn append_items(&self, new_items: Vec<WorkItem>) -> Result<(), RenderError> {
        let mut items = self.items.write();
        for (index, item) in new_items.iter().enumerate() {
            let id = item.id();
            if items.iter().chain(&new_items[..index]).any(|existing| existing.id() == id) {
                return Err(RenderError::InvalidInput(format!("duplicate item id {id}")));
            }
        }
        items.extend(new_items);
        Ok(())
    }
}
