//! Work item storage.
//!
//! The store is owned by the UI. The orchestrator reads parameters from it
//! and writes render status and results back through the narrow
//! [`WorkItemStore`] interface.

mod memory;

pub use memory::InMemoryWorkItemStore;

use crate::core::{ImagePayload, InputStatus, ItemId, ItemKind, RenderStatus, WorkItem};
use crate::errors::RenderError;
use serde::{Deserialize, Serialize};

/// Operations the orchestrator consumes.
pub trait WorkItemStore: Send + Sync {
    /// Returns matching items in insertion order.
    fn list_items(&self, filter: &ItemFilter) -> Vec<WorkItem>;

    /// Returns one item by id.
    fn get(&self, id: ItemId) -> Option<WorkItem>;

    /// Changes an item's render status, optionally replacing its output.
    ///
    /// `output: None` keeps the current output. Transitions the render
    /// lifecycle forbids are rejected with [`RenderError::InvalidTransition`].
    fn update_status(
        &self,
        id: ItemId,
        status: RenderStatus,
        output: Option<ImagePayload>,
    ) -> Result<(), RenderError>;

    /// Appends items as one batch.
    fn append_items(&self, items: Vec<WorkItem>) -> Result<(), RenderError>;
}

/// Selects work items. Unset fields match everything.
///
/// Product-only criteria (`input_status`, `selected`) never match scenes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFilter {
    /// Item kind.
    pub kind: Option<ItemKind>,
    /// Product input status.
    pub input_status: Option<InputStatus>,
    /// Product selection flag.
    pub selected: Option<bool>,
    /// Render status to exclude.
    pub exclude_render_status: Option<RenderStatus>,
    /// Restrict to these ids.
    pub ids: Option<Vec<ItemId>>,
}

impl ItemFilter {
    /// Matches every item.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches product items.
    #[must_use]
    pub fn products() -> Self {
        Self {
            kind: Some(ItemKind::Product),
            ..Self::default()
        }
    }

    /// Matches scene items.
    #[must_use]
    pub fn scenes() -> Self {
        Self {
            kind: Some(ItemKind::Scene),
            ..Self::default()
        }
    }

    /// Restricts to products with the given input status.
    #[must_use]
    pub fn with_input_status(mut self, status: InputStatus) -> Self {
        self.input_status = Some(status);
        self
    }

    /// Restricts to products with the given selection flag.
    #[must_use]
    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = Some(selected);
        self
    }

    /// Excludes items in the given render status.
    #[must_use]
    pub fn excluding_status(mut self, status: RenderStatus) -> Self {
        self.exclude_render_status = Some(status);
        self
    }

    /// Restricts to the given ids.
    #[must_use]
    pub fn with_ids(mut self, ids: impl IntoIterator<Item = ItemId>) -> Self {
        self.ids = Some(ids.into_iter().collect());
        self
    }

    /// Returns true if `item` matches.
    #[must_use]
    pub fn matches(&self, item: &WorkItem) -> bool {
        if self.kind.is_some_and(|kind| kind != item.kind()) {
            return false;
        }
        if self.exclude_render_status == Some(item.render_status()) {
            return false;
        }
        if let Some(ids) = &self.ids {
            if !ids.contains(&item.id()) {
                return false;
            }
        }

        if self.input_status.is_none() && self.selected.is_none() {
            return true;
        }
        item.as_product().is_some_and(|product| {
            self.input_status.map_or(true, |s| s == product.input_status)
                && self.selected.map_or(true, |s| s == product.selected)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CameraAngle, ProductItem, SceneItem, ViewType};

    fn product() -> ProductItem {
        ProductItem::new("p", ImagePayload::new("image/png", vec![0]), ViewType::Front)
    }

    #[test]
    fn test_all_matches_everything() {
        let p: WorkItem = product().into();
        let s: WorkItem = SceneItem::new(vec![], CameraAngle::Wide, true).into();
        assert!(ItemFilter::all().matches(&p));
        assert!(ItemFilter::all().matches(&s));
    }

    #[test]
    fn test_kind_filter() {
        let s: WorkItem = SceneItem::new(vec![], CameraAngle::Wide, true).into();
        assert!(!ItemFilter::products().matches(&s));
        assert!(ItemFilter::scenes().matches(&s));
    }

    #[test]
    fn test_product_criteria_never_match_scenes() {
        let s: WorkItem = SceneItem::new(vec![], CameraAngle::Wide, true).into();
        assert!(!ItemFilter::all().with_selected(true).matches(&s));
    }

    #[test]
    fn test_confirmed_not_completed() {
        let filter = ItemFilter::products()
            .with_input_status(InputStatus::Confirmed)
            .excluding_status(RenderStatus::Completed);

        let imported: WorkItem = product().into();
        let confirmed: WorkItem = product().confirmed().into();
        let mut done = product().confirmed();
        done.render_status = RenderStatus::Completed;
        let done: WorkItem = done.into();

        assert!(!filter.matches(&imported));
        assert!(filter.matches(&confirmed));
        assert!(!filter.matches(&done));
    }

    #[test]
    fn test_id_filter() {
        let a: WorkItem = product().into();
        let b: WorkItem = product().into();
        let filter = ItemFilter::all().with_ids([a.id()]);
        assert!(filter.matches(&a));
        assert!(!filter.matches(&b));
    }
}
