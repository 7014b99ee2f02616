//! Work items tracked by the orchestrator.

use super::{CameraAngle, ImagePayload, InputStatus, RenderStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of a work item.
pub type ItemId = Uuid;

/// Which side of the product a photo shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewType {
    /// Front view.
    #[default]
    Front,
    /// Side view.
    Side,
    /// Top view.
    Top,
    /// Back view.
    Back,
    /// Detail shot.
    Detail,
}

impl fmt::Display for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Front => write!(f, "front"),
            Self::Side => write!(f, "side"),
            Self::Top => write!(f, "top"),
            Self::Back => write!(f, "back"),
            Self::Detail => write!(f, "detail"),
        }
    }
}

/// Discriminant of a [`WorkItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// A product photo.
    Product,
    /// A staged scene.
    Scene,
}

/// An imported product photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductItem {
    /// Item identity.
    pub id: ItemId,
    /// Human-readable label, usually the file name.
    pub label: String,
    /// Source photo.
    pub source: ImagePayload,
    /// Side of the product shown.
    pub view_type: ViewType,
    /// Review lifecycle.
    pub input_status: InputStatus,
    /// Whether the product is selected for staging.
    pub selected: bool,
    /// Render lifecycle.
    pub render_status: RenderStatus,
    /// Rendered output.
    pub output: Option<ImagePayload>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl ProductItem {
    /// Creates a freshly imported product item.
    #[must_use]
    pub fn new(label: impl Into<String>, source: ImagePayload, view_type: ViewType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
            source,
            view_type,
            input_status: InputStatus::Imported,
            selected: false,
            render_status: RenderStatus::Pending,
            output: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Marks the item as confirmed.
    #[must_use]
    pub fn confirmed(mut self) -> Self {
        self.input_status = InputStatus::Confirmed;
        self
    }

    /// Marks the item as selected for staging.
    #[must_use]
    pub fn selected(mut self) -> Self {
        self.selected = true;
        self
    }
}

/// A staged scene depicting a fixed set of products from one camera angle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneItem {
    /// Item identity.
    pub id: ItemId,
    product_ids: Vec<ItemId>,
    /// Camera angle of the scene.
    pub angle: CameraAngle,
    /// Whether this scene is the master shot of its run.
    pub is_master: bool,
    /// Render lifecycle.
    pub render_status: RenderStatus,
    /// Rendered output.
    pub output: Option<ImagePayload>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl SceneItem {
    /// Creates a pending scene.
    #[must_use]
    pub fn new(product_ids: Vec<ItemId>, angle: CameraAngle, is_master: bool) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            product_ids,
            angle,
            is_master,
            render_status: RenderStatus::Pending,
            output: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Products depicted by the scene. Fixed at creation.
    #[must_use]
    pub fn product_ids(&self) -> &[ItemId] {
        &self.product_ids
    }
}

/// A unit of work the orchestrator tracks status for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkItem {
    /// A product photo.
    Product(ProductItem),
    /// A staged scene.
    Scene(SceneItem),
}

impl WorkItem {
    /// Returns the item id.
    #[must_use]
    pub fn id(&self) -> ItemId {
        match self {
            Self::Product(p) => p.id,
            Self::Scene(s) => s.id,
        }
    }

    /// Returns the item kind.
    #[must_use]
    pub fn kind(&self) -> ItemKind {
        match self {
            Self::Product(_) => ItemKind::Product,
            Self::Scene(_) => ItemKind::Scene,
        }
    }

    /// Returns the render status.
    #[must_use]
    pub fn render_status(&self) -> RenderStatus {
        match self {
            Self::Product(p) => p.render_status,
            Self::Scene(s) => s.render_status,
        }
    }

    /// Returns the rendered output, if any.
    #[must_use]
    pub fn output(&self) -> Option<&ImagePayload> {
        match self {
            Self::Product(p) => p.output.as_ref(),
            Self::Scene(s) => s.output.as_ref(),
        }
    }

    /// Returns the product item, if this is one.
    #[must_use]
    pub fn as_product(&self) -> Option<&ProductItem> {
        match self {
            Self::Product(p) => Some(p),
            Self::Scene(_) => None,
        }
    }

    /// Returns the scene item, if this is one.
    #[must_use]
    pub fn as_scene(&self) -> Option<&SceneItem> {
        match self {
            Self::Scene(s) => Some(s),
            Self::Product(_) => None,
        }
    }

    /// Applies a status change and optional output.
    ///
    /// Passing `None` keeps the current output.
    pub(crate) fn apply_status(&mut self, status: RenderStatus, output: Option<ImagePayload>) {
        let (render_status, current, updated_at) = match self {
            Self::Product(p) => (&mut p.render_status, &mut p.output, &mut p.updated_at),
            Self::Scene(s) => (&mut s.render_status, &mut s.output, &mut s.updated_at),
        };
        *render_status = status;
        if let Some(image) = output {
            *current = Some(image);
        }
        *updated_at = Utc::now();
    }
}

impl From<ProductItem> for WorkItem {
    fn from(item: ProductItem) -> Self {
        Self::Product(item)
    }
}

impl From<SceneItem> for WorkItem {
    fn from(item: SceneItem) -> Self {
        Self::Scene(item)
    }
}
