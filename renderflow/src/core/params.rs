//! Render and staging parameters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Camera placement for a staged scene.
///
/// Serialized as its upper-case label (`"WIDE"`, `"TOP_DOWN"`, ...). Labels
/// that match no known angle are kept verbatim in [`CameraAngle::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CameraAngle {
    /// Wide establishing view of the whole room.
    Wide,
    /// Medium-range framing.
    Medium,
    /// Close-up on the products.
    CloseUp,
    /// Overhead view.
    TopDown,
    /// 45-degree diagonal view.
    SidePerspective,
    /// Extreme close-up on materials.
    DetailMacro,
    /// Unrecognized label.
    Custom(String),
}

impl CameraAngle {
    /// Returns the canonical label of the angle.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Wide => "WIDE",
            Self::Medium => "MEDIUM",
            Self::CloseUp => "CLOSEUP",
            Self::TopDown => "TOP_DOWN",
            Self::SidePerspective => "SIDE_PERSPECTIVE",
            Self::DetailMacro => "DETAIL_MACRO",
            Self::Custom(label) => label,
        }
    }
}

impl fmt::Display for CameraAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CameraAngle {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let angle = match s.trim().to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
            "WIDE" => Self::Wide,
            "MEDIUM" => Self::Medium,
            "CLOSEUP" | "CLOSE_UP" => Self::CloseUp,
            "TOP_DOWN" | "TOPDOWN" => Self::TopDown,
            "SIDE_PERSPECTIVE" | "SIDE" => Self::SidePerspective,
            "DETAIL_MACRO" | "MACRO" => Self::DetailMacro,
            _ => Self::Custom(s.to_string()),
        };
        Ok(angle)
    }
}

impl From<String> for CameraAngle {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(angle) => angle,
            Err(never) => match never {},
        }
    }
}

impl From<CameraAngle> for String {
    fn from(value: CameraAngle) -> Self {
        value.label().to_string()
    }
}

/// How densely the staged room is furnished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutDensity {
    /// Only the selected products and bare essentials.
    Minimal,
    /// A lived-in room with a moderate amount of decor.
    #[default]
    Balanced,
    /// A richly layered, fully furnished room.
    Abundant,
}

impl fmt::Display for LayoutDensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minimal => write!(f, "minimal"),
            Self::Balanced => write!(f, "balanced"),
            Self::Abundant => write!(f, "abundant"),
        }
    }
}

/// Inputs shared by every render call. Immutable for the duration of a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderParameters {
    /// Room the product is placed in, e.g. "Living Room".
    pub room_type: String,
    /// Lighting environment, e.g. "Natural Daylight".
    pub lighting: String,
    /// Direction the key light comes from.
    pub lighting_direction: String,
    /// Interior design style.
    pub design_style: String,
    /// Emotional tone of the shot.
    pub mood: String,
    /// Color palette to follow.
    pub palette: String,
    /// Whether the model may add props and furniture that were not supplied.
    #[serde(default = "default_allow_external_items")]
    pub allow_external_items: bool,
}

fn default_allow_external_items() -> bool {
    true
}

impl Default for RenderParameters {
    fn default() -> Self {
        Self {
            room_type: "Living Room".to_string(),
            lighting: "Natural Daylight".to_string(),
            lighting_direction: "Soft side light from the left".to_string(),
            design_style: "Modern Minimalist".to_string(),
            mood: "Calm and inviting".to_string(),
            palette: "Warm neutrals".to_string(),
            allow_external_items: default_allow_external_items(),
        }
    }
}

impl RenderParameters {
    /// Creates parameters with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the room type.
    #[must_use]
    pub fn with_room_type(mut self, room_type: impl Into<String>) -> Self {
        self.room_type = room_type.into();
        self
    }

    /// Sets the lighting environment and direction.
    #[must_use]
    pub fn with_lighting(mut self, lighting: impl Into<String>, direction: impl Into<String>) -> Self {
        self.lighting = lighting.into();
        self.lighting_direction = direction.into();
        self
    }

    /// Sets the design style.
    #[must_use]
    pub fn with_design_style(mut self, style: impl Into<String>) -> Self {
        self.design_style = style.into();
        self
    }

    /// Sets the mood.
    #[must_use]
    pub fn with_mood(mut self, mood: impl Into<String>) -> Self {
        self.mood = mood.into();
        self
    }

    /// Sets the palette.
    #[must_use]
    pub fn with_palette(mut self, palette: impl Into<String>) -> Self {
        self.palette = palette.into();
        self
    }

    /// Sets whether external items may be added.
    #[must_use]
    pub fn with_external_items(mut self, allowed: bool) -> Self {
        self.allow_external_items = allowed;
        self
    }
}

/// Parameters for a multi-angle staging run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingParameters {
    /// Base render parameters.
    #[serde(flatten)]
    pub render: RenderParameters,
    /// Furnishing density.
    #[serde(default)]
    pub layout_density: LayoutDensity,
    /// Free-form arrangement style, e.g. "Symmetrical".
    pub arrangement_style: String,
    /// Requested camera angles in configured order.
    pub angles: Vec<CameraAngle>,
}

impl Default for StagingParameters {
    fn default() -> Self {
        Self {
            render: RenderParameters::default(),
            layout_density: LayoutDensity::default(),
            arrangement_style: "Natural grouping".to_string(),
            angles: vec![CameraAngle::Wide],
        }
    }
}

impl StagingParameters {
    /// Creates staging parameters from base render parameters.
    #[must_use]
    pub fn new(render: RenderParameters) -> Self {
        Self {
            render,
            ..Self::default()
        }
    }

    /// Sets the requested angles.
    #[must_use]
    pub fn with_angles(mut self, angles: impl IntoIterator<Item = CameraAngle>) -> Self {
        self.angles = angles.into_iter().collect();
        self
    }

    /// Sets the layout density.
    #[must_use]
    pub fn with_layout_density(mut self, density: LayoutDensity) -> Self {
        self.layout_density = density;
        self
    }

    /// Sets the arrangement style.
    #[must_use]
    pub fn with_arrangement_style(mut self, style: impl Into<String>) -> Self {
        self.arrangement_style = style.into();
        self
    }

    /// Returns the render order of the requested angles.
    ///
    /// Duplicates are dropped (first occurrence wins), then `WIDE` is moved to
    /// the front with a stable sort so every other angle keeps its configured
    /// relative order. The first element is the master angle.
    #[must_use]
    pub fn sorted_angles(&self) -> Vec<CameraAngle> {
        let mut angles: Vec<CameraAngle> = Vec::with_capacity(self.angles.len());
        for angle in &self.angles {
            if !angles.contains(angle) {
                angles.push(angle.clone());
            }
        }
        angles.sort_by_key(|angle| *angle != CameraAngle::Wide);
        angles
    }
}
