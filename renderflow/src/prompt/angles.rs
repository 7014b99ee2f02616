//! Camera angle phrasing.

use crate::core::CameraAngle;

/// Returns the framing phrase used in instructions for an angle.
///
/// Custom angles fall back to their raw label.
#[must_use]
pub fn angle_description(angle: &CameraAngle) -> &str {
    match angle {
        CameraAngle::Wide => "a wide-angle panoramic establishing shot that shows the entire room",
        CameraAngle::Medium => "a medium-range shot framing the products together with their immediate surroundings",
        CameraAngle::CloseUp => "a close-up macro detail shot focused on the products",
        CameraAngle::TopDown => "a top-down bird's-eye view looking straight down on the arrangement",
        CameraAngle::SidePerspective => "a 45-degree diagonal side perspective across the room",
        CameraAngle::DetailMacro => "an extreme close-up on surface finish, texture and material detail",
        CameraAngle::Custom(label) => label,
    }
}
