//! Request composition for the three request kinds.

use super::angle_description;
use crate::core::{
    CameraAngle, GenerationRequest, ImagePayload, OutputHints, RenderParameters,
    StagingParameters, ViewType,
};

/// Builds [`GenerationRequest`]s. Holds only the output hints attached to
/// every request, so composition has no hidden state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptComposer {
    output: OutputHints,
}

impl PromptComposer {
    /// Creates a composer that attaches `output` hints to every request.
    #[must_use]
    pub fn new(output: OutputHints) -> Self {
        Self { output }
    }

    /// Returns the output hints.
    #[must_use]
    pub fn output_hints(&self) -> &OutputHints {
        &self.output
    }

    /// Single-product render: references are `[product, mood_board?]`.
    #[must_use]
    pub fn product_render(
        &self,
        product: &ImagePayload,
        view_type: ViewType,
        params: &RenderParameters,
        mood_board: Option<&ImagePayload>,
    ) -> GenerationRequest {
        let mut references = vec![product.clone()];
        references.extend(mood_board.cloned());

        let mut lines = vec![
            format!(
                "Create a photorealistic, CGI-quality product render using the first image, \
                 which shows the {view_type} view of the product."
            ),
            "Keep the product's shape, proportions, materials, colors and branding exactly as photographed."
                .to_string(),
            format!("Place it in a {} designed in a {} style.", params.room_type, params.design_style),
            format!(
                "Lighting: {}, with the key light coming from {}.",
                params.lighting, params.lighting_direction
            ),
            format!("Mood: {}. Color palette: {}.", params.mood, params.palette),
            external_items_rule(params.allow_external_items).to_string(),
        ];
        if mood_board.is_some() {
            lines.push(
                "The second image is a mood board. Emulate its visual style exactly: \
                 its color grading, textures, materials and atmosphere."
                    .to_string(),
            );
        }
        lines.push(QUALITY_RULE.to_string());

        self.request(references, &lines)
    }

    /// Scene establishment (no `master_shot`) or relocation (with one).
    ///
    /// Relocation references are `[master, products...]` and the mood board is
    /// not sent again, since the master already carries its style. Master
    /// references are `[mood_board?, products...]`.
    #[must_use]
    pub fn scene(
        &self,
        products: &[ImagePayload],
        params: &StagingParameters,
        angle: &CameraAngle,
        mood_board: Option<&ImagePayload>,
        master_shot: Option<&ImagePayload>,
    ) -> GenerationRequest {
        let render = &params.render;
        let framing = angle_description(angle);
        let mut references = Vec::with_capacity(products.len() + 1);
        let mut lines = Vec::new();

        if let Some(master) = master_shot {
            references.push(master.clone());
            references.extend(products.iter().cloned());

            lines.push(
                "The first image is the MASTER SHOT of an already staged room. \
                 The remaining images are the products placed in that room."
                    .to_string(),
            );
            lines.push(format!(
                "Move the camera to a new position and render {framing} of the SAME room."
            ));
            lines.push(
                "This must be a genuinely new viewpoint. Do NOT duplicate or slightly crop \
                 the master framing."
                    .to_string(),
            );
            lines.push(
                "Preserve the room structure, wall treatment, materials, lighting and every \
                 piece of furniture placement exactly as in the master shot."
                    .to_string(),
            );
        } else {
            let product_offset = usize::from(mood_board.is_some());
            if let Some(board) = mood_board {
                references.push(board.clone());
            }
            references.extend(products.iter().cloned());

            if mood_board.is_some() {
                lines.push(
                    "The first image is a mood board. Emulate its visual style exactly: \
                     color grading, textures, materials and atmosphere."
                        .to_string(),
                );
            }
            lines.push(format!(
                "Images {} to {} are the products to stage. Keep each product's shape, \
                 proportions, materials and colors exactly as photographed.",
                product_offset + 1,
                product_offset + products.len()
            ));
            lines.push(format!("This is the MASTER SHOT: render {framing}."));
            lines.push(
                "Establish the definitive layout for this room: materials, wall treatment, \
                 furniture placement and lighting. Every subsequent shot will match it exactly."
                    .to_string(),
            );
        }

        lines.push(format!(
            "Room: {} in a {} style. Layout density: {}. Arrangement: {}.",
            render.room_type, render.design_style, params.layout_density, params.arrangement_style
        ));
        lines.push(format!(
            "Lighting: {}, key light from {}. Mood: {}. Color palette: {}.",
            render.lighting, render.lighting_direction, render.mood, render.palette
        ));
        lines.push(external_items_rule(render.allow_external_items).to_string());
        lines.push(QUALITY_RULE.to_string());

        self.request(references, &lines)
    }

    /// Free-form edit of an existing render: references are `[image]`.
    #[must_use]
    pub fn edit(&self, image: &ImagePayload, instruction: &str) -> GenerationRequest {
        let lines = [
            format!("Edit this image: {}", instruction.trim()),
            "Apply only the requested change. Preserve the composition, camera angle, \
             lighting and every element that the request does not mention."
                .to_string(),
        ];
        self.request(vec![image.clone()], &lines)
    }

    fn request(&self, references: Vec<ImagePayload>, lines: &[String]) -> GenerationRequest {
        GenerationRequest {
            references,
            instruction: lines.join("\n"),
            output: self.output.clone(),
        }
    }
}

const QUALITY_RULE: &str =
    "Output a single photorealistic image with physically accurate shadows and reflections. No text, watermarks or borders.";

fn external_items_rule(allowed: bool) -> &'static str {
    if allowed {
        "You may add complementary furniture, decor and props that suit the style."
    } else {
        "Do not add any furniture, decor or props beyond the supplied products and the bare room."
    }
}
