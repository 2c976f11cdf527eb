//! Translucent highlight overlays composited onto page images.

use image::{DynamicImage, GenericImage, GenericImageView, Pixel, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::matcher::MatchSpan;
use super::token::{BoundingBox, Token};

/// Fill color and opacity of highlight rectangles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighlightStyle {
    #[serde(default = "default_color")]
    pub color: [u8; 3],
    #[serde(default = "default_opacity")]
    pub opacity: f32,
}

fn default_color() -> [u8; 3] {
    [255, 235, 59]
}

fn default_opacity() -> f32 {
    0.4
}

impl Default for HighlightStyle {
    fn default() -> Self {
        Self {
            color: default_color(),
            opacity: default_opacity(),
        }
    }
}

impl HighlightStyle {
    fn fill(&self) -> Rgba<u8> {
        let alpha = (self.opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        let [r, g, b] = self.color;
        Rgba([r, g, b, alpha])
    }
}

/// Draws match spans onto page images.
#[derive(Debug, Clone, Default)]
pub struct OverlayRenderer {
    style: HighlightStyle,
}

impl OverlayRenderer {
    pub fn new(style: HighlightStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &HighlightStyle {
        &self.style
    }

    /// Render `spans` over `image`, returning a new image in the source color mode.
    ///
    /// Each span gets its own full-page transparent layer holding one
    /// rectangle per token; layers are composited in span order.
    pub fn render(&self, image: &DynamicImage, tokens: &[Token], spans: &[MatchSpan]) -> DynamicImage {
        let boxes: Vec<Vec<BoundingBox>> = spans
            .iter()
            .map(|span| span.tokens(tokens).iter().map(|t| t.bbox).collect())
            .collect();
        self.render_boxes(image, &boxes)
    }

    /// Render pre-expanded span boxes. One inner vector per span.
    ///
    /// Pixels outside every box keep the source buffer's exact values and
    /// bit depth.
    pub fn render_boxes(&self, image: &DynamicImage, spans: &[Vec<BoundingBox>]) -> DynamicImage {
        let mut page = image.clone();
        if spans.iter().all(Vec::is_empty) {
            return page;
        }

        let (width, height) = (image.width(), image.height());
        let fill = self.style.fill();

        for boxes in spans {
            let mut layer = RgbaImage::new(width, height);
            let mut drawn = 0usize;
            for bbox in boxes {
                let Some(clipped) = bbox.clip(width, height) else {
                    debug!("highlight box {:?} outside {}x{} page", bbox, width, height);
                    continue;
                };
                let rect = Rect::at(clipped.left as i32, clipped.top as i32)
                    .of_size(clipped.width, clipped.height);
                draw_filled_rect_mut(&mut layer, rect, fill);
                drawn += 1;
            }
            if drawn > 0 {
                composite(&mut page, &layer);
            }
        }

        page
    }
}

/// Alpha-composite `layer` onto `page` in place. Only pixels the layer
/// covers are read and written, so the rest of the buffer is untouched.
fn composite(page: &mut DynamicImage, layer: &RgbaImage) {
    for (x, y, tint) in layer.enumerate_pixels() {
        if tint[3] > 0 {
            let mut pixel = page.get_pixel(x, y);
            pixel.blend(tint);
            page.put_pixel(x, y, pixel);
        }
    }
}
