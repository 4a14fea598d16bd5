use crate::config::RenderConfig;
use crate::geometry::{HalfExtent, Point, Transform, ViewportSize};
use crate::scene::{Primitive, Scene, SceneKey};
use crate::text_metrics::text_width_or_estimate;
use crate::theme::Theme;
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;

const LINE_HEIGHT: f32 = 1.25;

/// A [`Scene`] that renders to a standalone SVG document.
#[derive(Debug, Clone)]
pub struct SvgScene {
    theme: Theme,
    config: RenderConfig,
    size: ViewportSize,
    transform: Transform,
    primitives: BTreeMap<SceneKey, Primitive>,
}

impl SvgScene {
    pub fn new(theme: Theme, config: RenderConfig) -> Self {
        let size = config.size();
        Self {
            theme,
            config,
            size,
            transform: Transform::IDENTITY,
            primitives: BTreeMap::new(),
        }
    }

    /// Change the surface size. Call `NoteGraph::resize` afterwards.
    pub fn set_size(&mut self, size: ViewportSize) {
        self.size = size;
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn to_svg(&self) -> String {
        let theme = &self.theme;
        let width = self.size.width;
        let height = self.size.height;
        let mut svg = String::new();

        svg.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
        ));
        svg.push_str(&format!(
            "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
            self.config.background
        ));
        let t = self.transform;
        svg.push_str(&format!(
            "<g transform=\"matrix({:.4} 0 0 {:.4} {:.2} {:.2})\">",
            t.k, t.k, t.x, t.y
        ));

        for primitive in self.primitives.values() {
            if let Primitive::Link { from, to } = primitive {
                svg.push_str(&format!(
                    "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"{}\" stroke-width=\"{}\"/>",
                    from.x, from.y, to.x, to.y, theme.link_color, theme.link_width
                ));
            }
        }

        for primitive in self.primitives.values() {
            if let Primitive::Note {
                center,
                half_extent,
                label,
                highlighted,
                selected,
            } = primitive
            {
                svg.push_str(&self.note_svg(*center, *half_extent, label, *highlighted, *selected));
            }
        }

        svg.push_str("</g></svg>");
        svg
    }

    /// Wrapped label lines and the box that holds them.
    fn layout_label(&self, label: &str) -> (Vec<String>, HalfExtent) {
        let theme = &self.theme;
        let lines = wrap_label(label, theme, &self.config);
        let widest = lines
            .iter()
            .map(|line| text_width_or_estimate(line, theme.font_size, &theme.font_family))
            .fold(0.0f32, f32::max);
        let box_w = (widest + self.config.label_padding_x * 2.0)
            .clamp(self.config.label_min_width, self.config.label_max_width);
        let line_h = theme.font_size * LINE_HEIGHT;
        let box_h = lines.len().max(1) as f32 * line_h + self.config.label_padding_y * 2.0;
        (
            lines,
            HalfExtent {
                x: box_w / 2.0,
                y: box_h / 2.0,
            },
        )
    }

    fn note_svg(
        &self,
        center: Point,
        extent: HalfExtent,
        label: &str,
        highlighted: bool,
        selected: bool,
    ) -> String {
        let theme = &self.theme;
        let (lines, _) = self.layout_label(label);
        let line_h = theme.font_size * LINE_HEIGHT;
        let (box_w, box_h) = (extent.x * 2.0, extent.y * 2.0);

        let (fill, stroke) = if highlighted || selected {
            (&theme.highlight_background, &theme.highlight_border)
        } else {
            (&theme.note_background, &theme.note_border)
        };
        let stroke_width = if selected {
            theme.selected_border_width
        } else {
            theme.note_border_width
        };

        let mut out = format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{box_w:.2}\" height=\"{box_h:.2}\" rx=\"{r}\" ry=\"{r}\" fill=\"{fill}\" stroke=\"{stroke}\" stroke-width=\"{stroke_width}\"/>",
            center.x - box_w / 2.0,
            center.y - box_h / 2.0,
            r = theme.note_corner_radius,
        );

        let start_y = center.y - (lines.len() as f32 * line_h) / 2.0 + theme.font_size;
        out.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{start_y:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">",
            center.x,
            escape_xml(&theme.font_family),
            theme.font_size,
            theme.text_color
        ));
        for (idx, line) in lines.iter().enumerate() {
            let dy = if idx == 0 { 0.0 } else { line_h };
            out.push_str(&format!(
                "<tspan x=\"{:.2}\" dy=\"{dy:.2}\">{}</tspan>",
                center.x,
                escape_xml(line)
            ));
        }
        out.push_str("</text>");
        out
    }
}

/// Greedy word wrap so no line exceeds the widest allowed note.
fn wrap_label(label: &str, theme: &Theme, config: &RenderConfig) -> Vec<String> {
    let max = (config.label_max_width - config.label_padding_x * 2.0).max(1.0);
    let measure = |text: &str| text_width_or_estimate(text, theme.font_size, &theme.font_family);

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in label.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if !current.is_empty() && measure(&candidate) > max {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

impl Scene for SvgScene {
    fn add(&mut self, key: SceneKey, primitive: Primitive) {
        self.primitives.insert(key, primitive);
    }

    fn update(&mut self, key: &SceneKey, primitive: Primitive) {
        if let Some(slot) = self.primitives.get_mut(key) {
            *slot = primitive;
        }
    }

    fn remove(&mut self, key: &SceneKey) {
        self.primitives.remove(key);
    }

    fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    fn size(&self) -> ViewportSize {
        self.size
    }

    fn note_extent(&self, label: &str) -> Option<HalfExtent> {
        Some(self.layout_label(label).1)
    }
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    let fallback = usvg::Size::from_wh(800.0, 600.0)
        .ok_or_else(|| anyhow::anyhow!("invalid fallback size"))?;
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height).unwrap_or(fallback);

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

pub(crate) fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
