use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));

/// Width of `text` in pixels, or `None` when no usable system font exists.
pub fn measure_text_width(text: &str, font_size: f32, font_family: &str) -> Option<f32> {
    if text.is_empty() || font_size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = TEXT_MEASURER.lock().ok()?;
    guard.measure(text, font_size, font_family)
}

/// Measured width, falling back to a per-character estimate.
pub fn text_width_or_estimate(text: &str, font_size: f32, font_family: &str) -> f32 {
    measure_text_width(text, font_size, font_family)
        .unwrap_or_else(|| text.chars().count() as f32 * font_size * FALLBACK_ADVANCE)
}

const FALLBACK_ADVANCE: f32 = 0.56;

struct TextMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    fonts: HashMap<String, Option<FontMetrics>>,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            fonts: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str) -> Option<f32> {
        let key = font_family.trim().to_string();
        if !self.fonts.contains_key(&key) {
            let metrics = self.load(font_family);
            self.fonts.insert(key.clone(), metrics);
        }
        self.fonts.get_mut(&key)?.as_mut()?.width(text, font_size)
    }

    fn load(&mut self, font_family: &str) -> Option<FontMetrics> {
        let names: Vec<&str> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\''))
            .filter(|part| !part.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|name| match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "monospace" | "ui-monospace" => Family::Monospace,
                "sans-serif" | "system-ui" | "-apple-system" | "blinkmacsystemfont" => {
                    Family::SansSerif
                }
                _ => Family::Name(*name),
            })
            .collect();
        families.push(Family::SansSerif);

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        self.db
            .with_face_data(id, |data, index| FontMetrics::parse(data.to_vec(), index))
            .flatten()
    }
}

/// Horizontal advances of one face, with ASCII precomputed.
struct FontMetrics {
    data: Vec<u8>,
    index: u32,
    units_per_em: f32,
    ascii: [u16; 128],
    other: HashMap<char, Option<u16>>,
}

impl FontMetrics {
    fn parse(data: Vec<u8>, index: u32) -> Option<Self> {
        let face = Face::parse(&data, index).ok()?;
        let mut ascii = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph) = face.glyph_index(byte as char) {
                ascii[byte as usize] = face.glyph_hor_advance(glyph).unwrap_or(0);
            }
        }
        let units_per_em = face.units_per_em().max(1) as f32;
        Some(Self {
            data,
            index,
            units_per_em,
            ascii,
            other: HashMap::new(),
        })
    }

    fn width(&mut self, text: &str, font_size: f32) -> Option<f32> {
        let missing: Vec<char> = text
            .chars()
            .filter(|c| !c.is_ascii() && !self.other.contains_key(c))
            .collect();
        if !missing.is_empty() {
            let face = Face::parse(&self.data, self.index).ok()?;
            for ch in missing {
                let advance = face
                    .glyph_index(ch)
                    .and_then(|glyph| face.glyph_hor_advance(glyph));
                self.other.insert(ch, advance);
            }
        }

        let scale = font_size / self.units_per_em;
        let fallback = font_size * FALLBACK_ADVANCE;
        let width = text
            .chars()
            .filter(|c| *c != '\n')
            .map(|ch| {
                let advance = if ch.is_ascii() {
                    Some(self.ascii[ch as usize]).filter(|a| *a > 0)
                } else {
                    self.other.get(&ch).copied().flatten()
                };
                advance.map_or(fallback, |a| a as f32 * scale)
            })
            .sum::<f32>();
        Some(width.max(0.0))
    }
}
