//! Theme and editor font for the egui front end.
//!
//! Only one theme and one editor font are active at a time; applying a new
//! one replaces the old instead of layering on top of it.

use eframe::egui;
use egui::{Color32, FontFamily, FontId, Stroke, Visuals};
use shared::theme::{Rgb, Theme};

const DEFAULT_FONT_SIZE: f32 = 11.0;

fn color(rgb: Rgb) -> Color32 {
    Color32::from_rgb(rgb.0, rgb.1, rgb.2)
}

/// egui visuals for a palette.
pub fn visuals_for(theme: Theme) -> Visuals {
    let p = theme.palette();
    let mut v = if p.dark { Visuals::dark() } else { Visuals::light() };

    v.override_text_color = Some(color(p.fg));
    v.panel_fill = color(p.sidebar);
    v.window_fill = color(p.bg);
    v.extreme_bg_color = color(p.base);
    v.faint_bg_color = color(p.surface);
    v.hyperlink_color = color(p.accent);
    v.selection.bg_fill = color(p.primary);
    v.selection.stroke = Stroke::new(1.0, color(p.selected_fg));
    v.window_stroke = Stroke::new(1.0, color(p.border));

    v.widgets.noninteractive.bg_stroke = Stroke::new(1.0, color(p.border));
    v.widgets.noninteractive.fg_stroke = Stroke::new(1.0, color(p.text_secondary));
    v.widgets.inactive.weak_bg_fill = color(p.surface);
    v.widgets.inactive.bg_fill = color(p.surface);
    v.widgets.hovered.bg_stroke = Stroke::new(1.0, color(p.accent));
    v.widgets.active.bg_fill = color(p.primary);
    v
}

/// Parsed `"<Family> <size>"` description such as `"Monospace 11"`.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: FontFamily,
    pub size: f32,
}

impl FontSpec {
    /// Anything naming a mono/code face maps to the monospace family; a
    /// missing or unparsable size falls back to 11.
    pub fn parse(desc: &str) -> Self {
        let desc = desc.trim();
        let (name, size) = match desc.rsplit_once(' ') {
            Some((name, size)) => match size.parse::<f32>() {
                Ok(size) if size > 0.0 => (name, size),
                _ => (desc, DEFAULT_FONT_SIZE),
            },
            None => match desc.parse::<f32>() {
                Ok(size) if size > 0.0 => ("", size),
                _ => (desc, DEFAULT_FONT_SIZE),
            },
        };
        let lower = name.to_lowercase();
        let mono = lower.is_empty()
            || ["mono", "code", "courier", "consol"]
                .iter()
                .any(|hint| lower.contains(hint));
        Self {
            family: if mono {
                FontFamily::Monospace
            } else {
                FontFamily::Proportional
            },
            size,
        }
    }

    pub fn font_id(&self) -> FontId {
        FontId::new(self.size, self.family.clone())
    }
}

/// The theme and editor font currently applied to the egui context.
#[derive(Debug, Default)]
pub struct StyleState {
    theme: Option<Theme>,
    font: Option<(String, FontSpec)>,
}

impl StyleState {
    /// Switch to the theme named `key` (unknown keys mean layan-dark).
    pub fn apply_theme(&mut self, ctx: &egui::Context, key: &str) -> Theme {
        let theme = Theme::from_key_or_default(key);
        if self.theme != Some(theme) {
            tracing::debug!(theme = theme.key(), "applying theme");
            ctx.set_visuals(visuals_for(theme));
            self.theme = Some(theme);
        }
        theme
    }

    /// Use `desc` for the editor buffer.
    pub fn apply_font(&mut self, desc: &str) {
        if self.font.as_ref().map_or(true, |(applied, _)| applied != desc) {
            self.font = Some((desc.to_string(), FontSpec::parse(desc)));
        }
    }

    pub fn editor_font(&self) -> FontId {
        self.font
            .as_ref()
            .map(|(_, spec)| spec.font_id())
            .unwrap_or_else(|| FontId::monospace(DEFAULT_FONT_SIZE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_font_descriptions() {
        assert_eq!(
            FontSpec::parse("Monospace 11"),
            FontSpec { family: FontFamily::Monospace, size: 11.0 }
        );
        assert_eq!(
            FontSpec::parse("Fira Code 14"),
            FontSpec { family: FontFamily::Monospace, size: 14.0 }
        );
        assert_eq!(
            FontSpec::parse("Cantarell 12.5"),
            FontSpec { family: FontFamily::Proportional, size: 12.5 }
        );
        assert_eq!(FontSpec::parse("Serif").size, DEFAULT_FONT_SIZE);
        assert_eq!(FontSpec::parse("Monospace -3").size, DEFAULT_FONT_SIZE);
    }

    #[test]
    fn test_apply_font_replaces_previous() {
        let mut style = StyleState::default();
        assert_eq!(style.editor_font(), FontId::monospace(11.0));
        style.apply_font("Monospace 16");
        assert_eq!(style.editor_font().size, 16.0);
        style.apply_font("Sans 9");
        assert_eq!(style.editor_font(), FontId::proportional(9.0));
    }

    #[test]
    fn test_visuals_follow_palette() {
        let dark = visuals_for(Theme::LayanDark);
        assert!(dark.dark_mode);
        let light = visuals_for(Theme::CreamNavy);
        assert!(!light.dark_mode);
        let p = Theme::CreamNavy.palette();
        assert_eq!(light.selection.bg_fill, color(p.primary));
    }
}
