//! Built-in color themes shared by the desktop and web front-ends.

use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub dark: bool,
    pub bg: Rgb,
    pub fg: Rgb,
    /// Editor and input background.
    pub base: Rgb,
    pub selected_fg: Rgb,
    pub sidebar: Rgb,
    pub surface: Rgb,
    pub border: Rgb,
    pub primary: Rgb,
    pub accent: Rgb,
    pub text_secondary: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    LayanDark,
    CreamNavy,
}

impl Theme {
    pub const ALL: [Theme; 2] = [Theme::LayanDark, Theme::CreamNavy];

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "layan-dark" => Some(Theme::LayanDark),
            "cream-navy" => Some(Theme::CreamNavy),
            _ => None,
        }
    }

    /// Unknown keys fall back to the dark theme.
    pub fn from_key_or_default(key: &str) -> Self {
        Self::from_key(key).unwrap_or(Theme::LayanDark)
    }

    pub fn key(&self) -> &'static str {
        match self {
            Theme::LayanDark => "layan-dark",
            Theme::CreamNavy => "cream-navy",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Theme::LayanDark => "Layan Dark",
            Theme::CreamNavy => "Cream & Navy",
        }
    }

    pub fn palette(&self) -> Palette {
        match self {
            Theme::LayanDark => Palette {
                dark: true,
                bg: Rgb(0x21, 0x22, 0x2c),
                fg: Rgb(0xe6, 0xe6, 0xf0),
                base: Rgb(0x1a, 0x1b, 0x24),
                selected_fg: Rgb(0xff, 0xff, 0xff),
                sidebar: Rgb(0x26, 0x27, 0x33),
                surface: Rgb(0x2e, 0x2f, 0x3d),
                border: Rgb(0x3a, 0x3b, 0x4c),
                primary: Rgb(0x56, 0x57, 0xf5),
                accent: Rgb(0xa5, 0x5c, 0xd6),
                text_secondary: Rgb(0x9a, 0x9b, 0xb0),
            },
            Theme::CreamNavy => Palette {
                dark: false,
                bg: Rgb(0xf7, 0xf1, 0xe3),
                fg: Rgb(0x1b, 0x2a, 0x4a),
                base: Rgb(0xfc, 0xf9, 0xf2),
                selected_fg: Rgb(0xfc, 0xf9, 0xf2),
                sidebar: Rgb(0xef, 0xe6, 0xd2),
                surface: Rgb(0xe8, 0xdc, 0xc2),
                border: Rgb(0xcf, 0xc1, 0xa3),
                primary: Rgb(0x1b, 0x2a, 0x4a),
                accent: Rgb(0xc0, 0x7a, 0x3c),
                text_secondary: Rgb(0x5a, 0x65, 0x7d),
            },
        }
    }

    /// Stylesheet for the browser front-end: palette as CSS custom
    /// properties followed by rules that reference them.
    pub fn css(&self) -> String {
        let p = self.palette();
        let vars = [
            ("theme_bg_color", p.bg),
            ("theme_fg_color", p.fg),
            ("theme_base_color", p.base),
            ("theme_selected_fg_color", p.selected_fg),
            ("sidebar_color", p.sidebar),
            ("surface_color", p.surface),
            ("border_color", p.border),
            ("primary_color", p.primary),
            ("accent_color", p.accent),
            ("text-secondary", p.text_secondary),
        ];

        let mut css = String::from("/* Web theme */\n\n:root {\n");
        for (name, color) in vars {
            let _ = writeln!(css, "    --{}: {};", name, color.hex());
        }
        css.push_str("}\n");
        css.push_str(BASE_RULES);
        css
    }
}

const BASE_RULES: &str = r#"
body { background: var(--theme_bg_color); color: var(--theme_fg_color); }
#toolbar { background: var(--primary_color); color: var(--theme_selected_fg_color); }
#toolbar button { background: var(--surface_color); color: var(--theme_fg_color); border-color: var(--border_color); }
.panel, .panel-header, #tab-bar { background: var(--sidebar_color); }
.panel-header { color: var(--text-secondary); }
#editor-panel { background: var(--theme_bg_color); }
.tab.active { background: var(--theme_bg_color); border-bottom-color: var(--primary_color); }
#chat-input, .modal-body input, .modal-body textarea, .modal-body select {
    background: var(--theme_base_color); color: var(--theme_fg_color); border-color: var(--border_color);
}
#chat-input:focus { border-color: var(--accent_color); }
.chat-msg.ai { background: var(--theme_base_color); }
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_round_trip() {
        for theme in Theme::ALL {
            assert_eq!(Theme::from_key(theme.key()), Some(theme));
        }
        assert_eq!(Theme::from_key("solarized"), None);
        assert_eq!(Theme::from_key_or_default("solarized"), Theme::LayanDark);
    }

    #[test]
    fn test_css_declares_palette() {
        let css = Theme::CreamNavy.css();
        assert!(css.contains("--primary_color: #1b2a4a;"));
        assert!(css.contains("var(--theme_bg_color)"));
        assert_eq!(Rgb(255, 0, 16).hex(), "#ff0010");
    }
}
