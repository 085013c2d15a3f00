use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum ColorTheme {
    #[default]
    TokyoNight,
    Dracula,
    Nord,
    SolarizedDark,
    SolarizedLight,
    CatppuccinLatte,
}

impl ColorTheme {
    pub fn label(self) -> &'static str {
        match self {
            Self::TokyoNight => "Tokyo Night",
            Self::Dracula => "Dracula",
            Self::Nord => "Nord",
            Self::SolarizedDark => "Solarized Dark",
            Self::SolarizedLight => "Solarized Light",
            Self::CatppuccinLatte => "Catppuccin Latte",
        }
    }

    pub fn colors(self) -> ThemeColors {
        match self {
            Self::TokyoNight => ThemeColors::TOKYO_NIGHT,
            Self::Dracula => ThemeColors::dracula(),
            Self::Nord => ThemeColors::nord(),
            Self::SolarizedDark => ThemeColors::solarized_dark(),
            Self::SolarizedLight => ThemeColors::solarized_light(),
            Self::CatppuccinLatte => ThemeColors::catppuccin_latte(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ThemeColors {
    pub header_bg: Color,
    pub fg: Color,
    pub fg_dim: Color,
    pub border_active: Color,
    pub border_warn: Color,
    pub border_danger: Color,
    pub border_ok: Color,
    pub border_dim: Color,
    pub graph_connections: Color,
    pub graph_throughput: Color,
    pub state_active: Color,
    pub state_idle_txn: Color,
    pub overlay_bg: Color,
    pub highlight_bg: Color,
    pub sql_keyword: Color,
    pub sql_string: Color,
    pub sql_number: Color,
    pub sql_comment: Color,
}

impl ThemeColors {
    pub const TOKYO_NIGHT: Self = Self {
        header_bg: Color::Rgb(36, 40, 59),
        fg: Color::Rgb(192, 202, 245),
        fg_dim: Color::Rgb(115, 121, 148),
        border_active: Color::Rgb(125, 207, 255),
        border_warn: Color::Rgb(224, 175, 104),
        border_danger: Color::Rgb(247, 118, 142),
        border_ok: Color::Rgb(158, 206, 106),
        border_dim: Color::Rgb(59, 66, 97),
        graph_connections: Color::Rgb(97, 175, 239),
        graph_throughput: Color::Rgb(152, 195, 121),
        state_active: Color::Rgb(158, 206, 106),
        state_idle_txn: Color::Rgb(224, 175, 104),
        overlay_bg: Color::Rgb(26, 27, 38),
        highlight_bg: Color::Rgb(40, 42, 64),
        sql_keyword: Color::Rgb(198, 120, 221),
        sql_string: Color::Rgb(152, 195, 121),
        sql_number: Color::Rgb(209, 154, 102),
        sql_comment: Color::Rgb(92, 99, 112),
    };

    pub fn dracula() -> Self {
        Self {
            header_bg: Color::Rgb(40, 42, 54),
            fg: Color::Rgb(248, 248, 242),
            fg_dim: Color::Rgb(98, 114, 164),
            border_active: Color::Rgb(139, 233, 253),
            border_warn: Color::Rgb(241, 250, 140),
            border_danger: Color::Rgb(255, 85, 85),
            border_ok: Color::Rgb(80, 250, 123),
            border_dim: Color::Rgb(68, 71, 90),
            graph_connections: Color::Rgb(139, 233, 253),
            graph_throughput: Color::Rgb(80, 250, 123),
            state_active: Color::Rgb(80, 250, 123),
            state_idle_txn: Color::Rgb(241, 250, 140),
            overlay_bg: Color::Rgb(33, 34, 44),
            highlight_bg: Color::Rgb(55, 57, 74),
            sql_keyword: Color::Rgb(255, 121, 198),
            sql_string: Color::Rgb(241, 250, 140),
            sql_number: Color::Rgb(189, 147, 249),
            sql_comment: Color::Rgb(98, 114, 164),
        }
    }

    pub fn nord() -> Self {
        Self {
            header_bg: Color::Rgb(46, 52, 64),
            fg: Color::Rgb(216, 222, 233),
            fg_dim: Color::Rgb(107, 121, 142),
            border_active: Color::Rgb(136, 192, 208),
            border_warn: Color::Rgb(235, 203, 139),
            border_danger: Color::Rgb(191, 97, 106),
            border_ok: Color::Rgb(163, 190, 140),
            border_dim: Color::Rgb(76, 86, 106),
            graph_connections: Color::Rgb(136, 192, 208),
            graph_throughput: Color::Rgb(163, 190, 140),
            state_active: Color::Rgb(163, 190, 140),
            state_idle_txn: Color::Rgb(235, 203, 139),
            overlay_bg: Color::Rgb(38, 44, 57),
            highlight_bg: Color::Rgb(59, 66, 82),
            sql_keyword: Color::Rgb(180, 142, 173),
            sql_string: Color::Rgb(163, 190, 140),
            sql_number: Color::Rgb(208, 135, 112),
            sql_comment: Color::Rgb(76, 86, 106),
        }
    }

    pub fn solarized_dark() -> Self {
        Self {
            header_bg: Color::Rgb(0, 43, 54),
            fg: Color::Rgb(131, 148, 150),
            fg_dim: Color::Rgb(88, 110, 117),
            border_active: Color::Rgb(38, 139, 210),
            border_warn: Color::Rgb(181, 137, 0),
            border_danger: Color::Rgb(220, 50, 47),
            border_ok: Color::Rgb(133, 153, 0),
            border_dim: Color::Rgb(88, 110, 117),
            graph_connections: Color::Rgb(38, 139, 210),
            graph_throughput: Color::Rgb(133, 153, 0),
            state_active: Color::Rgb(133, 153, 0),
            state_idle_txn: Color::Rgb(181, 137, 0),
            overlay_bg: Color::Rgb(0, 36, 46),
            highlight_bg: Color::Rgb(7, 54, 66),
            sql_keyword: Color::Rgb(108, 113, 196),
            sql_string: Color::Rgb(42, 161, 152),
            sql_number: Color::Rgb(203, 75, 22),
            sql_comment: Color::Rgb(88, 110, 117),
        }
    }

    pub fn solarized_light() -> Self {
        Self {
            header_bg: Color::Rgb(238, 232, 213),    // base2
            fg: Color::Rgb(101, 123, 131),           // base00
            fg_dim: Color::Rgb(147, 161, 161),       // base1
            border_active: Color::Rgb(38, 139, 210), // blue
            border_warn: Color::Rgb(181, 137, 0),
            border_danger: Color::Rgb(220, 50, 47),
            border_ok: Color::Rgb(133, 153, 0),
            border_dim: Color::Rgb(147, 161, 161),
            graph_connections: Color::Rgb(38, 139, 210),
            graph_throughput: Color::Rgb(133, 153, 0),
            state_active: Color::Rgb(133, 153, 0),
            state_idle_txn: Color::Rgb(181, 137, 0),
            overlay_bg: Color::Rgb(253, 246, 227),   // base3
            highlight_bg: Color::Rgb(238, 232, 213),
            sql_keyword: Color::Rgb(108, 113, 196),
            sql_string: Color::Rgb(42, 161, 152),
            sql_number: Color::Rgb(203, 75, 22),
            sql_comment: Color::Rgb(147, 161, 161),
        }
    }

    pub fn catppuccin_latte() -> Self {
        Self {
            header_bg: Color::Rgb(230, 233, 239), // mantle
            fg: Color::Rgb(76, 79, 105),
            fg_dim: Color::Rgb(140, 143, 161),
            border_active: Color::Rgb(30, 102, 245),
            border_warn: Color::Rgb(223, 142, 29),
            border_danger: Color::Rgb(210, 15, 57),
            border_ok: Color::Rgb(64, 160, 43),
            border_dim: Color::Rgb(140, 143, 161),
            graph_connections: Color::Rgb(30, 102, 245),
            graph_throughput: Color::Rgb(64, 160, 43),
            state_active: Color::Rgb(64, 160, 43),
            state_idle_txn: Color::Rgb(223, 142, 29),
            overlay_bg: Color::Rgb(239, 241, 245),
            highlight_bg: Color::Rgb(220, 224, 232), // surface0
            sql_keyword: Color::Rgb(136, 57, 239),
            sql_string: Color::Rgb(64, 160, 43),
            sql_number: Color::Rgb(254, 100, 11),
            sql_comment: Color::Rgb(140, 143, 161),
        }
    }
}

/// Remote SQL generation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistSettings {
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
    /// Name of the environment variable holding the bearer token.
    pub api_key_env: String,
}

impl Default for AssistSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            endpoint: "https://api.openai.com/v1/chat/completions".into(),
            timeout_secs: 30,
            api_key_env: "OPENAI_API_KEY".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub color_theme: ColorTheme,
    pub tick_interval_ms: u64,
    pub refresh_cooldown_ms: u64,
    pub sparkline_points: usize,
    pub store_path: Option<String>,
    pub export_path: Option<String>,
    pub psql_path: String,
    pub assist: AssistSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            color_theme: ColorTheme::TokyoNight,
            tick_interval_ms: 1000,
            refresh_cooldown_ms: 500,
            sparkline_points: 60,
            store_path: None,
            export_path: None,
            psql_path: "psql".into(),
            assist: AssistSettings::default(),
        }
    }
}

impl AppConfig {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("pgmon").join("config.toml"))
    }

    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        match fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "ignoring invalid config file");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(100))
    }

    pub fn refresh_cooldown(&self) -> Duration {
        Duration::from_millis(self.refresh_cooldown_ms)
    }

    /// Dump target: the configured path or `~/.pgmon/default_queries.json`.
    pub fn export_path(&self) -> Option<PathBuf> {
        match &self.export_path {
            Some(p) => Some(PathBuf::from(p)),
            None => dirs::home_dir().map(|h| h.join(".pgmon").join("default_queries.json")),
        }
    }

    pub fn store_path(&self) -> Option<PathBuf> {
        match &self.store_path {
            Some(p) => Some(PathBuf::from(p)),
            None => crate::store::default_store_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ─────────────────────────────────────────────────────────────────────────────
    // ColorTheme tests
    // ─────────────────────────────────────────────────────────────────────────────

    const ALL_THEMES: [ColorTheme; 6] = [
        ColorTheme::TokyoNight,
        ColorTheme::Dracula,
        ColorTheme::Nord,
        ColorTheme::SolarizedDark,
        ColorTheme::SolarizedLight,
        ColorTheme::CatppuccinLatte,
    ];

    #[test]
    fn color_theme_labels_not_empty() {
        for theme in ALL_THEMES {
            assert!(!theme.label().is_empty(), "{:?} has empty label", theme);
        }
    }

    #[test]
    fn color_theme_default() {
        assert_eq!(ColorTheme::default(), ColorTheme::TokyoNight);
    }

    #[test]
    fn theme_colors_all_themes_have_distinct_header_bg() {
        let bgs: Vec<String> = ALL_THEMES
            .iter()
            .map(|t| format!("{:?}", t.colors().header_bg))
            .collect();
        for i in 0..bgs.len() {
            for j in (i + 1)..bgs.len() {
                assert_ne!(bgs[i], bgs[j], "themes {i} and {j} share header_bg");
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // AppConfig tests
    // ─────────────────────────────────────────────────────────────────────────────

    #[test]
    fn app_config_default_values() {
        let config = AppConfig::default();
        assert_eq!(config.color_theme, ColorTheme::TokyoNight);
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.refresh_cooldown(), Duration::from_millis(500));
        assert_eq!(config.sparkline_points, 60);
        assert_eq!(config.psql_path, "psql");
        assert_eq!(config.assist.model, "gpt-4o-mini");
        assert_eq!(config.assist.timeout_secs, 30);
        assert_eq!(config.assist.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn app_config_deserialize_with_missing_fields() {
        let toml_str = r#"
            refresh_cooldown_ms = 250

            [assist]
            model = "gpt-4o"
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.refresh_cooldown_ms, 250);
        assert_eq!(config.tick_interval_ms, 1000);
        assert_eq!(config.assist.model, "gpt-4o");
        assert_eq!(config.assist.timeout_secs, 30);
    }

    #[test]
    fn app_config_deserialize_empty_string() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn app_config_toml_roundtrip() {
        let config = AppConfig {
            color_theme: ColorTheme::Nord,
            export_path: Some("/tmp/dump.json".into()),
            ..AppConfig::default()
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn tick_interval_has_a_floor() {
        let config = AppConfig {
            tick_interval_ms: 0,
            ..AppConfig::default()
        };
        assert_eq!(config.tick_interval(), Duration::from_millis(100));
    }

    #[test]
    fn export_path_override_wins() {
        let config = AppConfig {
            export_path: Some("/srv/queries.json".into()),
            ..AppConfig::default()
        };
        assert_eq!(config.export_path(), Some(PathBuf::from("/srv/queries.json")));
    }

    #[test]
    fn default_export_path_lives_under_home() {
        let config = AppConfig::default();
        if let Some(path) = config.export_path() {
            assert!(path.ends_with(".pgmon/default_queries.json"));
        }
    }
}
