//! # Output Configuration
//!
//! Controls how CLI output is decorated. Color is decided once from the
//! `--color` flag and the environment, then threaded through the commands as
//! an [`OutputConfig`].
//!
//! In `auto` mode the usual conventions apply:
//! - `NO_COLOR` (any value) disables color
//! - `CLICOLOR=0` disables color
//! - `CLICOLOR_FORCE=1` forces color even when stdout is not a terminal
//! - `TERM=dumb` disables color

use std::env;
use std::fmt::Display;

use console::Style;

/// Output configuration for controlling colors.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    /// Builds a configuration from the `--color` flag value: `always`,
    /// `never` or `auto`.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        console::Term::stdout().features().colors_supported()
    }

    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    pub fn without_color() -> Self {
        Self { use_color: false }
    }

    fn paint<D: Display>(&self, style: Style, text: D) -> String {
        style.force_styling(self.use_color).apply_to(text).to_string()
    }

    /// Renders a `path@version` label.
    pub fn label(&self, path: &str, version: &str) -> String {
        if version.is_empty() {
            return self.paint(Style::new().bold(), path);
        }
        format!(
            "{}{}",
            self.paint(Style::new().bold(), path),
            self.paint(Style::new().cyan(), format_args!("@{}", version))
        )
    }

    /// Renders secondary information such as descriptions and provenance.
    pub fn note<D: Display>(&self, text: D) -> String {
        self.paint(Style::new().dim(), text)
    }

    /// Renders a directory name in a tree.
    pub fn dir<D: Display>(&self, text: D) -> String {
        self.paint(Style::new().blue().bold(), text)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}
