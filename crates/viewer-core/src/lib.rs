pub mod output_scale;
pub mod visibility;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use output_scale::{approximate_fraction, round_to_divide, OutputScale, SurfaceSize};
pub use visibility::{
    layout_continuous, single_page_visibility, visible_pages, PageBox, ScrollWindow, VisiblePage,
    VisibilityResult,
};

pub const FIRST_PAGE: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewMode {
    #[default]
    SinglePage,
    Continuous,
}

impl ViewMode {
    pub fn next(self) -> Self {
        match self {
            Self::SinglePage => Self::Continuous,
            Self::Continuous => Self::SinglePage,
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SinglePage => f.write_str("single-page"),
            Self::Continuous => f.write_str("continuous"),
        }
    }
}

impl std::str::FromStr for ViewMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "single" | "single-page" => Ok(Self::SinglePage),
            "all" | "continuous" => Ok(Self::Continuous),
            other => Err(format!("unknown view mode `{other}`")),
        }
    }
}

/// Lifecycle of one page render at its current scale.
///
/// `Finished` is terminal only for the current scale; a scale or mode change
/// sends the page back to `Initial`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderState {
    #[default]
    Initial,
    Rendering,
    Paused,
    Finished,
}

impl RenderState {
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Rendering | Self::Paused)
    }
}

impl fmt::Display for RenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initial => "initial",
            Self::Rendering => "rendering",
            Self::Paused => "paused",
            Self::Finished => "finished",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_mode_cycles_between_both_layouts() {
        assert_eq!(ViewMode::SinglePage.next(), ViewMode::Continuous);
        assert_eq!(ViewMode::Continuous.next(), ViewMode::SinglePage);
    }

    #[test]
    fn view_mode_parses_legacy_names() {
        assert_eq!("single".parse::<ViewMode>(), Ok(ViewMode::SinglePage));
        assert_eq!("all".parse::<ViewMode>(), Ok(ViewMode::Continuous));
        assert_eq!(" Continuous ".parse::<ViewMode>(), Ok(ViewMode::Continuous));
        assert!("spread".parse::<ViewMode>().is_err());
    }

    #[test]
    fn only_rendering_and_paused_are_in_flight() {
        assert!(!RenderState::Initial.is_in_flight());
        assert!(RenderState::Rendering.is_in_flight());
        assert!(RenderState::Paused.is_in_flight());
        assert!(!RenderState::Finished.is_in_flight());
    }
}
