use serde::{Deserialize, Serialize};

use crate::config::{AppConfig, MarkerConfig};

/// How projected values relate to the stored ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleMode {
    /// Percentage of the per-row denominator.
    Relative,
    /// Raw counts.
    Absolute,
}

impl ScaleMode {
    pub const ALL: [ScaleMode; 2] = [ScaleMode::Relative, ScaleMode::Absolute];
}

/// What drives the marker radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarkerMode {
    ConstantSize(f64),
    ScaledBy(String),
}

impl MarkerMode {
    /// Maps a marker menu option to a mode; the configured "off" label means
    /// constant size.
    pub fn from_option(option: &str, marker: &MarkerConfig) -> Self {
        if option == marker.off_label {
            Self::ConstantSize(marker.constant_size)
        } else {
            Self::ScaledBy(option.to_string())
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            Self::ScaledBy(field) => Some(field),
            Self::ConstantSize(_) => None,
        }
    }
}

/// Current axis, marker and scale selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub x_field: String,
    pub y_field: String,
    pub marker: MarkerMode,
    pub scale_mode: ScaleMode,
}

/// A user selection that produces a new [`ViewState`].
#[derive(Debug, Clone, PartialEq)]
pub enum ViewAction {
    SelectX(String),
    SelectY(String),
    SelectMarker(MarkerMode),
    SelectScale(ScaleMode),
}

impl ViewState {
    pub fn from_config(config: &AppConfig) -> Self {
        let defaults = &config.defaults;
        Self {
            x_field: defaults.x_field.clone(),
            y_field: defaults.y_field.clone(),
            marker: MarkerMode::from_option(&defaults.marker_field, &config.marker),
            scale_mode: defaults.scale_mode,
        }
    }

    /// Returns the state that results from applying `action`.
    pub fn reduce(&self, action: ViewAction) -> Self {
        let mut next = self.clone();
        match action {
            ViewAction::SelectX(field) => next.x_field = field,
            ViewAction::SelectY(field) => next.y_field = field,
            ViewAction::SelectMarker(marker) => next.marker = marker,
            ViewAction::SelectScale(mode) => next.scale_mode = mode,
        }
        next
    }

    /// Fields the view reads from each record.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        [Some(self.x_field.as_str()), Some(self.y_field.as_str()), self.marker.field()]
            .into_iter()
            .flatten()
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}
