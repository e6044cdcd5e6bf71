use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{view::ScaleMode, Result, ScatterError};

/// Top-level configuration structure for the explorer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub dataset: DatasetConfig,
    pub plot: PlotConfig,
    pub marker: MarkerConfig,
    pub defaults: DefaultSelection,
    pub transition: TransitionConfig,
    pub colors: ColorConfig,
    pub scale_labels: ScaleLabels,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing keys fall back to defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(ScatterError::Config)
    }
}

/// Where the data lives and which columns carry the fixed roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatasetConfig {
    pub path: PathBuf,
    pub date_format: String,
    pub columns: ColumnNames,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("demo_data_4wviz.csv"),
            date_format: "%Y-%m-%d %H:%M:%S".to_string(),
            columns: ColumnNames::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnNames {
    pub date: String,
    pub sender: String,
    pub receiver: String,
    pub subject: String,
    pub text: String,
    pub text_annotated: String,
    pub annotations: String,
    /// Denominator used by [`ScaleMode::Relative`].
    pub denominator: String,
}

impl ColumnNames {
    /// Columns whose absence makes every row unusable.
    pub fn required(&self) -> [&str; 4] {
        [&self.date, &self.sender, &self.receiver, &self.annotations]
    }

    /// Columns that are always kept as text, whatever they contain.
    pub fn textual(&self) -> [&str; 7] {
        [
            &self.date,
            &self.sender,
            &self.receiver,
            &self.subject,
            &self.text,
            &self.text_annotated,
            &self.annotations,
        ]
    }
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            date: "Date".to_string(),
            sender: "Sender".to_string(),
            receiver: "Receiver".to_string(),
            subject: "Subject".to_string(),
            text: "Text".to_string(),
            text_annotated: "Text_annotated".to_string(),
            annotations: "Annotations".to_string(),
            denominator: "nr_tokens".to_string(),
        }
    }
}

/// Outer plot size and margins, in pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlotConfig {
    pub width: f64,
    pub height: f64,
    pub margin: Margin,
}

impl PlotConfig {
    pub fn inner_width(&self) -> f64 {
        (self.width - self.margin.left - self.margin.right).max(0.0)
    }

    pub fn inner_height(&self) -> f64 {
        (self.height - self.margin.top - self.margin.bottom).max(0.0)
    }
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 500.0,
            margin: Margin::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margin {
    fn default() -> Self {
        Self {
            top: 10.0,
            right: 40.0,
            bottom: 80.0,
            left: 110.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkerConfig {
    pub min_size: f64,
    pub max_size: f64,
    pub constant_size: f64,
    /// Menu label that switches the marker to constant size.
    pub off_label: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            min_size: 4.0,
            max_size: 12.0,
            constant_size: 4.0,
            off_label: "off".to_string(),
        }
    }
}

/// View selections applied right after the data is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefaultSelection {
    pub x_field: String,
    pub y_field: String,
    pub marker_field: String,
    pub scale_mode: ScaleMode,
}

impl Default for DefaultSelection {
    fn default() -> Self {
        Self {
            x_field: "polarity".to_string(),
            y_field: "subjectivity".to_string(),
            marker_field: "nr_tokens".to_string(),
            scale_mode: ScaleMode::Absolute,
        }
    }
}

/// Animation timings in milliseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransitionConfig {
    pub duration_ms: f64,
    pub stagger_ms: f64,
    pub tooltip_fade_in_ms: f64,
    pub tooltip_fade_out_ms: f64,
    pub tooltip_offset_y: f64,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            duration_ms: 2000.0,
            stagger_ms: 10.0,
            tooltip_fade_in_ms: 200.0,
            tooltip_fade_out_ms: 500.0,
            tooltip_offset_y: 28.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorConfig {
    pub default: String,
    pub hover: String,
    pub selected: String,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            default: "rgba(0,0,200,0.8)".to_string(),
            hover: "green".to_string(),
            selected: "red".to_string(),
        }
    }
}

/// Display labels of the two scale modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScaleLabels {
    pub relative: String,
    pub absolute: String,
}

impl ScaleLabels {
    pub fn label(&self, mode: ScaleMode) -> &str {
        match mode {
            ScaleMode::Relative => &self.relative,
            ScaleMode::Absolute => &self.absolute,
        }
    }

    pub fn parse(&self, label: &str) -> Option<ScaleMode> {
        if label == self.relative {
            Some(ScaleMode::Relative)
        } else if label == self.absolute {
            Some(ScaleMode::Absolute)
        } else {
            None
        }
    }
}

impl Default for ScaleLabels {
    fn default() -> Self {
        Self {
            relative: "Relative to token counts (%)".to_string(),
            absolute: "Number of counts".to_string(),
        }
    }
}
