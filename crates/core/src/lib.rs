//! Core library for the Sentiment Scatter explorer.
//!
//! The crate turns a table of annotated messages into an interactive scatter
//! plot model. Ingestion classifies columns once for the whole dataset, the
//! projector derives a point per record from the current [`ViewState`], and the
//! scene differ computes scales and keyed mark transitions that a rendering
//! backend animates. [`Explorer`] owns all of it and applies user events.

pub mod config;
pub mod dataset;
pub mod detail;
pub mod error;
pub mod interaction;
pub mod projection;
pub mod render;
pub mod scale;
pub mod scene;
pub mod timeline;
pub mod view;

pub use config::{AppConfig, ColumnNames, DatasetConfig, MarkerConfig, PlotConfig};
pub use dataset::{ingest, Dataset, RawTable, Record, SenderRegistry, SideTable};
pub use detail::{Annotation, AnnotationList, DetailPanel, DetailPanelFormatter};
pub use error::{Result, ScatterError};
pub use interaction::{Event, Explorer, LoadState, Menu, Menus, Tooltip};
pub use projection::{project, project_all, ProjectedTriple, Projection};
pub use render::{DrawnMark, RenderBackend, RenderGraph};
pub use scale::LinearScale;
pub use scene::{Axis, Mark, Scene, SceneDiffer, Scales};
pub use timeline::{AnimationClock, MarkState, Transition};
pub use view::{MarkerMode, ScaleMode, ViewAction, ViewState};
