//! Routes user events into view-state changes, re-renders and panel content.

use serde::{Deserialize, Serialize};

use crate::{
    config::AppConfig,
    dataset::{self, Dataset},
    detail::{DetailPanel, DetailPanelFormatter},
    projection::{self, Projection},
    render::{RenderBackend, RenderGraph},
    scene::{Scene, SceneDiffer},
    timeline::AnimationClock,
    view::{MarkerMode, ScaleMode, ViewAction, ViewState},
    Result, ScatterError,
};

/// Everything the user can do to the plot.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    SelectX(String),
    SelectY(String),
    SelectMarker(MarkerMode),
    SelectScale(ScaleMode),
    Hover { row: usize, pointer: (f64, f64) },
    Unhover(usize),
    Click(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuOption {
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Menu {
    pub name: String,
    pub options: Vec<MenuOption>,
}

impl Menu {
    fn new(name: &str, labels: impl IntoIterator<Item = String>, active: &str) -> Self {
        Self {
            name: name.to_string(),
            options: labels
                .into_iter()
                .map(|label| MenuOption {
                    selected: label == active,
                    label,
                })
                .collect(),
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.options
            .iter()
            .find(|option| option.selected)
            .map(|option| option.label.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Menus {
    pub x: Option<Menu>,
    pub y: Option<Menu>,
    pub marker: Option<Menu>,
    pub scale: Option<Menu>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tooltip {
    pub text: String,
    pub left: f64,
    pub top: f64,
    pub visible: bool,
    /// Fade duration of the last visibility change.
    pub fade_ms: f64,
}

/// Outcome of the initial load. Loading is synchronous, so the host either
/// holds a rendered explorer or the message of the failure.
#[derive(Debug)]
pub enum LoadState<B: RenderBackend = RenderGraph> {
    Ready(Box<Explorer<B>>),
    Failed(String),
}

impl LoadState<RenderGraph> {
    /// Loads the configured dataset and performs the first render.
    pub fn load(config: AppConfig) -> Self {
        let result = dataset::load(&config.dataset).and_then(|data| Explorer::new(data, config));
        Self::from_result(result)
    }
}

impl<B: RenderBackend> LoadState<B> {
    pub fn from_result(result: Result<Explorer<B>>) -> Self {
        match result {
            Ok(explorer) => Self::Ready(Box::new(explorer)),
            Err(err) => {
                let err = match err {
                    ScatterError::Load(_) => err,
                    other => ScatterError::Load(other.to_string()),
                };
                tracing::error!(error = %err, "dataset load failed");
                Self::Failed(err.to_string())
            }
        }
    }
}

/// Single owner of the dataset, the view state and the current frame.
#[derive(Debug)]
pub struct Explorer<B: RenderBackend = RenderGraph> {
    config: AppConfig,
    dataset: Dataset,
    view: ViewState,
    differ: SceneDiffer,
    formatter: DetailPanelFormatter,
    backend: B,
    clock: AnimationClock,
    projection: Projection,
    scene: Scene,
    menus: Menus,
    tooltip: Tooltip,
    detail: Option<DetailPanel>,
}

impl Explorer<RenderGraph> {
    pub fn new(dataset: Dataset, config: AppConfig) -> Result<Self> {
        Self::with_backend(dataset, config, RenderGraph::new())
    }
}

impl<B: RenderBackend> Explorer<B> {
    pub fn with_backend(dataset: Dataset, config: AppConfig, backend: B) -> Result<Self> {
        let view = ViewState::from_config(&config);
        let differ = SceneDiffer::new(&config);
        let formatter = DetailPanelFormatter::new(config.dataset.columns.clone());
        let projection = projection::project_all(&dataset, &view, &config.dataset.columns.denominator);
        let scene = differ.render(&projection.triples, &view, None, 0.0);

        let mut explorer = Self {
            config,
            dataset,
            view,
            differ,
            formatter,
            backend,
            clock: AnimationClock::default(),
            projection,
            scene,
            menus: Menus::default(),
            tooltip: Tooltip::default(),
            detail: None,
        };
        explorer.rebuild_menus();
        explorer.backend.present(&explorer.scene)?;
        Ok(explorer)
    }

    pub fn handle(&mut self, event: Event) -> Result<()> {
        tracing::debug!(?event, "handling event");
        match event {
            Event::SelectX(field) => {
                self.require_field(&field)?;
                self.apply(ViewAction::SelectX(field))
            }
            Event::SelectY(field) => {
                self.require_field(&field)?;
                self.apply(ViewAction::SelectY(field))
            }
            Event::SelectMarker(marker) => {
                if let Some(field) = marker.field() {
                    self.require_field(field)?;
                }
                self.apply(ViewAction::SelectMarker(marker))
            }
            Event::SelectScale(mode) => self.apply(ViewAction::SelectScale(mode)),
            Event::Hover { row, pointer } => self.hover(row, pointer),
            Event::Unhover(row) => self.unhover(row),
            Event::Click(row) => self.click(row),
        }
    }

    /// Moves the animation clock forward.
    pub fn advance(&mut self, delta_ms: f64) {
        self.clock.advance(delta_ms);
    }

    pub fn now_ms(&self) -> f64 {
        self.clock.now_ms
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn menus(&self) -> &Menus {
        &self.menus
    }

    pub fn tooltip(&self) -> &Tooltip {
        &self.tooltip
    }

    pub fn detail(&self) -> Option<&DetailPanel> {
        self.detail.as_ref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn require_field(&self, field: &str) -> Result<()> {
        if self.dataset.has_field(field) {
            Ok(())
        } else {
            Err(ScatterError::UnknownField(field.to_string()))
        }
    }

    fn apply(&mut self, action: ViewAction) -> Result<()> {
        self.view = self.view.reduce(action);
        self.rerender()
    }

    fn rerender(&mut self) -> Result<()> {
        let now = self.clock.now_ms;
        self.projection = projection::project_all(
            &self.dataset,
            &self.view,
            &self.config.dataset.columns.denominator,
        );
        self.scene = self
            .differ
            .render(&self.projection.triples, &self.view, Some(&self.scene), now);
        self.rebuild_menus();
        self.backend.present(&self.scene)
    }

    fn rebuild_menus(&mut self) {
        let fields = self.dataset.field_names();
        let marker_active = match &self.view.marker {
            MarkerMode::ScaledBy(field) => field.clone(),
            MarkerMode::ConstantSize(_) => self.config.marker.off_label.clone(),
        };
        let labels = &self.config.scale_labels;
        self.menus = Menus {
            x: Some(Menu::new("x", fields.clone(), &self.view.x_field)),
            y: Some(Menu::new("y", fields.clone(), &self.view.y_field)),
            marker: Some(Menu::new(
                "marker",
                fields
                    .into_iter()
                    .chain(std::iter::once(self.config.marker.off_label.clone())),
                &marker_active,
            )),
            scale: Some(Menu::new(
                "scale",
                ScaleMode::ALL.iter().map(|mode| labels.label(*mode).to_string()),
                labels.label(self.view.scale_mode),
            )),
        };
    }

    fn hover(&mut self, row: usize, pointer: (f64, f64)) -> Result<()> {
        let label = self
            .scene
            .mark(row)
            .map(|mark| mark.label.clone())
            .ok_or(ScatterError::UnknownMark(row))?;
        self.scene.set_color(row, &self.config.colors.hover)?;
        self.tooltip = Tooltip {
            text: label,
            left: pointer.0,
            top: pointer.1 - self.config.transition.tooltip_offset_y,
            visible: true,
            fade_ms: self.config.transition.tooltip_fade_in_ms,
        };
        self.backend.present(&self.scene)
    }

    /// Always restores the default color, including on a clicked mark.
    fn unhover(&mut self, row: usize) -> Result<()> {
        self.scene.set_color(row, &self.config.colors.default)?;
        self.tooltip.visible = false;
        self.tooltip.fade_ms = self.config.transition.tooltip_fade_out_ms;
        self.backend.present(&self.scene)
    }

    fn click(&mut self, row: usize) -> Result<()> {
        self.scene.set_color(row, &self.config.colors.selected)?;
        self.detail = Some(self.formatter.format(&self.dataset, &self.view, row)?);
        self.backend.present(&self.scene)
    }
}
