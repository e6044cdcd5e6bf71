//! Backend-agnostic scene diffing.
//!
//! A render pass turns the projected triples into a keyed list of target mark
//! states, axes with gridlines, and transitions from the previous frame. The
//! rendering backend only animates what it is given.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, MarkerConfig, PlotConfig, TransitionConfig},
    projection::ProjectedTriple,
    scale::LinearScale,
    timeline::{MarkState, Transition},
    view::{MarkerMode, ViewState},
    Result, ScatterError,
};

const TICK_COUNT: usize = 10;
const X_LABEL_OFFSET: f64 = 75.0;
const Y_LABEL_OFFSET: f64 = -93.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisOrientation {
    Bottom,
    Left,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub value: f64,
    /// Pixel offset along the axis inside the inner plot area.
    pub position: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub orientation: AxisOrientation,
    pub label: String,
    /// Label anchor relative to the axis origin, before any rotation.
    pub label_anchor: (f64, f64),
    pub scale: LinearScale,
    pub ticks: Vec<Tick>,
    /// Ticks are drawn across the whole inner plot as gridlines.
    pub gridline_length: f64,
}

/// Scales computed from one projected set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scales {
    pub x: LinearScale,
    pub y: LinearScale,
    /// `None` when the marker has a constant size.
    pub m: Option<LinearScale>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    /// Row index of the record, used as the reconciliation key.
    pub row: usize,
    pub label: String,
    pub color: String,
    pub target: MarkState,
    pub transition: Transition,
    /// True when the mark did not exist in the previous frame.
    pub entered: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Translation of the inner plot area inside the outer canvas.
    pub origin: (f64, f64),
    pub inner_width: f64,
    pub inner_height: f64,
    pub x_axis: Option<Axis>,
    pub y_axis: Option<Axis>,
    pub marks: Vec<Mark>,
    /// Rows rendered in the previous frame that have no mark any more.
    pub exited: Vec<usize>,
    pub issued_at_ms: f64,
}

impl Scene {
    pub fn mark(&self, row: usize) -> Option<&Mark> {
        self.marks.iter().find(|mark| mark.row == row)
    }

    pub fn set_color(&mut self, row: usize, color: &str) -> Result<()> {
        let mark = self
            .marks
            .iter_mut()
            .find(|mark| mark.row == row)
            .ok_or(ScatterError::UnknownMark(row))?;
        mark.color = color.to_string();
        Ok(())
    }

    pub fn is_settled(&self, now_ms: f64) -> bool {
        self.marks
            .iter()
            .all(|mark| mark.transition.is_finished(now_ms))
    }
}

/// Computes scales and reconciles marks against the previous frame.
#[derive(Debug, Clone)]
pub struct SceneDiffer {
    plot: PlotConfig,
    marker: MarkerConfig,
    transition: TransitionConfig,
    default_color: String,
}

impl SceneDiffer {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            plot: config.plot,
            marker: config.marker.clone(),
            transition: config.transition,
            default_color: config.colors.default.clone(),
        }
    }

    /// Scales spanning every projected value, extended to round bounds.
    pub fn compute_scales(&self, triples: &[ProjectedTriple], view: &ViewState) -> Option<Scales> {
        let x = LinearScale::from_values(
            triples.iter().map(|t| t.x),
            (0.0, self.plot.inner_width()),
        )?
        .nice();
        let y = LinearScale::from_values(
            triples.iter().map(|t| t.y),
            (self.plot.inner_height(), 0.0),
        )?
        .nice();
        let m = match view.marker {
            MarkerMode::ScaledBy(_) => LinearScale::from_values(
                triples.iter().map(|t| t.m),
                (self.marker.min_size, self.marker.max_size),
            )
            .map(LinearScale::nice),
            MarkerMode::ConstantSize(_) => None,
        };
        Some(Scales { x, y, m })
    }

    /// Builds the next frame. Marks are keyed by row; marks that existed in
    /// `previous` animate from their state at `now_ms`, new ones grow out of
    /// the plot centre. Each mark is delayed by its row index times the
    /// stagger, so excluded rows do not shift the marks after them.
    pub fn render(
        &self,
        triples: &[ProjectedTriple],
        view: &ViewState,
        previous: Option<&Scene>,
        now_ms: f64,
    ) -> Scene {
        let inner_width = self.plot.inner_width();
        let inner_height = self.plot.inner_height();
        let scales = self.compute_scales(triples, view);

        let previous_marks: HashMap<usize, &Mark> = previous
            .map(|scene| scene.marks.iter().map(|mark| (mark.row, mark)).collect())
            .unwrap_or_default();

        let mut marks = Vec::with_capacity(triples.len());
        if let Some(scales) = &scales {
            let centre = MarkState {
                cx: inner_width / 2.0,
                cy: inner_height / 2.0,
                r: 0.0,
            };
            for triple in triples {
                let target = MarkState {
                    cx: scales.x.scale(triple.x),
                    cy: scales.y.scale(triple.y),
                    r: self.marker_size(scales, view, triple.m),
                };
                let start_ms = now_ms + triple.row as f64 * self.transition.stagger_ms;
                let duration_ms = self.transition.duration_ms;
                let (transition, color, entered) = match previous_marks.get(&triple.row) {
                    Some(old) => (
                        old.transition
                            .retarget(now_ms, target.clone(), start_ms, duration_ms),
                        old.color.clone(),
                        false,
                    ),
                    None => (
                        Transition::new(centre.clone(), target.clone(), start_ms, duration_ms),
                        self.default_color.clone(),
                        true,
                    ),
                };
                marks.push(Mark {
                    row: triple.row,
                    label: triple.label.clone(),
                    color,
                    target,
                    transition,
                    entered,
                });
            }
        }

        let rendered: HashSet<usize> = marks.iter().map(|mark| mark.row).collect();
        let mut exited: Vec<usize> = previous_marks
            .keys()
            .filter(|row| !rendered.contains(row))
            .copied()
            .collect();
        exited.sort_unstable();

        tracing::debug!(
            marks = marks.len(),
            entered = marks.iter().filter(|mark| mark.entered).count(),
            exited = exited.len(),
            x = %view.x_field,
            y = %view.y_field,
            "scene reconciled"
        );

        Scene {
            origin: (self.plot.margin.left, self.plot.margin.top),
            inner_width,
            inner_height,
            x_axis: scales.map(|scales| {
                self.axis(
                    AxisOrientation::Bottom,
                    &view.x_field,
                    scales.x,
                    (inner_width / 2.0, X_LABEL_OFFSET),
                    inner_height,
                )
            }),
            y_axis: scales.map(|scales| {
                self.axis(
                    AxisOrientation::Left,
                    &view.y_field,
                    scales.y,
                    (-inner_height / 2.0, Y_LABEL_OFFSET),
                    inner_width,
                )
            }),
            marks,
            exited,
            issued_at_ms: now_ms,
        }
    }

    fn marker_size(&self, scales: &Scales, view: &ViewState, m: f64) -> f64 {
        match (&view.marker, scales.m) {
            (MarkerMode::ConstantSize(size), _) => *size,
            (MarkerMode::ScaledBy(_), Some(scale)) => scale.scale(m),
            (MarkerMode::ScaledBy(_), None) => self.marker.constant_size,
        }
    }

    fn axis(
        &self,
        orientation: AxisOrientation,
        label: &str,
        scale: LinearScale,
        label_anchor: (f64, f64),
        gridline_length: f64,
    ) -> Axis {
        let precision = scale.tick_precision(TICK_COUNT);
        let ticks = scale
            .ticks(TICK_COUNT)
            .into_iter()
            .map(|value| Tick {
                value,
                position: scale.scale(value),
                text: format!("{value:.precision$}"),
            })
            .collect();
        Axis {
            orientation,
            label: label.to_string(),
            label_anchor,
            scale,
            ticks,
            gridline_length,
        }
    }
}
