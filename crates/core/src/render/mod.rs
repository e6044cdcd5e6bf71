use serde::{Deserialize, Serialize};

use crate::{scene::Scene, timeline::MarkState, Result};

/// Receives every reconciled frame. Implementations animate marks from their
/// previous state to the targets they are handed and nothing more.
pub trait RenderBackend {
    fn present(&mut self, scene: &Scene) -> Result<()>;
}

/// A mark as it appears at a given instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawnMark {
    pub row: usize,
    pub state: MarkState,
    pub color: String,
}

/// Headless backend that keeps the latest frame and samples it on demand.
#[derive(Debug, Default)]
pub struct RenderGraph {
    scene: Option<Scene>,
    frames_presented: usize,
}

impl RenderGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn frames_presented(&self) -> usize {
        self.frames_presented
    }

    /// Marks of the latest frame as they look at clock time `now_ms`.
    pub fn draw(&self, now_ms: f64) -> Vec<DrawnMark> {
        let Some(scene) = &self.scene else {
            return Vec::new();
        };
        scene
            .marks
            .iter()
            .map(|mark| DrawnMark {
                row: mark.row,
                state: mark.transition.sample(now_ms),
                color: mark.color.clone(),
            })
            .collect()
    }
}

impl RenderBackend for RenderGraph {
    fn present(&mut self, scene: &Scene) -> Result<()> {
        self.scene = Some(scene.clone());
        self.frames_presented += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig, projection::ProjectedTriple, scene::SceneDiffer, view::ViewState,
    };

    #[test]
    fn draws_latest_frame_at_requested_time() {
        let triples = vec![
            ProjectedTriple {
                row: 0,
                x: 0.0,
                y: 0.0,
                m: 1.0,
                label: "(0.00, 0.00)".to_string(),
            },
            ProjectedTriple {
                row: 1,
                x: 1.0,
                y: 1.0,
                m: 2.0,
                label: "(1.00, 1.00)".to_string(),
            },
        ];
        let scene = SceneDiffer::new(&AppConfig::default()).render(
            &triples,
            &ViewState::default(),
            None,
            0.0,
        );

        let mut graph = RenderGraph::new();
        assert!(graph.draw(0.0).is_empty());
        assert!(graph.scene().is_none());
        graph.present(&scene).unwrap();
        assert_eq!(graph.scene(), Some(&scene));

        let start = graph.draw(0.0);
        assert_eq!(start[0].state.r, 0.0);
        let settled = graph.draw(5_000.0);
        assert_eq!(settled[1].state, scene.marks[1].target);
        assert_eq!(graph.frames_presented(), 1);
    }
}
