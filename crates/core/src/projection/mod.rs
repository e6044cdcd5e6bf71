use serde::{Deserialize, Serialize};

use crate::{
    dataset::{Dataset, Record},
    view::{MarkerMode, ScaleMode, ViewState},
    Result, ScatterError,
};

/// Position and marker value of one record under a [`ViewState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedTriple {
    /// Index of the source record.
    pub row: usize,
    pub x: f64,
    pub y: f64,
    pub m: f64,
    pub label: String,
}

/// Result of projecting a whole dataset.
#[derive(Debug, Default)]
pub struct Projection {
    pub triples: Vec<ProjectedTriple>,
    /// Points left out of the render set, one error each.
    pub excluded: Vec<ScatterError>,
}

impl Projection {
    pub fn get(&self, row: usize) -> Option<&ProjectedTriple> {
        self.triples.iter().find(|triple| triple.row == row)
    }
}

/// Projects one record. `row` is only used to tag the triple and errors.
pub fn project(
    row: usize,
    record: &Record,
    view: &ViewState,
    denominator_field: &str,
) -> Result<ProjectedTriple> {
    let read = |field: &str| {
        record.value(field).ok_or_else(|| ScatterError::MissingField {
            row,
            field: field.to_string(),
        })
    };

    let mut x = read(&view.x_field)?;
    let mut y = read(&view.y_field)?;
    let mut m = match &view.marker {
        MarkerMode::ScaledBy(field) => read(field)?,
        MarkerMode::ConstantSize(size) => *size,
    };

    if view.scale_mode == ScaleMode::Relative {
        let denominator = record.value(denominator_field);
        let d = match denominator {
            Some(d) if d > 0.0 => d,
            _ => {
                return Err(ScatterError::DivisionByZero {
                    row,
                    field: denominator_field.to_string(),
                    denominator,
                })
            }
        };
        x = 100.0 * x / d;
        y = 100.0 * y / d;
        if let MarkerMode::ScaledBy(_) = view.marker {
            m = 100.0 * m / d;
        }
    }

    Ok(ProjectedTriple {
        row,
        x,
        y,
        m,
        label: format!("({x:.2}, {y:.2})"),
    })
}

/// Projects every record, excluding the ones that cannot be projected.
pub fn project_all(dataset: &Dataset, view: &ViewState, denominator_field: &str) -> Projection {
    let mut projection = Projection::default();
    for (row, record) in dataset.records.iter().enumerate() {
        match project(row, record, view, denominator_field) {
            Ok(triple) if triple.x.is_finite() && triple.y.is_finite() && triple.m.is_finite() => {
                projection.triples.push(triple)
            }
            Ok(_) => {
                tracing::warn!(row, "excluding point with non-finite projection");
                projection
                    .excluded
                    .push(ScatterError::msg(format!("row {row}: non-finite projection")));
            }
            Err(err) => {
                tracing::warn!(row, error = %err, "excluding point from render set");
                projection.excluded.push(err);
            }
        }
    }
    tracing::debug!(
        points = projection.triples.len(),
        excluded = projection.excluded.len(),
        "projection complete"
    );
    projection
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;

    use super::*;
    use crate::view::ViewAction;

    fn record(polarity: f64, subjectivity: f64, tokens: f64) -> Record {
        Record {
            numeric: HashMap::from([
                ("polarity".to_string(), polarity),
                ("subjectivity".to_string(), subjectivity),
                ("nr_tokens".to_string(), tokens),
            ]),
            sender_id: 0,
            time: 0,
        }
    }

    fn dataset() -> Dataset {
        Dataset {
            records: vec![
                record(0.5, 0.2, 100.0),
                record(-0.3, 0.8, 50.0),
                record(0.1, 0.1, 10.0),
            ],
            ..Dataset::default()
        }
    }

    #[test]
    fn absolute_mode_passes_values_through() {
        let projection = project_all(&dataset(), &ViewState::default(), "nr_tokens");
        let labels: Vec<&str> = projection.triples.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["(0.50, 0.20)", "(-0.30, 0.80)", "(0.10, 0.10)"]);
        assert_eq!(projection.triples[1].x, -0.3);
        assert_eq!(projection.triples[1].y, 0.8);
        assert_eq!(projection.triples[1].m, 50.0);
    }

    #[test]
    fn relative_mode_scales_by_denominator() {
        let view = ViewState::default().reduce(ViewAction::SelectScale(ScaleMode::Relative));
        let projection = project_all(&dataset(), &view, "nr_tokens");
        let expected = [(0.5, 0.2), (-0.6, 1.6), (1.0, 1.0)];
        for (triple, (x, y)) in projection.triples.iter().zip(expected) {
            assert!((triple.x - x).abs() < 1e-12);
            assert!((triple.y - y).abs() < 1e-12);
            assert!((triple.m - 100.0).abs() < 1e-12);
        }
        assert_eq!(projection.triples[1].label, "(-0.60, 1.60)");
    }

    #[test]
    fn zero_denominator_excludes_the_point() {
        let mut data = dataset();
        data.records[1].numeric.insert("nr_tokens".to_string(), 0.0);
        let view = ViewState::default().reduce(ViewAction::SelectScale(ScaleMode::Relative));

        let projection = project_all(&data, &view, "nr_tokens");
        assert_eq!(projection.triples.len(), 2);
        assert!(projection.get(1).is_none());
        assert!(matches!(
            projection.excluded[0],
            ScatterError::DivisionByZero { row: 1, denominator: Some(d), .. } if d == 0.0
        ));
    }

    #[test]
    fn missing_denominator_column_excludes_every_point() {
        let view = ViewState::default().reduce(ViewAction::SelectScale(ScaleMode::Relative));
        let projection = project_all(&dataset(), &view, "word_count");
        assert!(projection.triples.is_empty());
        assert_eq!(projection.excluded.len(), 3);
    }

    #[test]
    fn constant_marker_ignores_data() {
        let view = ViewState::default()
            .reduce(ViewAction::SelectMarker(MarkerMode::ConstantSize(4.0)))
            .reduce(ViewAction::SelectScale(ScaleMode::Relative));
        let projection = project_all(&dataset(), &view, "nr_tokens");
        assert!(projection.triples.iter().all(|t| t.m == 4.0));
    }

    #[test]
    fn unknown_field_is_reported() {
        let view = ViewState::default().reduce(ViewAction::SelectX("anger".to_string()));
        let err = project(0, &record(0.1, 0.1, 1.0), &view, "nr_tokens").unwrap_err();
        assert!(matches!(err, ScatterError::MissingField { ref field, .. } if field == "anger"));
    }

    proptest! {
        #[test]
        fn relative_projection_never_yields_nan(
            x in -10.0f64..10.0,
            d in -5.0f64..200.0,
        ) {
            let view = ViewState::default().reduce(ViewAction::SelectScale(ScaleMode::Relative));
            match project(0, &record(x, 0.5, d), &view, "nr_tokens") {
                Ok(triple) => {
                    prop_assert!(d > 0.0);
                    prop_assert!((triple.x - 100.0 * x / d).abs() <= 1e-9 * triple.x.abs().max(1.0));
                }
                Err(err) => prop_assert!(d <= 0.0 && err.is_point_local()),
            }
        }
    }
}
