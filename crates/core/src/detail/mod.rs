//! Per-point inspection content shown when a mark is clicked.

use serde::{Deserialize, Serialize};

use crate::{
    config::ColumnNames,
    dataset::Dataset,
    view::{MarkerMode, ViewState},
    Result, ScatterError,
};

/// Shown in place of the annotation table when the row's list is unusable.
pub const ANNOTATION_FALLBACK: &str = "Annotations for this message could not be read.";

/// One `[token, polarity, subjectivity]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub token: String,
    pub polarity: f64,
    pub subjectivity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnnotationList {
    Parsed(Vec<Annotation>),
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailPanel {
    pub row: usize,
    /// Label and display value pairs, in display order.
    pub metadata: Vec<(String, String)>,
    /// Annotated message body. Already HTML, inserted as-is.
    pub annotated_text: String,
    pub annotations: AnnotationList,
}

/// Parses a JSON array of `[token, polarity, subjectivity]` triples.
pub fn parse_annotations(row: usize, raw: &str) -> Result<Vec<Annotation>> {
    let triples: Vec<(String, f64, f64)> = serde_json::from_str(raw)
        .map_err(|source| ScatterError::AnnotationParse { row, source })?;
    Ok(triples
        .into_iter()
        .map(|(token, polarity, subjectivity)| Annotation {
            token,
            polarity,
            subjectivity,
        })
        .collect())
}

/// Builds detail panels from the side table and the typed records.
#[derive(Debug, Clone)]
pub struct DetailPanelFormatter {
    columns: ColumnNames,
}

impl DetailPanelFormatter {
    pub fn new(columns: ColumnNames) -> Self {
        Self { columns }
    }

    /// Formats the panel for `row`. Annotation failures are folded into the
    /// panel; only an unknown row is an error.
    pub fn format(&self, dataset: &Dataset, view: &ViewState, row: usize) -> Result<DetailPanel> {
        let record = dataset.record(row).ok_or(ScatterError::UnknownMark(row))?;
        let text = |column: &str| dataset.side_table.get(column, row).unwrap_or_default().to_string();
        let number = |field: &str| {
            record
                .value(field)
                .map(|value| format!("{value:.2}"))
                .unwrap_or_default()
        };

        let mut metadata = vec![
            ("Date".to_string(), text(&self.columns.date)),
            ("Sender".to_string(), text(&self.columns.sender)),
            ("Receiver".to_string(), text(&self.columns.receiver)),
            (view.x_field.clone(), number(&view.x_field)),
            (view.y_field.clone(), number(&view.y_field)),
        ];
        match &view.marker {
            MarkerMode::ScaledBy(field) => metadata.push((field.clone(), number(field))),
            MarkerMode::ConstantSize(size) => {
                metadata.push(("marker size".to_string(), format!("{size:.2}")))
            }
        }

        let annotations = match parse_annotations(row, &text(&self.columns.annotations)) {
            Ok(list) => AnnotationList::Parsed(list),
            Err(err) => {
                tracing::warn!(row, error = %err, "showing annotation fallback");
                AnnotationList::Unavailable(ANNOTATION_FALLBACK.to_string())
            }
        };

        Ok(DetailPanel {
            row,
            metadata,
            annotated_text: text(&self.columns.text_annotated),
            annotations,
        })
    }
}

impl DetailPanel {
    pub fn info_html(&self) -> String {
        let mut html =
            String::from("<h2>Selected data information</h2><table class='info-table'>");
        for (label, value) in &self.metadata {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td></tr>",
                escape(label),
                escape(value)
            ));
        }
        html.push_str("</table>");
        html
    }

    pub fn text_html(&self) -> String {
        format!(
            "<h2>Annotated text </h2><div id=\"data-point-text-field\">{}</div>",
            self.annotated_text
        )
    }

    pub fn annotations_html(&self) -> String {
        let mut html = String::from("<h2>List of annotations</h2>");
        match &self.annotations {
            AnnotationList::Parsed(list) => {
                html.push_str("<table><tr><th>Word(s)</th><th>polarity</th><th>subjectivity</th></tr>");
                for entry in list {
                    html.push_str(&format!(
                        "<tr><td>{}</td><td>{:.2}</td><td>{:.2}</td></tr>",
                        escape(&entry.token),
                        entry.polarity,
                        entry.subjectivity
                    ));
                }
                html.push_str("</table>");
            }
            AnnotationList::Unavailable(message) => {
                html.push_str(&format!("<p class='fallback'>{}</p>", escape(message)));
            }
        }
        html
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
