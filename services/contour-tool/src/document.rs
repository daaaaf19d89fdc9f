//! Grid documents read by the tool and the results written back.
//!
//! A document file holds one grid document or an array of them:
//!
//! ```json
//! {
//!   "name": "depth",
//!   "grid": { "ncol": 3, "nrow": 2, "xmin": 0, "ymin": 0, "xmax": 2, "ymax": 1,
//!             "values": [0, 1, 2, 1, 2, 3] },
//!   "options": { "contour_interval": 1.0 },
//!   "faults": [[{ "x": 0.5, "y": -1 }, { "x": 0.5, "y": 2 }]]
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use contour_engine::{
    ContourOptions, ContourRecord, Grid, LineFaults, Point, Status, TraceSession,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One grid to contour.
#[derive(Debug, Clone, Deserialize)]
pub struct GridDocument {
    #[serde(default)]
    pub name: Option<String>,
    pub grid: Grid,
    /// Replaces the tool's base options for this grid.
    #[serde(default)]
    pub options: Option<ContourOptions>,
    /// Fault polylines in grid coordinates.
    #[serde(default)]
    pub faults: Vec<Vec<Point>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentFile {
    Many(Vec<GridDocument>),
    One(Box<GridDocument>),
}

/// Parse a document file body. Also reports whether the body was an
/// array.
pub fn parse_documents(text: &str) -> Result<(Vec<GridDocument>, bool)> {
    let parsed: DocumentFile =
        serde_json::from_str(text).context("Failed to parse grid document")?;
    Ok(match parsed {
        DocumentFile::Many(docs) => (docs, true),
        DocumentFile::One(doc) => (vec![*doc], false),
    })
}

/// Name unnamed documents after `stem`. Documents from an array also get
/// their position as an `[i]` suffix.
fn name_documents(docs: &mut [GridDocument], stem: &str, in_array: bool) {
    for (i, doc) in docs.iter_mut().enumerate() {
        if doc.name.is_none() {
            doc.name = Some(if in_array {
                format!("{}[{}]", stem, i)
            } else {
                stem.to_string()
            });
        }
    }
}

/// Read every document in `path`. Unnamed documents are named after the
/// file and their position in it.
pub fn load_documents(path: &Path) -> Result<Vec<GridDocument>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let (mut docs, in_array) =
        parse_documents(&text).with_context(|| format!("In {}", path.display()))?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "grid".to_string());
    name_documents(&mut docs, &stem, in_array);

    debug!(path = %path.display(), count = docs.len(), "Loaded grid documents");
    Ok(docs)
}

/// Result of contouring one document.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub records: Vec<ContourRecord>,
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Contour one document. Engine errors become failed outcomes so one bad
/// grid does not stop the batch.
pub fn run_document(doc: &GridDocument, base: &ContourOptions) -> Outcome {
    let name = doc.name.clone().unwrap_or_default();
    let options = doc.options.as_ref().unwrap_or(base);
    let faults = LineFaults::new(&doc.faults);

    if options.faulted && doc.faults.is_empty() {
        warn!(name = %name, "Fault mode requested without fault lines");
    }

    let result = TraceSession::new(&doc.grid, options, &faults).and_then(|s| s.run());
    match result {
        Ok(records) => {
            debug!(name = %name, records = records.len(), "Contoured grid");
            Outcome {
                name,
                status: Status::Ok.to_string(),
                error: None,
                records,
            }
        }
        Err(err) => {
            warn!(name = %name, error = %err, "Contouring failed");
            Outcome {
                name,
                status: err.status().to_string(),
                error: Some(err.to_string()),
                records: Vec::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::create_ramp_grid;

    fn ramp_document() -> String {
        let values = serde_json::to_string(&create_ramp_grid(4, 4)).unwrap();
        format!(
            r#"{{"name": "ramp",
                "grid": {{"ncol": 4, "nrow": 4, "xmin": 0, "ymin": 0,
                          "xmax": 3, "ymax": 3, "values": {}}},
                "options": {{"contour_interval": 1.0, "smoothing": 0}}}}"#,
            values
        )
    }

    #[test]
    fn test_parse_single_document() {
        let (docs, _) = parse_documents(&ramp_document()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].name.as_deref(), Some("ramp"));
        assert_eq!(docs[0].grid.ncol, 4);
        assert!(docs[0].faults.is_empty());
    }

    #[test]
    fn test_parse_document_array() {
        let text = format!("[{}, {}]", ramp_document(), ramp_document());
        let (docs, in_array) = parse_documents(&text).unwrap();
        assert!(in_array);
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn test_unnamed_documents_take_file_stem() {
        let unnamed = ramp_document().replace(r#""name": "ramp","#, "");

        let (mut one, in_array) = parse_documents(&unnamed).unwrap();
        assert!(!in_array);
        name_documents(&mut one, "depth", in_array);
        assert_eq!(one[0].name.as_deref(), Some("depth"));

        let (mut single, in_array) = parse_documents(&format!("[{}]", unnamed)).unwrap();
        assert!(in_array);
        name_documents(&mut single, "depth", in_array);
        assert_eq!(single[0].name.as_deref(), Some("depth[0]"));

        let text = format!("[{}, {}]", ramp_document(), unnamed);
        let (mut pair, in_array) = parse_documents(&text).unwrap();
        name_documents(&mut pair, "depth", in_array);
        assert_eq!(pair[0].name.as_deref(), Some("ramp"));
        assert_eq!(pair[1].name.as_deref(), Some("depth[1]"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_documents("{\"grid\": 5}").is_err());
        assert!(parse_documents("not json").is_err());
    }

    #[test]
    fn test_run_document() {
        let (docs, _) = parse_documents(&ramp_document()).unwrap();
        let outcome = run_document(&docs[0], &ContourOptions::default());
        assert!(outcome.is_ok());
        assert_eq!(outcome.status, Status::Ok.as_str());
        assert!(!outcome.records.is_empty());
    }

    #[test]
    fn test_run_document_reports_errors() {
        let (mut docs, _) = parse_documents(&ramp_document()).unwrap();
        docs[0].grid.values.truncate(3);
        let outcome = run_document(&docs[0], &ContourOptions::default());
        assert!(!outcome.is_ok());
        assert_eq!(outcome.status, "invalid_grid");
        assert!(outcome.records.is_empty());

        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json["error"].as_str().is_some_and(|e| e.contains("invalid grid")));
    }
}
