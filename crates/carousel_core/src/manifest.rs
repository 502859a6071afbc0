use serde_json::Value;
use thiserror::Error;

use crate::canvas::{Canvas, CrossReferences, PresentationVersion};
use crate::json::string_id;
use crate::label::extract_label;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("manifest is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("manifest has no usable canvas list")]
    Unrecognized,
}

/// A fetched manifest reduced to what canvas selection and link resolution need.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub version: PresentationVersion,
    pub id: Option<String>,
    pub label: Option<Value>,
    pub links: CrossReferences,
    pub canvases: Vec<Canvas>,
}

impl Manifest {
    pub fn label(&self, languages: &[String]) -> Option<String> {
        self.label
            .as_ref()
            .and_then(|label| extract_label(label, languages))
    }
}

/// Parses and normalizes a manifest body.
pub fn parse_manifest(text: &str) -> Result<Manifest, ManifestError> {
    let raw: Value =
        serde_json::from_str(text).map_err(|err| ManifestError::InvalidJson(err.to_string()))?;
    normalize(&raw)
}

/// Detects the presentation version and normalizes every canvas.
///
/// A non-empty `items` array means v3; otherwise `sequences[0].canvases`
/// means v2. Anything else is rejected.
pub fn normalize(raw: &Value) -> Result<Manifest, ManifestError> {
    let (version, canvases) = if let Some(items) = non_empty_array(raw.get("items")) {
        (PresentationVersion::V3, items)
    } else if let Some(canvases) = non_empty_array(
        raw.get("sequences")
            .and_then(|seqs| seqs.get(0))
            .and_then(|seq| seq.get("canvases")),
    ) {
        (PresentationVersion::V2, canvases)
    } else {
        return Err(ManifestError::Unrecognized);
    };

    Ok(Manifest {
        version,
        id: string_id(raw).map(ToOwned::to_owned),
        label: raw.get("label").cloned(),
        links: CrossReferences::from_value(raw),
        canvases: canvases
            .iter()
            .map(|canvas| Canvas::from_value(version, canvas))
            .collect(),
    })
}

fn non_empty_array(value: Option<&Value>) -> Option<&Vec<Value>> {
    value.and_then(Value::as_array).filter(|items| !items.is_empty())
}
