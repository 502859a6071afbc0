//! Image API URL construction and aspect-aware size negotiation.

use std::fmt;

use serde_json::Value;

use crate::canvas::Canvas;
use crate::json::dimension;

/// Pixel dimensions of an image, either of which may be unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageDimensions {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ImageDimensions {
    pub fn new(width: Option<u32>, height: Option<u32>) -> Self {
        Self { width, height }
    }

    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_unknown(&self) -> bool {
        self.width.is_none() && self.height.is_none()
    }
}

/// The `size` segment of an Image API request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeRequest {
    /// `w,`
    Width(u32),
    /// `,h`
    Height(u32),
}

impl SizeRequest {
    /// Picks the constrained axis and magnitude for `target` pixels.
    ///
    /// Portrait images are constrained by width, everything else by height.
    /// A known dimension caps the magnitude so the server is never asked to
    /// upscale.
    pub fn negotiate(dimensions: ImageDimensions, target: u32) -> Self {
        match (dimensions.width, dimensions.height) {
            (Some(w), Some(h)) if w < h => SizeRequest::Width(w.min(target)),
            (Some(_), Some(h)) => SizeRequest::Height(h.min(target)),
            (Some(w), None) => SizeRequest::Width(w.min(target)),
            (None, Some(h)) => SizeRequest::Height(h.min(target)),
            (None, None) => SizeRequest::Height(target),
        }
    }
}

impl fmt::Display for SizeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeRequest::Width(w) => write!(f, "{w},"),
            SizeRequest::Height(h) => write!(f, ",{h}"),
        }
    }
}

/// `{service}/full/{size}/0/default.jpg`
pub fn image_api_url(service_id: &str, size: SizeRequest) -> String {
    format!("{}/full/{size}/0/default.jpg", service_id.trim_end_matches('/'))
}

/// Location of the `info.json` document for an image service.
pub fn info_url(service_id: &str) -> String {
    format!("{}/info.json", service_id.trim_end_matches('/'))
}

/// Reads the full-size dimensions from an Image API `info.json` document.
///
/// Falls back to the largest advertised entry of `sizes` (per axis) when the
/// top-level `width`/`height` are missing.
pub fn parse_info_dimensions(info: &Value) -> ImageDimensions {
    let sizes: &[Value] = info
        .get("sizes")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let largest = |key: &str| sizes.iter().filter_map(|size| dimension(size, key)).max();

    ImageDimensions::new(
        dimension(info, "width").or_else(|| largest("width")),
        dimension(info, "height").or_else(|| largest("height")),
    )
}

/// Where the pixels of a selected canvas come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// An Image API service that can render any size.
    Service {
        id: String,
        declared: ImageDimensions,
    },
    /// A fixed image URL (thumbnail or painted body) used as-is.
    Direct(String),
}

impl ImageSource {
    /// Service first, then the canvas thumbnail, then the painted body URL.
    pub fn from_canvas(canvas: &Canvas) -> Option<Self> {
        if let Some(id) = canvas.service_id() {
            return Some(ImageSource::Service {
                id: id.to_string(),
                declared: canvas.declared_dimensions(),
            });
        }
        canvas
            .thumbnail
            .as_deref()
            .or_else(|| canvas.body_id())
            .map(|url| ImageSource::Direct(url.to_string()))
    }

    /// Service endpoint to consult for dimensions, if this is a service.
    pub fn service_id(&self) -> Option<&str> {
        match self {
            ImageSource::Service { id, .. } => Some(id),
            ImageSource::Direct(_) => None,
        }
    }

    /// Final image URL. `looked_up` are the dimensions reported by the image
    /// server; when unknown, the dimensions declared in the manifest are used.
    pub fn url(&self, target: u32, looked_up: ImageDimensions) -> String {
        match self {
            ImageSource::Service { id, declared } => {
                let dims = if looked_up.is_unknown() {
                    *declared
                } else {
                    looked_up
                };
                image_api_url(id, SizeRequest::negotiate(dims, target))
            }
            ImageSource::Direct(url) => url.clone(),
        }
    }
}
