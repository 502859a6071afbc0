use std::sync::Arc;

use carousel_core::{info_url, parse_info_dimensions, Canvas, ImageDimensions, ImageSource};
use carousel_logging::carousel_debug;

use crate::decode::decode_json_text;
use crate::fetch::Fetcher;

/// Looks up the pixel dimensions an image service reports for itself.
#[async_trait::async_trait]
pub trait DimensionLookup: Send + Sync {
    /// Returns unknown dimensions when the service cannot be reached or parsed.
    async fn dimensions(&self, service_id: &str) -> ImageDimensions;
}

/// Never consults the network; callers fall back to declared dimensions.
pub struct NoDimensionLookup;

#[async_trait::async_trait]
impl DimensionLookup for NoDimensionLookup {
    async fn dimensions(&self, _service_id: &str) -> ImageDimensions {
        ImageDimensions::unknown()
    }
}

/// Reads `{service}/info.json` through a fetcher.
pub struct InfoDimensionLookup {
    fetcher: Arc<dyn Fetcher>,
}

impl InfoDimensionLookup {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait::async_trait]
impl DimensionLookup for InfoDimensionLookup {
    async fn dimensions(&self, service_id: &str) -> ImageDimensions {
        let url = info_url(service_id);
        let output = match self.fetcher.fetch(&url).await {
            Ok(output) => output,
            Err(err) => {
                carousel_debug!("info lookup failed for {url}: {err}");
                return ImageDimensions::unknown();
            }
        };
        let parsed = decode_json_text(&output.bytes, output.metadata.content_type.as_deref())
            .map_err(|err| err.to_string())
            .and_then(|decoded| {
                serde_json::from_str::<serde_json::Value>(&decoded.text).map_err(|err| err.to_string())
            });
        match parsed {
            Ok(value) => parse_info_dimensions(&value),
            Err(err) => {
                carousel_debug!("info document at {url} unreadable: {err}");
                ImageDimensions::unknown()
            }
        }
    }
}

/// Builds the display URL for a canvas. Only service-backed sources trigger a lookup.
pub async fn resolve_image_url(
    canvas: &Canvas,
    target_size: u32,
    lookup: &dyn DimensionLookup,
) -> Option<String> {
    let source = ImageSource::from_canvas(canvas)?;
    let looked_up = match source.service_id() {
        Some(service) => lookup.dimensions(service).await,
        None => ImageDimensions::unknown(),
    };
    Some(source.url(target_size, looked_up))
}
