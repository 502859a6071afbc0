use serde_json::Value;

use crate::image::ImageDimensions;
use crate::json::{dimension, entries, first_entry, link_ids, string_id, type_name};

/// IIIF Presentation API version a manifest was published with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationVersion {
    V2,
    V3,
}

/// Outbound links shared by canvases and manifests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CrossReferences {
    /// `partOf` (v3) or `within` (v2).
    pub part_of: Vec<String>,
    pub homepage: Vec<String>,
    pub see_also: Vec<String>,
    /// v2 `related`.
    pub related: Vec<String>,
}

impl CrossReferences {
    pub(crate) fn from_value(value: &Value) -> Self {
        let mut part_of = link_ids(value.get("partOf"));
        part_of.extend(link_ids(value.get("within")));
        Self {
            part_of,
            homepage: link_ids(value.get("homepage")),
            see_also: link_ids(value.get("seeAlso")),
            related: link_ids(value.get("related")),
        }
    }
}

/// The painted image of a canvas: the v3 annotation body or the v2 image resource.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageBody {
    pub id: Option<String>,
    pub service_id: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A canvas with its version-specific shape resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    pub version: PresentationVersion,
    pub id: Option<String>,
    pub body: Option<ImageBody>,
    pub thumbnail: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub links: CrossReferences,
}

impl Canvas {
    pub(crate) fn from_value(version: PresentationVersion, value: &Value) -> Self {
        let body = match version {
            PresentationVersion::V3 => v3_body(value),
            PresentationVersion::V2 => v2_body(value),
        };
        Self {
            version,
            id: string_id(value).map(ToOwned::to_owned),
            body,
            thumbnail: value
                .get("thumbnail")
                .and_then(|thumb| link_ids(Some(thumb)).into_iter().next()),
            width: dimension(value, "width"),
            height: dimension(value, "height"),
            links: CrossReferences::from_value(value),
        }
    }

    /// Image API service endpoint of the painted image, if any.
    pub fn service_id(&self) -> Option<&str> {
        self.body.as_ref()?.service_id.as_deref()
    }

    /// Id of the painted image itself (a direct image URL for most publishers).
    pub fn body_id(&self) -> Option<&str> {
        self.body.as_ref()?.id.as_deref()
    }

    /// Dimensions declared in the manifest: the image body first, then the canvas.
    pub fn declared_dimensions(&self) -> ImageDimensions {
        let from_body = self
            .body
            .as_ref()
            .map(|body| ImageDimensions::new(body.width, body.height))
            .unwrap_or_default();
        if !from_body.is_unknown() {
            return from_body;
        }
        ImageDimensions::new(self.width, self.height)
    }
}

/// `items[0].items[0].body`, unwrapping arrays and `Choice` bodies.
fn v3_body(canvas: &Value) -> Option<ImageBody> {
    let page = canvas.get("items").and_then(first_entry)?;
    let annotation = page.get("items").and_then(first_entry)?;
    let mut body = annotation.get("body").and_then(first_entry)?;
    if type_name(body) == Some("Choice") {
        body = body.get("items").and_then(first_entry)?;
    }

    let services = ["service", "services"]
        .iter()
        .filter_map(|key| body.get(*key))
        .flat_map(entries);
    let service_id = services
        .filter(|svc| looks_like_image_service(svc))
        .find_map(string_id)
        .map(ToOwned::to_owned);

    Some(ImageBody {
        id: string_id(body).map(ToOwned::to_owned),
        service_id,
        width: dimension(body, "width"),
        height: dimension(body, "height"),
    })
}

/// `images[0].resource`; the service may be an object or an array.
fn v2_body(canvas: &Value) -> Option<ImageBody> {
    let image = canvas.get("images").and_then(first_entry)?;
    let resource = image.get("resource")?;

    // v2 publishers often omit the profile; accept any service with an id
    // when none of them is explicitly an image service.
    let service_id = resource.get("service").and_then(|svc| {
        entries(svc)
            .filter(|entry| looks_like_image_service(entry))
            .find_map(string_id)
            .or_else(|| entries(svc).find_map(string_id))
            .map(ToOwned::to_owned)
    });

    Some(ImageBody {
        id: string_id(resource).map(ToOwned::to_owned),
        service_id,
        width: dimension(resource, "width"),
        height: dimension(resource, "height"),
    })
}

fn looks_like_image_service(service: &Value) -> bool {
    if string_id(service).is_none() {
        return false;
    }
    type_name(service).is_some_and(|t| t.contains("ImageService"))
        || service.get("profile").is_some()
        || service.get("@context").is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn v3_service_without_image_marker_is_ignored() {
        let canvas = json!({
            "id": "https://example.org/canvas/1",
            "items": [{ "items": [{ "body": {
                "id": "https://example.org/full.jpg",
                "service": [
                    { "id": "https://example.org/auth", "type": "AuthProbeService2" },
                    { "id": "https://example.org/iiif/img1", "type": "ImageService3" }
                ]
            }}]}]
        });
        let canvas = Canvas::from_value(PresentationVersion::V3, &canvas);
        assert_eq!(canvas.service_id(), Some("https://example.org/iiif/img1"));
        assert_eq!(canvas.body_id(), Some("https://example.org/full.jpg"));
    }

    #[test]
    fn v3_choice_body_uses_first_option() {
        let canvas = json!({
            "items": [{ "items": [{ "body": {
                "type": "Choice",
                "items": [
                    { "id": "https://example.org/a.jpg", "services": [
                        { "@id": "https://example.org/iiif/a", "@type": "ImageService2",
                          "profile": "level1" }
                    ]},
                    { "id": "https://example.org/b.jpg" }
                ]
            }}]}]
        });
        let canvas = Canvas::from_value(PresentationVersion::V3, &canvas);
        assert_eq!(canvas.service_id(), Some("https://example.org/iiif/a"));
    }

    #[test]
    fn v2_service_falls_back_to_any_service_with_id() {
        let canvas = json!({
            "@id": "https://example.org/canvas/c1",
            "width": 1000,
            "height": 1500,
            "images": [{ "resource": {
                "@id": "https://example.org/c1.jpg",
                "service": { "@id": "https://example.org/iiif/c1" }
            }}]
        });
        let canvas = Canvas::from_value(PresentationVersion::V2, &canvas);
        assert_eq!(canvas.service_id(), Some("https://example.org/iiif/c1"));
        assert_eq!(
            canvas.declared_dimensions(),
            ImageDimensions::new(Some(1000), Some(1500))
        );
    }

    #[test]
    fn body_dimensions_take_precedence_over_canvas() {
        let canvas = json!({
            "width": 10, "height": 20,
            "items": [{ "items": [{ "body": {
                "id": "https://example.org/x.jpg", "width": 3000, "height": 2000
            }}]}]
        });
        let canvas = Canvas::from_value(PresentationVersion::V3, &canvas);
        assert_eq!(
            canvas.declared_dimensions(),
            ImageDimensions::new(Some(3000), Some(2000))
        );
    }

    #[test]
    fn cross_references_merge_part_of_and_within() {
        let value = json!({
            "partOf": [{ "id": "https://example.org/iiif/3/7/manifest", "type": "Manifest" }],
            "within": "https://example.org/collection",
            "homepage": [{ "id": "https://example.org/s/site/item/7" }],
            "related": { "@id": "https://example.org/related" }
        });
        let refs = CrossReferences::from_value(&value);
        assert_eq!(refs.part_of.len(), 2);
        assert_eq!(refs.homepage, vec!["https://example.org/s/site/item/7".to_string()]);
        assert_eq!(refs.related, vec!["https://example.org/related".to_string()]);
        assert!(refs.see_also.is_empty());
    }
}
