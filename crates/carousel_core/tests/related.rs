use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use carousel_core::{
    normalize, CanvasRouteStrategy, IdentifierResolver, Manifest, MappedIdentifiers,
    NoIdentifiers, RelatedLink, RelatedLinkResolver, RelatedStrategy, ResolveContext,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

/// Counts lookups so tests can tell whether the resolver was consulted.
struct CountingResolver {
    calls: AtomicUsize,
    map: MappedIdentifiers,
}

impl CountingResolver {
    fn new(pairs: &[(&str, u64)]) -> Self {
        let map: HashMap<String, u64> = pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        Self {
            calls: AtomicUsize::new(0),
            map: MappedIdentifiers::new(map),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl IdentifierResolver for CountingResolver {
    fn resolve(&self, identifier: &str) -> Option<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.map.resolve(identifier)
    }
}

fn v3_manifest(manifest_extra: Value, canvas: Value) -> Manifest {
    let mut raw = json!({ "id": "https://other.example.net/manifest.json", "items": [canvas] });
    if let (Some(target), Value::Object(extra)) = (raw.as_object_mut(), manifest_extra) {
        target.extend(extra);
    }
    normalize(&raw).unwrap()
}

fn resolve(manifest: &Manifest, ids: &dyn IdentifierResolver) -> Option<RelatedLink> {
    RelatedLinkResolver::default().resolve(manifest, &manifest.canvases[0], &ResolveContext::new(ids))
}

#[test]
fn media_id_from_image_service() {
    let manifest = v3_manifest(
        json!({}),
        json!({ "items": [{ "items": [{ "body": {
            "id": "https://cdn.example.net/a.jpg",
            "service": [{ "id": "https://omeka.example.org/iiif-img/3/118", "type": "ImageService3" }]
        }}]}]}),
    );
    assert_eq!(resolve(&manifest, &NoIdentifiers), Some(RelatedLink::Media(118)));
}

#[test]
fn media_id_from_body_route() {
    let manifest = v3_manifest(
        json!({}),
        json!({ "items": [{ "items": [{ "body": {
            "id": "https://omeka.example.org/files/original/media/55/"
        }}]}]}),
    );
    assert_eq!(resolve(&manifest, &NoIdentifiers), Some(RelatedLink::Media(55)));
}

#[test]
fn numeric_part_of_resolves_item_without_lookup() {
    let ids = CountingResolver::new(&[]);
    let manifest = v3_manifest(
        json!({}),
        json!({
            "id": "https://example.org/canvas/p1",
            "partOf": [{ "id": "https://example.org/iiif/3/42/manifest", "type": "Manifest" }],
            "homepage": [{ "id": "https://example.org/s/site/item/99" }]
        }),
    );
    assert_eq!(resolve(&manifest, &ids), Some(RelatedLink::Item(42)));
    assert_eq!(ids.calls(), 0);
    assert_eq!(RelatedLink::Item(42).to_string(), "item:42");
}

#[test]
fn textual_part_of_goes_through_identifier_resolver() {
    let ids = CountingResolver::new(&[("ark:/99/xyz", 7)]);
    let manifest = v3_manifest(
        json!({}),
        json!({ "partOf": [{ "id": "https://example.org/iiif/2/ark%3A%2F99%2Fxyz/manifest" }] }),
    );
    assert_eq!(resolve(&manifest, &ids), Some(RelatedLink::Item(7)));
    assert_eq!(ids.calls(), 2);
}

#[test]
fn homepage_skips_listing_pages() {
    let manifest = v3_manifest(
        json!({}),
        json!({
            "homepage": [
                { "id": "https://example.org/s/site/item" },
                { "id": "https://example.org/s/site/item/show" }
            ],
            "seeAlso": [{ "id": "https://catalog.example.org/record/12" }]
        }),
    );
    assert_eq!(
        resolve(&manifest, &NoIdentifiers),
        Some(RelatedLink::External("https://catalog.example.org/record/12".to_string()))
    );
}

#[test]
fn canvas_route_yields_item_reference() {
    let ids = CountingResolver::new(&[("book-1", 31)]);
    let manifest = v3_manifest(
        json!({}),
        json!({ "id": "https://example.org/iiif/3/book-1/canvas/p4" }),
    );
    assert_eq!(resolve(&manifest, &ids), Some(RelatedLink::Item(31)));

    let canvas = &manifest.canvases[0];
    assert_eq!(
        CanvasRouteStrategy.try_resolve(&manifest, canvas, &ResolveContext::new(&NoIdentifiers)),
        None
    );
}

#[test]
fn v2_canvas_related_link() {
    let manifest = normalize(&json!({
        "sequences": [{ "canvases": [{
            "@id": "https://example.org/canvas/1",
            "related": "https://museum.example.org/objects/12"
        }]}]
    }))
    .unwrap();
    assert_eq!(
        resolve(&manifest, &NoIdentifiers),
        Some(RelatedLink::External("https://museum.example.org/objects/12".to_string()))
    );
}

#[test]
fn manifest_level_fallbacks_in_order() {
    let manifest = v3_manifest(
        json!({ "id": "https://example.org/item/15/manifest" }),
        json!({ "id": "https://example.org/canvas/1" }),
    );
    assert_eq!(resolve(&manifest, &NoIdentifiers), Some(RelatedLink::Item(15)));

    let manifest = v3_manifest(
        json!({
            "homepage": [{ "id": "https://example.org/s/site/item/15" }],
            "related": "https://example.org/elsewhere/15"
        }),
        json!({}),
    );
    assert_eq!(
        resolve(&manifest, &NoIdentifiers),
        Some(RelatedLink::External("https://example.org/s/site/item/15".to_string()))
    );

    let manifest = v3_manifest(json!({ "related": "https://example.org/elsewhere/15" }), json!({}));
    assert_eq!(
        resolve(&manifest, &NoIdentifiers),
        Some(RelatedLink::External("https://example.org/elsewhere/15".to_string()))
    );
}

#[test]
fn nothing_resolvable_yields_none() {
    let manifest = v3_manifest(
        json!({ "homepage": [{ "id": "https://example.org/" }] }),
        json!({ "id": "https://example.org/canvas/1" }),
    );
    assert_eq!(resolve(&manifest, &NoIdentifiers), None);
}

#[test]
fn default_chain_order() {
    assert_eq!(
        RelatedLinkResolver::default().strategy_names(),
        vec![
            "embedded-media",
            "canvas-part-of",
            "canvas-homepage",
            "canvas-route",
            "canvas-related",
            "manifest-route",
            "manifest-homepage",
            "manifest-related",
        ]
    );
}
