//! Best-effort "related resource" link for a selected canvas.
//!
//! Each heuristic is a [`RelatedStrategy`]; [`RelatedLinkResolver`] runs them
//! in order and keeps the first hit. Internal resources found along the way
//! are returned as [`RelatedLink::Media`] / [`RelatedLink::Item`] tokens so the
//! host can route them; everything else is an external URL.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use carousel_logging::carousel_debug;

use crate::canvas::{Canvas, CrossReferences};
use crate::manifest::Manifest;

static MEDIA_ROUTE: Lazy<Regex> = Lazy::new(|| compile(r"/media/(\d+)(?:/|$)"));
static IIIF_MEDIA_ROUTE: Lazy<Regex> =
    Lazy::new(|| compile(r"/iiif[^/]*/(?:2|3)/(\d+)(?:/|$)"));
static IIIF_MANIFEST_ROUTE: Lazy<Regex> =
    Lazy::new(|| compile(r"/iiif[^/]*/(?:2|3)/([^/]+)/manifest(?:\.json)?/?$"));
static ITEM_MANIFEST_ROUTE: Lazy<Regex> =
    Lazy::new(|| compile(r"/item/(\d+)/manifest(?:\.json)?/?$"));
static IIIF_CANVAS_ROUTE: Lazy<Regex> =
    Lazy::new(|| compile(r"/iiif[^/]*/(?:2|3)/([^/]+)/canvas(?:/|$)"));

/// Final path segments that denote a listing or a show route without an id.
const LISTING_SEGMENTS: &[&str] = &[
    "show", "item", "items", "media", "item-set", "item_set", "browse", "search",
];

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("route pattern is valid")
}

/// Maps an external identifier (a IIIF path segment) to an internal item id.
pub trait IdentifierResolver: Send + Sync {
    fn resolve(&self, identifier: &str) -> Option<u64>;
}

impl<F> IdentifierResolver for F
where
    F: Fn(&str) -> Option<u64> + Send + Sync,
{
    fn resolve(&self, identifier: &str) -> Option<u64> {
        self(identifier)
    }
}

/// Resolver for hosts without identifier lookups; only numeric segments resolve.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIdentifiers;

impl IdentifierResolver for NoIdentifiers {
    fn resolve(&self, _identifier: &str) -> Option<u64> {
        None
    }
}

/// Fixed identifier table, typically loaded from configuration.
#[derive(Debug, Default, Clone)]
pub struct MappedIdentifiers {
    map: HashMap<String, u64>,
}

impl MappedIdentifiers {
    pub fn new(map: HashMap<String, u64>) -> Self {
        Self { map }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl IdentifierResolver for MappedIdentifiers {
    fn resolve(&self, identifier: &str) -> Option<u64> {
        self.map.get(identifier).copied()
    }
}

/// Per-call collaborators for strategies.
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    pub identifiers: &'a dyn IdentifierResolver,
}

impl<'a> ResolveContext<'a> {
    pub fn new(identifiers: &'a dyn IdentifierResolver) -> Self {
        Self { identifiers }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelatedLink {
    Media(u64),
    Item(u64),
    External(String),
}

impl fmt::Display for RelatedLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelatedLink::Media(id) => write!(f, "media:{id}"),
            RelatedLink::Item(id) => write!(f, "item:{id}"),
            RelatedLink::External(url) => f.write_str(url),
        }
    }
}

/// One heuristic in the related-link chain.
pub trait RelatedStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn try_resolve(
        &self,
        manifest: &Manifest,
        canvas: &Canvas,
        ctx: &ResolveContext<'_>,
    ) -> Option<RelatedLink>;
}

/// Whether a strategy reads the selected canvas or the enclosing manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkScope {
    Canvas,
    Manifest,
}

impl LinkScope {
    fn links<'a>(&self, manifest: &'a Manifest, canvas: &'a Canvas) -> &'a CrossReferences {
        match self {
            LinkScope::Canvas => &canvas.links,
            LinkScope::Manifest => &manifest.links,
        }
    }
}

/// Internal media id embedded in the image service or body URL.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedMediaStrategy;

impl RelatedStrategy for EmbeddedMediaStrategy {
    fn name(&self) -> &'static str {
        "embedded-media"
    }

    fn try_resolve(
        &self,
        _manifest: &Manifest,
        canvas: &Canvas,
        _ctx: &ResolveContext<'_>,
    ) -> Option<RelatedLink> {
        [canvas.service_id(), canvas.body_id()]
            .into_iter()
            .flatten()
            .find_map(|candidate| {
                let path = route_path(candidate);
                let caps = MEDIA_ROUTE
                    .captures(&path)
                    .or_else(|| IIIF_MEDIA_ROUTE.captures(&path))?;
                caps[1].parse::<u64>().ok()
            })
            .map(RelatedLink::Media)
    }
}

/// Internal item behind a manifest URL: the canvas `partOf`, or the
/// manifest's own id and `partOf`.
#[derive(Debug, Clone, Copy)]
pub struct ManifestRouteStrategy {
    pub scope: LinkScope,
}

impl RelatedStrategy for ManifestRouteStrategy {
    fn name(&self) -> &'static str {
        match self.scope {
            LinkScope::Canvas => "canvas-part-of",
            LinkScope::Manifest => "manifest-route",
        }
    }

    fn try_resolve(
        &self,
        manifest: &Manifest,
        canvas: &Canvas,
        ctx: &ResolveContext<'_>,
    ) -> Option<RelatedLink> {
        let own_id = match self.scope {
            LinkScope::Canvas => None,
            LinkScope::Manifest => manifest.id.as_deref(),
        };
        own_id
            .into_iter()
            .chain(self.scope.links(manifest, canvas).part_of.iter().map(String::as_str))
            .find_map(|candidate| {
                let path = route_path(candidate);
                if let Some(caps) = ITEM_MANIFEST_ROUTE.captures(&path) {
                    return caps[1].parse::<u64>().ok();
                }
                let caps = IIIF_MANIFEST_ROUTE.captures(&path)?;
                resolve_segment(&caps[1], ctx)
            })
            .map(RelatedLink::Item)
    }
}

/// `homepage`, then `seeAlso`.
#[derive(Debug, Clone, Copy)]
pub struct DirectLinkStrategy {
    pub scope: LinkScope,
}

impl RelatedStrategy for DirectLinkStrategy {
    fn name(&self) -> &'static str {
        match self.scope {
            LinkScope::Canvas => "canvas-homepage",
            LinkScope::Manifest => "manifest-homepage",
        }
    }

    fn try_resolve(
        &self,
        manifest: &Manifest,
        canvas: &Canvas,
        _ctx: &ResolveContext<'_>,
    ) -> Option<RelatedLink> {
        let links = self.scope.links(manifest, canvas);
        first_concrete(links.homepage.iter().chain(links.see_also.iter()))
    }
}

/// Internal item behind the canvas id when it follows the IIIF server's
/// canvas route.
#[derive(Debug, Default, Clone, Copy)]
pub struct CanvasRouteStrategy;

impl RelatedStrategy for CanvasRouteStrategy {
    fn name(&self) -> &'static str {
        "canvas-route"
    }

    fn try_resolve(
        &self,
        _manifest: &Manifest,
        canvas: &Canvas,
        ctx: &ResolveContext<'_>,
    ) -> Option<RelatedLink> {
        let path = route_path(canvas.id.as_deref()?);
        let caps = IIIF_CANVAS_ROUTE.captures(&path)?;
        resolve_segment(&caps[1], ctx).map(RelatedLink::Item)
    }
}

/// v2 `related`.
#[derive(Debug, Clone, Copy)]
pub struct RelatedFieldStrategy {
    pub scope: LinkScope,
}

impl RelatedStrategy for RelatedFieldStrategy {
    fn name(&self) -> &'static str {
        match self.scope {
            LinkScope::Canvas => "canvas-related",
            LinkScope::Manifest => "manifest-related",
        }
    }

    fn try_resolve(
        &self,
        manifest: &Manifest,
        canvas: &Canvas,
        _ctx: &ResolveContext<'_>,
    ) -> Option<RelatedLink> {
        first_concrete(self.scope.links(manifest, canvas).related.iter())
    }
}

/// Ordered chain of related-link strategies.
pub struct RelatedLinkResolver {
    strategies: Vec<Box<dyn RelatedStrategy>>,
}

impl RelatedLinkResolver {
    pub fn new(strategies: Vec<Box<dyn RelatedStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn resolve(
        &self,
        manifest: &Manifest,
        canvas: &Canvas,
        ctx: &ResolveContext<'_>,
    ) -> Option<RelatedLink> {
        self.strategies.iter().find_map(|strategy| {
            let link = strategy.try_resolve(manifest, canvas, ctx)?;
            carousel_debug!("Related link via {}: {}", strategy.name(), link);
            Some(link)
        })
    }
}

impl Default for RelatedLinkResolver {
    fn default() -> Self {
        Self::new(vec![
            Box::new(EmbeddedMediaStrategy),
            Box::new(ManifestRouteStrategy { scope: LinkScope::Canvas }),
            Box::new(DirectLinkStrategy { scope: LinkScope::Canvas }),
            Box::new(CanvasRouteStrategy),
            Box::new(RelatedFieldStrategy { scope: LinkScope::Canvas }),
            Box::new(ManifestRouteStrategy { scope: LinkScope::Manifest }),
            Box::new(DirectLinkStrategy { scope: LinkScope::Manifest }),
            Box::new(RelatedFieldStrategy { scope: LinkScope::Manifest }),
        ])
    }
}

/// Whether `url` is an absolute http(s) link to a specific resource rather
/// than a listing page or an id-less show route.
pub fn is_concrete_link(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|segs| segs.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();
    let Some(last) = segments.last() else {
        return false;
    };
    let last = last.to_ascii_lowercase();
    if last == "show" {
        // `/item/12/show` still names a resource.
        return segments.len() >= 2
            && segments[segments.len() - 2].chars().any(|c| c.is_ascii_digit());
    }
    !LISTING_SEGMENTS.contains(&last.as_str())
}

fn first_concrete<'a>(mut candidates: impl Iterator<Item = &'a String>) -> Option<RelatedLink> {
    candidates
        .find(|url| is_concrete_link(url))
        .map(|url| RelatedLink::External(url.trim().to_string()))
}

/// Numeric segments are item ids; anything else goes through the identifier
/// resolver, raw first and then percent-decoded.
fn resolve_segment(segment: &str, ctx: &ResolveContext<'_>) -> Option<u64> {
    if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
        return segment.parse().ok();
    }
    if let Some(id) = ctx.identifiers.resolve(segment) {
        return Some(id);
    }
    let decoded = urlencoding::decode(segment).ok()?;
    if decoded == segment {
        return None;
    }
    ctx.identifiers.resolve(&decoded)
}

/// Path component of a URL for route matching; query and fragment dropped.
fn route_path(candidate: &str) -> String {
    match Url::parse(candidate.trim()) {
        Ok(url) => url.path().to_string(),
        Err(_) => candidate
            .split(['?', '#'])
            .next()
            .unwrap_or(candidate)
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_pages_are_not_concrete() {
        assert!(!is_concrete_link("https://example.org/"));
        assert!(!is_concrete_link("https://example.org/s/site/item"));
        assert!(!is_concrete_link("https://example.org/s/site/item/"));
        assert!(!is_concrete_link("https://example.org/s/site/item/show"));
        assert!(!is_concrete_link("https://example.org/admin/media"));
        assert!(!is_concrete_link("ftp://example.org/s/site/item/1"));
        assert!(!is_concrete_link("not a url"));
    }

    #[test]
    fn resource_pages_are_concrete() {
        assert!(is_concrete_link("https://example.org/s/site/item/12"));
        assert!(is_concrete_link("https://example.org/admin/item/12/show"));
        assert!(is_concrete_link("http://example.org/record?id=5"));
    }

    #[test]
    fn route_path_drops_query() {
        assert_eq!(route_path("https://x.org/iiif/3/5/manifest?x=1"), "/iiif/3/5/manifest");
        assert_eq!(route_path("/media/3?size=large"), "/media/3");
    }

    #[test]
    fn encoded_segments_are_retried_decoded() {
        let lookup = |id: &str| (id == "ark:/123").then_some(9u64);
        let ctx = ResolveContext::new(&lookup);
        assert_eq!(resolve_segment("ark%3A%2F123", &ctx), Some(9));
        assert_eq!(resolve_segment("42", &ctx), Some(42));
        assert_eq!(resolve_segment("unknown", &ctx), None);
    }
}
