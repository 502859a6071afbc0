//! Carousel core: pure manifest normalization, canvas selection, image URL
//! negotiation and related-link resolution. No IO happens here.
mod canvas;
mod image;
mod json;
mod label;
mod manifest;
mod record;
mod related;
mod rules;
mod run;
mod schedule;

pub use canvas::{Canvas, CrossReferences, ImageBody, PresentationVersion};
pub use image::{
    image_api_url, info_url, parse_info_dimensions, ImageDimensions, ImageSource, SizeRequest,
};
pub use label::{extract_label, DEFAULT_LABEL_LANGUAGES};
pub use manifest::{normalize, parse_manifest, Manifest, ManifestError};
pub use record::{HarvestedImage, RecordError, MAX_COLUMN_CHARS};
pub use related::{
    is_concrete_link, CanvasRouteStrategy, DirectLinkStrategy, EmbeddedMediaStrategy,
    IdentifierResolver, LinkScope, ManifestRouteStrategy, MappedIdentifiers, NoIdentifiers,
    RelatedFieldStrategy, RelatedLink, RelatedLinkResolver, RelatedStrategy, ResolveContext,
};
pub use rules::{Action, Condition, RuleParseError, RuleSet, SelectionRule, DEFAULT_RULES};
pub use run::{
    parse_manifest_list, HarvestPlan, HarvestRun, HarvestSummary, SkipReason, SkippedManifest,
    Stage, DEFAULT_TARGET_COUNT, DEFAULT_TARGET_SIZE,
};
pub use schedule::{RebuildSchedule, DEFAULT_REBUILD_INTERVAL_MINUTES};
