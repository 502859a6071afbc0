use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use thiserror::Error;

use carousel_core::{
    parse_manifest, HarvestPlan, HarvestRun, HarvestedImage, IdentifierResolver, ManifestError,
    RelatedLinkResolver, ResolveContext, SkipReason, SkippedManifest, Stage,
};
use carousel_logging::{carousel_debug, carousel_info, carousel_warn};

use crate::decode::decode_json_text;
use crate::fetch::{Fetcher, ProgressSink};
use crate::info::{resolve_image_url, DimensionLookup};
use crate::sink::{ResultSink, SelectedImage, SinkError};
use crate::{EngineEvent, ManifestProgress};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("no manifest URLs configured")]
    NoManifests,
    #[error("a harvest run is already in progress")]
    AlreadyRunning,
    #[error("failed to store results: {0}")]
    Sink(#[from] SinkError),
}

/// What a completed run stored and what it skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestReport {
    pub records: Vec<SelectedImage>,
    pub skipped: Vec<SkippedManifest>,
}

/// Runs harvests: fetch each manifest, pick a canvas, resolve its image and
/// related link, then replace the sink's contents with the new selection.
pub struct Harvester {
    manifests: Arc<dyn Fetcher>,
    dimensions: Arc<dyn DimensionLookup>,
    related: RelatedLinkResolver,
    clock: Clock,
    run_lock: tokio::sync::Mutex<()>,
}

impl Harvester {
    pub fn new(manifests: Arc<dyn Fetcher>, dimensions: Arc<dyn DimensionLookup>) -> Self {
        Self {
            manifests,
            dimensions,
            related: RelatedLinkResolver::default(),
            clock: Arc::new(Utc::now),
            run_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_related_resolver(mut self, related: RelatedLinkResolver) -> Self {
        self.related = related;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// One full run. The sink is untouched unless the run gets as far as storing.
    pub async fn run<R>(
        &self,
        plan: &HarvestPlan,
        identifiers: &dyn IdentifierResolver,
        sink: &mut dyn ResultSink,
        progress: &dyn ProgressSink,
        rng: &mut R,
    ) -> Result<HarvestReport, HarvestError>
    where
        R: Rng + Send + ?Sized,
    {
        if plan.manifest_urls.is_empty() {
            carousel_warn!("Harvest skipped: no manifest URLs configured");
            return Err(HarvestError::NoManifests);
        }
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| HarvestError::AlreadyRunning)?;

        carousel_info!(
            "Harvest started: {} manifests, target {}",
            plan.manifest_urls.len(),
            plan.target_count
        );
        let mut run = HarvestRun::start(&plan.manifest_urls, plan.target_count, rng);
        while let Some(manifest_url) = run.next_manifest() {
            report(progress, &manifest_url, Stage::Fetching);
            match self
                .process(&manifest_url, plan, identifiers, &mut run, progress, rng)
                .await
            {
                Ok(image) => run.record(image),
                Err(reason) => run.skip(reason),
            }
        }

        let summary = run.finish();
        let records: Vec<SelectedImage> = summary
            .images
            .into_iter()
            .enumerate()
            .map(|(position, image)| SelectedImage::new(position as u32, image, (self.clock)()))
            .collect();
        sink.replace_all(&records)?;
        carousel_info!(
            "Harvest finished: {} stored, {} skipped",
            records.len(),
            summary.skipped.len()
        );

        Ok(HarvestReport {
            records,
            skipped: summary.skipped,
        })
    }

    async fn process<R>(
        &self,
        manifest_url: &str,
        plan: &HarvestPlan,
        identifiers: &dyn IdentifierResolver,
        run: &mut HarvestRun,
        progress: &dyn ProgressSink,
        rng: &mut R,
    ) -> Result<HarvestedImage, SkipReason>
    where
        R: Rng + Send + ?Sized,
    {
        let output = self
            .manifests
            .fetch(manifest_url)
            .await
            .map_err(|err| SkipReason::Fetch(err.to_string()))?;

        step(run, progress, manifest_url, Stage::Normalizing);
        let decoded = decode_json_text(&output.bytes, output.metadata.content_type.as_deref())
            .map_err(|err| ManifestError::InvalidJson(err.to_string()))?;
        let manifest = parse_manifest(&decoded.text)?;

        step(run, progress, manifest_url, Stage::Selecting);
        let index = plan
            .rules
            .select(manifest.canvases.len(), rng)
            .ok_or(SkipReason::NoSelection)?;
        let canvas = manifest
            .canvases
            .get(index)
            .ok_or(SkipReason::NoSelection)?;
        carousel_debug!(
            "Selected canvas {} of {} from {manifest_url}",
            index + 1,
            manifest.canvases.len()
        );

        step(run, progress, manifest_url, Stage::ResolvingImage);
        let image_url = resolve_image_url(canvas, plan.target_size, self.dimensions.as_ref())
            .await
            .ok_or(SkipReason::NoImage)?;

        step(run, progress, manifest_url, Stage::ResolvingRelated);
        let related_url = self
            .related
            .resolve(&manifest, canvas, &ResolveContext::new(identifiers))
            .map(|link| link.to_string())
            .unwrap_or_else(|| manifest_url.to_string());

        step(run, progress, manifest_url, Stage::Recording);
        let label = manifest.label(&plan.label_languages);
        Ok(HarvestedImage::new(
            image_url,
            manifest_url.to_string(),
            Some(related_url),
            label,
        )?)
    }
}

fn step(run: &mut HarvestRun, progress: &dyn ProgressSink, manifest_url: &str, stage: Stage) {
    run.advance(stage);
    report(progress, manifest_url, stage);
}

fn report(progress: &dyn ProgressSink, manifest_url: &str, stage: Stage) {
    progress.emit(EngineEvent::Progress(ManifestProgress {
        manifest_url: manifest_url.to_string(),
        stage,
    }));
}
