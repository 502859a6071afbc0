use std::collections::{HashSet, VecDeque};

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use carousel_logging::{carousel_info, carousel_warn};

use crate::label::DEFAULT_LABEL_LANGUAGES;
use crate::manifest::ManifestError;
use crate::record::{HarvestedImage, RecordError};
use crate::rules::RuleSet;

pub const DEFAULT_TARGET_COUNT: usize = 5;
pub const DEFAULT_TARGET_SIZE: u32 = 1600;

/// Where a run currently is in the per-manifest pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Idle,
    Fetching,
    Normalizing,
    Selecting,
    ResolvingImage,
    ResolvingRelated,
    Recording,
    Done,
}

/// Why a manifest contributed nothing to a run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SkipReason {
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("no canvas selected")]
    NoSelection,
    #[error("no image service or thumbnail on selected canvas")]
    NoImage,
    #[error(transparent)]
    Record(#[from] RecordError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedManifest {
    pub manifest_url: String,
    pub stage: Stage,
    pub reason: SkipReason,
}

/// Everything a harvest run needs besides its collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestPlan {
    pub manifest_urls: Vec<String>,
    pub rules: RuleSet,
    pub target_size: u32,
    pub target_count: usize,
    pub label_languages: Vec<String>,
}

impl Default for HarvestPlan {
    fn default() -> Self {
        Self {
            manifest_urls: Vec::new(),
            rules: RuleSet::default(),
            target_size: DEFAULT_TARGET_SIZE,
            target_count: DEFAULT_TARGET_COUNT,
            label_languages: DEFAULT_LABEL_LANGUAGES
                .iter()
                .map(|lang| lang.to_string())
                .collect(),
        }
    }
}

/// Manifest URLs from a one-per-line text block; blank lines and repeats dropped.
pub fn parse_manifest_list(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(line.to_string()))
        .map(ToOwned::to_owned)
        .collect()
}

/// Accumulating state of one harvest run. Pure: the caller performs the IO
/// and reports each manifest's outcome back.
#[derive(Debug, Clone)]
pub struct HarvestRun {
    queue: VecDeque<String>,
    current: Option<String>,
    stage: Stage,
    target_count: usize,
    collected: Vec<HarvestedImage>,
    skipped: Vec<SkippedManifest>,
}

/// Outcome of a finished run, in collection order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestSummary {
    pub images: Vec<HarvestedImage>,
    pub skipped: Vec<SkippedManifest>,
}

impl HarvestRun {
    /// Queues the manifests in random order.
    pub fn start<R: Rng + ?Sized>(manifest_urls: &[String], target_count: usize, rng: &mut R) -> Self {
        let mut order = manifest_urls.to_vec();
        order.shuffle(rng);
        Self {
            queue: order.into(),
            current: None,
            stage: Stage::Idle,
            target_count,
            collected: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn collected(&self) -> &[HarvestedImage] {
        &self.collected
    }

    pub fn is_complete(&self) -> bool {
        self.collected.len() >= self.target_count
    }

    /// Next manifest to fetch, or `None` once the target is reached or the
    /// queue is exhausted.
    pub fn next_manifest(&mut self) -> Option<String> {
        if self.is_complete() {
            self.queue.clear();
        }
        match self.queue.pop_front() {
            Some(url) => {
                self.current = Some(url.clone());
                self.stage = Stage::Fetching;
                Some(url)
            }
            None => {
                self.current = None;
                self.stage = Stage::Done;
                None
            }
        }
    }

    pub fn advance(&mut self, stage: Stage) {
        self.stage = stage;
    }

    /// Records the current manifest's selection.
    pub fn record(&mut self, image: HarvestedImage) {
        self.stage = Stage::Recording;
        self.current = None;
        if self.is_complete() {
            return;
        }
        self.collected.push(image);
    }

    /// Records that the current manifest is skipped at the current stage.
    pub fn skip(&mut self, reason: SkipReason) {
        let manifest_url = self.current.take().unwrap_or_default();
        match reason {
            SkipReason::Fetch(_) | SkipReason::Manifest(_) => {
                carousel_warn!("Skipping manifest {} at {:?}: {}", manifest_url, self.stage, reason)
            }
            _ => carousel_info!("Skipping manifest {} at {:?}: {}", manifest_url, self.stage, reason),
        }
        self.skipped.push(SkippedManifest {
            manifest_url,
            stage: self.stage,
            reason,
        });
    }

    pub fn finish(self) -> HarvestSummary {
        HarvestSummary {
            images: self.collected,
            skipped: self.skipped,
        }
    }
}
