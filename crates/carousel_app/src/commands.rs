use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::SystemTime;

use anyhow::{bail, Context};
use carousel_core::{RebuildSchedule, Stage};
use carousel_engine::{
    load_results, EngineEvent, EngineHandle, HarvestError, HarvestReport, Harvester,
    InfoDimensionLookup, JsonFileSink, ReqwestFetcher,
};
use carousel_logging::{carousel_debug, carousel_info, carousel_warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::settings::Settings;

fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

fn spawn_engine(settings: &Settings, output: &Path, seed: Option<u64>) -> EngineHandle {
    let manifests = Arc::new(ReqwestFetcher::new(settings.manifest_fetch()));
    let info = Arc::new(ReqwestFetcher::new(settings.info_fetch()));
    let harvester = Harvester::new(manifests, Arc::new(InfoDimensionLookup::new(info)));
    EngineHandle::new(
        harvester,
        Arc::new(settings.identifiers()),
        Box::new(JsonFileSink::new(output)),
        rng(seed),
    )
}

/// Waits for the pending rebuild. The outer error means the worker is gone.
fn wait_for_harvest(handle: &EngineHandle) -> anyhow::Result<Result<HarvestReport, HarvestError>> {
    loop {
        match handle.recv() {
            Some(EngineEvent::Progress(progress)) => {
                if progress.stage == Stage::Fetching {
                    carousel_debug!("Fetching {}", progress.manifest_url);
                }
            }
            Some(EngineEvent::HarvestCompleted(result)) => return Ok(result),
            None => bail!("harvest worker stopped unexpectedly"),
        }
    }
}

fn print_report(report: &HarvestReport, output: &Path) {
    println!(
        "Stored {} image(s) in {}",
        report.records.len(),
        output.display()
    );
    for skipped in &report.skipped {
        println!(
            "  skipped {} at {:?}: {}",
            skipped.manifest_url, skipped.stage, skipped.reason
        );
    }
}

pub fn run_once(settings: &Settings, output: &Path, seed: Option<u64>) -> anyhow::Result<()> {
    let handle = spawn_engine(settings, output, seed);
    handle.rebuild(settings.plan());
    let report = wait_for_harvest(&handle)?.context("harvest failed")?;
    print_report(&report, output);
    Ok(())
}

/// Last rebuild recovered from the stored results, so the interval holds
/// across restarts. Unreadable results count as never built.
fn last_rebuild(output: &Path) -> Option<SystemTime> {
    match JsonFileSink::new(output).last_replaced() {
        Ok(stamp) => stamp,
        Err(err) => {
            carousel_warn!("Cannot read previous results in {:?}: {err}", output);
            None
        }
    }
}

fn rebuild_due(schedule: &RebuildSchedule, output: &Path, now: SystemTime) -> bool {
    schedule.is_due(last_rebuild(output), now)
}

/// Rebuilds whenever the schedule says the stored set is stale.
pub fn watch(settings: &Settings, output: &Path, seed: Option<u64>) -> anyhow::Result<()> {
    let schedule = settings.schedule();
    let handle = spawn_engine(settings, output, seed);
    let mut last_run = last_rebuild(output);
    if !schedule.is_due(last_run, SystemTime::now()) {
        carousel_info!(
            "Stored results are fresh; next rebuild in {} s",
            schedule.remaining(last_run, SystemTime::now()).as_secs()
        );
    }
    carousel_info!(
        "Watching: rebuilding every {} s into {:?}",
        schedule.interval().as_secs(),
        output
    );

    loop {
        if schedule.is_due(last_run, SystemTime::now()) {
            handle.rebuild(settings.plan());
            match wait_for_harvest(&handle)? {
                Ok(report) => print_report(&report, output),
                Err(err) => carousel_warn!("Rebuild failed: {err}"),
            }
            last_run = Some(SystemTime::now());
        }
        thread::sleep(schedule.remaining(last_run, SystemTime::now()));
    }
}

pub fn show(output: &Path) -> anyhow::Result<()> {
    let records = load_results(output)
        .with_context(|| format!("failed to read results from {}", output.display()))?;
    if records.is_empty() {
        println!("No stored images in {}", output.display());
        return Ok(());
    }
    for record in records {
        println!("#{} {}", record.position, record.image_url);
        println!("    manifest: {}", record.manifest_url);
        if let Some(related) = &record.related_url {
            println!("    related:  {related}");
        }
        if let Some(label) = &record.label {
            println!("    label:    {label}");
        }
        println!("    created:  {}", record.created.to_rfc3339());
    }
    Ok(())
}

/// Tallies which canvases the configured rules pick for `count` canvases.
pub fn preview_rules(
    settings: &Settings,
    count: usize,
    samples: usize,
    seed: Option<u64>,
) -> BTreeMap<usize, usize> {
    let rules = settings.plan().rules;
    let mut rng = rng(seed);
    let mut tally = BTreeMap::new();
    for _ in 0..samples {
        if let Some(index) = rules.select(count, &mut rng) {
            *tally.entry(index + 1).or_insert(0) += 1;
        }
    }
    tally
}

pub fn print_rule_preview(settings: &Settings, count: usize, samples: usize, seed: Option<u64>) {
    let rules = settings.plan().rules;
    println!("{} rule(s) parsed", rules.rules().len());
    let tally = preview_rules(settings, count, samples, seed);
    if tally.is_empty() {
        println!("No canvas can be selected from {count} canvas(es)");
        return;
    }
    for (canvas, hits) in tally {
        println!("  canvas {canvas}: {hits}/{samples}");
    }
}
