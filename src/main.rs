mod args;

use args::{Args, Mode};
use skill_trigger::device::{DryRunKeyInput, FrameSequenceCapture, ScreenCapture};
use skill_trigger::error::{SkillError, SkillResult};
use skill_trigger::profile::{AppSettings, History, ProfileStore};
use skill_trigger::skill_automation::match_image::{MonitorRegion, create_default_config};
use skill_trigger::skill_automation::{
    AutomationCommand, AutomationEvent, SharedState, SkillAutomation, TemplateStore,
    create_automation_channels,
};
use skill_trigger::template_matching::{
    MatchTarget, MatchThreshold, PerceptualHasher, RegionMatcher, is_castable,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn main() {
    let Some(args) = Args::parse() else {
        return;
    };

    let default_level = if args.debug_mode { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let result = match &args.mode {
        Mode::Match { region, template } => run_match(&args, region, template),
        Mode::Profiles => list_profiles(&args),
        Mode::Replay { frames_dir } => match tokio::runtime::Runtime::new() {
            Ok(rt) => rt.block_on(run_replay(&args, frames_dir)),
            Err(e) => {
                eprintln!("❌ Failed to start async runtime: {}", e);
                std::process::exit(1);
            }
        },
    };

    if let Err(e) = result {
        log::error!("❌ {}", e);
        std::process::exit(1);
    }
}

fn open_rgb(path: &Path) -> SkillResult<image::RgbImage> {
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|source| SkillError::ImageCodec {
            path: path.to_path_buf(),
            source,
        })
}

fn open_profiles(args: &Args) -> SkillResult<ProfileStore> {
    let base = args
        .config_dir
        .clone()
        .or_else(ProfileStore::default_base_dir)
        .ok_or_else(|| SkillError::InvalidSettings {
            description: "no home directory found, pass --config-dir".to_string(),
        })?;
    ProfileStore::with_base_dir(base)
}

fn run_match(args: &Args, region_path: &Path, template_path: &Path) -> SkillResult<()> {
    let region = open_rgb(region_path)?;
    let template = open_rgb(template_path)?;
    let threshold = MatchThreshold::new(args.threshold.unwrap_or(0.9))?;
    let hash = PerceptualHasher::default().hash(&template)?;

    let matcher = RegionMatcher::new(args.strategy);
    let start = std::time::Instant::now();
    let result = matcher.find(
        &region,
        &MatchTarget {
            image: &template,
            hash: &hash,
            threshold,
        },
    )?;
    let elapsed = start.elapsed().as_millis();

    match result.location {
        Some((x, y)) if result.found => {
            println!(
                "✅ Found at ({}, {}) with confidence {:.3} in {} ms",
                x, y, result.confidence, elapsed
            );
        }
        location => {
            println!(
                "❌ Not found: best confidence {:.3} at {:?} (threshold {:.2}) in {} ms",
                result.confidence,
                location,
                threshold.value(),
                elapsed
            );
        }
    }
    if !is_castable(&template, skill_trigger::template_matching::DEFAULT_MIN_SATURATION) {
        println!("🩶 Template itself looks greyed out; hashed matches will never be castable");
    }
    Ok(())
}

fn list_profiles(args: &Args) -> SkillResult<()> {
    let profiles = open_profiles(args)?;
    let names = profiles.list_profiles()?;
    if names.is_empty() {
        println!("No profiles in {}", profiles.config_dir().display());
        return Ok(());
    }
    let last = profiles.load_history()?.and_then(|h| h.last_profile);
    for name in names {
        let marker = if last.as_deref() == Some(name.as_str()) { "*" } else { " " };
        println!("{} {}", marker, name);
    }
    Ok(())
}

async fn run_replay(args: &Args, frames_dir: &Path) -> SkillResult<()> {
    let capture = Arc::new(FrameSequenceCapture::from_dir(frames_dir, false)?);
    let mut config = create_default_config();
    config.strategy = args.strategy;

    let (mut store, region, mut settings) = match &args.profile {
        Some(name) => {
            let profiles = open_profiles(args)?;
            let loaded = profiles.load_profile(name, config.hash_size)?;
            profiles.save_history(&History {
                last_profile: Some(name.clone()),
                settings: Some(loaded.settings.clone()),
                monitor_region: loaded.region,
            })?;
            (loaded.store, loaded.region, loaded.settings)
        }
        None => (TemplateStore::new(config.hash_size), None, AppSettings::default()),
    };

    if let Some(t) = args.threshold {
        let threshold = MatchThreshold::new(t)?;
        settings.threshold = t;
        for id in store.ids() {
            store.set_threshold(&id, threshold);
        }
    }
    settings.validate()?;

    let bounds = capture.display_bounds();
    let region = match (region, bounds) {
        (Some(region), Some(bounds)) => region.clamp_to(bounds)?,
        (Some(region), None) => region,
        (None, Some(bounds)) => MonitorRegion::new(bounds.x, bounds.y, bounds.width, bounds.height)?,
        (None, None) => {
            return Err(SkillError::InvalidRegion {
                description: "no monitor region and frame size unknown".to_string(),
            });
        }
    };

    let input = Arc::new(DryRunKeyInput::new());
    let (mut link, cmd_rx, event_tx) = create_automation_channels();
    let mut automation = SkillAutomation::new(cmd_rx, event_tx, capture, input.clone(), config)
        .with_state(SharedState::new(store, Some(region), settings));
    let shared = automation.shared();
    let worker = tokio::spawn(async move { automation.run().await });

    link.send(AutomationCommand::Start).await;
    let limit = Duration::from_secs(args.timeout_secs.unwrap_or(3600));
    let halted = link
        .wait_for(
            limit,
            |event| matches!(event, AutomationEvent::Halted { .. }),
            |event| println!("{}", event),
        )
        .await;
    if halted.is_none() {
        log::info!("⏰ Replay time limit reached");
    }

    link.send(AutomationCommand::Shutdown).await;
    while link.events.recv().await.is_some() {}
    worker.await?;

    let shared = shared.lock().await;
    println!();
    println!("📊 {} bindings, {} key transitions", shared.store.len(), input.history().len());
    for template in shared.store.get_all() {
        let summary = shared
            .stats_for(&template.id)
            .map(|s| s.summary())
            .unwrap_or_else(|| "no triggers yet".to_string());
        println!("    {} [{}] {}", template.display_text, template.hotkey, summary);
    }
    Ok(())
}
