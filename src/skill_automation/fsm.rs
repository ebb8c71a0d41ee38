// Detection loop state machine
use super::match_image::{
    CycleOutcome, DEFAULT_HOTKEY, DisplayBounds, IconDetector, MatchConfig, MonitorRegion, Template,
    TemplateMeta, TemplateStats, TemplateStore,
};
use super::types::{AutomationCommand, AutomationEvent, DetectionState};
use crate::device::{KeyInput, KeySpec, ScreenCapture};
use crate::error::{SkillError, SkillResult};
use crate::profile::AppSettings;
use image::RgbImage;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::time::{Duration, Instant, sleep};

/// Poll interval while idle
const IDLE_POLL: Duration = Duration::from_millis(100);

/// State shared between the front end and the detection loop.
///
/// The loop only holds the lock long enough to snapshot it at the top of a
/// cycle, and briefly again to record results.
#[derive(Debug, Default)]
pub struct SharedState {
    pub store: TemplateStore,
    pub region: Option<MonitorRegion>,
    pub settings: AppSettings,
    pub stats: HashMap<String, TemplateStats>,
}

impl SharedState {
    pub fn new(store: TemplateStore, region: Option<MonitorRegion>, settings: AppSettings) -> Self {
        Self {
            store,
            region,
            settings,
            stats: HashMap::new(),
        }
    }

    /// Set the monitor region, clamped to the display when its bounds are known
    pub fn set_region(&mut self, region: MonitorRegion, bounds: Option<DisplayBounds>) -> SkillResult<MonitorRegion> {
        let region = match bounds {
            Some(bounds) => region.clamp_to(bounds)?,
            None => region,
        };
        log::info!("📐 Monitor region set to {:?}", region.as_array());
        self.region = Some(region);
        Ok(region)
    }

    /// Remove a binding together with its statistics
    pub fn remove_template(&mut self, id: &str) -> bool {
        self.stats.remove(id);
        self.store.remove(id)
    }

    pub fn stats_for(&self, id: &str) -> Option<&TemplateStats> {
        self.stats.get(id)
    }
}

/// Read-only view of the shared state taken at the top of a cycle
struct CycleSnapshot {
    templates: Arc<[Template]>,
    region: Option<MonitorRegion>,
    settings: AppSettings,
}

pub struct SkillAutomation {
    state: DetectionState,
    shared: Arc<Mutex<SharedState>>,
    capture: Arc<dyn ScreenCapture>,
    input: Arc<dyn KeyInput>,
    detector: Arc<IconDetector>,
    command_rx: mpsc::Receiver<AutomationCommand>,
    event_tx: mpsc::Sender<AutomationEvent>,
    should_exit: bool,
    scan_interval: Duration,
    consecutive_failures: u32,
    last_triggered: HashMap<String, Instant>,
}

impl SkillAutomation {
    pub fn new(
        command_rx: mpsc::Receiver<AutomationCommand>,
        event_tx: mpsc::Sender<AutomationEvent>,
        capture: Arc<dyn ScreenCapture>,
        input: Arc<dyn KeyInput>,
        config: MatchConfig,
    ) -> Self {
        let shared = SharedState::new(TemplateStore::new(config.hash_size), None, AppSettings::default());
        Self {
            state: DetectionState::Idle,
            scan_interval: shared.settings.scan_interval(),
            shared: Arc::new(Mutex::new(shared)),
            capture,
            input,
            detector: Arc::new(IconDetector::new(config)),
            command_rx,
            event_tx,
            should_exit: false,
            consecutive_failures: 0,
            last_triggered: HashMap::new(),
        }
    }

    /// Replace the initial shared state (e.g. with a loaded profile)
    pub fn with_state(mut self, state: SharedState) -> Self {
        self.scan_interval = state.settings.scan_interval();
        self.shared = Arc::new(Mutex::new(state));
        self
    }

    pub fn with_detector(mut self, detector: IconDetector) -> Self {
        self.detector = Arc::new(detector);
        self
    }

    /// Handle for the front end to mutate templates, region and settings
    pub fn shared(&self) -> Arc<Mutex<SharedState>> {
        Arc::clone(&self.shared)
    }

    pub fn state(&self) -> DetectionState {
        self.state
    }

    async fn emit(&self, event: AutomationEvent) {
        log::debug!("📣 {}", event);
        let _ = self.event_tx.send(event).await;
    }

    async fn change_state(&mut self, new_state: DetectionState) {
        if self.state != new_state {
            log::info!("🎮 Detection state: {:?} -> {:?}", self.state, new_state);
            self.state = new_state;
            self.emit(AutomationEvent::StateChanged(new_state)).await;
        }
    }

    async fn halt(&mut self, reason: String) {
        log::error!("🛑 Detection halted: {}", reason);
        self.consecutive_failures = 0;
        self.emit(AutomationEvent::Halted { reason }).await;
        self.change_state(DetectionState::Idle).await;
    }

    async fn process_command(&mut self, command: AutomationCommand) {
        log::debug!("🤖 Processing automation command: {:?}", command);
        match command {
            AutomationCommand::Start => {
                if self.state == DetectionState::Scanning {
                    log::debug!("🤖 Detection already running, ignoring start command");
                    return;
                }
                let (has_region, template_count) = {
                    let shared = self.shared.lock().await;
                    (shared.region.is_some(), shared.store.len())
                };
                if !has_region {
                    self.emit(AutomationEvent::Halted {
                        reason: "no monitor region set".to_string(),
                    })
                    .await;
                    return;
                }
                if template_count == 0 {
                    log::info!("ℹ️ No templates bound; every cycle looks for new icons");
                }
                self.consecutive_failures = 0;
                self.change_state(DetectionState::Scanning).await;
                log::info!("🚀 Detection started ({} templates)", template_count);
            }
            AutomationCommand::Stop => {
                self.change_state(DetectionState::Idle).await;
                log::info!("⏹️ Detection stopped");
            }
            AutomationCommand::UpdateSettings(settings) => match settings.validate() {
                Ok(()) => {
                    self.scan_interval = settings.scan_interval();
                    self.shared.lock().await.settings = settings;
                    log::info!("🔧 Settings updated");
                }
                Err(e) => log::warn!("⚠️ Rejected settings update: {}", e),
            },
            AutomationCommand::SetAutoAdd(enabled) => {
                self.shared.lock().await.settings.auto_add_skills = enabled;
                log::info!("🔧 Auto-add new skills: {}", enabled);
            }
            AutomationCommand::Shutdown => {
                self.should_exit = true;
                self.change_state(DetectionState::Idle).await;
                log::info!("🛑 Detection loop shutting down");
            }
        }
    }

    pub async fn run(&mut self) {
        log::info!("🎮 Detection loop started");

        loop {
            // Drain pending commands (non-blocking)
            loop {
                match self.command_rx.try_recv() {
                    Ok(command) => self.process_command(command).await,
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    Err(mpsc::error::TryRecvError::Disconnected) => {
                        log::info!("🔌 Command channel closed");
                        self.should_exit = true;
                        break;
                    }
                }
            }
            if self.should_exit {
                break;
            }

            match self.state {
                DetectionState::Idle => sleep(IDLE_POLL).await,
                DetectionState::Scanning => {
                    self.run_cycle().await;
                    if self.state == DetectionState::Scanning {
                        sleep(self.scan_interval).await;
                    }
                }
            }
        }

        log::info!("🎮 Detection loop ended");
    }

    async fn snapshot(&self) -> CycleSnapshot {
        let shared = self.shared.lock().await;
        CycleSnapshot {
            templates: shared.store.get_all().into(),
            region: shared.region,
            settings: shared.settings.clone(),
        }
    }

    /// One capture + detect + act pass
    async fn run_cycle(&mut self) {
        let snapshot = self.snapshot().await;
        self.scan_interval = snapshot.settings.scan_interval();
        self.forget_unbound_cooldowns(&snapshot.templates);

        let Some(region) = snapshot.region else {
            self.halt("monitor region was cleared".to_string()).await;
            return;
        };

        let capture = Arc::clone(&self.capture);
        let detector = Arc::clone(&self.detector);
        let templates = Arc::clone(&snapshot.templates);
        let new_skill_threshold = snapshot.settings.new_skill_threshold;

        // Matching is the uninterruptible part of the cycle
        let outcome = tokio::task::spawn_blocking(move || {
            let image = capture.capture(&region)?;
            let result = detector.evaluate(&image, &templates, new_skill_threshold)?;
            Ok::<_, SkillError>((image, result))
        })
        .await
        .map_err(SkillError::from)
        .and_then(|inner| inner);

        let (image, result) = match outcome {
            Ok(done) => done,
            Err(e @ (SkillError::InvalidInput { .. } | SkillError::ShapeMismatch { .. })) => {
                self.halt(e.to_string()).await;
                return;
            }
            Err(e) => {
                self.record_failure(e).await;
                return;
            }
        };
        self.consecutive_failures = 0;
        log::debug!("⏱️ Cycle evaluated in {} ms", result.processing_time_ms);

        match result.outcome {
            CycleOutcome::Matched {
                template_id,
                similarity,
                location,
            } => {
                self.emit(AutomationEvent::Matched {
                    template_id: template_id.clone(),
                    similarity,
                    location,
                })
                .await;
                if let Some(template) = snapshot.templates.iter().find(|t| t.id == template_id) {
                    self.trigger(template, similarity, &snapshot.settings).await;
                }
            }
            CycleOutcome::CandidateNewIcon { foreground_ratio } => {
                self.emit(AutomationEvent::CandidateNewIcon { foreground_ratio }).await;
                if snapshot.settings.auto_add_skills {
                    self.auto_add(image, &snapshot.settings).await;
                }
            }
            CycleOutcome::NoMatch { best_similarity } => {
                self.emit(AutomationEvent::NoMatch { best_similarity }).await;
            }
        }
    }

    /// A binding that was removed starts fresh if its id is bound again
    fn forget_unbound_cooldowns(&mut self, templates: &[Template]) {
        self.last_triggered
            .retain(|id, _| templates.iter().any(|t| &t.id == id));
    }

    async fn record_failure(&mut self, error: SkillError) {
        self.consecutive_failures += 1;
        let limit = self.detector.config().max_consecutive_failures.max(1);
        log::warn!(
            "⚠️ Detection cycle failed ({}/{}): {}",
            self.consecutive_failures,
            limit,
            error
        );
        self.emit(AutomationEvent::CycleFailed {
            error: error.to_string(),
            consecutive: self.consecutive_failures,
        })
        .await;
        if self.consecutive_failures >= limit {
            self.halt(format!("{} consecutive failed cycles, last: {}", limit, error))
                .await;
        }
    }

    /// Press the template's hotkey unless it is still cooling down
    async fn trigger(&mut self, template: &Template, similarity: f32, settings: &AppSettings) {
        if let Some(last) = self.last_triggered.get(&template.id)
            && last.elapsed() < template.cooldown
        {
            log::debug!("⏳ '{}' still cooling down", template.id);
            return;
        }

        let spec = match template.hotkey.parse::<KeySpec>() {
            Ok(spec) => spec,
            Err(e) => {
                self.emit(AutomationEvent::InputFailed {
                    template_id: template.id.clone(),
                    error: e.to_string(),
                })
                .await;
                return;
            }
        };

        let input = Arc::clone(&self.input);
        let hold = settings.key_press_delay();
        let press_spec = spec.clone();
        let pressed = tokio::task::spawn_blocking(move || input.press(&press_spec, hold))
            .await
            .map_err(SkillError::from)
            .and_then(|inner| inner);

        match pressed {
            Ok(()) => {
                self.last_triggered.insert(template.id.clone(), Instant::now());
                {
                    let mut shared = self.shared.lock().await;
                    let stats = shared.stats.entry(template.id.clone()).or_default();
                    stats.record(similarity);
                    log::info!("🎯 {} -> {} ({})", template.display_text, spec, stats.summary());
                }
                self.emit(AutomationEvent::Triggered {
                    template_id: template.id.clone(),
                    key: spec.to_string(),
                })
                .await;
            }
            Err(e) => {
                log::warn!("⚠️ Key press for '{}' failed: {}", template.id, e);
                self.emit(AutomationEvent::InputFailed {
                    template_id: template.id.clone(),
                    error: e.to_string(),
                })
                .await;
            }
        }
    }

    /// Bind the captured region as a new template
    async fn auto_add(&mut self, image: RgbImage, settings: &AppSettings) {
        let threshold = match settings.match_threshold() {
            Ok(threshold) => threshold,
            Err(e) => {
                log::warn!("⚠️ Cannot auto-add skill: {}", e);
                return;
            }
        };
        let added = {
            let mut shared = self.shared.lock().await;
            let id = shared.store.next_auto_id();
            let meta = TemplateMeta::default()
                .with_hotkey(DEFAULT_HOTKEY)
                .with_threshold(threshold);
            shared.store.add(&id, image, meta).map(|t| t.id.clone())
        };
        match added {
            Ok(template_id) => {
                log::info!("🆕 Auto-added new skill '{}'", template_id);
                self.emit(AutomationEvent::TemplateAdded { template_id }).await;
            }
            Err(e) => log::warn!("⚠️ Cannot auto-add skill: {}", e),
        }
    }
}
