//! Main application logic and lifecycle management.
//!
//! The `Application` owns the simulated host, the replication coordinator
//! and the demo population, and drives all of them from one tick loop.

use crate::config::AppConfig;
use crate::host::{SimulatedHost, ViewerEvent, GROUND_Y};
use crate::logging::display_banner;
use crate::signals::{wait_for_shutdown_signal, ShutdownState};
use crate::textures::{JsonFileTextures, NoTextures, TextureLoader, TextureResolver};
use crate::cli::CliArgs;
use phantom_replication::{
    EntityHandle, EntityKind, EntityStatus, EquipmentSlot, InteractionAction, InteractionError,
    ItemStack, Position, RawInteraction, ReplicatedEntity, ReplicationCoordinator,
    ReplicationError, TaskHandle, TickScheduler, Transform, ViewerId,
};
use std::f64::consts::TAU;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Kinds cycled through when populating the wandering mobs.
const MOB_KINDS: [(EntityKind, &str); 6] = [
    (EntityKind::Mob, "zombie"),
    (EntityKind::Creeper, "creeper"),
    (EntityKind::Animal, "cow"),
    (EntityKind::Bat, "bat"),
    (EntityKind::Gear, "skeleton"),
    (EntityKind::Tameable, "wolf"),
];

/// Radius of the circle the mobs wander on.
const MOB_CIRCLE: f64 = 12.0;

/// Ticks between visual state changes of the mobs.
const PULSE_TICKS: u64 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppTask {
    StatusReport,
    Shutdown,
}

#[derive(Debug, Clone, Copy)]
struct Wanderer {
    handle: EntityHandle,
    phase: f64,
}

/// The demo host application.
pub struct Application {
    config: AppConfig,
    host: Arc<SimulatedHost>,
    coordinator: ReplicationCoordinator,
    scheduler: TickScheduler<AppTask>,
    textures: TextureLoader,
    mobs: Vec<Wanderer>,
    npcs: Vec<EntityHandle>,
    greetings: Arc<AtomicU64>,
    countdown: Option<TaskHandle>,
    shutdown_requested: bool,
    tick: u64,
}

impl Application {
    /// Loads configuration, applies CLI overrides, validates and builds the demo.
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;
        config.apply_cli(&args);

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();
        Self::from_config(config)
    }

    /// Builds the host, the coordinator and the demo population.
    ///
    /// Must be called within a tokio runtime: texture lookups for the fake
    /// players start right away.
    pub fn from_config(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let host = Arc::new(SimulatedHost::new(&config.demo));
        let coordinator = ReplicationCoordinator::new(host.context(), config.replication.clone())?;

        let resolver: Arc<dyn TextureResolver> = match &config.demo.texture_file {
            Some(path) => Arc::new(JsonFileTextures::new(path)),
            None => Arc::new(NoTextures),
        };

        let mut scheduler = TickScheduler::new();
        let status_interval = config.server.status_interval_ticks;
        scheduler.schedule_repeating(status_interval, status_interval, AppTask::StatusReport);
        let countdown = (config.server.run_ticks > 0)
            .then(|| scheduler.schedule_once(config.server.run_ticks, AppTask::Shutdown));

        let mut app = Self {
            config,
            host,
            coordinator,
            scheduler,
            textures: TextureLoader::new(resolver),
            mobs: Vec::new(),
            npcs: Vec::new(),
            greetings: Arc::new(AtomicU64::new(0)),
            countdown,
            shutdown_requested: false,
            tick: 0,
        };

        for _ in 0..app.config.demo.viewers {
            let viewer = app.host.connect();
            app.coordinator.on_viewer_joined(viewer);
        }
        app.populate()?;
        Ok(app)
    }

    pub fn coordinator(&self) -> &ReplicationCoordinator {
        &self.coordinator
    }

    pub fn host(&self) -> &SimulatedHost {
        &self.host
    }

    /// Interactions the fake players have answered so far.
    pub fn greetings(&self) -> u64 {
        self.greetings.load(Ordering::Relaxed)
    }

    /// Runs the tick loop until the shutdown countdown ends.
    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting phantom demo host");
        self.log_configuration_summary();

        let shutdown = ShutdownState::new();
        let signal_task = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                if let Err(e) = wait_for_shutdown_signal(shutdown).await {
                    error!("❌ Failed to listen for shutdown signals: {}", e);
                }
            })
        };

        let mut interval = tokio::time::interval(Duration::from_millis(self.config.server.tick_interval_ms));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("✅ Phantom server is now running");
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        loop {
            interval.tick().await;
            if shutdown.is_shutdown_initiated() {
                self.request_shutdown();
            }
            if !self.step() {
                break;
            }
        }

        signal_task.abort();
        shutdown.initiate_shutdown();
        self.coordinator.shutdown();
        shutdown.complete_shutdown();

        self.log_final_statistics();
        info!("👋 Phantom server shutdown complete");
        Ok(())
    }

    /// Starts the shutdown countdown. Repeated requests are ignored.
    pub fn request_shutdown(&mut self) {
        if self.shutdown_requested {
            return;
        }
        self.shutdown_requested = true;
        if let Some(countdown) = self.countdown.take() {
            self.scheduler.cancel(countdown);
        }
        let grace = self.config.server.shutdown_grace_ticks;
        self.countdown = Some(self.scheduler.schedule_once(grace, AppTask::Shutdown));
        info!("⏳ Despawning every phantom in {} ticks", grace);
    }

    /// Runs one tick. Returns `false` once the shutdown countdown has ended.
    pub fn step(&mut self) -> bool {
        self.tick += 1;

        self.apply_textures();
        for event in self.host.step(self.tick) {
            self.dispatch(event);
        }
        self.animate_mobs();
        self.simulate_click();

        let mut keep_running = true;
        for (_, task) in self.scheduler.advance() {
            match task {
                AppTask::StatusReport => self.log_status(),
                AppTask::Shutdown => keep_running = false,
            }
        }

        self.coordinator.tick();
        keep_running
    }

    fn populate(&mut self) -> Result<(), ReplicationError> {
        let world = self.host.home_world();

        for index in 0..self.config.demo.mobs {
            let (kind, type_name) = MOB_KINDS[index % MOB_KINDS.len()];
            let phase = index as f64 * TAU / self.config.demo.mobs as f64;
            let transform = Transform::new(world.clone(), mob_position(phase, 0));
            let handle = self.coordinator.create(kind, type_name, transform);
            if kind == EntityKind::Gear {
                self.coordinator
                    .entity_mut(handle)?
                    .gear_mut()?
                    .set(EquipmentSlot::MainHand, Some(ItemStack::new("bow", 1)));
            }
            self.coordinator.spawn(handle)?;
            self.mobs.push(Wanderer { handle, phase });
        }

        // A floating sign greeting each viewer by name, in every world.
        let sign = self.coordinator.create(
            EntityKind::ArmorStand,
            "armor_stand",
            Transform::unbound(Position::new(0.0, GROUND_Y + 2.0, 0.0)),
        );
        {
            let entity = self.coordinator.entity_mut(sign)?;
            entity.flags.invisible = true;
            entity.flags.name_visible = true;
            entity.armor_stand_mut()?.marker = true;
            entity.set_name_provider(Some(Arc::new(|viewer: ViewerId| {
                let short = viewer.to_string();
                format!("Welcome, visitor {}", &short[..8])
            })));
        }
        self.coordinator.spawn(sign)?;

        for (index, name) in self.config.demo.npc_names.clone().into_iter().enumerate() {
            let position = Position::new(index as f64 * 4.0 - 2.0, GROUND_Y, 6.0);
            let handle = self
                .coordinator
                .create_player(name.clone(), Transform::new(world.clone(), position));

            let greetings = self.greetings.clone();
            self.coordinator.add_observer(
                handle,
                move |viewer: ViewerId, entity: &ReplicatedEntity, action: InteractionAction| -> Result<(), InteractionError> {
                    greetings.fetch_add(1, Ordering::Relaxed);
                    let name = entity.player().map(|profile| profile.name.as_str()).unwrap_or("?");
                    match action {
                        InteractionAction::Secondary => info!("💬 {} greets viewer {}", name, viewer),
                        InteractionAction::Primary => info!("🥊 Viewer {} punched {}", viewer, name),
                    }
                    Ok(())
                },
            )?;

            self.textures.request(handle, name);
            self.npcs.push(handle);
        }

        info!(
            "✨ Demo populated: {} mobs, {} fake players, 1 sign",
            self.mobs.len(),
            self.npcs.len()
        );
        Ok(())
    }

    /// Spawns fake players whose skin lookup has finished.
    fn apply_textures(&mut self) {
        for resolved in self.textures.drain() {
            let result = self
                .coordinator
                .entity_mut(resolved.entity)
                .and_then(|entity| {
                    entity.player_mut()?.texture = resolved.texture;
                    Ok(())
                })
                .and_then(|()| self.coordinator.spawn(resolved.entity));
            if let Err(e) = result {
                warn!("⚠️ Could not spawn {}: {}", resolved.name, e);
                continue;
            }

            // The first fake player sits on a bench.
            if self.npcs.first() == Some(&resolved.entity) {
                if let Err(e) = self.coordinator.sit(resolved.entity) {
                    warn!("⚠️ {} could not sit down: {}", resolved.name, e);
                }
            }
        }
    }

    fn dispatch(&mut self, event: ViewerEvent) {
        match event {
            ViewerEvent::Joined(viewer) => self.coordinator.on_viewer_joined(viewer),
            ViewerEvent::Moved(viewer) => self.coordinator.on_viewer_moved(viewer),
            ViewerEvent::Teleported(viewer) => self.coordinator.on_viewer_teleported(viewer),
            ViewerEvent::ChangedWorld(viewer) => self.coordinator.on_viewer_changed_world(viewer),
            ViewerEvent::Quit(viewer) => self.coordinator.on_viewer_quit(viewer),
        }
    }

    fn animate_mobs(&mut self) {
        let pulse = (self.tick % PULSE_TICKS == 0).then_some(self.tick / PULSE_TICKS);

        for wanderer in self.mobs.clone() {
            if let Err(e) = self.animate(wanderer, pulse) {
                warn!("⚠️ Failed to animate {:?}: {}", wanderer.handle, e);
            }
        }
    }

    fn animate(&mut self, wanderer: Wanderer, pulse: Option<u64>) -> Result<(), ReplicationError> {
        let handle = wanderer.handle;
        let mut transform = self.coordinator.entity(handle)?.transform().clone();
        transform.position = mob_position(wanderer.phase, self.tick);
        transform.yaw = ((wanderer.phase + self.tick as f64 * TAU / 400.0).to_degrees() % 360.0) as f32;
        self.coordinator.move_to(handle, transform)?;

        let Some(round) = pulse else {
            return Ok(());
        };

        let kind = self.coordinator.entity(handle)?.kind();
        {
            let entity = self.coordinator.entity_mut(handle)?;
            if kind.has_health() {
                entity.health_mut()?.set((round % 20) as f32 + 1.0);
            }
            match kind {
                EntityKind::Mob => entity.flags.on_fire = round % 2 == 0,
                EntityKind::Creeper => entity.creeper_mut()?.ignited = round % 3 == 0,
                EntityKind::Animal => entity.ageable_mut()?.baby = round % 2 == 1,
                EntityKind::Bat => entity.bat_mut()?.awake = round % 4 != 0,
                EntityKind::Gear => {
                    let item = if round % 2 == 0 { "bow" } else { "stone_sword" };
                    entity
                        .gear_mut()?
                        .set(EquipmentSlot::MainHand, Some(ItemStack::new(item, 1)));
                }
                _ => {}
            }
        }

        if kind == EntityKind::Tameable {
            if round % 2 == 0 {
                self.coordinator.sit(handle)?;
            } else {
                self.coordinator.stand(handle)?;
            }
        }
        if round % 5 == 0 {
            self.coordinator.play_status(handle, EntityStatus::Hurt)?;
        }
        self.coordinator.update(handle)
    }

    /// Some viewer clicks one of the fake players.
    fn simulate_click(&mut self) {
        let interval = self.config.demo.click_interval_ticks;
        if interval == 0 || self.tick % interval != 0 || self.npcs.is_empty() {
            return;
        }
        let Some(viewer) = self.host.any_viewer() else {
            return;
        };

        let round = (self.tick / interval) as usize;
        let handle = self.npcs[round % self.npcs.len()];
        let Ok(entity) = self.coordinator.entity(handle) else {
            return;
        };
        let id = entity.id();
        let raw = if round % 3 == 0 {
            RawInteraction::Attack
        } else {
            RawInteraction::Interact
        };
        if !self.coordinator.on_interaction_received(viewer, id, raw) {
            debug!("Click on {} passed through to the host", id);
        }
    }

    fn log_status(&self) {
        let stats = self.coordinator.stats();
        info!(
            "📊 Tick {} | {} viewers | {} phantoms | {} packets | {} spawns | {} despawns | {} deltas",
            self.tick,
            self.host.viewer_count(),
            self.coordinator.len(),
            stats.packets_sent,
            stats.spawns,
            stats.despawns,
            stats.metadata_deltas
        );
        if stats.transport_failures > 0 || stats.observer_failures > 0 {
            warn!(
                "⚠️ {} transport failures ({} resyncs), {} observer failures so far",
                stats.transport_failures, stats.resyncs, stats.observer_failures
            );
        }
    }

    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("  ⏱️ Tick interval: {}ms", self.config.server.tick_interval_ms);
        info!("  🔭 Render distance: {}", self.config.replication.render_distance);
        info!("  🌍 Worlds: {}", self.config.demo.worlds.join(", "));
        info!(
            "  👥 Viewers: {} | Mobs: {} | Fake players: {}",
            self.config.demo.viewers,
            self.config.demo.mobs,
            self.config.demo.npc_names.len()
        );
        if self.textures.in_flight() > 0 {
            info!("  🎨 {} skin lookups pending", self.textures.in_flight());
        }
    }

    fn log_final_statistics(&self) {
        let stats = self.coordinator.stats();
        let transport = self.host.transport();
        info!("📊 Final Statistics:");
        info!("  - Ticks run: {}", self.tick);
        info!("  - Packets sent: {}", stats.packets_sent);
        info!("  - Bytes encoded: {}", transport.bytes.load(Ordering::Relaxed));
        info!("  - Spawns / despawns: {} / {}", stats.spawns, stats.despawns);
        info!("  - Interactions routed: {}", stats.interactions_routed);
        info!("  - Tab-list removals: {}", stats.tab_list_removals);
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("tick", &self.tick)
            .field("mobs", &self.mobs.len())
            .field("npcs", &self.npcs.len())
            .field("shutdown_requested", &self.shutdown_requested)
            .finish_non_exhaustive()
    }
}

fn mob_position(phase: f64, tick: u64) -> Position {
    let angle = phase + tick as f64 * TAU / 400.0;
    Position::new(MOB_CIRCLE * angle.cos(), GROUND_Y, MOB_CIRCLE * angle.sin())
}
