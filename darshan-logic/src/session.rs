use std::{
    pin::{Pin, pin},
    time::Duration,
};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{Mutex, RwLock, mpsc},
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{Feed, SessionError},
    location::{Heading, HeadingService, LocationService, UpdateSender, UserLocation},
    prelude::*,
    session_state::{SessionPhase, SessionState},
    settings::SessionSettings,
    snapshot::SessionSnapshot,
    target::{TargetLocation, TargetStore},
};

/// Notifies the presentation layer that a new snapshot is available
pub trait StateUpdateSender {
    fn send_update(&self);
}

/// Plays a short success vibration, fire and forget
pub trait HapticEmitter {
    fn pulse_success(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
/// Whether the host app is visible
pub enum AppLifecycle {
    Foreground,
    Background,
}

struct Subscriptions<H> {
    location: bool,
    heading: Option<H>,
}

/// Await the future in `slot`, never resolving if it's empty
async fn poll_slot<F: Future>(slot: Pin<&mut Option<F>>) -> F::Output {
    match slot.as_pin_mut() {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

struct Feeds {
    locations: mpsc::UnboundedReceiver<UserLocation>,
    headings: mpsc::UnboundedReceiver<Heading>,
}

/// A live compass pointing at the target. Gets the user's position from a [LocationService], the
/// device heading from a [HeadingService], and the target from a [TargetStore]. Every update
/// recomputes bearing and alignment, and rising alignment edges fire the [HapticEmitter].
///
/// Create one per activation of the compass view, run [CompassSession::main_loop], and call
/// [CompassSession::teardown] when the view goes away.
pub struct CompassSession<L, H, T, F, S>
where
    L: LocationService,
    H: HeadingService,
    T: TargetStore,
    F: HapticEmitter,
    S: StateUpdateSender,
{
    state: RwLock<SessionState>,
    settings: SessionSettings,
    location: L,
    heading: H,
    targets: T,
    haptics: F,
    state_update_sender: S,
    location_tx: UpdateSender<UserLocation>,
    heading_tx: UpdateSender<Heading>,
    feeds: Mutex<Feeds>,
    subscriptions: Mutex<Subscriptions<H::Handle>>,
    cancel: CancellationToken,
}

impl<L, H, T, F, S> CompassSession<L, H, T, F, S>
where
    L: LocationService,
    H: HeadingService,
    T: TargetStore,
    F: HapticEmitter,
    S: StateUpdateSender,
{
    pub fn new(
        settings: SessionSettings,
        location: L,
        heading: H,
        targets: T,
        haptics: F,
        state_update_sender: S,
    ) -> Self {
        let (location_tx, locations) = mpsc::unbounded_channel();
        let (heading_tx, headings) = mpsc::unbounded_channel();

        Self {
            state: RwLock::new(SessionState::new(&settings)),
            settings,
            location,
            heading,
            targets,
            haptics,
            state_update_sender,
            location_tx,
            heading_tx,
            feeds: Mutex::new(Feeds {
                locations,
                headings,
            }),
            subscriptions: Mutex::new(Subscriptions {
                location: false,
                heading: None,
            }),
            cancel: CancellationToken::new(),
        }
    }

    fn alive(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Get the current state for the presentation layer
    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await;
        let loading = state.phase() == SessionPhase::Initializing;
        state.as_snapshot(loading)
    }

    /// Apply `f` to the state unless the session was torn down, then fire a pulse if one is due
    /// and tell the UI about it.
    async fn apply(&self, f: impl FnOnce(&mut SessionState, Instant) -> bool) {
        let mut state = self.state.write().await;
        if !self.alive() {
            return;
        }
        if f(&mut state, Instant::now()) {
            info!("Aligned with target, pulsing");
            self.haptics.pulse_success();
        }
        drop(state);
        self.state_update_sender.send_update();
    }

    /// Hide the darshan overlay until [CompassSession::reset_darshan_state] is called
    pub async fn close_darshan(&self) {
        debug!("Darshan overlay dismissed");
        self.apply(|state, now| state.close_darshan(now)).await;
    }

    /// Allow the darshan overlay (and pulse) again on the next alignment
    pub async fn reset_darshan_state(&self) {
        debug!("Darshan overlay re-armed");
        self.apply(|state, now| state.reset_darshan(now)).await;
    }

    async fn fetch_target(&self) -> Result<Option<TargetLocation>, SessionError> {
        self.targets
            .fetch(&self.settings.target_id)
            .await
            .map_err(|why| {
                warn!("Failed to fetch target location: {why:?}");
                SessionError::TargetFetch
            })
    }

    /// Start both feeds, recording any that fail to start as advisory errors
    async fn start_subscriptions(&self, subs: &mut Subscriptions<H::Handle>) {
        let mut errors = Vec::with_capacity(2);

        if !subs.location {
            // Set before awaiting so a teardown landing mid-subscribe still unsubscribes
            subs.location = true;
            match self.location.subscribe(self.location_tx.clone()).await {
                Ok(()) => debug!("Location feed started"),
                Err(why) => {
                    warn!("Failed to start location feed: {why:?}");
                    subs.location = false;
                    errors.push(SessionError::SubscriptionStart(Feed::Location));
                }
            }
        }

        if !self.alive() {
            return;
        }

        if subs.heading.is_none() {
            let interval = self.settings.heading_interval();
            match self.heading.subscribe(interval, self.heading_tx.clone()) {
                Ok(handle) => {
                    debug!("Heading feed started");
                    subs.heading = Some(handle);
                }
                Err(why) => {
                    warn!("Failed to start heading feed: {why:?}");
                    errors.push(SessionError::SubscriptionStart(Feed::Heading));
                }
            }
        }

        if !errors.is_empty() {
            self.apply(|state, _| {
                for error in errors {
                    state.annotate_error(error);
                }
                false
            })
            .await;
        }
    }

    /// Stop both feeds, safe to call when they aren't running
    async fn stop_subscriptions(&self) {
        let mut subs = self.subscriptions.lock().await;
        if subs.location {
            self.location.unsubscribe();
            subs.location = false;
            debug!("Location feed stopped");
        }
        if let Some(handle) = subs.heading.take() {
            self.heading.unsubscribe(handle);
            debug!("Heading feed stopped");
        }
    }

    /// Permission, initial target and location, then the feeds. Returns early without touching
    /// state if the session is torn down in between.
    async fn initialize(&self) -> Result<(), SessionError> {
        let granted = self.location.request_permission().await;
        if !self.alive() {
            return Ok(());
        }

        if !granted {
            warn!("Location permission denied");
            self.apply(|state, _| {
                state.permission_denied();
                false
            })
            .await;
            return Err(SessionError::PermissionDenied);
        }

        info!("Location permission granted");
        self.apply(|state, _| {
            state.permission_granted();
            false
        })
        .await;

        let target = match self.fetch_target().await {
            Ok(Some(target)) => target,
            Ok(None) | Err(_) => {
                info!(
                    "No stored target for {}, using the default",
                    self.settings.target_id
                );
                TargetLocation::fallback(&self.settings.target_id, &self.settings.default_target)
            }
        };
        if !self.alive() {
            return Ok(());
        }
        // A refresh could have landed first, don't clobber it with the default
        self.apply(|state, now| !state.has_target() && state.set_target_location(target, now))
            .await;

        let current = self.location.get_current_once().await;
        if !self.alive() {
            return Ok(());
        }
        match current {
            Some(location) => {
                self.apply(|state, now| state.set_user_location(location, now))
                    .await;
            }
            None => debug!("No initial location fix, waiting for the feed"),
        }

        let mut subs = self.subscriptions.lock().await;
        if !self.alive() {
            return Ok(());
        }
        if self.state.read().await.is_foreground() {
            self.start_subscriptions(&mut subs).await;
        }
        self.apply(|state, _| {
            state.mark_ready();
            false
        })
        .await;
        drop(subs);

        Ok(())
    }

    async fn target_refreshed(&self, res: Result<Option<TargetLocation>, SessionError>) {
        match res {
            Ok(Some(target)) => {
                self.apply(|state, now| state.set_target_location(target, now))
                    .await
            }
            Ok(None) => debug!("Target refresh returned nothing, keeping cached target"),
            // Already logged, a stale target beats an error
            Err(_) => {}
        }
    }

    /// React to the host app moving between foreground and background. Feeds are stopped in
    /// the background and started from scratch when coming back. The target refresh keeps
    /// going either way.
    pub async fn set_app_state(&self, lifecycle: AppLifecycle) {
        if !self.alive() {
            return;
        }

        match lifecycle {
            AppLifecycle::Background => {
                info!("App backgrounded, pausing feeds");
                self.apply(|state, _| {
                    state.set_foreground(false);
                    false
                })
                .await;
                self.stop_subscriptions().await;
            }
            AppLifecycle::Foreground => {
                self.apply(|state, _| {
                    state.set_foreground(true);
                    false
                })
                .await;
                let mut subs = self.subscriptions.lock().await;
                let ready = self.state.read().await.phase() == SessionPhase::Ready;
                if ready && self.alive() {
                    info!("App foregrounded, resuming feeds");
                    self.start_subscriptions(&mut subs).await;
                    drop(subs);
                    self.state_update_sender.send_update();
                }
            }
        }
    }

    /// Stop all feeds and timers and ignore anything still in flight. Safe to call repeatedly.
    pub async fn teardown(&self) {
        if self.alive() {
            info!("Tearing down compass session");
        }
        self.cancel.cancel();
        self.stop_subscriptions().await;
    }

    fn refresh_period(&self) -> Duration {
        self.settings
            .target_refresh_interval()
            .max(Duration::from_secs(1))
    }

    async fn consume_location(&self, location: UserLocation) {
        if self.state.read().await.is_foreground() {
            self.apply(|state, now| state.set_user_location(location, now))
                .await;
        }
    }

    async fn consume_heading(&self, heading: Heading) {
        if self.state.read().await.is_foreground() {
            self.apply(|state, now| state.set_heading(heading, now)).await;
        }
    }

    /// Main loop of the session, initializes then applies feed updates and target refreshes
    /// until [CompassSession::teardown] is called.
    ///
    /// Returns an error only if permission was denied, the snapshot keeps describing the failure.
    pub async fn main_loop(&self) -> Result {
        let mut feeds = self.feeds.lock().await;
        let Feeds {
            locations,
            headings,
        } = &mut *feeds;

        let init = tokio::select! {
            biased;

            _ = self.cancel.cancelled() => Ok(()),

            res = self.initialize() => res,
        };

        if let Err(why) = init {
            return Err(why.into());
        }

        let period = self.refresh_period();
        let mut refresh = tokio::time::interval_at(Instant::now() + period, period);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // At most one refresh in flight, polled beside the feeds so a slow store never stalls them
        let mut refreshing = pin!(None);

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    break;
                }

                Some(location) = locations.recv() => {
                    self.consume_location(location).await;
                }

                Some(heading) = headings.recv() => {
                    self.consume_heading(heading).await;
                }

                res = poll_slot(refreshing.as_mut()), if refreshing.is_some() => {
                    refreshing.set(None);
                    self.target_refreshed(res).await;
                }

                _ = refresh.tick() => {
                    if refreshing.is_none() {
                        refreshing.set(Some(self.fetch_target()));
                    } else {
                        debug!("Previous target refresh still pending, skipping");
                    }
                }
            }
        }

        self.stop_subscriptions().await;

        Ok(())
    }
}
