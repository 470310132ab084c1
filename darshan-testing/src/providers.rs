use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use chrono::Utc;
use darshan_logic::{
    Coordinate, Degrees, HapticEmitter, Heading, HeadingService, LocationService,
    SessionSettings, StateUpdateSender, TargetLocation, TargetStore, UpdateSender, UserLocation,
    wrap_360,
};
use darshan_store::HttpTargetStore;
use log::{debug, info};
use tokio::{sync::mpsc, time::Instant};
use tokio_util::sync::CancellationToken;

use crate::prelude::*;

const METERS_PER_DEGREE: f64 = 111_320.0;

fn jittered(position: Coordinate, jitter_m: f64) -> Coordinate {
    if jitter_m <= 0.0 {
        return position;
    }

    let lat_scale = position.latitude.to_radians().cos().abs().max(0.01);
    let north = rand::random_range(-jitter_m..=jitter_m);
    let east = rand::random_range(-jitter_m..=jitter_m);

    Coordinate::new(
        (position.latitude + north / METERS_PER_DEGREE).clamp(-90.0, 90.0),
        wrap_360(position.longitude + 180.0 + east / (METERS_PER_DEGREE * lat_scale)) - 180.0,
    )
}

/// Location provider standing still at a fixed position, optionally wandering within a radius
/// around it on every fix
pub struct SimLocation {
    position: Coordinate,
    jitter_m: f64,
    interval: Duration,
    granted: bool,
    task: Mutex<Option<CancellationToken>>,
}

impl SimLocation {
    pub fn new(position: Coordinate, interval: Duration) -> Self {
        Self {
            position,
            jitter_m: 0.0,
            interval,
            granted: true,
            task: Mutex::new(None),
        }
    }

    /// Scatter each fix up to `meters` north/south and east/west of the position
    pub fn with_jitter(mut self, meters: f64) -> Self {
        self.jitter_m = meters.max(0.0);
        self
    }

    /// Refuse the permission request
    pub fn denying(mut self) -> Self {
        self.granted = false;
        self
    }

    fn sample(position: Coordinate, jitter_m: f64) -> UserLocation {
        UserLocation {
            accuracy: Some(jitter_m.max(5.0)),
            timestamp: Some(Utc::now()),
            ..UserLocation::new(jittered(position, jitter_m))
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().unwrap().is_some()
    }
}

impl LocationService for SimLocation {
    async fn request_permission(&self) -> bool {
        debug!("Simulated permission request, granting: {}", self.granted);
        self.granted
    }

    async fn get_current_once(&self) -> Option<UserLocation> {
        self.granted
            .then(|| Self::sample(self.position, self.jitter_m))
    }

    async fn subscribe(&self, updates: UpdateSender<UserLocation>) -> Result {
        if !self.granted {
            bail!("Location permission not granted");
        }

        let cancel = CancellationToken::new();
        let (position, jitter_m, interval) = (self.position, self.jitter_m, self.interval);

        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                let mut ticker = tokio::time::interval(interval);
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = ticker.tick() => {
                            if updates.send(Self::sample(position, jitter_m)).is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        });

        if let Some(old) = self.task.lock().unwrap().replace(cancel) {
            old.cancel();
        }

        Ok(())
    }

    fn unsubscribe(&self) {
        if let Some(task) = self.task.lock().unwrap().take() {
            task.cancel();
        }
    }
}

/// Heading provider turning at a constant rate, as if the user were slowly spinning in place
#[derive(Debug, Clone, Copy)]
pub struct SimHeading {
    start: Degrees,
    rate: Degrees,
    origin: Instant,
}

impl SimHeading {
    /// Start facing `start` degrees and turn `rate` degrees per second (negative turns left)
    pub fn new(start: Degrees, rate: Degrees) -> Self {
        Self {
            start,
            rate,
            origin: Instant::now(),
        }
    }

    pub fn heading_at(&self, now: Instant) -> Heading {
        let elapsed = now.saturating_duration_since(self.origin).as_secs_f64();
        wrap_360(self.start + self.rate * elapsed)
    }
}

impl HeadingService for SimHeading {
    type Handle = CancellationToken;

    fn subscribe(
        &self,
        min_interval: Duration,
        updates: UpdateSender<Heading>,
    ) -> Result<CancellationToken> {
        let cancel = CancellationToken::new();
        let sim = *self;

        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                let mut ticker = tokio::time::interval(min_interval.max(Duration::from_millis(1)));
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        now = ticker.tick() => {
                            if updates.send(sim.heading_at(now)).is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        });

        Ok(cancel)
    }

    fn unsubscribe(&self, handle: CancellationToken) {
        handle.cancel();
    }
}

/// Haptics that log instead of vibrating
#[derive(Clone, Default)]
pub struct LogHaptics(Arc<AtomicUsize>);

impl LogHaptics {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl HapticEmitter for LogHaptics {
    fn pulse_success(&self) {
        let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        info!("*bzzt* aligned with target (pulse #{n})");
    }
}

/// Forwards update notifications into a channel, dropping them while one is already pending
pub struct NotifySender(mpsc::Sender<()>);

impl NotifySender {
    pub fn new(tx: mpsc::Sender<()>) -> Self {
        Self(tx)
    }
}

impl StateUpdateSender for NotifySender {
    fn send_update(&self) {
        self.0.try_send(()).ok();
    }
}

/// Target store living in memory, for running without a location server
#[derive(Clone, Default)]
pub struct MemoryTargetStore(Arc<Mutex<HashMap<String, TargetLocation>>>);

impl MemoryTargetStore {
    /// A store holding the default target under the configured id
    pub fn with_default(settings: &SessionSettings) -> Self {
        let store = Self::default();
        store.insert(TargetLocation::fallback(
            settings.target_id.clone(),
            &settings.default_target,
        ));
        store
    }

    pub fn insert(&self, record: TargetLocation) {
        self.0.lock().unwrap().insert(record.id.clone(), record);
    }
}

impl TargetStore for MemoryTargetStore {
    async fn fetch(&self, id: &str) -> Result<Option<TargetLocation>> {
        Ok(self.0.lock().unwrap().get(id).cloned())
    }

    async fn update(
        &self,
        id: &str,
        coordinate: Coordinate,
        address: Option<String>,
    ) -> Result<TargetLocation> {
        let record = TargetLocation::new(id, coordinate, address);
        self.insert(record.clone());
        Ok(record)
    }
}

/// Either a live location server or an in-memory stand-in
pub enum SimStore {
    Memory(MemoryTargetStore),
    Http(HttpTargetStore),
}

impl TargetStore for SimStore {
    async fn fetch(&self, id: &str) -> Result<Option<TargetLocation>> {
        match self {
            Self::Memory(store) => store.fetch(id).await,
            Self::Http(store) => store.fetch(id).await,
        }
    }

    async fn update(
        &self,
        id: &str,
        coordinate: Coordinate,
        address: Option<String>,
    ) -> Result<TargetLocation> {
        match self {
            Self::Memory(store) => store.update(id, coordinate, address).await,
            Self::Http(store) => store.update(id, coordinate, address).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use darshan_logic::{CompassSession, DEFAULT_TARGET_ID, DisplayState};
    use tokio::{
        sync::mpsc,
        test,
        time::{advance, sleep},
    };

    use super::*;

    const HERE: Coordinate = Coordinate::new(0.0, 0.0);

    #[test]
    async fn test_jitter_bounds() {
        let position = Coordinate::new(12.3, 76.6);
        assert_eq!(jittered(position, 0.0), position);

        for _ in 0..200 {
            let point = jittered(position, 50.0);
            assert!(point.is_valid());
            // Corners of the jitter square sit ~71m out
            assert!(position.distance_to(&point) < 0.08);
        }
    }

    #[test(start_paused = true)]
    async fn test_heading_sweep() {
        let sim = SimHeading::new(350.0, 20.0);
        let origin = Instant::now();

        assert_eq!(sim.heading_at(origin), 350.0);
        let later = sim.heading_at(origin + Duration::from_secs(1));
        assert!((later - 10.0).abs() < 1e-9, "Expected wrap to 10, got {later}");

        let backwards = SimHeading::new(5.0, -10.0);
        let later = backwards.heading_at(origin + Duration::from_secs(1));
        assert!((later - 355.0).abs() < 1e-9);
    }

    #[test(start_paused = true)]
    async fn test_heading_unsubscribe_stops() {
        let sim = SimHeading::new(0.0, 90.0);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = sim
            .subscribe(Duration::from_millis(100), tx)
            .expect("Subscribe failed");
        sleep(Duration::from_millis(350)).await;

        let mut received = Vec::new();
        while let Ok(heading) = rx.try_recv() {
            received.push(heading);
        }
        assert!(received.len() >= 3);
        assert!(received.windows(2).all(|w| w[1] > w[0]));

        sim.unsubscribe(handle);
        sleep(Duration::from_millis(10)).await;
        while rx.try_recv().is_ok() {}
        advance(Duration::from_secs(1)).await;
        sleep(Duration::from_millis(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[test(start_paused = true)]
    async fn test_location_feed() {
        let sim = SimLocation::new(HERE, Duration::from_millis(500));
        let (tx, mut rx) = mpsc::unbounded_channel();

        sim.subscribe(tx).await.expect("Subscribe failed");
        assert!(sim.is_running());

        let fix = rx.recv().await.expect("No fix");
        assert_eq!(fix.coordinate(), HERE);
        assert!(fix.timestamp.is_some());

        sim.unsubscribe();
        assert!(!sim.is_running());
    }

    #[test]
    async fn test_denied_location() {
        let sim = SimLocation::new(HERE, Duration::from_secs(1)).denying();
        let (tx, _rx) = mpsc::unbounded_channel();

        assert!(!sim.request_permission().await);
        assert_eq!(sim.get_current_once().await, None);
        assert!(sim.subscribe(tx).await.is_err());
    }

    #[test]
    async fn test_memory_store() {
        let settings = SessionSettings::default();
        let store = MemoryTargetStore::with_default(&settings);

        let record = store
            .fetch(DEFAULT_TARGET_ID)
            .await
            .unwrap()
            .expect("Default missing");
        assert_eq!(record.coordinate(), settings.default_target.coordinate());
        assert_eq!(store.fetch("other").await.unwrap(), None);

        let moved = store
            .update(DEFAULT_TARGET_ID, HERE, None)
            .await
            .unwrap();
        assert_eq!(store.fetch(DEFAULT_TARGET_ID).await.unwrap(), Some(moved));
    }

    #[test]
    async fn test_notify_coalesces() {
        let (tx, mut rx) = mpsc::channel(1);
        let sender = NotifySender::new(tx);

        sender.send_update();
        sender.send_update();
        sender.send_update();

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test(start_paused = true)]
    async fn test_sweep_through_target() {
        // Target due east, sweeping from north at 90 deg/s reaches it after one second
        let settings = SessionSettings::default();
        let store = MemoryTargetStore::default();
        store.insert(TargetLocation::new(
            settings.target_id.clone(),
            Coordinate::new(0.0, 1.0),
            None,
        ));

        let haptics = LogHaptics::default();
        let (tx, _rx) = mpsc::channel(1);
        let session = Arc::new(CompassSession::new(
            settings,
            SimLocation::new(HERE, Duration::from_secs(1)),
            SimHeading::new(0.0, 90.0),
            SimStore::Memory(store),
            haptics.clone(),
            NotifySender::new(tx),
        ));

        let main = tokio::spawn({
            let session = session.clone();
            async move { session.main_loop().await }
        });

        sleep(Duration::from_millis(1050)).await;
        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.display_state(), DisplayState::Ready);
        assert!(snapshot.is_aligned());
        assert!(snapshot.should_show_overlay);
        assert_eq!(haptics.count(), 1);

        // Sweeping on past the threshold drops alignment without another pulse
        sleep(Duration::from_millis(1500)).await;
        assert!(!session.snapshot().await.is_aligned());
        assert_eq!(haptics.count(), 1);

        session.teardown().await;
        main.await
            .expect("Main loop panicked")
            .expect("Main loop failed");
    }
}
