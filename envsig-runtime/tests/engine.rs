//! End-to-end engine behaviour with mock providers

use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use envsig_core::{
    HydroReading, RawSignal, SeismicReading, Severity, SignalKind, SoilReading, ThermalReading,
    FALLBACK_SOURCE,
};
use envsig_providers::{ProviderError, SignalProvider};
use envsig_runtime::{Aggregator, CacheState, Clock, Engine, EngineConfig, ManualClock};

struct MockProvider {
    name: &'static str,
    kind: SignalKind,
    records: Vec<RawSignal>,
    fail: bool,
    delay: Duration,
    last_good: Vec<RawSignal>,
    calls: AtomicUsize,
}

impl MockProvider {
    fn ok(name: &'static str, records: Vec<RawSignal>) -> Self {
        let kind = records.first().map(|r| r.kind()).unwrap_or(SignalKind::Thermal);
        Self {
            name,
            kind,
            records,
            fail: false,
            delay: Duration::ZERO,
            last_good: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    fn failing(name: &'static str, kind: SignalKind) -> Self {
        Self {
            name,
            kind,
            records: Vec::new(),
            fail: true,
            delay: Duration::ZERO,
            last_good: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn with_last_good(mut self, records: Vec<RawSignal>) -> Self {
        self.last_good = records;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SignalProvider for MockProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn kind(&self) -> SignalKind {
        self.kind
    }

    fn source(&self) -> &'static str {
        self.name
    }

    async fn fetch(&self) -> Result<Vec<RawSignal>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(ProviderError::Unavailable {
                provider: self.name,
                reason: "connection refused".to_string(),
            });
        }
        Ok(self.records.clone())
    }

    fn fallback(&self) -> Vec<RawSignal> {
        self.last_good.clone()
    }
}

fn quake(id: &str, lat: f64, lng: f64, magnitude: f64) -> RawSignal {
    RawSignal::Seismic(SeismicReading {
        event_id: id.to_string(),
        latitude: lat,
        longitude: lng,
        magnitude,
        depth_km: Some(10.0),
        place: None,
        significance: None,
        observed_at: None,
    })
}

fn heat(id: &str, lat: f64, lng: f64, temperature_c: f64) -> RawSignal {
    RawSignal::Thermal(ThermalReading {
        station_id: id.to_string(),
        station: id.to_string(),
        latitude: lat,
        longitude: lng,
        temperature_c,
        humidity: None,
        observed_at: None,
    })
}

fn gauge(id: &str, lat: f64, lng: f64, level: f64) -> RawSignal {
    RawSignal::Hydrological(HydroReading {
        station_id: id.to_string(),
        station: id.to_string(),
        latitude: lat,
        longitude: lng,
        water_level_m: level,
        danger_level_m: None,
        observed_at: None,
    })
}

fn soil(id: &str, lat: f64, lng: f64, ph: f64) -> RawSignal {
    RawSignal::Soil(SoilReading {
        site_id: id.to_string(),
        site: id.to_string(),
        latitude: lat,
        longitude: lng,
        ph,
        moisture: None,
        soil_temperature: None,
        observed_at: None,
    })
}

fn engine_with(providers: Vec<Arc<MockProvider>>, clock: Arc<ManualClock>) -> Engine {
    let providers = providers
        .into_iter()
        .map(|p| p as Arc<dyn SignalProvider>)
        .collect();
    Engine::with_providers(&EngineConfig::default(), providers, clock as Arc<dyn Clock>).unwrap()
}

fn standard_providers() -> Vec<Arc<MockProvider>> {
    vec![
        Arc::new(MockProvider::ok(
            "seismic",
            vec![quake("q1", 23.8, 90.4, 7.2), quake("q2", 24.9, 91.9, 3.1)],
        )),
        Arc::new(MockProvider::ok(
            "thermal",
            vec![heat("dhaka", 23.81, 90.41, 40.5), heat("chittagong", 22.36, 91.78, 33.0)],
        )),
        Arc::new(MockProvider::ok("hydrological", vec![gauge("sw1", 23.71, 90.41, 6.8)])),
        Arc::new(MockProvider::ok("soil", vec![soil("s1", 24.37, 88.6, 6.9)])),
    ]
}

#[tokio::test]
async fn test_partial_failure_keeps_other_providers() {
    let providers = vec![
        Arc::new(MockProvider::ok("seismic", vec![quake("q1", 23.8, 90.4, 5.0)])),
        Arc::new(MockProvider::failing("thermal", SignalKind::Thermal)),
        Arc::new(MockProvider::ok("hydrological", vec![gauge("sw1", 23.71, 90.41, 6.8)])),
        Arc::new(MockProvider::ok("soil", vec![soil("s1", 24.37, 88.6, 6.9)])),
    ];
    let engine = engine_with(providers, Arc::new(ManualClock::default()));

    let snapshot = engine.get_all().await;
    assert_eq!(snapshot.points.len(), 3);
    assert!(!snapshot.degraded);
    assert_eq!(snapshot.errors.len(), 1);
    assert_eq!(snapshot.errors[0].provider, "thermal");
    assert_eq!(snapshot.summary.kind(SignalKind::Thermal), 0);
    assert_eq!(snapshot.summary.total, 3);
}

#[tokio::test]
async fn test_total_failure_returns_fallback_pair() {
    let providers = vec![
        Arc::new(MockProvider::failing("seismic", SignalKind::Seismic)),
        Arc::new(MockProvider::failing("thermal", SignalKind::Thermal)),
        Arc::new(MockProvider::failing("hydrological", SignalKind::Hydrological)),
        Arc::new(MockProvider::failing("soil", SignalKind::Soil)),
    ];
    let engine = engine_with(providers, Arc::new(ManualClock::default()));

    let snapshot = engine.get_all().await;
    assert!(snapshot.degraded);
    assert_eq!(snapshot.errors.len(), 4);
    assert_eq!(snapshot.points.len(), 2);
    assert!(snapshot.points.iter().all(|p| p.source == FALLBACK_SOURCE));
    assert_eq!(snapshot.summary.kind(SignalKind::Thermal), 1);
    assert_eq!(snapshot.summary.kind(SignalKind::Hydrological), 1);
    assert_eq!(snapshot.summary.severity(Severity::Low), 1);
    assert_eq!(snapshot.summary.severity(Severity::Medium), 1);
}

#[tokio::test]
async fn test_failed_provider_serves_last_good() {
    let providers = vec![
        Arc::new(MockProvider::failing("seismic", SignalKind::Seismic)),
        Arc::new(
            MockProvider::failing("thermal", SignalKind::Thermal)
                .with_last_good(vec![heat("dhaka", 23.81, 90.41, 37.0)]),
        ),
    ];
    let engine = engine_with(providers, Arc::new(ManualClock::default()));

    let snapshot = engine.get_all().await;
    assert!(!snapshot.degraded);
    assert_eq!(snapshot.points.len(), 1);
    assert_eq!(snapshot.points[0].id, "thermal:dhaka");
    assert_eq!(snapshot.errors.len(), 2);
    assert_eq!(
        snapshot.errors.iter().map(|e| e.recovered).sum::<usize>(),
        1
    );
}

#[tokio::test]
async fn test_fresh_cache_skips_providers() {
    let providers = standard_providers();
    let clock = Arc::new(ManualClock::default());
    let engine = engine_with(providers.clone(), clock.clone());
    assert_eq!(engine.cache_state(), CacheState::Empty);

    let first = engine.get_all().await;
    assert!(!first.cached);
    assert_eq!(engine.cache_state(), CacheState::Fresh);

    clock.advance(ChronoDuration::seconds(60));
    let second = engine.get_all().await;
    assert!(second.cached);
    assert_eq!(second.captured_at, first.captured_at);
    assert_eq!(second.points, first.points);
    assert!(providers.iter().all(|p| p.calls() == 1));

    clock.advance(ChronoDuration::seconds(180));
    assert_eq!(engine.cache_state(), CacheState::Stale);
    let third = engine.get_all().await;
    assert!(!third.cached);
    assert!(providers.iter().all(|p| p.calls() == 2));
}

#[tokio::test]
async fn test_refresh_bypasses_ttl() {
    let providers = standard_providers();
    let engine = engine_with(providers.clone(), Arc::new(ManualClock::default()));

    engine.get_all().await;
    let refreshed = engine.refresh().await;
    assert!(!refreshed.cached);
    assert!(providers.iter().all(|p| p.calls() == 2));
}

#[tokio::test]
async fn test_concurrent_callers_trigger_one_fan_out() {
    let providers: Vec<Arc<MockProvider>> = standard_providers()
        .into_iter()
        .map(|p| {
            let p = Arc::try_unwrap(p).ok().unwrap();
            Arc::new(p.with_delay(Duration::from_millis(50)))
        })
        .collect();
    let engine = Arc::new(engine_with(providers.clone(), Arc::new(ManualClock::default())));

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.get_all().await })
        })
        .collect();

    let mut fresh_results = 0;
    for handle in handles {
        let snapshot = handle.await.unwrap();
        assert_eq!(snapshot.points.len(), 6);
        if !snapshot.cached {
            fresh_results += 1;
        }
    }

    assert_eq!(fresh_results, 1);
    assert!(providers.iter().all(|p| p.calls() == 1));
}

#[tokio::test]
async fn test_concurrent_callers_after_expiry_trigger_one_fan_out() {
    let providers: Vec<Arc<MockProvider>> = standard_providers()
        .into_iter()
        .map(|p| {
            let p = Arc::try_unwrap(p).ok().unwrap();
            Arc::new(p.with_delay(Duration::from_millis(50)))
        })
        .collect();
    let clock = Arc::new(ManualClock::default());
    let engine = Arc::new(engine_with(providers.clone(), clock.clone()));

    let primed = engine.get_all().await;
    assert!(!primed.cached);
    assert!(providers.iter().all(|p| p.calls() == 1));

    clock.advance(ChronoDuration::seconds(181));
    assert_eq!(engine.cache_state(), CacheState::Stale);

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.get_all().await })
        })
        .collect();

    let mut fresh_results = 0;
    for handle in handles {
        let snapshot = handle.await.unwrap();
        assert_eq!(snapshot.points.len(), 6);
        assert!(snapshot.captured_at > primed.captured_at);
        if !snapshot.cached {
            fresh_results += 1;
        }
    }

    assert_eq!(fresh_results, 1);
    assert!(providers.iter().all(|p| p.calls() == 2));
    assert_eq!(engine.cache_state(), CacheState::Fresh);
}

#[tokio::test]
async fn test_magnitude_round_trip() {
    let engine = engine_with(standard_providers(), Arc::new(ManualClock::default()));

    let seismic = engine.get_by_kind(SignalKind::Seismic).await;
    let strong = seismic.iter().find(|p| p.id == "seismic:q1").unwrap();
    assert_eq!(strong.value, 7.2);
    assert_eq!(strong.severity, Severity::Critical);
    assert_eq!(strong.kind, SignalKind::Seismic);

    let soil = engine.get_by_kind(SignalKind::Soil).await;
    assert!(soil.iter().all(|p| p.id != "seismic:q1"));
    assert_eq!(soil.len(), 1);
}

#[tokio::test]
async fn test_region_filter() {
    let engine = engine_with(standard_providers(), Arc::new(ManualClock::default()));

    let dhaka = engine.get_by_region("Dhaka").await;
    let ids: Vec<&str> = dhaka.iter().map(|p| p.id.as_str()).collect();
    assert!(ids.contains(&"seismic:q1"));
    assert!(ids.contains(&"thermal:dhaka"));
    assert!(!ids.contains(&"thermal:chittagong"));

    let chittagong = engine.get_by_region("chattogram").await;
    assert_eq!(chittagong.len(), 1);
    assert_eq!(chittagong[0].id, "thermal:chittagong");

    assert!(engine.get_by_region("Atlantis").await.is_empty());
}

#[tokio::test]
async fn test_boundary_and_distance_queries() {
    let mut providers = standard_providers();
    // Kolkata, just across the border
    providers.push(Arc::new(MockProvider::ok(
        "thermal-in",
        vec![heat("kolkata", 22.57, 88.36, 38.0)],
    )));
    let engine = engine_with(providers, Arc::new(ManualClock::default()));

    let inside = engine.get_within_boundary().await;
    assert!(inside.iter().any(|p| p.id == "thermal:dhaka"));
    assert!(inside.iter().all(|p| p.id != "thermal-in:kolkata"));

    let dhaka = (23.8103, 90.4125);
    let nearby = engine.get_within_radius(dhaka, 25.0).await;
    assert!(!nearby.is_empty());
    assert!(nearby.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));
    assert!(nearby.iter().all(|n| n.distance_km <= 25.0));

    let nearest = engine.nearest(dhaka).await.unwrap();
    assert_eq!(nearest.point.id, "thermal:dhaka");
    assert!(nearest.distance_km < 1.0);
}

#[tokio::test]
async fn test_slow_provider_hits_deadline() {
    let slow = Arc::new(
        MockProvider::ok("seismic", vec![quake("q1", 23.8, 90.4, 5.0)])
            .with_delay(Duration::from_secs(5)),
    );
    let fast = Arc::new(MockProvider::ok("thermal", vec![heat("dhaka", 23.81, 90.41, 30.0)]));

    let aggregator = Aggregator::new(
        vec![slow as Arc<dyn SignalProvider>, fast as Arc<dyn SignalProvider>],
        Duration::from_millis(100),
    );
    let aggregation = aggregator.aggregate().await;

    assert_eq!(aggregation.points.len(), 1);
    assert_eq!(aggregation.errors.len(), 1);
    assert_eq!(aggregation.errors[0].provider, "seismic");
    assert!(aggregation.errors[0].error.contains("timed out"));
}

#[tokio::test]
async fn test_invalid_records_are_dropped() {
    let providers = vec![Arc::new(MockProvider::ok(
        "seismic",
        vec![
            quake("good", 23.8, 90.4, 4.5),
            quake("bad-lat", 123.0, 90.4, 4.5),
            quake("nan", 23.8, 90.4, f64::NAN),
            quake("good", 23.8, 90.4, 4.5),
        ],
    ))];
    let engine = engine_with(providers, Arc::new(ManualClock::default()));

    let snapshot = engine.get_all().await;
    assert_eq!(snapshot.points.len(), 1);
    assert_eq!(snapshot.points[0].id, "seismic:good");
    assert!(snapshot.errors.is_empty());
}

#[tokio::test]
async fn test_stats_over_subset() {
    let engine = engine_with(standard_providers(), Arc::new(ManualClock::default()));
    let dhaka = engine.get_by_region("Dhaka").await;
    let stats = Engine::stats(&dhaka);
    assert_eq!(stats.total, dhaka.len());
    assert_eq!(stats.severity(Severity::Critical), 1);
    assert_eq!(stats.worst(), Some(Severity::Critical));
}

#[test]
fn test_snapshot_json_shape() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let engine = engine_with(standard_providers(), Arc::new(ManualClock::default()));
    let snapshot = runtime.block_on(engine.get_all());

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["cached"], false);
    assert!(json["capturedAt"].is_string());
    assert_eq!(json["points"].as_array().unwrap().len(), 6);
    assert_eq!(json["summary"]["total"], 6);
}
