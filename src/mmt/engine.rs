//! Per-pool market-making engine.
//!
//! The engine is the scheduler around the pure quoting function: it wakes
//! every `check_interval` seconds, enforces the `enabled`/`emergency_stop`
//! convention, derives an order size from inventory, and hands the
//! resulting quote pair to a [`QuoteSink`]. Order placement itself is out
//! of scope; the sink is the seam where an execution layer would attach.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::mmt::error::MmtError;
use crate::mmt::quoting::{Quote, quote_checked};
use crate::mmt::strategy::StrategyConfig;
use crate::services::price_feed::PriceFeed;

/// Current holdings the engine sizes quotes against.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Inventory {
    /// Base-asset holdings, in base units.
    pub base_amount: f64,
    /// Quote-asset holdings, in quote units.
    pub quote_amount: f64,
}

impl Inventory {
    /// Share of portfolio value held in the base asset, in pct-points.
    pub fn base_ratio(&self, price: f64) -> f64 {
        let base_value = self.base_amount * price;
        let total = base_value + self.quote_amount;
        if total <= 0.0 {
            return 0.0;
        }
        base_value / total * 100.0
    }
}

/// One evaluation cycle's output: the quotes the engine wants placed.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteIntent {
    pub pool_id: Uuid,
    pub reference_price: f64,
    pub quote: Quote,
    /// Order size for each side, in base units.
    pub order_size: f64,
    pub generated_at: DateTime<Utc>,
}

/// Receiver for engine output. Production wiring logs; an execution layer
/// would place orders here; tests record.
#[async_trait::async_trait]
pub trait QuoteSink: Send + Sync {
    async fn publish_quote(&self, intent: &QuoteIntent);

    /// Inventory ratio drifted past the rebalance threshold.
    async fn signal_rebalance(&self, pool_id: Uuid, current_ratio: f64, target_ratio: f64);

    /// Stop-loss tripped; the engine has already set `emergency_stop`.
    async fn stop_loss_triggered(&self, pool_id: Uuid, entry_price: f64, current_price: f64);
}

/// Sink that only writes to the log.
pub struct LoggingQuoteSink;

#[async_trait::async_trait]
impl QuoteSink for LoggingQuoteSink {
    async fn publish_quote(&self, intent: &QuoteIntent) {
        info!(
            "pool {} quote: bid {:.6} / ask {:.6} (spread {:.6}) size {:.4} (ref {:.6})",
            intent.pool_id,
            intent.quote.bid_price,
            intent.quote.ask_price,
            intent.quote.spread(),
            intent.order_size,
            intent.reference_price
        );
    }

    async fn signal_rebalance(&self, pool_id: Uuid, current_ratio: f64, target_ratio: f64) {
        warn!(
            "pool {pool_id} inventory drift: base ratio {current_ratio:.2}% vs target {target_ratio:.2}%, rebalance needed"
        );
    }

    async fn stop_loss_triggered(&self, pool_id: Uuid, entry_price: f64, current_price: f64) {
        warn!(
            "pool {pool_id} stop loss: price {current_price:.6} fell from entry {entry_price:.6}, emergency stop engaged"
        );
    }
}

/// Market-making engine for a single pool.
pub struct MmtEngine {
    pool_id: Uuid,
    config: RwLock<StrategyConfig>,
    inventory: RwLock<Inventory>,
    feed: Arc<dyn PriceFeed>,
    sink: Arc<dyn QuoteSink>,
    /// First price observed while active; anchor for the stop-loss check.
    entry_price: RwLock<Option<f64>>,
    last_intent: RwLock<Option<QuoteIntent>>,
}

impl MmtEngine {
    pub fn new(
        pool_id: Uuid,
        config: StrategyConfig,
        inventory: Inventory,
        feed: Arc<dyn PriceFeed>,
        sink: Arc<dyn QuoteSink>,
    ) -> Self {
        Self {
            pool_id,
            config: RwLock::new(config),
            inventory: RwLock::new(inventory),
            feed,
            sink,
            entry_price: RwLock::new(None),
            last_intent: RwLock::new(None),
        }
    }

    pub fn pool_id(&self) -> Uuid {
        self.pool_id
    }

    pub async fn config(&self) -> StrategyConfig {
        self.config.read().await.clone()
    }

    pub async fn set_config(&self, config: StrategyConfig) {
        *self.config.write().await = config;
    }

    pub async fn set_emergency_stop(&self) {
        self.config.write().await.emergency_stop = true;
    }

    pub async fn last_intent(&self) -> Option<QuoteIntent> {
        self.last_intent.read().await.clone()
    }

    /// One evaluation cycle. Returns the published intent, or `None` when
    /// the configuration suppresses quoting this tick.
    pub async fn tick(&self) -> Result<Option<QuoteIntent>, MmtError> {
        let config = self.config.read().await.clone();

        if !config.is_active() {
            debug!(
                "pool {} idle (enabled={}, emergency_stop={})",
                self.pool_id, config.enabled, config.emergency_stop
            );
            return Ok(None);
        }

        let price = self.feed.reference_price().await?;

        // Stop-loss is measured against the first price seen this session.
        let entry = {
            let mut entry = self.entry_price.write().await;
            *entry.get_or_insert(price)
        };
        if entry > 0.0 {
            let drawdown_pct = (entry - price) / entry * 100.0;
            if drawdown_pct >= config.stop_loss_percentage {
                self.set_emergency_stop().await;
                self.sink
                    .stop_loss_triggered(self.pool_id, entry, price)
                    .await;
                return Ok(None);
            }
        }

        let quote = quote_checked(&config, price)?;
        let inventory = *self.inventory.read().await;

        let mut order_size = (inventory.base_amount * config.trade_size_percentage / 100.0)
            .clamp(config.min_trade_size, config.max_trade_size);

        // Never quote a bid that would push base exposure past the cap.
        let headroom = config.max_position_size - inventory.base_amount;
        if order_size > headroom {
            warn!(
                "pool {} position {} near cap {}, shrinking order to {:.4}",
                self.pool_id,
                inventory.base_amount,
                config.max_position_size,
                headroom.max(0.0)
            );
            order_size = headroom.max(0.0);
        }

        let intent = QuoteIntent {
            pool_id: self.pool_id,
            reference_price: price,
            quote,
            order_size,
            generated_at: Utc::now(),
        };

        if order_size > 0.0 {
            self.sink.publish_quote(&intent).await;
        }
        *self.last_intent.write().await = Some(intent.clone());

        let ratio = inventory.base_ratio(price);
        if (ratio - config.target_ratio).abs() > config.rebalance_threshold {
            self.sink
                .signal_rebalance(self.pool_id, ratio, config.target_ratio)
                .await;
        }

        Ok(Some(intent))
    }

    /// Run the evaluation loop until `stop` flips. The interval length is
    /// re-read every cycle so config updates take effect live.
    pub async fn run(self: Arc<Self>, mut stop: watch::Receiver<bool>) {
        info!("pool {} engine loop starting", self.pool_id);
        loop {
            let interval_secs = self.config.read().await.check_interval.max(1);
            let sleep = tokio::time::sleep(std::time::Duration::from_secs(interval_secs));

            tokio::select! {
                _ = sleep => {
                    if let Err(e) = self.tick().await {
                        warn!("pool {} evaluation failed: {}", self.pool_id, e);
                    }
                }
                res = stop.changed() => {
                    // A dropped sender means nothing controls this engine
                    // anymore; shut down instead of spinning on Err.
                    if res.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }
        info!("pool {} engine loop stopped", self.pool_id);
    }
}

/// Snapshot of one running engine, for the status endpoint.
#[derive(Debug, Serialize)]
pub struct EngineStatus {
    pub pool_id: Uuid,
    pub config: StrategyConfig,
    pub last_intent: Option<QuoteIntent>,
}

struct EngineHandle {
    engine: Arc<MmtEngine>,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Registry of running engines, one per pool.
#[derive(Default)]
pub struct EngineRegistry {
    engines: DashMap<Uuid, EngineHandle>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn an engine loop for the pool. Fails if one is already running.
    pub fn start(
        &self,
        pool_id: Uuid,
        config: StrategyConfig,
        inventory: Inventory,
        feed: Arc<dyn PriceFeed>,
        sink: Arc<dyn QuoteSink>,
    ) -> Result<(), MmtError> {
        if self.engines.contains_key(&pool_id) {
            return Err(MmtError::AlreadyRunning(pool_id));
        }
        config.validate()?;

        let engine = Arc::new(MmtEngine::new(pool_id, config, inventory, feed, sink));
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(Arc::clone(&engine).run(stop_rx));

        self.engines.insert(
            pool_id,
            EngineHandle {
                engine,
                stop: stop_tx,
                task,
            },
        );
        info!("started engine for pool {pool_id}");
        Ok(())
    }

    /// Stop the pool's engine and drop it from the registry.
    pub async fn stop(&self, pool_id: Uuid) -> Result<(), MmtError> {
        let (_, handle) = self
            .engines
            .remove(&pool_id)
            .ok_or(MmtError::NotRunning(pool_id))?;

        let _ = handle.stop.send(true);
        handle.task.abort();
        info!("stopped engine for pool {pool_id}");
        Ok(())
    }

    /// Trip the emergency stop, then tear the engine down.
    pub async fn emergency_stop(&self, pool_id: Uuid) -> Result<(), MmtError> {
        if let Some(handle) = self.engines.get(&pool_id) {
            handle.engine.set_emergency_stop().await;
        }
        self.stop(pool_id).await
    }

    /// Push a new configuration into a running engine.
    pub async fn update_config(&self, pool_id: Uuid, config: StrategyConfig) -> Result<(), MmtError> {
        let handle = self
            .engines
            .get(&pool_id)
            .ok_or(MmtError::NotRunning(pool_id))?;
        handle.engine.set_config(config).await;
        Ok(())
    }

    pub fn is_running(&self, pool_id: Uuid) -> bool {
        self.engines.contains_key(&pool_id)
    }

    pub async fn status(&self) -> Vec<EngineStatus> {
        let mut out = Vec::with_capacity(self.engines.len());
        for entry in self.engines.iter() {
            out.push(EngineStatus {
                pool_id: entry.engine.pool_id(),
                config: entry.engine.config().await,
                last_intent: entry.engine.last_intent().await,
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::price_feed::FixedPriceFeed;
    use std::sync::Mutex;

    #[derive(Debug)]
    enum SinkEvent {
        Quote(QuoteIntent),
        Rebalance { current: f64, target: f64 },
        StopLoss { entry: f64, current: f64 },
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<SinkEvent>>,
    }

    #[async_trait::async_trait]
    impl QuoteSink for RecordingSink {
        async fn publish_quote(&self, intent: &QuoteIntent) {
            self.events
                .lock()
                .unwrap()
                .push(SinkEvent::Quote(intent.clone()));
        }

        async fn signal_rebalance(&self, _pool_id: Uuid, current: f64, target: f64) {
            self.events
                .lock()
                .unwrap()
                .push(SinkEvent::Rebalance { current, target });
        }

        async fn stop_loss_triggered(&self, _pool_id: Uuid, entry: f64, current: f64) {
            self.events
                .lock()
                .unwrap()
                .push(SinkEvent::StopLoss { entry, current });
        }
    }

    fn active_config() -> StrategyConfig {
        StrategyConfig {
            enabled: true,
            base_spread: 1.0,
            check_interval: 1,
            ..Default::default()
        }
    }

    fn engine_with(
        config: StrategyConfig,
        inventory: Inventory,
        price: f64,
    ) -> (MmtEngine, Arc<FixedPriceFeed>, Arc<RecordingSink>) {
        let feed = Arc::new(FixedPriceFeed::new(price));
        let sink = Arc::new(RecordingSink::default());
        let engine = MmtEngine::new(
            Uuid::new_v4(),
            config,
            inventory,
            Arc::clone(&feed) as Arc<dyn PriceFeed>,
            Arc::clone(&sink) as Arc<dyn QuoteSink>,
        );
        (engine, feed, sink)
    }

    fn balanced_inventory() -> Inventory {
        // 50/50 at price 100.
        Inventory {
            base_amount: 10.0,
            quote_amount: 1000.0,
        }
    }

    #[tokio::test]
    async fn disabled_config_suppresses_quoting() {
        let config = StrategyConfig {
            enabled: false,
            ..active_config()
        };
        let (engine, _feed, sink) = engine_with(config, balanced_inventory(), 100.0);

        assert!(engine.tick().await.unwrap().is_none());
        assert!(sink.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn emergency_stop_suppresses_quoting() {
        let config = StrategyConfig {
            emergency_stop: true,
            ..active_config()
        };
        let (engine, _feed, sink) = engine_with(config, balanced_inventory(), 100.0);

        assert!(engine.tick().await.unwrap().is_none());
        assert!(sink.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn tick_publishes_spread_quotes() {
        let (engine, _feed, sink) = engine_with(active_config(), balanced_inventory(), 100.0);

        let intent = engine.tick().await.unwrap().expect("intent expected");
        assert_eq!(intent.quote.bid_price, 99.0);
        assert_eq!(intent.quote.ask_price, 101.0);
        // 5% of 10 base units, within [0.1, 10.0].
        assert!((intent.order_size - 0.5).abs() < 1e-12);

        let events = sink.events.lock().unwrap();
        assert!(matches!(events.as_slice(), [SinkEvent::Quote(_)]));
    }

    #[tokio::test]
    async fn order_size_clamps_to_bounds() {
        // Tiny inventory: raw size 0.005 clamps up to min_trade_size.
        let inventory = Inventory {
            base_amount: 0.1,
            quote_amount: 10.0,
        };
        let (engine, _feed, _sink) = engine_with(active_config(), inventory, 100.0);
        let intent = engine.tick().await.unwrap().unwrap();
        assert_eq!(intent.order_size, 0.1);

        // Huge inventory under a generous cap: clamps down to max_trade_size.
        let config = StrategyConfig {
            max_position_size: 100_000.0,
            ..active_config()
        };
        let inventory = Inventory {
            base_amount: 10_000.0,
            quote_amount: 10.0,
        };
        let (engine, _feed, _sink) = engine_with(config, inventory, 100.0);
        let intent = engine.tick().await.unwrap().unwrap();
        assert_eq!(intent.order_size, 10.0);
    }

    #[tokio::test]
    async fn order_size_respects_position_cap() {
        let config = StrategyConfig {
            max_position_size: 10.2,
            ..active_config()
        };
        // Raw size 0.5, but only 0.2 of headroom remains.
        let (engine, _feed, _sink) = engine_with(config, balanced_inventory(), 100.0);
        let intent = engine.tick().await.unwrap().unwrap();
        assert!((intent.order_size - 0.2).abs() < 1e-12);
    }

    #[tokio::test]
    async fn inventory_drift_signals_rebalance() {
        // Base-heavy book: ratio ~90.9% vs target 50%.
        let inventory = Inventory {
            base_amount: 100.0,
            quote_amount: 1000.0,
        };
        let (engine, _feed, sink) = engine_with(
            StrategyConfig {
                max_position_size: 1000.0,
                ..active_config()
            },
            inventory,
            100.0,
        );

        engine.tick().await.unwrap();
        let events = sink.events.lock().unwrap();
        assert!(events.iter().any(|e| matches!(
            e,
            SinkEvent::Rebalance { target, .. } if *target == 50.0
        )));
    }

    #[tokio::test]
    async fn stop_loss_trips_emergency_stop() {
        let (engine, feed, sink) = engine_with(active_config(), balanced_inventory(), 100.0);

        // First tick anchors the entry price at 100.
        assert!(engine.tick().await.unwrap().is_some());

        // 15% drawdown against a 10% stop.
        feed.set(85.0);
        assert!(engine.tick().await.unwrap().is_none());
        assert!(engine.config().await.emergency_stop);

        let saw_stop = sink
            .events
            .lock()
            .unwrap()
            .iter()
            .any(|e| matches!(e, SinkEvent::StopLoss { entry, current }
                if *entry == 100.0 && *current == 85.0));
        assert!(saw_stop);

        // Engine stays silent afterwards.
        assert!(engine.tick().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn small_drawdown_keeps_quoting() {
        let (engine, feed, _sink) = engine_with(active_config(), balanced_inventory(), 100.0);
        engine.tick().await.unwrap();

        feed.set(95.0); // 5% < 10% stop loss
        assert!(engine.tick().await.unwrap().is_some());
        assert!(!engine.config().await.emergency_stop);
    }

    #[tokio::test]
    async fn run_loop_exits_when_controller_is_dropped() {
        let (engine, _feed, _sink) = engine_with(active_config(), balanced_inventory(), 100.0);
        let engine = Arc::new(engine);
        let (stop_tx, stop_rx) = watch::channel(false);

        let task = tokio::spawn(Arc::clone(&engine).run(stop_rx));
        drop(stop_tx);

        tokio::time::timeout(std::time::Duration::from_secs(5), task)
            .await
            .expect("engine loop must exit once its stop channel is gone")
            .unwrap();
    }

    #[tokio::test]
    async fn registry_rejects_duplicate_start_and_stops_cleanly() {
        let registry = EngineRegistry::new();
        let pool_id = Uuid::new_v4();
        let feed: Arc<dyn PriceFeed> = Arc::new(FixedPriceFeed::new(100.0));
        let sink: Arc<dyn QuoteSink> = Arc::new(RecordingSink::default());

        registry
            .start(
                pool_id,
                active_config(),
                balanced_inventory(),
                Arc::clone(&feed),
                Arc::clone(&sink),
            )
            .unwrap();
        assert!(registry.is_running(pool_id));

        let err = registry
            .start(pool_id, active_config(), balanced_inventory(), feed, sink)
            .unwrap_err();
        assert!(matches!(err, MmtError::AlreadyRunning(p) if p == pool_id));

        registry.stop(pool_id).await.unwrap();
        assert!(!registry.is_running(pool_id));
        assert!(matches!(
            registry.stop(pool_id).await,
            Err(MmtError::NotRunning(_))
        ));
    }

    #[tokio::test]
    async fn registry_update_config_reaches_engine() {
        let registry = EngineRegistry::new();
        let pool_id = Uuid::new_v4();
        let feed: Arc<dyn PriceFeed> = Arc::new(FixedPriceFeed::new(100.0));
        let sink: Arc<dyn QuoteSink> = Arc::new(RecordingSink::default());

        registry
            .start(pool_id, active_config(), balanced_inventory(), feed, sink)
            .unwrap();

        let updated = StrategyConfig {
            base_spread: 3.0,
            ..active_config()
        };
        registry.update_config(pool_id, updated.clone()).await.unwrap();

        let status = registry.status().await;
        assert_eq!(status.len(), 1);
        assert_eq!(status[0].config.base_spread, 3.0);

        registry.stop(pool_id).await.unwrap();
    }

    #[tokio::test]
    async fn registry_start_validates_config() {
        let registry = EngineRegistry::new();
        let bad = StrategyConfig {
            check_interval: 0,
            ..active_config()
        };
        let feed: Arc<dyn PriceFeed> = Arc::new(FixedPriceFeed::new(100.0));
        let sink: Arc<dyn QuoteSink> = Arc::new(RecordingSink::default());

        let err = registry
            .start(Uuid::new_v4(), bad, balanced_inventory(), feed, sink)
            .unwrap_err();
        assert!(matches!(err, MmtError::Configuration(_)));
    }
}
