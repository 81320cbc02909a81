//! In-crate fakes for the engine's trait seams.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use dca_core::{FillEvent, TargetMap};
use dca_td::{Balance, ExchangeGateway, GatewayError, GatewayResult, HistoricalOrder, OrderInfo, PlacedOrder};

use crate::fx::RateSource;
use crate::notify::{Notification, Notifier};
use crate::store::{StoreError, TargetStore};

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// How the fake venue answers `place_market_buy`.
#[derive(Debug, Clone)]
pub enum PlaceBehavior {
    Accept,
    Reject(i64),
    Timeout,
}

pub struct FakeGateway {
    pub place: PlaceBehavior,
    /// `None` makes `order_info` fail.
    pub info: Option<OrderInfo>,
    pub placed: Mutex<Vec<(String, f64)>>,
    /// Returned by `order_history` for every symbol.
    pub history: Vec<HistoricalOrder>,
    next_id: AtomicUsize,
}

impl FakeGateway {
    pub fn new(place: PlaceBehavior, info: Option<OrderInfo>) -> Self {
        Self {
            place,
            info,
            placed: Mutex::new(Vec::new()),
            history: Vec::new(),
            next_id: AtomicUsize::new(1),
        }
    }

    /// Venue that fills every order at `price` per base unit.
    pub fn filling_at(price: f64) -> Self {
        Self::new(
            PlaceBehavior::Accept,
            Some(OrderInfo {
                order_id: String::new(),
                filled: None,
                total: None,
                status: Some("filled".into()),
                fills: vec![FillEvent::new(0.0, price)],
                ts: None,
            }),
        )
    }

    pub fn with_history(mut self, history: Vec<HistoricalOrder>) -> Self {
        self.history = history;
        self
    }

    pub fn placements(&self) -> Vec<(String, f64)> {
        self.placed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExchangeGateway for FakeGateway {
    fn name(&self) -> &str {
        "fake"
    }

    async fn place_market_buy(&self, symbol: &str, amount_quote: f64) -> GatewayResult<PlacedOrder> {
        match &self.place {
            PlaceBehavior::Reject(code) => Err(GatewayError::Venue {
                code: *code,
                message: "rejected".into(),
            }),
            PlaceBehavior::Timeout => Err(GatewayError::Transport("timed out".into())),
            PlaceBehavior::Accept => {
                self.placed.lock().unwrap().push((symbol.to_string(), amount_quote));
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                Ok(PlacedOrder {
                    order_id: id.to_string(),
                    amount_quote,
                    ts: Some(1_750_000_000),
                })
            }
        }
    }

    async fn order_info(&self, _symbol: &str, order_id: &str) -> GatewayResult<OrderInfo> {
        let mut info = self
            .info
            .clone()
            .ok_or_else(|| GatewayError::Decode("no order info".into()))?;
        info.order_id = order_id.to_string();
        // A template fill with amount 0 spends the whole placed amount.
        if let Some((_, amount)) = self.placed.lock().unwrap().last().cloned() {
            for f in info.fills.iter_mut().filter(|f| f.amount == 0.0) {
                f.amount = amount;
            }
            if info.filled.is_none() && info.total.is_none() {
                info.filled = Some(amount);
            }
        }
        Ok(info)
    }

    async fn balances(&self) -> GatewayResult<BTreeMap<String, Balance>> {
        Ok(BTreeMap::from([(
            "THB".to_string(),
            Balance {
                available: 1000.0,
                reserved: 0.0,
            },
        )]))
    }

    async fn order_history(&self, _symbol: &str) -> GatewayResult<Vec<HistoricalOrder>> {
        Ok(self.history.clone())
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Store whose `put` and `create` fail with queued errors before succeeding.
pub struct ScriptedStore {
    pub map: Mutex<Option<TargetMap>>,
    pub put_errors: Mutex<Vec<StoreError>>,
    pub create_errors: Mutex<Vec<StoreError>>,
    pub puts: AtomicUsize,
    pub creates: AtomicUsize,
}

impl ScriptedStore {
    /// `put_errors` are returned in order, one per `put` call.
    pub fn new(map: Option<TargetMap>, put_errors: Vec<StoreError>) -> Self {
        let mut put_errors = put_errors;
        put_errors.reverse();
        Self {
            map: Mutex::new(map),
            put_errors: Mutex::new(put_errors),
            create_errors: Mutex::new(Vec::new()),
            puts: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
        }
    }

    /// `create_errors` are returned in order, one per `create` call.
    pub fn with_create_errors(self, mut create_errors: Vec<StoreError>) -> Self {
        create_errors.reverse();
        *self.create_errors.lock().unwrap() = create_errors;
        self
    }

    pub fn stored(&self) -> Option<TargetMap> {
        self.map.lock().unwrap().clone()
    }
}

#[async_trait]
impl TargetStore for ScriptedStore {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn get(&self) -> Result<TargetMap, StoreError> {
        self.stored().ok_or(StoreError::NotFound)
    }

    async fn put(&self, map: &TargetMap) -> Result<(), StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.put_errors.lock().unwrap().pop() {
            return Err(e);
        }
        if self.map.lock().unwrap().is_none() {
            return Err(StoreError::NotFound);
        }
        *self.map.lock().unwrap() = Some(map.clone());
        Ok(())
    }

    async fn create(&self, map: &TargetMap) -> Result<(), StoreError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.create_errors.lock().unwrap().pop() {
            return Err(e);
        }
        *self.map.lock().unwrap() = Some(map.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Notifier / rates
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        if self.fail { Err(anyhow!("webhook down")) } else { Ok(()) }
    }
}

pub struct FixedRate(pub Option<f64>);

#[async_trait]
impl RateSource for FixedRate {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn fetch(&self) -> Result<f64> {
        self.0.ok_or_else(|| anyhow!("rate source down"))
    }
}
