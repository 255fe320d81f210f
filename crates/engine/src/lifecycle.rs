use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{info, warn};

use common::{
    Candle, EngineEvent, Error, ExecutionSettings, Market, Quote, Result, StrategyId, Trade,
};

use crate::session::{CycleReport, SessionSnapshot, StrategyStatus, TradingSession};
use crate::stats::Statistics;

/// Requests processed by the engine task, one at a time.
enum EngineRequest {
    Refresh {
        candles: Vec<Candle>,
        reply: oneshot::Sender<CycleReport>,
    },
    Tick {
        candle: Candle,
        reply: oneshot::Sender<CycleReport>,
    },
    Arm {
        strategy: StrategyId,
        reply: oneshot::Sender<bool>,
    },
    Disarm {
        strategy: StrategyId,
        reply: oneshot::Sender<bool>,
    },
    CloseTrade {
        id: String,
        reply: oneshot::Sender<Option<Trade>>,
    },
    SetExecutionSettings {
        settings: ExecutionSettings,
        reply: oneshot::Sender<()>,
    },
    ResetSession {
        reply: oneshot::Sender<()>,
    },
    SetMarket {
        market: Market,
        reply: oneshot::Sender<()>,
    },
    Strategies {
        reply: oneshot::Sender<Vec<StrategyStatus>>,
    },
    OpenTrades {
        reply: oneshot::Sender<Vec<Trade>>,
    },
    Quote {
        reply: oneshot::Sender<Quote>,
    },
    Statistics {
        reply: oneshot::Sender<Statistics>,
    },
    ExecutionSettings {
        reply: oneshot::Sender<ExecutionSettings>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
}

/// Cloneable handle passed to the feed timers and the API.
#[derive(Clone)]
pub struct EngineHandle {
    request_tx: mpsc::Sender<EngineRequest>,
    event_tx: broadcast::Sender<EngineEvent>,
    market_rx: watch::Receiver<Market>,
}

impl EngineHandle {
    /// Replace the candle series and run an evaluation cycle.
    pub async fn price_refresh(&self, candles: Vec<Candle>) -> Result<CycleReport> {
        self.request(|reply| EngineRequest::Refresh { candles, reply }).await
    }

    /// Overwrite the latest candle and run an evaluation cycle.
    pub async fn price_tick(&self, candle: Candle) -> Result<CycleReport> {
        self.request(|reply| EngineRequest::Tick { candle, reply }).await
    }

    pub async fn arm_strategy(&self, strategy: StrategyId) -> Result<bool> {
        self.request(|reply| EngineRequest::Arm { strategy, reply }).await
    }

    pub async fn disarm_strategy(&self, strategy: StrategyId) -> Result<bool> {
        self.request(|reply| EngineRequest::Disarm { strategy, reply }).await
    }

    pub async fn close_trade(&self, id: impl Into<String>) -> Result<Option<Trade>> {
        let id = id.into();
        self.request(|reply| EngineRequest::CloseTrade { id, reply }).await
    }

    pub async fn set_execution_settings(&self, settings: ExecutionSettings) -> Result<()> {
        self.request(|reply| EngineRequest::SetExecutionSettings { settings, reply })
            .await
    }

    pub async fn reset_session(&self) -> Result<()> {
        self.request(|reply| EngineRequest::ResetSession { reply }).await
    }

    /// Switch symbol and timeframe. Feeds watching `market_updates` are
    /// notified once the session has switched.
    pub async fn set_market(&self, market: Market) -> Result<()> {
        self.request(|reply| EngineRequest::SetMarket { market, reply }).await
    }

    /// The market currently watched.
    pub fn market(&self) -> Market {
        self.market_rx.borrow().clone()
    }

    /// Receiver that wakes on every market switch.
    pub fn market_updates(&self) -> watch::Receiver<Market> {
        self.market_rx.clone()
    }

    pub async fn strategies(&self) -> Result<Vec<StrategyStatus>> {
        self.request(|reply| EngineRequest::Strategies { reply }).await
    }

    pub async fn open_trades(&self) -> Result<Vec<Trade>> {
        self.request(|reply| EngineRequest::OpenTrades { reply }).await
    }

    pub async fn quote(&self) -> Result<Quote> {
        self.request(|reply| EngineRequest::Quote { reply }).await
    }

    pub async fn statistics(&self) -> Result<Statistics> {
        self.request(|reply| EngineRequest::Statistics { reply }).await
    }

    pub async fn execution_settings(&self) -> Result<ExecutionSettings> {
        self.request(|reply| EngineRequest::ExecutionSettings { reply }).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        self.request(|reply| EngineRequest::Snapshot { reply }).await
    }

    /// Subscribe to engine events (trades, rejections, arm/disarm).
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> EngineRequest,
    ) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request_tx
            .send(build(reply_tx))
            .await
            .map_err(|_| Error::EngineUnavailable("engine task has stopped".into()))?;
        reply_rx
            .await
            .map_err(|_| Error::EngineUnavailable("engine dropped the request".into()))
    }
}

/// Single-writer owner of the `TradingSession`.
///
/// Requests are handled strictly in arrival order, so evaluation cycles
/// never interleave with each other or with commands.
pub struct Engine {
    session: TradingSession,
    request_rx: mpsc::Receiver<EngineRequest>,
    event_tx: broadcast::Sender<EngineEvent>,
    market_tx: watch::Sender<Market>,
}

impl Engine {
    pub fn new(session: TradingSession) -> (Self, EngineHandle) {
        let (request_tx, request_rx) = mpsc::channel(64);
        let (event_tx, _) = broadcast::channel(256);
        let (market_tx, market_rx) = watch::channel(session.market());

        let handle = EngineHandle {
            request_tx,
            event_tx: event_tx.clone(),
            market_rx,
        };

        let engine = Engine {
            session,
            request_rx,
            event_tx,
            market_tx,
        };

        (engine, handle)
    }

    /// Run the engine until every handle is dropped. Call from `tokio::spawn`.
    pub async fn run(mut self) {
        info!(symbol = %self.session.symbol(), armed = ?self.session.armed(), "Engine running");

        while let Some(request) = self.request_rx.recv().await {
            self.handle(request);
        }

        warn!("Engine request channel closed - shutting down");
    }

    fn handle(&mut self, request: EngineRequest) {
        match request {
            EngineRequest::Refresh { candles, reply } => {
                let report = self.session.on_price_refresh(candles);
                self.publish_cycle(&report);
                let _ = reply.send(report);
            }
            EngineRequest::Tick { candle, reply } => {
                let report = self.session.on_price_tick(candle);
                self.publish_cycle(&report);
                let _ = reply.send(report);
            }
            EngineRequest::Arm { strategy, reply } => {
                let changed = self.session.arm_strategy(strategy);
                if changed {
                    self.publish(EngineEvent::StrategyArmed { strategy });
                }
                let _ = reply.send(changed);
            }
            EngineRequest::Disarm { strategy, reply } => {
                let changed = self.session.disarm_strategy(strategy);
                if changed {
                    self.publish(EngineEvent::StrategyDisarmed { strategy });
                }
                let _ = reply.send(changed);
            }
            EngineRequest::CloseTrade { id, reply } => {
                let closed = self.session.close_trade(&id);
                if let Some(trade) = &closed {
                    self.publish(EngineEvent::TradeClosed {
                        id: trade.id.clone(),
                    });
                }
                let _ = reply.send(closed);
            }
            EngineRequest::SetExecutionSettings { settings, reply } => {
                info!(
                    volume = settings.effective_volume(),
                    stop_loss = ?settings.stop_loss,
                    take_profit = ?settings.take_profit,
                    "Execution settings updated"
                );
                self.session.set_execution_settings(settings);
                let _ = reply.send(());
            }
            EngineRequest::ResetSession { reply } => {
                self.session.reset_session();
                self.publish(EngineEvent::SessionReset);
                let _ = reply.send(());
            }
            EngineRequest::SetMarket { market, reply } => {
                self.session.set_market(market.clone());
                self.market_tx.send_replace(market.clone());
                self.publish(EngineEvent::MarketChanged { market });
                let _ = reply.send(());
            }
            EngineRequest::Strategies { reply } => {
                let _ = reply.send(self.session.strategies());
            }
            EngineRequest::OpenTrades { reply } => {
                let _ = reply.send(self.session.open_trades().to_vec());
            }
            EngineRequest::Quote { reply } => {
                let _ = reply.send(self.session.quote());
            }
            EngineRequest::Statistics { reply } => {
                let _ = reply.send(self.session.statistics());
            }
            EngineRequest::ExecutionSettings { reply } => {
                let _ = reply.send(self.session.execution_settings());
            }
            EngineRequest::Snapshot { reply } => {
                let _ = reply.send(self.session.snapshot());
            }
        }
    }

    fn publish_cycle(&self, report: &CycleReport) {
        for event in report.events() {
            self.publish(event);
        }
    }

    fn publish(&self, event: EngineEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }
}
