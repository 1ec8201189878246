//! Assistant request dispatcher
//!
//! Runs reasoning-service calls off the interaction thread. Every request
//! gets a monotonically increasing id; only the latest request per feature
//! is delivered, so a result that arrives after a newer request was made
//! is dropped instead of overwriting fresher output.

use log::debug;
use std::collections::HashMap;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use crate::ai::assistant;
use crate::ai::client::ReasoningService;
use crate::ai::responses::{AiAnomalyResult, AiForecastResult};
use crate::config::Config;
use crate::models::{Product, Transaction};

/// Independent trigger points, each with its own loading indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssistantFeature {
    Chat,
    Forecast,
    Audit,
}

/// Identifies one submitted request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

/// Work to hand to the reasoning service. Inputs are snapshots taken at submission.
#[derive(Debug, Clone)]
pub enum AssistantRequest {
    Chat { query: String, digest: String },
    Forecast { products: Vec<Product> },
    Audit { transactions: Vec<Transaction> },
}

impl AssistantRequest {
    pub fn feature(&self) -> AssistantFeature {
        match self {
            AssistantRequest::Chat { .. } => AssistantFeature::Chat,
            AssistantRequest::Forecast { .. } => AssistantFeature::Forecast,
            AssistantRequest::Audit { .. } => AssistantFeature::Audit,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssistantReply {
    Chat(String),
    Forecast(Vec<AiForecastResult>),
    Audit(Vec<AiAnomalyResult>),
}

/// A finished request
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub id: RequestId,
    pub feature: AssistantFeature,
    pub reply: AssistantReply,
}

/// Settings passed to every worker
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub locale: String,
    pub anomaly_limit: usize,
}

impl From<&Config> for DispatcherSettings {
    fn from(config: &Config) -> Self {
        Self {
            locale: config.locale.clone(),
            anomaly_limit: config.anomaly_transaction_limit,
        }
    }
}

/// Dispatches assistant requests to worker threads
pub struct AssistantDispatcher {
    service: Arc<dyn ReasoningService>,
    settings: DispatcherSettings,
    next_id: u64,
    /// Latest request per feature that has not been delivered yet
    pending: HashMap<AssistantFeature, RequestId>,
    /// Accepted completions not yet handed out
    ready: Vec<Completion>,
    result_tx: mpsc::Sender<Completion>,
    result_rx: mpsc::Receiver<Completion>,
}

impl AssistantDispatcher {
    pub fn new(service: Arc<dyn ReasoningService>, settings: DispatcherSettings) -> Self {
        let (result_tx, result_rx) = mpsc::channel();
        Self {
            service,
            settings,
            next_id: 1,
            pending: HashMap::new(),
            ready: Vec::new(),
            result_tx,
            result_rx,
        }
    }

    /// Start a request; any earlier request for the same feature is superseded
    pub fn submit(&mut self, request: AssistantRequest) -> RequestId {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        let feature = request.feature();
        if let Some(previous) = self.pending.insert(feature, id) {
            debug!("{:?} request {:?} superseded by {:?}", feature, previous, id);
        }

        let service = Arc::clone(&self.service);
        let settings = self.settings.clone();
        let result_tx = self.result_tx.clone();
        thread::spawn(move || {
            let reply = run_request(service.as_ref(), &settings, request);
            // Receiver gone means the dispatcher was dropped
            let _ = result_tx.send(Completion { id, feature, reply });
        });

        id
    }

    /// Whether a request for the feature is still in flight
    pub fn is_pending(&self, feature: AssistantFeature) -> bool {
        self.pending.contains_key(&feature)
    }

    /// Forget the in-flight request for a feature; its result will be dropped
    pub fn cancel(&mut self, feature: AssistantFeature) {
        if let Some(id) = self.pending.remove(&feature) {
            debug!("{:?} request {:?} cancelled", feature, id);
        }
    }

    /// Collect every completion that arrived, latest requests only
    pub fn poll(&mut self) -> Vec<Completion> {
        while let Ok(completion) = self.result_rx.try_recv() {
            self.accept(completion);
        }
        std::mem::take(&mut self.ready)
    }

    /// Block until the pending request for `feature` completes
    ///
    /// Returns `None` when nothing is pending for the feature or the
    /// timeout elapses. Completions for other features are kept for `poll`.
    pub fn wait_for(
        &mut self,
        feature: AssistantFeature,
        timeout: Option<Duration>,
    ) -> Option<Completion> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            if let Some(pos) = self.ready.iter().position(|c| c.feature == feature) {
                return Some(self.ready.remove(pos));
            }
            if !self.is_pending(feature) {
                return None;
            }

            let received = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    self.result_rx.recv_timeout(remaining).ok()
                }
                None => self.result_rx.recv().ok(),
            };
            match received {
                Some(completion) => self.accept(completion),
                None => return None,
            }
        }
    }

    fn accept(&mut self, completion: Completion) {
        if self.pending.get(&completion.feature) == Some(&completion.id) {
            self.pending.remove(&completion.feature);
            self.ready.push(completion);
        } else {
            debug!(
                "Discarding stale {:?} result {:?}",
                completion.feature, completion.id
            );
        }
    }
}

fn run_request(
    service: &dyn ReasoningService,
    settings: &DispatcherSettings,
    request: AssistantRequest,
) -> AssistantReply {
    match request {
        AssistantRequest::Chat { query, digest } => {
            AssistantReply::Chat(assistant::ask(service, &query, &digest, &settings.locale))
        }
        AssistantRequest::Forecast { products } => {
            AssistantReply::Forecast(assistant::forecast(service, &products, &settings.locale))
        }
        AssistantRequest::Audit { transactions } => AssistantReply::Audit(assistant::audit(
            service,
            &transactions,
            settings.anomaly_limit,
            &settings.locale,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::assistant::testing::CannedService;
    use crate::ai::client::AiError;
    use crate::models::demo_products;
    use std::sync::Mutex;

    /// Replies with the quoted user question, holding back "slow" ones until released
    struct EchoService {
        gate: Mutex<mpsc::Receiver<()>>,
    }

    impl ReasoningService for EchoService {
        fn generate(&self, prompt: &str) -> Result<String, AiError> {
            let query = prompt
                .lines()
                .find(|l| l.starts_with("User question"))
                .unwrap_or_default()
                .to_string();
            if query.contains("slow") {
                let _ = self.gate.lock().unwrap().recv();
            }
            Ok(query)
        }
    }

    fn settings() -> DispatcherSettings {
        DispatcherSettings::from(&Config::default())
    }

    fn chat(query: &str) -> AssistantRequest {
        AssistantRequest::Chat {
            query: query.to_string(),
            digest: "digest".to_string(),
        }
    }

    #[test]
    fn test_request_ids_increase() {
        let mut dispatcher =
            AssistantDispatcher::new(Arc::new(CannedService::ok("[]")), settings());
        let a = dispatcher.submit(chat("a"));
        let b = dispatcher.submit(AssistantRequest::Forecast {
            products: demo_products(),
        });
        assert!(b > a);
    }

    #[test]
    fn test_completion_clears_pending() {
        let mut dispatcher =
            AssistantDispatcher::new(Arc::new(CannedService::ok("Fine.")), settings());
        let id = dispatcher.submit(chat("How are sales?"));
        assert!(dispatcher.is_pending(AssistantFeature::Chat));

        let completion = dispatcher
            .wait_for(AssistantFeature::Chat, Some(Duration::from_secs(5)))
            .unwrap();
        assert_eq!(completion.id, id);
        assert_eq!(completion.reply, AssistantReply::Chat("Fine.".to_string()));
        assert!(!dispatcher.is_pending(AssistantFeature::Chat));
    }

    #[test]
    fn test_superseded_result_is_discarded() {
        let (release, gate) = mpsc::channel();
        let service = EchoService {
            gate: Mutex::new(gate),
        };
        let mut dispatcher = AssistantDispatcher::new(Arc::new(service), settings());

        let first = dispatcher.submit(chat("slow question"));
        let second = dispatcher.submit(chat("second question"));

        let completion = dispatcher
            .wait_for(AssistantFeature::Chat, Some(Duration::from_secs(5)))
            .unwrap();
        assert_eq!(completion.id, second);
        match completion.reply {
            AssistantReply::Chat(text) => assert!(text.contains("second question")),
            other => panic!("unexpected reply {:?}", other),
        }

        // Let the first request finish; it must never be delivered
        release.send(()).unwrap();
        thread::sleep(Duration::from_millis(100));
        let late = dispatcher.poll();
        assert!(late.iter().all(|c| c.id != first));
    }

    #[test]
    fn test_features_do_not_supersede_each_other() {
        let mut dispatcher =
            AssistantDispatcher::new(Arc::new(CannedService::ok("[]")), settings());
        dispatcher.submit(AssistantRequest::Forecast {
            products: demo_products(),
        });
        dispatcher.submit(AssistantRequest::Audit {
            transactions: Vec::new(),
        });

        let audit = dispatcher
            .wait_for(AssistantFeature::Audit, Some(Duration::from_secs(5)))
            .unwrap();
        assert_eq!(audit.reply, AssistantReply::Audit(Vec::new()));

        let forecast = dispatcher
            .wait_for(AssistantFeature::Forecast, Some(Duration::from_secs(5)))
            .unwrap();
        assert_eq!(forecast.reply, AssistantReply::Forecast(Vec::new()));
    }

    #[test]
    fn test_cancelled_request_is_dropped() {
        let mut dispatcher =
            AssistantDispatcher::new(Arc::new(CannedService::ok("late")), settings());
        dispatcher.submit(chat("anything"));
        dispatcher.cancel(AssistantFeature::Chat);

        assert!(dispatcher
            .wait_for(AssistantFeature::Chat, Some(Duration::from_millis(10)))
            .is_none());
        thread::sleep(Duration::from_millis(100));
        assert!(dispatcher.poll().is_empty());
    }

    #[test]
    fn test_wait_without_pending_returns_none() {
        let mut dispatcher =
            AssistantDispatcher::new(Arc::new(CannedService::ok("x")), settings());
        assert!(dispatcher.wait_for(AssistantFeature::Forecast, None).is_none());
    }
}
