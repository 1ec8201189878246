//! Assistant operations with fallbacks
//!
//! Failures of the reasoning service never reach the caller: chat degrades
//! to a fixed apology and the analyses degrade to an empty result.

use log::warn;

use crate::ai::client::{AiError, ReasoningService};
use crate::ai::prompts;
use crate::ai::responses::{self, AiAnomalyResult, AiForecastResult};
use crate::models::{Product, Transaction};
use crate::summary::recent_transactions;

/// Answer given when no API key is configured
pub const NOT_CONFIGURED_REPLY: &str =
    "Sorry, the API key has not been configured. I cannot process your data.";

/// Answer given when the service could not be reached or failed
pub const SERVICE_BUSY_REPLY: &str = "Sorry, the service is busy right now.";

/// Answer given when the service returned nothing
pub const NOT_UNDERSTOOD_REPLY: &str = "I did not understand that question.";

/// Ask a free-text question about the current store digest
pub fn ask(service: &dyn ReasoningService, query: &str, digest: &str, locale: &str) -> String {
    let prompt = prompts::build_assistant_prompt(query, digest, locale);
    match service.generate(&prompt) {
        Ok(answer) if answer.trim().is_empty() => NOT_UNDERSTOOD_REPLY.to_string(),
        Ok(answer) => answer.trim().to_string(),
        Err(AiError::ApiKeyMissing) => {
            warn!("Assistant query skipped: API key missing");
            NOT_CONFIGURED_REPLY.to_string()
        }
        Err(e) => {
            warn!("Assistant query failed: {}", e);
            SERVICE_BUSY_REPLY.to_string()
        }
    }
}

/// Predict next month's demand for each product
pub fn forecast(
    service: &dyn ReasoningService,
    products: &[Product],
    locale: &str,
) -> Vec<AiForecastResult> {
    let prompt = prompts::build_forecast_prompt(products, locale);
    service
        .generate(&prompt)
        .and_then(|response| responses::parse_forecast_response(&response))
        .unwrap_or_else(|e| {
            warn!("AI forecast failed: {}", e);
            Vec::new()
        })
}

/// Review the latest `limit` ledger entries for anomalies
pub fn audit(
    service: &dyn ReasoningService,
    transactions: &[Transaction],
    limit: usize,
    locale: &str,
) -> Vec<AiAnomalyResult> {
    let window = recent_transactions(transactions, limit);
    let prompt = prompts::build_anomaly_prompt(window, locale);
    service
        .generate(&prompt)
        .and_then(|response| responses::parse_anomaly_response(&response))
        .unwrap_or_else(|e| {
            warn!("AI anomaly audit failed: {}", e);
            Vec::new()
        })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Fake service returning a canned response and recording prompts
    pub struct CannedService {
        pub reply: Result<String, fn() -> AiError>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl CannedService {
        pub fn ok(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(error: fn() -> AiError) -> Self {
            Self {
                reply: Err(error),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl ReasoningService for CannedService {
        fn generate(&self, prompt: &str) -> Result<String, AiError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Ok(reply) => Ok(reply.clone()),
                Err(make) => Err(make()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::CannedService;
    use super::*;
    use crate::models::{demo_products, demo_transactions, TransactionType};
    use crate::store::RecordStore;

    #[test]
    fn test_ask_returns_answer() {
        let service = CannedService::ok("  Revenue is Rp 287 million.\n");
        let answer = ask(&service, "Total sales?", "digest", "id-ID");
        assert_eq!(answer, "Revenue is Rp 287 million.");
    }

    #[test]
    fn test_ask_without_key_apologizes() {
        let service = CannedService::failing(|| AiError::ApiKeyMissing);
        assert_eq!(ask(&service, "q", "d", "id-ID"), NOT_CONFIGURED_REPLY);
    }

    #[test]
    fn test_ask_transport_failure_apologizes() {
        let service = CannedService::failing(|| AiError::ApiRequestFailed("timeout".into()));
        assert_eq!(ask(&service, "q", "d", "id-ID"), SERVICE_BUSY_REPLY);
    }

    #[test]
    fn test_ask_empty_answer() {
        let service = CannedService::ok("   ");
        assert_eq!(ask(&service, "q", "d", "id-ID"), NOT_UNDERSTOOD_REPLY);
    }

    #[test]
    fn test_forecast_failure_is_empty() {
        let service = CannedService::failing(|| AiError::RateLimited);
        assert!(forecast(&service, &demo_products(), "id-ID").is_empty());

        let garbage = CannedService::ok("not json at all");
        assert!(forecast(&garbage, &demo_products(), "id-ID").is_empty());
    }

    #[test]
    fn test_audit_limits_window() {
        let service = CannedService::ok(
            r#"[{"transactionId":"TX-001","riskScore":10,"isAnomaly":false,"explanation":"ok"}]"#,
        );
        let results = audit(&service, &demo_transactions(), 2, "id-ID");
        assert_eq!(results.len(), 1);

        let prompts = service.prompts.lock().unwrap();
        assert!(prompts[0].contains("TX-005"));
        assert!(prompts[0].contains("TX-006"));
        assert!(!prompts[0].contains("TX-004"));
    }

    #[test]
    fn test_audit_sees_newest_entry() {
        let mut store = RecordStore::new();
        for i in 0..30 {
            let sale = Transaction::new(TransactionType::Sale, 1_000.0 + i as f64, "Counter sale");
            store.create(sale).unwrap();
        }
        let refund = Transaction::new(TransactionType::Refund, 999_000_000.0, "Large refund");
        let newest = store.create(refund).unwrap();
        assert_eq!(newest, "TX-031");

        let service = CannedService::ok("[]");
        audit(&service, store.transactions(), 30, "id-ID");

        let prompts = service.prompts.lock().unwrap();
        assert!(prompts[0].contains("TX-031"));
        assert!(!prompts[0].contains("TX-001"));
    }
}
