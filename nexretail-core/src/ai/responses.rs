//! Response Parsing Module
//!
//! Parses JSON responses from the reasoning service into forecast and
//! anomaly records. These records are derived per request and never
//! written back into the store.

use crate::ai::client::AiError;
use crate::models::Product;
use serde::{Deserialize, Serialize};

/// Predicted demand for one product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiForecastResult {
    /// Usually the product name; the model is asked to key by name
    pub product_id: String,
    pub product_name: String,
    pub predicted_demand: f64,
    /// 0-100
    pub confidence_score: f64,
    pub reasoning: String,
}

/// Risk assessment for one ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnomalyResult {
    pub transaction_id: String,
    /// 0-100
    pub risk_score: f64,
    pub is_anomaly: bool,
    pub explanation: String,
}

/// Extract JSON from a response that may contain markdown code blocks
fn extract_json(response: &str) -> &str {
    // Look for JSON in markdown code block
    if let Some(start) = response.find("```json") {
        let json_start = start + 7; // Skip "```json"
        if let Some(end) = response[json_start..].find("```") {
            return response[json_start..json_start + end].trim();
        }
    }

    // Look for generic code block
    if let Some(start) = response.find("```") {
        let code_start = start + 3;
        let json_start = match response[code_start..].find('\n') {
            Some(newline) => code_start + newline + 1,
            None => code_start,
        };
        if let Some(end) = response[json_start..].find("```") {
            return response[json_start..json_start + end].trim();
        }
    }

    // Try to find a JSON array directly
    if let Some(start) = response.find('[') {
        if let Some(end) = response.rfind(']') {
            if end > start {
                return &response[start..=end];
            }
        }
    }

    response.trim()
}

/// Parse forecast response from AI
pub fn parse_forecast_response(response: &str) -> Result<Vec<AiForecastResult>, AiError> {
    let json_str = extract_json(response);
    serde_json::from_str(json_str).map_err(|e| {
        AiError::InvalidResponse(format!(
            "Failed to parse forecast response: {}. JSON: {}",
            e,
            json_str.chars().take(200).collect::<String>()
        ))
    })
}

/// Parse anomaly response from AI
pub fn parse_anomaly_response(response: &str) -> Result<Vec<AiAnomalyResult>, AiError> {
    let json_str = extract_json(response);
    serde_json::from_str(json_str).map_err(|e| {
        AiError::InvalidResponse(format!(
            "Failed to parse anomaly response: {}. JSON: {}",
            e,
            json_str.chars().take(200).collect::<String>()
        ))
    })
}

/// Forecast entry for a product, matched by id or by name
pub fn forecast_for<'a>(
    results: &'a [AiForecastResult],
    product: &Product,
) -> Option<&'a AiForecastResult> {
    results.iter().find(|r| {
        r.product_id == product.id || r.product_id == product.name || r.product_name == product.name
    })
}

/// Only the entries the model marked as anomalies
pub fn flagged(results: &[AiAnomalyResult]) -> Vec<&AiAnomalyResult> {
    results.iter().filter(|r| r.is_anomaly).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::demo_products;

    #[test]
    fn test_parse_forecast_from_markdown() {
        let response = r#"Here is the forecast:

```json
[
  {
    "productId": "Pixel 9 Pro",
    "productName": "Pixel 9 Pro",
    "predictedDemand": 30,
    "confidenceScore": 85,
    "reasoning": "Fast moving"
  }
]
```"#;

        let results = parse_forecast_response(response).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].predicted_demand, 30.0);
        assert_eq!(results[0].reasoning, "Fast moving");
    }

    #[test]
    fn test_parse_anomalies_bare_array() {
        let response = r#"[{"transactionId":"TX-005","riskScore":92,"isAnomaly":true,"explanation":"Very large round amount"},
{"transactionId":"TX-001","riskScore":5,"isAnomaly":false,"explanation":"Normal"}]"#;

        let results = parse_anomaly_response(response).unwrap();
        assert_eq!(results.len(), 2);
        let flagged = flagged(&results);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].transaction_id, "TX-005");
    }

    #[test]
    fn test_parse_invalid_response() {
        let err = parse_anomaly_response("I cannot help with that").unwrap_err();
        assert!(matches!(err, AiError::InvalidResponse(_)));
    }

    #[test]
    fn test_extract_json_generic_block() {
        let response = "```\n[]\n```";
        assert_eq!(extract_json(response), "[]");
    }

    #[test]
    fn test_forecast_for_matches_name_or_id() {
        let products = demo_products();
        let results = vec![AiForecastResult {
            product_id: "Galaxy Tab S9".to_string(),
            product_name: "Galaxy Tab S9".to_string(),
            predicted_demand: 12.0,
            confidence_score: 70.0,
            reasoning: String::new(),
        }];

        assert!(forecast_for(&results, &products[2]).is_some());
        assert!(forecast_for(&results, &products[0]).is_none());
    }
}
