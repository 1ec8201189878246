//! Prompt Templates for AI Operations
//!
//! Builds the prompts sent to the reasoning service. The store digest is
//! embedded verbatim so answers are grounded in live figures.

use serde_json::json;

use crate::models::{Product, Transaction};

/// Human language matching a BCP-47 locale, used to steer answers
pub fn language_for_locale(locale: &str) -> &'static str {
    match locale.split(['-', '_']).next().unwrap_or("") {
        "id" => "Indonesian",
        "ms" => "Malay",
        "nl" => "Dutch",
        "de" => "German",
        "fr" => "French",
        "es" => "Spanish",
        "ja" => "Japanese",
        _ => "English",
    }
}

/// Prompt for the voice/chat assistant
pub fn build_assistant_prompt(query: &str, digest: &str, locale: &str) -> String {
    format!(
        r#"System: You are 'NexAI', the voice assistant for the manager of the electronics store 'NexRetail'.
Style: professional, brief and genuinely helpful, like a personal assistant.

Real-time data context (DO NOT INVENT FIGURES, USE THIS DATA):
{digest}

User question (spoken or typed): "{query}"

Instructions:
1. Answer the point directly. Do not ramble.
2. When the question is about data in the context, answer with the specific numbers.
3. Express money in Rupiah (millions/billions).
4. Give a short suggestion when relevant (e.g. "Stock of X is low, reorder soon").
5. Reply in {language}."#,
        digest = digest.trim(),
        query = query.trim(),
        language = language_for_locale(locale),
    )
}

/// Prompt asking for next month's demand per product
pub fn build_forecast_prompt(products: &[Product], locale: &str) -> String {
    let context: Vec<_> = products
        .iter()
        .map(|p| {
            json!({
                "name": p.name,
                "currentStock": p.stock_level,
                "category": p.category.to_string(),
                "reorderPoint": p.reorder_point,
            })
        })
        .collect();

    format!(
        r#"Act as an expert supply chain analyst for an electronics retailer in Indonesia.
Analyze the following product inventory data: {context}

Task: predict demand for next month.
Remember that laptops and phones turn over quickly in the Indonesian market.

Return ONLY a valid JSON array (no markdown formatting):
[
    {{
        "productId": "string (use the name as the ID)",
        "productName": "string",
        "predictedDemand": number,
        "confidenceScore": number (0-100),
        "reasoning": "string (short explanation in {language})"
    }}
]"#,
        context = serde_json::Value::Array(context),
        language = language_for_locale(locale),
    )
}

/// Prompt asking for a fraud/anomaly review of ledger entries
pub fn build_anomaly_prompt(transactions: &[Transaction], locale: &str) -> String {
    let context = serde_json::to_string(transactions).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"Act as a forensic accounting AI.
Analyze these financial transactions for potential fraud or data anomalies: {context}

Look for:
- Amounts that are very high for their type (in Rupiah).
- Suspiciously round numbers.
- Refunds without clear context or with large values.

Return ONLY a valid JSON array (no markdown formatting):
[
    {{
        "transactionId": "string",
        "riskScore": number (0-100),
        "isAnomaly": boolean,
        "explanation": "string (short explanation in {language})"
    }}
]"#,
        context = context,
        language = language_for_locale(locale),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{demo_products, demo_transactions};

    #[test]
    fn test_language_for_locale() {
        assert_eq!(language_for_locale("id-ID"), "Indonesian");
        assert_eq!(language_for_locale("en_US"), "English");
        assert_eq!(language_for_locale(""), "English");
    }

    #[test]
    fn test_assistant_prompt_embeds_digest_and_query() {
        let prompt =
            build_assistant_prompt("  How much did we sell?  ", "Revenue: Rp 10.", "id-ID");
        assert!(prompt.contains("Revenue: Rp 10."));
        assert!(prompt.contains("\"How much did we sell?\""));
        assert!(prompt.contains("Reply in Indonesian."));
    }

    #[test]
    fn test_forecast_prompt_lists_products() {
        let prompt = build_forecast_prompt(&demo_products(), "id-ID");
        assert!(prompt.contains("\"currentStock\":12"));
        assert!(prompt.contains("\"category\":\"Tablet\""));
    }

    #[test]
    fn test_anomaly_prompt_uses_wire_names() {
        let prompt = build_anomaly_prompt(&demo_transactions(), "en-US");
        assert!(prompt.contains("\"type\":\"REFUND\""));
        assert!(prompt.contains("TX-005"));
    }
}
