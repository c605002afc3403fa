//! Answer synthesis boundary.
//!
//! Assembles the grounding context from retrieved chunks and calls the
//! text-generation collaborator (an Ollama instance) under a fixed
//! contract: answer only from the supplied context, and emit
//! [`INSUFFICIENT_CONTEXT`] when the context cannot answer the question.
//! The generator's internals are out of scope — this module owns only the
//! context-assembly and prompt contract.

use anyhow::{bail, Result};
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::models::RetrievalResult;

/// Sentinel the generator must emit when the context is insufficient.
pub const INSUFFICIENT_CONTEXT: &str =
    "The requested information is not available within the provided documentation.";

/// Join the top retrieved chunk texts into one grounding block.
///
/// Order is preserved; at most `max_chunks` chunks are included.
pub fn assemble_context(results: &[RetrievalResult], max_chunks: usize) -> String {
    results
        .iter()
        .take(max_chunks)
        .map(|r| r.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render the full prompt for one question.
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "[SYSTEM_ROLE]\n\
         You are a senior engineer answering questions about a technical \
         documentation corpus. Provide a precise, technical answer based \
         ONLY on the provided <context>.\n\
         \n\
         [CONSTRAINTS]\n\
         - If the answer is not in the context, state: \"{INSUFFICIENT_CONTEXT}\"\n\
         - Do not invent function names, file paths, or configuration keys \
         that are absent from the context.\n\
         - Keep the explanation concise but technically dense.\n\
         \n\
         <context>\n\
         {context}\n\
         </context>\n\
         \n\
         Question: {question}\n\
         \n\
         Answer:\n"
    )
}

/// Call the generation backend.
///
/// Posts to the configured Ollama instance's `/api/generate` endpoint with
/// streaming disabled and returns the answer text. Retries transient
/// failures (429/5xx/network) with exponential backoff; other HTTP errors
/// fail immediately.
pub async fn generate(config: &GenerationConfig, context: &str, question: &str) -> Result<String> {
    let prompt = build_prompt(context, question);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let body = serde_json::json!({
        "model": config.model,
        "prompt": prompt,
        "stream": false,
        "options": { "temperature": config.temperature },
    });

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post(format!("{}/api/generate", config.url))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response.json().await?;
                    return parse_generate_response(&json);
                }

                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(anyhow::anyhow!(
                        "Ollama API error {}: {}",
                        status,
                        body_text
                    ));
                    continue;
                }

                let body_text = response.text().await.unwrap_or_default();
                bail!("Ollama API error {}: {}", status, body_text);
            }
            Err(e) => {
                last_err = Some(anyhow::anyhow!(
                    "Ollama connection error (is Ollama running at {}?): {}",
                    config.url,
                    e
                ));
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Generation failed after retries")))
}

fn parse_generate_response(json: &serde_json::Value) -> Result<String> {
    json.get("response")
        .and_then(|r| r.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing response field"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chunk, Hierarchy, RetrievalResult};

    fn result(ordinal: usize, text: &str) -> RetrievalResult {
        RetrievalResult {
            chunk: Chunk::new("doc.md", ordinal, text.to_string(), Hierarchy::default()),
            score: 1.0,
        }
    }

    #[test]
    fn test_assemble_context_preserves_order_and_bound() {
        let results = vec![result(0, "first"), result(1, "second"), result(2, "third")];
        assert_eq!(assemble_context(&results, 2), "first\n\nsecond");
        assert_eq!(assemble_context(&results, 10), "first\n\nsecond\n\nthird");
    }

    #[test]
    fn test_assemble_context_empty() {
        assert_eq!(assemble_context(&[], 5), "");
    }

    #[test]
    fn test_prompt_embeds_contract_and_inputs() {
        let prompt = build_prompt("the scheduler is preemptive", "how does scheduling work?");
        assert!(prompt.contains(INSUFFICIENT_CONTEXT));
        assert!(prompt.contains("<context>\nthe scheduler is preemptive\n</context>"));
        assert!(prompt.contains("Question: how does scheduling work?"));
    }

    #[test]
    fn test_parse_generate_response() {
        let json = serde_json::json!({ "response": "  the answer  " });
        assert_eq!(parse_generate_response(&json).unwrap(), "the answer");

        let bad = serde_json::json!({ "done": true });
        assert!(parse_generate_response(&bad).is_err());
    }
}
