//! CN-023: Remote-model transport.
//!
//! Calls an OpenAI-compatible chat-completions endpoint, one request at a
//! time. Each request's token budget is checked before dispatch (estimate,
//! not a wall-clock timeout). Guardrail failures retry the same call with
//! the accumulated feedback appended to the prompt, bounded by the
//! request's max_retries.

use crate::core::collector::ContentRequest;
use crate::core::config::{CocinaConfig, ProviderConfig};
use crate::core::types::TransportResult;
use indexmap::IndexMap;
use serde_json::json;

/// Rough token estimate used for the pre-dispatch budget check.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

/// Verify a request fits its declared budget before any call is made.
pub fn check_budget(request: &ContentRequest) -> Result<(), String> {
    if let Some(budget) = request.budget_tokens {
        let estimate = estimate_tokens(&request.prompt);
        if estimate > budget {
            return Err(format!(
                "request '{}' prompt is ~{} tokens, over its budget of {}",
                request.id, estimate, budget
            ));
        }
    }
    Ok(())
}

pub fn resolve(
    requests: &[ContentRequest],
    config: &CocinaConfig,
) -> Result<TransportResult, String> {
    let provider = config.resolution.provider.as_ref().ok_or_else(|| {
        "model resolution selected but no provider is set \
         (set [resolution.provider] in cocina.toml)"
            .to_string()
    })?;
    let api_key = config.api_key().ok_or_else(|| {
        format!(
            "model provider configured but no API key found (set the {} environment variable)",
            provider.api_key_env
        )
    })?;

    for request in requests {
        check_budget(request)?;
    }

    let client = reqwest::blocking::Client::new();
    let mut answers = IndexMap::new();
    for request in requests {
        let answer = resolve_one(&client, provider, &api_key, request)?;
        answers.insert(request.id.clone(), answer);
    }
    Ok(TransportResult::Resolved(answers))
}

/// Resolve one request, retrying guardrail failures with feedback.
fn resolve_one(
    client: &reqwest::blocking::Client,
    provider: &ProviderConfig,
    api_key: &str,
    request: &ContentRequest,
) -> Result<String, String> {
    let mut feedback: Vec<String> = Vec::new();

    for attempt in 0..=request.max_retries {
        let prompt = build_prompt(&request.prompt, &feedback);
        let answer = call_model(client, provider, api_key, &prompt)?;

        match first_guardrail_failure(request, &answer) {
            None => return Ok(answer),
            Some(reason) if attempt < request.max_retries => {
                feedback.push(reason);
            }
            Some(reason) => {
                return Err(format!(
                    "request '{}' failed guardrails after {} attempt(s): {}",
                    request.id,
                    request.max_retries + 1,
                    reason
                ));
            }
        }
    }
    Err(format!("request '{}' exhausted its retries", request.id))
}

/// Prompt text for one attempt: original prompt plus prior failures.
pub fn build_prompt(prompt: &str, feedback: &[String]) -> String {
    if feedback.is_empty() {
        return prompt.to_string();
    }
    let mut full = prompt.to_string();
    full.push_str("\n\nPrevious attempts were rejected:\n");
    for reason in feedback {
        full.push_str(&format!("- {}\n", reason));
    }
    full.push_str("Produce a corrected answer.");
    full
}

fn first_guardrail_failure(request: &ContentRequest, answer: &str) -> Option<String> {
    for guardrail in &request.guardrails {
        if let Err(reason) = guardrail.check(answer) {
            return Some(reason);
        }
    }
    None
}

fn call_model(
    client: &reqwest::blocking::Client,
    provider: &ProviderConfig,
    api_key: &str,
    prompt: &str,
) -> Result<String, String> {
    let url = format!("{}/chat/completions", provider.base_url.trim_end_matches('/'));
    let body = json!({
        "model": provider.model,
        "messages": [{"role": "user", "content": prompt}],
    });

    let response = client
        .post(&url)
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .map_err(|e| format!("model call to {} failed: {}", url, e))?;

    let status = response.status();
    let text = response
        .text()
        .map_err(|e| format!("model response unreadable: {}", e))?;
    if !status.is_success() {
        return Err(format!("model call failed: HTTP {}: {}", status, text.trim()));
    }

    let parsed: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| format!("model response is not JSON: {}", e))?;
    extract_content(&parsed)
}

/// Pull the answer text out of a chat-completions response body.
pub fn extract_content(response: &serde_json::Value) -> Result<String, String> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| "model response has no choices[0].message.content".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Guardrail;

    fn request(id: &str, budget: Option<u64>) -> ContentRequest {
        ContentRequest {
            id: id.to_string(),
            prompt: "Write a handler module for the user resource".to_string(),
            guardrails: vec![Guardrail::NonEmpty],
            max_retries: 2,
            budget_tokens: budget,
            output: "out.rs".to_string(),
        }
    }

    #[test]
    fn test_cn023_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn test_cn023_budget_check() {
        assert!(check_budget(&request("a", None)).is_ok());
        assert!(check_budget(&request("a", Some(1000))).is_ok());
        let err = check_budget(&request("a", Some(2))).unwrap_err();
        assert!(err.contains("over its budget of 2"));
    }

    #[test]
    fn test_cn023_build_prompt_with_feedback() {
        let p = build_prompt(
            "Write code",
            &["output must contain 'pub'".to_string()],
        );
        assert!(p.starts_with("Write code"));
        assert!(p.contains("rejected"));
        assert!(p.contains("must contain 'pub'"));
        assert_eq!(build_prompt("Write code", &[]), "Write code");
    }

    #[test]
    fn test_cn023_extract_content() {
        let ok = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "pub fn x() {}"}}]
        });
        assert_eq!(extract_content(&ok).unwrap(), "pub fn x() {}");

        let bad = serde_json::json!({"error": "rate limited"});
        assert!(extract_content(&bad).is_err());
    }

    #[test]
    fn test_cn023_missing_provider() {
        let cfg = CocinaConfig::default();
        let err = resolve(&[request("a", None)], &cfg).unwrap_err();
        assert!(err.contains("provider"));
    }

    #[test]
    fn test_cn023_missing_credential_names_env_var() {
        let mut cfg = CocinaConfig::default();
        cfg.resolution.provider = Some(ProviderConfig {
            base_url: "https://api.example.com/v1".to_string(),
            model: "gpt-test".to_string(),
            api_key_env: "COCINA_TEST_KEY_UNSET".to_string(),
        });
        let err = resolve(&[request("a", None)], &cfg).unwrap_err();
        assert!(err.contains("COCINA_TEST_KEY_UNSET"));
    }
}
