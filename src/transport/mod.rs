//! CN-020: Transports — turning collected content requests into answers.
//!
//! Three strategies: a remote model call, an external command, or
//! print-and-defer. Selection priority: the explicit `--ask` flag, then
//! the configured resolution mode, then an auto heuristic (model if a
//! provider and credential exist, command if one is configured, defer
//! otherwise). Configuration errors are raised before any external call,
//! naming the missing setting.

pub mod command;
pub mod defer;
pub mod remote;

use crate::core::collector::ContentRequest;
use crate::core::config::CocinaConfig;
use crate::core::types::TransportResult;
use std::path::Path;

/// Who answers pending model content, per the `--ask` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskMode {
    /// Defer: print the prompt document for a human
    Me,
    /// Call the configured remote model
    Ai,
    /// Refuse: pending requests become an error
    Nobody,
}

impl std::str::FromStr for AskMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "me" => Ok(Self::Me),
            "ai" => Ok(Self::Ai),
            "nobody" => Ok(Self::Nobody),
            other => Err(format!("invalid --ask value '{}' (me, ai, nobody)", other)),
        }
    }
}

/// Select a transport and resolve the collected requests.
pub fn resolve_requests(
    requests: &[ContentRequest],
    config: &CocinaConfig,
    ask: Option<AskMode>,
    root: &Path,
) -> Result<TransportResult, String> {
    match ask {
        Some(AskMode::Nobody) => {
            let ids: Vec<&str> = requests.iter().map(|r| r.id.as_str()).collect();
            return Err(format!(
                "{} model content request(s) pending ({}) but --ask nobody was given",
                requests.len(),
                ids.join(", ")
            ));
        }
        Some(AskMode::Me) => return defer::defer(requests, root),
        Some(AskMode::Ai) => return remote::resolve(requests, config),
        None => {}
    }

    match config.resolution.mode.as_deref() {
        Some("model") => remote::resolve(requests, config),
        Some("command") => command::resolve(requests, config),
        Some("defer") => defer::defer(requests, root),
        Some(other) => Err(format!(
            "unknown resolution mode '{}' in cocina.toml (model, command, defer)",
            other
        )),
        None => {
            // Auto heuristic
            if config.resolution.provider.is_some() && config.api_key().is_some() {
                remote::resolve(requests, config)
            } else if config.resolution.command.is_some() {
                command::resolve(requests, config)
            } else {
                defer::defer(requests, root)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::EXIT_ANSWERS_PENDING;

    fn request(id: &str) -> ContentRequest {
        ContentRequest {
            id: id.to_string(),
            prompt: "write code".to_string(),
            guardrails: vec![],
            max_retries: 1,
            budget_tokens: None,
            output: "out.rs".to_string(),
        }
    }

    #[test]
    fn test_cn020_ask_mode_parse() {
        assert_eq!("me".parse::<AskMode>().unwrap(), AskMode::Me);
        assert_eq!("ai".parse::<AskMode>().unwrap(), AskMode::Ai);
        assert_eq!("nobody".parse::<AskMode>().unwrap(), AskMode::Nobody);
        assert!("robot".parse::<AskMode>().is_err());
    }

    #[test]
    fn test_cn020_ask_nobody_is_error() {
        let cfg = CocinaConfig::default();
        let err = resolve_requests(
            &[request("gen")],
            &cfg,
            Some(AskMode::Nobody),
            Path::new("/p"),
        )
        .unwrap_err();
        assert!(err.contains("gen"));
        assert!(err.contains("--ask nobody"));
    }

    #[test]
    fn test_cn020_auto_defers_without_config() {
        let cfg = CocinaConfig::default();
        let r = resolve_requests(&[request("gen")], &cfg, None, Path::new("/p")).unwrap();
        match r {
            TransportResult::Deferred(code) => assert_eq!(code, EXIT_ANSWERS_PENDING),
            other => panic!("expected deferral, got {:?}", other),
        }
    }

    #[test]
    fn test_cn020_unknown_mode() {
        let mut cfg = CocinaConfig::default();
        cfg.resolution.mode = Some("carrier-pigeon".to_string());
        let err = resolve_requests(&[request("gen")], &cfg, None, Path::new("/p")).unwrap_err();
        assert!(err.contains("carrier-pigeon"));
    }

    #[test]
    fn test_cn020_model_mode_without_provider() {
        let mut cfg = CocinaConfig::default();
        cfg.resolution.mode = Some("model".to_string());
        let err = resolve_requests(&[request("gen")], &cfg, None, Path::new("/p")).unwrap_err();
        assert!(err.contains("provider"));
    }

    #[test]
    fn test_cn020_command_mode_without_command() {
        let mut cfg = CocinaConfig::default();
        cfg.resolution.mode = Some("command".to_string());
        let err = resolve_requests(&[request("gen")], &cfg, None, Path::new("/p")).unwrap_err();
        assert!(err.contains("command"));
    }
}
