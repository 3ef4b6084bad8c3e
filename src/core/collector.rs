//! CN-005: The Collector — process-scoped collect-pass state.
//!
//! Accumulates unresolved model-dependent content requests during Pass 1.
//! Mutation happens only through the named lifecycle methods below, invoked
//! by the single execution thread. The caller clears it explicitly at every
//! pass boundary; it is never cleared implicitly.

use super::types::Guardrail;

/// One recorded model-content request.
#[derive(Debug, Clone)]
pub struct ContentRequest {
    /// Step id — also the answers-file key
    pub id: String,
    /// Fully assembled prompt (context and examples included)
    pub prompt: String,
    pub guardrails: Vec<Guardrail>,
    pub max_retries: u32,
    pub budget_tokens: Option<u64>,
    /// Target file for the resolved content
    pub output: String,
}

/// Accumulator for model-dependent content requests.
#[derive(Debug, Default)]
pub struct Collector {
    collecting: bool,
    entries: Vec<ContentRequest>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter collect mode for a pass. The collector must be clear.
    pub fn enter_collect(&mut self) -> Result<(), String> {
        if self.collecting {
            return Err("collector is already in collect mode".to_string());
        }
        if !self.entries.is_empty() {
            return Err(format!(
                "collector holds {} stale entr(ies); clear() was not called at the pass boundary",
                self.entries.len()
            ));
        }
        self.collecting = true;
        Ok(())
    }

    /// Record a request. Only legal while collecting.
    pub fn record(&mut self, request: ContentRequest) -> Result<(), String> {
        if !self.collecting {
            return Err(format!(
                "cannot record request '{}' outside a collect pass",
                request.id
            ));
        }
        self.entries.push(request);
        Ok(())
    }

    /// Reset at a pass boundary: drop entries and leave collect mode.
    pub fn clear(&mut self) {
        self.collecting = false;
        self.entries.clear();
    }

    pub fn is_collecting(&self) -> bool {
        self.collecting
    }

    pub fn has_entries(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ContentRequest] {
        &self.entries
    }
}
