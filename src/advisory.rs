use anyhow::Result;

/// Free-text guidance source consulted once per cycle.
pub trait Advisor: Send + Sync {
    fn advise(&self, prompt: &str) -> Result<String>;
}

/// Placeholder advisor that echoes the prompt back.
#[derive(Debug, Clone, Default)]
pub struct StubAdvisor;

impl Advisor for StubAdvisor {
    fn advise(&self, prompt: &str) -> Result<String> {
        Ok(format!("Advisory: [Response to: '{prompt}']"))
    }
}
