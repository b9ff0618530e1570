/// Asks the user for a display identity when none is stored
#[async_trait::async_trait]
pub trait IdentityPrompt: Send + Sync {
    /// `None` when the user dismissed the prompt
    async fn prompt_identity(&self) -> Option<String>;
}

/// Always answers with the same name (CLI flag, tests)
pub struct FixedIdentity(pub String);

#[async_trait::async_trait]
impl IdentityPrompt for FixedIdentity {
    async fn prompt_identity(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Never answers; the controller falls back to a generated name
pub struct NoPrompt;

#[async_trait::async_trait]
impl IdentityPrompt for NoPrompt {
    async fn prompt_identity(&self) -> Option<String> {
        None
    }
}

/// `Player<nnn>` fallback identity
pub fn generated_identity() -> String {
    let n = uuid::Uuid::new_v4().as_u128() % 1000;
    format!("Player{}", n)
}
