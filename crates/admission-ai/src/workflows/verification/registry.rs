use super::domain::ProviderConfig;

/// Read-only view of the configured providers.
pub trait ProviderRegistry: Send + Sync {
    fn list_enabled(&self) -> Result<Vec<ProviderConfig>, RegistryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("provider configuration unavailable: {0}")]
    Unavailable(String),
}

/// Registry over the provider configs loaded at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticProviderRegistry {
    configs: Vec<ProviderConfig>,
}

impl StaticProviderRegistry {
    pub fn new(configs: Vec<ProviderConfig>) -> Self {
        Self { configs }
    }
}

impl ProviderRegistry for StaticProviderRegistry {
    fn list_enabled(&self) -> Result<Vec<ProviderConfig>, RegistryError> {
        Ok(self
            .configs
            .iter()
            .filter(|config| config.enabled)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::verification::domain::Platform;
    use crate::workflows::verification::tests::common::provider;

    #[test]
    fn list_enabled_skips_disabled_configs() {
        let mut disabled = provider(Platform::Gemini);
        disabled.enabled = false;
        let registry = StaticProviderRegistry::new(vec![
            provider(Platform::OpenAi),
            disabled,
            provider(Platform::Anthropic),
        ]);

        let platforms: Vec<_> = registry
            .list_enabled()
            .expect("registry readable")
            .into_iter()
            .map(|config| config.platform)
            .collect();
        assert_eq!(platforms, vec![Platform::OpenAi, Platform::Anthropic]);
    }
}
