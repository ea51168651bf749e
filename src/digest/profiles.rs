#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelProfile {
    pub input_token_budget: usize,
    pub output_token_budget: usize,
    pub temperature: f64,
}

pub const GLOBAL_DEFAULT_PROFILE: ModelProfile = ModelProfile {
    input_token_budget: 15_000,
    output_token_budget: 4_000,
    temperature: 0.7,
};

const fn profile(input: usize, output: usize, temperature: f64) -> ModelProfile {
    ModelProfile {
        input_token_budget: input,
        output_token_budget: output,
        temperature,
    }
}

const MODEL_PROFILES: &[(&str, &str, ModelProfile)] = &[
    ("openai", "gpt-4.1", profile(120_000, 8_000, 0.7)),
    ("openai", "gpt-4.1-mini", profile(120_000, 8_000, 0.7)),
    ("openai", "gpt-4o", profile(100_000, 4_000, 0.7)),
    ("openai", "gpt-4o-mini", profile(100_000, 4_000, 0.7)),
    ("anthropic", "claude-3-5-haiku-latest", profile(150_000, 4_000, 0.5)),
    ("anthropic", "claude-sonnet-4-0", profile(150_000, 8_000, 0.5)),
    ("gemini", "gemini-2.5-flash", profile(200_000, 8_000, 0.7)),
    ("gemini", "gemini-2.5-flash-lite", profile(200_000, 8_000, 0.7)),
    ("ollama", "llama3.2", profile(12_000, 2_000, 0.7)),
];

const PROVIDER_DEFAULTS: &[(&str, ModelProfile)] = &[
    ("openai", profile(60_000, 4_000, 0.7)),
    ("anthropic", profile(60_000, 4_000, 0.5)),
    ("gemini", profile(60_000, 4_000, 0.7)),
    ("openrouter", profile(30_000, 4_000, 0.7)),
    ("ollama", profile(8_000, 2_000, 0.7)),
];

/// Look up `(provider, model)`, falling back to the provider default and then
/// the global default.
pub fn lookup(provider_id: &str, model_id: &str) -> ModelProfile {
    MODEL_PROFILES
        .iter()
        .find(|(provider, model, _)| *provider == provider_id && *model == model_id)
        .map(|(_, _, profile)| *profile)
        .or_else(|| {
            PROVIDER_DEFAULTS
                .iter()
                .find(|(provider, _)| *provider == provider_id)
                .map(|(_, profile)| *profile)
        })
        .unwrap_or(GLOBAL_DEFAULT_PROFILE)
}

#[cfg(test)]
mod tests {
    use super::{GLOBAL_DEFAULT_PROFILE, lookup};

    #[test]
    fn exact_model_profile_wins() {
        assert_eq!(lookup("openai", "gpt-4o").input_token_budget, 100_000);
    }

    #[test]
    fn unknown_model_uses_provider_default() {
        let got = lookup("anthropic", "claude-unreleased");
        assert_eq!(got.input_token_budget, 60_000);
        assert_eq!(got.temperature, 0.5);
    }

    #[test]
    fn unknown_provider_uses_global_default() {
        assert_eq!(lookup("acme", "m1"), GLOBAL_DEFAULT_PROFILE);
        assert_eq!(GLOBAL_DEFAULT_PROFILE.input_token_budget, 15_000);
        assert_eq!(GLOBAL_DEFAULT_PROFILE.output_token_budget, 4_000);
    }
}
