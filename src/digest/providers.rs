use crate::digest::profiles::ModelProfile;
use crate::digest::transport::{HttpRequest, SUMMARY_TIMEOUT_MS};
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderClass {
    /// Credentialed, metered remote APIs.
    Cloud,
    /// Unauthenticated inference the user runs themselves.
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    Text,
    Model,
    Credential,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Parameters {
    pub temperature: f64,
    pub top_p: Option<f64>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
    pub max_output_tokens: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub provider_id: String,
    pub model_id: String,
    pub credential: Option<String>,
    pub system_prompt: String,
    pub user_prompt: String,
    pub parameters: Parameters,
}

#[derive(Debug)]
pub struct ProviderSpec {
    pub id: &'static str,
    pub label: &'static str,
    pub class: ProviderClass,
    pub default_model: &'static str,
    pub default_base_url: &'static str,
    pub credential_env: Option<&'static str>,
    /// Hard ceiling on thread size, checked before the eligibility gate.
    pub max_comments: Option<usize>,
    pub required: &'static [RequiredField],
    pub parameters: fn(&ModelProfile) -> Parameters,
    pub build_request: fn(&ProviderRequest, &str) -> HttpRequest,
    pub parse_response: fn(&Value) -> Option<String>,
}

impl ProviderSpec {
    pub fn requires(&self, field: RequiredField) -> bool {
        self.required.contains(&field)
    }
}

const CLOUD_FIELDS: &[RequiredField] = &[
    RequiredField::Text,
    RequiredField::Model,
    RequiredField::Credential,
];
const LOCAL_FIELDS: &[RequiredField] = &[
    RequiredField::Text,
    RequiredField::Model,
];

fn insert_opt<T: Into<Value>>(map: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value.into());
    }
}

fn chat_messages(request: &ProviderRequest) -> Value {
    json!([
        {"role": "system", "content": request.system_prompt},
        {"role": "user", "content": request.user_prompt}
    ])
}

fn credential(request: &ProviderRequest) -> &str {
    request.credential.as_deref().unwrap_or_default()
}

fn join_text_parts(parts: &[Value]) -> Option<String> {
    let chunks: Vec<&str> = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if chunks.is_empty() {
        None
    } else {
        Some(chunks.join("\n"))
    }
}

fn full_parameters(profile: &ModelProfile) -> Parameters {
    Parameters {
        temperature: profile.temperature,
        top_p: Some(1.0),
        frequency_penalty: Some(0.0),
        presence_penalty: Some(0.0),
        max_output_tokens: Some(profile.output_token_budget),
    }
}

fn sampling_parameters(profile: &ModelProfile) -> Parameters {
    Parameters {
        temperature: profile.temperature,
        max_output_tokens: Some(profile.output_token_budget),
        ..Parameters::default()
    }
}

fn local_parameters(profile: &ModelProfile) -> Parameters {
    Parameters {
        temperature: profile.temperature,
        ..Parameters::default()
    }
}

fn chat_completions_body(request: &ProviderRequest) -> Value {
    let params = &request.parameters;
    let mut body = Map::new();
    body.insert("model".to_string(), json!(request.model_id));
    body.insert("messages".to_string(), chat_messages(request));
    body.insert("temperature".to_string(), json!(params.temperature));
    insert_opt(&mut body, "top_p", params.top_p);
    insert_opt(&mut body, "frequency_penalty", params.frequency_penalty);
    insert_opt(&mut body, "presence_penalty", params.presence_penalty);
    insert_opt(&mut body, "max_tokens", params.max_output_tokens);
    Value::Object(body)
}

fn openai_request(request: &ProviderRequest, base_url: &str) -> HttpRequest {
    HttpRequest::post_json(
        format!("{}/v1/chat/completions", base_url.trim_end_matches('/')),
        chat_completions_body(request),
    )
    .header("authorization", format!("Bearer {}", credential(request)))
    .timeout_ms(SUMMARY_TIMEOUT_MS)
}

fn openrouter_request(request: &ProviderRequest, base_url: &str) -> HttpRequest {
    openai_request(request, base_url).header("x-title", "thread-digest")
}

fn parse_chat_completions(json: &Value) -> Option<String> {
    let first = json.get("choices").and_then(Value::as_array)?.first()?;
    match first.get("message")?.get("content")? {
        Value::String(s) => Some(s.to_string()),
        Value::Array(parts) => join_text_parts(parts),
        _ => None,
    }
}

fn anthropic_request(request: &ProviderRequest, base_url: &str) -> HttpRequest {
    let params = &request.parameters;
    let mut body = Map::new();
    body.insert("model".to_string(), json!(request.model_id));
    body.insert(
        "max_tokens".to_string(),
        json!(params.max_output_tokens.unwrap_or(1024)),
    );
    body.insert("temperature".to_string(), json!(params.temperature));
    insert_opt(&mut body, "top_p", params.top_p);
    body.insert("system".to_string(), json!(request.system_prompt));
    body.insert(
        "messages".to_string(),
        json!([{"role": "user", "content": request.user_prompt}]),
    );

    HttpRequest::post_json(
        format!("{}/v1/messages", base_url.trim_end_matches('/')),
        Value::Object(body),
    )
    .header("x-api-key", credential(request))
    .header("anthropic-version", "2023-06-01")
    .timeout_ms(SUMMARY_TIMEOUT_MS)
}

fn parse_anthropic(json: &Value) -> Option<String> {
    join_text_parts(json.get("content").and_then(Value::as_array)?)
}

fn gemini_request(request: &ProviderRequest, base_url: &str) -> HttpRequest {
    let params = &request.parameters;
    let mut generation = Map::new();
    generation.insert("temperature".to_string(), json!(params.temperature));
    insert_opt(&mut generation, "topP", params.top_p);
    insert_opt(&mut generation, "maxOutputTokens", params.max_output_tokens);
    let body = json!({
        "systemInstruction": {"parts": [{"text": request.system_prompt}]},
        "contents": [{"role": "user", "parts": [{"text": request.user_prompt}]}],
        "generationConfig": Value::Object(generation)
    });

    HttpRequest::post_json(
        format!(
            "{}/v1beta/models/{}:generateContent",
            base_url.trim_end_matches('/'),
            request.model_id
        ),
        body,
    )
    .header("x-goog-api-key", credential(request))
    .timeout_ms(SUMMARY_TIMEOUT_MS)
}

fn parse_gemini(json: &Value) -> Option<String> {
    let parts = json
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
        .and_then(|v| v.get("content"))
        .and_then(|v| v.get("parts"))
        .and_then(Value::as_array)?;
    join_text_parts(parts)
}

fn ollama_request(request: &ProviderRequest, base_url: &str) -> HttpRequest {
    let body = json!({
        "model": request.model_id,
        "messages": chat_messages(request),
        "stream": false,
        "options": {"temperature": request.parameters.temperature}
    });
    HttpRequest::post_json(
        format!("{}/api/chat", base_url.trim_end_matches('/')),
        body,
    )
    .timeout_ms(SUMMARY_TIMEOUT_MS)
}

fn parse_ollama(json: &Value) -> Option<String> {
    json.get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

static BUILTIN: &[ProviderSpec] = &[
    ProviderSpec {
        id: "openai",
        label: "OpenAI",
        class: ProviderClass::Cloud,
        default_model: "gpt-4.1-mini",
        default_base_url: "https://api.openai.com",
        credential_env: Some("OPENAI_API_KEY"),
        max_comments: None,
        required: CLOUD_FIELDS,
        parameters: full_parameters,
        build_request: openai_request,
        parse_response: parse_chat_completions,
    },
    ProviderSpec {
        id: "anthropic",
        label: "Anthropic",
        class: ProviderClass::Cloud,
        default_model: "claude-3-5-haiku-latest",
        default_base_url: "https://api.anthropic.com",
        credential_env: Some("ANTHROPIC_API_KEY"),
        max_comments: None,
        required: CLOUD_FIELDS,
        parameters: sampling_parameters,
        build_request: anthropic_request,
        parse_response: parse_anthropic,
    },
    ProviderSpec {
        id: "gemini",
        label: "Google Gemini",
        class: ProviderClass::Cloud,
        default_model: "gemini-2.5-flash-lite",
        default_base_url: "https://generativelanguage.googleapis.com",
        credential_env: Some("GEMINI_API_KEY"),
        max_comments: None,
        required: CLOUD_FIELDS,
        parameters: sampling_parameters,
        build_request: gemini_request,
        parse_response: parse_gemini,
    },
    ProviderSpec {
        id: "openrouter",
        label: "OpenRouter",
        class: ProviderClass::Cloud,
        default_model: "openai/gpt-4.1-mini",
        default_base_url: "https://openrouter.ai/api",
        credential_env: Some("OPENROUTER_API_KEY"),
        max_comments: None,
        required: CLOUD_FIELDS,
        parameters: full_parameters,
        build_request: openrouter_request,
        parse_response: parse_chat_completions,
    },
    ProviderSpec {
        id: "ollama",
        label: "Ollama",
        class: ProviderClass::Local,
        default_model: "llama3.2",
        default_base_url: "http://localhost:11434",
        credential_env: None,
        max_comments: None,
        required: LOCAL_FIELDS,
        parameters: local_parameters,
        build_request: ollama_request,
        parse_response: parse_ollama,
    },
];

/// Provider lookup table; adding a backend means adding one [`ProviderSpec`].
pub struct ProviderRegistry {
    entries: Vec<&'static ProviderSpec>,
}

impl ProviderRegistry {
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN.iter().collect(),
        }
    }

    pub fn with(mut self, spec: &'static ProviderSpec) -> Self {
        self.entries.retain(|existing| existing.id != spec.id);
        self.entries.push(spec);
        self
    }

    pub fn get(&self, id: &str) -> Option<&'static ProviderSpec> {
        let wanted = id.trim().to_ascii_lowercase();
        self.entries.iter().copied().find(|spec| spec.id == wanted)
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.entries.iter().map(|spec| spec.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{Parameters, ProviderClass, ProviderRegistry, ProviderRequest, RequiredField};
    use crate::digest::profiles;
    use crate::digest::transport::Method;
    use serde_json::{Value, json};

    fn request(provider: &str, params: Parameters) -> ProviderRequest {
        ProviderRequest {
            provider_id: provider.to_string(),
            model_id: "m-1".to_string(),
            credential: Some("secret".to_string()),
            system_prompt: "sys".to_string(),
            user_prompt: "user".to_string(),
            parameters: params,
        }
    }

    fn header<'a>(req: &'a crate::digest::transport::HttpRequest, name: &str) -> Option<&'a str> {
        req.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn registry_resolves_case_insensitively() {
        let registry = ProviderRegistry::builtin();
        assert_eq!(registry.get(" OpenAI ").map(|s| s.id), Some("openai"));
        assert!(registry.get("nope").is_none());
        assert_eq!(registry.ids().len(), 5);
    }

    #[test]
    fn ollama_is_local_and_needs_no_credential() {
        let registry = ProviderRegistry::builtin();
        let ollama = registry.get("ollama").expect("ollama");
        assert_eq!(ollama.class, ProviderClass::Local);
        assert!(!ollama.requires(RequiredField::Credential));
        let openai = registry.get("openai").expect("openai");
        assert!(openai.requires(RequiredField::Credential));
    }

    #[test]
    fn openai_request_carries_prompts_and_parameters() {
        let registry = ProviderRegistry::builtin();
        let spec = registry.get("openai").expect("openai");
        let params = (spec.parameters)(&profiles::lookup("openai", "m-1"));
        let req = (spec.build_request)(&request("openai", params), "https://api.example/");
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.url, "https://api.example/v1/chat/completions");
        assert_eq!(header(&req, "authorization"), Some("Bearer secret"));
        let body = req.body.expect("body");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "user");
        assert_eq!(body["max_tokens"], 4000);
        assert_eq!(body["top_p"], 1.0);
    }

    #[test]
    fn anthropic_request_uses_system_field_and_api_key_header() {
        let registry = ProviderRegistry::builtin();
        let spec = registry.get("anthropic").expect("anthropic");
        let params = (spec.parameters)(&profiles::lookup("anthropic", "m-1"));
        let req = (spec.build_request)(&request("anthropic", params), "https://a.example");
        assert_eq!(req.url, "https://a.example/v1/messages");
        assert_eq!(header(&req, "x-api-key"), Some("secret"));
        let body = req.body.expect("body");
        assert_eq!(body["system"], "sys");
        assert!(body.get("top_p").is_none());
    }

    #[test]
    fn gemini_request_targets_model_endpoint() {
        let registry = ProviderRegistry::builtin();
        let spec = registry.get("gemini").expect("gemini");
        let params = (spec.parameters)(&profiles::lookup("gemini", "m-1"));
        let req = (spec.build_request)(&request("gemini", params), "https://g.example");
        assert_eq!(req.url, "https://g.example/v1beta/models/m-1:generateContent");
        let body = req.body.expect("body");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 4000);
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "sys");
    }

    #[test]
    fn ollama_request_has_no_auth_header() {
        let registry = ProviderRegistry::builtin();
        let spec = registry.get("ollama").expect("ollama");
        let mut req_in = request("ollama", Parameters::default());
        req_in.credential = None;
        let req = (spec.build_request)(&req_in, "http://localhost:11434");
        assert!(req.headers.is_empty());
        assert_eq!(req.body.expect("body")["stream"], false);
    }

    #[test]
    fn response_parsers_read_each_shape() {
        let registry = ProviderRegistry::builtin();
        let parse = |id: &str, v: Value| (registry.get(id).expect("spec").parse_response)(&v);

        assert_eq!(
            parse("openai", json!({"choices": [{"message": {"content": "hi"}}]})).as_deref(),
            Some("hi")
        );
        assert_eq!(
            parse(
                "anthropic",
                json!({"content": [{"type": "text", "text": "a"}, {"type": "text", "text": "b"}]})
            )
            .as_deref(),
            Some("a\nb")
        );
        assert_eq!(
            parse(
                "gemini",
                json!({"candidates": [{"content": {"parts": [{"text": "g"}]}}]})
            )
            .as_deref(),
            Some("g")
        );
        assert_eq!(
            parse("ollama", json!({"message": {"role": "assistant", "content": "o"}})).as_deref(),
            Some("o")
        );
        assert_eq!(parse("openai", json!({"choices": []})), None);
    }
}
