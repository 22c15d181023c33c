use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::domain::PipelineError;

const DEFAULT_PERSONA_PREAMBLE: &str = "You are an intelligent HR assistant. \
Use the provided company knowledge to answer the user's question. \
Be concise, accurate, and polite.";

/// Process-wide configuration, read once at startup. Invalid values are
/// fatal: the process reports a configuration error and does not proceed.
/// There is no hot reload.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub redis_url: String,
    pub qdrant_url: String,
    pub collection: String,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub rag: RagConfig,
    pub persona: PersonaConfig,
    pub mail: Option<MailConfig>,
    pub worker: WorkerConfig,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimension: usize,
}

#[derive(Debug, Clone)]
pub struct RagConfig {
    pub top_k: usize,
    pub retrieval_ttl: Duration,
    pub completion_ttl: Duration,
    pub chunk_size: usize,
}

/// Static per-deployment persona; never inferred at runtime.
#[derive(Debug, Clone, Deserialize)]
pub struct PersonaConfig {
    pub name: String,
    pub preamble: String,
}

/// Outbound mail relay. Absent when the deployment has no email channel.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub relay_url: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub concurrency: usize,
    pub result_ttl: Duration,
}

#[derive(Debug, Deserialize)]
struct PromptsFile {
    persona: PersonaConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, PipelineError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Core loader, parameterized over the variable source so tests can
    /// supply a map instead of mutating process environment.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, PipelineError> {
        let server = ServerConfig {
            host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_var(&lookup, "SERVER_PORT", 8080)?,
        };

        let persona = load_persona(&lookup)?;

        Ok(Self {
            server,
            redis_url: lookup("REDIS_URL").unwrap_or_else(|| "redis://localhost:6379".into()),
            qdrant_url: lookup("QDRANT_URL").unwrap_or_else(|| "http://localhost:6334".into()),
            collection: lookup("QDRANT_COLLECTION").unwrap_or_else(|| "knowledge".into()),
            llm: LlmConfig {
                model: lookup("LLM_MODEL").unwrap_or_else(|| "gpt-4o-mini".into()),
                timeout: Duration::from_secs(parse_var(&lookup, "LLM_TIMEOUT_SECONDS", 60)?),
            },
            embedding: EmbeddingConfig {
                model: lookup("EMBEDDING_MODEL")
                    .unwrap_or_else(|| "text-embedding-3-small".into()),
                dimension: parse_var(&lookup, "EMBEDDING_DIMENSION", 1536)?,
            },
            rag: RagConfig {
                top_k: parse_var(&lookup, "RAG_TOP_K", 3)?,
                retrieval_ttl: Duration::from_secs(parse_var(
                    &lookup,
                    "RETRIEVAL_CACHE_TTL_SECONDS",
                    3600,
                )?),
                completion_ttl: Duration::from_secs(parse_var(
                    &lookup,
                    "COMPLETION_CACHE_TTL_SECONDS",
                    3600,
                )?),
                chunk_size: parse_var(&lookup, "CHUNK_SIZE", 1000)?,
            },
            persona,
            mail: lookup("MAIL_RELAY_URL").map(|relay_url| MailConfig {
                from: lookup("MAIL_FROM").unwrap_or_else(|| "no-reply@example.com".into()),
                relay_url,
            }),
            worker: WorkerConfig {
                concurrency: parse_var(&lookup, "WORKER_CONCURRENCY", 4)?,
                result_ttl: Duration::from_secs(parse_var(&lookup, "RESULT_TTL_SECONDS", 3600)?),
            },
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_default(),
        })
    }
}

/// Persona resolution order: PROMPTS_FILE (YAML), then PERSONA_PREAMBLE,
/// then the built-in HR-assistant default.
fn load_persona(
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<PersonaConfig, PipelineError> {
    if let Some(path) = lookup("PROMPTS_FILE") {
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            PipelineError::configuration(format!("cannot read prompts file {path}: {e}"))
        })?;
        let prompts: PromptsFile = serde_yaml::from_str(&raw).map_err(|e| {
            PipelineError::configuration(format!("invalid prompts file {path}: {e}"))
        })?;
        if prompts.persona.preamble.trim().is_empty() {
            return Err(PipelineError::configuration(
                "prompts file declares an empty persona preamble",
            ));
        }
        info!(persona = %prompts.persona.name, "persona loaded from prompts file");
        return Ok(prompts.persona);
    }

    if let Some(preamble) = lookup("PERSONA_PREAMBLE") {
        if preamble.trim().is_empty() {
            return Err(PipelineError::configuration(
                "PERSONA_PREAMBLE is set but empty",
            ));
        }
        return Ok(PersonaConfig {
            name: lookup("PERSONA_NAME").unwrap_or_else(|| "assistant".into()),
            preamble,
        });
    }

    Ok(PersonaConfig {
        name: "hr-assistant".into(),
        preamble: DEFAULT_PERSONA_PREAMBLE.into(),
    })
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, PipelineError> {
    match lookup(name) {
        Some(raw) => raw.parse().map_err(|_| {
            PipelineError::configuration(format!("{name} has invalid value {raw:?}"))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from<'a>(map: &'a HashMap<&'a str, &'a str>) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| map.get(name).map(|v| v.to_string())
    }

    #[test]
    fn test_defaults_apply_when_env_is_empty() {
        let config = AppConfig::from_lookup(|_| None).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.rag.top_k, 3);
        assert_eq!(config.persona.name, "hr-assistant");
        assert!(config.mail.is_none());
    }

    #[test]
    fn test_invalid_port_is_fatal() {
        let vars = HashMap::from([("SERVER_PORT", "not-a-port")]);
        let result = AppConfig::from_lookup(lookup_from(&vars));

        assert!(matches!(result, Err(PipelineError::Configuration(_))));
    }

    #[test]
    fn test_persona_from_env_overrides_default() {
        let vars = HashMap::from([
            ("PERSONA_NAME", "financial-analyst"),
            (
                "PERSONA_PREAMBLE",
                "You are a knowledgeable stock market analyst.",
            ),
        ]);
        let config = AppConfig::from_lookup(lookup_from(&vars)).unwrap();

        assert_eq!(config.persona.name, "financial-analyst");
        assert!(config.persona.preamble.contains("stock market"));
    }

    #[test]
    fn test_empty_persona_preamble_is_fatal() {
        let vars = HashMap::from([("PERSONA_PREAMBLE", "   ")]);
        let result = AppConfig::from_lookup(lookup_from(&vars));

        assert!(matches!(result, Err(PipelineError::Configuration(_))));
    }

    #[test]
    fn test_mail_config_requires_relay_url() {
        let vars = HashMap::from([
            ("MAIL_RELAY_URL", "https://relay.example.com/send"),
            ("MAIL_FROM", "hr@example.com"),
        ]);
        let config = AppConfig::from_lookup(lookup_from(&vars)).unwrap();

        let mail = config.mail.unwrap();
        assert_eq!(mail.relay_url, "https://relay.example.com/send");
        assert_eq!(mail.from, "hr@example.com");
    }

    #[test]
    fn test_cors_origins_are_split_and_trimmed() {
        let vars = HashMap::from([(
            "CORS_ALLOWED_ORIGINS",
            "http://localhost:3000, https://app.example.com",
        )]);
        let config = AppConfig::from_lookup(lookup_from(&vars)).unwrap();

        assert_eq!(
            config.cors_allowed_origins,
            vec!["http://localhost:3000", "https://app.example.com"]
        );
    }
}
