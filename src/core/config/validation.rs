use serde_json::{Map, Value};

use super::ConfigError;

pub fn validate_config(config: &Value) -> Result<(), ConfigError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(store) = expect_optional_object(root, "store")? {
        validate_one_of_field(store, "store.backend", "backend", &["sqlite", "elasticsearch"])?;
        validate_optional_string_field(store, "store.sqlite_path", "sqlite_path")?;

        if let Some(es) = expect_optional_object(store, "elasticsearch")? {
            validate_optional_string_field(es, "store.elasticsearch.url", "url")?;
            validate_optional_string_field(es, "store.elasticsearch.index", "index")?;
            validate_optional_string_field(es, "store.elasticsearch.username", "username")?;
            validate_optional_string_field(es, "store.elasticsearch.password", "password")?;
            validate_bool_field(es, "store.elasticsearch.verify_certs", "verify_certs")?;
            validate_u64_field(
                es,
                "store.elasticsearch.timeout_secs",
                "timeout_secs",
                1,
                3_600,
            )?;
        }
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_optional_string_field(llm, "llm.base_url", "base_url")?;
        validate_optional_string_field(llm, "llm.model", "model")?;
        validate_optional_string_field(llm, "llm.api_key", "api_key")?;
        validate_optional_string_field(llm, "llm.tokenizer_path", "tokenizer_path")?;
        validate_u64_field(
            llm,
            "llm.max_input_tokens",
            "max_input_tokens",
            1,
            10_000_000,
        )?;
        validate_u64_field(
            llm,
            "llm.max_output_tokens",
            "max_output_tokens",
            1,
            1_000_000,
        )?;
        validate_u64_field(llm, "llm.seed", "seed", 0, u64::MAX)?;
        validate_u64_field(llm, "llm.timeout_secs", "timeout_secs", 1, 86_400)?;
    }

    if let Some(rag) = expect_optional_object(root, "rag")? {
        validate_u64_field(rag, "rag.search_limit", "search_limit", 1, 10_000)?;
        validate_u64_field(rag, "rag.context_limit", "context_limit", 1, 10_000)?;
        validate_u64_field(rag, "rag.cache_capacity", "cache_capacity", 1, 10_000_000)?;
        validate_u64_field(
            rag,
            "rag.generation_timeout_secs",
            "generation_timeout_secs",
            1,
            86_400,
        )?;
        validate_optional_string_field(rag, "rag.fallback_answer", "fallback_answer")?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ConfigError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_bool_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_bool().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "boolean"))
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ConfigError::Invalid(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_str().is_none() && !value.is_null() {
        return Err(config_type_error(path, "string"));
    }
    Ok(())
}

fn validate_one_of_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if !allowed.contains(&text) {
        return Err(ConfigError::Invalid(format!(
            "Invalid config at '{}': expected one of {}",
            path,
            allowed.join(", ")
        )));
    }
    Ok(())
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ConfigError {
    ConfigError::Invalid(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}
