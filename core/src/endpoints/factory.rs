use crate::config::Config;
use crate::endpoints::OpenAiEndpoint;
use crate::traits::ModelEndpoint;
use anyhow::{Result, anyhow};
use std::sync::Arc;

const API_KEY_ENV_VARS: &[&str] = &["TOOLWEAVE_API_KEY", "OPENAI_API_KEY"];

pub fn create_endpoint(config: &Config) -> Result<Arc<dyn ModelEndpoint>> {
    let api_key = resolve_api_key_with_fallback(API_KEY_ENV_VARS, &config.api_key)?;

    let mut endpoint = OpenAiEndpoint::new(api_key).with_model(config.model.clone());
    if let Some(base_url) = &config.base_url {
        endpoint = endpoint.with_base_url(base_url.clone());
    }

    tracing::debug!(
        model = %config.model,
        base_url = ?config.base_url,
        "Model endpoint configured"
    );
    Ok(Arc::new(endpoint))
}

fn resolve_api_key_with_fallback(env_vars: &[&str], config_key: &str) -> Result<String> {
    for var_name in env_vars {
        if let Ok(key) = std::env::var(var_name)
            && !key.trim().is_empty()
        {
            return Ok(key);
        }
    }
    if !config_key.is_empty() {
        Ok(config_key.to_string())
    } else {
        Err(anyhow!(
            "No API key found. Set {} or run 'toolweave onboard'.",
            env_vars.join(" / ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_config_key() {
        let key =
            resolve_api_key_with_fallback(&["TOOLWEAVE_TEST_UNSET_KEY"], "from-config").unwrap();
        assert_eq!(key, "from-config");
    }

    #[test]
    fn missing_key_is_an_error() {
        assert!(resolve_api_key_with_fallback(&["TOOLWEAVE_TEST_UNSET_KEY"], "").is_err());
    }
}
