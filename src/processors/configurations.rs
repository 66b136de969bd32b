//! Configuration enumeration and encoding

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::core::api::CadApi;
use crate::core::errors::Result;
use crate::core::models::{ConfigurationOption, DocumentRef, ParameterValue};

/// Every exportable configuration of the element: `Default` first, then one
/// entry per (parameter, option) pair that the server could encode.
///
/// A failing configuration fetch is logged and yields only `Default`.
pub async fn enumerate_configurations<A: CadApi + ?Sized>(
    api: &A,
    doc: &DocumentRef,
) -> Vec<ConfigurationOption> {
    let mut result = vec![ConfigurationOption::default_configuration()];

    let configuration = match api.element_configuration(doc).await {
        Ok(configuration) => configuration,
        Err(e) => {
            warn!("Failed to get configurations: {}", e);
            return result;
        }
    };

    let parameters = configuration.configuration_parameters;
    if parameters.is_empty() {
        debug!("Part studio has no configuration parameters");
        return result;
    }

    let single_parameter = parameters.len() == 1;

    for parameter in &parameters {
        for option in &parameter.options {
            let value = ParameterValue::new(&parameter.parameter_id, option.option.as_str());

            let encoded = match api.encode_configuration(doc, std::slice::from_ref(&value)).await {
                Ok(encoded) => encoded,
                Err(e) => {
                    warn!("Failed to encode configuration {}: {}", option.option_name, e);
                    continue;
                }
            };

            let display_name = if single_parameter {
                option.option_name.clone()
            } else {
                format!("{} - {}", parameter.parameter_name, option.option_name)
            };

            result.push(ConfigurationOption::new(encoded.query_param, display_name));
        }
    }

    info!("Found {} configurations", result.len());
    result
}

/// Parse a `parameterId=value` override, coercing booleans and numbers
pub fn parse_override(raw: &str) -> Option<ParameterValue> {
    let (parameter_id, value) = raw.split_once('=')?;
    Some(ParameterValue::new(parameter_id, coerce_value(value)))
}

fn coerce_value(value: &str) -> Value {
    match value.to_lowercase().as_str() {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if value.contains('.') {
        if let Some(number) = value
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
        {
            return Value::Number(number);
        }
    } else if let Ok(integer) = value.parse::<i64>() {
        return Value::from(integer);
    }

    Value::String(value.to_string())
}

/// Encode user-supplied overrides into a single custom configuration.
///
/// Returns `Ok(None)` when none of the overrides is usable.
pub async fn encode_overrides<A: CadApi + ?Sized>(
    api: &A,
    doc: &DocumentRef,
    overrides: &[String],
) -> Result<Option<ConfigurationOption>> {
    let mut parameters = Vec::with_capacity(overrides.len());
    for raw in overrides {
        match parse_override(raw) {
            Some(parameter) => parameters.push(parameter),
            None => warn!(
                "Ignoring invalid -c value: {} (expected parameterId=value)",
                raw
            ),
        }
    }

    if parameters.is_empty() {
        return Ok(None);
    }

    let encoded = api.encode_configuration(doc, &parameters).await?;
    let display_name = parameters
        .iter()
        .map(|p| format!("{}={}", p.parameter_id, p.display_value()))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(Some(ConfigurationOption::new(encoded.query_param, display_name)))
}

/// The configurations to export: the encoded overrides when any were given and
/// could be encoded, otherwise everything the part studio defines.
pub async fn select_configurations<A: CadApi + ?Sized>(
    api: &A,
    doc: &DocumentRef,
    overrides: &[String],
) -> Vec<ConfigurationOption> {
    if !overrides.is_empty() {
        match encode_overrides(api, doc, overrides).await {
            Ok(Some(custom)) => return vec![custom],
            Ok(None) => {
                warn!("No valid -c configurations provided; falling back to discovered configurations")
            }
            Err(e) => warn!(
                "Failed to encode provided configurations: {}; falling back to discovered configurations",
                e
            ),
        }
    }

    enumerate_configurations(api, doc).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{doc, encode_token, parameter, FakeApi};
    use serde_json::json;
    use std::collections::HashSet;

    fn names(configs: &[ConfigurationOption]) -> Vec<&str> {
        configs.iter().map(|c| c.display_name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_no_parameters_yields_default_only() {
        let api = FakeApi::with_configuration(vec![]);
        let configs = enumerate_configurations(&api, &doc()).await;

        assert_eq!(configs, vec![ConfigurationOption::new("", "Default")]);
        assert_eq!(FakeApi::count(&api.encode_calls), 0);
    }

    #[tokio::test]
    async fn test_single_parameter_uses_bare_option_names() {
        let api = FakeApi::with_configuration(vec![parameter(
            "List_size",
            "Size",
            &[("_a", "A"), ("_b", "B")],
        )]);

        let configs = enumerate_configurations(&api, &doc()).await;

        assert_eq!(names(&configs), vec!["Default", "A", "B"]);
        assert!(configs[0].query.is_empty());
        assert_eq!(
            configs[1].query,
            encode_token(&[ParameterValue::new("List_size", "_a")])
        );
    }

    #[tokio::test]
    async fn test_multiple_parameters_prefix_option_names() {
        let api = FakeApi::with_configuration(vec![
            parameter("List_size", "Size", &[("_s", "Small"), ("_l", "Large")]),
            parameter("List_mat", "Material", &[("_al", "Aluminium")]),
        ]);

        let configs = enumerate_configurations(&api, &doc()).await;

        assert_eq!(
            names(&configs),
            vec!["Default", "Size - Small", "Size - Large", "Material - Aluminium"]
        );
        assert_eq!(FakeApi::count(&api.encode_calls), 3);
    }

    #[tokio::test]
    async fn test_encoding_failure_skips_only_that_option() {
        let mut api = FakeApi::with_configuration(vec![parameter(
            "List_size",
            "Size",
            &[("_a", "A"), ("_b", "B"), ("_c", "C")],
        )]);
        api.failing_encodings = HashSet::from(["_b".to_string()]);

        let configs = enumerate_configurations(&api, &doc()).await;

        assert_eq!(names(&configs), vec!["Default", "A", "C"]);
    }

    #[tokio::test]
    async fn test_configuration_fetch_failure_yields_default() {
        let api = FakeApi::default();
        let configs = enumerate_configurations(&api, &doc()).await;
        assert_eq!(names(&configs), vec!["Default"]);
    }

    #[test]
    fn test_parse_override_coercion() {
        assert_eq!(parse_override("flag=TRUE").unwrap().parameter_value, json!(true));
        assert_eq!(parse_override("flag=false").unwrap().parameter_value, json!(false));
        assert_eq!(parse_override("count=12").unwrap().parameter_value, json!(12));
        assert_eq!(parse_override("len=2.5").unwrap().parameter_value, json!(2.5));
        assert_eq!(parse_override("len=2.5 mm").unwrap().parameter_value, json!("2.5 mm"));
        assert_eq!(parse_override("name=a=b").unwrap().parameter_value, json!("a=b"));
        assert!(parse_override("no-equals").is_none());
    }

    #[tokio::test]
    async fn test_overrides_encode_into_one_configuration() {
        let api = FakeApi::with_configuration(vec![]);
        let overrides = vec![
            "List_size=_l".to_string(),
            "bogus".to_string(),
            "Mirror=true".to_string(),
        ];

        let configs = select_configurations(&api, &doc(), &overrides).await;

        assert_eq!(names(&configs), vec!["List_size=_l, Mirror=true"]);
        assert_eq!(FakeApi::count(&api.encode_calls), 1);
    }

    #[tokio::test]
    async fn test_unusable_overrides_fall_back_to_discovery() {
        let api = FakeApi::with_configuration(vec![parameter("List_size", "Size", &[("_a", "A")])]);
        let overrides = vec!["bogus".to_string()];

        let configs = select_configurations(&api, &doc(), &overrides).await;

        assert_eq!(names(&configs), vec!["Default", "A"]);
    }

    #[tokio::test]
    async fn test_failed_override_encoding_falls_back_to_discovery() {
        let mut api = FakeApi::with_configuration(vec![]);
        api.failing_encodings = HashSet::from(["_x".to_string()]);
        let overrides = vec!["List_size=_x".to_string()];

        let configs = select_configurations(&api, &doc(), &overrides).await;

        assert_eq!(names(&configs), vec!["Default"]);
    }
}
