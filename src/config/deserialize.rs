// ABOUTME: Custom serde deserializers for config values.
// ABOUTME: Rejects blank container references and log levels at parse time.

use serde::Deserialize;

pub fn deserialize_container<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(s) => {
            let trimmed = s.trim().trim_start_matches('/');
            if trimmed.is_empty() {
                Err(serde::de::Error::custom("container cannot be empty"))
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
    }
}

pub fn deserialize_log_level<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(serde::de::Error::custom("log_level cannot be empty"));
    }
    Ok(trimmed.to_string())
}
