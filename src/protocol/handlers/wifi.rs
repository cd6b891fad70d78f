use serde_json::Value;

use crate::error::HandlerError;
use crate::protocol::wire;
use crate::wifi;

pub async fn scan() -> Result<String, HandlerError> {
    let networks = wifi::scan().await?;
    Ok(wire::response("wifi_scan", &serde_json::to_string(&networks)?))
}

pub async fn status() -> Result<String, HandlerError> {
    let status = wifi::status().await?;
    Ok(wire::response("wifi_status", &serde_json::to_string(&status)?))
}

pub async fn config(payload: &str) -> Result<String, HandlerError> {
    let data: Value = if payload.is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_str(payload)?
    };

    let ssid = data.get("ssid").and_then(Value::as_str).unwrap_or("");
    if ssid.is_empty() {
        return Err(HandlerError::MissingField("ssid"));
    }
    let password = data.get("password").and_then(Value::as_str);

    let result = wifi::config(ssid, password).await?;
    Ok(wire::response("wifi_config", &serde_json::to_string(&result)?))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn config_requires_an_ssid() {
        let error = config("{}").await.unwrap_err();
        assert_eq!("missing ssid field", error.to_string());
    }
}
