//! Named channel wire protocol.
//!
//! Newline-delimited JSON. The app layer sends method calls
//! (`{"id":1,"method":"updateNowPlaying","arguments":{...}}`) and gets a
//! reply per call carrying an `id`. The bridge sends method invocations
//! (`{"method":"seekTo","arguments":12345}`) without expecting a reply.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::media::{CommandAvailability, NowPlayingInfo, TransportCommand};

pub const METHOD_UPDATE_NOW_PLAYING: &str = "updateNowPlaying";
pub const METHOD_UPDATE_COMMAND_AVAILABILITY: &str = "updateCommandAvailability";

/// Method call from the app layer.
#[derive(Debug, Clone, Deserialize)]
pub struct MethodCall {
  #[serde(default)]
  pub id: Option<i64>,
  pub method: String,
  #[serde(default)]
  pub arguments: Value,
}

/// Decoded bridge method.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeMethod {
  UpdateNowPlaying(NowPlayingInfo),
  UpdateCommandAvailability(CommandAvailability),
  Unknown(String),
}

impl MethodCall {
  /// Decode the method name and arguments.
  pub fn decode(&self) -> Result<BridgeMethod, serde_json::Error> {
    match self.method.as_str() {
      METHOD_UPDATE_NOW_PLAYING => Ok(BridgeMethod::UpdateNowPlaying(
        serde_json::from_value(self.arguments.clone())?,
      )),
      METHOD_UPDATE_COMMAND_AVAILABILITY => Ok(BridgeMethod::UpdateCommandAvailability(
        serde_json::from_value(self.arguments.clone())?,
      )),
      other => Ok(BridgeMethod::Unknown(other.to_string())),
    }
  }
}

/// Error codes sent back to the app layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
  NotImplemented,
  BadArguments,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
  pub code: ErrorCode,
  pub message: String,
}

/// Reply to a method call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodResponse {
  pub id: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub result: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<ResponseError>,
}

impl MethodResponse {
  pub fn success(id: Option<i64>) -> Self {
    Self {
      id,
      result: Some(Value::Null),
      error: None,
    }
  }

  pub fn not_implemented(id: Option<i64>, method: &str) -> Self {
    Self::error(id, ErrorCode::NotImplemented, format!("Method not implemented: {}", method))
  }

  pub fn bad_arguments(id: Option<i64>, message: String) -> Self {
    Self::error(id, ErrorCode::BadArguments, message)
  }

  fn error(id: Option<i64>, code: ErrorCode, message: String) -> Self {
    Self {
      id,
      result: None,
      error: Some(ResponseError { code, message }),
    }
  }

  /// Check if the call succeeded.
  pub fn is_success(&self) -> bool {
    self.error.is_none()
  }
}

/// Method invocation sent to the app layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
  pub method: String,
  pub arguments: Value,
}

impl From<TransportCommand> for Invocation {
  fn from(command: TransportCommand) -> Self {
    Self {
      method: command.method().to_string(),
      arguments: command.arguments(),
    }
  }
}

/// Line received on the channel.
#[derive(Debug, Clone)]
pub enum ChannelMessage {
  Call(MethodCall),
  /// Anything without a `method` key, e.g. a stray reply. Ignored.
  Other(Value),
}

impl ChannelMessage {
  /// Parse a JSON line from the app layer.
  pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
    let value: Value = serde_json::from_str(line)?;
    if value.get("method").is_some() {
      Ok(ChannelMessage::Call(serde_json::from_value(value)?))
    } else {
      Ok(ChannelMessage::Other(value))
    }
  }
}
