//! Named channel between the app layer and the bridge.
//!
//! Architecture:
//! - `protocol.rs` - JSON method call/response/invocation types
//! - `ipc.rs` - Socket/pipe server and the outbound app endpoint

mod ipc;
mod protocol;

pub use ipc::{channel_path, sanitize_channel_name, AppChannel, ChannelError, ChannelServer, MethodHandler};
pub use protocol::{
  BridgeMethod, ChannelMessage, ErrorCode, Invocation, MethodCall, MethodResponse, ResponseError,
  METHOD_UPDATE_COMMAND_AVAILABILITY, METHOD_UPDATE_NOW_PLAYING,
};
