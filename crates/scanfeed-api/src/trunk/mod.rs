// Trunk Recorder HTTP API
//
// Read-only endpoints for systems, talkgroups, calls and call audio.
// Endpoint groups live in their own files as inherent `impl TrunkClient`
// blocks; `client.rs` owns URL construction and response handling.

mod calls;
pub mod client;
pub mod models;
mod systems;

pub use client::{AudioPayload, TrunkClient};
pub use models::{ApiCall, ApiCallPatch, ApiSystem, ApiTalkgroup, WireTimestamp};
