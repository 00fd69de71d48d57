// ── Feed domain model ──
//
// Canonical representation of scanner data, independent of which back
// end produced it. Both the Trunk Recorder API and the Rdio Scanner
// database are converted into these types before reaching the store.

pub mod audio;
pub mod call;
pub mod event;
pub mod system;

// ── Re-exports ──────────────────────────────────────────────────────

pub use audio::AudioClip;
pub use call::{AudioReference, Call, CallUpdate};
pub use event::FeedEvent;
pub use system::{System, Talkgroup};
