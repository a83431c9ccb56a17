//! Interactive tools driven by the host UI.
//!
//! ## Authoring Flow
//!
//! ```text
//! tap -> SceneHit
//!   ├─ marker 42 -> open_session -> AuthoringSession::for_record(42)
//!   └─ empty (x,y,z) -> open_session -> AuthoringSession::empty_at(x,y,z)
//!        └─ submit text/photo/voice
//!             ├─ first success on an empty session: create, adopt id
//!             └─ afterwards: update that id
//! ```
//!
//! Presentation of the create/update prompts is left to the UI; the tools
//! only own state and gateway traffic.

/// Create-then-update authoring sessions for text, photo and voice notes.
pub mod authoring;
