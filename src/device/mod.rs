// Device collaborators: screen capture and simulated key input.
// Platform backends implement the traits in `types`; this crate ships
// file-backed capture and a dry-run keyboard.

pub mod keys;
pub mod replay;
pub mod types;

pub use keys::DryRunKeyInput;
pub use replay::{FrameSequenceCapture, StillCapture, crop_to_region};
pub use types::{KeyInput, KeySpec, Modifier, ScreenCapture};
