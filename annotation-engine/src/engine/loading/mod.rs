//! Scene manifest loading.

/// Requests the manifest and applies it once the asset server delivers it.
pub mod manifest_loader;
