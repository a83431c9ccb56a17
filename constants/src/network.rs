/// Inventory service used when `INVENTORY_API_URL` is not set.
pub const DEFAULT_API_BASE_URL: &str = "http://granlund.lorenso.nl";

/// Rooms listing; every room carries its `inventory_items`.
pub const ROOMS_ENDPOINT: &str = "/api/rooms";

/// Collection endpoint for new inventory records. Modality is appended as a path segment.
pub const INVENTORY_ENDPOINT: &str = "/api/inventory";

/// Period between two registry refreshes while the scene is visible (seconds).
pub const DEFAULT_POLL_INTERVAL_SECS: f32 = 5.0;

/// Transport timeout applied to every gateway request (seconds).
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Multipart field names expected by the inventory service.
pub const IMAGE_FIELD: &str = "image";
pub const AUDIO_FIELD: &str = "audio";
