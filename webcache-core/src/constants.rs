//! Defaults and key-family markers for WEBCACHE.

// ═══════════════════════════════════════════════════════════════════════════════
// CACHING
// ═══════════════════════════════════════════════════════════════════════════════

/// Default lifetime of a cached fetch result, in seconds.
pub const DEFAULT_TTL_SECONDS: u64 = 10;

/// Default request timeout for the HTTP fetcher, in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;

/// Default bound on cached results held by the in-memory store.
pub const DEFAULT_MEMORY_MAX_ENTRIES: usize = 10_000;

// ═══════════════════════════════════════════════════════════════════════════════
// KEY FAMILIES
// ═══════════════════════════════════════════════════════════════════════════════
// Each fetch key maps to exactly one key per family. The family marker sits
// at a fixed position so two families can never produce the same store key.

/// Marker for the family holding cached fetch results.
pub const RESULT_FAMILY: &str = "result";

/// Marker for the family holding per-key access counters.
pub const COUNT_FAMILY: &str = "count";

/// Separator between namespace, family and fetch key.
pub const KEY_SEPARATOR: char = ':';

// ═══════════════════════════════════════════════════════════════════════════════
// DEMO
// ═══════════════════════════════════════════════════════════════════════════════

/// URL fetched by the CLI demo when none is given.
pub const DEMO_URL: &str = "http://google.com";
