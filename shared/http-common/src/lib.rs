//! Shared HTTP utilities for the Profile service workspace.
//!
//! Provides framework-agnostic JSON error bodies and resource path helpers
//! used by the api-server.

// ============================================================================
// JSON Response Helpers (framework-agnostic)
// ============================================================================

/// Create a structured error JSON with a default message based on the code.
///
/// Returns: `{"error": {"code": "<code>", "message": "<default message>"}}`
pub fn json_err(code: &str) -> serde_json::Value {
    let message = match code {
        "bad_request" => "Bad request",
        "invalid_id" => "Invalid profile id",
        "error" | "internal" => "Internal server error",
        _ => code, // Fallback to code as message for unknown codes
    };
    serde_json::json!({"error": {"code": code, "message": message}})
}

/// Create a structured error JSON with a custom message.
///
/// Returns: `{"error": {"code": "<code>", "message": "<message>"}}`
pub fn json_error_with_message(code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({"error": {"code": code, "message": message}})
}

// ============================================================================
// Resource Paths
// ============================================================================

/// Build the path of a single resource below a collection prefix.
///
/// Trailing slashes on the prefix are ignored: `("/profiles/", "42")` and
/// `("/profiles", "42")` both give `/profiles/42`.
pub fn location_for(prefix: &str, id: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), id)
}
