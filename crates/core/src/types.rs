/// All timestamps are UTC; persisted and wire formats use epoch milliseconds.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a fresh request id.
///
/// Ids are opaque to every consumer; the `req_` prefix plus a v4 UUID keeps
/// them unique for the lifetime of any store (collisions are still checked
/// on insert).
pub fn generate_request_id() -> String {
    format!("req_{}", uuid::Uuid::new_v4().simple())
}
