/// Access to the query string of the current location.
///
/// Writes use history *replace* semantics so per-keystroke updates do not pile
/// up back/forward entries.
pub trait LocationPort: Send + Sync {
    /// Current query string, with or without the leading `?`.
    fn query_string(&self) -> String;

    /// Replace the current query string in place.
    fn replace_query_string(&self, query: &str);
}
