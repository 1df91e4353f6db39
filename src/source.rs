//! Collaborator contracts: the read-side data source and the row mutation
//! endpoint. Both are implemented by the embedding application (typically
//! over its REST client); the engine only depends on these traits.

use crate::error::ListResult;
use crate::DatasetItem;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Structural filters and ambient scope sent with every query. The server
/// is expected to return the complete result set for the given filters; no
/// server-side pagination is assumed.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ListQuery {
    /// Structural filter entries, keyed by field name
    pub filters: BTreeMap<String, String>,

    /// Ambient scope token (e.g. the selected division)
    pub scope: Option<String>,
}

/// Read side of the backing service.
#[async_trait]
pub trait DataSource<T: DatasetItem>: Send + Sync {
    /// Standard listing query for the given filters.
    async fn list(&self, query: &ListQuery) -> ListResult<Vec<T>>;

    /// Server-side text search, issued instead of `list` once the search
    /// term passes the length threshold.
    async fn search(&self, term: &str, query: &ListQuery) -> ListResult<Vec<T>>;
}

/// Write side of the backing service: one canonical update route. The
/// returned record is the server's post-update view of the row and is what
/// gets applied to local state.
#[async_trait]
pub trait MutationEndpoint<T: DatasetItem>: Send + Sync {
    async fn update(&self, id: &str, patch: serde_json::Value) -> ListResult<T>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_serializes_deterministically() {
        let mut query = ListQuery::default();
        query.filters.insert("warehouse".into(), "W1".into());
        query.filters.insert("executive".into(), "E7".into());
        query.scope = Some("north".into());

        // BTreeMap keys serialize in order, so identical filter sets always
        // produce identical wire payloads.
        let json = serde_json::to_string(&query).unwrap();
        assert_eq!(
            json,
            r#"{"filters":{"executive":"E7","warehouse":"W1"},"scope":"north"}"#
        );
    }
}
