//! Request extractors for field projection

use std::convert::Infallible;

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct FieldsQuery {
    fields: Option<String>,
}

/// Raw `fields` query parameter of a read request, to be resolved against a
/// schema and policy with [`veneer_core::resolve_fields`]. A missing or
/// unparsable query string yields `None`; emptiness policy is applied at
/// resolution time, not here.
#[derive(Debug, Clone)]
pub struct FieldSelection(pub Option<String>);

impl<S> FromRequestParts<S> for FieldSelection
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let fields = Query::<FieldsQuery>::try_from_uri(&parts.uri)
            .map(|Query(query)| query.fields)
            .unwrap_or(None);
        Ok(FieldSelection(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Uri;

    fn selection_from(uri: &str) -> Option<String> {
        let uri: Uri = uri.parse().expect("uri");
        Query::<FieldsQuery>::try_from_uri(&uri)
            .map(|Query(query)| query.fields)
            .unwrap_or(None)
    }

    #[test]
    fn test_fields_parameter_extracted() {
        assert_eq!(
            selection_from("/articles?fields=Articles.id%2CAuthors.name"),
            Some("Articles.id,Authors.name".to_string())
        );
    }

    #[test]
    fn test_missing_parameter_is_none() {
        assert_eq!(selection_from("/articles"), None);
        assert_eq!(selection_from("/articles?limit=10"), None);
    }
}
