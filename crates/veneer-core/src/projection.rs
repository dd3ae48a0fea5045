//! Field projection filter
//!
//! Given the raw `fields` parameter of a read request, the schema of the
//! target resource, and the per-action policy, computes the authorized subset
//! of fields and one-hop related resources to include in the query. Unknown
//! or disallowed fields are dropped silently; that is policy, not validation.

use std::collections::{BTreeMap, BTreeSet};

/// Field names and one-hop associations of a resource.
///
/// Associations are keyed by relation name and resolved by direct lookup;
/// associations of an associated schema are never traversed.
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub name: String,
    pub fields: BTreeSet<String>,
    pub associations: BTreeMap<String, ResourceSchema>,
}

impl ResourceSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeSet::new(),
            associations: BTreeMap::new(),
        }
    }

    pub fn with_fields(
        mut self,
        fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Attach a one-hop association, keyed by the associated schema's name.
    pub fn with_association(mut self, schema: ResourceSchema) -> Self {
        self.associations.insert(schema.name.clone(), schema);
        self
    }
}

/// Per resource-action projection policy, configured once before request
/// handling and read-only during filtering.
#[derive(Debug, Clone, Default)]
pub struct FieldPolicy {
    /// Fully qualified fields a client may request; empty means all pass.
    pub field_whitelist: BTreeSet<String>,
    /// Fully qualified fields dropped regardless of other checks.
    pub field_blacklist: BTreeSet<String>,
    /// Relations a client may reach; relations not listed are dropped.
    pub relation_whitelist: BTreeSet<String>,
    /// Whether an empty selection means "no projection" instead of an error.
    pub allow_unfiltered: bool,
}

impl FieldPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_unfiltered(mut self) -> Self {
        self.allow_unfiltered = true;
        self
    }

    pub fn whitelist(
        mut self,
        fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.field_whitelist
            .extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn blacklist(
        mut self,
        fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.field_blacklist
            .extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn allow_relations(
        mut self,
        relations: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.relation_whitelist
            .extend(relations.into_iter().map(Into::into));
        self
    }
}

/// Authorized projection: qualified field names in first-occurrence order,
/// plus the relations those fields reach.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    pub fields: Vec<String>,
    pub relations: BTreeSet<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProjectionError {
    /// Empty selection while the policy does not allow unfiltered access.
    #[error("A list of requested fields is required")]
    MissingFieldSelection,
}

impl From<ProjectionError> for crate::error::ApiError {
    fn from(err: ProjectionError) -> Self {
        crate::error::ApiError::BadRequest(err.to_string())
    }
}

/// Resolve the raw comma-separated field selection against schema and policy.
///
/// An empty projection is returned for an empty selection under
/// `allow_unfiltered`; the caller interprets it as the full default field
/// set. Every other rejection drops the token silently.
pub fn resolve_fields(
    raw: Option<&str>,
    schema: &ResourceSchema,
    policy: &FieldPolicy,
) -> Result<Projection, ProjectionError> {
    let tokens: Vec<&str> = raw
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect();

    if tokens.is_empty() {
        if policy.allow_unfiltered {
            return Ok(Projection::default());
        }
        return Err(ProjectionError::MissingFieldSelection);
    }

    let mut projection = Projection::default();
    let mut seen = BTreeSet::new();

    for token in tokens {
        // Unqualified tokens belong to the primary resource
        let (qualifier, field) = token
            .split_once('.')
            .unwrap_or((schema.name.as_str(), token));

        let is_primary = qualifier == schema.name;
        let exists = if is_primary {
            schema.fields.contains(field)
        } else {
            // Nested qualifiers beyond one hop land here and fail the
            // field lookup on the related schema
            policy.relation_whitelist.contains(qualifier)
                && schema
                    .associations
                    .get(qualifier)
                    .is_some_and(|related| related.fields.contains(field))
        };
        if !exists {
            tracing::debug!(token, "Dropping unknown or unreachable field");
            continue;
        }

        let qualified = format!("{}.{}", qualifier, field);
        if !policy.field_whitelist.is_empty() && !policy.field_whitelist.contains(&qualified) {
            tracing::debug!(field = %qualified, "Dropping field outside whitelist");
            continue;
        }
        if policy.field_blacklist.contains(&qualified) {
            tracing::debug!(field = %qualified, "Dropping blacklisted field");
            continue;
        }

        if seen.insert(qualified.clone()) {
            if !is_primary {
                projection.relations.insert(qualifier.to_string());
            }
            projection.fields.push(qualified);
        }
    }

    Ok(projection)
}
