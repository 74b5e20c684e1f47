// Dispatch module
//
// Pure action execution: validate, bind, delegate. Translation of errors into
// envelopes and transport statuses happens at the router boundary in
// `api::mod`, keeping this path independently testable.

use std::collections::HashMap;
use std::sync::Arc;

use crate::api::actions;
use crate::storage::{QueryExecutor, Record, StorageError};

/// Per-request input: the action token (if any) plus the remaining query
/// parameters. Created per request, discarded with the response.
pub struct RequestContext {
    pub action: Option<String>,
    pub params: HashMap<String, String>,
}

impl RequestContext {
    /// Parse the URL query component. Parameters stay strings; any type
    /// coercion is left to the query binding. An empty value counts as
    /// absent, so `action=` and `category_id=` validate the same as no
    /// parameter at all.
    pub fn from_query(query: Option<&str>) -> Self {
        let mut params: HashMap<String, String> = HashMap::new();
        if let Some(q) = query {
            for (key, value) in url::form_urlencoded::parse(q.as_bytes()) {
                if value.is_empty() {
                    continue;
                }
                params.insert(key.into_owned(), value.into_owned());
            }
        }
        let action = params.remove("action");
        Self { action, params }
    }
}

/// How a dispatch can fail.
#[derive(Debug)]
pub enum DispatchError {
    /// No `action` parameter was supplied at all.
    MissingAction,
    /// The `action` value is not in the registry.
    UnknownAction,
    /// A registered action is missing one of its required parameters.
    MissingParam(&'static str),
    /// The storage collaborator failed.
    Storage(StorageError),
}

/// Run one action: look up its template, validate required parameters, bind
/// them in declaration order and delegate to the storage collaborator.
pub async fn run(
    ctx: &RequestContext,
    storage: &Arc<dyn QueryExecutor>,
) -> Result<Vec<Record>, DispatchError> {
    let action = ctx.action.as_deref().ok_or(DispatchError::MissingAction)?;
    let spec = actions::find(action).ok_or(DispatchError::UnknownAction)?;

    let mut bound = Vec::with_capacity(spec.required_params.len());
    for &param in spec.required_params {
        match ctx.params.get(param) {
            Some(value) => bound.push(value.clone()),
            None => return Err(DispatchError::MissingParam(param)),
        }
    }

    storage
        .execute(spec.sql, &bound)
        .await
        .map_err(DispatchError::Storage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_has_no_action() {
        let ctx = RequestContext::from_query(None);
        assert!(ctx.action.is_none());
        assert!(ctx.params.is_empty());

        let ctx = RequestContext::from_query(Some(""));
        assert!(ctx.action.is_none());
    }

    #[test]
    fn action_is_split_from_the_other_params() {
        let ctx = RequestContext::from_query(Some("action=get_category_products&category_id=7"));
        assert_eq!(ctx.action.as_deref(), Some("get_category_products"));
        assert_eq!(ctx.params.get("category_id").map(String::as_str), Some("7"));
        assert!(!ctx.params.contains_key("action"));
    }

    #[test]
    fn empty_values_count_as_absent() {
        let ctx = RequestContext::from_query(Some("action="));
        assert!(ctx.action.is_none());

        let ctx = RequestContext::from_query(Some("action=get_category_products&category_id="));
        assert_eq!(ctx.action.as_deref(), Some("get_category_products"));
        assert!(!ctx.params.contains_key("category_id"));
    }

    #[test]
    fn values_are_percent_decoded() {
        let ctx = RequestContext::from_query(Some("action=get_banners&note=a%20b%26c"));
        assert_eq!(ctx.params.get("note").map(String::as_str), Some("a b&c"));
    }

    #[test]
    fn repeated_keys_keep_the_last_value() {
        let ctx = RequestContext::from_query(Some("action=get_banners&action=get_categories"));
        assert_eq!(ctx.action.as_deref(), Some("get_categories"));
    }
}
