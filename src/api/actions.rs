// Action registry module
//
// The dispatch table: one entry per registered read action. Adding an action
// is a data addition here, not a control-flow change in the router.

/// A registered read action: its token, the parameters it requires and the
/// query template those parameters bind into (in `required_params` order).
///
/// Every template applies the `status = 1` filter server-side; it is not a
/// client-controllable input.
#[derive(Debug, Clone, Copy)]
pub struct ActionSpec {
    pub name: &'static str,
    pub required_params: &'static [&'static str],
    pub sql: &'static str,
}

/// All registered actions.
pub const ACTIONS: &[ActionSpec] = &[
    ActionSpec {
        name: "get_banners",
        required_params: &[],
        sql: "SELECT * FROM homepage_banners WHERE status = 1 ORDER BY sort_order ASC",
    },
    ActionSpec {
        name: "get_categories",
        required_params: &[],
        sql: "SELECT * FROM homepage_categories WHERE status = 1 ORDER BY sort_order ASC",
    },
    ActionSpec {
        name: "get_stories",
        required_params: &[],
        sql: "SELECT * FROM homepage_origin_stories WHERE status = 1 ORDER BY sort_order ASC",
    },
    ActionSpec {
        name: "get_seasonal_products",
        required_params: &[],
        sql: "SELECT * FROM homepage_products WHERE status = 1 AND is_seasonal = 1 \
              ORDER BY sort_order ASC",
    },
    ActionSpec {
        name: "get_popular_products",
        required_params: &[],
        sql: "SELECT * FROM homepage_products WHERE status = 1 AND is_popular = 1 \
              ORDER BY sort_order ASC",
    },
    ActionSpec {
        name: "get_category_products",
        required_params: &["category_id"],
        sql: "SELECT * FROM homepage_products WHERE status = 1 AND category_id = ? \
              ORDER BY sort_order ASC",
    },
];

/// Look up an action by its token.
pub fn find(name: &str) -> Option<&'static ActionSpec> {
    ACTIONS.iter().find(|spec| spec.name == name)
}
