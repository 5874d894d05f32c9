//! Site listing query rewriting.
//!
//! Lets a site search match on the display name stored in blog meta as well
//! as on the domain. The rewrite works on the clause strings the host builds
//! and knows nothing else about the query.

use std::collections::HashMap;

use blogmeta_core::{OptionValue, SyncConfig};

/// Query var that makes the host prime blog meta for listed sites.
pub const PRIME_META_QUERY_VAR: &str = "update_blog_meta_cache";

/// The clause set of a site listing query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteQueryClauses {
    pub fields: String,
    pub join: String,
    pub where_clause: String,
    pub groupby: String,
}

/// Extend `clauses` so `search` also matches the display name in blog meta.
///
/// An empty search leaves the clauses as they are. The term is escaped for a
/// LIKE pattern inside a single-quoted literal before it is embedded.
pub fn augment_site_search(clauses: &mut SiteQueryClauses, search: &str, config: &SyncConfig) {
    if search.is_empty() {
        return;
    }

    let blogs = &config.blogs_table;
    clauses.join.push_str(&format!(
        " LEFT JOIN {meta} AS sq1 ON ( {blogs}.blog_id = sq1.blog_id AND sq1.meta_key = '{name}' )",
        meta = config.blogmeta_table,
        name = escape_sql(config.display_name_key.as_str()),
    ));
    clauses.groupby = format!("{blogs}.blog_id");
    clauses.fields = format!("{blogs}.blog_id");

    let pattern = escape_sql(&escape_like(search));
    clauses.where_clause = clauses.where_clause.replace(
        "(domain LIKE",
        &format!("(sq1.meta_value LIKE '%{pattern}%' OR domain LIKE"),
    );
}

/// Default the host's site query to prime blog meta, unless already set.
pub fn prime_site_query_defaults(query_var_defaults: &mut HashMap<String, OptionValue>) {
    query_var_defaults
        .entry(PRIME_META_QUERY_VAR.to_string())
        .or_insert(OptionValue::Bool(true));
}

/// Escape LIKE wildcards and the escape character itself.
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape a value for a quoted SQL string literal.
pub fn escape_sql(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' | '\'' | '"' => {
                out.push('\\');
                out.push(c);
            }
            '\0' => out.push_str("\\0"),
            _ => out.push(c),
        }
    }
    out
}
