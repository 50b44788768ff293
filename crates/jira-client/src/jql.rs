//! Rendering gate predicates as JQL.

use branchgate_core::{IssueQuery, ResolutionFilter};

/// Quote a JQL string literal.
pub fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// JQL selecting the issues of `project_key` that match `query`.
///
/// `branch_field` is the numeric id of the custom field holding the branch.
pub fn render(project_key: &str, branch_field: u32, query: &IssueQuery) -> String {
    let mut clauses = vec![
        format!("project = {}", quote(project_key)),
        format!("status = {}", quote(&query.status)),
    ];
    match query.resolution {
        ResolutionFilter::Any => {}
        ResolutionFilter::Fixed => clauses.push("resolution = Fixed".to_string()),
        ResolutionFilter::NotFixed => clauses.push("resolution != Fixed".to_string()),
    }
    if let Some(branch) = &query.branch {
        clauses.push(format!("cf[{}] = {}", branch_field, quote(branch.as_str())));
    }
    clauses.join(" and ")
}
