//! Conjunctive filtering and paging over stored entries.

use accredit_contracts::{
    audit::{AuditFilter, AuditLogEntry, AuditPage, PageRequest},
    config::AuditConfig,
};

/// True when `entry` satisfies every criterion set on `filter`.
pub fn matches(filter: &AuditFilter, entry: &AuditLogEntry) -> bool {
    if let Some(actor) = filter.actor.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        let actor = actor.to_lowercase();
        let by_id = entry
            .actor_id
            .as_deref()
            .is_some_and(|id| id.to_lowercase() == actor);
        let by_name = entry
            .actor_name
            .as_deref()
            .is_some_and(|name| name.to_lowercase() == actor);
        if !(by_id || by_name) {
            return false;
        }
    }
    if filter.action.is_some_and(|a| a != entry.action) {
        return false;
    }
    if let Some(entity_type) = &filter.entity_type {
        if !entity_type.trim().eq_ignore_ascii_case(&entry.entity_type) {
            return false;
        }
    }
    if let Some(text) = &filter.text {
        if !entry.summary.to_lowercase().contains(&text.trim().to_lowercase()) {
            return false;
        }
    }
    if filter.from.is_some_and(|from| entry.timestamp < from) {
        return false;
    }
    if filter.to.is_some_and(|to| entry.timestamp > to) {
        return false;
    }
    true
}

/// Matching entries, newest first. `entries` is in append order.
pub fn newest_first<'a>(
    entries: &'a [AuditLogEntry],
    filter: &'a AuditFilter,
) -> impl Iterator<Item = &'a AuditLogEntry> + 'a {
    entries.iter().rev().filter(move |e| matches(filter, e))
}

/// One page of matching entries.
pub fn paginate(
    entries: &[AuditLogEntry],
    filter: &AuditFilter,
    request: PageRequest,
    config: &AuditConfig,
) -> AuditPage {
    let per_page = request.per_page(config.default_page_size, config.max_page_size);
    let offset = request.offset(config.default_page_size, config.max_page_size);

    let matching: Vec<&AuditLogEntry> = newest_first(entries, filter).collect();
    let total = matching.len();
    let page = matching
        .into_iter()
        .skip(offset)
        .take(per_page)
        .cloned()
        .collect();

    AuditPage {
        entries: page,
        total,
        page: request.page(),
        per_page,
    }
}
