//! CSV rendering of audit entries.

use accredit_contracts::{
    audit::AuditLogEntry,
    error::{AccreditError, AccreditResult},
};

pub const EXPORT_HEADERS: [&str; 6] = [
    "Timestamp",
    "Actor",
    "Action",
    "Entity",
    "Summary",
    "IP Address",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn csv_error(e: impl std::fmt::Display) -> AccreditError {
    AccreditError::storage(format!("audit export failed: {}", e))
}

/// Render `entries` in the given order, one row each.
pub fn entries_to_csv<'a>(
    entries: impl IntoIterator<Item = &'a AuditLogEntry>,
) -> AccreditResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADERS).map_err(csv_error)?;

    for entry in entries {
        let timestamp = entry.timestamp.format(TIMESTAMP_FORMAT).to_string();
        let entity = entry.entity_label();
        writer
            .write_record([
                timestamp.as_str(),
                entry.actor_label(),
                entry.action.as_str(),
                entity.as_str(),
                entry.summary.as_str(),
                entry.ip_address.as_deref().unwrap_or(""),
            ])
            .map_err(csv_error)?;
    }

    writer.into_inner().map_err(csv_error)
}
