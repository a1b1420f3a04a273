//! # accredit-contracts
//!
//! Shared types and contracts for the compliance tracker.
//!
//! Every crate in the workspace imports from here. Apart from the payload
//! sanitizer, which must be the only producer of `SanitizedPayload`, no
//! business logic lives in this crate: only data definitions, configuration
//! and error types.

pub mod access;
pub mod actor;
pub mod attestation;
pub mod audit;
pub mod capability;
pub mod config;
pub mod error;
pub mod evidence;
pub mod ids;
pub mod indicator;
pub mod payload;
pub mod project;
pub mod validation;

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use actor::{Actor, Principal, RequestContext};
    use audit::{AuditAction, PageRequest};
    use capability::{CapabilitySet, Role};
    use config::{AppConfig, UploadConstraints};
    use error::AccreditError;
    use indicator::{DueStatus, Frequency};
    use payload::{sanitize, sanitize_opt, Payload, REDACTED};

    // ── Sanitizer ────────────────────────────────────────────────────────────

    #[test]
    fn sanitize_redacts_sensitive_keys_case_insensitively() {
        let payload = Payload::object([
            ("Password", Payload::from("hunter2")),
            ("CSRFToken", Payload::from("abc")),
            ("name", Payload::from("Ward 3")),
        ]);
        let clean = sanitize(&payload);
        assert_eq!(
            clean.as_json(),
            &json!({ "Password": REDACTED, "CSRFToken": REDACTED, "name": "Ward 3" })
        );
    }

    #[test]
    fn sanitize_redacts_at_any_depth() {
        let payload = Payload::object([(
            "outer",
            Payload::List(vec![Payload::object([(
                "inner",
                Payload::object([("Session", Payload::from("s-1")), ("keep", Payload::from(1i64))]),
            )])]),
        )]);
        let clean = sanitize(&payload);
        assert_eq!(clean.as_json()["outer"][0]["inner"]["Session"], json!(REDACTED));
        assert_eq!(clean.as_json()["outer"][0]["inner"]["keep"], json!(1));
    }

    #[test]
    fn sanitize_redacts_whole_subtree_under_sensitive_key() {
        let payload = Payload::object([(
            "token",
            Payload::object([("nested", Payload::from("value"))]),
        )]);
        assert_eq!(sanitize(&payload).as_json(), &json!({ "token": REDACTED }));
    }

    #[test]
    fn sanitize_stringifies_typed_scalars() {
        let id = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap();
        let payload = Payload::object([
            ("id", Payload::from(id)),
            ("date", Payload::from(date)),
            ("at", Payload::from(ts)),
            ("amount", Payload::from(Decimal::new(12345, 2))),
            ("flag", Payload::from(true)),
            ("none", Payload::Null),
        ]);
        let clean = sanitize(&payload);
        assert_eq!(clean.get("id"), Some(&json!(id.to_string())));
        assert_eq!(clean.get("date"), Some(&json!("2026-03-01")));
        assert_eq!(clean.get("at"), Some(&json!("2026-03-01T08:30:00.000000Z")));
        assert_eq!(clean.get("amount"), Some(&json!("123.45")));
        assert_eq!(clean.get("flag"), Some(&json!(true)));
        assert_eq!(clean.get("none"), Some(&json!(null)));
    }

    #[test]
    fn sanitize_null_and_none() {
        assert_eq!(sanitize(&Payload::Null).as_json(), &json!(null));
        assert!(sanitize_opt(None).is_none());
    }

    #[test]
    fn sanitize_accepts_json_documents() {
        let payload = Payload::from(json!({ "headers": { "Authorization": "Bearer x" }, "n": [1, 2] }));
        let clean = sanitize(&payload);
        assert_eq!(clean.as_json(), &json!({ "headers": { "Authorization": REDACTED }, "n": [1, 2] }));
    }

    // ── Request context ──────────────────────────────────────────────────────

    #[test]
    fn client_ip_prefers_first_forwarded_hop() {
        let ctx = RequestContext {
            forwarded_for: Some(" 10.0.0.7 , 172.16.0.1".to_string()),
            remote_addr: Some("127.0.0.1".to_string()),
            user_agent: None,
        };
        assert_eq!(ctx.client_ip().as_deref(), Some("10.0.0.7"));
    }

    #[test]
    fn client_ip_falls_back_to_remote_addr() {
        let ctx = RequestContext {
            forwarded_for: Some("   ".to_string()),
            remote_addr: Some("192.168.1.4".to_string()),
            user_agent: None,
        };
        assert_eq!(ctx.client_ip().as_deref(), Some("192.168.1.4"));
        assert_eq!(RequestContext::default().client_ip(), None);
    }

    // ── Principal / capabilities ─────────────────────────────────────────────

    #[test]
    fn capability_roles_are_stable() {
        let caps = CapabilitySet {
            is_admin: true,
            is_reviewer: false,
            is_contributor: true,
        };
        assert_eq!(caps.roles(), vec![Role::Admin, Role::Contributor]);
        assert!(CapabilitySet::none().roles().is_empty());
    }

    #[test]
    fn system_principal_is_authenticated_without_actor() {
        let system = Principal::system();
        assert!(system.is_authenticated());
        assert!(system.actor_id().is_none());
        assert!(!Principal::anonymous().is_authenticated());

        let user = Principal::user(Actor::new("u-1", "Ann"), CapabilitySet::reviewer());
        assert_eq!(user.actor_id(), Some("u-1"));
    }

    // ── Enums ────────────────────────────────────────────────────────────────

    #[test]
    fn frequency_parses_loosely() {
        assert_eq!("monthly".parse::<Frequency>(), Ok(Frequency::Monthly));
        assert_eq!("One-Time".parse::<Frequency>(), Ok(Frequency::OneTime));
        assert_eq!(" ANNUALLY ".parse::<Frequency>(), Ok(Frequency::Annually));
        assert!("fortnightly".parse::<Frequency>().is_err());
    }

    #[test]
    fn enums_serialize_screaming_snake_case() {
        assert_eq!(serde_json::to_value(DueStatus::NotStarted).unwrap(), json!("NOT_STARTED"));
        assert_eq!(serde_json::to_value(Frequency::OneTime).unwrap(), json!("ONE_TIME"));
        assert_eq!(serde_json::to_value(AuditAction::ExportLogs).unwrap(), json!("EXPORT_LOGS"));
        assert_eq!("download_evidence".parse::<AuditAction>(), Ok(AuditAction::DownloadEvidence));
    }

    // ── Paging / config ──────────────────────────────────────────────────────

    #[test]
    fn page_request_clamps() {
        let req = PageRequest::new(0, 10_000);
        assert_eq!(req.page(), 1);
        assert_eq!(req.per_page(50, 500), 500);
        assert_eq!(PageRequest::default().per_page(50, 500), 50);
        assert_eq!(PageRequest::new(3, 20).offset(50, 500), 40);
    }

    #[test]
    fn empty_document_is_default_config() {
        let config: AppConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config.due_soon.max_days, 3);
        assert_eq!(config.uploads.max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.audit.default_page_size, 50);
        assert_eq!(config.snapshot.recent_limit, 50);
    }

    #[test]
    fn upload_extension_helpers() {
        let limits = UploadConstraints::default();
        assert_eq!(UploadConstraints::extension_of("Report.PDF").as_deref(), Some("pdf"));
        assert_eq!(UploadConstraints::extension_of("noext"), None);
        assert_eq!(UploadConstraints::extension_of(".bashrc"), None);
        assert!(limits.permits_extension("XLSX"));
        assert!(!limits.permits_extension("exe"));
    }

    // ── Error display ────────────────────────────────────────────────────────

    #[test]
    fn error_permission_denied_display() {
        let err = AccreditError::PermissionDenied {
            action: "import".to_string(),
            resource: "indicator".to_string(),
            reason: "admin only".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("import"));
        assert!(msg.contains("indicator"));
        assert!(msg.contains("admin only"));
    }

    #[test]
    fn error_not_found_display() {
        let err = AccreditError::not_found("Indicator", "abc");
        assert_eq!(err.to_string(), "Indicator 'abc' not found");
    }

    #[test]
    fn validation_report_collects_every_failure() {
        let mut report = validation::ValidationReport::default();
        report.fail("url", "must start with http:// or https://");
        report.fail("note_text", "required");
        let err = report.into_result().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("url"));
        assert!(msg.contains("note_text"));
    }
}
