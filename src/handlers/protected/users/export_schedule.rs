use axum::extract::{Extension, Query};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::config;
use crate::database::models::export_schedule::{next_run_after, parse_time_of_day};
use crate::database::models::{
    BulkScheduleAction, CreateExportSchedule, ExportFrequency, ExportSchedule, UpdateExportSchedule,
};
use crate::database::queries::{self, export_schedules::ScheduleInsert};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser, DbPool, TenantContext};
use crate::permissions::{require_permission, Permission};
use crate::report::ReportFormat;

use super::super::utils::{normalize_email, optional_text, parse_id};

const DEFAULT_TIME: &str = "09:00";

/// Schedule fields as sent by clients (camelCase). Shared by create and
/// single-row PATCH, where it is first overlaid on the stored row.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleFields {
    pub name: Option<String>,
    pub frequency: Option<String>,
    pub format: Option<String>,
    pub recipients: Option<Vec<String>>,
    pub day_of_week: Option<i64>,
    pub day_of_month: Option<i64>,
    pub time: Option<String>,
    pub email_subject: Option<String>,
    pub email_body: Option<String>,
    pub filter_preset_id: Option<String>,
    pub is_active: Option<bool>,
}

impl ScheduleFields {
    /// Check every field. Runs before any store access so a rejected
    /// request never creates a row.
    pub fn validate(self, max_recipients: usize) -> Result<CreateExportSchedule, ApiError> {
        let name = optional_text(self.name);
        let frequency = optional_text(self.frequency);
        let format = optional_text(self.format);
        let recipients: Vec<String> = self
            .recipients
            .unwrap_or_default()
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();

        let mut missing = HashMap::new();
        if name.is_none() {
            missing.insert("name".to_string(), "name is required".to_string());
        }
        if frequency.is_none() {
            missing.insert("frequency".to_string(), "frequency is required".to_string());
        }
        if format.is_none() {
            missing.insert("format".to_string(), "format is required".to_string());
        }
        if recipients.is_empty() {
            missing.insert("recipients".to_string(), "At least one recipient is required".to_string());
        }
        let (Some(name), Some(frequency), Some(format)) = (name, frequency, format) else {
            return Err(ApiError::validation_error("Missing required fields", Some(missing)));
        };
        if !missing.is_empty() {
            return Err(ApiError::validation_error("Missing required fields", Some(missing)));
        }

        let frequency = ExportFrequency::from_str(&frequency).ok_or_else(|| {
            ApiError::invalid_field("frequency", format!("Unknown frequency '{}' (daily, weekly, monthly)", frequency))
        })?;
        let format = ReportFormat::from_str(&format).ok_or_else(|| {
            ApiError::invalid_field("format", format!("Unknown format '{}' (csv, tsv, json, html)", format))
        })?;

        let mut normalized = Vec::with_capacity(recipients.len());
        for recipient in &recipients {
            let email = normalize_email("recipients", recipient)?;
            if !normalized.contains(&email) {
                normalized.push(email);
            }
        }
        if normalized.len() > max_recipients {
            return Err(ApiError::invalid_field(
                "recipients",
                format!("At most {} recipients are allowed", max_recipients),
            ));
        }

        let (day_of_week, day_of_month) = match frequency {
            ExportFrequency::Daily => (None, None),
            ExportFrequency::Weekly => match self.day_of_week {
                Some(d) if (0..=6).contains(&d) => (Some(d as i16), None),
                Some(_) => return Err(ApiError::invalid_field("dayOfWeek", "dayOfWeek must be between 0 and 6")),
                None => return Err(ApiError::invalid_field("dayOfWeek", "dayOfWeek is required for weekly schedules")),
            },
            ExportFrequency::Monthly => match self.day_of_month {
                Some(d) if (1..=31).contains(&d) => (None, Some(d as i16)),
                Some(_) => return Err(ApiError::invalid_field("dayOfMonth", "dayOfMonth must be between 1 and 31")),
                None => {
                    return Err(ApiError::invalid_field("dayOfMonth", "dayOfMonth is required for monthly schedules"))
                }
            },
        };

        let raw_time = optional_text(self.time).unwrap_or_else(|| DEFAULT_TIME.to_string());
        let time = parse_time_of_day(&raw_time)
            .ok_or_else(|| ApiError::invalid_field("time", format!("time '{}' must be HH:MM", raw_time)))?;

        let filter_preset_id = match optional_text(self.filter_preset_id) {
            Some(raw) => Some(
                Uuid::parse_str(&raw).map_err(|_| ApiError::invalid_field("filterPresetId", "filterPresetId is not a valid id"))?,
            ),
            None => None,
        };

        Ok(CreateExportSchedule {
            name,
            frequency,
            format,
            recipients: normalized,
            day_of_week,
            day_of_month,
            time,
            email_subject: optional_text(self.email_subject),
            email_body: optional_text(self.email_body),
            filter_preset_id,
            is_active: self.is_active.unwrap_or(true),
        })
    }

    /// Fill absent fields from the stored schedule
    pub fn merged_over(self, existing: &ExportSchedule) -> ScheduleFields {
        ScheduleFields {
            name: self.name.or_else(|| Some(existing.name.clone())),
            // A stored value that no longer parses is treated as missing
            frequency: self.frequency.or_else(|| existing.frequency().map(|f| f.as_str().to_string())),
            format: self.format.or_else(|| existing.format().map(|f| f.as_str().to_string())),
            recipients: self.recipients.or_else(|| Some(existing.recipients.clone())),
            day_of_week: self.day_of_week.or(existing.day_of_week.map(i64::from)),
            day_of_month: self.day_of_month.or(existing.day_of_month.map(i64::from)),
            time: self.time.or_else(|| Some(existing.time.clone())),
            email_subject: self.email_subject.or_else(|| existing.email_subject.clone()),
            email_body: self.email_body.or_else(|| existing.email_body.clone()),
            filter_preset_id: self
                .filter_preset_id
                .or_else(|| existing.filter_preset_id.map(|id| id.to_string())),
            is_active: self.is_active.or(Some(existing.is_active)),
        }
    }

    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.frequency.is_none()
            && self.format.is_none()
            && self.recipients.is_none()
            && self.day_of_week.is_none()
            && self.day_of_month.is_none()
            && self.time.is_none()
            && self.email_subject.is_none()
            && self.email_body.is_none()
            && self.filter_preset_id.is_none()
            && self.is_active.is_none()
    }
}

/// PATCH body: either `{ids, action}` or `{id, ...fields}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchScheduleRequest {
    pub id: Option<String>,
    pub ids: Option<Vec<String>>,
    pub action: Option<String>,
    #[serde(flatten)]
    pub fields: ScheduleFields,
}

#[derive(Debug, Deserialize)]
pub struct DeleteScheduleQuery {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteScheduleBody {
    pub ids: Option<Vec<String>>,
}

pub fn parse_bulk_action(raw: &str) -> Result<BulkScheduleAction, ApiError> {
    serde_json::from_value(Value::String(raw.trim().to_string())).map_err(|_| {
        ApiError::invalid_field(
            "action",
            format!("Unknown action '{}' (activate, deactivate, toggleActive)", raw),
        )
    })
}

fn parse_ids(raw: &[String]) -> Result<Vec<Uuid>, ApiError> {
    let ids = raw
        .iter()
        .map(|id| parse_id(id, "schedule"))
        .collect::<Result<Vec<_>, _>>()?;
    if ids.is_empty() {
        return Err(ApiError::invalid_field("ids", "ids must not be empty"));
    }
    Ok(ids)
}

/// The referenced preset must exist in the tenant and be visible to the caller
async fn ensure_preset_visible(
    pool: &PgPool,
    tenant_id: Uuid,
    user_id: Uuid,
    preset_id: Option<Uuid>,
) -> Result<(), ApiError> {
    let Some(preset_id) = preset_id else {
        return Ok(());
    };
    match queries::filter_presets::find(pool, tenant_id, preset_id).await? {
        Some(preset) if preset.is_visible_to(user_id) => Ok(()),
        _ => Err(ApiError::invalid_field("filterPresetId", "Filter preset not found")),
    }
}

/// GET /api/admin/users/exports/schedule
pub async fn get(
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Vec<ExportSchedule>> {
    require_permission(&auth_user, Permission::UsersExport)?;
    let schedules = queries::export_schedules::list(&pool, tenant.id).await?;
    Ok(ApiResponse::success(schedules))
}

/// POST /api/admin/users/exports/schedule
pub async fn post(
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<ScheduleFields>,
) -> ApiResult<ExportSchedule> {
    require_permission(&auth_user, Permission::UsersExport)?;

    let limits = &config::config().exports;
    let input = payload.validate(limits.max_recipients_per_schedule)?;
    ensure_preset_visible(&pool, tenant.id, auth_user.user_id, input.filter_preset_id).await?;

    let next_run_at = input.next_run_after(Utc::now());
    let outcome = queries::export_schedules::create_within_limit(
        &pool,
        tenant.id,
        auth_user.user_id,
        &input,
        next_run_at,
        limits.max_schedules_per_tenant,
    )
    .await?;

    match outcome {
        ScheduleInsert::Created(schedule) => {
            tracing::info!(tenant_id = %tenant.id, schedule_id = %schedule.id, "Created export schedule '{}'", schedule.name);
            Ok(ApiResponse::created(schedule))
        }
        ScheduleInsert::LimitReached { existing } => {
            tracing::warn!(tenant_id = %tenant.id, existing, "Export schedule limit reached");
            Err(ApiError::bad_request(format!(
                "Schedule limit reached: a tenant may have at most {} export schedules",
                limits.max_schedules_per_tenant
            )))
        }
    }
}

/// PATCH /api/admin/users/exports/schedule - Single update or bulk action
pub async fn patch(
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<PatchScheduleRequest>,
) -> ApiResult<Value> {
    require_permission(&auth_user, Permission::UsersExport)?;

    if let Some(raw_ids) = payload.ids {
        let action = payload
            .action
            .as_deref()
            .ok_or_else(|| ApiError::invalid_field("action", "action is required with ids"))
            .and_then(parse_bulk_action)?;
        let ids = parse_ids(&raw_ids)?;

        let updated = queries::export_schedules::apply_bulk_action(&pool, tenant.id, &ids, action).await?;
        tracing::info!(tenant_id = %tenant.id, ?action, count = updated.len(), "Applied bulk schedule action");

        return Ok(ApiResponse::success(json!({
            "updated": updated.len(),
            "schedules": updated,
        })));
    }

    let raw_id = payload
        .id
        .ok_or_else(|| ApiError::bad_request("Provide either 'id' with fields or 'ids' with an action"))?;
    let id = parse_id(&raw_id, "schedule")?;
    if payload.fields.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    let existing = queries::export_schedules::find(&pool, tenant.id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Export schedule not found"))?;

    let limits = &config::config().exports;
    let merged = payload.fields.merged_over(&existing).validate(limits.max_recipients_per_schedule)?;
    if merged.filter_preset_id != existing.filter_preset_id {
        ensure_preset_visible(&pool, tenant.id, auth_user.user_id, merged.filter_preset_id).await?;
    }

    let update = UpdateExportSchedule {
        next_run_at: next_run_after(
            Utc::now(),
            merged.frequency,
            merged.time,
            merged.day_of_week,
            merged.day_of_month,
        ),
        name: merged.name,
        frequency: merged.frequency,
        format: merged.format,
        recipients: merged.recipients,
        day_of_week: merged.day_of_week,
        day_of_month: merged.day_of_month,
        time: merged.time,
        email_subject: merged.email_subject,
        email_body: merged.email_body,
        filter_preset_id: merged.filter_preset_id,
        is_active: merged.is_active,
    };

    let schedule = queries::export_schedules::update(&pool, tenant.id, id, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("Export schedule not found"))?;
    tracing::info!(tenant_id = %tenant.id, schedule_id = %schedule.id, "Updated export schedule");

    Ok(ApiResponse::success(json!(schedule)))
}

/// DELETE /api/admin/users/exports/schedule?id= or body `{ids: [...]}`
pub async fn delete(
    Query(query): Query<DeleteScheduleQuery>,
    Extension(DbPool(pool)): Extension<DbPool>,
    Extension(tenant): Extension<TenantContext>,
    Extension(auth_user): Extension<AuthUser>,
    body: Option<ApiJson<DeleteScheduleBody>>,
) -> ApiResult<Value> {
    require_permission(&auth_user, Permission::UsersExport)?;

    let mut raw_ids: Vec<String> = query.id.into_iter().collect();
    if let Some(ApiJson(DeleteScheduleBody { ids: Some(ids) })) = body {
        raw_ids.extend(ids);
    }
    if raw_ids.is_empty() {
        return Err(ApiError::bad_request("Provide ?id= or a body with 'ids'"));
    }
    let ids = parse_ids(&raw_ids)?;

    let deleted = queries::export_schedules::delete_many(&pool, tenant.id, &ids).await?;
    if deleted == 0 {
        return Err(ApiError::not_found("Export schedule not found"));
    }
    tracing::info!(tenant_id = %tenant.id, deleted, "Deleted export schedules");

    Ok(ApiResponse::success(json!({ "deleted": deleted })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn fields() -> ScheduleFields {
        ScheduleFields {
            name: Some("Weekly roster".into()),
            frequency: Some("weekly".into()),
            format: Some("csv".into()),
            recipients: Some(vec!["ops@example.com".into()]),
            day_of_week: Some(1),
            ..Default::default()
        }
    }

    fn field_errors(err: ApiError) -> HashMap<String, String> {
        match err {
            ApiError::ValidationError { field_errors: Some(f), .. } => f,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn missing_required_fields_are_all_reported() {
        let err = ScheduleFields::default().validate(50).unwrap_err();
        let errors = field_errors(err);
        for key in ["name", "frequency", "format", "recipients"] {
            assert!(errors.contains_key(key), "missing {}", key);
        }
    }

    #[test]
    fn empty_recipients_are_rejected() {
        let err = ScheduleFields {
            recipients: Some(vec!["  ".into()]),
            ..fields()
        }
        .validate(50)
        .unwrap_err();
        assert!(field_errors(err).contains_key("recipients"));
    }

    #[test]
    fn invalid_recipient_is_rejected() {
        let result = ScheduleFields {
            recipients: Some(vec!["ops@example.com".into(), "nobody".into()]),
            ..fields()
        }
        .validate(50);
        assert!(result.is_err());
    }

    #[test]
    fn weekly_requires_day_of_week() {
        assert!(ScheduleFields { day_of_week: None, ..fields() }.validate(50).is_err());
        assert!(ScheduleFields { day_of_week: Some(7), ..fields() }.validate(50).is_err());
    }

    #[test]
    fn monthly_requires_day_of_month() {
        let monthly = ScheduleFields {
            frequency: Some("monthly".into()),
            day_of_week: None,
            ..fields()
        };
        assert!(monthly.clone().validate(50).is_err());
        let input = ScheduleFields { day_of_month: Some(31), ..monthly }.validate(50).unwrap();
        assert_eq!(input.day_of_month, Some(31));
        assert_eq!(input.day_of_week, None);
    }

    #[test]
    fn defaults_time_and_dedupes_recipients() {
        let input = ScheduleFields {
            recipients: Some(vec!["Ops@Example.com".into(), "ops@example.com".into()]),
            ..fields()
        }
        .validate(50)
        .unwrap();
        assert_eq!(input.recipients, vec!["ops@example.com".to_string()]);
        assert_eq!(input.time.hour(), 9);
        assert!(input.is_active);
    }

    #[test]
    fn recipient_cap_is_enforced() {
        let recipients = (0..3).map(|i| format!("r{}@example.com", i)).collect();
        let result = ScheduleFields {
            recipients: Some(recipients),
            ..fields()
        }
        .validate(2);
        assert!(result.is_err());
    }

    #[test]
    fn bad_time_is_rejected() {
        assert!(ScheduleFields { time: Some("25:00".into()), ..fields() }.validate(50).is_err());
    }

    #[test]
    fn bulk_actions_parse() {
        assert_eq!(parse_bulk_action("toggleActive").unwrap(), BulkScheduleAction::ToggleActive);
        assert_eq!(parse_bulk_action("activate").unwrap(), BulkScheduleAction::Activate);
        assert!(parse_bulk_action("explode").is_err());
    }

    fn stored(frequency: &str, format: &str) -> ExportSchedule {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        ExportSchedule {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            name: "Nightly".into(),
            frequency_str: frequency.into(),
            format_str: format.into(),
            recipients: vec!["a@example.com".into()],
            day_of_week: None,
            day_of_month: None,
            time: "06:30".into(),
            email_subject: None,
            email_body: None,
            filter_preset_id: None,
            is_active: false,
            last_run_at: None,
            next_run_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn patch_fields_overlay_existing_row() {
        let existing = stored("daily", "json");
        let merged = ScheduleFields {
            format: Some("html".into()),
            ..Default::default()
        }
        .merged_over(&existing)
        .validate(50)
        .unwrap();
        assert_eq!(merged.name, "Nightly");
        assert_eq!(merged.format, ReportFormat::Html);
        assert_eq!(merged.time.hour(), 6);
        assert!(!merged.is_active);
        assert_eq!(merged.frequency, ExportFrequency::Daily);
    }

    #[test]
    fn unparseable_stored_enums_must_be_resent() {
        let existing = stored("hourly", "xlsx");
        let errors = field_errors(ScheduleFields::default().merged_over(&existing).validate(50).unwrap_err());
        assert!(errors.contains_key("frequency"));
        assert!(errors.contains_key("format"));

        let fixed = ScheduleFields {
            frequency: Some("monthly".into()),
            format: Some("tsv".into()),
            day_of_month: Some(15),
            ..Default::default()
        }
        .merged_over(&existing)
        .validate(50)
        .unwrap();
        assert_eq!(fixed.frequency, ExportFrequency::Monthly);
        assert_eq!(fixed.format, ReportFormat::Tsv);
    }

    #[test]
    fn patch_body_distinguishes_bulk_and_single() {
        let bulk: PatchScheduleRequest =
            serde_json::from_value(json!({"ids": ["a"], "action": "toggleActive"})).unwrap();
        assert!(bulk.ids.is_some());
        assert!(bulk.fields.is_empty());

        let single: PatchScheduleRequest =
            serde_json::from_value(json!({"id": "a", "isActive": false, "dayOfWeek": 3})).unwrap();
        assert_eq!(single.fields.is_active, Some(false));
        assert_eq!(single.fields.day_of_week, Some(3));
    }
}
