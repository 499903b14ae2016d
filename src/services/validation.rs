use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use super::payloads::RawTags;
use crate::domain::{
    ArtifactType, ModelState, Pagination, Sorting, Tags, VersionStatus, DEFAULT_PAGE_LIMIT,
    MAX_PAGE_LIMIT, TAG_KEYS,
};
use crate::errors::{CoreError, CoreResult};

pub const MAX_NAME_LEN: usize = 255;

static MODEL_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]{0,63}$")
        .expect("Invalid regex pattern for model_type")
});

/// Input checks shared by every service. Each failure names the offending
/// field in the error's `fields`.
pub struct ValidationService;

impl ValidationService {
    pub fn parse_uuid(field: &str, raw: &str) -> CoreResult<Uuid> {
        Uuid::parse_str(raw.trim())
            .map_err(|_| CoreError::invalid_field(field, format!("{} must be a UUID", field)))
    }

    pub fn parse_optional_uuid(field: &str, raw: Option<&str>) -> CoreResult<Option<Uuid>> {
        raw.map(|value| Self::parse_uuid(field, value)).transpose()
    }

    /// Trims and rejects empty values.
    pub fn required_string(field: &str, raw: &str) -> CoreResult<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::invalid_field(
                field,
                format!("{} cannot be empty", field),
            ));
        }
        Ok(trimmed.to_string())
    }

    /// Trims; blank input becomes `None`.
    pub fn optional_string(raw: Option<&str>) -> Option<String> {
        raw.map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    pub fn validate_name(field: &str, raw: &str) -> CoreResult<String> {
        let name = Self::required_string(field, raw)?;
        if name.chars().count() > MAX_NAME_LEN {
            return Err(CoreError::invalid_field(
                field,
                format!("{} is too long (max {} characters)", field, MAX_NAME_LEN),
            ));
        }
        Ok(name)
    }

    pub fn validate_model_type(raw: &str) -> CoreResult<String> {
        let trimmed = raw.trim();
        if !MODEL_TYPE_RE.is_match(trimmed) {
            return Err(CoreError::invalid_field(
                "model_type",
                "model_type must be 1-64 characters of letters, digits, '.', '_' or '-'",
            ));
        }
        Ok(trimmed.to_string())
    }

    pub fn parse_state(raw: &str) -> CoreResult<ModelState> {
        raw.trim()
            .parse()
            .map_err(|msg: String| CoreError::invalid_field("state", msg))
    }

    pub fn parse_status(raw: &str) -> CoreResult<VersionStatus> {
        raw.trim()
            .parse()
            .map_err(|msg: String| CoreError::invalid_field("status", msg))
    }

    pub fn parse_artifact_type(raw: &str) -> CoreResult<ArtifactType> {
        raw.parse()
            .map_err(|msg: String| CoreError::invalid_field("artifact_type", msg))
    }

    /// Checks the closed key set and collapses each list into an ordered
    /// set, keeping first occurrences. Blank entries are rejected.
    pub fn validate_tags(raw: &RawTags) -> CoreResult<Tags> {
        let mut tags = Tags::default();
        for (key, values) in raw {
            let slot = tags.slot_mut(key).ok_or_else(|| {
                CoreError::invalid_field(
                    "tags",
                    format!(
                        "unknown tag key '{}': expected one of {}",
                        key,
                        TAG_KEYS.join(", ")
                    ),
                )
            })?;
            for value in values {
                let value = value.trim();
                if value.is_empty() {
                    return Err(CoreError::invalid_field(
                        "tags",
                        format!("tags.{} contains an empty value", key),
                    ));
                }
                slot.insert(value.to_string());
            }
        }
        Ok(tags)
    }

    /// `sort_by` and `order` of a list query; either may be omitted.
    pub fn sorting(sort_by: Option<&str>, order: Option<&str>) -> CoreResult<Sorting> {
        let mut sorting = Sorting::default();
        if let Some(raw) = sort_by.map(str::trim).filter(|v| !v.is_empty()) {
            sorting.field = raw
                .parse()
                .map_err(|msg: String| CoreError::invalid_field("sort_by", msg))?;
        }
        if let Some(raw) = order.map(str::trim).filter(|v| !v.is_empty()) {
            sorting.order = raw
                .parse()
                .map_err(|msg: String| CoreError::invalid_field("order", msg))?;
        }
        Ok(sorting)
    }

    /// Missing limit defaults; limit clamps into `[0, 200]` and offset to `>= 0`.
    pub fn pagination(limit: Option<i64>, offset: Option<i64>) -> Pagination {
        let limit = match limit {
            None => DEFAULT_PAGE_LIMIT,
            Some(limit) => limit.clamp(0, MAX_PAGE_LIMIT as i64) as u64,
        };
        let offset = offset.unwrap_or(0).max(0) as u64;
        Pagination { limit, offset }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_is_canonicalized() {
        let id = ValidationService::parse_uuid("region_id", " 6F9619FF-8B86-D011-B42D-00CF4FC964FF ")
            .unwrap();
        assert_eq!(id.to_string(), "6f9619ff-8b86-d011-b42d-00cf4fc964ff");

        let err = ValidationService::parse_uuid("region_id", "not-a-uuid").unwrap_err();
        assert_eq!(err.kind(), crate::errors::CoreErrorKind::Invalid);
        assert_eq!(err.fields().unwrap()["field"], "region_id");
    }

    #[test]
    fn test_name_trimmed_and_bounded() {
        assert_eq!(ValidationService::validate_name("name", "  m1 ").unwrap(), "m1");
        assert!(ValidationService::validate_name("name", "   ").is_err());
        assert!(ValidationService::validate_name("name", &"x".repeat(255)).is_ok());
        assert!(ValidationService::validate_name("name", &"x".repeat(256)).is_err());
    }

    #[test]
    fn test_model_type_charset() {
        assert_eq!(ValidationService::validate_model_type("llm").unwrap(), "llm");
        assert!(ValidationService::validate_model_type("text-gen_v1.2").is_ok());
        assert!(ValidationService::validate_model_type("has space").is_err());
        assert!(ValidationService::validate_model_type("-leading").is_err());
        assert!(ValidationService::validate_model_type(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_state_and_status_do_not_mix() {
        assert!(ValidationService::parse_state("READY").is_err());
        assert!(ValidationService::parse_status("ARCHIVED").is_err());
        assert_eq!(
            ValidationService::parse_state(" ARCHIVED").unwrap(),
            ModelState::Archived
        );
    }

    #[test]
    fn test_tags_dedupe_in_order() {
        let mut raw = RawTags::new();
        raw.insert(
            "tasks".to_string(),
            vec!["chat".into(), "summarize".into(), " chat ".into()],
        );
        let tags = ValidationService::validate_tags(&raw).unwrap();
        let tasks: Vec<&str> = tags.tasks.iter().map(String::as_str).collect();
        assert_eq!(tasks, vec!["chat", "summarize"]);
    }

    #[test]
    fn test_tags_reject_unknown_key() {
        let mut raw = RawTags::new();
        raw.insert("licenses".to_string(), vec!["mit".into()]);
        let err = ValidationService::validate_tags(&raw).unwrap_err();
        assert!(err.message().contains("licenses"));
    }

    #[test]
    fn test_sorting_defaults_and_rejects_unknown() {
        assert_eq!(ValidationService::sorting(None, Some(" ")).unwrap(), Sorting::default());

        let sorting = ValidationService::sorting(Some("name"), Some("asc")).unwrap();
        assert_eq!(sorting.field, crate::domain::SortField::Name);
        assert_eq!(sorting.order, crate::domain::SortOrder::Asc);

        let err = ValidationService::sorting(Some("owner_id"), None).unwrap_err();
        assert_eq!(err.fields().unwrap()["field"], "sort_by");
        assert!(ValidationService::sorting(None, Some("sideways")).is_err());
    }

    #[test]
    fn test_pagination_clamps() {
        assert_eq!(
            ValidationService::pagination(None, None),
            Pagination { limit: 20, offset: 0 }
        );
        assert_eq!(ValidationService::pagination(Some(201), Some(5)).limit, 200);
        assert_eq!(ValidationService::pagination(Some(0), None).limit, 0);
        assert_eq!(ValidationService::pagination(Some(-3), Some(-9)), Pagination { limit: 0, offset: 0 });
    }
}
