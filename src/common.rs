/// Types and helpers shared by services and handlers
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::IntoParams;

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Pagination parameters for list operations
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// 1-based page number
    pub page: Option<u64>,
    /// Items per page (1-100)
    pub limit: Option<u64>,
}

impl PaginationParams {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }
}

/// One page of rows as returned by the list services
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            0
        } else {
            (self.total + self.limit - 1) / self.limit
        }
    }
}

/// Deserializes a nullable patch field.
///
/// Absent stays `None` (with `#[serde(default)]`), `null` becomes
/// `Some(None)` and a value becomes `Some(Some(v))`, so an update can tell
/// "leave alone" apart from "clear".
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trims free text, mapping blank input to `None`.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        comment: Option<Option<String>>,
    }

    #[test]
    fn patch_fields_distinguish_absent_from_null() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        let cleared: Patch = serde_json::from_str(r#"{"comment": null}"#).unwrap();
        let set: Patch = serde_json::from_str(r#"{"comment": "late"}"#).unwrap();

        assert_eq!(absent.comment, None);
        assert_eq!(cleared.comment, Some(None));
        assert_eq!(set.comment, Some(Some("late".to_string())));
    }

    #[test]
    fn pagination_is_clamped() {
        let params = PaginationParams {
            page: Some(0),
            limit: Some(1000),
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), MAX_PAGE_SIZE);
        assert_eq!(PaginationParams::default().limit(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = Page {
            items: vec![1, 2],
            total: 41,
            page: 1,
            limit: 20,
        };
        assert_eq!(page.total_pages(), 3);
    }

    #[test]
    fn blank_text_becomes_none() {
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(Some(" BL-1 ".into())), Some("BL-1".into()));
    }
}
