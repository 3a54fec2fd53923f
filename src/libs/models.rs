//! Request and response bodies of the HTTP surface.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::inspector::TableInfo;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTableRequest {
    pub table_name: String,
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsertDataRequest {
    pub table_name: String,
    pub name: String,
    pub age: i32,
    pub username: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTableRequest {
    pub table_name: String,
    #[serde(default)]
    pub new_table_name: Option<String>,
    #[serde(default)]
    pub new_name: Option<String>,
    /// `Some(0)` is a real update, not an absent field.
    #[serde(default)]
    pub new_age: Option<i32>,
    pub username: String,
}

impl UpdateTableRequest {
    pub fn new_table_name(&self) -> Option<&str> {
        provided(&self.new_table_name)
    }

    pub fn new_name(&self) -> Option<&str> {
        provided(&self.new_name)
    }
}

/// An empty form field counts as "not provided". Whitespace does not, so it
/// still reaches identifier validation.
fn provided(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Deserialize)]
pub struct UsernameQuery {
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableQuery {
    pub username: String,
    pub table_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TablesResponse {
    pub tables: Vec<TableInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableInfoResponse {
    pub table_info: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateOutcome {
    pub message: String,
    pub changes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitSystemResponse {
    pub message: String,
    pub details: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_age_is_distinct_from_missing_age() {
        let zero: UpdateTableRequest =
            serde_json::from_str(r#"{"table_name":"t","new_age":0,"username":"role3"}"#).unwrap();
        assert_eq!(zero.new_age, Some(0));

        let missing: UpdateTableRequest =
            serde_json::from_str(r#"{"table_name":"t","username":"role3"}"#).unwrap();
        assert_eq!(missing.new_age, None);

        let null: UpdateTableRequest =
            serde_json::from_str(r#"{"table_name":"t","new_age":null,"username":"role3"}"#)
                .unwrap();
        assert_eq!(null.new_age, None);
    }

    #[test]
    fn blank_names_are_not_provided() {
        let request = UpdateTableRequest {
            table_name: "t".into(),
            new_table_name: Some("".into()),
            new_name: Some("label".into()),
            ..Default::default()
        };
        assert_eq!(request.new_table_name(), None);
        assert_eq!(request.new_name(), Some("label"));
    }

    #[test]
    fn whitespace_names_are_provided() {
        let request = UpdateTableRequest {
            table_name: "t".into(),
            new_table_name: Some(" ".into()),
            new_name: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(request.new_table_name(), Some(" "));
        assert_eq!(request.new_name(), Some("   "));
    }
}
