use serde::{Deserialize, Serialize};

/// One grade change audit event joined with the names of what it touched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradeChangeLog {
    pub id: String,
    pub created_at: String,
    pub event_type: String,
    pub grade_before: Option<String>,
    pub grade_after: Option<String>,
    pub user_name: String,
    pub user_id: Option<u64>,
    pub course_name: String,
    pub course_id: Option<u64>,
    pub account_id: Option<u64>,
    pub assignment_id: Option<u64>,
    pub assignment_title: String,
}
