use serde::{Deserialize, Serialize};

/// A course of an account with its grading standard resolved to a title.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradingStandardCourse {
    pub account: String,
    pub name: String,
    pub sis_course_id: Option<String>,
    pub grading_standard_id: Option<u64>,
    pub grading_standard: String,
    pub workflow_state: String,
    pub start_at: Option<String>,
    pub end_at: Option<String>,
}
