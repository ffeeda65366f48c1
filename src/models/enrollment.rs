use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentResult {
    pub sis_id: Option<String>,
    pub name: String,
    pub account: String,
    pub course_name: String,
    pub section: String,
    pub enrollment_state: String,
    pub course_state: String,
    pub current_grade: Option<String>,
    pub current_score: Option<f64>,
    pub enrollment_role: String,
    pub grades_url: String,
}
