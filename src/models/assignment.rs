use serde::{Deserialize, Serialize};

/// Marker written into a row whose score is greater than the points possible.
pub const DISCREPANCY_FLAG: &str = "ERROR";

/// Assignments with this in their title are placeholders and never reported.
pub const PLACEHOLDER_TITLE: &str = "Assessment Coversheet";

pub fn is_placeholder(title: &str) -> bool {
    title.contains(PLACEHOLDER_TITLE)
}

/// Missing values compare as zero.
pub fn discrepancy(score: Option<f64>, points_possible: Option<f64>) -> String {
    if score.unwrap_or(0.0) > points_possible.unwrap_or(0.0) {
        DISCREPANCY_FLAG.to_string()
    } else {
        String::new()
    }
}

/// One section of one assignment that still has submissions waiting for a grade.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UngradedAssignment {
    pub name: String,
    pub section: String,
    pub course_id: u64,
    pub needs_grading_section: u64,
    pub teachers: String,
    pub due_at: Option<String>,
    pub unlock_at: Option<String>,
    pub lock_at: Option<String>,
    pub published: bool,
    pub gradebook_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UngradedAssignmentWithCourse {
    pub account: String,
    pub course_name: String,
    #[serde(flatten)]
    pub assignment: UngradedAssignment,
}

/// A student's result for one assignment, or the per-course "Total" row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentResult {
    pub user_sis_id: Option<String>,
    pub name: String,
    pub account: String,
    pub course_name: String,
    pub section: Option<String>,
    pub title: String,
    pub points_possible: Option<f64>,
    pub score: Option<f64>,
    pub discrepancy: String,
    pub submitted_at: Option<String>,
    pub status: String,
    pub due_at: Option<String>,
    pub course_state: String,
    pub enrollment_role: String,
    pub enrollment_state: String,
}

/// A submitted assignment of one student that has not been scored yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UngradedUserAssignment {
    pub user_sis_id: Option<String>,
    pub name: String,
    pub account: String,
    pub course_name: String,
    pub section: Option<String>,
    pub title: String,
    pub points_possible: Option<f64>,
    pub score: Option<f64>,
    pub submitted_at: Option<String>,
    pub status: String,
    pub due_at: Option<String>,
    pub course_state: String,
    pub enrollment_role: String,
    pub enrollment_state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradingStandardAssignment {
    pub account: String,
    pub course_name: String,
    pub name: String,
    pub course_state: String,
    pub grading_standard_id: Option<u64>,
    pub grading_standard: String,
    pub grading_type: String,
    pub omit_from_final_grade: bool,
    pub workflow_state: String,
    pub due_at: Option<String>,
    pub unlock_at: Option<String>,
    pub lock_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdditionalAttemptAssignment {
    pub account: String,
    pub course_name: String,
    pub name: String,
    pub lock_at: Option<String>,
    pub needs_grading_count: u64,
    pub html_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub assignment_id: u64,
    pub title: String,
    pub points_possible: Option<f64>,
    pub score: Option<f64>,
    pub grade: Option<String>,
    pub discrepancy: String,
    pub workflow_state: String,
    pub submitted_at: Option<String>,
    pub graded_at: Option<String>,
    pub late: bool,
    pub excused: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discrepancy_flags_scores_above_points_possible() {
        assert_eq!(discrepancy(Some(11.0), Some(10.0)), "ERROR");
        assert_eq!(discrepancy(Some(10.0), Some(10.0)), "");
        assert_eq!(discrepancy(None, Some(10.0)), "");
        assert_eq!(discrepancy(Some(1.0), None), "ERROR");
    }

    #[test]
    fn placeholder_titles_match_anywhere() {
        assert!(is_placeholder("Unit 3 - Assessment Coversheet"));
        assert!(!is_placeholder("Unit 3 - Essay"));
    }

    #[test]
    fn course_columns_are_flattened() {
        let row = UngradedAssignmentWithCourse {
            account: "Maths".into(),
            course_name: "Algebra".into(),
            assignment: UngradedAssignment {
                name: "Quiz".into(),
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["account"], "Maths");
        assert_eq!(json["name"], "Quiz");
        assert!(json.get("assignment").is_none());
    }
}
