use serde::{Deserialize, Serialize};

pub const AVAILABLE_COURSE_STATE: &str = "available";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub parent_account_id: Option<u64>,
    #[serde(default)]
    pub root_account_id: Option<u64>,
    #[serde(default)]
    pub workflow_state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: u64,
    /// Empty for courses the upstream restricts by date.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub course_code: String,
    #[serde(default)]
    pub sis_course_id: Option<String>,
    #[serde(default)]
    pub grading_standard_id: Option<u64>,
    #[serde(default)]
    pub account_id: u64,
    #[serde(default)]
    pub root_account_id: Option<u64>,
    #[serde(default)]
    pub workflow_state: String,
    #[serde(default)]
    pub start_at: Option<String>,
    #[serde(default)]
    pub end_at: Option<String>,
    #[serde(default)]
    pub account: Option<Account>,
}

impl Course {
    pub fn is_available(&self) -> bool {
        self.workflow_state == AVAILABLE_COURSE_STATE
    }

    /// Name of the owning account, empty when the account was not embedded.
    pub fn account_name(&self) -> &str {
        self.account.as_ref().map(|a| a.name.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: u64,
    #[serde(default)]
    pub sis_section_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub course_id: Option<u64>,
    #[serde(default)]
    pub start_at: Option<String>,
    #[serde(default)]
    pub end_at: Option<String>,
    #[serde(default)]
    pub total_students: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sis_user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Grades {
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub current_score: Option<f64>,
    #[serde(default)]
    pub current_grade: Option<String>,
    #[serde(default)]
    pub final_score: Option<f64>,
    #[serde(default)]
    pub final_grade: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: u64,
    pub user_id: u64,
    pub course_id: u64,
    #[serde(default)]
    pub course_section_id: Option<u64>,
    #[serde(default)]
    pub sis_section_id: Option<String>,
    #[serde(default)]
    pub grades: Grades,
    #[serde(default)]
    pub user: User,
    #[serde(default)]
    pub enrollment_state: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

impl Enrollment {
    /// The SIS section id, treating a blank value as absent.
    pub fn sis_section(&self) -> Option<&str> {
        self.sis_section_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentType {
    Teacher,
    Student,
    Ta,
    Designer,
    Observer,
}

impl EnrollmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentType::Teacher => "TeacherEnrollment",
            EnrollmentType::Student => "StudentEnrollment",
            EnrollmentType::Ta => "TaEnrollment",
            EnrollmentType::Designer => "DesignerEnrollment",
            EnrollmentType::Observer => "ObserverEnrollment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentState {
    Active,
    Inactive,
    Completed,
    Invited,
    Rejected,
    Deleted,
}

impl EnrollmentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentState::Active => "active",
            EnrollmentState::Inactive => "inactive",
            EnrollmentState::Completed => "completed",
            EnrollmentState::Invited => "invited",
            EnrollmentState::Rejected => "rejected",
            EnrollmentState::Deleted => "deleted",
        }
    }
}

/// Enrollment filter used by the account course listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseEnrollmentType {
    Teacher,
    Student,
    Ta,
    Observer,
    Designer,
}

impl CourseEnrollmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseEnrollmentType::Teacher => "teacher",
            CourseEnrollmentType::Student => "student",
            CourseEnrollmentType::Ta => "ta",
            CourseEnrollmentType::Observer => "observer",
            CourseEnrollmentType::Designer => "designer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentBucket {
    Past,
    Overdue,
    Undated,
    Ungraded,
    Unsubmitted,
    Upcoming,
    Future,
    All,
}

impl AssignmentBucket {
    /// Query value for the bucket filter; `All` sends no filter at all.
    pub fn as_query(&self) -> Option<&'static str> {
        match self {
            AssignmentBucket::Past => Some("past"),
            AssignmentBucket::Overdue => Some("overdue"),
            AssignmentBucket::Undated => Some("undated"),
            AssignmentBucket::Ungraded => Some("ungraded"),
            AssignmentBucket::Unsubmitted => Some("unsubmitted"),
            AssignmentBucket::Upcoming => Some("upcoming"),
            AssignmentBucket::Future => Some("future"),
            AssignmentBucket::All => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionNeedsGrading {
    pub section_id: u64,
    pub needs_grading_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentDate {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub due_at: Option<String>,
    #[serde(default)]
    pub unlock_at: Option<String>,
    #[serde(default)]
    pub lock_at: Option<String>,
    #[serde(default)]
    pub title: String,
    /// "CourseSection", "Group", "ADHOC" or "Noop".
    #[serde(default)]
    pub set_type: String,
    #[serde(default)]
    pub set_id: Option<u64>,
    #[serde(default)]
    pub base: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentOverride {
    #[serde(default)]
    pub course_section_id: Option<u64>,
    #[serde(default)]
    pub due_at: Option<String>,
    #[serde(default)]
    pub unlock_at: Option<String>,
    #[serde(default)]
    pub lock_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: u64,
    #[serde(default)]
    pub course_id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub due_at: Option<String>,
    #[serde(default)]
    pub unlock_at: Option<String>,
    #[serde(default)]
    pub lock_at: Option<String>,
    #[serde(default)]
    pub needs_grading_count: u64,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub needs_grading_count_by_section: Vec<SectionNeedsGrading>,
    #[serde(default)]
    pub all_dates: Vec<AssignmentDate>,
    #[serde(default)]
    pub overrides: Vec<AssignmentOverride>,
    #[serde(default)]
    pub grading_standard_id: Option<u64>,
    #[serde(default)]
    pub grading_type: String,
    #[serde(default)]
    pub omit_from_final_grade: bool,
    #[serde(default)]
    pub workflow_state: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssignmentDataSubmission {
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub submitted_at: Option<String>,
    #[serde(default)]
    pub posted_at: Option<String>,
}

/// One row of the per-student assignment analytics endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentData {
    pub assignment_id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub min_score: Option<f64>,
    #[serde(default)]
    pub points_possible: Option<f64>,
    #[serde(default)]
    pub due_at: Option<String>,
    #[serde(default)]
    pub unlock_at: Option<String>,
    #[serde(default)]
    pub submission: AssignmentDataSubmission,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionWorkflowState {
    Graded,
    Submitted,
    Unsubmitted,
    PendingReview,
}

impl SubmissionWorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionWorkflowState::Graded => "graded",
            SubmissionWorkflowState::Submitted => "submitted",
            SubmissionWorkflowState::Unsubmitted => "unsubmitted",
            SubmissionWorkflowState::PendingReview => "pending_review",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "graded" => Some(SubmissionWorkflowState::Graded),
            "submitted" => Some(SubmissionWorkflowState::Submitted),
            "unsubmitted" => Some(SubmissionWorkflowState::Unsubmitted),
            "pending_review" => Some(SubmissionWorkflowState::PendingReview),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionAssignment {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub points_possible: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: u64,
    pub user_id: u64,
    pub assignment_id: u64,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub submitted_at: Option<String>,
    #[serde(default)]
    pub attempt: Option<u64>,
    #[serde(default)]
    pub workflow_state: String,
    #[serde(default)]
    pub grade_matches_current_submission: bool,
    #[serde(default)]
    pub graded_at: Option<String>,
    #[serde(default)]
    pub grader_id: Option<i64>,
    #[serde(default)]
    pub late: bool,
    #[serde(default)]
    pub excused: Option<bool>,
    #[serde(default)]
    pub assignment: SubmissionAssignment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingScheme {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingStandard {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub context_type: String,
    #[serde(default)]
    pub context_id: u64,
    #[serde(default)]
    pub grading_scheme: Vec<GradingScheme>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradingStandardContext {
    Account,
    Course,
}

impl GradingStandardContext {
    pub fn path_segment(&self) -> &'static str {
        match self {
            GradingStandardContext::Account => "accounts",
            GradingStandardContext::Course => "courses",
        }
    }
}

/// An audit link, sent by the upstream either as a number or as a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinkId {
    Number(u64),
    Text(String),
}

impl LinkId {
    pub fn as_id(&self) -> Option<u64> {
        match self {
            LinkId::Number(id) => Some(*id),
            LinkId::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkId::Number(id) => write!(f, "{}", id),
            LinkId::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GradeChangeLinks {
    #[serde(default)]
    pub course: Option<LinkId>,
    #[serde(default)]
    pub assignment: Option<LinkId>,
    #[serde(default)]
    pub student: Option<LinkId>,
    #[serde(default)]
    pub grader: Option<LinkId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeChangeEvent {
    pub id: String,
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub grade_before: Option<String>,
    #[serde(default)]
    pub grade_after: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub links: GradeChangeLinks,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedAssignment {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub course_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedCourse {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub account_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedUser {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GradeChangeLinked {
    #[serde(default)]
    pub assignments: Vec<LinkedAssignment>,
    #[serde(default)]
    pub courses: Vec<LinkedCourse>,
    #[serde(default)]
    pub users: Vec<LinkedUser>,
}

/// One page of the grade change audit endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GradeChangeLogPage {
    #[serde(default)]
    pub events: Vec<GradeChangeEvent>,
    #[serde(default)]
    pub linked: GradeChangeLinked,
}
