pub mod assignment;
pub mod course;
pub mod enrollment;
pub mod grade_change;

pub use assignment::{
    AdditionalAttemptAssignment, AssignmentResult, GradingStandardAssignment, SubmissionResult,
    UngradedAssignment, UngradedAssignmentWithCourse, UngradedUserAssignment,
};
pub use course::GradingStandardCourse;
pub use enrollment::EnrollmentResult;
pub use grade_change::GradeChangeLog;
