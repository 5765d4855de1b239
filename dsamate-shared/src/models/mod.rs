/// Database models and their queries
///
/// - `user`: accounts, OTP state, mail preferences
/// - `progress`: practice-sheet counters and streak
/// - `badge`: earned badges
/// - `roadmap_progress`: roadmap topic progress and derived stats
/// - `quiz_result`: quiz attempts
/// - `testimonial`: user testimonials
/// - `interview_experience`: shared interview write-ups
/// - `job_run`: once-per-day markers for scheduled jobs

pub mod user;
pub mod progress;
pub mod badge;
pub mod roadmap_progress;
pub mod quiz_result;
pub mod testimonial;
pub mod interview_experience;
pub mod job_run;
