use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use super::{Analysis, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Error,
    Spooled,
    Paused,
}

impl JobState {
    pub fn code(self) -> i64 {
        match self {
            JobState::Queued => 1,
            JobState::Running => 2,
            JobState::Completed => 3,
            JobState::Error => 4,
            JobState::Spooled => 5,
            JobState::Paused => 6,
        }
    }

    pub fn from_code(code: i64) -> Self {
        match code {
            1 => JobState::Queued,
            2 => JobState::Running,
            3 => JobState::Completed,
            4 => JobState::Error,
            5 => JobState::Spooled,
            6 => JobState::Paused,
            other => {
                log::warn!("Unknown job state {}, defaulting to Queued", other);
                JobState::Queued
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            JobState::Queued => "Queued",
            JobState::Running => "Running",
            JobState::Completed => "Completed",
            JobState::Error => "Error",
            JobState::Spooled => "Spooled",
            JobState::Paused => "Paused",
        }
    }

    pub fn is_finished(self) -> bool {
        matches!(self, JobState::Completed | JobState::Error)
    }

    /// Transition graph enforced by `Hub::transition_job`.
    ///
    /// Finished jobs may only be queued again for a re-run.
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;

        matches!(
            (self, next),
            (Queued, Spooled | Running | Error)
                | (Spooled, Running | Error)
                | (Running, Paused | Completed | Error)
                | (Paused, Running | Error)
                | (Completed | Error, Queued)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSecurity {
    Authorized,
    UnderReview,
}

impl JobSecurity {
    pub fn code(self) -> i64 {
        match self {
            JobSecurity::Authorized => 1,
            JobSecurity::UnderReview => 2,
        }
    }

    pub fn from_code(code: i64) -> Self {
        match code {
            1 => JobSecurity::Authorized,
            2 => JobSecurity::UnderReview,
            other => {
                log::warn!("Unknown job security {}, treating as under review", other);
                JobSecurity::UnderReview
            }
        }
    }
}

/// One execution of a recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: i64,
    pub uid: String,
    pub analysis_id: i64,
    pub project_id: i64,
    pub name: String,
    pub text: String,
    pub html: String,
    /// Parameter payload (TOML) the job was created with.
    pub json_text: String,
    /// Copy of the recipe template, refreshed on every save.
    pub template: String,
    /// Rendered script, set when the job attempts to run.
    pub script: String,
    pub stdout_log: String,
    pub stderr_log: String,
    pub state: JobState,
    pub security: JobSecurity,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Job working directory.
    pub path: Option<PathBuf>,
    pub owner: UserId,
    pub deleted: bool,
    pub valid: bool,
    pub image: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub lastedit_user: Option<UserId>,
    pub lastedit_date: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(analysis: &Analysis, owner: UserId) -> Self {
        Self {
            id: 0,
            uid: String::new(),
            analysis_id: analysis.id,
            project_id: analysis.project_id,
            name: String::new(),
            text: String::new(),
            html: String::new(),
            json_text: String::new(),
            template: analysis.template.clone(),
            script: String::new(),
            stdout_log: String::new(),
            stderr_log: String::new(),
            state: JobState::Queued,
            security: JobSecurity::UnderReview,
            start_date: None,
            end_date: None,
            path: None,
            owner,
            deleted: false,
            valid: true,
            image: None,
            date: None,
            lastedit_user: None,
            lastedit_date: None,
        }
    }

    pub fn is_saved(&self) -> bool {
        self.id > 0
    }

    pub fn is_running(&self) -> bool {
        self.state == JobState::Running
    }

    pub fn is_success(&self) -> bool {
        self.state == JobState::Completed
    }

    pub fn is_error(&self) -> bool {
        self.state == JobState::Error
    }

    /// The job has been initiated and is not finished.
    pub fn is_started(&self) -> bool {
        matches!(
            self.state,
            JobState::Queued | JobState::Spooled | JobState::Running
        )
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Both the recipe and the job itself must be authorized.
    pub fn runnable(&self, analysis: &Analysis) -> bool {
        analysis.runnable() && self.security == JobSecurity::Authorized
    }

    /// Human-scale run time, or an empty string when either timestamp is unset.
    pub fn elapsed(&self) -> String {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => format_elapsed((end - start).num_seconds()),
            _ => String::new(),
        }
    }

    /// Media-relative path of the job directory, with `path` appended.
    pub fn url_path(&self, path: &str) -> String {
        format!("jobs/{}/{}", self.uid, path)
    }

    pub fn display_name(&self) -> String {
        super::display_name(&self.name, self.deleted)
    }
}

/// Buckets a duration into seconds, whole minutes, or hours with one decimal.
pub fn format_elapsed(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds < 60 {
        format!("{} seconds", seconds)
    } else if seconds < 3600 {
        format!("{} minutes", seconds / 60)
    } else {
        format!("{:.1} hours", seconds as f64 / 3600.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecipeSecurity;
    use chrono::{Duration, TimeZone};

    const ALL_STATES: [JobState; 6] = [
        JobState::Queued,
        JobState::Running,
        JobState::Completed,
        JobState::Error,
        JobState::Spooled,
        JobState::Paused,
    ];

    fn authorized_recipe() -> Analysis {
        let mut recipe = Analysis::new(1, 1, "FastQC");
        recipe.id = 1;
        recipe.security = RecipeSecurity::Authorized;
        recipe
    }

    #[test]
    fn test_state_codes_round_trip() {
        for state in ALL_STATES {
            assert_eq!(JobState::from_code(state.code()), state);
        }
    }

    #[test]
    fn test_started_and_finished_are_disjoint() {
        let recipe = authorized_recipe();
        let mut job = Job::new(&recipe, 1);
        for state in ALL_STATES {
            job.state = state;
            assert!(!(job.is_started() && job.is_finished()), "{}", state);
        }
    }

    #[test]
    fn test_classification() {
        let recipe = authorized_recipe();
        let mut job = Job::new(&recipe, 1);

        job.state = JobState::Spooled;
        assert!(job.is_started());
        assert!(!job.is_finished());

        job.state = JobState::Paused;
        assert!(!job.is_started());
        assert!(!job.is_finished());

        job.state = JobState::Error;
        assert!(job.is_finished());
        assert!(job.is_error());
        assert!(!job.is_success());
    }

    #[test]
    fn test_runnable_requires_job_authorization() {
        let recipe = authorized_recipe();
        let mut job = Job::new(&recipe, 1);
        assert_eq!(job.security, JobSecurity::UnderReview);
        assert!(!job.runnable(&recipe));

        job.security = JobSecurity::Authorized;
        assert!(job.runnable(&recipe));
    }

    #[test]
    fn test_runnable_requires_recipe_authorization() {
        let mut recipe = authorized_recipe();
        let mut job = Job::new(&recipe, 1);
        job.security = JobSecurity::Authorized;
        recipe.security = RecipeSecurity::NotAuthorized;
        assert!(!job.runnable(&recipe));
    }

    #[test]
    fn test_elapsed_requires_both_dates() {
        let recipe = authorized_recipe();
        let mut job = Job::new(&recipe, 1);
        assert_eq!(job.elapsed(), "");

        job.start_date = Some(Utc::now());
        assert_eq!(job.elapsed(), "");
    }

    #[test]
    fn test_elapsed_minutes() {
        let recipe = authorized_recipe();
        let mut job = Job::new(&recipe, 1);
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        job.start_date = Some(start);
        job.end_date = Some(start + Duration::seconds(125));
        assert_eq!(job.elapsed(), "2 minutes");
    }

    #[test]
    fn test_format_elapsed_buckets() {
        assert_eq!(format_elapsed(0), "0 seconds");
        assert_eq!(format_elapsed(59), "59 seconds");
        assert_eq!(format_elapsed(60), "1 minutes");
        assert_eq!(format_elapsed(3599), "59 minutes");
        assert_eq!(format_elapsed(3600), "1.0 hours");
        assert_eq!(format_elapsed(5400), "1.5 hours");
        assert_eq!(format_elapsed(-5), "0 seconds");
    }

    #[test]
    fn test_transition_graph() {
        assert!(JobState::Queued.can_transition_to(JobState::Spooled));
        assert!(JobState::Queued.can_transition_to(JobState::Running));
        assert!(JobState::Spooled.can_transition_to(JobState::Running));
        assert!(JobState::Running.can_transition_to(JobState::Paused));
        assert!(JobState::Paused.can_transition_to(JobState::Running));
        assert!(JobState::Running.can_transition_to(JobState::Completed));
        assert!(JobState::Running.can_transition_to(JobState::Error));
        assert!(JobState::Completed.can_transition_to(JobState::Queued));

        assert!(!JobState::Queued.can_transition_to(JobState::Completed));
        assert!(!JobState::Completed.can_transition_to(JobState::Running));
        assert!(!JobState::Paused.can_transition_to(JobState::Completed));
        for state in ALL_STATES {
            assert!(!state.can_transition_to(state));
        }
    }

    #[test]
    fn test_new_job_copies_recipe() {
        let mut recipe = authorized_recipe();
        recipe.project_id = 4;
        recipe.template = "echo hi".to_string();
        let job = Job::new(&recipe, 2);
        assert_eq!(job.analysis_id, 1);
        assert_eq!(job.project_id, 4);
        assert_eq!(job.template, "echo hi");
        assert_eq!(job.state, JobState::Queued);
    }
}
