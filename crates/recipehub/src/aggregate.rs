//! Per-project counts of live data, recipes and jobs.
//!
//! Counts are a display cache recomputed from scratch on every child
//! mutation, never incremented in place. The hub runs the refresh inside the
//! transaction of the triggering save, which serializes refreshes of the same
//! project.

use crate::model::Project;

/// Counts of non-deleted children of a project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectCounts {
    pub data: i64,
    pub recipes: i64,
    pub jobs: i64,
}

/// Source of live child counts for a project.
pub trait ProjectChildren {
    type Error;

    /// Counts children with `deleted = false`.
    fn count_live_children(&self, project_id: i64) -> Result<ProjectCounts, Self::Error>;

    /// Stores the counts on the project row.
    fn write_counts(&self, project_id: i64, counts: &ProjectCounts) -> Result<(), Self::Error>;
}

/// Recounts the live children of `project` and stores the counts on it.
pub fn refresh<C: ProjectChildren>(
    children: &C,
    project: &mut Project,
) -> Result<ProjectCounts, C::Error> {
    let counts = children.count_live_children(project.id)?;
    project.data_count = counts.data;
    project.recipes_count = counts.recipes;
    project.jobs_count = counts.jobs;
    log::debug!(
        "Project {} counts: data={} recipes={} jobs={}",
        project.uid,
        counts.data,
        counts.recipes,
        counts.jobs
    );
    Ok(counts)
}

/// Recounts the live children of `project` and writes the counts back to both
/// the struct and its stored row.
pub fn persist<C: ProjectChildren>(
    children: &C,
    project: &mut Project,
) -> Result<ProjectCounts, C::Error> {
    let counts = refresh(children, project)?;
    children.write_counts(project.id, &counts)?;
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::convert::Infallible;

    /// `(project_id, deleted)` rows per child kind.
    #[derive(Default)]
    struct FakeChildren {
        data: Vec<(i64, bool)>,
        recipes: Vec<(i64, bool)>,
        jobs: Vec<(i64, bool)>,
        written: RefCell<Vec<(i64, ProjectCounts)>>,
    }

    fn live(rows: &[(i64, bool)], project_id: i64) -> i64 {
        rows.iter()
            .filter(|(pid, deleted)| *pid == project_id && !deleted)
            .count() as i64
    }

    impl ProjectChildren for FakeChildren {
        type Error = Infallible;

        fn count_live_children(&self, project_id: i64) -> Result<ProjectCounts, Infallible> {
            Ok(ProjectCounts {
                data: live(&self.data, project_id),
                recipes: live(&self.recipes, project_id),
                jobs: live(&self.jobs, project_id),
            })
        }

        fn write_counts(&self, project_id: i64, counts: &ProjectCounts) -> Result<(), Infallible> {
            self.written.borrow_mut().push((project_id, *counts));
            Ok(())
        }
    }

    fn project(id: i64) -> Project {
        let mut project = Project::new(1, "P");
        project.id = id;
        project.uid = format!("p{}", id);
        project
    }

    #[test]
    fn test_refresh_with_no_children() {
        let mut p = project(1);
        p.data_count = 9;
        let counts = refresh(&FakeChildren::default(), &mut p).unwrap();
        assert_eq!(counts, ProjectCounts::default());
        assert_eq!(p.data_count, 0);
    }

    #[test]
    fn test_refresh_with_one_child() {
        let children = FakeChildren {
            data: vec![(1, false)],
            ..Default::default()
        };
        let mut p = project(1);
        refresh(&children, &mut p).unwrap();
        assert_eq!(p.data_count, 1);
    }

    #[test]
    fn test_refresh_ignores_deleted_and_foreign_rows() {
        let children = FakeChildren {
            data: vec![(1, false), (1, false), (1, true), (2, false)],
            recipes: vec![(1, false), (1, true)],
            jobs: vec![(1, false), (1, false), (1, false), (3, false)],
            ..Default::default()
        };
        let mut p = project(1);
        let counts = refresh(&children, &mut p).unwrap();

        assert_eq!(
            counts,
            ProjectCounts {
                data: 2,
                recipes: 1,
                jobs: 3
            }
        );
        assert_eq!(p.data_count, 2);
        assert_eq!(p.recipes_count, 1);
        assert_eq!(p.jobs_count, 3);
    }

    #[test]
    fn test_persist_writes_counts() {
        let children = FakeChildren {
            jobs: vec![(4, false), (4, false)],
            ..Default::default()
        };
        let mut p = project(4);
        persist(&children, &mut p).unwrap();

        assert_eq!(p.jobs_count, 2);
        let written = children.written.borrow();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].0, 4);
        assert_eq!(written[0].1.jobs, 2);
    }

    #[test]
    fn test_refresh_does_not_write() {
        let children = FakeChildren::default();
        refresh(&children, &mut project(1)).unwrap();
        assert!(children.written.borrow().is_empty());
    }
}
