//! Quarterly sector and infrastructure projects.

use tracing::info;
use worldsim_types::{ChangeSummary, CountryState, ProjectStatus};

use crate::clock::TickContext;
use crate::processors::{DomainProcessor, ProcessorError};

/// Counts down in-progress projects and applies the effects of those that
/// finish.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectProcessor;

impl DomainProcessor for ProjectProcessor {
    fn name(&self) -> &'static str {
        "sectors"
    }

    fn process(
        &mut self,
        state: &mut CountryState,
        _ctx: &TickContext,
    ) -> Result<ChangeSummary, ProcessorError> {
        let mut summary = ChangeSummary::default();
        let mut finished = Vec::new();
        let mut remaining = Vec::with_capacity(state.projects.len());

        for mut project in std::mem::take(&mut state.projects) {
            if project.status != ProjectStatus::InProgress {
                remaining.push(project);
                continue;
            }
            project.quarters_remaining = project.quarters_remaining.saturating_sub(1);
            if project.quarters_remaining == 0 {
                project.status = ProjectStatus::Completed;
                finished.push(project);
            } else {
                remaining.push(project);
            }
        }
        state.projects = remaining;

        for project in finished {
            state.apply_effects(&project.effects, &mut summary);
            summary.record(format!("projects.completed.{}", project.id), 1.0);
            info!(
                country = %state.code(),
                project_id = %project.id,
                name = %project.name,
                "Project completed"
            );
            state.completed_projects.push(project);
        }
        Ok(summary)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use worldsim_types::{CountryCode, Effect, Project, ProjectId, StatePath, TickKind};

    use super::*;

    fn project(id: &str, quarters: u32) -> Project {
        Project {
            id: ProjectId::from(id),
            name: id.to_owned(),
            quarters_remaining: quarters,
            status: ProjectStatus::InProgress,
            effects: vec![Effect {
                path: StatePath::HighwayKm,
                delta: 500.0,
            }],
        }
    }

    fn ctx() -> TickContext {
        TickContext {
            kind: TickKind::Quarterly,
            date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            day_count: 91,
        }
    }

    #[test]
    fn finishing_project_applies_effects_once() {
        let mut s = CountryState::new(CountryCode::from("USA"), "United States");
        s.projects = vec![project("ring_road", 2), project("bypass", 1)];

        ProjectProcessor.process(&mut s, &ctx()).unwrap();
        assert!((s.infrastructure.highway_km - 500.0).abs() < 1e-9);
        assert_eq!(s.projects.len(), 1);
        assert_eq!(s.completed_projects.len(), 1);
        assert_eq!(s.completed_projects.first().unwrap().status, ProjectStatus::Completed);

        let summary = ProjectProcessor.process(&mut s, &ctx()).unwrap();
        assert!((s.infrastructure.highway_km - 1000.0).abs() < 1e-9);
        assert!(s.projects.is_empty());
        assert!(summary.changes.contains_key("projects.completed.ring_road"));
    }

    #[test]
    fn cancelled_project_is_left_alone() {
        let mut s = CountryState::new(CountryCode::from("USA"), "United States");
        let mut cancelled = project("canal", 1);
        cancelled.status = ProjectStatus::Cancelled;
        s.projects = vec![cancelled];

        let summary = ProjectProcessor.process(&mut s, &ctx()).unwrap();
        assert!(summary.is_empty());
        assert_eq!(s.projects.first().unwrap().quarters_remaining, 1);
    }
}
