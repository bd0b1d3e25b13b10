// Container status reconciliation: diff each batch against the last seen status per id.

use serde::Serialize;
use std::collections::HashMap;

use crate::models::{ActivityKind, ContainerSnapshot, ContainerStatus};

/// A status change between two consecutive batches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionEvent {
    pub id: String,
    pub name: String,
    pub from: ContainerStatus,
    pub to: ContainerStatus,
}

impl TransitionEvent {
    pub fn severity(&self) -> ActivityKind {
        match self.to {
            ContainerStatus::Exited | ContainerStatus::Stopped => ActivityKind::Error,
            ContainerStatus::Paused => ActivityKind::Warning,
            _ => ActivityKind::Success,
        }
    }

    pub fn title(&self) -> String {
        match self.to {
            ContainerStatus::Exited | ContainerStatus::Stopped => "Container Stopped".into(),
            ContainerStatus::Running => "Container Started".into(),
            ContainerStatus::Paused => "Container Paused".into(),
            ref other => format!("Container {}", other),
        }
    }

    pub fn description(&self) -> String {
        format!("{} changed from {} to {}", self.name, self.from, self.to)
    }
}

/// Keeps only the previous status per container id.
#[derive(Debug, Default)]
pub struct Reconciler {
    last_status: HashMap<String, ContainerStatus>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// First sightings emit nothing. Ids missing from `batch` are left as they were.
    pub fn reconcile(&mut self, batch: &[ContainerSnapshot]) -> Vec<TransitionEvent> {
        let mut events = Vec::new();
        for snapshot in batch {
            match self.last_status.get_mut(&snapshot.id) {
                Some(last) if *last != snapshot.status => {
                    events.push(TransitionEvent {
                        id: snapshot.id.clone(),
                        name: snapshot.display_name().to_string(),
                        from: last.clone(),
                        to: snapshot.status.clone(),
                    });
                    *last = snapshot.status.clone();
                }
                Some(_) => {}
                None => {
                    self.last_status
                        .insert(snapshot.id.clone(), snapshot.status.clone());
                }
            }
        }
        events
    }

    pub fn last_status(&self, id: &str) -> Option<&ContainerStatus> {
        self.last_status.get(id)
    }

    pub fn tracked(&self) -> usize {
        self.last_status.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(id: &str, status: &str) -> ContainerSnapshot {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": format!("{}-name", id),
            "status": status,
        }))
        .unwrap()
    }

    #[test]
    fn first_sighting_emits_nothing() {
        let mut r = Reconciler::new();
        assert!(r.reconcile(&[container("a", "running")]).is_empty());
        assert_eq!(r.tracked(), 1);
    }

    #[test]
    fn identical_batch_is_idempotent() {
        let mut r = Reconciler::new();
        let batch = vec![container("a", "running"), container("b", "exited")];
        r.reconcile(&batch);
        let changed = vec![container("a", "exited"), container("b", "running")];
        assert_eq!(r.reconcile(&changed).len(), 2);
        assert!(r.reconcile(&changed).is_empty());
    }

    #[test]
    fn running_to_exited_is_one_error_event() {
        let mut r = Reconciler::new();
        r.reconcile(&[container("a", "running")]);
        let events = r.reconcile(&[container("a", "exited")]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].severity(), ActivityKind::Error);
        assert_eq!(events[0].title(), "Container Stopped");
        assert_eq!(events[0].from, ContainerStatus::Running);
        assert_eq!(events[0].to, ContainerStatus::Exited);
    }

    #[test]
    fn severity_and_titles_per_target_status() {
        let mut r = Reconciler::new();
        r.reconcile(&[
            container("a", "exited"),
            container("b", "running"),
            container("c", "running"),
        ]);
        let events = r.reconcile(&[
            container("a", "running"),
            container("b", "paused"),
            container("c", "restarting"),
        ]);
        let summary: Vec<_> = events.iter().map(|e| (e.severity(), e.title())).collect();
        assert_eq!(
            summary,
            vec![
                (ActivityKind::Success, "Container Started".to_string()),
                (ActivityKind::Warning, "Container Paused".to_string()),
                (ActivityKind::Success, "Container restarting".to_string()),
            ]
        );
    }

    #[test]
    fn absent_ids_are_retained() {
        let mut r = Reconciler::new();
        r.reconcile(&[container("a", "running"), container("b", "running")]);
        assert!(r.reconcile(&[container("a", "running")]).is_empty());
        assert_eq!(r.last_status("b"), Some(&ContainerStatus::Running));
        let events = r.reconcile(&[container("b", "exited")]);
        assert_eq!(events.len(), 1);
    }
}
