//! Reconciliation Integration Tests
//!
//! Drives the update and create passes against an in-memory tracker.

mod common;

use std::sync::Arc;

use common::{project, FakeTracker};
use taskmirror::core::{MatchPolicy, ReconcileError, ReconcileSettings, Reconciler};
use taskmirror::domain::{
    Analysis, ExtractedTask, ItemKind, ItemOutcome, MediaKind, Priority, SessionContext,
    Transition, UpdateDirective,
};

fn reconciler(tracker: &Arc<FakeTracker>) -> Reconciler {
    Reconciler::new(tracker.clone(), ReconcileSettings::default())
}

fn session() -> SessionContext {
    SessionContext::new("weekly-sync", MediaKind::Audio)
}

fn directive(keywords: &[&str], status: &str, reason: &str) -> UpdateDirective {
    UpdateDirective {
        search_keywords: keywords.iter().map(|k| k.to_string()).collect(),
        new_status: status.to_string(),
        reason: reason.to_string(),
    }
}

#[tokio::test]
async fn test_creates_one_issue_per_task() {
    let tracker = Arc::new(FakeTracker::new());
    let analysis = Analysis {
        tasks: vec![
            ExtractedTask {
                priority: Some("Высокий".to_string()),
                ..ExtractedTask::titled("Fix login bug")
            },
            ExtractedTask::titled("Write release notes"),
        ],
        ..Default::default()
    };

    let result = reconciler(&tracker)
        .reconcile(&analysis, &session())
        .await
        .unwrap();

    let created = result.created();
    assert_eq!(created.len(), 2);
    assert_eq!(created[0].title, "Fix login bug");
    assert_eq!(created[0].project, "CRM");
    assert_eq!(created[0].source, "Meeting recording");

    let drafts = tracker.drafts();
    assert_eq!(drafts[0].priority, Some(Priority::High));
    assert_eq!(drafts[0].issue_type, "Task");
    // Absent priority is omitted, not defaulted
    assert_eq!(drafts[1].priority, None);
    assert!(drafts[0]
        .description
        .as_deref()
        .unwrap()
        .contains("Session: weekly-sync"));

    // Both tasks are To Do, so nothing is transitioned
    assert!(tracker.applied().is_empty());
}

#[tokio::test]
async fn test_partial_failure_does_not_stop_batch() {
    let tracker = Arc::new(FakeTracker::new().failing_create_for("Second"));
    let analysis = Analysis {
        tasks: vec![
            ExtractedTask::titled("First"),
            ExtractedTask::titled("Second"),
            ExtractedTask::titled("Third"),
        ],
        ..Default::default()
    };

    let result = reconciler(&tracker)
        .reconcile(&analysis, &session())
        .await
        .unwrap();

    let create_calls = tracker
        .calls()
        .iter()
        .filter(|c| c.starts_with("create:"))
        .count();
    assert_eq!(create_calls, 3);

    assert_eq!(result.created().len(), 2);
    assert_eq!(result.failed_count(), 1);
    match &result.outcomes[1] {
        ItemOutcome::Failed { item, reason } => {
            assert_eq!(item.label, "Second");
            assert_eq!(item.index, 1);
            assert!(reason.contains("400"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_identical_titles_are_each_created() {
    let tracker = Arc::new(FakeTracker::new());
    let analysis = Analysis {
        tasks: vec![ExtractedTask::titled("Same"), ExtractedTask::titled("Same")],
        ..Default::default()
    };

    let result = reconciler(&tracker)
        .reconcile(&analysis, &session())
        .await
        .unwrap();

    let create_calls = tracker
        .calls()
        .iter()
        .filter(|c| *c == "create:Same")
        .count();
    assert_eq!(create_calls, 2);

    let created = result.created();
    assert_eq!(created.len(), 2);
    assert_ne!(created[0].key, created[1].key);
}

#[tokio::test]
async fn test_update_flagged_tasks_are_skipped() {
    let tracker = Arc::new(FakeTracker::new());
    let analysis = Analysis {
        tasks: vec![
            ExtractedTask {
                is_update: true,
                ..ExtractedTask::titled("Billing is live")
            },
            ExtractedTask::titled("Plan Q3"),
        ],
        ..Default::default()
    };

    let result = reconciler(&tracker)
        .reconcile(&analysis, &session())
        .await
        .unwrap();

    assert_eq!(tracker.drafts().len(), 1);
    assert!(matches!(result.outcomes[0], ItemOutcome::Skipped { .. }));
    assert_eq!(result.created()[0].title, "Plan Q3");
}

#[tokio::test]
async fn test_directive_transitions_matching_issue() {
    let tracker = Arc::new(
        FakeTracker::new()
            .with_issue("CRM-7", "Billing integration", "To Do", 3)
            .with_issue("CRM-2", "Unrelated", "To Do", 10),
    );
    let analysis = Analysis {
        task_updates: vec![directive(
            &["billing", "invoice"],
            "Done",
            "billing shipped",
        )],
        ..Default::default()
    };

    let result = reconciler(&tracker)
        .reconcile(&analysis, &session())
        .await
        .unwrap();

    assert_eq!(tracker.applied(), vec![("CRM-7".to_string(), "31".to_string())]);
    assert_eq!(tracker.status_of("CRM-7").as_deref(), Some("Done"));

    let updated = result.updated();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].key, "CRM-7");
    assert_eq!(updated[0].title, "Billing integration");
    assert_eq!(updated[0].old_status, "To Do");
    assert_eq!(updated[0].new_status, "Done");
    assert_eq!(updated[0].reason, "billing shipped");
    assert!(tracker.drafts().is_empty());
}

#[tokio::test]
async fn test_keyword_operators_are_stripped_before_search() {
    let tracker = Arc::new(FakeTracker::new().with_issue("CRM-4", "C migration", "To Do", 2));
    let analysis = Analysis {
        task_updates: vec![directive(&["C++ migration"], "Done", "ported")],
        ..Default::default()
    };

    let result = reconciler(&tracker)
        .reconcile(&analysis, &session())
        .await
        .unwrap();

    let search = tracker
        .calls()
        .into_iter()
        .find(|c| c.starts_with("search:"))
        .unwrap();
    assert!(!search.contains('+'));
    assert_eq!(result.updated()[0].key, "CRM-4");
}

#[tokio::test]
async fn test_zero_match_directive_mutates_nothing() {
    let tracker = Arc::new(FakeTracker::new().with_issue("CRM-1", "Hiring plan", "To Do", 1));
    let analysis = Analysis {
        task_updates: vec![directive(&["billing"], "Done", "shipped")],
        ..Default::default()
    };

    let result = reconciler(&tracker)
        .reconcile(&analysis, &session())
        .await
        .unwrap();

    assert!(tracker.applied().is_empty());
    assert!(tracker.drafts().is_empty());
    assert_eq!(result.skipped_count(), 1);
    assert_eq!(result.outcomes[0].item().kind, ItemKind::Directive);
}

#[tokio::test]
async fn test_most_recent_match_wins() {
    let tracker = Arc::new(
        FakeTracker::new()
            .with_issue("CRM-1", "Billing v1", "To Do", 30)
            .with_issue("CRM-9", "Billing v2", "To Do", 2),
    );
    let analysis = Analysis {
        task_updates: vec![directive(&["billing"], "In Progress", "started")],
        ..Default::default()
    };

    reconciler(&tracker)
        .reconcile(&analysis, &session())
        .await
        .unwrap();

    assert_eq!(tracker.applied(), vec![("CRM-9".to_string(), "11".to_string())]);
    assert_eq!(tracker.status_of("CRM-1").as_deref(), Some("To Do"));
}

#[tokio::test]
async fn test_require_unique_skips_ambiguous_directive() {
    let tracker = Arc::new(
        FakeTracker::new()
            .with_issue("CRM-1", "Billing v1", "To Do", 30)
            .with_issue("CRM-9", "Billing v2", "To Do", 2),
    );
    let settings = ReconcileSettings {
        match_policy: MatchPolicy::RequireUnique,
        ..Default::default()
    };
    let analysis = Analysis {
        task_updates: vec![directive(&["billing"], "Done", "shipped")],
        ..Default::default()
    };

    let result = Reconciler::new(tracker.clone(), settings)
        .reconcile(&analysis, &session())
        .await
        .unwrap();

    assert!(tracker.applied().is_empty());
    match &result.outcomes[0] {
        ItemOutcome::Skipped { reason, .. } => assert!(reason.contains("2 issues")),
        other => panic!("expected skip, got {:?}", other),
    }
}

#[tokio::test]
async fn test_directive_without_transition_is_skipped() {
    // Done has no edge to Done
    let tracker = Arc::new(FakeTracker::new().with_issue("CRM-3", "Billing", "Done", 1));
    let analysis = Analysis {
        task_updates: vec![directive(&["billing"], "Done", "shipped")],
        ..Default::default()
    };

    let result = reconciler(&tracker)
        .reconcile(&analysis, &session())
        .await
        .unwrap();

    assert!(tracker.applied().is_empty());
    assert_eq!(result.skipped_count(), 1);
}

#[tokio::test]
async fn test_directive_edge_cases_skip_without_search() {
    let tracker = Arc::new(FakeTracker::new().with_issue("CRM-3", "Billing", "To Do", 1));
    let analysis = Analysis {
        task_updates: vec![
            directive(&["  ", ""], "Done", "blank keywords"),
            directive(&["billing"], "Review", "unknown status"),
        ],
        ..Default::default()
    };

    let result = reconciler(&tracker)
        .reconcile(&analysis, &session())
        .await
        .unwrap();

    assert_eq!(result.skipped_count(), 2);
    assert!(!tracker.calls().iter().any(|c| c.starts_with("search:")));
}

#[tokio::test]
async fn test_localized_workflow_transition() {
    let tracker = Arc::new(
        FakeTracker::new()
            .with_workflow(vec![
                (
                    "К выполнению",
                    vec![Transition::new("2", "Начать", "В работе")],
                ),
                ("В работе", vec![Transition::new("3", "Завершить", "Готово")]),
            ])
            .with_issue("CRM-5", "Найм дизайнера", "В работе", 1),
    );
    let analysis = Analysis {
        task_updates: vec![directive(&["найм"], "Done", "hired")],
        ..Default::default()
    };

    let result = reconciler(&tracker)
        .reconcile(&analysis, &session())
        .await
        .unwrap();

    assert_eq!(result.updated()[0].new_status, "Готово");
    assert_eq!(tracker.applied(), vec![("CRM-5".to_string(), "3".to_string())]);
}

#[tokio::test]
async fn test_in_progress_task_is_transitioned_after_create() {
    let tracker = Arc::new(FakeTracker::new());
    let analysis = Analysis {
        tasks: vec![ExtractedTask {
            status: Some("В работе".to_string()),
            ..ExtractedTask::titled("Migrate database")
        }],
        ..Default::default()
    };

    let result = reconciler(&tracker)
        .reconcile(&analysis, &session())
        .await
        .unwrap();

    let key = result.created()[0].key.clone();
    assert_eq!(tracker.applied(), vec![(key.clone(), "11".to_string())]);
    assert_eq!(tracker.status_of(&key).as_deref(), Some("In Progress"));
}

#[tokio::test]
async fn test_updates_run_before_creates() {
    let tracker = Arc::new(FakeTracker::new().with_issue("CRM-1", "Billing", "To Do", 1));
    let analysis = Analysis {
        tasks: vec![ExtractedTask::titled("New work")],
        task_updates: vec![directive(&["billing"], "Done", "shipped")],
        ..Default::default()
    };

    let result = reconciler(&tracker)
        .reconcile(&analysis, &session())
        .await
        .unwrap();

    assert_eq!(result.outcomes.len(), 2);
    assert_eq!(result.outcomes[0].item().kind, ItemKind::Directive);
    assert_eq!(result.outcomes[1].item().kind, ItemKind::Task);
    assert_eq!(result.summary(), "Created tasks: 1, updated: 1");
}

#[tokio::test]
async fn test_project_resolution_fallbacks() {
    let tracker = Arc::new(
        FakeTracker::new().with_projects(vec![project("OPS", "Ops"), project("LRN", "LearnJira")]),
    );
    let analysis = Analysis {
        tasks: vec![ExtractedTask::titled("Anything")],
        ..Default::default()
    };

    let result = reconciler(&tracker)
        .reconcile(&analysis, &session())
        .await
        .unwrap();

    assert_eq!(result.created()[0].project, "LRN");
    assert_eq!(tracker.drafts()[0].project_key, "LRN");
}

#[tokio::test]
async fn test_no_accessible_project_is_fatal() {
    let tracker = Arc::new(FakeTracker::new().with_projects(vec![]));
    let analysis = Analysis {
        tasks: vec![ExtractedTask::titled("Anything")],
        ..Default::default()
    };

    let err = reconciler(&tracker)
        .reconcile(&analysis, &session())
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::NoAccessibleProject));
    assert!(tracker.drafts().is_empty());
}

#[tokio::test]
async fn test_project_listing_failure_fails_task_only() {
    let tracker = Arc::new(FakeTracker::new().failing_project_listing());
    let analysis = Analysis {
        tasks: vec![ExtractedTask::titled("A"), ExtractedTask::titled("B")],
        ..Default::default()
    };

    let result = reconciler(&tracker)
        .reconcile(&analysis, &session())
        .await
        .unwrap();

    assert_eq!(result.failed_count(), 2);
    assert!(tracker.drafts().is_empty());
}

#[tokio::test]
async fn test_issue_type_falls_back_to_task() {
    let tracker = Arc::new(FakeTracker::new().failing_issue_types());
    let analysis = Analysis {
        tasks: vec![ExtractedTask::titled("A")],
        ..Default::default()
    };

    reconciler(&tracker)
        .reconcile(&analysis, &session())
        .await
        .unwrap();

    assert_eq!(tracker.drafts()[0].issue_type, "Task");
}

#[tokio::test]
async fn test_task_cap_skips_overflow() {
    let tracker = Arc::new(FakeTracker::new());
    let settings = ReconcileSettings {
        max_tasks_per_submission: Some(1),
        ..Default::default()
    };
    let analysis = Analysis {
        tasks: vec![ExtractedTask::titled("A"), ExtractedTask::titled("B")],
        ..Default::default()
    };

    let result = Reconciler::new(tracker.clone(), settings)
        .reconcile(&analysis, &session())
        .await
        .unwrap();

    assert_eq!(tracker.drafts().len(), 1);
    assert_eq!(result.skipped_count(), 1);
}

#[tokio::test]
async fn test_create_plain_issue() {
    let tracker = Arc::new(FakeTracker::new());

    let created = reconciler(&tracker)
        .create_plain_issue("Call the vendor", Some("  "))
        .await
        .unwrap();

    assert_eq!(created.project, "CRM");
    assert_eq!(created.status, "To Do");
    let drafts = tracker.drafts();
    assert_eq!(drafts[0].summary, "Call the vendor");
    assert_eq!(drafts[0].description, None);
}
