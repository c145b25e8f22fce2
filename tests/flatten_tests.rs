use chrono::NaiveDate;
use gantt_solver::graph::{DependencyDag, flatten};
use gantt_solver::{
    Fact, FactRecord, Limit, Project, Resource, ScheduleError, SchedulerConfig, Task, WorkType,
};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn dev(days: i64) -> Limit {
    Limit::with_duration(days).role("dev")
}

fn project(root: Task) -> Project {
    Project::new(d(2026, 1, 1))
        .with_resource(Resource::new("ann", "dev"))
        .with_root(root)
}

fn completed() -> Fact {
    Fact::from_records([
        FactRecord::started(d(2025, 12, 1)),
        FactRecord::completed(d(2025, 12, 5)),
    ])
}

#[test]
fn missing_root_is_rejected() {
    let project = Project::new(d(2026, 1, 1));
    let err = flatten(&project, &SchedulerConfig::default()).unwrap_err();
    assert_eq!(err, ScheduleError::MissingRoot);
}

#[test]
fn fact_date_before_start_is_rejected() {
    let project = project(Task::leaf("a", "A", dev(1))).with_fact_date(d(2025, 12, 31));
    let err = flatten(&project, &SchedulerConfig::default()).unwrap_err();
    assert_eq!(
        err,
        ScheduleError::FactDateBeforeStart {
            start: d(2026, 1, 1),
            fact_date: d(2025, 12, 31),
        }
    );
}

#[test]
fn blank_and_duplicate_ids_are_rejected() {
    let blank = project(Task::group("root", "Root", [Task::leaf(" ", "A", dev(1))]));
    assert_eq!(
        flatten(&blank, &SchedulerConfig::default()).unwrap_err(),
        ScheduleError::MissingId
    );

    let duplicate = project(Task::group(
        "root",
        "Root",
        [
            Task::leaf("a", "A", dev(1)),
            Task::group("g", "G", [Task::leaf("a", "Again", dev(1))]),
        ],
    ));
    assert_eq!(
        flatten(&duplicate, &SchedulerConfig::default()).unwrap_err(),
        ScheduleError::DuplicateId("a".into())
    );
}

#[test]
fn leaf_without_limit_is_rejected() {
    let mut leaf = Task::leaf("a", "A", dev(1));
    leaf.limit = None;
    let project = project(Task::group("root", "Root", [leaf]));
    assert_eq!(
        flatten(&project, &SchedulerConfig::default()).unwrap_err(),
        ScheduleError::MissingLimit("a".into())
    );
}

#[test]
fn limit_without_estimate_is_rejected() {
    let project = project(Task::leaf("a", "A", Limit::default().role("dev")));
    let err = flatten(&project, &SchedulerConfig::default()).unwrap_err();
    assert!(matches!(err, ScheduleError::InvalidLimit { task, .. } if task == "a"));
}

#[test]
fn unknown_priority_is_rejected() {
    let project = project(Task::leaf("a", "A", dev(1).priority(7)));
    assert_eq!(
        flatten(&project, &SchedulerConfig::default()).unwrap_err(),
        ScheduleError::InvalidPriority {
            task: "a".into(),
            priority: 7,
        }
    );
    let config = SchedulerConfig::default().with_priority_weight(7, 10);
    assert!(flatten(&project, &config).is_ok());
}

#[test]
fn project_with_only_finished_or_disabled_leaves_is_empty() {
    let canceled = Fact::from_records([FactRecord::canceled(d(2026, 1, 2))]);
    let project = project(Task::group(
        "root",
        "Root",
        [
            Task::leaf("a", "A", dev(1)).with_fact(completed()),
            Task::leaf("b", "B", dev(1)).with_fact(canceled),
            Task::leaf("c", "C", dev(1)).with_disabled(true),
        ],
    ));
    assert_eq!(
        flatten(&project, &SchedulerConfig::default()).unwrap_err(),
        ScheduleError::EmptyProject
    );
}

#[test]
fn paused_leaves_are_not_solvable() {
    let paused = Fact::from_records([
        FactRecord::started(d(2026, 1, 1)),
        FactRecord::paused(d(2026, 1, 2)),
    ]);
    let project = project(Task::group(
        "root",
        "Root",
        [
            Task::leaf("a", "A", dev(1)).with_fact(paused),
            Task::leaf("b", "B", dev(1)),
        ],
    ));
    let flat = flatten(&project, &SchedulerConfig::default()).unwrap();
    let ids: Vec<&str> = flat.solvable().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["b"]);
    assert_eq!(flat.leaves().len(), 2);
}

#[test]
fn disabling_a_group_disables_every_descendant() {
    let project = project(Task::group(
        "root",
        "Root",
        [
            Task::group(
                "g",
                "G",
                [
                    Task::leaf("a", "A", dev(1)),
                    Task::group("h", "H", [Task::leaf("b", "B", dev(1))]),
                ],
            )
            .with_disabled(true),
            Task::leaf("c", "C", dev(1)),
        ],
    ));
    let flat = flatten(&project, &SchedulerConfig::default()).unwrap();
    assert!(flat.leaf("a").unwrap().disabled);
    assert!(flat.leaf("b").unwrap().disabled);
    assert!(!flat.leaf("c").unwrap().disabled);
    assert_eq!(flat.solvable_count(), 1);
}

#[test]
fn attributes_come_from_nearest_ancestor() {
    let project = project(
        Task::group(
            "root",
            "Root",
            [
                Task::group("g", "G", [Task::leaf("a", "A", dev(1))])
                    .with_priority(2)
                    .with_work_type(WorkType::Team),
                Task::leaf("b", "B", dev(1)),
                Task::leaf("c", "C", dev(1).priority(3)),
            ],
        )
        .with_priority(1)
        .with_work_type(WorkType::Business),
    );
    let flat = flatten(&project, &SchedulerConfig::default()).unwrap();
    let a = flat.leaf("a").unwrap();
    assert_eq!(a.effective_priority(), Some(2));
    assert_eq!(a.work_type, Some(WorkType::Team));
    let b = flat.leaf("b").unwrap();
    assert_eq!(b.effective_priority(), Some(1));
    assert_eq!(b.work_type, Some(WorkType::Business));
    assert_eq!(flat.leaf("c").unwrap().effective_priority(), Some(3));

    // The input tree keeps its own values.
    assert_eq!(project.task("a").unwrap().priority, None);
}

#[test]
fn group_predecessor_expands_to_what_its_leaves_wait_for() {
    let project = project(Task::group(
        "root",
        "Root",
        [
            Task::leaf("x", "X", dev(1)),
            Task::group(
                "g",
                "G",
                [
                    Task::leaf("a", "A", dev(1).after(["x"])),
                    Task::group("h", "H", [Task::leaf("b", "B", dev(1).after(["y"]))]),
                ],
            ),
            Task::leaf("y", "Y", dev(1)),
            Task::leaf("c", "C", dev(1).after(["g"])),
        ],
    ));
    let flat = flatten(&project, &SchedulerConfig::default()).unwrap();
    assert!(flat.is_group("h"));
    assert_eq!(flat.group_leaves("g").unwrap(), ["a".to_string(), "b".to_string()]);
    let c = flat.leaf("c").unwrap();
    assert_eq!(c.limit.as_ref().unwrap().predecessors, vec!["x", "y"]);
    // Leaves keep their own lists.
    assert_eq!(flat.leaf("a").unwrap().limit.as_ref().unwrap().predecessors, vec!["x"]);
}

#[test]
fn group_expansion_drops_finished_predecessors() {
    let project = project(Task::group(
        "root",
        "Root",
        [
            Task::leaf("x", "X", dev(1)).with_fact(completed()),
            Task::leaf("y", "Y", dev(1)),
            Task::group(
                "g",
                "G",
                [
                    Task::leaf("a", "A", dev(1).after(["x"])),
                    Task::leaf("b", "B", dev(1).after(["y", "x"])),
                ],
            ),
            Task::leaf("c", "C", dev(1).after(["g", "y"])),
        ],
    ));
    let flat = flatten(&project, &SchedulerConfig::default()).unwrap();
    assert_eq!(flat.leaf("c").unwrap().limit.as_ref().unwrap().predecessors, vec!["y"]);
}

#[test]
fn finished_predecessor_is_dropped() {
    let project = project(Task::group(
        "root",
        "Root",
        [
            Task::leaf("a", "A", dev(1)).with_fact(completed()),
            Task::leaf("b", "B", dev(1)).with_disabled(true),
            Task::leaf("c", "C", dev(1).after(["a", "b"])),
        ],
    ));
    let flat = flatten(&project, &SchedulerConfig::default()).unwrap();
    assert!(flat.leaf("c").unwrap().limit.as_ref().unwrap().predecessors.is_empty());
    assert!(!flat.is_solvable("a"));
}

#[test]
fn unknown_predecessor_is_rejected() {
    let project = project(Task::leaf("a", "A", dev(1).after(["ghost"])));
    assert_eq!(
        flatten(&project, &SchedulerConfig::default()).unwrap_err(),
        ScheduleError::UnknownPredecessor {
            task: "a".into(),
            predecessor: "ghost".into(),
        }
    );
}

#[test]
fn dependency_cycle_is_rejected() {
    let project = project(Task::group(
        "root",
        "Root",
        [
            Task::leaf("a", "A", dev(1).after(["b"])),
            Task::leaf("b", "B", dev(1).after(["a"])),
        ],
    ));
    let flat = flatten(&project, &SchedulerConfig::default()).unwrap();
    let err = DependencyDag::build(&flat).err().unwrap();
    assert!(matches!(err, ScheduleError::DependencyCycle(_)));
}

#[test]
fn priority_order_releases_urgent_ready_tasks_first() {
    let project = project(Task::group(
        "root",
        "Root",
        [
            Task::leaf("a", "A", dev(1)),
            Task::leaf("b", "B", dev(1).priority(3)),
            Task::leaf("c", "C", dev(1).priority(1).after(["a"])),
            Task::leaf("d", "D", dev(1)),
        ],
    ));
    let config = SchedulerConfig::default();
    let flat = flatten(&project, &config).unwrap();
    let dag = DependencyDag::build(&flat).unwrap();
    assert_eq!(dag.priority_order(&flat, &config), vec!["b", "a", "c", "d"]);
}
