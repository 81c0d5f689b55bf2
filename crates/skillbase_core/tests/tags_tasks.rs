mod common;

use common::{count_rows, new_skill, test_app};
use skillbase_core::db::open_db_in_memory;
use skillbase_core::{
    Lifecycle, NewJobTask, TagServiceError, TaskKind, TaskListQuery, TaskServiceError, TaskStatus,
};

fn task(job_no: &str, project: &str) -> NewJobTask {
    NewJobTask {
        job_no: job_no.to_string(),
        project: project.to_string(),
        kind: TaskKind::NewFeature,
        goal: "ship it".to_string(),
    }
}

#[test]
fn tag_names_are_trimmed_and_unique() {
    let app = test_app();
    let conn = open_db_in_memory().unwrap();
    let service = app.tag_service(&conn);

    let tag = service.create_tag("  pdf ").unwrap();
    assert_eq!(tag.name, "pdf");
    assert!(matches!(
        service.create_tag("pdf"),
        Err(TagServiceError::DuplicateName(name)) if name == "pdf"
    ));
    assert!(matches!(
        service.create_tag(""),
        Err(TagServiceError::InvalidName(_))
    ));
}

#[test]
fn tag_pages_default_to_first_page_of_ten() {
    let app = test_app();
    let conn = open_db_in_memory().unwrap();
    let service = app.tag_service(&conn);
    for index in 0..12 {
        service.create_tag(&format!("tag-{index:02}")).unwrap();
    }

    let first = service.list_tags(None, None).unwrap();
    assert_eq!(first.page, 1);
    assert_eq!(first.page_size, 10);
    assert_eq!(first.items.len(), 10);
    assert_eq!(first.total, 12);
    assert_eq!(first.total_pages(), 2);

    let second = service.list_tags(Some(2), Some(0)).unwrap();
    assert_eq!(second.items.len(), 2);
    assert_eq!(second.items[0].name, "tag-10");

    let clamped = service.list_tags(Some(1), Some(500)).unwrap();
    assert_eq!(clamped.page_size, 100);
    assert_eq!(clamped.items.len(), 12);
}

#[test]
fn rename_checks_other_tags_names() {
    let app = test_app();
    let conn = open_db_in_memory().unwrap();
    let service = app.tag_service(&conn);
    let pdf = service.create_tag("pdf").unwrap();
    service.create_tag("csv").unwrap();

    assert!(matches!(
        service.rename_tag(pdf.id, "csv"),
        Err(TagServiceError::DuplicateName(_))
    ));
    assert_eq!(service.rename_tag(pdf.id, "pdf").unwrap().name, "pdf");
    assert_eq!(service.rename_tag(pdf.id, " documents ").unwrap().name, "documents");
    assert!(matches!(
        service.rename_tag(404, "other"),
        Err(TagServiceError::TagNotFound(404))
    ));
}

#[test]
fn deleting_a_tag_drops_its_links() {
    let app = test_app();
    let conn = open_db_in_memory().unwrap();
    let tags = app.tag_service(&conn);
    let skill = app
        .skill_service(&conn)
        .create_skill(&new_skill("pdf", "merge"))
        .unwrap();
    let tag = tags.create_tag("documents").unwrap();
    tags.add_tag_to_skill(skill.id, tag.id).unwrap();
    tags.add_tag_to_skill(skill.id, tag.id).unwrap();
    assert_eq!(count_rows(&conn, "SELECT COUNT(*) FROM skill_tags;"), 1);

    tags.delete_tag(tag.id).unwrap();
    assert_eq!(count_rows(&conn, "SELECT COUNT(*) FROM skill_tags;"), 0);
    assert!(matches!(
        tags.delete_tag(tag.id),
        Err(TagServiceError::TagNotFound(_))
    ));
}

#[test]
fn set_skill_tags_replaces_the_whole_set() {
    let app = test_app();
    let conn = open_db_in_memory().unwrap();
    let tags = app.tag_service(&conn);
    let skill = app
        .skill_service(&conn)
        .create_skill(&new_skill("pdf", "merge"))
        .unwrap();
    let a = tags.create_tag("a").unwrap();
    let b = tags.create_tag("b").unwrap();
    let c = tags.create_tag("c").unwrap();

    let applied = tags.set_skill_tags(skill.id, &[b.id, a.id, b.id]).unwrap();
    assert_eq!(
        applied.iter().map(|tag| tag.id).collect::<Vec<_>>(),
        vec![a.id, b.id]
    );

    let applied = tags.set_skill_tags(skill.id, &[c.id]).unwrap();
    assert_eq!(applied, vec![c.clone()]);

    tags.remove_tag_from_skill(skill.id, c.id).unwrap();
    assert!(tags.tags_for_skill(skill.id).unwrap().is_empty());
}

#[test]
fn set_skill_tags_is_all_or_nothing() {
    let app = test_app();
    let conn = open_db_in_memory().unwrap();
    let tags = app.tag_service(&conn);
    let skill = app
        .skill_service(&conn)
        .create_skill(&new_skill("pdf", "merge"))
        .unwrap();
    let a = tags.create_tag("a").unwrap();
    tags.set_skill_tags(skill.id, &[a.id]).unwrap();

    assert!(matches!(
        tags.set_skill_tags(skill.id, &[a.id, 999]),
        Err(TagServiceError::TagNotFound(999))
    ));
    assert_eq!(tags.tags_for_skill(skill.id).unwrap(), vec![a.clone()]);

    assert!(matches!(
        tags.set_skill_tags(404, &[a.id]),
        Err(TagServiceError::SkillNotFound(404))
    ));
    assert!(matches!(
        tags.add_tag_to_skill(skill.id, 999),
        Err(TagServiceError::TagNotFound(999))
    ));
}

#[test]
fn task_creation_validates_and_starts_created() {
    let app = test_app();
    let conn = open_db_in_memory().unwrap();
    let service = app.task_service(&conn);

    let created = service.create_task(&task(" alpha-1 ", "alpha")).unwrap();
    assert_eq!(created.job_no, "alpha-1");
    assert_eq!(created.status, TaskStatus::Created);
    assert!(!created.pass_accept_std);
    assert_eq!(created.lifecycle, Lifecycle::Active);

    let mut missing = task("alpha-2", "alpha");
    missing.goal = " ".to_string();
    assert!(matches!(
        service.create_task(&missing),
        Err(TaskServiceError::MissingField("goal"))
    ));

    assert!(matches!(
        service.create_task(&task("alpha-1", "beta")),
        Err(TaskServiceError::DuplicateJobNo(job_no)) if job_no == "alpha-1"
    ));
}

#[test]
fn status_updates_are_persisted() {
    let app = test_app();
    let conn = open_db_in_memory().unwrap();
    let service = app.task_service(&conn);
    let created = service.create_task(&task("alpha-1", "alpha")).unwrap();

    let updated = service
        .update_status(created.id, TaskStatus::Accepted, true)
        .unwrap();
    assert_eq!(updated.status, TaskStatus::Accepted);
    assert!(updated.pass_accept_std);
    assert!(matches!(
        service.update_status(404, TaskStatus::Failed, false),
        Err(TaskServiceError::TaskNotFound(404))
    ));
}

#[test]
fn task_recycle_bin_rules() {
    let app = test_app();
    let conn = open_db_in_memory().unwrap();
    let service = app.task_service(&conn);
    let created = service.create_task(&task("alpha-1", "alpha")).unwrap();

    assert!(matches!(
        service.restore_task(created.id),
        Err(TaskServiceError::TaskNotFound(_))
    ));
    assert!(matches!(
        service.destroy_task(created.id),
        Err(TaskServiceError::NotDeleted(_))
    ));

    service.delete_task(created.id).unwrap();
    assert_eq!(service.list_deleted_tasks(None, 0).unwrap().len(), 1);
    assert!(matches!(
        service.get_task(created.id),
        Err(TaskServiceError::TaskNotFound(_))
    ));

    service.restore_task(created.id).unwrap();
    service.delete_task(created.id).unwrap();
    service.destroy_task(created.id).unwrap();
    assert!(service.list_deleted_tasks(None, 0).unwrap().is_empty());
    assert_eq!(count_rows(&conn, "SELECT COUNT(*) FROM job_tasks;"), 0);
}

#[test]
fn task_listing_filters_newest_first() {
    let app = test_app();
    let conn = open_db_in_memory().unwrap();
    let service = app.task_service(&conn);
    let first = service.create_task(&task("alpha-1", "alpha")).unwrap();
    let second = service.create_task(&task("alpha-2", "alpha")).unwrap();
    let mut bug = task("beta-1", "beta");
    bug.kind = TaskKind::BugFix;
    let third = service.create_task(&bug).unwrap();
    service
        .update_status(second.id, TaskStatus::Completed, false)
        .unwrap();

    let all = service.list_tasks(&TaskListQuery::default()).unwrap();
    assert_eq!(all.total, 3);
    assert_eq!(all.applied_limit, 10);
    assert_eq!(all.items[0].id, third.id);

    let alpha = service
        .list_tasks(&TaskListQuery {
            project: Some(" alpha ".to_string()),
            ..TaskListQuery::default()
        })
        .unwrap();
    assert_eq!(
        alpha.items.iter().map(|item| item.id).collect::<Vec<_>>(),
        vec![second.id, first.id]
    );

    let bugs = service
        .list_tasks(&TaskListQuery {
            kind: Some(TaskKind::BugFix),
            ..TaskListQuery::default()
        })
        .unwrap();
    assert_eq!(bugs.total, 1);

    let completed = service
        .list_tasks(&TaskListQuery {
            status: Some(TaskStatus::Completed),
            ..TaskListQuery::default()
        })
        .unwrap();
    assert_eq!(completed.items, vec![service.get_task(second.id).unwrap()]);

    assert_eq!(service.list_projects().unwrap(), vec!["alpha", "beta"]);
}
