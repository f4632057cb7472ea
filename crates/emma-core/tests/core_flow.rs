use chrono::NaiveDate;
use emma_core::blob::{BlobStore, FileBlobStore};
use emma_core::datastore::{CollectionKey, TaskStore};
use emma_core::{DateId, GeneralList, Schedule, Task, TaskId};
use tempfile::tempdir;

#[test]
fn general_list_lifecycle_on_disk() {
    let temp = tempdir().expect("tempdir");
    let blobs = FileBlobStore::open(temp.path()).expect("open blob store");
    let mut general = GeneralList::load(blobs.clone());
    assert!(general.is_empty());

    let task = general.add("Buy milk").expect("add");
    assert_eq!(general.snapshot().len(), 1);
    assert_eq!(general.snapshot()[0].text(), "Buy milk");
    assert!(!general.snapshot()[0].completed());

    let toggled = general.toggle(task.id()).expect("toggle");
    assert!(toggled.completed());

    general.remove(task.id()).expect("remove");
    assert!(general.is_empty());

    let reloaded = GeneralList::load(blobs);
    assert!(reloaded.is_empty());
}

#[test]
fn schedule_buckets_by_exact_date() {
    let temp = tempdir().expect("tempdir");
    let blobs = FileBlobStore::open(temp.path()).expect("open blob store");
    let mut schedule = Schedule::load(blobs.clone());

    let task = schedule.add("2024-01-10", "Call Bob").expect("add");

    assert_eq!(schedule.tasks_for(&DateId::new("2024-01-10")), vec![&task]);
    assert!(schedule.tasks_for(&DateId::new("2024-01-11")).is_empty());

    let reloaded = Schedule::load(blobs);
    assert_eq!(reloaded.snapshot(), std::slice::from_ref(&task));
}

#[test]
fn both_views_share_one_store_without_interfering() {
    let temp = tempdir().expect("tempdir");
    let blobs = FileBlobStore::open(temp.path()).expect("open blob store");
    let mut general = GeneralList::load(blobs.clone());
    let mut schedule = Schedule::load(blobs.clone());

    general.add("Buy milk").expect("general add");
    schedule.add("2024-01-10", "Call Bob").expect("schedule add");

    assert!(temp.path().join("general-tasks.json").exists());
    assert!(temp.path().join("daily-tasks.json").exists());
    assert_eq!(GeneralList::load(blobs.clone()).len(), 1);
    assert_eq!(Schedule::load(blobs).snapshot().len(), 1);
}

#[test]
fn save_then_load_round_trips_any_collection() {
    let temp = tempdir().expect("tempdir");
    let store = TaskStore::new(FileBlobStore::open(temp.path()).expect("open blob store"));

    let collection = vec![
        Task::from_parts(
            TaskId::new("1704873600000"),
            "Legacy id".to_string(),
            true,
            Some(DateId::new("2024-01-10")),
        ),
        Task::from_parts(
            TaskId::new("b"),
            "Ünïcödé \"quoted\"".to_string(),
            false,
            Some(DateId::new("2024-01-09")),
        ),
    ];

    assert!(store.load(CollectionKey::Daily).is_empty());
    store.save(CollectionKey::Daily, &collection).expect("save");
    assert_eq!(store.load(CollectionKey::Daily), collection);

    store.save(CollectionKey::Daily, &[]).expect("save empty");
    assert_eq!(store.load(CollectionKey::Daily), Vec::<Task>::new());
}

#[test]
fn corrupt_blob_starts_empty_and_is_replaced_on_next_save() {
    let temp = tempdir().expect("tempdir");
    let blobs = FileBlobStore::open(temp.path()).expect("open blob store");
    blobs.set("general-tasks", "{ definitely not a list").expect("seed corrupt blob");

    let mut general = GeneralList::load(blobs.clone());
    assert!(general.is_empty());

    general.add("Fresh start").expect("add");
    let reloaded = GeneralList::load(blobs);
    assert_eq!(reloaded.len(), 1);
}

#[test]
fn week_view_covers_the_rolling_week() {
    let temp = tempdir().expect("tempdir");
    let blobs = FileBlobStore::open(temp.path()).expect("open blob store");
    let mut schedule = Schedule::load(blobs);
    let reference = NaiveDate::from_ymd_opt(2024, 1, 10).expect("valid date");

    schedule.add(DateId::from(reference), "Today's task").expect("add");
    schedule.add("2024-01-16", "Last day").expect("add");
    schedule.add("2024-01-17", "Next week").expect("add");

    let week = schedule.current_week(reference);
    assert_eq!(week.len(), 7);
    assert_eq!(week.iter().filter(|b| b.is_today).count(), 1);
    assert_eq!(week[0].weekday_name, "Wednesday");

    let view = schedule.week_view(reference);
    assert_eq!(view[0].1.len(), 1);
    assert_eq!(view[6].1[0].text(), "Last day");
    assert_eq!(view.iter().map(|(_, t)| t.len()).sum::<usize>(), 2);
}
