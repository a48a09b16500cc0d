use crate::domain::{Course, CourseQuery, Rating, Review, User};
use crate::infra::credentials::Argon2Hasher;
use crate::infra::db::Database;
use crate::infra::db::StoreError;
use crate::infra::db::repository::*;
use argon2::Params;
use std::sync::Arc;

fn fast_users(db: &Database) -> UserRepository {
    let params = Params::new(Params::MIN_M_COST, 1, 1, None).unwrap();
    UserRepository::with_hasher(db.connection(), Arc::new(Argon2Hasher::with_params(params)))
}

fn add_user(db: &Database, name: &str) -> anyhow::Result<User> {
    let mut user = User::new(name);
    fast_users(db).add_user(&mut user, "password123")?;
    Ok(user)
}

fn add_course(db: &Database, subject: &str, number: u32, title: &str) -> anyhow::Result<Course> {
    let repo = db.course_repo();
    let id = repo.add_course(subject, number, title)?;
    Ok(repo.get_course_by_id(id)?.expect("course just added"))
}

fn count(db: &Database, table: &str) -> i64 {
    let conn = db.connection();
    let guard = conn.lock().unwrap();
    guard
        .as_ref()
        .unwrap()
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}

fn rating(value: i64) -> Rating {
    Rating::new(value).unwrap()
}

#[test]
fn test_user_repository() -> anyhow::Result<()> {
    let db = Database::open_in_memory()?;
    let repo = fast_users(&db);

    let mut user = User::new("mst3k");
    assert_eq!(user.id, None);
    let id = repo.add_user(&mut user, "password123")?;
    assert_eq!(user.id, Some(id));
    db.commit()?;

    assert!(repo.user_exists("mst3k")?);
    assert!(!repo.user_exists("nobody")?);
    assert_eq!(repo.get_user_id("mst3k")?, id);
    assert!(repo.get_user_id("nobody").unwrap_err().is_not_found());

    let found = repo.get_user_by_username("mst3k")?.expect("found");
    assert_eq!(found, user);
    assert!(repo.get_user_by_username("nobody")?.is_none());

    Ok(())
}

#[test]
fn test_passwords_are_stored_hashed() -> anyhow::Result<()> {
    let db = Database::open_in_memory()?;
    let repo = fast_users(&db);
    let user = add_user(&db, "mst3k")?;

    let stored = repo.get_password_for_user(&user)?.expect("stored");
    assert_ne!(stored.as_str(), "password123");
    assert!(repo.get_password_for_user(&User::new("nobody"))?.is_none());

    assert_eq!(repo.verify_credentials("mst3k", "password123")?, Some(user));
    assert_eq!(repo.verify_credentials("mst3k", "wrong-password")?, None);
    assert_eq!(repo.verify_credentials("nobody", "password123")?, None);

    Ok(())
}

#[test]
fn test_duplicate_username_rolls_back() -> anyhow::Result<()> {
    let db = Database::open_in_memory()?;
    add_user(&db, "mst3k")?;
    db.commit()?;
    // uncommitted work that the implicit rollback must also discard
    add_user(&db, "pending")?;

    let mut again = User::new("mst3k");
    let err = fast_users(&db).add_user(&mut again, "password123").unwrap_err();
    assert!(matches!(err, StoreError::Storage(_)));
    assert_eq!(again.id, None);
    assert_eq!(count(&db, "Users"), 1);

    Ok(())
}

#[test]
fn test_course_exists_after_add_and_commit() -> anyhow::Result<()> {
    let db = Database::open_in_memory()?;
    let repo = db.course_repo();

    assert!(!repo.course_already_exists("CS", 2150, "Software Development")?);
    repo.add_course("CS", 2150, "Software Development")?;
    db.commit()?;

    assert!(repo.course_already_exists("CS", 2150, "Software Development")?);
    assert!(!repo.course_already_exists("CS", 2150, "Software development")?);
    assert!(!repo.course_already_exists("CS", 2151, "Software Development")?);

    Ok(())
}

#[test]
fn test_duplicate_course_is_advisory() -> anyhow::Result<()> {
    let db = Database::open_in_memory()?;
    let repo = db.course_repo();

    repo.ensure_course_absent("CS", 2150, "Software Development")?;
    let first = repo.add_course("CS", 2150, "Software Development")?;

    let err = repo
        .ensure_course_absent("CS", 2150, "Software Development")
        .unwrap_err();
    assert!(matches!(err, StoreError::Duplicate { .. }));

    // the store itself accepts the second insert
    let second = repo.add_course("CS", 2150, "Software Development")?;
    assert_ne!(first, second);
    assert_eq!(count(&db, "Courses"), 2);
    assert_eq!(repo.get_course_id("CS", 2150, "Software Development")?, first);

    Ok(())
}

#[test]
fn test_course_lookups() -> anyhow::Result<()> {
    let db = Database::open_in_memory()?;
    let repo = db.course_repo();
    let id = repo.add_course("CS", 2150, "Software Development")?;

    let course = repo.get_course_by_id(id)?.expect("found");
    assert_eq!(course.subject, "CS");
    assert_eq!(course.course_number, 2150);
    assert_eq!(course.title, "Software Development");
    assert_eq!(course.average_rating, None);
    assert!(repo.get_course_by_id(id + 100)?.is_none());

    assert_eq!(repo.get_course_id("CS", 2150, "Software Development")?, id);
    let err = repo.get_course_id("CS", 9999, "Missing").unwrap_err();
    assert!(err.is_not_found());

    Ok(())
}

#[test]
fn test_average_for_single_review() -> anyhow::Result<()> {
    let db = Database::open_in_memory()?;
    let user = add_user(&db, "alice")?;
    let course = add_course(&db, "CS", 2150, "Software Development")?;
    let reviews = db.review_repo();

    assert_eq!(reviews.calculate_average_review_for_course(&course)?, None);

    let review = Review::new(user.id.unwrap(), course.id, rating(5), Some("Great".into()));
    reviews.add_review(&review)?;
    db.commit()?;

    assert_eq!(reviews.calculate_average_review_for_course(&course)?, Some(5.0));

    Ok(())
}

#[test]
fn test_average_for_two_reviews() -> anyhow::Result<()> {
    let db = Database::open_in_memory()?;
    let alice = add_user(&db, "alice")?;
    let bob = add_user(&db, "bob")?;
    let course = add_course(&db, "CS", 2150, "Software Development")?;
    let reviews = db.review_repo();

    reviews.add_review(&Review::new(alice.id.unwrap(), course.id, rating(4), None))?;
    reviews.add_review(&Review::new(bob.id.unwrap(), course.id, rating(5), None))?;

    assert_eq!(reviews.calculate_average_review_for_course(&course)?, Some(4.5));

    let with_ratings = db.course_repo().get_all_courses_with_ratings()?;
    assert_eq!(with_ratings.len(), 1);
    assert_eq!(with_ratings[0].average_rating, Some(4.5));

    Ok(())
}

#[test]
fn test_average_is_rounded_to_two_decimals() -> anyhow::Result<()> {
    let db = Database::open_in_memory()?;
    let course = add_course(&db, "CS", 2150, "Software Development")?;
    let reviews = db.review_repo();

    for (name, value) in [("a", 4), ("b", 4), ("c", 3)] {
        let user = add_user(&db, name)?;
        reviews.add_review(&Review::new(user.id.unwrap(), course.id, rating(value), None))?;
    }

    assert_eq!(reviews.calculate_average_review_for_course(&course)?, Some(3.67));
    let listed = db.course_repo().get_course_by_id(course.id)?.expect("found");
    assert_eq!(listed.average_rating, Some(3.67));

    Ok(())
}

#[test]
fn test_all_courses_with_ratings_reports_absent_average() -> anyhow::Result<()> {
    let db = Database::open_in_memory()?;
    let user = add_user(&db, "alice")?;
    let reviewed = add_course(&db, "CS", 2150, "Software Development")?;
    add_course(&db, "CS", 3140, "Software Development Essentials")?;
    db.review_repo()
        .add_review(&Review::new(user.id.unwrap(), reviewed.id, rating(3), None))?;

    let all = db.course_repo().get_all_courses_with_ratings()?;
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].average_rating, Some(3.0));
    assert_eq!(all[1].average_rating, None);

    Ok(())
}

#[test]
fn test_review_lookup_returns_single_review() -> anyhow::Result<()> {
    let db = Database::open_in_memory()?;
    let user = add_user(&db, "alice")?;
    let course = add_course(&db, "CS", 2150, "Software Development")?;
    let reviews = db.review_repo();

    assert!(reviews.get_review_from_user_for_course(&user, &course)?.is_none());

    let review = Review::new(user.id.unwrap(), course.id, rating(4), Some("Solid".into()));
    let id = reviews.add_review(&review)?;
    db.commit()?;

    let found = reviews
        .get_review_from_user_for_course(&user, &course)?
        .expect("found");
    assert_eq!(found.id, Some(id));
    assert_eq!(found.rating, rating(4));
    assert_eq!(found.comment.as_deref(), Some("Solid"));
    assert_eq!(found.entry_time, review.entry_time);
    assert_eq!(reviews.get_reviews_for_course(&course)?.len(), 1);

    Ok(())
}

#[test]
fn test_review_lookup_with_unknown_course_is_not_found() -> anyhow::Result<()> {
    let db = Database::open_in_memory()?;
    let user = add_user(&db, "alice")?;
    let ghost = Course {
        id: 42,
        subject: "CS".into(),
        course_number: 9999,
        title: "Ghost".into(),
        average_rating: None,
    };

    let err = db
        .review_repo()
        .get_review_from_user_for_course(&user, &ghost)
        .unwrap_err();
    assert!(err.is_not_found());

    Ok(())
}

#[test]
fn test_edit_review_keeps_pair_key() -> anyhow::Result<()> {
    let db = Database::open_in_memory()?;
    let user = add_user(&db, "alice")?;
    let course = add_course(&db, "CS", 2150, "Software Development")?;
    let reviews = db.review_repo();

    let old = Review::new(user.id.unwrap(), course.id, rating(2), Some("Meh".into()));
    let id = reviews.add_review(&old)?;

    let mut new = old.clone();
    new.rating = rating(5);
    new.comment = Some("Grew on me".into());
    new.entry_time = old.entry_time + chrono::Duration::minutes(5);
    reviews.edit_review(&old, &new)?;
    db.commit()?;

    let found = reviews
        .get_review_from_user_for_course(&user, &course)?
        .expect("found");
    assert_eq!(found.id, Some(id));
    assert_eq!(found.rating, rating(5));
    assert_eq!(found.comment.as_deref(), Some("Grew on me"));
    assert_eq!(found.entry_time, new.entry_time);
    assert_eq!(count(&db, "Reviews"), 1);

    Ok(())
}

#[test]
fn test_edit_missing_review_is_not_found() -> anyhow::Result<()> {
    let db = Database::open_in_memory()?;
    let user = add_user(&db, "alice")?;
    let course = add_course(&db, "CS", 2150, "Software Development")?;

    let old = Review::new(user.id.unwrap(), course.id, rating(2), None);
    let err = db.review_repo().edit_review(&old, &old).unwrap_err();
    assert!(err.is_not_found());
    // not a storage failure, so pending work survives
    assert_eq!(count(&db, "Courses"), 1);

    Ok(())
}

#[test]
fn test_remove_review() -> anyhow::Result<()> {
    let db = Database::open_in_memory()?;
    let user = add_user(&db, "alice")?;
    let course = add_course(&db, "CS", 2150, "Software Development")?;
    let reviews = db.review_repo();

    reviews.add_review(&Review::new(user.id.unwrap(), course.id, rating(3), None))?;
    db.commit()?;

    reviews.remove_review(&course, &user)?;
    db.commit()?;
    assert!(reviews.get_review_from_user_for_course(&user, &course)?.is_none());
    assert_eq!(reviews.calculate_average_review_for_course(&course)?, None);

    Ok(())
}

#[test]
fn test_remove_missing_review_is_not_found() -> anyhow::Result<()> {
    let db = Database::open_in_memory()?;
    let alice = add_user(&db, "alice")?;
    let carol = add_user(&db, "carol")?;
    let course = add_course(&db, "CS", 2150, "Software Development")?;
    let reviews = db.review_repo();
    reviews.add_review(&Review::new(alice.id.unwrap(), course.id, rating(3), None))?;
    db.commit()?;

    let err = reviews.remove_review(&course, &carol).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(count(&db, "Reviews"), 1);

    Ok(())
}

#[test]
fn test_storage_failure_rolls_back_insert() -> anyhow::Result<()> {
    let db = Database::open_in_memory()?;
    let user = add_user(&db, "alice")?;
    let course = add_course(&db, "CS", 2150, "Software Development")?;
    db.commit()?;
    let reviews = db.review_repo();
    reviews.add_review(&Review::new(user.id.unwrap(), course.id, rating(3), None))?;
    assert_eq!(count(&db, "Reviews"), 1);

    // dangling foreign key
    let orphan = Review::new(user.id.unwrap(), course.id + 100, rating(4), None);
    let err = reviews.add_review(&orphan).unwrap_err();
    assert!(matches!(err, StoreError::Storage(_)));

    assert_eq!(count(&db, "Reviews"), 0);
    assert_eq!(count(&db, "Courses"), 1);
    // the connection keeps working after the implicit rollback
    reviews.add_review(&Review::new(user.id.unwrap(), course.id, rating(3), None))?;
    db.commit()?;
    assert_eq!(count(&db, "Reviews"), 1);

    Ok(())
}

#[test]
fn test_submit_review_creates_then_edits() -> anyhow::Result<()> {
    let db = Database::open_in_memory()?;
    let user = add_user(&db, "alice")?;
    let course = add_course(&db, "CS", 2150, "Software Development")?;
    let reviews = db.review_repo();

    let created = reviews.submit_review(&user, &course, rating(2), Some("First".into()))?;
    let edited = reviews.submit_review(&user, &course, rating(4), Some("Second".into()))?;
    db.commit()?;

    assert_eq!(created.id, edited.id);
    let all = reviews.get_reviews_for_course(&course)?;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].rating, rating(4));
    assert_eq!(all[0].comment.as_deref(), Some("Second"));

    Ok(())
}

#[test]
fn test_reviews_from_user() -> anyhow::Result<()> {
    let db = Database::open_in_memory()?;
    let alice = add_user(&db, "alice")?;
    let bob = add_user(&db, "bob")?;
    let sde = add_course(&db, "CS", 2150, "Software Development")?;
    let algo = add_course(&db, "CS", 4102, "Algorithms")?;
    let reviews = db.review_repo();

    reviews.submit_review(&alice, &sde, rating(5), None)?;
    reviews.submit_review(&alice, &algo, rating(3), None)?;
    reviews.submit_review(&bob, &algo, rating(4), None)?;

    let mine = reviews.get_reviews_from_user(&alice)?;
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|r| Some(r.user_id) == alice.id));

    let listed = reviews.get_reviews_from_user_with_courses(&alice)?;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].course.title, "Software Development");
    assert_eq!(listed[1].course.title, "Algorithms");
    assert_eq!(listed[1].course.average_rating, Some(3.5));
    assert_eq!(listed[1].review.rating, rating(3));

    Ok(())
}

#[test]
fn test_search_courses() -> anyhow::Result<()> {
    let db = Database::open_in_memory()?;
    let repo = db.course_repo();
    repo.add_course("CS", 3140, "Software Development Essentials")?;
    repo.add_course("STS", 4500, "STS and Engineering Practice")?;
    repo.add_course("CS", 2150, "Program and Data Representation")?;
    repo.add_course("APMA", 3080, "Linear Algebra")?;
    db.commit()?;

    assert_eq!(repo.search_courses(&CourseQuery::new())?.len(), 4);

    let cs = repo.search_courses(&CourseQuery::new().subject("CS"))?;
    let numbers: Vec<_> = cs.iter().map(|c| c.course_number).collect();
    assert_eq!(numbers, vec![2150, 3140]);

    let titled = repo.search_courses(&CourseQuery::new().title("practice"))?;
    assert_eq!(titled.len(), 1);
    assert_eq!(titled[0].subject, "STS");

    let numbered = repo.search_courses(&CourseQuery::new().course_number(3080))?;
    assert_eq!(numbered.len(), 1);
    assert_eq!(numbered[0].title, "Linear Algebra");

    Ok(())
}

#[test]
fn test_repositories_require_connection() -> anyhow::Result<()> {
    let db = Database::open_in_memory()?;
    db.disconnect()?;

    let err = db.course_repo().get_all_courses_with_ratings().unwrap_err();
    assert!(err.is_connection_state());
    let err = db.course_repo().add_course("CS", 2150, "Software Development").unwrap_err();
    assert!(err.is_connection_state());
    let err = fast_users(&db).user_exists("alice").unwrap_err();
    assert!(err.is_connection_state());

    Ok(())
}
