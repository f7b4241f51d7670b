use chrono::{DateTime, Duration, Utc};
use granthalaya_ledger::application::{ApplicationError, ErrorKind, catalog, ledger};
use granthalaya_ledger::domain::borrow::{BORROW_PERIOD_DAYS, due_date};
use granthalaya_ledger::domain::commands::{BorrowBook, ReturnBook};
use granthalaya_ledger::domain::{BookDetails, BookId, BorrowStatus, Department, StudentId};

mod common;

use common::{add_book, at, memory_deps, register_student};

fn borrow_cmd(book_id: BookId, student_id: &str, borrowed_at: DateTime<Utc>) -> BorrowBook {
    BorrowBook {
        book_id,
        student_id: StudentId::parse(student_id).unwrap(),
        borrowed_at,
    }
}

// ============================================================================
// Borrow
// ============================================================================

#[tokio::test]
async fn test_borrow_then_second_borrow_conflicts() {
    let deps = memory_deps();
    let book = add_book(&deps, "Operating Systems", "Computer Science").await;
    register_student(&deps, "S1").await;
    register_student(&deps, "S2").await;

    let borrowed_at = at(1, 20);
    let record = ledger::borrow_book(&deps, borrow_cmd(book.book_id, "S1", borrowed_at))
        .await
        .expect("first borrow should succeed");

    assert_eq!(record.book_id, book.book_id);
    assert_eq!(record.student_id.as_str(), "S1");
    assert_eq!(record.borrowed_at, borrowed_at);
    assert_eq!(record.due_date, due_date(borrowed_at));
    assert!(record.due_date - borrowed_at >= Duration::days(BORROW_PERIOD_DAYS as i64 - 1));
    assert_eq!(record.book.title, "Operating Systems");
    assert_eq!(record.student.name, "Student S1");

    let err = ledger::borrow_book(&deps, borrow_cmd(book.book_id, "S2", borrowed_at))
        .await
        .unwrap_err();

    assert!(matches!(err, ApplicationError::BookAlreadyBorrowed(id) if id == book.book_id));
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_borrow_nonexistent_book_is_not_found() {
    let deps = memory_deps();
    register_student(&deps, "S1").await;

    let err = ledger::borrow_book(&deps, borrow_cmd(BookId::new(999), "S1", at(2, 1)))
        .await
        .unwrap_err();

    assert!(matches!(err, ApplicationError::BookNotFound(id) if id == BookId::new(999)));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_borrow_by_unknown_student_is_not_found() {
    let deps = memory_deps();
    let book = add_book(&deps, "Compilers", "Computer Science").await;

    let err = ledger::borrow_book(&deps, borrow_cmd(book.book_id, "GHOST", at(2, 1)))
        .await
        .unwrap_err();

    assert!(matches!(err, ApplicationError::StudentNotFound(_)));

    // 失敗した貸出は記録を残さない
    let availability = ledger::availability(&deps, book.book_id).await.unwrap();
    assert!(availability.available);
}

#[tokio::test]
async fn test_borrow_deleted_book_is_not_found() {
    let deps = memory_deps();
    let book = add_book(&deps, "Old Edition", "Physics").await;
    register_student(&deps, "S1").await;

    catalog::delete_book(&deps, book.book_id, at(2, 1))
        .await
        .unwrap();

    let err = ledger::borrow_book(&deps, borrow_cmd(book.book_id, "S1", at(2, 2)))
        .await
        .unwrap_err();

    assert!(matches!(err, ApplicationError::BookNotFound(_)));
}

#[tokio::test]
async fn test_student_may_hold_several_books() {
    let deps = memory_deps();
    register_student(&deps, "S1").await;

    for title in ["Algebra", "Topology", "Analysis", "Geometry"] {
        let book = add_book(&deps, title, "Mathematics").await;
        ledger::borrow_book(&deps, borrow_cmd(book.book_id, "S1", at(3, 1)))
            .await
            .expect("no cap on concurrent borrows");
    }

    let stats = ledger::stats(&deps, &StudentId::parse("S1").unwrap(), at(3, 2))
        .await
        .unwrap();
    assert_eq!(stats.currently_holding, 4);
}

// ============================================================================
// Return
// ============================================================================

#[tokio::test]
async fn test_return_twice_conflicts() {
    let deps = memory_deps();
    let book = add_book(&deps, "Databases", "Computer Science").await;
    register_student(&deps, "S1").await;

    let record = ledger::borrow_book(&deps, borrow_cmd(book.book_id, "S1", at(4, 1)))
        .await
        .unwrap();

    let returned = ledger::return_book(
        &deps,
        ReturnBook {
            record_id: record.record_id,
            returned_at: at(4, 5),
        },
    )
    .await
    .expect("first return should succeed");

    assert_eq!(returned.record_id, record.record_id);
    assert_eq!(returned.returned_at, at(4, 5));
    assert_eq!(returned.due_date, record.due_date);

    let err = ledger::return_book(
        &deps,
        ReturnBook {
            record_id: record.record_id,
            returned_at: at(4, 6),
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ApplicationError::AlreadyReturned(id) if id == record.record_id));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // 2回目の返却は返却日時を変更しない
    let stored = ledger::get_record(&deps, record.record_id).await.unwrap();
    assert_eq!(stored.returned_at(), Some(at(4, 5)));
}

#[tokio::test]
async fn test_return_unknown_record_is_not_found() {
    let deps = memory_deps();

    let err = ledger::return_book(
        &deps,
        ReturnBook {
            record_id: granthalaya_ledger::domain::RecordId::new(),
            returned_at: at(4, 1),
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ApplicationError::RecordNotFound(_)));
}

#[tokio::test]
async fn test_overdue_record_can_be_returned() {
    let deps = memory_deps();
    let book = add_book(&deps, "Thermodynamics", "Physics").await;
    register_student(&deps, "S1").await;

    let record = ledger::borrow_book(&deps, borrow_cmd(book.book_id, "S1", at(1, 1)))
        .await
        .unwrap();

    let returned = ledger::return_book(
        &deps,
        ReturnBook {
            record_id: record.record_id,
            returned_at: at(3, 1),
        },
    )
    .await
    .unwrap();

    assert!(returned.returned_at > returned.due_date);
}

// ============================================================================
// Availability
// ============================================================================

#[tokio::test]
async fn test_availability_follows_borrow_and_return() {
    let deps = memory_deps();
    let book = add_book(&deps, "Linear Algebra", "Mathematics").await;
    register_student(&deps, "S1").await;
    register_student(&deps, "S2").await;

    assert!(ledger::availability(&deps, book.book_id).await.unwrap().available);

    let record = ledger::borrow_book(&deps, borrow_cmd(book.book_id, "S1", at(5, 1)))
        .await
        .unwrap();

    let availability = ledger::availability(&deps, book.book_id).await.unwrap();
    assert!(!availability.available);
    assert_eq!(
        availability.borrower.map(|active| active.record_id),
        Some(record.record_id)
    );

    ledger::return_book(
        &deps,
        ReturnBook {
            record_id: record.record_id,
            returned_at: at(5, 3),
        },
    )
    .await
    .unwrap();

    let availability = ledger::availability(&deps, book.book_id).await.unwrap();
    assert!(availability.available);
    assert!(availability.borrower.is_none());

    // 返却後は別の学生が借りられる
    ledger::borrow_book(&deps, borrow_cmd(book.book_id, "S2", at(5, 4)))
        .await
        .expect("returned book can be borrowed again");
}

#[tokio::test]
async fn test_availability_of_missing_book_is_not_found() {
    let deps = memory_deps();

    let err = ledger::availability(&deps, BookId::new(42)).await.unwrap_err();
    assert!(matches!(err, ApplicationError::BookNotFound(_)));
}

// ============================================================================
// History / stats / listing
// ============================================================================

#[tokio::test]
async fn test_history_is_most_recent_first() {
    let deps = memory_deps();
    register_student(&deps, "S1").await;
    register_student(&deps, "S2").await;

    let first = add_book(&deps, "Book One", "History").await;
    let second = add_book(&deps, "Book Two", "History").await;
    let third = add_book(&deps, "Book Three", "History").await;
    let other = add_book(&deps, "Someone Else's", "History").await;

    // 登録順と貸出日時の順を変えておく
    let r2 = ledger::borrow_book(&deps, borrow_cmd(second.book_id, "S1", at(6, 2)))
        .await
        .unwrap();
    let r1 = ledger::borrow_book(&deps, borrow_cmd(first.book_id, "S1", at(6, 1)))
        .await
        .unwrap();
    let r3 = ledger::borrow_book(&deps, borrow_cmd(third.book_id, "S1", at(6, 3)))
        .await
        .unwrap();
    ledger::borrow_book(&deps, borrow_cmd(other.book_id, "S2", at(6, 4)))
        .await
        .unwrap();

    let history = ledger::history(&deps, &StudentId::parse("S1").unwrap())
        .await
        .unwrap();

    let ids: Vec<_> = history.iter().map(|record| record.core().record_id).collect();
    assert_eq!(ids, vec![r3.record_id, r2.record_id, r1.record_id]);
}

#[tokio::test]
async fn test_history_of_unknown_student_is_empty() {
    let deps = memory_deps();

    let history = ledger::history(&deps, &StudentId::parse("NOBODY").unwrap())
        .await
        .unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_stats_and_overdue_view() {
    let deps = memory_deps();
    register_student(&deps, "S1").await;

    let late = add_book(&deps, "Late", "Chemistry").await;
    let current = add_book(&deps, "Current", "Chemistry").await;
    let done = add_book(&deps, "Done", "Chemistry").await;

    let late_record = ledger::borrow_book(&deps, borrow_cmd(late.book_id, "S1", at(1, 1)))
        .await
        .unwrap();
    ledger::borrow_book(&deps, borrow_cmd(current.book_id, "S1", at(1, 25)))
        .await
        .unwrap();
    let done_record = ledger::borrow_book(&deps, borrow_cmd(done.book_id, "S1", at(1, 2)))
        .await
        .unwrap();
    ledger::return_book(
        &deps,
        ReturnBook {
            record_id: done_record.record_id,
            returned_at: at(1, 5),
        },
    )
    .await
    .unwrap();

    let now = at(1, 28);
    let student_id = StudentId::parse("S1").unwrap();
    let stats = ledger::stats(&deps, &student_id, now).await.unwrap();

    assert_eq!(stats.total_borrowed, 3);
    assert_eq!(stats.currently_holding, 2);
    assert_eq!(stats.returned, 1);
    assert_eq!(stats.overdue, 1);

    let overdue = ledger::list_records(
        &deps,
        &ledger::RecordQuery {
            status: ledger::StatusFilter::Overdue,
            ..Default::default()
        },
        now,
    )
    .await
    .unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].core().record_id, late_record.record_id);

    let returned = ledger::list_records(
        &deps,
        &ledger::RecordQuery {
            status: ledger::StatusFilter::Returned,
            student_id: Some(student_id.clone()),
            book_id: None,
        },
        now,
    )
    .await
    .unwrap();
    assert_eq!(returned.len(), 1);
    assert_eq!(returned[0].status(), BorrowStatus::Returned);

    let by_book = ledger::list_records(
        &deps,
        &ledger::RecordQuery {
            book_id: Some(current.book_id),
            ..Default::default()
        },
        now,
    )
    .await
    .unwrap();
    assert_eq!(by_book.len(), 1);
    assert_eq!(by_book[0].core().book_id, current.book_id);
}

#[tokio::test]
async fn test_snapshots_survive_catalog_edits() {
    let deps = memory_deps();
    let book = add_book(&deps, "First Title", "Literature").await;
    register_student(&deps, "S1").await;

    let record = ledger::borrow_book(&deps, borrow_cmd(book.book_id, "S1", at(7, 1)))
        .await
        .unwrap();

    let details = BookDetails::new(
        "Second Title",
        "Test Author",
        Department::parse("Literature").unwrap(),
    )
    .unwrap();
    catalog::update_book(&deps, book.book_id, details)
        .await
        .unwrap();

    let stored = ledger::get_record(&deps, record.record_id).await.unwrap();
    assert_eq!(stored.core().book.title, "First Title");
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_borrows_leave_exactly_one_active_record() {
    let deps = memory_deps();
    let book = add_book(&deps, "Contended", "Computer Science").await;

    let contenders = 16;
    for i in 0..contenders {
        register_student(&deps, &format!("S{}", i)).await;
    }

    let handles: Vec<_> = (0..contenders)
        .map(|i| {
            let deps = deps.clone();
            let cmd = borrow_cmd(book.book_id, &format!("S{}", i), at(8, 1));
            tokio::spawn(async move { ledger::borrow_book(&deps, cmd).await })
        })
        .collect();

    let mut succeeded = 0;
    for result in futures::future::join_all(handles).await {
        match result.expect("task panicked") {
            Ok(_) => succeeded += 1,
            Err(err) => assert!(matches!(err, ApplicationError::BookAlreadyBorrowed(_))),
        }
    }
    assert_eq!(succeeded, 1);

    let active = ledger::list_records(
        &deps,
        &ledger::RecordQuery {
            status: ledger::StatusFilter::Active,
            book_id: Some(book.book_id),
            student_id: None,
        },
        at(8, 1),
    )
    .await
    .unwrap();
    assert_eq!(active.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_returns_succeed_once() {
    let deps = memory_deps();
    let book = add_book(&deps, "Returned Often", "Computer Science").await;
    register_student(&deps, "S1").await;

    let record = ledger::borrow_book(&deps, borrow_cmd(book.book_id, "S1", at(9, 1)))
        .await
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let deps = deps.clone();
            let cmd = ReturnBook {
                record_id: record.record_id,
                returned_at: at(9, 2) + Duration::minutes(i),
            };
            tokio::spawn(async move { ledger::return_book(&deps, cmd).await })
        })
        .collect();

    let mut succeeded = 0;
    for result in futures::future::join_all(handles).await {
        match result.expect("task panicked") {
            Ok(_) => succeeded += 1,
            Err(err) => assert!(matches!(err, ApplicationError::AlreadyReturned(_))),
        }
    }
    assert_eq!(succeeded, 1);
}
