use crate::domain::{
    self, ActiveBorrow, ReturnBookError, ReturnedBorrow,
    commands::{BorrowBook, ReturnBook},
};
use crate::ports::{ActiveInsert, RecordFilter};

use crate::application::{ApplicationError, Result, ServiceDependencies};

/// 書籍を借りる
///
/// 前提条件（この順に確認）：
/// 1. 書籍が存在し、論理削除されていないこと（NotFound）
/// 2. 書籍に貸出中の記録がないこと（Conflict）
/// 3. 学生が登録済みであること（NotFound）
///
/// 2の確認は事前チェックに過ぎない。最終的な判定はストアの
/// `insert_active`が確認と挿入を不可分に行うことで保証する。
/// 同時に同じ書籍を借りようとした場合、成功するのは1件のみ。
///
/// 1人の学生が同時に借りられる冊数に上限はない。
///
/// # 戻り値
/// 作成された貸出中記録（記録IDと返却期限を含む）
pub async fn borrow_book(deps: &ServiceDependencies, cmd: BorrowBook) -> Result<ActiveBorrow> {
    // 1. 書籍の存在確認
    let book = deps
        .catalog
        .book_snapshot(cmd.book_id)
        .await
        .map_err(ApplicationError::CatalogError)?
        .ok_or(ApplicationError::BookNotFound(cmd.book_id))?;

    // 2. 貸出中記録の事前確認
    let already_borrowed = deps
        .borrow_records
        .find_matching(&RecordFilter::active_for_book(cmd.book_id))
        .await
        .map_err(ApplicationError::StoreError)?;

    if !already_borrowed.is_empty() {
        tracing::debug!(book_id = %cmd.book_id, "borrow rejected: book already borrowed");
        return Err(ApplicationError::BookAlreadyBorrowed(cmd.book_id));
    }

    // 3. 学生の存在確認
    let student = deps
        .students
        .student_snapshot(&cmd.student_id)
        .await
        .map_err(ApplicationError::DirectoryError)?
        .ok_or_else(|| ApplicationError::StudentNotFound(cmd.student_id.clone()))?;

    // 4. ドメイン層の純粋関数を呼び出し
    let record = domain::borrow::borrow_book(
        cmd.book_id,
        book,
        cmd.student_id,
        student,
        cmd.borrowed_at,
    );

    // 5. 原子的に挿入
    let outcome = deps
        .borrow_records
        .insert_active(record.clone())
        .await
        .map_err(ApplicationError::StoreError)?;

    match outcome {
        ActiveInsert::Inserted => {
            tracing::info!(
                record_id = %record.record_id,
                book_id = %record.book_id,
                student_id = %record.student_id,
                due_date = %record.due_date,
                "book borrowed"
            );
            Ok(record)
        }
        ActiveInsert::BookAlreadyBorrowed => {
            tracing::warn!(book_id = %record.book_id, "borrow lost race for book");
            Err(ApplicationError::BookAlreadyBorrowed(record.book_id))
        }
    }
}

/// 書籍を返却する
///
/// 前提条件：
/// - 貸出記録が存在すること（NotFound）
/// - 貸出中であること（Conflict）。二度目の返却はエラーであり、何もしない成功ではない
///
/// 返却は取り消せない。
pub async fn return_book(deps: &ServiceDependencies, cmd: ReturnBook) -> Result<ReturnedBorrow> {
    // 1. 貸出記録を取得
    let record = deps
        .borrow_records
        .find_by_id(cmd.record_id)
        .await
        .map_err(ApplicationError::StoreError)?
        .ok_or(ApplicationError::RecordNotFound(cmd.record_id))?;

    // 2. ドメイン層の純粋関数を呼び出し
    let returned = domain::borrow::return_book(record, cmd.returned_at).map_err(|e| match e {
        ReturnBookError::AlreadyReturned => ApplicationError::AlreadyReturned(cmd.record_id),
    })?;

    // 3. 貸出中の場合のみ更新（同時返却はここで1件に絞られる）
    let updated = deps
        .borrow_records
        .mark_returned(&returned)
        .await
        .map_err(ApplicationError::StoreError)?;

    if !updated {
        return Err(ApplicationError::AlreadyReturned(cmd.record_id));
    }

    let was_overdue = returned.returned_at > returned.due_date;
    tracing::info!(
        record_id = %returned.record_id,
        book_id = %returned.book_id,
        was_overdue,
        "book returned"
    );

    Ok(returned)
}
