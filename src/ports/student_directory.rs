use crate::domain::{Student, StudentId, StudentSnapshot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 学生登録の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Registered,
    /// 学籍番号が登録済み
    DuplicateStudentId,
    /// メールアドレスが登録済み
    DuplicateEmail,
}

/// 学生名簿ポート
///
/// 貸出台帳は学生の存在確認とスナップショットのみを必要とする。
#[async_trait]
pub trait StudentDirectory: Send + Sync {
    /// 学生を登録する
    ///
    /// 学籍番号・メールアドレスの重複確認と挿入を不可分に行う。
    async fn insert_student(&self, student: &Student) -> Result<Registration>;

    /// 学籍番号で学生を取得する
    async fn find_student(&self, student_id: &StudentId) -> Result<Option<Student>>;

    /// すべての学生を取得する（順序は規定しない）
    async fn list_students(&self) -> Result<Vec<Student>>;

    /// ログインを追記する
    ///
    /// `last_login`の更新とログイン履歴への`logged_in_at`の追加を不可分に行い、
    /// 更新後の学生を返す。学生が未登録ならNone。
    async fn append_login(
        &self,
        student_id: &StudentId,
        logged_in_at: DateTime<Utc>,
    ) -> Result<Option<Student>>;

    /// 登録済みの学生のスナップショットを取得する
    async fn student_snapshot(&self, student_id: &StudentId) -> Result<Option<StudentSnapshot>> {
        Ok(self
            .find_student(student_id)
            .await?
            .map(|student| student.snapshot()))
    }
}
