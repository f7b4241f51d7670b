use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Department, Email, StudentId, commands::RegisterStudent};

/// 学生 - 利用者集約
///
/// 認証情報は保持しない（認証・セッションはこのクレートの外側の関心事）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub student_id: StudentId,
    pub name: String,
    pub email: Email,
    pub department: Department,
    pub registered_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    /// ログイン日時の記録（古い順）
    pub login_history: Vec<DateTime<Utc>>,
}

impl Student {
    /// 貸出記録に焼き付ける学生情報
    pub fn snapshot(&self) -> StudentSnapshot {
        StudentSnapshot {
            name: self.name.clone(),
            email: self.email.clone(),
            department: self.department.clone(),
        }
    }
}

/// 貸出時点の学生情報のスナップショット
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentSnapshot {
    pub name: String,
    pub email: Email,
    pub department: Department,
}

/// 純粋関数：学生を登録する
///
/// 氏名は必須。学籍番号・メールアドレスの一意性はストア側で保証する。
pub fn register_student(cmd: RegisterStudent) -> Result<Student, super::ValidationError> {
    let name = cmd.name.trim().to_string();
    if name.is_empty() {
        return Err(super::ValidationError::Empty("name"));
    }

    Ok(Student {
        student_id: cmd.student_id,
        name,
        email: cmd.email,
        department: cmd.department,
        registered_at: cmd.registered_at,
        last_login: None,
        login_history: Vec::new(),
    })
}

/// 純粋関数：ログインを記録する
pub fn record_login(student: &Student, logged_in_at: DateTime<Utc>) -> Student {
    let mut login_history = student.login_history.clone();
    login_history.push(logged_in_at);

    Student {
        last_login: Some(logged_in_at),
        login_history,
        ..student.clone()
    }
}
