use crate::domain::{
    self, BorrowStats, Student, StudentId,
    commands::{RecordLogin, RegisterStudent},
};
use crate::ports::Registration;
use chrono::{DateTime, Utc};

use crate::application::{ApplicationError, Result, ServiceDependencies, ledger};

/// 学生と貸出統計
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentProfile {
    pub student: Student,
    pub stats: BorrowStats,
}

/// 学生を登録する
///
/// ビジネスルール：学籍番号・メールアドレスはそれぞれ一意（Conflict）
pub async fn register_student(deps: &ServiceDependencies, cmd: RegisterStudent) -> Result<Student> {
    let student = domain::student::register_student(cmd)?;

    let registration = deps
        .students
        .insert_student(&student)
        .await
        .map_err(ApplicationError::DirectoryError)?;

    match registration {
        Registration::Registered => {
            tracing::info!(student_id = %student.student_id, "student registered");
            Ok(student)
        }
        Registration::DuplicateStudentId => {
            Err(ApplicationError::StudentIdTaken(student.student_id))
        }
        Registration::DuplicateEmail => Err(ApplicationError::EmailTaken(student.email)),
    }
}

/// 学生を取得する
pub async fn get_student(deps: &ServiceDependencies, student_id: &StudentId) -> Result<Student> {
    deps.students
        .find_student(student_id)
        .await
        .map_err(ApplicationError::DirectoryError)?
        .ok_or_else(|| ApplicationError::StudentNotFound(student_id.clone()))
}

/// 学生一覧（学籍番号順）
pub async fn list_students(deps: &ServiceDependencies) -> Result<Vec<Student>> {
    let mut students = deps
        .students
        .list_students()
        .await
        .map_err(ApplicationError::DirectoryError)?;

    students.sort_by(|a, b| a.student_id.cmp(&b.student_id));
    Ok(students)
}

/// 学生のプロフィール（学生情報と貸出統計）
pub async fn student_profile(
    deps: &ServiceDependencies,
    student_id: &StudentId,
    now: DateTime<Utc>,
) -> Result<StudentProfile> {
    let (student, stats) = futures::try_join!(
        get_student(deps, student_id),
        ledger::stats(deps, student_id, now)
    )?;

    Ok(StudentProfile { student, stats })
}

/// ログインを記録する
///
/// 資格情報の検証は行わない。呼び出し側で認証済みであることが前提。
pub async fn record_login(deps: &ServiceDependencies, cmd: RecordLogin) -> Result<Student> {
    let updated = deps
        .students
        .append_login(&cmd.student_id, cmd.logged_in_at)
        .await
        .map_err(ApplicationError::DirectoryError)?
        .ok_or_else(|| ApplicationError::StudentNotFound(cmd.student_id.clone()))?;

    tracing::debug!(student_id = %updated.student_id, "login recorded");
    Ok(updated)
}
