use crate::domain::{Department, Email, Student, StudentId};
use crate::ports::student_directory::{
    Registration, Result, StudentDirectory as StudentDirectoryTrait,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use std::collections::HashMap;

const SELECT_STUDENT: &str = r#"
    SELECT
        student_id,
        name,
        email,
        department,
        registered_at,
        last_login
    FROM students
"#;

/// ログイン履歴を除いた学生の行を変換する
fn map_row_to_student(row: &PgRow) -> Result<Student> {
    Ok(Student {
        student_id: StudentId::parse(row.try_get::<String, _>("student_id")?)?,
        name: row.try_get("name")?,
        email: Email::parse(row.try_get::<String, _>("email")?)?,
        department: Department::parse(row.try_get::<String, _>("department")?)?,
        registered_at: row.try_get("registered_at")?,
        last_login: row.try_get("last_login")?,
        login_history: Vec::new(),
    })
}

/// 一意制約違反を登録結果に変換する
fn registration_conflict(err: &sqlx::Error) -> Option<Registration> {
    let db_err = err.as_database_error()?;
    if !db_err.is_unique_violation() {
        return None;
    }
    match db_err.constraint() {
        Some("students_pkey") => Some(Registration::DuplicateStudentId),
        Some("students_email_key") => Some(Registration::DuplicateEmail),
        _ => None,
    }
}

/// StudentDirectoryのPostgreSQL実装
///
/// 学籍番号は主キー、メールアドレスは一意制約で重複を防ぐ。
pub struct StudentDirectory {
    pool: PgPool,
}

impl StudentDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StudentDirectoryTrait for StudentDirectory {
    async fn insert_student(&self, student: &Student) -> Result<Registration> {
        let result = sqlx::query(
            r#"
            INSERT INTO students (
                student_id,
                name,
                email,
                department,
                registered_at,
                last_login
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(student.student_id.as_str())
        .bind(&student.name)
        .bind(student.email.as_str())
        .bind(student.department.as_str())
        .bind(student.registered_at)
        .bind(student.last_login)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(Registration::Registered),
            Err(err) => match registration_conflict(&err) {
                Some(conflict) => Ok(conflict),
                None => Err(err.into()),
            },
        }
    }

    async fn find_student(&self, student_id: &StudentId) -> Result<Option<Student>> {
        let row = sqlx::query(&format!("{SELECT_STUDENT} WHERE student_id = $1"))
            .bind(student_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut student = map_row_to_student(&row)?;

        let logins = sqlx::query(
            r#"
            SELECT logged_in_at
            FROM student_logins
            WHERE student_id = $1
            ORDER BY logged_in_at ASC
            "#,
        )
        .bind(student_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        student.login_history = logins
            .iter()
            .map(|row| row.try_get("logged_in_at"))
            .collect::<std::result::Result<Vec<DateTime<Utc>>, sqlx::Error>>()?;

        Ok(Some(student))
    }

    async fn list_students(&self) -> Result<Vec<Student>> {
        let rows = sqlx::query(SELECT_STUDENT).fetch_all(&self.pool).await?;
        let mut students = rows
            .iter()
            .map(map_row_to_student)
            .collect::<Result<Vec<_>>>()?;

        let logins = sqlx::query(
            r#"
            SELECT student_id, logged_in_at
            FROM student_logins
            ORDER BY logged_in_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut history: HashMap<String, Vec<DateTime<Utc>>> = HashMap::new();
        for row in &logins {
            history
                .entry(row.try_get("student_id")?)
                .or_default()
                .push(row.try_get("logged_in_at")?);
        }
        for student in &mut students {
            if let Some(logged_in) = history.remove(student.student_id.as_str()) {
                student.login_history = logged_in;
            }
        }

        Ok(students)
    }

    /// last_loginの更新と履歴の追加を1つのトランザクションで行う
    async fn append_login(
        &self,
        student_id: &StudentId,
        logged_in_at: DateTime<Utc>,
    ) -> Result<Option<Student>> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE students
            SET last_login = $2
            WHERE student_id = $1
            "#,
        )
        .bind(student_id.as_str())
        .bind(logged_in_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        sqlx::query(
            r#"
            INSERT INTO student_logins (student_id, logged_in_at)
            VALUES ($1, $2)
            "#,
        )
        .bind(student_id.as_str())
        .bind(logged_in_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.find_student(student_id).await
    }
}
