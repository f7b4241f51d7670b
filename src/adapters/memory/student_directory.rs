use crate::domain::{Student, StudentId, student::record_login};
use crate::ports::student_directory::{
    Registration, Result, StudentDirectory as StudentDirectoryTrait,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// In-memory implementation of StudentDirectory
pub struct StudentDirectory {
    students: Mutex<HashMap<StudentId, Student>>,
}

impl StudentDirectory {
    pub fn new() -> Self {
        Self {
            students: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<StudentId, Student>>> {
        self.students
            .lock()
            .map_err(|_| "student directory lock poisoned".into())
    }
}

impl Default for StudentDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StudentDirectoryTrait for StudentDirectory {
    async fn insert_student(&self, student: &Student) -> Result<Registration> {
        let mut students = self.lock()?;

        if students.contains_key(&student.student_id) {
            return Ok(Registration::DuplicateStudentId);
        }
        if students.values().any(|s| s.email == student.email) {
            return Ok(Registration::DuplicateEmail);
        }

        students.insert(student.student_id.clone(), student.clone());
        Ok(Registration::Registered)
    }

    async fn find_student(&self, student_id: &StudentId) -> Result<Option<Student>> {
        Ok(self.lock()?.get(student_id).cloned())
    }

    async fn list_students(&self) -> Result<Vec<Student>> {
        Ok(self.lock()?.values().cloned().collect())
    }

    async fn append_login(
        &self,
        student_id: &StudentId,
        logged_in_at: DateTime<Utc>,
    ) -> Result<Option<Student>> {
        // Append under the directory lock; callers never write back a stale copy
        let mut students = self.lock()?;
        Ok(students.get_mut(student_id).map(|existing| {
            *existing = record_login(existing, logged_in_at);
            existing.clone()
        }))
    }
}
