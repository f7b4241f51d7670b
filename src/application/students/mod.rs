mod student_service;

pub use student_service::{
    StudentProfile, get_student, list_students, record_login, register_student, student_profile,
};
