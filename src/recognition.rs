//! Simulated face recognition.
//!
//! There is no camera pipeline behind this. A recognizer picks one of the
//! students who could plausibly be standing in front of it.

use chrono::NaiveDate;
use rand::seq::SliceRandom;

use crate::err::Error;
use crate::models::{AttendanceMethod, AttendanceRecord, AttendanceStatus, MarkAttendance, Student};
use crate::store::AttendanceStore;

pub trait FaceRecognizer: Send + Sync {
    /// Picks one of `candidates`, or `None` if nobody is recognised.
    fn recognize<'a>(&self, candidates: &'a [Student]) -> Option<&'a Student>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomRecognizer;

impl FaceRecognizer for RandomRecognizer {
    fn recognize<'a>(&self, candidates: &'a [Student]) -> Option<&'a Student> {
        candidates.choose(&mut rand::thread_rng())
    }
}

/// Roster students of the class with no record for it on `date`.
pub fn unmarked_students(
    store: &AttendanceStore,
    class_id: &str,
    date: NaiveDate,
) -> Result<Vec<Student>, Error> {
    let class = store.find_class(class_id).ok_or_else(|| Error::ClassNotFound {
        message: format!("Class `{}` does not exist!", class_id),
    })?;
    let marked: Vec<&str> = store
        .attendance_records()
        .iter()
        .filter(|r| r.class_id == class_id && r.date == date)
        .map(|r| r.student_id.as_str())
        .collect();

    Ok(store
        .students()
        .iter()
        .filter(|s| class.is_enrolled(&s.id) && !marked.contains(&s.id.as_str()))
        .cloned()
        .collect())
}

pub fn recognize_attendance(
    store: &mut AttendanceStore,
    recognizer: &dyn FaceRecognizer,
    class_id: &str,
    date: NaiveDate,
) -> Result<AttendanceRecord, Error> {
    let candidates = unmarked_students(store, class_id, date)?;
    let student = recognizer
        .recognize(&candidates)
        .ok_or_else(|| Error::NoCandidates {
            message: "No unrecognized students found or all students already marked present"
                .to_string(),
        })?;
    log::info!("Recognised {} ({}) in class {}", student.name, student.id, class_id);

    let mut input = MarkAttendance::new(student.id.clone(), class_id, AttendanceStatus::Present);
    input.date = Some(date);
    input.method = Some(AttendanceMethod::Face);
    Ok(store.mark_attendance(input))
}
