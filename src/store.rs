use std::collections::HashMap;

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use rand::Rng;
use uuid::Uuid;

use crate::models::{
    AttendanceRecord, Class, LearningTask, LoginCredentials, MarkAttendance, NewClass, Role,
    Student, User,
};
use crate::{qr, seed};

pub struct DemoAccount {
    pub name: &'static str,
    pub role: Role,
}

lazy_static! {
    pub static ref DEMO_ACCOUNTS: HashMap<&'static str, DemoAccount> = {
        let mut accounts = HashMap::new();
        accounts.insert(
            "student@test.com",
            DemoAccount { name: "John Student", role: Role::Student },
        );
        accounts.insert(
            "faculty@test.com",
            DemoAccount { name: "Dr. Smith", role: Role::Faculty },
        );
        accounts.insert(
            "admin@test.com",
            DemoAccount { name: "Admin User", role: Role::Admin },
        );
        accounts
    };
}

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Session-scoped state: who is logged in plus the classes, attendance,
/// roster and tasks they see.
///
/// Nothing here fails on misuse. Unknown ids turn into no-ops or empty
/// results.
#[derive(Debug, Default)]
pub struct AttendanceStore {
    current_user: Option<User>,
    classes: Vec<Class>,
    attendance_records: Vec<AttendanceRecord>,
    learning_tasks: Vec<LearningTask>,
    students: Vec<Student>,
    last_class_id: i64,
}

impl AttendanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user.is_some()
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    pub fn classes(&self) -> &[Class] {
        &self.classes
    }

    pub fn attendance_records(&self) -> &[AttendanceRecord] {
        &self.attendance_records
    }

    pub fn learning_tasks(&self) -> &[LearningTask] {
        &self.learning_tasks
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn find_class(&self, class_id: &str) -> Option<&Class> {
        self.classes.iter().find(|c| c.id == class_id)
    }

    pub fn find_student(&self, student_id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == student_id)
    }

    pub fn classes_taught_by(&self, instructor: &str) -> Vec<&Class> {
        self.classes
            .iter()
            .filter(|c| c.instructor == instructor)
            .collect()
    }

    pub fn classes_for_student(&self, student_id: &str) -> Vec<&Class> {
        self.classes
            .iter()
            .filter(|c| c.is_enrolled(student_id))
            .collect()
    }

    /// Logs in against the demo accounts. Any non-empty password is
    /// accepted. The account's own role always wins. A submitted role that
    /// disagrees with it fails the login instead of escalating.
    pub fn login(&mut self, credentials: &LoginCredentials) -> bool {
        if credentials.email.is_empty() || credentials.password.is_empty() {
            return false;
        }
        let account = match DEMO_ACCOUNTS.get(credentials.email.as_str()) {
            Some(account) => account,
            None => return false,
        };
        if let Some(requested) = credentials.role {
            if requested != account.role {
                log::warn!(
                    "Rejected login for {}: requested role {:?} but account is {:?}",
                    credentials.email,
                    requested,
                    account.role
                );
                return false;
            }
        }

        self.current_user = Some(User {
            id: Uuid::new_v4().to_string(),
            name: account.name.to_string(),
            email: credentials.email.clone(),
            role: account.role,
        });
        self.initialize_mock_data();
        true
    }

    pub fn logout(&mut self) {
        self.current_user = None;
        self.classes.clear();
        self.attendance_records.clear();
        self.learning_tasks.clear();
        self.students.clear();
    }

    /// Replaces every collection with the demo set for the current user.
    /// Does nothing while anonymous.
    pub fn initialize_mock_data(&mut self) {
        let user = match &self.current_user {
            Some(user) => user,
            None => return,
        };
        let seed = seed::demo_data(user, Utc::now());
        self.classes = seed.classes;
        self.attendance_records = seed.attendance;
        self.students = seed.students;
        self.learning_tasks = seed.tasks;
    }

    /// Seeds only while no classes are loaded.
    pub fn ensure_seeded(&mut self) {
        if self.classes.is_empty() {
            self.initialize_mock_data();
        }
    }

    pub fn get_attendance_by_student(&self, student_id: &str) -> Vec<AttendanceRecord> {
        self.attendance_records
            .iter()
            .filter(|r| r.student_id == student_id)
            .cloned()
            .collect()
    }

    pub fn get_attendance_by_class(&self, class_id: &str) -> Vec<AttendanceRecord> {
        self.attendance_records
            .iter()
            .filter(|r| r.class_id == class_id)
            .cloned()
            .collect()
    }

    pub fn toggle_task_completion(&mut self, task_id: &str) {
        if let Some(task) = self.learning_tasks.iter_mut().find(|t| t.id == task_id) {
            task.completed = !task.completed;
        }
    }

    pub fn add_class(&mut self, class: NewClass) -> Class {
        let id = self.next_class_id(Utc::now());
        let class = Class {
            id: id.to_string(),
            name: class.name,
            instructor: class.instructor,
            students: class.students,
            schedule: class.schedule,
        };
        self.classes.push(class.clone());
        class
    }

    // Millis since epoch, bumped when two classes land in the same millisecond.
    fn next_class_id(&mut self, now: DateTime<Utc>) -> i64 {
        let id = now.timestamp_millis().max(self.last_class_id + 1);
        self.last_class_id = id;
        id
    }

    pub fn mark_attendance(&mut self, input: MarkAttendance) -> AttendanceRecord {
        self.mark_attendance_at(input, Utc::now())
    }

    /// Records `input` as of `now`, replacing any record for the same
    /// student, class and day. Fields are never merged.
    pub fn mark_attendance_at(
        &mut self,
        input: MarkAttendance,
        now: DateTime<Utc>,
    ) -> AttendanceRecord {
        let record = AttendanceRecord {
            id: record_id(now),
            student_id: input.student_id,
            class_id: input.class_id,
            date: input.date.unwrap_or_else(|| now.date_naive()),
            status: input.status,
            method: input.method.unwrap_or_default(),
            timestamp: input.timestamp.unwrap_or(now),
            qr_payload: input.qr_payload,
            device_info: input.device_info,
        };

        self.attendance_records.retain(|existing| !existing.same_slot(&record));
        self.attendance_records.push(record.clone());
        log::debug!(
            "Marked {} as {} in class {} on {} ({:?})",
            record.student_id,
            record.status.as_str(),
            record.class_id,
            record.date,
            record.method
        );
        record
    }

    pub fn generate_student_qr(&self, student_id: &str) -> String {
        qr::generate_student_qr(student_id)
    }

    pub fn validate_qr_code(&self, raw: &str) -> bool {
        qr::validate_qr_code(raw)
    }
}

fn record_id(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("att_{}_{}", now.timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttendanceMethod, AttendanceStatus};
    use chrono::NaiveDate;

    fn credentials(email: &str, role: Option<Role>) -> LoginCredentials {
        LoginCredentials {
            email: email.to_string(),
            password: "hunter2".to_string(),
            role,
        }
    }

    fn logged_in() -> AttendanceStore {
        let mut store = AttendanceStore::new();
        assert!(store.login(&credentials("student@test.com", Some(Role::Student))));
        store
    }

    #[test]
    fn login_seeds_demo_data() {
        let store = logged_in();
        assert!(store.is_authenticated());
        assert_eq!(store.classes().len(), 4);
        assert_eq!(store.attendance_records().len(), 6);
        assert_eq!(store.students().len(), 8);
        assert_eq!(store.learning_tasks().len(), 5);

        let user = store.current_user().unwrap();
        assert_eq!(user.name, "John Student");
        assert_eq!(user.role, Role::Student);
        assert!(store.classes().iter().all(|c| c.is_enrolled(&user.id)));
        assert_eq!(store.get_attendance_by_student(&user.id).len(), 6);
    }

    #[test]
    fn login_rejects_unknown_or_empty_credentials() {
        let mut store = AttendanceStore::new();
        assert!(!store.login(&credentials("nobody@test.com", None)));
        assert!(!store.login(&credentials("", None)));
        assert!(!store.login(&LoginCredentials {
            email: "student@test.com".into(),
            password: String::new(),
            role: None,
        }));
        assert!(!store.is_authenticated());
        assert!(store.classes().is_empty());
    }

    #[test]
    fn login_keeps_account_role() {
        let mut store = AttendanceStore::new();
        assert!(!store.login(&credentials("student@test.com", Some(Role::Admin))));
        assert!(!store.is_authenticated());

        assert!(store.login(&credentials("faculty@test.com", None)));
        assert_eq!(store.current_user().unwrap().role, Role::Faculty);
    }

    #[test]
    fn logout_clears_everything() {
        let mut store = logged_in();
        store.logout();
        assert!(!store.is_authenticated());
        assert!(store.current_user().is_none());
        assert!(store.classes().is_empty());
        assert!(store.attendance_records().is_empty());
        assert!(store.learning_tasks().is_empty());
        assert!(store.students().is_empty());
    }

    #[test]
    fn seeding_needs_authentication() {
        let mut store = AttendanceStore::new();
        store.initialize_mock_data();
        store.ensure_seeded();
        assert!(store.classes().is_empty());
    }

    #[test]
    fn ensure_seeded_keeps_existing_data() {
        let mut store = logged_in();
        let user = store.current_user().unwrap().id.clone();
        store.mark_attendance(MarkAttendance::new(user, "2", AttendanceStatus::Late));
        store.ensure_seeded();
        assert_eq!(store.attendance_records().len(), 7);
    }

    #[test]
    fn filters_keep_collection_order() {
        let store = logged_in();
        let ids: Vec<_> = store
            .get_attendance_by_class("3")
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["3", "6"]);
        assert!(store.get_attendance_by_student("student2").is_empty());
        assert!(store.get_attendance_by_class("99").is_empty());
    }

    #[test]
    fn mark_attendance_replaces_same_day_record() {
        let mut store = logged_in();
        store.mark_attendance(MarkAttendance::new("X", "1", AttendanceStatus::Present));
        let mut second = MarkAttendance::new("X", "1", AttendanceStatus::Absent);
        second.method = Some(AttendanceMethod::Qr);
        let last = store.mark_attendance(second);

        let records = store.get_attendance_by_student("X");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0], last);
        assert_eq!(records[0].status, AttendanceStatus::Absent);
        assert_eq!(records[0].method, AttendanceMethod::Qr);
        assert_eq!(records[0].date, Utc::now().date_naive());
    }

    #[test]
    fn mark_attendance_keeps_other_days() {
        let mut store = logged_in();
        let user = store.current_user().unwrap().id.clone();
        let mut input = MarkAttendance::new(user.clone(), "1", AttendanceStatus::Late);
        input.date = NaiveDate::from_ymd_opt(2025, 9, 16);
        store.mark_attendance(input);

        let class_one: Vec<_> = store.get_attendance_by_class("1");
        assert_eq!(class_one.len(), 2);
        assert_eq!(class_one[0].id, "5");
        assert_eq!(class_one[1].status, AttendanceStatus::Late);
        assert_eq!(store.attendance_records().len(), 6);
    }

    #[test]
    fn mark_attendance_defaults() {
        let mut store = AttendanceStore::new();
        let now = Utc::now();
        let input = MarkAttendance::new("s", "c", AttendanceStatus::Present);
        let record = store.mark_attendance_at(input, now);
        assert_eq!(record.method, AttendanceMethod::Manual);
        assert_eq!(record.timestamp, now);
        assert_eq!(record.date, now.date_naive());
        assert!(record.id.starts_with(&format!("att_{}_", now.timestamp_millis())));
        assert_eq!(record.id.rsplit('_').next().unwrap().len(), 9);
    }

    #[test]
    fn toggle_task_flips_only_matching() {
        let mut store = logged_in();
        store.toggle_task_completion("3");
        store.toggle_task_completion("missing");
        let completed: Vec<_> = store
            .learning_tasks()
            .iter()
            .filter(|t| t.completed)
            .collect();
        assert!(completed.is_empty());
        store.toggle_task_completion("1");
        assert!(store.learning_tasks()[0].completed);
    }

    #[test]
    fn add_class_generates_distinct_ids() {
        let mut store = logged_in();
        let new_class = || NewClass {
            name: "Operating Systems".into(),
            instructor: "Dr. Smith".into(),
            students: vec![],
            schedule: vec![],
        };
        let a = store.add_class(new_class());
        let b = store.add_class(new_class());
        assert_ne!(a.id, b.id);
        assert_eq!(store.classes().len(), 6);
        assert_eq!(store.classes_taught_by("Dr. Smith").len(), 2);
    }

    #[test]
    fn qr_round_trip_through_store() {
        let store = AttendanceStore::new();
        assert!(store.validate_qr_code(&store.generate_student_qr("student3")));
        assert!(!store.validate_qr_code("{}"));
    }
}
