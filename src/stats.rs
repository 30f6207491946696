use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use crate::models::{AttendanceRecord, AttendanceStatus, Class, DayOfWeek};
use crate::store::AttendanceStore;

/// Whole-number percentage, 0 when there is nothing to divide by.
pub fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u32
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceCounts {
    pub total: usize,
    pub present: usize,
    pub late: usize,
    pub absent: usize,
    pub percentage: u32,
}

impl AttendanceCounts {
    /// Percentage counts present records only. Late doesn't count.
    pub fn of<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a AttendanceRecord>,
    {
        let mut counts = AttendanceCounts::default();
        for record in records {
            counts.total += 1;
            match record.status {
                AttendanceStatus::Present => counts.present += 1,
                AttendanceStatus::Late => counts.late += 1,
                AttendanceStatus::Absent => counts.absent += 1,
            }
        }
        counts.percentage = percentage(counts.present, counts.total);
        counts
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassAttendance {
    pub class_id: String,
    pub class_name: String,
    pub stats: AttendanceCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentSummary {
    pub student_id: String,
    #[serde(flatten)]
    pub overall: AttendanceCounts,
    pub by_class: Vec<ClassAttendance>,
}

pub fn student_summary(store: &AttendanceStore, student_id: &str) -> StudentSummary {
    let records = store.get_attendance_by_student(student_id);
    let by_class = store
        .classes_for_student(student_id)
        .into_iter()
        .map(|class| ClassAttendance {
            class_id: class.id.clone(),
            class_name: class.name.clone(),
            stats: AttendanceCounts::of(records.iter().filter(|r| r.class_id == class.id)),
        })
        .collect();

    StudentSummary {
        student_id: student_id.to_string(),
        overall: AttendanceCounts::of(&records),
        by_class,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassDayStats {
    pub class_id: String,
    pub date: NaiveDate,
    pub total_students: usize,
    pub present: usize,
    pub late: usize,
    pub absent: usize,
    pub percentage: u32,
}

/// Anyone on the roster without a present or late record that day counts
/// as absent.
pub fn class_day_stats(
    class: &Class,
    records: &[AttendanceRecord],
    date: NaiveDate,
) -> ClassDayStats {
    let on_day = || {
        records
            .iter()
            .filter(move |r| r.class_id == class.id && r.date == date)
    };
    let present = on_day()
        .filter(|r| r.status == AttendanceStatus::Present)
        .count();
    let late = on_day()
        .filter(|r| r.status == AttendanceStatus::Late)
        .count();
    let total_students = class.students.len();

    ClassDayStats {
        class_id: class.id.clone(),
        date,
        total_students,
        present,
        late,
        absent: total_students.saturating_sub(present + late),
        percentage: percentage(present + late, total_students),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledClass {
    pub id: String,
    pub name: String,
    pub instructor: String,
    #[serde(with = "crate::models::hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "crate::models::hhmm")]
    pub end_time: NaiveTime,
    pub room: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleDay {
    pub day: DayOfWeek,
    pub classes: Vec<ScheduledClass>,
}

/// Monday through Sunday, each with the student's classes meeting that day
/// in start-time order.
pub fn weekly_schedule(store: &AttendanceStore, student_id: &str) -> Vec<ScheduleDay> {
    let classes = store.classes_for_student(student_id);
    DayOfWeek::WEEK
        .iter()
        .map(|&day| {
            let mut today: Vec<ScheduledClass> = classes
                .iter()
                .filter_map(|class| {
                    class.slot_on(day).map(|slot| ScheduledClass {
                        id: class.id.clone(),
                        name: class.name.clone(),
                        instructor: class.instructor.clone(),
                        start_time: slot.start_time,
                        end_time: slot.end_time,
                        room: slot.room.clone(),
                    })
                })
                .collect();
            today.sort_by_key(|c| c.start_time);
            ScheduleDay { day, classes: today }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LoginCredentials, MarkAttendance};

    fn store() -> (AttendanceStore, String) {
        let mut store = AttendanceStore::new();
        assert!(store.login(&LoginCredentials {
            email: "student@test.com".into(),
            password: "pw".into(),
            role: None,
        }));
        let id = store.current_user().unwrap().id.clone();
        (store, id)
    }

    #[test]
    fn percentage_rounds_and_handles_zero() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(4, 4), 100);
    }

    #[test]
    fn student_summary_over_seed() {
        let (store, id) = store();
        let summary = student_summary(&store, &id);
        assert_eq!(
            summary.overall,
            AttendanceCounts {
                total: 6,
                present: 4,
                late: 1,
                absent: 1,
                percentage: 67
            }
        );
        assert_eq!(summary.by_class.len(), 4);
        let dbms = summary.by_class.iter().find(|c| c.class_id == "3").unwrap();
        assert_eq!(dbms.stats.total, 2);
        assert_eq!(dbms.stats.present, 0);
        assert_eq!(dbms.stats.percentage, 0);
    }

    #[test]
    fn class_day_stats_counts_absent_from_roster() {
        let (mut store, id) = store();
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let mut late = MarkAttendance::new("student2", "1", AttendanceStatus::Late);
        late.date = Some(date);
        let mut present = MarkAttendance::new(id, "1", AttendanceStatus::Present);
        present.date = Some(date);
        store.mark_attendance(late);
        store.mark_attendance(present);

        let class = store.find_class("1").unwrap();
        let stats = class_day_stats(class, store.attendance_records(), date);
        assert_eq!(stats.total_students, 5);
        assert_eq!(stats.present, 1);
        assert_eq!(stats.late, 1);
        assert_eq!(stats.absent, 3);
        assert_eq!(stats.percentage, 40);
    }

    #[test]
    fn weekly_schedule_sorted_by_start() {
        let (store, id) = store();
        let week = weekly_schedule(&store, &id);
        assert_eq!(week.len(), 7);
        let monday: Vec<_> = week[0].classes.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(monday, vec!["1", "3"]);
        let friday: Vec<_> = week[4].classes.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(friday, vec!["1", "4"]);
        assert!(week[5].classes.is_empty());
        assert!(week[6].classes.is_empty());
    }

    #[test]
    fn weekly_schedule_respects_enrollment() {
        let (store, _) = store();
        let week = weekly_schedule(&store, "student7");
        let ids: Vec<_> = week
            .iter()
            .flat_map(|d| d.classes.iter().map(|c| c.id.clone()))
            .collect();
        assert_eq!(ids, vec!["3", "3"]);
    }
}
