//! Fixed demo data handed to every fresh session.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::models::{
    AttendanceMethod, AttendanceRecord, AttendanceStatus, Class, DayOfWeek, LearningTask,
    Priority, ScheduleSlot, Student, User,
};

pub struct Seed {
    pub classes: Vec<Class>,
    pub attendance: Vec<AttendanceRecord>,
    pub students: Vec<Student>,
    pub tasks: Vec<LearningTask>,
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("seed dates are valid")
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).expect("seed times are valid")
}

fn weekly(days: &[DayOfWeek], start: (u32, u32), end: (u32, u32), room: &str) -> Vec<ScheduleSlot> {
    days.iter()
        .map(|&day| ScheduleSlot {
            day,
            start_time: time(start.0, start.1),
            end_time: time(end.0, end.1),
            room: room.to_string(),
        })
        .collect()
}

fn roster(user: &User, others: &[&str]) -> Vec<String> {
    std::iter::once(user.id.clone())
        .chain(others.iter().map(|s| s.to_string()))
        .collect()
}

pub fn demo_data(user: &User, now: DateTime<Utc>) -> Seed {
    use DayOfWeek::*;

    let classes = vec![
        Class {
            id: "1".into(),
            name: "Computer Science Fundamentals".into(),
            instructor: "Dr. Johnson".into(),
            students: roster(user, &["student2", "student3", "student4", "student5"]),
            schedule: weekly(&[Monday, Wednesday, Friday], (9, 0), (10, 30), "CS-101"),
        },
        Class {
            id: "2".into(),
            name: "Data Structures & Algorithms".into(),
            instructor: "Prof. Williams".into(),
            students: roster(user, &["student2", "student3", "student6"]),
            schedule: weekly(&[Tuesday, Thursday], (11, 0), (12, 30), "CS-102"),
        },
        Class {
            id: "3".into(),
            name: "Database Management Systems".into(),
            instructor: "Dr. Brown".into(),
            students: roster(user, &["student4", "student5", "student7"]),
            schedule: weekly(&[Monday, Wednesday], (14, 0), (15, 30), "CS-103"),
        },
        Class {
            id: "4".into(),
            name: "Web Development".into(),
            instructor: "Ms. Davis".into(),
            students: roster(user, &["student3", "student6", "student8"]),
            schedule: weekly(&[Tuesday, Friday], (13, 0), (14, 30), "CS-104"),
        },
    ];

    let history = [
        ("1", "1", day(2025, 9, 16), AttendanceStatus::Present),
        ("2", "2", day(2025, 9, 17), AttendanceStatus::Present),
        ("3", "3", day(2025, 9, 16), AttendanceStatus::Late),
        ("4", "4", day(2025, 9, 17), AttendanceStatus::Present),
        ("5", "1", day(2025, 9, 18), AttendanceStatus::Present),
        ("6", "3", day(2025, 9, 18), AttendanceStatus::Absent),
    ];
    let attendance = history
        .iter()
        .map(|&(id, class_id, date, status)| AttendanceRecord {
            id: id.into(),
            student_id: user.id.clone(),
            class_id: class_id.into(),
            date,
            status,
            method: AttendanceMethod::Manual,
            timestamp: now,
            qr_payload: None,
            device_info: None,
        })
        .collect();

    let mut students = vec![Student {
        id: user.id.clone(),
        name: user.name.clone(),
        student_id: "S001".into(),
    }];
    let others = [
        ("student2", "Alice Johnson", "S002"),
        ("student3", "Bob Smith", "S003"),
        ("student4", "Carol Lee", "S004"),
        ("student5", "David Kim", "S005"),
        ("student6", "Eva Green", "S006"),
        ("student7", "Frank Young", "S007"),
        ("student8", "Grace Hall", "S008"),
    ];
    students.extend(others.iter().map(|&(id, name, code)| Student {
        id: id.into(),
        name: name.into(),
        student_id: code.into(),
    }));

    let tasks = vec![
        task(
            "1",
            "Complete Algorithm Assignment",
            "Data Structures & Algorithms",
            day(2025, 9, 22),
            false,
            Priority::High,
        ),
        task(
            "2",
            "Database Design Project",
            "Database Management Systems",
            day(2025, 9, 25),
            false,
            Priority::Medium,
        ),
        task(
            "3",
            "React Component Practice",
            "Web Development",
            day(2025, 9, 20),
            true,
            Priority::Medium,
        ),
        task(
            "4",
            "CS Fundamentals Quiz Preparation",
            "Computer Science Fundamentals",
            day(2025, 9, 21),
            false,
            Priority::High,
        ),
        task(
            "5",
            "Study SQL Joins",
            "Database Management Systems",
            day(2025, 9, 23),
            false,
            Priority::Low,
        ),
    ];

    Seed {
        classes,
        attendance,
        students,
        tasks,
    }
}

fn task(
    id: &str,
    title: &str,
    subject: &str,
    due_date: NaiveDate,
    completed: bool,
    priority: Priority,
) -> LearningTask {
    LearningTask {
        id: id.into(),
        title: title.into(),
        subject: subject.into(),
        due_date,
        completed,
        priority,
    }
}
