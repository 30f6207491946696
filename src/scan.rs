use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;

use crate::err::Error;
use crate::models::{AttendanceMethod, AttendanceStatus, Class, DayOfWeek, MarkAttendance};
use crate::qr;
use crate::stats::percentage;
use crate::store::AttendanceStore;

pub const CSV_HEADER: [&str; 5] = ["Student ID", "Name", "Status", "Scan Time", "Date"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedStudent {
    pub id: String,
    pub name: String,
    pub student_id: String,
    pub scan_time: NaiveTime,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScanOutcome {
    Marked { student: ScannedStudent },
    AlreadyScanned { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub scanned: usize,
    pub late: usize,
    pub total: usize,
    pub percentage: u32,
}

/// A faculty member's live scanning run for one class.
#[derive(Debug, Clone)]
pub struct ScanSession {
    class_id: String,
    grace: Duration,
    scanned: Vec<ScannedStudent>,
}

/// Late once the class has been running longer than `grace` today. A class
/// with no slot today is never late, and neither is one whose grace period
/// runs past midnight.
pub fn is_late<Tz: TimeZone>(class: &Class, now: &DateTime<Tz>, grace: Duration) -> bool {
    let today = DayOfWeek::from(now.weekday());
    match class.slot_on(today) {
        Some(slot) => {
            let (deadline, wrapped) = slot.start_time.overflowing_add_signed(grace);
            wrapped == 0 && now.time() > deadline
        }
        None => false,
    }
}

impl ScanSession {
    pub fn start<S: Into<String>>(class_id: S, grace: Duration) -> Self {
        Self {
            class_id: class_id.into(),
            grace,
            scanned: Vec::new(),
        }
    }

    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    pub fn scanned(&self) -> &[ScannedStudent] {
        &self.scanned
    }

    pub fn is_scanned(&self, student_id: &str) -> bool {
        self.scanned.iter().any(|s| s.id == student_id)
    }

    pub fn reset(&mut self) {
        self.scanned.clear();
    }

    /// Checks a raw payload against the roster and marks the student. A
    /// repeat scan within the session is reported but changes nothing.
    ///
    /// `now` is the scanner's wall clock. It decides lateness and the shown
    /// scan time; the record itself is filed under the store's UTC date.
    pub fn scan<Tz: TimeZone>(
        &mut self,
        store: &mut AttendanceStore,
        raw: &str,
        now: DateTime<Tz>,
        device_info: serde_json::Value,
    ) -> Result<ScanOutcome, Error> {
        let payload = qr::parse_qr(raw).ok_or_else(|| Error::InvalidQrCode {
            message: "Invalid QR code format".to_string(),
        })?;
        let student = store
            .find_student(&payload.student_id)
            .cloned()
            .ok_or_else(|| Error::StudentNotFound {
                message: "Student not found in system".to_string(),
            })?;
        let class = store.find_class(&self.class_id).ok_or_else(|| Error::ClassNotFound {
            message: format!("Class `{}` does not exist!", self.class_id),
        })?;
        if !class.is_enrolled(&student.id) {
            return Err(Error::NotEnrolled {
                message: "Student not enrolled in this class".to_string(),
            });
        }
        if self.is_scanned(&student.id) {
            log::debug!("{} scanned twice in class {}", student.id, self.class_id);
            return Ok(ScanOutcome::AlreadyScanned {
                message: format!("{} has already been scanned", student.name),
            });
        }

        let status = if is_late(class, &now, self.grace) {
            AttendanceStatus::Late
        } else {
            AttendanceStatus::Present
        };

        let mut input = MarkAttendance::new(student.id.clone(), self.class_id.clone(), status);
        input.method = Some(AttendanceMethod::Qr);
        input.qr_payload = Some(payload);
        input.device_info = Some(device_info);
        let record = store.mark_attendance_at(input, now.with_timezone(&Utc));

        let scanned = ScannedStudent {
            id: student.id,
            name: student.name,
            student_id: student.student_id,
            scan_time: now.time(),
            date: record.date,
            status,
        };
        log::info!("{} marked as {}", scanned.name, status.as_str());
        self.scanned.push(scanned.clone());
        Ok(ScanOutcome::Marked { student: scanned })
    }

    pub fn stats(&self, store: &AttendanceStore) -> ScanStats {
        let total = store
            .find_class(&self.class_id)
            .map(|c| c.students.len())
            .unwrap_or(0);
        let scanned = self.scanned.len();
        ScanStats {
            scanned,
            late: self
                .scanned
                .iter()
                .filter(|s| s.status == AttendanceStatus::Late)
                .count(),
            total,
            percentage: percentage(scanned, total),
        }
    }

    pub fn export_csv(&self) -> Result<String, Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(CSV_HEADER)?;
        for student in &self.scanned {
            let scan_time = student.scan_time.format("%H:%M:%S").to_string();
            let date = student.date.format("%Y-%m-%d").to_string();
            writer.write_record([
                student.student_id.as_str(),
                student.name.as_str(),
                student.status.as_str(),
                scan_time.as_str(),
                date.as_str(),
            ])?;
        }
        let bytes = writer.into_inner().map_err(|e| Error::InternalError {
            kind: "CsvError",
            message: e.to_string(),
        })?;
        String::from_utf8(bytes).map_err(|e| Error::InternalError {
            kind: "CsvError",
            message: e.to_string(),
        })
    }
}

/// Download name for an export. Quotes, backslashes and control characters
/// are replaced so the name fits inside a quoted header parameter.
pub fn export_file_name(class: &Class, date: NaiveDate) -> String {
    let name: String = class
        .name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("{}_attendance_{}.csv", name, date.format("%Y-%m-%d"))
}
