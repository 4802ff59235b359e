use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Course value stored when the submitter leaves the course blank.
pub const COURSE_NOT_INFORMED: &str = "Não informado";

/// Prefix of ids generated on this device for records not yet synced.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Date format used for the `date` field (pt-BR).
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Time format used for the `time` field (pt-BR).
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// What the submitter typed into the check-in form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckIn {
    pub full_name: String,
    pub registration: String,
    pub course: Option<String>,
    pub photo: Option<String>,
}

impl CheckIn {
    pub fn new(full_name: impl Into<String>, registration: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            registration: registration.into(),
            course: None,
            photo: None,
        }
    }

    pub fn with_course(mut self, course: impl Into<String>) -> Self {
        self.course = Some(course.into());
        self
    }

    pub fn with_photo(mut self, photo: impl Into<String>) -> Self {
        self.photo = Some(photo.into());
        self
    }
}

/// A check-in stamped with its submission instant, ready to hand to a
/// remote store. It has no id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub full_name: String,
    pub registration: String,
    pub course: String,
    pub photo: Option<String>,
    pub date: String,
    pub time: String,
    pub timestamp: DateTime<Utc>,
}

impl NewRecord {
    /// Trim and normalise a check-in and stamp it with `now`.
    ///
    /// Does not validate; the sync engine rejects blank names before this.
    pub fn stamp(input: &CheckIn, now: DateTime<Utc>) -> Self {
        let local = now.with_timezone(&Local);
        Self {
            full_name: input.full_name.trim().to_string(),
            registration: input.registration.trim().to_string(),
            course: normalize_course(input.course.as_deref()),
            photo: normalize_photo(input.photo.clone()),
            date: local.format(DATE_FORMAT).to_string(),
            time: local.format(TIME_FORMAT).to_string(),
            timestamp: now,
        }
    }

    pub fn has_photo(&self) -> bool {
        self.photo.is_some()
    }

    /// Turn into a record after the remote store accepted it.
    pub fn into_record(self, id: String, created_at: Option<DateTime<Utc>>) -> AttendanceRecord {
        AttendanceRecord {
            id,
            full_name: self.full_name,
            registration: self.registration,
            course: self.course,
            photo: self.photo,
            date: self.date,
            time: self.time,
            timestamp: self.timestamp,
            created_at,
        }
    }
}

/// What a remote store hands back for a stored row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRecord {
    pub id: String,
    pub full_name: String,
    pub registration: String,
    pub course: String,
    pub photo: Option<String>,
    pub date: String,
    pub time: String,
    pub timestamp: DateTime<Utc>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<PersistedRecord> for AttendanceRecord {
    fn from(p: PersistedRecord) -> Self {
        AttendanceRecord {
            id: p.id,
            full_name: p.full_name,
            registration: p.registration,
            course: normalize_course(Some(&p.course)),
            photo: normalize_photo(p.photo),
            date: p.date,
            time: p.time,
            timestamp: p.timestamp,
            created_at: p.created_at,
        }
    }
}

/// One confirmed check-in.
///
/// `has_photo` is derived from `photo`; it is written out for readers of the
/// cache file and export but recomputed whenever a record is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredRecord", into = "StoredRecord")]
pub struct AttendanceRecord {
    pub id: String,
    pub full_name: String,
    pub registration: String,
    pub course: String,
    pub photo: Option<String>,
    pub date: String,
    pub time: String,
    pub timestamp: DateTime<Utc>,
    pub created_at: Option<DateTime<Utc>>,
}

impl AttendanceRecord {
    pub fn has_photo(&self) -> bool {
        self.photo.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// True when the record only exists on this device.
    pub fn is_local_only(&self) -> bool {
        self.id.starts_with(LOCAL_ID_PREFIX)
    }

    pub fn has_photo_display(&self) -> &'static str {
        if self.has_photo() {
            "Yes"
        } else {
            "No"
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    id: String,
    full_name: String,
    registration: String,
    #[serde(default)]
    course: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    photo: Option<String>,
    #[serde(default)]
    has_photo: bool,
    #[serde(default)]
    date: String,
    #[serde(default)]
    time: String,
    #[serde(default)]
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
}

impl From<StoredRecord> for AttendanceRecord {
    fn from(s: StoredRecord) -> Self {
        AttendanceRecord {
            id: s.id,
            full_name: s.full_name,
            registration: s.registration,
            course: normalize_course(Some(&s.course)),
            photo: normalize_photo(s.photo),
            date: s.date,
            time: s.time,
            timestamp: s.timestamp,
            created_at: s.created_at,
        }
    }
}

impl From<AttendanceRecord> for StoredRecord {
    fn from(r: AttendanceRecord) -> Self {
        let has_photo = r.has_photo();
        StoredRecord {
            id: r.id,
            full_name: r.full_name,
            registration: r.registration,
            course: r.course,
            photo: r.photo,
            has_photo,
            date: r.date,
            time: r.time,
            timestamp: r.timestamp,
            created_at: r.created_at,
        }
    }
}

pub fn normalize_course(course: Option<&str>) -> String {
    match course.map(str::trim) {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => COURSE_NOT_INFORMED.to_string(),
    }
}

pub fn normalize_photo(photo: Option<String>) -> Option<String> {
    photo.filter(|p| !p.trim().is_empty())
}

/// Today's date in the same format as [`AttendanceRecord::date`].
pub fn today_display() -> String {
    Local::now().format(DATE_FORMAT).to_string()
}
