//! Data models for attendance check-ins.
//!
//! - `CheckIn`: raw form input
//! - `NewRecord`: a stamped check-in on its way to a remote store
//! - `PersistedRecord`: a row as a remote store returns it
//! - `AttendanceRecord`: a confirmed check-in held by the directory

pub mod record;

pub use record::{
    normalize_course, normalize_photo, today_display, AttendanceRecord, CheckIn, NewRecord,
    PersistedRecord, COURSE_NOT_INFORMED, LOCAL_ID_PREFIX, DATE_FORMAT, TIME_FORMAT,
};
