//! Weekly calendar events and their iCalendar export
//!
//! Events are positioned by weekday within "the current week" rather than by
//! date; the encoder anchors them to a concrete Monday at export time.

mod delivery;
mod event;
mod fallback;
mod ics;

pub use delivery::{attachment_disposition, DeliveryError, FileDelivery, DEFAULT_FILENAME, MIME_TYPE};
pub use event::{CalendarEvent, WeekDay};
pub use fallback::fallback_week;
pub use ics::{escape_text, event_span, week_start, CalendarProfile, IcsEncoder, DEFAULT_TIMEZONE};
