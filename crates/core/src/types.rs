/// Annotation identifiers are assigned by the identification service.
pub type AnnotationId = i64;

/// Sessions are addressed by an opaque service-issued string.
pub type SessionId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Convert the service's epoch-seconds float into a UTC timestamp.
///
/// Returns `None` for non-finite or out-of-range values.
pub fn epoch_to_timestamp(secs: f64) -> Option<Timestamp> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1_000_000_000.0).round() as u32;
    chrono::DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
}
