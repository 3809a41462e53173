/// Sensor devices are addressed by the identifier the hub reports
/// (typically the trailing hex digits of the board's MAC address).
pub type DeviceId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
