// Shared helpers for provider identifiers

/// Zero-pad a numeric station ID to the provider's fixed width
///
/// DWD publishes station IDs both padded ("00044") and bare ("44") depending
/// on the file. Comparisons and download file names always use the padded form.
///
/// # Examples
///
/// ```
/// use hydromet_extractor::utils::pad_station_id;
///
/// assert_eq!(pad_station_id("44", 5).unwrap(), "00044");
/// assert_eq!(pad_station_id("01048", 5).unwrap(), "01048");
/// assert!(pad_station_id("123456", 5).is_err());
/// ```
pub fn pad_station_id(value: &str, width: usize) -> Result<String, &'static str> {
    let digits = value.trim();

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err("station ID must consist of ASCII digits");
    }
    if digits.len() > width {
        return Err("station ID is longer than the provider's fixed width");
    }

    Ok(format!("{digits:0>width$}"))
}

/// Width of DWD station identifiers
pub const DWD_STATION_ID_WIDTH: usize = 5;
