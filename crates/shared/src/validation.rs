//! Common validation utilities.

use validator::ValidationError;

/// Longest point identifier accepted (matches the `point_id` column width).
pub const MAX_POINT_ID_LENGTH: usize = 32;

lazy_static::lazy_static! {
    /// Allowed point identifier shape: starts alphanumeric, then `[A-Za-z0-9_.-]`.
    pub static ref POINT_ID_REGEX: regex::Regex =
        regex::Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").unwrap();
}

fn range_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Validates that a latitude value is within valid range (-90 to 90).
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        Err(range_error(
            "latitude_range",
            "Latitude must be between -90 and 90",
        ))
    }
}

/// Validates that a longitude value is within valid range (-180 to 180).
pub fn validate_longitude(lon: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        Err(range_error(
            "longitude_range",
            "Longitude must be between -180 and 180",
        ))
    }
}

/// Validates soil temperature in degrees Celsius (0 to 100).
pub fn validate_temperature(value: f64) -> Result<(), ValidationError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(range_error(
            "temperature_range",
            "Temperature must be between 0 and 100",
        ))
    }
}

/// Validates soil moisture percentage (0 to 100).
pub fn validate_moisture(value: f64) -> Result<(), ValidationError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(range_error(
            "moisture_range",
            "Moisture must be between 0 and 100",
        ))
    }
}

/// Validates soil pH (0 to 14).
pub fn validate_ph(value: f64) -> Result<(), ValidationError> {
    if (0.0..=14.0).contains(&value) {
        Ok(())
    } else {
        Err(range_error("ph_range", "pH must be between 0 and 14"))
    }
}

/// Validates that a nutrient reading (N, P or K) is non-negative.
///
/// The upper bound is deployment-specific and checked by the domain layer.
pub fn validate_nutrient(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(range_error(
            "nutrient_range",
            "Nutrient values must be non-negative",
        ))
    }
}

/// Validates a single point identifier such as `A1` or `P003`.
pub fn validate_point_id(point_id: &str) -> Result<(), ValidationError> {
    if point_id.is_empty() || point_id.len() > MAX_POINT_ID_LENGTH {
        return Err(range_error(
            "point_id_length",
            "Point ID must be 1-32 characters",
        ));
    }
    if !POINT_ID_REGEX.is_match(point_id) {
        return Err(range_error(
            "point_id_format",
            "Point ID may only contain letters, digits, '_', '.' and '-'",
        ));
    }
    Ok(())
}

/// Validates every entry of an explicit point identifier list.
pub fn validate_point_ids(point_ids: &[String]) -> Result<(), ValidationError> {
    if point_ids.is_empty() {
        return Err(range_error(
            "point_ids_empty",
            "At least one point ID is required",
        ));
    }
    point_ids.iter().try_for_each(|id| validate_point_id(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_latitude() {
        assert!(validate_latitude(0.0).is_ok());
        assert!(validate_latitude(90.0).is_ok());
        assert!(validate_latitude(-90.0).is_ok());
        assert!(validate_latitude(90.1).is_err());
        assert!(validate_latitude(-90.1).is_err());
    }

    #[test]
    fn test_validate_longitude() {
        assert!(validate_longitude(0.0).is_ok());
        assert!(validate_longitude(180.0).is_ok());
        assert!(validate_longitude(-180.0).is_ok());
        assert!(validate_longitude(180.1).is_err());
    }

    #[test]
    fn test_validate_longitude_error_message() {
        let err = validate_longitude(200.0).unwrap_err();
        assert_eq!(
            err.message.unwrap().to_string(),
            "Longitude must be between -180 and 180"
        );
    }

    #[test]
    fn test_validate_temperature() {
        assert!(validate_temperature(0.0).is_ok());
        assert!(validate_temperature(25.5).is_ok());
        assert!(validate_temperature(100.0).is_ok());
        assert!(validate_temperature(-1.0).is_err());
        assert!(validate_temperature(100.01).is_err());
    }

    #[test]
    fn test_validate_moisture() {
        assert!(validate_moisture(30.0).is_ok());
        assert!(validate_moisture(-0.5).is_err());
        assert!(validate_moisture(101.0).is_err());
    }

    #[test]
    fn test_validate_ph() {
        assert!(validate_ph(6.5).is_ok());
        assert!(validate_ph(14.0).is_ok());
        assert!(validate_ph(14.1).is_err());
        assert!(validate_ph(-1.0).is_err());
    }

    #[test]
    fn test_validate_ph_error_message() {
        let err = validate_ph(20.0).unwrap_err();
        assert_eq!(err.message.unwrap().to_string(), "pH must be between 0 and 14");
    }

    #[test]
    fn test_validate_nutrient() {
        assert!(validate_nutrient(0.0).is_ok());
        assert!(validate_nutrient(9999.0).is_ok());
        assert!(validate_nutrient(-1.0).is_err());
        assert!(validate_nutrient(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_point_id() {
        assert!(validate_point_id("A1").is_ok());
        assert!(validate_point_id("P003").is_ok());
        assert!(validate_point_id("row-2_col.5").is_ok());
        assert!(validate_point_id("").is_err());
        assert!(validate_point_id("-A1").is_err());
        assert!(validate_point_id("A 1").is_err());
        assert!(validate_point_id(&"X".repeat(33)).is_err());
    }

    #[test]
    fn test_validate_point_ids() {
        assert!(validate_point_ids(&["A1".to_string(), "A2".to_string()]).is_ok());
        assert!(validate_point_ids(&[]).is_err());
        assert!(validate_point_ids(&["A1".to_string(), "bad id".to_string()]).is_err());
    }
}
