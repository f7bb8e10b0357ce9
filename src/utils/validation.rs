//! Utilidades de validación
//!
//! Validadores `custom` para los DTOs (`#[validate(custom = "...")]`).

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use validator::ValidationError;

/// Máximo de litros por FuelRequest
pub const MAX_FUEL_LITRES: i64 = 1000;

lazy_static! {
    static ref PLATE_REGEX: Regex = Regex::new(r"^[A-Z0-9-]{2,15}$").unwrap();
}

/// Matrícula canónica: sin espacios exteriores y en mayúsculas
pub fn normalize_plate(value: &str) -> String {
    value.trim().to_uppercase()
}

/// Validar que un string no esté vacío
pub fn validate_not_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_empty");
        error.message = Some("must not be blank".into());
        return Err(error);
    }
    Ok(())
}

/// Validar formato de teléfono (básico)
pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    let digits = value.chars().filter(|c| c.is_ascii_digit()).count();
    if !(7..=15).contains(&digits) {
        let mut error = ValidationError::new("phone");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar formato de matrícula de vehículo (tras normalizar)
pub fn validate_license_plate(value: &str) -> Result<(), ValidationError> {
    if !PLATE_REGEX.is_match(&normalize_plate(value)) {
        let mut error = ValidationError::new("license_plate");
        error.add_param("value".into(), &value.to_string());
        error.message = Some("2-15 characters among A-Z, 0-9 and '-'".into());
        return Err(error);
    }
    Ok(())
}

/// Litros de combustible: mayor que cero y dentro del máximo
pub fn validate_fuel_quantity(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO || *value > Decimal::from(MAX_FUEL_LITRES) {
        let mut error = ValidationError::new("range");
        error.add_param("min_exclusive".into(), &0);
        error.add_param("max".into(), &MAX_FUEL_LITRES);
        error.add_param("actual".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar que un importe sea no negativo
pub fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut error = ValidationError::new("non_negative");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_license_plate() {
        assert!(validate_license_plate("ab-123-cd").is_ok());
        assert!(validate_license_plate(" V1 ").is_ok());
        assert!(validate_license_plate("A").is_err());
        assert!(validate_license_plate("AB 123").is_err());
        assert!(validate_license_plate(&"A".repeat(16)).is_err());
        assert_eq!(normalize_plate(" ab-12 "), "AB-12");
    }

    #[test]
    fn test_validate_fuel_quantity() {
        assert!(validate_fuel_quantity(&Decimal::new(20, 0)).is_ok());
        assert!(validate_fuel_quantity(&Decimal::new(1000, 0)).is_ok());
        assert!(validate_fuel_quantity(&Decimal::ZERO).is_err());
        assert!(validate_fuel_quantity(&Decimal::new(-5, 0)).is_err());
        assert!(validate_fuel_quantity(&Decimal::new(10001, 1)).is_err());
    }

    #[test]
    fn test_validate_non_negative() {
        assert!(validate_non_negative(&Decimal::ZERO).is_ok());
        assert!(validate_non_negative(&Decimal::new(1999, 2)).is_ok());
        assert!(validate_non_negative(&Decimal::new(-1, 2)).is_err());
    }

    #[test]
    fn test_validate_not_empty_and_phone() {
        assert!(validate_not_empty("trip").is_ok());
        assert!(validate_not_empty("   ").is_err());
        assert!(validate_phone("+33 6 12 34 56 78").is_ok());
        assert!(validate_phone("123").is_err());
    }
}
