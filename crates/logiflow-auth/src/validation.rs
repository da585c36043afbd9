//! Local registration form checks.
//!
//! Runs before any network call; a form that fails here never reaches the
//! auth service.

use validator::{Validate, ValidationError as FieldError};

use logiflow_entity::user::UserRole;

use crate::api::RegisterRequest;
use crate::error::ValidationError;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;
/// Minimum trimmed display-name length.
pub const MIN_NAME_LENGTH: usize = 3;

/// Number of Ecuadorian provinces; valid codes are `01..=24`.
const PROVINCE_COUNT: u32 = 24;

/// Sign-up form as entered by the user.
#[derive(Debug, Clone, Validate)]
pub struct RegistrationForm {
    /// National identity number.
    #[validate(custom(function = "validate_cedula"))]
    pub cedula: String,
    /// Display name; surrounding whitespace is ignored.
    #[validate(custom(function = "validate_name"))]
    pub nombre: String,
    /// Chosen password.
    #[validate(custom(function = "validate_password"))]
    pub password: String,
    /// Repeated password.
    #[validate(must_match(other = "password"))]
    pub confirm_password: String,
    /// Requested role.
    pub rol: UserRole,
}

impl RegistrationForm {
    /// Run every check and report the first failure in form order:
    /// cédula, password length, confirmation, name.
    pub fn check(&self) -> Result<(), ValidationError> {
        let Err(errors) = self.validate() else {
            return Ok(());
        };
        let fields = errors.field_errors();

        if fields.contains_key("cedula") {
            Err(ValidationError::InvalidCedula)
        } else if fields.contains_key("password") {
            Err(ValidationError::PasswordTooShort {
                min: MIN_PASSWORD_LENGTH,
            })
        } else if fields.contains_key("confirm_password") {
            Err(ValidationError::PasswordMismatch)
        } else {
            Err(ValidationError::NameTooShort {
                min: MIN_NAME_LENGTH,
            })
        }
    }

    /// Build the wire request. The name is sent trimmed.
    pub fn to_request(&self) -> RegisterRequest {
        RegisterRequest {
            cedula: self.cedula.clone(),
            nombre: self.nombre.trim().to_string(),
            password: self.password.clone(),
            rol: self.rol,
        }
    }
}

/// Ecuadorian cédula check: ten digits, a province code in `01..=24`, and a
/// modulo-10 verifier where digits at even positions are doubled.
pub fn is_valid_cedula(cedula: &str) -> bool {
    let Some(digits) = cedula
        .chars()
        .map(|c| c.to_digit(10))
        .collect::<Option<Vec<u32>>>()
    else {
        return false;
    };
    if digits.len() != 10 {
        return false;
    }

    let province = digits[0] * 10 + digits[1];
    if !(1..=PROVINCE_COUNT).contains(&province) {
        return false;
    }

    let sum: u32 = digits[..9]
        .iter()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 0 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();

    (10 - sum % 10) % 10 == digits[9]
}

fn validate_cedula(cedula: &str) -> Result<(), FieldError> {
    if is_valid_cedula(cedula) {
        Ok(())
    } else {
        Err(FieldError::new("cedula"))
    }
}

fn validate_password(password: &str) -> Result<(), FieldError> {
    if password.chars().count() >= MIN_PASSWORD_LENGTH {
        Ok(())
    } else {
        Err(FieldError::new("password_length"))
    }
}

fn validate_name(nombre: &str) -> Result<(), FieldError> {
    if nombre.trim().chars().count() >= MIN_NAME_LENGTH {
        Ok(())
    } else {
        Err(FieldError::new("name_length"))
    }
}
