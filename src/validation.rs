use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::ApiError,
    models::{
        AddRegionRequest, AddWalkRequest, RegisterRequest, UpdateRegionRequest, UpdateWalkRequest,
    },
};

/// Upper bound on a walk name.
pub const WALK_NAME_MAX: usize = 100;
/// Upper bound on a walk description.
pub const WALK_DESCRIPTION_MAX: usize = 1000;
/// Region codes are short mnemonics, 3 to 5 characters.
pub const REGION_CODE_MIN: usize = 3;
pub const REGION_CODE_MAX: usize = 5;
/// Upper bound on a region name.
pub const REGION_NAME_MAX: usize = 20;
/// Minimum accepted password length at registration.
pub const PASSWORD_MIN: usize = 6;

/// FieldError
///
/// One field-level validation message. Collected per request so the caller
/// sees every offending field at once, not just the first.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

fn finish(errors: Vec<FieldError>) -> Result<(), ApiError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

fn check_region_fields(code: &str, name: &str, errors: &mut Vec<FieldError>) {
    let code_len = code.chars().count();
    if !(REGION_CODE_MIN..=REGION_CODE_MAX).contains(&code_len) {
        errors.push(FieldError::new(
            "code",
            "Code must be between 3 and 5 characters",
        ));
    }
    if name.trim().is_empty() {
        errors.push(FieldError::new("name", "Name is required"));
    } else if name.chars().count() > REGION_NAME_MAX {
        errors.push(FieldError::new(
            "name",
            "Name has to be a maximum of 20 characters",
        ));
    }
}

fn check_walk_fields(
    name: &str,
    description: &str,
    length_in_km: f64,
    errors: &mut Vec<FieldError>,
) {
    if name.trim().is_empty() {
        errors.push(FieldError::new("name", "Name is required"));
    } else if name.chars().count() > WALK_NAME_MAX {
        errors.push(FieldError::new(
            "name",
            "Name has to be a maximum of 100 characters",
        ));
    }
    if description.trim().is_empty() {
        errors.push(FieldError::new("description", "Description is required"));
    } else if description.chars().count() > WALK_DESCRIPTION_MAX {
        errors.push(FieldError::new(
            "description",
            "Description has to be a maximum of 1000 characters",
        ));
    }
    if !length_in_km.is_finite() || length_in_km <= 0.0 {
        errors.push(FieldError::new(
            "length_in_km",
            "Length must be a positive number of kilometers",
        ));
    }
}

/// Validates a region creation payload against the documented bounds.
pub fn validate_add_region(req: &AddRegionRequest) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    check_region_fields(&req.code, &req.name, &mut errors);
    finish(errors)
}

/// Validates a region update payload. Same bounds as creation.
pub fn validate_update_region(req: &UpdateRegionRequest) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    check_region_fields(&req.code, &req.name, &mut errors);
    finish(errors)
}

/// Validates a walk creation payload against the documented bounds.
pub fn validate_add_walk(req: &AddWalkRequest) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    check_walk_fields(&req.name, &req.description, req.length_in_km, &mut errors);
    finish(errors)
}

/// Validates a walk update payload. Same bounds as creation.
pub fn validate_update_walk(req: &UpdateWalkRequest) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    check_walk_fields(&req.name, &req.description, req.length_in_km, &mut errors);
    finish(errors)
}

/// Validates a registration payload. The username doubles as an email address.
pub fn validate_register(req: &RegisterRequest) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    if req.username.trim().is_empty() {
        errors.push(FieldError::new("username", "Username is required"));
    } else if !req.username.contains('@') {
        errors.push(FieldError::new(
            "username",
            "Username must be an email address",
        ));
    }
    if req.password.chars().count() < PASSWORD_MIN {
        errors.push(FieldError::new(
            "password",
            "Password must be at least 6 characters long",
        ));
    }
    finish(errors)
}
