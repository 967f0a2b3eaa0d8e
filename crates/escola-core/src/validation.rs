//! # Validation Module
//!
//! Input validation for classes, students, teachers and enrollment requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: API layer (outside this workspace)                           │
//! │  ├── Deserialization into NewClass / NewStudent / RequestForm          │
//! │  └── Authentication → Principal                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Trimming and normalization (emails lower-cased, blanks → None)    │
//! │  └── Field rules (lengths, characters, age window, capacity range)     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE class names and student emails                             │
//! │  ├── Foreign keys                                                      │
//! │  └── Capacity triggers                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Date rules take `today` as a parameter; this module never reads the
//! clock.
//!
//! ## Usage
//! ```rust
//! use escola_core::validation::{normalize_email, validate_capacity};
//!
//! assert!(validate_capacity(30).is_ok());
//! assert_eq!(
//!     normalize_email(Some("  Ana@Escola.COM ")).unwrap(),
//!     Some("ana@escola.com".to_string())
//! );
//! ```

use chrono::{Datelike, NaiveDate};
use validator::ValidateEmail;

use crate::error::ValidationError;
use crate::types::{NewStudent, NewTeacher, RequestForm, StudentUpdate, TeacherUpdate};
use crate::{
    MAX_CLASS_CAPACITY, MAX_CLASS_NAME_LEN, MAX_EMAIL_LEN, MAX_PHONE_LEN, MAX_SPECIALTY_LEN,
    MAX_STUDENT_AGE, MAX_STUDENT_NAME_LEN, MAX_TEACHER_NAME_LEN, MIN_CLASS_CAPACITY,
    MIN_CLASS_NAME_LEN, MIN_SPECIALTY_LEN, MIN_STUDENT_AGE, MIN_STUDENT_NAME_LEN,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Class Validators
// =============================================================================

/// Validates a class name and returns it trimmed.
///
/// ## Rules
/// - 2 to 100 characters after trimming
///
/// ## Example
/// ```rust
/// use escola_core::validation::validate_class_name;
///
/// assert_eq!(validate_class_name(" 1º Ano A ").unwrap(), "1º Ano A");
/// assert!(validate_class_name("A").is_err());
/// ```
pub fn validate_class_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();
    check_length("name", name, MIN_CLASS_NAME_LEN, MAX_CLASS_NAME_LEN)?;
    Ok(name.to_string())
}

/// Validates a class capacity.
///
/// ## Rules
/// - Between 1 and 50 seats inclusive
pub fn validate_capacity(capacity: i64) -> ValidationResult<()> {
    if !(MIN_CLASS_CAPACITY..=MAX_CLASS_CAPACITY).contains(&capacity) {
        return Err(ValidationError::OutOfRange {
            field: "capacity".to_string(),
            min: MIN_CLASS_CAPACITY,
            max: MAX_CLASS_CAPACITY,
        });
    }

    Ok(())
}

// =============================================================================
// Student Validators
// =============================================================================

/// Validates a student name and returns it trimmed.
///
/// ## Rules
/// - 3 to 80 characters after trimming
/// - Letters (accented ones included), spaces, `'`, `-` and `.` only
///
/// ## Example
/// ```rust
/// use escola_core::validation::validate_student_name;
///
/// assert!(validate_student_name("João D'Ávila-Neto Jr.").is_ok());
/// assert!(validate_student_name("R2D2").is_err());
/// ```
pub fn validate_student_name(name: &str) -> ValidationResult<String> {
    check_person_name(name, MAX_STUDENT_NAME_LEN)
}

fn check_person_name(name: &str, max: usize) -> ValidationResult<String> {
    let name = name.trim();
    check_length("name", name, MIN_STUDENT_NAME_LEN, max)?;

    if !name
        .chars()
        .all(|c| c.is_alphabetic() || c.is_whitespace() || matches!(c, '\'' | '-' | '.'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "name".to_string(),
            reason: "must contain only letters, spaces, apostrophes, hyphens and periods"
                .to_string(),
        });
    }

    Ok(name.to_string())
}

/// Age in whole years on `today`.
///
/// A birthday later in the year than `today` has not been reached yet.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

/// Validates a birth date against `today`.
///
/// ## Rules
/// - Not in the future
/// - Age between 5 and 25 inclusive
///
/// ```text
/// birth_date > today?      → InFuture
/// age_on(...) not in 5..=25 → OutOfRange { field: "age" }
/// ```
pub fn validate_birth_date(birth_date: NaiveDate, today: NaiveDate) -> ValidationResult<()> {
    if birth_date > today {
        return Err(ValidationError::InFuture {
            field: "birth_date".to_string(),
        });
    }

    let age = age_on(birth_date, today);
    if !(MIN_STUDENT_AGE..=MAX_STUDENT_AGE).contains(&age) {
        return Err(ValidationError::OutOfRange {
            field: "age".to_string(),
            min: MIN_STUDENT_AGE as i64,
            max: MAX_STUDENT_AGE as i64,
        });
    }

    Ok(())
}

/// Trims and lower-cases an email; blank becomes `None`.
///
/// ## Rules
/// - At most 120 characters
/// - Passes `validator`'s address check (RFC 5321 shaped local part and
///   domain labels)
/// - `local@domain.tld`: the domain needs a TLD of at least two letters,
///   and the local part has no empty dot-separated segment
pub fn normalize_email(email: Option<&str>) -> ValidationResult<Option<String>> {
    let email = match email.map(|e| e.trim().to_lowercase()) {
        Some(e) if !e.is_empty() => e,
        _ => return Ok(None),
    };

    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: MAX_EMAIL_LEN,
        });
    }

    if !email.validate_email() || !has_dotted_parts(&email) {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@domain.tld".to_string(),
        });
    }

    Ok(Some(email))
}

fn has_dotted_parts(email: &str) -> bool {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    let Some((_, tld)) = domain.rsplit_once('.') else {
        return false;
    };

    local.split('.').all(|segment| !segment.is_empty())
        && tld.len() >= 2
        && tld.chars().all(|c| c.is_ascii_alphabetic())
}

/// Trims free text; blank becomes `None`.
pub fn normalize_optional_text(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Validates a search query and returns it trimmed.
///
/// An empty query means "no filter".
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "search".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Teacher Validators
// =============================================================================

/// Validates a teacher name: the student character rules, up to 100
/// characters.
pub fn validate_teacher_name(name: &str) -> ValidationResult<String> {
    check_person_name(name, MAX_TEACHER_NAME_LEN)
}

/// Validates a teaching specialty and returns it trimmed (2 to 100
/// characters).
pub fn validate_specialty(specialty: &str) -> ValidationResult<String> {
    let specialty = specialty.trim();
    check_length("specialty", specialty, MIN_SPECIALTY_LEN, MAX_SPECIALTY_LEN)?;
    Ok(specialty.to_string())
}

/// Trims a phone number; blank becomes `None`.
///
/// ## Rules
/// - At most 20 characters
/// - Digits, spaces, `+`, `-`, `(` and `)` only, with at least one digit
///
/// ```rust
/// use escola_core::validation::normalize_phone;
///
/// assert_eq!(
///     normalize_phone(Some(" +55 (11) 98765-4321 ")).unwrap().as_deref(),
///     Some("+55 (11) 98765-4321")
/// );
/// assert!(normalize_phone(Some("ramal 12")).is_err());
/// ```
pub fn normalize_phone(phone: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(phone) = normalize_optional_text(phone) else {
        return Ok(None);
    };

    if phone.chars().count() > MAX_PHONE_LEN {
        return Err(ValidationError::TooLong {
            field: "phone".to_string(),
            max: MAX_PHONE_LEN,
        });
    }

    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')'));
    if !allowed || !phone.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain digits, spaces, +, -, ( and ) only".to_string(),
        });
    }

    Ok(Some(phone))
}

/// A teacher's email is mandatory: blank is `Required`, not "no email".
fn required_email(email: &str) -> ValidationResult<String> {
    normalize_email(Some(email))?.ok_or_else(|| ValidationError::Required {
        field: "email".to_string(),
    })
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates and normalizes a direct student creation.
pub fn validate_new_student(input: &NewStudent, today: NaiveDate) -> ValidationResult<NewStudent> {
    let name = validate_student_name(&input.name)?;
    validate_birth_date(input.birth_date, today)?;
    let email = normalize_email(input.email.as_deref())?;

    Ok(NewStudent {
        name,
        birth_date: input.birth_date,
        email,
        status: input.status,
    })
}

/// Validates and normalizes a student edit.
///
/// A blank email stays `Some("")` so the caller can tell "clear" apart
/// from "leave untouched".
pub fn validate_student_update(
    input: &StudentUpdate,
    today: NaiveDate,
) -> ValidationResult<StudentUpdate> {
    let name = input
        .name
        .as_deref()
        .map(validate_student_name)
        .transpose()?;
    if let Some(birth_date) = input.birth_date {
        validate_birth_date(birth_date, today)?;
    }
    let email = match input.email.as_deref() {
        None => None,
        Some(raw) => Some(normalize_email(Some(raw))?.unwrap_or_default()),
    };

    Ok(StudentUpdate {
        name,
        birth_date: input.birth_date,
        email,
        status: input.status,
    })
}

/// Validates and normalizes an enrollment request form.
///
/// The same rules as a student apply; notes and desired class are trimmed
/// and blank values dropped.
pub fn validate_request_form(form: &RequestForm, today: NaiveDate) -> ValidationResult<RequestForm> {
    let student_name = validate_student_name(&form.student_name)?;
    validate_birth_date(form.birth_date, today)?;
    let email = normalize_email(form.email.as_deref())?;

    Ok(RequestForm {
        student_name,
        birth_date: form.birth_date,
        email,
        notes: normalize_optional_text(form.notes.as_deref()),
        desired_class_name: normalize_optional_text(form.desired_class_name.as_deref()),
    })
}

/// Validates and normalizes a teacher registration.
pub fn validate_new_teacher(input: &NewTeacher) -> ValidationResult<NewTeacher> {
    Ok(NewTeacher {
        name: validate_teacher_name(&input.name)?,
        email: required_email(&input.email)?,
        specialty: validate_specialty(&input.specialty)?,
        phone: normalize_phone(input.phone.as_deref())?,
        status: input.status,
    })
}

/// Validates and normalizes a teacher edit.
///
/// A blank phone stays `Some("")` (clear); a blank email is `Required`.
pub fn validate_teacher_update(input: &TeacherUpdate) -> ValidationResult<TeacherUpdate> {
    let phone = match input.phone.as_deref() {
        None => None,
        Some(raw) => Some(normalize_phone(Some(raw))?.unwrap_or_default()),
    };

    Ok(TeacherUpdate {
        name: input.name.as_deref().map(validate_teacher_name).transpose()?,
        email: input.email.as_deref().map(required_email).transpose()?,
        specialty: input.specialty.as_deref().map(validate_specialty).transpose()?,
        phone,
        status: input.status,
    })
}

// =============================================================================
// Helpers
// =============================================================================

fn check_length(field: &str, value: &str, min: usize, max: usize) -> ValidationResult<()> {
    let len = value.chars().count();

    if len == 0 {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if len < min {
        return Err(ValidationError::TooShort {
            field: field.to_string(),
            min,
        });
    }
    if len > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
