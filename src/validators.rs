//! Field validators shared by the input forms.
//!
//! Each validator returns a [`validator::ValidationError`] so it can be
//! attached with `#[validate(custom(...))]` or called directly from a
//! form's cross-field checks.

use std::borrow::Cow;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use uuid::Uuid;
use validator::ValidationError;

/// Earliest accepted pet date of birth.
pub const MIN_DATE_OF_BIRTH: NaiveDate = match NaiveDate::from_ymd_opt(1920, 1, 1) {
    Some(date) => date,
    None => panic!("invalid minimum date of birth"),
};

fn error(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

/// Letters are the Unicode `L*` categories only; letter numbers such as "Ⅻ"
/// and combining marks do not count.
static LETTERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\p{L}*$").expect("letters pattern is valid"));

/// Bytes in one megabyte of upload limit.
const BYTES_PER_MB: u64 = 1024 * 1024;

/// Rejects any value containing a non-letter character.
///
/// The empty string passes; length is checked separately.
pub fn only_letters(value: &str) -> Result<(), ValidationError> {
    if LETTERS.is_match(value) {
        Ok(())
    } else {
        Err(error("only_letters", "Value must contain only letters"))
    }
}

/// `limit_mb` in bytes, saturating at `u64::MAX`.
pub fn megabytes(limit_mb: u64) -> u64 {
    limit_mb.saturating_mul(BYTES_PER_MB)
}

/// The error for an upload over `limit_mb`, also used when the body limit
/// cuts the upload short before the file is fully read.
pub fn file_too_large(limit_mb: u64) -> ValidationError {
    error("max_file_size", format!("Max file size is {limit_mb}MB"))
}

/// Builds a validator rejecting uploads larger than `limit_mb` megabytes.
pub fn max_file_size(limit_mb: u64) -> impl Fn(&[u8]) -> Result<(), ValidationError> {
    let limit_bytes = megabytes(limit_mb);
    move |content: &[u8]| {
        if content.len() as u64 > limit_bytes {
            Err(file_too_large(limit_mb))
        } else {
            Ok(())
        }
    }
}

/// Accepts dates in `[1920-01-01, today]`, both ends inclusive.
pub fn date_of_birth_in_range(value: NaiveDate, today: NaiveDate) -> Result<(), ValidationError> {
    if value < MIN_DATE_OF_BIRTH || value > today {
        return Err(error(
            "date_of_birth_range",
            format!("Date of birth must be between {MIN_DATE_OF_BIRTH} and {today}"),
        ));
    }
    Ok(())
}

/// A photo must tag at least one pet.
pub fn at_least_one_pet(tagged_pets: &[Uuid]) -> Result<(), ValidationError> {
    if tagged_pets.is_empty() {
        return Err(error("at_least_one_pet", "Tag at least one pet"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn only_letters_accepts_unicode_letters_and_empty() {
        assert!(only_letters("").is_ok());
        assert!(only_letters("Al").is_ok());
        assert!(only_letters("Zoë").is_ok());
        assert!(only_letters("Иван").is_ok());
    }

    #[test]
    fn only_letters_rejects_digits_spaces_and_punctuation() {
        for value in ["A1", "Mary Ann", "O'Neil", "Jean-Luc", " ", "Ⅻ", "\u{915}\u{93F}"] {
            let err = only_letters(value).unwrap_err();
            assert_eq!(err.code, "only_letters");
        }
    }

    #[test]
    fn max_file_size_boundary() {
        let check = max_file_size(1);
        assert!(check(vec![0u8; 1024 * 1024].as_slice()).is_ok());
        let err = check(vec![0u8; 1024 * 1024 + 1].as_slice()).unwrap_err();
        assert_eq!(err.message.as_deref(), Some("Max file size is 1MB"));
        assert!(max_file_size(0)(&[][..]).is_ok());
        assert!(max_file_size(u64::MAX)(&[0u8; 16][..]).is_ok());
        assert_eq!(megabytes(u64::MAX), u64::MAX);
    }

    #[test]
    fn date_of_birth_range_is_inclusive() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert!(date_of_birth_in_range(MIN_DATE_OF_BIRTH, today).is_ok());
        assert!(date_of_birth_in_range(today, today).is_ok());
        assert!(date_of_birth_in_range(NaiveDate::from_ymd_opt(1919, 12, 31).unwrap(), today).is_err());
        assert!(date_of_birth_in_range(today.succ_opt().unwrap(), today).is_err());
    }

    #[test]
    fn empty_tag_set_is_rejected() {
        assert!(at_least_one_pet(&[]).is_err());
        assert!(at_least_one_pet(&[Uuid::new_v4()]).is_ok());
    }

    proptest! {
        #[test]
        fn letters_only_strings_pass(s in "\\p{L}{0,24}") {
            prop_assert!(only_letters(&s).is_ok());
        }

        #[test]
        fn any_non_letter_fails(
            head in "\\p{L}{0,12}",
            bad in "[\\p{N}\\p{M}\\p{P}\\p{Z}\\p{S}]",
            tail in "\\p{L}{0,12}",
        ) {
            let value = format!("{head}{bad}{tail}");
            prop_assert!(only_letters(&value).is_err());
        }

        #[test]
        fn date_range_matches_bounds(days in -40_000i64..40_000) {
            let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
            let date = today + chrono::Duration::days(days);
            let expected = date >= MIN_DATE_OF_BIRTH && date <= today;
            prop_assert_eq!(date_of_birth_in_range(date, today).is_ok(), expected);
        }
    }
}
