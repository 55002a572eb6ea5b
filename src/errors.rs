//! Errors and error-related utilities.

use std::{error, fmt, result};

/// The result type used throughout this library.
pub type Result<T> = result::Result<T, Box<dyn error::Error>>;

/// The table could not be obtained: unreachable source, unparsable file,
/// or no file at all.
#[derive(Debug)]
pub struct LoadError(pub String);

/// The requested dimensions, measure, or filter do not fit the loaded table.
#[derive(Debug)]
pub struct ConfigurationError(pub String);

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "cannot load table: {}", self.0)
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid configuration: {}", self.0)
    }
}

impl error::Error for LoadError {}

impl error::Error for ConfigurationError {}

/// A helper for constructing [LoadError].
pub fn load_error(s: String) -> Box<dyn error::Error> {
    LoadError(s).into()
}

/// A helper for constructing [LoadError].
pub fn load_error_ref(s: &str) -> Box<dyn error::Error> {
    LoadError(s.to_owned()).into()
}

/// A helper for constructing [ConfigurationError].
pub fn configuration_error(s: String) -> Box<dyn error::Error> {
    ConfigurationError(s).into()
}

/// A helper for constructing [ConfigurationError].
pub fn configuration_error_ref(s: &str) -> Box<dyn error::Error> {
    ConfigurationError(s.to_owned()).into()
}

/// Is this one of the errors that is reported to the user as a load failure?
pub fn is_load_error(e: &(dyn error::Error + 'static)) -> bool {
    e.downcast_ref::<LoadError>().is_some()
}

/// Is this one of the errors that is reported to the user as a bad selection?
pub fn is_configuration_error(e: &(dyn error::Error + 'static)) -> bool {
    e.downcast_ref::<ConfigurationError>().is_some()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_and_kind() {
        let e = load_error_ref("no such file");
        assert_eq!(format!("{e}"), "cannot load table: no such file");
        assert!(is_load_error(&*e));
        assert!(!is_configuration_error(&*e));
        let e = configuration_error(format!("unknown column '{}'", "x"));
        assert_eq!(format!("{e}"), "invalid configuration: unknown column 'x'");
        assert!(is_configuration_error(&*e));
    }
}
