use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for validating department tags
    /// Letters, digits, hyphens and underscores, starting with a letter or digit
    /// - Valid: "HQ", "finance", "r-and-d", "ops_2"
    /// - Invalid: "-ops", "sales dept", "", "a/b"
    pub static ref DEPARTMENT_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{0,63}$").unwrap();
}
