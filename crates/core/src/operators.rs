//! Fixed operator code allow-list.
//!
//! Codes map to operator identity labels recorded in `processed_by`. This
//! is an identity lookup, not a credential check.

/// Operator code to identity label pairs.
pub const OPERATOR_CODES: &[(&str, &str)] = &[
    ("gcc2024", "gcc_admin"),
    ("operator123", "main_operator"),
    ("admin2024", "system_admin"),
    ("restore_admin", "restore_operator"),
    ("conference_admin", "conference_admin"),
    ("itav_operator", "itav_admin"),
];

/// Resolve an operator code to its identity label.
pub fn operator_for_code(code: &str) -> Option<&'static str> {
    OPERATOR_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, id)| *id)
}
