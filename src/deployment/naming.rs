//! Orchestrator-legal names derived from image references

/// Longest name the compiler will emit
pub const MAX_NAME_LEN: usize = 24;

/// Derive an object name and selector label from an image reference.
///
/// Every `/` and `.` becomes `-` and the result is cut to at most 24 bytes, on a
/// character boundary.
pub fn derive_name(reference: &str) -> String {
    let mut name = String::with_capacity(MAX_NAME_LEN);
    for c in reference.chars() {
        let c = if c == '/' || c == '.' { '-' } else { c };
        if name.len() + c.len_utf8() > MAX_NAME_LEN {
            break;
        }
        name.push(c);
    }
    name
}
