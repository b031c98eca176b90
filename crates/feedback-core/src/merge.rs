//! Option merging.
//!
//! Combines the checked predefined options with the free-form text into the
//! single string a caller receives. This is the one business rule a caller
//! must be able to predict:
//!
//! - selections are joined with `"; "` into one part
//! - trimmed free text, if non-empty, is a second part
//! - parts are joined with a blank line (`"\n\n"`)
//! - no parts yields the empty string

/// Separator between selected options.
pub const SELECTION_SEPARATOR: &str = "; ";

/// Separator between the selection group and the free text.
pub const PART_SEPARATOR: &str = "\n\n";

/// Merge selected options and free text into one feedback string.
///
/// `selected` must already be in original option order, not click order.
pub fn merge<S: AsRef<str>>(selected: &[S], free_text: &str) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(2);

    if !selected.is_empty() {
        let labels: Vec<&str> = selected.iter().map(AsRef::as_ref).collect();
        parts.push(labels.join(SELECTION_SEPARATOR));
    }

    let free_text = free_text.trim();
    if !free_text.is_empty() {
        parts.push(free_text.to_string());
    }

    parts.join(PART_SEPARATOR)
}

/// Pick the checked options, preserving the order of `options`.
///
/// Missing entries in `checked` count as unchecked.
pub fn selected_options<'a>(options: &'a [String], checked: &[bool]) -> Vec<&'a str> {
    options
        .iter()
        .zip(checked.iter().chain(std::iter::repeat(&false)))
        .filter(|(_, is_checked)| **is_checked)
        .map(|(option, _)| option.as_str())
        .collect()
}
