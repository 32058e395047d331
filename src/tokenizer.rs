/// Minimum number of characters a token needs to take part in matching.
/// Single letters (initials) are dropped.
pub const MIN_TOKEN_CHARS: usize = 2;

/// Split a raw name into normalized tokens
///
/// Lower-cases the input, removes every character that is not a letter, digit
/// or whitespace, splits on whitespace runs and drops tokens shorter than
/// [`MIN_TOKEN_CHARS`].
///
/// # Arguments
/// * `raw` - Name as typed into a form or a spreadsheet cell
///
/// # Returns
/// * `Vec<String>` - Tokens in their original order, empty if nothing is usable
///
/// # Examples
/// ```
/// use tracker::tokenizer::tokenize;
///
/// assert_eq!(tokenize("Shivam K. Jha"), vec!["shivam", "jha"]);
/// assert!(tokenize("   ").is_empty());
/// ```
pub fn tokenize(raw: &str) -> Vec<String> {
    tokenize_with_min(raw, MIN_TOKEN_CHARS)
}

/// Same as [`tokenize`] with an explicit minimum token length.
pub fn tokenize_with_min(raw: &str, min_chars: usize) -> Vec<String> {
    let cleaned: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    cleaned
        .split_whitespace()
        .filter(|t| t.chars().count() >= min_chars)
        .map(str::to_string)
        .collect()
}
