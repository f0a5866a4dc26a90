//! Rune classification helpers shared by selection expansion and motion
//! code.

/// Word runes for double-click expansion: Unicode letters and digits.
pub fn is_word_rune(c: char) -> bool {
    c.is_alphanumeric()
}

/// Path-like runes for execute/plumb expansion: anything that is not
/// whitespace. NUL is excluded since it separates a tag's name from its
/// commands.
pub fn is_path_rune(c: char) -> bool {
    !c.is_whitespace() && c != '\0'
}

/// Indentation runes copied by auto-indent.
pub fn is_indent_rune(c: char) -> bool {
    c == ' ' || c == '\t'
}
