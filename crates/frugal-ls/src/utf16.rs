/// Number of UTF-16 code units in `line`.
pub fn utf16_len(line: &str) -> usize {
    line.chars().map(char::len_utf16).sum()
}

/// Convert a UTF-16 column offset (from LSP Position.character) to a char
/// offset within the given line. Returns `None` when the column lies past the
/// end of the line. A column that falls inside a surrogate pair resolves to
/// the char after it.
pub fn utf16_column_to_char_offset(line: &str, utf16_col: u32) -> Option<usize> {
    let target = utf16_col as usize;
    let mut utf16_count = 0;
    for (char_idx, ch) in line.chars().enumerate() {
        if utf16_count >= target {
            return Some(char_idx);
        }
        utf16_count += ch.len_utf16();
    }
    (utf16_count >= target).then(|| line.chars().count())
}

/// Strip a trailing `\n`, `\r\n` or `\r` line terminator.
pub fn trim_line_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
