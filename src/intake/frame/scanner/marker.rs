/// Offset of the first occurrence of `marker` in `haystack` at or after `from`.
pub fn find_marker(haystack: &[u8], marker: &[u8], from: usize) -> Option<usize> {
    if marker.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(marker.len())
        .position(|window| window == marker)
        .map(|offset| from + offset)
}
