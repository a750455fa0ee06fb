// Slider-set files always store paths with backslashes, but the folders they
// name have to be opened with whatever the host uses.

#[cfg(windows)]
pub fn to_os_slashes(path: &str) -> String {
    path.replace('/', "\\")
}

#[cfg(not(windows))]
pub fn to_os_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

pub fn to_backslashes(path: &str) -> String {
    path.replace('/', "\\")
}

/// Splits a `;`-delimited list, dropping empty entries (lists are usually
/// written with a trailing delimiter).
pub fn split_list(list: &str) -> Vec<String> {
    list.split(';')
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

pub fn join_list(items: &[String]) -> String {
    items.join(";")
}

/// Returns the index of the last `/` or `\`, whichever comes later.
pub fn last_separator(path: &str) -> Option<usize> {
    path.rfind(|c| c == '/' || c == '\\')
}
