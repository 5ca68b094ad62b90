/// Collapse each run of whitespace into a single hyphen.
pub fn sanitize_segment(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Text after the last `.` of a file name, if any.
pub fn extension_of(file_name: &str) -> Option<&str> {
    let (stem, extension) = file_name.rsplit_once('.')?;
    if stem.is_empty() || extension.is_empty() {
        return None;
    }
    Some(extension)
}

/// `{client}/{doc_id}-{token}.{ext}` blob path for an uploaded document.
pub fn storage_path(client_name: &str, document_id: &str, file_name: &str, token: &str) -> String {
    let client = sanitize_segment(client_name);
    match extension_of(file_name) {
        Some(extension) => format!("{client}/{document_id}-{token}.{extension}"),
        None => format!("{client}/{document_id}-{token}"),
    }
}
