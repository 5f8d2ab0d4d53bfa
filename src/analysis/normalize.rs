// Text normalization ahead of field extraction

/// Drops blank lines and the `--- Sayfa N ---` separators the extractors insert.
/// Turkish letters pass through untouched.
pub fn clean_extracted_text(raw_text: &str) -> String {
    raw_text
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !is_page_separator(line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_page_separator(line: &str) -> bool {
    line.starts_with("---") && line.contains("Sayfa")
}

/// Marker written between pages by every extraction method.
pub fn page_marker(page_number: usize, ocr: bool) -> String {
    if ocr {
        format!("\n--- Sayfa {} (OCR) ---\n", page_number)
    } else {
        format!("\n--- Sayfa {} ---\n", page_number)
    }
}
