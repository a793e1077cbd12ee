use similar::TextDiff;

/// Unified diff between the file currently on disk and the rendered content.
/// Returns `None` when both are byte-identical.
pub fn build_unified_diff(current: &str, rendered: &str, path: &str) -> Option<String> {
    if current == rendered {
        return None;
    }

    let diff = TextDiff::from_lines(current, rendered);
    let mut output = Vec::new();
    let header_old = format!("a{}", with_leading_slash(path));
    let header_new = format!("b{}", with_leading_slash(path));

    diff.unified_diff()
        .header(&header_old, &header_new)
        .to_writer(&mut output)
        .expect("writing diff to a vec never fails");

    Some(String::from_utf8(output).expect("diff of utf-8 inputs is utf-8"))
}

fn with_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
