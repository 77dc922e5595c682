use toon_core::padded;

const MAX_COMPONENT_CHARS: usize = 120;

/// Turns a series title into a single safe path component.
pub fn sanitize_component(input: &str) -> String {
    let replaced: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();

    // Collapse runs of underscores left by replaced characters.
    let mut compacted = String::with_capacity(replaced.len());
    let mut prev_underscore = false;
    for c in replaced.trim_matches(&['_', ' ', '.'][..]).chars() {
        if c == '_' && prev_underscore {
            continue;
        }
        prev_underscore = c == '_';
        compacted.push(c);
    }

    let mut name: String = compacted.chars().take(MAX_COMPONENT_CHARS).collect();
    if name.is_empty() {
        name = "untitled".to_string();
    }
    if is_reserved_windows_name(&name) {
        name.push('_');
    }
    name
}

/// `<episode padded>` directory name for a chapter.
pub fn chapter_dir_name(episode_number: u32, width: usize) -> String {
    padded(u64::from(episode_number), width)
}

/// `<index padded>.<extension>` file name for a page image.
pub fn page_filename(index: usize, width: usize, extension: &str) -> String {
    format!("{}.{extension}", padded(index as u64, width))
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}
