/// Default number of cells in a progress bar.
pub const DEFAULT_BAR_WIDTH: usize = 10;

/// Abbreviate a token count: below 1000 verbatim, otherwise whole thousands + "k".
pub fn format_tokens(tokens: u64) -> String {
    if tokens >= 1000 {
        format!("{}k", tokens / 1000)
    } else {
        tokens.to_string()
    }
}

/// Abbreviate a millisecond duration to its largest unit: "45s", "2m", "2h5m".
pub fn format_duration(ms: u64) -> String {
    let secs = ms / 1000;
    let mins = secs / 60;
    let hours = mins / 60;
    if hours > 0 {
        format!("{hours}h{}m", mins % 60)
    } else if mins > 0 {
        format!("{mins}m")
    } else {
        format!("{secs}s")
    }
}

pub fn format_cost(usd: f64) -> String {
    format!("${usd:.2}")
}

/// Render `[====      ]` with `floor(percent * width / 100)` filled cells.
pub fn progress_bar(percent: u32, width: usize, fill: char, empty: char) -> String {
    let filled = (percent.min(100) as usize * width / 100).min(width);
    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    bar.extend(std::iter::repeat(fill).take(filled));
    bar.extend(std::iter::repeat(empty).take(width - filled));
    bar.push(']');
    bar
}

/// Map a model id to a short family/version label.
/// Falls back to the host-supplied display name, then to "Claude".
pub fn model_display_name(id: Option<&str>, display_name: Option<&str>) -> String {
    const KNOWN: &[(&str, &str)] = &[
        ("opus-4-5", "Opus 4.5"),
        ("opus-4", "Opus 4"),
        ("sonnet-4", "Sonnet 4"),
        ("sonnet-3-5", "Sonnet 3.5"),
        ("haiku", "Haiku"),
    ];

    if let Some(id) = id {
        if let Some((_, label)) = KNOWN.iter().find(|(needle, _)| id.contains(needle)) {
            return (*label).to_string();
        }
    }
    match display_name {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => "Claude".to_string(),
    }
}
