use jiff::Timestamp;
use unicode_width::UnicodeWidthStr;

/// Spaces between table columns
const COLUMN_PADDING: usize = 2;

const SECONDS_PER_DAY: i64 = 86_400;

/// Normalize an issue title for display.
///
/// Lower-cases, drops square brackets, strips a leading descriptor such as
/// `feat:` or `Bug report -`, and collapses whitespace.
pub fn normalize_title(raw: &str) -> String {
    let title = raw.trim().to_lowercase();
    let title: String = title.chars().filter(|c| *c != '[' && *c != ']').collect();
    let title = strip_descriptor(&title);
    title.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_descriptor(title: &str) -> &str {
    let idx = match title.find(|c: char| c == ':' || c == '-') {
        Some(idx) if idx > 0 => idx,
        _ => return title,
    };

    let prefix = title[..idx].trim();
    if prefix.is_empty() {
        return title;
    }
    if !prefix.chars().all(|c| c.is_alphabetic() || c.is_whitespace()) {
        return title;
    }

    let rest = title[idx + 1..].trim();
    if rest.is_empty() {
        return title;
    }
    rest
}

/// Shorten `title` to at most `limit` characters, marking the cut with `...`
pub fn truncate_title(title: &str, limit: usize) -> String {
    if title.chars().count() <= limit {
        return title.to_string();
    }
    if limit <= 3 {
        return title.chars().take(limit).collect();
    }
    let head: String = title.chars().take(limit - 3).collect();
    format!("{}...", head.trim())
}

/// Human readable age of an item created at `created`, as seen at `now`
pub fn format_age(created: Timestamp, now: Timestamp) -> String {
    let days = ((now.as_second() - created.as_second()) / SECONDS_PER_DAY).max(0);

    match days {
        0 => "today".to_string(),
        1 => "1 day".to_string(),
        2..=6 => format!("{} days", days),
        7..=29 => plural(days / 7, "week"),
        30..=364 => plural(days / 30, "month"),
        _ => plural(days / 365, "year"),
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", count, unit)
    }
}

/// Lay out rows as aligned columns.
///
/// Every column but the last is padded to its widest cell plus
/// `COLUMN_PADDING` spaces.
pub fn layout_table<const N: usize>(rows: &[[String; N]]) -> Vec<String> {
    let mut widths = [0usize; N];
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.width());
        }
    }

    rows.iter()
        .map(|row| {
            let mut line = String::new();
            for (i, cell) in row.iter().enumerate() {
                line.push_str(cell);
                if i + 1 < N {
                    let pad = widths[i] - cell.width() + COLUMN_PADDING;
                    line.extend(std::iter::repeat(' ').take(pad));
                }
            }
            line
        })
        .collect()
}
