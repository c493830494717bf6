//! Plain-text rendering helpers.

use chrono::{DateTime, Utc};
use heleus_core::ContentDigest;

/// Characters of a digest shown in tables.
pub const SHORT_HASH_LEN: usize = 12;

/// Column-aligned table with a header row. Trailing spaces are trimmed.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            let len = cell.chars().count();
            match widths.get_mut(i) {
                Some(width) => *width = (*width).max(len),
                None => widths.push(len),
            }
        }
    }

    let mut out = String::new();
    let header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    for row in std::iter::once(&header).chain(rows) {
        let mut line = String::new();
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                line.push_str("  ");
            }
            line.push_str(cell);
            let pad = widths[i].saturating_sub(cell.chars().count());
            line.extend(std::iter::repeat(' ').take(pad));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

pub fn short_hash(digest: &ContentDigest) -> String {
    let mut hex = digest.to_hex();
    hex.truncate(SHORT_HASH_LEN);
    hex
}

pub fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_align() {
        let table = render_table(
            &["NAME", "HASH"],
            &[
                vec!["calc".into(), "abc".into()],
                vec!["notes-app".into(), "d".into()],
            ],
        );
        assert_eq!(table, "NAME       HASH\ncalc       abc\nnotes-app  d\n");
    }

    #[test]
    fn short_hash_is_prefix() {
        let digest = heleus_core::sha256_digest(b"AAA");
        assert_eq!(short_hash(&digest).len(), SHORT_HASH_LEN);
        assert!(digest.to_hex().starts_with(&short_hash(&digest)));
    }
}
