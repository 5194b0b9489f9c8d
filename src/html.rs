//! Plain, non-interactive HTML rendering of a frame.
//!
//! This is what hosts show when the structured payload is declined or fails,
//! and what the "convert to interactive" hint is displayed next to.

use std::fmt::Write;

use arrow::{
    array::Array,
    util::display::{ArrayFormatter, FormatOptions},
};

use crate::frame::{ColumnLabels, Frame};

/// Rows shown before the HTML table is cut off.
pub const HTML_MAX_ROWS: usize = 60;

/// Escapes `&`, `<`, `>`, `"` and `'` for use in HTML text and attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn display_cell(array: &dyn Array, row: usize) -> String {
    let options = FormatOptions::default()
        .with_null("NaN")
        .with_display_error(true);
    match ArrayFormatter::try_new(array, &options) {
        Ok(formatter) => escape_html(&formatter.value(row).to_string()),
        Err(_) => format!("&lt;{}&gt;", escape_html(&array.data_type().to_string())),
    }
}

/// Renders `frame` as an HTML `<table>`, showing at most
/// [`HTML_MAX_ROWS`] rows followed by a shape summary.
///
/// Hierarchical column labels are rendered as one header row per level.
pub fn render_frame(frame: &Frame) -> String {
    let shown = frame.num_rows().min(HTML_MAX_ROWS);
    let mut html = String::from("<table border=\"1\" class=\"dataframe\">\n  <thead>\n");

    let header_rows: Vec<Vec<String>> = match frame.column_labels() {
        ColumnLabels::Flat => vec![frame
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect()],
        ColumnLabels::MultiLevel(levels) => levels.clone(),
    };
    let index_levels = frame.index().nlevels();
    for labels in &header_rows {
        html.push_str("    <tr style=\"text-align: right;\">\n");
        for _ in 0..index_levels {
            html.push_str("      <th></th>\n");
        }
        for label in labels {
            let _ = writeln!(html, "      <th>{}</th>", escape_html(label));
        }
        html.push_str("    </tr>\n");
    }
    html.push_str("  </thead>\n  <tbody>\n");

    for row in 0..shown {
        html.push_str("    <tr>\n");
        for level in frame.index().levels() {
            let label = display_cell(level.values().as_ref(), row);
            let _ = writeln!(html, "      <th>{label}</th>");
        }
        for column in frame.batch().columns() {
            let _ = writeln!(html, "      <td>{}</td>", display_cell(column.as_ref(), row));
        }
        html.push_str("    </tr>\n");
    }
    html.push_str("  </tbody>\n</table>\n");

    if shown < frame.num_rows() {
        let _ = writeln!(
            html,
            "<p>{} rows × {} columns</p>",
            frame.num_rows(),
            frame.num_columns()
        );
    }
    html
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{ArrayRef, Int32Array, StringArray};

    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#x27;Jerry&#x27;&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_render_small_frame() {
        let frame = Frame::from_columns(vec![
            ("id", Arc::new(Int32Array::from(vec![Some(7), None])) as ArrayRef),
            ("tag", Arc::new(StringArray::from(vec!["<b>", "ok"])) as ArrayRef),
        ])
        .unwrap();
        let html = render_frame(&frame);
        assert!(html.starts_with("<table"));
        assert!(html.contains("<th>id</th>"));
        assert!(html.contains("<td>7</td>"));
        assert!(html.contains("<td>NaN</td>"));
        assert!(html.contains("<td>&lt;b&gt;</td>"));
        assert!(!html.contains("rows ×"));
    }

    #[test]
    fn test_render_large_frame_is_cut() {
        let ids: Vec<i32> = (0..100).collect();
        let frame =
            Frame::from_columns(vec![("id", Arc::new(Int32Array::from(ids)) as ArrayRef)]).unwrap();
        let html = render_frame(&frame);
        assert_eq!(html.matches("<td>").count(), HTML_MAX_ROWS);
        assert!(html.contains("100 rows × 1 columns"));
    }

    #[test]
    fn test_render_multi_level_headers() {
        let frame = Frame::from_columns(vec![
            ("a", Arc::new(Int32Array::from(vec![1])) as ArrayRef),
            ("b", Arc::new(Int32Array::from(vec![2])) as ArrayRef),
        ])
        .unwrap()
        .with_column_labels(ColumnLabels::MultiLevel(vec![
            vec!["grp".into(), "grp".into()],
            vec!["a".into(), "b".into()],
        ]))
        .unwrap();
        let html = render_frame(&frame);
        assert_eq!(html.matches("<th>grp</th>").count(), 2);
    }
}
