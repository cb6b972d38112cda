// Preview rendering: resolved display states as a text grid or JSON

use serde::Serialize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use pseudogrid_engine::display::{
    column_header, resolve_cell_display, Background, ColumnHeader, DisplayState, MarkerKind,
};
use pseudogrid_engine::error::EngineError;
use pseudogrid_engine::range::RangeMarker;
use pseudogrid_engine::state::TokenizationState;

const MAX_CELL_WIDTH: usize = 30;

/// Column index to letter (0 -> A, 25 -> Z, 26 -> AA).
pub(crate) fn col_letter(col: usize) -> String {
    let mut letters = Vec::new();
    let mut n = col + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Pad to `width` display columns, cutting with ".." when too wide.
pub(crate) fn fit(s: &str, width: usize) -> String {
    let sw = UnicodeWidthStr::width(s);
    if sw <= width {
        return format!("{}{}", s, " ".repeat(width - sw));
    }
    let budget = width.saturating_sub(2);
    let mut out = String::new();
    let mut used = 0;
    for ch in s.chars() {
        let cw = ch.width().unwrap_or(0);
        if used + cw > budget {
            break;
        }
        used += cw;
        out.push(ch);
    }
    if width >= 2 {
        out.push_str("..");
        used += 2;
    }
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}

fn marker_glyph(marker: Option<MarkerKind>) -> char {
    match marker {
        Some(MarkerKind::Tokenized) => '●',
        Some(MarkerKind::Excluded) => '×',
        Some(MarkerKind::Selected) => '○',
        None => ' ',
    }
}

fn header_glyph(header: ColumnHeader) -> &'static str {
    match header {
        ColumnHeader::Tokenized => "●",
        ColumnHeader::Selected => "○",
        ColumnHeader::Plain => "",
    }
}

fn cell_text(display: &DisplayState<'_>) -> String {
    let mut text = String::new();
    text.push(marker_glyph(display.marker));
    if display.outlined {
        text.push('*');
    }
    text.push_str(&display.content.to_line());
    text
}

fn range_label(marker: &RangeMarker) -> String {
    if marker.is_enabled() {
        format!("rows {}-{}", marker.start_row(), marker.end_row())
    } else {
        format!("off (rows {}-{} stored)", marker.start_row(), marker.end_row())
    }
}

/// Text grid of the first `max_rows` rows. Rows inside the effective range
/// carry a `│` gutter.
pub fn render_grid(state: &TokenizationState, max_rows: usize) -> Result<String, EngineError> {
    let table = state.table();
    let shown = table.row_count().min(max_rows);
    let cols = table.col_count();

    let mut grid: Vec<Vec<String>> = Vec::with_capacity(shown);
    for row in 0..shown {
        let mut line = Vec::with_capacity(cols);
        for col in 0..cols {
            line.push(cell_text(&resolve_cell_display(state, row, col)?));
        }
        grid.push(line);
    }

    let headers: Vec<String> = (0..cols)
        .map(|col| format!(" {}{}", col_letter(col), header_glyph(column_header(state, col))))
        .collect();
    let widths: Vec<usize> = (0..cols)
        .map(|col| {
            grid.iter()
                .map(|line| UnicodeWidthStr::width(line[col].as_str()))
                .chain(std::iter::once(UnicodeWidthStr::width(headers[col].as_str())))
                .max()
                .unwrap_or(1)
                .min(MAX_CELL_WIDTH)
        })
        .collect();
    let gutter = table.row_count().max(1).to_string().len();

    let mut out = String::new();
    out.push_str(&" ".repeat(gutter + 2));
    let header_line: Vec<String> = headers.iter().zip(&widths).map(|(h, &w)| fit(h, w)).collect();
    out.push_str(header_line.join(" ").trim_end());
    out.push('\n');

    for (row, line) in grid.iter().enumerate() {
        let bar = if state.marker().row_in_range(row) { '│' } else { ' ' };
        let cells: Vec<String> = line.iter().zip(&widths).map(|(c, &w)| fit(c, w)).collect();
        let rendered = format!("{:>gutter$} {} {}", row + 1, bar, cells.join(" "));
        out.push_str(rendered.trim_end());
        out.push('\n');
    }

    if table.row_count() > shown {
        out.push_str(&format!("... {} more rows\n", table.row_count() - shown));
    }

    let available: Vec<&str> = state.available_view_modes().iter().map(|m| m.as_str()).collect();
    out.push_str(&format!(
        "view: {} (available: {}) | range: {}\n",
        state.view_mode(),
        available.join(", "),
        range_label(state.marker())
    ));
    out.push_str("● tokenized  × excluded  ○ pending  * override\n");
    Ok(out)
}

#[derive(Debug, Serialize)]
pub struct CellJson {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_line: Option<String>,
    pub background: Background,
    pub marker: Option<MarkerKind>,
    pub outlined: bool,
    pub shows_token: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ColumnJson {
    pub index: usize,
    pub letter: String,
    pub state: ColumnHeader,
}

#[derive(Debug, Serialize)]
pub struct PreviewJson<'a> {
    pub view: &'static str,
    pub available_views: Vec<&'static str>,
    pub rows: usize,
    pub columns: usize,
    pub marker: &'a RangeMarker,
    pub column_states: Vec<ColumnJson>,
    pub cells: Vec<Vec<CellJson>>,
}

fn cell_json(display: DisplayState<'_>) -> CellJson {
    use pseudogrid_engine::display::CellContent;

    let (text, token_line) = match &display.content {
        CellContent::Plain(text) => (text.to_string(), None),
        CellContent::Stacked { original, token } => (original.to_string(), Some(token.to_string())),
    };
    CellJson {
        text,
        token_line,
        background: display.background,
        marker: display.marker,
        outlined: display.outlined,
        shows_token: display.shows_token,
        tooltip: display.tooltip.map(|t| t.into_owned()),
    }
}

pub fn preview_json(state: &TokenizationState, max_rows: usize) -> Result<PreviewJson<'_>, EngineError> {
    let table = state.table();
    let shown = table.row_count().min(max_rows);
    let mut cells = Vec::with_capacity(shown);
    for row in 0..shown {
        let mut line = Vec::with_capacity(table.col_count());
        for col in 0..table.col_count() {
            line.push(cell_json(resolve_cell_display(state, row, col)?));
        }
        cells.push(line);
    }

    Ok(PreviewJson {
        view: state.view_mode().as_str(),
        available_views: state.available_view_modes().iter().map(|m| m.as_str()).collect(),
        rows: table.row_count(),
        columns: table.col_count(),
        marker: state.marker(),
        column_states: (0..table.col_count())
            .map(|col| ColumnJson {
                index: col + 1,
                letter: col_letter(col),
                state: column_header(state, col),
            })
            .collect(),
        cells,
    })
}
