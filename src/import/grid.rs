//! Worksheet grid
//!
//! Absolute-position cell grid built from a calamine range, so label
//! lookups see the same row/column numbers as the spreadsheet.

use calamine::{Data, Range};
use lazy_static::lazy_static;
use regex::Regex;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    pub fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => n.to_string(),
        }
    }

    /// Numbers as-is; text like `$1,250.00`, `(75)` or `8.25%` parsed
    pub fn number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(*n),
            Cell::Text(s) => parse_amount(s).map(|a| a.value),
            _ => None,
        }
    }

    /// Rate as a fraction. `%` text is divided by 100, and so is a bare
    /// number above `percent_above` (e.g. `8.25` sales tax).
    pub fn rate(&self, percent_above: f64) -> Option<f64> {
        let (value, percent) = match self {
            Cell::Number(n) if n.is_finite() => (*n, false),
            Cell::Text(s) => {
                let amount = parse_amount(s)?;
                (amount.value, amount.percent)
            }
            _ => return None,
        };
        if percent || value > percent_above {
            Some(value / 100.0)
        } else {
            Some(value)
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::String(s) => Cell::Text(s.clone()),
            Data::Bool(b) => Cell::Text(b.to_string()),
            other => Cell::Text(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Amount {
    pub value: f64,
    pub percent: bool,
}

pub fn parse_amount(text: &str) -> Option<Amount> {
    lazy_static! {
        // "$1,234.50", "-12", "(75.00)", "8.25 %", "14 yds"
        static ref AMOUNT_RE: Regex = Regex::new(
            r#"^\s*(\()?\s*(-)?\s*\$?\s*(-)?\s*([0-9][0-9,]*(?:\.[0-9]+)?|\.[0-9]+)\s*(%)?\s*(?:[A-Za-z'"]+\.?)?\s*(\))?\s*$"#
        ).unwrap();
    }

    let caps = AMOUNT_RE.captures(text)?;
    let digits = caps.get(4)?.as_str().replace(',', "");
    let mut value: f64 = digits.parse().ok().filter(|n: &f64| n.is_finite())?;

    let parenthesized = caps.get(1).is_some() && caps.get(6).is_some();
    if parenthesized || caps.get(2).is_some() || caps.get(3).is_some() {
        value = -value;
    }

    Some(Amount {
        value,
        percent: caps.get(5).is_some(),
    })
}

#[derive(Debug, Clone, Default)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
}

static EMPTY: Cell = Cell::Empty;

impl Grid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// Text rows; numeric-looking strings stay text and are parsed on read
    pub fn from_text_rows(rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|s| if s.trim().is_empty() { Cell::Empty } else { Cell::Text(s.to_string()) })
                    .collect()
            })
            .collect();
        Self { rows }
    }

    /// Pads with empty cells so (0, 0) is A1 even when the used range starts later
    pub fn from_range(range: &Range<Data>) -> Self {
        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); start_row as usize];
        for row in range.rows() {
            let mut cells = vec![Cell::Empty; start_col as usize];
            cells.extend(row.iter().map(Cell::from));
            rows.push(cells);
        }
        Self { rows }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self, row: usize) -> usize {
        self.rows.get(row).map(|r| r.len()).unwrap_or(0)
    }

    pub fn get(&self, row: usize, col: usize) -> &Cell {
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(&EMPTY)
    }

    /// First non-empty cell of a row within `max_cols`
    pub fn first_filled(&self, row: usize, max_cols: usize) -> Option<(usize, &Cell)> {
        (0..self.width(row).min(max_cols))
            .map(|c| (c, self.get(row, c)))
            .find(|(_, cell)| !cell.is_empty())
    }
}
