//! Plain-text rendering of a symbol map, one box per key.

use keypad_symbols::SymbolMap;

/// Render `symbols` as a boxed grid. Unused intersections are left blank.
pub fn render(symbols: &SymbolMap) -> String {
    let width = symbols
        .iter()
        .filter(|(_, _, s)| !s.is_unused())
        .map(|(_, _, s)| s.label().chars().count())
        .max()
        .unwrap_or(0);

    let border = {
        let mut line = String::from("+");
        for _ in 0..symbols.cols() {
            line.push_str(&"-".repeat(width + 2));
            line.push('+');
        }
        line.push('\n');
        line
    };

    let mut out = border.clone();
    for row in 0..symbols.rows() {
        out.push('|');
        for col in 0..symbols.cols() {
            let label = match symbols.get(row, col) {
                Some(s) if !s.is_unused() => s.label(),
                _ => "",
            };
            out.push_str(&format!(" {label:<width$} |"));
        }
        out.push('\n');
        out.push_str(&border);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_grid() {
        let grid = render(&SymbolMap::reference());
        let lines: Vec<&str> = grid.lines().collect();
        assert_eq!(lines.len(), 13);
        assert_eq!(lines[0], "+-------+-------+-------+-------+");
        assert_eq!(lines[1], "| NL    | Calc  |       | BP    |");
        assert_eq!(lines[9], "| 1     | 2     | 3     | Enter |");
        assert_eq!(lines[11], "|       | 0     | .     |       |");
    }
}
