//! Grid distances and movement clamping.
//!
//! Distances are counted in whole cells. Square boards use Manhattan distance;
//! hex boards use odd-row offset coordinates (odd rows shifted right), converted
//! to cube coordinates for the distance.

use skirmish_data::{Cell, GridType};

pub fn manhattan(a: Cell, b: Cell) -> u32 {
    a.col.abs_diff(b.col) + a.row.abs_diff(b.row)
}

/// Cube coordinates of an odd-row offset cell.
fn to_cube(cell: Cell) -> (i64, i64, i64) {
    let col = i64::from(cell.col);
    let row = i64::from(cell.row);
    let x = col - (row - (row & 1)) / 2;
    let z = row;
    (x, -x - z, z)
}

pub fn hex_distance(a: Cell, b: Cell) -> u32 {
    let (ax, ay, az) = to_cube(a);
    let (bx, by, bz) = to_cube(b);
    let d = (ax - bx).abs().max((ay - by).abs()).max((az - bz).abs());
    u32::try_from(d).unwrap_or(u32::MAX)
}

pub fn grid_distance(grid: GridType, a: Cell, b: Cell) -> u32 {
    match grid {
        GridType::Square => manhattan(a, b),
        GridType::Hex => hex_distance(a, b),
    }
}

/// Where a token at `from` ends up heading for `to` with a budget of `budget`
/// cells: `to` itself when in range, otherwise the point `budget / distance` of
/// the way along the straight line, rounded to a cell and pulled back until it
/// is within budget.
pub fn clamp_toward(grid: GridType, from: Cell, to: Cell, budget: u32) -> Cell {
    let distance = grid_distance(grid, from, to);
    if distance <= budget {
        return to;
    }
    let fraction = f64::from(budget) / f64::from(distance);
    let mut col = lerp(from.col, to.col, fraction);
    let mut row = lerp(from.row, to.row, fraction);
    let (fc, fr) = (i64::from(from.col), i64::from(from.row));

    loop {
        let cell = to_cell(col, row);
        if grid_distance(grid, from, cell) <= budget {
            return cell;
        }
        // step back toward `from` along the longer remaining axis
        if (col - fc).abs() >= (row - fr).abs() {
            col -= (col - fc).signum();
        } else {
            row -= (row - fr).signum();
        }
    }
}

// bounded by the two u32 endpoints
#[allow(clippy::cast_possible_truncation)]
fn lerp(a: u32, b: u32, fraction: f64) -> i64 {
    let (a, b) = (f64::from(a), f64::from(b));
    (a + (b - a) * fraction).round() as i64
}

fn to_cell(col: i64, row: i64) -> Cell {
    Cell::new(
        u32::try_from(col.max(0)).unwrap_or(u32::MAX),
        u32::try_from(row.max(0)).unwrap_or(u32::MAX),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_counts_both_axes() {
        assert_eq!(manhattan(Cell::new(0, 0), Cell::new(3, 4)), 7);
        assert_eq!(manhattan(Cell::new(5, 2), Cell::new(1, 2)), 4);
    }

    #[test]
    fn hex_neighbors_are_one_apart() {
        // odd row 1: neighbors of (1,1) include (1,0), (2,0), (1,2), (2,2)
        let center = Cell::new(1, 1);
        for n in [
            Cell::new(0, 1),
            Cell::new(2, 1),
            Cell::new(1, 0),
            Cell::new(2, 0),
            Cell::new(1, 2),
            Cell::new(2, 2),
        ] {
            assert_eq!(hex_distance(center, n), 1, "{n}");
        }
        assert_eq!(hex_distance(center, Cell::new(0, 0)), 2);
        assert_eq!(hex_distance(Cell::new(0, 0), Cell::new(0, 4)), 4);
        assert_eq!(hex_distance(Cell::new(0, 0), Cell::new(3, 0)), 3);
    }

    #[test]
    fn clamp_stops_at_budget_on_a_line() {
        let from = Cell::new(0, 0);
        assert_eq!(clamp_toward(GridType::Square, from, Cell::new(5, 0), 3), Cell::new(3, 0));
        assert_eq!(clamp_toward(GridType::Square, from, Cell::new(2, 0), 3), Cell::new(2, 0));
    }

    #[test]
    fn clamp_never_exceeds_budget() {
        let from = Cell::new(4, 4);
        for col in 0..10 {
            for row in 0..10 {
                let to = Cell::new(col, row);
                for budget in 0..4 {
                    for grid in [GridType::Square, GridType::Hex] {
                        let dest = clamp_toward(grid, from, to, budget);
                        assert!(grid_distance(grid, from, dest) <= budget, "{grid:?} {to} {budget}");
                    }
                }
            }
        }
    }

    #[test]
    fn clamp_with_zero_budget_stays_put() {
        let from = Cell::new(2, 2);
        assert_eq!(clamp_toward(GridType::Square, from, Cell::new(7, 7), 0), from);
    }
}
