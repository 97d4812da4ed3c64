#![cfg(feature = "serde")]

use ai_nav::{NavGrid, NavPath, Navigator, Vec2};

#[test]
fn nav_grid_roundtrips_via_serde() {
    let grid = NavGrid::from_rows(&["....", ".##.", "...."], 0.5);

    let json = serde_json::to_string(&grid).expect("serialize grid");
    let grid2: NavGrid = serde_json::from_str(&json).expect("deserialize grid");
    assert_eq!(grid, grid2);

    let start = Vec2::new(0.25, 0.75);
    let goal = Vec2::new(1.75, 0.75);
    let path1 = grid.find_path(start, goal).expect("path");
    let path2 = grid2.find_path(start, goal).expect("path");
    assert_eq!(path1, path2);

    let json = serde_json::to_string(&path1).expect("serialize path");
    let path3: NavPath = serde_json::from_str(&json).expect("deserialize path");
    assert_eq!(path1, path3);
}
