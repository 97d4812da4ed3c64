use ai_nav::{NavGrid, Navigator, Vec2};

#[test]
fn nav_grid_finds_path_around_blockers() {
    let mut grid = NavGrid::new(5, 5, 1.0);

    // Block a vertical wall with a single gap.
    for y in 0..5 {
        if y == 2 {
            continue;
        }
        grid.set_blocked(2, y, true);
    }

    let start = Vec2::new(0.5, 0.5);
    let goal = Vec2::new(4.5, 4.5);
    let path = grid.find_path(start, goal).expect("path should exist");

    assert_eq!(path.points.first().copied(), Some(start));
    assert_eq!(path.points.last().copied(), Some(goal));
    assert!(path.points.len() >= 2);
}

#[test]
fn nav_grid_is_deterministic_for_same_input() {
    let mut grid = NavGrid::new(10, 10, 1.0);
    for y in 0..10 {
        grid.set_blocked(5, y, true);
    }
    grid.set_blocked(5, 5, false);

    let start = Vec2::new(1.5, 1.5);
    let goal = Vec2::new(8.5, 8.5);

    let a = grid.find_path(start, goal).expect("path should exist");
    let b = grid.find_path(start, goal).expect("path should exist");

    assert_eq!(a.points, b.points);
}


#[test]
fn nav_grid_path_has_manhattan_length_on_open_grid() {
    let grid = NavGrid::new(6, 4, 2.0);
    let start = Vec2::new(1.0, 1.0);
    let goal = Vec2::new(11.0, 7.0);

    let path = grid.find_path(start, goal).expect("path should exist");
    // 5 + 3 cell steps of 2 world units each.
    assert!((path.length() - 16.0).abs() < 1e-4);
    assert_eq!(path.points.len(), 9);
}

#[test]
fn nav_grid_rejects_blocked_and_unreachable_goals() {
    let grid = NavGrid::from_rows(&["..#..", "..#..", "..#.#"], 1.0);

    assert!(grid.find_path(Vec2::new(0.5, 0.5), Vec2::new(2.5, 0.5)).is_none());
    assert!(grid.find_path(Vec2::new(0.5, 0.5), Vec2::new(3.5, 1.5)).is_none());
    assert!(grid.find_path(Vec2::new(0.5, 0.5), Vec2::new(9.0, 9.0)).is_none());
    assert!(grid.find_path(Vec2::new(3.5, 0.5), Vec2::new(3.5, 2.5)).is_some());
}

#[test]
fn nearest_point_snaps_to_free_cell_centers() {
    let grid = NavGrid::from_rows(&[".#", ".."], 1.0);

    assert_eq!(grid.nearest_point(Vec2::new(0.1, 0.9)), Some(Vec2::new(0.5, 0.5)));
    assert_eq!(grid.nearest_point(Vec2::new(1.2, 0.2)), None);
    assert_eq!(grid.nearest_point(Vec2::new(-0.2, 0.2)), None);
    assert!(grid.is_blocked(1, 0));
    assert!(grid.is_blocked(5, 5));
    assert_eq!(grid.cell_index(Vec2::new(1.5, 1.5)), Some(3));
}
