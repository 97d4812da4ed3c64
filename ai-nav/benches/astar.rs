use ai_nav::{
    AStarSolver, BinaryHeapOpenList, BitsetClosedList, DenseNodeContainer, GridSolver, NavGrid,
    Navigator, Vec2,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Serpentine walls with alternating gaps, forcing long detours.
fn maze(size: u32) -> NavGrid {
    let mut grid = NavGrid::new(size, size, 1.0);
    for x in (2..size as i32 - 1).step_by(2) {
        let gap = if (x / 2) % 2 == 0 { size as i32 - 1 } else { 0 };
        for y in 0..size as i32 {
            if y != gap {
                grid.set_blocked(x, y, true);
            }
        }
    }
    grid
}

type DenseSolver<'a> = AStarSolver<
    'a,
    NavGrid,
    NavGrid,
    NavGrid,
    BinaryHeapOpenList<usize>,
    BitsetClosedList,
    DenseNodeContainer<usize>,
>;

fn bench_astar(c: &mut Criterion) {
    let grid = maze(64);
    let start = Vec2::new(0.5, 0.5);
    let goal = Vec2::new(63.5, 63.5);

    c.bench_function("astar_grid_64_sorted_map", |b| {
        let mut solver = GridSolver::new();
        b.iter(|| {
            solver.start_path_find(&grid, &grid, &grid, &start, &goal);
            solver.update(usize::MAX);
            black_box(solver.path_cost());
        })
    });

    c.bench_function("astar_grid_64_heap_dense", |b| {
        let mut solver = DenseSolver::new();
        b.iter(|| {
            solver.start_path_find(&grid, &grid, &grid, &start, &goal);
            solver.update(usize::MAX);
            black_box(solver.path_cost());
        })
    });

    c.bench_function("astar_grid_64_budget_32", |b| {
        let mut solver = GridSolver::new();
        b.iter(|| {
            solver.start_path_find(&grid, &grid, &grid, &start, &goal);
            while solver.is_searching() {
                solver.update(32);
            }
            black_box(solver.path_cost());
        })
    });

    c.bench_function("nav_grid_find_path_64", |b| {
        b.iter(|| black_box(grid.find_path(black_box(start), black_box(goal))))
    });
}

criterion_group!(benches, bench_astar);
criterion_main!(benches);
