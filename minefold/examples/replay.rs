use std::sync::Arc;

use minefold::{
    board::CellState,
    config::{BoardConfig, Preset},
    generator::generate,
    solver::Solver,
    topology::{Surface, Topology},
};

fn main() {
    let config: BoardConfig = Preset::Beginner.config(Surface::Torus);
    let topology =
        Arc::new(Topology::new(config.width, config.height, config.surface).unwrap());
    let start = topology.to_index(4, 4);

    let mut board = generate(&topology, &config, start).unwrap();
    println!("{board}");

    board.conceal_all();
    let mut solver = Solver::new(&board, config.mines);
    board.open(start);
    while solver.solve_round(&mut board) {
        println!("{board}");
    }

    let opened = (0..board.cell_count())
        .filter(|&i| board.status(i) == CellState::Opened)
        .count();
    println!("opened {opened} of {} cells", board.cell_count());
}
