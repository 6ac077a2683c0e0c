use std::ops::ControlFlow;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use minefold::{
    board::{Board, CellState},
    config::{BoardConfig, Preset},
    generator::Generator,
    solver::Solver,
    topology::{Surface, Topology},
};
use rand::{rngs::SmallRng, SeedableRng};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SurfaceArg {
    Square,
    Torus,
    Mobius,
    Klein,
    Projective,
}

impl From<SurfaceArg> for Surface {
    fn from(arg: SurfaceArg) -> Self {
        match arg {
            SurfaceArg::Square => Surface::Square,
            SurfaceArg::Torus => Surface::Torus,
            SurfaceArg::Mobius => Surface::Mobius,
            SurfaceArg::Klein => Surface::Klein,
            SurfaceArg::Projective => Surface::Projective,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PresetArg {
    Beginner,
    Intermediate,
    Expert,
    Maniac,
}

impl From<PresetArg> for Preset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Beginner => Preset::Beginner,
            PresetArg::Intermediate => Preset::Intermediate,
            PresetArg::Expert => Preset::Expert,
            PresetArg::Maniac => Preset::Maniac,
        }
    }
}

/// Generates a guess-free Minesweeper board on an identified surface and
/// optionally replays the solver's proof.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Stock difficulty; overridden by explicit dimensions.
    #[arg(long, value_enum, default_value = "beginner")]
    preset: PresetArg,

    #[arg(long, requires = "height", requires = "mines")]
    width: Option<usize>,

    #[arg(long)]
    height: Option<usize>,

    #[arg(long)]
    mines: Option<usize>,

    #[arg(long, value_enum, default_value = "torus")]
    surface: SurfaceArg,

    /// RNG seed for a reproducible board.
    #[arg(long)]
    seed: Option<u64>,

    /// First click as `x,y`; defaults to the board centre.
    #[arg(long)]
    start: Option<String>,

    /// Step through the solver's proof round by round.
    #[arg(long)]
    replay: bool,

    /// Placement attempts before giving up.
    #[arg(long, default_value_t = minefold::generator::DEFAULT_MAX_RETRIES)]
    max_retries: u32,
}

impl Cli {
    fn config(&self) -> BoardConfig {
        let surface = self.surface.into();
        match (self.width, self.height, self.mines) {
            (Some(width), Some(height), Some(mines)) => BoardConfig {
                width,
                height,
                mines,
                surface,
            },
            _ => Preset::from(self.preset).config(surface),
        }
    }

    fn start_index(&self, topology: &Topology) -> Result<usize, String> {
        let Some(raw) = &self.start else {
            return Ok(topology.to_index(topology.width() / 2, topology.height() / 2));
        };
        let coords: Vec<usize> = raw
            .split(',')
            .map(|part| part.trim().parse())
            .collect::<Result<_, _>>()
            .map_err(|_| format!("--start expects `x,y`, got `{raw}`"))?;
        match coords[..] {
            [x, y] if x < topology.width() && y < topology.height() => {
                Ok(topology.to_index(x, y))
            }
            _ => Err(format!("--start `{raw}` is outside the board")),
        }
    }
}

fn replay_proof(board: &Board, config: &BoardConfig, start: usize) {
    let mut replay = board.clone();
    replay.conceal_all();
    let mut solver = Solver::new(&replay, config.mines);
    replay.open(start);
    let mut round = 0;
    println!("round {round}:\n{replay}");
    while solver.solve_round(&mut replay) {
        round += 1;
        println!("round {round}:\n{replay}");
    }
    let opened = (0..replay.cell_count())
        .filter(|&i| replay.status(i) == CellState::Opened)
        .count();
    println!(
        "opened {opened}/{} cells, {} mines proven",
        replay.cell_count(),
        solver.known_mines().count_ones()
    );
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = cli.config();
    config.validate().map_err(|err| err.to_string())?;
    let topology = Topology::new(config.width, config.height, config.surface)
        .map_err(|err| err.to_string())?;
    let topology = Arc::new(topology);
    let start = cli.start_index(&topology)?;

    let mut rng = match cli.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    };

    let generator = Generator::new(cli.max_retries, minefold::generator::DEFAULT_TIME_SLICE);
    let board = generator
        .generate(&topology, &config, start, &mut rng, |progress| {
            eprint!("\rsearching... attempt {}", progress.attempts);
            ControlFlow::Continue(())
        })
        .map_err(|err| err.to_string())?;
    eprintln!();

    println!(
        "{}x{} {:?}, {} mines, first click at {:?}",
        config.width,
        config.height,
        config.surface,
        config.mines,
        topology.to_coord(start)
    );
    println!("{board}");

    if cli.replay {
        replay_proof(&board, &config, start);
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}
