use analysis_board::command::{Command, CommandError};
use analysis_board::{
    BoardConfig, Direction, EngineReply, Game, GameError, GameSettings, MoveOutcome, OracleClient,
    Transport,
};
use anyhow::Context;
use chess_core::{Color, LegalMove};
use clap::Parser;
use std::io::{self, BufRead};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "analysis-board")]
#[command(about = "Chess analysis board backed by an external oracle")]
struct Cli {
    /// Configuration file [default: analysis-board.toml]
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Oracle executable, overrides the configuration
    #[arg(short, long)]
    oracle: Option<PathBuf>,
    /// Play against the oracle
    #[arg(short, long)]
    engine: bool,
    /// Take the black pieces
    #[arg(short, long)]
    black: bool,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<BoardConfig> {
        let mut config = match &self.config {
            Some(path) => BoardConfig::load_from(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => BoardConfig::load().with_context(|| {
                format!("failed to load {}", BoardConfig::config_path().display())
            })?,
        };
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(&self, config: &mut BoardConfig) {
        if let Some(path) = &self.oracle {
            config.oracle.path = path.clone();
        }
        if self.engine {
            config.game.engine_on = true;
        }
        if self.black {
            config.game.user_color = Color::Black;
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let cli = Cli::parse();
    let config = cli.load_config()?;

    let client = OracleClient::spawn(&config.oracle).with_context(|| {
        format!("failed to start oracle {}", config.oracle.path.display())
    })?;
    let mut game = Game::new(client, GameSettings::from(&config))?;
    print_board(&game)?;

    for line in io::stdin().lock().lines() {
        let line = line?;
        let command = match Command::parse(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => command,
            Err(CommandError::Empty) => continue,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        if let Err(e) = run(&mut game, command) {
            eprintln!("error: {}", e);
            if game.is_faulted() {
                eprintln!("the oracle failed; use 'restart' to continue");
            }
            continue;
        }
        if !game.is_faulted() {
            let reply = game.poll_engine_move();
            if let Err(e) = report_engine(&game, reply) {
                eprintln!("error: {}", e);
            }
        }
    }

    if let Err(e) = game.shutdown() {
        eprintln!("Warning: oracle shutdown failed: {}", e);
    }
    Ok(())
}

fn run<T: Transport>(game: &mut Game<T>, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Move(text) => {
            let lm = LegalMove::parse_coordinate(&text, game.orientation())
                .ok_or_else(|| GameError::InvalidMove(text.clone()))?;
            match game.play(lm.mv, lm.promotion)? {
                MoveOutcome::Played { draw_claimable, .. } => {
                    print_board(game)?;
                    if draw_claimable {
                        println!("Position repeated: 'claim' ends the game as a draw");
                    }
                }
                MoveOutcome::PromotionRequired => {
                    println!("Promotion: repeat the move with n, b, r or q appended");
                }
            }
        }
        Command::Back => step(game, Direction::Back)?,
        Command::Forward => step(game, Direction::Forward)?,
        Command::Goto(id) => {
            game.set_to_node(id)?;
            print_board(game)?;
        }
        Command::Trim => {
            let removed = game.trim_from_current()?;
            println!("Removed {} positions", removed.len());
            print_board(game)?;
        }
        Command::Promote => match game.promote_variation()? {
            Some(branch) => println!("Promoted variation starting at node {}", branch),
            None => println!("Already on the main line"),
        },
        Command::Flip => {
            game.flip_board()?;
            print_board(game)?;
        }
        Command::Hint => {
            if !game.request_engine_move()? {
                println!("The game is over");
            }
        }
        Command::Stop => game.stop_engine()?,
        Command::Wait => {
            let reply = game.wait_engine_move();
            report_engine(game, reply)?;
        }
        Command::TakeBack => {
            if game.take_back()? {
                print_board(game)?;
            }
        }
        Command::Claim => {
            if game.claim_draw()? {
                println!("Draw by repetition");
            } else {
                println!("No draw to claim");
            }
        }
        Command::Restart { keep_tree } => {
            game.restart(keep_tree)?;
            print_board(game)?;
        }
        Command::Board => print_board(game)?,
        Command::Tree => {
            let slice = game.visible_slice()?;
            println!("{}", serde_json::to_string_pretty(&slice)?);
        }
        Command::Quit => {}
    }
    Ok(())
}

fn step<T: Transport>(game: &mut Game<T>, direction: Direction) -> anyhow::Result<()> {
    if game.step(direction)? {
        print_board(game)?;
    } else {
        println!("No move there");
    }
    Ok(())
}

fn report_engine<T: Transport>(
    game: &Game<T>,
    reply: Result<Option<EngineReply>, GameError>,
) -> anyhow::Result<()> {
    match reply? {
        Some(EngineReply::Played(_)) => {
            let position = game.current_position()?;
            println!("Engine plays {}", position.notation());
            print_board(game)?;
        }
        Some(EngineReply::Hint(lm)) => {
            println!("Hint: {}", lm.to_coordinate(game.orientation()));
        }
        None => {}
    }
    Ok(())
}

fn print_board<T: Transport>(game: &Game<T>) -> anyhow::Result<()> {
    let position = game.current_position()?;
    print!("{}", game.board()?.render(game.orientation()));
    if !position.is_root() {
        let parent_is_root = game.tree().parent(game.current())? == Some(chess_board::NodeId::ROOT);
        println!("Last move: {}", position.label(parent_is_root));
    }
    println!(
        "Node {}, {} to move, {:?}",
        game.current(),
        game.side_to_move(),
        game.status()
    );
    Ok(())
}
