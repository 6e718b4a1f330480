use clap::Parser;
use log::info;
use server::board::Board;
use server::board_file::{load_board, random_board, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use server::config::{ServerConfig, DEFAULT_MAX_CLIENTS};
use server::network::Server;
use shared::DEFAULT_PORT;
use std::path::PathBuf;
use std::time::Duration;

/// Board dimensions given on the command line as `WIDTH,HEIGHT`
#[derive(Debug, Clone, Copy)]
struct BoardSize {
    width: usize,
    height: usize,
}

fn parse_size(value: &str) -> Result<BoardSize, String> {
    let (width, height) = value
        .split_once(',')
        .ok_or_else(|| format!("expected WIDTH,HEIGHT, got `{}`", value))?;

    let parse = |part: &str| match part.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("`{}` is not a positive integer", part)),
    };

    Ok(BoardSize {
        width: parse(width)?,
        height: parse(height)?,
    })
}

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Keep players connected after they dig up a bomb
    #[arg(long)]
    debug: bool,
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Generate a random board of this size
    #[arg(long, value_name = "WIDTH,HEIGHT", value_parser = parse_size, conflicts_with = "file")]
    size: Option<BoardSize>,
    /// Load the board from this file
    #[arg(short, long)]
    file: Option<PathBuf>,
    /// Maximum number of simultaneously connected players
    #[arg(long, default_value_t = DEFAULT_MAX_CLIENTS)]
    max_clients: usize,
    /// Disconnect players that stay silent for this many seconds
    #[arg(long, value_name = "SECS")]
    idle_timeout: Option<u64>,
}

fn build_board(args: &Args) -> Result<Board, Box<dyn std::error::Error>> {
    if let Some(path) = &args.file {
        return Ok(load_board(path)?);
    }

    let size = args.size.unwrap_or(BoardSize {
        width: DEFAULT_WIDTH,
        height: DEFAULT_HEIGHT,
    });
    let board = random_board(size.width, size.height, &mut rand::thread_rng())
        .ok_or("board dimensions must be positive")?;
    info!(
        "Generated random {}x{} board with {} bombs",
        size.width,
        size.height,
        board.bomb_count()
    );
    Ok(board)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let board = build_board(&args)?;
    let config = ServerConfig::default()
        .debug(args.debug)
        .max_clients(args.max_clients)
        .idle_timeout(args.idle_timeout.map(Duration::from_secs));

    let address = format!("{}:{}", args.host, args.port);
    let server = Server::bind(&address, board, config).await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received Ctrl+C, shutting down gracefully...");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_size() {
        let size = parse_size("7,6").unwrap();
        assert_eq!((size.width, size.height), (7, 6));
        assert!(parse_size("7").is_err());
        assert!(parse_size("0,6").is_err());
        assert!(parse_size("a,b").is_err());
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["minesweeper-server"]);
        assert!(!args.debug);
        assert_eq!(args.port, DEFAULT_PORT);
        assert!(args.file.is_none());
        assert!(args.size.is_none());
    }

    #[test]
    fn test_size_and_file_conflict() {
        let result = Args::try_parse_from([
            "minesweeper-server",
            "--size",
            "3,3",
            "--file",
            "board",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_random_board_from_size() {
        let args = Args::parse_from(["minesweeper-server", "--debug", "--size", "4,5"]);
        assert!(args.debug);
        let board = build_board(&args).unwrap();
        assert_eq!(board.dimensions(), (4, 5));
    }
}
