mod commands;
mod terminal;

use commands::{CommandLine, Commands, check, scan};
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();
    let quiet: bool = commands.quiet;

    let _log_guard = logging::init_logging(commands.debug, commands.log_file.as_deref())?;
    print::banner(quiet);

    match commands.command {
        Commands::Scan(args) => {
            print::header("preparing scan", quiet);
            scan::scan(args, quiet).await
        }
        Commands::Check(args) => {
            print::header("checking engines", quiet);
            check::check(args, quiet).await
        }
    }
}
