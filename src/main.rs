use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "taskdeck", version, about = "Personal task tracking server")]
struct Cli {
    /// Directory holding config/, state/, logs/ and uploads/.
    #[arg(long, value_name = "DIR")]
    workspace: Option<PathBuf>,

    /// Overrides the configured port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let workspace = match cli.workspace {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    taskdeck::run(&workspace, cli.port).await?;
    Ok(())
}
