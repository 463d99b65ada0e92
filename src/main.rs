use clap::Parser;
use stratus::cli::{
    handle_completions, handle_config_init, handle_config_show, load_config, run_simulate, Cli,
    Commands, ConfigCommands,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result: anyhow::Result<()> = match cli.command {
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Init(args) => handle_config_init(&args),
            ConfigCommands::Show(args) => handle_config_show(&args).map(|output| {
                print!("{}", output);
            }),
        },
        Commands::Simulate(args) => simulate(args).await,
        Commands::Completions(args) => {
            handle_completions(&args, &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn simulate(args: stratus::cli::SimulateArgs) -> anyhow::Result<()> {
    let mut config = load_config(&args.config)?;
    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }
    stratus::logging::init_tracing(&config.logging).map_err(|e| anyhow::anyhow!(e))?;

    let output = run_simulate(&args, &config).await?;
    println!("{}", output);
    Ok(())
}
