use clap::Parser;
use miette::Result;
use bendq::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    bendq::core::logging::init_tracing(global.verbose);

    match cli.command {
        Commands::Calc(args) => bendq::cli::commands::calc::run(args, &global),
        Commands::Estimate(args) => bendq::cli::commands::estimate::run(args, &global),
        Commands::Tables(args) => bendq::cli::commands::tables::run(args, &global),
        Commands::Evals(args) => bendq::cli::commands::evals::run(args, &global),
        Commands::Config(cmd) => bendq::cli::commands::config::run(cmd, &global),
        Commands::Completions(args) => bendq::cli::commands::completions::run(args),
    }
}
