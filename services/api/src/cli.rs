use crate::demo::{run_demo, DemoArgs};
use crate::server;
use crate::verify::{run_verify, VerifyArgs};
use admission_ai::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Admission Verification Service",
    about = "Verify applicant test documents with multiple AI providers",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Verify one application's documents from the document root and print the decision
    Verify(VerifyArgs),
    /// Run scripted verifications end to end without contacting any provider
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Verify(args) => run_verify(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn verify_requires_documents() {
        let parsed = Cli::try_parse_from([
            "admission-ai-api",
            "verify",
            "--application-id",
            "9",
            "--test-name",
            "ACT",
            "--test-score",
            "35",
        ]);
        assert!(parsed.is_err());

        let parsed = Cli::try_parse_from([
            "admission-ai-api",
            "verify",
            "--application-id",
            "9",
            "--test-name",
            "ACT",
            "--test-score",
            "35",
            "--identity",
            "9/id.png",
            "--test-result",
            "9/act.pdf",
        ])
        .expect("arguments parse");
        assert!(matches!(parsed.command, Some(Command::Verify(_))));
    }
}
