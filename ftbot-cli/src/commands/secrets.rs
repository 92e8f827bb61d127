//! Secrets command - manage the credentials file

use clap::Subcommand;
use ftbot_core::Secrets;

/// Secrets subcommands
#[derive(Subcommand, Debug)]
pub enum SecretsCommand {
    /// Create a template secrets file with 0600 permissions
    Init,
}

impl SecretsCommand {
    /// Execute the secrets command
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            SecretsCommand::Init => {
                let path = Secrets::create_template()?;
                println!("Created secrets template at {}", path.display());
                println!("Fill in your tokens, or set GITHUB_TOKEN and TWITTER_ACCESS_TOKEN instead.");
            }
        }
        Ok(())
    }
}
