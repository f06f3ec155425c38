use std::io::BufRead;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use crate::crypto::SymmetricAlgorithm;
use crate::secrets::{ProtectedSecret, SecretArgs, TextEncoding};

#[derive(Parser)]
#[command(name = "stepvault", version, about = "Credential-gated file and database steps")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Encrypt a file with a key.
    Encrypt(FileOpts),
    /// Decrypt a file produced by `encrypt`.
    Decrypt(FileOpts),
    /// Open a database connection, optionally inside a transaction.
    Connect(ConnectOpts),
    /// Report FIPS compliance of the symmetric algorithms.
    Check(CheckOpts),
    Config(ConfigOpts),
    Version,
}

// A plain key together with a protected one is passed through; the step
// reports it as ambiguous.
#[derive(clap::Args)]
pub struct KeyOpts {
    /// Key as plain text.
    #[arg(long)]
    pub key: Option<String>,
    /// Read the key from this environment variable into a protected buffer.
    #[arg(long, value_name = "VAR", conflicts_with = "key_stdin")]
    pub key_env: Option<String>,
    /// Read the key from the first line of stdin into a protected buffer.
    #[arg(long)]
    pub key_stdin: bool,
}

impl KeyOpts {
    pub fn secret_args(&self) -> anyhow::Result<SecretArgs> {
        let protected = protected_source(self.key_env.as_deref(), self.key_stdin)?;
        Ok(SecretArgs {
            plain: self.key.clone(),
            protected,
        })
    }
}

#[derive(clap::Args)]
pub struct FileOpts {
    #[arg(short, long)]
    pub config: Option<String>,
    #[arg(short, long)]
    pub input: String,
    #[arg(short, long)]
    pub output: String,
    /// Defaults to `crypto.defaultAlgorithm`.
    #[arg(short, long)]
    pub algorithm: Option<SymmetricAlgorithm>,
    /// Defaults to `crypto.defaultEncoding`.
    #[arg(short, long)]
    pub encoding: Option<TextEncoding>,
    #[arg(long)]
    pub overwrite: bool,
    #[arg(long)]
    pub continue_on_error: bool,
    #[command(flatten)]
    pub key: KeyOpts,
}

#[derive(clap::Args)]
pub struct ConnectOpts {
    #[arg(short, long)]
    pub config: Option<String>,
    #[arg(short, long, default_value = "sqlite")]
    pub provider: String,
    #[arg(long)]
    pub connection_string: Option<String>,
    /// Read the connection string from this environment variable into a
    /// protected buffer.
    #[arg(long, value_name = "VAR")]
    pub connection_string_env: Option<String>,
    /// Open the connection without beginning a transaction.
    #[arg(long)]
    pub no_transaction: bool,
    /// SQL statements to run once the connection is ready.
    #[arg(short = 'x', long = "execute", value_name = "SQL")]
    pub statements: Vec<String>,
    /// Commit the transaction instead of rolling it back.
    #[arg(long)]
    pub commit: bool,
    #[arg(long)]
    pub continue_on_error: bool,
}

impl ConnectOpts {
    pub fn secret_args(&self) -> anyhow::Result<SecretArgs> {
        let protected = protected_source(self.connection_string_env.as_deref(), false)?;
        Ok(SecretArgs {
            plain: self.connection_string.clone(),
            protected,
        })
    }
}

#[derive(clap::Args)]
pub struct CheckOpts {
    /// Algorithm to check; all of them when omitted.
    pub algorithm: Option<SymmetricAlgorithm>,
}

#[derive(clap::Args)]
pub struct ConfigOpts {
    #[arg(short, long)]
    pub config: Option<String>,
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    Show,
    Validate,
    Init,
}

fn protected_source(env_var: Option<&str>, stdin: bool) -> anyhow::Result<Option<ProtectedSecret>> {
    if let Some(var) = env_var {
        let value = std::env::var(var)
            .with_context(|| format!("Environment variable '{var}' is not set"))?;
        return Ok(Some(ProtectedSecret::new(value)));
    }

    if stdin {
        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read secret from stdin")?;
        let trimmed = line.trim_end_matches(['\r', '\n']).to_string();
        line.clear();
        if trimmed.is_empty() {
            bail!("No secret received on stdin");
        }
        return Ok(Some(ProtectedSecret::new(trimmed)));
    }

    Ok(None)
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
    fn parses_encrypt_with_algorithm() {
        let cli = Cli::parse_from([
            "stepvault", "encrypt", "-i", "a.bin", "-o", "b.bin", "-a", "3des", "--key", "k1",
            "--overwrite",
        ]);
        match cli.command {
            Commands::Encrypt(opts) => {
                assert_eq!(opts.algorithm, Some(SymmetricAlgorithm::TripleDes));
                assert!(opts.overwrite);
                let args = opts.key.secret_args().unwrap();
                assert_eq!(args.plain.as_deref(), Some("k1"));
                assert!(args.protected.is_none());
            }
            _ => panic!("expected encrypt"),
        }
    }

    #[test]
    fn key_env_and_stdin_conflict() {
        let result = Cli::try_parse_from([
            "stepvault", "decrypt", "-i", "a", "-o", "b", "--key-env", "K", "--key-stdin",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn missing_key_env_var_is_an_error() {
        let opts = KeyOpts {
            key: None,
            key_env: Some("STEPVAULT_TEST_UNSET_KEY_VAR".into()),
            key_stdin: false,
        };
        assert!(opts.secret_args().is_err());
    }
}
