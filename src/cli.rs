//! Command Line Interface (CLI) arguments.

use clap::Parser;

/// Tweet statistics server command line interface
#[derive(Clone, Debug, Parser)]
pub struct CommandLineArgs {
    /// The IP address on which the server should listen
    #[arg(long, default_value = "0.0.0.0", env = "TWEETSTATS_HOST")]
    pub host: String,
    /// The port to which the server should bind
    #[arg(long, default_value_t = 8080, env = "TWEETSTATS_PORT")]
    pub port: u16,
    /// Flag indicating whether HTTPS should be used
    #[arg(long, default_value_t = false, env = "TWEETSTATS_HTTPS")]
    pub https: bool,
    /// Path to the certificate file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/tweetstats/certs/cert.pem",
        env = "TWEETSTATS_CERT_FILE"
    )]
    pub cert_file: String,
    /// Path to the key file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/tweetstats/certs/key.pem",
        env = "TWEETSTATS_KEY_FILE"
    )]
    pub key_file: String,
    /// Maximum time in seconds to wait for requests to complete upon receiving `ctrl+c` signal.
    #[arg(long, default_value_t = 60, env = "TWEETSTATS_SHUTDOWN_TIMEOUT")]
    pub graceful_shutdown_timeout: u64,
    /// Whether to enable sending traces to Jaeger.
    #[arg(long, default_value_t = false, env = "TWEETSTATS_ENABLE_JAEGER")]
    pub enable_jaeger: bool,
    /// Path or `file:` URI of the SQLite database holding the tweet corpus
    #[arg(long, default_value = "file:social_net.db", env = "DB_URL")]
    pub db_url: String,
    /// Sentiment140-format CSV file to load into the corpus before serving
    #[arg(long, env = "TWEETSTATS_IMPORT_CSV")]
    pub import_csv: Option<String>,
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = CommandLineArgs::try_parse_from(["tweetstats"]).unwrap();
        assert_eq!(8080, args.port);
        assert!(!args.https);
        assert!(args.import_csv.is_none());
    }

    #[test]
    fn db_url() {
        let args =
            CommandLineArgs::try_parse_from(["tweetstats", "--db-url", "file:/tmp/corpus.db"])
                .unwrap();
        assert_eq!("file:/tmp/corpus.db", args.db_url);
    }
}
