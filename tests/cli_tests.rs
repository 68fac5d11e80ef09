/// Binary smoke tests: flag handling and configuration failures that stop
/// the process before any connection is attempted.

#[cfg(test)]
mod cli_tests {
    use assert_cmd::Command;
    use pgsh::config::{Config, SslMode};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn pgsh() -> Command {
        let mut cmd = Command::cargo_bin("pgsh").unwrap();
        cmd.env_remove("RUST_LOG").env_remove("PGPASSWORD");
        cmd
    }

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_help_lists_connection_flags() {
        let output = pgsh().arg("--help").output().unwrap();
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("--host"));
        assert!(stdout.contains("--dbname"));
        assert!(stdout.contains("--sslmode"));
    }

    #[test]
    fn test_missing_config_file_fails() {
        let output = pgsh()
            .args(["--config", "/nonexistent/pgsh/config.toml"])
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(2));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.starts_with("pgsh: error: Configuration error"));
    }

    #[test]
    fn test_invalid_config_file_fails() {
        let file = config_file("[session]\nmax_rows = 0\n");
        let output = pgsh()
            .arg("--config")
            .arg(file.path())
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(2));
        assert!(String::from_utf8_lossy(&output.stderr).contains("max_rows must be at least 1"));
    }

    #[test]
    fn test_flag_validation_runs_after_overrides() {
        let file = config_file("");
        let output = pgsh()
            .arg("--config")
            .arg(file.path())
            .args(["--max-rows", "0"])
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(2));
    }

    #[test]
    fn test_unknown_sslmode_is_a_usage_error() {
        let output = pgsh().args(["--sslmode", "allow"]).output().unwrap();
        assert!(!output.status.success());
    }

    #[test]
    fn test_load_config_file() {
        let file = config_file(
            "[connection]\nhost = \"db.example\"\nsslmode = \"require\"\n\n[session]\nexpanded = true\n",
        );
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.connection.host, "db.example");
        assert_eq!(config.connection.sslmode, SslMode::Require);
        assert_eq!(config.connection.port, 5432);
        assert!(config.session.expanded);
    }
}
