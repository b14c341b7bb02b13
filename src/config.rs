//! Settings resolved from the environment
//!
//! Every operation gets its own settings struct holding exactly the values
//! it needs. [`Settings::from_lookup`] reads the environment once, applies
//! defaults, and reports every missing required variable in a single error
//! (together with any malformed value) before the operation touches the
//! database or the filesystem.

use std::path::PathBuf;

use crate::cli::Operation;
use crate::error::ConfigError;
use crate::tools;
use crate::validation::validate_pg_identifier;

// =============================================================================
// Defaults
// =============================================================================

pub const DEFAULT_PG_PORT: u16 = 5432;
pub const DEFAULT_PG_USER: &str = "postgres";
pub const DEFAULT_TC_SECURE_PORT: u16 = 8443;
pub const DEFAULT_TC_MANAGER_USER: &str = "rpauser";
pub const DEFAULT_IIQ_VERSION: &str = "8.4";

/// Manager password file, relative to `SECRETS_HOME`
pub const MANAGER_PASSWORD_FILE: &str = "rpauser.pass";

// =============================================================================
// Settings
// =============================================================================

/// Fully resolved settings for one invocation
#[derive(Debug, Clone)]
pub enum Settings {
    Init(InitSettings),
    Backup(BackupSettings),
    Deploy(DeploySettings),
    Reload(ReloadSettings),
}

/// PostgreSQL client settings (`psql`, `pg_dump`)
#[derive(Debug, Clone)]
pub struct PostgresSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password_file: PathBuf,
    pub psql: PathBuf,
    pub pg_dump: PathBuf,
}

/// Build script settings
#[derive(Debug, Clone)]
pub struct BuildSettings {
    /// Services standard build (SSB) checkout containing `build.sh`
    pub ssb_home: PathBuf,
    /// Exported to the build script as `SPTARGET`
    pub instance_name: String,
}

#[derive(Debug, Clone)]
pub struct InitSettings {
    pub build: BuildSettings,
    pub postgres: PostgresSettings,
    pub iiq_version: String,
    /// Database hostname written into the instance IIQ properties
    pub db_host: String,
}

#[derive(Debug, Clone)]
pub struct BackupSettings {
    pub backup_home: PathBuf,
    pub postgres: PostgresSettings,
    pub schema: String,
}

#[derive(Debug, Clone)]
pub struct DeploySettings {
    pub build: BuildSettings,
    pub catalina_base: PathBuf,
}

/// Tomcat manager settings
#[derive(Debug, Clone)]
pub struct TomcatSettings {
    pub host: String,
    pub secure_port: u16,
    pub manager_user: String,
    pub secrets_home: PathBuf,
    pub accept_invalid_certs: bool,
}

impl TomcatSettings {
    pub fn password_file(&self) -> PathBuf {
        self.secrets_home.join(MANAGER_PASSWORD_FILE)
    }
}

#[derive(Debug, Clone)]
pub struct ReloadSettings {
    pub tomcat: TomcatSettings,
}

/// `BACKUP_HOME`, if set, so logging can start before the other settings resolve
pub fn backup_home<F>(lookup: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    EnvReader::new(&lookup).optional("BACKUP_HOME").map(PathBuf::from)
}

impl Settings {
    /// Resolve settings from the process environment
    pub fn from_env(operation: &Operation, db_host: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(operation, db_host, |key| std::env::var(key).ok())
    }

    /// Resolve settings through `lookup`, which maps a variable name to its value
    pub fn from_lookup<F>(operation: &Operation, db_host: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut env = EnvReader::new(&lookup);
        let backup_home = env.required_path("BACKUP_HOME");

        let settings = match operation {
            Operation::InitIiq => {
                let build = env.build();
                let postgres = env.postgres();
                let iiq_version = env
                    .optional("IIQ_VERSION")
                    .unwrap_or_else(|| DEFAULT_IIQ_VERSION.to_string());
                if !build.instance_name.is_empty() {
                    env.check(validate_pg_identifier(&build.instance_name, "INSTANCE_NAME"));
                }
                env.finish()?;
                Settings::Init(InitSettings {
                    build,
                    postgres,
                    iiq_version,
                    db_host: db_host.to_string(),
                })
            }
            Operation::BackupDb { schema } => {
                let postgres = env.postgres();
                env.check(validate_pg_identifier(schema, "schema"));
                env.finish()?;
                Settings::Backup(BackupSettings {
                    backup_home,
                    postgres,
                    schema: schema.clone(),
                })
            }
            Operation::DeployIiq => {
                let build = env.build();
                let catalina_base = env.required_path("CATALINA_BASE");
                env.finish()?;
                Settings::Deploy(DeploySettings {
                    build,
                    catalina_base,
                })
            }
            Operation::ReloadIiq => {
                let tomcat = env.tomcat();
                env.finish()?;
                Settings::Reload(ReloadSettings { tomcat })
            }
        };

        Ok(settings)
    }
}

// =============================================================================
// Environment reader
// =============================================================================

/// Collects missing and malformed variables instead of stopping at the first one
struct EnvReader<'a, F> {
    lookup: &'a F,
    missing: Vec<&'static str>,
    invalid: Vec<ConfigError>,
}

impl<'a, F> EnvReader<'a, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn new(lookup: &'a F) -> Self {
        Self {
            lookup,
            missing: Vec::new(),
            invalid: Vec::new(),
        }
    }

    /// Set and non-empty, or `None`
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&mut self, key: &'static str) -> String {
        match self.optional(key) {
            Some(value) => value,
            None => {
                self.missing.push(key);
                String::new()
            }
        }
    }

    fn required_path(&mut self, key: &'static str) -> PathBuf {
        PathBuf::from(self.required(key))
    }

    fn build(&mut self) -> BuildSettings {
        BuildSettings {
            ssb_home: self.required_path("SSB_HOME"),
            instance_name: self.required("INSTANCE_NAME"),
        }
    }

    /// Record a failed check; it is reported by [`EnvReader::finish`]
    fn check(&mut self, result: Result<(), ConfigError>) {
        if let Err(e) = result {
            self.invalid.push(e);
        }
    }

    fn port(&mut self, key: &str, raw: &str, default: u16) -> u16 {
        match parse_port(key, raw) {
            Ok(port) => port,
            Err(e) => {
                self.invalid.push(e);
                default
            }
        }
    }

    fn postgres(&mut self) -> PostgresSettings {
        let port = match self.optional("PG_PORT") {
            Some(raw) => self.port("PG_PORT", &raw, DEFAULT_PG_PORT),
            None => DEFAULT_PG_PORT,
        };

        PostgresSettings {
            host: self.optional("PG_HOST").unwrap_or_else(local_hostname),
            port,
            user: self
                .optional("PG_USER")
                .unwrap_or_else(|| DEFAULT_PG_USER.to_string()),
            password_file: self.required_path("POSTGRES_PASSWORD_FILE"),
            psql: tools::get_tool_path(tools::PSQL, self.lookup),
            pg_dump: tools::get_tool_path(tools::PG_DUMP, self.lookup),
        }
    }

    fn tomcat(&mut self) -> TomcatSettings {
        // TC_SECURE_PORT must be set, but an empty value selects the default port
        let secure_port = match (self.lookup)("TC_SECURE_PORT") {
            None => {
                self.missing.push("TC_SECURE_PORT");
                DEFAULT_TC_SECURE_PORT
            }
            Some(raw) if raw.trim().is_empty() => DEFAULT_TC_SECURE_PORT,
            Some(raw) => self.port("TC_SECURE_PORT", &raw, DEFAULT_TC_SECURE_PORT),
        };

        TomcatSettings {
            host: local_hostname(),
            secure_port,
            manager_user: self
                .optional("TC_MANAGER_USER")
                .unwrap_or_else(|| DEFAULT_TC_MANAGER_USER.to_string()),
            secrets_home: self.required_path("SECRETS_HOME"),
            accept_invalid_certs: self
                .optional("TC_ACCEPT_INVALID_CERTS")
                .is_some_and(|v| matches!(v.trim(), "1" | "true" | "yes")),
        }
    }

    fn finish(self) -> Result<(), ConfigError> {
        if !self.missing.is_empty() {
            return Err(ConfigError::MissingVars {
                vars: self.missing,
                invalid: self.invalid,
            });
        }
        // At most one malformed value per operation
        self.invalid.into_iter().next().map_or(Ok(()), Err)
    }
}

fn parse_port(field: &str, raw: &str) -> Result<u16, ConfigError> {
    match raw.trim().parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: raw.to_string(),
            reason: "expected a port number between 1 and 65535".to_string(),
        }),
    }
}

/// Hostname of the local machine (`uname -n`), or `localhost` if unavailable
pub fn local_hostname() -> String {
    let mut buf = [0u8; 256];
    // SAFETY: buf is a valid writable buffer of buf.len() bytes
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if rc != 0 {
        return "localhost".to_string();
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    match String::from_utf8_lossy(&buf[..end]).trim() {
        "" => "localhost".to_string(),
        name => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn backup_op() -> Operation {
        Operation::BackupDb {
            schema: "identityiq".to_string(),
        }
    }

    #[test]
    fn test_backup_defaults() {
        let env = lookup(&[
            ("BACKUP_HOME", "/var/backups/iiq"),
            ("POSTGRES_PASSWORD_FILE", "/run/secrets/pg"),
        ]);
        let Settings::Backup(s) = Settings::from_lookup(&backup_op(), "db", env).unwrap() else {
            panic!("expected backup settings");
        };
        assert_eq!(s.backup_home, PathBuf::from("/var/backups/iiq"));
        assert_eq!(s.schema, "identityiq");
        assert_eq!(s.postgres.host, local_hostname());
        assert_eq!(s.postgres.port, 5432);
        assert_eq!(s.postgres.user, "postgres");
    }

    #[test]
    fn test_postgres_overrides() {
        let env = lookup(&[
            ("BACKUP_HOME", "/b"),
            ("POSTGRES_PASSWORD_FILE", "/p"),
            ("PG_HOST", "pg.internal"),
            ("PG_PORT", "6543"),
            ("PG_USER", "iiq_admin"),
            ("PSQL_BIN", "/opt/pg/bin/psql"),
            ("PG_DUMP_BIN", "/opt/pg/bin/pg_dump"),
        ]);
        let Settings::Backup(s) = Settings::from_lookup(&backup_op(), "db", env).unwrap() else {
            panic!("expected backup settings");
        };
        assert_eq!(s.postgres.host, "pg.internal");
        assert_eq!(s.postgres.port, 6543);
        assert_eq!(s.postgres.user, "iiq_admin");
        assert_eq!(s.postgres.psql, PathBuf::from("/opt/pg/bin/psql"));
        assert_eq!(s.postgres.pg_dump, PathBuf::from("/opt/pg/bin/pg_dump"));
    }

    #[test]
    fn test_all_missing_vars_reported_together() {
        let err = Settings::from_lookup(&Operation::InitIiq, "db", lookup(&[])).unwrap_err();
        let ConfigError::MissingVars { vars, .. } = err else {
            panic!("expected MissingVars, got {err:?}");
        };
        assert_eq!(
            vars,
            vec!["BACKUP_HOME", "SSB_HOME", "INSTANCE_NAME", "POSTGRES_PASSWORD_FILE"]
        );
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let env = lookup(&[
            ("BACKUP_HOME", "/b"),
            ("SSB_HOME", ""),
            ("INSTANCE_NAME", "iiq"),
            ("CATALINA_BASE", "/opt/tomcat"),
        ]);
        let err = Settings::from_lookup(&Operation::DeployIiq, "db", env).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVars { ref vars, .. } if vars == &["SSB_HOME"]));
    }

    #[test]
    fn test_deploy_does_not_need_database() {
        let env = lookup(&[
            ("BACKUP_HOME", "/b"),
            ("SSB_HOME", "/ssb"),
            ("INSTANCE_NAME", "iiq_dev"),
            ("CATALINA_BASE", "/opt/tomcat"),
        ]);
        let Settings::Deploy(s) = Settings::from_lookup(&Operation::DeployIiq, "db", env).unwrap()
        else {
            panic!("expected deploy settings");
        };
        assert_eq!(s.build.instance_name, "iiq_dev");
        assert_eq!(s.catalina_base, PathBuf::from("/opt/tomcat"));
    }

    #[test]
    fn test_init_settings() {
        let env = lookup(&[
            ("BACKUP_HOME", "/b"),
            ("SSB_HOME", "/ssb"),
            ("INSTANCE_NAME", "iiq_dev"),
            ("POSTGRES_PASSWORD_FILE", "/p"),
        ]);
        let Settings::Init(s) = Settings::from_lookup(&Operation::InitIiq, "mydb", env).unwrap()
        else {
            panic!("expected init settings");
        };
        assert_eq!(s.iiq_version, "8.4");
        assert_eq!(s.db_host, "mydb");
    }

    #[test]
    fn test_init_rejects_unsafe_instance_name() {
        let env = lookup(&[
            ("BACKUP_HOME", "/b"),
            ("SSB_HOME", "/ssb"),
            ("INSTANCE_NAME", "iiq; DROP SCHEMA public"),
            ("POSTGRES_PASSWORD_FILE", "/p"),
        ]);
        let err = Settings::from_lookup(&Operation::InitIiq, "db", env).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "INSTANCE_NAME"));
    }

    #[test]
    fn test_backup_rejects_path_like_schema() {
        let env = lookup(&[("BACKUP_HOME", "/b"), ("POSTGRES_PASSWORD_FILE", "/p")]);
        let op = Operation::BackupDb {
            schema: "../../etc/passwd".to_string(),
        };
        assert!(Settings::from_lookup(&op, "db", env).is_err());
    }

    #[test]
    fn test_invalid_port() {
        let env = lookup(&[
            ("BACKUP_HOME", "/b"),
            ("POSTGRES_PASSWORD_FILE", "/p"),
            ("PG_PORT", "postgres"),
        ]);
        let err = Settings::from_lookup(&backup_op(), "db", env).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "PG_PORT"));
    }

    #[test]
    fn test_invalid_port_does_not_hide_missing_vars() {
        let env = lookup(&[("PG_PORT", "abc")]);
        let err = Settings::from_lookup(&Operation::InitIiq, "db", env).unwrap_err();
        let ConfigError::MissingVars { vars, invalid } = &err else {
            panic!("expected MissingVars, got {err:?}");
        };
        assert_eq!(
            vars,
            &["BACKUP_HOME", "SSB_HOME", "INSTANCE_NAME", "POSTGRES_PASSWORD_FILE"]
        );
        assert!(matches!(
            invalid.as_slice(),
            [ConfigError::InvalidValue { field, .. }] if field == "PG_PORT"
        ));
        assert!(err.to_string().contains("Invalid value for PG_PORT"));
    }

    #[test]
    fn test_invalid_names_reported_with_missing_vars() {
        let env = lookup(&[("INSTANCE_NAME", "iiq-dev"), ("BACKUP_HOME", "/b")]);
        let err = Settings::from_lookup(&Operation::InitIiq, "db", env).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("SSB_HOME"));
        assert!(message.contains("POSTGRES_PASSWORD_FILE"));
        assert!(message.contains("INSTANCE_NAME: \"iiq-dev\""));
    }

    #[test]
    fn test_backup_home_lookup() {
        assert_eq!(
            backup_home(lookup(&[("BACKUP_HOME", "/var/backups/iiq")])),
            Some(PathBuf::from("/var/backups/iiq"))
        );
        assert_eq!(backup_home(lookup(&[("BACKUP_HOME", " ")])), None);
        assert_eq!(backup_home(lookup(&[])), None);
    }

    #[test]
    fn test_tomcat_port_empty_uses_default() {
        let env = lookup(&[
            ("BACKUP_HOME", "/b"),
            ("SECRETS_HOME", "/run/secrets"),
            ("TC_SECURE_PORT", ""),
        ]);
        let Settings::Reload(s) = Settings::from_lookup(&Operation::ReloadIiq, "db", env).unwrap()
        else {
            panic!("expected reload settings");
        };
        assert_eq!(s.tomcat.secure_port, 8443);
        assert_eq!(s.tomcat.manager_user, "rpauser");
        assert!(!s.tomcat.accept_invalid_certs);
        assert_eq!(
            s.tomcat.password_file(),
            PathBuf::from("/run/secrets/rpauser.pass")
        );
    }

    #[test]
    fn test_tomcat_port_unset_is_missing() {
        let env = lookup(&[("BACKUP_HOME", "/b"), ("SECRETS_HOME", "/run/secrets")]);
        let err = Settings::from_lookup(&Operation::ReloadIiq, "db", env).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVars { ref vars, .. } if vars == &["TC_SECURE_PORT"]));
    }

    #[test]
    fn test_local_hostname_is_not_empty() {
        assert!(!local_hostname().is_empty());
    }
}
