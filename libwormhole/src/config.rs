use crate::error::{Error, Result};
use crate::utils::{absolutize, expand_tilde, is_within};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory watched when none is given.
pub const DEFAULT_ROOT: &str = "/opt/hole";
pub const LOG_FILE_NAME: &str = "file_modified_log.log";
pub const DEFAULT_INTERVAL_SECS: u64 = 60;

pub const LOG_PATH_ENV: &str = "WORMHOLE_LOG_PATH";
pub const INTERVAL_ENV: &str = "WORMHOLE_INTERVAL_SECS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchMode {
    /// The root and every directory below it, following structural changes.
    #[default]
    Recursive,
    /// Just the given path (file or directory), no structural tracking.
    Single,
}

/// Where flushed paths are copied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub host: String,
    pub user: Option<String>,
    pub dir: String,
}

impl RemoteTarget {
    /// Build a target from the optional CLI pieces.  `None` when no host is set.
    pub fn from_parts(
        host: Option<String>,
        user: Option<String>,
        dir: Option<String>,
    ) -> Result<Option<Self>> {
        match host {
            Some(host) if !host.trim().is_empty() => Ok(Some(Self {
                host,
                user,
                dir: dir.unwrap_or_else(|| ".".to_string()),
            })),
            _ if user.is_some() || dir.is_some() => Err(Error::Config(
                "a remote user or directory needs a remote host".into(),
            )),
            _ => Ok(None),
        }
    }

    /// `user@host:dir`, or `host:dir` without a login.
    pub fn destination(&self) -> String {
        match &self.user {
            Some(u) => format!("{u}@{}:{}", self.host, self.dir),
            None => format!("{}:{}", self.host, self.dir),
        }
    }
}

/// Program plus leading arguments of the transfer command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl TransferCommand {
    /// Split a shell-style command line, e.g. `scp -q -P 2222`.
    pub fn parse(line: &str) -> Result<Self> {
        let mut words = shlex::split(line)
            .ok_or_else(|| Error::Config(format!("unbalanced quoting in `{line}`")))?
            .into_iter();
        let program = words
            .next()
            .ok_or_else(|| Error::Config("empty transfer command".into()))?;
        Ok(Self {
            program,
            args: words.collect(),
        })
    }
}

impl Default for TransferCommand {
    fn default() -> Self {
        Self {
            program: "scp".to_string(),
            args: Vec::new(),
        }
    }
}

/// Raw, optional settings as they arrive from the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub root: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub interval_secs: Option<u64>,
    pub host: Option<String>,
    pub user: Option<String>,
    pub remote_dir: Option<String>,
    pub transfer_cmd: Option<String>,
    pub single: bool,
}

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    pub log_file: PathBuf,
    pub interval: Duration,
    pub remote: Option<RemoteTarget>,
    pub transfer: TransferCommand,
    pub mode: WatchMode,
}

impl Config {
    /// Resolve every setting from overrides, environment and defaults, then validate.
    pub fn load(o: Overrides) -> Result<Self> {
        let root = o.root.unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT));
        let cfg = Self {
            root: absolutize(&expand_tilde(&root))?,
            log_file: Self::resolve_log_file(o.log_file.as_deref())?,
            interval: Self::resolve_interval(o.interval_secs)?,
            remote: RemoteTarget::from_parts(o.host, o.user, o.remote_dir)?,
            transfer: match o.transfer_cmd {
                Some(line) => TransferCommand::parse(&line)?,
                None => TransferCommand::default(),
            },
            mode: if o.single {
                WatchMode::Single
            } else {
                WatchMode::Recursive
            },
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Priority:
    /// 1. explicit path (`--logfile`)
    /// 2. `WORMHOLE_LOG_PATH` env-var
    /// 3. XDG data dir (`~/.local/share/wormhole/file_modified_log.log`)
    /// 4. `./file_modified_log.log` when no XDG dir can be located
    pub fn resolve_log_file(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(p) = explicit {
            return Ok(absolutize(&expand_tilde(p))?);
        }
        if let Some(val) = std::env::var_os(LOG_PATH_ENV) {
            return Ok(absolutize(&expand_tilde(Path::new(&val)))?);
        }

        if std::env::var_os("HOME").is_some() || std::env::var_os("XDG_DATA_HOME").is_some() {
            if let Some(dirs) = ProjectDirs::from("io", "Wormhole", "wormhole") {
                let dir = dirs.data_dir();
                std::fs::create_dir_all(dir)?;
                return Ok(dir.join(LOG_FILE_NAME));
            }
        }

        Ok(absolutize(Path::new(LOG_FILE_NAME))?)
    }

    /// `--interval` seconds, else `WORMHOLE_INTERVAL_SECS`, else the default.
    pub fn resolve_interval(explicit: Option<u64>) -> Result<Duration> {
        let secs = match explicit {
            Some(s) => s,
            None => match std::env::var(INTERVAL_ENV) {
                Ok(v) => v.trim().parse::<u64>().map_err(|e| {
                    Error::Config(format!("{INTERVAL_ENV}=`{v}` is not a number of seconds: {e}"))
                })?,
                Err(_) => DEFAULT_INTERVAL_SECS,
            },
        };
        Ok(Duration::from_secs(secs))
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::Config("idle interval must be greater than zero".into()));
        }
        // every append to a log inside the tree would be a change event of its own
        if is_within(&self.log_file, &self.root) {
            return Err(Error::Config(format!(
                "log file {} must not live inside the watched path {}",
                self.log_file.display(),
                self.root.display()
            )));
        }
        Ok(())
    }
}
