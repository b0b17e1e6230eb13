//! Where configuration lives on disk
//!
//! Root config goes under the config directory, per-context config under the
//! data directory. Both honour an explicit `RELWATCH_*_DIR` override, then
//! the XDG variables on Unix, then the platform default from `directories`.

use std::path::{Path, PathBuf};

const APP_NAME: &str = "relwatch";

#[derive(Debug, Clone, Copy)]
enum BaseDir {
    Config,
    Data,
}

impl BaseDir {
    fn override_var(self) -> &'static str {
        match self {
            BaseDir::Config => "RELWATCH_CONFIG_DIR",
            BaseDir::Data => "RELWATCH_DATA_DIR",
        }
    }

    #[cfg(not(windows))]
    fn xdg_var(self) -> &'static str {
        match self {
            BaseDir::Config => "XDG_CONFIG_HOME",
            BaseDir::Data => "XDG_DATA_HOME",
        }
    }

    #[cfg(not(windows))]
    fn under_home(self, home: &Path) -> PathBuf {
        match self {
            BaseDir::Config => home.join(".config"),
            BaseDir::Data => home.join(".local").join("share"),
        }
    }
}

fn resolve(base: BaseDir, env: impl Fn(&str) -> Option<String>) -> PathBuf {
    match env(base.override_var()).filter(|dir| !dir.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => platform_dir(base, env),
    }
}

#[cfg(not(windows))]
fn platform_dir(base: BaseDir, env: impl Fn(&str) -> Option<String>) -> PathBuf {
    use directories::BaseDirs;

    env(base.xdg_var())
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| BaseDirs::new().map(|dirs| base.under_home(dirs.home_dir())))
        .unwrap_or_else(|| base.under_home(Path::new(".")))
        .join(APP_NAME)
}

#[cfg(windows)]
fn platform_dir(base: BaseDir, _env: impl Fn(&str) -> Option<String>) -> PathBuf {
    use directories::ProjectDirs;

    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| match base {
            BaseDir::Config => dirs.config_dir().to_path_buf(),
            BaseDir::Data => dirs.data_dir().to_path_buf(),
        })
        .unwrap_or_else(|| PathBuf::from(".").join(APP_NAME))
}

pub fn config_dir() -> PathBuf {
    resolve(BaseDir::Config, |key| std::env::var(key).ok())
}

pub fn data_dir() -> PathBuf {
    resolve(BaseDir::Data, |key| std::env::var(key).ok())
}

pub fn root_config_path() -> PathBuf {
    config_dir().join("config.yaml")
}

/// Config file for one kubeconfig context
pub fn context_config_path(context: &str) -> PathBuf {
    data_dir()
        .join("contexts")
        .join(context_dir_name(context))
        .join("config.yaml")
}

/// Directory name for a context; EKS contexts are ARNs full of `:` and `/`
fn context_dir_name(context: &str) -> String {
    let name: String = context
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.is_empty() || name.chars().all(|c| c == '.') {
        name.replace('.', "_") + "_"
    } else {
        name
    }
}

pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
