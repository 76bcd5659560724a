use directories::ProjectDirs;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";
const DEFAULT_REGISTRY_CONCURRENCY: usize = 16;
const DEFAULT_VERIFY_SAMPLES: usize = 10;
const DEFAULT_CACHE_MAX_AGE_DAYS: u64 = 1;

#[derive(Debug, Clone)]
pub struct DeptreeConfig {
    pub cache_dir: PathBuf,
    pub cache_max_age_days: u64,
    pub registry: String,
    pub registry_concurrency: usize,
    pub max_depth: Option<usize>,
    pub verify_samples: usize,
    pub verbose: bool,
}

impl Default for DeptreeConfig {
    fn default() -> Self {
        DeptreeConfig {
            cache_dir: PathBuf::from(".deptree").join("cache"),
            cache_max_age_days: DEFAULT_CACHE_MAX_AGE_DAYS,
            registry: DEFAULT_REGISTRY.to_string(),
            registry_concurrency: DEFAULT_REGISTRY_CONCURRENCY,
            max_depth: None,
            verify_samples: DEFAULT_VERIFY_SAMPLES,
            verbose: false,
        }
    }
}

impl DeptreeConfig {
    pub fn from_env() -> Self {
        let mut config = Self::from_vars(|key| env::var(key).ok());

        if let Some(dirs) = ProjectDirs::from("io", "deptree", "deptree") {
            config.cache_dir = dirs.cache_dir().to_path_buf();
        }

        config
    }

    /// Builds a config from `var`, which answers like `std::env::var`.
    /// Values that do not parse fall back to the defaults.
    pub fn from_vars<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = DeptreeConfig::default();

        if let Some(registry) = read_registry(&var) {
            config.registry = registry;
        }

        if let Some(value) = read_number::<usize, _>(&var, "DEPTREE_REGISTRY_CONCURRENCY")
            && value > 0
        {
            config.registry_concurrency = value;
        }

        config.max_depth = read_number(&var, "DEPTREE_MAX_DEPTH");

        if let Some(value) = read_number(&var, "DEPTREE_VERIFY_SAMPLES") {
            config.verify_samples = value;
        }

        if let Some(value) = read_number(&var, "DEPTREE_CACHE_MAX_AGE_DAYS") {
            config.cache_max_age_days = value;
        }

        config.verbose = read_bool(&var, "DEPTREE_VERBOSE");

        config
    }

    pub fn registry_url(&self) -> &str {
        self.registry.trim_end_matches('/')
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.cache_dir.join("metadata")
    }
}

fn read_registry<F>(var: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let value = var("DEPTREE_REGISTRY")
        .or_else(|| var("NPM_CONFIG_REGISTRY"))
        .or_else(|| var("npm_config_registry"))?;

    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn read_number<T, F>(var: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    var(key)?.trim().parse::<T>().ok()
}

fn read_bool<F>(var: &F, key: &str) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        None => false,
    }
}
