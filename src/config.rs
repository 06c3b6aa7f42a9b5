use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use directories::BaseDirs;
use serde::de::Deserializer;
use serde::Deserialize;

use crate::contact::NameOrder;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_NAME: &str = "peerbook";

#[derive(Debug, Clone)]
pub struct Config {
    pub config_path: PathBuf,
    pub server: ServerConfig,
    pub name_order: NameOrder,
    pub phone_region: Option<String>,
    pub keys: Keys,
    pub ui: UiConfig,
}

// =============================================================================
// Server Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Base URL of the directory server, e.g. `https://directory.example.com/api`
    pub base_url: String,
    /// Optional bearer token for authenticated sessions
    pub token: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

const DEFAULT_TIMEOUT_SECS: u64 = 15;

// =============================================================================
// UI Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub colors: UiColors,
}

#[derive(Debug, Clone)]
pub struct UiColors {
    pub border: RgbColor,
    pub selection_bg: RgbColor,
    pub selection_fg: RgbColor,
    pub separator: RgbColor,
    pub status_fg: RgbColor,
    pub status_bg: RgbColor,
    pub error: RgbColor,
    pub notice: RgbColor,
}

impl Default for UiColors {
    fn default() -> Self {
        Self {
            border: RgbColor::new(0x44, 0x44, 0x44),
            selection_bg: RgbColor::new(0x2a, 0x4f, 0x6e),
            selection_fg: RgbColor::new(0xee, 0xee, 0xee),
            separator: RgbColor::new(0x88, 0x88, 0x88),
            status_fg: RgbColor::new(0x10, 0x10, 0x10),
            status_bg: RgbColor::new(0xa0, 0xa0, 0xa0),
            error: RgbColor::new(0xd0, 0x45, 0x45),
            notice: RgbColor::new(0x4f, 0xa3, 0x5f),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl<'de> serde::Deserialize<'de> for RgbColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Array([u8; 3]),
            Map { r: u8, g: u8, b: u8 },
        }

        let helper = Helper::deserialize(deserializer)?;
        let (r, g, b) = match helper {
            Helper::Array(values) => (values[0], values[1], values[2]),
            Helper::Map { r, g, b } => (r, g, b),
        };
        Ok(RgbColor { r, g, b })
    }
}

// =============================================================================
// Key Bindings - Context-aware with multiple bindings per action
// =============================================================================

/// All key bindings organized by context
#[derive(Debug, Clone, Default)]
pub struct Keys {
    /// Global keys (work outside modal contexts)
    pub global: GlobalKeys,
    /// Keys for contact list navigation
    pub list: ListKeys,
    /// Keys for the contact edit form
    pub form: FormKeys,
}

#[derive(Debug, Clone)]
pub struct GlobalKeys {
    pub quit: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ListKeys {
    pub next: Vec<String>,
    pub prev: Vec<String>,
    pub edit: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FormKeys {
    pub cancel: Vec<String>,
    pub confirm: Vec<String>,
    pub save: Vec<String>,
    pub next: Vec<String>,
    pub prev: Vec<String>,
    pub toggle: Vec<String>,
}

impl Default for GlobalKeys {
    fn default() -> Self {
        Self {
            quit: vec!["q".into()],
        }
    }
}

impl Default for ListKeys {
    fn default() -> Self {
        Self {
            next: vec!["j".into(), "Down".into()],
            prev: vec!["k".into(), "Up".into()],
            edit: vec!["e".into(), "Enter".into()],
        }
    }
}

impl Default for FormKeys {
    fn default() -> Self {
        Self {
            cancel: vec!["Escape".into()],
            confirm: vec!["Enter".into()],
            save: vec!["F2".into()],
            next: vec!["Tab".into(), "Down".into()],
            prev: vec!["Backtab".into(), "Up".into()],
            toggle: vec!["Space".into()],
        }
    }
}

// =============================================================================
// Serde deserialization types (support both single string and array)
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum KeyBinding {
    Single(String),
    Multiple(Vec<String>),
}

impl KeyBinding {
    fn into_vec(self) -> Vec<String> {
        match self {
            KeyBinding::Single(s) => vec![s],
            KeyBinding::Multiple(v) => v,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct KeysFile {
    global: GlobalKeysFile,
    list: ListKeysFile,
    form: FormKeysFile,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GlobalKeysFile {
    quit: KeyBinding,
}

impl Default for GlobalKeysFile {
    fn default() -> Self {
        let defaults = GlobalKeys::default();
        Self {
            quit: KeyBinding::Multiple(defaults.quit),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ListKeysFile {
    next: KeyBinding,
    prev: KeyBinding,
    edit: KeyBinding,
}

impl Default for ListKeysFile {
    fn default() -> Self {
        let defaults = ListKeys::default();
        Self {
            next: KeyBinding::Multiple(defaults.next),
            prev: KeyBinding::Multiple(defaults.prev),
            edit: KeyBinding::Multiple(defaults.edit),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FormKeysFile {
    cancel: KeyBinding,
    confirm: KeyBinding,
    save: KeyBinding,
    next: KeyBinding,
    prev: KeyBinding,
    toggle: KeyBinding,
}

impl Default for FormKeysFile {
    fn default() -> Self {
        let defaults = FormKeys::default();
        Self {
            cancel: KeyBinding::Multiple(defaults.cancel),
            confirm: KeyBinding::Multiple(defaults.confirm),
            save: KeyBinding::Multiple(defaults.save),
            next: KeyBinding::Multiple(defaults.next),
            prev: KeyBinding::Multiple(defaults.prev),
            toggle: KeyBinding::Multiple(defaults.toggle),
        }
    }
}

impl From<KeysFile> for Keys {
    fn from(file: KeysFile) -> Self {
        Self {
            global: GlobalKeys {
                quit: file.global.quit.into_vec(),
            },
            list: ListKeys {
                next: file.list.next.into_vec(),
                prev: file.list.prev.into_vec(),
                edit: file.list.edit.into_vec(),
            },
            form: FormKeys {
                cancel: file.form.cancel.into_vec(),
                confirm: file.form.confirm.into_vec(),
                save: file.form.save.into_vec(),
                next: file.form.next.into_vec(),
                prev: file.form.prev.into_vec(),
                toggle: file.form.toggle.into_vec(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ServerFile {
    base_url: String,
    token: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct UiFile {
    colors: UiColorsFile,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct UiColorsFile {
    border: Option<RgbColor>,
    selection_bg: Option<RgbColor>,
    selection_fg: Option<RgbColor>,
    separator: Option<RgbColor>,
    status_fg: Option<RgbColor>,
    status_bg: Option<RgbColor>,
    error: Option<RgbColor>,
    notice: Option<RgbColor>,
}

impl From<UiFile> for UiConfig {
    fn from(file: UiFile) -> Self {
        let defaults = UiColors::default();
        let colors = file.colors;
        Self {
            colors: UiColors {
                border: colors.border.unwrap_or(defaults.border),
                selection_bg: colors.selection_bg.unwrap_or(defaults.selection_bg),
                selection_fg: colors.selection_fg.unwrap_or(defaults.selection_fg),
                separator: colors.separator.unwrap_or(defaults.separator),
                status_fg: colors.status_fg.unwrap_or(defaults.status_fg),
                status_bg: colors.status_bg.unwrap_or(defaults.status_bg),
                error: colors.error.unwrap_or(defaults.error),
                notice: colors.notice.unwrap_or(defaults.notice),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    server: ServerFile,
    name_order: Option<String>,
    phone_region: Option<String>,
    #[serde(default)]
    keys: KeysFile,
    #[serde(default)]
    ui: UiFile,
}

// =============================================================================
// Name order
// =============================================================================

fn resolve_name_order(value: Option<&str>) -> Result<NameOrder> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(NameOrder::from_env()),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "auto" => Ok(NameOrder::from_env()),
            "given-first" => Ok(NameOrder::GivenFirst),
            "family-first" => Ok(NameOrder::FamilyFirst),
            other => bail!(
                "invalid name_order '{}', expected one of: auto, given-first, family-first",
                other
            ),
        },
    }
}

// =============================================================================
// Key binding validation
// =============================================================================

fn normalize_binding(binding: &str) -> String {
    let trimmed = binding.trim();
    if trimmed.len() == 1 {
        // Single character: preserve case (m != M)
        trimmed.to_string()
    } else {
        // Special key names: case-insensitive
        trimmed.to_ascii_lowercase()
    }
}

/// Check for collisions within a single context
fn check_context_collisions(bindings: &[(&str, &[String])], context_name: &str) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();

    for (action_name, keys) in bindings {
        for key in *keys {
            let normalized = normalize_binding(key);
            if normalized.is_empty() {
                continue;
            }
            if let Some(existing_action) = seen.get(&normalized) {
                bail!(
                    "key binding collision in [keys.{}]: '{}' is bound to both '{}' and '{}'",
                    context_name,
                    key,
                    existing_action,
                    action_name
                );
            }
            seen.insert(normalized, action_name);
        }
    }

    Ok(())
}

/// Validate all key bindings for collisions within each context
fn validate_key_bindings(keys: &Keys) -> Result<()> {
    check_context_collisions(&[("quit", &keys.global.quit)], "global")?;

    check_context_collisions(
        &[
            ("next", &keys.list.next),
            ("prev", &keys.list.prev),
            ("edit", &keys.list.edit),
        ],
        "list",
    )?;

    check_context_collisions(
        &[
            ("cancel", &keys.form.cancel),
            ("confirm", &keys.form.confirm),
            ("save", &keys.form.save),
            ("next", &keys.form.next),
            ("prev", &keys.form.prev),
            ("toggle", &keys.form.toggle),
        ],
        "form",
    )?;

    Ok(())
}

// =============================================================================
// Unknown key warnings
// =============================================================================

fn warn_unknown_keys(value: &toml::Value) {
    let Some(table) = value.as_table() else {
        return;
    };

    let known = HashSet::from([
        "server".to_string(),
        "name_order".to_string(),
        "phone_region".to_string(),
        "keys".to_string(),
        "ui".to_string(),
    ]);

    for key in table.keys() {
        if !known.contains(key) {
            eprintln!("warning: unknown configuration key `{}`", key);
        }
    }
}

// =============================================================================
// Paths
// =============================================================================

/// Expand ~ to home directory in paths
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(base) = BaseDirs::new() {
            return base.home_dir().join(stripped);
        }
    }
    path.to_path_buf()
}

fn config_root() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine base directories")?;
    Ok(base.config_dir().join(APP_NAME))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_root()?.join(CONFIG_FILE_NAME))
}

/// Directory for the session log file (a TUI cannot log to its terminal)
pub fn log_dir() -> Result<PathBuf> {
    Ok(config_root()?.join("logs"))
}

pub fn ensure_config_dir() -> Result<()> {
    let dir = config_root()?;
    if !dir.exists() {
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create config dir: {}", dir.display()))?;
    }
    Ok(())
}

// =============================================================================
// Loading
// =============================================================================

pub fn load(override_path: Option<&Path>) -> Result<Config> {
    let path = match override_path {
        Some(path) => expand_tilde(path),
        None => {
            ensure_config_dir()?;
            config_path()?
        }
    };

    if !path.exists() {
        bail!(
            "configuration file not found at {}. Run 'peerbook init' to create one.",
            path.display()
        );
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration file at {}", path.display()))?;

    parse(&raw, path)
}

fn parse(raw: &str, path: PathBuf) -> Result<Config> {
    let value: toml::Value = toml::from_str(raw)
        .with_context(|| format!("failed to parse {} as TOML", path.display()))?;

    warn_unknown_keys(&value);

    let cfg_file: ConfigFile = value
        .try_into()
        .with_context(|| format!("failed to deserialize config from {}", path.display()))?;

    let base_url = cfg_file.server.base_url.trim().to_string();
    if base_url.is_empty() {
        return Err(anyhow!("`server.base_url` must be specified in configuration"));
    }

    let name_order = resolve_name_order(cfg_file.name_order.as_deref())?;

    let phone_region = cfg_file
        .phone_region
        .as_ref()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(|value| value.to_ascii_uppercase());

    let keys: Keys = cfg_file.keys.into();
    validate_key_bindings(&keys)?;

    Ok(Config {
        config_path: path,
        server: ServerConfig {
            base_url,
            token: cfg_file.server.token,
            timeout_secs: cfg_file.server.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        },
        name_order,
        phone_region,
        keys,
        ui: cfg_file.ui.into(),
    })
}

// =============================================================================
// Initialization
// =============================================================================

/// Write a default configuration file for `peerbook init`.
/// Refuses to overwrite an existing file unless `force` is set.
pub fn write_default(path: &Path, server_url: &str, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Configuration already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config dir: {}", parent.display()))?;
        }
    }

    let content = format!(
        r#"[server]
base_url = "{server_url}"
# token = "..."
# timeout_secs = {DEFAULT_TIMEOUT_SECS}

# Name layout: "auto" (from locale), "given-first", or "family-first"
name_order = "auto"

# Default region for phone numbers without a country prefix, e.g. "US"
# phone_region = ""

[keys.global]
quit = "q"

[keys.list]
next = ["j", "Down"]
prev = ["k", "Up"]
edit = ["e", "Enter"]

[keys.form]
cancel = "Escape"
confirm = "Enter"
save = "F2"
next = ["Tab", "Down"]
prev = ["Backtab", "Up"]
toggle = "Space"
"#
    );

    fs::write(path, content)
        .with_context(|| format!("failed to write configuration to {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(raw: &str) -> Result<Config> {
        parse(raw, PathBuf::from("test-config.toml"))
    }

    #[test]
    fn test_minimal_config() {
        let config = parse_str(
            r#"
[server]
base_url = "https://directory.example.com/api"
"#,
        )
        .unwrap();
        assert_eq!(config.server.base_url, "https://directory.example.com/api");
        assert_eq!(config.server.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(config.server.token.is_none());
        assert_eq!(config.keys.global.quit, vec!["q".to_string()]);
    }

    #[test]
    fn test_missing_server_section_fails() {
        assert!(parse_str("name_order = \"auto\"").is_err());
    }

    #[test]
    fn test_empty_base_url_fails() {
        let result = parse_str(
            r#"
[server]
base_url = "  "
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_key_binding_single_and_list() {
        let config = parse_str(
            r#"
[server]
base_url = "http://localhost:8080"

[keys.list]
next = "n"
prev = ["p", "Up"]
"#,
        )
        .unwrap();
        assert_eq!(config.keys.list.next, vec!["n".to_string()]);
        assert_eq!(config.keys.list.prev, vec!["p".to_string(), "Up".to_string()]);
        // Unspecified actions keep their defaults
        assert_eq!(config.keys.list.edit, ListKeys::default().edit);
    }

    #[test]
    fn test_key_collision_rejected() {
        let result = parse_str(
            r#"
[server]
base_url = "http://localhost:8080"

[keys.form]
cancel = "Enter"
"#,
        );
        let err = format!("{:#}", result.unwrap_err());
        assert!(err.contains("collision"), "got: {err}");
    }

    #[test]
    fn test_name_order_values() {
        let raw = |order: &str| {
            format!(
                "[server]\nbase_url = \"http://localhost\"\nname_order = \"{order}\"\n"
            )
        };
        assert_eq!(
            parse_str(&raw("family-first")).unwrap().name_order,
            NameOrder::FamilyFirst
        );
        assert_eq!(
            parse_str(&raw("given-first")).unwrap().name_order,
            NameOrder::GivenFirst
        );
        assert!(parse_str(&raw("sideways")).is_err());
    }

    #[test]
    fn test_phone_region_uppercased() {
        let config = parse_str(
            r#"
[server]
base_url = "http://localhost"
phone_region = "us"
"#,
        )
        .unwrap();
        assert_eq!(config.phone_region.as_deref(), Some("US"));
    }

    #[test]
    fn test_rgb_color_array_and_map() {
        let config = parse_str(
            r#"
[server]
base_url = "http://localhost"

[ui.colors]
border = [10, 20, 30]
error = { r = 200, g = 0, b = 0 }
"#,
        )
        .unwrap();
        let colors = config.ui.colors;
        assert_eq!(colors.border.r, 10);
        assert_eq!(colors.border.b, 30);
        assert_eq!(colors.error.r, 200);
        // Untouched colors keep defaults
        assert_eq!(colors.notice.g, UiColors::default().notice.g);
    }

    #[test]
    fn test_write_default_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        write_default(&path, "http://localhost:8080", false).unwrap();
        assert!(path.exists());

        let err = write_default(&path, "http://other", false).unwrap_err();
        assert!(format!("{err:#}").contains("already exists"));

        write_default(&path, "http://other", true).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("http://other"));
    }

    #[test]
    fn test_written_default_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        write_default(&path, "http://localhost:8080", false).unwrap();
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.server.base_url, "http://localhost:8080");
    }
}
