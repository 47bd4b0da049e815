/// Script loaded when none is given on the command line.
pub const DEFAULT_SCRIPT: &str = "build.lua";

/// Settings file looked up next to the script.
pub const CONFIG_FILE_NAME: &str = "mortar.toml";

/// Prefix of environment variables that override settings.
pub const ENV_PREFIX: &str = "MORTAR_";

/// Script argument holding the target name.
pub const TARGET_ARGUMENT: &str = "target";
