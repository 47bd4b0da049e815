//! Template content for `mortar init`.

/// Starter build script
pub const BUILD_LUA_TEMPLATE: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../lua/template.lua"));

/// Type definitions for the script globals
pub const GLOBALS_D_LUA: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../lua/globals.d.lua"));

/// Template for .luarc.json (LuaLS configuration)
/// Contains {types_path} placeholder for substitution
pub const LUARC_JSON_TEMPLATE: &str = r#"{
  "$schema": "https://raw.githubusercontent.com/LuaLS/vscode-lua/master/setting/schema.json",
  "runtime": {
    "version": "Lua 5.4"
  },
  "workspace": {
    "library": [
      "{types_path}"
    ],
    "checkThirdParty": false
  },
  "completion": {
    "callSnippet": "Both",
    "keywordSnippet": "Both"
  }
}
"#;
