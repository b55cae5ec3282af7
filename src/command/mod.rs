//! Launch command synthesis.
//!
//! The command is a single `cmd.exe` line:
//!
//! ```text
//! start "<name>" /wait "<serverPath>\arma3server_x64.exe" "-config=..." "-bePath=..." "-profiles=..." ["-mod=a;b"] [extra]
//! ```
//!
//! Paths are taken verbatim from the configuration; nothing is checked for
//! existence here.

use crate::config::ServerConfig;

pub const DEFAULT_EXECUTABLE: &str = "arma3server_x64.exe";

#[derive(Debug, Clone)]
pub struct CommandBuilder {
    executable: String,
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_EXECUTABLE)
    }
}

impl CommandBuilder {
    pub fn new(executable: &str) -> Self {
        Self {
            executable: executable.to_string(),
        }
    }

    /// Build the launch command. The `-mod=` argument is only added when
    /// `use_mods` is set and `mods` is non-empty.
    pub fn build(&self, config: &ServerConfig, use_mods: bool, mods: &[String]) -> String {
        let mut command = format!(
            r#"start "{}" /wait "{}\{}" "-config={}" "-bePath={}" "-profiles={}""#,
            config.name,
            config.server_path,
            self.executable,
            config.server_config_path,
            config.battleye_path,
            config.profiles_path,
        );

        if use_mods && !mods.is_empty() {
            command.push_str(&format!(r#" "-mod={}""#, mod_path_list(&config.mods_path, mods)));
        }

        let extra = config.additional_startup_parameters.trim();
        if !extra.is_empty() {
            command.push(' ');
            command.push_str(&config.additional_startup_parameters);
        }

        command
    }
}

/// `<root>\<mod>` entries joined with `;`, no trailing separator.
pub fn mod_path_list(mods_root: &str, mods: &[String]) -> String {
    mods.iter()
        .map(|name| format!(r"{}\{}", mods_root, name))
        .collect::<Vec<_>>()
        .join(";")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> ServerConfig {
        ServerConfig {
            name: "MyServer".to_string(),
            server_path: "/srv".to_string(),
            server_config_path: "/srv/server.cfg".to_string(),
            battleye_path: "/srv/be".to_string(),
            profiles_path: "/srv/profiles".to_string(),
            mods_path: "/mods".to_string(),
            additional_startup_parameters: String::new(),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn test_base_command_without_mods() {
        let command = CommandBuilder::default().build(&sample_config(), false, &[]);
        assert_eq!(
            command,
            r#"start "MyServer" /wait "/srv\arma3server_x64.exe" "-config=/srv/server.cfg" "-bePath=/srv/be" "-profiles=/srv/profiles""#
        );
    }

    #[test]
    fn test_mod_order_and_no_trailing_separator() {
        let mods = vec!["@mod1".to_string(), "@mod2".to_string(), "@mod3".to_string()];
        let command = CommandBuilder::default().build(&sample_config(), true, &mods);
        assert!(command.ends_with(r#" "-mod=/mods\@mod1;/mods\@mod2;/mods\@mod3""#));
        assert!(!command.contains(";\""));
    }

    #[test]
    fn test_use_mods_with_empty_list_adds_nothing() {
        let command = CommandBuilder::default().build(&sample_config(), true, &[]);
        assert!(!command.contains("-mod="));
    }

    #[test]
    fn test_mods_ignored_when_disabled() {
        let mods = vec!["@mod1".to_string()];
        let command = CommandBuilder::default().build(&sample_config(), false, &mods);
        assert!(!command.contains("-mod="));
    }

    #[test]
    fn test_additional_parameters_are_last() {
        let mut config = sample_config();
        config.additional_startup_parameters = "-netlog -autoinit".to_string();
        let mods = vec!["@cba".to_string()];

        let command = CommandBuilder::default().build(&config, true, &mods);
        assert!(command.ends_with(r#""-mod=/mods\@cba" -netlog -autoinit"#));
    }

    #[test]
    fn test_blank_additional_parameters_are_skipped() {
        let mut config = sample_config();
        config.additional_startup_parameters = "   ".to_string();
        let command = CommandBuilder::default().build(&config, false, &[]);
        assert!(command.ends_with(r#""-profiles=/srv/profiles""#));
    }

    #[test]
    fn test_custom_executable() {
        let command = CommandBuilder::new("arma3server.exe").build(&sample_config(), false, &[]);
        assert!(command.contains(r#""/srv\arma3server.exe""#));
    }

    #[test]
    fn test_single_mod_path() {
        assert_eq!(mod_path_list(r"C:\W", &["@a".to_string()]), r"C:\W\@a");
    }
}
