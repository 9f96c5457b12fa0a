//! Security implementations for tool execution.

// Re-export abstractions from raconteur-traits
pub use raconteur_traits::security::{SecurityDecision, SecurityGate, ToolAction};
pub use raconteur_traits::error::Result;

// Network security (SSRF allowlist + validation), implemented in raconteur-traits.
pub use raconteur_traits::network::{
    NetworkAllowlist, NetworkEcosystem, is_restricted_ip, resolve_and_validate_url, validate_url,
};

/// Command-level security checker (regex-based filtering).
pub mod bash_security {
    use regex::Regex;
    use std::sync::OnceLock;

    /// Configuration for bash command security.
    #[derive(Debug, Clone)]
    pub struct BashSecurityConfig {
        pub blocked_commands: Vec<String>,
        pub allow_sudo: bool,
    }

    impl Default for BashSecurityConfig {
        fn default() -> Self {
            Self {
                blocked_commands: vec![
                    "rm -rf /".to_string(),
                    "mkfs".to_string(),
                    "dd if=/dev".to_string(),
                    ":(){ :|:& };:".to_string(),
                    "chmod -R 777 /".to_string(),
                    "chown -R".to_string(),
                    "> /dev/sda".to_string(),
                    "shutdown".to_string(),
                    "reboot".to_string(),
                    "init 0".to_string(),
                    "halt".to_string(),
                ],
                allow_sudo: false,
            }
        }
    }

    /// Result of a security check.
    #[derive(Debug)]
    pub struct SecurityCheckResult {
        pub allowed: bool,
        pub reason: Option<String>,
    }

    impl SecurityCheckResult {
        pub fn allowed() -> Self {
            Self {
                allowed: true,
                reason: None,
            }
        }

        pub fn blocked(reason: &str) -> Self {
            Self {
                allowed: false,
                reason: Some(reason.to_string()),
            }
        }
    }

    /// Security checker for bash commands.
    pub struct BashSecurityChecker {
        blocked_commands: Vec<String>,
        allow_sudo: bool,
    }

    impl BashSecurityChecker {
        pub fn new(config: &BashSecurityConfig) -> Self {
            Self {
                blocked_commands: config.blocked_commands.clone(),
                allow_sudo: config.allow_sudo,
            }
        }

        /// Check if command is blocked for security reasons.
        pub fn is_command_blocked(&self, command: &str) -> SecurityCheckResult {
            if command.contains('\0') {
                return SecurityCheckResult::blocked("Null byte in command");
            }

            if Self::contains_dangerous_metacharacters(command) {
                return SecurityCheckResult::blocked("Dangerous shell metacharacters detected");
            }

            let normalized = Self::normalize_command(command);

            for blocked in &self.blocked_commands {
                let normalized_blocked = Self::normalize_command(blocked);
                if normalized.contains(&normalized_blocked) {
                    return SecurityCheckResult::blocked(&format!(
                        "Blocked pattern matched: {}",
                        blocked
                    ));
                }
            }

            if !self.allow_sudo && Self::contains_sudo(&normalized) {
                return SecurityCheckResult::blocked("sudo is not allowed");
            }

            if let Some(reason) = Self::check_dangerous_patterns(&normalized) {
                return SecurityCheckResult::blocked(&reason);
            }

            SecurityCheckResult::allowed()
        }

        /// Check for shell metacharacters that enable command chaining or injection.
        pub fn contains_dangerous_metacharacters(command: &str) -> bool {
            static DANGEROUS_META: OnceLock<Regex> = OnceLock::new();
            let regex = DANGEROUS_META.get_or_init(|| {
                Regex::new(
                    r";\s*[/\w]|\|\s*[/\w]|\|\|[^|]|&&[^&]|\$\(|\$\{|\n\s*[/\w]|\r\s*[/\w]|>\s*/dev/(sd|hd|nvme)|\bexec\s|\beval\s",
                ).expect("Invalid regex for dangerous metacharacters")
            });

            if command.contains('`') && command.matches('`').count() >= 2 {
                return true;
            }

            regex.is_match(command)
        }

        /// Normalize command for comparison (handle path obfuscation).
        pub fn normalize_command(command: &str) -> String {
            let mut normalized = command.to_lowercase();

            let prefixes = [
                "/usr/bin/",
                "/usr/sbin/",
                "/bin/",
                "/sbin/",
                "/usr/local/bin/",
            ];
            for prefix in prefixes {
                normalized = normalized.replace(prefix, "");
            }

            while normalized.contains("  ") {
                normalized = normalized.replace("  ", " ");
            }

            normalized = normalized.replace("\\ ", " ");
            normalized = normalized.replace("\\-", "-");

            normalized.trim().to_string()
        }

        /// Check if command contains sudo (with bypass detection).
        pub fn contains_sudo(normalized: &str) -> bool {
            if normalized.starts_with("sudo ") || normalized.contains(" sudo ") {
                return true;
            }
            if normalized.starts_with("sudo") {
                return true;
            }

            let sudo_aliases = ["doas", "run0", "pkexec", "gsudo"];
            for alias in sudo_aliases {
                if normalized.starts_with(&format!("{} ", alias))
                    || normalized.contains(&format!(" {} ", alias))
                {
                    return true;
                }
            }

            false
        }

        /// Check for additional dangerous patterns.
        pub fn check_dangerous_patterns(normalized: &str) -> Option<String> {
            if normalized.contains("rm ") {
                if normalized.contains("-rf")
                    && (normalized.contains("/*")
                        || normalized.contains("/ ~")
                        || normalized.contains("/root"))
                {
                    return Some("Dangerous rm command detected".to_string());
                }
                if normalized.contains("--no-preserve-root") {
                    return Some("rm with --no-preserve-root detected".to_string());
                }
            }

            if (normalized.starts_with("chmod ") || normalized.starts_with("chown "))
                && normalized.contains(" -r ")
                && normalized.starts_with("/")
            {
                return Some("Recursive permission change on root".to_string());
            }

            static CURL_PIPE_SH: OnceLock<Regex> = OnceLock::new();
            let curl_regex = CURL_PIPE_SH.get_or_init(|| {
                Regex::new(r"(curl|wget).*\|.*(sh|bash|zsh|fish)")
                    .expect("Invalid curl|sh regex")
            });
            if curl_regex.is_match(normalized) {
                return Some("Curl/wget piped to shell detected".to_string());
            }

            if normalized.contains("base64")
                && (normalized.contains("| sh") || normalized.contains("| bash"))
            {
                return Some("Base64 decode and execute detected".to_string());
            }

            None
        }
    }

}
