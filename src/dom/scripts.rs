//! In-page snippets.
//!
//! Each snippet is a single function expression taking one JSON argument. It is
//! wrapped together with a shared prelude (`__ds` helpers for visibility,
//! selector lists and synthetic clicks) into a self-invoking expression.

use serde_json::Value;

const PRELUDE: &str = include_str!("js/prelude.js");
const TAIL: &str = ");\n})()";

/// A named in-page function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Script {
    name: &'static str,
    source: &'static str,
}

impl Script {
    const fn new(name: &'static str, source: &'static str) -> Self {
        Self { name, source }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Build the expression that runs this snippet with `args`
    pub fn call(&self, args: &Value) -> String {
        format!("{}{}{}", self.head(), args, TAIL)
    }

    /// Recover the arguments from an expression produced by [`Script::call`].
    ///
    /// Returns `None` when `expression` runs a different snippet. Useful for
    /// recording or scripting page traffic.
    pub fn invocation_args(&self, expression: &str) -> Option<Value> {
        let rest = expression.strip_prefix(self.head().as_str())?;
        let args = rest.strip_suffix(TAIL)?;
        serde_json::from_str(args).ok()
    }

    fn head(&self) -> String {
        format!("(() => {{\n{}\nreturn ({})(", PRELUDE, self.source.trim())
    }
}

pub const PROBE_COMPOSER: Script = Script::new("probe_composer", include_str!("js/probe_composer.js"));
pub const SET_PROMPT: Script = Script::new("set_prompt", include_str!("js/set_prompt.js"));
pub const RESOLVE_FILE_INPUT: Script = Script::new("resolve_file_input", include_str!("js/resolve_file_input.js"));
pub const ATTACHMENT_STATE: Script = Script::new("attachment_state", include_str!("js/attachment_state.js"));
pub const CONTROL_STATE: Script = Script::new("control_state", include_str!("js/control_state.js"));
pub const OPEN_CONTROL: Script = Script::new("open_control", include_str!("js/open_control.js"));
pub const COLLECT_OPTIONS: Script = Script::new("collect_options", include_str!("js/collect_options.js"));
pub const CLICK_OPTION: Script = Script::new("click_option", include_str!("js/click_option.js"));
pub const CLOSE_MENU: Script = Script::new("close_menu", include_str!("js/close_menu.js"));

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_embeds_prelude_and_args() {
        let expr = SET_PROMPT.call(&json!({ "text": "Review this." }));

        assert!(expr.starts_with("(() => {"));
        assert!(expr.contains("const __ds"));
        assert!(expr.contains(r#"{"text":"Review this."}"#));
        assert!(expr.ends_with("})()"));
    }

    #[test]
    fn test_invocation_args_recovers_arguments() {
        let args = json!({ "kind": "model", "selectors": { "modelButton": ["button"] } });
        let expr = OPEN_CONTROL.call(&args);

        assert_eq!(OPEN_CONTROL.invocation_args(&expr), Some(args));
        assert_eq!(CONTROL_STATE.invocation_args(&expr), None);
    }

    #[test]
    fn test_configured_selectors_only_reach_guarded_helpers() {
        for script in [PROBE_COMPOSER, SET_PROMPT, RESOLVE_FILE_INPUT, ATTACHMENT_STATE, CONTROL_STATE, OPEN_CONTROL, COLLECT_OPTIONS] {
            for line in script.source.lines().filter(|l| l.contains("s.")) {
                for raw in ["querySelector", ".closest(", ".matches("] {
                    assert!(!line.contains(raw), "{} passes a configured selector to {}: {}", script.name(), raw, line.trim());
                }
            }
        }
        assert!(PRELUDE.contains("closestAny"));
    }

    #[test]
    fn test_snippets_are_function_expressions() {
        for script in [
            PROBE_COMPOSER,
            SET_PROMPT,
            RESOLVE_FILE_INPUT,
            ATTACHMENT_STATE,
            CONTROL_STATE,
            OPEN_CONTROL,
            COLLECT_OPTIONS,
            CLICK_OPTION,
            CLOSE_MENU,
        ] {
            let source = script.source.trim();
            assert!(source.starts_with('('), "{} must start with a parameter list", script.name());
            assert!(!source.ends_with(';'), "{} must be a bare expression", script.name());
        }
    }
}
